pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod launcher;
pub mod models;
pub mod parse;
pub mod queries;
pub mod reconcile;
pub mod scan;
mod schema;

pub use crate::config::{AppPaths, ScanConfig, ShelfConfig};
pub use crate::db::DbPool;
pub use crate::error::{Error, Result};
pub use crate::jobs::ImportCoordinator;

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database Pool Error: {0}")]
    DbPool(#[from] r2d2::Error),

    #[error("Database Error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Scan Error at {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Path Error: {0}")]
    Path(String),

    #[error("Invalid Input: {0}")]
    Invalid(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Import already running; wait for it to finish before starting another.")]
    ImportBusy,
}

impl Error {
    /// Wraps a walkdir failure, keeping the path it happened at.
    pub(crate) fn scan(root: &std::path::Path, err: walkdir::Error) -> Self {
        let path = err
            .path()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| root.to_path_buf());
        Error::Scan { path, source: err }
    }
}

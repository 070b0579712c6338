use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Library {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub media_type: String,
    pub image_path: Option<String>,
    pub is_hidden: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryWithCount {
    #[serde(flatten)]
    pub library: Library,
    pub comic_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewLibrary {
    pub name: String,
    pub description: Option<String>,
    pub media_type: Option<String>,
    pub image_path: Option<String>,
    pub is_hidden: bool,
}

/// Partial update; `None` leaves a column as it is and `Some(None)` clears it.
/// In JSON an absent key leaves the column, an explicit `null` clears it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LibraryUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub image_path: Option<Option<String>>,
    #[serde(default)]
    pub is_hidden: Option<bool>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comic {
    pub id: i64,
    pub name: String,
    pub author: String,
    pub image_path: Option<String>,
    pub directory: String,
    pub library_id: Option<i64>,
    pub favorite: bool,
    /// Derived from the owning library.
    pub is_hidden: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Volume {
    pub id: i64,
    pub comic_id: i64,
    pub number: u32,
    pub directory: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ChapterKind {
    Chapter,
    Extra,
}

impl ChapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChapterKind::Chapter => "chapter",
            ChapterKind::Extra => "extra",
        }
    }
}

impl fmt::Display for ChapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChapterKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chapter" => Ok(ChapterKind::Chapter),
            "extra" => Ok(ChapterKind::Extra),
            other => Err(format!("unknown chapter kind: {other}")),
        }
    }
}

impl ToSql for ChapterKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ChapterKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub id: i64,
    pub volume_id: i64,
    pub number: u32,
    #[serde(rename = "type")]
    pub kind: ChapterKind,
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeWithChapters {
    #[serde(flatten)]
    pub volume: Volume,
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComicWithVolumes {
    #[serde(flatten)]
    pub comic: Comic,
    pub volumes: Vec<VolumeWithChapters>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportDirectory {
    pub id: i64,
    pub path: String,
    pub library_id: Option<i64>,
    pub last_imported_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HiddenFilter {
    #[default]
    Hide,
    Include,
    Only,
}

impl FromStr for HiddenFilter {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hide" => Ok(HiddenFilter::Hide),
            "include" => Ok(HiddenFilter::Include),
            "only" => Ok(HiddenFilter::Only),
            other => Err(format!("unknown hidden filter: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComicQuery {
    pub library_id: Option<i64>,
    pub search: Option<String>,
    pub favorites_only: bool,
    pub hidden: HiddenFilter,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
}

impl Default for ComicQuery {
    fn default() -> Self {
        Self {
            library_id: None,
            search: None,
            favorites_only: false,
            hidden: HiddenFilter::Hide,
            page: 1,
            page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ComicsPage {
    pub comics: Vec<Comic>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

/// Identity parsed from a `<name> (<author>)` folder name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ComicIdentity {
    pub name: String,
    pub author: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChapterIdentity {
    pub number: u32,
    pub kind: ChapterKind,
}

/// In-memory description of one comic folder, built before any store write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ComicScan {
    pub cover_image: Option<PathBuf>,
    pub volumes: Vec<ScannedVolume>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScannedVolume {
    pub number: u32,
    pub directory: PathBuf,
    pub file: Option<PathBuf>,
    pub chapters: Vec<ScannedChapter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScannedChapter {
    pub number: u32,
    pub kind: ChapterKind,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Imported,
    Updated,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub updated: usize,
}

impl ImportSummary {
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Imported => self.imported += 1,
            UpsertOutcome::Updated => self.updated += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.imported + self.updated
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ImportEvent {
    Started {
        run_id: String,
        root: String,
    },
    Finished {
        run_id: String,
        root: String,
        summary: ImportSummary,
    },
    Failed {
        run_id: String,
        root: String,
        message: String,
    },
    CatalogChanged,
}

/// Result handed back by the file-open collaborator.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl OpenOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

pub(crate) fn timestamp(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
}

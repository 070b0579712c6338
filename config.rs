use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const HOME_ENV: &str = "COMIC_SHELF_HOME";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Extensions (without the dot) treated as comic archives.
    #[serde(default = "default_archive_extensions")]
    pub archive_extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            archive_extensions: default_archive_extensions(),
        }
    }
}

impl ScanConfig {
    pub fn is_archive(&self, file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.archive_extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

fn default_archive_extensions() -> Vec<String> {
    vec!["cbz".to_string()]
}

fn default_page_size() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelfConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Command used instead of the platform launcher when opening archives.
    #[serde(default)]
    pub opener: Option<String>,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            page_size: default_page_size(),
            opener: None,
        }
    }
}

impl ShelfConfig {
    /// Reads `config.json`; a missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, crate::error::Error> {
        if !path.exists() {
            log::debug!("No config at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppPaths {
    pub root: PathBuf,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self, crate::error::Error> {
        let app_root = match std::env::var_os(HOME_ENV) {
            Some(home) if !home.is_empty() => PathBuf::from(home),
            _ => dirs::data_dir()
                .ok_or_else(|| crate::error::Error::Path("Failed to get app data dir".to_string()))?
                .join("ComicShelf"),
        };
        Self::at(app_root)
    }

    pub fn at(app_root: PathBuf) -> Result<Self, crate::error::Error> {
        std::fs::create_dir_all(&app_root)?;
        Ok(Self {
            db_path: app_root.join("catalog.db"),
            config_path: app_root.join("config.json"),
            root: app_root,
        })
    }
}

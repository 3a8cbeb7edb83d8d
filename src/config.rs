/// Catalog configuration
///
/// Loaded from a JSON file; every field is optional and falls back to the
/// defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Page size used when a facet set does not ask for one
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Result Cache freshness window
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite database file. `:memory:` opens a private in-memory catalog.
    pub db_path: PathBuf,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Freshness window of the Result Cache in seconds; 0 disables caching
    pub cache_ttl_secs: u64,
    /// How long a connection waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            busy_timeout_ms: 5_000,
        }
    }
}

impl CatalogConfig {
    /// Configuration for a throwaway in-memory catalog
    pub fn in_memory() -> Self {
        Self {
            db_path: PathBuf::from(":memory:"),
            ..Self::default()
        }
    }

    /// Same defaults, pointed at a specific database file
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: path.into(),
            ..Self::default()
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == ":memory:"
    }
}

/// Get the path where the catalog database lives by default
///
/// - Linux: ~/.local/share/photo-catalog/catalog.db
/// - macOS: ~/Library/Application Support/photo-catalog/catalog.db
/// - Windows: %APPDATA%\photo-catalog\catalog.db
fn default_db_path() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    path.push("photo-catalog");
    path.push("catalog.db");
    path
}

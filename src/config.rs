//! Bulk-copy options and how they are loaded.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

const TEMP_DIR_NAME: &str = ".bulkcopy";

/// Options controlling how `bcp` is invoked.
///
/// Numeric options treat zero the same as unset: neither is passed to the tool.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BcpOptions {
    /// Path to the bcp executable. Looked up on PATH when unset.
    pub exec_path: Option<PathBuf>,

    // Connection
    pub server: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub trusted: bool,

    /// Read and write data files as UTF-16 (`-w`).
    pub unicode: bool,

    // Transfer limits
    pub packet_size: Option<u32>,
    pub batch_size: Option<u64>,
    pub first_row: Option<u64>,
    pub last_row: Option<u64>,
    pub max_errors: Option<u64>,

    // Files and text layout
    pub error_file: Option<String>,
    pub input_file: Option<String>,
    pub code_page: Option<String>,
    pub row_terminator: Option<String>,
    pub field_terminator: Option<String>,

    // Switches
    pub keep_nulls: bool,
    pub keep_identity: bool,
    pub quoted_identifiers: bool,
    pub regional: bool,

    // Hints
    pub order: Option<String>,
    pub rows_per_batch: Option<u64>,
    pub kilobytes_per_batch: Option<u64>,
    pub tablock: bool,
    pub check_constraints: bool,
    pub fire_triggers: bool,

    /// Kill the tool if it runs longer than this many milliseconds.
    pub timeout_ms: Option<u64>,

    /// Base directory for generated format and data files.
    pub temp_dir: Option<PathBuf>,
}

impl BcpOptions {
    /// Parse options from a JSON document. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load options from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// The directory temp artifacts go to: the configured one, else a dot
    /// directory under the user's home, else the system temp dir.
    pub fn resolve_temp_dir(&self) -> PathBuf {
        if let Some(dir) = &self.temp_dir {
            return dir.clone();
        }
        dirs::home_dir()
            .map(|home| home.join(TEMP_DIR_NAME))
            .unwrap_or_else(|| std::env::temp_dir().join(TEMP_DIR_NAME))
    }
}

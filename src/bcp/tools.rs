//! bcp executable detection.

use std::path::{Path, PathBuf};

use crate::config::BcpOptions;
use crate::error::{Error, Result};

const TOOL_NAME: &str = "bcp";

/// Default install locations of the SQL Server command-line tools.
#[cfg(unix)]
const INSTALL_DIRS: &[&str] = &["/opt/mssql-tools18/bin", "/opt/mssql-tools/bin"];
#[cfg(not(unix))]
const INSTALL_DIRS: &[&str] = &[];

/// Resolve the bcp executable: the configured path, else an install
/// directory, else PATH.
pub fn bcp_path(options: &BcpOptions) -> Result<PathBuf> {
    if let Some(path) = &options.exec_path {
        // Bare names still go through PATH lookup
        if path.components().count() > 1 || path.is_absolute() {
            return Ok(path.clone());
        }
        if let Some(name) = path.to_str() {
            return find_tool(name).ok_or_else(|| not_found(name));
        }
        return Ok(path.clone());
    }

    find_tool(TOOL_NAME).ok_or_else(|| not_found(TOOL_NAME))
}

fn find_tool(name: &str) -> Option<PathBuf> {
    for dir in INSTALL_DIRS {
        let candidate = Path::new(dir).join(name);
        if candidate.exists() && is_executable(&candidate) {
            return Some(candidate);
        }
    }

    which::which(name).ok()
}

fn not_found(name: &str) -> Error {
    Error::ToolNotFound(format!(
        "{name} not found. Install the SQL Server command-line tools or set exec_path."
    ))
}

/// Check if a path is executable
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.exists()
    }
}

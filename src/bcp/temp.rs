//! Temp artifact naming and filesystem housekeeping.

use std::path::{Path, PathBuf};

use futures::future;
use rand::RngExt as _;

use crate::error::Result;

/// Kind of generated artifact; decides the file name suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Artifact {
    Format,
    Export,
    Import,
}

impl Artifact {
    fn suffix(self) -> &'static str {
        match self {
            Artifact::Format => "format.xml",
            Artifact::Export => "export.dat",
            Artifact::Import => "import.dat",
        }
    }
}

/// Hands out collision-resistant paths under one base directory.
#[derive(Clone, Debug)]
pub struct TempFiles {
    base_dir: PathBuf,
}

impl TempFiles {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `<epochMillis>_<random>_<pid>_<kind>.<ext>`
    pub fn path(&self, artifact: Artifact) -> PathBuf {
        let millis = chrono::Utc::now().timestamp_millis();
        let random: u32 = rand::rng().random_range(0..1_000_000_000);
        let pid = std::process::id();
        self.base_dir.join(format!("{millis}_{random}_{pid}_{}", artifact.suffix()))
    }

    /// A format file path and its companion data file path.
    pub fn pair(&self, data: Artifact) -> (PathBuf, PathBuf) {
        (self.path(Artifact::Format), self.path(data))
    }
}

/// Create the parent directories of every path, concurrently.
pub async fn ensure_parent_dirs(paths: &[&Path]) -> Result<()> {
    let creations = paths
        .iter()
        .filter_map(|path| path.parent())
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(tokio::fs::create_dir_all);
    future::try_join_all(creations).await?;
    Ok(())
}

/// Delete a format file and its data file concurrently. Both deletions are
/// attempted; the first error is returned.
pub async fn remove_pair(format_file: &Path, data_file: &Path) -> Result<()> {
    let (format_result, data_result) =
        future::join(tokio::fs::remove_file(format_file), tokio::fs::remove_file(data_file)).await;
    format_result?;
    data_result?;
    Ok(())
}

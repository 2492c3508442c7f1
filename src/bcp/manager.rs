//! Core BulkCopy struct and the steps shared by every operation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::bcp::args::build_arg_list;
use crate::bcp::format::FormatDescriptor;
use crate::bcp::runner::{Mode, ProcessRunner, ToolCommand, ToolOutput, ToolRunner};
use crate::bcp::temp::{Artifact, TempFiles};
use crate::bcp::tools::bcp_path;
use crate::config::BcpOptions;
use crate::error::Result;

/// Runs bulk exports and imports through bcp.
///
/// Options are fixed at construction. Each operation picks its own temp
/// paths, so one instance can serve several callers.
pub struct BulkCopy<R: ToolRunner = ProcessRunner> {
    /// Tokio runtime driving the async pipelines
    pub(crate) runtime: Runtime,
    pub(crate) options: Arc<BcpOptions>,
    pub(crate) temp: TempFiles,
    pub(crate) runner: R,
}

impl BulkCopy {
    /// Create a BulkCopy that runs the real bcp executable.
    pub fn new(options: BcpOptions) -> Result<Self> {
        Self::with_runner(options, ProcessRunner)
    }
}

impl<R: ToolRunner> BulkCopy<R> {
    /// Create a BulkCopy with a custom command runner.
    pub fn with_runner(options: BcpOptions, runner: R) -> Result<Self> {
        let runtime = Runtime::new()?;
        let temp = TempFiles::new(options.resolve_temp_dir());
        log::debug!("bcp temp files go to {}", temp.base_dir().display());
        Ok(Self { runtime, options: Arc::new(options), temp, runner })
    }

    pub fn options(&self) -> &BcpOptions {
        &self.options
    }

    pub fn temp_files(&self) -> &TempFiles {
        &self.temp
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Get a handle to the Tokio runtime for spawning parallel tasks
    pub fn runtime_handle(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }

    /// Generate a format descriptor for `table` at `dest`.
    pub(crate) async fn generate_format(
        &self,
        table: &str,
        dest: &Path,
    ) -> Result<FormatDescriptor> {
        let program = bcp_path(&self.options)?;
        let format =
            FormatDescriptor::generate(&self.runner, &self.options, &program, table, dest).await?;
        log::debug!("Format file for {table} has {} fields", format.fields.len());
        Ok(format)
    }

    /// Run a data transfer (`in` or `out`) against an existing format file.
    pub(crate) async fn transfer(
        &self,
        table: &str,
        mode: Mode,
        format_file: &Path,
    ) -> Result<ToolOutput> {
        let program = bcp_path(&self.options)?;
        let command = ToolCommand::new(
            &program,
            &self.options,
            table,
            mode,
            format_file,
            build_arg_list(&self.options, true),
        );
        self.runner.run(&command, self.options.timeout_ms).await
    }

    /// Use the caller's path or a fresh temp path.
    pub(crate) fn path_or_temp(&self, path: Option<&PathBuf>, artifact: Artifact) -> PathBuf {
        path.cloned().unwrap_or_else(|| self.temp.path(artifact))
    }
}

//! Bulk export: table → data file → rows.

use std::path::Path;

use crate::bcp::format::FormatDescriptor;
use crate::bcp::manager::BulkCopy;
use crate::bcp::reader::read_rows;
use crate::bcp::runner::{Mode, ToolOutput, ToolRunner};
use crate::bcp::temp::{Artifact, ensure_parent_dirs, remove_pair};
use crate::bcp::types::{ExportDetails, ExportOptions, Row};
use crate::error::{Result, Step, StepExt};

impl<R: ToolRunner> BulkCopy<R> {
    /// Export a table with bcp and decode the result (runs in Tokio runtime).
    ///
    /// With `read` off no rows are returned and the generated files are kept,
    /// whatever `keep_files` says.
    pub fn export(
        &self,
        table: &str,
        options: ExportOptions,
    ) -> Result<(Vec<Row>, ExportDetails)> {
        self.runtime.block_on(self.export_pipeline(table, options))
    }

    async fn export_pipeline(
        &self,
        table: &str,
        options: ExportOptions,
    ) -> Result<(Vec<Row>, ExportDetails)> {
        let format_file = self.path_or_temp(options.format_file.as_ref(), Artifact::Format);
        let export_file = self.path_or_temp(options.export_file.as_ref(), Artifact::Export);

        ensure_parent_dirs(&[&format_file, &export_file]).await.step(Step::EnsureDirectories)?;

        let format = self.generate_format(table, &format_file).await.step(Step::GenerateFormat)?;

        let output = self
            .transfer(table, Mode::Out(export_file.clone()), &format.path)
            .await
            .step(Step::RunTool)?;

        let rows = read_export(&output, &export_file, &format, options.read)
            .await
            .step(Step::ReadResults)?;

        let details = ExportDetails {
            format_file: format.path.clone(),
            export_file,
            row_count: output.rows_copied(),
            raw_output: output.stdout,
        };
        match details.row_count {
            Some(count) => log::info!("Exported {count} rows from {table}"),
            None => log::warn!("bcp output for {table} had no row count"),
        }

        if !options.keeps_files() {
            remove_pair(&details.format_file, &details.export_file)
                .await
                .inspect_err(|err| log::warn!("Failed to remove bcp files for {table}: {err}"))
                .step(Step::Cleanup)?;
        }

        Ok((rows, details))
    }
}

async fn read_export(
    output: &ToolOutput,
    export_file: &Path,
    format: &FormatDescriptor,
    read: bool,
) -> Result<Vec<Row>> {
    if !read {
        return Ok(Vec::new());
    }
    let bytes = tokio::fs::read(export_file).await?;
    let rows = read_rows(&bytes, format)?;
    if let Some(expected) = output.rows_copied()
        && expected != rows.len() as u64
    {
        log::warn!("bcp reported {expected} rows but {} were decoded", rows.len());
    }
    Ok(rows)
}

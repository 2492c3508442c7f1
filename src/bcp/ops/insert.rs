//! Bulk insert: prepare an import file, then load it with bcp.

use std::path::Path;

use crate::bcp::args::qualify_table;
use crate::bcp::format::FormatDescriptor;
use crate::bcp::import::{ImportFile, PreparedImport};
use crate::bcp::manager::BulkCopy;
use crate::bcp::runner::{Mode, ToolRunner};
use crate::bcp::temp::{Artifact, ensure_parent_dirs, remove_pair};
use crate::bcp::types::{InsertOptions, PrepareOptions};
use crate::error::{Error, Result, Step, StepExt};

impl<R: ToolRunner> BulkCopy<R> {
    /// Load a data file into a table using an existing format file (runs in Tokio runtime).
    ///
    /// Unless `keep_files` is set the format file and data file are deleted
    /// after a successful load.
    pub fn insert(
        &self,
        import_file: &Path,
        format: &FormatDescriptor,
        table: &str,
        options: InsertOptions,
    ) -> Result<()> {
        self.runtime.block_on(self.insert_pipeline(import_file, format, table, options))
    }

    /// Load a finished import file.
    pub fn insert_prepared(&self, prepared: &PreparedImport, options: InsertOptions) -> Result<()> {
        self.insert(&prepared.data_file, &prepared.format, &prepared.table, options)
    }

    /// Generate a format file for `table` and open an import file for the
    /// given columns (runs in Tokio runtime).
    ///
    /// Column names match case-insensitively and take the caller's casing.
    pub fn prepare_insert(
        &self,
        table: &str,
        columns: &[&str],
        options: PrepareOptions,
    ) -> Result<ImportFile> {
        self.runtime.block_on(self.prepare_pipeline(table, columns, options))
    }

    async fn insert_pipeline(
        &self,
        import_file: &Path,
        format: &FormatDescriptor,
        table: &str,
        options: InsertOptions,
    ) -> Result<()> {
        let output = self
            .transfer(table, Mode::In(import_file.to_path_buf()), &format.path)
            .await
            .step(Step::RunTool)?;

        match output.rows_copied() {
            Some(count) => log::info!("Inserted {count} rows into {table}"),
            None => log::warn!("bcp output for {table} had no row count"),
        }

        if !options.keep_files {
            remove_pair(&format.path, import_file)
                .await
                .inspect_err(|err| log::warn!("Failed to remove bcp files for {table}: {err}"))
                .step(Step::Cleanup)?;
        }

        Ok(())
    }

    async fn prepare_pipeline(
        &self,
        table: &str,
        columns: &[&str],
        options: PrepareOptions,
    ) -> Result<ImportFile> {
        let format_file = self.path_or_temp(options.format_file.as_ref(), Artifact::Format);
        let import_file = self.path_or_temp(options.import_file.as_ref(), Artifact::Import);

        ensure_parent_dirs(&[&format_file, &import_file]).await.step(Step::EnsureDirectories)?;

        let format = self.generate_format(table, &format_file).await.step(Step::GenerateFormat)?;

        let qualified = qualify_table(&self.options, table);
        let format = select_columns(format, columns, &qualified).step(Step::MatchColumns)?;

        let encoding = format.encoding;
        ImportFile::create(self.options.clone(), format, table, &import_file, encoding)
            .await
            .step(Step::CreateImportFile)
    }
}

/// Flag the requested columns for import, renamed to the caller's casing.
pub fn select_columns(
    mut format: FormatDescriptor,
    columns: &[&str],
    qualified_table: &str,
) -> Result<FormatDescriptor> {
    for column in columns {
        let field = format.find_field_mut(column).ok_or_else(|| Error::ColumnNotFound {
            column: column.to_string(),
            table: qualified_table.to_string(),
        })?;
        field.name = column.to_string();
        field.in_import = true;
    }
    Ok(format)
}

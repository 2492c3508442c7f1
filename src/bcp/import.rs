//! Data files prepared for `bcp in`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bcp::codec::encode_value;
use crate::bcp::format::{FormatDescriptor, unescape_terminator};
use crate::bcp::reader::terminator_text;
use crate::bcp::types::{FileEncoding, Row, Value};
use crate::config::BcpOptions;
use crate::error::Result;

/// An import data file bound to a finalized format descriptor.
///
/// Rows are written in the descriptor's field order; fields missing from a
/// row are written as NULL.
pub struct ImportFile {
    options: Arc<BcpOptions>,
    format: FormatDescriptor,
    table: String,
    path: PathBuf,
    encoding: FileEncoding,
    terminators: Vec<Vec<u8>>,
    writer: BufWriter<File>,
    rows: u64,
}

/// A finished import file, ready for `BulkCopy::insert`.
#[derive(Clone, Debug)]
pub struct PreparedImport {
    pub table: String,
    pub data_file: PathBuf,
    pub format: FormatDescriptor,
    pub rows: u64,
}

impl ImportFile {
    /// Create the data file at `path`. Rows are written synchronously through
    /// a buffer.
    pub async fn create(
        options: Arc<BcpOptions>,
        format: FormatDescriptor,
        table: &str,
        path: &Path,
        encoding: FileEncoding,
    ) -> Result<Self> {
        let terminators = format
            .import_fields()
            .into_iter()
            .map(|field| match encoding {
                FileEncoding::Char => unescape_terminator(&field.terminator),
                FileEncoding::Unicode => encoding.encode(&terminator_text(field, encoding)),
            })
            .collect();
        let file = tokio::fs::File::create(path).await?.into_std().await;
        let writer = BufWriter::new(file);

        Ok(Self {
            options,
            format,
            table: table.to_string(),
            path: path.to_path_buf(),
            encoding,
            terminators,
            writer,
            rows: 0,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    pub fn options(&self) -> &BcpOptions {
        &self.options
    }

    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Append one row.
    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        for (field, terminator) in self.format.import_fields().into_iter().zip(&self.terminators) {
            let value = row.get(&field.name).unwrap_or(&Value::Null);
            let text = encode_value(value, field);
            self.writer.write_all(&self.encoding.encode(&text))?;
            self.writer.write_all(terminator)?;
        }
        self.rows += 1;
        Ok(())
    }

    /// Flush the data file and write the format file next to it.
    pub fn finish(mut self) -> Result<PreparedImport> {
        self.writer.flush()?;
        self.format.save()?;
        log::debug!("Prepared {} rows for {} in {}", self.rows, self.table, self.path.display());

        Ok(PreparedImport {
            table: self.table,
            data_file: self.path,
            format: self.format,
            rows: self.rows,
        })
    }
}

//! Common test utilities for integration tests.
//!
//! `FakeBcp` stands in for the bcp executable: format runs write a canned
//! format file, `out` runs write a canned data file, and `in` runs capture
//! the data and format files they were given. Every command is recorded.

#![allow(dead_code)]

pub mod fixtures;

use std::path::PathBuf;

use bulkcopy::bcp::{BulkCopy, Mode, ToolCommand, ToolOutput, ToolRunner};
use bulkcopy::{BcpOptions, Error, Result};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Which bcp mode should fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailOn {
    Format,
    Out,
    In,
}

/// What an `in` run was handed.
#[derive(Clone, Debug)]
pub struct CapturedImport {
    pub data: Vec<u8>,
    pub format_xml: String,
}

pub struct FakeBcp {
    pub format_xml: String,
    pub export_data: Vec<u8>,
    pub stdout: String,
    pub fail_on: Option<FailOn>,
    pub calls: Mutex<Vec<ToolCommand>>,
    pub imports: Mutex<Vec<CapturedImport>>,
}

impl FakeBcp {
    pub fn new(format_xml: &str, export_data: &[u8], stdout: &str) -> Self {
        Self {
            format_xml: format_xml.to_string(),
            export_data: export_data.to_vec(),
            stdout: stdout.to_string(),
            fail_on: None,
            calls: Mutex::new(Vec::new()),
            imports: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, fail_on: FailOn) -> Self {
        self.fail_on = Some(fail_on);
        self
    }

    pub fn calls(&self) -> Vec<ToolCommand> {
        self.calls.lock().clone()
    }

    pub fn imports(&self) -> Vec<CapturedImport> {
        self.imports.lock().clone()
    }

    fn failure(&self) -> Error {
        Error::ToolFailed {
            status: "exit status: 1".into(),
            stdout: "SQLState = 08001, NativeError = 2\nError = Unable to connect".into(),
            stderr: String::new(),
        }
    }
}

impl ToolRunner for FakeBcp {
    async fn run(&self, command: &ToolCommand, _timeout_ms: Option<u64>) -> Result<ToolOutput> {
        self.calls.lock().push(command.clone());

        match &command.mode {
            Mode::Format => {
                if self.fail_on == Some(FailOn::Format) {
                    return Err(self.failure());
                }
                std::fs::write(&command.format_file, &self.format_xml)?;
            }
            Mode::Out(path) => {
                if self.fail_on == Some(FailOn::Out) {
                    return Err(self.failure());
                }
                std::fs::write(path, &self.export_data)?;
            }
            Mode::In(path) => {
                if self.fail_on == Some(FailOn::In) {
                    return Err(self.failure());
                }
                let captured = CapturedImport {
                    data: std::fs::read(path)?,
                    format_xml: std::fs::read_to_string(&command.format_file)?,
                };
                self.imports.lock().push(captured);
            }
        }

        Ok(ToolOutput { stdout: self.stdout.clone(), stderr: String::new() })
    }
}

/// A BulkCopy wired to a fake bcp, with temp files under a fresh directory.
pub struct TestBulkCopy {
    pub bulk: BulkCopy<FakeBcp>,
    pub temp_dir: TempDir,
}

impl TestBulkCopy {
    pub fn new(fake: FakeBcp) -> Self {
        Self::with_options(fake, BcpOptions::default())
    }

    pub fn with_options(fake: FakeBcp, options: BcpOptions) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let options = BcpOptions {
            exec_path: Some(PathBuf::from("/opt/mssql-tools18/bin/bcp")),
            temp_dir: Some(temp_dir.path().join("bcp")),
            ..options
        };
        let bulk = BulkCopy::with_runner(options, fake).expect("Failed to create BulkCopy");
        Self { bulk, temp_dir }
    }

    pub fn fake(&self) -> &FakeBcp {
        self.bulk.runner()
    }

    /// Files currently under the temp directory.
    pub fn temp_files(&self) -> Vec<PathBuf> {
        let dir = self.temp_dir.path().join("bcp");
        match std::fs::read_dir(dir) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

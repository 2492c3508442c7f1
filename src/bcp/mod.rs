//! bcp orchestration.
//!
//! This module provides:
//! - `BulkCopy`: bulk export, bulk insert and import preparation
//! - `args`: option → command-line translation
//! - `codec` / `reader`: decoding bcp character output into rows
//! - `format` / `import`: format files and import data files
//! - `runner` / `tools`: locating and running the bcp executable
//! - `temp`: temp artifact paths and cleanup

pub mod args;
pub mod codec;
pub mod format;
pub mod import;
pub mod manager;
pub mod ops;
pub mod reader;
pub mod runner;
pub mod temp;
pub mod tools;
pub mod types;

// Re-export commonly used items at the crate level
pub use args::{Arg, build_arg_list, build_args, qualify_table};
pub use format::FormatDescriptor;
pub use import::{ImportFile, PreparedImport};
pub use manager::BulkCopy;
pub use reader::read_rows;
pub use runner::{Mode, ProcessRunner, ToolCommand, ToolOutput, ToolRunner};
pub use tools::bcp_path;
pub use types::{
    ExportDetails, ExportOptions, Field, FileEncoding, InsertOptions, PrepareOptions, Row,
    TypeTag, Value,
};

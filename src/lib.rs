pub mod bcp;
pub mod config;
pub mod error;

pub use bcp::BulkCopy;
pub use config::BcpOptions;
pub use error::{Error, Result, Step};

//! Bulk operations split into focused modules.

pub mod export;
pub mod insert;

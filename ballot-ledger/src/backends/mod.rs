//! Backing store implementations
//!
//! - `file`: line-delimited text files for real campaigns
//! - `memory`: shared in-memory state with failure injection for tests

pub mod file;
pub mod memory;

pub use file::{FileCheckpoint, FileLedger};
pub use memory::{MemoryCheckpoint, MemoryLedger};

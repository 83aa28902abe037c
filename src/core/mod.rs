//! Core module containing the fundamental types for memscan
//!
//! Everything here is plain data: addresses and ranges in the target's
//! 32-bit address space, the data types a scan can look for, the values it
//! records and the errors it can raise.

pub mod types;

pub use types::{
    Address, ConnectionError, DataType, DataValue, InputError, MemoryError, MemoryRegion,
    MemoryResult, ScanRange, ScanResult,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

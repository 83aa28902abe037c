//! memscan: live memory scanning for remote console targets
//!
//! The engine reads a 32-bit big or little endian address space through a
//! [`Connection`], finds values matching a query, and narrows earlier
//! results with next scans. Scans are chunked, pausable and cancellable.

pub mod config;
pub mod core;
pub mod memory;

// Re-export main types from core module
pub use core::types::{
    Address, CompareSource, ConnectionError, DataType, DataValue, FloatScanOption, InputError,
    MemoryError, MemoryRegion, MemoryResult, NumericScanType, ScanRange, ScanResult,
    StringComparison, StringEncoding,
};

pub use memory::{
    run_next_scan, BusyLock, Connection, FirstScanTask, ImageConnection, ResultCollector, ResultSink,
    ScanContext, ScanHandle, ScanOptions, ScanOutcome, ScanPass,
};

pub use core::{AUTHORS, VERSION};

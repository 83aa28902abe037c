//! Scanning the memory of a remote target
//!
//! This module provides:
//! - The [`connection::Connection`] capability the engine reads through
//! - Endian-aware decoding of numbers, strings and byte patterns
//! - Region discovery and filtering
//! - First scans, next scans and the plain value scanner

pub mod busy;
pub mod codec;
pub mod connection;
pub mod encoding;
pub mod pattern;
pub mod regions;
pub mod scanner;
pub mod sink;

pub use busy::{BusyLock, BusyToken};
pub use connection::{Connection, FreezeOutcome, ImageConnection, TimeoutConnection};
pub use pattern::MemoryPattern;
pub use regions::{RegionFilter, ScanSpan};
pub use scanner::{
    run_next_scan, FirstScanTask, NextScanReport, ResumeCursor, ScanContext, ScanHandle, ScanOptions,
    ScanOutcome, ScanPass,
};
pub use sink::{ResultCollector, ResultSink};

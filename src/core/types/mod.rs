//! Core type definitions for memscan
//!
//! Addresses, ranges, data types and values, scan results, the user-facing
//! comparison modes and the error types shared by every module.

mod address;
mod error;
mod modes;
mod range;
mod scan_result;
mod value;

pub use address::Address;
pub use error::{ConnectionError, InputError, MemoryError, MemoryResult};
pub use modes::{CompareSource, FloatScanOption, NumericScanType, StringComparison, StringEncoding};
pub use range::{MemoryRegion, ScanRange, ADDRESS_SPACE_END};
pub use scan_result::ScanResult;
pub use value::{DataType, DataValue};

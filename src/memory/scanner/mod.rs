//! Value scanning
//!
//! A scan starts from [`ScanOptions`]. [`ScanContext::setup`] validates and
//! compiles them once; a [`FirstScanTask`] then walks the address space in
//! chunks, or [`run_next_scan`] re-tests an earlier result list. The
//! [`value_scanner`] helpers cover simple single-type scans without the
//! chunk overlap machinery.

mod compare;
mod context;
mod driver;
mod expression;
mod next_scan;
mod options;
mod progress;
pub mod value_scanner;

pub use context::{BlockMatches, ContextState, FoundValue, ScanContext, ScanPass};
pub use driver::{FirstScanTask, ResumeCursor, ScanHandle, ScanOutcome, TaskState};
pub use expression::{Expression, Number, ValueEvaluator};
pub use next_scan::{run_next_scan, NextScanReport};
pub use options::{AnyTypeOptions, ScanOptions, DEFAULT_INT_ORDERING};
pub use progress::{format_bytes, ProgressReporter, ScanProgress};
pub use value_scanner::{scan_values, ScanValue, ValueQuery};

//! Error types for the scanning engine

use super::value::DataType;
use std::fmt;
use thiserror::Error;

/// Errors caused by user-supplied scan parameters.
///
/// These are raised while setting up a scan and always mean the scan never
/// started. Each message names the offending field so it can be shown to the
/// user as-is.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("{field} is empty")]
    Empty { field: &'static str },

    #[error("{field} '{text}' is not a valid {data_type} value")]
    Unparseable {
        field: &'static str,
        text: String,
        data_type: DataType,
    },

    #[error("Between bounds are reversed: {low} is greater than {high}")]
    ReversedBounds { low: String, high: String },

    #[error("{field} is too long: {bytes} bytes exceeds the {chunk_size} byte chunk size")]
    TooLong {
        field: &'static str,
        bytes: usize,
        chunk_size: usize,
    },

    #[error("Invalid memory pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Expressions cannot be used with {0} scans")]
    ExpressionUnsupported(DataType),

    #[error("Alignment must be between 1 and {max}, got {value}")]
    InvalidAlignment { value: u32, max: u32 },

    #[error("Chunk size {chunk_size} must be at least 16 bytes and a multiple of the alignment {alignment}")]
    InvalidChunkSize { chunk_size: usize, alignment: u32 },

    #[error("Results contain {found} values but the scan is configured for {expected}")]
    DataTypeMismatch { expected: DataType, found: DataType },

    #[error("No enabled data type accepts input '{0}'")]
    NoCandidateType(String),

    #[error("Invalid scan range: {0}")]
    InvalidRange(String),

    #[error("{0} needs literal bounds and cannot compare against first or previous values")]
    BoundsFromHistory(super::NumericScanType),
}

impl InputError {
    /// Creates an unparseable-input error
    pub fn unparseable(field: &'static str, text: impl Into<String>, data_type: DataType) -> Self {
        InputError::Unparseable {
            field,
            text: text.into(),
            data_type,
        }
    }

    /// Creates a reversed-bounds error
    pub fn reversed_bounds(low: impl fmt::Display, high: impl fmt::Display) -> Self {
        InputError::ReversedBounds {
            low: low.to_string(),
            high: high.to_string(),
        }
    }

    /// Creates an input-too-long error
    pub fn too_long(field: &'static str, bytes: usize, chunk_size: usize) -> Self {
        InputError::TooLong {
            field,
            bytes,
            chunk_size,
        }
    }
}

/// Failures reported by the connection to the target.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Connection is closed")]
    Closed,
}

impl ConnectionError {
    /// Creates an I/O error
    pub fn io(reason: impl Into<String>) -> Self {
        ConnectionError::Io(reason.into())
    }

    /// Creates a timeout error
    pub fn timeout(reason: impl Into<String>) -> Self {
        ConnectionError::Timeout(reason.into())
    }

    /// True when the transport gave up waiting rather than failing outright
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConnectionError::Timeout(_))
    }
}

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("Invalid range: start {start} with length {length} overflows the address space")]
    InvalidRange { start: String, length: u64 },

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Scan was cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for engine operations
pub type MemoryResult<T> = Result<T, MemoryError>;

impl MemoryError {
    /// Creates a range overflow error
    pub fn invalid_range(start: impl fmt::Display, length: u64) -> Self {
        MemoryError::InvalidRange {
            start: start.to_string(),
            length,
        }
    }
}

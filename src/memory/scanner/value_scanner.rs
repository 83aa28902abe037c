//! Plain single-type scanner
//!
//! Reads a flat range in fixed 64 KiB chunks and tests every byte offset
//! whose value fits inside the bytes read. No overlap is carried between
//! chunks, so values straddling a chunk boundary are not seen. Useful as a
//! reference to check the context against, and for quick scans that do not
//! need pausing.

use super::compare::{compare_float, compare_int};
use crate::core::types::{Address, ConnectionError, DataValue, NumericScanType, ScanRange, ScanResult};
use crate::memory::busy::BusyToken;
use crate::memory::codec::Numeric;
use crate::memory::connection::Connection;
use tracing::debug;

/// Bytes fetched per read
pub const VALUE_SCAN_CHUNK: usize = 64 * 1024;

/// A number the value scanner can search for
pub trait ScanValue: Numeric {
    /// Applies `scan_type` with bounds `a` and `b`; floats use `epsilon`
    fn matches(self, scan_type: NumericScanType, a: Self, b: Self, epsilon: f64) -> bool;

    fn into_value(self) -> DataValue;
}

macro_rules! impl_scan_int {
    ($($t:ty => $variant:ident as $stored:ty),* $(,)?) => {
        $(
            impl ScanValue for $t {
                #[inline]
                fn matches(self, scan_type: NumericScanType, a: Self, b: Self, _epsilon: f64) -> bool {
                    compare_int(self, scan_type, a, b)
                }

                fn into_value(self) -> DataValue {
                    DataValue::$variant(self as $stored)
                }
            }
        )*
    };
}

impl_scan_int!(
    u8 => Byte as u8,
    i16 => Int16 as i16,
    u16 => Int16 as i16,
    i32 => Int32 as i32,
    u32 => Int32 as i32,
    i64 => Int64 as i64,
    u64 => Int64 as i64,
);

impl ScanValue for f32 {
    fn matches(self, scan_type: NumericScanType, a: Self, b: Self, epsilon: f64) -> bool {
        compare_float(self.to_f64(), scan_type, a.to_f64(), b.to_f64(), epsilon)
    }

    fn into_value(self) -> DataValue {
        DataValue::Float(self)
    }
}

impl ScanValue for f64 {
    fn matches(self, scan_type: NumericScanType, a: Self, b: Self, epsilon: f64) -> bool {
        compare_float(self, scan_type, a, b, epsilon)
    }

    fn into_value(self) -> DataValue {
        DataValue::Double(self)
    }
}

/// Comparison applied by [`scan_values`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueQuery<T> {
    pub scan_type: NumericScanType,
    pub a: T,
    /// Upper bound; only read by Between and NotBetween
    pub b: T,
    pub epsilon: f64,
}

impl<T: ScanValue> ValueQuery<T> {
    pub fn new(scan_type: NumericScanType, a: T) -> Self {
        ValueQuery {
            scan_type,
            a,
            b: a,
            epsilon: 1e-6,
        }
    }

    pub fn between(low: T, high: T) -> Self {
        ValueQuery {
            scan_type: NumericScanType::Between,
            a: low,
            b: high,
            epsilon: 1e-6,
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// Scans `range` for values of type `T`, appending matches to `results`.
///
/// The caller proves exclusive use of the connection by passing its busy
/// token. Returns the number of matches appended. A read error stops the
/// scan; matches found before it stay in `results`.
pub async fn scan_values<T: ScanValue>(
    conn: &dyn Connection,
    _busy: &BusyToken,
    range: &ScanRange,
    query: ValueQuery<T>,
    results: &mut Vec<ScanResult>,
) -> Result<usize, ConnectionError> {
    let little_endian = conn.is_little_endian();
    let before = results.len();
    let mut buffer = vec![0u8; VALUE_SCAN_CHUNK];
    let mut address = range.start().as_u64();

    while address < range.end() {
        let want = (range.end() - address).min(VALUE_SCAN_CHUNK as u64) as usize;
        let base = Address::new(address as u32);
        let read = conn.read_bytes(base, &mut buffer, 0, want).await?.min(want);

        let mut offset = 0;
        while offset + T::SIZE <= read {
            let value = T::read(&buffer[offset..], little_endian);
            if value.matches(query.scan_type, query.a, query.b, query.epsilon) {
                results.push(ScanResult::new(base.add(offset as u32), value.into_value()));
            }
            offset += 1;
        }

        address += want as u64;
    }

    let found = results.len() - before;
    debug!(start = %range.start(), length = range.length(), found, "value scan finished");
    Ok(found)
}

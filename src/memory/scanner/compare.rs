//! Input parsing and per-type comparison
//!
//! Integer inputs are kept as raw 64-bit patterns and narrowed to the data
//! type's own width before comparing, so there is never any promotion past
//! 64 bits. Float inputs are parsed at double precision and compared on an
//! f64 projection of the read value.

use super::expression::Number;
use crate::core::types::{DataType, DataValue, FloatScanOption, InputError, NumericScanType};
use crate::memory::codec::{self, Integer, Numeric};

/// Decimal places used when a next scan compares floats against recorded
/// values instead of user text
pub const HISTORY_DECIMALS: u32 = 6;

/// A parsed numeric input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// Raw integer bits, zero-extended
    Int(u64),
    Float(f64),
}

impl Bound {
    pub fn int_bits(&self) -> u64 {
        match self {
            Bound::Int(bits) => *bits,
            Bound::Float(v) => v.to_bits(),
        }
    }

    pub fn float(&self) -> f64 {
        match self {
            Bound::Float(v) => *v,
            Bound::Int(bits) => *bits as f64,
        }
    }
}

/// Parses `text` as an input for `data_type`.
///
/// With `hex` set, integers are read as hexadecimal (two's complement for
/// signed types) and floats as raw IEEE bit patterns.
pub fn parse_numeric(
    field: &'static str,
    text: &str,
    data_type: DataType,
    hex: bool,
    unsigned: bool,
) -> Result<Bound, InputError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(InputError::Empty { field });
    }

    let invalid = || InputError::unparseable(field, text, data_type);
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);

    macro_rules! int {
        ($signed:ty, $unsigned:ty) => {
            if hex {
                <$unsigned>::from_str_radix(digits, 16).map(|v| v as u64)
            } else if unsigned {
                text.parse::<$unsigned>().map(|v| v as u64)
            } else {
                text.parse::<$signed>().map(|v| v as $unsigned as u64)
            }
        };
    }

    let bound = match data_type {
        DataType::Byte => {
            let parsed = if hex {
                u8::from_str_radix(digits, 16)
            } else {
                text.parse::<u8>()
            };
            Bound::Int(parsed.map_err(|_| invalid())? as u64)
        }
        DataType::Int16 => Bound::Int(int!(i16, u16).map_err(|_| invalid())?),
        DataType::Int32 => Bound::Int(int!(i32, u32).map_err(|_| invalid())?),
        DataType::Int64 => Bound::Int(int!(i64, u64).map_err(|_| invalid())?),
        DataType::Float if hex => {
            let bits = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
            Bound::Float(f32::from_bits(bits) as f64)
        }
        DataType::Float => {
            let value = text.parse::<f64>().map_err(|_| invalid())?;
            if !value.is_finite() || value < f32::MIN as f64 || value > f32::MAX as f64 {
                return Err(invalid());
            }
            Bound::Float(value)
        }
        DataType::Double if hex => {
            let bits = u64::from_str_radix(digits, 16).map_err(|_| invalid())?;
            Bound::Float(f64::from_bits(bits))
        }
        DataType::Double => {
            let value = text.parse::<f64>().map_err(|_| invalid())?;
            if !value.is_finite() {
                return Err(invalid());
            }
            Bound::Float(value)
        }
        DataType::String | DataType::ByteArray => {
            panic!("{} inputs are not numeric", data_type)
        }
    };

    Ok(bound)
}

/// True when `low > high` in the comparison domain of `data_type`
pub fn is_reversed(data_type: DataType, unsigned: bool, low: Bound, high: Bound) -> bool {
    fn gt<T: Integer>(a: u64, b: u64) -> bool {
        T::from_bits(a) > T::from_bits(b)
    }

    match (data_type, unsigned) {
        (DataType::Byte, _) => gt::<u8>(low.int_bits(), high.int_bits()),
        (DataType::Int16, false) => gt::<i16>(low.int_bits(), high.int_bits()),
        (DataType::Int16, true) => gt::<u16>(low.int_bits(), high.int_bits()),
        (DataType::Int32, false) => gt::<i32>(low.int_bits(), high.int_bits()),
        (DataType::Int32, true) => gt::<u32>(low.int_bits(), high.int_bits()),
        (DataType::Int64, false) => gt::<i64>(low.int_bits(), high.int_bits()),
        (DataType::Int64, true) => gt::<u64>(low.int_bits(), high.int_bits()),
        (DataType::Float | DataType::Double, _) => low.float() > high.float(),
        (DataType::String | DataType::ByteArray, _) => false,
    }
}

/// Applies `scan_type` to an integer in its own width
pub fn compare_int<T: Integer>(value: T, scan_type: NumericScanType, a: T, b: T) -> bool {
    match scan_type {
        NumericScanType::Equals => value == a,
        NumericScanType::NotEquals => value != a,
        NumericScanType::LessThan => value < a,
        NumericScanType::LessThanOrEquals => value <= a,
        NumericScanType::GreaterThan => value > a,
        NumericScanType::GreaterThanOrEquals => value >= a,
        NumericScanType::Between => value >= a && value <= b,
        NumericScanType::NotBetween => value < a || value > b,
    }
}

/// Applies `scan_type` to a projected float; equality is epsilon based
pub fn compare_float(value: f64, scan_type: NumericScanType, a: f64, b: f64, epsilon: f64) -> bool {
    match scan_type {
        NumericScanType::Equals => (value - a).abs() < epsilon,
        NumericScanType::NotEquals => !((value - a).abs() < epsilon),
        NumericScanType::LessThan => value < a,
        NumericScanType::LessThanOrEquals => value <= a,
        NumericScanType::GreaterThan => value > a,
        NumericScanType::GreaterThanOrEquals => value >= a,
        NumericScanType::Between => value >= a && value <= b,
        NumericScanType::NotBetween => value < a || value > b,
    }
}

/// Number of digits after the decimal point in `text`.
///
/// Text without a point, or ending in one, has zero decimals.
pub fn decimal_places(text: &str) -> u32 {
    let text = text.trim();
    match text.find('.') {
        Some(idx) => (text.len() - (idx + 1)) as u32,
        None => 0,
    }
}

pub fn truncate_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).trunc() / factor
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round_ties_even() / factor
}

/// Reconciles a read float with the precision of the query
pub fn project_float(value: f64, option: FloatScanOption, decimals: u32) -> f64 {
    match option {
        FloatScanOption::ExactValue => value,
        FloatScanOption::TruncateToQueryPrecision => truncate_to(value, decimals),
        FloatScanOption::RoundToQueryPrecision => round_to(value, decimals),
    }
}

/// A fully parsed float comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatQuery {
    pub scan_type: NumericScanType,
    pub a: f64,
    pub b: f64,
    pub option: FloatScanOption,
    pub decimals: u32,
    pub epsilon: f64,
}

impl FloatQuery {
    pub fn matches(&self, value: f64) -> bool {
        let projected = project_float(value, self.option, self.decimals);
        compare_float(projected, self.scan_type, self.a, self.b, self.epsilon)
    }
}

/// A fully parsed integer comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntQuery {
    pub scan_type: NumericScanType,
    pub a: u64,
    pub b: u64,
    pub unsigned: bool,
}

fn matched_int<T: Integer>(bytes: &[u8], little_endian: bool, query: &IntQuery) -> Option<T> {
    let value: T = codec::read(bytes, little_endian);
    compare_int(value, query.scan_type, T::from_bits(query.a), T::from_bits(query.b)).then_some(value)
}

/// Reads an integer of `data_type` from `bytes` and returns it if it matches
pub fn match_integer(
    data_type: DataType,
    bytes: &[u8],
    little_endian: bool,
    query: &IntQuery,
) -> Option<DataValue> {
    match (data_type, query.unsigned) {
        (DataType::Byte, _) => matched_int::<u8>(bytes, little_endian, query).map(DataValue::Byte),
        (DataType::Int16, false) => matched_int::<i16>(bytes, little_endian, query).map(DataValue::Int16),
        (DataType::Int16, true) => {
            matched_int::<u16>(bytes, little_endian, query).map(|v| DataValue::Int16(v as i16))
        }
        (DataType::Int32, false) => matched_int::<i32>(bytes, little_endian, query).map(DataValue::Int32),
        (DataType::Int32, true) => {
            matched_int::<u32>(bytes, little_endian, query).map(|v| DataValue::Int32(v as i32))
        }
        (DataType::Int64, false) => matched_int::<i64>(bytes, little_endian, query).map(DataValue::Int64),
        (DataType::Int64, true) => {
            matched_int::<u64>(bytes, little_endian, query).map(|v| DataValue::Int64(v as i64))
        }
        _ => panic!("{} is not an integer type", data_type),
    }
}

fn read_float<T: Numeric>(bytes: &[u8], little_endian: bool) -> T {
    codec::read(bytes, little_endian)
}

/// Reads a float of `data_type` from `bytes` and returns it if it matches
pub fn match_float(
    data_type: DataType,
    bytes: &[u8],
    little_endian: bool,
    query: &FloatQuery,
) -> Option<DataValue> {
    match data_type {
        DataType::Float => {
            let value: f32 = read_float(bytes, little_endian);
            query.matches(value.to_f64()).then_some(DataValue::Float(value))
        }
        DataType::Double => {
            let value: f64 = read_float(bytes, little_endian);
            query.matches(value).then_some(DataValue::Double(value))
        }
        _ => panic!("{} is not a float type", data_type),
    }
}

/// Converts a recorded value to an expression operand
pub fn to_number(value: &DataValue, unsigned: bool) -> Option<Number> {
    let number = match value {
        DataValue::Byte(v) => Number::Int(*v as i128),
        DataValue::Int16(v) if unsigned => Number::Int(*v as u16 as i128),
        DataValue::Int16(v) => Number::Int(*v as i128),
        DataValue::Int32(v) if unsigned => Number::Int(*v as u32 as i128),
        DataValue::Int32(v) => Number::Int(*v as i128),
        DataValue::Int64(v) if unsigned => Number::Int(*v as u64 as i128),
        DataValue::Int64(v) => Number::Int(*v as i128),
        DataValue::Float(v) => Number::Float(*v as f64),
        DataValue::Double(v) => Number::Float(*v),
        DataValue::String(_) | DataValue::ByteArray(_) => return None,
    };
    Some(number)
}

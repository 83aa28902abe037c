//! Data types and the values read for them

use crate::memory::codec::{self, Numeric};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of value a scan is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Byte,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    String,
    ByteArray,
}

impl DataType {
    /// Every type, in declaration order
    pub const ALL: [DataType; 8] = [
        DataType::Byte,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::Float,
        DataType::Double,
        DataType::String,
        DataType::ByteArray,
    ];

    /// Size in bytes for fixed-width types.
    ///
    /// Strings and byte arrays have no intrinsic size: their width comes from
    /// the search term or pattern.
    pub const fn size(&self) -> Option<usize> {
        match self {
            DataType::Byte => Some(1),
            DataType::Int16 => Some(2),
            DataType::Int32 | DataType::Float => Some(4),
            DataType::Int64 | DataType::Double => Some(8),
            DataType::String | DataType::ByteArray => None,
        }
    }

    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Byte | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, DataType::Float | DataType::Double)
    }

    pub const fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Lowercase name used in config files and on the command line
    pub const fn name(&self) -> &'static str {
        match self {
            DataType::Byte => "byte",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::String => "string",
            DataType::ByteArray => "bytearray",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "byte" | "u8" => Ok(DataType::Byte),
            "int16" | "i16" | "short" => Ok(DataType::Int16),
            "int32" | "i32" | "int" => Ok(DataType::Int32),
            "int64" | "i64" | "long" => Ok(DataType::Int64),
            "float" | "f32" => Ok(DataType::Float),
            "double" | "f64" => Ok(DataType::Double),
            "string" | "str" => Ok(DataType::String),
            "bytearray" | "bytes" | "aob" => Ok(DataType::ByteArray),
            other => Err(format!("unknown data type '{}'", other)),
        }
    }
}

/// A value read from the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum DataValue {
    Byte(u8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    ByteArray(Vec<u8>),
}

impl DataValue {
    /// Returns the data type of this value
    pub fn data_type(&self) -> DataType {
        match self {
            DataValue::Byte(_) => DataType::Byte,
            DataValue::Int16(_) => DataType::Int16,
            DataValue::Int32(_) => DataType::Int32,
            DataValue::Int64(_) => DataType::Int64,
            DataValue::Float(_) => DataType::Float,
            DataValue::Double(_) => DataType::Double,
            DataValue::String(_) => DataType::String,
            DataValue::ByteArray(_) => DataType::ByteArray,
        }
    }

    /// Decodes a fixed-width numeric value from the front of `bytes`.
    ///
    /// Returns `None` for strings and byte arrays, which need an encoding or
    /// explicit length to decode.
    pub fn read_numeric(data_type: DataType, bytes: &[u8], little_endian: bool) -> Option<Self> {
        let value = match data_type {
            DataType::Byte => DataValue::Byte(codec::read(bytes, little_endian)),
            DataType::Int16 => DataValue::Int16(codec::read(bytes, little_endian)),
            DataType::Int32 => DataValue::Int32(codec::read(bytes, little_endian)),
            DataType::Int64 => DataValue::Int64(codec::read(bytes, little_endian)),
            DataType::Float => DataValue::Float(codec::read(bytes, little_endian)),
            DataType::Double => DataValue::Double(codec::read(bytes, little_endian)),
            DataType::String | DataType::ByteArray => return None,
        };
        Some(value)
    }

    /// Converts the value to target-order bytes.
    ///
    /// Strings are returned as UTF-8; callers that need a specific target
    /// encoding go through [`crate::memory::encoding`].
    pub fn to_bytes(&self, little_endian: bool) -> Vec<u8> {
        fn numeric<T: Numeric>(value: T, little_endian: bool) -> Vec<u8> {
            let mut out = vec![0u8; T::SIZE];
            value.write(&mut out, little_endian);
            out
        }

        match self {
            DataValue::Byte(v) => vec![*v],
            DataValue::Int16(v) => numeric(*v, little_endian),
            DataValue::Int32(v) => numeric(*v, little_endian),
            DataValue::Int64(v) => numeric(*v, little_endian),
            DataValue::Float(v) => numeric(*v, little_endian),
            DataValue::Double(v) => numeric(*v, little_endian),
            DataValue::String(s) => s.as_bytes().to_vec(),
            DataValue::ByteArray(b) => b.clone(),
        }
    }

    /// Projects numeric values onto f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Byte(v) => Some(*v as f64),
            DataValue::Int16(v) => Some(*v as f64),
            DataValue::Int32(v) => Some(*v as f64),
            DataValue::Int64(v) => Some(*v as f64),
            DataValue::Float(v) => Some(*v as f64),
            DataValue::Double(v) => Some(*v),
            DataValue::String(_) | DataValue::ByteArray(_) => None,
        }
    }

    /// Raw integer bits zero-extended to 64 bits
    pub fn integer_bits(&self) -> Option<u64> {
        match self {
            DataValue::Byte(v) => Some(*v as u64),
            DataValue::Int16(v) => Some(*v as u16 as u64),
            DataValue::Int32(v) => Some(*v as u32 as u64),
            DataValue::Int64(v) => Some(*v as u64),
            _ => None,
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Byte(v) => write!(f, "{}", v),
            DataValue::Int16(v) => write!(f, "{}", v),
            DataValue::Int32(v) => write!(f, "{}", v),
            DataValue::Int64(v) => write!(f, "{}", v),
            DataValue::Float(v) => write!(f, "{}", v),
            DataValue::Double(v) => write!(f, "{}", v),
            DataValue::String(s) => write!(f, "\"{}\"", s),
            DataValue::ByteArray(b) => {
                let hex: Vec<String> = b.iter().map(|byte| format!("{:02X}", byte)).collect();
                write!(f, "{}", hex.join(" "))
            }
        }
    }
}

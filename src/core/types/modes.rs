//! Comparison operators and decoding policies selected by the user

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric comparison applied to each candidate value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericScanType {
    #[default]
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    Between,
    NotBetween,
}

impl NumericScanType {
    /// Between and NotBetween take a second, upper bound
    pub fn requires_second_input(&self) -> bool {
        matches!(self, NumericScanType::Between | NumericScanType::NotBetween)
    }
}

impl FromStr for NumericScanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eq" | "==" | "equals" => Ok(NumericScanType::Equals),
            "ne" | "!=" | "not_equals" => Ok(NumericScanType::NotEquals),
            "lt" | "<" | "less_than" => Ok(NumericScanType::LessThan),
            "le" | "<=" | "less_than_or_equals" => Ok(NumericScanType::LessThanOrEquals),
            "gt" | ">" | "greater_than" => Ok(NumericScanType::GreaterThan),
            "ge" | ">=" | "greater_than_or_equals" => Ok(NumericScanType::GreaterThanOrEquals),
            "between" => Ok(NumericScanType::Between),
            "not_between" | "not-between" => Ok(NumericScanType::NotBetween),
            other => Err(format!("unknown comparison '{}'", other)),
        }
    }
}

impl fmt::Display for NumericScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NumericScanType::Equals => "==",
            NumericScanType::NotEquals => "!=",
            NumericScanType::LessThan => "<",
            NumericScanType::LessThanOrEquals => "<=",
            NumericScanType::GreaterThan => ">",
            NumericScanType::GreaterThanOrEquals => ">=",
            NumericScanType::Between => "between",
            NumericScanType::NotBetween => "not between",
        };
        f.write_str(s)
    }
}

/// How a read float is reconciled with the decimal text the user typed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloatScanOption {
    /// Compare the value as read
    ExactValue,
    /// Truncate the read value to as many decimals as the input has
    #[default]
    TruncateToQueryPrecision,
    /// Round the read value to as many decimals as the input has
    RoundToQueryPrecision,
}

/// Text encoding used for string scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringEncoding {
    #[default]
    Ascii,
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

impl StringEncoding {
    /// Bytes per code unit
    pub const fn unit_size(&self) -> usize {
        match self {
            StringEncoding::Ascii | StringEncoding::Utf8 => 1,
            StringEncoding::Utf16Le | StringEncoding::Utf16Be => 2,
            StringEncoding::Utf32Le | StringEncoding::Utf32Be => 4,
        }
    }
}

impl FromStr for StringEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "ascii" => Ok(StringEncoding::Ascii),
            "utf8" => Ok(StringEncoding::Utf8),
            "utf16le" => Ok(StringEncoding::Utf16Le),
            "utf16be" | "utf16" => Ok(StringEncoding::Utf16Be),
            "utf32le" => Ok(StringEncoding::Utf32Le),
            "utf32be" | "utf32" => Ok(StringEncoding::Utf32Be),
            other => Err(format!("unknown string encoding '{}'", other)),
        }
    }
}

/// Case handling when comparing decoded strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringComparison {
    #[default]
    CaseSensitive,
    IgnoreCase,
}

/// What a next scan compares each re-read value against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareSource {
    /// The literal input(s)
    #[default]
    Input,
    /// The value recorded when the address was first found
    FirstValue,
    /// The value recorded by the last pass
    PreviousValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_type_parsing() {
        assert_eq!("eq".parse::<NumericScanType>().unwrap(), NumericScanType::Equals);
        assert_eq!(">=".parse::<NumericScanType>().unwrap(), NumericScanType::GreaterThanOrEquals);
        assert_eq!(
            "not-between".parse::<NumericScanType>().unwrap(),
            NumericScanType::NotBetween
        );
        assert!("around".parse::<NumericScanType>().is_err());
    }

    #[test]
    fn test_requires_second_input() {
        assert!(NumericScanType::Between.requires_second_input());
        assert!(NumericScanType::NotBetween.requires_second_input());
        assert!(!NumericScanType::LessThan.requires_second_input());
    }

    #[test]
    fn test_encoding_parsing() {
        assert_eq!("UTF-16LE".parse::<StringEncoding>().unwrap(), StringEncoding::Utf16Le);
        assert_eq!("utf32".parse::<StringEncoding>().unwrap(), StringEncoding::Utf32Be);
        assert_eq!(StringEncoding::Utf32Le.unit_size(), 4);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&FloatScanOption::RoundToQueryPrecision).unwrap();
        assert_eq!(json, "\"round_to_query_precision\"");
        let json = serde_json::to_string(&CompareSource::PreviousValue).unwrap();
        assert_eq!(json, "\"previous_value\"");
    }
}

//! 32-bit target address wrapper with hex parsing

use super::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An address in the target's 32-bit address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address(pub u32);

impl Address {
    /// Creates a new address
    pub const fn new(value: u32) -> Self {
        Address(value)
    }

    /// Creates a null address (0x0)
    pub const fn null() -> Self {
        Address(0)
    }

    /// Checks if the address is null
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the address is aligned to the specified boundary
    pub const fn is_aligned(&self, alignment: u32) -> bool {
        alignment != 0 && self.0 % alignment == 0
    }

    /// Adds a byte offset, returning `None` past the top of the address space
    pub fn checked_add(&self, offset: u32) -> Option<Self> {
        self.0.checked_add(offset).map(Address)
    }

    /// Adds a byte offset, panicking on overflow
    pub fn add(&self, offset: u32) -> Self {
        Address(self.0 + offset)
    }

    /// Returns the raw value
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns the raw value widened for end-of-range arithmetic
    pub const fn as_u64(&self) -> u64 {
        self.0 as u64
    }
}

impl FromStr for Address {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let value = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            u32::from_str_radix(hex, 16)
        } else if let Some(hex) = s.strip_prefix('$') {
            u32::from_str_radix(hex, 16)
        } else if s.chars().any(|c| c.is_ascii_alphabetic()) {
            u32::from_str_radix(s, 16)
        } else {
            s.parse::<u32>().or_else(|_| u32::from_str_radix(s, 16))
        };

        value
            .map(Address::new)
            .map_err(|_| MemoryError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<u32> for Address {
    fn from(value: u32) -> Self {
        Address::new(value)
    }
}

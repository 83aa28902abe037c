//! Address ranges and target-reported memory regions

use super::address::Address;
use super::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};

/// Exclusive upper bound of the 32-bit address space
pub const ADDRESS_SPACE_END: u64 = 1 << 32;

/// A contiguous range of target addresses to scan.
///
/// The end is exclusive and never exceeds the top of the address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRange {
    start: Address,
    length: u32,
}

impl ScanRange {
    /// Creates a range, rejecting ranges that run past the address space
    pub fn new(start: Address, length: u32) -> MemoryResult<Self> {
        if start.as_u64() + length as u64 > ADDRESS_SPACE_END {
            return Err(MemoryError::invalid_range(start, length as u64));
        }
        Ok(ScanRange { start, length })
    }

    pub const fn start(&self) -> Address {
        self.start
    }

    pub const fn length(&self) -> u32 {
        self.length
    }

    /// Exclusive end address
    pub const fn end(&self) -> u64 {
        self.start.as_u64() + self.length as u64
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn contains(&self, address: Address) -> bool {
        address >= self.start && address.as_u64() < self.end()
    }

    /// Part of `region` that lies inside this range, as `(start, end)` with
    /// an exclusive end
    pub fn intersect(&self, region: &MemoryRegion) -> Option<(Address, u64)> {
        if self.end() > region.base_address.as_u64() && self.start.as_u64() < region.end() {
            let start = self.start.max(region.base_address);
            let end = self.end().min(region.end());
            Some((start, end))
        } else {
            None
        }
    }
}

/// A backed memory region reported by the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub base_address: Address,
    pub size: u32,
    pub protection: u32,
}

impl MemoryRegion {
    pub fn new(base_address: Address, size: u32, protection: u32) -> Self {
        MemoryRegion {
            base_address,
            size,
            protection,
        }
    }

    /// Exclusive end address
    pub fn end(&self) -> u64 {
        self.base_address.as_u64() + self.size as u64
    }

    pub fn contains(&self, address: Address) -> bool {
        address >= self.base_address && address.as_u64() < self.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_end_and_overflow() {
        let range = ScanRange::new(Address::new(0x8000_0000), 0x1000).unwrap();
        assert_eq!(range.end(), 0x8000_1000);
        assert!(range.contains(Address::new(0x8000_0FFF)));
        assert!(!range.contains(Address::new(0x8000_1000)));

        let top = ScanRange::new(Address::new(0xFFFF_0000), 0x1_0000).unwrap();
        assert_eq!(top.end(), ADDRESS_SPACE_END);

        assert!(ScanRange::new(Address::new(0xFFFF_0000), 0x1_0001).is_err());
    }

    #[test]
    fn test_intersection_uses_exclusive_ends() {
        let range = ScanRange::new(Address::new(0x1000), 0x1000).unwrap();

        let before = MemoryRegion::new(Address::new(0x0800), 0x800, 4);
        assert_eq!(range.intersect(&before), None);

        let after = MemoryRegion::new(Address::new(0x2000), 0x100, 4);
        assert_eq!(range.intersect(&after), None);

        let straddle = MemoryRegion::new(Address::new(0x1800), 0x1000, 4);
        assert_eq!(range.intersect(&straddle), Some((Address::new(0x1800), 0x2000)));

        let enclosing = MemoryRegion::new(Address::new(0x0), 0x10000, 4);
        assert_eq!(range.intersect(&enclosing), Some((Address::new(0x1000), 0x2000)));
    }
}

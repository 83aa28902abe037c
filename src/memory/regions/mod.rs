//! Target memory regions
//!
//! Region-aware scans only read memory the target reports as backed. The
//! reported list is filtered, then clipped to the scan range.

pub mod filter;

pub use filter::{FilterCriteria, RegionFilter, DEFAULT_SKIP_PROTECTIONS};

use crate::core::types::{Address, MemoryRegion, ScanRange, ADDRESS_SPACE_END};
use serde::{Deserialize, Serialize};

/// A stretch of addresses the driver walks chunk by chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSpan {
    pub start: Address,
    /// Exclusive end of the addresses tested
    pub end: u64,
    /// Exclusive end of readable memory; overlap reads stop here
    pub limit: u64,
}

impl ScanSpan {
    /// The whole scan range, read without regard to backing
    pub fn flat(range: &ScanRange) -> Self {
        ScanSpan {
            start: range.start(),
            end: range.end(),
            limit: ADDRESS_SPACE_END,
        }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start.as_u64()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Clips `regions` to `range`, dropping those rejected by `filter` and those
/// that do not intersect at all. Spans come back in ascending address order.
pub fn intersect_regions(range: &ScanRange, regions: &[MemoryRegion], filter: &RegionFilter) -> Vec<ScanSpan> {
    let mut spans: Vec<ScanSpan> = regions
        .iter()
        .filter(|region| region.size > 0 && filter.matches(region))
        .filter_map(|region| {
            range.intersect(region).map(|(start, end)| ScanSpan {
                start,
                end,
                limit: region.end(),
            })
        })
        .filter(|span| !span.is_empty())
        .collect();
    spans.sort_by_key(|span| span.start);
    spans
}

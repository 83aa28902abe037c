//! Memory region filtering

use crate::core::types::MemoryRegion;
use serde::{Deserialize, Serialize};

/// Protection flags of regions that hang the target when read
pub const DEFAULT_SKIP_PROTECTIONS: [u32; 1] = [0x240];

/// Criteria for filtering memory regions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Filter by minimum size
    pub min_size: Option<u32>,
    /// Filter by maximum size
    pub max_size: Option<u32>,
    /// Protection values that are never scanned
    pub exclude_protections: Vec<u32>,
}

impl FilterCriteria {
    /// Create a new filter criteria builder
    pub fn new() -> Self {
        FilterCriteria::default()
    }

    /// Set minimum size filter
    pub fn with_min_size(mut self, size: u32) -> Self {
        self.min_size = Some(size);
        self
    }

    /// Set maximum size filter
    pub fn with_max_size(mut self, size: u32) -> Self {
        self.max_size = Some(size);
        self
    }

    /// Skip regions whose protection equals `protection`
    pub fn excluding_protection(mut self, protection: u32) -> Self {
        if !self.exclude_protections.contains(&protection) {
            self.exclude_protections.push(protection);
        }
        self
    }
}

/// Filter for memory regions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionFilter {
    criteria: FilterCriteria,
}

impl RegionFilter {
    /// Create a new region filter with the given criteria
    pub fn new(criteria: FilterCriteria) -> Self {
        RegionFilter { criteria }
    }

    /// Filter that drops the protections known to stall the target
    pub fn console_default() -> Self {
        let criteria = DEFAULT_SKIP_PROTECTIONS
            .iter()
            .fold(FilterCriteria::new(), |c, &p| c.excluding_protection(p));
        RegionFilter::new(criteria)
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Apply the filter to a list of regions
    pub fn apply(&self, regions: &[MemoryRegion]) -> Vec<MemoryRegion> {
        regions
            .iter()
            .filter(|region| self.matches(region))
            .copied()
            .collect()
    }

    /// Check if a region matches the filter criteria
    pub fn matches(&self, region: &MemoryRegion) -> bool {
        if let Some(min) = self.criteria.min_size {
            if region.size < min {
                return false;
            }
        }

        if let Some(max) = self.criteria.max_size {
            if region.size > max {
                return false;
            }
        }

        !self.criteria.exclude_protections.contains(&region.protection)
    }
}

//! Scan result type

use super::{Address, DataType, DataValue};
use serde::{Deserialize, Serialize};

/// An address that matched a scan, with the history needed for next scans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub address: Address,
    pub data_type: DataType,
    /// Value seen by the most recent pass
    pub current: DataValue,
    /// Value seen by the pass before that
    pub previous: DataValue,
    /// Value seen when the address was first found
    pub first: DataValue,
}

impl ScanResult {
    /// Creates a result from a first-scan match
    pub fn new(address: Address, value: DataValue) -> Self {
        ScanResult {
            address,
            data_type: value.data_type(),
            current: value.clone(),
            previous: value.clone(),
            first: value,
        }
    }

    /// Records a value re-read by a next scan
    pub fn update(&mut self, value: DataValue) {
        self.previous = std::mem::replace(&mut self.current, value);
    }
}

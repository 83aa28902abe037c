//! Where scan events go
//!
//! The engine does not own result lists. First scans report each match
//! through [`ResultSink::on_match`]; next scans report the new value of each
//! result that still matches through [`ResultSink::on_result_updated`].

use crate::core::types::{Address, DataType, DataValue, ScanResult};

/// Receiver of scan events
pub trait ResultSink: Send {
    fn on_match(&mut self, address: Address, data_type: DataType, value: DataValue);

    fn on_result_updated(&mut self, _result: &ScanResult, _new_value: &DataValue) {}
}

/// Sink that keeps every first-scan match in order
#[derive(Debug, Default, Clone)]
pub struct ResultCollector {
    pub results: Vec<ScanResult>,
    pub updates: usize,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.results.iter().map(|r| r.address).collect()
    }

    pub fn into_results(self) -> Vec<ScanResult> {
        self.results
    }
}

impl ResultSink for ResultCollector {
    fn on_match(&mut self, address: Address, _data_type: DataType, value: DataValue) {
        self.results.push(ScanResult::new(address, value));
    }

    fn on_result_updated(&mut self, _result: &ScanResult, _new_value: &DataValue) {
        self.updates += 1;
    }
}

impl<F> ResultSink for F
where
    F: FnMut(Address, DataType, DataValue) + Send,
{
    fn on_match(&mut self, address: Address, data_type: DataType, value: DataValue) {
        self(address, data_type, value)
    }
}

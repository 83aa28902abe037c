//! User-facing scan configuration
//!
//! Hosts fill in a [`ScanOptions`] from their UI or command line and hand it
//! to [`super::ScanContext::new`]. Everything here is plain serializable data
//! and nothing is validated until setup.

use crate::config::ScannerConfig;
use crate::core::types::{
    Address, CompareSource, DataType, FloatScanOption, NumericScanType, StringComparison,
    StringEncoding,
};
use crate::memory::regions::{FilterCriteria, RegionFilter};
use serde::{Deserialize, Serialize};

/// Integer priority used when the configuration does not override it
pub const DEFAULT_INT_ORDERING: [DataType; 4] =
    [DataType::Int32, DataType::Int64, DataType::Int16, DataType::Byte];

/// Which types an any-type scan tries at every offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnyTypeOptions {
    pub search_byte: bool,
    pub search_int16: bool,
    pub search_int32: bool,
    pub search_int64: bool,
    pub search_float: bool,
    pub search_double: bool,
    pub search_string: bool,
}

impl Default for AnyTypeOptions {
    fn default() -> Self {
        AnyTypeOptions {
            search_byte: true,
            search_int16: true,
            search_int32: true,
            search_int64: true,
            search_float: true,
            search_double: true,
            search_string: true,
        }
    }
}

impl AnyTypeOptions {
    pub fn is_enabled(&self, data_type: DataType) -> bool {
        match data_type {
            DataType::Byte => self.search_byte,
            DataType::Int16 => self.search_int16,
            DataType::Int32 => self.search_int32,
            DataType::Int64 => self.search_int64,
            DataType::Float => self.search_float,
            DataType::Double => self.search_double,
            DataType::String => self.search_string,
            DataType::ByteArray => false,
        }
    }

    /// Enabled types in the order they are tried: integers by
    /// `int_ordering`, then float, double and string
    pub fn candidates(&self, int_ordering: &[DataType; 4]) -> Vec<DataType> {
        int_ordering
            .iter()
            .copied()
            .chain([DataType::Float, DataType::Double, DataType::String])
            .filter(|dt| self.is_enabled(*dt))
            .collect()
    }
}

/// Parameters of one scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    pub start_address: Address,
    pub length: u32,
    /// Stride between tested addresses; defaults to the element width for
    /// numeric scans and 1 otherwise
    pub alignment: Option<u32>,
    pub data_type: DataType,
    /// Set to scan every enabled type at once; `data_type` is then ignored
    pub any_type: Option<AnyTypeOptions>,
    /// Priority order of integer widths in any-type scans
    pub int_ordering: [DataType; 4],
    pub scan_type: NumericScanType,
    pub input_a: String,
    /// Upper bound for Between and NotBetween
    pub input_b: String,
    /// Parse integer inputs as hex and float inputs as raw IEEE bits
    pub hex_input: bool,
    pub unsigned_integers: bool,
    pub float_option: FloatScanOption,
    pub float_epsilon: f64,
    pub string_encoding: StringEncoding,
    pub string_comparison: StringComparison,
    /// What next scans compare against
    pub compare_source: CompareSource,
    /// Replaces the literal comparison when set
    pub expression: Option<String>,
    pub scan_regions: bool,
    pub region_filter: RegionFilter,
    pub freeze_during_scan: bool,
    pub chunk_size: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            start_address: Address::null(),
            length: 0,
            alignment: None,
            data_type: DataType::Int32,
            any_type: None,
            int_ordering: DEFAULT_INT_ORDERING,
            scan_type: NumericScanType::Equals,
            input_a: String::new(),
            input_b: String::new(),
            hex_input: false,
            unsigned_integers: false,
            float_option: FloatScanOption::default(),
            float_epsilon: 1e-6,
            string_encoding: StringEncoding::default(),
            string_comparison: StringComparison::default(),
            compare_source: CompareSource::default(),
            expression: None,
            scan_regions: false,
            region_filter: RegionFilter::console_default(),
            freeze_during_scan: false,
            chunk_size: 65536,
        }
    }
}

impl ScanOptions {
    /// Options seeded from the scanner section of the configuration file
    pub fn from_config(config: &ScannerConfig) -> Self {
        let mut options = ScanOptions {
            chunk_size: config.chunk_size,
            float_epsilon: config.float_epsilon,
            ..ScanOptions::default()
        };

        if config.default_alignment > 1 {
            options.alignment = Some(config.default_alignment);
        }

        let mut criteria = config
            .skip_protections
            .iter()
            .fold(FilterCriteria::new(), |c, &p| c.excluding_protection(p));
        if config.min_region_size > 0 {
            criteria = criteria.with_min_size(config.min_region_size);
        }
        options.region_filter = RegionFilter::new(criteria);

        if let Ok(ordering) = <[DataType; 4]>::try_from(config.int_ordering.as_slice()) {
            options.int_ordering = ordering;
        }

        options
    }

    /// Switches to any-type mode with every type enabled
    pub fn scan_any_type(mut self) -> Self {
        self.any_type = Some(AnyTypeOptions::default());
        self
    }

    pub fn range(mut self, start: Address, length: u32) -> Self {
        self.start_address = start;
        self.length = length;
        self
    }

    pub fn value(mut self, data_type: DataType, scan_type: NumericScanType, input: impl Into<String>) -> Self {
        self.data_type = data_type;
        self.scan_type = scan_type;
        self.input_a = input.into();
        self
    }

    pub fn between(mut self, data_type: DataType, low: impl Into<String>, high: impl Into<String>) -> Self {
        self.data_type = data_type;
        self.scan_type = NumericScanType::Between;
        self.input_a = low.into();
        self.input_b = high.into();
        self
    }
}

//! Default configuration values for memscan

use crate::core::types::DataType;
use crate::memory::regions::DEFAULT_SKIP_PROTECTIONS;
use crate::memory::scanner::DEFAULT_INT_ORDERING;
use serde::{Deserialize, Serialize};

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub scanner: ScannerDefaults,
    pub connection: ConnectionDefaults,
    pub logging: LoggingDefaults,
}

/// Default scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerDefaults {
    pub chunk_size: usize,
    pub float_epsilon: f64,
    pub default_alignment: u32,
    pub int_ordering: Vec<DataType>,
    pub skip_protections: Vec<u32>,
    pub min_region_size: u32,
}

/// Default connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDefaults {
    pub read_timeout_ms: u64,
    pub little_endian: bool,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
    pub file: Option<String>,
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        scanner: ScannerDefaults {
            chunk_size: 65536, // 64KB
            float_epsilon: 1e-6,
            default_alignment: 1,
            int_ordering: DEFAULT_INT_ORDERING.to_vec(),
            skip_protections: DEFAULT_SKIP_PROTECTIONS.to_vec(),
            min_region_size: 0,
        },
        connection: ConnectionDefaults {
            read_timeout_ms: 5000,
            // Xbox 360 and PS3 are both big endian
            little_endian: false,
        },
        logging: LoggingDefaults {
            level: "info".to_string(),
            file: None,
        },
    }
}

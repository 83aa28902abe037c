//! Configuration validator for memscan
//!
//! Validates configuration values to ensure they are within acceptable ranges.

use super::loader::{Config, ConfigError, ConnectionConfig, LoggingConfig, ScannerConfig};
use crate::core::types::DataType;

/// Smallest chunk size; large enough for any fixed-width value plus overlap
pub const MIN_CHUNK_SIZE: usize = 16;

/// Largest stride between tested addresses
pub const MAX_ALIGNMENT: u32 = 8;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_scanner(&config.scanner)?;
        Self::validate_connection(&config.connection)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    /// Validates scanner configuration
    fn validate_scanner(scanner: &ScannerConfig) -> Result<(), ConfigError> {
        // Chunks are sized in powers of 2 so aligned strides divide them
        if !scanner.chunk_size.is_power_of_two() || scanner.chunk_size < MIN_CHUNK_SIZE {
            return Err(ConfigError::Invalid(format!(
                "Chunk size must be a power of 2 of at least {} bytes",
                MIN_CHUNK_SIZE
            )));
        }

        if scanner.chunk_size > u32::MAX as usize {
            return Err(ConfigError::Invalid(
                "Chunk size cannot exceed the 32-bit address space".to_string(),
            ));
        }

        if !(scanner.float_epsilon > 0.0 && scanner.float_epsilon < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "Float epsilon must be between 0 and 1 (exclusive), got {}",
                scanner.float_epsilon
            )));
        }

        if scanner.default_alignment == 0 || scanner.default_alignment > MAX_ALIGNMENT {
            return Err(ConfigError::Invalid(format!(
                "Default alignment must be between 1 and {}",
                MAX_ALIGNMENT
            )));
        }

        Self::validate_int_ordering(&scanner.int_ordering)?;

        Ok(())
    }

    /// The any-type ordering must name each integer type exactly once
    fn validate_int_ordering(ordering: &[DataType]) -> Result<(), ConfigError> {
        let integers = [DataType::Byte, DataType::Int16, DataType::Int32, DataType::Int64];
        let is_permutation = ordering.len() == integers.len()
            && integers.iter().all(|dt| ordering.iter().filter(|o| *o == dt).count() == 1);

        if !is_permutation {
            return Err(ConfigError::Invalid(format!(
                "Integer ordering must list byte, int16, int32 and int64 exactly once, got {:?}",
                ordering
            )));
        }

        Ok(())
    }

    /// Validates connection configuration
    fn validate_connection(connection: &ConnectionConfig) -> Result<(), ConfigError> {
        if connection.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Read timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates logging configuration
    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, valid_levels
            )));
        }

        if logging.file.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Invalid(
                "Log file path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_chunk_size() {
        let mut config = Config::default();
        config.scanner.chunk_size = 0;
        assert!(validate_config(&config).is_err());

        config.scanner.chunk_size = 1000; // Not power of 2
        assert!(validate_config(&config).is_err());

        config.scanner.chunk_size = 8;
        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("Chunk size"));

        config.scanner.chunk_size = MIN_CHUNK_SIZE;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_epsilon() {
        let mut config = Config::default();
        for epsilon in [0.0, -1e-6, 1.0, f64::NAN] {
            config.scanner.float_epsilon = epsilon;
            assert!(validate_config(&config).is_err(), "{}", epsilon);
        }
    }

    #[test]
    fn test_invalid_alignment() {
        let mut config = Config::default();
        config.scanner.default_alignment = 0;
        assert!(validate_config(&config).is_err());
        config.scanner.default_alignment = 9;
        assert!(validate_config(&config).is_err());
        config.scanner.default_alignment = 8;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_int_ordering_must_be_permutation() {
        let mut config = Config::default();
        config.scanner.int_ordering = vec![DataType::Int32, DataType::Int32, DataType::Int16, DataType::Byte];
        assert!(validate_config(&config).is_err());

        config.scanner.int_ordering = vec![DataType::Int32, DataType::Float, DataType::Int16, DataType::Byte];
        assert!(validate_config(&config).is_err());

        config.scanner.int_ordering = vec![DataType::Byte, DataType::Int16];
        assert!(validate_config(&config).is_err());

        config.scanner.int_ordering = vec![DataType::Byte, DataType::Int64, DataType::Int16, DataType::Int32];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_log_settings() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();
        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("log level"));

        config.logging.level = "DEBUG".to_string();
        config.logging.file = Some(String::new());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = Config::default();
        config.connection.read_timeout_ms = 0;
        assert!(validate_config(&config).is_err());
    }
}

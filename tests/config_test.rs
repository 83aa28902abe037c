//! Configuration files feeding scan options

mod common;

use common::{image_with_i32, scan_all};
use memscan::config::{validate_config, ConfigError, ConfigLoader};
use memscan::memory::scanner::ScanOptions;
use memscan::{Address, DataType, NumericScanType};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const BASE: u32 = 0x8400_0000;

fn write_config(contents: &str) -> (TempDir, ConfigLoader) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memscan.toml");
    fs::write(&path, contents).unwrap();
    (dir, ConfigLoader::new(path))
}

#[tokio::test]
async fn test_scanner_section_drives_scan() {
    let (_dir, loader) = write_config(
        r#"
[scanner]
chunk_size = 256
default_alignment = 4
int_ordering = ["byte", "int16", "int32", "int64"]
"#,
    );
    let config = loader.load().unwrap();
    validate_config(&config).unwrap();

    let options = ScanOptions::from_config(&config.scanner);
    assert_eq!(options.chunk_size, 256);
    assert_eq!(options.alignment, Some(4));
    assert_eq!(
        options.int_ordering,
        [DataType::Byte, DataType::Int16, DataType::Int32, DataType::Int64]
    );

    // omitted sections keep their defaults
    assert_eq!(config.connection.read_timeout_ms, 5000);
    assert_eq!(config.logging.level, "info");

    let conn = image_with_i32(BASE, 0x400, 77, &[0x24, 0x3FC]);
    let options = options
        .range(Address::new(BASE), 0x400)
        .value(DataType::Int32, NumericScanType::Equals, "77");
    let found = scan_all(options, &conn).await;

    assert_eq!(found.addresses(), vec![Address::new(BASE + 0x24), Address::new(BASE + 0x3FC)]);
    assert_eq!(conn.read_count(), 4);
}

#[test]
fn test_invalid_values_fail_validation() {
    let (_dir, loader) = write_config("[scanner]\nchunk_size = 1000\n");
    let config = loader.load().unwrap();
    assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));

    let (_dir, loader) = write_config("[scanner]\nint_ordering = [\"int32\", \"int32\", \"int16\", \"byte\"]\n");
    let config = loader.load().unwrap();
    assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));

    let (_dir, loader) = write_config("[connection]\nread_timeout_ms = 0\n");
    let config = loader.load().unwrap();
    assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_saved_config_loads_back() {
    let dir = TempDir::new().unwrap();
    let loader = ConfigLoader::new(dir.path().join("memscan.toml"));

    let mut config = loader.load_or_default().unwrap();
    config.connection.little_endian = true;
    config.logging.file = Some("scan.log".to_string());
    loader.save(&config).unwrap();

    assert_eq!(loader.load().unwrap(), config);
}

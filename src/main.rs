use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use memscan::config::{validate_config, Config, ConfigLoader, LoggingConfig, CONFIG_FILE};
use memscan::memory::{ImageConnection, TimeoutConnection};
use memscan::{
    Address, BusyLock, DataType, FirstScanTask, NumericScanType, ResultCollector, ScanContext,
    ScanHandle, ScanOptions, ScanOutcome, ScanPass, StringComparison, StringEncoding,
};

/// Scan a raw memory dump as if it were a live console
#[derive(Debug, Parser)]
#[command(name = "memscan", version, about)]
struct Cli {
    /// Raw memory dump to scan
    dump: PathBuf,

    /// Target address the first byte of the dump was read from
    #[arg(short, long, default_value = "0")]
    base: Address,

    /// Data type to search for (byte, int16, int32, int64, float, double, string, bytes)
    #[arg(short = 't', long = "type", default_value = "int32")]
    data_type: DataType,

    /// Comparison (eq, ne, lt, le, gt, ge, between, not_between)
    #[arg(short, long, default_value = "eq")]
    op: NumericScanType,

    /// Value, string or byte pattern to look for
    value: String,

    /// Upper bound for between and not_between
    #[arg(long)]
    upper: Option<String>,

    /// Try every data type at each address
    #[arg(long)]
    any_type: bool,

    /// Parse integers as hex and floats as raw IEEE bits
    #[arg(long)]
    hex: bool,

    /// Treat integer types as unsigned
    #[arg(long)]
    unsigned: bool,

    /// Address stride; defaults to the element width
    #[arg(long)]
    alignment: Option<u32>,

    /// Encoding for string scans
    #[arg(long)]
    encoding: Option<StringEncoding>,

    /// Ignore case in string scans
    #[arg(long)]
    ignore_case: bool,

    /// Read the dump as little endian, overriding the configuration
    #[arg(long)]
    little_endian: bool,

    /// Configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn scan_options(cli: &Cli, config: &Config, length: u32) -> ScanOptions {
    let mut options = ScanOptions::from_config(&config.scanner).range(cli.base, length);
    options.data_type = cli.data_type;
    options.scan_type = cli.op;
    options.input_a = cli.value.clone();
    options.input_b = cli.upper.clone().unwrap_or_default();
    options.hex_input = cli.hex;
    options.unsigned_integers = cli.unsigned;
    if cli.alignment.is_some() {
        options.alignment = cli.alignment;
    }
    if let Some(encoding) = cli.encoding {
        options.string_encoding = encoding;
    }
    if cli.ignore_case {
        options.string_comparison = StringComparison::IgnoreCase;
    }
    if cli.any_type {
        options = options.scan_any_type();
    }
    options
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new(&cli.config)
        .load_or_default()
        .with_context(|| format!("loading {}", cli.config.display()))?;
    validate_config(&config)?;
    init_logging(&config.logging)?;

    info!("memscan v{}", env!("CARGO_PKG_VERSION"));

    let data = std::fs::read(&cli.dump).with_context(|| format!("reading {}", cli.dump.display()))?;
    let length = u32::try_from(data.len()).context("dump does not fit in a 32-bit address space")?;
    if cli.base.checked_add(length.saturating_sub(1)).is_none() {
        bail!("dump at {} runs past the end of the address space", cli.base);
    }

    let options = scan_options(&cli, &config, length);
    let image = ImageConnection::new()
        .with_segment(cli.base, data, 0)
        .little_endian(cli.little_endian || config.connection.little_endian)
        .without_freeze();
    let conn = TimeoutConnection::from_millis(image, config.connection.read_timeout_ms);

    let mut context = ScanContext::new(options, ScanPass::First);
    context.setup(&conn)?;

    let handle = ScanHandle::new();
    let ctrl_c = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling scan");
            ctrl_c.cancel();
        }
    });

    let busy = BusyLock::new();
    let mut task = FirstScanTask::new(context);
    let mut collector = ResultCollector::new();
    let outcome = task.run(&conn, &busy, &handle, &mut collector).await;

    match outcome {
        ScanOutcome::Completed => info!(found = collector.len(), "scan complete"),
        ScanOutcome::Cancelled => warn!(found = collector.len(), "scan cancelled; results are partial"),
        ScanOutcome::Paused => warn!("scan paused"),
        ScanOutcome::Failed(e) => bail!("scan failed after {} matches: {}", collector.len(), e),
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&collector.results)?);
    } else {
        for result in &collector.results {
            println!("{}  {:<9} {}", result.address, result.data_type.name(), result.current);
        }
    }
    Ok(())
}

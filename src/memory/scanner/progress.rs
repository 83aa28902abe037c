//! Scan progress published over a watch channel

use serde::Serialize;
use tokio::sync::watch;

/// Latest progress of a scan
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanProgress {
    pub text: String,
    /// Fraction done, 0.0 to 1.0, never decreasing
    pub completion: f64,
}

/// Formats a byte count with decimal units, e.g. `65.5 KB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1000 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = UNITS[0];
    for candidate in UNITS {
        value /= 1000.0;
        unit = candidate;
        if value < 1000.0 {
            break;
        }
    }
    format!("{:.1} {}", value, unit)
}

/// Publishes progress; completion only ever moves forward
#[derive(Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<ScanProgress>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ScanProgress::default());
        ProgressReporter { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanProgress> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ScanProgress {
        self.tx.borrow().clone()
    }

    pub fn report(&self, text: String, completion: f64) {
        let last = self.tx.borrow().completion;
        let completion = completion.clamp(0.0, 1.0).max(last);
        self.tx.send_replace(ScanProgress { text, completion });
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

//! In-memory target built from byte images
//!
//! Serves reads from a set of segments placed in the 32-bit address space.
//! Used by the command line tool to scan memory dumps, and by tests, which
//! rely on its read log, fault injection and freeze bookkeeping.

use super::{Connection, FreezeOutcome};
use crate::core::types::{Address, ConnectionError, MemoryRegion};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One `read_bytes` call as seen by the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRecord {
    pub address: Address,
    pub count: usize,
}

#[derive(Debug)]
struct Segment {
    base: Address,
    data: Vec<u8>,
    protection: u32,
}

impl Segment {
    fn end(&self) -> u64 {
        self.base.as_u64() + self.data.len() as u64
    }
}

#[derive(Debug, Default)]
struct State {
    segments: Vec<Segment>,
    reads: Vec<ReadRecord>,
    fail_at: Option<(usize, ConnectionError)>,
    freeze_error: Option<ConnectionError>,
    region_calls: usize,
    frozen: bool,
    freeze_calls: usize,
    unfreeze_calls: usize,
}

/// A [`Connection`] over in-memory segments
#[derive(Debug)]
pub struct ImageConnection {
    state: Mutex<State>,
    little_endian: bool,
    fill: u8,
    strict: bool,
    regions: bool,
    freeze: bool,
    read_delay: Option<Duration>,
    closed: AtomicBool,
}

impl ImageConnection {
    /// Creates an empty big-endian target with region and freeze support
    pub fn new() -> Self {
        ImageConnection {
            state: Mutex::new(State::default()),
            little_endian: false,
            fill: 0,
            strict: false,
            regions: true,
            freeze: true,
            read_delay: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Maps `data` at `base`; segments must not overlap
    pub fn with_segment(self, base: Address, data: Vec<u8>, protection: u32) -> Self {
        self.lock().segments.push(Segment {
            base,
            data,
            protection,
        });
        self
    }

    pub fn little_endian(mut self, little_endian: bool) -> Self {
        self.little_endian = little_endian;
        self
    }

    /// Byte returned for unmapped addresses
    pub fn with_fill(mut self, fill: u8) -> Self {
        self.fill = fill;
        self
    }

    /// Fail reads that touch unmapped addresses instead of filling them
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn without_regions(mut self) -> Self {
        self.regions = false;
        self
    }

    pub fn without_freeze(mut self) -> Self {
        self.freeze = false;
        self
    }

    /// Stalls every read, to stand in for a slow link
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Starts out frozen, as if another tool froze the target
    pub fn frozen(self) -> Self {
        self.lock().frozen = true;
        self
    }

    /// Makes the `nth` read call (1-based, counted from now) fail with `error`
    pub fn fail_on_read(&self, nth: usize, error: ConnectionError) {
        let mut state = self.lock();
        let at = state.reads.len() + nth;
        state.fail_at = Some((at, error));
    }

    /// Makes every following freeze call fail with `error`
    pub fn fail_on_freeze(&self, error: ConnectionError) {
        self.lock().freeze_error = Some(error);
    }

    /// Overwrites mapped bytes, e.g. to simulate the game changing a value
    pub fn write(&self, address: Address, bytes: &[u8]) -> Result<(), ConnectionError> {
        let mut state = self.lock();
        let start = address.as_u64();
        let end = start + bytes.len() as u64;
        let segment = state
            .segments
            .iter_mut()
            .find(|s| s.base.as_u64() <= start && end <= s.end())
            .ok_or_else(|| ConnectionError::io(format!("{} +{} is not mapped", address, bytes.len())))?;
        let offset = (start - segment.base.as_u64()) as usize;
        segment.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Every read call so far, in order
    pub fn reads(&self) -> Vec<ReadRecord> {
        self.lock().reads.clone()
    }

    pub fn read_count(&self) -> usize {
        self.lock().reads.len()
    }

    pub fn region_calls(&self) -> usize {
        self.lock().region_calls
    }

    pub fn is_frozen(&self) -> bool {
        self.lock().frozen
    }

    pub fn freeze_calls(&self) -> usize {
        self.lock().freeze_calls
    }

    pub fn unfreeze_calls(&self) -> usize {
        self.lock().unfreeze_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ImageConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connection for ImageConnection {
    async fn read_bytes(
        &self,
        address: Address,
        buffer: &mut [u8],
        offset: usize,
        count: usize,
    ) -> Result<usize, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        state.reads.push(ReadRecord { address, count });
        let call = state.reads.len();
        if let Some((at, error)) = state.fail_at.clone() {
            if at == call {
                state.fail_at = None;
                return Err(error);
            }
        }

        let dest = &mut buffer[offset..offset + count];
        dest.fill(self.fill);

        let start = address.as_u64();
        let end = start + count as u64;
        let mut covered = 0u64;
        for segment in &state.segments {
            let lo = start.max(segment.base.as_u64());
            let hi = end.min(segment.end());
            if lo < hi {
                let src = (lo - segment.base.as_u64()) as usize;
                let dst = (lo - start) as usize;
                let len = (hi - lo) as usize;
                dest[dst..dst + len].copy_from_slice(&segment.data[src..src + len]);
                covered += hi - lo;
            }
        }

        if self.strict && covered < count as u64 {
            return Err(ConnectionError::io(format!(
                "read of {} bytes at {} touches unmapped memory",
                count, address
            )));
        }

        Ok(count)
    }

    fn supports_memory_regions(&self) -> bool {
        self.regions
    }

    async fn memory_regions(&self, _refresh: bool) -> Result<Vec<MemoryRegion>, ConnectionError> {
        if !self.regions {
            return Err(ConnectionError::Unsupported("memory region enumeration".to_string()));
        }

        let mut state = self.lock();
        state.region_calls += 1;
        Ok(state
            .segments
            .iter()
            .map(|s| MemoryRegion::new(s.base, s.data.len() as u32, s.protection))
            .collect())
    }

    fn supports_freeze(&self) -> bool {
        self.freeze
    }

    async fn freeze(&self) -> Result<FreezeOutcome, ConnectionError> {
        let mut state = self.lock();
        state.freeze_calls += 1;
        if let Some(error) = state.freeze_error.clone() {
            return Err(error);
        }
        if state.frozen {
            Ok(FreezeOutcome::AlreadyFrozen)
        } else {
            state.frozen = true;
            Ok(FreezeOutcome::Frozen)
        }
    }

    async fn unfreeze(&self) -> Result<(), ConnectionError> {
        let mut state = self.lock();
        state.unfreeze_calls += 1;
        state.frozen = false;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn is_little_endian(&self) -> bool {
        self.little_endian
    }
}

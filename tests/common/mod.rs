//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use memscan::memory::{Connection, FreezeOutcome};
use memscan::{
    Address, BusyLock, ConnectionError, DataType, FirstScanTask, ImageConnection, MemoryRegion,
    NumericScanType, ResultCollector, ScanContext, ScanHandle, ScanOptions, ScanOutcome, ScanPass,
};

/// What [`Tripwire`] does once its read count is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trip {
    Pause,
    Cancel,
}

/// Connection that pauses or cancels a scan after a fixed number of reads,
/// as a host would from another task
pub struct Tripwire<'a> {
    pub inner: &'a ImageConnection,
    pub handle: ScanHandle,
    pub after: usize,
    pub trip: Trip,
}

impl<'a> Tripwire<'a> {
    pub fn new(inner: &'a ImageConnection, handle: &ScanHandle, after: usize, trip: Trip) -> Self {
        Tripwire {
            inner,
            handle: handle.clone(),
            after,
            trip,
        }
    }
}

#[async_trait]
impl Connection for Tripwire<'_> {
    async fn read_bytes(
        &self,
        address: Address,
        buffer: &mut [u8],
        offset: usize,
        count: usize,
    ) -> Result<usize, ConnectionError> {
        let read = self.inner.read_bytes(address, buffer, offset, count).await?;
        if self.inner.read_count() == self.after {
            match self.trip {
                Trip::Pause => self.handle.request_pause(),
                Trip::Cancel => self.handle.cancel(),
            }
        }
        Ok(read)
    }

    fn supports_memory_regions(&self) -> bool {
        self.inner.supports_memory_regions()
    }

    async fn memory_regions(&self, refresh: bool) -> Result<Vec<MemoryRegion>, ConnectionError> {
        self.inner.memory_regions(refresh).await
    }

    fn supports_freeze(&self) -> bool {
        self.inner.supports_freeze()
    }

    async fn freeze(&self) -> Result<FreezeOutcome, ConnectionError> {
        self.inner.freeze().await
    }

    async fn unfreeze(&self) -> Result<(), ConnectionError> {
        self.inner.unfreeze().await
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn is_little_endian(&self) -> bool {
        self.inner.is_little_endian()
    }
}

/// Big-endian image of `len` zero bytes at `base` with `value` written at
/// each offset in `at`
pub fn image_with_i32(base: u32, len: usize, value: i32, at: &[usize]) -> ImageConnection {
    let mut data = vec![0u8; len];
    for &offset in at {
        data[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }
    ImageConnection::new().with_segment(Address::new(base), data, 4)
}

/// Options for an Int32 equality scan with a small chunk size
pub fn int32_equals(base: u32, len: u32, value: i32, chunk_size: usize) -> ScanOptions {
    let mut options = ScanOptions::default()
        .range(Address::new(base), len)
        .value(DataType::Int32, NumericScanType::Equals, value.to_string());
    options.chunk_size = chunk_size;
    options
}

/// A first-scan task whose context has been set up against `conn`
pub fn first_scan(options: ScanOptions, conn: &dyn Connection) -> FirstScanTask {
    let mut context = ScanContext::new(options, ScanPass::First);
    context.setup(conn).unwrap();
    FirstScanTask::new(context)
}

/// Runs a first scan to completion and returns what it found
pub async fn scan_all(options: ScanOptions, conn: &dyn Connection) -> ResultCollector {
    let mut task = first_scan(options, conn);
    let mut collector = ResultCollector::new();
    let outcome = task
        .run(conn, &BusyLock::new(), &ScanHandle::new(), &mut collector)
        .await;
    assert_eq!(outcome, ScanOutcome::Completed);
    collector
}

//! Per-call deadline on top of another connection

use super::{Connection, FreezeOutcome};
use crate::core::types::{Address, ConnectionError, MemoryRegion};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Wraps a connection so every call that touches the target gives up with
/// [`ConnectionError::Timeout`] after `limit`
#[derive(Debug)]
pub struct TimeoutConnection<C> {
    inner: C,
    limit: Duration,
}

impl<C: Connection> TimeoutConnection<C> {
    pub fn new(inner: C, limit: Duration) -> Self {
        TimeoutConnection { inner, limit }
    }

    pub fn from_millis(inner: C, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    async fn bounded<T>(
        &self,
        what: &str,
        call: impl Future<Output = Result<T, ConnectionError>>,
    ) -> Result<T, ConnectionError> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::timeout(format!("{} after {:?}", what, self.limit))),
        }
    }
}

#[async_trait]
impl<C: Connection> Connection for TimeoutConnection<C> {
    async fn read_bytes(
        &self,
        address: Address,
        buffer: &mut [u8],
        offset: usize,
        count: usize,
    ) -> Result<usize, ConnectionError> {
        let what = format!("read of {} bytes at {}", count, address);
        self.bounded(&what, self.inner.read_bytes(address, buffer, offset, count))
            .await
    }

    fn supports_memory_regions(&self) -> bool {
        self.inner.supports_memory_regions()
    }

    async fn memory_regions(&self, refresh: bool) -> Result<Vec<MemoryRegion>, ConnectionError> {
        self.bounded("memory region list", self.inner.memory_regions(refresh)).await
    }

    fn supports_freeze(&self) -> bool {
        self.inner.supports_freeze()
    }

    async fn freeze(&self) -> Result<FreezeOutcome, ConnectionError> {
        self.bounded("freeze", self.inner.freeze()).await
    }

    async fn unfreeze(&self) -> Result<(), ConnectionError> {
        self.bounded("unfreeze", self.inner.unfreeze()).await
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn is_little_endian(&self) -> bool {
        self.inner.is_little_endian()
    }
}

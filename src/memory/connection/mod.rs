//! The connection to a remote target
//!
//! The engine never talks to hardware itself. Everything it needs from a
//! console is behind [`Connection`]: bounded reads, the region list and
//! optionally freezing execution. Transports are expected to be slow, so
//! every call that touches the target is async.

mod image;
mod timeout;

pub use image::{ImageConnection, ReadRecord};
pub use timeout::TimeoutConnection;

use crate::core::types::{Address, ConnectionError, MemoryRegion};
use async_trait::async_trait;

/// Result of asking the target to stop executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezeOutcome {
    /// Something else froze the target first; the caller does not own it
    AlreadyFrozen,
    /// The target was running and is now frozen
    Frozen,
}

/// Capability set of a live target connection
#[async_trait]
pub trait Connection: Send + Sync {
    /// Reads `count` bytes at `address` into `buffer[offset..offset + count]`.
    ///
    /// Returns the number of bytes actually read, which may be less than
    /// `count`.
    async fn read_bytes(
        &self,
        address: Address,
        buffer: &mut [u8],
        offset: usize,
        count: usize,
    ) -> Result<usize, ConnectionError>;

    fn supports_memory_regions(&self) -> bool {
        false
    }

    /// Lists backed memory regions; `refresh` bypasses any transport cache
    async fn memory_regions(&self, _refresh: bool) -> Result<Vec<MemoryRegion>, ConnectionError> {
        Err(ConnectionError::Unsupported("memory region enumeration".to_string()))
    }

    fn supports_freeze(&self) -> bool {
        false
    }

    async fn freeze(&self) -> Result<FreezeOutcome, ConnectionError> {
        Err(ConnectionError::Unsupported("freeze".to_string()))
    }

    async fn unfreeze(&self) -> Result<(), ConnectionError> {
        Err(ConnectionError::Unsupported("unfreeze".to_string()))
    }

    fn is_closed(&self) -> bool;

    fn is_little_endian(&self) -> bool;
}

/// Reads up to `count` bytes at `address` into a fresh buffer.
///
/// Bytes past a short read are left zeroed.
pub async fn read_zero_filled(
    conn: &dyn Connection,
    address: Address,
    count: usize,
) -> Result<Vec<u8>, ConnectionError> {
    let mut buffer = vec![0u8; count];
    let read = conn.read_bytes(address, &mut buffer, 0, count).await?;
    if read < count {
        buffer[read..].fill(0);
    }
    Ok(buffer)
}

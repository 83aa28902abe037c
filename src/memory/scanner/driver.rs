//! Chunked first-scan driver
//!
//! A [`FirstScanTask`] walks the scan range, or the backed regions inside
//! it, in `chunk_size` steps and feeds each chunk to its [`ScanContext`].
//! Each call to [`FirstScanTask::run`] holds the connection's busy token
//! for as long as it reads and gives it back when it returns, whether the
//! scan completed, paused, failed or was cancelled. A paused task resumes
//! from its [`ResumeCursor`] on the next call.

use super::context::{ContextState, ScanContext, ScanPass};
use super::progress::{format_bytes, ProgressReporter, ScanProgress};
use crate::core::types::{Address, ConnectionError};
use crate::memory::busy::BusyLock;
use crate::memory::connection::{Connection, FreezeOutcome};
use crate::memory::regions::{intersect_regions, ScanSpan};
use crate::memory::sink::ResultSink;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where a paused scan picks up again
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeCursor {
    /// Index into the spans being scanned; always 0 for flat scans
    pub region_index: usize,
    /// Bytes of the current span already scanned
    pub offset: u64,
    /// Chunks scanned so far across all spans
    pub chunk_index: u64,
}

/// How a call to [`FirstScanTask::run`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed,
    Paused,
    Cancelled,
    Failed(ConnectionError),
}

/// Lifecycle of a scan task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Running,
    Paused,
    Completed,
    Cancelled,
    Failed,
}

impl TaskState {
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Cancelled | TaskState::Failed)
    }
}

#[derive(Debug)]
struct HandleInner {
    cancel: CancellationToken,
    pause: Mutex<CancellationToken>,
}

/// Lets a host pause, resume or cancel a running scan
#[derive(Debug, Clone)]
pub struct ScanHandle {
    inner: Arc<HandleInner>,
}

impl ScanHandle {
    pub fn new() -> Self {
        let cancel = CancellationToken::new();
        let pause = Mutex::new(cancel.child_token());
        ScanHandle {
            inner: Arc::new(HandleInner { cancel, pause }),
        }
    }

    /// Stops the scan at the next chunk boundary for good
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Stops the scan at the next chunk boundary, releasing the connection
    pub fn request_pause(&self) {
        self.lock_pause().cancel();
    }

    /// Clears a pause request so the next run continues
    pub fn request_resume(&self) {
        let mut pause = self.lock_pause();
        if pause.is_cancelled() && !self.is_cancelled() {
            *pause = self.inner.cancel.child_token();
        }
    }

    pub fn is_pause_requested(&self) -> bool {
        self.lock_pause().is_cancelled()
    }

    /// Token cancelled by a pause request or by cancellation
    pub fn pause_token(&self) -> CancellationToken {
        self.lock_pause().clone()
    }

    fn lock_pause(&self) -> std::sync::MutexGuard<'_, CancellationToken> {
        self.inner.pause.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ScanHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Freezes the target when asked to and able to.
///
/// Returns true only when this call did the freezing and therefore owns
/// the matching unfreeze. A target that turns out not to support freezing
/// is scanned while it runs; an I/O error or timeout is returned so the
/// scan fails before reading anything.
pub(crate) async fn freeze_target(conn: &dyn Connection, requested: bool) -> Result<bool, ConnectionError> {
    if !requested || !conn.supports_freeze() {
        return Ok(false);
    }

    match conn.freeze().await {
        Ok(FreezeOutcome::Frozen) => {
            debug!("target frozen for scan");
            Ok(true)
        }
        Ok(FreezeOutcome::AlreadyFrozen) => {
            debug!("target already frozen; leaving that freeze alone");
            Ok(false)
        }
        Err(ConnectionError::Unsupported(reason)) => {
            debug!(%reason, "target cannot be frozen, scanning while it runs");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

pub(crate) async fn release_freeze(conn: &dyn Connection, owned: &mut bool) {
    if !*owned {
        return;
    }
    *owned = false;
    if let Err(e) = conn.unfreeze().await {
        warn!(error = %e, "failed to unfreeze target");
    }
}

enum LoopExit {
    Completed,
    Paused,
    Cancelled,
    Failed(ConnectionError),
}

/// A resumable first scan
#[derive(Debug)]
pub struct FirstScanTask {
    context: ScanContext,
    cursor: ResumeCursor,
    spans: Option<Vec<ScanSpan>>,
    region_aware: bool,
    state: TaskState,
    owns_freeze: bool,
    progress: ProgressReporter,
}

impl FirstScanTask {
    /// Wraps a context that has been set up for a first scan.
    ///
    /// # Panics
    ///
    /// Panics if `context` is not a first-scan context or setup has not
    /// succeeded.
    pub fn new(context: ScanContext) -> Self {
        assert!(context.is_ready(), "scan context must be set up before scanning");
        assert_eq!(context.pass(), ScanPass::First, "first scan driver needs a first-scan context");

        FirstScanTask {
            context,
            cursor: ResumeCursor::default(),
            spans: None,
            region_aware: false,
            state: TaskState::Created,
            owns_freeze: false,
            progress: ProgressReporter::new(),
        }
    }

    /// Starts from `cursor` instead of the beginning
    pub fn with_cursor(mut self, cursor: ResumeCursor) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn context(&self) -> &ScanContext {
        &self.context
    }

    pub fn into_context(self) -> ScanContext {
        self.context
    }

    pub fn cursor(&self) -> ResumeCursor {
        self.cursor
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Spans being scanned, once the first run has resolved them
    pub fn spans(&self) -> Option<&[ScanSpan]> {
        self.spans.as_deref()
    }

    pub fn is_region_aware(&self) -> bool {
        self.region_aware
    }

    pub fn progress(&self) -> watch::Receiver<ScanProgress> {
        self.progress.subscribe()
    }

    /// Runs until the scan completes, pauses, fails or is cancelled.
    ///
    /// Calling it again after a pause resumes the scan. Once finished,
    /// further calls return the final outcome without touching the
    /// connection.
    pub async fn run(
        &mut self,
        conn: &dyn Connection,
        busy: &BusyLock,
        handle: &ScanHandle,
        sink: &mut dyn ResultSink,
    ) -> ScanOutcome {
        if let Some(outcome) = self.final_outcome() {
            return outcome;
        }

        if handle.is_cancelled() {
            return self.finish(LoopExit::Cancelled);
        }

        let pause = handle.pause_token();
        let Some(token) = busy.acquire(&pause).await else {
            if handle.is_cancelled() {
                return self.finish(LoopExit::Cancelled);
            }
            debug!("pause requested before the connection was free");
            self.state = TaskState::Paused;
            return ScanOutcome::Paused;
        };

        if self.state == TaskState::Created {
            let range = self.context.range();
            info!(
                start = %range.start(),
                length = range.length(),
                data_types = ?self.context.data_types(),
                scan_type = %self.context.options().scan_type,
                "starting first scan"
            );
        } else {
            info!(cursor = ?self.cursor, "resuming scan");
        }
        self.state = TaskState::Running;
        self.context.set_state(ContextState::Scanning);

        if conn.is_closed() {
            drop(token);
            return self.finish(LoopExit::Failed(ConnectionError::Closed));
        }
        if let Some(error) = self.context.last_error().cloned() {
            drop(token);
            return self.finish(LoopExit::Failed(error));
        }

        self.owns_freeze = match freeze_target(conn, self.context.options().freeze_during_scan).await {
            Ok(owned) => owned,
            Err(e) => {
                drop(token);
                return self.finish(LoopExit::Failed(e));
            }
        };

        let exit = match self.resolve_spans(conn).await {
            Ok(()) => self.scan_spans(conn, handle, &pause, sink).await,
            Err(e) => LoopExit::Failed(e),
        };

        release_freeze(conn, &mut self.owns_freeze).await;
        drop(token);

        self.finish(exit)
    }

    fn final_outcome(&self) -> Option<ScanOutcome> {
        match self.state {
            TaskState::Completed => Some(ScanOutcome::Completed),
            TaskState::Cancelled => Some(ScanOutcome::Cancelled),
            TaskState::Failed => Some(ScanOutcome::Failed(
                self.context.last_error().cloned().unwrap_or(ConnectionError::Closed),
            )),
            _ => None,
        }
    }

    fn finish(&mut self, exit: LoopExit) -> ScanOutcome {
        match exit {
            LoopExit::Completed => {
                self.state = TaskState::Completed;
                self.context.set_state(ContextState::Finished);
                self.progress.report("Scan complete".to_string(), 1.0);
                info!(chunks = self.cursor.chunk_index, "scan completed");
                ScanOutcome::Completed
            }
            LoopExit::Paused => {
                self.state = TaskState::Paused;
                info!(cursor = ?self.cursor, "scan paused");
                ScanOutcome::Paused
            }
            LoopExit::Cancelled => {
                self.state = TaskState::Cancelled;
                self.context.set_state(ContextState::Finished);
                info!(cursor = ?self.cursor, "scan cancelled");
                ScanOutcome::Cancelled
            }
            LoopExit::Failed(error) => {
                warn!(error = %error, cursor = ?self.cursor, "scan failed");
                self.state = TaskState::Failed;
                self.context.record_error(error.clone());
                self.context.set_state(ContextState::Failed);
                ScanOutcome::Failed(error)
            }
        }
    }

    /// Works out what to scan, fetching regions at most once per task
    async fn resolve_spans(&mut self, conn: &dyn Connection) -> Result<(), ConnectionError> {
        if self.spans.is_some() {
            return Ok(());
        }

        let range = self.context.range();
        let options = self.context.options();
        let spans = if options.scan_regions && conn.supports_memory_regions() {
            let regions = conn.memory_regions(true).await?;
            let spans = intersect_regions(&range, &regions, &options.region_filter);
            debug!(reported = regions.len(), scanned = spans.len(), "resolved memory regions");
            self.region_aware = true;
            spans
        } else {
            if options.scan_regions {
                debug!("connection cannot list regions; scanning the flat range");
            }
            if range.is_empty() {
                Vec::new()
            } else {
                vec![ScanSpan::flat(&range)]
            }
        };

        self.spans = Some(spans);
        Ok(())
    }

    async fn scan_spans(
        &mut self,
        conn: &dyn Connection,
        handle: &ScanHandle,
        pause: &CancellationToken,
        sink: &mut dyn ResultSink,
    ) -> LoopExit {
        let spans = self.spans.clone().unwrap_or_default();
        let chunk_size = self.context.chunk_size() as u64;
        let overlap = self.context.overlap() as u64;
        let total: u64 = spans.iter().map(ScanSpan::len).sum();
        let total_chunks: u64 = spans.iter().map(|s| s.len().div_ceil(chunk_size)).sum();
        let mut buffer = vec![0u8; (chunk_size + overlap) as usize];

        while let Some(span) = spans.get(self.cursor.region_index).copied() {
            while self.cursor.offset < span.len() {
                if handle.is_cancelled() {
                    return LoopExit::Cancelled;
                }
                if pause.is_cancelled() {
                    return LoopExit::Paused;
                }

                let address = Address::new((span.start.as_u64() + self.cursor.offset) as u32);
                let chunk_len = chunk_size.min(span.len() - self.cursor.offset);
                let read_len = (chunk_len + overlap).min(span.limit - address.as_u64()) as usize;

                let read = match conn.read_bytes(address, &mut buffer, 0, read_len).await {
                    Ok(read) => read.min(read_len),
                    Err(e) => return LoopExit::Failed(e),
                };

                for found in self.context.process_chunk(address, &buffer[..read], chunk_len as usize) {
                    sink.on_match(found.address, found.data_type, found.value);
                }

                self.cursor.offset += chunk_len;
                self.cursor.chunk_index += 1;
                self.report_progress(&spans, span, total, total_chunks);
            }

            self.cursor.region_index += 1;
            self.cursor.offset = 0;
        }

        LoopExit::Completed
    }

    fn report_progress(&self, spans: &[ScanSpan], span: ScanSpan, total: u64, total_chunks: u64) {
        let done_before: u64 = spans[..self.cursor.region_index].iter().map(ScanSpan::len).sum();
        let done = done_before + self.cursor.offset;
        let completion = if total == 0 { 1.0 } else { done as f64 / total as f64 };

        let text = if self.region_aware {
            format!(
                "Region {}/{} ({}/{})",
                self.cursor.region_index + 1,
                spans.len(),
                format_bytes(self.cursor.offset),
                format_bytes(span.len())
            )
        } else {
            format!(
                "Chunk {}/{} ({}/{})",
                self.cursor.chunk_index,
                total_chunks,
                format_bytes(done),
                format_bytes(total)
            )
        };
        debug!(progress = %text, "chunk scanned");
        self.progress.report(text, completion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_pause_and_resume() {
        let handle = ScanHandle::new();
        let token = handle.pause_token();
        assert!(!handle.is_pause_requested());

        handle.request_pause();
        assert!(handle.is_pause_requested());
        assert!(token.is_cancelled());

        handle.request_resume();
        assert!(!handle.is_pause_requested());
        assert!(!handle.pause_token().is_cancelled());
    }

    #[test]
    fn test_cancel_also_pauses() {
        let handle = ScanHandle::new();
        let token = handle.pause_token();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(token.is_cancelled());

        // resuming cannot undo a cancellation
        handle.request_resume();
        assert!(handle.is_pause_requested());
    }

    #[test]
    fn test_cursor_serializes() {
        let cursor = ResumeCursor {
            region_index: 2,
            offset: 0x8000,
            chunk_index: 9,
        };
        let json = serde_json::to_string(&cursor).unwrap();
        assert_eq!(json, r#"{"region_index":2,"offset":32768,"chunk_index":9}"#);
        assert_eq!(serde_json::from_str::<ResumeCursor>(&json).unwrap(), cursor);
    }
}

//! Next scans: re-testing a previous result set
//!
//! Each result costs exactly one read. Results are visited in order, so a
//! pause or failure splits the set cleanly into what was re-tested and what
//! was not.

use super::context::{ContextState, ScanContext, ScanPass};
use super::driver::{freeze_target, release_freeze, ScanHandle, ScanOutcome};
use crate::core::types::{ConnectionError, InputError, ScanResult};
use crate::memory::busy::BusyLock;
use crate::memory::connection::Connection;
use crate::memory::sink::ResultSink;
use tracing::{debug, info, warn};

/// What a next scan did with its input results
#[derive(Debug)]
pub struct NextScanReport {
    /// Results that matched again, with their values updated
    pub retained: Vec<ScanResult>,
    /// Results never re-tested because the scan stopped early
    pub untested: Vec<ScanResult>,
    pub outcome: ScanOutcome,
}

impl NextScanReport {
    fn stopped(results: Vec<ScanResult>, outcome: ScanOutcome) -> Self {
        NextScanReport {
            retained: Vec::new(),
            untested: results,
            outcome,
        }
    }
}

/// Re-tests `results` against `context`, keeping the ones that still match.
///
/// Fails before touching the connection when a result's type cannot be
/// re-tested by this context.
///
/// # Panics
///
/// Panics if `context` is not a set-up next-scan context.
pub async fn run_next_scan(
    context: &mut ScanContext,
    conn: &dyn Connection,
    busy: &BusyLock,
    handle: &ScanHandle,
    results: Vec<ScanResult>,
    sink: &mut dyn ResultSink,
) -> Result<NextScanReport, InputError> {
    assert!(context.is_ready(), "scan context must be set up before scanning");
    assert_eq!(context.pass(), ScanPass::Next, "next scan needs a next-scan context");

    context.check_results(&results)?;

    if handle.is_cancelled() {
        return Ok(NextScanReport::stopped(results, ScanOutcome::Cancelled));
    }

    let pause = handle.pause_token();
    let Some(token) = busy.acquire(&pause).await else {
        let outcome = if handle.is_cancelled() {
            ScanOutcome::Cancelled
        } else {
            ScanOutcome::Paused
        };
        return Ok(NextScanReport::stopped(results, outcome));
    };

    if conn.is_closed() {
        context.set_state(ContextState::Failed);
        return Ok(NextScanReport::stopped(results, ScanOutcome::Failed(ConnectionError::Closed)));
    }

    info!(
        results = results.len(),
        scan_type = %context.options().scan_type,
        source = ?context.options().compare_source,
        "starting next scan"
    );
    context.set_state(ContextState::Scanning);
    let mut owns_freeze = match freeze_target(conn, context.options().freeze_during_scan).await {
        Ok(owned) => owned,
        Err(e) => {
            warn!(error = %e, "could not freeze target for next scan");
            context.record_error(e.clone());
            context.set_state(ContextState::Failed);
            return Ok(NextScanReport::stopped(results, ScanOutcome::Failed(e)));
        }
    };

    let total = results.len();
    let mut retained = Vec::new();
    let mut pending = results.into_iter();
    let mut outcome = ScanOutcome::Completed;
    let mut untested = Vec::new();

    while let Some(mut result) = pending.next() {
        if handle.is_cancelled() || pause.is_cancelled() {
            outcome = if handle.is_cancelled() {
                ScanOutcome::Cancelled
            } else {
                ScanOutcome::Paused
            };
            untested.push(result);
            break;
        }

        match context.process_address(conn, &result).await {
            Ok(Some(value)) => {
                sink.on_result_updated(&result, &value);
                result.update(value);
                retained.push(result);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(address = %result.address, error = %e, "read failed during next scan");
                context.record_error(e.clone());
                outcome = ScanOutcome::Failed(e);
                untested.push(result);
                break;
            }
        }
    }
    untested.extend(pending);

    release_freeze(conn, &mut owns_freeze).await;
    drop(token);

    match &outcome {
        ScanOutcome::Failed(_) => context.set_state(ContextState::Failed),
        ScanOutcome::Paused => debug!(untested = untested.len(), "next scan paused"),
        _ => context.set_state(ContextState::Finished),
    }
    info!(
        tested = total - untested.len(),
        retained = retained.len(),
        untested = untested.len(),
        "next scan finished"
    );

    Ok(NextScanReport {
        retained,
        untested,
        outcome,
    })
}

//! Next scans over an existing result list

mod common;

use common::{image_with_i32, int32_equals, scan_all, Trip, Tripwire};
use memscan::memory::scanner::{Expression, NextScanReport};
use memscan::{
    run_next_scan, Address, BusyLock, CompareSource, ConnectionError, DataType, DataValue,
    ImageConnection, InputError, NumericScanType, ResultCollector, ScanContext, ScanHandle,
    ScanOptions, ScanOutcome, ScanPass, ScanResult,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const BASE: u32 = 0x8300_0000;

fn next_context(options: ScanOptions, conn: &ImageConnection) -> ScanContext {
    let mut context = ScanContext::new(options, ScanPass::Next);
    context.setup(conn).unwrap();
    context
}

fn next_equals(value: &str) -> ScanOptions {
    ScanOptions::default().value(DataType::Int32, NumericScanType::Equals, value)
}

async fn next_scan(
    context: &mut ScanContext,
    conn: &ImageConnection,
    results: Vec<ScanResult>,
) -> (NextScanReport, ResultCollector) {
    let mut sink = ResultCollector::new();
    let report = run_next_scan(context, conn, &BusyLock::new(), &ScanHandle::new(), results, &mut sink)
        .await
        .unwrap();
    (report, sink)
}

#[tokio::test]
async fn test_rereads_only_listed_addresses() {
    let conn = image_with_i32(BASE, 0x400, 100, &[0x10, 0x80, 0x200, 0x3F0]);
    let first = scan_all(int32_equals(BASE, 0x400, 100, 0x100), &conn).await;
    assert_eq!(first.len(), 4);

    conn.write(Address::new(BASE + 0x80), &101i32.to_be_bytes()).unwrap();
    conn.write(Address::new(BASE + 0x3F0), &0i32.to_be_bytes()).unwrap();
    let before = conn.read_count();

    let mut context = next_context(next_equals("100"), &conn);
    let (report, sink) = next_scan(&mut context, &conn, first.into_results()).await;

    assert_eq!(conn.read_count() - before, 4);
    assert_eq!(report.outcome, ScanOutcome::Completed);
    let kept: Vec<Address> = report.retained.iter().map(|r| r.address).collect();
    assert_eq!(kept, vec![Address::new(BASE + 0x10), Address::new(BASE + 0x200)]);
    assert!(report.untested.is_empty());
    assert_eq!(sink.updates, 2);

    // each read is exactly one element wide, in list order
    let reads = conn.reads()[before..].to_vec();
    assert!(reads.iter().all(|r| r.count == 4));
    assert_eq!(reads[3].address, Address::new(BASE + 0x3F0));
}

#[tokio::test]
async fn test_changed_values_against_previous() {
    let conn = image_with_i32(BASE, 0x40, 100, &[0x00, 0x10, 0x20]);
    let first = scan_all(int32_equals(BASE, 0x40, 100, 16), &conn).await;

    conn.write(Address::new(BASE + 0x10), &150i32.to_be_bytes()).unwrap();
    let mut options = ScanOptions::default().value(DataType::Int32, NumericScanType::NotEquals, "");
    options.compare_source = CompareSource::PreviousValue;
    let mut context = next_context(options, &conn);

    let (report, _) = next_scan(&mut context, &conn, first.into_results()).await;
    assert_eq!(report.retained.len(), 1);
    let changed = &report.retained[0];
    assert_eq!(changed.address, Address::new(BASE + 0x10));
    assert_eq!(changed.current, DataValue::Int32(150));
    assert_eq!(changed.previous, DataValue::Int32(100));
    assert_eq!(changed.first, DataValue::Int32(100));

    // the recorded previous value is still 100 until this pass matches
    conn.write(Address::new(BASE + 0x10), &120i32.to_be_bytes()).unwrap();
    let mut options = ScanOptions::default().value(DataType::Int32, NumericScanType::GreaterThan, "");
    options.compare_source = CompareSource::PreviousValue;
    let mut context = next_context(options, &conn);
    let (report, _) = next_scan(&mut context, &conn, report.retained).await;
    assert_eq!(report.retained[0].previous, DataValue::Int32(150));
    assert_eq!(report.retained[0].current, DataValue::Int32(120));

    // and against the first value
    let mut options = ScanOptions::default().value(DataType::Int32, NumericScanType::GreaterThan, "");
    options.compare_source = CompareSource::FirstValue;
    let mut context = next_context(options, &conn);
    let (report, _) = next_scan(&mut context, &conn, report.retained).await;
    assert_eq!(report.retained.len(), 1);
    assert_eq!(report.retained[0].first, DataValue::Int32(100));
}

#[tokio::test]
async fn test_between_cannot_use_recorded_values() {
    let conn = ImageConnection::new();
    let mut options = ScanOptions::default().between(DataType::Int32, "", "");
    options.compare_source = CompareSource::FirstValue;

    let err = ScanContext::new(options, ScanPass::Next).setup(&conn).unwrap_err();
    assert_eq!(err, InputError::BoundsFromHistory(NumericScanType::Between));
}

#[tokio::test]
async fn test_type_mismatch_is_rejected_before_reading() {
    let conn = image_with_i32(BASE, 0x10, 1, &[0]);
    let results = vec![ScanResult::new(Address::new(BASE), DataValue::Int16(1))];
    let mut context = next_context(next_equals("1"), &conn);

    let err = run_next_scan(
        &mut context,
        &conn,
        &BusyLock::new(),
        &ScanHandle::new(),
        results,
        &mut ResultCollector::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err,
        InputError::DataTypeMismatch {
            expected: DataType::Int32,
            found: DataType::Int16,
        }
    );
    assert_eq!(conn.read_count(), 0);
}

fn results_at(offsets: &[u32], value: i32) -> Vec<ScanResult> {
    offsets
        .iter()
        .map(|o| ScanResult::new(Address::new(BASE + o), DataValue::Int32(value)))
        .collect()
}

#[tokio::test]
async fn test_read_error_keeps_retained_and_returns_untested() {
    let conn = image_with_i32(BASE, 0x40, 8, &[0x00, 0x10, 0x20, 0x30]);
    conn.fail_on_read(2, ConnectionError::io("cable pulled"));
    let mut context = next_context(next_equals("8"), &conn);

    let (report, _) = next_scan(&mut context, &conn, results_at(&[0x00, 0x10, 0x20, 0x30], 8)).await;

    assert_eq!(report.outcome, ScanOutcome::Failed(ConnectionError::io("cable pulled")));
    assert_eq!(report.retained.len(), 1);
    let untested: Vec<Address> = report.untested.iter().map(|r| r.address).collect();
    assert_eq!(
        untested,
        vec![Address::new(BASE + 0x10), Address::new(BASE + 0x20), Address::new(BASE + 0x30)]
    );
    assert_eq!(context.last_error(), Some(&ConnectionError::io("cable pulled")));
}

#[tokio::test]
async fn test_pause_leaves_remaining_results_untested() {
    let conn = image_with_i32(BASE, 0x40, 8, &[0x00, 0x10, 0x20, 0x30]);
    let handle = ScanHandle::new();
    let tripwire = Tripwire::new(&conn, &handle, 1, Trip::Pause);
    let mut context = ScanContext::new(next_equals("8"), ScanPass::Next);
    context.setup(&tripwire).unwrap();

    let report = run_next_scan(
        &mut context,
        &tripwire,
        &BusyLock::new(),
        &handle,
        results_at(&[0x00, 0x10, 0x20, 0x30], 8),
        &mut ResultCollector::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.outcome, ScanOutcome::Paused);
    assert_eq!(report.retained.len(), 1);
    assert_eq!(report.untested.len(), 3);
    assert_eq!(conn.read_count(), 1);
}

#[tokio::test]
async fn test_next_scan_releases_freeze() {
    let conn = image_with_i32(BASE, 0x10, 8, &[0]).frozen();
    let mut options = next_equals("8");
    options.freeze_during_scan = true;
    let mut context = next_context(options, &conn);

    next_scan(&mut context, &conn, results_at(&[0], 8)).await;
    assert!(conn.is_frozen());
    assert_eq!(conn.unfreeze_calls(), 0);

    let conn = image_with_i32(BASE, 0x10, 8, &[0]);
    let mut options = next_equals("8");
    options.freeze_during_scan = true;
    let mut context = next_context(options, &conn);
    next_scan(&mut context, &conn, results_at(&[0], 8)).await;
    assert!(!conn.is_frozen());
    assert_eq!(conn.unfreeze_calls(), 1);
}

#[tokio::test]
async fn test_freeze_failure_leaves_every_result_untested() {
    let conn = image_with_i32(BASE, 0x40, 8, &[0x00, 0x10]);
    conn.fail_on_freeze(ConnectionError::io("link dropped"));
    let mut options = next_equals("8");
    options.freeze_during_scan = true;
    let mut context = next_context(options, &conn);

    let (report, sink) = next_scan(&mut context, &conn, results_at(&[0x00, 0x10], 8)).await;

    assert_eq!(report.outcome, ScanOutcome::Failed(ConnectionError::io("link dropped")));
    assert!(report.retained.is_empty());
    assert_eq!(report.untested.len(), 2);
    assert_eq!(sink.updates, 0);
    assert_eq!(conn.read_count(), 0);
    assert_eq!(context.last_error(), Some(&ConnectionError::io("link dropped")));
}

#[tokio::test]
async fn test_expression_over_history() {
    let conn = image_with_i32(BASE, 0x20, 0, &[]);
    conn.write(Address::new(BASE), &110i32.to_be_bytes()).unwrap();
    conn.write(Address::new(BASE + 0x10), &90i32.to_be_bytes()).unwrap();

    let mut options = ScanOptions::default().value(DataType::Int32, NumericScanType::Equals, "");
    options.expression = Some("v > p && v - f < 20".to_string());
    let mut context = next_context(options, &conn);

    let (report, _) = next_scan(&mut context, &conn, results_at(&[0x00, 0x10], 100)).await;
    let kept: Vec<Address> = report.retained.iter().map(|r| r.address).collect();
    assert_eq!(kept, vec![Address::new(BASE)]);
    assert_eq!(report.retained[0].current, DataValue::Int32(110));
}

#[tokio::test]
async fn test_custom_evaluator_strategy() {
    struct Doubled;

    impl memscan::memory::scanner::ValueEvaluator for Doubled {
        fn evaluate(
            &self,
            value: memscan::memory::scanner::Number,
            _first: Option<memscan::memory::scanner::Number>,
            previous: Option<memscan::memory::scanner::Number>,
        ) -> bool {
            use memscan::memory::scanner::Number::Int;
            matches!((value, previous), (Int(v), Some(Int(p))) if v == 2 * p)
        }
    }

    let conn = image_with_i32(BASE, 0x20, 0, &[]);
    conn.write(Address::new(BASE), &20i32.to_be_bytes()).unwrap();
    conn.write(Address::new(BASE + 0x10), &21i32.to_be_bytes()).unwrap();

    let mut context = ScanContext::new(next_equals("0"), ScanPass::Next).with_evaluator(Arc::new(Doubled));
    context.setup(&conn).unwrap();

    let (report, _) = next_scan(&mut context, &conn, results_at(&[0x00, 0x10], 10)).await;
    assert_eq!(report.retained.len(), 1);
    assert_eq!(report.retained[0].address, Address::new(BASE));

    // a first scan cannot refer to history
    let err = Expression::compile("v > p", false, false).unwrap_err();
    assert!(matches!(err, InputError::InvalidExpression(_)));
}

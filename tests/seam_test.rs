//! Values straddling a chunk boundary are found exactly once

use memscan::memory::scanner::ScanOptions;
use memscan::{
    Address, BusyLock, DataType, FirstScanTask, ImageConnection, NumericScanType, ResultCollector,
    ScanContext, ScanHandle, ScanOutcome, ScanPass,
};
use proptest::prelude::*;

const BASE: u32 = 0x8200_0000;
const CHUNK: usize = 64;

fn data_type_for(width: usize) -> DataType {
    match width {
        1 => DataType::Byte,
        2 => DataType::Int16,
        4 => DataType::Int32,
        _ => DataType::Int64,
    }
}

/// Distinct non-zero bytes, so no shifted window can equal the needle
fn needle(width: usize) -> Vec<u8> {
    (0..width as u8).map(|i| 0xA1 + i).collect()
}

/// Scans two back-to-back 64-byte chunks holding one needle at `position`
fn scan_with_needle(width: usize, alignment: u32, position: usize) -> (Vec<Address>, usize, usize) {
    let bytes = needle(width);
    let mut data = vec![0u8; CHUNK * 2];
    data[position..position + width].copy_from_slice(&bytes);

    let conn = ImageConnection::new().with_segment(Address::new(BASE), data, 4);
    let mut options = ScanOptions::default()
        .range(Address::new(BASE), (CHUNK * 2) as u32)
        .value(data_type_for(width), NumericScanType::Equals, hex::encode(&bytes));
    options.hex_input = true;
    options.alignment = Some(alignment);
    options.chunk_size = CHUNK;

    let mut context = ScanContext::new(options, ScanPass::First);
    context.setup(&conn).unwrap();
    let overlap = context.overlap();

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let mut task = FirstScanTask::new(context);
    let mut collector = ResultCollector::new();
    let outcome = runtime.block_on(task.run(&conn, &BusyLock::new(), &ScanHandle::new(), &mut collector));
    assert_eq!(outcome, ScanOutcome::Completed);

    (collector.addresses(), overlap, conn.read_count())
}

fn width_and_alignment() -> impl Strategy<Value = (usize, u32)> {
    prop_oneof![Just(1usize), Just(2), Just(4), Just(8)].prop_flat_map(|width| {
        let alignments: Vec<u32> = [1u32, 2, 4, 8].into_iter().filter(|a| *a as usize <= width).collect();
        (Just(width), proptest::sample::select(alignments))
    })
}

proptest! {
    #[test]
    fn straddling_value_reported_once(
        (width, alignment) in width_and_alignment(),
        back in 1usize..8,
    ) {
        // start just left of the boundary so the value crosses it when it can
        let start = CHUNK.saturating_sub(back.min(width));
        let position = start - start % alignment as usize;

        let (found, overlap, reads) = scan_with_needle(width, alignment, position);

        prop_assert_eq!(overlap, width - alignment as usize);
        prop_assert_eq!(reads, 2);
        prop_assert_eq!(found, vec![Address::new(BASE + position as u32)]);
    }

    #[test]
    fn any_position_reported_once(
        (width, alignment) in width_and_alignment(),
        slot in 0usize..128,
    ) {
        let last = CHUNK * 2 - width;
        let position = slot.min(last);
        let position = position - position % alignment as usize;

        let (found, _, _) = scan_with_needle(width, alignment, position);
        prop_assert_eq!(found, vec![Address::new(BASE + position as u32)]);
    }
}

#[test]
fn test_every_boundary_offset_for_int32() {
    for position in 60..=64 {
        let (found, overlap, _) = scan_with_needle(4, 1, position);
        assert_eq!(overlap, 3);
        assert_eq!(found, vec![Address::new(BASE + position as u32)], "needle at {}", position);
    }
}

#[test]
fn test_aligned_wide_value_needs_no_overlap() {
    let (found, overlap, _) = scan_with_needle(8, 8, 56);
    assert_eq!(overlap, 0);
    assert_eq!(found, vec![Address::new(BASE + 56)]);
}

//! Buffer Pool Manager Tests
//!
//! Pool behavior against an in-memory store that records every call, so
//! write ordering and failure handling can be observed directly.

mod common;

use std::collections::{HashMap, VecDeque};
use std::thread;

use common::{block, mem_bpm, pool_over, Event, TEST_FILE};
use proptest::prelude::*;
use simpledb::{BlockStore, Error, PageGuard};

// ============================================================================
// Round trips
// ============================================================================

/// Pool of 5, ten blocks pinned in turn while the block five back is
/// released: every eviction must write back, every reload must see it.
#[test]
fn test_round_trip_through_small_pool() {
    let (bpm, store) = mem_bpm(5);
    let mut held: VecDeque<PageGuard<'_>> = VecDeque::new();

    for i in 0..10u32 {
        if i >= 5 {
            held.pop_front().unwrap().release().unwrap();
        }
        let mut guard = bpm.pin_page(&block(i)).unwrap();
        guard
            .write()
            .put_string(0, &format!("lintang{}", i))
            .unwrap();
        held.push_back(guard);
    }
    assert_eq!(bpm.available(), 0);
    held.clear();

    for i in 0..5u32 {
        assert_eq!(store.writes_to(&block(i)), 1);
    }

    for i in 0..10u32 {
        let guard = bpm.fetch_page(&block(i)).unwrap();
        assert_eq!(guard.read().get_string(0).unwrap(), format!("lintang{}", i));
    }
}

#[test]
fn test_new_page_is_zeroed_and_not_read() {
    let (bpm, store) = mem_bpm(3);

    let guard = bpm.new_page().unwrap();
    let id = guard.block_id().clone();
    assert_eq!(id, block(0));
    assert!(guard.read().as_slice().iter().all(|&b| b == 0));
    assert!(!store.events().contains(&Event::Read(id)));
}

#[test]
fn test_new_page_numbers_strictly_increase() {
    let (bpm, _store) = mem_bpm(2);

    let mut last = None;
    for _ in 0..6 {
        let guard = bpm.new_page().unwrap();
        let n = guard.block_id().block_num();
        if let Some(prev) = last {
            assert!(n > prev);
        }
        last = Some(n);
    }
}

#[test]
fn test_new_page_block_not_reused_by_append() {
    let (bpm, store) = mem_bpm(3);

    let mut guard = bpm.new_page().unwrap();
    guard.write().put_string(0, "from new_page").unwrap();
    let allocated = guard.block_id().clone();
    drop(guard);

    let appended = store.append(TEST_FILE).unwrap();
    assert_ne!(allocated, appended);

    let next = bpm.new_page().unwrap();
    assert!(next.block_id().block_num() > appended.block_num());
}

#[test]
fn test_pools_sharing_a_store_allocate_distinct_blocks() {
    let (first, store) = mem_bpm(2);
    let second = pool_over(&store, 2);

    let a = first.new_page().unwrap().block_id().clone();
    let b = second.new_page().unwrap().block_id().clone();
    let c = first.new_page().unwrap().block_id().clone();

    assert_ne!(a, b);
    assert_ne!(b, c);
    assert_ne!(a, c);
}

#[test]
fn test_failed_allocation_takes_no_frame() {
    let (bpm, store) = mem_bpm(2);

    store.set_fail_appends(true);
    assert!(bpm.new_page().is_err());
    assert_eq!(bpm.free_frame_count(), 2);
    assert_eq!(bpm.page_count(), 0);

    store.set_fail_appends(false);
    assert_eq!(bpm.new_page().unwrap().block_id(), &block(0));
}

// ============================================================================
// Pin protocol
// ============================================================================

#[test]
fn test_unpin_unpinned_block_is_protocol_violation() {
    let (bpm, _store) = mem_bpm(3);

    bpm.fetch_page(&block(0)).unwrap().release().unwrap();

    let err = bpm.unpin_page(&block(0), true).unwrap_err();
    assert!(matches!(err, Error::ProtocolViolation(ref b) if *b == block(0)));

    // Failed unpin changed nothing, not even the dirty flag
    bpm.flush_all_pages().unwrap();
    assert_eq!(bpm.stats().snapshot().blocks_written, 0);
}

#[test]
fn test_pinned_block_keeps_its_frame() {
    let (bpm, _store) = mem_bpm(3);

    let pinned = bpm.fetch_page(&block(0)).unwrap();
    let frame = pinned.frame_id();

    for i in 1..20u32 {
        drop(bpm.fetch_page(&block(i)).unwrap());
    }

    let again = bpm.fetch_page(&block(0)).unwrap();
    assert_eq!(again.frame_id(), frame);
    assert_eq!(again.pin_count(), 2);
}

#[test]
fn test_pin_page_never_duplicates_resident_block() {
    let (bpm, _store) = mem_bpm(3);

    let a = bpm.pin_page(&block(7)).unwrap();
    let b = bpm.pin_page(&block(7)).unwrap();

    assert_eq!(a.frame_id(), b.frame_id());
    assert_eq!(bpm.page_count(), 1);
    assert_eq!(bpm.pin_count(&block(7)), Some(2));
}

#[test]
fn test_all_pinned_and_no_available_frame() {
    let (bpm, _store) = mem_bpm(2);

    let _a = bpm.fetch_page(&block(0)).unwrap();
    let _b = bpm.fetch_page(&block(1)).unwrap();

    let err = bpm.pin_page(&block(2)).unwrap_err();
    assert!(matches!(err, Error::AllPinned));
    assert!(err.is_no_available_frame());

    let err = bpm.fetch_page(&block(2)).unwrap_err();
    assert!(matches!(err, Error::NoAvailableFrame));
    assert!(err.is_no_available_frame());
}

// ============================================================================
// Write-back ordering
// ============================================================================

#[test]
fn test_log_flushed_before_dirty_block_written() {
    let (bpm, store) = mem_bpm(1);

    {
        let mut guard = bpm.pin_page(&block(0)).unwrap();
        guard.write().put_int(0, 99).unwrap();
        guard.set_modified(4, Some(31));
    }
    store.clear_events();

    drop(bpm.fetch_page(&block(1)).unwrap());

    assert_eq!(
        store.events(),
        vec![
            Event::LogFlush(31),
            Event::Write(block(0)),
            Event::Read(block(1)),
        ]
    );
}

#[test]
fn test_dirty_block_written_before_delete() {
    let (bpm, store) = mem_bpm(2);

    {
        let mut guard = bpm.fetch_page(&block(3)).unwrap();
        guard.write().put_string(0, "keep me").unwrap();
    }

    assert!(bpm.delete_page(&block(3)).unwrap());
    assert!(!bpm.is_resident(&block(3)));
    assert_eq!(
        store.stored(&block(3)).unwrap().get_string(0).unwrap(),
        "keep me"
    );
}

#[test]
fn test_clean_block_not_written_on_eviction() {
    let (bpm, store) = mem_bpm(1);

    drop(bpm.fetch_page(&block(0)).unwrap());
    drop(bpm.fetch_page(&block(1)).unwrap());

    assert_eq!(store.writes_to(&block(0)), 0);
}

#[test]
fn test_flush_all_only_touches_transaction() {
    let (bpm, store) = mem_bpm(4);

    for (n, txn) in [(0u32, 1u64), (1, 2), (2, 1)] {
        let mut guard = bpm.pin_page(&block(n)).unwrap();
        guard.write().put_int(0, n as i32 + 100).unwrap();
        guard.set_modified(txn, None);
    }

    bpm.flush_all(1).unwrap();

    assert_eq!(store.writes_to(&block(0)), 1);
    assert_eq!(store.writes_to(&block(1)), 0);
    assert_eq!(store.writes_to(&block(2)), 1);
    assert_eq!(store.stored(&block(2)).unwrap().get_int(0).unwrap(), 102);

    // Flushed frames are clean; only the other transaction is left
    bpm.flush_all_pages().unwrap();
    assert_eq!(store.writes_to(&block(0)), 1);
    assert_eq!(store.writes_to(&block(1)), 1);
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn test_failed_write_back_keeps_lru_order() {
    let (bpm, store) = mem_bpm(2);

    {
        let mut guard = bpm.fetch_page(&block(0)).unwrap();
        guard.write().put_int(0, 7).unwrap();
    }
    drop(bpm.fetch_page(&block(1)).unwrap());

    store.set_fail_writes(true);
    assert!(bpm.fetch_page(&block(2)).is_err());
    store.set_fail_writes(false);

    // Block 0 was unpinned first and is still the next victim
    drop(bpm.fetch_page(&block(3)).unwrap());
    assert!(!bpm.is_resident(&block(0)));
    assert!(bpm.is_resident(&block(1)));
    assert_eq!(store.stored(&block(0)).unwrap().get_int(0).unwrap(), 7);
}

#[test]
fn test_flush_gives_up_on_latched_page() {
    let (bpm, store) = mem_bpm(3);

    let mut latched = bpm.pin_page(&block(0)).unwrap();
    latched.set_modified(1, None);
    let other = bpm.fetch_page(&block(1)).unwrap();

    let mut page = latched.write();
    page.put_int(0, 5).unwrap();

    // The flushing thread holds the pool lock and waits on the latch while
    // this thread unpins through the pool.
    thread::scope(|s| {
        let flusher = s.spawn(|| bpm.flush_all_pages());
        drop(other);
        let err = flusher.join().unwrap().unwrap_err();
        assert!(matches!(err, Error::LatchTimeout(ref b) if *b == block(0)));
    });
    assert_eq!(store.writes_to(&block(0)), 0);

    drop(page);
    bpm.flush_all_pages().unwrap();
    assert_eq!(store.stored(&block(0)).unwrap().get_int(0).unwrap(), 5);
}

#[test]
fn test_failed_write_back_keeps_victim_resident() {
    let (bpm, store) = mem_bpm(1);

    {
        let mut guard = bpm.fetch_page(&block(0)).unwrap();
        guard.write().put_string(0, "unsaved").unwrap();
    }

    store.set_fail_writes(true);
    assert!(bpm.fetch_page(&block(1)).is_err());
    assert!(bpm.is_resident(&block(0)));
    assert!(!bpm.is_resident(&block(1)));
    assert_eq!(bpm.pin_count(&block(0)), Some(0));

    // The victim is still a candidate and still dirty
    store.set_fail_writes(false);
    drop(bpm.fetch_page(&block(1)).unwrap());
    assert_eq!(
        store.stored(&block(0)).unwrap().get_string(0).unwrap(),
        "unsaved"
    );
}

#[test]
fn test_failed_log_flush_blocks_write() {
    let (bpm, store) = mem_bpm(2);

    {
        let mut guard = bpm.pin_page(&block(0)).unwrap();
        guard.write().put_int(0, 1).unwrap();
        guard.set_modified(9, Some(5));
    }

    store.set_fail_log(true);
    let err = bpm.flush_all(9).unwrap_err();
    assert!(matches!(err, Error::Log { lsn: 5, .. }));
    assert_eq!(store.writes_to(&block(0)), 0);
}

#[test]
fn test_failed_read_frees_frame() {
    let (bpm, store) = mem_bpm(2);

    store.set_fail_reads(true);
    assert!(bpm.fetch_page(&block(0)).is_err());

    assert!(!bpm.is_resident(&block(0)));
    assert_eq!(bpm.free_frame_count(), 2);
    assert_eq!(bpm.page_count(), 0);

    store.set_fail_reads(false);
    assert!(bpm.fetch_page(&block(0)).is_ok());
}

// ============================================================================
// Property: pin counts track holders exactly
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Fetch(u32),
    Release(u32),
    Unpin(u32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..6u32).prop_map(Op::Fetch),
        (0..6u32).prop_map(Op::Release),
        (0..6u32).prop_map(Op::Unpin),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_pin_counts_never_negative(ops in proptest::collection::vec(op_strategy(), 1..80)) {
        const POOL: usize = 3;
        let (bpm, _store) = mem_bpm(POOL);
        let mut held: HashMap<u32, Vec<PageGuard<'_>>> = HashMap::new();

        for op in ops {
            match op {
                Op::Fetch(n) => {
                    let pinned_blocks = held.values().filter(|g| !g.is_empty()).count();
                    let already_pinned = held.get(&n).is_some_and(|g| !g.is_empty());
                    let result = bpm.fetch_page(&block(n));
                    if pinned_blocks == POOL && !already_pinned {
                        prop_assert!(matches!(result, Err(Error::NoAvailableFrame)));
                    } else {
                        held.entry(n).or_default().push(result.unwrap());
                    }
                }
                Op::Release(n) => {
                    if let Some(guard) = held.get_mut(&n).and_then(Vec::pop) {
                        prop_assert!(guard.release().is_ok());
                    }
                }
                Op::Unpin(n) => {
                    // Only legal without a matching guard when nobody holds it
                    if held.get(&n).map_or(true, Vec::is_empty) {
                        let result = bpm.unpin_page(&block(n), false);
                        if bpm.is_resident(&block(n)) {
                            prop_assert!(matches!(result, Err(Error::ProtocolViolation(_))));
                        } else {
                            prop_assert!(result.is_ok());
                        }
                    }
                }
            }

            for (n, guards) in &held {
                if !guards.is_empty() {
                    prop_assert_eq!(bpm.pin_count(&block(*n)), Some(guards.len() as u32));
                }
            }
            let pinned = held.values().filter(|g| !g.is_empty()).count();
            prop_assert_eq!(bpm.available(), POOL - pinned);
        }
    }
}

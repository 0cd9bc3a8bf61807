//! Read-through caching of immutable run records.

use crate::common::*;
use runboard::prelude::*;
use runboard::store::MemoryDatastore;
use std::sync::Arc;

fn delete_raw(backing: &MemoryDatastore, id: i64) {
    backing
        .delete(&Context::background(), &Key::int("TestRun", id))
        .unwrap();
}

#[test]
fn cached_reads_survive_store_deletion() {
    // Runs are immutable, so a cached copy is authoritative for its TTL.
    let backing = Arc::new(MemoryDatastore::new());
    let board = Runboard::builder().store(backing.clone()).build();
    let ctx = Context::background();

    let id = board
        .create_test_run(&ctx, &run("chrome", "66.0", "aa", at(1, 0), &[]))
        .unwrap();

    // Warm the cache, holding on to the keys for re-materialization.
    let keys = board.load_test_run_keys(&ctx, &filter_for(&["chrome"])).unwrap();
    let first = board.load_test_runs(&ctx, &filter_for(&["chrome"])).unwrap();
    assert_eq!(first[0].test_runs.len(), 1);

    // Materialization of the (already cached) record no longer needs the
    // backing store.
    delete_raw(&backing, id);
    let materialized = board.query().load_test_runs_by_keys(&ctx, keys).unwrap();
    assert_eq!(materialized[0].test_runs.len(), 1);
    assert_eq!(materialized[0].test_runs[0].id, id);
}

#[test]
fn eviction_drops_cached_copies() {
    let backing = Arc::new(MemoryDatastore::new());
    let board = Runboard::builder().store(backing.clone()).build();
    let ctx = Context::background();

    let id = board
        .create_test_run(&ctx, &run("chrome", "66.0", "aa", at(1, 0), &[]))
        .unwrap();
    let keys = board.load_test_run_keys(&ctx, &filter_for(&["chrome"])).unwrap();
    board.load_test_runs(&ctx, &filter_for(&["chrome"])).unwrap();

    // Evict everything the LRU tracked, then delete the backing record:
    // materialization must now fail, proving the cache no longer serves it.
    let evicted = board.evict_cached_runs(1.0);
    assert_eq!(evicted, vec![id]);
    delete_raw(&backing, id);

    let err = board.query().load_test_runs_by_keys(&ctx, keys).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn flush_cache_clears_every_entry() {
    let backing = Arc::new(MemoryDatastore::new());
    let board = Runboard::builder().store(backing.clone()).build();
    let ctx = Context::background();

    let id = board
        .create_test_run(&ctx, &run("chrome", "66.0", "aa", at(1, 0), &[]))
        .unwrap();
    let keys = board.load_test_run_keys(&ctx, &filter_for(&["chrome"])).unwrap();
    board.load_test_runs(&ctx, &filter_for(&["chrome"])).unwrap();

    board.flush_cache();
    delete_raw(&backing, id);
    assert!(board.query().load_test_runs_by_keys(&ctx, keys).is_err());
}

#[test]
fn delete_test_run_removes_record_and_cache_entry() {
    let board = Runboard::new();
    let ctx = Context::background();
    let id = board
        .create_test_run(&ctx, &run("chrome", "66.0", "aa", at(1, 0), &[]))
        .unwrap();
    board.load_test_runs(&ctx, &filter_for(&["chrome"])).unwrap();

    board.delete_test_run(&ctx, id).unwrap();
    let runs = board.load_test_runs(&ctx, &filter_for(&["chrome"])).unwrap();
    assert!(runs[0].test_runs.is_empty());
}

#[test]
fn uncached_board_always_reads_the_store() {
    let backing = Arc::new(MemoryDatastore::new());
    let board = Runboard::builder().store(backing.clone()).uncached().build();
    let ctx = Context::background();

    let id = board
        .create_test_run(&ctx, &run("chrome", "66.0", "aa", at(1, 0), &[]))
        .unwrap();
    let keys = board.load_test_run_keys(&ctx, &filter_for(&["chrome"])).unwrap();
    board.load_test_runs(&ctx, &filter_for(&["chrome"])).unwrap();

    delete_raw(&backing, id);
    assert!(board.query().load_test_runs_by_keys(&ctx, keys).is_err());
}

#[test]
fn sharded_store_is_interchangeable() {
    let board = Runboard::builder()
        .store(Arc::new(runboard::store::ShardedDatastore::new()))
        .build();
    let ctx = Context::background();
    board
        .create_test_run(&ctx, &run("chrome", "66.0", "aa", at(1, 0), &[]))
        .unwrap();
    board
        .create_test_run(&ctx, &run("firefox", "59.0", "aa", at(1, 1), &[]))
        .unwrap();

    let (shas, _) = board
        .get_aligned_run_shas(&ctx, &filter_for(&["chrome", "firefox"]))
        .unwrap();
    assert_eq!(shas, vec![sha("aa")]);
}

//! Aligned-run discovery over the descending scan.

use crate::common::*;
use runboard::prelude::*;
use std::collections::BTreeSet;

#[test]
fn sha_missing_a_product_is_not_aligned() {
    // shaA has runs for all three products; shaB is missing safari.
    let board = seeded_board(&[
        run("chrome", "66.0", "aa", at(1, 0), &[]),
        run("firefox", "59.0", "aa", at(1, 1), &[]),
        run("safari", "11.0", "aa", at(1, 2), &[]),
        run("chrome", "66.0", "bb", at(2, 0), &[]),
        run("firefox", "59.0", "bb", at(2, 1), &[]),
    ]);
    let (shas, keys) = board
        .get_aligned_run_shas(
            &Context::background(),
            &filter_for(&["chrome", "firefox", "safari"]),
        )
        .unwrap();

    assert_eq!(shas, vec![sha("aa")]);
    let aligned = &keys[&sha("aa")];
    assert_eq!(aligned.len(), 3);
    assert!(aligned.iter().all(|p| p.keys.len() == 1));
}

#[test]
fn aligned_shas_order_most_recent_first() {
    let board = seeded_board(&[
        run("chrome", "66.0", "aa", at(1, 0), &[]),
        run("firefox", "59.0", "aa", at(1, 1), &[]),
        run("chrome", "66.0", "bb", at(3, 0), &[]),
        run("firefox", "59.0", "bb", at(3, 1), &[]),
        run("chrome", "66.0", "cc", at(2, 0), &[]),
        run("firefox", "59.0", "cc", at(2, 1), &[]),
    ]);
    let (shas, _) = board
        .get_aligned_run_shas(&Context::background(), &filter_for(&["chrome", "firefox"]))
        .unwrap();

    // Emission follows the scan: a SHA completes at its *oldest* needed
    // run, so ordering tracks each SHA's completion point in the
    // descending scan.
    assert_eq!(shas, vec![sha("bb"), sha("cc"), sha("aa")]);
}

#[test]
fn single_product_alignment_is_every_sha() {
    let board = seeded_board(&[
        run("chrome", "66.0", "aa", at(1, 0), &[]),
        run("chrome", "66.0", "bb", at(2, 0), &[]),
    ]);
    let (shas, _) = board
        .get_aligned_run_shas(&Context::background(), &filter_for(&["chrome"]))
        .unwrap();
    assert_eq!(shas, vec![sha("bb"), sha("aa")]);
}

#[test]
fn duplicate_browser_runs_do_not_rematch() {
    // Two chrome runs at the same SHA with different labels: the first
    // (most recent) match claims the chrome slot, and the duplicate is
    // ignored. The stable-labeled chrome product never matches, so the
    // SHA stays unaligned. First match wins; this under-count is
    // intended behavior.
    let board = seeded_board(&[
        run("chrome", "66.0", "aa", at(1, 0), &["stable"]),
        run("chrome", "67.0", "aa", at(2, 0), &["experimental"]),
        run("firefox", "59.0", "aa", at(1, 1), &["stable"]),
    ]);
    let (shas, _) = board
        .get_aligned_run_shas(
            &Context::background(),
            &filter_for(&["chrome", "firefox"]),
        )
        .unwrap();
    // The experimental chrome run (scanned first) matches the bare
    // "chrome" product; firefox matches too, so alignment holds here.
    assert_eq!(shas, vec![sha("aa")]);

    let (shas, _) = board
        .get_aligned_run_shas(
            &Context::background(),
            &filter_for(&["chrome[stable]", "firefox"]),
        )
        .unwrap();
    // With chrome pinned to stable, the newer experimental run no longer
    // matches and the stable run still can: aligned via first-match on
    // the stable run.
    assert_eq!(shas, vec![sha("aa")]);
}

#[test]
fn label_filter_excludes_unlabeled_runs_from_alignment() {
    let board = seeded_board(&[
        run("chrome", "66.0", "aa", at(1, 0), &["master"]),
        run("firefox", "59.0", "aa", at(1, 1), &[]),
    ]);
    let mut filter = filter_for(&["chrome", "firefox"]);
    filter.labels = Some(BTreeSet::from(["master".to_string()]));

    let (shas, _) = board
        .get_aligned_run_shas(&Context::background(), &filter)
        .unwrap();
    assert!(shas.is_empty());
}

#[test]
fn limit_and_offset_page_through_aligned_shas() {
    let mut runs = Vec::new();
    for (day, mnemonic) in [(1, "aa"), (2, "bb"), (3, "cc")] {
        runs.push(run("chrome", "66.0", mnemonic, at(day, 0), &[]));
        runs.push(run("firefox", "59.0", mnemonic, at(day, 1), &[]));
    }
    let board = seeded_board(&runs);
    let filter = filter_for(&["chrome", "firefox"]);

    let mut page1 = filter.clone();
    page1.max_count = Some(2);
    let (shas, _) = board
        .get_aligned_run_shas(&Context::background(), &page1)
        .unwrap();
    assert_eq!(shas, vec![sha("cc"), sha("bb")]);

    let mut page2 = filter;
    page2.max_count = Some(2);
    page2.offset = Some(2);
    let (shas, _) = board
        .get_aligned_run_shas(&Context::background(), &page2)
        .unwrap();
    assert_eq!(shas, vec![sha("aa")]);
}

#[test]
fn time_window_restricts_alignment() {
    let board = seeded_board(&[
        run("chrome", "66.0", "aa", at(1, 0), &[]),
        run("firefox", "59.0", "aa", at(5, 0), &[]),
    ]);
    let mut filter = filter_for(&["chrome", "firefox"]);
    filter.from = Some(at(4, 0));

    // Only the firefox run is inside the window; chrome never matches.
    let (shas, _) = board
        .get_aligned_run_shas(&Context::background(), &filter)
        .unwrap();
    assert!(shas.is_empty());
}

#[test]
fn aligned_filter_loads_runs_for_aligned_shas() {
    let board = seeded_board(&[
        run("chrome", "66.0", "aa", at(1, 0), &[]),
        run("firefox", "59.0", "aa", at(1, 1), &[]),
        run("chrome", "66.0", "bb", at(2, 0), &[]),
    ]);
    let mut filter = filter_for(&["chrome", "firefox"]);
    filter.aligned = Some(true);

    let runs = board
        .load_test_runs(&Context::background(), &filter)
        .unwrap();
    assert_eq!(runs.len(), 2);
    for product_runs in &runs {
        assert_eq!(product_runs.test_runs.len(), 1);
        assert_eq!(product_runs.test_runs[0].revision(), sha("aa"));
    }
}

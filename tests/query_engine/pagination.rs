//! Pagination across key loading and filters.

use crate::common::*;
use runboard::prelude::*;

fn three_run_board() -> Runboard {
    seeded_board(&[
        run("chrome", "66.0", "aa", at(3, 0), &[]),
        run("chrome", "66.0", "bb", at(2, 0), &[]),
        run("chrome", "66.0", "cc", at(1, 0), &[]),
    ])
}

#[test]
fn limit_offset_pages_have_no_overlap_or_omission() {
    let board = three_run_board();
    let ctx = Context::background();

    let mut page1 = filter_for(&["chrome"]);
    page1.max_count = Some(2);
    let first = board.load_test_runs(&ctx, &page1).unwrap();
    let first_shas: Vec<String> = first[0]
        .test_runs
        .iter()
        .map(|r| r.revision().to_string())
        .collect();
    assert_eq!(first_shas, vec![sha("aa"), sha("bb")]);

    let mut page2 = page1.clone();
    page2.offset = Some(2);
    let second = board.load_test_runs(&ctx, &page2).unwrap();
    let second_shas: Vec<String> = second[0]
        .test_runs
        .iter()
        .map(|r| r.revision().to_string())
        .collect();
    assert_eq!(second_shas, vec![sha("cc")]);
}

#[test]
fn next_page_filter_drives_the_second_request() {
    let board = three_run_board();
    let ctx = Context::background();

    let mut page1 = filter_for(&["chrome"]);
    page1.max_count = Some(2);
    let first = board.load_test_runs(&ctx, &page1).unwrap();

    let page2 = page1.next_page(&first).expect("a full page implies another page");
    assert_eq!(page2.offset, Some(2));
    let second = board.load_test_runs(&ctx, &page2).unwrap();
    assert_eq!(second[0].test_runs.len(), 1);

    // The final short page reports no further pages.
    assert!(page2.next_page(&second).is_none());
}

#[test]
fn limit_larger_than_result_returns_everything() {
    let board = three_run_board();
    let mut filter = filter_for(&["chrome"]);
    filter.max_count = Some(100);

    let runs = board
        .load_test_runs(&Context::background(), &filter)
        .unwrap();
    assert_eq!(runs[0].test_runs.len(), 3);
}

#[test]
fn limit_truncates_the_materialization_path_too() {
    let board = three_run_board();
    let ctx = Context::background();

    // Pin all three revisions so the engine takes the id-filter path.
    let mut filter = filter_for(&["chrome"]);
    filter.shas = runboard_core::Shas(vec![sha("aa"), sha("bb"), sha("cc")]);
    filter.max_count = Some(2);

    let runs = board.load_test_runs(&ctx, &filter).unwrap();
    let shas: Vec<String> = runs[0]
        .test_runs
        .iter()
        .map(|r| r.revision().to_string())
        .collect();
    // Most recent two of the pinned set.
    assert_eq!(shas, vec![sha("aa"), sha("bb")]);
}

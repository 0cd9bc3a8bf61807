//! Key-loading behavior: per-product resolution, filters, ordering.

use crate::common::*;
use runboard::prelude::*;
use std::collections::BTreeSet;

#[test]
fn result_matches_product_count_and_order() {
    let board = seeded_board(&[
        run("chrome", "66.0", "aa", at(1, 0), &[]),
        run("firefox", "59.0", "aa", at(1, 1), &[]),
    ]);
    let filter = filter_for(&["firefox", "chrome", "safari"]);

    let keys = board
        .load_test_run_keys(&Context::background(), &filter)
        .unwrap();
    assert_eq!(keys.len(), 3);
    assert_eq!(keys[0].product.product.browser_name, "firefox");
    assert_eq!(keys[1].product.product.browser_name, "chrome");
    assert_eq!(keys[2].product.product.browser_name, "safari");
    assert_eq!(keys[0].keys.len(), 1);
    assert_eq!(keys[1].keys.len(), 1);
    assert!(keys[2].keys.is_empty());
}

#[test]
fn empty_products_fail_before_store_io() {
    let board = Runboard::new();
    let err = board
        .query()
        .load_test_run_keys(&Context::background(), &[], None, &[], None, None, None, None)
        .unwrap_err();
    assert!(matches!(err, Error::NoProducts));
}

#[test]
fn runs_order_most_recent_first() {
    let board = seeded_board(&[
        run("chrome", "66.0", "aa", at(1, 0), &[]),
        run("chrome", "66.0", "bb", at(3, 0), &[]),
        run("chrome", "66.0", "cc", at(2, 0), &[]),
    ]);
    let runs = board
        .load_test_runs(&Context::background(), &filter_for(&["chrome"]))
        .unwrap();

    let shas: Vec<String> = runs[0]
        .test_runs
        .iter()
        .map(|r| r.revision().to_string())
        .collect();
    assert_eq!(shas, vec![sha("bb"), sha("cc"), sha("aa")]);
}

#[test]
fn global_revision_filter_unions_across_revisions() {
    let board = seeded_board(&[
        run("chrome", "66.0", "aa", at(1, 0), &[]),
        run("chrome", "66.0", "bb", at(2, 0), &[]),
        run("chrome", "66.0", "cc", at(3, 0), &[]),
    ]);
    let mut filter = filter_for(&["chrome"]);
    filter.shas = runboard_core::Shas(vec![sha("aa"), sha("cc")]);

    let runs = board
        .load_test_runs(&Context::background(), &filter)
        .unwrap();
    let shas: BTreeSet<String> = runs[0]
        .test_runs
        .iter()
        .map(|r| r.revision().to_string())
        .collect();
    assert_eq!(shas, BTreeSet::from([sha("aa"), sha("cc")]));
}

#[test]
fn revision_prefix_scans_match() {
    let board = seeded_board(&[
        run("chrome", "66.0", "ab", at(1, 0), &[]),
        run("chrome", "66.0", "cd", at(2, 0), &[]),
    ]);
    let mut filter = filter_for(&["chrome"]);
    // A prefix shorter than a full hash resolves via the [sha, sha+"g") scan.
    filter.shas = runboard_core::Shas(vec!["abababab".to_string()]);

    let runs = board
        .load_test_runs(&Context::background(), &filter)
        .unwrap();
    assert_eq!(runs[0].test_runs.len(), 1);
    assert_eq!(runs[0].test_runs[0].revision(), sha("ab"));
}

#[test]
fn product_revision_narrows_global_filter() {
    let board = seeded_board(&[
        run("chrome", "66.0", "aa", at(1, 0), &[]),
        run("chrome", "66.0", "bb", at(2, 0), &[]),
    ]);
    // Global filter admits both revisions; the product pins one. The
    // intersection must narrow to the pinned revision only.
    let mut filter = TestRunFilter::default();
    filter.products = parse_product_specs(&[format!("chrome@{}", sha("aa"))]).unwrap();
    filter.shas = runboard_core::Shas(vec![sha("aa"), sha("bb")]);

    let runs = board
        .load_test_runs(&Context::background(), &filter)
        .unwrap();
    assert_eq!(runs[0].test_runs.len(), 1);
    assert_eq!(runs[0].test_runs[0].revision(), sha("aa"));
}

#[test]
fn version_prefix_is_dot_bounded() {
    let board = seeded_board(&[
        run("chrome", "66.0.1", "aa", at(1, 0), &[]),
        run("chrome", "66.0.2", "bb", at(2, 0), &[]),
        run("chrome", "660.0", "cc", at(3, 0), &[]),
        run("chrome", "66", "dd", at(4, 0), &[]),
    ]);
    let runs = board
        .load_test_runs(&Context::background(), &filter_for(&["chrome-66"]))
        .unwrap();

    let shas: BTreeSet<String> = runs[0]
        .test_runs
        .iter()
        .map(|r| r.revision().to_string())
        .collect();
    // Prefix scan catches 66.0.1/66.0.2; the exact-match union catches "66";
    // "660.0" must not leak in.
    assert_eq!(shas, BTreeSet::from([sha("aa"), sha("bb"), sha("dd")]));
}

#[test]
fn global_labels_restrict_all_products() {
    let board = seeded_board(&[
        run("chrome", "66.0", "aa", at(1, 0), &["stable"]),
        run("chrome", "67.0", "bb", at(2, 0), &["experimental"]),
        run("firefox", "59.0", "cc", at(3, 0), &["stable"]),
    ]);
    let mut filter = filter_for(&["chrome", "firefox"]);
    filter.labels = Some(BTreeSet::from(["stable".to_string()]));

    let runs = board
        .load_test_runs(&Context::background(), &filter)
        .unwrap();
    assert_eq!(runs[0].test_runs.len(), 1);
    assert_eq!(runs[0].test_runs[0].revision(), sha("aa"));
    assert_eq!(runs[1].test_runs.len(), 1);
}

#[test]
fn product_labels_restrict_only_their_product() {
    let board = seeded_board(&[
        run("chrome", "66.0", "aa", at(1, 0), &["stable"]),
        run("chrome", "67.0", "bb", at(2, 0), &["experimental"]),
    ]);
    let runs = board
        .load_test_runs(
            &Context::background(),
            &filter_for(&["chrome[experimental]"]),
        )
        .unwrap();
    assert_eq!(runs[0].test_runs.len(), 1);
    assert_eq!(runs[0].test_runs[0].revision(), sha("bb"));
}

#[test]
fn time_bounds_are_from_inclusive_to_exclusive() {
    let board = seeded_board(&[
        run("chrome", "66.0", "aa", at(1, 0), &[]),
        run("chrome", "66.0", "bb", at(2, 0), &[]),
        run("chrome", "66.0", "cc", at(3, 0), &[]),
    ]);
    let mut filter = filter_for(&["chrome"]);
    filter.from = Some(at(2, 0));
    filter.to = Some(at(3, 0));

    let runs = board
        .load_test_runs(&Context::background(), &filter)
        .unwrap();
    assert_eq!(runs[0].test_runs.len(), 1);
    assert_eq!(runs[0].test_runs[0].revision(), sha("bb"));
}

#[test]
fn loaded_runs_carry_store_ids() {
    let board = seeded_board(&[run("chrome", "66.0", "aa", at(1, 0), &[])]);
    let runs = board
        .load_test_runs(&Context::background(), &filter_for(&["chrome"]))
        .unwrap();
    assert!(runs[0].test_runs[0].id > 0);
}

#[test]
fn cancelled_context_propagates() {
    let board = seeded_board(&[run("chrome", "66.0", "aa", at(1, 0), &[])]);
    let ctx = Context::background();
    ctx.cancel();
    let err = board
        .load_test_runs(&ctx, &filter_for(&["chrome"]))
        .unwrap_err();
    assert!(err.is_cancellation());
}

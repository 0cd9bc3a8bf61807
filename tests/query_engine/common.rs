//! Shared fixtures for the query engine suites.

use chrono::{DateTime, TimeZone, Utc};
use runboard::prelude::*;
use runboard_core::ProductAtRevision;

/// A short revision padded out of a mnemonic, e.g. "aa" -> "aaaaaaaaaa".
pub fn sha(mnemonic: &str) -> String {
    mnemonic.chars().cycle().take(10).collect()
}

fn full_sha(mnemonic: &str) -> String {
    mnemonic.chars().cycle().take(40).collect()
}

/// April 2018, day `day`, hour `hour`.
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 4, day, hour, 0, 0).unwrap()
}

/// A complete test-run record for seeding stores.
pub fn run(
    browser: &str,
    version: &str,
    mnemonic: &str,
    time_start: DateTime<Utc>,
    labels: &[&str],
) -> TestRun {
    TestRun {
        id: 0,
        product_at_revision: ProductAtRevision {
            product: Product {
                browser_name: browser.to_string(),
                browser_version: version.to_string(),
                os_name: "linux".to_string(),
                os_version: String::new(),
            },
            revision: sha(mnemonic),
            full_revision_hash: full_sha(mnemonic),
        },
        results_url: format!("https://results.example.com/{}-{}.json", browser, mnemonic),
        created_at: time_start,
        time_start,
        time_end: Some(time_start + chrono::Duration::hours(1)),
        raw_results_url: String::new(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
    }
}

/// A board over a fresh in-memory store, seeded with `runs`.
pub fn seeded_board(runs: &[TestRun]) -> Runboard {
    let board = Runboard::new();
    let ctx = Context::background();
    for run in runs {
        board.create_test_run(&ctx, run).unwrap();
    }
    board
}

/// Product specs parsed from their string forms.
pub fn products(specs: &[&str]) -> ProductSpecs {
    parse_product_specs(specs).unwrap()
}

/// A filter over the given product spec strings.
pub fn filter_for(specs: &[&str]) -> TestRunFilter {
    let mut filter = TestRunFilter::default();
    filter.products = products(specs);
    filter
}

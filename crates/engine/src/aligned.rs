//! Aligned-run discovery.
//!
//! A SHA is *aligned* when, within the filtered time window, every
//! requested product has at least one run at that SHA. Alignment is found
//! in a single descending-time scan over full entities: per SHA we track
//! which product indices have matched and collect one key per index, and
//! a SHA is emitted the moment its index set covers every product.
//! Because the scan is time-descending, emission order is most-recent
//! SHA first.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashSet;
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use runboard_core::{
    Context, KeysByProduct, ProductSpec, ProductTestRunKeys, Result, TestRun,
};
use runboard_core::params::MAX_COUNT_MAX_VALUE;
use runboard_store::{Datastore, Direction, FilterOp};

use crate::query::TEST_RUN_KIND;

/// Single-scan greedy matching of SHAs across all products.
///
/// A product index that has already matched for a SHA never rematches on a
/// later duplicate-browser run; the first match wins and duplicates are
/// ignored. This can under-count when one browser appears twice for a SHA
/// with different labels, which is long-standing intended behavior.
#[allow(clippy::too_many_arguments)]
pub(crate) fn aligned_run_shas(
    store: &dyn Datastore,
    ctx: &Context,
    products: &[ProductSpec],
    labels: Option<&BTreeSet<String>>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    limit: Option<usize>,
    offset: Option<usize>,
) -> Result<(Vec<String>, HashMap<String, KeysByProduct>)> {
    let limit = limit.unwrap_or(MAX_COUNT_MAX_VALUE);

    let mut query = store
        .new_query(TEST_RUN_KIND)
        .order("time_start", Direction::Descending);
    if let Some(labels) = labels {
        for label in labels.iter().filter(|l| !l.is_empty()) {
            query = query.filter("labels", FilterOp::Eq, json!(label));
        }
    }
    if let Some(from) = from {
        query = query.filter("time_start", FilterOp::Ge, json!(from.to_rfc3339()));
    }
    if let Some(to) = to {
        query = query.filter("time_start", FilterOp::Lt, json!(to.to_rfc3339()));
    }

    let mut matched_products: HashMap<String, FxHashSet<usize>> = HashMap::new();
    let mut key_collector: HashMap<String, KeysByProduct> = HashMap::new();
    let mut aligned_keys: HashMap<String, KeysByProduct> = HashMap::new();
    let mut done: FxHashSet<String> = FxHashSet::default();
    let mut shas: Vec<String> = Vec::new();

    let mut iter = store.run(ctx, query)?;
    while let Some((key, entity)) = iter.next_entity()? {
        let entity = match entity {
            Some(entity) => entity,
            None => continue,
        };
        let mut run: TestRun = serde_json::from_value(entity)?;
        run.id = key.int_id();

        // First product index to match wins this run.
        let matching = match products.iter().position(|p| p.matches(&run)) {
            Some(index) => index,
            None => continue,
        };

        let sha = run.revision().to_string();
        let matched = matched_products.entry(sha.clone()).or_default();
        if matched.contains(&matching) {
            continue;
        }
        matched.insert(matching);
        let collector = key_collector.entry(sha.clone()).or_insert_with(|| {
            products
                .iter()
                .map(|product| ProductTestRunKeys {
                    product: product.clone(),
                    keys: Vec::new(),
                })
                .collect()
        });
        collector[matching].keys = vec![key];

        if matched.len() == products.len() && !done.contains(&sha) {
            if offset.map_or(true, |offset| done.len() >= offset) {
                shas.push(sha.clone());
            }
            done.insert(sha.clone());
            if let Some(keys) = key_collector.get(&sha) {
                aligned_keys.insert(sha, keys.clone());
            }
            if shas.len() >= limit {
                return Ok((shas, aligned_keys));
            }
        }
    }

    debug!(aligned = shas.len(), "completed alignment scan");
    Ok((shas, aligned_keys))
}

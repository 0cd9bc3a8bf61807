//! Filtered, paginated test-run queries.
//!
//! `load_test_run_keys` resolves a logical query — per-product browser,
//! version prefix, labels, revisions, time range, pagination — into
//! per-product key lists. Because the store cannot combine inequality
//! filters across fields, revision and version constraints are resolved by
//! separate key-only sub-scans whose results are merged into an
//! [`IdFilter`]; when a filter exists, the candidate entities are
//! materialized and matched in memory instead of scanned.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

use runboard_core::{
    is_latest, Context, Error, Key, KeysByProduct, ProductSpec, ProductTestRunKeys,
    ProductTestRuns, Result, TestRun, TestRunIds, TestRunsByProduct,
};
use runboard_core::params::MAX_COUNT_MAX_VALUE;
use runboard_store::{Datastore, DatastoreExt, Direction, FilterOp, Query};

use crate::aligned::aligned_run_shas;
use crate::idfilter::IdFilter;

/// The entity kind test runs are stored under.
pub const TEST_RUN_KIND: &str = "TestRun";

/// Complex queries over test-run entities.
///
/// Encapsulated because single store queries cannot carry multiple
/// inequality filters, so keys must be loaded and merged here.
pub trait TestRunQuery: Send + Sync {
    /// Load the test runs matching the given parameters.
    #[allow(clippy::too_many_arguments)]
    fn load_test_runs(
        &self,
        ctx: &Context,
        products: &[ProductSpec],
        labels: Option<&BTreeSet<String>>,
        revisions: &[String],
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<TestRunsByProduct>;

    /// Load the keys of the test runs matching the given parameters.
    #[allow(clippy::too_many_arguments)]
    fn load_test_run_keys(
        &self,
        ctx: &Context,
        products: &[ProductSpec],
        labels: Option<&BTreeSet<String>>,
        revisions: &[String],
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<KeysByProduct>;

    /// Materialize previously-loaded keys into full runs, setting their ids.
    fn load_test_runs_by_keys(&self, ctx: &Context, keys: KeysByProduct)
        -> Result<TestRunsByProduct>;

    /// The short SHAs of runs that exist for all the given products,
    /// most recent first, along with each SHA's keys by product.
    #[allow(clippy::too_many_arguments)]
    fn get_aligned_run_shas(
        &self,
        ctx: &Context,
        products: &[ProductSpec],
        labels: Option<&BTreeSet<String>>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<(Vec<String>, HashMap<String, KeysByProduct>)>;
}

/// A [`TestRunQuery`] backed by a [`Datastore`].
pub struct DatastoreTestRunQuery {
    store: Arc<dyn Datastore>,
}

impl DatastoreTestRunQuery {
    /// Create a query engine over the given store.
    ///
    /// Pass a [`CachedDatastore`](crate::CachedDatastore) to serve run
    /// materialization through the test-run cache.
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        DatastoreTestRunQuery { store }
    }
}

impl TestRunQuery for DatastoreTestRunQuery {
    fn load_test_runs(
        &self,
        ctx: &Context,
        products: &[ProductSpec],
        labels: Option<&BTreeSet<String>>,
        revisions: &[String],
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<TestRunsByProduct> {
        if products.is_empty() {
            return Err(Error::NoProducts);
        }
        let keys =
            self.load_test_run_keys(ctx, products, labels, revisions, from, to, limit, offset)?;
        self.load_test_runs_by_keys(ctx, keys)
    }

    fn load_test_run_keys(
        &self,
        ctx: &Context,
        products: &[ProductSpec],
        labels: Option<&BTreeSet<String>>,
        revisions: &[String],
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<KeysByProduct> {
        if products.is_empty() {
            return Err(Error::NoProducts);
        }

        let mut base_query = self.store.new_query(TEST_RUN_KIND);
        if let Some(offset) = offset {
            base_query = base_query.offset(offset);
        }
        if let Some(labels) = labels {
            for label in labels.iter().filter(|l| !l.is_empty()) {
                base_query = base_query.filter("labels", FilterOp::Eq, json!(label));
            }
        }

        // More than one revision, or a single pinned one, becomes a global
        // key filter every product must intersect with.
        let mut global_filter = IdFilter::Unconstrained;
        if revisions.len() > 1 || (revisions.len() == 1 && !is_latest(&revisions[0])) {
            let mut ids = Vec::new();
            for sha in revisions {
                ids.extend(load_keys_for_revision(
                    self.store.as_ref(),
                    ctx,
                    &base_query,
                    sha,
                )?);
            }
            global_filter = IdFilter::of(ids);
            debug!(
                keys = global_filter.len().unwrap_or(0),
                revisions = revisions.len(),
                "resolved revision key filter"
            );
        }

        let mut result = KeysByProduct::with_capacity(products.len());
        for product in products {
            let mut product_filter = global_filter.clone();
            let mut query = base_query.clone().filter(
                "browser_name",
                FilterOp::Eq,
                json!(&product.product.browser_name),
            );
            for label in &product.labels {
                query = query.filter("labels", FilterOp::Eq, json!(label));
            }

            // A product-level revision narrows the running filter; it never
            // widens it.
            if !is_latest(&product.revision) {
                let ids =
                    load_keys_for_revision(self.store.as_ref(), ctx, &query, &product.revision)?;
                debug!(
                    keys = ids.len(),
                    product = %product,
                    "resolved product revision filter"
                );
                product_filter = product_filter.merge(IdFilter::of(ids));
            }
            if !product.product.browser_version.is_empty() {
                let ids = load_keys_for_browser_version(
                    self.store.as_ref(),
                    ctx,
                    &query,
                    &product.product.browser_version,
                )?;
                debug!(
                    keys = ids.len(),
                    version = %product.product.browser_version,
                    "resolved browser version filter"
                );
                product_filter = product_filter.merge(IdFilter::of(ids));
            }

            let keys = if let Some(ids) = product_filter.ids() {
                // With a specific set of possibilities it is much cheaper to
                // turn the query on its head and filter the entities.
                debug!(candidates = ids.len(), "loading viable runs to filter them");
                let candidate_keys: Vec<Key> =
                    ids.iter().map(|id| Key::int(TEST_RUN_KIND, *id)).collect();
                let mut runs: Vec<TestRun> =
                    self.store.get_multi_as(ctx, &candidate_keys)?;
                TestRunIds::from_keys(&candidate_keys).assign(&mut runs);
                runs.sort_by(|a, b| {
                    b.time_start.cmp(&a.time_start).then(b.id.cmp(&a.id))
                });

                let mut keys: Vec<Key> = runs
                    .iter()
                    .filter(|run| {
                        product.matches(run)
                            && from.map_or(true, |from| run.time_start >= from)
                            && to.map_or(true, |to| run.time_start < to)
                    })
                    .map(|run| Key::int(TEST_RUN_KIND, run.id))
                    .collect();
                match limit {
                    Some(limit) if keys.len() >= limit => keys.truncate(limit),
                    _ if keys.len() >= MAX_COUNT_MAX_VALUE => keys.truncate(MAX_COUNT_MAX_VALUE),
                    _ => {}
                }
                keys
            } else {
                // Otherwise, run the plain ordered scan. Expensive.
                debug!(product = %product, "falling back to full store scan");
                let mut query = query.order("time_start", Direction::Descending);
                if let Some(from) = from {
                    query = query.filter("time_start", FilterOp::Ge, json!(from.to_rfc3339()));
                }
                if let Some(to) = to {
                    query = query.filter("time_start", FilterOp::Lt, json!(to.to_rfc3339()));
                }
                let max = limit
                    .unwrap_or(MAX_COUNT_MAX_VALUE)
                    .min(MAX_COUNT_MAX_VALUE);
                let (keys, _) = self
                    .store
                    .get_all(ctx, query.keys_only().limit(max))?;
                keys
            };

            debug!(keys = keys.len(), product = %product, "loaded keys for product");
            result.push(ProductTestRunKeys {
                product: product.clone(),
                keys,
            });
        }
        Ok(result)
    }

    fn load_test_runs_by_keys(
        &self,
        ctx: &Context,
        keys_by_product: KeysByProduct,
    ) -> Result<TestRunsByProduct> {
        let mut result = TestRunsByProduct::with_capacity(keys_by_product.len());
        for entry in keys_by_product {
            let mut runs: Vec<TestRun> = self.store.get_multi_as(ctx, &entry.keys)?;
            TestRunIds::from_keys(&entry.keys).assign(&mut runs);
            result.push(ProductTestRuns {
                product: entry.product,
                test_runs: runs,
            });
        }
        Ok(result)
    }

    fn get_aligned_run_shas(
        &self,
        ctx: &Context,
        products: &[ProductSpec],
        labels: Option<&BTreeSet<String>>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<(Vec<String>, HashMap<String, KeysByProduct>)> {
        aligned_run_shas(
            self.store.as_ref(),
            ctx,
            products,
            labels,
            from,
            to,
            limit,
            offset,
        )
    }
}

/// Loads the run ids for a revision prefix or full string match.
///
/// Prefixes resolve through a half-open range scan `[sha, sha + "g")` on
/// the full revision hash; `'g'` is the character immediately after the
/// hex alphabet, so the upper bound admits every hash with the prefix.
fn load_keys_for_revision(
    store: &dyn Datastore,
    ctx: &Context,
    query: &Query,
    sha: &str,
) -> Result<Vec<i64>> {
    let rev_query = if sha.len() < 40 {
        debug!(from = %sha, to = %format!("{}g", sha), "finding revisions in range");
        query
            .clone()
            .order("full_revision_hash", Direction::Ascending)
            .limit(MAX_COUNT_MAX_VALUE)
            .filter("full_revision_hash", FilterOp::Ge, json!(sha))
            .filter("full_revision_hash", FilterOp::Lt, json!(format!("{}g", sha)))
    } else {
        debug!(sha = %sha, "finding exact revision");
        query
            .clone()
            .filter("full_revision_hash", FilterOp::Eq, json!(&sha[..40]))
    };

    let (keys, _) = store.get_all(ctx, rev_query.keys_only())?;
    Ok(keys.iter().map(Key::int_id).collect())
}

/// Loads the run ids matching a browser version exactly or by prefix.
///
/// The prefix scan bounds lexicographically between `prefix + "."` and
/// `prefix + "." + (char after '9')`, and is unioned with an exact-match
/// scan on the literal version string.
fn load_keys_for_browser_version(
    store: &dyn Datastore,
    ctx: &Context,
    query: &Query,
    version: &str,
) -> Result<Vec<i64>> {
    let mut ids = BTreeSet::new();

    let prefix_query = version_prefix(query.clone(), "browser_version", version, true);
    let (keys, _) = store.get_all(ctx, prefix_query.keys_only())?;
    ids.extend(keys.iter().map(Key::int_id));

    let exact_query = query
        .clone()
        .filter("browser_version", FilterOp::Eq, json!(version));
    let (keys, _) = store.get_all(ctx, exact_query.keys_only())?;
    ids.extend(keys.iter().map(Key::int_id));

    Ok(ids.into_iter().collect())
}

/// Returns the query with a dot-bounded prefix filter on the given field.
fn version_prefix(query: Query, field: &str, prefix: &str, desc: bool) -> Query {
    let direction = if desc {
        Direction::Descending
    } else {
        Direction::Ascending
    };
    query
        .limit(MAX_COUNT_MAX_VALUE)
        .order(field, direction)
        .filter(field, FilterOp::Ge, json!(format!("{}.", prefix)))
        .filter(
            field,
            FilterOp::Le,
            // ':' is the character after '9'.
            json!(format!("{}.{}", prefix, (b'9' + 1) as char)),
        )
}

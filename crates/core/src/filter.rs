//! Typed filter bundle for test-run queries.
//!
//! [`TestRunFilter`] is the inbound interface from the HTTP layer: every
//! way the dashboard can narrow a run listing, already parsed into typed
//! values. It also owns the pagination story — [`TestRunFilter::next_page`]
//! computes the filter for the page after a loaded result set.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::Result;
use crate::spec::{default_products, products_or_default, ProductSpecs};
use crate::types::{TestRunsByProduct, EXPERIMENTAL_LABEL, LATEST_SHA, MASTER_LABEL, STABLE_LABEL};

/// A list of commit/revision SHAs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shas(pub Vec<String>);

impl Shas {
    /// Whether the list is empty, or only contains the latest keyword.
    pub fn is_empty_or_latest(&self) -> bool {
        self.0.is_empty() || (self.0.len() == 1 && crate::types::is_latest(&self.0[0]))
    }

    /// The first SHA in the list, or the latest keyword.
    pub fn first_or_latest(&self) -> &str {
        if self.is_empty_or_latest() {
            LATEST_SHA
        } else {
            &self.0[0]
        }
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The ways test runs can be filtered by the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestRunFilter {
    /// Revisions to filter by.
    #[serde(default, skip_serializing_if = "Shas::is_empty")]
    pub shas: Shas,

    /// Labels every matching run must carry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeSet<String>>,

    /// Restrict to runs whose revision is shared across all products.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aligned: Option<bool>,

    /// Lower (inclusive) time bound on run start time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,

    /// Upper (exclusive) time bound on run start time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,

    /// Maximum number of runs per product.
    #[serde(
        default,
        rename = "maxcount",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_count: Option<usize>,

    /// Offset for paginating with `max_count`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,

    /// The products to include.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: ProductSpecs,
}

impl TestRunFilter {
    /// Whether the filter is an empty query (or the equivalent defaults of
    /// an empty query).
    pub fn is_default_query(&self) -> bool {
        self.shas.is_empty_or_latest()
            && self.labels.as_ref().map_or(true, BTreeSet::is_empty)
            && self.aligned.is_none()
            && self.from.is_none()
            && self.max_count.map_or(true, |c| c == 1)
            && self.products.is_empty()
    }

    /// The current filter, or the dashboard's default query (aligned stable
    /// runs) if it is a default query.
    pub fn or_default(self) -> Self {
        self.or_aligned_stable_runs()
    }

    /// The current filter, or a query for stable runs with an aligned SHA.
    pub fn or_aligned_stable_runs(mut self) -> Self {
        if !self.is_default_query() {
            return self;
        }
        self.aligned = Some(true);
        self.labels = Some(BTreeSet::from([STABLE_LABEL.to_string()]));
        self
    }

    /// The current filter, or a query for the latest experimental runs.
    pub fn or_experimental_runs(mut self) -> Self {
        if !self.is_default_query() {
            return self;
        }
        self.labels = Some(BTreeSet::from([EXPERIMENTAL_LABEL.to_string()]));
        self
    }

    /// The filter with the master-only restriction (a label of "master").
    pub fn master_only(mut self) -> Self {
        self.labels
            .get_or_insert_with(BTreeSet::new)
            .insert(MASTER_LABEL.to_string());
        self
    }

    /// Whether the products are empty or the equivalent of the default set.
    pub fn is_default_products(&self) -> bool {
        self.products.is_empty() || self.products == default_products()
    }

    /// The ordered list of products to include, or the default list.
    pub fn products_or_default(&self) -> ProductSpecs {
        products_or_default(self.products.clone())
    }

    /// A filter for the next page of results matching this filter, based on
    /// the runs that were loaded for it. Returns `None` when the loaded
    /// results show there is no further page.
    ///
    /// Count-limited queries page by bumping the offset; pure time-window
    /// queries page by sliding the window back by its own span.
    pub fn next_page(&self, loaded_runs: &TestRunsByProduct) -> Option<TestRunFilter> {
        if let Some(max_count) = self.max_count {
            // We only have another page if N results were returned for a max of N.
            let any_maxed_out = loaded_runs.iter().any(|p| p.test_runs.len() >= max_count);
            if any_maxed_out {
                let mut next = self.clone();
                next.offset = Some(max_count + self.offset.unwrap_or(0));
                return Some(next);
            }
        } else if let Some(from) = self.from {
            let to = self.to.unwrap_or_else(Utc::now);
            let span = to - from;
            let mut next = self.clone();
            next.from = Some(from - span);
            next.to = Some(from - Duration::milliseconds(1));
            return Some(next);
        }
        None
    }

    /// A base64-encoded copy of the filter, for use as a pagination token.
    pub fn token(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(URL_SAFE.encode(bytes))
    }
}

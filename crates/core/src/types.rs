//! Model types for test runs and products.
//!
//! A [`TestRun`] is an immutable-after-creation record of one completed test
//! execution of a product (a browser version on an OS version) at a given
//! revision of the test suite. Runs are identified by a store-assigned
//! integer key, surfaced on the record as [`TestRun::id`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::spec::ProductSpec;

/// The implicit label present for runs marked 'experimental'.
pub const EXPERIMENTAL_LABEL: &str = "experimental";

/// The implicit label present for runs marked 'stable'.
pub const STABLE_LABEL: &str = "stable";

/// The implicit label present for runs marked 'beta'.
pub const BETA_LABEL: &str = "beta";

/// The implicit label present for runs from the master branch.
pub const MASTER_LABEL: &str = "master";

/// The 'latest' keyword/special case for revisions.
pub const LATEST_SHA: &str = "latest";

/// The browser names runs are ingested for, in display order.
pub const DEFAULT_BROWSER_NAMES: [&str; 4] = ["chrome", "edge", "firefox", "safari"];

/// Returns whether a SHA is empty or "latest", both of which are treated as
/// looking up the latest run for each browser.
pub fn is_latest(sha: &str) -> bool {
    sha.is_empty() || sha == LATEST_SHA
}

/// Returns whether the given name is a known browser name.
pub fn is_browser_name(name: &str) -> bool {
    DEFAULT_BROWSER_NAMES.contains(&name)
}

/// Product uniquely defines a browser version, running on an OS version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Product {
    /// Browser name, e.g. "chrome".
    pub browser_name: String,
    /// Browser version, e.g. "66.0.3359.139". May be empty.
    #[serde(default)]
    pub browser_version: String,
    /// OS name, e.g. "linux". May be empty.
    #[serde(default)]
    pub os_name: String,
    /// OS version. May be empty.
    #[serde(default)]
    pub os_version: String,
}

impl Product {
    /// Create a product constrained only by browser name.
    pub fn browser(name: impl Into<String>) -> Self {
        Product {
            browser_name: name.into(),
            ..Default::default()
        }
    }
}

impl fmt::Display for Product {
    /// Dash-delimited, omitting empty trailing parts: `chrome-66.0-linux-4.4`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.browser_name)?;
        if !self.browser_version.is_empty() {
            write!(f, "-{}", self.browser_version)?;
        }
        if !self.os_name.is_empty() {
            write!(f, "-{}", self.os_name)?;
            if !self.os_version.is_empty() {
                write!(f, "-{}", self.os_version)?;
            }
        }
        Ok(())
    }
}

/// A parsed semantic version string, e.g. "66.0.3359.139" or "68.0a1".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Version {
    /// Major version number.
    pub major: u32,
    /// Minor version number, if present.
    pub minor: Option<u32>,
    /// Build number, if present.
    pub build: Option<u32>,
    /// Patch number, if present.
    pub patch: Option<u32>,
    /// Trailing channel marker, e.g. "a1" or " beta". May be empty.
    pub channel: String,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major)?;
        if let Some(minor) = self.minor {
            write!(f, ".{}", minor)?;
        }
        if let Some(build) = self.build {
            write!(f, ".{}", build)?;
        }
        if let Some(patch) = self.patch {
            write!(f, ".{}", patch)?;
        }
        write!(f, "{}", self.channel)
    }
}

/// A product pinned to a specific revision of the test suite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAtRevision {
    /// The product.
    #[serde(flatten)]
    pub product: Product,

    /// The first 10 characters of the SHA-1 of the tested revision.
    ///
    /// The authoritative git revision indicator is `full_revision_hash`;
    /// this short form is what query predicates compare against.
    pub revision: String,

    /// The complete SHA-1 hash of the tested revision.
    #[serde(default)]
    pub full_revision_hash: String,
}

impl fmt::Display for ProductAtRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.product, self.revision)
    }
}

/// Metadata for one completed test run.
///
/// Created once by the ingestion path and never mutated; the engine only
/// reads (and administrative tooling conceptually deletes) these records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestRun {
    /// Store-assigned key of this run. Zero means "not yet assigned".
    #[serde(default)]
    pub id: i64,

    /// What was tested, and at which revision.
    #[serde(flatten)]
    pub product_at_revision: ProductAtRevision,

    /// URL for the summary of results, derived from raw results.
    #[serde(default)]
    pub results_url: String,

    /// Time when the test run metadata was first created.
    pub created_at: DateTime<Utc>,

    /// Time when the test run started.
    pub time_start: DateTime<Utc>,

    /// Time when the test run ended.
    #[serde(default)]
    pub time_end: Option<DateTime<Utc>>,

    /// URL for the raw results JSON object.
    #[serde(default)]
    pub raw_results_url: String,

    /// Labels for the test run, e.g. "experimental", "master".
    #[serde(default)]
    pub labels: Vec<String>,
}

impl TestRun {
    /// The run's browser name.
    pub fn browser_name(&self) -> &str {
        &self.product_at_revision.product.browser_name
    }

    /// The run's browser version.
    pub fn browser_version(&self) -> &str {
        &self.product_at_revision.product.browser_version
    }

    /// The run's short revision SHA.
    pub fn revision(&self) -> &str {
        &self.product_at_revision.revision
    }

    /// The run's full revision hash.
    pub fn full_revision_hash(&self) -> &str {
        &self.product_at_revision.full_revision_hash
    }

    /// The run's labels as a set.
    pub fn labels_set(&self) -> BTreeSet<String> {
        self.labels.iter().cloned().collect()
    }

    /// Whether the run carries every label in `labels`.
    pub fn has_labels(&self, labels: &BTreeSet<String>) -> bool {
        labels.iter().all(|l| self.labels.iter().any(|rl| rl == l))
    }
}

/// A list of test runs.
pub type TestRuns = Vec<TestRun>;

/// A store key: an entity kind plus an integer or name identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    /// Entity kind, e.g. "TestRun".
    pub kind: String,
    /// The identifier within the kind.
    pub id: KeyId,
}

/// The identifier half of a [`Key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyId {
    /// Store-assigned integer identifier.
    Int(i64),
    /// Caller-chosen name identifier.
    Name(String),
}

impl Key {
    /// A key with an integer identifier.
    pub fn int(kind: impl Into<String>, id: i64) -> Self {
        Key {
            kind: kind.into(),
            id: KeyId::Int(id),
        }
    }

    /// A key with a name identifier.
    pub fn name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Key {
            kind: kind.into(),
            id: KeyId::Name(name.into()),
        }
    }

    /// The integer identifier, or zero for name keys.
    pub fn int_id(&self) -> i64 {
        match &self.id {
            KeyId::Int(id) => *id,
            KeyId::Name(_) => 0,
        }
    }

    /// The name identifier, or empty for integer keys.
    pub fn name_id(&self) -> &str {
        match &self.id {
            KeyId::Int(_) => "",
            KeyId::Name(name) => name,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            KeyId::Int(id) => write!(f, "{}/{}", self.kind, id),
            KeyId::Name(name) => write!(f, "{}/{}", self.kind, name),
        }
    }
}

/// The integer IDs of a list of test runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRunIds(pub Vec<i64>);

impl TestRunIds {
    /// Collect the integer IDs from a list of keys.
    pub fn from_keys(keys: &[Key]) -> Self {
        TestRunIds(keys.iter().map(Key::int_id).collect())
    }

    /// Assign these IDs positionally onto the given runs.
    pub fn assign(&self, runs: &mut [TestRun]) {
        for (run, id) in runs.iter_mut().zip(self.0.iter()) {
            run.id = *id;
        }
    }
}

/// The keys that satisfied one product's predicate.
#[derive(Debug, Clone, Default)]
pub struct ProductTestRunKeys {
    /// The predicate the keys satisfied.
    pub product: ProductSpec,
    /// Matching store keys, most recent first.
    pub keys: Vec<Key>,
}

/// The runs that satisfied one product's predicate.
#[derive(Debug, Clone, Default)]
pub struct ProductTestRuns {
    /// The predicate the runs satisfied.
    pub product: ProductSpec,
    /// Matching runs, most recent first.
    pub test_runs: TestRuns,
}

/// Per-product key lists, in caller-supplied product order.
pub type KeysByProduct = Vec<ProductTestRunKeys>;

/// Per-product run lists, in caller-supplied product order.
pub type TestRunsByProduct = Vec<ProductTestRuns>;

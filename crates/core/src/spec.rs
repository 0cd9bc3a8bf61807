//! Product specs: query predicates over test runs.
//!
//! A [`ProductSpec`] is not a stored entity. It is the parsed form of a
//! product string such as `chrome-66[experimental]@0123456789`, and the
//! predicate the query and alignment engines evaluate against candidate
//! runs.

use once_cell::sync::Lazy;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::params::parse_product_spec;
use crate::types::{is_latest, Product, TestRun, DEFAULT_BROWSER_NAMES, EXPERIMENTAL_LABEL};

/// A parsed product spec: browser (required), optional version prefix,
/// optional label set, optional revision constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductSpec {
    /// The product constraint. An empty `browser_version` means any version;
    /// a non-empty one matches as a dot-delimited prefix.
    pub product: Product,

    /// Revision constraint: a SHA (or SHA prefix), or empty/"latest" for no
    /// constraint.
    pub revision: String,

    /// Labels that must all be present on a matching run (subset match).
    pub labels: BTreeSet<String>,
}

impl ProductSpec {
    /// A spec constrained only by browser name.
    pub fn browser(name: impl Into<String>) -> Self {
        ProductSpec {
            product: Product::browser(name),
            ..Default::default()
        }
    }

    /// Whether the spec's browser matches the given run.
    pub fn browser_matches(&self, run: &TestRun) -> bool {
        run.browser_name() == self.product.browser_name
    }

    /// Whether the spec matches the given run.
    ///
    /// All of browser-name equality, revision constraint, label subset
    /// containment, and dot-bounded version prefix must hold.
    pub fn matches(&self, run: &TestRun) -> bool {
        if !self.browser_matches(run) {
            return false;
        }
        if !is_latest(&self.revision)
            && self.revision != run.revision()
            && !run.full_revision_hash().starts_with(&self.revision)
        {
            return false;
        }
        if !self.labels.is_empty() && !run.has_labels(&self.labels) {
            return false;
        }
        if !self.product.browser_version.is_empty() {
            // Make "6" not match "60.123" by adding trailing dots to both.
            let want = format!("{}.", self.product.browser_version);
            let have = format!("{}.", run.browser_version());
            if !have.starts_with(&want) {
                return false;
            }
        }
        true
    }

    /// Whether the spec is restricted to experimental runs.
    pub fn is_experimental(&self) -> bool {
        self.labels.contains(EXPERIMENTAL_LABEL)
    }

    /// A capitalized version of the product's name.
    pub fn display_name(&self) -> &str {
        match self.product.browser_name.as_str() {
            "chrome" => "Chrome",
            "edge" => "Edge",
            "firefox" => "Firefox",
            "safari" => "Safari",
            other => other,
        }
    }
}

impl fmt::Display for ProductSpec {
    /// `browser[-version[-os[-osversion]]][[label,label]][@revision]`.
    ///
    /// Labels render sorted so the output is deterministic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.product)?;
        let labels: Vec<&str> = self
            .labels
            .iter()
            .filter(|l| !l.is_empty())
            .map(String::as_str)
            .collect();
        if !labels.is_empty() {
            write!(f, "[{}]", labels.join(","))?;
        }
        if !is_latest(&self.revision) {
            write!(f, "@{}", self.revision)?;
        }
        Ok(())
    }
}

impl FromStr for ProductSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_product_spec(s)
    }
}

// Specs cross the wire in their string form, so that filter tokens stay
// compact and human-readable.
impl Serialize for ProductSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ProductSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// An ordered list of product specs.
pub type ProductSpecs = Vec<ProductSpec>;

static DEFAULT_PRODUCTS: Lazy<ProductSpecs> = Lazy::new(|| {
    DEFAULT_BROWSER_NAMES
        .iter()
        .copied()
        .map(ProductSpec::browser)
        .collect()
});

/// The default set of products shown by the dashboard, one per browser.
pub fn default_products() -> ProductSpecs {
    DEFAULT_PRODUCTS.clone()
}

/// The given products, or the default set if empty.
pub fn products_or_default(products: ProductSpecs) -> ProductSpecs {
    if products.is_empty() {
        default_products()
    } else {
        products
    }
}

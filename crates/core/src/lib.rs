//! Core types for the runboard test-run engine
//!
//! This crate defines the fundamental vocabulary shared by the store, cache,
//! and query-engine crates:
//! - [`TestRun`]: an immutable record of one completed test execution
//! - [`ProductSpec`]: a query predicate over browser/version/labels/revision
//! - [`Key`]: a store key (kind + integer or name identifier)
//! - [`Context`]: deadline/cancellation propagation for blocking I/O
//! - [`Error`]: the canonical error type for all runboard operations

pub mod context;
pub mod error;
pub mod filter;
pub mod params;
pub mod spec;
pub mod types;

pub use context::Context;
pub use error::{Error, Result};
pub use filter::{Shas, TestRunFilter};
pub use spec::{default_products, ProductSpec, ProductSpecs};
pub use types::{
    is_browser_name, is_latest, Key, KeyId, KeysByProduct, Product, ProductAtRevision,
    ProductTestRunKeys, ProductTestRuns, TestRun, TestRunIds, TestRuns, TestRunsByProduct,
    Version, BETA_LABEL, DEFAULT_BROWSER_NAMES, EXPERIMENTAL_LABEL, LATEST_SHA, MASTER_LABEL,
    STABLE_LABEL,
};

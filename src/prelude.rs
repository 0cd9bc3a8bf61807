//! Convenient imports for runboard.
//!
//! ```ignore
//! use runboard::prelude::*;
//!
//! let board = Runboard::new();
//! let runs = board.load_test_runs(&Context::background(), &TestRunFilter::default())?;
//! ```

// Main entry point
pub use crate::dashboard::{Runboard, RunboardBuilder};

// Error handling and cancellation
pub use runboard_core::{Context, Error, Result};

// Model types
pub use runboard_core::{
    Key, KeysByProduct, Product, ProductSpec, ProductSpecs, Shas, TestRun, TestRunFilter,
    TestRuns, TestRunsByProduct,
};

// Parameter parsing
pub use runboard_core::params::{parse_product_spec, parse_product_specs, parse_sha};

// Engine interfaces, for callers composing their own stack
pub use runboard_engine::{CachedDatastore, TestRunQuery};
pub use runboard_store::{Datastore, DatastoreExt};

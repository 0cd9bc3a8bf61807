//! # runboard
//!
//! Query, alignment, and caching engine for browser test-run results.
//!
//! runboard stores immutable test-run records and answers the dashboard's
//! questions about them: which runs match a set of product specs, labels,
//! revisions, and time bounds; and which revisions are *aligned* — covered
//! by a run from every requested product. Reads of immutable run records
//! flow through a TTL'd, gzip-compressed object cache.
//!
//! ## Quick start
//!
//! ```ignore
//! use runboard::prelude::*;
//!
//! let board = Runboard::new();
//! let ctx = Context::background();
//!
//! // Ingest runs (normally done by the results receiver).
//! board.create_test_run(&ctx, &run)?;
//!
//! // Query: latest chrome and firefox stable runs.
//! let mut filter = TestRunFilter::default();
//! filter.products = parse_product_specs(&["chrome[stable]", "firefox[stable]"])?;
//! let by_product = board.load_test_runs(&ctx, &filter)?;
//!
//! // Alignment: revisions covered by every product.
//! let (shas, keys) = board.get_aligned_run_shas(&ctx, &filter)?;
//! ```
//!
//! The facade owns no global state: the backing store, the cache, and the
//! query engine are constructed explicitly and passed down, so tests can
//! substitute any [`Datastore`] implementation.

#![warn(missing_docs)]

mod dashboard;

pub mod prelude;

pub use dashboard::{Runboard, RunboardBuilder};

// Re-export the building blocks for callers that compose their own stack.
pub use runboard_cache as cache;
pub use runboard_core::{Context, Error, Result};
pub use runboard_engine as engine;
pub use runboard_store as store;

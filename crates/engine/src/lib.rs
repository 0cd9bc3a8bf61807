//! Test-run query and alignment engines
//!
//! The backing store supports only simple equality/range filters — no
//! multi-field inequality and no joins — so the interesting queries are
//! resolved here by merging key sets from independent sub-scans
//! ([`IdFilter`]) and by a single streaming scan for cross-product
//! alignment ([`TestRunQuery::get_aligned_run_shas`]).
//!
//! [`CachedDatastore`] decorates any store so that immutable test-run
//! records are served through a TTL'd object cache, with concurrent
//! fan-out for batched gets.

mod aligned;
mod cached;
mod idfilter;
mod query;

pub use cached::{test_run_cache_key, CachedDatastore, TEST_RUN_CACHE_TTL};
pub use idfilter::IdFilter;
pub use query::{DatastoreTestRunQuery, TestRunQuery, TEST_RUN_KIND};

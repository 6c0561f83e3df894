//! Reference engine for docvec.
//!
//! Collections live in memory and are snapshotted into a directory holding
//! `manifest.json` and `docs.bin`. Filters are parsed from a small SQL-like
//! expression language and queries are answered by exhaustive scoring.

pub mod filter;
pub mod local;
pub mod persistence;
pub mod search;

pub use filter::{ExprFilter, Filter};
pub use local::{LocalCollection, LocalEngine};
pub use persistence::{Manifest, FORMAT_VERSION};

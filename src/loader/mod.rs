//! Snapshot loading.
//!
//! Fetches the two annual documents, unwraps and renames their records,
//! and holds the result for the engine.

pub mod normalize;
pub mod repository;
pub mod source;

pub use repository::{SnapshotLoader, SnapshotPair, SnapshotRepository};

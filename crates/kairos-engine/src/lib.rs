//! The incremental standings engine: Event Applier, Ranker, Snapshot
//! Builder, and Query Engine over the [`kairos_store::Store`]
//! abstraction. See each module for the component it implements.

pub mod applier;
pub mod builder;
pub mod overall;
pub mod query;
pub mod ranker;
pub mod reconstruct;
pub mod replay;
pub mod source;

pub use builder::{BulkSnapshotReport, SnapshotBuilder, SnapshotError, SnapshotOutcome};
pub use overall::{OverallRankingRow, overall_standings_at};
pub use query::{HandleMismatch, QueryEngine, ValidationReport};

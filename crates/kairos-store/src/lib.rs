//! The Snapshot Store abstraction: three logical collections per
//! contest (`standingsState`, `baseSnapshots`, `deltaSnapshots`),
//! backed interchangeably by PostgreSQL (the document-database
//! backend) or a JSON-file-per-contest layout (the file backend).
//!
//! The generic `find`/`findOne`/`findOneAndUpdate`/`bulkWrite`/
//! `countDocuments` filter language from the design is expressed here
//! as typed methods rather than a dynamic query map — the set of
//! queries the engine actually issues is small and fixed, so a typed
//! trait catches backend drift at compile time instead of at runtime.
//! Every method below corresponds to one documented filter/sort/range
//! operation.

mod file;
mod memory;
mod postgres;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use kairos_common::error::Result;
use kairos_common::types::{BaseSnapshot, DeltaSnapshot, ParticipantState};

/// Either kind of snapshot, returned by lookups that need "whichever
/// snapshot (base or delta) is the most recent at-or-before T" without
/// caring which kind it is — used by delta construction's chain walk.
#[derive(Debug, Clone)]
pub enum AnySnapshot {
    Base(BaseSnapshot),
    Delta(DeltaSnapshot),
}

impl AnySnapshot {
    pub fn timestamp_seconds(&self) -> i64 {
        match self {
            AnySnapshot::Base(b) => b.timestamp_seconds,
            AnySnapshot::Delta(d) => d.timestamp_seconds,
        }
    }

    /// The base snapshot this one chains from: itself, if it already is
    /// one.
    pub fn controlling_base_timestamp(&self) -> i64 {
        match self {
            AnySnapshot::Base(b) => b.timestamp_seconds,
            AnySnapshot::Delta(d) => d.base_snapshot_timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BulkWriteSummary {
    pub inserted: i64,
    pub updated: i64,
}

/// Storage abstraction consumed by the Snapshot Builder and Query
/// Engine. Implementors must be serializable per
/// `(backend, collection, contestId)`: see each backend's module docs
/// for how that's achieved.
#[async_trait]
pub trait Store: Send + Sync {
    // --- standingsState: one document per (contestId, handle) ---

    async fn get_participant(
        &self,
        contest_id: i64,
        handle: &str,
    ) -> Result<Option<ParticipantState>>;

    async fn list_participants(&self, contest_id: i64) -> Result<Vec<ParticipantState>>;

    /// `findOneAndUpdate(filter, update, {upsert: true})` over
    /// `standingsState`, keyed by `(contestId, handle)`.
    async fn upsert_participant(&self, contest_id: i64, state: ParticipantState) -> Result<()>;

    async fn upsert_participants_bulk(
        &self,
        contest_id: i64,
        states: Vec<ParticipantState>,
    ) -> Result<BulkWriteSummary>;

    async fn count_participants(&self, contest_id: i64) -> Result<i64>;

    // --- baseSnapshots: unique on (contestId, timestampSeconds) ---

    async fn find_base_snapshot(
        &self,
        contest_id: i64,
        timestamp_seconds: i64,
    ) -> Result<Option<BaseSnapshot>>;

    /// Nearest base snapshot at-or-before `t`, i.e. `sort by
    /// timestampSeconds desc, filter timestampSeconds <= t, limit 1`.
    async fn latest_base_snapshot_at_or_before(
        &self,
        contest_id: i64,
        t: i64,
    ) -> Result<Option<BaseSnapshot>>;

    /// Errors (`EngineError::Storage`) on a duplicate `(contestId, T)`
    /// unless the existing snapshot is removed first.
    async fn insert_base_snapshot(&self, snapshot: BaseSnapshot) -> Result<()>;

    async fn delete_base_snapshot(&self, contest_id: i64, timestamp_seconds: i64) -> Result<()>;

    // --- deltaSnapshots: unique on (contestId, timestampSeconds) ---

    async fn find_delta_snapshot(
        &self,
        contest_id: i64,
        timestamp_seconds: i64,
    ) -> Result<Option<DeltaSnapshot>>;

    /// Ascending `deltaSnapshots` with `afterExclusive < timestampSeconds
    /// <= toInclusive`. Callers pass a base snapshot's timestamp as the
    /// exclusive bound to get the window the Query Engine and
    /// delta-chain reconstruction both walk.
    async fn list_delta_snapshots_in_range(
        &self,
        contest_id: i64,
        after_exclusive: i64,
        to_inclusive: i64,
    ) -> Result<Vec<DeltaSnapshot>>;

    async fn insert_delta_snapshot(&self, snapshot: DeltaSnapshot) -> Result<()>;

    /// The most recent snapshot (base or delta) at-or-before `t`,
    /// across both collections — used by `createDeltaSnapshot` step 1
    /// to find its controlling base.
    async fn latest_snapshot_at_or_before(
        &self,
        contest_id: i64,
        t: i64,
    ) -> Result<Option<AnySnapshot>> {
        let base = self.latest_base_snapshot_at_or_before(contest_id, t).await?;
        let delta = self
            .list_delta_snapshots_in_range(contest_id, i64::MIN, t)
            .await?
            .into_iter()
            .next_back();
        Ok(match (base, delta) {
            (Some(b), Some(d)) if d.timestamp_seconds > b.timestamp_seconds => {
                Some(AnySnapshot::Delta(d))
            }
            (Some(b), _) => Some(AnySnapshot::Base(b)),
            (None, Some(d)) => Some(AnySnapshot::Delta(d)),
            (None, None) => None,
        })
    }
}

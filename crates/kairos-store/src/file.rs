//! File backend: one JSON file per `(collectionName, contestId)` pair
//! under a configured data directory. Each read-modify-write cycle
//! reads the whole file, mutates in memory, then rewrites atomically
//! (write to a sibling temp file, then rename over the target).
//!
//! Serializability per `(collection, contestId)` is provided by an
//! in-process `Mutex` per key, kept in a `DashMap` the way
//! `strata-storage`/`strata-engine` keep per-key locks — this does not
//! protect against a second OS process touching the same files, which
//! is out of scope for this backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use kairos_common::error::{EngineError, Result};
use kairos_common::types::{BaseSnapshot, DeltaSnapshot, ParticipantState};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::{BulkWriteSummary, Store};

const STANDINGS_STATE: &str = "standingsState";
const BASE_SNAPSHOTS: &str = "baseSnapshots";
const DELTA_SNAPSHOTS: &str = "deltaSnapshots";

pub struct FileStore {
    data_dir: PathBuf,
    locks: DashMap<(String, i64), Arc<Mutex<()>>>,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, collection: &str, contest_id: i64) -> Arc<Mutex<()>> {
        self.locks
            .entry((collection.to_string(), contest_id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn collection_path(&self, collection: &str, contest_id: i64) -> PathBuf {
        self.data_dir.join(collection).join(format!("{contest_id}.json"))
    }

    async fn read_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_array<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(items)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get_participant(
        &self,
        contest_id: i64,
        handle: &str,
    ) -> Result<Option<ParticipantState>> {
        let path = self.collection_path(STANDINGS_STATE, contest_id);
        let participants: Vec<ParticipantState> = Self::read_array(&path).await?;
        Ok(participants.into_iter().find(|p| p.handle == handle))
    }

    async fn list_participants(&self, contest_id: i64) -> Result<Vec<ParticipantState>> {
        let path = self.collection_path(STANDINGS_STATE, contest_id);
        Self::read_array(&path).await
    }

    async fn upsert_participant(&self, contest_id: i64, state: ParticipantState) -> Result<()> {
        let lock = self.lock_for(STANDINGS_STATE, contest_id);
        let _guard = lock.lock().await;
        let path = self.collection_path(STANDINGS_STATE, contest_id);
        let mut participants: Vec<ParticipantState> = Self::read_array(&path).await?;
        match participants.iter_mut().find(|p| p.handle == state.handle) {
            Some(existing) => *existing = state,
            None => participants.push(state),
        }
        Self::write_array(&path, &participants).await
    }

    async fn upsert_participants_bulk(
        &self,
        contest_id: i64,
        states: Vec<ParticipantState>,
    ) -> Result<BulkWriteSummary> {
        let lock = self.lock_for(STANDINGS_STATE, contest_id);
        let _guard = lock.lock().await;
        let path = self.collection_path(STANDINGS_STATE, contest_id);
        let mut participants: Vec<ParticipantState> = Self::read_array(&path).await?;
        let mut summary = BulkWriteSummary::default();
        for state in states {
            match participants.iter_mut().find(|p| p.handle == state.handle) {
                Some(existing) => {
                    *existing = state;
                    summary.updated += 1;
                }
                None => {
                    participants.push(state);
                    summary.inserted += 1;
                }
            }
        }
        Self::write_array(&path, &participants).await?;
        Ok(summary)
    }

    async fn count_participants(&self, contest_id: i64) -> Result<i64> {
        Ok(self.list_participants(contest_id).await?.len() as i64)
    }

    async fn find_base_snapshot(
        &self,
        contest_id: i64,
        timestamp_seconds: i64,
    ) -> Result<Option<BaseSnapshot>> {
        let path = self.collection_path(BASE_SNAPSHOTS, contest_id);
        let snapshots: Vec<BaseSnapshot> = Self::read_array(&path).await?;
        Ok(snapshots
            .into_iter()
            .find(|s| s.timestamp_seconds == timestamp_seconds))
    }

    async fn latest_base_snapshot_at_or_before(
        &self,
        contest_id: i64,
        t: i64,
    ) -> Result<Option<BaseSnapshot>> {
        let path = self.collection_path(BASE_SNAPSHOTS, contest_id);
        let snapshots: Vec<BaseSnapshot> = Self::read_array(&path).await?;
        Ok(snapshots
            .into_iter()
            .filter(|s| s.timestamp_seconds <= t)
            .max_by_key(|s| s.timestamp_seconds))
    }

    async fn insert_base_snapshot(&self, snapshot: BaseSnapshot) -> Result<()> {
        let lock = self.lock_for(BASE_SNAPSHOTS, snapshot.contest_id);
        let _guard = lock.lock().await;
        let path = self.collection_path(BASE_SNAPSHOTS, snapshot.contest_id);
        let mut snapshots: Vec<BaseSnapshot> = Self::read_array(&path).await?;
        if snapshots
            .iter()
            .any(|s| s.timestamp_seconds == snapshot.timestamp_seconds)
        {
            return Err(EngineError::storage(format!(
                "base snapshot already exists for contest {} at T={}",
                snapshot.contest_id, snapshot.timestamp_seconds
            )));
        }
        snapshots.push(snapshot);
        Self::write_array(&path, &snapshots).await
    }

    async fn delete_base_snapshot(&self, contest_id: i64, timestamp_seconds: i64) -> Result<()> {
        let lock = self.lock_for(BASE_SNAPSHOTS, contest_id);
        let _guard = lock.lock().await;
        let path = self.collection_path(BASE_SNAPSHOTS, contest_id);
        let mut snapshots: Vec<BaseSnapshot> = Self::read_array(&path).await?;
        snapshots.retain(|s| s.timestamp_seconds != timestamp_seconds);
        Self::write_array(&path, &snapshots).await
    }

    async fn find_delta_snapshot(
        &self,
        contest_id: i64,
        timestamp_seconds: i64,
    ) -> Result<Option<DeltaSnapshot>> {
        let path = self.collection_path(DELTA_SNAPSHOTS, contest_id);
        let snapshots: Vec<DeltaSnapshot> = Self::read_array(&path).await?;
        Ok(snapshots
            .into_iter()
            .find(|s| s.timestamp_seconds == timestamp_seconds))
    }

    async fn list_delta_snapshots_in_range(
        &self,
        contest_id: i64,
        after_exclusive: i64,
        to_inclusive: i64,
    ) -> Result<Vec<DeltaSnapshot>> {
        let path = self.collection_path(DELTA_SNAPSHOTS, contest_id);
        let mut snapshots: Vec<DeltaSnapshot> = Self::read_array(&path).await?;
        snapshots.retain(|s| {
            s.timestamp_seconds > after_exclusive && s.timestamp_seconds <= to_inclusive
        });
        snapshots.sort_by_key(|s| s.timestamp_seconds);
        Ok(snapshots)
    }

    async fn insert_delta_snapshot(&self, snapshot: DeltaSnapshot) -> Result<()> {
        let lock = self.lock_for(DELTA_SNAPSHOTS, snapshot.contest_id);
        let _guard = lock.lock().await;
        let path = self.collection_path(DELTA_SNAPSHOTS, snapshot.contest_id);
        let mut snapshots: Vec<DeltaSnapshot> = Self::read_array(&path).await?;
        if snapshots
            .iter()
            .any(|s| s.timestamp_seconds == snapshot.timestamp_seconds)
        {
            return Err(EngineError::storage(format!(
                "delta snapshot already exists for contest {} at T={}",
                snapshot.contest_id, snapshot.timestamp_seconds
            )));
        }
        snapshots.push(snapshot);
        Self::write_array(&path, &snapshots).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_common::types::ParticipantType;

    fn sample_participant(handle: &str) -> ParticipantState {
        ParticipantState::new(handle, ParticipantType::Contestant, false)
    }

    #[tokio::test]
    async fn upsert_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.upsert_participant(1, sample_participant("alice")).await.unwrap();
        let got = store.get_participant(1, "alice").await.unwrap();
        assert_eq!(got.unwrap().handle, "alice");
    }

    #[tokio::test]
    async fn duplicate_base_snapshot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let snap = BaseSnapshot {
            contest_id: 1,
            timestamp_seconds: 120,
            participants: vec![],
            participant_count: 0,
        };
        store.insert_base_snapshot(snap.clone()).await.unwrap();
        assert!(store.insert_base_snapshot(snap).await.is_err());
    }

    #[tokio::test]
    async fn delta_range_query_is_half_open_ascending() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        for t in [10, 20, 30] {
            store
                .insert_delta_snapshot(DeltaSnapshot {
                    contest_id: 1,
                    timestamp_seconds: t,
                    base_snapshot_timestamp: 0,
                    changes: vec![],
                    change_count: 0,
                })
                .await
                .unwrap();
        }
        let got = store.list_delta_snapshots_in_range(1, 10, 30).await.unwrap();
        let timestamps: Vec<i64> = got.iter().map(|d| d.timestamp_seconds).collect();
        assert_eq!(timestamps, vec![20, 30]);
    }
}

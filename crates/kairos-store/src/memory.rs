//! In-memory backend used by engine tests and by the CLI's `--ephemeral`
//! mode. Not durable past process exit; exists purely as a fixture,
//! reaching for an in-process double rather than spinning up Postgres
//! for every unit test.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use kairos_common::error::{EngineError, Result};
use kairos_common::types::{BaseSnapshot, DeltaSnapshot, ParticipantState};

use crate::{BulkWriteSummary, Store};

#[derive(Default)]
struct Inner {
    participants: BTreeMap<(i64, String), ParticipantState>,
    bases: BTreeMap<(i64, i64), BaseSnapshot>,
    deltas: BTreeMap<(i64, i64), DeltaSnapshot>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_participant(
        &self,
        contest_id: i64,
        handle: &str,
    ) -> Result<Option<ParticipantState>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .participants
            .get(&(contest_id, handle.to_string()))
            .cloned())
    }

    async fn list_participants(&self, contest_id: i64) -> Result<Vec<ParticipantState>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .participants
            .range((contest_id, String::new())..(contest_id + 1, String::new()))
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn upsert_participant(&self, contest_id: i64, state: ParticipantState) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .participants
            .insert((contest_id, state.handle.clone()), state);
        Ok(())
    }

    async fn upsert_participants_bulk(
        &self,
        contest_id: i64,
        states: Vec<ParticipantState>,
    ) -> Result<BulkWriteSummary> {
        let mut inner = self.inner.lock().unwrap();
        let mut summary = BulkWriteSummary::default();
        for state in states {
            let key = (contest_id, state.handle.clone());
            if inner.participants.insert(key, state).is_some() {
                summary.updated += 1;
            } else {
                summary.inserted += 1;
            }
        }
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
        let inner = self.inner.lock().unwrap();
        Ok(inner.bases.get(&(contest_id, timestamp_seconds)).cloned())
    }

    async fn latest_base_snapshot_at_or_before(
        &self,
        contest_id: i64,
        t: i64,
    ) -> Result<Option<BaseSnapshot>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .bases
            .range((contest_id, i64::MIN)..=(contest_id, t))
            .next_back()
            .map(|(_, v)| v.clone()))
    }

    async fn insert_base_snapshot(&self, snapshot: BaseSnapshot) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = (snapshot.contest_id, snapshot.timestamp_seconds);
        if inner.bases.contains_key(&key) {
            return Err(EngineError::storage(format!(
                "base snapshot already exists for contest {} at T={}",
                snapshot.contest_id, snapshot.timestamp_seconds
            )));
        }
        inner.bases.insert(key, snapshot);
        Ok(())
    }

    async fn delete_base_snapshot(&self, contest_id: i64, timestamp_seconds: i64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.bases.remove(&(contest_id, timestamp_seconds));
        Ok(())
    }

    async fn find_delta_snapshot(
        &self,
        contest_id: i64,
        timestamp_seconds: i64,
    ) -> Result<Option<DeltaSnapshot>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.deltas.get(&(contest_id, timestamp_seconds)).cloned())
    }

    async fn list_delta_snapshots_in_range(
        &self,
        contest_id: i64,
        after_exclusive: i64,
        to_inclusive: i64,
    ) -> Result<Vec<DeltaSnapshot>> {
        let inner = self.inner.lock().unwrap();
        let lower = after_exclusive.saturating_add(1);
        Ok(inner
            .deltas
            .range((contest_id, lower)..=(contest_id, to_inclusive))
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn insert_delta_snapshot(&self, snapshot: DeltaSnapshot) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = (snapshot.contest_id, snapshot.timestamp_seconds);
        if inner.deltas.contains_key(&key) {
            return Err(EngineError::storage(format!(
                "delta snapshot already exists for contest {} at T={}",
                snapshot.contest_id, snapshot.timestamp_seconds
            )));
        }
        inner.deltas.insert(key, snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_common::types::ParticipantType;

    #[tokio::test]
    async fn latest_base_at_or_before_picks_nearest() {
        let store = MemoryStore::new();
        for t in [0, 300, 600] {
            store
                .insert_base_snapshot(BaseSnapshot {
                    contest_id: 1,
                    timestamp_seconds: t,
                    participants: vec![],
                    participant_count: 0,
                })
                .await
                .unwrap();
        }
        let got = store
            .latest_base_snapshot_at_or_before(1, 450)
            .await
            .unwrap();
        assert_eq!(got.unwrap().timestamp_seconds, 300);
    }

    #[tokio::test]
    async fn bulk_upsert_reports_insert_vs_update() {
        let store = MemoryStore::new();
        let alice = ParticipantState::new("alice", ParticipantType::Contestant, false);
        store.upsert_participant(1, alice.clone()).await.unwrap();
        let bob = ParticipantState::new("bob", ParticipantType::Contestant, false);
        let summary = store
            .upsert_participants_bulk(1, vec![alice, bob])
            .await
            .unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.inserted, 1);
    }

    #[tokio::test]
    async fn contests_are_isolated() {
        let store = MemoryStore::new();
        store
            .upsert_participant(1, ParticipantState::new("alice", ParticipantType::Contestant, false))
            .await
            .unwrap();
        assert!(store.get_participant(2, "alice").await.unwrap().is_none());
    }
}

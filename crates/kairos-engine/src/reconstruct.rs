//! Snapshot-backed reconstruction: load the nearest base at-or-before
//! T, then fold in every delta strictly after it up to T. Shared by
//! the Snapshot Builder (to recover a prior snapshot's state before
//! diffing) and the Query Engine (to answer `standingsAt`).

use std::collections::BTreeMap;

use kairos_common::error::Result;
use kairos_common::types::{ChangeOp, ParticipantState};
use kairos_store::Store;

/// `None` means no base snapshot exists at or before `t` for this
/// contest; callers decide whether to fall back to a full replay.
pub async fn reconstruct_from_snapshots(
    store: &dyn Store,
    contest_id: i64,
    t: i64,
) -> Result<Option<BTreeMap<String, ParticipantState>>> {
    let Some(base) = store.latest_base_snapshot_at_or_before(contest_id, t).await? else {
        return Ok(None);
    };

    let mut map: BTreeMap<String, ParticipantState> = base
        .participants
        .into_iter()
        .map(|p| (p.handle.clone(), p))
        .collect();

    let deltas = store
        .list_delta_snapshots_in_range(contest_id, base.timestamp_seconds, t)
        .await?;
    for delta in deltas {
        for change in delta.changes {
            match change.op {
                ChangeOp::Insert | ChangeOp::Update => {
                    map.insert(change.handle, change.state);
                }
            }
        }
    }

    Ok(Some(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_common::types::{
        BaseSnapshot, ChangeOp, DeltaSnapshot, ParticipantChange, ParticipantState, ParticipantType,
    };
    use kairos_store::MemoryStore;

    #[tokio::test]
    async fn no_base_snapshot_returns_none() {
        let store = MemoryStore::new();
        let result = reconstruct_from_snapshots(&store, 1, 100).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn folds_deltas_on_top_of_the_nearest_base() {
        let store = MemoryStore::new();
        store
            .insert_base_snapshot(BaseSnapshot {
                contest_id: 1,
                timestamp_seconds: 0,
                participants: vec![ParticipantState::new(
                    "alice",
                    ParticipantType::Contestant,
                    false,
                )],
                participant_count: 1,
            })
            .await
            .unwrap();

        let mut bob = ParticipantState::new("bob", ParticipantType::Contestant, false);
        bob.total_points = 500;
        store
            .insert_delta_snapshot(DeltaSnapshot {
                contest_id: 1,
                timestamp_seconds: 10,
                base_snapshot_timestamp: 0,
                changes: vec![ParticipantChange {
                    handle: "bob".to_string(),
                    op: ChangeOp::Insert,
                    state: bob,
                }],
                change_count: 1,
            })
            .await
            .unwrap();

        let map = reconstruct_from_snapshots(&store, 1, 10)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["bob"].total_points, 500);

        let before_delta = reconstruct_from_snapshots(&store, 1, 5)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before_delta.len(), 1);
    }
}

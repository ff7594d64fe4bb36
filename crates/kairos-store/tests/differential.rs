//! Differential tests: the same sequence of store operations against
//! the in-memory and file backends must observe identical results.
//! Any divergence here is a bug per the design's "backends are
//! semantically equivalent" rule.

use kairos_common::types::{
    BaseSnapshot, ChangeOp, DeltaSnapshot, ParticipantChange, ParticipantState, ParticipantType,
};
use kairos_store::{FileStore, MemoryStore, Store};

async fn run_against<S: Store>(store: &S) -> (Option<i64>, Vec<i64>) {
    for t in [0, 120, 240] {
        store
            .insert_base_snapshot(BaseSnapshot {
                contest_id: 1,
                timestamp_seconds: t,
                participants: vec![ParticipantState::new(
                    format!("p{t}"),
                    ParticipantType::Contestant,
                    false,
                )],
                participant_count: 1,
            })
            .await
            .unwrap();
    }
    for t in [10, 20, 130, 230] {
        store
            .insert_delta_snapshot(DeltaSnapshot {
                contest_id: 1,
                timestamp_seconds: t,
                base_snapshot_timestamp: if t < 120 { 0 } else { 120 },
                changes: vec![ParticipantChange {
                    handle: format!("d{t}"),
                    op: ChangeOp::Insert,
                    state: ParticipantState::new(format!("d{t}"), ParticipantType::Contestant, false),
                }],
                change_count: 1,
            })
            .await
            .unwrap();
    }

    let nearest_at_200 = store
        .latest_base_snapshot_at_or_before(1, 200)
        .await
        .unwrap()
        .map(|s| s.timestamp_seconds);

    let deltas_in_window = store
        .list_delta_snapshots_in_range(1, 0, 130)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.timestamp_seconds)
        .collect::<Vec<_>>();

    (nearest_at_200, deltas_in_window)
}

#[tokio::test]
async fn memory_and_file_backends_agree_on_nearest_snapshot_lookup() {
    let memory = MemoryStore::new();
    let (memory_nearest, memory_deltas) = run_against(&memory).await;

    let dir = tempfile::tempdir().unwrap();
    let file = FileStore::new(dir.path());
    let (file_nearest, file_deltas) = run_against(&file).await;

    assert_eq!(memory_nearest, Some(120));
    assert_eq!(memory_nearest, file_nearest);
    assert_eq!(memory_deltas, file_deltas);
}

#[tokio::test]
async fn memory_and_file_backends_agree_on_duplicate_rejection() {
    let memory = MemoryStore::new();
    let snap = BaseSnapshot {
        contest_id: 7,
        timestamp_seconds: 0,
        participants: vec![],
        participant_count: 0,
    };
    memory.insert_base_snapshot(snap.clone()).await.unwrap();
    let memory_result = memory.insert_base_snapshot(snap.clone()).await;

    let dir = tempfile::tempdir().unwrap();
    let file = FileStore::new(dir.path());
    file.insert_base_snapshot(snap.clone()).await.unwrap();
    let file_result = file.insert_base_snapshot(snap).await;

    assert!(memory_result.is_err());
    assert!(file_result.is_err());
}

#[tokio::test]
async fn memory_and_file_backends_agree_on_bulk_upsert_counts() {
    let participants = vec![
        ParticipantState::new("alice", ParticipantType::Contestant, false),
        ParticipantState::new("bob", ParticipantType::Contestant, false),
    ];

    let memory = MemoryStore::new();
    memory
        .upsert_participant(1, participants[0].clone())
        .await
        .unwrap();
    let memory_summary = memory
        .upsert_participants_bulk(1, participants.clone())
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let file = FileStore::new(dir.path());
    file.upsert_participant(1, participants[0].clone())
        .await
        .unwrap();
    let file_summary = file.upsert_participants_bulk(1, participants).await.unwrap();

    assert_eq!(memory_summary.inserted, file_summary.inserted);
    assert_eq!(memory_summary.updated, file_summary.updated);
}

//! Snapshot Builder: constructs base and delta snapshots by replaying
//! submissions, and classifies/schedules construction against the
//! configured base/delta cadence.

use std::collections::BTreeMap;
use std::sync::Arc;

use kairos_common::error::{EngineError, Result};
use kairos_common::types::{
    BaseSnapshot, ChangeOp, DeltaSnapshot, ParticipantChange, ParticipantState,
};
use kairos_store::Store;

use crate::reconstruct::reconstruct_from_snapshots;
use crate::replay::full_replay;
use crate::source::{HackSource, ProblemSource, SubmissionSource};

pub enum SnapshotKind {
    Base,
    Delta,
}

/// One constructed snapshot, as returned by [`SnapshotBuilder::create_delta_snapshot`]
/// which may itself degrade to a base snapshot when no prior snapshot exists.
pub enum SnapshotOutcome {
    Base(BaseSnapshot),
    Delta(DeltaSnapshot),
}

#[derive(Debug, Clone, Default)]
pub struct BulkSnapshotReport {
    pub base_created: i64,
    pub delta_created: i64,
    pub errors: Vec<SnapshotError>,
}

#[derive(Debug, Clone)]
pub struct SnapshotError {
    pub timestamp_seconds: i64,
    pub message: String,
}

pub struct SnapshotBuilder {
    store: Arc<dyn Store>,
    problems: Arc<dyn ProblemSource>,
    submissions: Arc<dyn SubmissionSource>,
    hacks: Option<Arc<dyn HackSource>>,
}

impl SnapshotBuilder {
    pub fn new(
        store: Arc<dyn Store>,
        problems: Arc<dyn ProblemSource>,
        submissions: Arc<dyn SubmissionSource>,
        hacks: Option<Arc<dyn HackSource>>,
    ) -> Self {
        Self {
            store,
            problems,
            submissions,
            hacks,
        }
    }

    /// Full replay of the contest, writing `contestId`'s current
    /// standings state collection from scratch.
    pub async fn initialize_standings_state(&self, contest_id: i64) -> Result<()> {
        let map = full_replay(
            self.problems.as_ref(),
            self.submissions.as_ref(),
            self.hacks.as_deref(),
            contest_id,
            i64::MAX,
        )
        .await?;
        let states: Vec<_> = map.into_values().collect();
        self.store.upsert_participants_bulk(contest_id, states).await?;
        Ok(())
    }

    pub async fn create_base_snapshot(&self, contest_id: i64, t: i64) -> Result<BaseSnapshot> {
        if t < 0 {
            return Err(EngineError::input(format!("T must be >= 0, got {t}")));
        }
        let map = full_replay(
            self.problems.as_ref(),
            self.submissions.as_ref(),
            self.hacks.as_deref(),
            contest_id,
            t,
        )
        .await?;
        let mut participants: Vec<_> = map.into_values().collect();
        participants.sort_by(|a, b| a.handle.cmp(&b.handle));

        let snapshot = BaseSnapshot {
            contest_id,
            timestamp_seconds: t,
            participant_count: participants.len() as i64,
            participants,
        };
        self.store.insert_base_snapshot(snapshot.clone()).await?;
        Ok(snapshot)
    }

    /// Builds the delta at T against the most recent prior snapshot,
    /// degrading to a base snapshot when no prior snapshot exists.
    pub async fn create_delta_snapshot(&self, contest_id: i64, t: i64) -> Result<SnapshotOutcome> {
        if t < 0 {
            return Err(EngineError::input(format!("T must be >= 0, got {t}")));
        }

        let prev = self.store.latest_snapshot_at_or_before(contest_id, t - 1).await?;
        let Some(prev) = prev else {
            return Ok(SnapshotOutcome::Base(self.create_base_snapshot(contest_id, t).await?));
        };

        let base_timestamp = prev.controlling_base_timestamp();
        let prev_timestamp = prev.timestamp_seconds();

        let prev_map = reconstruct_from_snapshots(self.store.as_ref(), contest_id, prev_timestamp)
            .await?
            .ok_or_else(|| {
                EngineError::data(format!(
                    "no base snapshot backing the prior snapshot at T={prev_timestamp} for contest {contest_id}"
                ))
            })?;

        let curr_map = apply_window(
            prev_map.clone(),
            self.problems.as_ref(),
            self.submissions.as_ref(),
            self.hacks.as_deref(),
            contest_id,
            prev_timestamp,
            t,
        )
        .await?;

        let mut changes = Vec::new();
        for (handle, state) in &curr_map {
            match prev_map.get(handle) {
                None => changes.push(ParticipantChange {
                    handle: handle.clone(),
                    op: ChangeOp::Insert,
                    state: state.clone(),
                }),
                Some(old) if old != state => changes.push(ParticipantChange {
                    handle: handle.clone(),
                    op: ChangeOp::Update,
                    state: state.clone(),
                }),
                _ => {}
            }
        }
        changes.sort_by(|a, b| a.handle.cmp(&b.handle));

        let snapshot = DeltaSnapshot {
            contest_id,
            timestamp_seconds: t,
            base_snapshot_timestamp: base_timestamp,
            change_count: changes.len() as i64,
            changes,
        };
        self.store.insert_delta_snapshot(snapshot.clone()).await?;
        Ok(SnapshotOutcome::Delta(snapshot))
    }

    pub async fn create_snapshot(
        &self,
        contest_id: i64,
        t: i64,
        base_interval: i64,
        delta_interval: i64,
    ) -> Result<SnapshotOutcome> {
        match classify(t, base_interval, delta_interval)? {
            SnapshotKind::Base => Ok(SnapshotOutcome::Base(
                self.create_base_snapshot(contest_id, t).await?,
            )),
            SnapshotKind::Delta => self.create_delta_snapshot(contest_id, t).await,
        }
    }

    /// Builds one snapshot per matching T in `[start, end]`; bases are
    /// all constructed before deltas, so later deltas can reconstruct
    /// against a base from the same window. A per-timestamp failure is
    /// recorded on the report rather than aborting the whole window.
    pub async fn create_snapshots_bulk(
        &self,
        contest_id: i64,
        start: i64,
        end: i64,
        base_interval: i64,
        delta_interval: i64,
    ) -> Result<BulkSnapshotReport> {
        if base_interval <= 0 || delta_interval <= 0 {
            return Err(EngineError::input(
                "base_interval and delta_interval must be > 0",
            ));
        }
        if end < start {
            return Err(EngineError::input("end must be >= start"));
        }

        let mut report = BulkSnapshotReport::default();

        let base_times: Vec<i64> = (start..=end).filter(|t| t % base_interval == 0).collect();
        for t in base_times {
            match self.create_base_snapshot(contest_id, t).await {
                Ok(_) => report.base_created += 1,
                Err(e) => report.errors.push(SnapshotError {
                    timestamp_seconds: t,
                    message: e.to_string(),
                }),
            }
        }

        let delta_times: Vec<i64> = (start..=end)
            .filter(|t| t % delta_interval == 0 && t % base_interval != 0)
            .collect();
        for t in delta_times {
            match self.create_delta_snapshot(contest_id, t).await {
                Ok(_) => report.delta_created += 1,
                Err(e) => report.errors.push(SnapshotError {
                    timestamp_seconds: t,
                    message: e.to_string(),
                }),
            }
        }

        Ok(report)
    }
}

pub fn classify(t: i64, base_interval: i64, delta_interval: i64) -> Result<SnapshotKind> {
    if base_interval <= 0 || delta_interval <= 0 {
        return Err(EngineError::input(
            "base_interval and delta_interval must be > 0",
        ));
    }
    if t % base_interval == 0 {
        Ok(SnapshotKind::Base)
    } else if t % delta_interval == 0 {
        Ok(SnapshotKind::Delta)
    } else {
        Err(EngineError::input(format!(
            "T={t} is not aligned to either the base ({base_interval}s) or delta ({delta_interval}s) interval"
        )))
    }
}

/// Applies only the submissions (and hacks) with
/// `prev_timestamp < relativeTimeSeconds <= t` onto `map`, leaving
/// untouched participants exactly as they were reconstructed.
async fn apply_window(
    mut map: BTreeMap<String, ParticipantState>,
    problems: &dyn ProblemSource,
    submissions: &dyn SubmissionSource,
    hacks: Option<&dyn HackSource>,
    contest_id: i64,
    prev_timestamp: i64,
    t: i64,
) -> Result<BTreeMap<String, ParticipantState>> {
    use crate::applier::{apply_hack, apply_submission};

    let catalogue = crate::replay::points_catalogue(&problems.problems(contest_id).await?);

    let mut subs: Vec<_> = submissions
        .submissions(contest_id)
        .await?
        .into_iter()
        .filter(|s| s.relative_time_seconds > prev_timestamp && s.relative_time_seconds <= t)
        .collect();
    subs.sort_by_key(|s| (s.relative_time_seconds, s.id));

    for sub in &subs {
        let state = map
            .entry(sub.handle.clone())
            .or_insert_with(|| ParticipantState::new(&sub.handle, sub.participant_type, sub.ghost));
        apply_submission(state, sub, catalogue.get(&sub.problem_index).copied());
    }

    if let Some(hacks) = hacks {
        for hack in hacks.hacks(contest_id).await? {
            if hack.relative_time_seconds <= prev_timestamp || hack.relative_time_seconds > t {
                continue;
            }
            if let Some(state) = map.get_mut(&hack.handle) {
                apply_hack(state, hack.verdict);
            }
        }
    }

    Ok(map)
}

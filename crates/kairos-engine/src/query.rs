//! Query Engine: answers `standingsAt` by locating the nearest base
//! snapshot, folding in the deltas up to T, ranking, and paginating
//! into the external standings-row shape.

use std::collections::BTreeMap;
use std::sync::Arc;

use kairos_common::error::{EngineError, Result};
use kairos_common::types::{
    ParticipantState, Party, PartyMember, Problem, ProblemResult, StandingsResult, StandingsRow,
};
use kairos_store::Store;

use crate::ranker::{paginate, rank};
use crate::reconstruct::reconstruct_from_snapshots;
use crate::replay::full_replay;
use crate::source::{ContestMetaSource, HackSource, ProblemSource, SubmissionSource};

pub struct QueryEngine {
    store: Arc<dyn Store>,
    problems: Arc<dyn ProblemSource>,
    submissions: Arc<dyn SubmissionSource>,
    hacks: Option<Arc<dyn HackSource>>,
    contest_meta: Arc<dyn ContestMetaSource>,
}

impl QueryEngine {
    pub fn new(
        store: Arc<dyn Store>,
        problems: Arc<dyn ProblemSource>,
        submissions: Arc<dyn SubmissionSource>,
        hacks: Option<Arc<dyn HackSource>>,
        contest_meta: Arc<dyn ContestMetaSource>,
    ) -> Self {
        Self {
            store,
            problems,
            submissions,
            hacks,
            contest_meta,
        }
    }

    /// `t` absent defaults to the contest's `durationSeconds`; still
    /// absent after that is a data error, since there is no time axis
    /// to answer against.
    pub async fn standings_at(
        &self,
        contest_id: i64,
        t: Option<i64>,
        rank_from: i64,
        rank_to: Option<i64>,
        include_unofficial: bool,
        hack_scoring_enabled: bool,
    ) -> Result<StandingsResult> {
        let Some(meta) = self.contest_meta.contest_meta(contest_id).await? else {
            return Ok(StandingsResult::default());
        };

        let t = match t {
            Some(t) => t,
            None => meta.duration_seconds.ok_or_else(|| {
                EngineError::data(format!(
                    "contest {contest_id} has no durationSeconds to default T to"
                ))
            })?,
        };
        if t < 0 {
            return Err(EngineError::input(format!("T must be >= 0, got {t}")));
        }

        let problems = self.problems.problems(contest_id).await?;
        let state_map = self.load_state_map(contest_id, t).await?;

        let states: Vec<ParticipantState> = state_map
            .into_values()
            .filter(|s| include_unofficial || !s.is_unofficial)
            .collect();

        let ranked = rank(states, hack_scoring_enabled);
        let page = paginate(ranked, rank_from, rank_to)?;

        let rows = page
            .into_iter()
            .map(|(rank, state)| to_standings_row(rank, &state, &problems, hack_scoring_enabled))
            .collect();

        Ok(StandingsResult {
            contest: Some(meta),
            problems,
            rows,
        })
    }

    /// Loads the state map at `t` via the snapshot chain, falling back
    /// to a full replay when no base snapshot exists yet for this
    /// contest.
    async fn load_state_map(
        &self,
        contest_id: i64,
        t: i64,
    ) -> Result<BTreeMap<String, ParticipantState>> {
        match reconstruct_from_snapshots(self.store.as_ref(), contest_id, t).await? {
            Some(map) => Ok(map),
            None => {
                full_replay(
                    self.problems.as_ref(),
                    self.submissions.as_ref(),
                    self.hacks.as_deref(),
                    contest_id,
                    t,
                )
                .await
            }
        }
    }

    /// Independently reconstructs the reference standings (full replay,
    /// bypassing snapshots entirely) and diffs it against the
    /// snapshot-backed reconstruction.
    pub async fn validate(&self, contest_id: i64, t: i64) -> Result<ValidationReport> {
        if t < 0 {
            return Err(EngineError::input(format!("T must be >= 0, got {t}")));
        }

        let reconstructed = self.load_state_map(contest_id, t).await?;
        let reference = full_replay(
            self.problems.as_ref(),
            self.submissions.as_ref(),
            self.hacks.as_deref(),
            contest_id,
            t,
        )
        .await?;

        let official_reference: BTreeMap<_, _> = reference
            .into_iter()
            .filter(|(_, s)| !s.is_unofficial)
            .collect();
        let official_reconstructed: BTreeMap<_, _> = reconstructed
            .into_iter()
            .filter(|(_, s)| !s.is_unofficial)
            .collect();

        let reference_ranked = rank(official_reference.values().cloned().collect(), false);
        let reconstructed_ranked = rank(official_reconstructed.values().cloned().collect(), false);

        let reference_ranks: BTreeMap<String, i64> = reference_ranked
            .iter()
            .map(|(r, s)| (s.handle.clone(), *r))
            .collect();
        let reconstructed_ranks: BTreeMap<String, i64> = reconstructed_ranked
            .iter()
            .map(|(r, s)| (s.handle.clone(), *r))
            .collect();

        let mut mismatched_handles = Vec::new();
        for (handle, reference_state) in &official_reference {
            let Some(reconstructed_state) = official_reconstructed.get(handle) else {
                mismatched_handles.push(HandleMismatch {
                    handle: handle.clone(),
                    field: "presence".to_string(),
                });
                continue;
            };

            if reference_state.total_points != reconstructed_state.total_points {
                mismatched_handles.push(HandleMismatch {
                    handle: handle.clone(),
                    field: "points".to_string(),
                });
            } else if reference_state.total_penalty != reconstructed_state.total_penalty {
                mismatched_handles.push(HandleMismatch {
                    handle: handle.clone(),
                    field: "penalty".to_string(),
                });
            } else if reference_state.problems != reconstructed_state.problems {
                mismatched_handles.push(HandleMismatch {
                    handle: handle.clone(),
                    field: "problemResults".to_string(),
                });
            } else if reference_ranks.get(handle) != reconstructed_ranks.get(handle) {
                mismatched_handles.push(HandleMismatch {
                    handle: handle.clone(),
                    field: "rank".to_string(),
                });
            }
        }
        for handle in official_reconstructed.keys() {
            if !official_reference.contains_key(handle) {
                mismatched_handles.push(HandleMismatch {
                    handle: handle.clone(),
                    field: "presence".to_string(),
                });
            }
        }

        Ok(ValidationReport {
            contest_id,
            timestamp_seconds: t,
            reference_count: official_reference.len() as i64,
            reconstructed_count: official_reconstructed.len() as i64,
            mismatched_handles,
        })
    }
}

/// Fixed validator report shape, comparing reference vs reconstructed
/// standings at a given timestamp.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub contest_id: i64,
    pub timestamp_seconds: i64,
    pub mismatched_handles: Vec<HandleMismatch>,
    pub reference_count: i64,
    pub reconstructed_count: i64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleMismatch {
    pub handle: String,
    pub field: String,
}

fn to_standings_row(
    rank: i64,
    state: &ParticipantState,
    problems: &[Problem],
    hack_scoring_enabled: bool,
) -> StandingsRow {
    let problem_results = problems
        .iter()
        .map(|problem| {
            let result = state.problems.get(&problem.index);
            ProblemResult {
                problem_index: problem.index.clone(),
                points: result.map(|r| r.points).unwrap_or(0),
                rejected_attempt_count: result.map(|r| r.reject_count).unwrap_or(0),
                result_type: "FINAL".to_string(),
                best_submission_time_seconds: result.and_then(|r| r.solve_time),
            }
        })
        .collect();

    StandingsRow {
        party: Party {
            members: vec![PartyMember {
                handle: state.handle.clone(),
            }],
            participant_type: state.participant_type,
            ghost: state.ghost,
        },
        rank,
        points: crate::ranker::effective_points(state, hack_scoring_enabled),
        penalty: state.total_penalty,
        successful_hack_count: state.hack_success,
        unsuccessful_hack_count: state.hack_fail,
        problem_results,
    }
}

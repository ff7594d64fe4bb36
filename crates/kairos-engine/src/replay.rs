//! Full replay: builds the participant-state map at time T directly
//! from the submission/problem/hack sources, with no snapshot
//! involved. This is both how base snapshots are constructed and the
//! fallback + independent reference the Query Engine and validator use
//! when no snapshot chain covers a timestamp.

use std::collections::{BTreeMap, HashMap};

use kairos_common::error::Result;
use kairos_common::types::{ParticipantState, Problem};

use crate::applier::{apply_hack, apply_submission};
use crate::source::{HackSource, ProblemSource, SubmissionSource};

pub fn points_catalogue(problems: &[Problem]) -> HashMap<String, i64> {
    problems
        .iter()
        .map(|p| (p.index.clone(), p.points_or_default()))
        .collect()
}

/// Replays every submission (and hack, if a source is given) with
/// `relativeTimeSeconds <= up_to_t` against a fresh state map, ties
/// among equally-timestamped submissions broken by ascending id.
pub async fn full_replay(
    problems: &dyn ProblemSource,
    submissions: &dyn SubmissionSource,
    hacks: Option<&dyn HackSource>,
    contest_id: i64,
    up_to_t: i64,
) -> Result<BTreeMap<String, ParticipantState>> {
    let catalogue = points_catalogue(&problems.problems(contest_id).await?);

    let mut subs: Vec<_> = submissions
        .submissions(contest_id)
        .await?
        .into_iter()
        .filter(|s| s.relative_time_seconds <= up_to_t)
        .collect();
    subs.sort_by_key(|s| (s.relative_time_seconds, s.id));

    let mut states: BTreeMap<String, ParticipantState> = BTreeMap::new();
    for sub in &subs {
        let state = states
            .entry(sub.handle.clone())
            .or_insert_with(|| ParticipantState::new(&sub.handle, sub.participant_type, sub.ghost));
        apply_submission(state, sub, catalogue.get(&sub.problem_index).copied());
    }

    if let Some(hacks) = hacks {
        for hack in hacks.hacks(contest_id).await? {
            if hack.relative_time_seconds > up_to_t {
                continue;
            }
            if let Some(state) = states.get_mut(&hack.handle) {
                apply_hack(state, hack.verdict);
            } else {
                tracing::warn!(
                    handle = %hack.handle,
                    contest_id,
                    "hack recorded for a handle with no submissions, skipping"
                );
            }
        }
    }

    Ok(states)
}

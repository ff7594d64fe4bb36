//! Event Applier: pure folds of one submission or hack into a
//! participant state. No I/O, no allocation beyond what the state
//! itself needs — replayable byte-for-byte.

use kairos_common::types::{HackVerdict, ParticipantState, ProblemState, Submission, Verdict};

/// Folds `sub` into `state` in place, resolving the problem's point
/// value from `points` (the contest's points catalogue) and falling
/// back to the submission's own `problemPoints` override, then to 1,
/// when the problem is absent from the catalogue — a missing problem
/// index is non-fatal per the applier's failure semantics.
pub fn apply_submission(state: &mut ParticipantState, sub: &Submission, points: Option<i64>) {
    let resolved_points = points
        .or(sub.problem_points)
        .unwrap_or(1);

    let problem = state
        .problems
        .entry(sub.problem_index.clone())
        .or_insert_with(|| ProblemState {
            first_attempt_time: Some(sub.relative_time_seconds),
            ..ProblemState::default()
        });

    if !problem.solved {
        if sub.verdict == Verdict::Ok {
            problem.solved = true;
            problem.points = resolved_points;
            problem.solve_time = Some(sub.relative_time_seconds);

            state.total_points += resolved_points;
            state.total_penalty +=
                problem.reject_count * 20 + sub.relative_time_seconds / 60;
            state.solved_count += 1;
            state.last_ac_time = Some(
                state
                    .last_ac_time
                    .map_or(sub.relative_time_seconds, |t| t.max(sub.relative_time_seconds)),
            );
        } else {
            problem.reject_count += 1;
            if problem.first_attempt_time.is_none() {
                problem.first_attempt_time = Some(sub.relative_time_seconds);
            }
        }
    }

    state.last_submission_time = state.last_submission_time.max(sub.relative_time_seconds);
}

/// Increments the hack counters only; no scoring effect at this layer
/// (see the Ranker's optional scoring view for the opt-in rule).
pub fn apply_hack(state: &mut ParticipantState, verdict: HackVerdict) {
    match verdict {
        HackVerdict::Successful => state.hack_success += 1,
        HackVerdict::Unsuccessful => state.hack_fail += 1,
    }
}

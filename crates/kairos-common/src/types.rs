use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A contest problem. `points` defaults to 1 when absent, per the
/// standings rules — callers should prefer [`Problem::points_or_default`]
/// over reading the field directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub index: String,
    pub points: Option<i64>,
}

impl Problem {
    pub fn points_or_default(&self) -> i64 {
        self.points.unwrap_or(1)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Ok,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    RuntimeError,
    CompileError,
    PresentationError,
    IdlenessLimitExceeded,
    SecurityViolated,
    Challenged,
    Skipped,
    Rejected,
    FailedOnTests,
}

impl Verdict {
    pub fn is_accepted(self) -> bool {
        matches!(self, Verdict::Ok)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantType {
    Contestant,
    Virtual,
    Practice,
    Manager,
    OutOfCompetition,
}

impl ParticipantType {
    /// `isUnofficial = (participantType != CONTESTANT)`.
    pub fn is_unofficial(self) -> bool {
        !matches!(self, ParticipantType::Contestant)
    }
}

/// One submission in the contest's event stream. `problem_points` is an
/// optional per-submission override consulted only when `problem_index`
/// is absent from the problems catalogue (see the Event Applier's
/// failure semantics); the catalogue is otherwise authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub problem_index: String,
    pub problem_points: Option<i64>,
    pub handle: String,
    pub participant_type: ParticipantType,
    #[serde(default)]
    pub ghost: bool,
    pub relative_time_seconds: i64,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HackVerdict {
    Successful,
    Unsuccessful,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hack {
    pub handle: String,
    pub verdict: HackVerdict,
    pub relative_time_seconds: i64,
}

/// Per-problem progress for one participant. Frozen once `solved`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProblemState {
    pub solved: bool,
    pub points: i64,
    pub reject_count: i64,
    pub solve_time: Option<i64>,
    pub first_attempt_time: Option<i64>,
}

/// Full standings state for one participant in one contest, as folded
/// by the Event Applier. `problems` is keyed by problem index and
/// normalized to a plain object (map) on every serialization boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantState {
    pub handle: String,
    pub participant_type: ParticipantType,
    #[serde(default)]
    pub ghost: bool,
    pub is_unofficial: bool,
    pub problems: BTreeMap<String, ProblemState>,
    pub total_points: i64,
    pub total_penalty: i64,
    pub solved_count: i64,
    pub last_ac_time: Option<i64>,
    pub last_submission_time: i64,
    pub hack_success: i64,
    pub hack_fail: i64,
}

impl ParticipantState {
    pub fn new(handle: impl Into<String>, participant_type: ParticipantType, ghost: bool) -> Self {
        Self {
            handle: handle.into(),
            participant_type,
            ghost,
            is_unofficial: participant_type.is_unofficial(),
            problems: BTreeMap::new(),
            total_points: 0,
            total_penalty: 0,
            solved_count: 0,
            last_ac_time: None,
            last_submission_time: 0,
            hack_success: 0,
            hack_fail: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BaseSnapshot {
    pub contest_id: i64,
    pub timestamp_seconds: i64,
    pub participants: Vec<ParticipantState>,
    pub participant_count: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeOp {
    Insert,
    Update,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantChange {
    pub handle: String,
    pub op: ChangeOp,
    pub state: ParticipantState,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeltaSnapshot {
    pub contest_id: i64,
    pub timestamp_seconds: i64,
    pub base_snapshot_timestamp: i64,
    pub changes: Vec<ParticipantChange>,
    pub change_count: i64,
}

/// Metadata about the contest itself, sourced from the (out-of-scope)
/// contest metadata collaborator. Only `duration_seconds` is
/// load-bearing for the core engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContestMeta {
    pub id: i64,
    pub name: String,
    pub phase: String,
    pub start_time_seconds: Option<i64>,
    pub duration_seconds: Option<i64>,
}

// --- External standings-row shape ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PartyMember {
    pub handle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub members: Vec<PartyMember>,
    pub participant_type: ParticipantType,
    pub ghost: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemResult {
    pub problem_index: String,
    pub points: i64,
    pub rejected_attempt_count: i64,
    #[serde(rename = "type")]
    pub result_type: String,
    pub best_submission_time_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StandingsRow {
    pub party: Party,
    pub rank: i64,
    pub points: i64,
    pub penalty: i64,
    pub successful_hack_count: i64,
    pub unsuccessful_hack_count: i64,
    pub problem_results: Vec<ProblemResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StandingsResult {
    pub contest: Option<ContestMeta>,
    pub problems: Vec<Problem>,
    pub rows: Vec<StandingsRow>,
}

impl Default for StandingsResult {
    fn default() -> Self {
        Self {
            contest: None,
            problems: Vec::new(),
            rows: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_points_default_to_one_when_absent() {
        let problem = Problem {
            index: "A".to_string(),
            points: None,
        };
        assert_eq!(problem.points_or_default(), 1);
    }

    #[test]
    fn only_contestant_is_official() {
        assert!(!ParticipantType::Contestant.is_unofficial());
        assert!(ParticipantType::Virtual.is_unofficial());
        assert!(ParticipantType::Practice.is_unofficial());
        assert!(ParticipantType::Manager.is_unofficial());
        assert!(ParticipantType::OutOfCompetition.is_unofficial());
    }

    #[test]
    fn new_participant_state_starts_unsolved_and_unofficial_flag_derives_from_type() {
        let state = ParticipantState::new("alice", ParticipantType::Virtual, false);
        assert!(state.is_unofficial);
        assert_eq!(state.total_points, 0);
        assert!(state.problems.is_empty());
    }

    #[test]
    fn submission_wire_shape_uses_camel_case_fields() {
        let sub = Submission {
            id: 1,
            problem_index: "A".to_string(),
            problem_points: Some(500),
            handle: "alice".to_string(),
            participant_type: ParticipantType::Contestant,
            ghost: false,
            relative_time_seconds: 600,
            verdict: Verdict::Ok,
        };
        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(json["problemIndex"], "A");
        assert_eq!(json["relativeTimeSeconds"], 600);
        assert_eq!(json["verdict"], "OK");

        let round_tripped: Submission = serde_json::from_value(json).unwrap();
        assert_eq!(round_tripped, sub);
    }
}

//! Ranker: the total order over participant states, standard
//! competition rank assignment under ties, and slice-based pagination.
//! Orders by solved count, then penalty, then `lastAcTime`, with an
//! optional hack-scoring view layered on top.

use std::cmp::Ordering;

use kairos_common::error::{EngineError, Result};
use kairos_common::types::ParticipantState;

/// `totalPoints`, optionally adjusted by the opt-in hack-scoring rule.
/// Never written back into `ParticipantState` — this is a read-only
/// view used only for comparison and the rendered row.
pub fn effective_points(state: &ParticipantState, hack_scoring_enabled: bool) -> i64 {
    if hack_scoring_enabled {
        state.total_points + 100 * state.hack_success - 50 * state.hack_fail
    } else {
        state.total_points
    }
}

/// Total order: higher effective points first, then lower penalty,
/// then smaller `lastAcTime` (absent treated as +infinity).
pub fn compare(a: &ParticipantState, b: &ParticipantState, hack_scoring_enabled: bool) -> Ordering {
    effective_points(b, hack_scoring_enabled)
        .cmp(&effective_points(a, hack_scoring_enabled))
        .then_with(|| a.total_penalty.cmp(&b.total_penalty))
        .then_with(|| {
            let a_key = a.last_ac_time.unwrap_or(i64::MAX);
            let b_key = b.last_ac_time.unwrap_or(i64::MAX);
            a_key.cmp(&b_key)
        })
}

/// Sorts `states` by [`compare`] and assigns standard competition ranks
/// ("1224"): a tied pair shares its predecessor's rank, an untied entry
/// takes its 1-indexed position.
pub fn rank(mut states: Vec<ParticipantState>, hack_scoring_enabled: bool) -> Vec<(i64, ParticipantState)> {
    states.sort_by(|a, b| compare(a, b, hack_scoring_enabled));

    let mut ranked: Vec<(i64, ParticipantState)> = Vec::with_capacity(states.len());
    for (i, state) in states.into_iter().enumerate() {
        let rank = match ranked.last() {
            Some((prev_rank, prev_state))
                if compare(prev_state, &state, hack_scoring_enabled) == Ordering::Equal =>
            {
                *prev_rank
            }
            _ => (i + 1) as i64,
        };
        ranked.push((rank, state));
    }
    ranked
}

/// Slices `ranked` at `[rankFrom - 1, rankTo)` (or to the end when
/// `rank_to` is absent), preserving sort order and assigned ranks
/// without renumbering.
pub fn paginate<T>(
    ranked: Vec<(i64, T)>,
    rank_from: i64,
    rank_to: Option<i64>,
) -> Result<Vec<(i64, T)>> {
    if rank_from < 1 {
        return Err(EngineError::input(format!(
            "rankFrom must be >= 1, got {rank_from}"
        )));
    }
    if let Some(to) = rank_to {
        if to < rank_from {
            return Err(EngineError::input(format!(
                "rankTo ({to}) must be >= rankFrom ({rank_from})"
            )));
        }
    }

    let from_idx = (rank_from - 1) as usize;
    if from_idx >= ranked.len() {
        return Ok(Vec::new());
    }
    let to_idx = rank_to
        .map(|t| (t as usize).min(ranked.len()))
        .unwrap_or(ranked.len());
    Ok(ranked.into_iter().take(to_idx).skip(from_idx).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_common::types::ParticipantType;

    fn state(handle: &str, points: i64, penalty: i64, last_ac: Option<i64>) -> ParticipantState {
        let mut s = ParticipantState::new(handle, ParticipantType::Contestant, false);
        s.total_points = points;
        s.total_penalty = penalty;
        s.last_ac_time = last_ac;
        s
    }

    #[test]
    fn s3_ranking_breaks_ties_by_penalty() {
        let ranked = rank(
            vec![
                state("bob", 500, 10, Some(600)),
                state("alice", 500, 5, Some(300)),
            ],
            false,
        );
        assert_eq!(ranked[0].1.handle, "alice");
        assert_eq!(ranked[0].0, 1);
        assert_eq!(ranked[1].1.handle, "bob");
        assert_eq!(ranked[1].0, 2);
    }

    #[test]
    fn s4_equal_points_and_penalty_tie_by_last_ac_time() {
        let ranked = rank(
            vec![
                state("alice", 500, 2, Some(120)),
                state("bob", 500, 2, Some(120)),
            ],
            false,
        );
        assert_eq!(ranked[0].0, 1);
        assert_eq!(ranked[1].0, 1);
    }

    #[test]
    fn standard_competition_ranking_skips_after_a_tie() {
        let ranked = rank(
            vec![
                state("a", 900, 0, None),
                state("b", 800, 0, None),
                state("c", 800, 0, None),
                state("d", 700, 0, None),
            ],
            false,
        );
        let ranks: Vec<i64> = ranked.iter().map(|(r, _)| *r).collect();
        assert_eq!(ranks, vec![1, 2, 2, 4]);
    }

    #[test]
    fn pagination_preserves_ranks_without_renumbering() {
        let ranked = rank(
            vec![
                state("a", 900, 0, None),
                state("b", 800, 0, None),
                state("c", 800, 0, None),
                state("d", 700, 0, None),
            ],
            false,
        );
        let page = paginate(ranked, 2, Some(3)).unwrap();
        let handles: Vec<&str> = page.iter().map(|(_, s)| s.handle.as_str()).collect();
        assert_eq!(handles, vec!["b", "c"]);
        assert_eq!(page[0].0, 2);
    }

    #[test]
    fn pagination_law_partition_reconstructs_whole() {
        let states = vec![
            state("a", 900, 0, None),
            state("b", 800, 0, None),
            state("c", 800, 0, None),
            state("d", 700, 0, None),
        ];
        let whole = rank(states.clone(), false);
        let whole_page = paginate(whole.clone(), 1, None).unwrap();

        let part1 = paginate(whole.clone(), 1, Some(2)).unwrap();
        let part2 = paginate(whole, 3, None).unwrap();
        let mut reassembled = part1;
        reassembled.extend(part2);

        let whole_handles: Vec<&str> = whole_page.iter().map(|(_, s)| s.handle.as_str()).collect();
        let reassembled_handles: Vec<&str> =
            reassembled.iter().map(|(_, s)| s.handle.as_str()).collect();
        assert_eq!(whole_handles, reassembled_handles);
    }

    #[test]
    fn rank_from_below_one_is_input_error() {
        let ranked = rank(vec![state("a", 1, 0, None)], false);
        assert!(paginate(ranked, 0, None).is_err());
    }

    #[test]
    fn rank_to_before_rank_from_is_input_error() {
        let ranked = rank(vec![state("a", 1, 0, None), state("b", 0, 0, None)], false);
        assert!(paginate(ranked, 2, Some(1)).is_err());
    }

    #[test]
    fn hack_scoring_view_only_affects_comparison_when_enabled() {
        let mut hacker = state("hacker", 400, 0, None);
        hacker.hack_success = 1;
        let grinder = state("grinder", 450, 0, None);

        let disabled = rank(vec![hacker.clone(), grinder.clone()], false);
        assert_eq!(disabled[0].1.handle, "grinder");

        let enabled = rank(vec![hacker, grinder], true);
        assert_eq!(enabled[0].1.handle, "hacker");
    }
}

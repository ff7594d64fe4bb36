//! Overall/aggregate ranking across contests: per-contest standings
//! are reduced by handle into a cross-contest total and re-sorted.

use std::collections::BTreeMap;

use kairos_common::error::Result;

use crate::query::QueryEngine;

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallRankingRow {
    pub handle: String,
    pub contest_count: i64,
    pub total_solved: i64,
    pub total_points: i64,
    pub total_penalty: i64,
}

/// Aggregates `standingsAt` over `contest_ids`, querying each at the
/// timestamp given in `t_per_contest` (or the contest's own end time
/// when absent, per §12.1), and re-sorts by total solved desc, then
/// total penalty asc — the same reduction `get_overall_ranking`
/// performs over its per-contest ranking rows.
pub async fn overall_standings_at(
    engine: &QueryEngine,
    contest_ids: &[i64],
    t_per_contest: &BTreeMap<i64, Option<i64>>,
    include_unofficial: bool,
) -> Result<Vec<OverallRankingRow>> {
    let mut totals: BTreeMap<String, OverallRankingRow> = BTreeMap::new();

    for &contest_id in contest_ids {
        let t = t_per_contest.get(&contest_id).copied().flatten();
        let standings = engine
            .standings_at(contest_id, t, 1, None, include_unofficial, false)
            .await?;

        for row in &standings.rows {
            let Some(member) = row.party.members.first() else {
                continue;
            };
            let solved_count = row
                .problem_results
                .iter()
                .filter(|r| r.best_submission_time_seconds.is_some())
                .count() as i64;

            let entry = totals
                .entry(member.handle.clone())
                .or_insert_with(|| OverallRankingRow {
                    handle: member.handle.clone(),
                    ..Default::default()
                });
            entry.contest_count += 1;
            entry.total_solved += solved_count;
            entry.total_points += row.points;
            entry.total_penalty += row.penalty;
        }
    }

    let mut rows: Vec<OverallRankingRow> = totals.into_values().collect();
    rows.sort_by(|a, b| {
        b.total_solved
            .cmp(&a.total_solved)
            .then_with(|| a.total_penalty.cmp(&b.total_penalty))
    });
    Ok(rows)
}

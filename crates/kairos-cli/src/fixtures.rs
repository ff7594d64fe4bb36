//! Loads the external-collaborator fixtures (problems, submissions,
//! hacks, contest metadata) the CLI drives the engine with. A
//! production deployment would sit behind a live ingestion/fetcher
//! layer; the CLI instead reads the same shapes from JSON files, one
//! array per entity, under a fixtures directory.

use std::path::Path;

use kairos_common::error::Result;
use kairos_common::types::{ContestMeta, Hack, Problem, Submission};
use kairos_engine::source::MemoryFixtures;

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Reads `problems.json`, `submissions.json`, the optional
/// `hacks.json`, and `contest.json` from `dir`, keyed for `contest_id`.
/// Missing `hacks.json` is treated as "no hack source" rather than an
/// error, since hack scoring is itself optional.
pub fn load(dir: &Path, contest_id: i64) -> Result<MemoryFixtures> {
    let problems: Vec<Problem> = read_json(&dir.join("problems.json"))?.unwrap_or_default();
    let submissions: Vec<Submission> =
        read_json(&dir.join("submissions.json"))?.unwrap_or_default();
    let hacks: Vec<Hack> = read_json(&dir.join("hacks.json"))?.unwrap_or_default();
    let contest: Option<ContestMeta> = read_json(&dir.join("contest.json"))?;

    let mut fixtures = MemoryFixtures::new()
        .with_problems(contest_id, problems)
        .with_submissions(contest_id, submissions)
        .with_hacks(contest_id, hacks);
    if let Some(contest) = contest {
        fixtures = fixtures.with_contest(contest);
    }
    Ok(fixtures)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fixtures_dir_loads_empty_sources() {
        let dir = tempfile::tempdir().unwrap();
        let fixtures = load(dir.path(), 1).unwrap();
        let _ = fixtures;
    }

    #[tokio::test]
    async fn loads_problems_and_submissions_from_json_files() {
        use kairos_engine::source::{ProblemSource, SubmissionSource};

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("problems.json"),
            r#"[{"index":"A","points":500}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("submissions.json"),
            r#"[{"id":1,"problemIndex":"A","problemPoints":null,"handle":"alice","participantType":"CONTESTANT","relativeTimeSeconds":600,"verdict":"OK"}]"#,
        )
        .unwrap();

        let fixtures = load(dir.path(), 1).unwrap();
        assert_eq!(fixtures.problems(1).await.unwrap().len(), 1);
        assert_eq!(fixtures.submissions(1).await.unwrap().len(), 1);
    }
}

//! External collaborator contracts: the submission, problem, hack and
//! contest-metadata feeds the core consumes but does not own.
//! Production callers adapt these to the ingestion/fetcher layer (out
//! of scope here); tests and the CLI's fixture mode use the in-memory
//! implementations below.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use kairos_common::error::Result;
use kairos_common::types::{ContestMeta, Hack, Problem, Submission};

#[async_trait]
pub trait SubmissionSource: Send + Sync {
    /// Ordered by submission id, not guaranteed by time; callers must
    /// sort by `relativeTimeSeconds` themselves.
    async fn submissions(&self, contest_id: i64) -> Result<Vec<Submission>>;
}

#[async_trait]
pub trait ProblemSource: Send + Sync {
    async fn problems(&self, contest_id: i64) -> Result<Vec<Problem>>;
}

#[async_trait]
pub trait HackSource: Send + Sync {
    async fn hacks(&self, contest_id: i64) -> Result<Vec<Hack>>;
}

#[async_trait]
pub trait ContestMetaSource: Send + Sync {
    async fn contest_meta(&self, contest_id: i64) -> Result<Option<ContestMeta>>;
}

/// In-memory fixture implementing all four collaborator contracts at
/// once, the way unit tests want to set up one object and hand it to
/// every component under test.
#[derive(Default)]
pub struct MemoryFixtures {
    submissions: Mutex<HashMap<i64, Vec<Submission>>>,
    problems: Mutex<HashMap<i64, Vec<Problem>>>,
    hacks: Mutex<HashMap<i64, Vec<Hack>>>,
    contests: Mutex<HashMap<i64, ContestMeta>>,
}

impl MemoryFixtures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_submissions(self, contest_id: i64, submissions: Vec<Submission>) -> Self {
        self.submissions
            .lock()
            .unwrap()
            .insert(contest_id, submissions);
        self
    }

    pub fn with_problems(self, contest_id: i64, problems: Vec<Problem>) -> Self {
        self.problems.lock().unwrap().insert(contest_id, problems);
        self
    }

    pub fn with_hacks(self, contest_id: i64, hacks: Vec<Hack>) -> Self {
        self.hacks.lock().unwrap().insert(contest_id, hacks);
        self
    }

    pub fn with_contest(self, meta: ContestMeta) -> Self {
        self.contests.lock().unwrap().insert(meta.id, meta);
        self
    }
}

#[async_trait]
impl SubmissionSource for MemoryFixtures {
    async fn submissions(&self, contest_id: i64) -> Result<Vec<Submission>> {
        Ok(self
            .submissions
            .lock()
            .unwrap()
            .get(&contest_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ProblemSource for MemoryFixtures {
    async fn problems(&self, contest_id: i64) -> Result<Vec<Problem>> {
        Ok(self
            .problems
            .lock()
            .unwrap()
            .get(&contest_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl HackSource for MemoryFixtures {
    async fn hacks(&self, contest_id: i64) -> Result<Vec<Hack>> {
        Ok(self
            .hacks
            .lock()
            .unwrap()
            .get(&contest_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ContestMetaSource for MemoryFixtures {
    async fn contest_meta(&self, contest_id: i64) -> Result<Option<ContestMeta>> {
        Ok(self.contests.lock().unwrap().get(&contest_id).cloned())
    }
}

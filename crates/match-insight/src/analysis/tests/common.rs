use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

use crate::analysis::domain::{
    AnalysisKind, CandidateProfile, JobId, JobPosting, JobStatus, UserId,
};
use crate::analysis::repository::{
    AnalysisRepository, AnalysisRow, CandidateWorkspace, RepositoryError,
};
use crate::analysis::scoring::{OracleError, ScoringOracle, ScoringRequest};
use crate::analysis::service::{AnalysisRequest, Clock, MatchAnalysisService};
use crate::analysis::weights::{WeightInput, WeightSet};
use crate::config::AnalysisConfig;

pub(super) const USER: &str = "user-1";
pub(super) const OTHER_USER: &str = "user-2";

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn posting(id: &str, owner: &str, title: &str, status: JobStatus) -> JobPosting {
    JobPosting {
        id: JobId(id.to_string()),
        owner: UserId(owner.to_string()),
        title: title.to_string(),
        company: Some("Northwind".to_string()),
        status,
        details: json!({ "requirements": ["Rust", "SQL"] }),
    }
}

pub(super) fn job_match(job_id: &str) -> AnalysisRequest {
    AnalysisRequest {
        kind: AnalysisKind::JobMatch,
        job_id: job_id.to_string(),
        user_id: USER.to_string(),
        weights: None,
        force_refresh: false,
    }
}

pub(super) fn skills_gap(job_id: &str) -> AnalysisRequest {
    AnalysisRequest {
        kind: AnalysisKind::SkillsGap,
        ..job_match(job_id)
    }
}

pub(super) fn skills_override(value: f64) -> WeightInput {
    WeightInput {
        skills: Some(value),
        ..WeightInput::default()
    }
}

pub(super) type TestService = MatchAnalysisService<MemoryRepository, MemoryWorkspace, StubOracle>;

pub(super) struct Harness {
    pub(super) service: TestService,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) workspace: Arc<MemoryWorkspace>,
    pub(super) oracle: Arc<StubOracle>,
    pub(super) clock: Arc<ManualClock>,
}

/// Workspace with three jobs for `USER` and one for `OTHER_USER`.
pub(super) fn build_harness() -> Harness {
    let repository = Arc::new(MemoryRepository::default());
    let workspace = Arc::new(MemoryWorkspace::default());
    workspace.add_job(posting("job-1", USER, "Platform Engineer", JobStatus::Applied));
    workspace.add_job(posting("job-2", USER, "Backend Engineer", JobStatus::Saved));
    workspace.add_job(posting("job-3", USER, "Data Engineer", JobStatus::Applied));
    workspace.add_job(posting("job-9", OTHER_USER, "Site Reliability", JobStatus::Saved));
    workspace.add_profile(USER);
    workspace.add_profile(OTHER_USER);

    let oracle = Arc::new(StubOracle::default());
    let clock = Arc::new(ManualClock::new(start()));
    let service = MatchAnalysisService::new(
        repository.clone(),
        workspace.clone(),
        oracle.clone(),
        &AnalysisConfig::default(),
    )
    .with_clock(clock.clone());

    Harness {
        service,
        repository,
        workspace,
        oracle,
        clock,
    }
}

pub(super) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(super) fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard = *guard + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

type RowKey = (AnalysisKind, JobId, UserId);

/// Keeps a current row per key and every written row as history.
#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    current: Arc<Mutex<HashMap<RowKey, AnalysisRow>>>,
    history: Arc<Mutex<Vec<AnalysisRow>>>,
}

impl MemoryRepository {
    pub(super) fn rows(&self, kind: AnalysisKind) -> Vec<AnalysisRow> {
        self.history
            .lock()
            .expect("repository mutex poisoned")
            .iter()
            .filter(|row| row.kind == kind)
            .cloned()
            .collect()
    }

    pub(super) fn seed(&self, row: AnalysisRow) {
        let key = (row.kind, row.job_id.clone(), row.user_id.clone());
        self.history
            .lock()
            .expect("repository mutex poisoned")
            .push(row.clone());
        self.current
            .lock()
            .expect("repository mutex poisoned")
            .insert(key, row);
    }
}

impl AnalysisRepository for MemoryRepository {
    fn latest(
        &self,
        kind: AnalysisKind,
        job_id: &JobId,
        user_id: &UserId,
    ) -> Result<Option<AnalysisRow>, RepositoryError> {
        let guard = self.current.lock().expect("repository mutex poisoned");
        Ok(guard
            .get(&(kind, job_id.clone(), user_id.clone()))
            .cloned())
    }

    fn insert(&self, row: AnalysisRow) -> Result<(), RepositoryError> {
        let duplicate = self
            .history
            .lock()
            .expect("repository mutex poisoned")
            .iter()
            .any(|existing| existing.id == row.id);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        self.seed(row);
        Ok(())
    }

    fn upsert_current(&self, row: AnalysisRow) -> Result<(), RepositoryError> {
        self.seed(row);
        Ok(())
    }

    fn history(
        &self,
        kind: AnalysisKind,
        job_id: &JobId,
        user_id: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<AnalysisRow>, RepositoryError> {
        let guard = self.history.lock().expect("repository mutex poisoned");
        let mut rows: Vec<AnalysisRow> = guard
            .iter()
            .filter(|row| row.kind == kind && &row.job_id == job_id && &row.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.analysis_date.cmp(&a.analysis_date));
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn for_user(
        &self,
        kind: AnalysisKind,
        user_id: &UserId,
    ) -> Result<Vec<AnalysisRow>, RepositoryError> {
        let guard = self.current.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|row| row.kind == kind && &row.user_id == user_id)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableRepository;

impl AnalysisRepository for UnavailableRepository {
    fn latest(
        &self,
        _kind: AnalysisKind,
        _job_id: &JobId,
        _user_id: &UserId,
    ) -> Result<Option<AnalysisRow>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert(&self, _row: AnalysisRow) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn upsert_current(&self, _row: AnalysisRow) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn history(
        &self,
        _kind: AnalysisKind,
        _job_id: &JobId,
        _user_id: &UserId,
        _limit: Option<usize>,
    ) -> Result<Vec<AnalysisRow>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_user(
        &self,
        _kind: AnalysisKind,
        _user_id: &UserId,
    ) -> Result<Vec<AnalysisRow>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Reads go to the wrapped repository; every write fails.
#[derive(Default)]
pub(super) struct ReadOnlyRepository {
    pub(super) inner: MemoryRepository,
}

impl AnalysisRepository for ReadOnlyRepository {
    fn latest(
        &self,
        kind: AnalysisKind,
        job_id: &JobId,
        user_id: &UserId,
    ) -> Result<Option<AnalysisRow>, RepositoryError> {
        self.inner.latest(kind, job_id, user_id)
    }

    fn insert(&self, _row: AnalysisRow) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("writes rejected".to_string()))
    }

    fn upsert_current(&self, _row: AnalysisRow) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("writes rejected".to_string()))
    }

    fn history(
        &self,
        kind: AnalysisKind,
        job_id: &JobId,
        user_id: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<AnalysisRow>, RepositoryError> {
        self.inner.history(kind, job_id, user_id, limit)
    }

    fn for_user(
        &self,
        kind: AnalysisKind,
        user_id: &UserId,
    ) -> Result<Vec<AnalysisRow>, RepositoryError> {
        self.inner.for_user(kind, user_id)
    }
}

#[derive(Default)]
pub(super) struct MemoryWorkspace {
    jobs: Mutex<Vec<JobPosting>>,
    profiles: Mutex<HashMap<UserId, CandidateProfile>>,
    preferences: Mutex<HashMap<UserId, WeightInput>>,
}

impl MemoryWorkspace {
    pub(super) fn add_job(&self, posting: JobPosting) {
        self.jobs.lock().expect("workspace mutex poisoned").push(posting);
    }

    pub(super) fn add_profile(&self, user: &str) {
        let user_id = UserId(user.to_string());
        self.profiles.lock().expect("workspace mutex poisoned").insert(
            user_id.clone(),
            CandidateProfile {
                user_id,
                details: json!({ "skills": ["Rust", "Go"], "yearsExperience": 6 }),
            },
        );
    }

    pub(super) fn remove_profile(&self, user: &str) {
        self.profiles
            .lock()
            .expect("workspace mutex poisoned")
            .remove(&UserId(user.to_string()));
    }

    pub(super) fn set_preference(&self, user: &str, preference: WeightInput) {
        self.preferences
            .lock()
            .expect("workspace mutex poisoned")
            .insert(UserId(user.to_string()), preference);
    }
}

impl CandidateWorkspace for MemoryWorkspace {
    fn job(&self, user_id: &UserId, job_id: &JobId) -> Result<Option<JobPosting>, RepositoryError> {
        let guard = self.jobs.lock().expect("workspace mutex poisoned");
        Ok(guard
            .iter()
            .find(|posting| &posting.id == job_id && &posting.owner == user_id)
            .cloned())
    }

    fn jobs(
        &self,
        user_id: &UserId,
        status: Option<JobStatus>,
    ) -> Result<Vec<JobPosting>, RepositoryError> {
        let guard = self.jobs.lock().expect("workspace mutex poisoned");
        Ok(guard
            .iter()
            .filter(|posting| &posting.owner == user_id)
            .filter(|posting| status.map_or(true, |status| posting.status == status))
            .cloned()
            .collect())
    }

    fn candidate_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<CandidateProfile>, RepositoryError> {
        let guard = self.profiles.lock().expect("workspace mutex poisoned");
        Ok(guard.get(user_id).cloned())
    }

    fn weight_preference(&self, user_id: &UserId) -> Result<Option<WeightInput>, RepositoryError> {
        let guard = self.preferences.lock().expect("workspace mutex poisoned");
        Ok(guard.get(user_id).cloned())
    }
}

/// Deterministic oracle. Scores are popped from a queue (75 once empty) and every
/// call is recorded with the weights it received.
#[derive(Default)]
pub(super) struct StubOracle {
    scores: Mutex<VecDeque<u32>>,
    calls: Mutex<Vec<(AnalysisKind, Option<WeightSet>)>>,
    failing: Mutex<Option<FailureMode>>,
    delay: Mutex<Option<std::time::Duration>>,
}

#[derive(Debug, Clone, Copy)]
pub(super) enum FailureMode {
    Timeout,
    Malformed,
}

impl StubOracle {
    pub(super) fn queue_scores(&self, scores: &[u32]) {
        self.scores
            .lock()
            .expect("oracle mutex poisoned")
            .extend(scores.iter().copied());
    }

    pub(super) fn fail_with(&self, mode: FailureMode) {
        *self.failing.lock().expect("oracle mutex poisoned") = Some(mode);
    }

    /// Blocks the calling thread this long on every call.
    pub(super) fn delay_by(&self, delay: std::time::Duration) {
        *self.delay.lock().expect("oracle mutex poisoned") = Some(delay);
    }

    pub(super) fn call_count(&self) -> usize {
        self.calls.lock().expect("oracle mutex poisoned").len()
    }

    pub(super) fn last_weights(&self) -> Option<WeightSet> {
        self.calls
            .lock()
            .expect("oracle mutex poisoned")
            .last()
            .and_then(|(_, weights)| weights.clone())
    }
}

impl ScoringOracle for StubOracle {
    fn score(&self, request: &ScoringRequest<'_>) -> Result<Value, OracleError> {
        self.calls
            .lock()
            .expect("oracle mutex poisoned")
            .push((request.kind, request.weights.cloned()));

        let delay = *self.delay.lock().expect("oracle mutex poisoned");
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        match *self.failing.lock().expect("oracle mutex poisoned") {
            Some(FailureMode::Timeout) => return Err(OracleError::Timeout),
            Some(FailureMode::Malformed) => return Ok(json!({ "overallScore": "high" })),
            None => {}
        }

        let score = self
            .scores
            .lock()
            .expect("oracle mutex poisoned")
            .pop_front()
            .unwrap_or(75);
        Ok(payload(request.kind, score))
    }
}

pub(super) fn payload(kind: AnalysisKind, score: u32) -> Value {
    match kind {
        AnalysisKind::JobMatch => json!({
            "overallScore": score,
            "categoryScores": {
                "skills": score,
                "experience": 70,
                "education": 60,
                "requirements": 80,
            },
            "strengths": [{ "description": "Ships Rust services", "importance": "high" }],
            "gaps": [{ "description": "No Kubernetes", "importance": "medium" }],
            "suggestions": ["Highlight on-call work"],
            "matchedSkills": ["Rust"],
            "missingSkills": ["Kubernetes"],
        }),
        AnalysisKind::SkillsGap => json!({
            "overallScore": score,
            "missingSkills": [
                { "skill": "Kubernetes", "importance": "high" },
                { "skill": "Terraform", "importance": "low" },
            ],
            "weakSkills": [{ "skill": "SQL", "priority": "medium" }],
            "recommendations": ["Complete a CKA course"],
        }),
        AnalysisKind::InterviewInsights => json!({
            "overallScore": score,
            "likelyQuestions": ["Describe an outage you handled"],
            "talkingPoints": ["Migration to async runtime"],
        }),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::cache::{AnalysisCache, CacheDecision};
use super::domain::{
    AnalysisId, AnalysisKind, AnalysisRecord, AnalysisResult, JobId, JobPosting, UserId,
};
use super::export::{render_csv, ExportError, ExportJob};
use super::report::views::{
    ComparisonQuery, ComparisonRow, HistoryEntry, ProgressView, TrendView,
};
use super::report::{
    build_comparison, build_progress, build_trends, clamp_limit, history_entries,
    DEFAULT_COMPARISON_LIMIT, DEFAULT_HISTORY_LIMIT,
};
use super::repository::{AnalysisRepository, CandidateWorkspace, RepositoryError};
use super::scoring::{ScoringError, ScoringGateway, ScoringOracle};
use super::store::AnalysisStore;
use super::weights::{WeightInput, WeightModel, WeightSet};
use crate::config::AnalysisConfig;

/// Source of the current instant; swapped out in tests to control record ages.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

static ANALYSIS_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_analysis_id() -> AnalysisId {
    let id = ANALYSIS_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AnalysisId(format!("ana-{id:06}"))
}

/// Request for a single analysis of one job on behalf of one user.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub kind: AnalysisKind,
    pub job_id: String,
    pub user_id: String,
    pub weights: Option<WeightInput>,
    pub force_refresh: bool,
}

/// Result handed back to callers, whether freshly computed or served from storage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub id: AnalysisId,
    pub kind: AnalysisKind,
    pub job_id: JobId,
    pub result: AnalysisResult,
    pub cached: bool,
    pub analysis_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights_used: Option<WeightSet>,
}

impl AnalysisOutcome {
    fn from_record(record: AnalysisRecord, cached: bool) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            job_id: record.job_id,
            result: record.result,
            cached,
            analysis_date: record.analysis_date,
            weights_used: record.weights_used,
        }
    }
}

/// Service composing the weight model, freshness cache, scoring gateway, and store.
pub struct MatchAnalysisService<R, W, O> {
    weights: WeightModel,
    cache: AnalysisCache,
    gateway: ScoringGateway<O>,
    store: AnalysisStore<R>,
    workspace: Arc<W>,
    clock: Arc<dyn Clock>,
}

impl<R, W, O> MatchAnalysisService<R, W, O>
where
    R: AnalysisRepository + 'static,
    W: CandidateWorkspace + 'static,
    O: ScoringOracle + 'static,
{
    pub fn new(
        repository: Arc<R>,
        workspace: Arc<W>,
        oracle: Arc<O>,
        config: &AnalysisConfig,
    ) -> Self {
        Self {
            weights: WeightModel::new(config.default_weights),
            cache: AnalysisCache::new(config.freshness),
            gateway: ScoringGateway::new(oracle),
            store: AnalysisStore::new(repository),
            workspace,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn weight_model(&self) -> &WeightModel {
        &self.weights
    }

    /// Serve a stored analysis when it is fresh and matches the effective weights,
    /// otherwise score the job and persist the new result.
    ///
    /// Nothing is written when scoring fails. Two concurrent misses for the same key
    /// may both score and persist.
    pub fn get_or_compute(
        &self,
        request: AnalysisRequest,
    ) -> Result<AnalysisOutcome, AnalysisServiceError> {
        let AnalysisRequest {
            kind,
            job_id,
            user_id,
            weights,
            force_refresh,
        } = request;

        let user_id = parse_user(&user_id)?;
        let job_id = parse_job(&job_id)?;
        let posting = self.owned_job(&user_id, &job_id)?;

        let effective = if kind.is_weighted() {
            Some(self.effective_weights(&user_id, weights.as_ref())?)
        } else {
            None
        };

        let latest = self.store.latest(kind, &job_id, &user_id)?;
        let decision = self.cache.decide(
            kind,
            latest.as_ref(),
            effective.as_ref(),
            force_refresh,
            self.clock.now(),
        );

        match (decision, latest) {
            (CacheDecision::Hit, Some(record)) => {
                debug!(%kind, %job_id, %user_id, id = %record.id, "analysis cache hit");
                return Ok(AnalysisOutcome::from_record(record, true));
            }
            (CacheDecision::Miss(reason), _) => {
                debug!(%kind, %job_id, %user_id, reason = reason.label(), "analysis cache miss");
            }
            (CacheDecision::Hit, None) => {}
        }

        let profile = self
            .workspace
            .candidate_profile(&user_id)?
            .ok_or_else(|| AnalysisServiceError::NotFound("candidate profile".to_string()))?;

        let result = self
            .gateway
            .score(kind, &profile, &posting, effective.as_ref())?;

        let record = AnalysisRecord {
            id: next_analysis_id(),
            job_id,
            user_id,
            kind,
            analysis_date: self.clock.now(),
            result,
            weights_used: effective,
        };
        self.store.save(&record)?;

        info!(
            %kind,
            id = %record.id,
            job_id = %record.job_id,
            overall_score = record.result.overall_score(),
            "analysis computed"
        );
        Ok(AnalysisOutcome::from_record(record, false))
    }

    /// Job-match history for one job, newest first.
    pub fn history(
        &self,
        job_id: &str,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryEntry>, AnalysisServiceError> {
        let user_id = parse_user(user_id)?;
        let job_id = parse_job(job_id)?;
        self.owned_job(&user_id, &job_id)?;

        let limit = clamp_limit(limit, DEFAULT_HISTORY_LIMIT);
        let timeline = self
            .store
            .history(AnalysisKind::JobMatch, &job_id, &user_id, Some(limit))?;
        Ok(history_entries(&timeline))
    }

    /// Latest job-match per job across the user's workspace, best score first.
    pub fn comparison(
        &self,
        user_id: &str,
        query: ComparisonQuery,
    ) -> Result<Vec<ComparisonRow>, AnalysisServiceError> {
        let user_id = parse_user(user_id)?;
        let min_score = match query.min_score.unwrap_or(0) {
            score @ 0..=100 => score as u32,
            _ => {
                return Err(AnalysisServiceError::Validation(
                    "min_score must be between 0 and 100".to_string(),
                ))
            }
        };
        let limit = clamp_limit(query.limit, DEFAULT_COMPARISON_LIMIT);

        let jobs = self.workspace.jobs(&user_id, query.status)?;
        let mut candidates = Vec::with_capacity(jobs.len());
        for posting in jobs {
            let latest = self
                .store
                .latest(AnalysisKind::JobMatch, &posting.id, &user_id)?;
            candidates.push((posting, latest));
        }

        Ok(build_comparison(candidates, min_score, limit))
    }

    /// Skills-gap progress for one job.
    pub fn progress(
        &self,
        job_id: &str,
        user_id: &str,
    ) -> Result<ProgressView, AnalysisServiceError> {
        let user_id = parse_user(user_id)?;
        let job_id = parse_job(job_id)?;
        self.owned_job(&user_id, &job_id)?;

        let current = self
            .store
            .latest(AnalysisKind::SkillsGap, &job_id, &user_id)?;
        let history = self
            .store
            .history(AnalysisKind::SkillsGap, &job_id, &user_id, None)?;
        Ok(build_progress(current, history))
    }

    /// Skill trends across every skills-gap analysis of the user.
    pub fn trends(&self, user_id: &str) -> Result<TrendView, AnalysisServiceError> {
        let user_id = parse_user(user_id)?;
        let records = self.store.for_user(AnalysisKind::SkillsGap, &user_id)?;
        if records.is_empty() {
            return Ok(TrendView::default());
        }

        let jobs: HashMap<JobId, JobPosting> = self
            .workspace
            .jobs(&user_id, None)?
            .into_iter()
            .map(|posting| (posting.id.clone(), posting))
            .collect();
        Ok(build_trends(&records, &jobs))
    }

    /// CSV of every job-match record for the requested jobs. Jobs the user does not
    /// own are skipped.
    pub fn export_csv(
        &self,
        user_id: &str,
        job_ids: &[String],
    ) -> Result<String, AnalysisServiceError> {
        let user_id = parse_user(user_id)?;

        let mut seen = HashSet::new();
        let requested: Vec<JobId> = job_ids
            .iter()
            .filter_map(|raw| JobId::parse(raw))
            .filter(|job_id| seen.insert(job_id.clone()))
            .collect();
        if requested.is_empty() {
            return Err(AnalysisServiceError::Validation(
                "at least one job id is required".to_string(),
            ));
        }

        let mut jobs = Vec::with_capacity(requested.len());
        for job_id in &requested {
            let Some(posting) = self.workspace.job(&user_id, job_id)? else {
                debug!(%job_id, %user_id, "skipping job outside the user's workspace");
                continue;
            };
            let timeline = self
                .store
                .history(AnalysisKind::JobMatch, job_id, &user_id, None)?;
            jobs.push(ExportJob { posting, timeline });
        }

        let csv = render_csv(&jobs)?;
        info!(%user_id, jobs = jobs.len(), "analysis export rendered");
        Ok(csv)
    }

    fn owned_job(
        &self,
        user_id: &UserId,
        job_id: &JobId,
    ) -> Result<JobPosting, AnalysisServiceError> {
        self.workspace
            .job(user_id, job_id)?
            .ok_or_else(|| AnalysisServiceError::NotFound(format!("job {job_id}")))
    }

    /// Defaults, then the saved preference, then the request override. Sources without
    /// a single usable value are skipped.
    fn effective_weights(
        &self,
        user_id: &UserId,
        overrides: Option<&WeightInput>,
    ) -> Result<WeightSet, AnalysisServiceError> {
        let preference = self
            .workspace
            .weight_preference(user_id)?
            .and_then(|input| input.cleaned());
        let overrides = overrides.and_then(WeightInput::cleaned);

        Ok(self.weights.merge(
            self.weights.defaults(),
            preference.as_ref(),
            overrides.as_ref(),
        ))
    }
}

fn parse_user(raw: &str) -> Result<UserId, AnalysisServiceError> {
    UserId::parse(raw)
        .ok_or_else(|| AnalysisServiceError::Validation("user id is required".to_string()))
}

fn parse_job(raw: &str) -> Result<JobId, AnalysisServiceError> {
    JobId::parse(raw)
        .ok_or_else(|| AnalysisServiceError::Validation("job id is required".to_string()))
}

/// Error raised by the analysis service.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisServiceError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    ScoringUnavailable(#[from] ScoringError),
    #[error(transparent)]
    Store(#[from] RepositoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{
    AnalysisId, AnalysisKind, CandidateProfile, JobId, JobPosting, JobStatus, UserId,
};
use super::weights::WeightInput;

/// Raw row shape exchanged with the durable store; payloads stay as JSON blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRow {
    pub id: AnalysisId,
    pub job_id: JobId,
    pub user_id: UserId,
    pub kind: AnalysisKind,
    pub analysis_date: DateTime<Utc>,
    pub result: Value,
    #[serde(default)]
    pub weights_used: Option<Value>,
}

/// Durable store for analysis rows, partitioned by kind.
///
/// `upsert_current` must replace the current row for `(kind, job, user)` and append an
/// immutable snapshot to the history collection in the same atomic write.
pub trait AnalysisRepository: Send + Sync {
    fn latest(
        &self,
        kind: AnalysisKind,
        job_id: &JobId,
        user_id: &UserId,
    ) -> Result<Option<AnalysisRow>, RepositoryError>;
    fn insert(&self, row: AnalysisRow) -> Result<(), RepositoryError>;
    fn upsert_current(&self, row: AnalysisRow) -> Result<(), RepositoryError>;
    /// History ordered by `analysis_date` descending; `None` returns every row.
    fn history(
        &self,
        kind: AnalysisKind,
        job_id: &JobId,
        user_id: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<AnalysisRow>, RepositoryError>;
    /// Latest row per job for `kind` across all of the user's jobs.
    fn for_user(
        &self,
        kind: AnalysisKind,
        user_id: &UserId,
    ) -> Result<Vec<AnalysisRow>, RepositoryError>;
}

/// Read access to the user's jobs, profile, and saved weighting preference.
pub trait CandidateWorkspace: Send + Sync {
    /// Returns the job only when it belongs to `user_id`.
    fn job(&self, user_id: &UserId, job_id: &JobId) -> Result<Option<JobPosting>, RepositoryError>;
    fn jobs(
        &self,
        user_id: &UserId,
        status: Option<JobStatus>,
    ) -> Result<Vec<JobPosting>, RepositoryError>;
    fn candidate_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<CandidateProfile>, RepositoryError>;
    fn weight_preference(&self, user_id: &UserId) -> Result<Option<WeightInput>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

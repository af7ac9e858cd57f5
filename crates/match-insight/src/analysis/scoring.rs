use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use super::domain::{AnalysisKind, AnalysisResult, CandidateProfile, JobPosting, PayloadError};
use super::weights::WeightSet;

/// Input handed to the external scoring oracle.
#[derive(Debug, Clone, Copy)]
pub struct ScoringRequest<'a> {
    pub kind: AnalysisKind,
    pub profile: &'a CandidateProfile,
    pub posting: &'a JobPosting,
    pub weights: Option<&'a WeightSet>,
}

/// External scorer (an LLM call in production). May be slow and may fail.
pub trait ScoringOracle: Send + Sync {
    fn score(&self, request: &ScoringRequest<'_>) -> Result<Value, OracleError>;
}

/// Failure reported by an oracle implementation.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle transport failed: {0}")]
    Transport(String),
    #[error("oracle timed out")]
    Timeout,
    #[error("oracle refused request: {0}")]
    Rejected(String),
}

/// Raised when no usable result could be obtained; nothing is cached in that case.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("{kind} scoring unavailable: {source}")]
    Unavailable {
        kind: AnalysisKind,
        #[source]
        source: OracleError,
    },
    #[error("{kind} scoring returned malformed content: {source}")]
    Malformed {
        kind: AnalysisKind,
        #[source]
        source: PayloadError,
    },
}

/// Adapter that invokes the oracle and validates its output. Adds no retries.
pub struct ScoringGateway<O> {
    oracle: Arc<O>,
}

impl<O> ScoringGateway<O>
where
    O: ScoringOracle,
{
    pub fn new(oracle: Arc<O>) -> Self {
        Self { oracle }
    }

    pub fn score(
        &self,
        kind: AnalysisKind,
        profile: &CandidateProfile,
        posting: &JobPosting,
        weights: Option<&WeightSet>,
    ) -> Result<AnalysisResult, ScoringError> {
        let request = ScoringRequest {
            kind,
            profile,
            posting,
            weights: weights.filter(|_| kind.is_weighted()),
        };

        let raw = self.oracle.score(&request).map_err(|source| {
            warn!(%kind, job_id = %posting.id, error = %source, "scoring oracle call failed");
            ScoringError::Unavailable { kind, source }
        })?;

        AnalysisResult::parse_strict(kind, &raw).map_err(|source| {
            warn!(%kind, job_id = %posting.id, error = %source, "scoring oracle returned malformed payload");
            ScoringError::Malformed { kind, source }
        })
    }
}

use std::sync::Arc;

use tracing::{debug, warn};

use super::domain::{AnalysisKind, AnalysisRecord, AnalysisResult, AnalysisTimeline, JobId, UserId};
use super::repository::{AnalysisRepository, AnalysisRow, RepositoryError};
use super::weights::WeightSet;

/// Persistence façade translating between typed records and stored rows.
///
/// Decoding is lenient: a malformed result blob decodes to a zero-valued result and a
/// malformed weights blob decodes to `None`, each logged rather than surfaced.
pub struct AnalysisStore<R> {
    repository: Arc<R>,
}

impl<R> AnalysisStore<R>
where
    R: AnalysisRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn latest(
        &self,
        kind: AnalysisKind,
        job_id: &JobId,
        user_id: &UserId,
    ) -> Result<Option<AnalysisRecord>, RepositoryError> {
        let row = self.repository.latest(kind, job_id, user_id)?;
        Ok(row.map(decode))
    }

    /// Appends a history row (job-match).
    pub fn insert(&self, record: &AnalysisRecord) -> Result<(), RepositoryError> {
        self.repository.insert(encode(record)?)?;
        debug!(kind = %record.kind, id = %record.id, job_id = %record.job_id, "analysis appended");
        Ok(())
    }

    /// Replaces the current row; the repository snapshots it into history.
    pub fn upsert_current(&self, record: &AnalysisRecord) -> Result<(), RepositoryError> {
        self.repository.upsert_current(encode(record)?)?;
        debug!(kind = %record.kind, id = %record.id, job_id = %record.job_id, "current analysis replaced");
        Ok(())
    }

    /// Persists using the write discipline of the record's kind.
    pub fn save(&self, record: &AnalysisRecord) -> Result<(), RepositoryError> {
        if record.kind.is_append_only() {
            self.insert(record)
        } else {
            self.upsert_current(record)
        }
    }

    pub fn history(
        &self,
        kind: AnalysisKind,
        job_id: &JobId,
        user_id: &UserId,
        limit: Option<usize>,
    ) -> Result<AnalysisTimeline, RepositoryError> {
        let rows = self.repository.history(kind, job_id, user_id, limit)?;
        Ok(AnalysisTimeline::newest_first(
            rows.into_iter().map(decode).collect(),
        ))
    }

    pub fn for_user(
        &self,
        kind: AnalysisKind,
        user_id: &UserId,
    ) -> Result<Vec<AnalysisRecord>, RepositoryError> {
        let rows = self.repository.for_user(kind, user_id)?;
        Ok(rows.into_iter().map(decode).collect())
    }
}

fn encode(record: &AnalysisRecord) -> Result<AnalysisRow, RepositoryError> {
    let result = serde_json::to_value(&record.result)
        .map_err(|err| RepositoryError::Unavailable(format!("failed to encode result: {err}")))?;

    Ok(AnalysisRow {
        id: record.id.clone(),
        job_id: record.job_id.clone(),
        user_id: record.user_id.clone(),
        kind: record.kind,
        analysis_date: record.analysis_date,
        result,
        weights_used: record.weights_used.as_ref().map(WeightSet::to_value),
    })
}

fn decode(row: AnalysisRow) -> AnalysisRecord {
    if !row.result.is_object() {
        warn!(id = %row.id, kind = %row.kind, "stored analysis result is malformed; using empty result");
    }
    let result = AnalysisResult::parse_lenient(row.kind, &row.result);

    let weights_used = match (&row.weights_used, row.kind.is_weighted()) {
        (Some(blob), true) => {
            let decoded = WeightSet::from_stored(blob);
            if decoded.is_none() && !blob.is_null() {
                warn!(id = %row.id, kind = %row.kind, "stored weights are malformed; ignoring");
            }
            decoded
        }
        _ => None,
    };

    AnalysisRecord {
        id: row.id,
        job_id: row.job_id,
        user_id: row.user_id,
        kind: row.kind,
        analysis_date: row.analysis_date,
        result,
        weights_used,
    }
}

use super::super::domain::{AnalysisRecord, AnalysisTimeline, JobPosting};
use super::views::{ComparisonRow, HistoryEntry};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const DEFAULT_COMPARISON_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

/// Applies the default and clamps into `[1, MAX_LIMIT]`.
pub fn clamp_limit(requested: Option<usize>, default: usize) -> usize {
    requested.unwrap_or(default).clamp(1, MAX_LIMIT)
}

pub fn history_entries(timeline: &AnalysisTimeline) -> Vec<HistoryEntry> {
    timeline
        .iter()
        .map(|record| HistoryEntry {
            id: record.id.clone(),
            analysis_date: record.analysis_date,
            overall_score: record.result.overall_score(),
            category_scores: record.result.category_scores().cloned(),
            weights_used: record.weights_used.clone(),
        })
        .collect()
}

/// Ranks jobs by their latest score. Jobs without a record or under `min_score` drop out.
pub fn build_comparison(
    candidates: Vec<(JobPosting, Option<AnalysisRecord>)>,
    min_score: u32,
    limit: usize,
) -> Vec<ComparisonRow> {
    let mut rows: Vec<ComparisonRow> = candidates
        .into_iter()
        .filter_map(|(job, latest)| {
            let record = latest?;
            let overall_score = record.result.overall_score();
            if overall_score < min_score {
                return None;
            }

            Some(ComparisonRow {
                job_id: job.id,
                title: job.title,
                company: job.company,
                status: job.status,
                overall_score,
                category_scores: record.result.category_scores().cloned().unwrap_or_default(),
                analysis_date: record.analysis_date,
                weights_used: record.weights_used,
            })
        })
        .collect();

    rows.sort_by(|a, b| b.overall_score.cmp(&a.overall_score));
    rows.truncate(limit);
    rows
}

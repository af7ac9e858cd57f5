use super::super::domain::{AnalysisRecord, AnalysisResult, AnalysisTimeline};
use super::views::{ProgressMetrics, ProgressSnapshot, ProgressView};

const SECONDS_PER_DAY: i64 = 86_400;

fn snapshot(record: &AnalysisRecord) -> ProgressSnapshot {
    let (missing_skill_count, weak_skill_count) = match &record.result {
        AnalysisResult::SkillsGap(gap) => (gap.missing_skills.len(), gap.weak_skills.len()),
        _ => (0, 0),
    };

    ProgressSnapshot {
        id: record.id.clone(),
        snapshot_date: record.analysis_date,
        overall_score: record.result.overall_score(),
        missing_skill_count,
        weak_skill_count,
    }
}

/// Derives first-vs-latest metrics from the snapshot history.
///
/// When no snapshot exists yet the current record stands in as a single snapshot.
pub fn build_progress(current: Option<AnalysisRecord>, history: AnalysisTimeline) -> ProgressView {
    let history = if history.is_empty() {
        AnalysisTimeline::newest_first(current.iter().cloned().collect())
    } else {
        history
    };

    let metrics = match (history.latest(), history.earliest()) {
        (Some(latest), Some(earliest)) => {
            let latest_score = latest.result.overall_score();
            let first_score = earliest.result.overall_score();
            let elapsed = latest.analysis_date - earliest.analysis_date;
            ProgressMetrics {
                snapshot_count: history.len(),
                first_score: Some(first_score),
                latest_score: Some(latest_score),
                score_improvement: i64::from(latest_score) - i64::from(first_score),
                time_span_days: elapsed.num_seconds().div_euclid(SECONDS_PER_DAY),
            }
        }
        _ => ProgressMetrics::default(),
    };

    ProgressView {
        current,
        history: history.iter().map(snapshot).collect(),
        metrics,
    }
}

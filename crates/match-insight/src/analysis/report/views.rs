use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::{AnalysisId, AnalysisRecord, CategoryScores, JobId, JobStatus};
use super::super::weights::WeightSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: AnalysisId,
    pub analysis_date: DateTime<Utc>,
    pub overall_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_scores: Option<CategoryScores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights_used: Option<WeightSet>,
}

/// Filters for the cross-job comparison view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ComparisonQuery {
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub min_score: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub job_id: JobId,
    pub title: String,
    pub company: Option<String>,
    pub status: JobStatus,
    pub overall_score: u32,
    pub category_scores: CategoryScores,
    pub analysis_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights_used: Option<WeightSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub id: AnalysisId,
    pub snapshot_date: DateTime<Utc>,
    pub overall_score: u32,
    pub missing_skill_count: usize,
    pub weak_skill_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMetrics {
    pub snapshot_count: usize,
    pub first_score: Option<u32>,
    pub latest_score: Option<u32>,
    pub score_improvement: i64,
    pub time_span_days: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub current: Option<AnalysisRecord>,
    pub history: Vec<ProgressSnapshot>,
    pub metrics: ProgressMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillTrend {
    pub skill: String,
    pub occurrences: usize,
    pub importance_levels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendJob {
    pub job_id: JobId,
    pub title: Option<String>,
    pub company: Option<String>,
    pub gap_score: u32,
    pub analysis_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendView {
    pub total_jobs: usize,
    pub average_gap_score: u32,
    pub jobs: Vec<TrendJob>,
    pub common_missing_skills: Vec<SkillTrend>,
    pub common_weak_skills: Vec<SkillTrend>,
    pub skill_frequency: BTreeMap<String, usize>,
}

//! Candidate-to-job analyses: weighting, freshness caching, persistence, and the
//! history, comparison, progress, trend, and export views built on top of them.

pub mod cache;
pub mod domain;
pub mod export;
pub mod report;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod store;
pub mod weights;

#[cfg(test)]
mod tests;

pub use cache::{AnalysisCache, CacheDecision, FreshnessPolicy, MissReason};
pub use domain::{
    highest_ranked, AnalysisId, AnalysisKind, AnalysisRecord, AnalysisResult, AnalysisTimeline,
    CandidateProfile, CategoryScores, Importance, InterviewInsightsResult, JobId,
    JobMatchResult, JobPosting, JobStatus, PayloadError, RankedInsight, SkillGap,
    SkillsGapResult, UserId,
};
pub use export::{render_csv, ExportError, ExportJob};
pub use report::views::{
    ComparisonQuery, ComparisonRow, HistoryEntry, ProgressMetrics, ProgressSnapshot,
    ProgressView, SkillTrend, TrendJob, TrendView,
};
pub use repository::{AnalysisRepository, AnalysisRow, CandidateWorkspace, RepositoryError};
pub use router::analysis_router;
pub use scoring::{OracleError, ScoringError, ScoringGateway, ScoringOracle, ScoringRequest};
pub use service::{
    AnalysisOutcome, AnalysisRequest, AnalysisServiceError, Clock, MatchAnalysisService,
    SystemClock,
};
pub use store::AnalysisStore;
pub use weights::{DefaultWeights, WeightInput, WeightModel, WeightSet};

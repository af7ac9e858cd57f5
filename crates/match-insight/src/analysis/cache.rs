use chrono::{DateTime, Duration, Utc};

use super::domain::{AnalysisKind, AnalysisRecord};
use super::weights::{weights_equal, WeightSet};

/// Maximum age per analysis kind at which a stored record is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub job_match: Duration,
    pub skills_gap: Duration,
    pub interview_insights: Duration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            job_match: Duration::hours(24),
            skills_gap: Duration::hours(24),
            interview_insights: Duration::days(7),
        }
    }
}

impl FreshnessPolicy {
    pub fn from_hours(job_match: u32, skills_gap: u32, interview_insights: u32) -> Self {
        Self {
            job_match: Duration::hours(i64::from(job_match)),
            skills_gap: Duration::hours(i64::from(skills_gap)),
            interview_insights: Duration::hours(i64::from(interview_insights)),
        }
    }

    pub fn window(&self, kind: AnalysisKind) -> Duration {
        match kind {
            AnalysisKind::JobMatch => self.job_match,
            AnalysisKind::SkillsGap => self.skills_gap,
            AnalysisKind::InterviewInsights => self.interview_insights,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    ForcedRefresh,
    NoRecord,
    Expired,
    WeightsChanged,
}

impl MissReason {
    pub fn label(self) -> &'static str {
        match self {
            MissReason::ForcedRefresh => "forced_refresh",
            MissReason::NoRecord => "no_record",
            MissReason::Expired => "expired",
            MissReason::WeightsChanged => "weights_changed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    Hit,
    Miss(MissReason),
}

impl CacheDecision {
    pub fn is_hit(self) -> bool {
        matches!(self, CacheDecision::Hit)
    }
}

/// Decides whether the most recent stored record can answer a request.
#[derive(Debug, Clone, Default)]
pub struct AnalysisCache {
    policy: FreshnessPolicy,
}

impl AnalysisCache {
    pub fn new(policy: FreshnessPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &FreshnessPolicy {
        &self.policy
    }

    /// A record is stale once its age reaches the window. For weighted kinds a
    /// differing weight set is a miss regardless of age.
    pub fn decide(
        &self,
        kind: AnalysisKind,
        latest: Option<&AnalysisRecord>,
        requested: Option<&WeightSet>,
        force_refresh: bool,
        now: DateTime<Utc>,
    ) -> CacheDecision {
        if force_refresh {
            return CacheDecision::Miss(MissReason::ForcedRefresh);
        }

        let Some(record) = latest else {
            return CacheDecision::Miss(MissReason::NoRecord);
        };

        if now - record.analysis_date >= self.policy.window(kind) {
            return CacheDecision::Miss(MissReason::Expired);
        }

        if kind.is_weighted() {
            if let Some(requested) = requested {
                let unchanged = record
                    .weights_used
                    .as_ref()
                    .is_some_and(|stored| weights_equal(stored, requested));
                if !unchanged {
                    return CacheDecision::Miss(MissReason::WeightsChanged);
                }
            }
        }

        CacheDecision::Hit
    }
}

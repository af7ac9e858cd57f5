use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::weights::WeightSet;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Trims the raw identifier, rejecting blank input.
            pub fn parse(raw: &str) -> Option<Self> {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Self(trimmed.to_string()))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Job posting tracked in a user's workspace.
    JobId
);
identifier!(UserId);
identifier!(
    /// Synthetic identifier of one stored analysis instance.
    AnalysisId
);

/// Analysis flavours produced by the scoring oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisKind {
    JobMatch,
    SkillsGap,
    InterviewInsights,
}

impl AnalysisKind {
    pub fn label(self) -> &'static str {
        match self {
            AnalysisKind::JobMatch => "job-match",
            AnalysisKind::SkillsGap => "skills-gap",
            AnalysisKind::InterviewInsights => "interview-insights",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "job-match" | "match" => Some(Self::JobMatch),
            "skills-gap" | "gap" => Some(Self::SkillsGap),
            "interview-insights" | "interview" => Some(Self::InterviewInsights),
            _ => None,
        }
    }

    /// Only job-match analyses are parameterized by a weight set.
    pub fn is_weighted(self) -> bool {
        matches!(self, AnalysisKind::JobMatch)
    }

    /// Job-match appends a row per computation; the other kinds replace their current row.
    pub fn is_append_only(self) -> bool {
        matches!(self, AnalysisKind::JobMatch)
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ranking attached to strengths and gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    Medium,
    High,
}

impl Importance {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "critical" => Some(Self::High),
            "medium" | "moderate" => Some(Self::Medium),
            "low" | "minor" => Some(Self::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedInsight {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<Importance>,
}

/// First entry carrying the highest importance; unranked entries sort below ranked ones.
pub fn highest_ranked(insights: &[RankedInsight]) -> Option<&RankedInsight> {
    insights
        .iter()
        .fold(None, |best: Option<&RankedInsight>, insight| match best {
            Some(current) if insight.importance <= current.importance => best,
            _ => Some(insight),
        })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScores {
    pub skills: Option<u32>,
    pub experience: Option<u32>,
    pub education: Option<u32>,
    pub requirements: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMatchResult {
    pub overall_score: u32,
    pub category_scores: CategoryScores,
    pub strengths: Vec<RankedInsight>,
    pub gaps: Vec<RankedInsight>,
    pub suggestions: Vec<String>,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
}

/// Missing or weak skill with the importance/priority label the oracle attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillGap {
    pub skill: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsGapResult {
    pub overall_score: u32,
    pub missing_skills: Vec<SkillGap>,
    pub weak_skills: Vec<SkillGap>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewInsightsResult {
    pub overall_score: u32,
    pub likely_questions: Vec<String>,
    pub talking_points: Vec<String>,
}

/// Oracle output, tagged by analysis kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AnalysisResult {
    JobMatch(JobMatchResult),
    SkillsGap(SkillsGapResult),
    InterviewInsights(InterviewInsightsResult),
}

/// Shape violations found while validating oracle output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("payload is missing `{0}`")]
    MissingField(&'static str),
    #[error("payload field `{field}` should be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

#[derive(Clone, Copy)]
enum Shape {
    Number,
    Object,
    Array,
}

impl Shape {
    fn matches(self, value: &Value) -> bool {
        match self {
            Shape::Number => value.is_number(),
            Shape::Object => value.is_object(),
            Shape::Array => value.is_array(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Shape::Number => "a number",
            Shape::Object => "an object",
            Shape::Array => "an array",
        }
    }
}

fn required_fields(kind: AnalysisKind) -> &'static [(&'static str, Shape)] {
    match kind {
        AnalysisKind::JobMatch => &[
            ("overallScore", Shape::Number),
            ("categoryScores", Shape::Object),
            ("strengths", Shape::Array),
            ("gaps", Shape::Array),
            ("suggestions", Shape::Array),
            ("matchedSkills", Shape::Array),
            ("missingSkills", Shape::Array),
        ],
        AnalysisKind::SkillsGap => &[
            ("overallScore", Shape::Number),
            ("missingSkills", Shape::Array),
            ("weakSkills", Shape::Array),
            ("recommendations", Shape::Array),
        ],
        AnalysisKind::InterviewInsights => &[
            ("overallScore", Shape::Number),
            ("likelyQuestions", Shape::Array),
            ("talkingPoints", Shape::Array),
        ],
    }
}

impl AnalysisResult {
    /// Zero-valued result used when a stored payload cannot be decoded at all.
    pub fn empty(kind: AnalysisKind) -> Self {
        match kind {
            AnalysisKind::JobMatch => Self::JobMatch(JobMatchResult::default()),
            AnalysisKind::SkillsGap => Self::SkillsGap(SkillsGapResult::default()),
            AnalysisKind::InterviewInsights => {
                Self::InterviewInsights(InterviewInsightsResult::default())
            }
        }
    }

    pub fn kind(&self) -> AnalysisKind {
        match self {
            AnalysisResult::JobMatch(_) => AnalysisKind::JobMatch,
            AnalysisResult::SkillsGap(_) => AnalysisKind::SkillsGap,
            AnalysisResult::InterviewInsights(_) => AnalysisKind::InterviewInsights,
        }
    }

    pub fn overall_score(&self) -> u32 {
        match self {
            AnalysisResult::JobMatch(result) => result.overall_score,
            AnalysisResult::SkillsGap(result) => result.overall_score,
            AnalysisResult::InterviewInsights(result) => result.overall_score,
        }
    }

    pub fn category_scores(&self) -> Option<&CategoryScores> {
        match self {
            AnalysisResult::JobMatch(result) => Some(&result.category_scores),
            _ => None,
        }
    }

    /// Validates fresh oracle output: every required field must be present with the
    /// expected JSON type before it is decoded.
    pub fn parse_strict(kind: AnalysisKind, value: &Value) -> Result<Self, PayloadError> {
        let fields = value.as_object().ok_or(PayloadError::NotAnObject)?;
        for &(field, shape) in required_fields(kind) {
            let present = fields.get(field).ok_or(PayloadError::MissingField(field))?;
            if !shape.matches(present) {
                return Err(PayloadError::WrongType {
                    field,
                    expected: shape.label(),
                });
            }
        }

        Ok(Self::decode(kind, fields))
    }

    /// Decodes a stored payload, substituting defaults for anything malformed.
    pub fn parse_lenient(kind: AnalysisKind, value: &Value) -> Self {
        match value.as_object() {
            Some(fields) => Self::decode(kind, fields),
            None => Self::empty(kind),
        }
    }

    fn decode(kind: AnalysisKind, fields: &Map<String, Value>) -> Self {
        let overall_score = score(fields.get("overallScore")).unwrap_or(0);
        match kind {
            AnalysisKind::JobMatch => {
                let categories = fields.get("categoryScores").and_then(Value::as_object);
                let category = |name: &str| categories.and_then(|map| score(map.get(name)));
                Self::JobMatch(JobMatchResult {
                    overall_score,
                    category_scores: CategoryScores {
                        skills: category("skills"),
                        experience: category("experience"),
                        education: category("education"),
                        requirements: category("requirements"),
                    },
                    strengths: list(fields, "strengths", ranked_insight),
                    gaps: list(fields, "gaps", ranked_insight),
                    suggestions: list(fields, "suggestions", text),
                    matched_skills: list(fields, "matchedSkills", text),
                    missing_skills: list(fields, "missingSkills", text),
                })
            }
            AnalysisKind::SkillsGap => Self::SkillsGap(SkillsGapResult {
                overall_score,
                missing_skills: list(fields, "missingSkills", skill_gap),
                weak_skills: list(fields, "weakSkills", skill_gap),
                recommendations: list(fields, "recommendations", text),
            }),
            AnalysisKind::InterviewInsights => Self::InterviewInsights(InterviewInsightsResult {
                overall_score,
                likely_questions: list(fields, "likelyQuestions", text),
                talking_points: list(fields, "talkingPoints", text),
            }),
        }
    }
}

fn score(value: Option<&Value>) -> Option<u32> {
    let raw = value?.as_f64()?;
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, 100.0) as u32)
}

fn list<T>(fields: &Map<String, Value>, key: &str, item: fn(&Value) -> Option<T>) -> Vec<T> {
    fields
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(item).collect())
        .unwrap_or_default()
}

fn text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(str::to_string)
}

fn first_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| fields.get(*key).and_then(text))
}

fn ranked_insight(value: &Value) -> Option<RankedInsight> {
    if let Some(description) = text(value) {
        return Some(RankedInsight {
            description,
            importance: None,
        });
    }

    let fields = value.as_object()?;
    let description = first_text(fields, &["description", "title", "text"])?;
    let importance = fields
        .get("importance")
        .or_else(|| fields.get("priority"))
        .and_then(Value::as_str)
        .and_then(Importance::parse);
    Some(RankedInsight {
        description,
        importance,
    })
}

fn skill_gap(value: &Value) -> Option<SkillGap> {
    if let Some(skill) = text(value) {
        return Some(SkillGap {
            skill,
            importance: None,
        });
    }

    let fields = value.as_object()?;
    Some(SkillGap {
        skill: first_text(fields, &["skill", "name"])?,
        importance: first_text(fields, &["importance", "priority"]),
    })
}

/// One persisted analysis instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: AnalysisId,
    pub job_id: JobId,
    pub user_id: UserId,
    pub kind: AnalysisKind,
    pub analysis_date: DateTime<Utc>,
    pub result: AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights_used: Option<WeightSet>,
}

/// Analysis records of a single (job, user) pair, ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnalysisTimeline(Vec<AnalysisRecord>);

impl AnalysisTimeline {
    pub fn newest_first(mut records: Vec<AnalysisRecord>) -> Self {
        records.sort_by(|a, b| b.analysis_date.cmp(&a.analysis_date));
        Self(records)
    }

    pub fn latest(&self) -> Option<&AnalysisRecord> {
        self.0.first()
    }

    pub fn earliest(&self) -> Option<&AnalysisRecord> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnalysisRecord> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<AnalysisRecord> {
        self.0
    }
}

/// Lifecycle of a tracked job application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Saved,
    Applied,
    Interviewing,
    Offered,
    Rejected,
    Archived,
}

impl JobStatus {
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Saved => "saved",
            JobStatus::Applied => "applied",
            JobStatus::Interviewing => "interviewing",
            JobStatus::Offered => "offered",
            JobStatus::Rejected => "rejected",
            JobStatus::Archived => "archived",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "saved" => Some(Self::Saved),
            "applied" => Some(Self::Applied),
            "interviewing" => Some(Self::Interviewing),
            "offered" => Some(Self::Offered),
            "rejected" => Some(Self::Rejected),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: JobId,
    pub owner: UserId,
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub details: Value,
}

/// Candidate data handed to the oracle as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProfile {
    pub user_id: UserId,
    #[serde(default)]
    pub details: Value,
}

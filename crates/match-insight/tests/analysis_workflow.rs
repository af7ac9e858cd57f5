use std::sync::{Arc, Mutex};

use match_insight::analysis::{
    AnalysisKind, AnalysisRepository, AnalysisRequest, AnalysisRow, CandidateProfile,
    CandidateWorkspace, ComparisonQuery, JobId, JobPosting, JobStatus, MatchAnalysisService,
    OracleError, RepositoryError, ScoringOracle, ScoringRequest, UserId, WeightInput,
};
use match_insight::config::AnalysisConfig;
use serde_json::{json, Value};

#[derive(Default)]
struct Rows(Mutex<Vec<AnalysisRow>>);

impl Rows {
    fn matching(&self, kind: AnalysisKind, job_id: &JobId, user_id: &UserId) -> Vec<AnalysisRow> {
        let mut rows: Vec<AnalysisRow> = self
            .0
            .lock()
            .expect("rows mutex poisoned")
            .iter()
            .filter(|row| row.kind == kind && &row.job_id == job_id && &row.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.analysis_date.cmp(&a.analysis_date));
        rows
    }
}

impl AnalysisRepository for Rows {
    fn latest(
        &self,
        kind: AnalysisKind,
        job_id: &JobId,
        user_id: &UserId,
    ) -> Result<Option<AnalysisRow>, RepositoryError> {
        Ok(self.matching(kind, job_id, user_id).into_iter().next())
    }

    fn insert(&self, row: AnalysisRow) -> Result<(), RepositoryError> {
        self.0.lock().expect("rows mutex poisoned").push(row);
        Ok(())
    }

    fn upsert_current(&self, row: AnalysisRow) -> Result<(), RepositoryError> {
        self.insert(row)
    }

    fn history(
        &self,
        kind: AnalysisKind,
        job_id: &JobId,
        user_id: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<AnalysisRow>, RepositoryError> {
        let mut rows = self.matching(kind, job_id, user_id);
        rows.truncate(limit.unwrap_or(usize::MAX));
        Ok(rows)
    }

    fn for_user(
        &self,
        kind: AnalysisKind,
        user_id: &UserId,
    ) -> Result<Vec<AnalysisRow>, RepositoryError> {
        let jobs: Vec<JobId> = self
            .0
            .lock()
            .expect("rows mutex poisoned")
            .iter()
            .filter(|row| row.kind == kind && &row.user_id == user_id)
            .map(|row| row.job_id.clone())
            .collect();

        let mut latest = Vec::new();
        for job_id in jobs {
            if latest.iter().any(|row: &AnalysisRow| row.job_id == job_id) {
                continue;
            }
            if let Some(row) = self.latest(kind, &job_id, user_id)? {
                latest.push(row);
            }
        }
        Ok(latest)
    }
}

struct Workspace {
    jobs: Vec<JobPosting>,
}

impl CandidateWorkspace for Workspace {
    fn job(&self, user_id: &UserId, job_id: &JobId) -> Result<Option<JobPosting>, RepositoryError> {
        Ok(self
            .jobs
            .iter()
            .find(|job| &job.id == job_id && &job.owner == user_id)
            .cloned())
    }

    fn jobs(
        &self,
        user_id: &UserId,
        status: Option<JobStatus>,
    ) -> Result<Vec<JobPosting>, RepositoryError> {
        Ok(self
            .jobs
            .iter()
            .filter(|job| &job.owner == user_id && status.map_or(true, |s| job.status == s))
            .cloned()
            .collect())
    }

    fn candidate_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<CandidateProfile>, RepositoryError> {
        Ok(Some(CandidateProfile {
            user_id: user_id.clone(),
            details: json!({ "skills": ["Rust"] }),
        }))
    }

    fn weight_preference(&self, _user_id: &UserId) -> Result<Option<WeightInput>, RepositoryError> {
        Ok(None)
    }
}

/// Scores by title length so each job gets a distinct, stable score.
struct TitleOracle;

impl ScoringOracle for TitleOracle {
    fn score(&self, request: &ScoringRequest<'_>) -> Result<Value, OracleError> {
        let score = (request.posting.title.len() * 5).min(100);
        Ok(match request.kind {
            AnalysisKind::JobMatch => json!({
                "overallScore": score,
                "categoryScores": { "skills": score },
                "strengths": ["Rust, async, and \"tokio\""],
                "gaps": [],
                "suggestions": [],
                "matchedSkills": ["Rust"],
                "missingSkills": [],
            }),
            AnalysisKind::SkillsGap => json!({
                "overallScore": score,
                "missingSkills": ["Kafka"],
                "weakSkills": [],
                "recommendations": [],
            }),
            AnalysisKind::InterviewInsights => json!({
                "overallScore": score,
                "likelyQuestions": [],
                "talkingPoints": [],
            }),
        })
    }
}

fn job(id: &str, title: &str) -> JobPosting {
    JobPosting {
        id: JobId(id.to_string()),
        owner: UserId("candidate".to_string()),
        title: title.to_string(),
        company: Some("Initech, Inc.".to_string()),
        status: JobStatus::Applied,
        details: Value::Null,
    }
}

fn service() -> MatchAnalysisService<Rows, Workspace, TitleOracle> {
    MatchAnalysisService::new(
        Arc::new(Rows::default()),
        Arc::new(Workspace {
            jobs: vec![job("short", "SRE"), job("long", "Staff Platform Engineer")],
        }),
        Arc::new(TitleOracle),
        &AnalysisConfig::default(),
    )
}

fn analyse(service: &MatchAnalysisService<Rows, Workspace, TitleOracle>, kind: AnalysisKind, job: &str) {
    service
        .get_or_compute(AnalysisRequest {
            kind,
            job_id: job.to_string(),
            user_id: "candidate".to_string(),
            weights: None,
            force_refresh: false,
        })
        .expect("analysis computes");
}

#[test]
fn analyses_feed_comparison_trends_and_export() {
    let service = service();
    for job in ["short", "long"] {
        analyse(&service, AnalysisKind::JobMatch, job);
        analyse(&service, AnalysisKind::SkillsGap, job);
    }

    let comparison = service
        .comparison("candidate", ComparisonQuery::default())
        .expect("comparison builds");
    assert_eq!(comparison.len(), 2);
    assert_eq!(comparison[0].job_id.as_str(), "long");
    assert_eq!(comparison[0].overall_score, 100);
    assert_eq!(comparison[1].overall_score, 15);

    let trends = service.trends("candidate").expect("trends build");
    assert_eq!(trends.total_jobs, 2);
    assert_eq!(trends.common_missing_skills[0].skill, "Kafka");
    assert_eq!(trends.common_missing_skills[0].occurrences, 2);

    let csv = service
        .export_csv("candidate", &["long".to_string(), "short".to_string()])
        .expect("export renders");
    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let rows: Vec<csv::StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .expect("export parses");
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "long");
    assert_eq!(&rows[0][2], "Initech, Inc.");
    assert_eq!(&rows[0][9], "Rust, async, and \"tokio\"");
}

#[test]
fn weight_override_is_persisted_with_the_result() {
    let service = service();
    let outcome = service
        .get_or_compute(AnalysisRequest {
            kind: AnalysisKind::JobMatch,
            job_id: "short".to_string(),
            user_id: "candidate".to_string(),
            weights: Some(WeightInput {
                experience: Some(9.0),
                ..WeightInput::default()
            }),
            force_refresh: false,
        })
        .expect("analysis computes");

    let history = service
        .history("short", "candidate", None)
        .expect("history loads");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, outcome.id);
    let stored = history[0].weights_used.as_ref().expect("weights stored");
    assert_eq!(stored.experience(), 3.0);
    assert_eq!(stored.skills(), 1.0);
}

use match_insight::analysis::{
    AnalysisKind, AnalysisRepository, AnalysisRow, CandidateProfile, CandidateWorkspace, JobId,
    JobPosting, JobStatus, OracleError, RepositoryError, ScoringOracle, ScoringRequest, UserId,
    WeightInput, WeightSet,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

type RowKey = (AnalysisKind, JobId, UserId);

/// Current row per (kind, job, user) plus an append-only history of every write.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAnalysisRepository {
    current: Arc<Mutex<HashMap<RowKey, AnalysisRow>>>,
    history: Arc<Mutex<Vec<AnalysisRow>>>,
}

impl InMemoryAnalysisRepository {
    fn lock_current(&self) -> Result<MutexGuard<'_, HashMap<RowKey, AnalysisRow>>, RepositoryError> {
        self.current
            .lock()
            .map_err(|_| RepositoryError::Unavailable("analysis store poisoned".to_string()))
    }

    fn lock_history(&self) -> Result<MutexGuard<'_, Vec<AnalysisRow>>, RepositoryError> {
        self.history
            .lock()
            .map_err(|_| RepositoryError::Unavailable("analysis history poisoned".to_string()))
    }
}

impl AnalysisRepository for InMemoryAnalysisRepository {
    fn latest(
        &self,
        kind: AnalysisKind,
        job_id: &JobId,
        user_id: &UserId,
    ) -> Result<Option<AnalysisRow>, RepositoryError> {
        let guard = self.lock_current()?;
        Ok(guard
            .get(&(kind, job_id.clone(), user_id.clone()))
            .cloned())
    }

    fn insert(&self, row: AnalysisRow) -> Result<(), RepositoryError> {
        let mut current = self.lock_current()?;
        let mut history = self.lock_history()?;
        if history.iter().any(|existing| existing.id == row.id) {
            return Err(RepositoryError::Conflict);
        }
        history.push(row.clone());
        current.insert((row.kind, row.job_id.clone(), row.user_id.clone()), row);
        Ok(())
    }

    fn upsert_current(&self, row: AnalysisRow) -> Result<(), RepositoryError> {
        // Replacement and snapshot are written under both locks.
        let mut current = self.lock_current()?;
        let mut history = self.lock_history()?;
        history.push(row.clone());
        current.insert((row.kind, row.job_id.clone(), row.user_id.clone()), row);
        Ok(())
    }

    fn history(
        &self,
        kind: AnalysisKind,
        job_id: &JobId,
        user_id: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<AnalysisRow>, RepositoryError> {
        let guard = self.lock_history()?;
        let mut rows: Vec<AnalysisRow> = guard
            .iter()
            .filter(|row| row.kind == kind && &row.job_id == job_id && &row.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.analysis_date.cmp(&a.analysis_date));
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn for_user(
        &self,
        kind: AnalysisKind,
        user_id: &UserId,
    ) -> Result<Vec<AnalysisRow>, RepositoryError> {
        let guard = self.lock_current()?;
        Ok(guard
            .values()
            .filter(|row| row.kind == kind && &row.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// Seed document accepted by `--workspace`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WorkspaceSeed {
    #[serde(default)]
    pub(crate) jobs: Vec<JobPosting>,
    #[serde(default)]
    pub(crate) profiles: Vec<CandidateProfile>,
    #[serde(default)]
    pub(crate) preferences: HashMap<UserId, WeightInput>,
}

#[derive(Default)]
pub(crate) struct InMemoryWorkspace {
    jobs: Vec<JobPosting>,
    profiles: HashMap<UserId, CandidateProfile>,
    preferences: HashMap<UserId, WeightInput>,
}

impl InMemoryWorkspace {
    pub(crate) fn from_seed(seed: WorkspaceSeed) -> Self {
        Self {
            jobs: seed.jobs,
            profiles: seed
                .profiles
                .into_iter()
                .map(|profile| (profile.user_id.clone(), profile))
                .collect(),
            preferences: seed.preferences,
        }
    }

    pub(crate) fn from_path(path: &Path) -> Result<Self, std::io::Error> {
        let raw = std::fs::read_to_string(path)?;
        let seed: WorkspaceSeed = serde_json::from_str(&raw)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        Ok(Self::from_seed(seed))
    }

    /// Sample workspace used by the demo command and when no seed file is given.
    pub(crate) fn sample() -> Self {
        let owner = UserId(SAMPLE_USER.to_string());
        let job = |id: &str, title: &str, company: &str, status: JobStatus, details: Value| {
            JobPosting {
                id: JobId(id.to_string()),
                owner: owner.clone(),
                title: title.to_string(),
                company: Some(company.to_string()),
                status,
                details,
            }
        };

        let jobs = vec![
            job(
                "job-101",
                "Senior Rust Engineer",
                "Ferrous Systems",
                JobStatus::Applied,
                json!({
                    "skills": ["Rust", "Tokio", "PostgreSQL", "Kubernetes"],
                    "niceToHave": ["Terraform"],
                    "minYears": 5,
                }),
            ),
            job(
                "job-102",
                "Platform Engineer",
                "Acme Cloud",
                JobStatus::Interviewing,
                json!({
                    "skills": ["Go", "Kubernetes", "Terraform", "AWS"],
                    "niceToHave": ["Rust"],
                    "minYears": 4,
                }),
            ),
            job(
                "job-103",
                "Backend Developer, Payments",
                "Ledgerly",
                JobStatus::Saved,
                json!({
                    "skills": ["Rust", "PostgreSQL", "Kafka"],
                    "niceToHave": ["gRPC", "AWS"],
                    "minYears": 3,
                }),
            ),
        ];

        let mut profiles = HashMap::new();
        profiles.insert(
            owner.clone(),
            CandidateProfile {
                user_id: owner.clone(),
                details: json!({
                    "skills": ["Rust", "Tokio", "PostgreSQL", "AWS", "gRPC"],
                    "yearsExperience": 6,
                    "education": "BSc Computer Science",
                }),
            },
        );

        Self {
            jobs,
            profiles,
            preferences: HashMap::new(),
        }
    }
}

pub(crate) const SAMPLE_USER: &str = "demo-user";

impl CandidateWorkspace for InMemoryWorkspace {
    fn job(&self, user_id: &UserId, job_id: &JobId) -> Result<Option<JobPosting>, RepositoryError> {
        Ok(self
            .jobs
            .iter()
            .find(|posting| &posting.id == job_id && &posting.owner == user_id)
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
            .filter(|posting| &posting.owner == user_id)
            .filter(|posting| status.map_or(true, |status| posting.status == status))
            .cloned()
            .collect())
    }

    fn candidate_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<CandidateProfile>, RepositoryError> {
        Ok(self.profiles.get(user_id).cloned())
    }

    fn weight_preference(&self, user_id: &UserId) -> Result<Option<WeightInput>, RepositoryError> {
        Ok(self.preferences.get(user_id).cloned())
    }
}

/// Offline stand-in for the language-model scorer: compares declared skills and years
/// of experience, then blends the category scores with the requested weights.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct HeuristicOracle;

fn skill_set(details: &Value, key: &str) -> Vec<String> {
    details
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|skill| !skill.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

struct SkillComparison {
    matched: Vec<String>,
    missing: Vec<String>,
    weak: Vec<String>,
    coverage: f64,
    experience: f64,
}

impl SkillComparison {
    fn new(request: &ScoringRequest<'_>) -> Self {
        let held: BTreeSet<String> = skill_set(&request.profile.details, "skills")
            .iter()
            .map(|skill| skill.to_lowercase())
            .collect();
        let required = skill_set(&request.posting.details, "skills");
        let nice_to_have = skill_set(&request.posting.details, "niceToHave");

        let (matched, missing): (Vec<String>, Vec<String>) = required
            .iter()
            .cloned()
            .partition(|skill| held.contains(&skill.to_lowercase()));
        let weak = nice_to_have
            .into_iter()
            .filter(|skill| !held.contains(&skill.to_lowercase()))
            .collect();

        let coverage = if required.is_empty() {
            1.0
        } else {
            matched.len() as f64 / required.len() as f64
        };

        let years = request
            .profile
            .details
            .get("yearsExperience")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let experience = match request.posting.details.get("minYears").and_then(Value::as_f64) {
            Some(minimum) if minimum > 0.0 => (years / minimum).min(1.0),
            _ => 0.7,
        };

        Self {
            matched,
            missing,
            weak,
            coverage,
            experience,
        }
    }
}

fn percent(ratio: f64) -> f64 {
    (ratio * 100.0).round()
}

fn blended(categories: [f64; 4], weights: Option<&WeightSet>) -> f64 {
    let factors = weights.map_or([1.0; 4], |weights| {
        [
            weights.skills(),
            weights.experience(),
            weights.education(),
            weights.requirements(),
        ]
    });
    let total: f64 = factors.iter().sum();
    let weighted: f64 = categories
        .iter()
        .zip(factors.iter())
        .map(|(score, factor)| score * factor)
        .sum();
    (weighted / total).round()
}

impl ScoringOracle for HeuristicOracle {
    fn score(&self, request: &ScoringRequest<'_>) -> Result<Value, OracleError> {
        let comparison = SkillComparison::new(request);
        let skills = percent(comparison.coverage);
        let experience = percent(comparison.experience);
        let education = if request.profile.details.get("education").is_some() {
            80.0
        } else {
            50.0
        };
        let requirements = percent((comparison.coverage + comparison.experience) / 2.0);

        let payload = match request.kind {
            AnalysisKind::JobMatch => json!({
                "overallScore": blended([skills, experience, education, requirements], request.weights),
                "categoryScores": {
                    "skills": skills,
                    "experience": experience,
                    "education": education,
                    "requirements": requirements,
                },
                "strengths": comparison
                    .matched
                    .iter()
                    .enumerate()
                    .map(|(index, skill)| {
                        let importance = if index == 0 { "high" } else { "medium" };
                        json!({
                            "description": format!("Hands-on {skill} experience"),
                            "importance": importance,
                        })
                    })
                    .collect::<Vec<_>>(),
                "gaps": comparison
                    .missing
                    .iter()
                    .map(|skill| json!({ "description": format!("No {skill} background"), "importance": "high" }))
                    .collect::<Vec<_>>(),
                "suggestions": comparison
                    .missing
                    .iter()
                    .map(|skill| format!("Show a project that uses {skill}"))
                    .collect::<Vec<_>>(),
                "matchedSkills": comparison.matched,
                "missingSkills": comparison.missing,
            }),
            AnalysisKind::SkillsGap => json!({
                "overallScore": percent(comparison.coverage * 0.8 + comparison.experience * 0.2),
                "missingSkills": comparison
                    .missing
                    .iter()
                    .map(|skill| json!({ "skill": skill, "importance": "high" }))
                    .collect::<Vec<_>>(),
                "weakSkills": comparison
                    .weak
                    .iter()
                    .map(|skill| json!({ "skill": skill, "importance": "low" }))
                    .collect::<Vec<_>>(),
                "recommendations": comparison
                    .missing
                    .iter()
                    .chain(comparison.weak.iter())
                    .map(|skill| format!("Build a small {skill} project"))
                    .collect::<Vec<_>>(),
            }),
            AnalysisKind::InterviewInsights => json!({
                "overallScore": percent((comparison.coverage + comparison.experience) / 2.0),
                "likelyQuestions": comparison
                    .missing
                    .iter()
                    .map(|skill| format!("How would you ramp up on {skill}?"))
                    .chain(std::iter::once(format!("Why {}?", request.posting.title)))
                    .collect::<Vec<_>>(),
                "talkingPoints": comparison
                    .matched
                    .iter()
                    .map(|skill| format!("Production work with {skill}"))
                    .collect::<Vec<_>>(),
            }),
        };

        Ok(payload)
    }
}

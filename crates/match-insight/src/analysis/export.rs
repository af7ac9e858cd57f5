use chrono::SecondsFormat;
use serde::Serialize;

use super::domain::{highest_ranked, AnalysisRecord, AnalysisResult, AnalysisTimeline, JobPosting};

const HEADER: [&str; 12] = [
    "job_id",
    "job_title",
    "company",
    "analysis_date",
    "overall_score",
    "skills_score",
    "experience_score",
    "education_score",
    "requirements_score",
    "top_strength",
    "top_gap",
    "weights",
];

/// One job and its full job-match history, newest first.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub posting: JobPosting,
    pub timeline: AnalysisTimeline,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush csv buffer: {0}")]
    Buffer(String),
    #[error("csv output is not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    job_id: &'a str,
    job_title: &'a str,
    company: &'a str,
    analysis_date: String,
    overall_score: u32,
    skills_score: Option<u32>,
    experience_score: Option<u32>,
    education_score: Option<u32>,
    requirements_score: Option<u32>,
    top_strength: &'a str,
    top_gap: &'a str,
    weights: String,
}

impl<'a> CsvRow<'a> {
    fn new(posting: &'a JobPosting, record: &'a AnalysisRecord) -> Self {
        let scores = record.result.category_scores().cloned().unwrap_or_default();
        let (top_strength, top_gap) = match &record.result {
            AnalysisResult::JobMatch(result) => (
                highest_ranked(&result.strengths).map(|insight| insight.description.as_str()),
                highest_ranked(&result.gaps).map(|insight| insight.description.as_str()),
            ),
            _ => (None, None),
        };

        Self {
            job_id: posting.id.as_str(),
            job_title: &posting.title,
            company: posting.company.as_deref().unwrap_or_default(),
            analysis_date: record
                .analysis_date
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            overall_score: record.result.overall_score(),
            skills_score: scores.skills,
            experience_score: scores.experience,
            education_score: scores.education,
            requirements_score: scores.requirements,
            top_strength: top_strength.unwrap_or_default(),
            top_gap: top_gap.unwrap_or_default(),
            weights: record
                .weights_used
                .as_ref()
                .map(|weights| weights.to_value().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Renders one row per stored record. The header is always written; fields that
/// contain delimiters, quotes, or newlines are quoted with inner quotes doubled.
pub fn render_csv(jobs: &[ExportJob]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for job in jobs {
        for record in job.timeline.iter() {
            writer.serialize(CsvRow::new(&job.posting, record))?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Buffer(err.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

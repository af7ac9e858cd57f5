use crate::infra::{HeuristicOracle, InMemoryAnalysisRepository, InMemoryWorkspace, SAMPLE_USER};
use clap::Args;
use match_insight::analysis::{
    AnalysisKind, AnalysisRequest, AnalysisServiceError, CandidateWorkspace, ComparisonQuery,
    MatchAnalysisService, UserId, WeightInput,
};
use match_insight::config::AnalysisConfig;
use match_insight::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

type DemoService = MatchAnalysisService<InMemoryAnalysisRepository, InMemoryWorkspace, HeuristicOracle>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// JSON workspace seed; defaults to the bundled sample workspace.
    #[arg(long)]
    pub(crate) workspace: Option<PathBuf>,
    /// User whose jobs are analysed.
    #[arg(long)]
    pub(crate) user: Option<String>,
    /// Skills weight override applied to every job-match request (0.1 - 3.0).
    #[arg(long)]
    pub(crate) skills_weight: Option<f64>,
    /// Only list jobs at or above this score in the comparison.
    #[arg(long)]
    pub(crate) min_score: Option<i64>,
    /// Write the CSV export to this path instead of stdout.
    #[arg(long)]
    pub(crate) export: Option<PathBuf>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        workspace,
        user,
        skills_weight,
        min_score,
        export,
    } = args;

    let workspace = match workspace {
        Some(path) => InMemoryWorkspace::from_path(&path)?,
        None => InMemoryWorkspace::sample(),
    };
    let user = user.unwrap_or_else(|| SAMPLE_USER.to_string());
    let job_ids: Vec<String> = match UserId::parse(&user) {
        Some(user_id) => workspace
            .jobs(&user_id, None)
            .map_err(AnalysisServiceError::from)?
            .into_iter()
            .map(|posting| posting.id.0)
            .collect(),
        None => Vec::new(),
    };

    let service: DemoService = MatchAnalysisService::new(
        Arc::new(InMemoryAnalysisRepository::default()),
        Arc::new(workspace),
        Arc::new(HeuristicOracle),
        &AnalysisConfig::default(),
    );

    println!("Match analysis demo for {user}");
    if job_ids.is_empty() {
        println!("No jobs tracked for this user.");
        return Ok(());
    }

    let weights = skills_weight.map(|skills| WeightInput {
        skills: Some(skills),
        ..WeightInput::default()
    });

    println!("\nJob match");
    for job_id in &job_ids {
        for kind in [AnalysisKind::JobMatch, AnalysisKind::SkillsGap] {
            let outcome = service.get_or_compute(AnalysisRequest {
                kind,
                job_id: job_id.clone(),
                user_id: user.clone(),
                weights: weights.clone(),
                force_refresh: false,
            })?;
            if kind == AnalysisKind::JobMatch {
                let weights = outcome
                    .weights_used
                    .as_ref()
                    .map(|weights| weights.to_value().to_string())
                    .unwrap_or_default();
                println!(
                    "- {}: {} ({}) weights {}",
                    job_id,
                    outcome.result.overall_score(),
                    if outcome.cached { "cached" } else { "computed" },
                    weights
                );
            }
        }
    }

    render_comparison(&service, &user, min_score)?;
    render_trends(&service, &user)?;

    let csv = service.export_csv(&user, &job_ids)?;
    match export {
        Some(path) => {
            std::fs::write(&path, csv)?;
            println!("\nExport written to {}", path.display());
        }
        None => {
            println!("\nExport");
            print!("{csv}");
        }
    }

    Ok(())
}

fn render_comparison(
    service: &DemoService,
    user: &str,
    min_score: Option<i64>,
) -> Result<(), AppError> {
    let rows = service.comparison(
        user,
        ComparisonQuery {
            min_score,
            ..ComparisonQuery::default()
        },
    )?;

    if rows.is_empty() {
        println!("\nComparison: no job meets the score threshold");
        return Ok(());
    }

    println!("\nComparison (best first)");
    for row in &rows {
        println!(
            "- {} | {} | {} | {} | {}",
            row.overall_score,
            row.job_id,
            row.title,
            row.company.as_deref().unwrap_or("-"),
            row.status.label()
        );
    }
    Ok(())
}

fn render_trends(service: &DemoService, user: &str) -> Result<(), AppError> {
    let trends = service.trends(user)?;

    println!(
        "\nSkill trends across {} jobs (average gap score {})",
        trends.total_jobs, trends.average_gap_score
    );
    if trends.common_missing_skills.is_empty() {
        println!("Missing skills: none");
    } else {
        println!("Most common missing skills:");
        for skill in &trends.common_missing_skills {
            println!("  - {} x{}", skill.skill, skill.occurrences);
        }
    }
    for skill in &trends.common_weak_skills {
        println!("  - weak: {} x{}", skill.skill, skill.occurrences);
    }
    Ok(())
}

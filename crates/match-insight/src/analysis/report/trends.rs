use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::super::domain::{AnalysisRecord, AnalysisResult, JobId, JobPosting, SkillGap};
use super::views::{SkillTrend, TrendJob, TrendView};

const TOP_SKILLS: usize = 10;

#[derive(Default)]
struct SkillTally {
    display: String,
    occurrences: usize,
    importance_levels: BTreeSet<String>,
}

#[derive(Default)]
struct SkillCounter {
    by_key: HashMap<String, SkillTally>,
}

impl SkillCounter {
    fn record(&mut self, gap: &SkillGap) {
        let name = gap.skill.trim();
        if name.is_empty() {
            return;
        }

        let tally = self
            .by_key
            .entry(name.to_lowercase())
            .or_insert_with(|| SkillTally {
                display: name.to_string(),
                ..SkillTally::default()
            });
        tally.occurrences += 1;
        if let Some(level) = gap.importance.as_deref().map(str::trim) {
            if !level.is_empty() {
                tally.importance_levels.insert(level.to_lowercase());
            }
        }
    }

    fn ranked(&self) -> Vec<SkillTrend> {
        let mut trends: Vec<SkillTrend> = self
            .by_key
            .values()
            .map(|tally| SkillTrend {
                skill: tally.display.clone(),
                occurrences: tally.occurrences,
                importance_levels: tally.importance_levels.iter().cloned().collect(),
            })
            .collect();
        trends.sort_by(|a, b| {
            b.occurrences
                .cmp(&a.occurrences)
                .then_with(|| a.skill.cmp(&b.skill))
        });
        trends
    }
}

/// Aggregates every skills-gap record of a user into skill frequencies.
///
/// Zero records produce the zero-valued view.
pub fn build_trends(records: &[AnalysisRecord], jobs: &HashMap<JobId, JobPosting>) -> TrendView {
    let mut missing = SkillCounter::default();
    let mut weak = SkillCounter::default();
    let mut frequency: BTreeMap<String, usize> = BTreeMap::new();
    let mut trend_jobs = Vec::new();
    let mut score_total: u64 = 0;
    let mut counted: u64 = 0;

    for record in records {
        let AnalysisResult::SkillsGap(gap) = &record.result else {
            continue;
        };

        for skill in &gap.missing_skills {
            missing.record(skill);
        }
        for skill in &gap.weak_skills {
            weak.record(skill);
        }
        for skill in gap.missing_skills.iter().chain(&gap.weak_skills) {
            let name = skill.skill.trim();
            if !name.is_empty() {
                *frequency.entry(name.to_lowercase()).or_default() += 1;
            }
        }

        score_total += u64::from(gap.overall_score);
        counted += 1;

        let job = jobs.get(&record.job_id);
        trend_jobs.push(TrendJob {
            job_id: record.job_id.clone(),
            title: job.map(|job| job.title.clone()),
            company: job.and_then(|job| job.company.clone()),
            gap_score: gap.overall_score,
            analysis_date: record.analysis_date,
        });
    }

    if counted == 0 {
        return TrendView::default();
    }

    let mut common_missing_skills = missing.ranked();
    common_missing_skills.truncate(TOP_SKILLS);
    let mut common_weak_skills = weak.ranked();
    common_weak_skills.truncate(TOP_SKILLS);
    trend_jobs.sort_by(|a, b| b.analysis_date.cmp(&a.analysis_date));

    TrendView {
        total_jobs: trend_jobs.len(),
        average_gap_score: (score_total as f64 / counted as f64).round() as u32,
        jobs: trend_jobs,
        common_missing_skills,
        common_weak_skills,
        skill_frequency: frequency,
    }
}

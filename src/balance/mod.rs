//! Monte-Carlo scene survey.
//!
//! Runs many seeded sessions per difficulty level and theme, searches every
//! container, and aggregates placement and escalation statistics. Answers
//! questions like "at which difficulty does ambient fill hit zero" and
//! "how often does placement fall back to random positions".
//! Uses rayon for parallel execution across CPU cores.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::sync::Arc;
use tracing::{debug, info};

use crate::areas::AreaRegistry;
use crate::catalog::Quotas;
use crate::error::ConfigError;
use crate::geometry::Rect;
use crate::logging::TimingSpan;
use crate::objects::ObjectCategory;
use crate::session::{EngineConfig, InteractionEvent, Session, SessionConfig};

/// Survey parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    pub runs_per_level: u64,
    pub max_difficulty: u32,
    pub base_seed: u64,
    pub themes: Vec<String>,
    pub bounds: Rect,
    pub exclusion_regions: Vec<Rect>,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            runs_per_level: 50,
            max_difficulty: 20,
            base_seed: 42,
            themes: vec!["park".into(), "docks".into(), "alley".into(), "manor".into()],
            bounds: Rect::new(0.0, 0.0, 1024.0, 768.0),
            exclusion_regions: Vec::new(),
        }
    }
}

/// Outcome of one simulated session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    pub theme: String,
    pub difficulty_level: u32,
    pub seed: u64,
    pub objects: usize,
    pub ambient: usize,
    pub clusters: usize,
    pub shortfalls: usize,
    pub violations: usize,
    /// Tension after searching every container once
    pub tension_after_search: f32,
    /// Incriminating objects found inside containers
    pub hidden_evidence: usize,
}

/// Aggregates for one difficulty level across all themes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelStats {
    pub difficulty_level: u32,
    pub runs: usize,
    pub ambient_quota: usize,
    pub avg_shortfalls: f32,
    pub max_shortfalls: usize,
    pub avg_violations: f32,
    pub avg_tension_after_search: f32,
    pub avg_hidden_evidence: f32,
    /// Fraction of placed objects that needed a fallback path
    pub shortfall_rate: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyReport {
    pub total_runs: u64,
    pub levels: Vec<LevelStats>,
    /// Lowest difficulty whose ambient quota is clamped to zero
    pub first_zero_ambient_difficulty: Option<u32>,
    pub overall_shortfall_rate: f32,
    pub grade: SurveyGrade,
}

/// Overall placement health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurveyGrade {
    Excellent, // shortfall rate < 0.5%
    Good,      // < 2%
    Fair,      // < 5%
    Poor,      // < 10%
    Critical,  // >= 10%
}

impl SurveyGrade {
    pub fn from_shortfall_rate(rate: f32) -> Self {
        if rate < 0.005 {
            Self::Excellent
        } else if rate < 0.02 {
            Self::Good
        } else if rate < 0.05 {
            Self::Fair
        } else if rate < 0.10 {
            Self::Poor
        } else {
            Self::Critical
        }
    }
}

/// Deterministic seed for one run
fn run_seed(base_seed: u64, theme: &str, difficulty_level: u32, index: u64) -> u64 {
    let mut hasher = Sha3_256::new();
    hasher.update(base_seed.to_le_bytes());
    hasher.update(theme.as_bytes());
    hasher.update(difficulty_level.to_le_bytes());
    hasher.update(index.to_le_bytes());
    let result = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&result[0..8]);
    u64::from_le_bytes(bytes)
}

/// Start a session, search every container, collect metrics
pub fn simulate_run(
    registry: &Arc<AreaRegistry>,
    config: SessionConfig,
    seed: u64,
) -> Result<RunMetrics, ConfigError> {
    let theme = config.theme.clone();
    let difficulty_level = config.difficulty_level;
    let mut session = Session::start(Arc::clone(registry), config, EngineConfig::with_seed(seed))?;

    let containers: Vec<_> = session
        .objects()
        .values()
        .filter(|o| o.is_container())
        .map(|o| o.id)
        .collect();
    let mut hidden_evidence = 0;
    for id in containers {
        if let Ok(outcome) = session.handle(InteractionEvent::ContainerOpened(id)) {
            hidden_evidence += outcome
                .contents
                .map(|c| c.iter().filter(|o| o.is_incriminating()).count())
                .unwrap_or(0);
        }
    }

    let objects = session.objects();
    let report = session.report();
    Ok(RunMetrics {
        theme,
        difficulty_level,
        seed,
        objects: objects.len(),
        ambient: objects
            .values()
            .filter(|o| o.category() == ObjectCategory::Ambient)
            .count(),
        clusters: session.composer().clusters().len(),
        shortfalls: report.shortfalls.len(),
        violations: report.violations.len(),
        tension_after_search: session.snapshot().tension,
        hidden_evidence,
    })
}

/// Run the survey with rayon parallelism
pub fn run_survey(
    registry: &Arc<AreaRegistry>,
    config: &SurveyConfig,
) -> Result<SurveyReport, ConfigError> {
    for theme in &config.themes {
        registry.rules(theme)?;
    }
    let _timing = TimingSpan::new("balance_survey");

    let jobs: Vec<(String, u32, u64)> = config
        .themes
        .iter()
        .flat_map(|theme| {
            (0..=config.max_difficulty).flat_map(move |level| {
                (0..config.runs_per_level).map(move |i| (theme.clone(), level, i))
            })
        })
        .collect();

    let results: Vec<RunMetrics> = jobs
        .par_iter()
        .map(|(theme, level, i)| {
            let session_config = SessionConfig {
                difficulty_level: *level,
                theme: theme.clone(),
                bounds: config.bounds,
                exclusion_regions: config.exclusion_regions.clone(),
            };
            simulate_run(
                registry,
                session_config,
                run_seed(config.base_seed, theme, *level, *i),
            )
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    let report = analyze_results(&results, config.max_difficulty);
    info!(
        runs = report.total_runs,
        shortfall_rate = report.overall_shortfall_rate,
        grade = ?report.grade,
        "survey finished"
    );
    Ok(report)
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f32
    }
}

fn analyze_results(results: &[RunMetrics], max_difficulty: u32) -> SurveyReport {
    let levels: Vec<LevelStats> = (0..=max_difficulty)
        .map(|level| {
            let runs: Vec<&RunMetrics> = results
                .iter()
                .filter(|r| r.difficulty_level == level)
                .collect();
            let placed: usize = runs.iter().map(|r| r.objects).sum();
            let shortfalls: usize = runs.iter().map(|r| r.shortfalls).sum();
            let stats = LevelStats {
                difficulty_level: level,
                runs: runs.len(),
                ambient_quota: Quotas::for_difficulty(level).ambient,
                avg_shortfalls: mean(runs.iter().map(|r| r.shortfalls as f32)),
                max_shortfalls: runs.iter().map(|r| r.shortfalls).max().unwrap_or(0),
                avg_violations: mean(runs.iter().map(|r| r.violations as f32)),
                avg_tension_after_search: mean(runs.iter().map(|r| r.tension_after_search)),
                avg_hidden_evidence: mean(runs.iter().map(|r| r.hidden_evidence as f32)),
                shortfall_rate: if placed == 0 {
                    0.0
                } else {
                    shortfalls as f32 / placed as f32
                },
            };
            debug!(level, shortfall_rate = stats.shortfall_rate, "level surveyed");
            stats
        })
        .collect();

    let first_zero_ambient_difficulty = (0..=max_difficulty)
        .find(|level| Quotas::for_difficulty(*level).ambient == 0);

    let placed: usize = results.iter().map(|r| r.objects).sum();
    let shortfalls: usize = results.iter().map(|r| r.shortfalls).sum();
    let overall_shortfall_rate = if placed == 0 {
        0.0
    } else {
        shortfalls as f32 / placed as f32
    };

    SurveyReport {
        total_runs: results.len() as u64,
        levels,
        first_zero_ambient_difficulty,
        overall_shortfall_rate,
        grade: SurveyGrade::from_shortfall_rate(overall_shortfall_rate),
    }
}

//! noir-demo: run a seeded session headlessly and print a JSON summary.
//!
//!   noir-demo [--seed N] [--difficulty N] [--theme NAME] [--seconds N]
//!             [--config session.json] [--registry areas.json]
//!             [--survey RUNS] [-v|-vv|-vvv]

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use noir_core::balance::{run_survey, SurveyConfig};
use noir_core::logging::{init_tracing, LogLevel, TracingConfig};
use noir_core::scene::PlacementUpdate;
use noir_core::threat::AntagonistAction;
use noir_core::{AreaRegistry, EngineConfig, InteractionEvent, Session, SessionConfig};

const FRAME_DT: f32 = 1.0 / 60.0;

/// Seconds between antagonist polls
const ACTION_INTERVAL: f32 = 5.0;

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match parse_str_arg(args, flag) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid value for {}: {} ({})", flag, raw, e)),
        None => Ok(None),
    }
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn verbosity(args: &[String]) -> u8 {
    args.iter()
        .filter(|a| a.starts_with("-v") && a[1..].chars().all(|c| c == 'v'))
        .map(|a| (a.len() - 1) as u8)
        .sum()
}

#[derive(Serialize)]
struct DemoReport {
    summary: noir_core::session::SessionSummary,
    placement_updates: usize,
    placed_objects: usize,
    actions: Vec<AntagonistAction>,
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    init_tracing(&TracingConfig::with_level(LogLevel::from_verbosity(verbosity(&args))));

    let registry = match parse_str_arg(&args, "--registry") {
        Some(path) => Arc::new(
            AreaRegistry::from_file(Path::new(&path))
                .with_context(|| format!("loading area registry from {}", path))?,
        ),
        None => AreaRegistry::builtin(),
    };

    if let Some(runs) = parse_arg::<u64>(&args, "--survey")? {
        let config = SurveyConfig {
            runs_per_level: runs,
            base_seed: parse_arg(&args, "--seed")?.unwrap_or(42),
            ..SurveyConfig::default()
        };
        let report = run_survey(&registry, &config).context("running survey")?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading session config {}", path))?;
            SessionConfig::from_json_str(&json)
                .with_context(|| format!("parsing session config {}", path))?
        }
        None => SessionConfig::default(),
    };
    if let Some(difficulty) = parse_arg(&args, "--difficulty")? {
        config.difficulty_level = difficulty;
    }
    if let Some(theme) = parse_str_arg(&args, "--theme") {
        config.theme = theme;
    }
    let seconds: f32 = parse_arg(&args, "--seconds")?.unwrap_or(60.0);
    if !(seconds.is_finite() && seconds >= 0.0) {
        bail!("--seconds must be a non-negative number");
    }
    let engine = EngineConfig::with_seed(parse_arg(&args, "--seed")?.unwrap_or(42));

    let mut session = Session::start(registry, config, engine).context("starting session")?;
    let mut updates: Vec<PlacementUpdate> = session.drain_placement_updates();

    // Scripted playthrough: sweep the containers, look at the evidence,
    // sprint for the first third of the run
    let containers: Vec<_> = session
        .objects()
        .values()
        .filter(|o| o.is_container())
        .map(|o| o.id)
        .collect();
    for id in containers {
        session.handle(InteractionEvent::ContainerOpened(id))?;
    }
    let evidence: Vec<_> = session
        .objects()
        .values()
        .filter(|o| o.is_incriminating())
        .map(|o| o.id)
        .collect();
    for id in evidence {
        session.handle(InteractionEvent::ObjectInspected(id))?;
    }
    session.handle(InteractionEvent::SprintStarted)?;

    let reference = session.config().bounds.center();
    let mut actions = Vec::new();
    let mut elapsed = 0.0;
    let mut next_poll = 0.0;
    while elapsed < seconds {
        session.advance(FRAME_DT);
        elapsed += FRAME_DT;
        if elapsed >= seconds / 3.0 && session.threat().is_sprinting() {
            session.handle(InteractionEvent::SprintStopped)?;
        }
        if elapsed >= next_poll {
            actions.push(session.next_action(reference));
            next_poll += ACTION_INTERVAL;
        }
    }
    updates.extend(session.drain_placement_updates());

    let report = DemoReport {
        summary: session.summary(),
        placement_updates: updates.len(),
        placed_objects: updates.iter().map(|u| u.placements.len()).sum(),
        actions,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

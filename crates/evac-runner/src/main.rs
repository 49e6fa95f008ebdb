//! Entry point for the evacuation simulation runner.
//!
//! Loads the building and the simulation YAML, spawns the civilian
//! population, and runs the tick loop. Each agent's decisions come from an
//! external reasoning service reached over HTTP.
//!
//! # Architecture
//!
//! ```text
//! Observation --> Prompt Engine --> LLM Backend --> Parser --> Resolver --> Movement
//! ```
//!
//! If the service fails, times out, or answers off-schema, the agent stays
//! still for that cycle; the run never stops over one agent's decision.

mod agent_log;
mod cognition;
mod config;
mod cost;
mod error;
mod llm;
mod movement;
mod parse;
mod prompt;
mod simulation;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use evac_core::config::SimulationConfig;
use evac_world::{InterestPointIndex, MapDocument, RegionGraph, office_building};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::RunnerConfig;
use crate::llm::create_backend;
use crate::prompt::PromptEngine;
use crate::simulation::Simulation;

/// Application entry point.
///
/// Initializes logging, loads configuration from the environment and the
/// simulation YAML, builds the reasoning backend and prompt templates,
/// then runs one simulation to completion.
///
/// # Errors
///
/// Returns an error if any setup step fails or a run artifact cannot be
/// written.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("evac-runner starting");

    // Load configuration from environment
    let runner_config = RunnerConfig::from_env().context("failed to load runner configuration")?;
    info!(
        config_path = %runner_config.config_path.display(),
        decision_timeout_ms = runner_config.decision_timeout.as_millis(),
        "runner configuration loaded"
    );

    let sim_config = load_sim_config(&runner_config.config_path)?;
    info!(
        seed = sim_config.simulation.random_seed,
        population = sim_config.agents.population,
        duration_secs = sim_config.simulation.duration_secs,
        enforcement_mode = ?sim_config.allocation.enforcement_mode,
        "simulation configuration loaded"
    );

    let (graph, points) = load_building(runner_config.map_file.as_deref())?;
    info!(regions = graph.len(), interest_points = points.len(), "building loaded");

    // Load prompt templates
    let engine = PromptEngine::new(runner_config.templates_dir.as_deref())
        .context("failed to load prompt templates")?;

    // Create the reasoning backend
    let backend = create_backend(&runner_config.backend);
    info!(
        backend = backend.name(),
        model = runner_config.backend.model,
        "reasoning backend configured"
    );

    let simulation = Simulation::new(
        sim_config,
        graph,
        points,
        Arc::new(backend),
        engine,
        runner_config.decision_timeout,
    )
    .context("simulation setup failed")?;

    let summary = simulation.run().await.context("simulation run failed")?;
    info!(
        escaped = summary.escaped,
        dead = summary.dead,
        alive = summary.alive,
        run_dir = ?summary.run_dir,
        "evac-runner shutdown complete"
    );
    info!("{}", summary.usage);

    Ok(())
}

/// Load the simulation YAML, falling back to defaults when the file does
/// not exist.
fn load_sim_config(path: &Path) -> anyhow::Result<SimulationConfig> {
    if path.exists() {
        SimulationConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))
    } else {
        info!(path = %path.display(), "config file not found, using defaults");
        Ok(SimulationConfig::default())
    }
}

/// Load the map document at `map_file`, or the built-in office building.
fn load_building(map_file: Option<&Path>) -> anyhow::Result<(RegionGraph, InterestPointIndex)> {
    match map_file {
        Some(path) => MapDocument::from_file(path)
            .and_then(MapDocument::into_world)
            .with_context(|| format!("failed to load map {}", path.display())),
        None => office_building().context("failed to build the office building"),
    }
}

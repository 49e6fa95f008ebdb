//! Configuration loading and typed config structures for the evacuation
//! simulation.
//!
//! The canonical configuration lives in `evac-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads the file. Every field has a
//! default, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};

use evac_world::HideSpotSelection;
use serde::{Deserialize, Serialize};

use crate::allocator::{EnforcementMode, RoundingPolicy};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `evac-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Run timing, threat schedule, and seed.
    #[serde(default)]
    pub simulation: ScenarioConfig,

    /// Population and per-agent physical parameters.
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Which observation fields are built and their radii.
    #[serde(default)]
    pub observation: ObservationConfig,

    /// Trait and behavior allocation.
    #[serde(default)]
    pub allocation: AllocationConfig,

    /// Prompt and sampling settings.
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Run artifact output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }
}

/// Run-level scenario settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Seed for every random stream in the run.
    #[serde(default = "default_seed")]
    pub random_seed: u64,

    /// Simulated seconds before the run ends.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: f64,

    /// Simulated milliseconds per tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Simulated seconds before the first shot.
    #[serde(default = "default_shooting_start_secs")]
    pub shooting_start_secs: f64,

    /// Region key where the shooter stands.
    #[serde(default = "default_shooter_region")]
    pub shooter_region: String,

    /// Simulated seconds between shots once shooting has started.
    #[serde(default = "default_shot_interval_secs")]
    pub shot_interval_secs: f64,

    /// Dwell time after a stay-still decision.
    #[serde(default = "default_stay_still_cooldown_ms")]
    pub stay_still_cooldown_ms: u64,

    /// Simulated seconds between trajectory samples.
    #[serde(default = "default_position_log_interval_secs")]
    pub position_log_interval_secs: f64,

    /// Built-in map to load when no map file is given.
    #[serde(default = "default_building_kind")]
    pub building_kind: String,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            random_seed: default_seed(),
            duration_secs: default_duration_secs(),
            tick_interval_ms: default_tick_interval_ms(),
            shooting_start_secs: default_shooting_start_secs(),
            shooter_region: default_shooter_region(),
            shot_interval_secs: default_shot_interval_secs(),
            stay_still_cooldown_ms: default_stay_still_cooldown_ms(),
            position_log_interval_secs: default_position_log_interval_secs(),
            building_kind: default_building_kind(),
        }
    }
}

/// Population and per-agent parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Number of civilian agents.
    #[serde(default = "default_population")]
    pub population: u32,

    /// Upper bound of the random starting health.
    #[serde(default = "default_health")]
    pub default_health: u32,

    /// Walking speed in meters per second.
    #[serde(default = "default_walk_speed")]
    pub walk_speed: f64,

    /// Sprinting speed in meters per second.
    #[serde(default = "default_sprint_speed")]
    pub sprint_speed: f64,

    /// Seconds before a movement target is abandoned.
    #[serde(default = "default_target_reach_timeout_secs")]
    pub target_reach_timeout_secs: f64,

    /// Distance at which a movement target counts as reached.
    #[serde(default = "default_target_reach_threshold")]
    pub target_reach_threshold: f64,

    /// Prior user/assistant turn pairs kept in the reasoning context.
    #[serde(default = "default_conversation_turn_limit")]
    pub conversation_turn_limit: usize,

    /// Optional custom persona catalog.
    #[serde(default)]
    pub persona_catalog: Option<PathBuf>,

    /// Merge only the personality fields of the custom catalog.
    #[serde(default = "default_true")]
    pub personality_fields_only: bool,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            population: default_population(),
            default_health: default_health(),
            walk_speed: default_walk_speed(),
            sprint_speed: default_sprint_speed(),
            target_reach_timeout_secs: default_target_reach_timeout_secs(),
            target_reach_threshold: default_target_reach_threshold(),
            conversation_turn_limit: default_conversation_turn_limit(),
            persona_catalog: None,
            personality_fields_only: true,
        }
    }
}

/// Observation field toggles and query radii.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationConfig {
    /// Include the agent's mood.
    #[serde(default = "default_true")]
    pub include_mood: bool,

    /// Include the agent's movement state.
    #[serde(default = "default_true")]
    pub include_movement_state: bool,

    /// Include the shooter descriptor.
    #[serde(default = "default_true")]
    pub include_shooter_info: bool,

    /// Include the current region.
    #[serde(default = "default_true")]
    pub include_location: bool,

    /// Include nearby people.
    #[serde(default = "default_true")]
    pub include_surrounding_people: bool,

    /// Include neighboring regions.
    #[serde(default = "default_true")]
    pub include_neighbor_regions: bool,

    /// Include hiding spots and exits.
    #[serde(default = "default_true")]
    pub include_interest_points: bool,

    /// Include recent nearby dialogue.
    #[serde(default = "default_true")]
    pub include_conversation: bool,

    /// Include pending events.
    #[serde(default = "default_true")]
    pub include_pending_events: bool,

    /// Radius for nearby people.
    #[serde(default = "default_radius")]
    pub nearby_people_radius: f64,

    /// Maximum dialogue lines reported.
    #[serde(default = "default_conversation_limit")]
    pub conversation_limit: usize,

    /// Radius for nearby dialogue.
    #[serde(default = "default_radius")]
    pub dialog_radius: f64,

    /// Recency window for nearby dialogue, in seconds.
    #[serde(default = "default_dialog_time_window_secs")]
    pub dialog_time_window_secs: f64,

    /// Maximum hiding spots reported.
    #[serde(default = "default_hide_spot_limit")]
    pub hide_spot_limit: usize,

    /// How hiding spots are picked.
    #[serde(default)]
    pub hide_spot_selection: HideSpotSelection,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            include_mood: true,
            include_movement_state: true,
            include_shooter_info: true,
            include_location: true,
            include_surrounding_people: true,
            include_neighbor_regions: true,
            include_interest_points: true,
            include_conversation: true,
            include_pending_events: true,
            nearby_people_radius: default_radius(),
            conversation_limit: default_conversation_limit(),
            dialog_radius: default_radius(),
            dialog_time_window_secs: default_dialog_time_window_secs(),
            hide_spot_limit: default_hide_spot_limit(),
            hide_spot_selection: HideSpotSelection::default(),
        }
    }
}

/// Allocation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Which allocator pool drives agent settings.
    #[serde(default)]
    pub enforcement_mode: EnforcementMode,

    /// How fractional counts are rounded.
    #[serde(default)]
    pub rounding: RoundingPolicy,

    /// Replacement weights for the twelve trait profiles.
    #[serde(default)]
    pub trait_weights: Option<Vec<f64>>,

    /// Replacement weights for the six behavior archetypes.
    #[serde(default)]
    pub behavior_weights: Option<Vec<f64>>,
}

/// Verbosity of the training handbook shown to trained agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandbookTier {
    /// The complete handbook.
    Full,
    /// A condensed handbook.
    #[default]
    Short,
    /// A few lines.
    Mini,
}

/// Prompt and sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Handbook verbosity.
    #[serde(default)]
    pub handbook_tier: HandbookTier,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f64,

    /// Determinism seed sent with every request.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            handbook_tier: HandbookTier::default(),
            temperature: 0.0,
            seed: default_seed(),
        }
    }
}

/// Run artifact output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write run artifacts at the end of the run.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Parent directory for run folders.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: default_output_dir(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

const fn default_seed() -> u64 {
    42
}

const fn default_duration_secs() -> f64 {
    60.0
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_shooting_start_secs() -> f64 {
    5.0
}

fn default_shooter_region() -> String {
    "hallway2".to_owned()
}

const fn default_shot_interval_secs() -> f64 {
    1.0
}

const fn default_stay_still_cooldown_ms() -> u64 {
    5000
}

const fn default_position_log_interval_secs() -> f64 {
    0.5
}

fn default_building_kind() -> String {
    "office".to_owned()
}

const fn default_population() -> u32 {
    12
}

const fn default_health() -> u32 {
    3
}

const fn default_walk_speed() -> f64 {
    2.5
}

const fn default_sprint_speed() -> f64 {
    5.0
}

const fn default_target_reach_timeout_secs() -> f64 {
    10.0
}

const fn default_target_reach_threshold() -> f64 {
    0.5
}

const fn default_conversation_turn_limit() -> usize {
    3
}

const fn default_radius() -> f64 {
    3.0
}

const fn default_conversation_limit() -> usize {
    5
}

const fn default_dialog_time_window_secs() -> f64 {
    3.0
}

const fn default_hide_spot_limit() -> usize {
    3
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("runs")
}

const fn default_true() -> bool {
    true
}

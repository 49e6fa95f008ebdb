//! Error types for the simulation runner.
//!
//! Uses `thiserror` for typed errors that surface through the runner
//! pipeline: reasoning-service calls, prompt rendering, response parsing,
//! run setup, and writing run artifacts.

use evac_core::allocator::AllocatorError;
use evac_core::decision::ReasoningError;
use evac_core::personas::PersonaError;
use evac_core::state::ClockError;
use evac_world::WorldError;

/// Errors that can occur during runner operation.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A reasoning backend returned an error or was unreachable.
    #[error("reasoning backend error: {0}")]
    Reasoning(#[from] ReasoningError),

    /// Failed to render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// The reasoning reply could not be parsed into a decision.
    #[error("response parse error: {0}")]
    Parse(String),

    /// The decision deadline was exceeded.
    #[error("timeout: decision exceeded {deadline_ms}ms deadline")]
    Timeout {
        /// The deadline in milliseconds.
        deadline_ms: u64,
    },

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The building model could not be built or loaded.
    #[error("world error: {0}")]
    World(#[from] WorldError),

    /// Trait or behavior allocation failed.
    #[error("allocation error: {0}")]
    Allocation(#[from] AllocatorError),

    /// The persona catalog could not be loaded.
    #[error("persona error: {0}")]
    Persona(#[from] PersonaError),

    /// The simulation clock ran out of range.
    #[error("clock error: {0}")]
    Clock(#[from] ClockError),

    /// Writing a run artifact failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

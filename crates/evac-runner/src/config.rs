//! Configuration types for the simulation runner.
//!
//! Runner configuration is loaded from environment variables: which
//! reasoning backend to call (with its URL, API key, and model name), the
//! decision deadline, and where the simulation YAML, prompt templates,
//! and map document live. Simulation parameters themselves come from the
//! YAML file (see [`evac_core::config`]).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::RunnerError;

/// Default decision deadline in milliseconds.
const DEFAULT_DECISION_TIMEOUT_MS: u64 = 7000;

/// Default simulation configuration file.
const DEFAULT_CONFIG_PATH: &str = "evac-config.yaml";

/// Complete runner configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Reasoning backend configuration.
    pub backend: LlmBackendConfig,
    /// Maximum time allowed for one decision (call plus parsing).
    pub decision_timeout: Duration,
    /// Path to the simulation YAML file.
    pub config_path: PathBuf,
    /// Directory overriding the built-in prompt templates.
    pub templates_dir: Option<PathBuf>,
    /// Map document replacing the built-in office building.
    pub map_file: Option<PathBuf>,
}

/// Configuration for a single reasoning backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier (e.g. `gpt-4o-mini`).
    pub model: String,
}

/// Supported backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible chat completions (`OpenAI`, `OpenRouter`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
}

impl BackendType {
    /// Parse a backend label as found in `LLM_BACKEND`.
    pub fn parse(label: &str) -> Result<Self, RunnerError> {
        match label.to_lowercase().as_str() {
            "openai" | "openrouter" | "deepseek" | "ollama" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(RunnerError::Config(format!("unknown backend type: {other}"))),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `LLM_BACKEND` -- backend type (`openai`, `openrouter`, `anthropic`, ...)
    /// - `LLM_API_URL` -- API base URL
    /// - `LLM_API_KEY` -- API key
    /// - `LLM_MODEL` -- model name
    ///
    /// Optional variables:
    /// - `DECISION_TIMEOUT_MS` -- decision deadline in milliseconds (default 7000)
    /// - `EVAC_CONFIG` -- simulation YAML path (default `evac-config.yaml`)
    /// - `TEMPLATES_DIR` -- directory with `system.j2` and `user.j2` overrides
    /// - `MAP_FILE` -- `map_data.json`-shaped building document
    pub fn from_env() -> Result<Self, RunnerError> {
        let backend = LlmBackendConfig {
            backend_type: BackendType::parse(&env_var("LLM_BACKEND")?)?,
            api_url: env_var("LLM_API_URL")?,
            api_key: env_var("LLM_API_KEY")?,
            model: env_var("LLM_MODEL")?,
        };

        let decision_timeout_ms = parse_timeout_ms(std::env::var("DECISION_TIMEOUT_MS").ok())?;

        let config_path = std::env::var("EVAC_CONFIG")
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        let templates_dir = std::env::var("TEMPLATES_DIR").ok().map(PathBuf::from);
        let map_file = std::env::var("MAP_FILE").ok().map(PathBuf::from);

        Ok(Self {
            backend,
            decision_timeout: Duration::from_millis(decision_timeout_ms),
            config_path,
            templates_dir,
            map_file,
        })
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, RunnerError> {
    std::env::var(name)
        .map_err(|e| RunnerError::Config(format!("missing required env var {name}: {e}")))
}

/// Decision deadline from an optional `DECISION_TIMEOUT_MS` value.
fn parse_timeout_ms(raw: Option<String>) -> Result<u64, RunnerError> {
    raw.map_or(Ok(DEFAULT_DECISION_TIMEOUT_MS), |value| {
        value
            .trim()
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid DECISION_TIMEOUT_MS: {e}")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_type_parsing() {
        assert_eq!(BackendType::parse("OpenAI").ok(), Some(BackendType::OpenAi));
        assert_eq!(BackendType::parse("openrouter").ok(), Some(BackendType::OpenAi));
        assert_eq!(BackendType::parse("claude").ok(), Some(BackendType::Anthropic));
        assert!(matches!(
            BackendType::parse("carrier-pigeon"),
            Err(RunnerError::Config(_))
        ));
    }

    #[test]
    fn timeout_defaults_and_parses() {
        assert_eq!(parse_timeout_ms(None).ok(), Some(7000));
        assert_eq!(parse_timeout_ms(Some(" 2500 ".to_owned())).ok(), Some(2500));
        assert!(parse_timeout_ms(Some("soon".to_owned())).is_err());
    }
}

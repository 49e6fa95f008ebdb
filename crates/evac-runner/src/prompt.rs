//! Prompt template loading and rendering via `minijinja`.
//!
//! The system and user templates ship inside the binary. A templates
//! directory (`TEMPLATES_DIR`) overrides them so operators can tune agent
//! behavior without recompiling. The handbook shown to trained agents is
//! selected by [`HandbookTier`].

use std::path::Path;

use evac_core::config::HandbookTier;
use minijinja::Environment;
use serde::Serialize;

use crate::error::RunnerError;

/// Built-in system prompt template.
const SYSTEM_TEMPLATE: &str = include_str!("../../../templates/system.j2");

/// Built-in user prompt template.
const USER_TEMPLATE: &str = include_str!("../../../templates/user.j2");

const HANDBOOK_FULL: &str = include_str!("../../../templates/handbook_full.md");
const HANDBOOK_SHORT: &str = include_str!("../../../templates/handbook_short.md");
const HANDBOOK_MINI: &str = include_str!("../../../templates/handbook_mini.md");

/// Handbook text for a verbosity tier.
pub const fn handbook_text(tier: HandbookTier) -> &'static str {
    match tier {
        HandbookTier::Full => HANDBOOK_FULL,
        HandbookTier::Short => HANDBOOK_SHORT,
        HandbookTier::Mini => HANDBOOK_MINI,
    }
}

/// Values the system template is rendered with.
///
/// The gating flags decide which rule blocks appear. The familiarity rule
/// follows `familiar` alone; threat rules, the training rule, the handbook,
/// the behavior instruction, and the building map only show once the agent
/// knows about the shooter.
#[derive(Debug, Clone, Serialize)]
pub struct SystemPromptContext<'a> {
    /// Building phrase for the environment rule, e.g. `an office building`.
    pub building: &'a str,
    /// Shooting has started and the agent perceives it.
    pub observes_shooter: bool,
    /// High training level.
    pub well_trained: bool,
    /// High familiarity level.
    pub familiar: bool,
    /// Forced behavior instruction, if any.
    pub behavior_instruction: Option<&'a str>,
    /// Handbook text at the configured tier.
    pub handbook: &'a str,
    /// Route summary from the agent's position, for familiar agents.
    pub building_map: Option<String>,
}

#[derive(Serialize)]
struct UserPromptContext<'a> {
    persona: &'a str,
    memory: &'a str,
    observation: &'a str,
}

/// Manages prompt template loading and rendering.
///
/// Wraps a `minijinja` [`Environment`] with both prompt templates
/// pre-loaded.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Create a prompt engine.
    ///
    /// With `templates_dir`, `system.j2` and `user.j2` are read from that
    /// directory and both must exist. Without it the built-in templates are
    /// used.
    pub fn new(templates_dir: Option<&Path>) -> Result<Self, RunnerError> {
        let (system_tpl, user_tpl) = match templates_dir {
            Some(dir) => (
                load_template(dir, "system.j2")?,
                load_template(dir, "user.j2")?,
            ),
            None => (SYSTEM_TEMPLATE.to_owned(), USER_TEMPLATE.to_owned()),
        };

        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        env.add_template_owned("system", system_tpl)
            .map_err(|e| RunnerError::Template(format!("failed to add system template: {e}")))?;
        env.add_template_owned("user", user_tpl)
            .map_err(|e| RunnerError::Template(format!("failed to add user template: {e}")))?;

        Ok(Self { env })
    }

    /// Render the system prompt.
    pub fn render_system(&self, context: &SystemPromptContext<'_>) -> Result<String, RunnerError> {
        self.env
            .get_template("system")
            .map_err(|e| RunnerError::Template(format!("missing system template: {e}")))?
            .render(context)
            .map_err(|e| RunnerError::Template(format!("system render failed: {e}")))
    }

    /// Render the user prompt from the persona, memory, and observation
    /// markdown.
    pub fn render_user(
        &self,
        persona: &str,
        memory: &str,
        observation: &str,
    ) -> Result<String, RunnerError> {
        self.env
            .get_template("user")
            .map_err(|e| RunnerError::Template(format!("missing user template: {e}")))?
            .render(UserPromptContext {
                persona,
                memory,
                observation,
            })
            .map_err(|e| RunnerError::Template(format!("user render failed: {e}")))
    }
}

/// Read a template file from disk.
fn load_template(dir: &Path, filename: &str) -> Result<String, RunnerError> {
    let path = dir.join(filename);
    std::fs::read_to_string(&path)
        .map_err(|e| RunnerError::Template(format!("failed to read {}: {e}", path.display())))
}

//! Character profiles that condition an agent's prompts.
//!
//! Every persona field is free text. None of them is ever parsed; they are
//! rendered into the user prompt and written to the per-agent log.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A civilian's identity and personality.
///
/// The first five fields are identity and demographics. The remaining six
/// are the personality fields that a custom catalog may override.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Persona {
    /// Full display name, unique within a catalog.
    pub name: String,
    /// Job title or role in the building.
    pub role: String,
    /// Age as written in the catalog.
    pub age: String,
    /// Gender as written in the catalog.
    pub gender: String,
    /// Preferred pronouns.
    pub pronouns: String,
    /// Comma-separated personality traits.
    #[serde(default)]
    pub personality_traits: String,
    /// Typical emotional disposition.
    #[serde(default)]
    pub emotional_disposition: String,
    /// Motivations and goals.
    #[serde(default)]
    pub motivations_goals: String,
    /// How this person talks.
    #[serde(default)]
    pub communication_style: String,
    /// What this person knows about.
    #[serde(default)]
    pub knowledge_scope: String,
    /// Short life story.
    #[serde(default)]
    pub backstory: String,
}

impl Persona {
    /// Identifier other agents use to target this person: the name in
    /// lowercase with spaces replaced by underscores.
    pub fn person_id(&self) -> String {
        person_id_for(&self.name)
    }

    /// Copy the six personality fields from `other`, keeping identity.
    pub fn adopt_personality(&mut self, other: &Self) {
        self.personality_traits.clone_from(&other.personality_traits);
        self.emotional_disposition.clone_from(&other.emotional_disposition);
        self.motivations_goals.clone_from(&other.motivations_goals);
        self.communication_style.clone_from(&other.communication_style);
        self.knowledge_scope.clone_from(&other.knowledge_scope);
        self.backstory.clone_from(&other.backstory);
    }

    /// Render the profile as the markdown block used in the user prompt.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Character Profile");
        let _ = writeln!(out, "**Name:** {}", self.name);
        let _ = writeln!(out, "**Role:** {}", self.role);
        let _ = writeln!(out, "**Age:** {}", self.age);
        let _ = writeln!(out, "**Gender:** {}", self.gender);
        let _ = writeln!(out, "**Pronouns:** {}", self.pronouns);

        let _ = writeln!(out, "\n## Personality");
        let _ = writeln!(out, "**Traits:** {}", self.personality_traits);
        let _ = writeln!(out, "**Emotional Disposition:** {}", self.emotional_disposition);
        let _ = writeln!(out, "**Motivations & Goals:** {}", self.motivations_goals);

        let _ = writeln!(out, "\n## Communication");
        let _ = writeln!(out, "**Style:** {}", self.communication_style);
        let _ = writeln!(out, "**Knowledge:** {}", self.knowledge_scope);

        let _ = writeln!(out, "\n## Background");
        let _ = writeln!(out, "{}", self.backstory);
        out
    }
}

/// Convert a display name into a person identifier.
pub fn person_id_for(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Convert a person identifier back into a display name by capitalizing
/// each underscore-separated part.
pub fn name_from_person_id(person_id: &str) -> String {
    person_id
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

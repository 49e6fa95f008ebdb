//! Enumeration types for the evacuation simulation.
//!
//! Trait levels and statuses serialize with their variant names
//! (`"High"`, `"Injured"`), matching the per-agent log format. Values the
//! reasoning service reads or writes (`movement`, `vocal_mode`) serialize in
//! `snake_case`, matching the response schema.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Trait levels
// ---------------------------------------------------------------------------

/// How well an agent is trained for an active-shooter situation.
///
/// Trained agents receive the response handbook in their system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TrainingLevel {
    /// Trained; receives the handbook.
    High,
    /// Untrained.
    Low,
}

/// How familiar an agent is with the building layout.
///
/// Familiar agents receive the building map with exit routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum FamiliarityLevel {
    /// Knows the building; receives the map.
    High,
    /// Does not know the building.
    Low,
}

/// How clearly an agent perceives the shooter once shooting has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ShooterPerceptionLevel {
    /// Never learns that there is a threat.
    Unaware,
    /// Perceives the threat without full detail.
    Vague,
    /// Perceives the threat directly.
    Direct,
}

impl core::fmt::Display for TrainingLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::High => "High",
            Self::Low => "Low",
        })
    }
}

impl core::fmt::Display for FamiliarityLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::High => "High",
            Self::Low => "Low",
        })
    }
}

impl core::fmt::Display for ShooterPerceptionLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Unaware => "Unaware",
            Self::Vague => "Vague",
            Self::Direct => "Direct",
        })
    }
}

// ---------------------------------------------------------------------------
// Movement and speech
// ---------------------------------------------------------------------------

/// How fast an agent moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MovementState {
    /// Not moving.
    #[default]
    StayStill,
    /// Walking pace.
    Walk,
    /// Running pace.
    Sprint,
}

impl MovementState {
    /// Parse a movement label case-insensitively.
    ///
    /// Anything that is not `stay_still`, `walk`, or `sprint` maps to
    /// [`MovementState::StayStill`].
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "walk" => Self::Walk,
            "sprint" => Self::Sprint,
            _ => Self::StayStill,
        }
    }

    /// The `snake_case` label shown to the reasoning service.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StayStill => "stay_still",
            Self::Walk => "walk",
            Self::Sprint => "sprint",
        }
    }
}

impl core::fmt::Display for MovementState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How loudly an utterance is spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum VocalMode {
    /// Heard by everyone nearby.
    OutLoud,
    /// Heard only at close range.
    Whisper,
    /// Nothing is said.
    #[default]
    Silent,
}

// ---------------------------------------------------------------------------
// Health and outcome
// ---------------------------------------------------------------------------

/// Visible physical condition of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum HealthStatus {
    /// Unharmed.
    #[default]
    Alive,
    /// Hit at least once but still alive.
    Injured,
    /// Health reached zero.
    Dead,
}

impl core::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Alive => "Alive",
            Self::Injured => "Injured",
            Self::Dead => "Dead",
        })
    }
}

/// How an agent's run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum FinalStatus {
    /// Still in the building when the run ended.
    #[default]
    Alive,
    /// Reached an exit point.
    Escaped,
    /// Killed during the run.
    Dead,
}

// ---------------------------------------------------------------------------
// Actions and points of interest
// ---------------------------------------------------------------------------

/// The category of a resolved action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ActionType {
    /// Walk to a random interior point of a neighboring region.
    MoveToRegion,
    /// Walk to a nearby person.
    MoveToPerson,
    /// Walk to a hiding spot.
    MoveToHideSpot,
    /// Walk to an exit point.
    MoveToExit,
    /// Stay in place.
    StayStill,
    /// Confront the shooter.
    FightShooter,
}

impl core::fmt::Display for ActionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::MoveToRegion => "MoveToRegion",
            Self::MoveToPerson => "MoveToPerson",
            Self::MoveToHideSpot => "MoveToHideSpot",
            Self::MoveToExit => "MoveToExit",
            Self::StayStill => "StayStill",
            Self::FightShooter => "FightShooter",
        })
    }
}

/// Category of a point of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum InterestPointKind {
    /// A place to hide; reaching it crouches the agent.
    HideSpot,
    /// A way out; reaching it ends the agent's run as escaped.
    ExitPoint,
}

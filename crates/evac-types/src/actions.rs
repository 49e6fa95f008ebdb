//! Decision response schema and the resolved action it produces.
//!
//! The reasoning service answers with a [`DecisionResponse`]. The cognition
//! loop validates its `action_id` against the observation and the action
//! resolver turns it into an [`Action`] with a concrete target.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ActionType, MovementState, VocalMode};
use crate::geometry::Point3;

// ---------------------------------------------------------------------------
// Response schema
// ---------------------------------------------------------------------------

/// The three-part JSON object the reasoning service must return.
///
/// All fields are required. Enum-like string fields are kept as text on
/// the wire and mapped leniently afterwards, so an unknown label becomes
/// the stationary variant instead of failing the whole response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DecisionResponse {
    /// Free-text reasoning. Logged, never interpreted.
    pub thought: String,
    /// What to do.
    pub action: DecisionAction,
    /// How the agent's inner state changes.
    pub update: DecisionUpdate,
}

/// The `action` part of a [`DecisionResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DecisionAction {
    /// `out_loud`, `whisper`, or `silent`.
    pub vocal_mode: String,
    /// What to say, at most two sentences.
    pub utterance: String,
    /// `stay_still`, `walk`, or `sprint`.
    pub movement: String,
    /// One of the observation's available action ids.
    pub action_id: String,
}

/// The `update` part of a [`DecisionResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DecisionUpdate {
    /// New mood.
    pub mood: String,
    /// New memory entry.
    pub memory: String,
}

impl DecisionAction {
    /// Requested movement, unknown labels mapping to stay-still.
    pub fn movement_state(&self) -> MovementState {
        MovementState::parse_lenient(&self.movement)
    }

    /// Requested vocal mode, unknown labels mapping to silent.
    pub fn vocal_mode(&self) -> VocalMode {
        match self.vocal_mode.trim().to_ascii_lowercase().as_str() {
            "out_loud" => VocalMode::OutLoud,
            "whisper" => VocalMode::Whisper,
            _ => VocalMode::Silent,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved action
// ---------------------------------------------------------------------------

/// The concrete outcome of one decision cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Action {
    /// Category, derived from the action id pattern.
    pub action_type: ActionType,
    /// Where to go. `None` for stay-still, or when the target could not be
    /// found.
    pub target_location: Option<Point3>,
    /// What the agent says. Empty when silent.
    pub utterance: String,
    /// How loudly it is said.
    pub vocal_mode: VocalMode,
    /// How fast the agent moves.
    pub movement_state: MovementState,
}

impl Action {
    /// The safe default: stay in place, say nothing.
    pub const fn stay_still() -> Self {
        Self {
            action_type: ActionType::StayStill,
            target_location: None,
            utterance: String::new(),
            vocal_mode: VocalMode::Silent,
            movement_state: MovementState::StayStill,
        }
    }

    /// Whether this action asks the agent to travel somewhere.
    pub const fn is_movement(&self) -> bool {
        !matches!(self.action_type, ActionType::StayStill)
    }
}

impl Default for Action {
    fn default() -> Self {
        Self::stay_still()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_deserializes_from_schema() {
        let raw = r#"{
            "thought": "I should leave",
            "action": {"vocal_mode": "whisper", "utterance": "Go", "movement": "SPRINT", "action_id": "hallway1"},
            "update": {"mood": "scared", "memory": "Heard shots"}
        }"#;
        let parsed: Result<DecisionResponse, _> = serde_json::from_str(raw);
        assert!(parsed.is_ok());
        let Ok(resp) = parsed else { return };
        assert_eq!(resp.action.movement_state(), MovementState::Sprint);
        assert_eq!(resp.action.vocal_mode(), VocalMode::Whisper);
        assert_eq!(resp.update.mood, "scared");
    }

    #[test]
    fn missing_action_is_rejected() {
        let raw = r#"{"thought": "hm", "update": {"mood": "x", "memory": "y"}}"#;
        let parsed: Result<DecisionResponse, _> = serde_json::from_str(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn stay_still_default_has_no_target() {
        let action = Action::default();
        assert_eq!(action.action_type, ActionType::StayStill);
        assert!(action.target_location.is_none());
        assert!(action.utterance.is_empty());
        assert!(!action.is_movement());
    }
}

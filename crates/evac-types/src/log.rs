//! Records written to disk at the end of a run.
//!
//! One [`AgentLogRecord`] per agent, plus the shared [`DialogEntry`] list.
//! Times are simulation seconds since the run started.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    ActionType, FamiliarityLevel, FinalStatus, HealthStatus, MovementState,
    ShooterPerceptionLevel, TrainingLevel,
};
use crate::geometry::Point3;
use crate::ids::DialogId;
use crate::observation::Observation;
use crate::persona::Persona;

/// The three trait levels assigned by the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentTraits {
    /// Training level.
    pub training_level: TrainingLevel,
    /// Building familiarity.
    pub familiarity_level: FamiliarityLevel,
    /// Shooter perception.
    pub shooter_perception_level: ShooterPerceptionLevel,
}

/// An observation as it was delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LoggedObservation {
    /// Simulation time.
    pub time: f64,
    /// The observation.
    pub observation: Observation,
}

/// A resolved action and the thought behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LoggedAction {
    /// Simulation time.
    pub time: f64,
    /// Category.
    pub action_type: ActionType,
    /// Movement state the agent ended up with.
    pub movement_state: MovementState,
    /// What the agent said.
    pub dialog_text: String,
    /// The reasoning service's free-text thought.
    pub plan: Option<String>,
    /// Resolved target, if any.
    pub target_location: Option<Point3>,
}

/// A memory entry as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LoggedMemory {
    /// Simulation time.
    pub time: f64,
    /// Memory text.
    pub description: String,
}

/// One trajectory sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LoggedPosition {
    /// Simulation time.
    pub time: f64,
    /// Position x.
    pub x: f64,
    /// Position y.
    pub y: f64,
    /// Position z.
    pub z: f64,
    /// Forward vector x.
    pub rotation_x: f64,
    /// Forward vector y.
    pub rotation_y: f64,
    /// Forward vector z.
    pub rotation_z: f64,
    /// Remaining health points.
    pub health: u32,
    /// Visible condition.
    pub health_status: HealthStatus,
}

/// Everything recorded about one agent during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentLogRecord {
    /// Assigned persona.
    pub persona: Persona,
    /// Assigned trait levels.
    pub traits: AgentTraits,
    /// Observations in order.
    pub observations: Vec<LoggedObservation>,
    /// Actions in order.
    pub actions: Vec<LoggedAction>,
    /// Memories in order.
    pub memories: Vec<LoggedMemory>,
    /// Position samples in order.
    pub trajectory: Vec<LoggedPosition>,
    /// How the run ended for this agent.
    pub final_status: FinalStatus,
}

/// One utterance in the shared dialogue log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DialogEntry {
    /// Unique id.
    pub uid: DialogId,
    /// Simulation time.
    pub time: f64,
    /// Where it was said.
    pub location: Point3,
    /// What was said.
    pub content: String,
    /// Who said it.
    pub speaker: String,
}

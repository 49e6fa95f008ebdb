//! Shared type definitions for the evacuation simulation.
//!
//! This crate is the single source of truth for the values that flow
//! between the world model, the agent core, and the runner. Types flow
//! downstream to `TypeScript` via `ts-rs` for the run visualizer.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for agents and utterances
//! - [`geometry`] -- Points, bounding boxes, and compass directions
//! - [`enums`] -- Trait levels, movement, health, and action categories
//! - [`persona`] -- Character profiles and person identifiers
//! - [`memory`] -- Append-only memory log
//! - [`observation`] -- Per-cycle observation payload and action id constants
//! - [`actions`] -- Decision response schema and resolved actions
//! - [`log`] -- Per-agent log records and dialogue entries

pub mod actions;
pub mod enums;
pub mod geometry;
pub mod ids;
pub mod log;
pub mod memory;
pub mod observation;
pub mod persona;

// Re-export all public types at crate root for convenience.
pub use actions::{Action, DecisionAction, DecisionResponse, DecisionUpdate};
pub use enums::{
    ActionType, FamiliarityLevel, FinalStatus, HealthStatus, InterestPointKind, MovementState,
    ShooterPerceptionLevel, TrainingLevel, VocalMode,
};
pub use geometry::{Bounds, Direction, Point3};
pub use ids::{AgentId, DialogId};
pub use log::{
    AgentLogRecord, AgentTraits, DialogEntry, LoggedAction, LoggedMemory, LoggedObservation,
    LoggedPosition,
};
pub use memory::{MemoryEvent, MemoryLog};
pub use observation::{
    EXIT_PREFIX, FIGHT_THE_SHOOTER_ACTION_ID, HIDE_SPOT_PREFIX, NeighborRegion, Observation,
    PendingEvent, RegionSummary, STAY_STILL_ACTION_ID, ShooterInfo, SurroundingDialogue,
    SurroundingInterestPoint, SurroundingPerson, event_types,
};
pub use persona::{Persona, name_from_person_id, person_id_for};

//! Agent core for the evacuation simulation.
//!
//! This crate owns everything about a civilian that does not need a
//! network: who they are, what traits and instructions they were dealt,
//! what they currently know, and how a chosen action id becomes a
//! concrete movement target. The runner drives it and supplies the
//! reasoning service.
//!
//! # Modules
//!
//! - [`config`] -- Loading `evac-config.yaml` into strongly-typed structs.
//! - [`allocator`] -- Weighted trait and behavior pools with exact counts.
//! - [`personas`] -- Persona catalogs, personality merge, and assignment.
//! - [`agent`] -- Mutable per-agent state, damage, and region tracking.
//! - [`state`] -- Run-wide flags and the simulation clock.
//! - [`dialog`] -- The shared utterance log.
//! - [`observation`] -- Per-cycle observation assembly with threat gating.
//! - [`resolver`] -- Action id precedence and target resolution.
//! - [`decision`] -- [`ReasoningService`] trait and [`ScriptedReasoning`].
//!
//! [`ReasoningService`]: decision::ReasoningService
//! [`ScriptedReasoning`]: decision::ScriptedReasoning

pub mod agent;
pub mod allocator;
pub mod config;
pub mod decision;
pub mod dialog;
pub mod observation;
pub mod personas;
pub mod resolver;
pub mod state;

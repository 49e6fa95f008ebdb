//! Building model for the evacuation simulation.
//!
//! This crate owns the static spatial side of a run: named regions with
//! directed adjacency and axis-aligned bounds, the hiding spots and exits
//! inside them, and the exit-route queries agents rely on. Region
//! structure never changes after load; interest-point occupancy is the
//! only shared mutable state and is claimed with compare-and-set.
//!
//! # Modules
//!
//! - [`error`] -- Error types for map building and queries.
//! - [`region`] -- A single named, bounded area.
//! - [`region_graph`] -- The region graph: containment, neighbor reports,
//!   breadth-first exit routing, and building-map text.
//! - [`interest_points`] -- Hiding spots and exits with exclusive claims
//!   and the bounded per-observation sample.
//! - [`office_map`] -- The built-in 25-region office building.
//! - [`export`] -- The `map_data.json` document, both directions.

pub mod error;
pub mod export;
pub mod interest_points;
pub mod office_map;
pub mod region;
pub mod region_graph;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use export::{BoxRecord, InterestPointRecord, MapDocument, RegionConnection, RegionRecord};
pub use interest_points::{HideSpotSelection, InterestPoint, InterestPointIndex, NO_OCCUPANT};
pub use office_map::{OFFICE_EXITS, SHOOTER_REGION, office_building};
pub use region::Region;
pub use region_graph::{
    DEFAULT_HOP_DISTANCE, DEFAULT_REGION_PADDING, ExitRoute, RegionGraph, truncate_meters,
};

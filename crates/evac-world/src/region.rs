//! A named, bounded area of the building.

use evac_types::{Bounds, Point3};
use serde::{Deserialize, Serialize};

/// One node of the region graph.
///
/// Regions are defined when the map is loaded and never change during a
/// run. Adjacency is directed: `neighbors` lists where an agent standing
/// here may go next, which is not necessarily symmetric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Stable key, e.g. `hallway2`. Also the action id for moving here.
    pub id: String,
    /// Human-readable description shown to agents.
    pub description: String,
    /// Anchor position used for neighbor distance and direction reports.
    pub position: Point3,
    /// Physical extent.
    pub bounds: Bounds,
    /// Outgoing adjacency, in declaration order.
    pub neighbors: Vec<String>,
    /// Whether this region leads out of the building.
    pub is_exit: bool,
}

impl Region {
    /// Create a region anchored at the center of `bounds`, with no
    /// neighbors.
    pub fn new(id: impl Into<String>, description: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            position: bounds.center(),
            bounds,
            neighbors: Vec::new(),
            is_exit: false,
        }
    }

    /// Builder-style: set the outgoing adjacency list.
    #[must_use]
    pub fn with_neighbors<I, S>(mut self, neighbors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.neighbors = neighbors.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style: flag this region as an exit.
    #[must_use]
    pub const fn as_exit(mut self) -> Self {
        self.is_exit = true;
        self
    }

    /// Whether `point` lies inside this region.
    pub fn contains(&self, point: Point3) -> bool {
        self.bounds.contains(point)
    }
}

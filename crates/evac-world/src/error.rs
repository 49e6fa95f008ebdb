//! Error types for the `evac-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type.

use evac_types::AgentId;

/// Errors that can occur while building or querying the building model.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A region key is not part of the graph.
    #[error("region not found: {0}")]
    UnknownRegion(String),

    /// A region with the same key was already added.
    #[error("duplicate region id: {0}")]
    DuplicateRegion(String),

    /// A region lists a neighbor that is not part of the graph.
    #[error("region {region} lists unknown neighbor {neighbor}")]
    UnknownNeighbor {
        /// The region holding the adjacency entry.
        region: String,
        /// The missing neighbor key.
        neighbor: String,
    },

    /// No exit region can be reached from the start region.
    #[error("No exit is reachable from {start}")]
    NoExitReachable {
        /// Where the search started.
        start: String,
    },

    /// A specific exit region cannot be reached from the start region.
    #[error("Exit {exit} is not reachable from {start}")]
    ExitNotReachable {
        /// Where the search started.
        start: String,
        /// The exit that was asked for.
        exit: String,
    },

    /// An interest point with the same id was already added.
    #[error("duplicate interest point id: {0}")]
    DuplicateInterestPoint(String),

    /// An interest point id is not part of the index.
    #[error("interest point not found: {0}")]
    UnknownInterestPoint(String),

    /// Another agent already occupies the interest point.
    #[error("interest point {point} is already occupied by {occupant}")]
    AlreadyClaimed {
        /// The contested point.
        point: String,
        /// Display name of the current occupant.
        occupant: String,
        /// Identifier of the current occupant.
        agent: AgentId,
    },

    /// The occupancy table is unusable after a panic in another thread.
    #[error("interest point occupancy table is poisoned")]
    OccupancyPoisoned,

    /// A map document could not be read.
    #[error("map file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A map document is not valid JSON for the expected shape.
    #[error("malformed map document: {0}")]
    MalformedMap(#[from] serde_json::Error),
}

//! Hiding spots and exits, with exclusive occupancy claims.
//!
//! The catalog itself is immutable after load. Occupancy is the only
//! mutable state, guarded by a mutex so that claiming a hiding spot is a
//! single compare-and-set: two agents can never hold the same spot.

use std::collections::BTreeMap;
use std::sync::Mutex;

use evac_types::{AgentId, InterestPointKind, Point3, SurroundingInterestPoint};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::region::Region;
use crate::region_graph::truncate_meters;

/// Occupant label reported for a free hiding spot.
pub const NO_OCCUPANT: &str = "None";

/// A hiding spot or exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestPoint {
    /// Stable id, prefixed `hide_spot_` or `exit_`. Also the action id.
    pub id: String,
    /// Category.
    pub kind: InterestPointKind,
    /// Description shown to agents.
    pub description: String,
    /// Exact location.
    pub position: Point3,
}

impl InterestPoint {
    /// Create a hiding spot.
    pub fn hide_spot(id: impl Into<String>, description: impl Into<String>, position: Point3) -> Self {
        Self {
            id: id.into(),
            kind: InterestPointKind::HideSpot,
            description: description.into(),
            position,
        }
    }

    /// Create an exit point.
    pub fn exit(id: impl Into<String>, description: impl Into<String>, position: Point3) -> Self {
        Self {
            id: id.into(),
            kind: InterestPointKind::ExitPoint,
            description: description.into(),
            position,
        }
    }
}

/// How hiding spots are picked for an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HideSpotSelection {
    /// A random sample of at most `limit` spots.
    #[default]
    Random,
    /// The `limit` spots closest to the agent.
    Nearest,
}

/// Who holds a point.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Claim {
    agent: AgentId,
    name: String,
}

/// Queryable set of interest points with occupancy.
#[derive(Debug, Default)]
pub struct InterestPointIndex {
    /// Points indexed by id.
    points: BTreeMap<String, InterestPoint>,
    /// Ids in the order they were added.
    order: Vec<String>,
    /// Current claims by point id.
    claims: Mutex<BTreeMap<String, Claim>>,
}

impl InterestPointIndex {
    /// Create an empty index.
    pub const fn new() -> Self {
        Self {
            points: BTreeMap::new(),
            order: Vec::new(),
            claims: Mutex::new(BTreeMap::new()),
        }
    }

    /// Add a point.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateInterestPoint`] if the id is taken.
    pub fn add(&mut self, point: InterestPoint) -> Result<(), WorldError> {
        if self.points.contains_key(&point.id) {
            return Err(WorldError::DuplicateInterestPoint(point.id));
        }
        self.order.push(point.id.clone());
        self.points.insert(point.id.clone(), point);
        Ok(())
    }

    /// Look up a point by id.
    pub fn get(&self, id: &str) -> Option<&InterestPoint> {
        self.points.get(id)
    }

    /// Exact location of a point.
    pub fn location_of(&self, id: &str) -> Option<Point3> {
        self.points.get(id).map(|p| p.position)
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over points in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &InterestPoint> {
        self.order.iter().filter_map(|id| self.points.get(id))
    }

    /// Points inside `region`, optionally restricted to one category.
    pub fn points_in_region(
        &self,
        region: &Region,
        kind: Option<InterestPointKind>,
    ) -> Vec<&InterestPoint> {
        self.iter()
            .filter(|p| kind.is_none_or(|k| p.kind == k))
            .filter(|p| region.contains(p.position))
            .collect()
    }

    // -------------------------------------------------------------------
    // Occupancy
    // -------------------------------------------------------------------

    /// Display name of whoever holds `id`, if anyone.
    pub fn occupant_of(&self, id: &str) -> Option<String> {
        let Ok(claims) = self.claims.lock() else {
            return None;
        };
        claims.get(id).map(|c| c.name.clone())
    }

    /// Claim `id` for `agent`. Claiming a point the agent already holds
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownInterestPoint`] for an unknown id and
    /// [`WorldError::AlreadyClaimed`] when another agent holds it.
    pub fn try_claim(&self, id: &str, agent: AgentId, name: &str) -> Result<(), WorldError> {
        if !self.points.contains_key(id) {
            return Err(WorldError::UnknownInterestPoint(id.to_owned()));
        }
        let Ok(mut claims) = self.claims.lock() else {
            return Err(WorldError::OccupancyPoisoned);
        };
        match claims.get(id) {
            Some(existing) if existing.agent != agent => Err(WorldError::AlreadyClaimed {
                point: id.to_owned(),
                occupant: existing.name.clone(),
                agent: existing.agent,
            }),
            _ => {
                claims.insert(
                    id.to_owned(),
                    Claim {
                        agent,
                        name: name.to_owned(),
                    },
                );
                Ok(())
            }
        }
    }

    /// Release `id` if `agent` holds it. Returns whether a claim was
    /// dropped.
    pub fn release(&self, id: &str, agent: AgentId) -> bool {
        let Ok(mut claims) = self.claims.lock() else {
            return false;
        };
        if claims.get(id).is_some_and(|c| c.agent == agent) {
            claims.remove(id);
            return true;
        }
        false
    }

    /// Release every point held by `agent`.
    pub fn release_all(&self, agent: AgentId) {
        if let Ok(mut claims) = self.claims.lock() {
            claims.retain(|_, c| c.agent != agent);
        }
    }

    // -------------------------------------------------------------------
    // Observation payload
    // -------------------------------------------------------------------

    /// The interest points an agent at `position` sees in `region`.
    ///
    /// At most `limit` hiding spots are reported, picked by `selection`.
    /// Exits are always listed in full after the hiding spots.
    pub fn surrounding_points<R: Rng + ?Sized>(
        &self,
        region: &Region,
        position: Point3,
        limit: usize,
        selection: HideSpotSelection,
        rng: &mut R,
    ) -> Vec<SurroundingInterestPoint> {
        let mut spots: Vec<SurroundingInterestPoint> = self
            .points_in_region(region, Some(InterestPointKind::HideSpot))
            .into_iter()
            .map(|p| SurroundingInterestPoint {
                id: p.id.clone(),
                kind: p.kind,
                description: p.description.clone(),
                distance: truncate_meters(position.distance(p.position)),
                occupant: Some(self.occupant_of(&p.id).unwrap_or_else(|| NO_OCCUPANT.to_owned())),
            })
            .collect();

        match selection {
            HideSpotSelection::Random => spots.shuffle(rng),
            HideSpotSelection::Nearest => spots.sort_by_key(|s| s.distance),
        }
        spots.truncate(limit);

        spots.extend(
            self.points_in_region(region, Some(InterestPointKind::ExitPoint))
                .into_iter()
                .map(|p| SurroundingInterestPoint {
                    id: p.id.clone(),
                    kind: p.kind,
                    description: p.description.clone(),
                    distance: truncate_meters(position.distance(p.position)),
                    occupant: None,
                }),
        );
        spots
    }
}

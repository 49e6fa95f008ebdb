//! Region graph: named building areas as nodes, directed adjacency as edges.
//!
//! The [`RegionGraph`] answers every spatial question the agent core asks:
//! which region contains a point, what lies next door, and how to get out.
//!
//! Exit search is a breadth-first traversal from the agent's region. Edge
//! weights are horizontal distances: the first hop is measured from the
//! agent's exact position to the neighbor's bounds center, later hops from
//! center to center. A node's accumulated distance is fixed when BFS first
//! discovers it, so routes follow the fewest hops and the distance is the
//! length of that route. Among reachable exits the smallest distance wins,
//! ties going to the exit discovered first.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Write as _;

use evac_types::{Direction, NeighborRegion, Point3};
use rand::Rng;
use tracing::warn;

use crate::error::WorldError;
use crate::region::Region;

/// Hop length assumed when either end of an edge has no geometry.
pub const DEFAULT_HOP_DISTANCE: f64 = 10.0;

/// Inward padding applied when picking a random point inside a region.
pub const DEFAULT_REGION_PADDING: f64 = 0.7;

// ---------------------------------------------------------------------------
// Exit routes
// ---------------------------------------------------------------------------

/// A route from a start region to an exit region.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitRoute {
    /// The exit region the route ends in.
    pub exit: String,
    /// Region keys from start to exit, both included.
    pub path: Vec<String>,
    /// Length of each hop; one shorter than `path`.
    pub hops: Vec<f64>,
    /// Sum of `hops`.
    pub total_distance: f64,
}

impl ExitRoute {
    /// One-line summary used for the nearest exit.
    pub fn summary(&self) -> String {
        format!(
            "Route to exit: {}->exit_point (distance: {:.1} meters)",
            self.path.join("->"),
            self.total_distance
        )
    }

    /// One-line route with per-hop distances, used in the building map.
    pub fn detailed(&self) -> String {
        let mut out = format!("Route to {}: ", self.exit);
        if let Some(first) = self.path.first() {
            out.push_str(first);
        }
        for (region, hop) in self.path.iter().skip(1).zip(&self.hops) {
            let _ = write!(out, "->{region} ({hop:.1}m)");
        }
        let _ = write!(out, "->exit_point (total distance: {:.1} m)", self.total_distance);
        out
    }
}

/// Result of one breadth-first traversal.
struct SearchTree {
    /// Discovery order, start first.
    order: Vec<String>,
    /// Parent of every discovered node except the start.
    parent: BTreeMap<String, String>,
    /// Length of the edge from a node's parent to the node.
    hop: BTreeMap<String, f64>,
    /// Accumulated distance from the start.
    distance: BTreeMap<String, f64>,
}

impl SearchTree {
    fn route_to(&self, target: &str) -> Option<ExitRoute> {
        let total_distance = *self.distance.get(target)?;
        let mut path = vec![target.to_owned()];
        let mut hops = Vec::new();
        let mut cursor = target;
        while let Some(parent) = self.parent.get(cursor) {
            hops.push(self.hop.get(cursor).copied().unwrap_or(DEFAULT_HOP_DISTANCE));
            path.push(parent.clone());
            cursor = parent;
        }
        path.reverse();
        hops.reverse();
        Some(ExitRoute {
            exit: target.to_owned(),
            path,
            hops,
            total_distance,
        })
    }
}

// ---------------------------------------------------------------------------
// RegionGraph
// ---------------------------------------------------------------------------

/// The static region graph of one building.
#[derive(Debug, Clone, Default)]
pub struct RegionGraph {
    /// All regions indexed by key.
    regions: BTreeMap<String, Region>,
    /// Region keys in the order they were added.
    order: Vec<String>,
}

impl RegionGraph {
    /// Create an empty graph.
    pub const fn new() -> Self {
        Self {
            regions: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    /// Add a region.
    ///
    /// Neighbor keys are not checked here; see [`RegionGraph::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateRegion`] if the key is taken.
    pub fn add_region(&mut self, region: Region) -> Result<(), WorldError> {
        if self.regions.contains_key(&region.id) {
            return Err(WorldError::DuplicateRegion(region.id));
        }
        self.order.push(region.id.clone());
        self.regions.insert(region.id.clone(), region);
        Ok(())
    }

    /// Check that every adjacency entry names a known region, and warn
    /// about regions from which no exit can be reached.
    ///
    /// # Errors
    ///
    /// Returns the first [`WorldError::UnknownNeighbor`] found.
    pub fn validate(&self) -> Result<(), WorldError> {
        for region in self.regions() {
            if let Some(missing) = region.neighbors.iter().find(|n| !self.regions.contains_key(*n)) {
                return Err(WorldError::UnknownNeighbor {
                    region: region.id.clone(),
                    neighbor: missing.clone(),
                });
            }
        }
        for region in self.stranded_regions() {
            warn!(region = %region, "no exit is reachable from region");
        }
        Ok(())
    }

    /// Non-exit regions whose reachable set contains no exit region.
    pub fn stranded_regions(&self) -> Vec<String> {
        self.regions()
            .filter(|r| !r.is_exit)
            .filter(|r| {
                !self
                    .reachable_from(&r.id)
                    .iter()
                    .any(|id| self.regions.get(id).is_some_and(|n| n.is_exit))
            })
            .map(|r| r.id.clone())
            .collect()
    }

    /// Look up a region by key.
    pub fn get(&self, id: &str) -> Option<&Region> {
        self.regions.get(id)
    }

    /// Whether `id` is a region key.
    pub fn contains(&self, id: &str) -> bool {
        self.regions.contains_key(id)
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the graph has no regions.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Iterate over regions in the order they were added.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.order.iter().filter_map(|id| self.regions.get(id))
    }

    /// Exit regions in the order they were added.
    pub fn exits(&self) -> impl Iterator<Item = &Region> {
        self.regions().filter(|r| r.is_exit)
    }

    // -------------------------------------------------------------------
    // Spatial queries
    // -------------------------------------------------------------------

    /// The first region, in insertion order, whose bounds contain `point`.
    ///
    /// `None` is a recoverable condition: the caller keeps its last known
    /// region and logs.
    pub fn region_containing(&self, point: Point3) -> Option<&Region> {
        self.regions().find(|r| r.contains(point))
    }

    /// Report the neighbors of `region_id` with truncated anchor-to-anchor
    /// distance and compass direction.
    ///
    /// Neighbors without geometry are reported as `Unknown`, distance 0.
    pub fn neighbors_of(&self, region_id: &str) -> Vec<NeighborRegion> {
        let Some(region) = self.regions.get(region_id) else {
            warn!(region = region_id, "neighbor query for unknown region");
            return Vec::new();
        };
        region
            .neighbors
            .iter()
            .map(|neighbor_id| match self.regions.get(neighbor_id) {
                Some(neighbor) => NeighborRegion {
                    id: neighbor_id.clone(),
                    distance: truncate_meters(region.position.distance(neighbor.position)),
                    description: neighbor.description.clone(),
                    direction: Direction::between(region.position, neighbor.position).to_string(),
                },
                None => NeighborRegion {
                    id: neighbor_id.clone(),
                    distance: 0,
                    description: "Unknown".to_owned(),
                    direction: "unknown".to_owned(),
                },
            })
            .collect()
    }

    /// A uniformly random point inside `region_id`, shrunk inward by
    /// `padding` on every face.
    pub fn random_point_in<R: Rng + ?Sized>(
        &self,
        region_id: &str,
        padding: f64,
        rng: &mut R,
    ) -> Option<Point3> {
        let padded = self.regions.get(region_id)?.bounds.padded(padding);
        Some(Point3::new(
            rng.random_range(padded.min.x..=padded.max.x),
            rng.random_range(padded.min.y..=padded.max.y),
            rng.random_range(padded.min.z..=padded.max.z),
        ))
    }

    // -------------------------------------------------------------------
    // Exit search
    // -------------------------------------------------------------------

    /// Shortest route from `start_region` to the nearest reachable exit.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NoExitReachable`] when no exit region can be
    /// reached, including when `start_region` is not in the graph.
    pub fn shortest_path_to_nearest_exit(
        &self,
        start_region: &str,
        start_point: Point3,
    ) -> Result<ExitRoute, WorldError> {
        let tree = self.search(start_region, start_point);
        let mut best: Option<(&str, f64)> = None;
        for id in &tree.order {
            let is_exit = self.regions.get(id).is_some_and(|r| r.is_exit);
            let Some(&distance) = tree.distance.get(id) else {
                continue;
            };
            if is_exit && best.is_none_or(|(_, d)| distance < d) {
                best = Some((id, distance));
            }
        }
        best.and_then(|(id, _)| tree.route_to(id))
            .ok_or_else(|| WorldError::NoExitReachable {
                start: start_region.to_owned(),
            })
    }

    /// The nearest-exit line: the route summary, or the unreachable notice.
    pub fn nearest_exit_summary(&self, start_region: &str, start_point: Point3) -> String {
        match self.shortest_path_to_nearest_exit(start_region, start_point) {
            Ok(route) => route.summary(),
            Err(e) => e.to_string(),
        }
    }

    /// The building map given to agents familiar with the building: one
    /// line per exit region with per-hop distances.
    pub fn building_map(&self, start_region: &str, start_point: Point3) -> String {
        let tree = self.search(start_region, start_point);
        let mut out = String::new();
        for exit in self.exits() {
            match tree.route_to(&exit.id) {
                Some(route) => {
                    let _ = writeln!(out, "{}", route.detailed());
                }
                None => {
                    let unreachable = WorldError::ExitNotReachable {
                        start: start_region.to_owned(),
                        exit: exit.id.clone(),
                    };
                    let _ = writeln!(out, "{unreachable}");
                }
            }
        }
        out
    }

    /// Every region key reachable from `start` by following adjacency,
    /// `start` included.
    pub fn reachable_from(&self, start: &str) -> BTreeSet<String> {
        self.search(start, Point3::ZERO).order.into_iter().collect()
    }

    /// Breadth-first traversal from `start`, weighting the first hop from
    /// `start_point`.
    fn search(&self, start: &str, start_point: Point3) -> SearchTree {
        let mut tree = SearchTree {
            order: vec![start.to_owned()],
            parent: BTreeMap::new(),
            hop: BTreeMap::new(),
            distance: BTreeMap::from([(start.to_owned(), 0.0)]),
        };
        let mut visited = BTreeSet::from([start.to_owned()]);
        let mut queue = VecDeque::from([start.to_owned()]);

        while let Some(current) = queue.pop_front() {
            let Some(region) = self.regions.get(&current) else {
                continue;
            };
            let base = tree.distance.get(&current).copied().unwrap_or(0.0);
            for neighbor in &region.neighbors {
                if visited.contains(neighbor) {
                    continue;
                }
                let weight = if current == start {
                    self.regions.get(neighbor).map_or(DEFAULT_HOP_DISTANCE, |n| {
                        start_point.horizontal_distance(n.bounds.center())
                    })
                } else {
                    self.center_distance(&current, neighbor)
                };
                visited.insert(neighbor.clone());
                tree.order.push(neighbor.clone());
                tree.parent.insert(neighbor.clone(), current.clone());
                tree.hop.insert(neighbor.clone(), weight);
                tree.distance.insert(neighbor.clone(), base + weight);
                queue.push_back(neighbor.clone());
            }
        }
        tree
    }

    /// Horizontal distance between two regions' bounds centers.
    fn center_distance(&self, a: &str, b: &str) -> f64 {
        match (self.regions.get(a), self.regions.get(b)) {
            (Some(a), Some(b)) => a.bounds.center().horizontal_distance(b.bounds.center()),
            _ => DEFAULT_HOP_DISTANCE,
        }
    }
}

/// Truncate a non-negative distance to whole meters.
pub fn truncate_meters(distance: f64) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let meters = distance.max(0.0) as u32;
    meters
}

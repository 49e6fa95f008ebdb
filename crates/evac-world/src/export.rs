//! Region and interest-point export document.
//!
//! The document has the shape the run visualizer reads from
//! `map_data.json`: `regions`, `interest_points`, `region_connections`,
//! plus `exit_regions` so the same document can be loaded back as a map.

use std::path::Path;

use evac_types::{Bounds, InterestPointKind, Point3};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::interest_points::{InterestPoint, InterestPointIndex};
use crate::region::Region;
use crate::region_graph::RegionGraph;

/// A bounding box as center plus full size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxRecord {
    /// Box center.
    pub center: Point3,
    /// Full extents along each axis.
    pub size: Point3,
}

/// One region in the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    /// Region key.
    pub id: String,
    /// Region description.
    pub description: String,
    /// Anchor position.
    pub position: Point3,
    /// Physical extent.
    pub bounds: BoxRecord,
}

/// One interest point in the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestPointRecord {
    /// Point id.
    pub id: String,
    /// Category, `HideSpot` or `ExitPoint`.
    #[serde(rename = "type")]
    pub kind: InterestPointKind,
    /// Point description.
    pub description: String,
    /// Occupant name at export time, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupant: Option<String>,
    /// Exact location.
    pub position: Point3,
}

/// A directed adjacency edge between two region centers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConnection {
    /// Source region key.
    pub source: String,
    /// Target region key.
    pub target: String,
    /// Source bounds center.
    pub source_position: Point3,
    /// Target bounds center.
    pub target_position: Point3,
}

/// The full map export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapDocument {
    /// All regions, in graph order.
    pub regions: Vec<RegionRecord>,
    /// All interest points, in index order.
    pub interest_points: Vec<InterestPointRecord>,
    /// Every adjacency edge whose endpoints both exist.
    pub region_connections: Vec<RegionConnection>,
    /// Keys of the exit regions.
    #[serde(default)]
    pub exit_regions: Vec<String>,
}

impl MapDocument {
    /// Snapshot a loaded world, including current occupancy.
    pub fn from_world(graph: &RegionGraph, points: &InterestPointIndex) -> Self {
        let regions = graph
            .regions()
            .map(|r| RegionRecord {
                id: r.id.clone(),
                description: r.description.clone(),
                position: r.position,
                bounds: BoxRecord {
                    center: r.bounds.center(),
                    size: r.bounds.size(),
                },
            })
            .collect();

        let interest_points = points
            .iter()
            .map(|p| InterestPointRecord {
                id: p.id.clone(),
                kind: p.kind,
                description: p.description.clone(),
                occupant: points.occupant_of(&p.id),
                position: p.position,
            })
            .collect();

        let mut region_connections = Vec::new();
        for source in graph.regions() {
            for target_id in &source.neighbors {
                // Dangling edges have no position to draw.
                let Some(target) = graph.get(target_id) else {
                    continue;
                };
                region_connections.push(RegionConnection {
                    source: source.id.clone(),
                    target: target.id.clone(),
                    source_position: source.bounds.center(),
                    target_position: target.bounds.center(),
                });
            }
        }

        Self {
            regions,
            interest_points,
            region_connections,
            exit_regions: graph.exits().map(|r| r.id.clone()).collect(),
        }
    }

    /// Rebuild a world from this document.
    ///
    /// Adjacency comes from `region_connections` in document order.
    /// Occupants are not restored; every point starts free.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] on duplicate keys or edges naming unknown
    /// regions.
    pub fn into_world(self) -> Result<(RegionGraph, InterestPointIndex), WorldError> {
        let mut graph = RegionGraph::new();
        for record in self.regions {
            let neighbors: Vec<String> = self
                .region_connections
                .iter()
                .filter(|c| c.source == record.id)
                .map(|c| c.target.clone())
                .collect();
            let mut region = Region::new(
                record.id,
                record.description,
                Bounds::from_center_size(record.bounds.center, record.bounds.size),
            )
            .with_neighbors(neighbors);
            region.position = record.position;
            if self.exit_regions.contains(&region.id) {
                region = region.as_exit();
            }
            graph.add_region(region)?;
        }
        graph.validate()?;

        let mut points = InterestPointIndex::new();
        for record in self.interest_points {
            points.add(InterestPoint {
                id: record.id,
                kind: record.kind,
                description: record.description,
                position: record.position,
            })?;
        }
        Ok((graph, points))
    }

    /// Read a document from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Io`] or [`WorldError::MalformedMap`].
    pub fn from_file(path: &Path) -> Result<Self, WorldError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a document from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::MalformedMap`] if the JSON does not match.
    pub fn parse(json: &str) -> Result<Self, WorldError> {
        Ok(serde_json::from_str(json)?)
    }
}

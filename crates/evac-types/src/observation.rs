//! Per-cycle observation payload delivered to an agent's reasoning step.
//!
//! An [`Observation`] is everything the agent knows about the world for one
//! decision. Its `available_action_ids` list is the only legal universe of
//! actions: anything the reasoning service picks outside of it is replaced
//! by [`STAY_STILL_ACTION_ID`].

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{HealthStatus, InterestPointKind, MovementState};

/// Action id that keeps the agent in place. Always available.
pub const STAY_STILL_ACTION_ID: &str = "stay_still";

/// Action id offered only when the shooter is in the agent's region.
pub const FIGHT_THE_SHOOTER_ACTION_ID: &str = "fight_the_shooter";

/// Prefix of every hiding-spot interest point id.
pub const HIDE_SPOT_PREFIX: &str = "hide_spot_";

/// Prefix of every exit interest point id.
pub const EXIT_PREFIX: &str = "exit_";

// ---------------------------------------------------------------------------
// Pending events
// ---------------------------------------------------------------------------

/// Event types queued for an agent between observations.
pub mod event_types {
    /// The first shots were fired somewhere in the building.
    pub const GUNSHOT: &str = "gunshot";
    /// The agent was hit.
    pub const GOT_SHOT: &str = "got_shot";
    /// The agent arrived at the hiding spot it was heading to.
    pub const FOUND_HIDING_SPOT: &str = "found_hiding_spot";
}

/// Something that happened to the agent since its last observation.
///
/// Pending events are delivered at most once: building an observation
/// drains the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PendingEvent {
    /// Short machine-readable type, see [`event_types`].
    pub event_type: String,
    /// First-person description shown to the agent.
    pub description: String,
    /// When the event was queued.
    pub timestamp: DateTime<Utc>,
}

impl PendingEvent {
    /// Create an event stamped with `timestamp`.
    pub fn new(
        event_type: impl Into<String>,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            description: description.into(),
            timestamp,
        }
    }

    /// Everyone hears the first shots.
    pub fn gunshot(timestamp: DateTime<Utc>) -> Self {
        Self::new(
            event_types::GUNSHOT,
            "I heard a loud gunshot. There might be an active shooter in the building.",
            timestamp,
        )
    }

    /// The agent was hit by the shooter.
    pub fn got_shot(timestamp: DateTime<Utc>) -> Self {
        Self::new(event_types::GOT_SHOT, "I was just shot and injured", timestamp)
    }

    /// The agent reached its hiding spot.
    pub fn found_hiding_spot(timestamp: DateTime<Utc>) -> Self {
        Self::new(
            event_types::FOUND_HIDING_SPOT,
            "I have reached the hiding spot",
            timestamp,
        )
    }
}

// ---------------------------------------------------------------------------
// Observation parts
// ---------------------------------------------------------------------------

/// The region the agent currently stands in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RegionSummary {
    /// Region key.
    pub id: String,
    /// Region description.
    pub description: String,
}

/// Threat telemetry. Only present once the threat is known to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ShooterInfo {
    /// Region the shooter stands in, or `"unknown"`.
    pub region_id: String,
    /// Distance in meters with two decimals, or `"unknown"`.
    pub distance: String,
    /// Whether the agent can see the shooter.
    pub in_line_of_sight: bool,
    /// Compass direction from the agent to the shooter, or `"unknown"`.
    pub direction: String,
    /// Whether the shooter is in the agent's own region.
    pub in_same_region: bool,
}

impl ShooterInfo {
    /// Descriptor used when the shooter's whereabouts cannot be resolved
    /// and there is nothing older to fall back to.
    pub fn unknown() -> Self {
        Self {
            region_id: "unknown".to_owned(),
            distance: "unknown".to_owned(),
            in_line_of_sight: false,
            direction: "unknown".to_owned(),
            in_same_region: false,
        }
    }
}

/// A region adjacent to the agent's current region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NeighborRegion {
    /// Region key; also a legal action id.
    pub id: String,
    /// Truncated distance between the two region anchors, in meters.
    pub distance: u32,
    /// Neighbor's description.
    pub description: String,
    /// Compass direction from the current region, or `"unknown"`.
    pub direction: String,
}

/// Another agent within the nearby-people radius.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SurroundingPerson {
    /// Display name.
    pub name: String,
    /// Visible condition.
    pub health_status: HealthStatus,
}

/// A hiding spot or exit inside the agent's current region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SurroundingInterestPoint {
    /// Interest point id; also a legal action id.
    pub id: String,
    /// Category.
    pub kind: InterestPointKind,
    /// Description.
    pub description: String,
    /// Truncated distance from the agent, in meters.
    pub distance: u32,
    /// Who occupies a hiding spot (`"None"` when free). Exits have none.
    pub occupant: Option<String>,
}

/// A recent utterance heard nearby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SurroundingDialogue {
    /// Speaker's display name.
    pub speaker: String,
    /// What was said.
    pub content: String,
    /// Simulation time of the utterance, in seconds.
    pub time: f64,
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// The complete per-cycle snapshot for one agent.
///
/// Each optional section is `None` (or empty) when its include toggle is
/// off, or when it is threat-gated and the threat is not yet known.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Observation {
    /// Current mood.
    pub mood: Option<String>,
    /// Current movement state.
    pub current_movement_state: Option<MovementState>,
    /// Whether the agent is crouched at a hiding spot. Threat-gated.
    pub is_hiding: bool,
    /// Current region.
    pub location: Option<RegionSummary>,
    /// Threat telemetry. Threat-gated.
    pub shooter_info: Option<ShooterInfo>,
    /// People within the nearby radius.
    pub surrounding_people: Vec<SurroundingPerson>,
    /// Adjacent regions.
    pub neighbor_regions: Vec<NeighborRegion>,
    /// Hiding spots and exits in the current region. Threat-gated.
    pub interest_points: Vec<SurroundingInterestPoint>,
    /// Recent nearby dialogue, newest first.
    pub surrounding_conversation: Vec<SurroundingDialogue>,
    /// Events drained from the agent's queue.
    pub pending_events: Vec<PendingEvent>,
    /// Every action id the agent may legally choose this cycle.
    pub available_action_ids: Vec<String>,
}

impl Observation {
    /// Whether `action_id` is a legal choice this cycle.
    pub fn is_action_available(&self, action_id: &str) -> bool {
        self.available_action_ids.iter().any(|id| id == action_id)
    }

    /// Render the observation as the markdown block used in the user prompt.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Current Observation\n");
        let _ = writeln!(out, "**Mood:** {}", self.mood.as_deref().unwrap_or_default());
        let _ = writeln!(
            out,
            "**Movement State:** {}",
            self.current_movement_state.map(MovementState::as_str).unwrap_or_default()
        );

        if let Some(location) = &self.location {
            out.push_str("\n## Current Location\n");
            let _ = writeln!(out, "**Region ID:** {}", location.id);
            let _ = writeln!(out, "**Description:** {}", location.description);
        }

        if let Some(shooter) = &self.shooter_info {
            out.push_str("\n## Shooter Information\n");
            let _ = writeln!(out, "**Location:** {}", shooter.region_id);
            let _ = writeln!(out, "**Distance:** {} meters", shooter.distance);
            let _ = writeln!(out, "**In Line of Sight:** {}", yes_no(shooter.in_line_of_sight));
            let _ = writeln!(out, "**Direction:** {}", shooter.direction);
            let _ = writeln!(out, "**I'm Currently Hiding:** {}", yes_no(self.is_hiding));
        }

        if !self.surrounding_people.is_empty() {
            out.push_str("\n## People Nearby\n");
            for person in &self.surrounding_people {
                let _ = writeln!(out, "- **{}** - {}", person.name, person.health_status);
            }
        }

        if !self.neighbor_regions.is_empty() {
            out.push_str("\n## Neighboring Regions\n");
            for region in &self.neighbor_regions {
                let _ = writeln!(
                    out,
                    "- **{}**: {} ({}m {})",
                    region.id, region.description, region.distance, region.direction
                );
            }
        }

        if !self.interest_points.is_empty() {
            out.push_str("\n## Points of Interest\n");
            for point in &self.interest_points {
                let _ = write!(out, "- **{}**: {} ({}m)", point.id, point.description, point.distance);
                match point.occupant.as_deref() {
                    Some(occupant) if !occupant.is_empty() => {
                        let _ = writeln!(out, " - Occupied by {occupant}");
                    }
                    _ => out.push('\n'),
                }
            }
        }

        if !self.surrounding_conversation.is_empty() {
            out.push_str("\n## Nearby Conversations\n");
            for line in &self.surrounding_conversation {
                let _ = writeln!(out, "- **{}:** \"{}\"", line.speaker, line.content);
            }
        }

        if !self.pending_events.is_empty() {
            out.push_str("\n## Recent Events\n");
            for event in &self.pending_events {
                let _ = writeln!(out, "- **{}**: {}", event.event_type, event.description);
            }
        }

        if !self.available_action_ids.is_empty() {
            out.push_str("\n## Available Actions\n");
            for id in &self.available_action_ids {
                let _ = writeln!(out, "- {id}");
            }
        }

        out
    }
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

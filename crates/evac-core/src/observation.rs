//! Observation assembly for one decision cycle.
//!
//! Before every reasoning call the cognition loop builds an
//! [`Observation`] for the deciding agent. The observation carries
//! everything the agent is allowed to know: mood and movement, where they
//! are, where they can go, who is nearby, what was said nearby, and the
//! events queued since the previous cycle.
//!
//! Threat telemetry (shooter descriptor, hiding status, interest points,
//! and the fight action) is only included once the agent actually
//! observes the shooting. Before that the agent sees an ordinary office.
//!
//! The assembled `available_action_ids` list is the complete universe of
//! legal actions for the cycle and always starts with `stay_still`.

use evac_types::{
    AgentId, Direction, FIGHT_THE_SHOOTER_ACTION_ID, HealthStatus, Observation, Point3,
    RegionSummary, STAY_STILL_ACTION_ID, ShooterInfo, SurroundingPerson,
};
use evac_world::{InterestPointIndex, RegionGraph};
use rand::Rng;
use tracing::debug;

use crate::agent::AgentState;
use crate::config::ObservationConfig;
use crate::dialog::DialogLog;

// ---------------------------------------------------------------------------
// Line of sight
// ---------------------------------------------------------------------------

/// Visibility query between two points of the building.
pub trait LineOfSight {
    /// Whether something at `from` can see something at `to`.
    fn can_see(&self, graph: &RegionGraph, from: Point3, to: Point3) -> bool;
}

/// Visibility without geometry: two points see each other when they lie
/// in the same region.
#[derive(Debug, Clone, Copy, Default)]
pub struct SameRegionSight;

impl LineOfSight for SameRegionSight {
    fn can_see(&self, graph: &RegionGraph, from: Point3, to: Point3) -> bool {
        match (graph.region_containing(from), graph.region_containing(to)) {
            (Some(a), Some(b)) => a.id == b.id,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// World view
// ---------------------------------------------------------------------------

/// What one agent can be told about another.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerView {
    /// Agent id.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Underscore-joined lowercase name used as an action id.
    pub person_id: String,
    /// Current position.
    pub position: Point3,
    /// Visible condition.
    pub health_status: HealthStatus,
}

impl PeerView {
    /// Snapshot of `agent` as seen by others.
    pub fn of(agent: &AgentState) -> Self {
        Self {
            id: agent.id,
            name: agent.name().to_owned(),
            person_id: agent.person_id(),
            position: agent.position,
            health_status: agent.health_status,
        }
    }
}

/// Read-only world state shared by every agent deciding in the same tick.
#[derive(Debug, Clone, Copy)]
pub struct WorldView<'a> {
    /// Building regions.
    pub graph: &'a RegionGraph,
    /// Hiding spots and exits.
    pub points: &'a InterestPointIndex,
    /// Everything said so far.
    pub dialog: &'a DialogLog,
    /// Every agent still in the building, the observer included.
    pub peers: &'a [PeerView],
    /// Where the shooter stands, once placed.
    pub shooter_position: Option<Point3>,
    /// Whether the shooting has begun.
    pub shooting_started: bool,
    /// Simulation seconds.
    pub now_secs: f64,
}

impl WorldView<'_> {
    /// The peer whose person id is `person_id`.
    pub fn peer(&self, person_id: &str) -> Option<&PeerView> {
        self.peers.iter().find(|p| p.person_id == person_id)
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Assemble the [`Observation`] for `agent`.
///
/// Pending events are drained from the agent even when their section is
/// switched off, so each event is offered at most once. The shooter
/// descriptor delivered is remembered on the agent and reused while the
/// shooter's region cannot be determined.
pub fn build_observation<S, R>(
    agent: &mut AgentState,
    view: &WorldView<'_>,
    config: &ObservationConfig,
    sight: &S,
    rng: &mut R,
) -> Observation
where
    S: LineOfSight + ?Sized,
    R: Rng + ?Sized,
{
    let threat_is_known = agent.observes_shooter(view.shooting_started);
    let mut observation = Observation {
        available_action_ids: vec![STAY_STILL_ACTION_ID.to_owned()],
        ..Observation::default()
    };

    if config.include_mood {
        observation.mood = Some(agent.mood.clone());
    }
    if config.include_movement_state {
        observation.current_movement_state = Some(agent.movement_state);
    }

    if threat_is_known {
        observation.is_hiding = agent.is_crouching;
        if config.include_shooter_info {
            let info = shooter_info(agent, view, sight);
            if info.in_same_region {
                observation
                    .available_action_ids
                    .push(FIGHT_THE_SHOOTER_ACTION_ID.to_owned());
            }
            observation.shooter_info = Some(info);
        }
    }

    let region = agent
        .current_region
        .as_deref()
        .and_then(|id| view.graph.get(id));

    if config.include_location {
        observation.location = region.map(|r| RegionSummary {
            id: r.id.clone(),
            description: r.description.clone(),
        });
    }

    if let Some(region) = region.filter(|_| config.include_neighbor_regions) {
        let neighbors = view.graph.neighbors_of(&region.id);
        observation
            .available_action_ids
            .extend(neighbors.iter().map(|n| n.id.clone()));
        observation.neighbor_regions = neighbors;
    }

    if let Some(region) = region.filter(|_| threat_is_known && config.include_interest_points) {
        let points = view.points.surrounding_points(
            region,
            agent.position,
            config.hide_spot_limit,
            config.hide_spot_selection,
            rng,
        );
        observation
            .available_action_ids
            .extend(points.iter().map(|p| p.id.clone()));
        observation.interest_points = points;
    }

    if config.include_conversation {
        observation.surrounding_conversation = view.dialog.surrounding(
            agent.position,
            view.now_secs,
            config.dialog_radius,
            config.dialog_time_window_secs,
            config.conversation_limit,
        );
    }

    let events = agent.drain_events();
    if config.include_pending_events {
        observation.pending_events = events;
    }

    if config.include_surrounding_people {
        for peer in view.peers.iter().filter(|p| {
            p.id != agent.id && p.position.distance(agent.position) <= config.nearby_people_radius
        }) {
            observation.surrounding_people.push(SurroundingPerson {
                name: peer.name.clone(),
                health_status: peer.health_status,
            });
            observation.available_action_ids.push(peer.person_id.clone());
        }
    }

    debug!(
        agent = %agent.name(),
        threat_is_known,
        actions = observation.available_action_ids.len(),
        "observation built"
    );
    observation
}

/// Describe the shooter relative to `agent` and remember the result.
fn shooter_info<S>(agent: &mut AgentState, view: &WorldView<'_>, sight: &S) -> ShooterInfo
where
    S: LineOfSight + ?Sized,
{
    let shooter_region = view
        .shooter_position
        .and_then(|pos| view.graph.region_containing(pos).map(|r| (pos, r)));

    let Some((shooter_pos, region)) = shooter_region else {
        if let Some(previous) = &agent.last_shooter_info {
            return previous.clone();
        }
        let unknown = ShooterInfo::unknown();
        agent.last_shooter_info = Some(unknown.clone());
        return unknown;
    };

    let agent_region = view.graph.region_containing(agent.position);
    let info = ShooterInfo {
        region_id: region.id.clone(),
        distance: format!("{:.2}", agent.position.distance(shooter_pos)),
        in_line_of_sight: sight.can_see(view.graph, agent.position, shooter_pos),
        direction: Direction::between(agent.position, shooter_pos).to_string(),
        in_same_region: agent_region.is_some_and(|r| r.id == region.id),
    };
    agent.last_shooter_info = Some(info.clone());
    info
}

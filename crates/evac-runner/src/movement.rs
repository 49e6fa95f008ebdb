//! Straight-line movement executor.
//!
//! Stands in for a navigation engine: an agent with a target walks (or
//! sprints) toward it on the horizontal plane each tick. Arrival is
//! within a fixed threshold, and a target not reached within the timeout
//! is abandoned. Arriving at a hiding spot crouches the agent; arriving
//! at an exit point, or entering an exit region, takes the agent out of
//! the building.

use chrono::{DateTime, Utc};
use evac_core::agent::AgentState;
use evac_core::config::AgentsConfig;
use evac_types::{ActionType, MovementState, PendingEvent, Point3};
use evac_world::RegionGraph;
use rand::Rng;
use tracing::{debug, info};

/// Range of the per-agent speed multiplier, upper bound exclusive.
pub const SPEED_MULTIPLIER_RANGE: std::ops::Range<f64> = 1.0..1.5;

/// Draw a per-agent speed multiplier.
pub fn random_speed_multiplier<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.random_range(SPEED_MULTIPLIER_RANGE)
}

/// What one movement step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovementEvent {
    /// No target to move to.
    Idle,
    /// Moved and still on the way.
    Moving,
    /// Arrived at the target.
    Reached {
        /// The action that set the target.
        action_type: ActionType,
        /// Its action id.
        action_id: String,
    },
    /// Gave up after the target timeout.
    TimedOut,
    /// Left the building.
    Escaped,
}

/// Advance `agent` by `dt_secs` of movement at simulation second `now_secs`.
pub fn step_agent(
    agent: &mut AgentState,
    graph: &RegionGraph,
    config: &AgentsConfig,
    dt_secs: f64,
    now_secs: f64,
    now: DateTime<Utc>,
) -> MovementEvent {
    let Some(target) = agent.target.clone() else {
        return MovementEvent::Idle;
    };

    if now_secs - target.started_at > config.target_reach_timeout_secs {
        debug!(
            agent = %agent.name(),
            action_id = %target.action_id,
            "target not reached in time, giving up"
        );
        agent.target = None;
        agent.movement_state = MovementState::StayStill;
        return MovementEvent::TimedOut;
    }

    let speed = match agent.movement_state {
        MovementState::Sprint => config.sprint_speed,
        MovementState::Walk | MovementState::StayStill => config.walk_speed,
    };
    if agent.movement_state != MovementState::StayStill {
        agent.is_crouching = false;
    }

    let from = agent.position;
    let next = from.step_towards(target.location, speed * agent.speed_multiplier * dt_secs);
    if let Some(forward) = heading(from, next) {
        agent.forward = forward;
    }
    agent.position = next;
    agent.update_region(graph);

    if in_exit_region(agent, graph) {
        info!(agent = %agent.name(), "escaped into exit region");
        agent.escape();
        return MovementEvent::Escaped;
    }

    if agent.position.horizontal_distance(target.location) <= config.target_reach_threshold {
        agent.target = None;
        agent.movement_state = MovementState::StayStill;
        match target.action_type {
            ActionType::MoveToExit => {
                info!(agent = %agent.name(), exit = %target.action_id, "escaped through exit");
                agent.escape();
                return MovementEvent::Escaped;
            }
            ActionType::MoveToHideSpot => {
                if !agent.is_crouching {
                    agent.is_crouching = true;
                    agent.push_event(PendingEvent::found_hiding_spot(now));
                }
            }
            _ => {}
        }
        return MovementEvent::Reached {
            action_type: target.action_type,
            action_id: target.action_id,
        };
    }

    MovementEvent::Moving
}

/// Whether the agent stands inside a region flagged as an exit.
pub fn in_exit_region(agent: &AgentState, graph: &RegionGraph) -> bool {
    graph
        .region_containing(agent.position)
        .is_some_and(|region| region.is_exit)
}

/// Unit horizontal vector from `from` to `to`, if they differ.
fn heading(from: Point3, to: Point3) -> Option<Point3> {
    let length = from.horizontal_distance(to);
    (length > f64::EPSILON).then(|| Point3::new((to.x - from.x) / length, 0.0, (to.z - from.z) / length))
}

#[cfg(test)]
mod tests {
    use evac_core::agent::MovementTarget;
    use evac_types::{
        AgentTraits, Bounds, FamiliarityLevel, FinalStatus, Persona, ShooterPerceptionLevel,
        TrainingLevel,
    };
    use evac_world::Region;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn graph() -> RegionGraph {
        let mut graph = RegionGraph::new();
        let room = |id: &str, x: f64| {
            Region::new(
                id,
                id,
                Bounds::from_center_size(Point3::new(x, 1.5, 0.0), Point3::new(10.0, 3.0, 10.0)),
            )
        };
        let _ = graph.add_region(room("a", 0.0).with_neighbors(["b"]));
        let _ = graph.add_region(room("b", 10.0).with_neighbors(["a", "yard"]));
        let _ = graph.add_region(room("yard", 20.0).with_neighbors(["b"]).as_exit());
        graph
    }

    fn agent(target: Point3, action_type: ActionType, movement: MovementState) -> AgentState {
        let mut agent = AgentState::new(
            Persona {
                name: "Kai Lee".to_owned(),
                ..Persona::default()
            },
            AgentTraits {
                training_level: TrainingLevel::Low,
                familiarity_level: FamiliarityLevel::Low,
                shooter_perception_level: ShooterPerceptionLevel::Direct,
            },
            None,
            3,
            Point3::ZERO,
        );
        agent.movement_state = movement;
        agent.target = Some(MovementTarget {
            location: target,
            action_type,
            action_id: "target".to_owned(),
            started_at: 0.0,
        });
        agent
    }

    fn config() -> AgentsConfig {
        AgentsConfig {
            walk_speed: 2.0,
            sprint_speed: 4.0,
            ..AgentsConfig::default()
        }
    }

    #[test]
    fn walks_towards_target_and_faces_it() {
        let graph = graph();
        let mut agent = agent(Point3::new(4.0, 0.0, 0.0), ActionType::MoveToRegion, MovementState::Walk);
        let event = step_agent(&mut agent, &graph, &config(), 1.0, 1.0, Utc::now());
        assert_eq!(event, MovementEvent::Moving);
        assert!((agent.position.x - 2.0).abs() < 1e-9);
        assert!((agent.forward.x - 1.0).abs() < 1e-9);
        assert_eq!(agent.current_region.as_deref(), Some("a"));
    }

    #[test]
    fn sprint_is_faster_and_uncrouches() {
        let graph = graph();
        let mut agent = agent(Point3::new(4.0, 0.0, 0.0), ActionType::MoveToRegion, MovementState::Sprint);
        agent.is_crouching = true;
        let event = step_agent(&mut agent, &graph, &config(), 1.0, 1.0, Utc::now());
        assert!(matches!(event, MovementEvent::Reached { .. }));
        assert!(!agent.is_crouching);
        assert!(agent.target.is_none());
        assert_eq!(agent.movement_state, MovementState::StayStill);
    }

    #[test]
    fn reaching_hide_spot_crouches_once() {
        let graph = graph();
        let mut agent = agent(Point3::new(0.3, 0.0, 0.0), ActionType::MoveToHideSpot, MovementState::Walk);
        let event = step_agent(&mut agent, &graph, &config(), 0.1, 1.0, Utc::now());
        assert!(matches!(event, MovementEvent::Reached { action_type: ActionType::MoveToHideSpot, .. }));
        assert!(agent.is_crouching);
        assert_eq!(agent.pending_events.len(), 1);
    }

    #[test]
    fn reaching_exit_point_escapes() {
        let graph = graph();
        let mut agent = agent(Point3::new(0.2, 0.0, 0.0), ActionType::MoveToExit, MovementState::Walk);
        let event = step_agent(&mut agent, &graph, &config(), 0.1, 1.0, Utc::now());
        assert_eq!(event, MovementEvent::Escaped);
        assert_eq!(agent.final_status, FinalStatus::Escaped);
    }

    #[test]
    fn entering_exit_region_escapes() {
        let graph = graph();
        let mut agent = agent(Point3::new(30.0, 0.0, 0.0), ActionType::MoveToRegion, MovementState::Walk);
        agent.position = Point3::new(14.5, 0.0, 0.0);
        let event = step_agent(&mut agent, &graph, &config(), 1.0, 1.0, Utc::now());
        assert_eq!(event, MovementEvent::Escaped);
        assert!(!agent.is_active());
    }

    #[test]
    fn reaching_target_inside_exit_region_escapes() {
        let graph = graph();
        let mut agent = agent(Point3::new(15.6, 0.0, 0.0), ActionType::MoveToRegion, MovementState::Walk);
        agent.position = Point3::new(14.9, 0.0, 0.0);
        let event = step_agent(&mut agent, &graph, &config(), 0.2, 1.0, Utc::now());
        assert_eq!(event, MovementEvent::Escaped);
        assert_eq!(agent.final_status, FinalStatus::Escaped);
    }

    #[test]
    fn target_times_out() {
        let graph = graph();
        let mut agent = agent(Point3::new(4.0, 0.0, 0.0), ActionType::MoveToRegion, MovementState::Walk);
        let event = step_agent(&mut agent, &graph, &config(), 1.0, 11.0, Utc::now());
        assert_eq!(event, MovementEvent::TimedOut);
        assert!(agent.target.is_none());
        assert_eq!(agent.position, Point3::ZERO);
    }

    #[test]
    fn no_target_is_idle() {
        let graph = graph();
        let mut agent = agent(Point3::ZERO, ActionType::StayStill, MovementState::StayStill);
        agent.target = None;
        assert_eq!(
            step_agent(&mut agent, &graph, &config(), 1.0, 1.0, Utc::now()),
            MovementEvent::Idle
        );
    }

    #[test]
    fn speed_multiplier_in_range() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let m = random_speed_multiplier(&mut rng);
            assert!((1.0..1.5).contains(&m));
        }
    }
}

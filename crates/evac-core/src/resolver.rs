//! Turning a chosen action id into a concrete [`Action`].
//!
//! The id is matched in a fixed order and the first match wins:
//!
//! 1. `stay_still`
//! 2. `fight_the_shooter`, targeting the shooter's position
//! 3. a region key, targeting a random padded point inside the region
//! 4. a `hide_spot_` id, targeting the spot (which the agent claims)
//! 5. an `exit_` id, targeting the exit point
//! 6. anything else, read as a person id and targeting that peer
//!
//! An id outside the observation's available actions is replaced by
//! `stay_still`. A branch that finds no target logs an error and leaves
//! the agent stationary for the cycle.

use evac_types::{
    Action, ActionType, DecisionAction, EXIT_PREFIX, FIGHT_THE_SHOOTER_ACTION_ID,
    HIDE_SPOT_PREFIX, MovementState, Observation, Point3, STAY_STILL_ACTION_ID,
};
use evac_world::WorldError;
use rand::Rng;
use tracing::{error, warn};

use crate::agent::AgentState;
use crate::observation::WorldView;

/// Result of resolving one decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The concrete action.
    pub action: Action,
    /// The id that was resolved, after substitution.
    pub action_id: String,
    /// Whether the requested id was illegal and replaced by `stay_still`.
    pub substituted: bool,
}

/// Category an action id falls into, by the resolution precedence.
pub fn classify(action_id: &str, view: &WorldView<'_>) -> ActionType {
    if action_id == STAY_STILL_ACTION_ID {
        ActionType::StayStill
    } else if action_id == FIGHT_THE_SHOOTER_ACTION_ID {
        ActionType::FightShooter
    } else if view.graph.contains(action_id) {
        ActionType::MoveToRegion
    } else if action_id.starts_with(HIDE_SPOT_PREFIX) {
        ActionType::MoveToHideSpot
    } else if action_id.starts_with(EXIT_PREFIX) {
        ActionType::MoveToExit
    } else {
        ActionType::MoveToPerson
    }
}

/// Resolve `decision` for `agent` against the observation it answered.
///
/// Moving anywhere other than a hiding spot releases whatever spot the
/// agent holds. Staying still keeps it.
pub fn resolve_action<R: Rng + ?Sized>(
    agent: &AgentState,
    decision: &DecisionAction,
    observation: &Observation,
    view: &WorldView<'_>,
    region_padding: f64,
    rng: &mut R,
) -> Resolution {
    let requested = decision.action_id.trim();
    let (action_id, substituted) = if observation.is_action_available(requested) {
        (requested.to_owned(), false)
    } else {
        warn!(
            agent = %agent.name(),
            action_id = requested,
            "action id not offered, staying still"
        );
        (STAY_STILL_ACTION_ID.to_owned(), true)
    };

    let action_type = classify(&action_id, view);
    let target = match action_type {
        ActionType::StayStill => None,
        ActionType::FightShooter => view.shooter_position,
        ActionType::MoveToRegion => view.graph.random_point_in(&action_id, region_padding, rng),
        ActionType::MoveToHideSpot => claim_hide_spot(agent, &action_id, view),
        ActionType::MoveToExit => view.points.location_of(&action_id),
        ActionType::MoveToPerson => view.peer(&action_id).map(|p| p.position),
    };

    if action_type != ActionType::StayStill {
        if target.is_none() {
            error!(
                agent = %agent.name(),
                action_id = %action_id,
                action_type = %action_type,
                "no target for action, staying in place"
            );
        }
        if action_type != ActionType::MoveToHideSpot {
            view.points.release_all(agent.id);
        }
    }

    let movement_state = match (action_type, target) {
        (ActionType::StayStill, _) => decision.movement_state(),
        (_, Some(_)) => MovementState::Walk,
        (_, None) => MovementState::StayStill,
    };

    Resolution {
        action: Action {
            action_type,
            target_location: target,
            utterance: decision.utterance.clone(),
            vocal_mode: decision.vocal_mode(),
            movement_state,
        },
        action_id,
        substituted,
    }
}

/// Claim `spot_id` for `agent` and return its location, or `None` if
/// another agent holds it or it does not exist.
fn claim_hide_spot(agent: &AgentState, spot_id: &str, view: &WorldView<'_>) -> Option<Point3> {
    let location = view.points.location_of(spot_id)?;
    match view.points.try_claim(spot_id, agent.id, agent.name()) {
        Ok(()) => {
            for other in view.points.iter().filter(|p| p.id != spot_id) {
                view.points.release(&other.id, agent.id);
            }
            Some(location)
        }
        Err(WorldError::AlreadyClaimed { occupant, .. }) => {
            warn!(
                agent = %agent.name(),
                spot = spot_id,
                occupant = %occupant,
                "hiding spot already taken"
            );
            None
        }
        Err(e) => {
            warn!(agent = %agent.name(), spot = spot_id, error = %e, "failed to claim hiding spot");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use evac_types::{
        AgentTraits, Bounds, FamiliarityLevel, HealthStatus, Persona, ShooterPerceptionLevel,
        TrainingLevel, VocalMode,
    };
    use evac_world::{InterestPoint, InterestPointIndex, Region, RegionGraph};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::dialog::DialogLog;
    use crate::observation::PeerView;

    fn world() -> (RegionGraph, InterestPointIndex) {
        let mut graph = RegionGraph::new();
        let room = |id: &str, x: f64| {
            Region::new(
                id,
                id,
                Bounds::from_center_size(Point3::new(x, 1.5, 0.0), Point3::new(10.0, 3.0, 10.0)),
            )
        };
        let _ = graph.add_region(room("a", 0.0).with_neighbors(["b"]));
        let _ = graph.add_region(room("b", 10.0).with_neighbors(["a"]).as_exit());
        let mut points = InterestPointIndex::new();
        let _ = points.add(InterestPoint::hide_spot("hide_spot_desk", "Desk", Point3::new(1.0, 0.5, 1.0)));
        let _ = points.add(InterestPoint::hide_spot("hide_spot_closet", "Closet", Point3::new(-2.0, 0.5, 1.0)));
        let _ = points.add(InterestPoint::exit("exit_b", "Door", Point3::new(12.0, 0.5, 0.0)));
        (graph, points)
    }

    fn agent(name: &str) -> AgentState {
        AgentState::new(
            Persona {
                name: name.to_owned(),
                ..Persona::default()
            },
            AgentTraits {
                training_level: TrainingLevel::High,
                familiarity_level: FamiliarityLevel::High,
                shooter_perception_level: ShooterPerceptionLevel::Direct,
            },
            None,
            3,
            Point3::ZERO,
        )
    }

    fn decision(action_id: &str, movement: &str) -> DecisionAction {
        DecisionAction {
            vocal_mode: "whisper".to_owned(),
            utterance: "Over here".to_owned(),
            movement: movement.to_owned(),
            action_id: action_id.to_owned(),
        }
    }

    fn offered(ids: &[&str]) -> Observation {
        Observation {
            available_action_ids: ids.iter().map(|s| (*s).to_owned()).collect(),
            ..Observation::default()
        }
    }

    struct Fixture {
        graph: RegionGraph,
        points: InterestPointIndex,
        dialog: DialogLog,
        peers: Vec<PeerView>,
    }

    impl Fixture {
        fn new() -> Self {
            let (graph, points) = world();
            let peers = vec![PeerView {
                id: evac_types::AgentId::new(),
                name: "Bo Park".to_owned(),
                person_id: "bo_park".to_owned(),
                position: Point3::new(3.0, 0.0, 3.0),
                health_status: HealthStatus::Injured,
            }];
            Self {
                graph,
                points,
                dialog: DialogLog::new(),
                peers,
            }
        }

        fn view(&self) -> WorldView<'_> {
            WorldView {
                graph: &self.graph,
                points: &self.points,
                dialog: &self.dialog,
                peers: &self.peers,
                shooter_position: Some(Point3::new(4.0, 0.5, -4.0)),
                shooting_started: true,
                now_secs: 0.0,
            }
        }
    }

    #[test]
    fn classification_follows_precedence() {
        let fx = Fixture::new();
        let view = fx.view();
        assert_eq!(classify("stay_still", &view), ActionType::StayStill);
        assert_eq!(classify("fight_the_shooter", &view), ActionType::FightShooter);
        assert_eq!(classify("b", &view), ActionType::MoveToRegion);
        assert_eq!(classify("hide_spot_desk", &view), ActionType::MoveToHideSpot);
        assert_eq!(classify("exit_b", &view), ActionType::MoveToExit);
        assert_eq!(classify("bo_park", &view), ActionType::MoveToPerson);
    }

    #[test]
    fn illegal_id_becomes_stay_still() {
        let fx = Fixture::new();
        let me = agent("Ann Lee");
        let mut rng = StdRng::seed_from_u64(0);
        let res = resolve_action(
            &me,
            &decision("teleport", "sprint"),
            &offered(&["stay_still", "b"]),
            &fx.view(),
            0.7,
            &mut rng,
        );
        assert!(res.substituted);
        assert_eq!(res.action_id, "stay_still");
        assert_eq!(res.action.action_type, ActionType::StayStill);
        assert!(res.action.target_location.is_none());
    }

    #[test]
    fn stay_still_keeps_requested_movement() {
        let fx = Fixture::new();
        let me = agent("Ann Lee");
        let mut rng = StdRng::seed_from_u64(0);
        let res = resolve_action(
            &me,
            &decision("stay_still", "stay_still"),
            &offered(&["stay_still"]),
            &fx.view(),
            0.7,
            &mut rng,
        );
        assert_eq!(res.action.movement_state, MovementState::StayStill);
        assert_eq!(res.action.vocal_mode, VocalMode::Whisper);
        assert_eq!(res.action.utterance, "Over here");
    }

    #[test]
    fn region_target_is_inside_padded_bounds_and_walks() {
        let fx = Fixture::new();
        let me = agent("Ann Lee");
        let mut rng = StdRng::seed_from_u64(0);
        let res = resolve_action(
            &me,
            &decision("b", "sprint"),
            &offered(&["stay_still", "b"]),
            &fx.view(),
            0.7,
            &mut rng,
        );
        assert_eq!(res.action.action_type, ActionType::MoveToRegion);
        assert_eq!(res.action.movement_state, MovementState::Walk);
        let Some(target) = res.action.target_location else {
            panic!("region target expected");
        };
        let inner = fx.graph.get("b").map(|r| r.bounds.padded(0.7));
        assert!(inner.is_some_and(|b| b.contains(target)));
    }

    #[test]
    fn fight_targets_the_shooter() {
        let fx = Fixture::new();
        let me = agent("Ann Lee");
        let mut rng = StdRng::seed_from_u64(0);
        let res = resolve_action(
            &me,
            &decision("fight_the_shooter", "sprint"),
            &offered(&["stay_still", "fight_the_shooter"]),
            &fx.view(),
            0.7,
            &mut rng,
        );
        assert_eq!(res.action.action_type, ActionType::FightShooter);
        assert_eq!(res.action.target_location, Some(Point3::new(4.0, 0.5, -4.0)));
    }

    #[test]
    fn person_and_exit_targets() {
        let fx = Fixture::new();
        let me = agent("Ann Lee");
        let mut rng = StdRng::seed_from_u64(0);
        let ids = offered(&["stay_still", "exit_b", "bo_park"]);

        let exit = resolve_action(&me, &decision("exit_b", "walk"), &ids, &fx.view(), 0.7, &mut rng);
        assert_eq!(exit.action.action_type, ActionType::MoveToExit);
        assert_eq!(exit.action.target_location, Some(Point3::new(12.0, 0.5, 0.0)));

        let person = resolve_action(&me, &decision("bo_park", "walk"), &ids, &fx.view(), 0.7, &mut rng);
        assert_eq!(person.action.action_type, ActionType::MoveToPerson);
        assert_eq!(person.action.target_location, Some(Point3::new(3.0, 0.0, 3.0)));
    }

    #[test]
    fn missing_peer_leaves_agent_stationary() {
        let fx = Fixture::new();
        let me = agent("Ann Lee");
        let mut rng = StdRng::seed_from_u64(0);
        let res = resolve_action(
            &me,
            &decision("gone_person", "walk"),
            &offered(&["stay_still", "gone_person"]),
            &fx.view(),
            0.7,
            &mut rng,
        );
        assert_eq!(res.action.action_type, ActionType::MoveToPerson);
        assert!(res.action.target_location.is_none());
        assert_eq!(res.action.movement_state, MovementState::StayStill);
    }

    #[test]
    fn hide_spot_claims_are_exclusive_and_released_on_leaving() {
        let fx = Fixture::new();
        let ann = agent("Ann Lee");
        let bo = agent("Bo Park");
        let mut rng = StdRng::seed_from_u64(0);
        let ids = offered(&["stay_still", "hide_spot_desk", "hide_spot_closet", "b"]);

        let first = resolve_action(&ann, &decision("hide_spot_desk", "walk"), &ids, &fx.view(), 0.7, &mut rng);
        assert_eq!(first.action.target_location, Some(Point3::new(1.0, 0.5, 1.0)));
        assert_eq!(fx.points.occupant_of("hide_spot_desk").as_deref(), Some("Ann Lee"));

        let taken = resolve_action(&bo, &decision("hide_spot_desk", "walk"), &ids, &fx.view(), 0.7, &mut rng);
        assert!(taken.action.target_location.is_none());

        // Staying still keeps the spot.
        let _ = resolve_action(&ann, &decision("stay_still", "stay_still"), &ids, &fx.view(), 0.7, &mut rng);
        assert_eq!(fx.points.occupant_of("hide_spot_desk").as_deref(), Some("Ann Lee"));

        // Switching spots moves the claim.
        let _ = resolve_action(&ann, &decision("hide_spot_closet", "walk"), &ids, &fx.view(), 0.7, &mut rng);
        assert!(fx.points.occupant_of("hide_spot_desk").is_none());
        assert_eq!(fx.points.occupant_of("hide_spot_closet").as_deref(), Some("Ann Lee"));

        // Leaving for a region releases it.
        let _ = resolve_action(&ann, &decision("b", "walk"), &ids, &fx.view(), 0.7, &mut rng);
        assert!(fx.points.occupant_of("hide_spot_closet").is_none());
    }
}

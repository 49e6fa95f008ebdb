//! Mutable per-agent state.
//!
//! [`AgentState`] is owned by the simulation loop. The cognition loop
//! never holds it across the reasoning-service call; it works from an
//! [`Observation`](evac_types::Observation) snapshot and applies the
//! result only if the agent is still live when the response arrives.

use chrono::{DateTime, Utc};
use evac_types::{
    ActionType, AgentId, AgentTraits, FinalStatus, HealthStatus, MemoryLog, MovementState,
    PendingEvent, Persona, Point3, ShooterInfo, ShooterPerceptionLevel,
};
use evac_world::RegionGraph;
use tracing::debug;

/// Where an agent is walking to and why.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementTarget {
    /// Destination.
    pub location: Point3,
    /// The action that produced this target.
    pub action_type: ActionType,
    /// Action id the target came from, e.g. a hide spot id.
    pub action_id: String,
    /// Simulation time the movement started, in seconds.
    pub started_at: f64,
}

/// Outcome of one hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// The agent was crouched in cover; nothing happened.
    Ignored,
    /// Health dropped but the agent lives.
    Injured,
    /// Health reached zero.
    Killed,
}

/// Everything the simulation tracks about one civilian.
#[derive(Debug, Clone)]
pub struct AgentState {
    /// Unique id for this run.
    pub id: AgentId,
    /// Assigned persona.
    pub persona: Persona,
    /// Assigned trait levels.
    pub traits: AgentTraits,
    /// Forced behavior instruction, explicit mode only.
    pub instruction: Option<String>,
    /// Free-text mood, replaced after every decision.
    pub mood: String,
    /// Semantic memory.
    pub memory: MemoryLog,
    /// Current movement state.
    pub movement_state: MovementState,
    /// Remaining health points.
    pub health: u32,
    /// Visible condition.
    pub health_status: HealthStatus,
    /// Events waiting for the next observation.
    pub pending_events: Vec<PendingEvent>,
    /// World position.
    pub position: Point3,
    /// Unit facing vector on the horizontal plane.
    pub forward: Point3,
    /// Last region the agent was known to be in.
    pub current_region: Option<String>,
    /// Crouched in cover.
    pub is_crouching: bool,
    /// Per-agent speed factor.
    pub speed_multiplier: f64,
    /// Pending movement, if any.
    pub target: Option<MovementTarget>,
    /// The most recent threat descriptor delivered to this agent.
    pub last_shooter_info: Option<ShooterInfo>,
    /// How the run ended for this agent, if it has.
    pub final_status: FinalStatus,
}

impl AgentState {
    /// Spawn an agent with starting `health` at `position`.
    pub fn new(
        persona: Persona,
        traits: AgentTraits,
        instruction: Option<String>,
        health: u32,
        position: Point3,
    ) -> Self {
        Self {
            id: AgentId::new(),
            persona,
            traits,
            instruction,
            mood: "neutral".to_owned(),
            memory: MemoryLog::new(),
            movement_state: MovementState::StayStill,
            health,
            health_status: HealthStatus::Alive,
            pending_events: Vec::new(),
            position,
            forward: Point3::new(0.0, 0.0, 1.0),
            current_region: None,
            is_crouching: false,
            speed_multiplier: 1.0,
            target: None,
            last_shooter_info: None,
            final_status: FinalStatus::Alive,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.persona.name
    }

    /// Identifier other agents use to target this one.
    pub fn person_id(&self) -> String {
        self.persona.person_id()
    }

    /// Not dead and still in the building.
    pub fn is_active(&self) -> bool {
        self.health_status != HealthStatus::Dead && self.final_status == FinalStatus::Alive
    }

    /// Whether the agent is aware of the shooting once it has begun.
    pub fn observes_shooter(&self, shooting_started: bool) -> bool {
        shooting_started
            && self.traits.shooter_perception_level != ShooterPerceptionLevel::Unaware
    }

    /// Queue an event for the next observation.
    pub fn push_event(&mut self, event: PendingEvent) {
        self.pending_events.push(event);
    }

    /// Take every pending event, leaving the queue empty.
    pub fn drain_events(&mut self) -> Vec<PendingEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Append a memory.
    pub fn remember(&mut self, time: DateTime<Utc>, description: impl Into<String>) {
        self.memory.push(time, description);
    }

    /// Refresh [`current_region`](Self::current_region) from the position.
    ///
    /// Outside every region the last known region is kept.
    pub fn update_region(&mut self, graph: &RegionGraph) {
        match graph.region_containing(self.position) {
            Some(region) => {
                if self.current_region.as_deref() != Some(region.id.as_str()) {
                    debug!(agent = %self.persona.name, region = %region.id, "entered region");
                    self.current_region = Some(region.id.clone());
                }
            }
            None => {
                debug!(agent = %self.persona.name, position = %self.position, "outside all regions");
            }
        }
    }

    /// Apply one hit. Crouched agents are in cover and take no damage.
    pub fn take_damage(&mut self, timestamp: DateTime<Utc>) -> DamageOutcome {
        if self.is_crouching || !self.is_active() {
            return DamageOutcome::Ignored;
        }
        self.health = self.health.saturating_sub(1);
        self.push_event(PendingEvent::got_shot(timestamp));
        if self.health == 0 {
            self.health_status = HealthStatus::Dead;
            self.final_status = FinalStatus::Dead;
            self.target = None;
            DamageOutcome::Killed
        } else {
            self.health_status = HealthStatus::Injured;
            DamageOutcome::Injured
        }
    }

    /// Mark the agent as having left the building.
    pub fn escape(&mut self) {
        self.final_status = FinalStatus::Escaped;
        self.target = None;
        self.movement_state = MovementState::StayStill;
    }
}

#[cfg(test)]
mod tests {
    use evac_types::{FamiliarityLevel, TrainingLevel};

    use super::*;

    fn agent(perception: ShooterPerceptionLevel, health: u32) -> AgentState {
        AgentState::new(
            Persona {
                name: "Jane Doe".to_owned(),
                ..Persona::default()
            },
            AgentTraits {
                training_level: TrainingLevel::Low,
                familiarity_level: FamiliarityLevel::Low,
                shooter_perception_level: perception,
            },
            None,
            health,
            Point3::ZERO,
        )
    }

    #[test]
    fn new_agent_defaults() {
        let a = agent(ShooterPerceptionLevel::Direct, 2);
        assert_eq!(a.mood, "neutral");
        assert_eq!(a.movement_state, MovementState::StayStill);
        assert_eq!(a.person_id(), "jane_doe");
        assert!(a.is_active());
        assert!(a.memory.is_empty());
    }

    #[test]
    fn unaware_agents_never_observe_the_shooter() {
        assert!(!agent(ShooterPerceptionLevel::Unaware, 1).observes_shooter(true));
        assert!(agent(ShooterPerceptionLevel::Vague, 1).observes_shooter(true));
        assert!(!agent(ShooterPerceptionLevel::Direct, 1).observes_shooter(false));
    }

    #[test]
    fn damage_injures_then_kills() {
        let now = Utc::now();
        let mut a = agent(ShooterPerceptionLevel::Direct, 2);
        assert_eq!(a.take_damage(now), DamageOutcome::Injured);
        assert_eq!(a.health_status, HealthStatus::Injured);
        assert_eq!(a.pending_events.len(), 1);
        assert_eq!(a.take_damage(now), DamageOutcome::Killed);
        assert_eq!(a.health, 0);
        assert_eq!(a.final_status, FinalStatus::Dead);
        assert!(!a.is_active());
        assert_eq!(a.take_damage(now), DamageOutcome::Ignored);
    }

    #[test]
    fn crouching_ignores_damage() {
        let mut a = agent(ShooterPerceptionLevel::Direct, 1);
        a.is_crouching = true;
        assert_eq!(a.take_damage(Utc::now()), DamageOutcome::Ignored);
        assert_eq!(a.health, 1);
        assert!(a.pending_events.is_empty());
    }

    #[test]
    fn drain_empties_the_queue() {
        let mut a = agent(ShooterPerceptionLevel::Direct, 1);
        a.push_event(PendingEvent::gunshot(Utc::now()));
        assert_eq!(a.drain_events().len(), 1);
        assert!(a.drain_events().is_empty());
    }

    #[test]
    fn escape_marks_final_status() {
        let mut a = agent(ShooterPerceptionLevel::Direct, 1);
        a.escape();
        assert_eq!(a.final_status, FinalStatus::Escaped);
        assert!(!a.is_active());
    }
}

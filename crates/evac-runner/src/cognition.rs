//! Per-agent cognition loop: observation to prompt to decision to action.
//!
//! Each agent moves through a small state machine:
//!
//! ```text
//! Idle -> BuildingObservation -> AwaitingDecision -> ResolvingAction -> Idle
//!                                                          |
//!                                     stay still -> Cooldown -> Idle
//!                                     target set -> MovingToTarget -> Idle
//! ```
//!
//! While an agent holds a movement target it is moved instead of being
//! asked again. While a call is in flight the agent is skipped, so there
//! is at most one reasoning call per agent. Every call carries a
//! generation number. A reply whose generation no longer matches (the
//! agent died, escaped, or was reset) is discarded without touching the
//! agent.
//!
//! Reasoning failures never escape this module: timeouts, transport
//! errors, and schema violations all degrade to the stay-still fallback
//! with mood and memory left as they were.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use evac_core::agent::{AgentState, MovementTarget};
use evac_core::config::PromptConfig;
use evac_core::decision::{ChatMessage, ReasoningRequest, ReasoningService};
use evac_core::observation::WorldView;
use evac_core::resolver::{Resolution, resolve_action};
use evac_types::{
    Action, AgentId, DecisionResponse, FamiliarityLevel, Observation, STAY_STILL_ACTION_ID,
    TrainingLevel,
};
use evac_world::DEFAULT_REGION_PADDING;
use rand::Rng;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::cost::CostTracker;
use crate::error::RunnerError;
use crate::parse::parse_decision;
use crate::prompt::{PromptEngine, SystemPromptContext, handbook_text};

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Where an agent is in its decision cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CognitionState {
    /// Ready for a new cycle.
    Idle,
    /// Assembling the observation and prompts.
    BuildingObservation,
    /// A reasoning call is in flight.
    AwaitingDecision,
    /// Applying a reply.
    ResolvingAction,
    /// Dwelling after a stay-still decision.
    Cooldown {
        /// Simulation second the dwell ends.
        until_secs: f64,
    },
    /// Walking to a target; the loop is preempted.
    MovingToTarget,
}

impl CognitionState {
    /// Short label for logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::BuildingObservation => "building_observation",
            Self::AwaitingDecision => "awaiting_decision",
            Self::ResolvingAction => "resolving_action",
            Self::Cooldown { .. } => "cooldown",
            Self::MovingToTarget => "moving_to_target",
        }
    }
}

/// What the tick loop should do with an agent this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStep {
    /// Nothing: a call is in flight or the agent is dwelling.
    Wait,
    /// Advance the agent toward its target.
    Move,
    /// Build an observation and ask for a decision.
    Decide,
}

// ---------------------------------------------------------------------------
// Conversation window
// ---------------------------------------------------------------------------

/// Rolling window of prior (user, assistant) turns sent with each request.
///
/// Holds at most `turn_limit` pairs; the oldest pair is evicted first.
#[derive(Debug, Clone)]
pub struct ConversationWindow {
    turn_limit: usize,
    turns: VecDeque<(String, String)>,
}

impl ConversationWindow {
    /// An empty window keeping `turn_limit` pairs.
    pub const fn new(turn_limit: usize) -> Self {
        Self {
            turn_limit,
            turns: VecDeque::new(),
        }
    }

    /// Append a completed turn, evicting the oldest beyond the limit.
    pub fn record(&mut self, user: String, assistant: String) {
        self.turns.push_back((user, assistant));
        while self.turns.len() > self.turn_limit {
            self.turns.pop_front();
        }
    }

    /// System message, prior turns, then the new user message.
    pub fn messages(&self, system: &str, user: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.turns.len().saturating_mul(2).saturating_add(2));
        messages.push(ChatMessage::system(system));
        for (prior_user, prior_assistant) in &self.turns {
            messages.push(ChatMessage::user(prior_user.as_str()));
            messages.push(ChatMessage::assistant(prior_assistant.as_str()));
        }
        messages.push(ChatMessage::user(user));
        messages
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Rendered prompts for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePrompts {
    /// System message.
    pub system: String,
    /// User message.
    pub user: String,
}

/// Render the system and user prompts for `agent` answering `observation`.
///
/// Threat rules, the handbook, the building map, and the forced behavior
/// block appear only once the agent perceives the shooter.
pub fn compose_prompts(
    engine: &PromptEngine,
    agent: &AgentState,
    observation: &Observation,
    view: &WorldView<'_>,
    prompt: &PromptConfig,
    building: &str,
    now: DateTime<Utc>,
) -> Result<CyclePrompts, RunnerError> {
    let familiar = agent.traits.familiarity_level == FamiliarityLevel::High;
    let building_map = if familiar {
        agent.current_region.as_deref().map(|region| {
            format!(
                "{}{}",
                view.graph.building_map(region, agent.position),
                view.graph.nearest_exit_summary(region, agent.position)
            )
        })
    } else {
        None
    };

    let system = engine.render_system(&SystemPromptContext {
        building,
        observes_shooter: agent.observes_shooter(view.shooting_started),
        well_trained: agent.traits.training_level == TrainingLevel::High,
        familiar,
        behavior_instruction: agent.instruction.as_deref().filter(|i| !i.trim().is_empty()),
        handbook: handbook_text(prompt.handbook_tier),
        building_map,
    })?;
    let user = engine.render_user(
        &agent.persona.to_markdown(),
        &agent.memory.to_markdown(now),
        &observation.to_markdown(),
    )?;

    Ok(CyclePrompts { system, user })
}

// ---------------------------------------------------------------------------
// Decision call
// ---------------------------------------------------------------------------

/// A reply that matched the decision schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    /// The decision.
    pub decision: DecisionResponse,
    /// Raw reply text, kept for the conversation window and transcript.
    pub raw: String,
}

/// One outstanding call, handed to a decision task.
#[derive(Debug, Clone)]
pub struct DecisionTicket {
    /// Agent the call is for.
    pub agent: AgentId,
    /// Generation the reply must match.
    pub generation: u64,
    /// What to send.
    pub request: ReasoningRequest,
}

/// What a decision task reports back.
#[derive(Debug)]
pub struct DecisionOutcome {
    /// Agent the call was for.
    pub agent: AgentId,
    /// Generation of the call.
    pub generation: u64,
    /// Parsed reply or the reason there is none.
    pub result: Result<ParsedReply, RunnerError>,
}

/// Call the service under `deadline` and parse the reply.
///
/// Usage is recorded for every reply that arrives, parseable or not.
pub async fn request_decision<S: ReasoningService>(
    service: &S,
    request: &ReasoningRequest,
    deadline: Duration,
    costs: &CostTracker,
) -> Result<ParsedReply, RunnerError> {
    match timeout(deadline, service.decide(request)).await {
        Ok(Ok(reply)) => {
            costs.record(&reply.model, &reply.usage);
            let decision = parse_decision(&reply.content)?;
            Ok(ParsedReply {
                decision,
                raw: reply.content,
            })
        }
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(RunnerError::Timeout {
            deadline_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

// ---------------------------------------------------------------------------
// Per-agent cognition
// ---------------------------------------------------------------------------

/// The cycle in flight.
#[derive(Debug, Clone)]
struct PendingCycle {
    observation: Observation,
    prompts: CyclePrompts,
}

/// What one finished cycle produced, for logging.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// The observation the agent answered.
    pub observation: Observation,
    /// The resolved action.
    pub resolution: Resolution,
    /// The agent's stated reasoning, empty on fallback.
    pub thought: String,
    /// Memory text appended this cycle, empty on fallback.
    pub memory: String,
    /// Prompts sent.
    pub prompts: CyclePrompts,
    /// Raw reply, if one arrived.
    pub raw_reply: Option<String>,
    /// Why the stay-still fallback was used, if it was.
    pub failure: Option<String>,
}

/// Cognition state for one agent.
#[derive(Debug, Clone)]
pub struct AgentCognition {
    state: CognitionState,
    window: ConversationWindow,
    generation: u64,
    pending: Option<PendingCycle>,
}

impl AgentCognition {
    /// Fresh cognition keeping `turn_limit` prior turns.
    pub const fn new(turn_limit: usize) -> Self {
        Self {
            state: CognitionState::Idle,
            window: ConversationWindow::new(turn_limit),
            generation: 0,
            pending: None,
        }
    }

    /// Current state.
    pub const fn state(&self) -> CognitionState {
        self.state
    }

    /// Decide what the tick loop does with this agent at `now_secs`.
    pub fn next_step(&mut self, agent: &AgentState, now_secs: f64) -> TickStep {
        match self.state {
            CognitionState::AwaitingDecision
            | CognitionState::BuildingObservation
            | CognitionState::ResolvingAction => return TickStep::Wait,
            CognitionState::Cooldown { until_secs } if now_secs < until_secs => {
                return TickStep::Wait;
            }
            _ => {}
        }
        if agent.target.is_some() {
            self.state = CognitionState::MovingToTarget;
            TickStep::Move
        } else {
            self.state = CognitionState::BuildingObservation;
            TickStep::Decide
        }
    }

    /// The target was reached or abandoned; the agent may decide again.
    pub fn target_finished(&mut self) {
        if self.state == CognitionState::MovingToTarget {
            self.state = CognitionState::Idle;
        }
    }

    /// Start a reasoning call for the observation the agent will answer.
    pub fn begin_decision(
        &mut self,
        agent: AgentId,
        observation: Observation,
        prompts: CyclePrompts,
        prompt: &PromptConfig,
    ) -> DecisionTicket {
        self.generation = self.generation.saturating_add(1);
        let request = ReasoningRequest {
            messages: self.window.messages(&prompts.system, &prompts.user),
            json_output: true,
            temperature: prompt.temperature,
            seed: prompt.seed,
        };
        self.pending = Some(PendingCycle {
            observation,
            prompts,
        });
        self.state = CognitionState::AwaitingDecision;
        DecisionTicket {
            agent,
            generation: self.generation,
            request,
        }
    }

    /// Drop any call in flight. A reply that arrives later is discarded.
    pub fn cancel(&mut self) {
        self.generation = self.generation.saturating_add(1);
        self.pending = None;
        self.state = CognitionState::Idle;
    }

    /// Apply a decision outcome to `agent`.
    ///
    /// Returns `None` when the outcome is stale. On success the agent's
    /// mood and memory are updated and the action is resolved against
    /// `view`. On failure the stay-still fallback is used and the agent's
    /// inner state is left untouched.
    pub fn complete<R: Rng + ?Sized>(
        &mut self,
        agent: &mut AgentState,
        outcome: DecisionOutcome,
        view: &WorldView<'_>,
        cooldown: Duration,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Option<CycleReport> {
        if outcome.generation != self.generation || !agent.is_active() {
            debug!(
                agent = %agent.name(),
                generation = outcome.generation,
                "discarding stale decision"
            );
            return None;
        }
        let pending = self.pending.take()?;
        self.state = CognitionState::ResolvingAction;

        let report = match outcome.result {
            Ok(reply) => {
                let ParsedReply { decision, raw } = reply;
                self.window.record(pending.prompts.user.clone(), raw.clone());
                agent.mood.clone_from(&decision.update.mood);
                if !decision.update.memory.trim().is_empty() {
                    agent.remember(now, decision.update.memory.as_str());
                }
                let resolution = resolve_action(
                    agent,
                    &decision.action,
                    &pending.observation,
                    view,
                    DEFAULT_REGION_PADDING,
                    rng,
                );
                CycleReport {
                    observation: pending.observation,
                    resolution,
                    thought: decision.thought,
                    memory: decision.update.memory,
                    prompts: pending.prompts,
                    raw_reply: Some(raw),
                    failure: None,
                }
            }
            Err(e) => {
                warn!(
                    agent = %agent.name(),
                    error = %e,
                    "decision failed, staying still"
                );
                CycleReport {
                    observation: pending.observation,
                    resolution: fallback_resolution(),
                    thought: String::new(),
                    memory: String::new(),
                    prompts: pending.prompts,
                    raw_reply: None,
                    failure: Some(e.to_string()),
                }
            }
        };

        self.settle(agent, &report.resolution, view.now_secs, cooldown);
        Some(report)
    }

    /// The cycle could not even be sent (e.g. a template failed to
    /// render). The agent stays still and dwells.
    pub fn abandon(
        &mut self,
        agent: &mut AgentState,
        now_secs: f64,
        cooldown: Duration,
        error: &RunnerError,
    ) {
        warn!(agent = %agent.name(), error = %error, "cycle abandoned, staying still");
        self.pending = None;
        self.settle(agent, &fallback_resolution(), now_secs, cooldown);
    }

    /// Hand a resolution to movement or start the dwell.
    fn settle(
        &mut self,
        agent: &mut AgentState,
        resolution: &Resolution,
        now_secs: f64,
        cooldown: Duration,
    ) {
        let action = &resolution.action;
        agent.movement_state = action.movement_state;
        match action.target_location.filter(|_| action.is_movement()) {
            Some(location) => {
                agent.target = Some(MovementTarget {
                    location,
                    action_type: action.action_type,
                    action_id: resolution.action_id.clone(),
                    started_at: now_secs,
                });
                self.state = CognitionState::MovingToTarget;
            }
            None => {
                agent.target = None;
                self.state = CognitionState::Cooldown {
                    until_secs: now_secs + cooldown.as_secs_f64(),
                };
            }
        }
    }
}

/// Stay still, silent, no target.
fn fallback_resolution() -> Resolution {
    Resolution {
        action: Action::stay_still(),
        action_id: STAY_STILL_ACTION_ID.to_owned(),
        substituted: false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use evac_core::decision::{ReasoningError, ReasoningReply, ScriptedReasoning, TokenUsage};
    use evac_core::dialog::DialogLog;
    use evac_core::observation::PeerView;
    use evac_types::{
        ActionType, AgentTraits, Bounds, MovementState, Persona, Point3, ShooterPerceptionLevel,
    };
    use evac_world::{InterestPoint, InterestPointIndex, Region, RegionGraph};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(5);

    struct Fixture {
        graph: RegionGraph,
        points: InterestPointIndex,
        dialog: DialogLog,
        peers: Vec<PeerView>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut graph = RegionGraph::new();
            let room = |id: &str, x: f64| {
                Region::new(
                    id,
                    id,
                    Bounds::from_center_size(Point3::new(x, 1.5, 0.0), Point3::new(10.0, 3.0, 10.0)),
                )
            };
            let _ = graph.add_region(room("a", 0.0).with_neighbors(["b"]));
            let _ = graph.add_region(room("b", 10.0).with_neighbors(["a", "c"]));
            let _ = graph.add_region(room("c", 20.0).with_neighbors(["b"]).as_exit());
            let mut points = InterestPointIndex::new();
            let _ = points.add(InterestPoint::hide_spot("hide_spot_desk", "Desk", Point3::new(1.0, 0.5, 1.0)));
            Self {
                graph,
                points,
                dialog: DialogLog::new(),
                peers: Vec::new(),
            }
        }

        fn view(&self) -> WorldView<'_> {
            WorldView {
                graph: &self.graph,
                points: &self.points,
                dialog: &self.dialog,
                peers: &self.peers,
                shooter_position: None,
                shooting_started: false,
                now_secs: 10.0,
            }
        }
    }

    fn agent() -> AgentState {
        let mut agent = AgentState::new(
            Persona {
                name: "Ana Ruiz".to_owned(),
                ..Persona::default()
            },
            AgentTraits {
                training_level: TrainingLevel::Low,
                familiarity_level: FamiliarityLevel::High,
                shooter_perception_level: ShooterPerceptionLevel::Direct,
            },
            None,
            3,
            Point3::new(0.0, 0.0, 0.0),
        );
        agent.current_region = Some("a".to_owned());
        agent
    }

    fn observation() -> Observation {
        Observation {
            available_action_ids: vec!["stay_still".to_owned(), "b".to_owned()],
            ..Observation::default()
        }
    }

    fn prompts() -> CyclePrompts {
        CyclePrompts {
            system: "rules".to_owned(),
            user: "observation".to_owned(),
        }
    }

    fn reply(action_id: &str, movement: &str) -> String {
        format!(
            r#"{{"thought": "go", "action": {{"vocal_mode": "out_loud", "utterance": "Let's move", "movement": "{movement}", "action_id": "{action_id}"}}, "update": {{"mood": "anxious", "memory": "Decided to go to {action_id}."}}}}"#
        )
    }

    #[test]
    fn window_evicts_oldest_pairs() {
        let mut window = ConversationWindow::new(2);
        for i in 0..3 {
            window.record(format!("u{i}"), format!("a{i}"));
        }
        assert_eq!(window.turns.len(), 2);
        let contents: Vec<String> =
            window.messages("sys", "now").into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["sys", "u1", "a1", "u2", "a2", "now"]);
    }

    #[test]
    fn zero_turn_window_sends_only_current_prompt() {
        let mut window = ConversationWindow::new(0);
        window.record("u".to_owned(), "a".to_owned());
        assert!(window.turns.is_empty());
        assert_eq!(window.messages("sys", "now").len(), 2);
    }

    #[test]
    fn step_follows_state() {
        let mut cognition = AgentCognition::new(3);
        let mut agent = agent();
        assert_eq!(cognition.next_step(&agent, 0.0), TickStep::Decide);

        let _ticket = cognition.begin_decision(agent.id, observation(), prompts(), &PromptConfig::default());
        assert_eq!(cognition.next_step(&agent, 1.0), TickStep::Wait);

        cognition.cancel();
        agent.target = Some(MovementTarget {
            location: Point3::new(5.0, 0.0, 0.0),
            action_type: ActionType::MoveToRegion,
            action_id: "b".to_owned(),
            started_at: 0.0,
        });
        assert_eq!(cognition.next_step(&agent, 1.0), TickStep::Move);
        assert_eq!(cognition.state(), CognitionState::MovingToTarget);
    }

    #[test]
    fn ticket_carries_window_and_sampling() {
        let mut cognition = AgentCognition::new(3);
        let agent = agent();
        let config = PromptConfig {
            temperature: 0.3,
            seed: 7,
            ..PromptConfig::default()
        };
        let ticket = cognition.begin_decision(agent.id, observation(), prompts(), &config);
        assert_eq!(ticket.generation, 1);
        assert!(ticket.request.json_output);
        assert_eq!(ticket.request.seed, 7);
        assert_eq!(ticket.request.messages.len(), 2);
    }

    #[test]
    fn successful_reply_moves_agent_and_updates_memory() {
        let fx = Fixture::new();
        let mut cognition = AgentCognition::new(3);
        let mut agent = agent();
        let mut rng = StdRng::seed_from_u64(1);

        let ticket = cognition.begin_decision(agent.id, observation(), prompts(), &PromptConfig::default());
        let Ok(parsed) = parse_decision(&reply("b", "sprint")) else {
            panic!("fixture reply should parse");
        };
        let outcome = DecisionOutcome {
            agent: agent.id,
            generation: ticket.generation,
            result: Ok(ParsedReply {
                decision: parsed,
                raw: reply("b", "sprint"),
            }),
        };
        let Some(report) =
            cognition.complete(&mut agent, outcome, &fx.view(), COOLDOWN, Utc::now(), &mut rng)
        else {
            panic!("fresh outcome should apply");
        };

        assert_eq!(report.resolution.action.action_type, ActionType::MoveToRegion);
        assert_eq!(agent.mood, "anxious");
        assert_eq!(agent.memory.len(), 1);
        assert_eq!(agent.movement_state, MovementState::Walk);
        assert!(agent.target.is_some());
        assert_eq!(cognition.state(), CognitionState::MovingToTarget);
        assert_eq!(cognition.window.turns.len(), 1);
    }

    #[test]
    fn malformed_reply_falls_back_without_touching_agent() {
        let fx = Fixture::new();
        let mut cognition = AgentCognition::new(3);
        let mut agent = agent();
        let mut rng = StdRng::seed_from_u64(1);

        let ticket = cognition.begin_decision(agent.id, observation(), prompts(), &PromptConfig::default());
        let missing_action = r#"{"thought": "hm", "update": {"mood": "calm", "memory": "nothing"}}"#;
        let outcome = DecisionOutcome {
            agent: agent.id,
            generation: ticket.generation,
            result: parse_decision(missing_action).map(|decision| ParsedReply {
                decision,
                raw: missing_action.to_owned(),
            }),
        };
        let Some(report) =
            cognition.complete(&mut agent, outcome, &fx.view(), COOLDOWN, Utc::now(), &mut rng)
        else {
            panic!("fresh outcome should apply");
        };

        assert_eq!(report.resolution.action, Action::stay_still());
        assert!(report.resolution.action.utterance.is_empty());
        assert!(report.failure.is_some());
        assert_eq!(agent.mood, "neutral");
        assert!(agent.memory.is_empty());
        assert!(agent.target.is_none());
        assert!(cognition.window.turns.is_empty());
        assert_eq!(cognition.state(), CognitionState::Cooldown { until_secs: 15.0 });
        assert_eq!(cognition.next_step(&agent, 12.0), TickStep::Wait);
        assert_eq!(cognition.next_step(&agent, 15.0), TickStep::Decide);
    }

    #[test]
    fn stale_outcome_is_discarded() {
        let fx = Fixture::new();
        let mut cognition = AgentCognition::new(3);
        let mut agent = agent();
        let mut rng = StdRng::seed_from_u64(1);

        let ticket = cognition.begin_decision(agent.id, observation(), prompts(), &PromptConfig::default());
        cognition.cancel();
        let outcome = DecisionOutcome {
            agent: agent.id,
            generation: ticket.generation,
            result: Err(RunnerError::Timeout { deadline_ms: 10 }),
        };
        assert!(
            cognition
                .complete(&mut agent, outcome, &fx.view(), COOLDOWN, Utc::now(), &mut rng)
                .is_none()
        );
        assert_eq!(cognition.state(), CognitionState::Idle);
    }

    #[test]
    fn prompts_gate_map_on_familiarity_and_threat() {
        let fx = Fixture::new();
        let Ok(engine) = PromptEngine::new(None) else {
            panic!("built-in templates should load");
        };
        let agent = agent();
        let mut view = fx.view();

        let Ok(calm) = compose_prompts(
            &engine,
            &agent,
            &observation(),
            &view,
            &PromptConfig::default(),
            "an office building",
            Utc::now(),
        ) else {
            panic!("prompts should render");
        };
        assert!(!calm.system.contains("Building Map:"));
        assert!(calm.user.starts_with("Persona: # Character Profile"));
        assert!(calm.user.contains("- No memories recorded yet."));

        view.shooting_started = true;
        let Ok(alarmed) = compose_prompts(
            &engine,
            &agent,
            &observation(),
            &view,
            &PromptConfig::default(),
            "an office building",
            Utc::now(),
        ) else {
            panic!("prompts should render");
        };
        assert!(alarmed.system.contains("Building Map:\nRoute to c: a->b"));
        assert!(!alarmed.system.contains("ASI Handbook:"));
    }

    struct StalledService;

    impl ReasoningService for StalledService {
        async fn decide(&self, _request: &ReasoningRequest) -> Result<ReasoningReply, ReasoningError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ReasoningReply {
                content: String::new(),
                model: "stalled".to_owned(),
                usage: TokenUsage::default(),
            })
        }
    }

    fn request() -> ReasoningRequest {
        ReasoningRequest {
            messages: vec![ChatMessage::user("hi")],
            json_output: true,
            temperature: 0.0,
            seed: 42,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn request_times_out() {
        let costs = CostTracker::new();
        let result =
            request_decision(&StalledService, &request(), Duration::from_millis(7000), &costs).await;
        assert!(matches!(result, Err(RunnerError::Timeout { deadline_ms: 7000 })));
        assert_eq!(costs.summary().total_requests, 0);
    }

    #[tokio::test]
    async fn request_parses_and_records_usage() {
        let service = Arc::new(ScriptedReasoning::new([reply("b", "walk")], "not json"));
        let costs = CostTracker::new();

        let first = request_decision(service.as_ref(), &request(), Duration::from_secs(1), &costs).await;
        assert!(first.is_ok_and(|r| r.decision.action.action_id == "b"));

        let second = request_decision(service.as_ref(), &request(), Duration::from_secs(1), &costs).await;
        assert!(matches!(second, Err(RunnerError::Parse(_))));
        assert_eq!(costs.summary().total_requests, 2);
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        let service = ScriptedReasoning::new(Vec::<String>::new(), "{}");
        service.push_failure("connection refused");
        let costs = CostTracker::new();
        let result = request_decision(&service, &request(), Duration::from_secs(1), &costs).await;
        assert!(matches!(result, Err(RunnerError::Reasoning(ReasoningError::Transport(_)))));
    }
}

//! The simulation tick loop.
//!
//! A [`Simulation`] owns the building, the run-wide [`SimulationState`],
//! the shared dialogue log, and one slot per agent. Every tick it:
//!
//! 1. Applies decision outcomes that arrived since the previous tick
//! 2. Advances the simulation clock and stops at the configured duration
//! 3. Starts the shooting when due and fires at most one shot
//! 4. Steps every active agent: waits, moves, or starts a decision call
//! 5. Samples agent trajectories
//!
//! Decision calls run as tokio tasks, one per agent at most, and report
//! back over a channel. A dead or escaped agent has its task aborted and
//! its generation bumped, so a reply that still arrives is discarded.
//!
//! When the run ends the per-agent logs, the dialogue log, the map export,
//! and `metadata.json` are written into a timestamped run folder.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use evac_core::agent::{AgentState, DamageOutcome};
use evac_core::allocator::{AllocatorSnapshot, TraitAllocator};
use evac_core::config::SimulationConfig;
use evac_core::decision::ReasoningService;
use evac_core::dialog::DialogLog;
use evac_core::observation::{
    LineOfSight, PeerView, SameRegionSight, WorldView, build_observation,
};
use evac_core::personas::{PersonaAssigner, PersonaCatalog};
use evac_core::state::SimulationState;
use evac_types::{FinalStatus, PendingEvent, VocalMode};
use evac_world::{DEFAULT_REGION_PADDING, InterestPointIndex, MapDocument, RegionGraph};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::agent_log::{AgentLogger, write_agent_log};
use crate::cognition::{
    AgentCognition, DecisionOutcome, TickStep, compose_prompts, request_decision,
};
use crate::cost::{CostSummary, CostTracker};
use crate::error::RunnerError;
use crate::movement::{MovementEvent, random_speed_multiplier, step_agent};
use crate::prompt::PromptEngine;

/// One agent and everything the loop tracks for it.
#[derive(Debug)]
struct AgentSlot {
    agent: AgentState,
    cognition: AgentCognition,
    logger: AgentLogger,
    task: Option<AbortHandle>,
}

impl AgentSlot {
    /// Take the agent out of the run: free its hiding spot and drop any
    /// call in flight.
    fn retire(&mut self, points: &InterestPointIndex) {
        points.release_all(self.agent.id);
        self.cognition.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Agents that left the building.
    pub escaped: usize,
    /// Agents killed by the shooter.
    pub dead: usize,
    /// Agents still inside when the run stopped.
    pub alive: usize,
    /// Token usage and estimated cost.
    pub usage: CostSummary,
    /// Folder the run artifacts were written to, if logging is enabled.
    pub run_dir: Option<PathBuf>,
}

/// Contents of `metadata.json`.
#[derive(Serialize)]
struct RunMetadata<'a> {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_seconds: f64,
    agent_count: usize,
    doors_locked: bool,
    llm_usage: &'a CostSummary,
    sim_config: &'a SimulationConfig,
    #[serde(flatten)]
    allocation: &'a AllocatorSnapshot,
}

/// A configured run, ready to start.
pub struct Simulation<S> {
    config: SimulationConfig,
    graph: RegionGraph,
    points: InterestPointIndex,
    state: SimulationState,
    dialog: DialogLog,
    slots: Vec<AgentSlot>,
    service: Arc<S>,
    engine: PromptEngine,
    costs: Arc<CostTracker>,
    decision_timeout: Duration,
    rng: StdRng,
    snapshot: AllocatorSnapshot,
    building: String,
}

impl<S: ReasoningService + 'static> Simulation<S> {
    /// Set up a run: validate the building, allocate traits and
    /// behaviors, assign personas, and spawn the population.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] for an invalid building or configuration,
    /// an allocator catalog that cannot fill the population, or a persona
    /// catalog that cannot be loaded. Nothing has run at that point.
    pub fn new(
        config: SimulationConfig,
        graph: RegionGraph,
        points: InterestPointIndex,
        service: Arc<S>,
        engine: PromptEngine,
        decision_timeout: Duration,
    ) -> Result<Self, RunnerError> {
        graph.validate()?;
        let scenario = &config.simulation;
        if !graph.contains(&scenario.shooter_region) {
            return Err(RunnerError::Config(format!(
                "shooter region {} is not part of the building",
                scenario.shooter_region
            )));
        }
        if scenario.tick_interval_ms == 0 {
            return Err(RunnerError::Config("tick_interval_ms must be positive".to_owned()));
        }
        let population = usize::try_from(config.agents.population)
            .map_err(|e| RunnerError::Config(format!("population out of range: {e}")))?;

        let mut rng = StdRng::seed_from_u64(scenario.random_seed);

        let mut allocator = TraitAllocator::default().with_rounding(config.allocation.rounding);
        if let Some(weights) = &config.allocation.trait_weights {
            allocator.set_trait_weights(weights)?;
        }
        if let Some(weights) = &config.allocation.behavior_weights {
            allocator.set_behavior_weights(weights)?;
        }
        let allocation = allocator.allocate(population, &mut rng)?;
        let snapshot = allocator.snapshot(population)?;

        let catalog = PersonaCatalog::load(
            config.agents.persona_catalog.as_deref(),
            config.agents.personality_fields_only,
        )?;
        let mut assigner = PersonaAssigner::new();

        let spawn_regions: Vec<String> = graph
            .regions()
            .filter(|r| !r.is_exit)
            .map(|r| r.id.clone())
            .collect();
        if spawn_regions.is_empty() {
            return Err(RunnerError::Config("building has no region to spawn in".to_owned()));
        }

        let max_health = config.agents.default_health.max(1);
        let mut slots = Vec::with_capacity(population);
        for index in 0..population {
            let settings = allocation
                .settings_for(index, config.allocation.enforcement_mode)
                .ok_or_else(|| {
                    RunnerError::Config(format!("allocation has no settings for agent {index}"))
                })?;
            let persona = assigner
                .next_persona(&catalog, &mut rng)
                .ok_or_else(|| RunnerError::Config("persona catalog is empty".to_owned()))?;

            let region = spawn_regions
                .get(rng.random_range(0..spawn_regions.len()))
                .ok_or_else(|| RunnerError::Config("spawn region out of range".to_owned()))?;
            let position = graph
                .random_point_in(region, DEFAULT_REGION_PADDING, &mut rng)
                .ok_or_else(|| RunnerError::Config(format!("cannot spawn in region {region}")))?;
            let health = rng.random_range(1..=max_health);

            let mut agent =
                AgentState::new(persona, settings.traits, settings.instruction, health, position);
            agent.speed_multiplier = random_speed_multiplier(&mut rng);
            agent.update_region(&graph);

            info!(
                agent = %agent.name(),
                region = %region,
                health,
                training = ?agent.traits.training_level,
                familiarity = ?agent.traits.familiarity_level,
                perception = ?agent.traits.shooter_perception_level,
                forced = agent.instruction.is_some(),
                "agent spawned"
            );

            slots.push(AgentSlot {
                logger: AgentLogger::new(&agent),
                cognition: AgentCognition::new(config.agents.conversation_turn_limit),
                agent,
                task: None,
            });
        }

        let building = building_phrase(&scenario.building_kind);
        Ok(Self {
            state: SimulationState::new(Utc::now()),
            config,
            graph,
            points,
            dialog: DialogLog::new(),
            slots,
            service,
            engine,
            costs: Arc::new(CostTracker::new()),
            decision_timeout,
            rng,
            snapshot,
            building,
        })
    }

    /// Run until the duration elapses or no agent is left inside, then
    /// write the run artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if the clock overflows or an artifact
    /// cannot be written. Per-agent reasoning failures never surface here.
    pub async fn run(mut self) -> Result<RunSummary, RunnerError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<DecisionOutcome>();
        let mut tasks: JoinSet<()> = JoinSet::new();

        let tick_ms = self.config.simulation.tick_interval_ms;
        let tick = Duration::from_millis(tick_ms);
        self.state.start();
        info!(
            agents = self.slots.len(),
            duration_secs = self.config.simulation.duration_secs,
            tick_interval_ms = tick_ms,
            shooter_region = %self.config.simulation.shooter_region,
            "simulation starting"
        );

        loop {
            tokio::time::sleep(tick).await;

            while let Ok(outcome) = rx.try_recv() {
                self.apply_outcome(outcome);
            }
            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = joined
                    && !e.is_cancelled()
                {
                    warn!(error = %e, "decision task failed");
                }
            }

            self.state.clock.advance(tick_ms)?;
            if self.state.clock.elapsed_secs() >= self.config.simulation.duration_secs {
                info!(tick = self.state.clock.tick(), "duration reached");
                break;
            }

            self.update_threat();
            self.step_agents(tick.as_secs_f64(), &tx, &mut tasks);
            self.sample_positions();

            if !self.slots.iter().any(|s| s.agent.is_active()) {
                info!(tick = self.state.clock.tick(), "no agents left in the building");
                break;
            }
        }

        tasks.abort_all();
        for slot in &mut self.slots {
            slot.cognition.cancel();
        }
        self.finish()
    }

    // -------------------------------------------------------------------
    // Tick phases
    // -------------------------------------------------------------------

    /// Apply one decision outcome to its agent.
    fn apply_outcome(&mut self, outcome: DecisionOutcome) {
        let peers = peer_views(&self.slots);
        let now_secs = self.state.clock.elapsed_secs();
        let now = self.state.clock.now();
        let cooldown = Duration::from_millis(self.config.simulation.stay_still_cooldown_ms);

        let Some(slot) = self.slots.iter_mut().find(|s| s.agent.id == outcome.agent) else {
            debug!(agent = %outcome.agent, "outcome for unknown agent");
            return;
        };
        slot.task = None;

        let view = WorldView {
            graph: &self.graph,
            points: &self.points,
            dialog: &self.dialog,
            peers: &peers,
            shooter_position: self.state.shooter_position,
            shooting_started: self.state.shooting_started,
            now_secs,
        };
        let Some(report) =
            slot.cognition
                .complete(&mut slot.agent, outcome, &view, cooldown, now, &mut self.rng)
        else {
            return;
        };

        let action = &report.resolution.action;
        debug!(
            agent = %slot.agent.name(),
            action_id = %report.resolution.action_id,
            action_type = ?action.action_type,
            movement = ?action.movement_state,
            state = slot.cognition.state().as_str(),
            "decision applied"
        );
        if action.vocal_mode != VocalMode::Silent && !action.utterance.trim().is_empty() {
            self.dialog.record(
                now_secs,
                slot.agent.position,
                action.utterance.as_str(),
                slot.agent.name(),
            );
        }
        slot.logger.log_cycle(now_secs, now, &report);
    }

    /// Start the shooting when due, then fire at one visible agent if a
    /// shot is due.
    fn update_threat(&mut self) {
        let scenario = &self.config.simulation;
        let now = self.state.clock.now();

        if !self.state.shooting_started
            && self.state.clock.elapsed_secs() >= scenario.shooting_start_secs
            && let Some(region) = self.graph.get(&scenario.shooter_region)
            && self.state.begin_shooting(region.bounds.center())
        {
            info!(
                region = %region.id,
                doors_locked = self.state.doors_locked,
                "shooting started"
            );
            for slot in self.slots.iter_mut().filter(|s| s.agent.is_active()) {
                slot.agent.push_event(PendingEvent::gunshot(now));
            }
        }

        if !self.state.shot_due(scenario.shot_interval_secs) {
            return;
        }
        let Some(shooter) = self.state.shooter_position else {
            return;
        };

        let visible: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                s.agent.is_active() && SameRegionSight.can_see(&self.graph, shooter, s.agent.position)
            })
            .map(|(i, _)| i)
            .collect();
        if visible.is_empty() {
            return;
        }
        let pick = visible.get(self.rng.random_range(0..visible.len())).copied();
        let Some(slot) = pick.and_then(|i| self.slots.get_mut(i)) else {
            return;
        };

        self.state.record_shot();
        match slot.agent.take_damage(now) {
            DamageOutcome::Killed => {
                warn!(agent = %slot.agent.name(), "agent killed");
                slot.retire(&self.points);
            }
            DamageOutcome::Injured => {
                info!(agent = %slot.agent.name(), health = slot.agent.health, "agent injured");
            }
            DamageOutcome::Ignored => {
                debug!(agent = %slot.agent.name(), "shot missed an agent in cover");
            }
        }
    }

    /// Move, wait, or start a decision for every active agent.
    fn step_agents(
        &mut self,
        dt_secs: f64,
        tx: &mpsc::UnboundedSender<DecisionOutcome>,
        tasks: &mut JoinSet<()>,
    ) {
        let Self {
            config,
            graph,
            points,
            state,
            dialog,
            slots,
            service,
            engine,
            costs,
            decision_timeout,
            rng,
            building,
            ..
        } = self;
        let (graph, points, dialog) = (&*graph, &*points, &*dialog);

        let now_secs = state.clock.elapsed_secs();
        let now = state.clock.now();
        let cooldown = Duration::from_millis(config.simulation.stay_still_cooldown_ms);
        let peers = peer_views(slots);
        let view = WorldView {
            graph,
            points,
            dialog,
            peers: &peers,
            shooter_position: state.shooter_position,
            shooting_started: state.shooting_started,
            now_secs,
        };

        for slot in slots.iter_mut().filter(|s| s.agent.is_active()) {
            match slot.cognition.next_step(&slot.agent, now_secs) {
                TickStep::Wait => {}
                TickStep::Move => {
                    match step_agent(&mut slot.agent, graph, &config.agents, dt_secs, now_secs, now)
                    {
                        MovementEvent::Idle | MovementEvent::Moving => {}
                        MovementEvent::Reached {
                            action_type,
                            action_id,
                        } => {
                            debug!(
                                agent = %slot.agent.name(),
                                action_id = %action_id,
                                action_type = ?action_type,
                                "target reached"
                            );
                            slot.cognition.target_finished();
                        }
                        MovementEvent::TimedOut => slot.cognition.target_finished(),
                        MovementEvent::Escaped => slot.retire(points),
                    }
                }
                TickStep::Decide => {
                    let observation = build_observation(
                        &mut slot.agent,
                        &view,
                        &config.observation,
                        &SameRegionSight,
                        rng,
                    );
                    let prompts = match compose_prompts(
                        engine,
                        &slot.agent,
                        &observation,
                        &view,
                        &config.prompt,
                        building.as_str(),
                        now,
                    ) {
                        Ok(prompts) => prompts,
                        Err(e) => {
                            slot.cognition.abandon(&mut slot.agent, now_secs, cooldown, &e);
                            slot.logger.log_observation(now_secs, observation);
                            continue;
                        }
                    };

                    let ticket = slot.cognition.begin_decision(
                        slot.agent.id,
                        observation,
                        prompts,
                        &config.prompt,
                    );
                    debug!(
                        agent = %slot.agent.name(),
                        generation = ticket.generation,
                        state = slot.cognition.state().as_str(),
                        "requesting decision"
                    );

                    let service = Arc::clone(service);
                    let costs = Arc::clone(costs);
                    let tx = tx.clone();
                    let deadline = *decision_timeout;
                    slot.task = Some(tasks.spawn(async move {
                        let result =
                            request_decision(service.as_ref(), &ticket.request, deadline, &costs)
                                .await;
                        let outcome = DecisionOutcome {
                            agent: ticket.agent,
                            generation: ticket.generation,
                            result,
                        };
                        if tx.send(outcome).is_err() {
                            debug!("run ended before the decision arrived");
                        }
                    }));
                }
            }
        }
    }

    /// Record a trajectory sample for every active agent that is due.
    fn sample_positions(&mut self) {
        let now_secs = self.state.clock.elapsed_secs();
        let interval = self.config.simulation.position_log_interval_secs;
        for slot in self.slots.iter_mut().filter(|s| s.agent.is_active()) {
            if slot.logger.sample_due(now_secs, interval) {
                slot.logger.log_position(now_secs, &slot.agent);
            }
        }
    }

    // -------------------------------------------------------------------
    // Wrap-up
    // -------------------------------------------------------------------

    /// Count outcomes and write the run artifacts.
    fn finish(self) -> Result<RunSummary, RunnerError> {
        let usage = self.costs.summary();
        let count = |status: FinalStatus| {
            self.slots
                .iter()
                .filter(|s| s.agent.final_status == status)
                .count()
        };
        let escaped = count(FinalStatus::Escaped);
        let dead = count(FinalStatus::Dead);
        let alive = count(FinalStatus::Alive);
        info!(escaped, dead, alive, "simulation finished");
        info!("{usage}");

        let run_dir = if self.config.logging.enabled {
            let dir = self.config.logging.output_dir.join(
                self.state
                    .clock
                    .started_at()
                    .format("%Y-%m-%d_%H-%M-%S")
                    .to_string(),
            );
            self.write_artifacts(&dir, &usage)?;
            info!(dir = %dir.display(), "run artifacts written");
            Some(dir)
        } else {
            None
        };

        Ok(RunSummary {
            escaped,
            dead,
            alive,
            usage,
            run_dir,
        })
    }

    /// Write per-agent logs, `dialog.json`, `map_data.json`, and
    /// `metadata.json` into `dir`.
    fn write_artifacts(self, dir: &Path, usage: &CostSummary) -> Result<(), RunnerError> {
        std::fs::create_dir_all(dir)?;

        let metadata = RunMetadata {
            start_time: self.state.clock.started_at(),
            end_time: self.state.clock.now(),
            duration_seconds: self.state.clock.elapsed_secs(),
            agent_count: self.slots.len(),
            doors_locked: self.state.doors_locked,
            llm_usage: usage,
            sim_config: &self.config,
            allocation: &self.snapshot,
        };
        std::fs::write(dir.join("metadata.json"), serde_json::to_string_pretty(&metadata)?)?;
        std::fs::write(
            dir.join("dialog.json"),
            serde_json::to_string_pretty(self.dialog.entries())?,
        )?;
        std::fs::write(
            dir.join("map_data.json"),
            serde_json::to_string_pretty(&MapDocument::from_world(&self.graph, &self.points))?,
        )?;

        for slot in self.slots {
            let (record, transcript) = slot.logger.finish(&slot.agent);
            write_agent_log(dir, &record, &transcript)?;
        }
        Ok(())
    }
}

/// What every agent can see of every other agent still in the building.
fn peer_views(slots: &[AgentSlot]) -> Vec<PeerView> {
    slots
        .iter()
        .filter(|s| s.agent.final_status != FinalStatus::Escaped)
        .map(|s| PeerView::of(&s.agent))
        .collect()
}

/// Building phrase for the system prompt, e.g. `an office building`.
fn building_phrase(kind: &str) -> String {
    let kind = kind.trim();
    let article = if kind.starts_with(['a', 'e', 'i', 'o', 'u', 'A', 'E', 'I', 'O', 'U']) {
        "an"
    } else {
        "a"
    };
    format!("{article} {kind} building")
}


#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use evac_core::config::{AgentsConfig, LoggingConfig, PromptConfig, ScenarioConfig};
    use evac_core::decision::{ChatRole, ScriptedReasoning};
    use evac_types::{Bounds, HealthStatus, Observation, Point3};
    use evac_world::{Region, SHOOTER_REGION, office_building};

    use super::*;
    use crate::cognition::{CyclePrompts, ParsedReply};
    use crate::movement::SPEED_MULTIPLIER_RANGE;
    use crate::parse::parse_decision;

    const STAY: &str = r#"{"thought": "Nothing is happening.", "action": {"vocal_mode": "silent", "utterance": "", "movement": "stay_still", "action_id": "stay_still"}, "update": {"mood": "calm", "memory": "Stayed at my desk."}}"#;

    const LEAVE: &str = r#"{"thought": "I want some air.", "action": {"vocal_mode": "out_loud", "utterance": "I'm heading outside.", "movement": "walk", "action_id": "yard"}, "update": {"mood": "restless", "memory": "Walked out to the yard."}}"#;

    /// A lobby opening onto an exit yard.
    fn yard_building() -> (RegionGraph, InterestPointIndex) {
        let mut graph = RegionGraph::new();
        let room = |id: &str, x: f64| {
            Region::new(
                id,
                id,
                Bounds::from_center_size(Point3::new(x, 1.5, 0.0), Point3::new(10.0, 3.0, 10.0)),
            )
        };
        let _ = graph.add_region(room("lobby", 0.0).with_neighbors(["yard"]));
        let _ = graph.add_region(room("yard", 10.0).with_neighbors(["lobby"]).as_exit());
        (graph, InterestPointIndex::new())
    }

    fn config(population: u32, shooting_start_secs: f64) -> SimulationConfig {
        SimulationConfig {
            simulation: ScenarioConfig {
                duration_secs: 30.0,
                shooting_start_secs,
                shooter_region: "lobby".to_owned(),
                stay_still_cooldown_ms: 1000,
                ..ScenarioConfig::default()
            },
            agents: AgentsConfig {
                population,
                ..AgentsConfig::default()
            },
            logging: LoggingConfig {
                enabled: false,
                ..LoggingConfig::default()
            },
            ..SimulationConfig::default()
        }
    }

    fn simulation(
        config: SimulationConfig,
        world: (RegionGraph, InterestPointIndex),
        service: Arc<ScriptedReasoning>,
    ) -> Simulation<ScriptedReasoning> {
        let Ok(engine) = PromptEngine::new(None) else {
            panic!("built-in templates should compile");
        };
        let (graph, points) = world;
        let Ok(sim) = Simulation::new(config, graph, points, service, engine, Duration::from_secs(7))
        else {
            panic!("setup should succeed");
        };
        sim
    }

    fn scripted(reply: &str) -> Arc<ScriptedReasoning> {
        Arc::new(ScriptedReasoning::new(Vec::<String>::new(), reply))
    }

    fn center_of(sim: &Simulation<ScriptedReasoning>, region: &str) -> Point3 {
        let Some(region) = sim.graph.get(region) else {
            panic!("region {region} should exist");
        };
        region.bounds.center()
    }

    fn place(sim: &mut Simulation<ScriptedReasoning>, index: usize, position: Point3) {
        let Some(slot) = sim.slots.get_mut(index) else {
            panic!("agent {index} should exist");
        };
        slot.agent.position = position;
        slot.agent.update_region(&sim.graph);
    }

    #[test]
    fn spawns_population_inside_the_building() {
        let Ok(world) = office_building() else {
            panic!("office building should load");
        };
        let mut config = config(6, 5.0);
        config.simulation.shooter_region = SHOOTER_REGION.to_owned();
        let sim = simulation(config, world, scripted(STAY));

        assert_eq!(sim.slots.len(), 6);
        let mut names = BTreeSet::new();
        for slot in &sim.slots {
            let agent = &slot.agent;
            let region = agent.current_region.as_deref().and_then(|id| sim.graph.get(id));
            assert!(region.is_some_and(|r| !r.is_exit));
            assert!((1..=3).contains(&agent.health));
            assert!(SPEED_MULTIPLIER_RANGE.contains(&agent.speed_multiplier));
            assert_eq!(agent.final_status, FinalStatus::Alive);
            names.insert(agent.name().to_owned());
        }
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn setup_rejects_bad_configuration() {
        let engine = || PromptEngine::new(None).ok();

        let mut unknown_shooter = config(2, 5.0);
        unknown_shooter.simulation.shooter_region = "basement".to_owned();
        let Some(first) = engine() else {
            panic!("built-in templates should compile");
        };
        let (graph, points) = yard_building();
        let result = Simulation::new(
            unknown_shooter,
            graph,
            points,
            scripted(STAY),
            first,
            Duration::from_secs(7),
        );
        assert!(matches!(result, Err(RunnerError::Config(_))));

        let mut zero_tick = config(2, 5.0);
        zero_tick.simulation.tick_interval_ms = 0;
        let Some(second) = engine() else {
            panic!("built-in templates should compile");
        };
        let (graph, points) = yard_building();
        let result =
            Simulation::new(zero_tick, graph, points, scripted(STAY), second, Duration::from_secs(7));
        assert!(matches!(result, Err(RunnerError::Config(_))));
    }

    #[test]
    fn building_phrase_picks_article() {
        assert_eq!(building_phrase("office"), "an office building");
        assert_eq!(building_phrase("school"), "a school building");
    }

    #[test]
    fn shooting_starts_and_hits_visible_agent() {
        let mut sim = simulation(config(2, 0.0), yard_building(), scripted(STAY));
        let lobby = center_of(&sim, "lobby");
        let yard = center_of(&sim, "yard");
        place(&mut sim, 0, lobby);
        place(&mut sim, 1, yard);
        if let Some(slot) = sim.slots.get_mut(0) {
            slot.agent.health = 2;
        }

        assert!(sim.state.clock.advance(100).is_ok());
        sim.update_threat();

        assert!(sim.state.shooting_started);
        assert!(sim.state.doors_locked);
        assert!(sim.state.last_shot_at.is_some());
        let Some([target, bystander]) = sim.slots.get(0..2) else {
            panic!("two agents expected");
        };
        assert_eq!(target.agent.health, 1);
        assert_eq!(target.agent.health_status, HealthStatus::Injured);
        assert_eq!(target.agent.pending_events.len(), 2);
        assert_eq!(bystander.agent.pending_events.len(), 1);
        assert_eq!(bystander.agent.health_status, HealthStatus::Alive);

        // Not due again until the interval has passed.
        assert!(sim.state.clock.advance(100).is_ok());
        sim.update_threat();
        assert_eq!(sim.slots.first().map(|s| s.agent.health), Some(1));

        assert!(sim.state.clock.advance(1000).is_ok());
        sim.update_threat();
        let Some(target) = sim.slots.first() else {
            panic!("agent expected");
        };
        assert_eq!(target.agent.final_status, FinalStatus::Dead);
        assert!(!target.agent.is_active());
    }

    #[test]
    fn crouched_agent_takes_no_damage() {
        let mut sim = simulation(config(1, 0.0), yard_building(), scripted(STAY));
        let lobby = center_of(&sim, "lobby");
        place(&mut sim, 0, lobby);
        let before = sim.slots.first().map(|s| s.agent.health);
        if let Some(slot) = sim.slots.get_mut(0) {
            slot.agent.is_crouching = true;
        }

        assert!(sim.state.clock.advance(100).is_ok());
        sim.update_threat();

        assert!(sim.state.last_shot_at.is_some());
        assert_eq!(sim.slots.first().map(|s| s.agent.health), before);
        assert_eq!(
            sim.slots.first().map(|s| s.agent.health_status),
            Some(HealthStatus::Alive)
        );
    }

    #[test]
    fn late_decision_for_dead_agent_is_discarded() {
        let mut sim = simulation(config(1, 0.0), yard_building(), scripted(STAY));
        let lobby = center_of(&sim, "lobby");
        place(&mut sim, 0, lobby);

        let Some(slot) = sim.slots.get_mut(0) else {
            panic!("agent expected");
        };
        slot.agent.health = 1;
        let ticket = slot.cognition.begin_decision(
            slot.agent.id,
            Observation::default(),
            CyclePrompts {
                system: "rules".to_owned(),
                user: "observation".to_owned(),
            },
            &PromptConfig::default(),
        );

        assert!(sim.state.clock.advance(100).is_ok());
        sim.update_threat();

        let Ok(decision) = parse_decision(LEAVE) else {
            panic!("reply should parse");
        };
        sim.apply_outcome(DecisionOutcome {
            agent: ticket.agent,
            generation: ticket.generation,
            result: Ok(ParsedReply {
                decision,
                raw: LEAVE.to_owned(),
            }),
        });

        assert!(sim.dialog.is_empty());
        let Some(slot) = sim.slots.first() else {
            panic!("agent expected");
        };
        assert_eq!(slot.agent.final_status, FinalStatus::Dead);
        assert!(slot.agent.target.is_none());
        let (record, _) = slot.logger.clone().finish(&slot.agent);
        assert!(record.actions.is_empty());
        assert_eq!(record.final_status, FinalStatus::Dead);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_run_lasts_the_full_duration() {
        let service = scripted(STAY);
        let mut config = config(2, 1000.0);
        config.simulation.duration_secs = 3.0;
        let sim = simulation(config, yard_building(), Arc::clone(&service));

        let Ok(summary) = sim.run().await else {
            panic!("run should finish");
        };
        assert_eq!(summary.alive, 2);
        assert_eq!(summary.escaped, 0);
        assert_eq!(summary.dead, 0);
        assert!(summary.run_dir.is_none());

        let requests = service.requests();
        assert!(requests.len() >= 4);
        assert!(requests.iter().all(|r| {
            r.json_output && r.messages.first().map(|m| m.role) == Some(ChatRole::System)
        }));
        // After the cooldown the previous exchange rides along.
        assert!(requests.iter().any(|r| r.messages.len() == 4));
        assert!(summary.usage.total_requests >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn agents_walk_out_and_run_is_logged() {
        let unique = format!(
            "evac_run_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let output_dir = std::env::temp_dir().join(unique);
        let mut config = config(3, 1000.0);
        config.logging = LoggingConfig {
            enabled: true,
            output_dir: output_dir.clone(),
        };
        let sim = simulation(config, yard_building(), scripted(LEAVE));

        let Ok(summary) = sim.run().await else {
            panic!("run should finish");
        };
        assert_eq!(summary.escaped, 3);
        assert_eq!(summary.alive, 0);
        let Some(run_dir) = summary.run_dir else {
            panic!("logging is enabled");
        };

        let read = |name: &str| -> serde_json::Value {
            let text = std::fs::read_to_string(run_dir.join(name)).unwrap_or_default();
            serde_json::from_str(&text).unwrap_or_default()
        };

        let metadata = read("metadata.json");
        assert_eq!(metadata["agent_count"], 3);
        assert_eq!(metadata["doors_locked"], false);
        assert!(metadata["trait_distributions"].is_array());
        assert!(metadata["behavior_distributions"].is_array());
        assert!(metadata["llm_usage"]["total_requests"].as_u64().unwrap_or_default() >= 3);
        assert_eq!(metadata["sim_config"]["simulation"]["shooter_region"], "lobby");

        let dialog = read("dialog.json");
        assert!(
            dialog
                .as_array()
                .is_some_and(|lines| lines.iter().any(|l| l["content"] == "I'm heading outside."))
        );

        let map = read("map_data.json");
        assert_eq!(map["exit_regions"][0], "yard");

        let agent_files = std::fs::read_dir(&run_dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.path().extension().is_some_and(|x| x == "json"))
                    .count()
            })
            .unwrap_or_default();
        assert_eq!(agent_files, 6);
        assert!(run_dir.join(crate::agent_log::CHAT_LOG_DIR).is_dir());

        std::fs::remove_dir_all(&output_dir).ok();
    }

    #[tokio::test(start_paused = true)]
    async fn population_beyond_catalog_writes_one_log_per_agent() {
        let unique = format!(
            "evac_crowd_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let output_dir = std::env::temp_dir().join(unique);
        let mut config = config(85, 1000.0);
        config.logging = LoggingConfig {
            enabled: true,
            output_dir: output_dir.clone(),
        };
        let sim = simulation(config, yard_building(), scripted(LEAVE));

        let ids: BTreeSet<String> = sim.slots.iter().map(|s| s.agent.person_id()).collect();
        assert_eq!(ids.len(), 85);

        let Ok(summary) = sim.run().await else {
            panic!("run should finish");
        };
        let Some(run_dir) = summary.run_dir else {
            panic!("logging is enabled");
        };
        let json_files = std::fs::read_dir(&run_dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.path().extension().is_some_and(|x| x == "json"))
                    .count()
            })
            .unwrap_or_default();
        assert_eq!(json_files, 85 + 3);

        std::fs::remove_dir_all(&output_dir).ok();
    }
}

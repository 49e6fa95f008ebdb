//! Per-agent run log and chat transcript.
//!
//! An [`AgentLogger`] accumulates one agent's observations, actions,
//! memories, and trajectory samples during the run. At the end it is
//! turned into an [`AgentLogRecord`] written as `{name}.json` in the run
//! folder, next to the agent's chat transcript under `AgentChatLogs/`.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use evac_core::agent::AgentState;
use evac_types::{
    AgentLogRecord, LoggedAction, LoggedMemory, LoggedObservation, LoggedPosition, Observation,
};

use crate::cognition::CycleReport;
use crate::error::RunnerError;

/// Directory inside the run folder holding chat transcripts.
pub const CHAT_LOG_DIR: &str = "AgentChatLogs";

const TRANSCRIPT_RULE: &str = "----------------------------------------";

/// Accumulates the log for one agent.
#[derive(Debug, Clone)]
pub struct AgentLogger {
    record: AgentLogRecord,
    transcript: String,
    last_sample_at: Option<f64>,
}

impl AgentLogger {
    /// Start a log for `agent`.
    pub fn new(agent: &AgentState) -> Self {
        Self {
            record: AgentLogRecord {
                persona: agent.persona.clone(),
                traits: agent.traits,
                observations: Vec::new(),
                actions: Vec::new(),
                memories: Vec::new(),
                trajectory: Vec::new(),
                final_status: agent.final_status,
            },
            transcript: String::new(),
            last_sample_at: None,
        }
    }

    /// Record an observation delivered at `time`.
    pub fn log_observation(&mut self, time: f64, observation: Observation) {
        self.record
            .observations
            .push(LoggedObservation { time, observation });
    }

    /// Record a finished decision cycle: its observation, the resolved
    /// action, the new memory, and the chat exchange.
    pub fn log_cycle(&mut self, time: f64, at: DateTime<Utc>, report: &CycleReport) {
        self.log_observation(time, report.observation.clone());

        let action = &report.resolution.action;
        self.record.actions.push(LoggedAction {
            time,
            action_type: action.action_type,
            movement_state: action.movement_state,
            dialog_text: action.utterance.clone(),
            plan: Some(report.thought.clone()).filter(|t| !t.is_empty()),
            target_location: action.target_location,
        });

        if !report.memory.trim().is_empty() {
            self.record.memories.push(LoggedMemory {
                time,
                description: report.memory.clone(),
            });
        }

        let reply = report
            .raw_reply
            .as_deref()
            .or(report.failure.as_deref())
            .unwrap_or_default();
        let _ = write!(
            self.transcript,
            "[{}]\nSYSTEM:\n{}\nUSER:\n{}\nASSISTANT:\n{}\n{TRANSCRIPT_RULE}\n",
            at.to_rfc3339(),
            report.prompts.system,
            report.prompts.user,
            reply,
        );
    }

    /// Whether a trajectory sample is due at `time`.
    pub fn sample_due(&self, time: f64, interval_secs: f64) -> bool {
        self.last_sample_at
            .is_none_or(|last| time - last >= interval_secs)
    }

    /// Record the agent's position, facing, and health at `time`.
    pub fn log_position(&mut self, time: f64, agent: &AgentState) {
        self.last_sample_at = Some(time);
        self.record.trajectory.push(LoggedPosition {
            time,
            x: agent.position.x,
            y: agent.position.y,
            z: agent.position.z,
            rotation_x: agent.forward.x,
            rotation_y: agent.forward.y,
            rotation_z: agent.forward.z,
            health: agent.health,
            health_status: agent.health_status,
        });
    }

    /// Close the log with the agent's final status.
    pub fn finish(mut self, agent: &AgentState) -> (AgentLogRecord, String) {
        self.record.final_status = agent.final_status;
        (self.record, self.transcript)
    }
}

/// Replace characters that are not allowed in file names with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_control() || matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Write `{name}.json` and the chat transcript for one agent into `run_dir`.
pub fn write_agent_log(
    run_dir: &Path,
    record: &AgentLogRecord,
    transcript: &str,
) -> Result<(), RunnerError> {
    let stem = sanitize_file_name(&record.persona.name);
    std::fs::write(
        run_dir.join(format!("{stem}.json")),
        serde_json::to_string_pretty(record)?,
    )?;

    let chat_dir = run_dir.join(CHAT_LOG_DIR);
    std::fs::create_dir_all(&chat_dir)?;
    std::fs::write(chat_dir.join(format!("{stem}_ChatLogs.txt")), transcript)?;
    Ok(())
}

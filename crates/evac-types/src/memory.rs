//! An agent's semantic memory: an append-only list of timestamped notes.
//!
//! The memory log is unbounded. Only the reasoning-service conversation
//! window is capped, not this log.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One remembered event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MemoryEvent {
    /// When the memory was recorded.
    pub time: DateTime<Utc>,
    /// What the agent wrote down.
    pub description: String,
}

/// Ordered memory log of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MemoryLog {
    /// Events in insertion order.
    pub events: Vec<MemoryEvent>,
}

impl MemoryLog {
    /// Create an empty log.
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append a memory recorded at `time`.
    pub fn push(&mut self, time: DateTime<Utc>, description: impl Into<String>) {
        self.events.push(MemoryEvent {
            time,
            description: description.into(),
        });
    }

    /// Number of memories recorded.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Render as the `# Memories` markdown block, with ages relative to
    /// `now`.
    pub fn to_markdown(&self, now: DateTime<Utc>) -> String {
        let mut out = String::from("# Memories\n");
        if self.events.is_empty() {
            out.push_str("- No memories recorded yet.\n");
            return out;
        }
        for event in &self.events {
            let _ = writeln!(out, "- {}: {}", readable_age(event.time, now), event.description);
        }
        out
    }
}

/// Human-readable age of a timestamp: seconds under a minute, minutes under
/// an hour, hours under a day, days otherwise. Always floored.
pub fn readable_age(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(time);
    let seconds = elapsed.num_seconds().max(0);
    if seconds < 60 {
        format!("{seconds} seconds ago")
    } else if elapsed.num_minutes() < 60 {
        format!("{} minutes ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{} hours ago", elapsed.num_hours())
    } else {
        format!("{} days ago", elapsed.num_days())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn empty_log_renders_placeholder() {
        let log = MemoryLog::new();
        assert_eq!(log.to_markdown(Utc::now()), "# Memories\n- No memories recorded yet.\n");
    }

    #[test]
    fn ages_are_floored_into_units() {
        let now = Utc::now();
        let ago = |secs: i64| readable_age(now - TimeDelta::seconds(secs), now);
        assert_eq!(ago(0), "0 seconds ago");
        assert_eq!(ago(59), "59 seconds ago");
        assert_eq!(ago(61), "1 minutes ago");
        assert_eq!(ago(3_599), "59 minutes ago");
        assert_eq!(ago(7_300), "2 hours ago");
        assert_eq!(ago(200_000), "2 days ago");
    }

    #[test]
    fn markdown_lists_events_in_order() {
        let now = Utc::now();
        let mut log = MemoryLog::new();
        log.push(now - TimeDelta::seconds(12), "Heard a loud bang");
        log.push(now, "Walked to hallway1");
        assert_eq!(log.len(), 2);
        assert_eq!(
            log.to_markdown(now),
            "# Memories\n- 12 seconds ago: Heard a loud bang\n- 0 seconds ago: Walked to hallway1\n"
        );
    }
}

//! Shared log of everything said aloud during a run.

use evac_types::{DialogEntry, DialogId, Point3, SurroundingDialogue};

/// Append-only utterance log with a spatial and temporal query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogLog {
    entries: Vec<DialogEntry>,
}

impl DialogLog {
    /// Create an empty log.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record an utterance and return its id.
    pub fn record(
        &mut self,
        time: f64,
        location: Point3,
        content: impl Into<String>,
        speaker: impl Into<String>,
    ) -> DialogId {
        let uid = DialogId::new();
        self.entries.push(DialogEntry {
            uid,
            time,
            location,
            content: content.into(),
            speaker: speaker.into(),
        });
        uid
    }

    /// Utterances made within `radius` of `location` during the last
    /// `window_secs` before `now`, newest first, at most `limit`.
    ///
    /// Both bounds are strict.
    pub fn surrounding(
        &self,
        location: Point3,
        now: f64,
        radius: f64,
        window_secs: f64,
        limit: usize,
    ) -> Vec<SurroundingDialogue> {
        let mut recent: Vec<&DialogEntry> = self
            .entries
            .iter()
            .filter(|d| d.time > now - window_secs && d.location.distance(location) < radius)
            .collect();
        recent.sort_by(|a, b| b.time.total_cmp(&a.time));
        recent
            .into_iter()
            .take(limit)
            .map(|d| SurroundingDialogue {
                speaker: d.speaker.clone(),
                content: d.content.clone(),
                time: d.time,
            })
            .collect()
    }

    /// Every entry in recording order.
    pub fn entries(&self) -> &[DialogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been said.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

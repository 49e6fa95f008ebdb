//! Run-wide simulation state.
//!
//! Flags that every component reads (has the run started, has shooting
//! started, are the doors locked) live in one [`SimulationState`] value
//! passed by reference, together with the simulation clock. Resetting
//! between runs is replacing that value.
//!
//! Time is simulated: the clock advances by a fixed tick interval and
//! maps elapsed milliseconds onto a wall-clock anchor so that memory
//! timestamps read naturally.

use chrono::{DateTime, Duration, Utc};
use evac_types::Point3;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Elapsed time would overflow.
    #[error("simulation clock overflow")]
    Overflow,
}

/// Simulated time since the run started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationClock {
    /// Wall-clock instant the run is anchored to.
    started_at: DateTime<Utc>,
    /// Simulated milliseconds since start.
    elapsed_ms: u64,
    /// Ticks advanced so far.
    tick: u64,
}

impl SimulationClock {
    /// A clock at zero, anchored at `started_at`.
    pub const fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            elapsed_ms: 0,
            tick: 0,
        }
    }

    /// Advance by one tick of `interval_ms`. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Overflow`] if either counter would overflow.
    pub fn advance(&mut self, interval_ms: u64) -> Result<u64, ClockError> {
        let elapsed = self
            .elapsed_ms
            .checked_add(interval_ms)
            .ok_or(ClockError::Overflow)?;
        let tick = self.tick.checked_add(1).ok_or(ClockError::Overflow)?;
        self.elapsed_ms = elapsed;
        self.tick = tick;
        Ok(tick)
    }

    /// Ticks advanced so far.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated milliseconds since start.
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Simulated seconds since start.
    #[allow(clippy::cast_precision_loss)]
    pub const fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.0
    }

    /// Wall-clock anchor.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wall-clock instant corresponding to the current simulated time.
    pub fn now(&self) -> DateTime<Utc> {
        let offset = i64::try_from(self.elapsed_ms)
            .ok()
            .and_then(Duration::try_milliseconds)
            .unwrap_or_default();
        self.started_at
            .checked_add_signed(offset)
            .unwrap_or(self.started_at)
    }
}

/// Shared, explicitly passed simulation flags and clock.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    /// The run loop has begun ticking.
    pub has_started: bool,
    /// Building doors were locked when shooting began.
    pub doors_locked: bool,
    /// The threat is active.
    pub shooting_started: bool,
    /// Where the shooter stands, once placed.
    pub shooter_position: Option<Point3>,
    /// Simulated seconds of the most recent shot.
    pub last_shot_at: Option<f64>,
    /// Simulation clock.
    pub clock: SimulationClock,
}

impl SimulationState {
    /// Fresh state anchored at `started_at`.
    pub const fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            has_started: false,
            doors_locked: false,
            shooting_started: false,
            shooter_position: None,
            last_shot_at: None,
            clock: SimulationClock::new(started_at),
        }
    }

    /// Restore a fresh run anchored at `started_at`.
    pub fn reset(&mut self, started_at: DateTime<Utc>) {
        *self = Self::new(started_at);
    }

    /// Mark the run as started.
    pub const fn start(&mut self) {
        self.has_started = true;
    }

    /// Activate the threat at `shooter_position` and lock the doors.
    /// Returns `false` if shooting had already started.
    pub const fn begin_shooting(&mut self, shooter_position: Point3) -> bool {
        if self.shooting_started {
            return false;
        }
        self.shooting_started = true;
        self.doors_locked = true;
        self.shooter_position = Some(shooter_position);
        true
    }

    /// Whether a shot is due at the current time given `interval_secs`.
    pub fn shot_due(&self, interval_secs: f64) -> bool {
        if !self.shooting_started {
            return false;
        }
        self.last_shot_at
            .is_none_or(|last| self.clock.elapsed_secs() - last >= interval_secs)
    }

    /// Record that a shot was fired now.
    pub const fn record_shot(&mut self) {
        self.last_shot_at = Some(self.clock.elapsed_secs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_advances_and_maps_to_wall_time() {
        let start = Utc::now();
        let mut clock = SimulationClock::new(start);
        assert_eq!(clock.advance(250).ok(), Some(1));
        assert_eq!(clock.advance(250).ok(), Some(2));
        assert_eq!(clock.elapsed_ms(), 500);
        assert!((clock.elapsed_secs() - 0.5).abs() < f64::EPSILON);
        assert_eq!(clock.now().signed_duration_since(start).num_milliseconds(), 500);
    }

    #[test]
    fn clock_overflow_is_reported() {
        let mut clock = SimulationClock::new(Utc::now());
        assert!(clock.advance(u64::MAX).is_ok());
        assert!(matches!(clock.advance(1), Err(ClockError::Overflow)));
        // Failed advance leaves the clock untouched.
        assert_eq!(clock.tick(), 1);
    }

    #[test]
    fn begin_shooting_locks_doors_once() {
        let mut state = SimulationState::new(Utc::now());
        assert!(!state.doors_locked);
        assert!(state.begin_shooting(Point3::new(1.0, 0.0, 2.0)));
        assert!(state.doors_locked);
        assert_eq!(state.shooter_position, Some(Point3::new(1.0, 0.0, 2.0)));
        assert!(!state.begin_shooting(Point3::ZERO));
    }

    #[test]
    fn shots_respect_interval() {
        let mut state = SimulationState::new(Utc::now());
        assert!(!state.shot_due(1.0));
        state.begin_shooting(Point3::ZERO);
        assert!(state.shot_due(1.0));
        state.record_shot();
        assert!(!state.shot_due(1.0));
        let _ = state.clock.advance(1000);
        assert!(state.shot_due(1.0));
    }

    #[test]
    fn reset_restores_fresh_run() {
        let mut state = SimulationState::new(Utc::now());
        state.start();
        state.begin_shooting(Point3::ZERO);
        let _ = state.clock.advance(100);
        let anchor = Utc::now();
        state.reset(anchor);
        assert_eq!(state, SimulationState::new(anchor));
    }
}

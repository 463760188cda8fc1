//! Deadline scheduler for cross-board synchronized actions.
//!
//! Each board receives a `sync` command at a slightly different moment and
//! computes its own deadline from its local clock at receipt time. True
//! simultaneity therefore depends on the operator keeping worst-case
//! transport latency below the chosen delay; the scheduler only promises
//! exactly-once firing at or after the local deadline.

use embassy_time::{Duration, Instant};

/// Action to run when the armed deadline elapses.
///
/// Carries the same optional overrides as the direct commands so a fired
/// action re-enters the identical handler path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Clear all rendering and blank the display.
    Stop,
    /// Draw row 0 of one map as a static test pattern.
    Row0 { map: usize },
    /// Start one map's wave.
    Wave {
        map: usize,
        period: Option<u16>,
        speed: Option<u16>,
    },
    /// Start every map's wave.
    WaveAll {
        period: Option<u16>,
        speed: Option<u16>,
    },
}

/// Single-slot armed/idle scheduler. Re-arming overwrites silently.
pub struct SyncScheduler {
    armed: Option<(SyncAction, Instant)>,
}

impl Default for SyncScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncScheduler {
    pub const fn new() -> Self {
        Self { armed: None }
    }

    /// Arm an action to fire `delay` after `now`.
    ///
    /// Any previously armed action is discarded; last scheduled wins.
    pub fn arm(&mut self, action: SyncAction, delay: Duration, now: Instant) {
        self.armed = Some((action, now + delay));
    }

    /// Fire the armed action if its deadline has elapsed.
    ///
    /// No-op while idle. Returns the action at most once per arming and
    /// transitions back to idle.
    pub fn poll(&mut self, now: Instant) -> Option<SyncAction> {
        let (action, deadline) = self.armed?;
        if !deadline_reached(now, deadline) {
            return None;
        }
        self.armed = None;
        Some(action)
    }

    pub const fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// The pending action and deadline, for status output.
    pub const fn pending(&self) -> Option<(SyncAction, Instant)> {
        self.armed
    }
}

/// Wrap-safe deadline check: signed difference of raw ticks, never a direct
/// ordering comparison, so a wrapped tick counter still compares correctly.
#[allow(clippy::cast_possible_wrap)]
pub fn deadline_reached(now: Instant, deadline: Instant) -> bool {
    now.as_ticks().wrapping_sub(deadline.as_ticks()) as i64 >= 0
}

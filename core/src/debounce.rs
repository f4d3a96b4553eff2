//! Trailing-edge debounce for completion toggles.
//!
//! Rapid taps on a todo's checkbox should produce one update request with
//! the final state. Each toggle restarts that todo's timer; the host polls
//! with the current time and sends updates for whatever is due. No clock or
//! timer is owned here.

use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_TOGGLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
struct PendingToggle {
    deadline: Instant,
    completed: bool,
}

#[derive(Debug, Clone)]
pub struct ToggleDebouncer {
    delay: Duration,
    pending: HashMap<u64, PendingToggle>,
}

impl ToggleDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    /// Record that todo `id` should end up with `completed`, restarting its timer.
    pub fn toggle(&mut self, id: u64, completed: bool, now: Instant) {
        self.pending.insert(
            id,
            PendingToggle {
                deadline: now + self.delay,
                completed,
            },
        );
    }

    pub fn cancel(&mut self, id: u64) -> bool {
        self.pending.remove(&id).is_some()
    }

    pub fn is_pending(&self, id: u64) -> bool {
        self.pending.contains_key(&id)
    }

    /// Earliest deadline among pending toggles, for arming a host timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Remove and return `(id, completed)` for every toggle due at `now`,
    /// oldest deadline first.
    pub fn poll_due(&mut self, now: Instant) -> Vec<(u64, bool)> {
        let mut due: Vec<(Instant, u64, bool)> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(id, p)| (p.deadline, *id, p.completed))
            .collect();
        due.sort();
        for (_, id, _) in &due {
            self.pending.remove(id);
        }
        due.into_iter().map(|(_, id, completed)| (id, completed)).collect()
    }
}

impl Default for ToggleDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_TOGGLE_DELAY)
    }
}

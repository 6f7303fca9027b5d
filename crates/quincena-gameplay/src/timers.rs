//! Per-level registry of delayed and repeating callbacks.
//!
//! Timers carry a plain action value instead of a closure, so nothing can
//! capture a stale entity. The owner of each timer is recorded; the session
//! checks the owner is still alive before acting, cancels an owner's timers
//! when it leaves play and cancels everything on teardown.

use ahash::AHashMap;
use quincena_common::EntityId;
use tracing::trace;

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// What happens when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerAction {
    /// Close an actor's invulnerability window
    EndInvulnerability,
    /// Clear an enemy's attack flag
    FinishAttack,
    /// Return a cannon to its idle pose
    SettleCannon,
    /// Run the cannon fire check
    CannonCheck,
    /// Periodic regeneration of the player
    AutoHeal,
    /// Bring the helper on screen
    HelperEntry,
    /// Leave the level after the completion delay
    LevelTransition,
}

/// A timer that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    /// Timer handle
    pub id: TimerId,
    /// Entity the timer belongs to, if any
    pub owner: Option<EntityId>,
    /// Scheduled due time (ms)
    pub due: u64,
    /// Action to run
    pub action: TimerAction,
}

#[derive(Debug, Clone)]
struct Timer {
    owner: Option<EntityId>,
    due: u64,
    period: Option<u64>,
    action: TimerAction,
}

/// Registry of outstanding timers for one level session.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: AHashMap<TimerId, Timer>,
    next_id: u64,
}

impl TimerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, timer: Timer) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        trace!("Scheduled timer {:?} {:?} due at {}", id, timer.action, timer.due);
        self.timers.insert(id, timer);
        id
    }

    /// Schedules `action` once, `delay_ms` after `now`.
    pub fn schedule_once(&mut self, owner: Option<EntityId>, now: u64, delay_ms: u64, action: TimerAction) -> TimerId {
        self.insert(Timer {
            owner,
            due: now + delay_ms,
            period: None,
            action,
        })
    }

    /// Schedules `action` every `period_ms`, first firing one period after `now`.
    pub fn schedule_every(&mut self, owner: Option<EntityId>, now: u64, period_ms: u64, action: TimerAction) -> TimerId {
        let period_ms = period_ms.max(1);
        self.insert(Timer {
            owner,
            due: now + period_ms,
            period: Some(period_ms),
            action,
        })
    }

    /// Cancels one timer. Returns false if it was not pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    /// Cancels every timer owned by `owner`, returning how many were removed.
    pub fn cancel_owned_by(&mut self, owner: EntityId) -> usize {
        let before = self.timers.len();
        self.timers.retain(|_, timer| timer.owner != Some(owner));
        before - self.timers.len()
    }

    /// Cancels a pending one-shot `action` for `owner`, if any.
    pub fn cancel_action(&mut self, owner: EntityId, action: TimerAction) -> usize {
        let before = self.timers.len();
        self.timers
            .retain(|_, timer| !(timer.owner == Some(owner) && timer.action == action));
        before - self.timers.len()
    }

    /// Cancels everything, returning how many were removed.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        count
    }

    /// Removes and returns every timer due at or before `now`, ordered by due
    /// time then scheduling order. Repeating timers are rescheduled one period
    /// later and fire at most once per call.
    pub fn drain_due(&mut self, now: u64) -> Vec<FiredTimer> {
        let mut fired: Vec<FiredTimer> = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.due <= now)
            .map(|(id, timer)| FiredTimer {
                id: *id,
                owner: timer.owner,
                due: timer.due,
                action: timer.action,
            })
            .collect();
        fired.sort_by_key(|timer| (timer.due, timer.id));

        for entry in &fired {
            let Some(timer) = self.timers.get_mut(&entry.id) else {
                continue;
            };
            match timer.period {
                Some(period) => {
                    timer.due = (timer.due + period).max(now + 1);
                },
                None => {
                    self.timers.remove(&entry.id);
                },
            }
        }
        fired
    }

    /// Whether a timer is still pending.
    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

//! Scheduled one-shot timers.
//!
//! The core never blocks and never stores callbacks. A timer is a typed
//! [`TimerEvent`] (owner + [`TimerKind`]) held by a [`TimerService`]; when it
//! comes due the host hands the event back to the owning combatant, which
//! dispatches on the kind. Each combatant keeps its live handles in a
//! [`TimerTable`] so that teardown can cancel all of them at once and no
//! event ever reaches a destroyed combatant.
//!
//! [`TimerQueue`] is the deterministic reference implementation: timers fire
//! in due-tick order, ties broken by scheduling order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::world::EntityId;

/// Simulation time in ticks.
pub type Tick = u64;

/// Ticks per second.
pub const TICK_RATE: u32 = 60;

/// Convert a duration in seconds to whole ticks (rounded, at least one).
#[must_use]
pub fn seconds_to_ticks(seconds: f64) -> u32 {
    let ticks = (seconds * f64::from(TICK_RATE)).round();
    if ticks < 1.0 {
        1
    } else {
        ticks as u32
    }
}

/// Opaque handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

/// What a timer means to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// One dash charge finished recharging.
    DashRecharge,
    /// A weapon finished reloading.
    Reload {
        /// Weapon slot.
        slot: usize,
    },
    /// A weapon's refire cooldown expired.
    Refire {
        /// Weapon slot.
        slot: usize,
    },
    /// Post-execute invulnerability ended.
    Invulnerability,
    /// The area attack is ready again.
    AreaCooldown,
}

/// A scheduled event: who it belongs to and what it means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerEvent {
    /// Owning combatant.
    pub owner: EntityId,
    /// Timer meaning.
    pub kind: TimerKind,
}

/// Clock and one-shot timer service provided by the host runtime.
pub trait TimerService {
    /// Current tick.
    fn now(&self) -> Tick;

    /// Schedule `event` to fire `delay` ticks from now.
    ///
    /// A delay of zero is treated as one tick.
    fn schedule(&mut self, delay: u32, event: TimerEvent) -> TimerHandle;

    /// Cancel a timer. Returns `false` if it had already fired or been
    /// cancelled.
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    /// Whether the timer is still pending.
    fn is_active(&self, handle: TimerHandle) -> bool;

    /// Ticks left before the timer fires, if it is pending.
    fn remaining(&self, handle: TimerHandle) -> Option<u32>;
}

/// Deterministic timer queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerQueue {
    now: Tick,
    next_handle: u64,
    /// Pending timers ordered by (due tick, handle).
    pending: BTreeMap<(Tick, u64), TimerEvent>,
    /// Due tick per live handle.
    due: BTreeMap<u64, Tick>,
}

impl TimerQueue {
    /// Create an empty queue at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by one tick.
    pub fn advance(&mut self) {
        self.now += 1;
    }

    /// Pop the earliest timer that is due at the current tick.
    ///
    /// Call repeatedly until it returns `None`; timers scheduled while
    /// dispatching are due no earlier than the next tick, so the loop
    /// always terminates.
    pub fn pop_due(&mut self) -> Option<TimerEvent> {
        let (&(due, id), _) = self.pending.iter().next()?;
        if due > self.now {
            return None;
        }
        self.due.remove(&id);
        self.pending.remove(&(due, id))
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no timers are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending timers belonging to `owner`, in firing order.
    pub fn pending_for(&self, owner: EntityId) -> impl Iterator<Item = &TimerEvent> {
        self.pending.values().filter(move |e| e.owner == owner)
    }
}

impl TimerService for TimerQueue {
    fn now(&self) -> Tick {
        self.now
    }

    fn schedule(&mut self, delay: u32, event: TimerEvent) -> TimerHandle {
        let id = self.next_handle;
        self.next_handle += 1;
        let due = self.now + Tick::from(delay.max(1));
        self.pending.insert((due, id), event);
        self.due.insert(id, due);
        TimerHandle(id)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.due.remove(&handle.0) {
            Some(due) => self.pending.remove(&(due, handle.0)).is_some(),
            None => false,
        }
    }

    fn is_active(&self, handle: TimerHandle) -> bool {
        self.due.contains_key(&handle.0)
    }

    fn remaining(&self, handle: TimerHandle) -> Option<u32> {
        self.due
            .get(&handle.0)
            .map(|&due| u32::try_from(due.saturating_sub(self.now)).unwrap_or(u32::MAX))
    }
}

/// Per-combatant table of live timer handles, one per [`TimerKind`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerTable {
    handles: BTreeMap<TimerKind, TimerHandle>,
}

impl TimerTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle recorded for `kind`, which may already have fired.
    #[must_use]
    pub fn get(&self, kind: TimerKind) -> Option<TimerHandle> {
        self.handles.get(&kind).copied()
    }

    /// Number of recorded handles (live or stale).
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancel every recorded timer and clear the table.
    ///
    /// Returns how many timers were still pending.
    pub fn cancel_all(&mut self, service: &mut dyn TimerService) -> usize {
        let cancelled = self
            .handles
            .values()
            .filter(|&&handle| service.cancel(handle))
            .count();
        self.handles.clear();
        cancelled
    }
}

/// A combatant's view of the timer service: schedules on behalf of one
/// owner and records the handles in that owner's [`TimerTable`].
pub struct Scheduler<'a> {
    owner: EntityId,
    table: &'a mut TimerTable,
    service: &'a mut dyn TimerService,
}

impl<'a> Scheduler<'a> {
    /// Bind a table and a service for one owner.
    pub fn new(
        owner: EntityId,
        table: &'a mut TimerTable,
        service: &'a mut dyn TimerService,
    ) -> Self {
        Self {
            owner,
            table,
            service,
        }
    }

    /// Owning combatant.
    #[must_use]
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Current tick.
    #[must_use]
    pub fn now(&self) -> Tick {
        self.service.now()
    }

    /// Whether a timer of `kind` is pending.
    #[must_use]
    pub fn is_active(&self, kind: TimerKind) -> bool {
        self.table
            .get(kind)
            .is_some_and(|handle| self.service.is_active(handle))
    }

    /// Ticks left on the `kind` timer, if pending.
    #[must_use]
    pub fn remaining(&self, kind: TimerKind) -> Option<u32> {
        self.table
            .get(kind)
            .and_then(|handle| self.service.remaining(handle))
    }

    /// Start (or restart) the `kind` timer.
    pub fn start(&mut self, kind: TimerKind, delay: u32) -> TimerHandle {
        if let Some(previous) = self.table.handles.remove(&kind) {
            self.service.cancel(previous);
        }
        let handle = self.service.schedule(
            delay,
            TimerEvent {
                owner: self.owner,
                kind,
            },
        );
        self.table.handles.insert(kind, handle);
        handle
    }

    /// Cancel the `kind` timer. Returns `true` if one was pending.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.table.handles.remove(&kind) {
            Some(handle) => self.service.cancel(handle),
            None => false,
        }
    }

    /// Cancel every timer of this owner.
    pub fn cancel_all(&mut self) -> usize {
        self.table.cancel_all(&mut *self.service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: TimerKind) -> TimerEvent {
        TimerEvent { owner: 1, kind }
    }

    #[test]
    fn test_seconds_to_ticks() {
        assert_eq!(seconds_to_ticks(1.5), 90);
        assert_eq!(seconds_to_ticks(0.0), 1);
    }

    #[test]
    fn test_timer_fires_after_delay() {
        let mut queue = TimerQueue::new();
        let handle = queue.schedule(3, event(TimerKind::DashRecharge));

        for _ in 0..2 {
            queue.advance();
            assert!(queue.pop_due().is_none());
        }
        assert_eq!(queue.remaining(handle), Some(1));

        queue.advance();
        assert_eq!(queue.pop_due(), Some(event(TimerKind::DashRecharge)));
        assert!(!queue.is_active(handle));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_firing_order_is_due_then_schedule_order() {
        let mut queue = TimerQueue::new();
        queue.schedule(2, event(TimerKind::AreaCooldown));
        queue.schedule(1, event(TimerKind::Invulnerability));
        queue.schedule(2, event(TimerKind::DashRecharge));

        queue.advance();
        queue.advance();
        let fired: Vec<_> = std::iter::from_fn(|| queue.pop_due()).map(|e| e.kind).collect();
        assert_eq!(
            fired,
            vec![
                TimerKind::Invulnerability,
                TimerKind::AreaCooldown,
                TimerKind::DashRecharge
            ]
        );
    }

    #[test]
    fn test_cancel() {
        let mut queue = TimerQueue::new();
        let handle = queue.schedule(5, event(TimerKind::Reload { slot: 0 }));
        assert!(queue.cancel(handle));
        assert!(!queue.cancel(handle));
        assert!(!queue.is_active(handle));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_scheduler_restart_replaces_handle() {
        let mut queue = TimerQueue::new();
        let mut table = TimerTable::new();
        let mut scheduler = Scheduler::new(7, &mut table, &mut queue);

        let first = scheduler.start(TimerKind::Refire { slot: 1 }, 10);
        let second = scheduler.start(TimerKind::Refire { slot: 1 }, 4);
        assert_ne!(first, second);
        assert_eq!(scheduler.remaining(TimerKind::Refire { slot: 1 }), Some(4));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_cancel_all_clears_every_owner_timer() {
        let mut queue = TimerQueue::new();
        let mut table = TimerTable::new();
        {
            let mut scheduler = Scheduler::new(7, &mut table, &mut queue);
            scheduler.start(TimerKind::DashRecharge, 90);
            scheduler.start(TimerKind::Invulnerability, 30);
            scheduler.start(TimerKind::AreaCooldown, 900);
        }
        queue.schedule(
            5,
            TimerEvent {
                owner: 8,
                kind: TimerKind::DashRecharge,
            },
        );

        assert_eq!(table.cancel_all(&mut queue), 3);
        assert!(table.is_empty());
        assert_eq!(queue.pending_for(7).count(), 0);
        assert_eq!(queue.pending_for(8).count(), 1);
    }
}

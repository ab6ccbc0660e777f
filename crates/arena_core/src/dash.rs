//! Charge-based dash.
//!
//! A dash spends one charge and launches the combatant along a direction.
//! Charges come back one at a time: while below capacity exactly one
//! recharge timer is pending, and each completion restarts it until the
//! pool is full again.

use serde::{Deserialize, Serialize};

use crate::config::DashConfig;
use crate::math::{fixed_serde, Fixed, Vec3Fixed};
use crate::pool::{PoolChange, ResourcePool};
use crate::timer::{Scheduler, TimerKind};

/// Dash charges and their recharge cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashAbility {
    charges: ResourcePool<u32>,
    #[serde(with = "fixed_serde")]
    impulse: Fixed,
    recharge_ticks: u32,
}

impl DashAbility {
    /// Create a dash that starts with every charge available.
    #[must_use]
    pub fn new(config: &DashConfig) -> Self {
        Self {
            charges: ResourcePool::full(config.max_charges),
            impulse: config.impulse,
            recharge_ticks: config.recharge_ticks,
        }
    }

    /// Charges available.
    #[must_use]
    pub fn charges(&self) -> u32 {
        self.charges.current()
    }

    /// Charge capacity.
    #[must_use]
    pub fn max_charges(&self) -> u32 {
        self.charges.max()
    }

    /// Launch speed.
    #[must_use]
    pub fn impulse(&self) -> Fixed {
        self.impulse
    }

    /// Current `(charges, max)` for HUD refreshes.
    #[must_use]
    pub fn snapshot(&self) -> PoolChange<u32> {
        self.charges.snapshot()
    }

    /// Spend a charge and return the launch velocity.
    ///
    /// Fails with no charge available or a (nearly) zero direction; a
    /// failed dash changes nothing.
    pub fn try_dash(
        &mut self,
        direction: Vec3Fixed,
        scheduler: &mut Scheduler<'_>,
    ) -> Option<Vec3Fixed> {
        if self.charges.is_empty() || direction.is_nearly_zero() {
            return None;
        }
        self.charges.add(-1);
        self.ensure_recharging(scheduler);
        Some(direction.normalize().scale(self.impulse))
    }

    /// Restore one charge and keep the cycle going while below capacity.
    pub fn on_recharge_complete(
        &mut self,
        scheduler: &mut Scheduler<'_>,
    ) -> Option<PoolChange<u32>> {
        let change = self.charges.add(1);
        self.ensure_recharging(scheduler);
        change
    }

    /// Start the recharge timer if below capacity and none is pending.
    pub fn ensure_recharging(&mut self, scheduler: &mut Scheduler<'_>) {
        if !self.charges.is_full() && !scheduler.is_active(TimerKind::DashRecharge) {
            scheduler.start(TimerKind::DashRecharge, self.recharge_ticks);
        }
    }

    /// Refill every charge and stop recharging.
    pub fn reset(&mut self, scheduler: &mut Scheduler<'_>) -> Option<PoolChange<u32>> {
        scheduler.cancel(TimerKind::DashRecharge);
        self.charges.fill()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{TimerQueue, TimerService, TimerTable};

    fn config() -> DashConfig {
        DashConfig {
            impulse: Fixed::from_num(2000),
            max_charges: 2,
            recharge_ticks: 90,
        }
    }

    fn forward() -> Vec3Fixed {
        Vec3Fixed::from_ints(1, 0, 0)
    }

    /// Advance until the next timer fires, returning how many ticks passed.
    fn run_until_due(queue: &mut TimerQueue) -> u32 {
        let mut ticks = 0;
        loop {
            queue.advance();
            ticks += 1;
            if queue.pop_due().is_some() {
                return ticks;
            }
        }
    }

    #[test]
    fn test_dash_spends_charge_and_launches() {
        let mut queue = TimerQueue::new();
        let mut table = TimerTable::new();
        let mut dash = DashAbility::new(&config());

        let velocity = {
            let mut scheduler = Scheduler::new(1, &mut table, &mut queue);
            dash.try_dash(Vec3Fixed::from_ints(0, 3, 0), &mut scheduler)
        };

        assert_eq!(velocity, Some(Vec3Fixed::from_ints(0, 2000, 0)));
        assert_eq!(dash.charges(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_third_dash_fails_then_one_charge_returns() {
        let mut queue = TimerQueue::new();
        let mut table = TimerTable::new();
        let mut dash = DashAbility::new(&config());

        {
            let mut scheduler = Scheduler::new(1, &mut table, &mut queue);
            assert!(dash.try_dash(forward(), &mut scheduler).is_some());
            assert!(dash.try_dash(forward(), &mut scheduler).is_some());
            assert!(dash.try_dash(forward(), &mut scheduler).is_none());
        }
        assert_eq!(dash.charges(), 0);
        assert_eq!(queue.len(), 1);

        assert_eq!(run_until_due(&mut queue), 90);
        let change = {
            let mut scheduler = Scheduler::new(1, &mut table, &mut queue);
            dash.on_recharge_complete(&mut scheduler)
        };

        assert_eq!(change, Some(PoolChange { current: 1, max: 2 }));
        assert_eq!(queue.len(), 1, "still below capacity: exactly one timer pending");
    }

    #[test]
    fn test_recharge_stops_at_capacity() {
        let mut queue = TimerQueue::new();
        let mut table = TimerTable::new();
        let mut dash = DashAbility::new(&config());

        {
            let mut scheduler = Scheduler::new(1, &mut table, &mut queue);
            dash.try_dash(forward(), &mut scheduler);
        }
        run_until_due(&mut queue);
        {
            let mut scheduler = Scheduler::new(1, &mut table, &mut queue);
            dash.on_recharge_complete(&mut scheduler);
        }

        assert_eq!(dash.charges(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_zero_direction_changes_nothing() {
        let mut queue = TimerQueue::new();
        let mut table = TimerTable::new();
        let mut dash = DashAbility::new(&config());

        let mut scheduler = Scheduler::new(1, &mut table, &mut queue);
        assert!(dash.try_dash(Vec3Fixed::ZERO, &mut scheduler).is_none());
        assert_eq!(dash.charges(), 2);
        assert!(!scheduler.is_active(TimerKind::DashRecharge));
    }

    #[test]
    fn test_second_dash_does_not_restart_recharge() {
        let mut queue = TimerQueue::new();
        let mut table = TimerTable::new();
        let mut dash = DashAbility::new(&config());

        {
            let mut scheduler = Scheduler::new(1, &mut table, &mut queue);
            dash.try_dash(forward(), &mut scheduler);
        }
        for _ in 0..30 {
            queue.advance();
        }
        let mut scheduler = Scheduler::new(1, &mut table, &mut queue);
        dash.try_dash(forward(), &mut scheduler);
        assert_eq!(scheduler.remaining(TimerKind::DashRecharge), Some(60));
    }

    #[test]
    fn test_reset_refills_and_cancels() {
        let mut queue = TimerQueue::new();
        let mut table = TimerTable::new();
        let mut dash = DashAbility::new(&config());

        let mut scheduler = Scheduler::new(1, &mut table, &mut queue);
        dash.try_dash(forward(), &mut scheduler);
        assert!(dash.reset(&mut scheduler).is_some());
        assert_eq!(dash.charges(), 2);
        assert!(!scheduler.is_active(TimerKind::DashRecharge));
        drop(scheduler);
        assert_eq!(queue.now(), 0);
        assert!(queue.is_empty());
    }

    // =========================================================================
    // Property tests
    // =========================================================================

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_charges_bounded_with_one_timer_while_recharging(
            max_charges in 1u32..5,
            recharge_ticks in 1u32..120,
            ops in proptest::collection::vec((any::<bool>(), 1u32..200), 0..40),
        ) {
            let config = DashConfig {
                impulse: Fixed::from_num(2000),
                max_charges,
                recharge_ticks,
            };
            let mut queue = TimerQueue::new();
            let mut table = TimerTable::new();
            let mut dash = DashAbility::new(&config);

            for (is_dash, ticks) in ops {
                if is_dash {
                    let mut scheduler = Scheduler::new(1, &mut table, &mut queue);
                    dash.try_dash(forward(), &mut scheduler);
                } else {
                    for _ in 0..ticks {
                        queue.advance();
                        while queue.pop_due().is_some() {
                            let mut scheduler = Scheduler::new(1, &mut table, &mut queue);
                            dash.on_recharge_complete(&mut scheduler);
                        }
                    }
                }
                prop_assert!(dash.charges() <= dash.max_charges());
                prop_assert_eq!(queue.len(), usize::from(dash.charges() < dash.max_charges()));
            }
        }
    }
}

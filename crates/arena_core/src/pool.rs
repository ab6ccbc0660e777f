//! Clamped resource pools.
//!
//! Health, armor, chainsaw fuel, dash charges, magazines and reserve ammo are
//! all [`ResourcePool`]s: a current value held inside `[0, max]`. Every
//! mutation clamps, and every mutation that actually changes the value
//! returns a [`PoolChange`] that the owner forwards to the presentation
//! layer. A mutation that clamps back to the previous value returns `None`.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// A value type that can live in a [`ResourcePool`].
pub trait PoolValue: Copy + Ord + std::fmt::Debug {
    /// Signed change type accepted by [`ResourcePool::add`].
    type Delta: Copy;

    /// The empty value.
    const EMPTY: Self;

    /// `self + delta`, saturating at the type's bounds. Never negative for
    /// unsigned types.
    fn offset(self, delta: Self::Delta) -> Self;
}

impl PoolValue for u32 {
    type Delta = i64;

    const EMPTY: Self = 0;

    fn offset(self, delta: i64) -> Self {
        let raw = i64::from(self).saturating_add(delta);
        raw.clamp(0, i64::from(u32::MAX)) as u32
    }
}

impl PoolValue for Fixed {
    type Delta = Fixed;

    const EMPTY: Self = Fixed::ZERO;

    fn offset(self, delta: Fixed) -> Self {
        self.saturating_add(delta)
    }
}

/// Notification emitted when a pool's current value changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolChange<T> {
    /// Value after the change.
    pub current: T,
    /// Pool ceiling.
    pub max: T,
}

/// A clamped counter with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourcePool<T> {
    current: T,
    max: T,
}

impl<T: PoolValue> ResourcePool<T> {
    /// Create a pool, clamping `initial` into `[0, max]`.
    #[must_use]
    pub fn new(initial: T, max: T) -> Self {
        let max = max.max(T::EMPTY);
        Self {
            current: initial.clamp(T::EMPTY, max),
            max,
        }
    }

    /// Create a pool that starts full.
    #[must_use]
    pub fn full(max: T) -> Self {
        Self::new(max, max)
    }

    /// Current value.
    #[must_use]
    pub fn current(&self) -> T {
        self.current
    }

    /// Ceiling.
    #[must_use]
    pub fn max(&self) -> T {
        self.max
    }

    /// True at zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current == T::EMPTY
    }

    /// True at the ceiling.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.current == self.max
    }

    /// Set the current value, clamped to `[0, max]`.
    ///
    /// Returns the change notification if the clamped value differs from the
    /// previous one.
    pub fn set(&mut self, value: T) -> Option<PoolChange<T>> {
        let clamped = value.clamp(T::EMPTY, self.max);
        if clamped == self.current {
            return None;
        }
        self.current = clamped;
        Some(self.snapshot())
    }

    /// Add `delta` (which may be negative) to the current value.
    pub fn add(&mut self, delta: T::Delta) -> Option<PoolChange<T>> {
        self.set(self.current.offset(delta))
    }

    /// Refill to the ceiling.
    pub fn fill(&mut self) -> Option<PoolChange<T>> {
        self.set(self.max)
    }

    /// Empty the pool.
    pub fn drain(&mut self) -> Option<PoolChange<T>> {
        self.set(T::EMPTY)
    }

    /// Change the ceiling, re-clamping the current value.
    pub fn set_max(&mut self, max: T) -> Option<PoolChange<T>> {
        self.max = max.max(T::EMPTY);
        let clamped = self.current.min(self.max);
        if clamped == self.current {
            return None;
        }
        self.current = clamped;
        Some(self.snapshot())
    }

    /// Current `(current, max)` pair, for HUD refreshes that are not tied to
    /// a change.
    #[must_use]
    pub fn snapshot(&self) -> PoolChange<T> {
        PoolChange {
            current: self.current,
            max: self.max,
        }
    }
}

impl ResourcePool<u32> {
    /// Room left below the ceiling.
    #[must_use]
    pub fn missing(&self) -> u32 {
        self.max - self.current
    }

    /// Remove up to `amount`, returning how much was actually taken.
    pub fn take(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.current);
        self.current -= taken;
        taken
    }
}

impl ResourcePool<Fixed> {
    /// Current value as a fraction of the ceiling (zero for a zero ceiling).
    #[must_use]
    pub fn fraction(&self) -> Fixed {
        if self.max == Fixed::ZERO {
            return Fixed::ZERO;
        }
        self.current / self.max
    }
}

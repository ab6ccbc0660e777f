//! # Arena Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Determinism test harness
//! - Fixture loadouts and arenas
//! - A recording [`World`](arena_core::world::World) for driving a lone
//!   combatant
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;

//! Replay checks for the arena.
//!
//! A fight is reproducible when the same seed and the same action script
//! always end on the same [`Arena::state_hash`]. Replays, spectating and
//! rollback all lean on that, so the harness here runs arenas side by side
//! and compares hashes:
//!
//! - [`verify_determinism`] runs any steppable state several times in a row
//! - [`run_parallel_arenas_scoped`] runs scripted arenas on scoped threads
//! - [`find_first_divergence`] steps two arenas in lockstep and reports the
//!   first tick whose hashes differ
//! - [`verify_serialization_determinism`] snapshots mid-fight and checks the
//!   restored arena keeps pace with the original
//!
//! The combat core keeps its side of the bargain with fixed-point math
//! (trig and square roots included), a per-combatant seeded
//! [`SimRng`](arena_core::math::SimRng) for pellet spread, and timers that
//! fire in start order when they share a tick.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use arena_core::arena::Arena;

use crate::fixtures::ScriptedArena;

/// Final state hashes from a set of runs of the same setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashReport {
    /// Final hash of each run, in run order.
    pub hashes: Vec<u64>,
    /// Ticks each run was stepped.
    pub ticks: u64,
}

impl HashReport {
    /// Whether every run ended on the same hash.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.first_divergent_run().is_none()
    }

    /// Index of the first run whose hash differs from run 0.
    #[must_use]
    pub fn first_divergent_run(&self) -> Option<usize> {
        let first = self.hashes.first()?;
        self.hashes.iter().position(|hash| hash != first)
    }

    /// Distinct hashes, sorted.
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// # Panics
    ///
    /// Panics, listing every hash, when the runs disagree.
    pub fn assert_deterministic(&self) {
        if let Some(run) = self.first_divergent_run() {
            panic!(
                "run {run} of {} diverged after {} ticks ({} distinct hashes): {:?}",
                self.hashes.len(),
                self.ticks,
                self.unique_hashes().len(),
                self.hashes
            );
        }
    }
}

/// Build `runs` fresh states with `setup`, step each `ticks` times and
/// collect `hash` of every final state.
///
/// ```
/// use arena_test_utils::determinism::verify_determinism;
/// use arena_test_utils::fixtures::brawl;
///
/// let report = verify_determinism(3, 120, brawl, |run| run.step(), |run| run.state_hash());
/// report.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> HashReport
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let hashes = (0..runs)
        .map(|_| {
            let mut state = setup();
            (0..ticks).for_each(|_| step(&mut state));
            hash(&state)
        })
        .collect();
    HashReport { hashes, ticks }
}

/// Run a scripted arena twice and check the final hashes match.
pub fn verify_arena_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> ScriptedArena,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        ScriptedArena::step,
        ScriptedArena::state_hash,
    )
    .is_deterministic()
}

/// Step `arenas` scripted arenas on scoped threads, one per thread.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_arenas_scoped<F>(setup_fn: F, arenas: usize, num_ticks: u64) -> HashReport
where
    F: Fn() -> ScriptedArena + Sync,
{
    let hashes = thread::scope(|s| {
        let workers: Vec<_> = (0..arenas)
            .map(|_| {
                s.spawn(|| {
                    let mut run = setup_fn();
                    for _ in 0..num_ticks {
                        run.step();
                    }
                    run.state_hash()
                })
            })
            .collect();

        workers
            .into_iter()
            .map(|worker| match worker.join() {
                Ok(hash) => hash,
                Err(_) => panic!("arena worker thread panicked"),
            })
            .collect()
    });

    HashReport {
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match, `Some(tick)` if they diverge at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> ScriptedArena,
{
    let mut run1 = setup_fn();
    let mut run2 = setup_fn();

    if run1.state_hash() != run2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        run1.step();
        run2.step();

        if run1.state_hash() != run2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a bincode round-trip preserves arena state exactly, and
/// that the restored arena keeps evolving identically.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> ScriptedArena,
{
    let mut run = setup_fn();

    for _ in 0..num_ticks {
        run.step();
    }

    let hash_before = run.state_hash();

    let Ok(bytes) = run.arena.serialize() else {
        return false;
    };
    let Ok(restored) = Arena::deserialize(&bytes) else {
        return false;
    };

    if restored.state_hash() != hash_before {
        return false;
    }

    let mut original = run.arena;
    let mut restored = restored;
    for _ in 0..num_ticks.max(30) {
        original.tick();
        restored.tick();
    }
    original.state_hash() == restored.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of the combat core.
pub mod strategies {
    use arena_core::arena::EnemySpawn;
    use arena_core::combatant::Action;
    use arena_core::math::{Fixed, Vec3Fixed};
    use proptest::prelude::*;

    use crate::fixtures::ScriptStep;

    /// Generate a fixed-point coordinate within a typical arena.
    ///
    /// Range: -3000 to 3000
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (-3000i32..3000i32).prop_map(Fixed::from_num)
    }

    /// Generate a position on the arena floor.
    pub fn arb_floor_position() -> impl Strategy<Value = Vec3Fixed> {
        (arb_fixed_position(), arb_fixed_position())
            .prop_map(|(x, y)| Vec3Fixed::new(x, y, Fixed::ZERO))
    }

    /// Generate a non-zero direction with small integer components.
    pub fn arb_direction() -> impl Strategy<Value = Vec3Fixed> {
        (-10i32..=10, -10i32..=10, -10i32..=10)
            .prop_filter("non-zero", |&(x, y, z)| (x, y, z) != (0, 0, 0))
            .prop_map(|(x, y, z)| Vec3Fixed::from_ints(x, y, z))
    }

    /// Generate damage values (1-100).
    pub fn arb_damage() -> impl Strategy<Value = Fixed> {
        (1i32..100i32).prop_map(Fixed::from_num)
    }

    /// Generate any player action.
    pub fn arb_action() -> impl Strategy<Value = Action> {
        prop_oneof![
            Just(Action::Dash),
            Just(Action::Execute),
            Just(Action::RefuelKill),
            Just(Action::AreaAttack),
            Just(Action::Jump),
            Just(Action::Land),
            (0usize..4).prop_map(Action::SelectWeapon),
            (-2i32..=2).prop_map(Action::ScrollWeapon),
            Just(Action::StartFiring),
            Just(Action::StopFiring),
            Just(Action::Reload),
            Just(Action::AltFire),
        ]
    }

    /// Generate a script of up to `max_len` actions within `ticks`.
    pub fn arb_script(max_len: usize, ticks: u64) -> impl Strategy<Value = Vec<ScriptStep>> {
        proptest::collection::vec((0..ticks, arb_action()), 0..max_len).prop_map(|steps| {
            steps
                .into_iter()
                .map(|(tick, action)| ScriptStep { tick, action })
                .collect()
        })
    }

    /// Generate enemy spawn parameters.
    pub fn arb_enemy_spawn() -> impl Strategy<Value = EnemySpawn> {
        (arb_floor_position(), 1i32..300, 0i32..100).prop_map(|(position, health, stagger)| {
            EnemySpawn {
                position,
                health: Fixed::from_num(health),
                stagger_threshold: Fixed::from_num(stagger),
                ..EnemySpawn::default()
            }
        })
    }

    /// Generate a list of enemy spawns.
    pub fn arb_enemy_list(max_enemies: usize) -> impl Strategy<Value = Vec<EnemySpawn>> {
        proptest::collection::vec(arb_enemy_spawn(), 1..max_enemies)
    }
}

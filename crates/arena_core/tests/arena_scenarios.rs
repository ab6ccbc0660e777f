//! Arena scenarios: the player against real enemies and bodies.
//!
//! These run the reference [`Arena`] host tick by tick and check the
//! combined outcome of weapons, abilities, burning and timer dispatch.

use arena_core::prelude::*;
use arena_test_utils::determinism::verify_arena_determinism;
use arena_test_utils::fixtures::{
    arena_with_player, brawl, enemy_at, fixed, loadout, rifle_only, vec3, ScriptedArena,
};

fn run(arena: &mut Arena, ticks: u32) -> Vec<TickEvents> {
    (0..ticks).map(|_| arena.tick()).collect()
}

fn deaths(events: &[TickEvents]) -> Vec<EnemyDeath> {
    events.iter().flat_map(|e| e.deaths.iter().copied()).collect()
}

// =============================================================================
// Weapons against enemies
// =============================================================================

mod weapons {
    use super::*;

    #[test]
    fn test_rifle_kills_enemy_in_four_rounds() {
        let mut arena = arena_with_player(rifle_only());
        let target = arena.spawn_enemy(enemy_at(500, 0));

        assert_eq!(
            arena.start_firing(),
            Some(FireOutcome::Fired { rays: 1, hits: 1 })
        );
        let events = run(&mut arena, 20);

        assert_eq!(
            deaths(&events),
            vec![EnemyDeath {
                id: target,
                cause: DeathCause::Damage(DamageKind::Ballistic),
            }]
        );
        let magazine = arena.player().map(|p| p.weapons()[0].magazine());
        assert_eq!(magazine, Some(26));
    }

    #[test]
    fn test_nearer_enemy_shields_farther() {
        let mut arena = arena_with_player(rifle_only());
        let near = arena.spawn_enemy(enemy_at(300, 0));
        let far = arena.spawn_enemy(enemy_at(600, 0));

        arena.start_firing();
        arena.apply_action(Action::StopFiring);
        arena.tick();

        assert_eq!(arena.enemy(near).map(|e| e.health.current()).ok(), Some(fixed(75)));
        assert_eq!(arena.enemy(far).map(|e| e.health.current()).ok(), Some(fixed(100)));
    }

    #[test]
    fn test_shotgun_pushes_simulating_body() {
        let mut arena = arena_with_player(loadout(vec![WeaponDescriptor::super_shotgun()]));
        let body = arena.spawn_body(vec3(200, 0, 0), fixed(30), fixed(10), true);
        let fixed_body = arena.spawn_body(vec3(0, 200, 0), fixed(30), fixed(10), false);

        arena.start_firing();
        arena.tick();

        let pushed = arena.bodies().iter().find(|b| b.id == body);
        assert!(pushed.is_some_and(|b| b.velocity.x > Fixed::ZERO));
        let untouched = arena.bodies().iter().find(|b| b.id == fixed_body);
        assert!(untouched.is_some_and(|b| b.velocity == Vec3Fixed::ZERO));
    }

    #[test]
    fn test_rocket_requests_projectile() {
        let mut arena = arena_with_player(loadout(vec![WeaponDescriptor::rocket_launcher()]));

        assert_eq!(arena.start_firing(), Some(FireOutcome::Launched));
        let events = arena.tick();

        assert_eq!(events.projectiles.len(), 1);
        let request = &events.projectiles[0];
        assert_eq!(request.speed, fixed(3000));
        assert_eq!(request.kind, DamageKind::Explosive);
        assert!(request.direction.x > Fixed::ZERO);
        assert_eq!(request.owner, arena.player().map_or(0, Combatant::id));
    }
}

// =============================================================================
// Abilities against enemies
// =============================================================================

mod abilities {
    use super::*;

    #[test]
    fn test_wound_then_execute() {
        let mut arena = arena_with_player(rifle_only());
        let target = arena.spawn_enemy(EnemySpawn {
            health: fixed(70),
            ..enemy_at(200, 0)
        });

        arena.start_firing();
        run(&mut arena, 6);
        arena.apply_action(Action::StopFiring);

        let enemy = arena.enemy(target).ok().cloned();
        assert!(enemy.is_some_and(|e| e.is_staggered()));

        assert!(arena.apply_action(Action::Execute));
        let events = arena.tick();

        assert_eq!(
            events.deaths,
            vec![EnemyDeath {
                id: target,
                cause: DeathCause::Executed,
            }]
        );
        assert!(events
            .combat
            .contains(&CombatEvent::InvulnerabilityChanged { active: true }));
        assert_eq!(
            arena.damage_player(fixed(30), DamageKind::Generic),
            Fixed::ZERO
        );
    }

    #[test]
    fn test_chainsaw_kill() {
        let mut arena = arena_with_player(CombatantConfig::default());
        let target = arena.spawn_enemy(enemy_at(150, 0));

        assert!(arena.apply_action(Action::RefuelKill));
        let events = arena.tick();

        assert_eq!(
            events.deaths,
            vec![EnemyDeath {
                id: target,
                cause: DeathCause::Chainsaw,
            }]
        );
        assert_eq!(arena.player().map(|p| p.fuel().current()), Some(2));
    }

    #[test]
    fn test_area_attack_burns_over_time() {
        let mut arena = arena_with_player(CombatantConfig::default());
        let target = arena.spawn_enemy(enemy_at(300, 0));
        let behind = arena.spawn_enemy(enemy_at(-300, 0));

        assert!(arena.apply_action(Action::AreaAttack));
        run(&mut arena, 300);

        let burnt = arena.enemy(target).ok().cloned();
        assert!(burnt.as_ref().is_some_and(|e| !e.is_burning()));
        let health = burnt.map_or(Fixed::ZERO, |e| e.health.current());
        assert!(health > fixed(39) && health < fixed(41));

        let spared = arena.enemy(behind).map(|e| e.health.current()).ok();
        assert_eq!(spared, Some(fixed(100)));
    }

    #[test]
    fn test_burning_kills_weak_enemy() {
        let mut arena = arena_with_player(CombatantConfig::default());
        let target = arena.spawn_enemy(EnemySpawn {
            health: fixed(5),
            ..enemy_at(300, 0)
        });

        arena.apply_action(Action::AreaAttack);
        let events = run(&mut arena, 300);

        assert_eq!(
            deaths(&events),
            vec![EnemyDeath {
                id: target,
                cause: DeathCause::Burned,
            }]
        );
    }
}

// =============================================================================
// Host lifecycle
// =============================================================================

mod lifecycle {
    use super::*;

    #[test]
    fn test_despawn_cancels_player_timers() {
        let mut arena = arena_with_player(CombatantConfig::default());
        arena.apply_action(Action::Dash);
        arena.apply_action(Action::AreaAttack);
        assert_eq!(arena.timers().len(), 2);

        let player = arena.despawn_player();
        assert!(player.is_some());
        assert!(arena.timers().is_empty());

        let events = run(&mut arena, 1000);
        assert!(events.iter().all(|e| e.combat.is_empty()));
    }

    #[test]
    fn test_actions_without_player_are_ignored() {
        let mut arena = Arena::new();
        assert!(!arena.apply_action(Action::Dash));
        assert_eq!(arena.start_firing(), None);
        assert_eq!(arena.damage_player(fixed(10), DamageKind::Generic), Fixed::ZERO);
    }

    #[test]
    fn test_unknown_enemy_is_an_error() {
        let arena = Arena::new();
        assert!(matches!(arena.enemy(77), Err(GameError::EntityNotFound(77))));
    }

    #[test]
    fn test_invalid_player_config_is_rejected() {
        let mut arena = Arena::new();
        let result = arena.spawn_player(loadout(Vec::new()));
        assert!(matches!(result, Err(GameError::InvalidConfig { .. })));
        assert!(arena.player().is_none());
    }

    #[test]
    fn test_snapshot_restores_mid_fight() {
        let mut fight = brawl();
        for _ in 0..100 {
            fight.step();
        }

        let bytes = fight.arena.serialize();
        assert!(bytes.is_ok());
        let restored = bytes.and_then(|b| Arena::deserialize(&b));
        assert_eq!(
            restored.map(|a| a.state_hash()).ok(),
            Some(fight.arena.state_hash())
        );
    }

    #[test]
    fn test_identical_runs_hash_identically() {
        assert!(verify_arena_determinism(brawl, 400));
        assert!(verify_arena_determinism(
            || ScriptedArena::new(arena_with_player(rifle_only()), Vec::new()),
            100
        ));
    }
}

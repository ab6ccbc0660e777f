//! Ability and weapon flows for a lone combatant.
//!
//! These drive a [`Combatant`] directly against a recording world and the
//! reference timer queue, checking the externally visible behavior of each
//! ability end to end.

use arena_core::prelude::*;
use arena_test_utils::fixtures::{
    fixed, hostile, run_ticks, shotgun_only, spawn_combatant, vec3, RecordingWorld,
};

fn setup(config: CombatantConfig, world: RecordingWorld) -> (Combatant, TimerQueue, RecordingWorld) {
    (spawn_combatant(config), TimerQueue::new(), world)
}

// =============================================================================
// Dash
// =============================================================================

mod dash {
    use super::*;

    #[test]
    fn test_two_dashes_then_empty() {
        let (mut player, mut queue, mut world) =
            setup(CombatantConfig::default(), RecordingWorld::default());

        assert!(player.handle_action(Action::Dash, &mut queue, &mut world));
        assert!(player.handle_action(Action::Dash, &mut queue, &mut world));
        assert_eq!(player.dash_ability().charges(), 0);

        assert!(!player.handle_action(Action::Dash, &mut queue, &mut world));
        assert_eq!(player.dash_ability().charges(), 0);
    }

    #[test]
    fn test_one_recharge_period_restores_one_charge() {
        let (mut player, mut queue, mut world) =
            setup(CombatantConfig::default(), RecordingWorld::default());
        player.dash(&mut queue);
        player.dash(&mut queue);

        run_ticks(&mut player, &mut queue, &mut world, 90);

        assert_eq!(player.dash_ability().charges(), 1);
        assert_eq!(queue.pending_for(player.id()).count(), 1);
    }

    #[test]
    fn test_dash_reports_charges_even_when_empty() {
        let (mut player, mut queue, _world) =
            setup(CombatantConfig::default(), RecordingWorld::default());
        player.dash(&mut queue);
        player.dash(&mut queue);
        player.drain_events();

        assert!(!player.dash(&mut queue));
        assert_eq!(
            player.drain_events(),
            vec![CombatEvent::DashChargesChanged { current: 0, max: 2 }]
        );
    }
}

// =============================================================================
// Weapons
// =============================================================================

mod weapons {
    use super::*;

    #[test]
    fn test_super_shotgun_empties_then_reloads() {
        let (mut player, mut queue, mut world) = setup(shotgun_only(), RecordingWorld::default());

        assert_eq!(
            player.start_firing(&mut queue, &mut world),
            Some(FireOutcome::Fired { rays: 8, hits: 0 })
        );
        player.stop_firing();
        run_ticks(&mut player, &mut queue, &mut world, 48);

        player.start_firing(&mut queue, &mut world);
        let shotgun = &player.weapons()[0];
        assert_eq!(shotgun.magazine(), 0);
        assert!(shotgun.is_reloading());
        assert_eq!(world.ray_count(), 16);

        run_ticks(&mut player, &mut queue, &mut world, 36);

        let shotgun = &player.weapons()[0];
        assert_eq!(shotgun.magazine(), 2);
        assert_eq!(shotgun.reserve(), 28);
        assert_eq!(shotgun.state(), WeaponState::FiringCooldown);
    }

    #[test]
    fn test_pellets_damage_struck_hostile_only() {
        let mut world = RecordingWorld::default();
        world.default_hit = Some(arena_core::world::RayHit {
            point: vec3(100, 0, 0),
            normal: vec3(-1, 0, 0),
            entity: Some(42),
            body: Some(7),
        });
        let (mut player, mut queue, mut world) = setup(shotgun_only(), world);

        player.start_firing(&mut queue, &mut world);

        assert_eq!(world.damage.len(), 8);
        assert!(world
            .damage
            .iter()
            .all(|&(target, amount, kind)| target == 42
                && amount == fixed(12)
                && kind == DamageKind::Ballistic));
        assert_eq!(world.impulses.len(), 8);
    }

    #[test]
    fn test_self_hits_deal_no_damage() {
        let mut world = RecordingWorld::default();
        world.default_hit = Some(arena_core::world::RayHit {
            point: vec3(5, 0, 0),
            normal: vec3(-1, 0, 0),
            entity: Some(1),
            body: None,
        });
        let (mut player, mut queue, mut world) = setup(shotgun_only(), world);

        player.start_firing(&mut queue, &mut world);

        assert!(world.damage.is_empty());
    }

    #[test]
    fn test_manual_reload_needs_missing_rounds() {
        let (mut player, mut queue, mut world) = setup(shotgun_only(), RecordingWorld::default());

        assert!(!player.handle_action(Action::Reload, &mut queue, &mut world));

        player.start_firing(&mut queue, &mut world);
        player.stop_firing();
        assert!(player.handle_action(Action::Reload, &mut queue, &mut world));
        assert!(!player.handle_action(Action::Reload, &mut queue, &mut world));
    }

    #[test]
    fn test_scroll_wraps_both_ways() {
        let (mut player, mut queue, mut world) =
            setup(CombatantConfig::default(), RecordingWorld::default());

        assert!(player.handle_action(Action::ScrollWeapon(-1), &mut queue, &mut world));
        assert_eq!(player.active_slot(), 1);
        assert!(player.handle_action(Action::ScrollWeapon(1), &mut queue, &mut world));
        assert_eq!(player.active_slot(), 0);
        assert!(player.handle_action(Action::ScrollWeapon(1), &mut queue, &mut world));
        assert_eq!(player.active_slot(), 2);

        let events = player.drain_events();
        assert!(events.contains(&CombatEvent::WeaponSwitched { from: 0, to: 2 }));
    }

    #[test]
    fn test_select_rejects_current_and_out_of_range() {
        let (mut player, _queue, _world) =
            setup(CombatantConfig::default(), RecordingWorld::default());

        assert!(!player.select_weapon(0));
        assert!(!player.select_weapon(9));
        assert!(player.select_weapon(2));
        assert!(player.weapons()[2].is_active());
        assert!(!player.weapons()[0].is_active());
    }

    #[test]
    fn test_alt_fire_does_nothing() {
        let (mut player, mut queue, mut world) =
            setup(CombatantConfig::default(), RecordingWorld::default());

        assert!(!player.handle_action(Action::AltFire, &mut queue, &mut world));
        assert!(player.pending_events().is_empty());
        assert!(queue.is_empty());
    }
}

// =============================================================================
// Special actions
// =============================================================================

mod specials {
    use super::*;

    #[test]
    fn test_execute_grants_timed_invulnerability() {
        let world = RecordingWorld::with_hostiles(vec![hostile(9, vec3(100, 0, 0), true)]);
        let (mut player, mut queue, mut world) = setup(CombatantConfig::default(), world);

        assert!(player.handle_action(Action::Execute, &mut queue, &mut world));
        assert!(player.is_invulnerable());
        assert_eq!(world.executed, vec![9]);

        run_ticks(&mut player, &mut queue, &mut world, 29);
        assert!(player.is_invulnerable());

        run_ticks(&mut player, &mut queue, &mut world, 1);
        assert!(!player.is_invulnerable());
    }

    #[test]
    fn test_execute_ignores_unstaggered_and_distant() {
        let world = RecordingWorld::with_hostiles(vec![
            hostile(1, vec3(50, 0, 0), false),
            hostile(2, vec3(400, 0, 0), true),
        ]);
        let (mut player, mut queue, mut world) = setup(CombatantConfig::default(), world);

        assert!(!player.execute(&mut queue, &mut world));
        assert!(!player.is_invulnerable());
        assert!(world.executed.is_empty());
    }

    #[test]
    fn test_invulnerability_absorbs_damage() {
        let world = RecordingWorld::with_hostiles(vec![hostile(9, vec3(100, 0, 0), true)]);
        let (mut player, mut queue, mut world) = setup(CombatantConfig::default(), world);
        player.execute(&mut queue, &mut world);

        assert_eq!(player.take_damage(fixed(50), DamageKind::Generic), Fixed::ZERO);
        assert_eq!(player.health().current(), fixed(100));
    }

    #[test]
    fn test_chainsaw_refuels_every_weapon() {
        let world = RecordingWorld::with_hostiles(vec![hostile(4, vec3(150, 0, 0), false)]);
        let (mut player, mut queue, mut world) = setup(CombatantConfig::default(), world);

        assert!(player.handle_action(Action::RefuelKill, &mut queue, &mut world));

        assert_eq!(world.chainsawed, vec![4]);
        assert_eq!(player.fuel().current(), 2);
        assert_eq!(player.weapons()[0].reserve(), 30);
        assert_eq!(player.weapons()[1].reserve(), 100);
        assert_eq!(player.weapons()[2].reserve(), 12);
    }

    #[test]
    fn test_chainsaw_without_target_keeps_fuel() {
        let world = RecordingWorld::with_hostiles(vec![hostile(4, vec3(900, 0, 0), false)]);
        let (mut player, mut queue, mut world) = setup(CombatantConfig::default(), world);

        assert!(!player.refuel_kill(&mut world));
        assert_eq!(player.fuel().current(), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_area_attack_burns_cone_and_cools_down() {
        let world = RecordingWorld::with_hostiles(vec![
            hostile(1, vec3(300, 50, 0), false),
            hostile(2, vec3(0, 300, 0), false),
            hostile(3, vec3(800, 0, 0), false),
        ]);
        let (mut player, mut queue, mut world) = setup(CombatantConfig::default(), world);

        assert!(player.area_attack(&mut queue, &mut world));
        assert_eq!(world.burning, vec![(1, 300)]);
        assert_eq!(player.area_cooldown_fraction(&queue), Fixed::ZERO);
        assert!(!player.area_attack(&mut queue, &mut world));

        run_ticks(&mut player, &mut queue, &mut world, 450);
        assert_eq!(player.area_cooldown_fraction(&queue), fixed(1) / 2);

        run_ticks(&mut player, &mut queue, &mut world, 450);
        assert!(player.is_area_ready());
        assert_eq!(player.area_cooldown_fraction(&queue), Fixed::ONE);
    }

    #[test]
    fn test_double_jump_then_land() {
        let (mut player, _queue, _world) =
            setup(CombatantConfig::default(), RecordingWorld::default());

        assert!(player.jump());
        assert!(player.jump());
        assert!(!player.jump());

        let events = player.drain_events();
        assert_eq!(events[0], CombatEvent::Jumped);
        assert_eq!(
            events[1],
            CombatEvent::Launched {
                velocity: vec3(0, 0, 600),
                override_xy: false,
                override_z: true,
            }
        );

        player.land();
        assert_eq!(player.jumps_remaining(), 1);
    }
}

// =============================================================================
// Damage and lifecycle
// =============================================================================

mod lifecycle {
    use super::*;

    #[test]
    fn test_armor_soaks_its_share() {
        let (mut player, _queue, _world) =
            setup(CombatantConfig::default(), RecordingWorld::default());
        player.add_armor(fixed(100));

        assert_eq!(player.take_damage(fixed(40), DamageKind::Generic), fixed(40));
        assert_eq!(player.armor().current(), fixed(80));
        assert_eq!(player.health().current(), fixed(80));
    }

    #[test]
    fn test_death_fires_once_and_locks_abilities() {
        let (mut player, mut queue, mut world) =
            setup(CombatantConfig::default(), RecordingWorld::default());

        player.take_damage(fixed(500), DamageKind::Explosive);
        player.take_damage(fixed(500), DamageKind::Explosive);

        let deaths = player
            .drain_events()
            .into_iter()
            .filter(|e| *e == CombatEvent::Died)
            .count();
        assert_eq!(deaths, 1);
        assert!(player.is_dead());
        assert!(!player.handle_action(Action::Dash, &mut queue, &mut world));
        assert!(!player.handle_action(Action::Jump, &mut queue, &mut world));
        assert_eq!(player.start_firing(&mut queue, &mut world), None);
        assert!(!player.add_health(fixed(50)));
    }

    #[test]
    fn test_teardown_cancels_every_timer() {
        let world = RecordingWorld::with_hostiles(vec![
            hostile(2, vec3(100, 0, 0), true),
            hostile(3, vec3(300, 0, 0), false),
        ]);
        let (mut player, mut queue, mut world) = setup(CombatantConfig::default(), world);

        player.dash(&mut queue);
        player.execute(&mut queue, &mut world);
        player.area_attack(&mut queue, &mut world);
        player.start_firing(&mut queue, &mut world);
        assert_eq!(queue.pending_for(player.id()).count(), 4);

        assert_eq!(player.teardown(&mut queue), 4);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pickups_clamp_to_capacity() {
        let (mut player, _queue, _world) =
            setup(CombatantConfig::default(), RecordingWorld::default());

        assert!(!player.add_health(fixed(10)));
        assert!(!player.add_chainsaw_fuel(1));
        player.add_ammo_to_all_weapons(u32::MAX);

        for weapon in player.weapons() {
            assert_eq!(weapon.reserve(), weapon.max_reserve());
        }
    }
}

// =============================================================================
// Property tests
// =============================================================================

mod properties {
    use super::*;
    use arena_test_utils::determinism::strategies::{arb_damage, arb_direction};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_damage_splits_between_armor_and_health(
            armor in 0i32..150,
            hits in proptest::collection::vec(arb_damage(), 1..12),
        ) {
            let (mut player, _queue, _world) =
                setup(CombatantConfig::default(), RecordingWorld::default());
            player.add_armor(fixed(armor));

            for amount in hits {
                let was_dead = player.is_dead();
                let health_before = player.health().current();
                let armor_before = player.armor().current();

                let taken = player.take_damage(amount, DamageKind::Generic);

                let armor_lost = armor_before - player.armor().current();
                let health_lost = health_before - player.health().current();
                prop_assert_eq!(taken, armor_lost + health_lost);
                prop_assert!(armor_lost <= amount / 2);
                prop_assert!(player.health().current() >= Fixed::ZERO);
                if was_dead {
                    prop_assert_eq!(taken, Fixed::ZERO);
                } else if !player.is_dead() {
                    prop_assert_eq!(taken, amount);
                }
            }
        }

        #[test]
        fn prop_dash_launches_along_movement_input(direction in arb_direction()) {
            let (mut player, mut queue, _world) =
                setup(CombatantConfig::default(), RecordingWorld::default());
            player.set_pose(Pose {
                movement_input: direction,
                ..Pose::default()
            });

            prop_assert!(player.dash(&mut queue));
            let velocity = player.drain_events().into_iter().find_map(|event| match event {
                CombatEvent::Launched { velocity, .. } => Some(velocity),
                _ => None,
            });
            prop_assert!(velocity.is_some());
            let velocity = velocity.unwrap();
            prop_assert!((velocity.length() - fixed(2000)).abs() < fixed(1));
            prop_assert!(velocity.dot(direction) > Fixed::ZERO);
        }
    }
}

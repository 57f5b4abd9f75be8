//! Behavior transitions driven through the full fixed-tick schedule.
//!
//! The apps here are built without the demo scenario so each test controls
//! exactly which ships exist. Systems read the tick duration from the
//! config, so driving `FixedUpdate` by hand steps the simulation one tick
//! at a time.

use bevy::prelude::*;

use stardrift::game::combat::{CombatPlugin, ProjectilePool};
use stardrift::game::config::SimConfig;
use stardrift::game::pathfinding::NavGrid;
use stardrift::game::rng::SimRng;
use stardrift::game::ship::{Behavior, Faction, Health, NavState, Ship, ShipPlugin, ShipSpec};
use stardrift::game::simulation::{
    AimTarget, MoveTarget, SimPosition, SimRotation, SimVelocity, SimulationPlugin,
};
use stardrift::game::spatial_hash::SpatialHash;

fn test_app(seed: u64) -> App {
    let mut app = App::new();
    let config = SimConfig::default();

    app.insert_resource(SpatialHash::new(
        config.map_width,
        config.map_height,
        config.spatial_cell_size,
    ));
    app.insert_resource(NavGrid::from_config(&config));
    app.insert_resource(ProjectilePool::new(config.pool_initial, config.pool_max));
    app.insert_resource(SimRng::seeded(seed));
    app.insert_resource(config);
    app.add_plugins((SimulationPlugin, ShipPlugin, CombatPlugin));
    app
}

fn spawn_ship(app: &mut App, faction: Faction, pos: Vec2) -> Entity {
    let config = SimConfig::default();
    app.world_mut()
        .spawn((
            Ship,
            faction,
            SimPosition(pos),
            SimVelocity::default(),
            SimRotation::default(),
            ShipSpec {
                move_speed: config.ship_move_speed,
                rotation_speed: config.ship_rotation_speed,
                avoid_radius: config.ship_avoid_radius,
                look_ahead: config.ship_look_ahead,
            },
            Health::full(config.ship_max_health),
            MoveTarget(None),
            AimTarget(None),
        ))
        .id()
}

fn tick(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}

#[test]
fn idle_ship_receives_nav_state_lazily() {
    let mut app = test_app(1);
    let ship = spawn_ship(&mut app, Faction::Friendly, Vec2::new(3000.0, 0.0));

    assert!(app.world().get::<NavState>(ship).is_none());
    tick(&mut app);
    let nav = app.world().get::<NavState>(ship).unwrap();
    assert!(
        !matches!(nav.behavior, Behavior::Flee | Behavior::Aggressive),
        "initial behavior must come from the ordinary sampler, got {:?}",
        nav.behavior
    );
    assert!(nav.behavior_timer > 0.0);
}

#[test]
fn player_ship_never_gets_nav_state() {
    let mut app = test_app(1);
    let player = spawn_ship(&mut app, Faction::Player, Vec2::ZERO);

    for _ in 0..5 {
        tick(&mut app);
    }
    assert!(app.world().get::<NavState>(player).is_none());
}

#[test]
fn enemy_turns_aggressive_in_detection_range_and_disengages_outside() {
    let mut app = test_app(2);
    let player = spawn_ship(&mut app, Faction::Player, Vec2::ZERO);
    let enemy = spawn_ship(&mut app, Faction::Enemy, Vec2::new(1000.0, 0.0));
    app.world_mut()
        .entity_mut(enemy)
        .insert(NavState::new(Behavior::Idle, 1000.0, Vec2::new(1000.0, 0.0)));

    tick(&mut app);
    let nav = app.world().get::<NavState>(enemy).unwrap();
    assert_eq!(nav.behavior, Behavior::Aggressive);
    assert!(nav.behavior_timer.is_infinite());

    // Teleport the player beyond detection range; the enemy must drop back
    // into an ordinary sampled behavior.
    app.world_mut().get_mut::<SimPosition>(player).unwrap().0 = Vec2::new(6000.0, 0.0);
    tick(&mut app);
    let nav = app.world().get::<NavState>(enemy).unwrap();
    assert_ne!(nav.behavior, Behavior::Aggressive);
    assert_ne!(nav.behavior, Behavior::Flee);
}

#[test]
fn friendly_ship_never_turns_aggressive() {
    let mut app = test_app(3);
    spawn_ship(&mut app, Faction::Player, Vec2::ZERO);
    let friendly = spawn_ship(&mut app, Faction::Friendly, Vec2::new(800.0, 0.0));
    app.world_mut()
        .entity_mut(friendly)
        .insert(NavState::new(Behavior::Idle, 1000.0, Vec2::new(800.0, 0.0)));

    for _ in 0..10 {
        tick(&mut app);
    }
    let nav = app.world().get::<NavState>(friendly).unwrap();
    assert_ne!(nav.behavior, Behavior::Aggressive);
}

#[test]
fn push_apart_separates_overlapping_ships() {
    let mut app = test_app(4);
    let a = spawn_ship(&mut app, Faction::Player, Vec2::new(-75.0, 0.0));
    let b = spawn_ship(&mut app, Faction::Player, Vec2::new(75.0, 0.0));

    let initial = 150.0;
    for _ in 0..30 {
        tick(&mut app);
    }

    let pa = app.world().get::<SimPosition>(a).unwrap().0;
    let pb = app.world().get::<SimPosition>(b).unwrap().0;
    let dist = pa.distance(pb);
    assert!(
        dist > initial,
        "overlapping ships must be pushed apart, still at {}",
        dist
    );
    let config = SimConfig::default();
    assert!(
        dist >= config.ship_avoid_radius * 0.9,
        "separation should approach the avoidance radius, got {}",
        dist
    );
}

#[test]
fn patrol_ship_acquires_a_movement_target_and_moves() {
    let mut app = test_app(5);
    let ship = spawn_ship(&mut app, Faction::Friendly, Vec2::new(2000.0, 2000.0));
    app.world_mut().entity_mut(ship).insert(NavState::new(
        Behavior::Patrol,
        1000.0,
        Vec2::new(2000.0, 2000.0),
    ));

    tick(&mut app);
    let nav = app.world().get::<NavState>(ship).unwrap();
    assert!(nav.last_target.is_some(), "patrol must command a target");
    assert!(!nav.patrol_points.is_empty());

    let start = Vec2::new(2000.0, 2000.0);
    for _ in 0..30 {
        tick(&mut app);
    }
    let pos = app.world().get::<SimPosition>(ship).unwrap().0;
    assert!(
        pos.distance(start) > 100.0,
        "one second of patrol should cover ground, moved {}",
        pos.distance(start)
    );
}

#[test]
fn idle_ship_holds_position() {
    let mut app = test_app(6);
    let ship = spawn_ship(&mut app, Faction::Friendly, Vec2::new(3000.0, -3000.0));
    app.world_mut().entity_mut(ship).insert(NavState::new(
        Behavior::Idle,
        1000.0,
        Vec2::new(3000.0, -3000.0),
    ));

    for _ in 0..30 {
        tick(&mut app);
    }
    let pos = app.world().get::<SimPosition>(ship).unwrap().0;
    assert!(pos.distance(Vec2::new(3000.0, -3000.0)) < 1.0);
    assert_eq!(app.world().get::<MoveTarget>(ship).unwrap().0, None);
}

#[test]
fn fleeing_ship_calms_down_at_full_health_and_snaps_facing() {
    let mut app = test_app(9);
    let pos = Vec2::new(3000.0, 0.0);
    let ship = spawn_ship(&mut app, Faction::Friendly, pos);

    let mut nav = NavState::new(Behavior::Idle, 1000.0, pos);
    nav.enter(Behavior::Flee, 10.0);
    app.world_mut().entity_mut(ship).insert(nav);

    // One regen tick away from full, traveling +X, facing elsewhere.
    let max = app.world().get::<Health>(ship).unwrap().max;
    app.world_mut().get_mut::<Health>(ship).unwrap().current = max - 0.01;
    app.world_mut().get_mut::<MoveTarget>(ship).unwrap().0 = Some(Vec2::new(5000.0, 0.0));
    app.world_mut().get_mut::<SimRotation>(ship).unwrap().0 = 2.0;

    tick(&mut app);

    let nav = app.world().get::<NavState>(ship).unwrap();
    assert_ne!(nav.behavior, Behavior::Flee, "full health must end the flee");
    assert_ne!(nav.behavior, Behavior::Aggressive);
    assert!(!nav.is_fleeing);
    assert_eq!(app.world().get::<AimTarget>(ship).unwrap().0, None);

    // Facing snapped to the +X travel direction, not left mid-turn.
    let rot = app.world().get::<SimRotation>(ship).unwrap().0;
    assert!(rot.abs() < 1e-3, "facing should snap to velocity, got {}", rot);
}

#[test]
fn stuck_ship_resets_trackers_and_replans() {
    let mut app = test_app(10);
    let config = SimConfig::default();
    let pos = Vec2::new(-2000.0, 0.0);

    // move_speed 0 pins the ship in place, so it can never close on its goal.
    let ship = app
        .world_mut()
        .spawn((
            Ship,
            Faction::Friendly,
            SimPosition(pos),
            SimVelocity::default(),
            SimRotation::default(),
            ShipSpec {
                move_speed: 0.0,
                rotation_speed: config.ship_rotation_speed,
                avoid_radius: config.ship_avoid_radius,
                look_ahead: config.ship_look_ahead,
            },
            Health::full(config.ship_max_health),
            MoveTarget(None),
            AimTarget(None),
        ))
        .id();
    let mut nav = NavState::new(Behavior::Wander, 10_000.0, pos);
    nav.command_target(Vec2::new(2000.0, 0.0));
    app.world_mut().entity_mut(ship).insert(nav);

    // Just short of the stuck window: the no-progress timer has been
    // accumulating and a path is active.
    for _ in 0..89 {
        tick(&mut app);
    }
    let nav = app.world().get::<NavState>(ship).unwrap();
    assert!(!nav.waypoints.is_empty());
    assert!(
        nav.no_progress_timer > config.stuck_window - 0.5,
        "timer should be close to the window, at {}",
        nav.no_progress_timer
    );

    // Crossing the window forces a fresh query with the trackers reset.
    for _ in 0..6 {
        tick(&mut app);
    }
    let nav = app.world().get::<NavState>(ship).unwrap();
    assert!(
        nav.no_progress_timer < 1.0,
        "stuck detection must reset the tracker, at {}",
        nav.no_progress_timer
    );
    assert!(!nav.waypoints.is_empty(), "the path must be re-queried");
    assert_eq!(nav.last_target, Some(Vec2::new(2000.0, 0.0)));
}

#[test]
fn behavior_timers_stay_non_negative() {
    let mut app = test_app(8);
    spawn_ship(&mut app, Faction::Player, Vec2::ZERO);
    for i in 0..6 {
        let faction = if i % 2 == 0 {
            Faction::Friendly
        } else {
            Faction::Enemy
        };
        spawn_ship(&mut app, faction, Vec2::new(1000.0 + i as f32 * 900.0, -2000.0));
    }

    for _ in 0..300 {
        tick(&mut app);
    }

    let mut checked = 0;
    let mut query = app.world_mut().query::<&NavState>();
    for nav in query.iter(app.world()) {
        assert!(
            nav.behavior_timer >= 0.0 || nav.behavior_timer.is_infinite(),
            "timer went negative: {:?} {}",
            nav.behavior,
            nav.behavior_timer
        );
        checked += 1;
    }
    assert!(checked > 0);
}

#[test]
fn health_regenerates_toward_max() {
    let mut app = test_app(7);
    let ship = spawn_ship(&mut app, Faction::Friendly, Vec2::new(3000.0, 0.0));
    app.world_mut().get_mut::<Health>(ship).unwrap().current = 50.0;

    for _ in 0..30 {
        tick(&mut app);
    }
    let health = app.world().get::<Health>(ship).unwrap();
    let config = SimConfig::default();
    let expected = 50.0 + config.health_regen_rate;
    assert!(
        (health.current - expected).abs() < 0.5,
        "one second of regen should add {}, at {}",
        config.health_regen_rate,
        health.current
    );
}

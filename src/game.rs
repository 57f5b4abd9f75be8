use bevy::prelude::*;
use rand::Rng;

pub mod combat;
pub mod config;
pub mod pathfinding;
pub mod rng;
pub mod ship;
pub mod simulation;
pub mod spatial_hash;

use combat::CombatPlugin;
use config::{SimConfig, SimConfigPlugin};
use pathfinding::PathfindingPlugin;
use rng::SimRng;
use ship::{Faction, Health, Ship, ShipPlugin, ShipSpec};
use simulation::{AimTarget, MoveTarget, SimPosition, SimRotation, SimVelocity, SimulationPlugin};
use spatial_hash::SpatialHash;

pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            SimConfigPlugin,
            SimulationPlugin,
            PathfindingPlugin,
            ShipPlugin,
            CombatPlugin,
        ));
        app.add_systems(Startup, (setup_shared_resources, spawn_demo_fleet).chain());
    }
}

fn setup_shared_resources(mut commands: Commands, config: Res<SimConfig>) {
    commands.insert_resource(SpatialHash::new(
        config.map_width,
        config.map_height,
        config.spatial_cell_size,
    ));
    match config.rng_seed {
        Some(seed) => {
            info!("Seeded run, rng_seed = {}", seed);
            commands.insert_resource(SimRng::seeded(seed));
        }
        None => commands.insert_resource(SimRng::from_entropy()),
    }
}

/// Spawn the player at the origin plus a scattered demo fleet. A scenario
/// loader would replace this; the component set per ship is the contract.
fn spawn_demo_fleet(mut commands: Commands, config: Res<SimConfig>, mut rng: ResMut<SimRng>) {
    commands.spawn((
        Ship,
        Faction::Player,
        SimPosition(Vec2::ZERO),
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
    ));

    let mut spawned: Vec<Vec2> = vec![Vec2::ZERO];
    let factions = std::iter::repeat_n(Faction::Friendly, config.demo_friendly_count)
        .chain(std::iter::repeat_n(Faction::Enemy, config.demo_enemy_count));

    for faction in factions {
        let pos = scatter_position(&config, &mut rng, &spawned);
        spawned.push(pos);
        commands.spawn((
            Ship,
            faction,
            SimPosition(pos),
            SimVelocity::default(),
            SimRotation(rng.0.random_range(0.0..std::f32::consts::TAU)),
            ShipSpec {
                move_speed: config.ship_move_speed,
                rotation_speed: config.ship_rotation_speed,
                avoid_radius: config.ship_avoid_radius,
                look_ahead: config.ship_look_ahead,
            },
            Health::full(config.ship_max_health),
            MoveTarget(None),
            AimTarget(None),
        ));
    }

    info!(
        "Demo fleet spawned: 1 player, {} friendly, {} enemy",
        config.demo_friendly_count, config.demo_enemy_count
    );
}

/// Random spawn point inside the margin bounds, retried away from already
/// placed ships so the fleet does not start interpenetrating.
fn scatter_position(config: &SimConfig, rng: &mut SimRng, taken: &[Vec2]) -> Vec2 {
    let half_w = config.map_width / 2.0 - config.target_margin;
    let half_h = config.map_height / 2.0 - config.target_margin;
    let min_sep = config.ship_avoid_radius * config.ship_proximity_multiplier;

    let mut candidate = Vec2::ZERO;
    for _ in 0..32 {
        candidate = Vec2::new(
            rng.0.random_range(-half_w..half_w),
            rng.0.random_range(-half_h..half_h),
        );
        if taken
            .iter()
            .all(|p| p.distance_squared(candidate) >= min_sep * min_sep)
        {
            return candidate;
        }
    }
    candidate
}

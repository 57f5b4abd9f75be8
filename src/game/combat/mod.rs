use bevy::prelude::*;
use std::collections::HashSet;

use crate::game::config::SimConfig;
use crate::game::ship::{Behavior, Faction, Health, NavState, Ship, ShipSnapshot};
use crate::game::simulation::{SimPosition, SimSet, SimTick};
use crate::game::spatial_hash::SpatialHash;
use crate::profile_log;

mod projectile;

pub use projectile::{Projectile, ProjectileHandle, ProjectilePool};

/// Request to spawn a projectile. Written by the aggressive behavior (and by
/// whatever input layer drives the player), drained once per tick.
#[derive(Event, Message, Debug, Clone)]
pub struct FireProjectile {
    pub position: Vec2,
    pub direction: Vec2,
    pub damage: f32,
    pub owner: Option<Entity>,
}

/// A ship's health reached zero and the entity was despawned.
#[derive(Event, Message, Debug, Clone)]
pub struct ShipDestroyed {
    pub ship: Entity,
    pub position: Vec2,
}

pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<FireProjectile>();
        app.add_message::<ShipDestroyed>();
        app.add_systems(Startup, setup_projectile_pool);
        app.add_systems(
            FixedUpdate,
            (apply_fire_requests, advance_projectiles, resolve_hits)
                .chain()
                .in_set(SimSet::Combat),
        );
    }
}

fn setup_projectile_pool(mut commands: Commands, config: Res<SimConfig>) {
    commands.insert_resource(ProjectilePool::new(config.pool_initial, config.pool_max));
}

fn apply_fire_requests(
    mut pool: ResMut<ProjectilePool>,
    mut requests: MessageReader<FireProjectile>,
) {
    for request in requests.read() {
        pool.fire(
            request.position,
            request.direction,
            request.damage,
            request.owner,
        );
    }
}

/// Integrate every active projectile and retire those past their lifetime or
/// outside the map plus margin.
fn advance_projectiles(mut pool: ResMut<ProjectilePool>, config: Res<SimConfig>) {
    let delta = 1.0 / config.tick_rate as f32;
    let half_w = config.map_width / 2.0 + config.projectile_bounds_margin;
    let half_h = config.map_height / 2.0 + config.projectile_bounds_margin;

    let mut expired = Vec::new();
    for (handle, projectile) in pool.iter_active_mut() {
        projectile.position += projectile.direction * config.projectile_speed * delta;
        projectile.age += delta;

        if projectile.age >= config.projectile_lifetime
            || projectile.position.x.abs() > half_w
            || projectile.position.y.abs() > half_h
        {
            expired.push(handle);
        }
    }
    for handle in expired {
        pool.release(handle);
    }
}

/// Projectile-ship collision resolution through the shared spatial hash.
///
/// Each projectile takes its first hit in cell-scan order and is consumed by
/// it. Damage side effects follow the hit: friendlies panic on any player
/// shot, enemies panic below the low-health fraction, and ships at zero are
/// despawned with a `ShipDestroyed` message.
#[allow(clippy::too_many_arguments)]
fn resolve_hits(
    mut commands: Commands,
    config: Res<SimConfig>,
    mut pool: ResMut<ProjectilePool>,
    mut hash: ResMut<SpatialHash>,
    mut destroyed: MessageWriter<ShipDestroyed>,
    mut ships: Query<(Entity, &SimPosition, &Faction, &mut Health, Option<&mut NavState>), With<Ship>>,
    mut hit_buf: Local<Vec<(Entity, Vec2)>>,
    #[allow(unused_variables)] tick: Res<SimTick>,
) {
    hash.clear();
    let snapshots: Vec<ShipSnapshot> = ships
        .iter()
        .map(|(entity, pos, faction, _, _)| ShipSnapshot {
            entity,
            pos: pos.0,
            avoid_radius: 0.0,
            faction: *faction,
        })
        .collect();
    for snapshot in &snapshots {
        hash.insert(snapshot.entity, snapshot.pos);
    }

    let mut consumed = Vec::new();
    let mut hits = Vec::new();

    for (handle, projectile) in pool.iter_active() {
        hash.query_radius(
            projectile.position,
            config.projectile_collision_radius,
            None,
            &mut *hit_buf,
        );

        for &(target, target_pos) in hit_buf.iter() {
            if Some(target) == projectile.owner {
                continue;
            }
            if projectile.position.distance_squared(target_pos)
                > config.projectile_collision_radius * config.projectile_collision_radius
            {
                continue;
            }
            hits.push((target, projectile.damage, projectile.owner));
            consumed.push(handle);
            break;
        }
    }
    for handle in consumed {
        pool.release(handle);
    }

    let owner_faction = |owner: Option<Entity>| {
        owner.and_then(|o| snapshots.iter().find(|s| s.entity == o).map(|s| s.faction))
    };

    let mut despawned: HashSet<Entity> = HashSet::new();
    let hit_count = hits.len();

    for (target, damage, owner) in hits {
        if despawned.contains(&target) {
            continue;
        }
        let Ok((entity, pos, faction, mut health, nav)) = ships.get_mut(target) else {
            continue;
        };

        health.current -= damage;

        if health.current <= 0.0 {
            despawned.insert(entity);
            commands.entity(entity).despawn();
            destroyed.write(ShipDestroyed {
                ship: entity,
                position: pos.0,
            });
            continue;
        }

        if let Some(mut nav) = nav {
            let player_shot = owner_faction(owner) == Some(Faction::Player);
            let panicking = (faction.flees_on_any_player_hit() && player_shot)
                || health.current < config.flee_health_fraction * health.max;
            if panicking && nav.behavior != Behavior::Flee {
                nav.enter(Behavior::Flee, config.flee_window);
            }
        }
    }

    profile_log!(tick, "[COMBAT] hits resolved: {}", hit_count);
}

use bevy::prelude::*;

use crate::game::config::SimConfig;
use crate::game::ship::{Ship, ShipSpec};

pub struct SimulationPlugin;

/// Per-tick phases. Ordering is significant and must be preserved:
/// steering/avoidance runs first, then movement integration, then the
/// inter-ship push-apart, then behavior re-evaluation and tracking, and
/// finally combat resolution against a freshly rebuilt spatial index.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum SimSet {
    Steering,
    Integration,
    Physics,
    Behavior,
    Combat,
}

/// Monotonic simulation tick counter.
#[derive(Resource, Default)]
pub struct SimTick(pub u64);

/// Logical position of an entity in the simulation world.
/// Vec2 because the gameplay is strictly 2D.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct SimPosition(pub Vec2);

/// Logical velocity of an entity.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct SimVelocity(pub Vec2);

/// Heading in radians.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct SimRotation(pub f32);

/// Commanded movement target. `None` means "hold position".
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct MoveTarget(pub Option<Vec2>);

/// Point the ship should face, independent of where it is moving
/// (a fleeing ship aims away from its threat, an attacking ship at the player).
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct AimTarget(pub Option<Vec2>);

/// A ship counts as actively moving while it has a commanded target it has
/// not yet reached. Behavior action routines are gated on this predicate.
pub fn is_actively_moving(pos: Vec2, target: Option<Vec2>, arrival_threshold: f32) -> bool {
    match target {
        Some(t) => pos.distance_squared(t) > arrival_threshold * arrival_threshold,
        None => false,
    }
}

/// Smallest signed angle from `from` to `to`, in [-PI, PI].
pub fn angle_delta(from: f32, to: f32) -> f32 {
    let mut d = (to - from) % std::f32::consts::TAU;
    if d > std::f32::consts::PI {
        d -= std::f32::consts::TAU;
    } else if d < -std::f32::consts::PI {
        d += std::f32::consts::TAU;
    }
    d
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_hz(30.0)); // Overridden by config at startup
        app.init_resource::<SimTick>();

        app.configure_sets(
            FixedUpdate,
            (
                SimSet::Steering,
                SimSet::Integration,
                SimSet::Physics,
                SimSet::Behavior,
                SimSet::Combat,
            )
                .chain(),
        );

        app.add_systems(Startup, apply_tick_rate);
        app.add_systems(
            FixedUpdate,
            (
                advance_tick.before(SimSet::Steering),
                (steer_ships, apply_velocity).chain().in_set(SimSet::Integration),
                (constrain_to_map_bounds, resolve_ship_collisions)
                    .chain()
                    .in_set(SimSet::Physics),
            ),
        );
    }
}

fn apply_tick_rate(config: Res<SimConfig>, mut fixed_time: ResMut<Time<Fixed>>) {
    fixed_time.set_timestep_hz(config.tick_rate);
    info!("Simulation tick rate set to {} Hz", config.tick_rate);
}

fn advance_tick(mut tick: ResMut<SimTick>) {
    tick.0 += 1;
}

/// Turn each ship toward its aim (or travel) direction at its rotation rate
/// and produce a velocity toward the commanded target, easing off near arrival.
fn steer_ships(
    config: Res<SimConfig>,
    mut ships: Query<
        (
            &SimPosition,
            &mut SimVelocity,
            &mut SimRotation,
            &ShipSpec,
            &MoveTarget,
            &AimTarget,
        ),
        With<Ship>,
    >,
) {
    let delta = 1.0 / config.tick_rate as f32;

    for (pos, mut vel, mut rot, spec, move_target, aim_target) in ships.iter_mut() {
        // Facing: aim target wins over travel direction.
        let face_point = aim_target.0.or(move_target.0);
        if let Some(point) = face_point {
            let to_point = point - pos.0;
            if to_point.length_squared() > 1.0 {
                let desired = to_point.to_angle();
                let max_turn = spec.rotation_speed * delta;
                rot.0 += angle_delta(rot.0, desired).clamp(-max_turn, max_turn);
            }
        }

        match move_target.0 {
            Some(target) => {
                let to_target = target - pos.0;
                let dist = to_target.length();
                if dist > 1.0 {
                    let ease = (dist / config.arrival_threshold).min(1.0);
                    vel.0 = to_target / dist * spec.move_speed * ease;
                } else {
                    vel.0 = Vec2::ZERO;
                }
            }
            None => {
                // Hold position; ambient drift is owned by the entity layer.
                vel.0 = Vec2::ZERO;
            }
        }
    }
}

fn apply_velocity(config: Res<SimConfig>, mut query: Query<(&mut SimPosition, &SimVelocity)>) {
    let delta = 1.0 / config.tick_rate as f32;

    for (mut pos, vel) in query.iter_mut() {
        if vel.0.length_squared() > 0.0 {
            pos.0 += vel.0 * delta;
        }
    }
}

fn constrain_to_map_bounds(
    config: Res<SimConfig>,
    mut query: Query<(&mut SimPosition, &mut SimVelocity)>,
) {
    let half_w = config.map_width / 2.0;
    let half_h = config.map_height / 2.0;

    for (mut pos, mut vel) in query.iter_mut() {
        if pos.0.x < -half_w {
            pos.0.x = -half_w;
        }
        if pos.0.x > half_w {
            pos.0.x = half_w;
        }
        if pos.0.y < -half_h {
            pos.0.y = -half_h;
        }
        if pos.0.y > half_h {
            pos.0.y = half_h;
        }

        // Zero velocity against walls
        if pos.0.x <= -half_w && vel.0.x < 0.0 {
            vel.0.x = 0.0;
        }
        if pos.0.x >= half_w && vel.0.x > 0.0 {
            vel.0.x = 0.0;
        }
        if pos.0.y <= -half_h && vel.0.y < 0.0 {
            vel.0.y = 0.0;
        }
        if pos.0.y >= half_h && vel.0.y > 0.0 {
            vel.0.y = 0.0;
        }
    }
}

/// Positional push-apart so ships never interpenetrate past their avoidance
/// radius. Pairs are processed in entity order for determinism.
fn resolve_ship_collisions(
    config: Res<SimConfig>,
    mut ships: Query<(Entity, &mut SimPosition, &ShipSpec), With<Ship>>,
) {
    let strength = config.collision_push_strength;

    let mut units: Vec<_> = ships.iter_mut().collect();
    units.sort_by_key(|(e, _, _)| *e);

    let mut corrections = vec![Vec2::ZERO; units.len()];

    for i in 0..units.len() {
        for j in (i + 1)..units.len() {
            let (_, pos1, spec1) = &units[i];
            let (_, pos2, spec2) = &units[j];

            let min_dist = spec1.avoid_radius.max(spec2.avoid_radius);
            let min_dist_sq = min_dist * min_dist;

            let delta = pos1.0 - pos2.0;
            let dist_sq = delta.length_squared();

            if dist_sq < min_dist_sq && dist_sq > 0.0001 {
                let dist = dist_sq.sqrt();
                let overlap = min_dist - dist;
                let dir = delta / dist;

                let correction = dir * overlap * 0.5 * strength;
                corrections[i] += correction;
                corrections[j] -= correction;
            }
        }
    }

    for (i, (_, pos, _)) in units.iter_mut().enumerate() {
        pos.0 += corrections[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_delta_wraps_shortest_arc() {
        let d = angle_delta(3.0, -3.0);
        assert!(d.abs() < 1.0, "crossing PI should take the short way, got {}", d);
        assert!(angle_delta(0.0, 1.0) > 0.0);
        assert!(angle_delta(1.0, 0.0) < 0.0);
    }

    #[test]
    fn actively_moving_respects_threshold() {
        let pos = Vec2::ZERO;
        assert!(!is_actively_moving(pos, None, 150.0));
        assert!(!is_actively_moving(pos, Some(Vec2::new(100.0, 0.0)), 150.0));
        assert!(is_actively_moving(pos, Some(Vec2::new(500.0, 0.0)), 150.0));
    }
}

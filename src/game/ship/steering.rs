use bevy::prelude::*;

use crate::game::config::SimConfig;
use crate::game::simulation::{MoveTarget, SimPosition, SimRotation, SimTick, SimVelocity};
use crate::game::spatial_hash::SpatialHash;
use crate::profile_log;

use super::components::{NavState, Ship, ShipSpec};
use super::targets::clamp_to_margin;

/// Blended orbital-avoidance vector against a set of nearby obstacles.
///
/// Each obstacle within its detection window (window_multiplier x the larger
/// of the two avoidance radii), or whose radius contains the forward
/// look-ahead point, contributes a mix of a radial push-away component and a
/// tangential orbit component aligned with the current velocity. The mix is
/// radial-dominant inside the obstacle radius and shifts toward tangential at
/// the window edge; strength scales with penetration. Contributions are
/// summed and normalized.
pub fn avoidance_vector(
    pos: Vec2,
    vel: Vec2,
    look_ahead_point: Vec2,
    self_radius: f32,
    window_multiplier: f32,
    obstacles: &[(Vec2, f32)],
) -> Vec2 {
    let mut accum = Vec2::ZERO;

    for &(obstacle_pos, obstacle_radius) in obstacles {
        let effective = self_radius.max(obstacle_radius);
        let window = effective * window_multiplier;

        let offset = pos - obstacle_pos;
        let dist = offset.length();

        let look_dist = look_ahead_point.distance(obstacle_pos);
        let look_inside = look_dist < obstacle_radius;

        if dist >= window && !look_inside {
            continue;
        }

        let radial = if dist > 1e-3 {
            offset / dist
        } else {
            // Dead overlap: pick any axis rather than dividing by zero.
            vel.perp().try_normalize().unwrap_or(Vec2::X)
        };

        let mut tangent = radial.perp();
        if tangent.dot(vel) < 0.0 {
            tangent = -tangent;
        }

        // 0 inside the true radius (full radial push), 1 at the outer window
        // edge (full orbit).
        let orbit = if window > effective {
            ((dist - effective) / (window - effective)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let dir = (radial * (1.0 - orbit) + tangent * orbit).normalize_or_zero();

        let mut strength = 1.0 - orbit;
        if look_inside && obstacle_radius > 1e-3 {
            strength = strength.max(1.0 - look_dist / obstacle_radius);
        }

        accum += dir * strength;
    }

    accum.normalize_or_zero()
}

/// Rebuild the shared spatial hash from current ship positions before the
/// avoidance pass reads it.
pub(super) fn rebuild_spatial_hash(
    mut hash: ResMut<SpatialHash>,
    ships: Query<(Entity, &SimPosition), With<Ship>>,
) {
    hash.clear();
    for (entity, pos) in &ships {
        hash.insert(entity, pos.0);
    }
}

/// Per-ship avoidance: query neighbors from the spatial hash, compute the
/// blended avoidance vector and fold it into the commanded move target -
/// fully replacing it while no path is active, otherwise blending 30% so
/// pursuit is not overridden.
pub(super) fn apply_avoidance(
    config: Res<SimConfig>,
    hash: Res<SpatialHash>,
    specs: Query<&ShipSpec, With<Ship>>,
    mut ships: Query<
        (
            Entity,
            &SimPosition,
            &SimVelocity,
            &SimRotation,
            &ShipSpec,
            &NavState,
            &mut MoveTarget,
        ),
        With<Ship>,
    >,
    mut neighbor_buf: Local<Vec<(Entity, Vec2)>>,
    #[allow(unused_variables)] tick: Res<SimTick>,
) {
    let mut steered = 0usize;

    for (entity, pos, vel, rot, spec, nav, mut move_target) in ships.iter_mut() {
        let pos = pos.0;

        let heading = vel
            .0
            .try_normalize()
            .unwrap_or_else(|| Vec2::from_angle(rot.0));
        let look_point = pos + heading * spec.look_ahead;

        let query_radius =
            spec.look_ahead + spec.avoid_radius * config.avoidance_window_multiplier;
        hash.query_radius(pos, query_radius, Some(entity), &mut *neighbor_buf);
        if neighbor_buf.is_empty() {
            continue;
        }

        let obstacles: Vec<(Vec2, f32)> = neighbor_buf
            .iter()
            .filter_map(|&(other, other_pos)| {
                specs.get(other).ok().map(|s| (other_pos, s.avoid_radius))
            })
            .collect();

        let avoid = avoidance_vector(
            pos,
            vel.0,
            look_point,
            spec.avoid_radius,
            config.avoidance_window_multiplier,
            &obstacles,
        );
        if avoid == Vec2::ZERO {
            continue;
        }
        steered += 1;

        if nav.waypoints.is_empty() {
            // No path-following active: avoidance drives a direct fallback
            // target on its own.
            move_target.0 = Some(clamp_to_margin(&config, pos + avoid * spec.look_ahead));
        } else if let Some(target) = move_target.0 {
            let path_dir = (target - pos).normalize_or_zero();
            let blended = (path_dir * (1.0 - config.avoidance_blend)
                + avoid * config.avoidance_blend)
                .normalize_or_zero();
            move_target.0 = Some(pos + blended * spec.look_ahead);
        }
    }

    profile_log!(tick, "[AVOIDANCE] ships steered: {}", steered);
}

#[cfg(test)]
#[path = "steering_tests.rs"]
mod tests;

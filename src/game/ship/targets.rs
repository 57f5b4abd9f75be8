use bevy::prelude::*;
use rand::Rng;
use smallvec::SmallVec;
use std::f32::consts::TAU;

use crate::game::config::SimConfig;
use crate::game::pathfinding::NavGrid;
use crate::game::rng::SimRng;

use super::components::{Behavior, Faction, NavState};

/// Read-only view of every ship, collected once per tick before behavior
/// evaluation so target selection can test proximity against all of them.
#[derive(Clone, Copy, Debug)]
pub struct ShipSnapshot {
    pub entity: Entity,
    pub pos: Vec2,
    pub avoid_radius: f32,
    pub faction: Faction,
}

/// Weighted random behavior selection. Idle takes `idle_rate`; the remaining
/// share is split between Patrol, LongDistance and Wander proportionally to
/// their weights. Flee and Aggressive are never sampled.
pub fn sample_behavior(config: &SimConfig, rng: &mut SimRng) -> Behavior {
    let roll: f32 = rng.0.random_range(0.0..1.0);
    if roll < config.idle_rate {
        return Behavior::Idle;
    }

    let total = config.patrol_weight + config.long_distance_weight + config.wander_weight;
    let remaining = (roll - config.idle_rate) / (1.0 - config.idle_rate) * total;

    if remaining < config.patrol_weight {
        Behavior::Patrol
    } else if remaining < config.patrol_weight + config.long_distance_weight {
        Behavior::LongDistance
    } else {
        Behavior::Wander
    }
}

/// Duration uniformly sampled from the behavior-specific range.
pub fn sample_duration(config: &SimConfig, rng: &mut SimRng, behavior: Behavior) -> f32 {
    let (min, max) = match behavior {
        Behavior::Idle => (config.idle_duration_min, config.idle_duration_max),
        Behavior::Patrol => (config.patrol_duration_min, config.patrol_duration_max),
        Behavior::LongDistance => (
            config.long_distance_duration_min,
            config.long_distance_duration_max,
        ),
        Behavior::Wander => (config.wander_duration_min, config.wander_duration_max),
        // Flee uses the fixed window, Aggressive the infinite sentinel;
        // neither is sampled here.
        Behavior::Flee => (config.flee_window, config.flee_window),
        Behavior::Aggressive => return f32::INFINITY,
    };
    rng.0.random_range(min..=max)
}

/// Clamp a candidate point to the fixed in-bounds margin.
pub fn clamp_to_margin(config: &SimConfig, p: Vec2) -> Vec2 {
    let half_w = config.map_width / 2.0 - config.target_margin;
    let half_h = config.map_height / 2.0 - config.target_margin;
    Vec2::new(p.x.clamp(-half_w, half_w), p.y.clamp(-half_h, half_h))
}

fn in_margin_bounds(config: &SimConfig, p: Vec2) -> bool {
    let half_w = config.map_width / 2.0 - config.target_margin;
    let half_h = config.map_height / 2.0 - config.target_margin;
    p.x.abs() <= half_w && p.y.abs() <= half_h
}

/// A candidate is rejected when it falls within the proximity multiple of any
/// other ship's avoidance radius (the player included).
pub fn too_close_to_ships(
    config: &SimConfig,
    candidate: Vec2,
    exclude: Entity,
    ships: &[ShipSnapshot],
) -> bool {
    ships.iter().any(|ship| {
        ship.entity != exclude
            && candidate.distance_squared(ship.pos)
                < (ship.avoid_radius * config.ship_proximity_multiplier).powi(2)
    })
}

/// Push a candidate out of any ship's proximity window it violates.
/// Used as the last resort once retries are exhausted.
pub fn push_away_from_ships(
    config: &SimConfig,
    mut candidate: Vec2,
    exclude: Entity,
    ships: &[ShipSnapshot],
) -> Vec2 {
    for ship in ships {
        if ship.entity == exclude {
            continue;
        }
        let window = ship.avoid_radius * config.ship_proximity_multiplier;
        let offset = candidate - ship.pos;
        if offset.length_squared() < window * window {
            let dir = offset.try_normalize().unwrap_or(Vec2::X);
            candidate = ship.pos + dir * window;
        }
    }
    clamp_to_margin(config, candidate)
}

/// Generate 3-5 patrol points on a randomized ring around `center`.
pub fn generate_patrol_points(
    config: &SimConfig,
    rng: &mut SimRng,
    center: Vec2,
) -> SmallVec<[Vec2; 5]> {
    let count = rng
        .0
        .random_range(config.patrol_points_min..=config.patrol_points_max);
    let phase: f32 = rng.0.random_range(0.0..TAU);

    (0..count)
        .map(|i| {
            let jitter: f32 = rng.0.random_range(-0.3..0.3);
            let angle = phase + i as f32 / count as f32 * TAU + jitter;
            let radius = rng
                .0
                .random_range(config.patrol_ring_min..config.patrol_ring_max);
            clamp_to_margin(config, center + Vec2::from_angle(angle) * radius)
        })
        .collect()
}

/// Pick the next patrol waypoint: nearest on the freshly generated ring, then
/// sequential, skipping (or extending) points closer than the minimum hop so
/// turns stay smooth.
pub fn advance_patrol(config: &SimConfig, rng: &mut SimRng, nav: &mut NavState, pos: Vec2) -> Vec2 {
    if nav.patrol_points.is_empty() {
        nav.patrol_points = generate_patrol_points(config, rng, pos);
        nav.patrol_index = nav
            .patrol_points
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.distance_squared(pos).total_cmp(&b.distance_squared(pos))
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
    } else {
        nav.patrol_index = (nav.patrol_index + 1) % nav.patrol_points.len();
    }

    let len = nav.patrol_points.len();
    let mut target = nav.patrol_points[nav.patrol_index];
    let mut tries = 0;
    while target.distance(pos) < config.patrol_min_hop && tries < len {
        nav.patrol_index = (nav.patrol_index + 1) % len;
        target = nav.patrol_points[nav.patrol_index];
        tries += 1;
    }

    if target.distance(pos) < config.patrol_min_hop {
        // The whole ring is nearby; extend this point outward instead.
        let dir = (target - pos).try_normalize().unwrap_or(Vec2::X);
        target = pos + dir * config.patrol_min_hop;
    }

    clamp_to_margin(config, target)
}

/// Sample a far-away travel target: random bearing, distance in
/// [0.75x, 1.5x] of map size, retried against bounds, grid walkability and
/// ship proximity. Falls back to the farthest in-bounds corner, which is
/// guaranteed long.
pub fn long_distance_target(
    config: &SimConfig,
    rng: &mut SimRng,
    pos: Vec2,
    grid: Option<&NavGrid>,
    exclude: Entity,
    ships: &[ShipSnapshot],
) -> Vec2 {
    let map_size = config.map_width.max(config.map_height);

    for _ in 0..config.long_distance_retries {
        let bearing: f32 = rng.0.random_range(0.0..TAU);
        let dist = rng
            .0
            .random_range(config.long_distance_min_factor..config.long_distance_max_factor)
            * map_size;
        let candidate = pos + Vec2::from_angle(bearing) * dist;

        if !in_margin_bounds(config, candidate) {
            continue;
        }
        if grid.is_some_and(|g| !g.is_walkable_at(candidate)) {
            continue;
        }
        if too_close_to_ships(config, candidate, exclude, ships) {
            continue;
        }
        return candidate;
    }

    let half_w = config.map_width / 2.0 - config.target_margin;
    let half_h = config.map_height / 2.0 - config.target_margin;
    let corners = [
        Vec2::new(-half_w, -half_h),
        Vec2::new(half_w, -half_h),
        Vec2::new(-half_w, half_h),
        Vec2::new(half_w, half_h),
    ];
    corners
        .into_iter()
        .max_by(|a, b| a.distance_squared(pos).total_cmp(&b.distance_squared(pos)))
        .unwrap_or(pos)
}

/// Sample a wander target: random bearing biased away from the map center
/// (stronger near the center) and away from the player when close, then
/// blended with the last travel direction for path smoothness.
#[allow(clippy::too_many_arguments)]
pub fn wander_target(
    config: &SimConfig,
    rng: &mut SimRng,
    pos: Vec2,
    last_direction: Vec2,
    avoid_radius: f32,
    player_pos: Option<Vec2>,
    exclude: Entity,
    ships: &[ShipSnapshot],
) -> Vec2 {
    let half_diag = Vec2::new(config.map_width, config.map_height).length() / 2.0;
    let center_bias = (1.0 - pos.length() / half_diag).clamp(0.0, 1.0);
    let away_center = pos.try_normalize().unwrap_or(Vec2::X);

    let mut last_candidate = pos;

    for _ in 0..config.wander_retries {
        let mut dir = Vec2::from_angle(rng.0.random_range(0.0..TAU));
        dir = (dir + away_center * center_bias).normalize_or_zero();

        if let Some(player) = player_pos {
            let player_dist = pos.distance(player);
            let window = config.wander_player_radius_multiplier * avoid_radius;
            if player_dist < window {
                let away_player = (pos - player).try_normalize().unwrap_or(Vec2::X);
                dir = (dir + away_player * (1.0 - player_dist / window)).normalize_or_zero();
            }
        }

        if last_direction.length_squared() > 0.001 {
            dir = (last_direction.normalize_or_zero() * config.wander_last_dir_blend
                + dir * (1.0 - config.wander_last_dir_blend))
                .normalize_or_zero();
        }
        if dir == Vec2::ZERO {
            dir = Vec2::X;
        }

        let dist = rng
            .0
            .random_range(config.wander_distance_min..config.wander_distance_max);
        let candidate = clamp_to_margin(config, pos + dir * dist);
        last_candidate = candidate;

        if too_close_to_ships(config, candidate, exclude, ships) {
            continue;
        }
        return candidate;
    }

    push_away_from_ships(config, last_candidate, exclude, ships)
}

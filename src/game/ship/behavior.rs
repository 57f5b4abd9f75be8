use bevy::prelude::*;

use crate::game::combat::FireProjectile;
use crate::game::config::SimConfig;
use crate::game::pathfinding::NavGrid;
use crate::game::rng::SimRng;
use crate::game::simulation::{
    is_actively_moving, AimTarget, MoveTarget, SimPosition, SimRotation, SimVelocity,
};

use super::components::{Behavior, Faction, Health, NavState, Ship, ShipSpec};
use super::targets::{
    advance_patrol, clamp_to_margin, long_distance_target, sample_behavior, sample_duration,
    wander_target, ShipSnapshot,
};

/// Ships regenerate toward full health; a fleeing ship only calms down once
/// fully healed, so regeneration is what ends a flee episode.
pub(super) fn regenerate_health(
    config: Res<SimConfig>,
    mut ships: Query<&mut Health, With<Ship>>,
) {
    let delta = 1.0 / config.tick_rate as f32;
    for mut health in ships.iter_mut() {
        if health.current < health.max {
            health.current = (health.current + config.health_regen_rate * delta).min(health.max);
        }
    }
}

/// Lazily create navigation state the first tick a non-player ship is seen
/// without one, sampling its opening behavior and duration.
pub(super) fn init_nav_states(
    mut commands: Commands,
    config: Res<SimConfig>,
    mut rng: ResMut<SimRng>,
    ships: Query<(Entity, &SimPosition, &Faction), (With<Ship>, Without<NavState>)>,
) {
    for (entity, pos, faction) in &ships {
        if *faction == Faction::Player {
            continue;
        }
        let behavior = sample_behavior(&config, &mut rng);
        let timer = sample_duration(&config, &mut rng, behavior);
        commands
            .entity(entity)
            .insert(NavState::new(behavior, timer, pos.0));
    }
}

/// Per-tick behavior evaluation for every non-player ship: timers, forced
/// transitions (aggro, flee exit), and the per-state action routines that
/// select movement and aim targets.
#[allow(clippy::type_complexity)]
pub(super) fn update_behaviors(
    config: Res<SimConfig>,
    mut rng: ResMut<SimRng>,
    grid: Option<Res<NavGrid>>,
    mut fire: MessageWriter<FireProjectile>,
    snapshot_query: Query<(Entity, &SimPosition, &Faction, &ShipSpec), With<Ship>>,
    mut ships: Query<
        (
            Entity,
            &SimPosition,
            &SimVelocity,
            &mut SimRotation,
            &Faction,
            &ShipSpec,
            &Health,
            &mut NavState,
            &mut MoveTarget,
            &mut AimTarget,
        ),
        With<Ship>,
    >,
) {
    let delta = 1.0 / config.tick_rate as f32;

    let all_ships: Vec<ShipSnapshot> = snapshot_query
        .iter()
        .map(|(entity, pos, faction, spec)| ShipSnapshot {
            entity,
            pos: pos.0,
            avoid_radius: spec.avoid_radius,
            faction: *faction,
        })
        .collect();
    let player = all_ships
        .iter()
        .find(|s| s.faction == Faction::Player)
        .copied();

    for (
        entity,
        pos,
        vel,
        mut rot,
        faction,
        spec,
        health,
        mut nav,
        mut move_target,
        mut aim_target,
    ) in ships.iter_mut()
    {
        if *faction == Faction::Player {
            continue;
        }
        let pos = pos.0;

        nav.attack_cooldown = (nav.attack_cooldown - delta).max(0.0);

        // Flee ends only at full health; then immediately resample rather
        // than waiting out the timer, and snap facing to the travel
        // direction so the ship doesn't sail backwards.
        if nav.behavior == Behavior::Flee && health.current >= health.max {
            let next = sample_behavior(&config, &mut rng);
            let duration = sample_duration(&config, &mut rng, next);
            nav.enter(next, duration);
            aim_target.0 = None;
            if vel.0.length_squared() > 1.0 {
                rot.0 = vel.0.to_angle();
            }
        }

        // Enemy ships are forced into Aggressive while the player is in
        // detection range, and drop back out when the player leaves it.
        if faction.can_go_aggressive() {
            let player_in_range = player.map_or(false, |p| {
                p.pos.distance_squared(pos) <= config.detection_range * config.detection_range
            });
            if player_in_range
                && nav.behavior != Behavior::Aggressive
                && nav.behavior != Behavior::Flee
            {
                nav.enter(Behavior::Aggressive, f32::INFINITY);
            } else if !player_in_range && nav.behavior == Behavior::Aggressive {
                let next = sample_behavior(&config, &mut rng);
                let duration = sample_duration(&config, &mut rng, next);
                nav.enter(next, duration);
                aim_target.0 = None;
            }
        }

        // Ordinary behaviors expire on a timer and resample.
        if nav.behavior != Behavior::Flee && nav.behavior != Behavior::Aggressive {
            nav.behavior_timer -= delta;
            if nav.behavior_timer <= 0.0 {
                let next = sample_behavior(&config, &mut rng);
                let duration = sample_duration(&config, &mut rng, next);
                nav.enter(next, duration);
            }
        }

        // Action routines are gated while the ship is still traveling toward
        // its last commanded target. Idle keeps re-asserting "stopped", and
        // LongDistance, Flee and Aggressive reassess long-lived targets every
        // tick.
        let gated = !matches!(
            nav.behavior,
            Behavior::Idle | Behavior::LongDistance | Behavior::Flee | Behavior::Aggressive
        ) && is_actively_moving(pos, nav.last_target, config.arrival_threshold);

        if !gated {
            match nav.behavior {
                Behavior::Idle => {
                    move_target.0 = None;
                    aim_target.0 = None;
                    nav.last_target = None;
                }
                Behavior::Patrol => {
                    let target = advance_patrol(&config, &mut rng, &mut nav, pos);
                    nav.command_target(target);
                }
                Behavior::LongDistance => {
                    let reached = nav.last_target.map_or(true, |t| {
                        t.distance_squared(pos)
                            < config.arrival_threshold * config.arrival_threshold
                    });
                    if reached {
                        let target = long_distance_target(
                            &config,
                            &mut rng,
                            pos,
                            grid.as_deref(),
                            entity,
                            &all_ships,
                        );
                        nav.command_target(target);
                    }
                }
                Behavior::Wander => {
                    let target = wander_target(
                        &config,
                        &mut rng,
                        pos,
                        nav.last_direction,
                        spec.avoid_radius,
                        player.map(|p| p.pos),
                        entity,
                        &all_ships,
                    );
                    nav.command_target(target);
                }
                Behavior::Flee => {
                    run_flee(
                        &config,
                        entity,
                        pos,
                        *faction,
                        &all_ships,
                        &mut nav,
                        &mut aim_target,
                        &mut move_target,
                    );
                }
                Behavior::Aggressive => {
                    run_aggressive(
                        &config,
                        entity,
                        pos,
                        vel.0,
                        spec,
                        player,
                        &mut nav,
                        &mut aim_target,
                        &mut move_target,
                        &mut fire,
                    );
                }
            }
        }

        // Tracking update: remember where we are and which way we traveled.
        let moved = pos - nav.last_position;
        if moved.length_squared() > 0.01 {
            nav.last_direction = moved.normalize_or_zero();
        }
        nav.last_position = pos;
    }
}

/// Run away from the nearest active threat. The aim target flips away
/// immediately every tick, but the movement target is only recomputed when
/// reached or when the threat is closing in, so the escape course doesn't
/// jitter frame to frame.
#[allow(clippy::too_many_arguments)]
fn run_flee(
    config: &SimConfig,
    entity: Entity,
    pos: Vec2,
    faction: Faction,
    all_ships: &[ShipSnapshot],
    nav: &mut NavState,
    aim_target: &mut AimTarget,
    move_target: &mut MoveTarget,
) {
    let threat = all_ships
        .iter()
        .filter(|s| s.entity != entity)
        .filter(|s| {
            s.faction == Faction::Player
                || (faction != Faction::Enemy && s.faction == Faction::Enemy)
        })
        .min_by(|a, b| {
            a.pos
                .distance_squared(pos)
                .total_cmp(&b.pos.distance_squared(pos))
        });

    let Some(threat) = threat else {
        // Nothing left to run from; hold position until healed.
        move_target.0 = None;
        return;
    };

    let away = (pos - threat.pos).try_normalize().unwrap_or(Vec2::X);
    aim_target.0 = Some(pos + away * config.flee_distance);

    let reached = nav.last_target.map_or(true, |t| {
        t.distance_squared(pos) < config.flee_reached_distance * config.flee_reached_distance
    });
    let threat_close = threat.pos.distance_squared(pos)
        < config.flee_threat_distance * config.flee_threat_distance;
    let target_toward_threat = nav
        .last_target
        .map_or(true, |t| (t - pos).dot(away) <= 0.0);

    if reached || (threat_close && target_toward_threat) {
        let target = clamp_to_margin(config, pos + away * config.flee_distance);
        nav.command_target(target);
    }
}

/// Hold a stand-off ring around the player: back away when inside the
/// separation window, close (capped) when beyond the preferred distance,
/// strafe along the ring otherwise. Always aims at the player and fires
/// while in range once the cooldown has elapsed.
#[allow(clippy::too_many_arguments)]
fn run_aggressive(
    config: &SimConfig,
    entity: Entity,
    pos: Vec2,
    vel: Vec2,
    spec: &ShipSpec,
    player: Option<ShipSnapshot>,
    nav: &mut NavState,
    aim_target: &mut AimTarget,
    move_target: &mut MoveTarget,
    fire: &mut MessageWriter<FireProjectile>,
) {
    let Some(player) = player else {
        move_target.0 = None;
        return;
    };

    aim_target.0 = Some(player.pos);

    let dist = pos.distance(player.pos);
    let both_radius = spec.avoid_radius.max(player.avoid_radius);
    let away = (pos - player.pos).try_normalize().unwrap_or(Vec2::X);

    let target = if dist < config.aggressive_backoff_multiplier * both_radius {
        pos + away * config.standoff_distance
    } else if dist > config.standoff_distance {
        let ring_point = player.pos + away * config.standoff_distance;
        pos + (ring_point - pos).clamp_length_max(config.aggressive_closing_cap)
    } else {
        let mut tangent = away.perp();
        if tangent.dot(vel) < 0.0 {
            tangent = -tangent;
        }
        pos + tangent * config.strafe_distance
    };

    let target = clamp_to_margin(config, target);
    // Direct pursuit; the stand-off dance never routes through A*.
    nav.command_target(target);
    move_target.0 = Some(target);

    if dist <= config.fire_range && nav.attack_cooldown <= 0.0 {
        let aim_dir = (player.pos - pos).normalize_or_zero();
        fire.write(FireProjectile {
            position: pos + aim_dir * config.projectile_muzzle_offset,
            direction: aim_dir,
            damage: config.projectile_damage,
            owner: Some(entity),
        });
        nav.attack_cooldown = config.attack_cooldown;
    }
}

/// Path planning and following for the behaviors that route through A*:
/// re-plan when no path exists, when the path ran out short of the goal, or
/// when stuck; advance waypoints as they are reached and publish the current
/// waypoint as the look-ahead movement target.
pub(super) fn plan_and_follow_paths(
    config: Res<SimConfig>,
    grid: Option<ResMut<NavGrid>>,
    snapshot_query: Query<(Entity, &SimPosition, &ShipSpec), With<Ship>>,
    mut ships: Query<(Entity, &SimPosition, &mut NavState, &mut MoveTarget), With<Ship>>,
) {
    // Pathfinding unavailable: degrade to the direct targets behaviors set.
    let Some(mut grid) = grid else {
        return;
    };
    let delta = 1.0 / config.tick_rate as f32;

    let obstacles: Vec<(Entity, Vec2, f32)> = snapshot_query
        .iter()
        .map(|(entity, pos, spec)| (entity, pos.0, spec.avoid_radius))
        .collect();

    for (entity, pos, mut nav, mut move_target) in ships.iter_mut() {
        if !matches!(
            nav.behavior,
            Behavior::Patrol | Behavior::LongDistance | Behavior::Wander | Behavior::Flee
        ) {
            continue;
        }
        let Some(goal) = nav.last_target else {
            continue;
        };
        let pos = pos.0;
        let dist_to_goal = pos.distance(goal);

        // Stuck detection: no measurable progress toward the goal for too
        // long forces a fresh query with the trackers reset.
        if dist_to_goal < nav.closest_to_target - config.stuck_epsilon {
            nav.closest_to_target = dist_to_goal;
            nav.no_progress_timer = 0.0;
        } else {
            nav.no_progress_timer += delta;
            if nav.no_progress_timer > config.stuck_window {
                debug!("ship {:?} stuck {}s from goal, replanning", entity, config.stuck_window);
                nav.clear_path();
            }
        }

        if dist_to_goal <= config.waypoint_reach_distance {
            nav.last_target = None;
            nav.clear_path();
            move_target.0 = None;
            continue;
        }

        if nav.waypoints.is_empty() {
            // Obstacles are rebuilt from scratch for every query: every other
            // ship stamps a circle of its avoidance radius times the
            // configured multiplier.
            grid.stamp_obstacles(
                obstacles
                    .iter()
                    .filter(|(other, _, _)| *other != entity)
                    .map(|(_, p, r)| (*p, *r * config.nav_obstacle_multiplier)),
            );
            nav.waypoints = grid.find_path(pos, goal);
            nav.waypoint_index = 0;
        }

        while nav.waypoint_index < nav.waypoints.len()
            && pos.distance(nav.waypoints[nav.waypoint_index]) < config.waypoint_reach_distance
        {
            nav.waypoint_index += 1;
        }

        if nav.waypoint_index >= nav.waypoints.len() {
            // Path exhausted short of the goal: head straight while the next
            // tick re-plans.
            nav.waypoints.clear();
            nav.waypoint_index = 0;
            move_target.0 = Some(goal);
            continue;
        }

        move_target.0 = Some(nav.waypoints[nav.waypoint_index]);
    }
}

#[cfg(test)]
#[path = "behavior_tests.rs"]
mod tests;

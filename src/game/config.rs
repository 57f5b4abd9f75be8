use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Simulation configuration loaded once at startup. Every tunable the behavior,
/// steering, pathfinding and combat systems consume lives here so that an
/// external settings collaborator can persist and inject them.
///
/// The stuck-detection and avoidance constants are empirically tuned values
/// carried over unchanged; they are fields rather than literals so they can be
/// adjusted without touching system code.
#[derive(Resource, Deserialize, Serialize, Clone, Debug)]
pub struct SimConfig {
    // Simulation
    pub tick_rate: f64,
    pub map_width: f32,
    pub map_height: f32,
    /// Candidate target points are clamped this far inside the map edge.
    pub target_margin: f32,
    pub rng_seed: Option<u64>,

    // Ships (demo fleet defaults; a scenario loader may override per ship)
    pub ship_move_speed: f32,
    pub ship_rotation_speed: f32,
    pub ship_avoid_radius: f32,
    pub ship_look_ahead: f32,
    pub ship_max_health: f32,
    pub health_regen_rate: f32,
    pub demo_friendly_count: usize,
    pub demo_enemy_count: usize,

    // Behavior state machine
    pub idle_rate: f32,
    pub patrol_weight: f32,
    pub long_distance_weight: f32,
    pub wander_weight: f32,
    pub idle_duration_min: f32,
    pub idle_duration_max: f32,
    pub patrol_duration_min: f32,
    pub patrol_duration_max: f32,
    pub long_distance_duration_min: f32,
    pub long_distance_duration_max: f32,
    pub wander_duration_min: f32,
    pub wander_duration_max: f32,
    /// A ship counts as actively moving while farther than this from its
    /// commanded target.
    pub arrival_threshold: f32,

    // Patrol
    pub patrol_ring_min: f32,
    pub patrol_ring_max: f32,
    pub patrol_points_min: usize,
    pub patrol_points_max: usize,
    pub patrol_min_hop: f32,

    // Long distance travel
    pub long_distance_min_factor: f32,
    pub long_distance_max_factor: f32,
    pub long_distance_retries: usize,

    // Wander
    pub wander_distance_min: f32,
    pub wander_distance_max: f32,
    pub wander_retries: usize,
    pub wander_player_radius_multiplier: f32,
    pub wander_last_dir_blend: f32,

    // Flee
    pub flee_window: f32,
    pub flee_distance: f32,
    pub flee_reached_distance: f32,
    pub flee_threat_distance: f32,
    pub flee_health_fraction: f32,

    // Aggressive (enemy only)
    pub detection_range: f32,
    pub standoff_distance: f32,
    pub aggressive_backoff_multiplier: f32,
    pub aggressive_closing_cap: f32,
    pub strafe_distance: f32,
    pub fire_range: f32,
    pub attack_cooldown: f32,

    // Steering / avoidance
    pub avoidance_window_multiplier: f32,
    pub avoidance_blend: f32,
    /// Candidate targets are rejected when within this multiple of another
    /// ship's avoidance radius.
    pub ship_proximity_multiplier: f32,
    pub collision_push_strength: f32,

    // Navigation grid
    pub nav_cell_size: f32,
    pub nav_border_margin: usize,
    pub nav_obstacle_multiplier: f32,
    pub path_min_turn_angle: f32,
    pub path_min_waypoint_spacing: f32,
    pub waypoint_reach_distance: f32,
    pub stuck_window: f32,
    pub stuck_epsilon: f32,

    // Spatial hash
    pub spatial_cell_size: f32,

    // Projectiles
    pub projectile_speed: f32,
    pub projectile_lifetime: f32,
    pub projectile_damage: f32,
    pub projectile_collision_radius: f32,
    pub projectile_bounds_margin: f32,
    pub projectile_muzzle_offset: f32,
    pub pool_initial: usize,
    pub pool_max: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 30.0,
            map_width: 10_000.0,
            map_height: 10_000.0,
            target_margin: 400.0,
            rng_seed: None,

            ship_move_speed: 400.0,
            ship_rotation_speed: 3.0,
            ship_avoid_radius: 300.0,
            ship_look_ahead: 500.0,
            ship_max_health: 100.0,
            health_regen_rate: 2.0,
            demo_friendly_count: 6,
            demo_enemy_count: 4,

            idle_rate: 0.30,
            patrol_weight: 0.25,
            long_distance_weight: 0.20,
            wander_weight: 0.25,
            idle_duration_min: 8.0,
            idle_duration_max: 20.0,
            patrol_duration_min: 20.0,
            patrol_duration_max: 50.0,
            long_distance_duration_min: 40.0,
            long_distance_duration_max: 120.0,
            wander_duration_min: 10.0,
            wander_duration_max: 30.0,
            arrival_threshold: 150.0,

            patrol_ring_min: 600.0,
            patrol_ring_max: 1200.0,
            patrol_points_min: 3,
            patrol_points_max: 5,
            patrol_min_hop: 500.0,

            long_distance_min_factor: 0.75,
            long_distance_max_factor: 1.5,
            long_distance_retries: 20,

            wander_distance_min: 1000.0,
            wander_distance_max: 2000.0,
            wander_retries: 10,
            wander_player_radius_multiplier: 3.0,
            wander_last_dir_blend: 0.7,

            flee_window: 10.0,
            flee_distance: 2000.0,
            flee_reached_distance: 200.0,
            flee_threat_distance: 600.0,
            flee_health_fraction: 0.3,

            detection_range: 1500.0,
            standoff_distance: 600.0,
            aggressive_backoff_multiplier: 1.5,
            aggressive_closing_cap: 800.0,
            strafe_distance: 400.0,
            fire_range: 800.0,
            attack_cooldown: 1.5,

            avoidance_window_multiplier: 1.5,
            avoidance_blend: 0.3,
            ship_proximity_multiplier: 1.5,
            collision_push_strength: 1.0,

            nav_cell_size: 128.0,
            nav_border_margin: 2,
            nav_obstacle_multiplier: 1.0,
            path_min_turn_angle: 0.3,
            path_min_waypoint_spacing: 256.0,
            waypoint_reach_distance: 100.0,
            stuck_window: 3.0,
            stuck_epsilon: 5.0,

            spatial_cell_size: 256.0,

            projectile_speed: 1200.0,
            projectile_lifetime: 3.0,
            projectile_damage: 10.0,
            projectile_collision_radius: 64.0,
            projectile_bounds_margin: 500.0,
            projectile_muzzle_offset: 80.0,
            pool_initial: 64,
            pool_max: 256,
        }
    }
}

pub struct SimConfigPlugin;

impl Plugin for SimConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, load_sim_config);
    }
}

/// Load the simulation configuration synchronously before any startup system
/// that depends on these values. A missing or malformed file degrades to the
/// built-in defaults; the failure is reported once here, not per-call.
fn load_sim_config(mut commands: Commands) {
    let config_path = "assets/sim_config.ron";

    match std::fs::read_to_string(config_path) {
        Ok(contents) => match ron::from_str::<SimConfig>(&contents) {
            Ok(config) => {
                info!("Loaded simulation config from {}", config_path);
                commands.insert_resource(config);
            }
            Err(e) => {
                error!("Failed to parse simulation config: {}", e);
                error!("Using default SimConfig");
                commands.insert_resource(SimConfig::default());
            }
        },
        Err(e) => {
            error!("Failed to read {}: {}", config_path, e);
            error!("Using default SimConfig");
            commands.insert_resource(SimConfig::default());
        }
    }
}

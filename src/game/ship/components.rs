use bevy::prelude::*;
use smallvec::SmallVec;

/// Marks an entity as a ship subject to steering, behavior and combat.
#[derive(Component)]
pub struct Ship;

/// Health for ships. Regenerates toward max; a fleeing ship only calms down
/// once fully healed.
#[derive(Component)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn full(max: f32) -> Self {
        Self { current: max, max }
    }
}

/// Which side a ship is on. A single tag plus capability predicates replaces
/// the usual player/friendly/enemy inheritance chain.
#[derive(Component, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Faction {
    Player,
    Friendly,
    Enemy,
}

impl Faction {
    /// Only enemy ships hunt the player.
    pub fn can_go_aggressive(self) -> bool {
        matches!(self, Faction::Enemy)
    }

    /// Friendlies panic as soon as the player shoots them; enemies only flee
    /// below the low-health threshold.
    pub fn flees_on_any_player_hit(self) -> bool {
        matches!(self, Faction::Friendly)
    }
}

/// Per-ship movement and perception tuning.
#[derive(Component, Clone, Copy, Debug)]
pub struct ShipSpec {
    pub move_speed: f32,
    pub rotation_speed: f32,
    /// Minimum-separation distance used by steering and push-apart.
    pub avoid_radius: f32,
    /// How far ahead of the ship the obstacle look-ahead point sits.
    pub look_ahead: f32,
}

/// Behavior states for non-player ships.
///
/// `Flee` is never chosen by the random sampler - it is entered only on
/// qualifying damage or a low-health crossing. `Aggressive` is reachable only
/// by enemy ships and is forced while the player is in detection range.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Behavior {
    Idle,
    Patrol,
    LongDistance,
    Wander,
    Flee,
    Aggressive,
}

/// Per-ship navigation state, created lazily the first tick a non-player ship
/// is seen without one and dropped with the entity.
///
/// Invariants: `behavior_timer` is non-negative except for the infinite
/// Aggressive sentinel; `patrol_points`, once populated, stays non-empty while
/// the behavior is Patrol.
#[derive(Component, Debug)]
pub struct NavState {
    pub behavior: Behavior,
    /// Seconds until the behavior is re-evaluated. `f32::INFINITY` while
    /// Aggressive is externally sustained.
    pub behavior_timer: f32,
    pub last_direction: Vec2,
    pub last_position: Vec2,
    /// Last commanded movement goal, if any.
    pub last_target: Option<Vec2>,
    pub patrol_points: SmallVec<[Vec2; 5]>,
    pub patrol_index: usize,
    /// Active simplified A* waypoints and the one currently pursued.
    pub waypoints: Vec<Vec2>,
    pub waypoint_index: usize,
    /// Closest distance achieved toward `last_target`, for stuck detection.
    pub closest_to_target: f32,
    /// Seconds without measurable progress toward `last_target`.
    pub no_progress_timer: f32,
    /// Enemy-only weapon cooldown.
    pub attack_cooldown: f32,
    /// Drives the damage-tint side effect owned by the render layer.
    pub is_fleeing: bool,
}

impl NavState {
    pub fn new(behavior: Behavior, behavior_timer: f32, position: Vec2) -> Self {
        Self {
            behavior,
            behavior_timer,
            last_direction: Vec2::ZERO,
            last_position: position,
            last_target: None,
            patrol_points: SmallVec::new(),
            patrol_index: 0,
            waypoints: Vec::new(),
            waypoint_index: 0,
            closest_to_target: f32::INFINITY,
            no_progress_timer: 0.0,
            attack_cooldown: 0.0,
            is_fleeing: false,
        }
    }

    /// Command a new movement goal and reset path and progress tracking.
    pub fn command_target(&mut self, target: Vec2) {
        self.last_target = Some(target);
        self.clear_path();
    }

    pub fn clear_path(&mut self) {
        self.waypoints.clear();
        self.waypoint_index = 0;
        self.closest_to_target = f32::INFINITY;
        self.no_progress_timer = 0.0;
    }

    /// Switch behavior, dropping any in-flight path and stale patrol ring.
    pub fn enter(&mut self, behavior: Behavior, timer: f32) {
        self.behavior = behavior;
        self.behavior_timer = timer;
        self.last_target = None;
        self.clear_path();
        if behavior != Behavior::Patrol {
            self.patrol_points.clear();
            self.patrol_index = 0;
        }
        self.is_fleeing = behavior == Behavior::Flee;
    }
}

use bevy::prelude::*;

use crate::game::simulation::SimSet;

mod behavior;
mod components;
mod steering;
mod targets;

pub use components::{Behavior, Faction, Health, NavState, Ship, ShipSpec};
pub use steering::avoidance_vector;
pub use targets::ShipSnapshot;

pub struct ShipPlugin;

impl Plugin for ShipPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (steering::rebuild_spatial_hash, steering::apply_avoidance)
                .chain()
                .in_set(SimSet::Steering),
        );
        app.add_systems(
            FixedUpdate,
            (
                behavior::regenerate_health,
                behavior::init_nav_states,
                behavior::update_behaviors,
                behavior::plan_and_follow_paths,
            )
                .chain()
                .in_set(SimSet::Behavior),
        );
    }
}

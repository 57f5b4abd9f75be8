use bevy::prelude::*;

use super::SpatialHash;

impl SpatialHash {
    /// Query all entities in cells overlapping the circle around `pos`.
    /// Excludes `exclude` if provided.
    ///
    /// Populates `out` instead of allocating a new Vec to avoid runtime
    /// allocations; clears `out` before populating.
    ///
    /// NOTE: returns a superset of the exact result (everything in the
    /// covering cells). Callers needing exact distances must post-filter.
    pub fn query_radius(
        &self,
        pos: Vec2,
        radius: f32,
        exclude: Option<Entity>,
        out: &mut Vec<(Entity, Vec2)>,
    ) {
        out.clear();

        let half_w = self.map_width() / 2.0;
        let half_h = self.map_height() / 2.0;

        // Bounding box of cells the query circle overlaps, clamped to the
        // grid. Clamp to 0 after min() to avoid usize underflow.
        let min_x = pos.x - radius + half_w;
        let max_x = pos.x + radius + half_w;
        let min_y = pos.y - radius + half_h;
        let max_y = pos.y + radius + half_h;

        let cell = self.cell_size();
        let min_col = ((min_x / cell).floor() as isize).max(0) as usize;
        let max_col = ((max_x / cell).floor() as isize)
            .min(self.cols() as isize - 1)
            .max(0) as usize;
        let min_row = ((min_y / cell).floor() as isize).max(0) as usize;
        let max_row = ((max_y / cell).floor() as isize)
            .min(self.rows() as isize - 1)
            .max(0) as usize;

        for row in min_row..=max_row {
            for col in min_col..=max_col {
                let idx = row * self.cols() + col;
                for &(entity, entity_pos) in &self.cells()[idx] {
                    if Some(entity) != exclude {
                        out.push((entity, entity_pos));
                    }
                }
            }
        }
    }
}

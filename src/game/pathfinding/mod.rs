use bevy::prelude::*;

use crate::game::config::SimConfig;

mod astar;

/// Fixed-resolution navigation grid over the map.
///
/// Each cell is walkable or blocked. Cells within `border_margin` of the map
/// edge are permanently blocked; everything else is rebuilt from scratch by
/// [`NavGrid::stamp_obstacles`] before every path query cycle, so no stale
/// obstacle survives a clear.
///
/// The A* scratch fields (g-cost, h-cost, parent, closed) live alongside the
/// walkability flags and are reset at the start of every query.
#[derive(Resource)]
pub struct NavGrid {
    cols: usize,
    rows: usize,
    cell_size: f32,
    map_width: f32,
    map_height: f32,
    border_margin: usize,
    min_turn_angle: f32,
    min_waypoint_spacing: f32,
    walkable: Vec<bool>,
    // A* scratch, reset per query
    g: Vec<f32>,
    h: Vec<f32>,
    parent: Vec<i32>,
    closed: Vec<bool>,
}

pub struct PathfindingPlugin;

impl Plugin for PathfindingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_nav_grid);
    }
}

fn setup_nav_grid(mut commands: Commands, config: Res<SimConfig>) {
    let grid = NavGrid::from_config(&config);
    info!(
        "Navigation grid ready: {}x{} cells of {} units",
        grid.cols(),
        grid.rows(),
        grid.cell_size()
    );
    commands.insert_resource(grid);
}

impl NavGrid {
    pub fn new(
        map_width: f32,
        map_height: f32,
        cell_size: f32,
        border_margin: usize,
        min_turn_angle: f32,
        min_waypoint_spacing: f32,
    ) -> Self {
        let cols = (map_width / cell_size).ceil() as usize;
        let rows = (map_height / cell_size).ceil() as usize;
        let count = cols * rows;

        let mut grid = Self {
            cols,
            rows,
            cell_size,
            map_width,
            map_height,
            border_margin,
            min_turn_angle,
            min_waypoint_spacing,
            walkable: vec![true; count],
            g: vec![f32::INFINITY; count],
            h: vec![0.0; count],
            parent: vec![-1; count],
            closed: vec![false; count],
        };
        grid.clear_obstacles();
        grid
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(
            config.map_width,
            config.map_height,
            config.nav_cell_size,
            config.nav_border_margin,
            config.path_min_turn_angle,
            config.path_min_waypoint_spacing,
        )
    }

    pub fn cols(&self) -> usize {
        self.cols
    }
    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub(crate) fn index(&self, col: usize, row: usize) -> usize {
        row * self.cols + col
    }

    pub fn is_border(&self, col: usize, row: usize) -> bool {
        col < self.border_margin
            || row < self.border_margin
            || col >= self.cols - self.border_margin
            || row >= self.rows - self.border_margin
    }

    pub fn is_walkable(&self, col: usize, row: usize) -> bool {
        self.walkable[self.index(col, row)]
    }

    /// Mark a cell blocked/walkable. Border cells stay blocked no matter what.
    pub fn set_walkable(&mut self, col: usize, row: usize, walkable: bool) {
        if self.is_border(col, row) {
            return;
        }
        let idx = self.index(col, row);
        self.walkable[idx] = walkable;
    }

    /// Restore every non-border cell to walkable.
    pub fn clear_obstacles(&mut self) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let idx = self.index(col, row);
                self.walkable[idx] = !self.is_border(col, row);
            }
        }
    }

    /// Rasterize a circular obstacle into cell walkability flags: every cell
    /// whose center falls inside the circle is blocked.
    pub fn stamp_circle(&mut self, center: Vec2, radius: f32) {
        let radius_sq = radius * radius;
        let (min_col, min_row) = self.world_to_cell(center - Vec2::splat(radius));
        let (max_col, max_row) = self.world_to_cell(center + Vec2::splat(radius));

        for row in min_row..=max_row {
            for col in min_col..=max_col {
                if self.cell_to_world(col, row).distance_squared(center) <= radius_sq {
                    self.set_walkable(col, row, false);
                }
            }
        }
    }

    /// Rebuild the obstacle layer from scratch: clear, then stamp a circle for
    /// each dynamic obstacle (position, radius).
    pub fn stamp_obstacles(&mut self, obstacles: impl Iterator<Item = (Vec2, f32)>) {
        self.clear_obstacles();
        for (center, radius) in obstacles {
            self.stamp_circle(center, radius);
        }
    }

    /// World position -> containing cell, clamped to the grid.
    pub fn world_to_cell(&self, pos: Vec2) -> (usize, usize) {
        let x = pos.x + self.map_width / 2.0;
        let y = pos.y + self.map_height / 2.0;
        let col = ((x / self.cell_size).floor() as isize).clamp(0, self.cols as isize - 1) as usize;
        let row = ((y / self.cell_size).floor() as isize).clamp(0, self.rows as isize - 1) as usize;
        (col, row)
    }

    /// Center of a cell in world coordinates.
    pub fn cell_to_world(&self, col: usize, row: usize) -> Vec2 {
        Vec2::new(
            -self.map_width / 2.0 + (col as f32 + 0.5) * self.cell_size,
            -self.map_height / 2.0 + (row as f32 + 0.5) * self.cell_size,
        )
    }

    /// Clamp a world point inside the walkable interior (past the blocked
    /// border margin).
    pub fn clamp_to_bounds(&self, pos: Vec2) -> Vec2 {
        let margin = (self.border_margin as f32 + 0.5) * self.cell_size;
        Vec2::new(
            pos.x.clamp(-self.map_width / 2.0 + margin, self.map_width / 2.0 - margin),
            pos.y.clamp(-self.map_height / 2.0 + margin, self.map_height / 2.0 - margin),
        )
    }

    /// Whether the cell containing `pos` is currently walkable.
    pub fn is_walkable_at(&self, pos: Vec2) -> bool {
        let (col, row) = self.world_to_cell(pos);
        self.is_walkable(col, row)
    }

    #[cfg(test)]
    pub(crate) fn walkable_snapshot(&self) -> Vec<bool> {
        self.walkable.clone()
    }
}

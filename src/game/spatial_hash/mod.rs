use bevy::prelude::*;

mod query;

/// Spatial partitioning grid for proximity queries in 2D space.
///
/// The world is divided into a uniform grid of cells; an entity is inserted
/// into the single cell containing its position, and a radius query scans the
/// block of cells covering the query circle. Queries therefore return a
/// superset of the exact result; callers that need exact distances
/// post-filter.
///
/// The hash is transient: combat and steering rebuild it from current ship
/// positions every tick, so there is no incremental update and no staleness
/// to reason about.
///
/// - **Insert:** O(1) amortized
/// - **Query:** O(k) where k = entities in nearby cells
/// - **Clear:** O(cells), reuses allocated vectors
#[derive(Resource)]
pub struct SpatialHash {
    cell_size: f32,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<(Entity, Vec2)>>,
    map_width: f32,
    map_height: f32,
}

impl SpatialHash {
    pub fn new(map_width: f32, map_height: f32, cell_size: f32) -> Self {
        let cols = (map_width / cell_size).ceil() as usize + 1;
        let rows = (map_height / cell_size).ceil() as usize + 1;

        Self {
            cell_size,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
            map_width,
            map_height,
        }
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    pub fn insert(&mut self, entity: Entity, pos: Vec2) {
        if let Some(idx) = self.cell_index(pos) {
            self.cells[idx].push((entity, pos));
        }
    }

    /// Count the total number of entity entries across all cells.
    /// Useful for debugging and diagnostics.
    pub fn total_entries(&self) -> usize {
        self.cells.iter().map(|cell| cell.len()).sum()
    }

    /// Count the number of non-empty cells.
    pub fn non_empty_cells(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.is_empty()).count()
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }
    pub fn map_width(&self) -> f32 {
        self.map_width
    }
    pub fn map_height(&self) -> f32 {
        self.map_height
    }
    pub fn cols(&self) -> usize {
        self.cols
    }
    pub fn rows(&self) -> usize {
        self.rows
    }

    // Map is centered at 0,0; coordinates are [-half_w, half_w], both edges
    // inclusive - the bounds clamp parks ships at exactly +/-half, and those
    // must land in the last cell (the extra +1 col/row above covers it), not
    // fall out of the index.
    pub(crate) fn cell_index(&self, pos: Vec2) -> Option<usize> {
        let x = pos.x + self.map_width / 2.0;
        let y = pos.y + self.map_height / 2.0;

        if x < 0.0 || x > self.map_width || y < 0.0 || y > self.map_height {
            return None;
        }

        let col = ((x / self.cell_size) as usize).min(self.cols - 1);
        let row = ((y / self.cell_size) as usize).min(self.rows - 1);

        Some(row * self.cols + col)
    }

    pub(crate) fn cells(&self) -> &Vec<Vec<(Entity, Vec2)>> {
        &self.cells
    }
}

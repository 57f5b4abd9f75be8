use bevy::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::NavGrid;

const ORTHO_COST: f32 = 1.0;
const DIAGONAL_COST: f32 = std::f32::consts::SQRT_2;

/// Open-set entry ordered for a min-heap on f-cost, ties broken by lower
/// heuristic cost.
#[derive(Copy, Clone, PartialEq)]
struct OpenNode {
    f: f32,
    h: f32,
    idx: usize,
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the lowest f on top.
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.h.total_cmp(&self.h))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl NavGrid {
    /// 8-directional A* from `start` to `goal` (world coordinates, clamped to
    /// the walkable interior before lookup).
    ///
    /// Returns the simplified waypoint list. The first element is always the
    /// clamped start and the last the clamped goal, even when collinear. When
    /// no route exists (goal cell blocked, or the open set exhausts) the
    /// fallback is a direct single-waypoint path to the clamped goal - routing
    /// failure is recovered locally, never surfaced as an error.
    pub fn find_path(&mut self, start: Vec2, goal: Vec2) -> Vec<Vec2> {
        let start_w = self.clamp_to_bounds(start);
        let goal_w = self.clamp_to_bounds(goal);

        let (start_col, start_row) = self.world_to_cell(start_w);
        let (goal_col, goal_row) = self.world_to_cell(goal_w);

        if !self.is_walkable(goal_col, goal_row) {
            return vec![goal_w];
        }
        if start_col == goal_col && start_row == goal_row {
            return vec![start_w, goal_w];
        }

        self.reset_scratch();

        let start_idx = self.index(start_col, start_row);
        let goal_idx = self.index(goal_col, goal_row);

        self.g[start_idx] = 0.0;
        self.h[start_idx] = manhattan(start_col, start_row, goal_col, goal_row);

        let mut open = BinaryHeap::new();
        open.push(OpenNode {
            f: self.h[start_idx],
            h: self.h[start_idx],
            idx: start_idx,
        });

        while let Some(OpenNode { idx: current, .. }) = open.pop() {
            if self.closed[current] {
                continue;
            }
            self.closed[current] = true;

            if current == goal_idx {
                let cells = self.reconstruct(current);
                return self.to_waypoints(&cells, start_w, goal_w);
            }

            let col = current % self.cols();
            let row = current / self.cols();

            for (dc, dr, step_cost) in NEIGHBORS {
                let ncol = col as isize + dc;
                let nrow = row as isize + dr;
                if ncol < 0 || nrow < 0 || ncol >= self.cols() as isize || nrow >= self.rows() as isize {
                    continue;
                }
                let (ncol, nrow) = (ncol as usize, nrow as usize);
                // The start cell is expanded even if an obstacle was stamped
                // over the ship's own position; everything else must be open.
                if !self.is_walkable(ncol, nrow) {
                    continue;
                }

                let nidx = self.index(ncol, nrow);
                if self.closed[nidx] {
                    continue;
                }

                let tentative = self.g[current] + step_cost;
                if tentative < self.g[nidx] {
                    self.g[nidx] = tentative;
                    self.parent[nidx] = current as i32;
                    self.h[nidx] = manhattan(ncol, nrow, goal_col, goal_row);
                    open.push(OpenNode {
                        f: tentative + self.h[nidx],
                        h: self.h[nidx],
                        idx: nidx,
                    });
                }
            }
        }

        // Open set exhausted without reaching the goal.
        debug!(
            "No route from ({:.0},{:.0}) to ({:.0},{:.0}); falling back to direct target",
            start_w.x, start_w.y, goal_w.x, goal_w.y
        );
        vec![goal_w]
    }

    fn reset_scratch(&mut self) {
        self.g.fill(f32::INFINITY);
        self.h.fill(0.0);
        self.parent.fill(-1);
        self.closed.fill(false);
    }

    fn reconstruct(&self, mut current: usize) -> Vec<Vec2> {
        let mut cells = Vec::new();
        loop {
            cells.push(self.cell_to_world(current % self.cols(), current / self.cols()));
            let parent = self.parent[current];
            if parent < 0 {
                break;
            }
            current = parent as usize;
        }
        cells.reverse();
        cells
    }

    /// Replace the raw cell chain's endpoints with the verbatim start/goal and
    /// drop interior nodes that neither turn sharply nor add spacing.
    fn to_waypoints(&self, cells: &[Vec2], start_w: Vec2, goal_w: Vec2) -> Vec<Vec2> {
        let mut points = cells.to_vec();
        if let Some(first) = points.first_mut() {
            *first = start_w;
        }
        if let Some(last) = points.last_mut() {
            *last = goal_w;
        }
        simplify_path(&points, self.min_turn_angle, self.min_waypoint_spacing)
    }
}

const NEIGHBORS: [(isize, isize, f32); 8] = [
    (-1, 0, ORTHO_COST),
    (1, 0, ORTHO_COST),
    (0, -1, ORTHO_COST),
    (0, 1, ORTHO_COST),
    (-1, -1, DIAGONAL_COST),
    (1, -1, DIAGONAL_COST),
    (-1, 1, DIAGONAL_COST),
    (1, 1, DIAGONAL_COST),
];

fn manhattan(col: usize, row: usize, goal_col: usize, goal_row: usize) -> f32 {
    let dx = (col as i32 - goal_col as i32).abs();
    let dy = (row as i32 - goal_row as i32).abs();
    (dx + dy) as f32
}

/// Emit an interior waypoint only when the local turn angle exceeds
/// `min_turn_angle` AND the candidate is farther than `min_spacing` from the
/// last emitted waypoint. Start and end are always included, which bounds the
/// waypoint count on long straight paths to 2.
pub fn simplify_path(points: &[Vec2], min_turn_angle: f32, min_spacing: f32) -> Vec<Vec2> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut out = vec![points[0]];

    for i in 1..points.len() - 1 {
        let last = *out.last().expect("out is never empty");
        let incoming = points[i] - last;
        let outgoing = points[i + 1] - points[i];
        if incoming.length_squared() < 1e-6 || outgoing.length_squared() < 1e-6 {
            continue;
        }

        let turn = incoming.angle_to(outgoing).abs();
        if turn > min_turn_angle && points[i].distance(last) > min_spacing {
            out.push(points[i]);
        }
    }

    out.push(*points.last().expect("checked len above"));
    out
}

use bevy::prelude::*;
use std::collections::VecDeque;

/// Index into the pool's slot table. Handles are only valid while the slot is
/// active; a released slot recycles its index for the next shot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ProjectileHandle(pub usize);

/// One pooled projectile. Inactive slots keep their last payload; `active`
/// is the single source of truth for liveness.
#[derive(Clone, Copy, Debug)]
pub struct Projectile {
    pub active: bool,
    pub position: Vec2,
    pub direction: Vec2,
    pub damage: f32,
    pub age: f32,
    /// Firing ship, skipped during hit resolution so a shot never clips the
    /// shooter's own muzzle.
    pub owner: Option<Entity>,
}

impl Projectile {
    fn idle() -> Self {
        Self {
            active: false,
            position: Vec2::ZERO,
            direction: Vec2::X,
            damage: 0.0,
            age: 0.0,
            owner: None,
        }
    }
}

/// Fixed-capacity projectile pool. Slots are pre-allocated and recycled
/// through a free list; once `max_size` slots exist, fire requests are
/// dropped rather than growing further.
#[derive(Resource, Debug)]
pub struct ProjectilePool {
    slots: Vec<Projectile>,
    free: VecDeque<usize>,
    max_size: usize,
    active_count: usize,
}

impl ProjectilePool {
    pub fn new(initial: usize, max_size: usize) -> Self {
        let initial = initial.min(max_size);
        Self {
            slots: vec![Projectile::idle(); initial],
            free: (0..initial).collect(),
            max_size,
            active_count: 0,
        }
    }

    /// Activate a slot for a new shot. Returns `None` when the pool is
    /// exhausted at its cap; the shot is simply lost.
    pub fn fire(
        &mut self,
        position: Vec2,
        direction: Vec2,
        damage: f32,
        owner: Option<Entity>,
    ) -> Option<ProjectileHandle> {
        let index = match self.free.pop_front() {
            Some(index) => index,
            None if self.slots.len() < self.max_size => {
                self.slots.push(Projectile::idle());
                self.slots.len() - 1
            }
            None => {
                debug!("projectile pool exhausted at {}, dropping shot", self.max_size);
                return None;
            }
        };

        self.slots[index] = Projectile {
            active: true,
            position,
            direction,
            damage,
            age: 0.0,
            owner,
        };
        self.active_count += 1;
        Some(ProjectileHandle(index))
    }

    /// Deactivate a slot and return it to the free list. Releasing an
    /// already-inactive slot is a no-op.
    pub fn release(&mut self, handle: ProjectileHandle) {
        let Some(slot) = self.slots.get_mut(handle.0) else {
            return;
        };
        if !slot.active {
            return;
        }
        slot.active = false;
        self.free.push_back(handle.0);
        self.active_count -= 1;
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Shots that can still be fired before the cap: free slots plus the
    /// growth headroom.
    pub fn available_count(&self) -> usize {
        self.free.len() + (self.max_size - self.slots.len())
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn iter_active(&self) -> impl Iterator<Item = (ProjectileHandle, &Projectile)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, p)| p.active)
            .map(|(i, p)| (ProjectileHandle(i), p))
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (ProjectileHandle, &mut Projectile)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, p)| p.active)
            .map(|(i, p)| (ProjectileHandle(i), p))
    }
}

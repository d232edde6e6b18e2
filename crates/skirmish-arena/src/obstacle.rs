use glam::Vec2;
use serde::{Deserialize, Serialize};

use skirmish_core::error::{CoreError, ensure_finite};

/// Stable obstacle identity, unique within a match.
pub type ObstacleId = u32;

/// Wall orientation; decides the footprint and which velocity axis a bounce flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallOrientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Crate,
    Wall(WallOrientation),
}

/// A destructible piece of cover at a fixed grid-aligned position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub kind: ObstacleKind,
    pub position: Vec2,
    pub half_extents: Vec2,
    pub health: f32,
    /// Crates only: blows up when destroyed.
    pub explosive: bool,
    pub destroyed: bool,
}

impl Obstacle {
    /// Build an obstacle centred on `position`. `thickness` is the wall depth
    /// as a fraction of `tile_size`.
    pub fn new(
        id: ObstacleId,
        kind: ObstacleKind,
        position: Vec2,
        tile_size: f32,
        thickness: f32,
        health: f32,
        explosive: bool,
    ) -> Result<Self, CoreError> {
        ensure_finite("obstacle position", position.x, position.y)?;
        if !(tile_size > 0.0) || !(health > 0.0) {
            return Err(CoreError::InvalidConfig(format!(
                "obstacle needs positive tile size and health, got {tile_size} / {health}"
            )));
        }
        let half = tile_size / 2.0;
        let half_thick = half * thickness.clamp(0.05, 1.0);
        let half_extents = match kind {
            ObstacleKind::Crate => Vec2::splat(half),
            ObstacleKind::Wall(WallOrientation::Horizontal) => Vec2::new(half, half_thick),
            ObstacleKind::Wall(WallOrientation::Vertical) => Vec2::new(half_thick, half),
        };
        Ok(Self {
            id,
            kind,
            position,
            half_extents,
            health,
            explosive: explosive && kind == ObstacleKind::Crate,
            destroyed: false,
        })
    }

    pub fn is_active(&self) -> bool {
        !self.destroyed
    }

    pub fn min(&self) -> Vec2 {
        self.position - self.half_extents
    }

    pub fn max(&self) -> Vec2 {
        self.position + self.half_extents
    }

    /// Circle-vs-box overlap.
    pub fn overlaps_circle(&self, center: Vec2, radius: f32) -> bool {
        let closest = center.clamp(self.min(), self.max());
        closest.distance_squared(center) <= radius * radius
    }

    /// Box-vs-box overlap with a square of half-size `half`.
    pub fn overlaps_square(&self, center: Vec2, half: f32) -> bool {
        let d = (center - self.position).abs();
        d.x < self.half_extents.x + half && d.y < self.half_extents.y + half
    }

    /// Apply damage. Returns true only on the hit that destroys it; hits on
    /// an already destroyed obstacle are ignored.
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        if self.destroyed || !amount.is_finite() || amount <= 0.0 {
            return false;
        }
        self.health -= amount;
        if self.health <= 0.0 {
            self.destroyed = true;
            return true;
        }
        false
    }
}

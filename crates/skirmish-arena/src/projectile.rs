use std::f32::consts::PI;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use skirmish_core::player::PlayerSlot;

use crate::collision::wrap_angle;
use crate::config::ProjectileTuning;
use crate::events::TargetId;
use crate::stats::PlayerStats;

/// Directions shorter than this fall back to +X.
const MIN_DIRECTION: f32 = 1e-4;

/// Rectangular playfield, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaBounds {
    pub width: f32,
    pub height: f32,
}

impl ArenaBounds {
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= 0.0 && point.y >= 0.0 && point.x <= self.width && point.y <= self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

/// What happened to a projectile during one kinematic step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Already destroyed; nothing moved.
    Inactive,
    Moving,
    /// Bounced off at least one arena edge this step.
    Rebounded,
    /// Lifespan ran out.
    Expired,
    /// Left the arena with no rebounds remaining.
    Exited,
    /// Position or velocity became non-finite.
    Faulted,
}

impl TickOutcome {
    pub fn is_alive(self) -> bool {
        matches!(self, Self::Moving | Self::Rebounded)
    }
}

/// Result of a projectile striking a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Target was already struck, or the projectile is gone.
    Ignored,
    /// Hit counted; projectile keeps flying.
    Pierced,
    /// Hit counted and the projectile is spent.
    Destroyed,
}

impl HitOutcome {
    pub fn counted(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// A single bullet in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Unique per shot; pooled slots get a new serial on every spawn.
    pub serial: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    pub owner: PlayerSlot,
    pub damage: f32,
    /// Collision radius.
    pub size: f32,
    /// Seconds left to live.
    pub lifespan: f32,
    pub max_rebounds: u32,
    pub rebounds: u32,
    /// Piercing stack level at the time of firing.
    pub pierce: u32,
    pub homing: u32,
    /// Seconds until homing engages.
    pub homing_delay: f32,
    /// Targets already struck or bounced off; each is handled once.
    pub struck: SmallVec<[TargetId; 4]>,
    /// Counted hits against the pierce budget.
    pub hits: u32,
    pub destroyed: bool,
}

fn heading(direction: Vec2) -> Vec2 {
    if direction.is_finite() && direction.length() >= MIN_DIRECTION {
        direction.normalize()
    } else {
        Vec2::X
    }
}

impl Projectile {
    pub fn spawn(
        serial: u32,
        origin: Vec2,
        direction: Vec2,
        owner: PlayerSlot,
        stats: &PlayerStats,
        tuning: &ProjectileTuning,
    ) -> Self {
        let mut projectile = Self {
            serial,
            position: origin,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            owner,
            damage: 0.0,
            size: 0.0,
            lifespan: 0.0,
            max_rebounds: 0,
            rebounds: 0,
            pierce: 0,
            homing: 0,
            homing_delay: 0.0,
            struck: SmallVec::new(),
            hits: 0,
            destroyed: false,
        };
        projectile.reset(serial, origin, direction, owner, stats, tuning);
        projectile
    }

    /// Reinitialise every mutable field for reuse from the pool.
    pub fn reset(
        &mut self,
        serial: u32,
        origin: Vec2,
        direction: Vec2,
        owner: PlayerSlot,
        stats: &PlayerStats,
        tuning: &ProjectileTuning,
    ) {
        let dir = heading(direction);
        self.serial = serial;
        self.position = origin;
        self.velocity = dir * stats.bullet_speed;
        self.rotation = dir.y.atan2(dir.x);
        self.owner = owner;
        self.damage = stats.bullet_damage;
        self.size = stats.bullet_size;
        self.lifespan = tuning.lifespan;
        self.max_rebounds = stats.rebounds;
        self.rebounds = 0;
        self.pierce = stats.piercing;
        self.homing = stats.homing;
        self.homing_delay = tuning.homing_delay;
        self.struck.clear();
        self.hits = 0;
        self.destroyed = false;
    }

    pub fn is_active(&self) -> bool {
        !self.destroyed
    }

    /// Hits tolerated before the projectile is spent.
    ///
    /// Deliberately discontinuous: level 0 is a plain single-hit bullet, while
    /// any piercing level N grants N + 1 extra hits, so the first stack already
    /// passes through two targets.
    pub fn pierce_budget(&self) -> u32 {
        if self.pierce == 0 { 0 } else { self.pierce + 1 }
    }

    pub fn can_rebound(&self) -> bool {
        self.rebounds < self.max_rebounds
    }

    pub fn has_struck(&self, target: TargetId) -> bool {
        self.struck.contains(&target)
    }

    /// Remember a target without counting it as a hit (obstacle bounces).
    pub fn mark_struck(&mut self, target: TargetId) -> bool {
        if self.has_struck(target) {
            return false;
        }
        self.struck.push(target);
        true
    }

    /// Returns true if this call destroyed it.
    pub fn destroy(&mut self) -> bool {
        let was_active = !self.destroyed;
        self.destroyed = true;
        was_active
    }

    fn face_velocity(&mut self) {
        self.rotation = self.velocity.y.atan2(self.velocity.x);
    }

    /// Advance one step: lifespan, homing, movement, edge rebounds.
    pub fn tick(
        &mut self,
        dt: f32,
        bounds: &ArenaBounds,
        homing_target: Option<Vec2>,
        tuning: &ProjectileTuning,
    ) -> TickOutcome {
        if self.destroyed {
            return TickOutcome::Inactive;
        }
        if !dt.is_finite() || dt <= 0.0 {
            return TickOutcome::Moving;
        }

        self.lifespan -= dt;
        if self.lifespan <= 0.0 {
            self.destroyed = true;
            return TickOutcome::Expired;
        }

        if self.homing > 0 {
            self.homing_delay = (self.homing_delay - dt).max(0.0);
            if self.homing_delay <= 0.0
                && let Some(target) = homing_target
            {
                self.steer_toward(target, dt, tuning);
            }
        }

        self.position += self.velocity * dt;

        if !self.position.is_finite() || !self.velocity.is_finite() {
            tracing::warn!(
                serial = self.serial,
                "Projectile state became non-finite, destroying"
            );
            self.destroyed = true;
            return TickOutcome::Faulted;
        }

        let margin = tuning.boundary_margin;
        let buffer = tuning.rebound_buffer;
        let rebounded_x = self.rebound_edge(Axis::X, margin, bounds.width - margin, buffer);
        let rebounded_y = self.rebound_edge(Axis::Y, margin, bounds.height - margin, buffer);
        if rebounded_x || rebounded_y {
            self.face_velocity();
        }

        let tol = tuning.exit_tolerance;
        let p = self.position;
        if p.x < -tol || p.y < -tol || p.x > bounds.width + tol || p.y > bounds.height + tol {
            self.destroyed = true;
            return TickOutcome::Exited;
        }

        if rebounded_x || rebounded_y {
            TickOutcome::Rebounded
        } else {
            TickOutcome::Moving
        }
    }

    fn rebound_edge(&mut self, axis: Axis, lo: f32, hi: f32, buffer: f32) -> bool {
        let (pos, vel) = match axis {
            Axis::X => (self.position.x, self.velocity.x),
            Axis::Y => (self.position.y, self.velocity.y),
        };
        let outward_low = pos < lo && vel < 0.0;
        let outward_high = pos > hi && vel > 0.0;
        if !(outward_low || outward_high) || !self.can_rebound() {
            return false;
        }
        let new_pos = if outward_low { lo + buffer } else { hi - buffer };
        match axis {
            Axis::X => {
                self.velocity.x = -vel;
                self.position.x = new_pos;
            },
            Axis::Y => {
                self.velocity.y = -vel;
                self.position.y = new_pos;
            },
        }
        self.rebounds += 1;
        true
    }

    fn steer_toward(&mut self, target: Vec2, dt: f32, tuning: &ProjectileTuning) {
        let to_target = target - self.position;
        if to_target.length() < tuning.homing_min_distance {
            return;
        }
        let speed = self.velocity.length();
        let current = self.velocity.y.atan2(self.velocity.x);
        let desired = to_target.y.atan2(to_target.x);
        let error = wrap_angle(desired - current);
        let rate = (tuning.homing_turn_rate * self.homing as f32 * (0.5 + error.abs() / PI))
            .min(tuning.homing_max_turn);
        let fraction = (rate * dt).clamp(0.0, 1.0);
        let angle = current + error * fraction;
        self.velocity = Vec2::from_angle(angle) * speed;
        self.rotation = angle;
    }

    /// Flip one velocity component after touching an obstacle and push out by `nudge`.
    pub fn bounce_axis(&mut self, axis: Axis, nudge: Vec2) {
        match axis {
            Axis::X => self.velocity.x = -self.velocity.x,
            Axis::Y => self.velocity.y = -self.velocity.y,
        }
        self.position += nudge;
        self.rebounds += 1;
        self.face_velocity();
    }

    /// Count a hit against `target`. Re-hits of the same target are ignored.
    pub fn on_hit(&mut self, target: TargetId) -> HitOutcome {
        if self.destroyed || self.has_struck(target) {
            return HitOutcome::Ignored;
        }
        self.struck.push(target);
        self.hits += 1;
        if self.hits > self.pierce_budget() {
            self.destroyed = true;
            HitOutcome::Destroyed
        } else {
            HitOutcome::Pierced
        }
    }

    /// Bat the projectile back: new owner, new heading, fresh hit history.
    pub fn reflect(&mut self, new_owner: PlayerSlot, angle: f32, speed: f32) {
        self.owner = new_owner;
        self.velocity = Vec2::from_angle(angle) * speed;
        self.rotation = angle;
        self.struck.clear();
        self.hits = 0;
    }
}

/// Slot allocator for projectiles; slots are reused across shots and rounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectilePool {
    slots: Vec<Projectile>,
    /// Parallel to `slots`: whether the slot is handed out.
    live: Vec<bool>,
    free: Vec<usize>,
    active: Vec<usize>,
    next_serial: u32,
}

impl ProjectilePool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            live: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            active: Vec::with_capacity(capacity),
            next_serial: 0,
        }
    }

    /// Fire a projectile, reusing a free slot when one exists. Returns the slot.
    pub fn spawn(
        &mut self,
        origin: Vec2,
        direction: Vec2,
        owner: PlayerSlot,
        stats: &PlayerStats,
        tuning: &ProjectileTuning,
    ) -> usize {
        self.next_serial = self.next_serial.wrapping_add(1);
        let serial = self.next_serial;
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot].reset(serial, origin, direction, owner, stats, tuning);
                self.live[slot] = true;
                slot
            },
            None => {
                self.slots
                    .push(Projectile::spawn(serial, origin, direction, owner, stats, tuning));
                self.live.push(true);
                self.slots.len() - 1
            },
        };
        self.active.push(slot);
        slot
    }

    /// Return a slot to the free list. Double release is ignored.
    pub fn release(&mut self, slot: usize) -> bool {
        if !self.live.get(slot).copied().unwrap_or(false) {
            return false;
        }
        self.live[slot] = false;
        self.slots[slot].destroyed = true;
        self.active.retain(|&s| s != slot);
        self.free.push(slot);
        true
    }

    /// Release every destroyed active projectile. Run after the tick's updates.
    pub fn sweep(&mut self) -> usize {
        let spent: Vec<usize> = self
            .active
            .iter()
            .copied()
            .filter(|&s| self.slots[s].destroyed)
            .collect();
        for &slot in &spent {
            self.live[slot] = false;
            self.free.push(slot);
        }
        self.active.retain(|&s| !self.slots[s].destroyed);
        spent.len()
    }

    pub fn clear(&mut self) {
        for slot in std::mem::take(&mut self.active) {
            self.live[slot] = false;
            self.slots[slot].destroyed = true;
            self.free.push(slot);
        }
    }

    pub fn get(&self, slot: usize) -> Option<&Projectile> {
        self.slots.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Projectile> {
        self.slots.get_mut(slot)
    }

    /// Active slots in spawn order. Destroyed ones stay listed until `sweep`.
    pub fn active_slots(&self) -> &[usize] {
        &self.active
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &Projectile> {
        self.active.iter().map(|&s| &self.slots[s])
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Total slots ever allocated.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: ArenaBounds = ArenaBounds {
        width: 1280.0,
        height: 720.0,
    };

    fn fire(stats: &PlayerStats, origin: Vec2, direction: Vec2) -> Projectile {
        Projectile::spawn(
            1,
            origin,
            direction,
            PlayerSlot::One,
            stats,
            &ProjectileTuning::default(),
        )
    }

    #[test]
    fn velocity_follows_direction_and_speed() {
        let stats = PlayerStats::default();
        let p = fire(&stats, Vec2::new(100.0, 100.0), Vec2::new(0.0, 3.0));
        assert!((p.velocity - Vec2::new(0.0, 520.0)).length() < 1e-3);
        assert!((p.rotation - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn degenerate_direction_falls_back_to_x() {
        let stats = PlayerStats::default();
        let p = fire(&stats, Vec2::ZERO, Vec2::new(1e-6, 0.0));
        assert_eq!(p.velocity, Vec2::new(520.0, 0.0));
        let p = fire(&stats, Vec2::ZERO, Vec2::new(f32::NAN, 1.0));
        assert_eq!(p.velocity, Vec2::new(520.0, 0.0));
    }

    #[test]
    fn ordinary_bullet_dies_on_first_hit() {
        let stats = PlayerStats::default();
        let mut p = fire(&stats, Vec2::ZERO, Vec2::X);
        assert_eq!(p.on_hit(TargetId::Obstacle(1)), HitOutcome::Destroyed);
        assert!(p.destroyed);
        assert_eq!(p.on_hit(TargetId::Obstacle(2)), HitOutcome::Ignored);
    }

    #[test]
    fn pierce_level_destroys_on_n_plus_two() {
        for level in 1..=4u32 {
            let stats = PlayerStats {
                piercing: level,
                ..PlayerStats::default()
            };
            let mut p = fire(&stats, Vec2::ZERO, Vec2::X);
            for i in 0..=level {
                assert_eq!(
                    p.on_hit(TargetId::Obstacle(i)),
                    HitOutcome::Pierced,
                    "level {level} hit {i}"
                );
            }
            assert_eq!(
                p.on_hit(TargetId::Obstacle(100)),
                HitOutcome::Destroyed,
                "level {level} must die on hit {}",
                level + 2
            );
        }
    }

    #[test]
    fn rehit_same_target_not_counted() {
        let stats = PlayerStats {
            piercing: 1,
            ..PlayerStats::default()
        };
        let mut p = fire(&stats, Vec2::ZERO, Vec2::X);
        let target = TargetId::Player(PlayerSlot::Two);
        assert_eq!(p.on_hit(target), HitOutcome::Pierced);
        for _ in 0..5 {
            assert_eq!(p.on_hit(target), HitOutcome::Ignored);
        }
        assert_eq!(p.hits, 1);
    }

    #[test]
    fn expires_after_lifespan() {
        let stats = PlayerStats::default();
        let tuning = ProjectileTuning::default();
        let mut p = fire(&stats, Vec2::new(640.0, 360.0), Vec2::Y);
        p.velocity = Vec2::ZERO;
        assert_eq!(p.tick(1.0, &BOUNDS, None, &tuning), TickOutcome::Moving);
        assert_eq!(p.tick(2.0, &BOUNDS, None, &tuning), TickOutcome::Expired);
        assert!(p.destroyed);
    }

    #[test]
    fn edge_rebound_consumes_budget() {
        let stats = PlayerStats {
            rebounds: 1,
            ..PlayerStats::default()
        };
        let tuning = ProjectileTuning::default();
        let mut p = fire(&stats, Vec2::new(1270.0, 360.0), Vec2::X);
        assert_eq!(p.tick(0.05, &BOUNDS, None, &tuning), TickOutcome::Rebounded);
        assert!(p.velocity.x < 0.0);
        assert_eq!(p.position.x, 1280.0 - 4.0 - 2.0);
        assert_eq!(p.rebounds, 1);

        // Second edge contact: no budget, it leaves the arena.
        p.position = Vec2::new(10.0, 360.0);
        let mut outcome = TickOutcome::Moving;
        for _ in 0..10 {
            outcome = p.tick(0.02, &BOUNDS, None, &tuning);
            if !outcome.is_alive() {
                break;
            }
        }
        assert_eq!(outcome, TickOutcome::Exited);
        assert_eq!(p.rebounds, 1);
    }

    #[test]
    fn no_rebound_without_budget() {
        let stats = PlayerStats::default();
        let tuning = ProjectileTuning::default();
        let mut p = fire(&stats, Vec2::new(1279.0, 360.0), Vec2::X);
        assert_eq!(p.tick(0.01, &BOUNDS, None, &tuning), TickOutcome::Moving);
        assert!(p.velocity.x > 0.0);
        assert_eq!(p.tick(0.1, &BOUNDS, None, &tuning), TickOutcome::Exited);
    }

    #[test]
    fn homing_turns_toward_target_after_delay() {
        let stats = PlayerStats {
            homing: 1,
            ..PlayerStats::default()
        };
        let tuning = ProjectileTuning::default();
        let mut p = fire(&stats, Vec2::new(100.0, 360.0), Vec2::X);
        let target = Vec2::new(400.0, 600.0);

        p.tick(0.1, &BOUNDS, Some(target), &tuning);
        assert_eq!(p.velocity.y, 0.0, "no steering during the delay");

        p.tick(0.1, &BOUNDS, Some(target), &tuning);
        assert!(p.velocity.y > 0.0, "should curve toward the target");
        assert!((p.velocity.length() - 520.0).abs() < 1e-2, "speed preserved");
    }

    #[test]
    fn homing_skipped_when_close() {
        let stats = PlayerStats {
            homing: 3,
            ..PlayerStats::default()
        };
        let tuning = ProjectileTuning::default();
        let mut p = fire(&stats, Vec2::new(100.0, 360.0), Vec2::X);
        p.homing_delay = 0.0;
        p.tick(0.001, &BOUNDS, Some(Vec2::new(100.0, 380.0)), &tuning);
        assert_eq!(p.velocity.y, 0.0);
    }

    #[test]
    fn non_finite_state_faults() {
        let stats = PlayerStats::default();
        let tuning = ProjectileTuning::default();
        let mut p = fire(&stats, Vec2::new(100.0, 100.0), Vec2::X);
        p.velocity = Vec2::new(f32::INFINITY, 0.0);
        assert_eq!(p.tick(0.016, &BOUNDS, None, &tuning), TickOutcome::Faulted);
        assert!(p.destroyed);
    }

    #[test]
    fn reflect_transfers_owner_and_clears_history() {
        let stats = PlayerStats::default();
        let mut p = fire(&stats, Vec2::ZERO, Vec2::X);
        p.mark_struck(TargetId::Obstacle(3));
        p.hits = 1;
        p.reflect(PlayerSlot::Two, std::f32::consts::PI, 650.0);
        assert_eq!(p.owner, PlayerSlot::Two);
        assert!(p.struck.is_empty());
        assert_eq!(p.hits, 0);
        assert!((p.velocity - Vec2::new(-650.0, 0.0)).length() < 1e-2);
    }

    #[test]
    fn pool_reuses_slots_with_fresh_state() {
        let stats = PlayerStats::default();
        let tuning = ProjectileTuning::default();
        let mut pool = ProjectilePool::with_capacity(4);
        let a = pool.spawn(Vec2::ZERO, Vec2::X, PlayerSlot::One, &stats, &tuning);
        let first_serial = pool.get(a).unwrap().serial;
        pool.get_mut(a).unwrap().on_hit(TargetId::Obstacle(9));
        assert_eq!(pool.sweep(), 1);
        assert_eq!(pool.active_count(), 0);

        let b = pool.spawn(Vec2::ONE, Vec2::Y, PlayerSlot::Two, &stats, &tuning);
        assert_eq!(a, b, "slot reused");
        let p = pool.get(b).unwrap();
        assert_ne!(p.serial, first_serial);
        assert!(p.struck.is_empty());
        assert_eq!(p.hits, 0);
        assert!(!p.destroyed);
        assert_eq!(p.owner, PlayerSlot::Two);
        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn double_release_ignored() {
        let stats = PlayerStats::default();
        let tuning = ProjectileTuning::default();
        let mut pool = ProjectilePool::default();
        let slot = pool.spawn(Vec2::ZERO, Vec2::X, PlayerSlot::One, &stats, &tuning);
        assert!(pool.release(slot));
        assert!(!pool.release(slot));
        assert!(!pool.release(42));
        let a = pool.spawn(Vec2::ZERO, Vec2::X, PlayerSlot::One, &stats, &tuning);
        let b = pool.spawn(Vec2::ZERO, Vec2::X, PlayerSlot::One, &stats, &tuning);
        assert_ne!(a, b, "a slot must not be handed out twice");
    }

    #[test]
    fn clear_releases_everything() {
        let stats = PlayerStats::default();
        let tuning = ProjectileTuning::default();
        let mut pool = ProjectilePool::default();
        for _ in 0..5 {
            pool.spawn(Vec2::ZERO, Vec2::X, PlayerSlot::One, &stats, &tuning);
        }
        pool.clear();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.iter_active().count(), 0);
        assert_eq!(pool.capacity(), 5);
    }
}

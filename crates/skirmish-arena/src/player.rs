use glam::Vec2;
use serde::{Deserialize, Serialize};

use skirmish_core::player::PlayerSlot;

use crate::config::PlayerConfig;
use crate::obstacle::Obstacle;
use crate::projectile::ArenaBounds;
use crate::stats::{PlayerStats, ShieldState};

/// Raw controls for one seat. Axes are in [-1, 1]; buttons are edge or held flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    pub move_x: f32,
    pub move_y: f32,
    pub aim_x: f32,
    pub aim_y: f32,
    pub fire: bool,
    pub melee: bool,
    pub dash: bool,
}

impl PlayerInput {
    /// Zero any non-finite axis. Returns true if something was replaced.
    pub fn sanitize(&mut self) -> bool {
        let mut replaced = false;
        for axis in [
            &mut self.move_x,
            &mut self.move_y,
            &mut self.aim_x,
            &mut self.aim_y,
        ] {
            if !axis.is_finite() {
                *axis = 0.0;
                replaced = true;
            }
        }
        replaced
    }

    /// Fold a newer sample into this one. Axes take the latest value; buttons
    /// stay set until the next tick consumes them.
    pub fn accumulate(&mut self, newer: &PlayerInput) {
        self.move_x = newer.move_x;
        self.move_y = newer.move_y;
        self.aim_x = newer.aim_x;
        self.aim_y = newer.aim_y;
        self.fire |= newer.fire;
        self.melee |= newer.melee;
        self.dash |= newer.dash;
    }

    pub fn movement(&self, deadzone: f32) -> Vec2 {
        apply_deadzone(Vec2::new(self.move_x, self.move_y), deadzone)
    }

    /// Aim direction, or `None` while the stick rests in the deadzone.
    pub fn aim(&self, deadzone: f32) -> Option<Vec2> {
        let aim = apply_deadzone(Vec2::new(self.aim_x, self.aim_y), deadzone);
        (aim != Vec2::ZERO).then_some(aim)
    }
}

/// Radial deadzone with rescaling so output still spans [0, 1].
pub fn apply_deadzone(stick: Vec2, deadzone: f32) -> Vec2 {
    let magnitude = stick.length();
    if !magnitude.is_finite() || magnitude <= deadzone {
        return Vec2::ZERO;
    }
    let scaled = ((magnitude - deadzone) / (1.0 - deadzone)).min(1.0);
    stick / magnitude * scaled
}

/// Per-round body and ability state of one seat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub slot: PlayerSlot,
    pub position: Vec2,
    /// Facing angle in radians.
    pub facing: f32,
    pub alive: bool,
    pub fire_cooldown: f32,
    pub ammo: u32,
    pub reloading: bool,
    pub reload_timer: f32,
    pub melee_cooldown: f32,
    pub dash_charges: u32,
    /// Seconds until the next dash charge returns.
    pub dash_recharge: f32,
    /// Seconds left in the current dash.
    pub dash_timer: f32,
    pub dash_direction: Vec2,
    pub knockback: Vec2,
    pub shield: ShieldState,
}

impl PlayerState {
    pub fn new(slot: PlayerSlot, position: Vec2, stats: &PlayerStats) -> Self {
        let facing = match slot {
            PlayerSlot::One => 0.0,
            PlayerSlot::Two => std::f32::consts::PI,
        };
        Self {
            slot,
            position,
            facing,
            alive: true,
            fire_cooldown: 0.0,
            ammo: stats.magazine_size,
            reloading: false,
            reload_timer: 0.0,
            melee_cooldown: 0.0,
            dash_charges: stats.dash_charges,
            dash_recharge: 0.0,
            dash_timer: 0.0,
            dash_direction: Vec2::ZERO,
            knockback: Vec2::ZERO,
            shield: ShieldState::default(),
        }
    }

    /// Back to a fresh spawn: full ammo and charges, cooldowns cleared.
    pub fn respawn(&mut self, position: Vec2, stats: &PlayerStats) {
        *self = Self::new(self.slot, position, stats);
    }

    pub fn is_dashing(&self) -> bool {
        self.dash_timer > 0.0
    }

    /// Phase dash makes the dasher untouchable.
    pub fn is_invulnerable(&self, stats: &PlayerStats) -> bool {
        stats.phase_dash && self.is_dashing()
    }

    pub fn facing_vector(&self) -> Vec2 {
        Vec2::from_angle(self.facing)
    }

    /// Count down every per-player timer.
    pub fn tick_timers(&mut self, dt: f32, stats: &PlayerStats, config: &PlayerConfig) {
        self.fire_cooldown = (self.fire_cooldown - dt).max(0.0);
        self.melee_cooldown = (self.melee_cooldown - dt).max(0.0);
        self.dash_timer = (self.dash_timer - dt).max(0.0);
        self.shield.tick(dt);

        if self.reloading {
            self.reload_timer -= dt;
            if self.reload_timer <= 0.0 {
                self.reloading = false;
                self.reload_timer = 0.0;
                self.ammo = stats.magazine_size;
            }
        }

        if self.dash_charges < stats.dash_charges {
            self.dash_recharge -= dt;
            if self.dash_recharge <= 0.0 {
                self.dash_charges += 1;
                self.dash_recharge = if self.dash_charges < stats.dash_charges {
                    recharge_time(stats, config)
                } else {
                    0.0
                };
            }
        } else {
            self.dash_recharge = 0.0;
        }
    }

    pub fn start_reload(&mut self, stats: &PlayerStats) -> bool {
        if self.reloading || self.ammo >= stats.magazine_size {
            return false;
        }
        self.reloading = true;
        self.reload_timer = stats.reload_time;
        true
    }

    /// Spend one round if the weapon is ready. An empty magazine starts a reload.
    pub fn try_consume_shot(&mut self, stats: &PlayerStats) -> bool {
        if !self.alive || self.reloading || self.fire_cooldown > 0.0 || self.ammo == 0 {
            return false;
        }
        self.ammo -= 1;
        self.fire_cooldown = stats.shoot_rate;
        if self.ammo == 0 {
            self.start_reload(stats);
        }
        true
    }

    pub fn try_melee(&mut self, config: &PlayerConfig) -> bool {
        if !self.alive || self.melee_cooldown > 0.0 {
            return false;
        }
        self.melee_cooldown = config.melee_cooldown;
        true
    }

    /// Start a dash along `direction` (or the facing when idle). Returns the dash direction.
    pub fn try_dash(
        &mut self,
        direction: Vec2,
        stats: &PlayerStats,
        config: &PlayerConfig,
    ) -> Option<Vec2> {
        if !self.alive || self.is_dashing() || self.dash_charges == 0 {
            return None;
        }
        let dir = if direction.length_squared() > 0.0 {
            direction.normalize()
        } else {
            self.facing_vector()
        };
        self.dash_charges -= 1;
        self.dash_timer = config.dash_duration;
        self.dash_direction = dir;
        if self.dash_recharge <= 0.0 {
            self.dash_recharge = recharge_time(stats, config);
        }
        Some(dir)
    }

    /// Desired velocity for this tick, before knockback.
    pub fn drive_velocity(
        &self,
        movement: Vec2,
        stats: &PlayerStats,
        config: &PlayerConfig,
    ) -> Vec2 {
        if self.is_dashing() {
            self.dash_direction * stats.move_speed * config.dash_speed_multiplier
        } else {
            movement * stats.move_speed
        }
    }

    /// Exponential-style decay of knockback velocity.
    pub fn decay_knockback(&mut self, dt: f32, damping: f32) {
        let factor = (1.0 - damping * dt).max(0.0);
        self.knockback *= factor;
        if self.knockback.length_squared() < 1.0 {
            self.knockback = Vec2::ZERO;
        }
    }
}

fn recharge_time(stats: &PlayerStats, config: &PlayerConfig) -> f32 {
    if stats.quick_feet {
        config.quick_feet_dash_recharge
    } else {
        config.dash_recharge
    }
}

/// Move a square body by `delta`, one axis at a time, stopping at obstacles
/// unless `pass_through`, and clamping to the arena. Obstacles the body
/// already overlaps do not block, so a phase dash never strands it.
pub fn move_with_collision(
    position: Vec2,
    delta: Vec2,
    half: f32,
    obstacles: &[Obstacle],
    bounds: &ArenaBounds,
    pass_through: bool,
) -> Vec2 {
    let blocked = |p: Vec2| {
        !pass_through
            && obstacles.iter().any(|o| {
                o.is_active() && o.overlaps_square(p, half) && !o.overlaps_square(position, half)
            })
    };

    let mut pos = position;
    let try_x = Vec2::new(pos.x + delta.x, pos.y);
    if !blocked(try_x) {
        pos = try_x;
    }
    let try_y = Vec2::new(pos.x, pos.y + delta.y);
    if !blocked(try_y) {
        pos = try_y;
    }

    Vec2::new(
        pos.x.clamp(half, (bounds.width - half).max(half)),
        pos.y.clamp(half, (bounds.height - half).max(half)),
    )
}

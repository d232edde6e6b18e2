use serde::{Deserialize, Serialize};

use skirmish_core::upgrade::{UpgradeKind, UpgradeLog};

use crate::upgrades::UpgradeId;

/// Bonus damage multiplier per berserker stack while below the threshold.
pub const BERSERKER_BONUS_PER_STACK: f32 = 0.25;
/// Shield cooldown at one stack (seconds).
pub const SHIELD_BASE_COOLDOWN: f32 = 10.0;
/// Cooldown reduction per additional shield stack.
pub const SHIELD_COOLDOWN_STEP: f32 = 1.5;
/// Shield cooldown never drops below this.
pub const SHIELD_MIN_COOLDOWN: f32 = 4.0;

/// Mutable stat block for one seat, owned for the whole match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub health: f32,
    pub max_health: f32,
    pub move_speed: f32,
    /// Seconds between shots; lower fires faster.
    pub shoot_rate: f32,
    pub bullet_damage: f32,
    pub bullet_speed: f32,
    /// Bullet collision radius.
    pub bullet_size: f32,
    pub magazine_size: u32,
    pub reload_time: f32,
    pub melee_range: f32,
    pub melee_damage: f32,
    pub dash_charges: u32,
    pub piercing: u32,
    pub explosive: u32,
    pub rebounds: u32,
    pub homing: u32,
    pub vampirism: u32,
    pub berserker: u32,
    pub shield: u32,
    /// Extra bullets fired per shot.
    pub bullet_count: u32,
    /// Health regained per second.
    pub regen_rate: f32,
    /// Fraction of incoming damage removed, in [0, 1).
    pub damage_reduction: f32,
    pub phase_dash: bool,
    pub quick_feet: bool,
    pub upgrades: UpgradeLog<UpgradeId>,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            health: 100.0,
            max_health: 100.0,
            move_speed: 220.0,
            shoot_rate: 0.3,
            bullet_damage: 10.0,
            bullet_speed: 520.0,
            bullet_size: 5.0,
            magazine_size: 6,
            reload_time: 1.2,
            melee_range: 60.0,
            melee_damage: 15.0,
            dash_charges: 1,
            piercing: 0,
            explosive: 0,
            rebounds: 0,
            homing: 0,
            vampirism: 0,
            berserker: 0,
            shield: 0,
            bullet_count: 0,
            regen_rate: 0.0,
            damage_reduction: 0.0,
            phase_dash: false,
            quick_feet: false,
            upgrades: UpgradeLog::new(),
        }
    }
}

impl PlayerStats {
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Health fraction below which berserker stacks kick in.
    pub fn berserker_threshold(&self) -> f32 {
        (0.25 + 0.05 * self.berserker as f32).min(0.5)
    }

    /// Multiplier applied to damage this player deals.
    pub fn damage_multiplier(&self) -> f32 {
        if self.berserker >= 1 && self.health < self.max_health * self.berserker_threshold() {
            1.0 + self.berserker as f32 * BERSERKER_BONUS_PER_STACK
        } else {
            1.0
        }
    }

    pub fn outgoing_damage(&self, base: f32) -> f32 {
        base * self.damage_multiplier()
    }

    /// Incoming damage after reduction, floored to whole points.
    pub fn mitigate(&self, raw: f32) -> f32 {
        (raw * (1.0 - self.damage_reduction)).floor().max(0.0)
    }

    /// Seconds between shield blocks, or `None` without a shield.
    pub fn shield_cooldown(&self) -> Option<f32> {
        if self.shield == 0 {
            return None;
        }
        let cooldown =
            SHIELD_BASE_COOLDOWN - (self.shield - 1) as f32 * SHIELD_COOLDOWN_STEP;
        Some(cooldown.max(SHIELD_MIN_COOLDOWN))
    }

    /// Heal up to max health. Returns the amount restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if !self.is_alive() || !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.health;
        self.health = (self.health + amount).min(self.max_health);
        self.health - before
    }

    pub fn regenerate(&mut self, dt: f32) -> f32 {
        if self.regen_rate <= 0.0 {
            return 0.0;
        }
        self.heal(self.regen_rate * dt)
    }

    /// Full health for a new round.
    pub fn restore_full(&mut self) {
        self.health = self.max_health;
    }

    /// Record and apply an upgrade. Returns false for an ineligible repeat.
    pub fn apply_upgrade(&mut self, id: UpgradeId) -> bool {
        if !self.upgrades.record(id) {
            return false;
        }
        id.apply(self);
        true
    }
}

/// Shield readiness for one seat, reset each round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShieldState {
    /// Seconds until the shield can block again.
    pub cooldown: f32,
}

impl ShieldState {
    pub fn is_ready(&self, stats: &PlayerStats) -> bool {
        stats.shield > 0 && self.cooldown <= 0.0
    }

    pub fn tick(&mut self, dt: f32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
    }

    pub fn reset(&mut self) {
        self.cooldown = 0.0;
    }
}

/// Result of one incoming hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Target already dead or the hit carried no damage.
    Ignored,
    /// The shield absorbed the whole hit.
    Blocked,
    Damaged { amount: f32, died: bool },
}

/// Apply one hit: a ready shield blocks it outright, otherwise damage reduction applies.
pub fn resolve_incoming(
    stats: &mut PlayerStats,
    shield: &mut ShieldState,
    raw: f32,
) -> DamageOutcome {
    if !stats.is_alive() || !raw.is_finite() || raw <= 0.0 {
        return DamageOutcome::Ignored;
    }
    if shield.is_ready(stats) {
        shield.cooldown = stats.shield_cooldown().unwrap_or(SHIELD_BASE_COOLDOWN);
        return DamageOutcome::Blocked;
    }
    let amount = stats.mitigate(raw);
    stats.health = (stats.health - amount).max(0.0);
    DamageOutcome::Damaged {
        amount,
        died: stats.health <= 0.0,
    }
}

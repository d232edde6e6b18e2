use serde::{Deserialize, Serialize};

use skirmish_core::upgrade::UpgradeKind;

use crate::stats::PlayerStats;

/// Flat bullet damage added by `damage_up`.
pub const DAMAGE_UP_BONUS: f32 = 10.0;
/// Health added to both current and max by `vitality`.
pub const VITALITY_BONUS: f32 = 25.0;
/// Damage reduction never exceeds this.
pub const MAX_DAMAGE_REDUCTION: f32 = 0.75;

const MIN_SHOOT_RATE: f32 = 0.08;
const MIN_RELOAD_TIME: f32 = 0.3;

/// Every upgrade that can be drafted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeId {
    DamageUp,
    SpeedUp,
    RapidFire,
    BulletSpeed,
    BigBullets,
    ExtendedMag,
    FastReload,
    Vitality,
    LongReach,
    HeavyMelee,
    ExtraDash,
    Piercing,
    Explosive,
    Rebound,
    Homing,
    Vampirism,
    Berserker,
    Shield,
    Regeneration,
    Armor,
    MultiShot,
    PhaseDash,
    QuickFeet,
}

impl UpgradeId {
    pub const ALL: [UpgradeId; 23] = [
        UpgradeId::DamageUp,
        UpgradeId::SpeedUp,
        UpgradeId::RapidFire,
        UpgradeId::BulletSpeed,
        UpgradeId::BigBullets,
        UpgradeId::ExtendedMag,
        UpgradeId::FastReload,
        UpgradeId::Vitality,
        UpgradeId::LongReach,
        UpgradeId::HeavyMelee,
        UpgradeId::ExtraDash,
        UpgradeId::Piercing,
        UpgradeId::Explosive,
        UpgradeId::Rebound,
        UpgradeId::Homing,
        UpgradeId::Vampirism,
        UpgradeId::Berserker,
        UpgradeId::Shield,
        UpgradeId::Regeneration,
        UpgradeId::Armor,
        UpgradeId::MultiShot,
        UpgradeId::PhaseDash,
        UpgradeId::QuickFeet,
    ];

    pub fn name(self) -> &'static str {
        match self {
            UpgradeId::DamageUp => "Damage Up",
            UpgradeId::SpeedUp => "Speed Up",
            UpgradeId::RapidFire => "Rapid Fire",
            UpgradeId::BulletSpeed => "Velocity Rounds",
            UpgradeId::BigBullets => "Big Bullets",
            UpgradeId::ExtendedMag => "Extended Mag",
            UpgradeId::FastReload => "Fast Reload",
            UpgradeId::Vitality => "Vitality",
            UpgradeId::LongReach => "Long Reach",
            UpgradeId::HeavyMelee => "Heavy Melee",
            UpgradeId::ExtraDash => "Extra Dash",
            UpgradeId::Piercing => "Piercing",
            UpgradeId::Explosive => "Explosive Rounds",
            UpgradeId::Rebound => "Rebound",
            UpgradeId::Homing => "Homing",
            UpgradeId::Vampirism => "Vampirism",
            UpgradeId::Berserker => "Berserker",
            UpgradeId::Shield => "Shield",
            UpgradeId::Regeneration => "Regeneration",
            UpgradeId::Armor => "Armor",
            UpgradeId::MultiShot => "Multi Shot",
            UpgradeId::PhaseDash => "Phase Dash",
            UpgradeId::QuickFeet => "Quick Feet",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            UpgradeId::DamageUp => "+10 bullet damage",
            UpgradeId::SpeedUp => "+10% move speed",
            UpgradeId::RapidFire => "Shoot 15% faster",
            UpgradeId::BulletSpeed => "+15% bullet speed",
            UpgradeId::BigBullets => "Larger bullets, +3 damage",
            UpgradeId::ExtendedMag => "+2 magazine size",
            UpgradeId::FastReload => "Reload 20% faster",
            UpgradeId::Vitality => "+25 max health",
            UpgradeId::LongReach => "+15 melee range",
            UpgradeId::HeavyMelee => "+10 melee damage",
            UpgradeId::ExtraDash => "+1 dash charge",
            UpgradeId::Piercing => "Bullets pass through targets",
            UpgradeId::Explosive => "Bullets explode on impact",
            UpgradeId::Rebound => "Bullets bounce once more",
            UpgradeId::Homing => "Bullets curve toward the enemy",
            UpgradeId::Vampirism => "Heal 10% of damage dealt",
            UpgradeId::Berserker => "More damage at low health",
            UpgradeId::Shield => "Block one hit every few seconds",
            UpgradeId::Regeneration => "Regenerate 1 health per second",
            UpgradeId::Armor => "Take 10% less damage",
            UpgradeId::MultiShot => "Fire an extra bullet",
            UpgradeId::PhaseDash => "Dash through cover, untouchable",
            UpgradeId::QuickFeet => "Dash recharges faster",
        }
    }
}

impl UpgradeKind for UpgradeId {
    type Target = PlayerStats;

    fn is_stackable(&self) -> bool {
        !matches!(self, UpgradeId::PhaseDash | UpgradeId::QuickFeet)
    }

    fn apply(&self, s: &mut PlayerStats) {
        match self {
            UpgradeId::DamageUp => s.bullet_damage += DAMAGE_UP_BONUS,
            UpgradeId::SpeedUp => s.move_speed *= 1.1,
            UpgradeId::RapidFire => {
                s.shoot_rate = (s.shoot_rate * 0.85).max(MIN_SHOOT_RATE.min(s.shoot_rate));
            },
            UpgradeId::BulletSpeed => s.bullet_speed *= 1.15,
            UpgradeId::BigBullets => {
                s.bullet_size += 2.0;
                s.bullet_damage += 3.0;
            },
            UpgradeId::ExtendedMag => s.magazine_size += 2,
            UpgradeId::FastReload => {
                s.reload_time = (s.reload_time * 0.8).max(MIN_RELOAD_TIME.min(s.reload_time));
            },
            UpgradeId::Vitality => {
                s.max_health += VITALITY_BONUS;
                s.health += VITALITY_BONUS;
            },
            UpgradeId::LongReach => s.melee_range += 15.0,
            UpgradeId::HeavyMelee => s.melee_damage += 10.0,
            UpgradeId::ExtraDash => s.dash_charges += 1,
            UpgradeId::Piercing => s.piercing += 1,
            UpgradeId::Explosive => s.explosive += 1,
            UpgradeId::Rebound => s.rebounds += 1,
            UpgradeId::Homing => s.homing += 1,
            UpgradeId::Vampirism => s.vampirism += 1,
            UpgradeId::Berserker => s.berserker += 1,
            UpgradeId::Shield => s.shield += 1,
            UpgradeId::Regeneration => s.regen_rate += 1.0,
            UpgradeId::Armor => {
                let reduced = 1.0 - (1.0 - s.damage_reduction) * 0.9;
                s.damage_reduction = reduced.min(MAX_DAMAGE_REDUCTION).max(s.damage_reduction);
            },
            UpgradeId::MultiShot => s.bullet_count += 1,
            UpgradeId::PhaseDash => s.phase_dash = true,
            UpgradeId::QuickFeet => s.quick_feet = true,
        }
    }
}

/// Upgrades this stat block may still take, in catalogue order.
pub fn eligible_upgrades(stats: &PlayerStats) -> Vec<UpgradeId> {
    UpgradeId::ALL
        .iter()
        .copied()
        .filter(|&id| stats.upgrades.is_eligible(id))
        .collect()
}

use glam::Vec2;
use serde::{Deserialize, Serialize};

use skirmish_core::player::PlayerSlot;

use crate::obstacle::ObstacleId;
use crate::upgrades::UpgradeId;

/// Stable identity of anything a projectile can strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetId {
    Player(PlayerSlot),
    Obstacle(ObstacleId),
}

/// What dealt a point of damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageSource {
    Bullet { owner: PlayerSlot },
    Melee { attacker: PlayerSlot },
    Explosion { owner: Option<PlayerSlot> },
}

/// Domain events for the presentation layer, emitted in causal order within a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkirmishEvent {
    BulletFired {
        owner: PlayerSlot,
        projectile: u32,
        position: Vec2,
        angle: f32,
    },
    BulletHit {
        owner: PlayerSlot,
        projectile: u32,
        target: TargetId,
        position: Vec2,
        damage: f32,
    },
    BulletReflected {
        by: PlayerSlot,
        projectile: u32,
        position: Vec2,
        angle: f32,
    },
    MeleeAttack {
        attacker: PlayerSlot,
        position: Vec2,
        angle: f32,
    },
    MeleeHit {
        attacker: PlayerSlot,
        target: PlayerSlot,
        damage: f32,
        knockback: Vec2,
    },
    PlayerDamaged {
        slot: PlayerSlot,
        amount: f32,
        source: DamageSource,
    },
    ShieldBlocked {
        slot: PlayerSlot,
        position: Vec2,
    },
    HealthChanged {
        slot: PlayerSlot,
        health: f32,
        max_health: f32,
    },
    PlayerDied {
        slot: PlayerSlot,
        position: Vec2,
    },
    PlayerRespawned {
        slot: PlayerSlot,
        position: Vec2,
    },
    PlayerDashed {
        slot: PlayerSlot,
        position: Vec2,
        direction: Vec2,
    },
    Explosion {
        position: Vec2,
        radius: f32,
        owner: Option<PlayerSlot>,
    },
    ObstacleDestroyed {
        obstacle: ObstacleId,
        position: Vec2,
        explosive: bool,
    },
    RoundStart {
        round: u32,
    },
    RoundEnd {
        round: u32,
        winner: PlayerSlot,
        loser: PlayerSlot,
    },
    ScoreChanged {
        slot: PlayerSlot,
        score: u32,
    },
    DraftStarted {
        picker: PlayerSlot,
        offered: Vec<UpgradeId>,
    },
    /// A seat's turn to pick; `options` excludes what it may not take.
    DraftTurn {
        picker: PlayerSlot,
        options: Vec<UpgradeId>,
    },
    UpgradeChosen {
        slot: PlayerSlot,
        upgrade: UpgradeId,
    },
    MatchOver {
        winner: PlayerSlot,
    },
}

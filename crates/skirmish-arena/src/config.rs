use serde::{Deserialize, Serialize};

use skirmish_core::error::CoreError;

/// Arena dimensions and spawn placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Arena width in world units (pixels).
    pub width: f32,
    /// Arena height in world units.
    pub height: f32,
    /// Edge length of one layout grid cell.
    pub tile_size: f32,
    /// Respawn points as fractions of the arena size, indexed by slot.
    pub spawn_fractions: [(f32, f32); 2],
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            tile_size: 40.0,
            spawn_fractions: [(0.15, 0.5), (0.85, 0.5)],
        }
    }
}

impl WorldConfig {
    pub fn grid_width(&self) -> i32 {
        (self.width / self.tile_size).floor() as i32
    }

    pub fn grid_height(&self) -> i32 {
        (self.height / self.tile_size).floor() as i32
    }
}

/// Player body, movement, and ability timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Side length of the square player hitbox.
    pub size: f32,
    /// Radial stick deadzone applied to move and aim axes.
    pub deadzone: f32,
    pub melee_cooldown: f32,
    pub dash_duration: f32,
    /// Dash speed as a multiple of move speed.
    pub dash_speed_multiplier: f32,
    /// Seconds to regain one dash charge.
    pub dash_recharge: f32,
    /// Recharge time with the quick_feet upgrade.
    pub quick_feet_dash_recharge: f32,
    /// Knockback velocity decay rate per second.
    pub knockback_damping: f32,
    /// Angle between bullets of one multi-shot volley (radians).
    pub multi_shot_spread: f32,
    /// Fraction of dealt damage healed per vampirism stack.
    pub vampirism_fraction: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            size: 32.0,
            deadzone: 0.2,
            melee_cooldown: 0.45,
            dash_duration: 0.14,
            dash_speed_multiplier: 3.5,
            dash_recharge: 1.2,
            quick_feet_dash_recharge: 0.7,
            knockback_damping: 8.0,
            multi_shot_spread: 0.12,
            vampirism_fraction: 0.1,
        }
    }
}

impl PlayerConfig {
    pub fn half_size(&self) -> f32 {
        self.size / 2.0
    }
}

/// Projectile kinematics and pooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    /// Seconds before an unspent projectile expires.
    pub lifespan: f32,
    /// Inset of the rebound edge from the arena boundary.
    pub boundary_margin: f32,
    /// Distance a rebounding projectile is pushed back inside the edge.
    pub rebound_buffer: f32,
    /// How far outside the arena a spent projectile may travel before removal.
    pub exit_tolerance: f32,
    /// Seconds after spawn before homing engages.
    pub homing_delay: f32,
    /// No steering inside this distance of the target.
    pub homing_min_distance: f32,
    /// Heading interpolation rate per homing stack (1/s).
    pub homing_turn_rate: f32,
    /// Cap on the interpolation rate (1/s).
    pub homing_max_turn: f32,
    /// Push-out distance after bouncing off an obstacle.
    pub obstacle_nudge: f32,
    pub initial_pool_capacity: usize,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            lifespan: 2.5,
            boundary_margin: 4.0,
            rebound_buffer: 2.0,
            exit_tolerance: 20.0,
            homing_delay: 0.15,
            homing_min_distance: 30.0,
            homing_turn_rate: 3.0,
            homing_max_turn: 12.0,
            obstacle_nudge: 2.0,
            initial_pool_capacity: 64,
        }
    }
}

/// Melee cone and bullet reflection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeleeConfig {
    /// Half-width of the swing cone (radians).
    pub half_arc: f32,
    /// Samples per side of the target hitbox grid.
    pub sample_resolution: u32,
    /// Extra broad-phase radius so boxes hit on the diagonal are not culled.
    pub diagonal_buffer: f32,
    pub knockback_force: f32,
    /// Speed of a projectile after being batted back.
    pub reflect_speed: f32,
}

impl Default for MeleeConfig {
    fn default() -> Self {
        Self {
            half_arc: std::f32::consts::FRAC_PI_3,
            sample_resolution: 7,
            diagonal_buffer: 8.0,
            knockback_force: 350.0,
            reflect_speed: 650.0,
        }
    }
}

/// Area damage from explosive bullets and crates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplosionConfig {
    /// Damage multiplier floor at the edge of the blast.
    pub min_multiplier: f32,
    pub knockback_force: f32,
    /// Bullet blast radius at one explosive stack.
    pub base_radius: f32,
    pub radius_per_stack: f32,
    /// Fraction of bullet damage dealt by the blast at one stack.
    pub damage_fraction: f32,
    pub damage_fraction_per_stack: f32,
    pub crate_radius: f32,
    pub crate_damage: f32,
    /// Upper bound on blasts resolved in one tick (crate chains).
    pub max_chain: usize,
}

impl Default for ExplosionConfig {
    fn default() -> Self {
        Self {
            min_multiplier: 0.3,
            knockback_force: 300.0,
            base_radius: 50.0,
            radius_per_stack: 15.0,
            damage_fraction: 0.5,
            damage_fraction_per_stack: 0.25,
            crate_radius: 70.0,
            crate_damage: 25.0,
            max_chain: 32,
        }
    }
}

/// Procedural obstacle placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub crate_min_tiles: usize,
    pub crate_max_tiles: usize,
    pub wall_min_tiles: usize,
    pub wall_max_tiles: usize,
    /// Cells kept clear around each spawn during the crate pass.
    pub crate_spawn_radius: i32,
    /// Cells kept clear around each spawn during the wall pass.
    pub wall_spawn_radius: i32,
    pub max_arrangement_attempts: u32,
    pub max_placement_attempts: u32,
    /// Patterns with at least this many cells count as large.
    pub large_pattern_cells: usize,
    pub explosive_crate_chance: f64,
    pub crate_health: f32,
    pub wall_health: f32,
    /// Wall thickness as a fraction of the tile size.
    pub wall_thickness: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            crate_min_tiles: 12,
            crate_max_tiles: 22,
            wall_min_tiles: 8,
            wall_max_tiles: 16,
            crate_spawn_radius: 2,
            wall_spawn_radius: 3,
            max_arrangement_attempts: 50,
            max_placement_attempts: 50,
            large_pattern_cells: 4,
            explosive_crate_chance: 0.1,
            crate_health: 30.0,
            wall_health: 60.0,
            wall_thickness: 0.4,
        }
    }
}

/// Round pacing and match length.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    pub victory_pause_secs: f32,
    pub draft_pool_size: usize,
    /// Seconds per draft turn before the first eligible option is auto-picked.
    pub draft_turn_secs: f32,
    /// Rounds needed to win the match.
    pub win_target: u32,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            victory_pause_secs: 2.0,
            draft_pool_size: 3,
            draft_turn_secs: 15.0,
            win_target: 5,
        }
    }
}

/// Data-driven configuration for a Skirmish match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Fixed RNG seed for reproducible layouts and drafts.
    pub seed: Option<u64>,
    pub world: WorldConfig,
    pub player: PlayerConfig,
    pub projectile: ProjectileTuning,
    pub melee: MeleeConfig,
    pub explosion: ExplosionConfig,
    pub layout: LayoutConfig,
    pub round: RoundConfig,
}

impl ArenaConfig {
    /// Load config from `SKIRMISH_CONFIG` or `config/skirmish.toml`, falling back to defaults.
    pub fn load() -> Self {
        let path = std::env::var("SKIRMISH_CONFIG")
            .unwrap_or_else(|_| "config/skirmish.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content).unwrap_or_else(|e| {
                tracing::warn!("Failed to load {path}: {e}, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml(content: &str) -> Result<Self, CoreError> {
        let config = toml::from_str::<Self>(content)
            .map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let w = &self.world;
        if !(w.width > 0.0 && w.height > 0.0 && w.tile_size > 0.0) {
            return Err(CoreError::InvalidConfig(
                "world dimensions and tile_size must be positive".to_string(),
            ));
        }
        if w.grid_width() < 1 || w.grid_height() < 1 {
            return Err(CoreError::InvalidConfig(
                "arena must be at least one tile in each direction".to_string(),
            ));
        }
        for (fx, fy) in w.spawn_fractions {
            if !(0.0..=1.0).contains(&fx) || !(0.0..=1.0).contains(&fy) {
                return Err(CoreError::InvalidConfig(format!(
                    "spawn fraction ({fx}, {fy}) outside the arena"
                )));
            }
        }
        let l = &self.layout;
        if l.crate_min_tiles > l.crate_max_tiles || l.wall_min_tiles > l.wall_max_tiles {
            return Err(CoreError::InvalidConfig(
                "layout min tiles must not exceed max tiles".to_string(),
            ));
        }
        if self.player.size <= 0.0 || !(0.0..1.0).contains(&self.player.deadzone) {
            return Err(CoreError::InvalidConfig(
                "player size must be positive and deadzone in [0, 1)".to_string(),
            ));
        }
        if self.melee.sample_resolution == 0 {
            return Err(CoreError::InvalidConfig(
                "melee sample_resolution must be at least 1".to_string(),
            ));
        }
        if self.round.win_target == 0 {
            return Err(CoreError::InvalidConfig(
                "win_target must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

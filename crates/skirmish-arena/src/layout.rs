use std::collections::HashSet;

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::config::{ArenaConfig, LayoutConfig};
use crate::obstacle::{Obstacle, ObstacleId, ObstacleKind, WallOrientation};

/// Occupancy key: a plain cell, or a cell qualified by wall orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellKey {
    pub x: i32,
    pub y: i32,
    pub orientation: Option<WallOrientation>,
}

impl CellKey {
    pub fn plain(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            orientation: None,
        }
    }
}

/// One cell of a pattern, relative to the pattern origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCell {
    pub dx: i32,
    pub dy: i32,
    pub orientation: Option<WallOrientation>,
}

/// A named multi-cell shape, placed all-or-nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    pub cells: Vec<PatternCell>,
}

impl Pattern {
    fn plain(name: &str, offsets: &[(i32, i32)]) -> Self {
        Self {
            name: name.to_string(),
            cells: offsets
                .iter()
                .map(|&(dx, dy)| PatternCell {
                    dx,
                    dy,
                    orientation: None,
                })
                .collect(),
        }
    }

    fn oriented(name: &str, offsets: &[(i32, i32, WallOrientation)]) -> Self {
        Self {
            name: name.to_string(),
            cells: offsets
                .iter()
                .map(|&(dx, dy, o)| PatternCell {
                    dx,
                    dy,
                    orientation: Some(o),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Crate shapes.
pub fn crate_patterns() -> Vec<Pattern> {
    vec![
        Pattern::plain("single", &[(0, 0)]),
        Pattern::plain("pair_h", &[(0, 0), (1, 0)]),
        Pattern::plain("pair_v", &[(0, 0), (0, 1)]),
        Pattern::plain("l_shape", &[(0, 0), (0, 1), (1, 1)]),
        Pattern::plain("block", &[(0, 0), (1, 0), (0, 1), (1, 1)]),
        Pattern::plain("tee", &[(0, 0), (1, 0), (2, 0), (1, 1)]),
        Pattern::plain("line", &[(0, 0), (1, 0), (2, 0), (3, 0)]),
        Pattern::plain("plus", &[(1, 0), (0, 1), (1, 1), (2, 1), (1, 2)]),
    ]
}

/// Wall shapes; every cell carries its orientation.
pub fn wall_patterns() -> Vec<Pattern> {
    use WallOrientation::{Horizontal as H, Vertical as V};
    vec![
        Pattern::oriented("short_h", &[(0, 0, H), (1, 0, H)]),
        Pattern::oriented("short_v", &[(0, 0, V), (0, 1, V)]),
        Pattern::oriented("long_h", &[(0, 0, H), (1, 0, H), (2, 0, H), (3, 0, H)]),
        Pattern::oriented("long_v", &[(0, 0, V), (0, 1, V), (0, 2, V), (0, 3, V)]),
        Pattern::oriented("corner", &[(0, 0, H), (1, 0, H), (0, 1, V), (0, 2, V)]),
        Pattern::oriented(
            "cross",
            &[(0, 1, H), (1, 1, H), (2, 1, H), (1, 0, V), (1, 2, V)],
        ),
        Pattern::oriented(
            "u_shape",
            &[
                (0, 0, V),
                (0, 1, V),
                (0, 2, H),
                (1, 2, H),
                (2, 2, H),
                (2, 1, V),
                (2, 0, V),
            ],
        ),
    ]
}

/// Tile-count targets and retry limits for one placement pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementTargets {
    pub min_tiles: usize,
    pub max_tiles: usize,
    pub max_arrangement_attempts: u32,
    pub max_placement_attempts: u32,
    pub large_pattern_cells: usize,
}

impl PlacementTargets {
    pub fn crates(config: &LayoutConfig) -> Self {
        Self {
            min_tiles: config.crate_min_tiles,
            max_tiles: config.crate_max_tiles,
            max_arrangement_attempts: config.max_arrangement_attempts,
            max_placement_attempts: config.max_placement_attempts,
            large_pattern_cells: config.large_pattern_cells,
        }
    }

    pub fn walls(config: &LayoutConfig) -> Self {
        Self {
            min_tiles: config.wall_min_tiles,
            max_tiles: config.wall_max_tiles,
            ..Self::crates(config)
        }
    }
}

/// A cell stamped by a placed pattern, in absolute grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedCell {
    pub x: i32,
    pub y: i32,
    pub orientation: Option<WallOrientation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub pattern: String,
    pub cells: Vec<PlacedCell>,
}

/// Outcome of one placement pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutReport {
    pub placements: Vec<Placement>,
    pub tiles: usize,
    pub attempts: u32,
}

impl LayoutReport {
    pub fn cells(&self) -> impl Iterator<Item = &PlacedCell> {
        self.placements.iter().flat_map(|p| p.cells.iter())
    }
}

/// Occupancy for one round's arena, shared by the crate and wall passes.
#[derive(Debug, Clone)]
pub struct LayoutSession {
    width: i32,
    height: i32,
    occupied: HashSet<CellKey>,
}

impl LayoutSession {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            occupied: HashSet::new(),
        }
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn is_occupied(&self, key: &CellKey) -> bool {
        self.occupied.contains(key)
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied.len()
    }

    /// Mark a square of `radius` cells around `center` as unavailable.
    pub fn reserve_around(&mut self, center: (i32, i32), radius: i32) {
        let radius = radius.max(0);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let (x, y) = (center.0 + dx, center.1 + dy);
                if self.in_bounds(x, y) {
                    self.occupied.insert(CellKey::plain(x, y));
                }
            }
        }
    }

    /// Whether every cell of `pattern` at `origin` is in bounds and free.
    pub fn fits(&self, pattern: &Pattern, origin: (i32, i32)) -> bool {
        pattern.cells.iter().all(|c| {
            let (x, y) = (origin.0 + c.dx, origin.1 + c.dy);
            if !self.in_bounds(x, y) || self.is_occupied(&CellKey::plain(x, y)) {
                return false;
            }
            match c.orientation {
                Some(o) => !self.is_occupied(&CellKey {
                    x,
                    y,
                    orientation: Some(o),
                }),
                None => true,
            }
        })
    }

    /// Stamp all cells. Callers must check `fits` first.
    fn stamp(&mut self, pattern: &Pattern, origin: (i32, i32)) -> Vec<PlacedCell> {
        pattern
            .cells
            .iter()
            .map(|c| {
                let (x, y) = (origin.0 + c.dx, origin.1 + c.dy);
                self.occupied.insert(CellKey::plain(x, y));
                if let Some(o) = c.orientation {
                    self.occupied.insert(CellKey {
                        x,
                        y,
                        orientation: Some(o),
                    });
                }
                PlacedCell {
                    x,
                    y,
                    orientation: c.orientation,
                }
            })
            .collect()
    }

    /// Place whole patterns until `min_tiles` is reached or attempts run out.
    ///
    /// Falling short of `min_tiles` is accepted; the report says how far it got.
    pub fn place_patterns<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        patterns: &[Pattern],
        targets: &PlacementTargets,
    ) -> LayoutReport {
        let mut report = LayoutReport::default();
        if self.width <= 0 || self.height <= 0 {
            return report;
        }

        while report.tiles < targets.min_tiles
            && report.attempts < targets.max_arrangement_attempts
        {
            report.attempts += 1;

            let candidates: Vec<usize> = (0..patterns.len())
                .filter(|&i| {
                    !patterns[i].is_empty() && report.tiles + patterns[i].len() <= targets.max_tiles
                })
                .collect();
            if candidates.is_empty() {
                break;
            }

            // Favour big shapes early so sparse arenas converge quickly.
            let pool = if report.tiles < targets.min_tiles / 2 {
                let large: Vec<usize> = candidates
                    .iter()
                    .copied()
                    .filter(|&i| patterns[i].len() >= targets.large_pattern_cells)
                    .collect();
                if large.is_empty() { candidates } else { large }
            } else {
                candidates
            };
            let Some(&index) = pool.choose(rng) else {
                break;
            };
            let pattern = &patterns[index];

            for _ in 0..targets.max_placement_attempts {
                let origin = (
                    rng.random_range(0..self.width),
                    rng.random_range(0..self.height),
                );
                if self.fits(pattern, origin) {
                    let cells = self.stamp(pattern, origin);
                    report.tiles += cells.len();
                    report.placements.push(Placement {
                        pattern: pattern.name.clone(),
                        cells,
                    });
                    break;
                }
            }
        }

        if report.tiles < targets.min_tiles {
            tracing::debug!(
                tiles = report.tiles,
                min = targets.min_tiles,
                attempts = report.attempts,
                "Layout pass fell short of its tile target"
            );
        }
        report
    }
}

/// World-space centre of a grid cell.
pub fn cell_center(x: i32, y: i32, tile_size: f32) -> Vec2 {
    Vec2::new((x as f32 + 0.5) * tile_size, (y as f32 + 0.5) * tile_size)
}

/// Grid cell containing a world position.
pub fn world_to_cell(position: Vec2, tile_size: f32) -> (i32, i32) {
    (
        (position.x / tile_size).floor() as i32,
        (position.y / tile_size).floor() as i32,
    )
}

/// World position of each seat's spawn point.
pub fn spawn_points(config: &ArenaConfig) -> [Vec2; 2] {
    let w = &config.world;
    w.spawn_fractions
        .map(|(fx, fy)| Vec2::new(fx * w.width, fy * w.height))
}

/// Build a fresh arena: crates first, then walls, both keeping clear of the
/// spawns. Ids continue from `next_id` so they never repeat within a match.
pub fn generate_obstacles<R: Rng + ?Sized>(
    rng: &mut R,
    config: &ArenaConfig,
    next_id: &mut ObstacleId,
) -> Vec<Obstacle> {
    let world = &config.world;
    let layout = &config.layout;
    let mut session = LayoutSession::new(world.grid_width(), world.grid_height());
    let spawn_cells = spawn_points(config).map(|p| world_to_cell(p, world.tile_size));

    for cell in spawn_cells {
        session.reserve_around(cell, layout.crate_spawn_radius);
    }
    let crates = session.place_patterns(rng, &crate_patterns(), &PlacementTargets::crates(layout));

    for cell in spawn_cells {
        session.reserve_around(cell, layout.wall_spawn_radius);
    }
    let walls = session.place_patterns(rng, &wall_patterns(), &PlacementTargets::walls(layout));

    let chance = layout.explosive_crate_chance.clamp(0.0, 1.0);
    let mut obstacles = Vec::with_capacity(crates.tiles + walls.tiles);
    for cell in crates.cells().chain(walls.cells()) {
        let (kind, health, explosive) = match cell.orientation {
            None => (ObstacleKind::Crate, layout.crate_health, rng.random_bool(chance)),
            Some(o) => (ObstacleKind::Wall(o), layout.wall_health, false),
        };
        let position = cell_center(cell.x, cell.y, world.tile_size);
        match Obstacle::new(
            *next_id,
            kind,
            position,
            world.tile_size,
            layout.wall_thickness,
            health,
            explosive,
        ) {
            Ok(obstacle) => {
                obstacles.push(obstacle);
                *next_id = next_id.wrapping_add(1);
            },
            Err(e) => tracing::warn!(error = %e, "Skipped invalid obstacle"),
        }
    }
    tracing::debug!(
        crates = crates.tiles,
        walls = walls.tiles,
        "Generated arena layout"
    );
    obstacles
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn targets(min: usize, max: usize) -> PlacementTargets {
        PlacementTargets {
            min_tiles: min,
            max_tiles: max,
            max_arrangement_attempts: 50,
            max_placement_attempts: 50,
            large_pattern_cells: 4,
        }
    }

    fn assert_no_overlap(report: &LayoutReport) {
        let mut seen = HashSet::new();
        for c in report.cells() {
            assert!(seen.insert((c.x, c.y)), "cell ({}, {}) placed twice", c.x, c.y);
        }
    }

    #[test]
    fn reaches_target_on_open_grid() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut session = LayoutSession::new(32, 18);
        let report = session.place_patterns(&mut rng, &crate_patterns(), &targets(12, 22));
        assert!(report.tiles >= 12 && report.tiles <= 22, "tiles = {}", report.tiles);
        assert_no_overlap(&report);
    }

    #[test]
    fn deterministic_for_seed() {
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut session = LayoutSession::new(32, 18);
            session.place_patterns(&mut rng, &crate_patterns(), &targets(12, 22))
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn never_exceeds_max() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut session = LayoutSession::new(32, 18);
        let report = session.place_patterns(&mut rng, &crate_patterns(), &targets(5, 5));
        assert!(report.tiles <= 5);
    }

    #[test]
    fn pattern_is_atomic_near_edge() {
        let session = LayoutSession::new(4, 4);
        let line = Pattern::plain("line", &[(0, 0), (1, 0), (2, 0), (3, 0)]);
        assert!(session.fits(&line, (0, 0)));
        assert!(!session.fits(&line, (1, 0)), "partial placement must be refused");
    }

    #[test]
    fn crowded_grid_soft_fails() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut session = LayoutSession::new(3, 3);
        session.reserve_around((1, 1), 1);
        let report = session.place_patterns(&mut rng, &crate_patterns(), &targets(4, 8));
        assert_eq!(report.tiles, 0);
        assert!(report.placements.is_empty());
        assert_eq!(report.attempts, 50);
    }

    #[test]
    fn oriented_cells_claim_both_keys() {
        let mut session = LayoutSession::new(8, 8);
        let wall = Pattern::oriented("short_h", &[(0, 0, WallOrientation::Horizontal)]);
        session.stamp(&wall, (2, 2));
        assert!(session.is_occupied(&CellKey::plain(2, 2)));
        assert!(session.is_occupied(&CellKey {
            x: 2,
            y: 2,
            orientation: Some(WallOrientation::Horizontal),
        }));
        let crossing = Pattern::oriented("v", &[(0, 0, WallOrientation::Vertical)]);
        assert!(!session.fits(&crossing, (2, 2)));
    }

    #[test]
    fn cell_center_is_mid_tile() {
        assert_eq!(cell_center(0, 0, 40.0), Vec2::new(20.0, 20.0));
        assert_eq!(cell_center(3, 2, 40.0), Vec2::new(140.0, 100.0));
        assert_eq!(world_to_cell(Vec2::new(140.0, 100.0), 40.0), (3, 2));
    }

    #[test]
    fn generated_obstacles_keep_spawns_clear() {
        let config = ArenaConfig::default();
        let mut rng = StdRng::seed_from_u64(99);
        let mut next_id = 10;
        let obstacles = generate_obstacles(&mut rng, &config, &mut next_id);
        assert!(!obstacles.is_empty());
        assert_eq!(next_id, 10 + obstacles.len() as u32);
        let half = config.player.half_size();
        for spawn in spawn_points(&config) {
            assert!(obstacles.iter().all(|o| !o.overlaps_square(spawn, half)));
        }
        for o in &obstacles {
            if let ObstacleKind::Wall(_) = o.kind {
                assert!(!o.explosive);
                assert_eq!(o.health, config.layout.wall_health);
            }
        }
    }

    #[test]
    fn default_spawns_sit_at_fractions() {
        let [one, two] = spawn_points(&ArenaConfig::default());
        assert!((one - Vec2::new(192.0, 360.0)).length() < 1e-3);
        assert!((two - Vec2::new(1088.0, 360.0)).length() < 1e-3);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn placements_respect_exclusion_and_budget(seed in 0u64..500) {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut session = LayoutSession::new(32, 18);
                let spawns = [(4, 9), (27, 9)];
                for s in spawns {
                    session.reserve_around(s, 2);
                }
                let crate_report =
                    session.place_patterns(&mut rng, &crate_patterns(), &targets(12, 22));
                for s in spawns {
                    session.reserve_around(s, 3);
                }
                let wall_report =
                    session.place_patterns(&mut rng, &wall_patterns(), &targets(8, 16));

                let mut seen = HashSet::new();
                for c in crate_report.cells().chain(wall_report.cells()) {
                    prop_assert!(seen.insert((c.x, c.y)), "overlap at ({}, {})", c.x, c.y);
                    for s in spawns {
                        let near_crate = (c.x - s.0).abs() <= 2 && (c.y - s.1).abs() <= 2;
                        prop_assert!(!near_crate, "cell ({}, {}) inside spawn zone", c.x, c.y);
                    }
                }
                for c in wall_report.cells() {
                    for s in spawns {
                        let near = (c.x - s.0).abs() <= 3 && (c.y - s.1).abs() <= 3;
                        prop_assert!(!near, "wall ({}, {}) inside spawn zone", c.x, c.y);
                    }
                    prop_assert!(c.orientation.is_some());
                }
                prop_assert!(crate_report.tiles <= 22);
                prop_assert!(wall_report.tiles <= 16);
                if crate_report.tiles >= 12 {
                    prop_assert!(crate_report.tiles <= 22);
                }
            }
        }
    }
}

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use smallvec::SmallVec;

use crate::obstacle::{Obstacle, ObstacleKind, WallOrientation};
use crate::projectile::Axis;

/// Wrap an angle into [-π, π].
pub fn wrap_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a > PI {
        a -= TAU;
    } else if a < -PI {
        a += TAU;
    }
    a
}

pub fn within_radius_sq(a: Vec2, b: Vec2, radius: f32) -> bool {
    a.distance_squared(b) <= radius * radius
}

/// Circle-vs-axis-aligned-square overlap.
pub fn circle_overlaps_square(center: Vec2, radius: f32, box_center: Vec2, half: f32) -> bool {
    let extent = Vec2::splat(half);
    let closest = center.clamp(box_center - extent, box_center + extent);
    closest.distance_squared(center) <= radius * radius
}

/// Radius inside which a melee swing can reach any part of a target hitbox.
pub fn melee_broad_phase_radius(melee_range: f32, player_half: f32, diagonal_buffer: f32) -> f32 {
    melee_range + player_half + diagonal_buffer
}

/// Keep only candidates whose position lies within `radius` of `center`.
pub fn broad_phase<T, I>(center: Vec2, radius: f32, candidates: I) -> SmallVec<[T; 8]>
where
    I: IntoIterator<Item = (T, Vec2)>,
{
    candidates
        .into_iter()
        .filter(|(_, pos)| within_radius_sq(center, *pos, radius))
        .map(|(item, _)| item)
        .collect()
}

/// Indices of live obstacles that might touch a circle, by squared distance.
pub fn obstacles_near(center: Vec2, radius: f32, obstacles: &[Obstacle]) -> SmallVec<[usize; 8]> {
    broad_phase(
        center,
        radius,
        obstacles
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_active())
            .map(|(i, o)| (i, o.position)),
    )
}

/// Angular swing region anchored at the attacker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeleeCone {
    pub apex: Vec2,
    /// Facing angle in radians.
    pub facing: f32,
    pub half_arc: f32,
    pub radius: f32,
}

impl MeleeCone {
    pub fn contains(&self, point: Vec2) -> bool {
        let offset = point - self.apex;
        if offset.length_squared() > self.radius * self.radius {
            return false;
        }
        if offset == Vec2::ZERO {
            return true;
        }
        let angle = offset.y.atan2(offset.x);
        wrap_angle(angle - self.facing).abs() <= self.half_arc
    }

    /// Sample a `resolution`×`resolution` grid over a square box; any sample inside counts.
    pub fn hits_box(&self, center: Vec2, half: f32, resolution: u32) -> bool {
        if resolution <= 1 {
            return self.contains(center);
        }
        let steps = (resolution - 1) as f32;
        (0..resolution).any(|i| {
            let x = center.x - half + 2.0 * half * i as f32 / steps;
            (0..resolution).any(|j| {
                let y = center.y - half + 2.0 * half * j as f32 / steps;
                self.contains(Vec2::new(x, y))
            })
        })
    }

    /// First candidate, in iteration order, whose box the cone touches.
    pub fn first_hit<T, I>(&self, candidates: I, resolution: u32) -> Option<T>
    where
        I: IntoIterator<Item = (T, Vec2, f32)>,
    {
        candidates
            .into_iter()
            .find(|(_, center, half)| self.hits_box(*center, *half, resolution))
            .map(|(item, _, _)| item)
    }
}

/// Impulse pushing `target` away from `source`.
pub fn knockback(source: Vec2, target: Vec2, force: f32) -> Vec2 {
    (target - source).normalize_or_zero() * force
}

/// Damage multiplier at `distance` from a blast, or `None` out of range.
pub fn explosion_falloff(distance: f32, radius: f32, min_multiplier: f32) -> Option<f32> {
    if !distance.is_finite() || radius <= 0.0 || distance > radius {
        return None;
    }
    Some((1.0 - distance / radius).max(min_multiplier))
}

pub fn explosion_damage(base: f32, distance: f32, radius: f32, min_multiplier: f32) -> f32 {
    explosion_falloff(distance, radius, min_multiplier)
        .map(|m| (base * m).floor())
        .unwrap_or(0.0)
}

/// One target caught in a blast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlastHit<T> {
    pub target: T,
    pub damage: f32,
    pub knockback: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blast {
    pub center: Vec2,
    pub radius: f32,
    pub base_damage: f32,
    pub knockback_force: f32,
    pub min_multiplier: f32,
}

impl Blast {
    /// Everything in range except `exclude`, with falloff damage and outward knockback.
    pub fn resolve<T, I>(&self, exclude: Option<T>, targets: I) -> Vec<BlastHit<T>>
    where
        T: Copy + PartialEq,
        I: IntoIterator<Item = (T, Vec2)>,
    {
        targets
            .into_iter()
            .filter(|(t, _)| exclude != Some(*t))
            .filter_map(|(target, pos)| {
                let distance = pos.distance(self.center);
                let multiplier = explosion_falloff(distance, self.radius, self.min_multiplier)?;
                Some(BlastHit {
                    target,
                    damage: (self.base_damage * multiplier).floor(),
                    knockback: knockback(self.center, pos, self.knockback_force * multiplier),
                })
            })
            .collect()
    }
}

/// How a projectile leaves an obstacle it bounced off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleContact {
    /// Velocity component to flip.
    pub axis: Axis,
    /// Displacement that puts the projectile just outside the box.
    pub nudge: Vec2,
}

/// Contact axis and push-out for a projectile of radius `size` touching `obstacle`.
pub fn obstacle_contact(
    obstacle: &Obstacle,
    position: Vec2,
    size: f32,
    nudge: f32,
) -> ObstacleContact {
    let d = position - obstacle.position;
    let axis = match obstacle.kind {
        ObstacleKind::Wall(WallOrientation::Horizontal) => Axis::Y,
        ObstacleKind::Wall(WallOrientation::Vertical) => Axis::X,
        ObstacleKind::Crate => {
            if d.x.abs() > d.y.abs() {
                Axis::X
            } else {
                Axis::Y
            }
        },
    };
    let offset = match axis {
        Axis::X => {
            let reach = obstacle.half_extents.x + size + nudge;
            let target = obstacle.position.x + d.x.signum() * reach;
            Vec2::new(target - position.x, 0.0)
        },
        Axis::Y => {
            let reach = obstacle.half_extents.y + size + nudge;
            let target = obstacle.position.y + d.y.signum() * reach;
            Vec2::new(0.0, target - position.y)
        },
    };
    ObstacleContact { axis, nudge: offset }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_3;

    use super::*;

    fn cone(facing: f32) -> MeleeCone {
        MeleeCone {
            apex: Vec2::ZERO,
            facing,
            half_arc: FRAC_PI_3,
            radius: 60.0,
        }
    }

    #[test]
    fn wrap_angle_range() {
        let wrapped = wrap_angle(3.0 * PI);
        assert!((wrapped - PI).abs() < 1e-5 || (wrapped + PI).abs() < 1e-5);
        assert!((wrap_angle(-PI / 2.0 - TAU) + PI / 2.0).abs() < 1e-5);
        assert_eq!(wrap_angle(0.5), 0.5);
    }

    #[test]
    fn cone_contains_point_on_bisector_at_radius() {
        assert!(cone(0.0).contains(Vec2::new(60.0, 0.0)));
        assert!(!cone(0.0).contains(Vec2::new(60.1, 0.0)));
    }

    #[test]
    fn cone_rejects_points_behind() {
        let c = cone(0.0);
        assert!(!c.contains(Vec2::new(-10.0, 0.0)));
        // 90 degrees off the facing is outside a 60 degree half-arc.
        assert!(!c.contains(Vec2::new(0.0, 30.0)));
    }

    #[test]
    fn cone_handles_wraparound_facing() {
        let c = cone(PI - 0.1);
        assert!(c.contains(Vec2::new(-40.0, -5.0)));
    }

    #[test]
    fn box_on_bisector_at_radius_is_hit() {
        assert!(cone(0.0).hits_box(Vec2::new(60.0, 0.0), 16.0, 7));
    }

    #[test]
    fn box_partially_in_cone_is_hit() {
        // Centre just beyond reach, near corner still inside.
        assert!(cone(0.0).hits_box(Vec2::new(70.0, 0.0), 16.0, 7));
    }

    #[test]
    fn box_outside_arc_never_hit() {
        assert!(!cone(0.0).hits_box(Vec2::new(-50.0, 0.0), 16.0, 7));
        assert!(!cone(0.0).hits_box(Vec2::new(0.0, 50.0), 10.0, 7));
    }

    #[test]
    fn first_hit_follows_iteration_order() {
        let c = cone(0.0);
        let candidates = [
            ("behind", Vec2::new(-40.0, 0.0), 16.0),
            ("front", Vec2::new(40.0, 0.0), 16.0),
            ("also_front", Vec2::new(30.0, 5.0), 16.0),
        ];
        assert_eq!(c.first_hit(candidates, 7), Some("front"));
    }

    #[test]
    fn broad_phase_filters_by_distance() {
        let near = broad_phase(
            Vec2::ZERO,
            84.0,
            [(1, Vec2::new(80.0, 0.0)), (2, Vec2::new(90.0, 0.0))],
        );
        assert_eq!(near.as_slice(), &[1]);
        assert_eq!(melee_broad_phase_radius(60.0, 16.0, 8.0), 84.0);
    }

    #[test]
    fn circle_square_overlap() {
        assert!(circle_overlaps_square(Vec2::new(20.0, 0.0), 5.0, Vec2::ZERO, 16.0));
        assert!(!circle_overlaps_square(Vec2::new(22.0, 0.0), 5.0, Vec2::ZERO, 16.0));
        // Corner distance is Euclidean.
        assert!(!circle_overlaps_square(Vec2::new(20.0, 20.0), 5.0, Vec2::ZERO, 16.0));
    }

    #[test]
    fn knockback_points_away() {
        let k = knockback(Vec2::ZERO, Vec2::new(0.0, 10.0), 350.0);
        assert!((k - Vec2::new(0.0, 350.0)).length() < 1e-3);
        assert_eq!(knockback(Vec2::ONE, Vec2::ONE, 350.0), Vec2::ZERO);
    }

    #[test]
    fn explosion_damage_formula() {
        assert_eq!(explosion_damage(25.0, 0.0, 70.0, 0.3), 25.0);
        // At the rim the floor multiplier applies.
        assert_eq!(explosion_damage(25.0, 70.0, 70.0, 0.3), 7.0);
        assert_eq!(explosion_damage(25.0, 70.5, 70.0, 0.3), 0.0);
        assert_eq!(explosion_damage(20.0, 25.0, 50.0, 0.3), 10.0);
    }

    #[test]
    fn blast_excludes_owner() {
        let blast = Blast {
            center: Vec2::ZERO,
            radius: 50.0,
            base_damage: 10.0,
            knockback_force: 300.0,
            min_multiplier: 0.3,
        };
        let hits = blast.resolve(
            Some('a'),
            [('a', Vec2::new(1.0, 0.0)), ('b', Vec2::new(10.0, 0.0)), ('c', Vec2::new(100.0, 0.0))],
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, 'b');
        assert_eq!(hits[0].damage, 8.0);
        assert!(hits[0].knockback.x > 0.0);
    }

    #[test]
    fn crate_contact_uses_dominant_axis() {
        let obstacle =
            Obstacle::new(1, ObstacleKind::Crate, Vec2::new(100.0, 100.0), 40.0, 0.4, 30.0, false)
                .unwrap();
        let side = obstacle_contact(&obstacle, Vec2::new(78.0, 104.0), 5.0, 2.0);
        assert_eq!(side.axis, Axis::X);
        assert_eq!(side.nudge, Vec2::new(100.0 - 27.0 - 78.0, 0.0));
        let top = obstacle_contact(&obstacle, Vec2::new(102.0, 122.0), 5.0, 2.0);
        assert_eq!(top.axis, Axis::Y);
    }

    #[test]
    fn wall_contact_axis_follows_orientation() {
        let h = Obstacle::new(
            1,
            ObstacleKind::Wall(WallOrientation::Horizontal),
            Vec2::new(100.0, 100.0),
            40.0,
            0.4,
            60.0,
            false,
        )
        .unwrap();
        // Even when hitting near the end, a horizontal wall flips vertical velocity.
        assert_eq!(obstacle_contact(&h, Vec2::new(120.0, 95.0), 5.0, 2.0).axis, Axis::Y);
        let v = Obstacle::new(
            2,
            ObstacleKind::Wall(WallOrientation::Vertical),
            Vec2::new(100.0, 100.0),
            40.0,
            0.4,
            60.0,
            false,
        )
        .unwrap();
        assert_eq!(obstacle_contact(&v, Vec2::new(95.0, 120.0), 5.0, 2.0).axis, Axis::X);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn blast_damage_bounded(base in 1.0f32..200.0, d in 0.0f32..200.0, r in 1.0f32..150.0) {
                let dmg = explosion_damage(base, d, r, 0.3);
                prop_assert!(dmg <= base);
                if d > r {
                    prop_assert_eq!(dmg, 0.0);
                } else {
                    prop_assert!(dmg >= (base * 0.3).floor());
                }
            }

            #[test]
            fn cone_never_reaches_behind(
                facing in -PI..PI,
                dist in 1.0f32..60.0,
                off in 0.1f32..1.0,
            ) {
                let c = cone(facing);
                // Angles past the half-arc, up to directly behind.
                let angle = facing + FRAC_PI_3 + off * (PI - FRAC_PI_3 - 0.01);
                let point = Vec2::from_angle(angle) * dist;
                prop_assert!(!c.contains(point));
            }
        }
    }
}

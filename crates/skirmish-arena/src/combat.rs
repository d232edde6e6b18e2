use std::collections::VecDeque;

use glam::Vec2;
use smallvec::SmallVec;

use skirmish_core::player::PlayerSlot;

use crate::SkirmishMatch;
use crate::collision::{
    Blast, MeleeCone, broad_phase, circle_overlaps_square, knockback, melee_broad_phase_radius,
    obstacle_contact, obstacles_near, within_radius_sq,
};
use crate::events::{DamageSource, SkirmishEvent, TargetId};
use crate::player::{PlayerInput, move_with_collision};
use crate::projectile::{HitOutcome, TickOutcome};
use crate::stats::{DamageOutcome, resolve_incoming};

/// Longest slice of time one combat step simulates; longer frames are truncated.
pub const MAX_COMBAT_STEP: f32 = 0.1;

/// An explosion waiting to be resolved this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingBlast {
    center: Vec2,
    radius: f32,
    damage: f32,
    /// Blaster excluded from the damage; `None` for crates.
    owner: Option<PlayerSlot>,
}

/// Scratch state for one combat step.
#[derive(Debug, Default)]
pub(crate) struct TickContext {
    pub events: Vec<SkirmishEvent>,
    /// Seats that died this tick, in order.
    pub deaths: SmallVec<[PlayerSlot; 2]>,
    blasts: VecDeque<PendingBlast>,
}

impl SkirmishMatch {
    /// Players, then projectiles, then queued explosions, then the sweep.
    pub(crate) fn step_combat(&mut self, dt: f32, ctx: &mut TickContext) {
        let dt = dt.min(MAX_COMBAT_STEP);
        for slot in PlayerSlot::ALL {
            let input = self.pending_inputs.remove(&slot).unwrap_or_default();
            self.update_player(slot, &input, dt, ctx);
        }
        self.update_projectiles(dt, ctx);
        self.resolve_blasts(ctx);
        self.state.projectiles.sweep();
    }

    fn update_player(
        &mut self,
        slot: PlayerSlot,
        input: &PlayerInput,
        dt: f32,
        ctx: &mut TickContext,
    ) {
        let i = slot.index();
        let config = &self.config.player;
        let bounds = self.bounds();
        {
            let stats = &mut self.state.stats[i];
            let player = &mut self.state.players[i];
            if !player.alive {
                return;
            }
            player.tick_timers(dt, stats, config);

            let before = stats.health.floor();
            stats.regenerate(dt);
            if stats.health.floor() > before {
                ctx.events.push(SkirmishEvent::HealthChanged {
                    slot,
                    health: stats.health,
                    max_health: stats.max_health,
                });
            }

            let movement = input.movement(config.deadzone);
            if let Some(aim) = input.aim(config.deadzone) {
                player.facing = aim.y.atan2(aim.x);
            } else if movement != Vec2::ZERO {
                player.facing = movement.y.atan2(movement.x);
            }

            if input.dash
                && let Some(direction) = player.try_dash(movement, stats, config)
            {
                ctx.events.push(SkirmishEvent::PlayerDashed {
                    slot,
                    position: player.position,
                    direction,
                });
            }

            let velocity = player.drive_velocity(movement, stats, config) + player.knockback;
            player.decay_knockback(dt, config.knockback_damping);
            let next = move_with_collision(
                player.position,
                velocity * dt,
                config.half_size(),
                &self.state.obstacles,
                &bounds,
                player.is_invulnerable(stats),
            );
            if next.is_finite() {
                player.position = next;
            } else {
                tracing::warn!(%slot, "Player movement became non-finite, holding position");
                player.knockback = Vec2::ZERO;
            }
        }

        if input.melee {
            self.melee(slot, ctx);
        }
        if input.fire {
            self.fire(slot, ctx);
        }
    }

    /// Fire a volley of `1 + bullet_count` bullets fanned around the facing.
    fn fire(&mut self, slot: PlayerSlot, ctx: &mut TickContext) {
        let i = slot.index();
        let stats = &self.state.stats[i];
        let player = &mut self.state.players[i];
        if !player.try_consume_shot(stats) {
            return;
        }
        let count = 1 + stats.bullet_count;
        let centre = (count - 1) as f32 / 2.0;
        let half = self.config.player.half_size();
        for k in 0..count {
            let angle = player.facing + (k as f32 - centre) * self.config.player.multi_shot_spread;
            let direction = Vec2::from_angle(angle);
            let origin = player.position + direction * half;
            let index = self.state.projectiles.spawn(
                origin,
                direction,
                slot,
                stats,
                &self.config.projectile,
            );
            if let Some(p) = self.state.projectiles.get(index) {
                ctx.events.push(SkirmishEvent::BulletFired {
                    owner: slot,
                    projectile: p.serial,
                    position: origin,
                    angle,
                });
            }
        }
    }

    /// Swing: hit the enemy if the cone reaches its box, and bat back enemy bullets.
    fn melee(&mut self, slot: PlayerSlot, ctx: &mut TickContext) {
        let i = slot.index();
        if !self.state.players[i].try_melee(&self.config.player) {
            return;
        }
        let apex = self.state.players[i].position;
        let facing = self.state.players[i].facing;
        let (range, damage) = {
            let stats = &self.state.stats[i];
            (stats.melee_range, stats.outgoing_damage(stats.melee_damage))
        };
        let melee = &self.config.melee;
        let half = self.config.player.half_size();
        let cone = MeleeCone {
            apex,
            facing,
            half_arc: melee.half_arc,
            radius: range,
        };
        ctx.events.push(SkirmishEvent::MeleeAttack {
            attacker: slot,
            position: apex,
            angle: facing,
        });

        let reach = melee_broad_phase_radius(range, half, melee.diagonal_buffer);
        let candidates = broad_phase(
            apex,
            reach,
            PlayerSlot::ALL
                .into_iter()
                .filter(|&s| s != slot)
                .filter(|&s| {
                    let p = &self.state.players[s.index()];
                    p.alive && !p.is_invulnerable(&self.state.stats[s.index()])
                })
                .map(|s| (s, self.state.players[s.index()].position)),
        );
        let hit = cone.first_hit(
            candidates
                .iter()
                .map(|&s| (s, self.state.players[s.index()].position, half)),
            melee.sample_resolution,
        );
        if let Some(target) = hit {
            let target_state = &mut self.state.players[target.index()];
            let push = knockback(apex, target_state.position, melee.knockback_force);
            target_state.knockback += push;
            ctx.events.push(SkirmishEvent::MeleeHit {
                attacker: slot,
                target,
                damage,
                knockback: push,
            });
            self.damage_player(
                target,
                damage,
                DamageSource::Melee { attacker: slot },
                Some(slot),
                ctx,
            );
        }

        let reflect_speed = self.config.melee.reflect_speed;
        let active: SmallVec<[usize; 16]> =
            self.state.projectiles.active_slots().iter().copied().collect();
        for index in active {
            let Some(p) = self.state.projectiles.get_mut(index) else {
                continue;
            };
            if p.destroyed
                || p.owner == slot
                || !within_radius_sq(apex, p.position, range + p.size)
                || !cone.contains(p.position)
            {
                continue;
            }
            p.reflect(slot, facing, reflect_speed);
            ctx.events.push(SkirmishEvent::BulletReflected {
                by: slot,
                projectile: p.serial,
                position: p.position,
                angle: facing,
            });
        }
    }

    fn update_projectiles(&mut self, dt: f32, ctx: &mut TickContext) {
        let bounds = self.bounds();
        let active: SmallVec<[usize; 16]> =
            self.state.projectiles.active_slots().iter().copied().collect();
        for index in active {
            let Some(owner) = self
                .state
                .projectiles
                .get(index)
                .filter(|p| p.is_active())
                .map(|p| p.owner)
            else {
                continue;
            };
            let enemy = &self.state.players[owner.other().index()];
            let homing_target = enemy.alive.then_some(enemy.position);
            let Some(p) = self.state.projectiles.get_mut(index) else {
                continue;
            };
            let outcome = p.tick(dt, &bounds, homing_target, &self.config.projectile);
            match outcome {
                TickOutcome::Expired | TickOutcome::Exited => {
                    let (position, damage) = (p.position, p.damage);
                    let dealt = self.state.stats[owner.index()].outgoing_damage(damage);
                    self.queue_bullet_blast(owner, position, dealt, ctx);
                    continue;
                },
                TickOutcome::Inactive | TickOutcome::Faulted => continue,
                TickOutcome::Moving | TickOutcome::Rebounded => {},
            }
            self.projectile_vs_player(index, ctx);
            self.projectile_vs_obstacles(index, ctx);
        }
    }

    fn projectile_vs_player(&mut self, index: usize, ctx: &mut TickContext) {
        let half = self.config.player.half_size();
        let Some(p) = self.state.projectiles.get_mut(index) else {
            return;
        };
        let owner = p.owner;
        let target = owner.other();
        let ti = target.index();
        let body = &self.state.players[ti];
        if p.destroyed
            || !body.alive
            || body.is_invulnerable(&self.state.stats[ti])
            || !circle_overlaps_square(p.position, p.size, body.position, half)
        {
            return;
        }
        let outcome = p.on_hit(TargetId::Player(target));
        if !outcome.counted() {
            return;
        }
        let dealt = self.state.stats[owner.index()].outgoing_damage(p.damage);
        let (serial, position) = (p.serial, p.position);
        ctx.events.push(SkirmishEvent::BulletHit {
            owner,
            projectile: serial,
            target: TargetId::Player(target),
            position,
            damage: dealt,
        });
        self.damage_player(target, dealt, DamageSource::Bullet { owner }, Some(owner), ctx);
        if outcome == HitOutcome::Destroyed {
            self.queue_bullet_blast(owner, position, dealt, ctx);
        }
    }

    fn projectile_vs_obstacles(&mut self, index: usize, ctx: &mut TickContext) {
        let tile = self.config.world.tile_size;
        let nudge = self.config.projectile.obstacle_nudge;
        let Some((position, size)) = self
            .state
            .projectiles
            .get(index)
            .filter(|p| p.is_active())
            .map(|p| (p.position, p.size))
        else {
            return;
        };

        for oi in obstacles_near(position, size + tile, &self.state.obstacles) {
            let Some(p) = self.state.projectiles.get_mut(index) else {
                return;
            };
            if p.destroyed {
                return;
            }
            let obstacle = &self.state.obstacles[oi];
            let target = TargetId::Obstacle(obstacle.id);
            if !obstacle.is_active()
                || p.has_struck(target)
                || !obstacle.overlaps_circle(p.position, p.size)
            {
                continue;
            }
            let owner = p.owner;
            let dealt = self.state.stats[owner.index()].outgoing_damage(p.damage);
            let bounced = p.can_rebound();
            let outcome = if bounced {
                let contact = obstacle_contact(obstacle, p.position, p.size, nudge);
                p.mark_struck(target);
                p.bounce_axis(contact.axis, contact.nudge);
                HitOutcome::Pierced
            } else {
                p.on_hit(target)
            };
            let (serial, hit_at) = (p.serial, p.position);
            ctx.events.push(SkirmishEvent::BulletHit {
                owner,
                projectile: serial,
                target,
                position: hit_at,
                damage: dealt,
            });
            self.damage_obstacle(oi, dealt, ctx);
            if outcome == HitOutcome::Destroyed {
                self.queue_bullet_blast(owner, hit_at, dealt, ctx);
                return;
            }
            if bounced {
                return;
            }
        }
    }

    /// Explosive rounds blow up whenever they are spent, scaled by the owner's current stacks.
    fn queue_bullet_blast(
        &self,
        owner: PlayerSlot,
        center: Vec2,
        damage: f32,
        ctx: &mut TickContext,
    ) {
        let stacks = self.state.stats[owner.index()].explosive;
        if stacks == 0 {
            return;
        }
        let e = &self.config.explosion;
        let extra = (stacks - 1) as f32;
        ctx.blasts.push_back(PendingBlast {
            center,
            radius: e.base_radius + e.radius_per_stack * extra,
            damage: damage * (e.damage_fraction + e.damage_fraction_per_stack * extra),
            owner: Some(owner),
        });
    }

    fn damage_obstacle(&mut self, index: usize, amount: f32, ctx: &mut TickContext) {
        let Some(obstacle) = self.state.obstacles.get_mut(index) else {
            return;
        };
        if !obstacle.apply_damage(amount) {
            return;
        }
        ctx.events.push(SkirmishEvent::ObstacleDestroyed {
            obstacle: obstacle.id,
            position: obstacle.position,
            explosive: obstacle.explosive,
        });
        if obstacle.explosive {
            ctx.blasts.push_back(PendingBlast {
                center: obstacle.position,
                radius: self.config.explosion.crate_radius,
                damage: self.config.explosion.crate_damage,
                owner: None,
            });
        }
    }

    /// Drain the blast queue. Crate chains enqueue further blasts as they go.
    fn resolve_blasts(&mut self, ctx: &mut TickContext) {
        let limit = self.config.explosion.max_chain;
        let mut resolved = 0;
        while let Some(pending) = ctx.blasts.pop_front() {
            if resolved >= limit {
                tracing::warn!(
                    dropped = ctx.blasts.len() + 1,
                    "Explosion chain limit reached"
                );
                ctx.blasts.clear();
                break;
            }
            resolved += 1;

            ctx.events.push(SkirmishEvent::Explosion {
                position: pending.center,
                radius: pending.radius,
                owner: pending.owner,
            });
            let blast = Blast {
                center: pending.center,
                radius: pending.radius,
                base_damage: pending.damage,
                knockback_force: self.config.explosion.knockback_force,
                min_multiplier: self.config.explosion.min_multiplier,
            };

            let bodies: SmallVec<[(PlayerSlot, Vec2); 2]> = PlayerSlot::ALL
                .into_iter()
                .filter(|&s| {
                    let p = &self.state.players[s.index()];
                    p.alive && !p.is_invulnerable(&self.state.stats[s.index()])
                })
                .map(|s| (s, self.state.players[s.index()].position))
                .collect();
            for hit in blast.resolve(pending.owner, bodies) {
                self.state.players[hit.target.index()].knockback += hit.knockback;
                self.damage_player(
                    hit.target,
                    hit.damage,
                    DamageSource::Explosion {
                        owner: pending.owner,
                    },
                    pending.owner,
                    ctx,
                );
            }

            let boxes: Vec<(usize, Vec2)> = self
                .state
                .obstacles
                .iter()
                .enumerate()
                .filter(|(_, o)| o.is_active())
                .map(|(i, o)| (i, o.position))
                .collect();
            for hit in blast.resolve(None, boxes) {
                self.damage_obstacle(hit.target, hit.damage, ctx);
            }
        }
    }

    /// Route one hit through shield and damage reduction, then vampirism and death.
    pub(crate) fn damage_player(
        &mut self,
        target: PlayerSlot,
        raw: f32,
        source: DamageSource,
        attacker: Option<PlayerSlot>,
        ctx: &mut TickContext,
    ) {
        let ti = target.index();
        if self.state.players[ti].is_invulnerable(&self.state.stats[ti]) {
            return;
        }
        let outcome = {
            let stats = &mut self.state.stats[ti];
            let player = &mut self.state.players[ti];
            resolve_incoming(stats, &mut player.shield, raw)
        };
        let position = self.state.players[ti].position;
        match outcome {
            DamageOutcome::Ignored => {},
            DamageOutcome::Blocked => {
                ctx.events.push(SkirmishEvent::ShieldBlocked {
                    slot: target,
                    position,
                });
            },
            DamageOutcome::Damaged { amount, died } => {
                let stats = &self.state.stats[ti];
                ctx.events.push(SkirmishEvent::PlayerDamaged {
                    slot: target,
                    amount,
                    source,
                });
                ctx.events.push(SkirmishEvent::HealthChanged {
                    slot: target,
                    health: stats.health,
                    max_health: stats.max_health,
                });

                if let Some(a) = attacker.filter(|&a| a != target) {
                    let fraction = self.config.player.vampirism_fraction;
                    let thief = &mut self.state.stats[a.index()];
                    let healed = thief.heal(amount * fraction * thief.vampirism as f32);
                    if healed > 0.0 {
                        ctx.events.push(SkirmishEvent::HealthChanged {
                            slot: a,
                            health: thief.health,
                            max_health: thief.max_health,
                        });
                    }
                }

                if died {
                    self.state.players[ti].alive = false;
                    ctx.events.push(SkirmishEvent::PlayerDied {
                        slot: target,
                        position,
                    });
                    ctx.deaths.push(target);
                }
            },
        }
    }
}

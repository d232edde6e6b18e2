pub mod collision;
pub mod combat;
pub mod config;
pub mod draft;
pub mod events;
pub mod layout;
pub mod obstacle;
pub mod player;
pub mod projectile;
pub mod round;
pub mod stats;
pub mod upgrades;

use std::collections::HashMap;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use skirmish_core::error::CoreError;
use skirmish_core::events::{EventBus, EventObserver, ObserverId};
use skirmish_core::game_trait::{GameMetadata, PlayerInputs, PlayerScore, Simulation};
use skirmish_core::player::{Player, PlayerSlot};
use skirmish_core::simulation_snapshot_boilerplate;

use combat::TickContext;
use config::ArenaConfig;
use draft::{Draft, DraftError, draw_pool};
use events::SkirmishEvent;
use layout::{generate_obstacles, spawn_points};
use obstacle::{Obstacle, ObstacleId};
use player::{PlayerInput, PlayerState};
use projectile::{ArenaBounds, Projectile, ProjectilePool};
use round::{MatchState, RoundManager, RoundTimer};
use stats::PlayerStats;
use upgrades::{UpgradeId, eligible_upgrades};

/// Snapshot-able state of a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkirmishState {
    /// Simulated seconds since the match started.
    pub elapsed: f32,
    pub rounds: RoundManager,
    pub players: [PlayerState; 2],
    pub stats: [PlayerStats; 2],
    pub obstacles: Vec<Obstacle>,
    pub next_obstacle_id: ObstacleId,
    pub projectiles: ProjectilePool,
    pub draft: Option<Draft>,
}

/// A local two-seat duel.
pub struct SkirmishMatch {
    state: SkirmishState,
    config: ArenaConfig,
    roster: Vec<Player>,
    pending_inputs: HashMap<PlayerSlot, PlayerInput>,
    rng: StdRng,
    observers: EventBus<SkirmishEvent>,
}

impl SkirmishMatch {
    pub fn new() -> Self {
        Self::with_config(ArenaConfig::load())
    }

    /// Create a match with explicit configuration. Invalid configs fall back to defaults.
    pub fn with_config(config: ArenaConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid arena config, using defaults");
                ArenaConfig::default()
            },
        };
        let mut rng = seeded_rng(config.seed);
        let state = fresh_state(&config, &mut rng);
        Self {
            state,
            config,
            roster: Vec::new(),
            pending_inputs: HashMap::new(),
            rng,
            observers: EventBus::new(),
        }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn state(&self) -> &SkirmishState {
        &self.state
    }

    pub fn match_state(&self) -> MatchState {
        self.state.rounds.state()
    }

    pub fn round(&self) -> u32 {
        self.state.rounds.round()
    }

    pub fn roster(&self) -> &[Player] {
        &self.roster
    }

    pub fn players(&self) -> &[PlayerState; 2] {
        &self.state.players
    }

    pub fn player(&self, slot: PlayerSlot) -> &PlayerState {
        &self.state.players[slot.index()]
    }

    pub fn stats(&self, slot: PlayerSlot) -> &PlayerStats {
        &self.state.stats[slot.index()]
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.state.obstacles
    }

    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.state.projectiles.iter_active().filter(|p| p.is_active())
    }

    /// The seat to pick and what it may take, while a draft is running.
    pub fn draft_options(&self) -> Option<(PlayerSlot, Vec<UpgradeId>)> {
        let draft = self.state.draft.as_ref()?;
        let picker = draft.current_picker()?;
        Some((picker, draft.options_for(&self.state.stats[picker.index()])))
    }

    pub fn bounds(&self) -> ArenaBounds {
        ArenaBounds {
            width: self.config.world.width,
            height: self.config.world.height,
        }
    }

    /// Register a presentation-side observer.
    pub fn subscribe(&mut self, observer: Box<dyn EventObserver<SkirmishEvent>>) -> ObserverId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Queue typed input for the next tick.
    pub fn set_input(&mut self, slot: PlayerSlot, mut input: PlayerInput) {
        if input.sanitize() {
            tracing::debug!(%slot, "Replaced non-finite input axes");
        }
        match self.pending_inputs.get_mut(&slot) {
            Some(existing) => existing.accumulate(&input),
            None => {
                self.pending_inputs.insert(slot, input);
            },
        }
    }

    /// Take an upgrade from the running draft on `slot`'s turn.
    pub fn choose_upgrade(
        &mut self,
        slot: PlayerSlot,
        upgrade: UpgradeId,
    ) -> Result<Vec<SkirmishEvent>, DraftError> {
        if self.match_state() != MatchState::RoundEnd {
            return Err(DraftError::NotDrafting);
        }
        let draft = self.state.draft.as_mut().ok_or(DraftError::NotDrafting)?;
        draft.choose(slot, upgrade, &self.state.stats[slot.index()])?;

        let mut events = Vec::new();
        self.grant_upgrade(slot, upgrade, &mut events);
        self.state.rounds.cancel_draft_turn();
        self.advance_draft(&mut events);
        self.observers.publish_all(&events);
        Ok(events)
    }

    /// Reset scores and stat blocks and start again from round one.
    pub fn restart_match(&mut self) -> Vec<SkirmishEvent> {
        self.rng = seeded_rng(self.config.seed);
        self.state = fresh_state(&self.config, &mut self.rng);
        self.pending_inputs.clear();
        let mut events = Vec::new();
        for slot in PlayerSlot::ALL {
            let i = slot.index();
            events.push(SkirmishEvent::PlayerRespawned {
                slot,
                position: self.state.players[i].position,
            });
            events.push(SkirmishEvent::HealthChanged {
                slot,
                health: self.state.stats[i].health,
                max_health: self.state.stats[i].max_health,
            });
        }
        events.push(SkirmishEvent::RoundStart { round: 1 });
        tracing::info!("Match restarted");
        self.observers.publish_all(&events);
        events
    }

    fn grant_upgrade(
        &mut self,
        slot: PlayerSlot,
        upgrade: UpgradeId,
        events: &mut Vec<SkirmishEvent>,
    ) {
        let stats = &mut self.state.stats[slot.index()];
        if stats.apply_upgrade(upgrade) {
            tracing::debug!(%slot, upgrade = upgrade.name(), "Upgrade taken");
            events.push(SkirmishEvent::UpgradeChosen { slot, upgrade });
        }
    }

    fn start_draft(&mut self, events: &mut Vec<SkirmishEvent>) {
        let Some(loser) = self.state.rounds.last_loser() else {
            self.begin_next_round(events);
            return;
        };
        let eligible = eligible_upgrades(&self.state.stats[loser.index()]);
        let pool = draw_pool(&mut self.rng, &eligible, self.config.round.draft_pool_size);
        events.push(SkirmishEvent::DraftStarted {
            picker: loser,
            offered: pool.clone(),
        });
        self.state.draft = Some(Draft::new(loser, pool));
        self.advance_draft(events);
    }

    /// Announce the next turn, skipping seats with nothing to take; finish when done.
    fn advance_draft(&mut self, events: &mut Vec<SkirmishEvent>) {
        loop {
            let Some(draft) = self.state.draft.as_mut() else {
                return;
            };
            let Some(picker) = draft.current_picker() else {
                self.begin_next_round(events);
                return;
            };
            let options = draft.options_for(&self.state.stats[picker.index()]);
            if options.is_empty() {
                tracing::debug!(%picker, "No eligible upgrades, skipping draft turn");
                draft.skip_turn();
                continue;
            }
            events.push(SkirmishEvent::DraftTurn { picker, options });
            self.state
                .rounds
                .schedule_draft_turn(self.config.round.draft_turn_secs);
            return;
        }
    }

    fn auto_pick(&mut self, events: &mut Vec<SkirmishEvent>) {
        let Some(draft) = self.state.draft.as_mut() else {
            return;
        };
        let Some(picker) = draft.current_picker() else {
            return;
        };
        let stats = &self.state.stats[picker.index()];
        match draft.auto_pick(stats) {
            Some(id) => {
                if draft.choose(picker, id, stats).is_ok() {
                    tracing::debug!(
                        %picker,
                        upgrade = id.name(),
                        "Draft turn timed out, auto-picked"
                    );
                    self.grant_upgrade(picker, id, events);
                }
            },
            None => draft.skip_turn(),
        }
        self.advance_draft(events);
    }

    /// Fresh arena, empty skies, both players back at their spawns.
    fn begin_next_round(&mut self, events: &mut Vec<SkirmishEvent>) {
        self.state.draft = None;
        self.state.obstacles = generate_obstacles(
            &mut self.rng,
            &self.config,
            &mut self.state.next_obstacle_id,
        );
        self.state.projectiles.clear();
        self.pending_inputs.clear();
        let spawns = spawn_points(&self.config);
        for slot in PlayerSlot::ALL {
            let i = slot.index();
            let stats = &mut self.state.stats[i];
            stats.restore_full();
            self.state.players[i].respawn(spawns[i], stats);
            events.push(SkirmishEvent::PlayerRespawned {
                slot,
                position: spawns[i],
            });
            events.push(SkirmishEvent::HealthChanged {
                slot,
                health: stats.health,
                max_health: stats.max_health,
            });
        }
        let round = self.state.rounds.begin_next_round();
        events.push(SkirmishEvent::RoundStart { round });
    }

    fn on_timer(&mut self, timer: RoundTimer, events: &mut Vec<SkirmishEvent>) {
        match timer {
            RoundTimer::VictoryPause => match self.state.rounds.finish_victory_pause() {
                Some(winner) => events.push(SkirmishEvent::MatchOver { winner }),
                None => self.start_draft(events),
            },
            RoundTimer::DraftTurn => self.auto_pick(events),
        }
    }

    /// The first death of the tick decides the round; later ones are ignored.
    fn end_round_if_dead(&mut self, deaths: &[PlayerSlot], events: &mut Vec<SkirmishEvent>) {
        let Some(&dead) = deaths.first() else {
            return;
        };
        if let Some(outcome) = self
            .state
            .rounds
            .end_round(dead, self.config.round.victory_pause_secs)
        {
            events.push(SkirmishEvent::ScoreChanged {
                slot: outcome.winner,
                score: outcome.winner_score,
            });
            events.push(SkirmishEvent::RoundEnd {
                round: outcome.round,
                winner: outcome.winner,
                loser: outcome.loser,
            });
        }
    }
}

impl Default for SkirmishMatch {
    fn default() -> Self {
        Self::new()
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn fresh_state(config: &ArenaConfig, rng: &mut StdRng) -> SkirmishState {
    let stats = [PlayerStats::default(), PlayerStats::default()];
    let spawns = spawn_points(config);
    let players = PlayerSlot::ALL
        .map(|slot| PlayerState::new(slot, spawns[slot.index()], &stats[slot.index()]));
    let mut next_obstacle_id = 0;
    let obstacles = generate_obstacles(rng, config, &mut next_obstacle_id);
    SkirmishState {
        elapsed: 0.0,
        rounds: RoundManager::new(config.round.win_target),
        players,
        stats,
        obstacles,
        next_obstacle_id,
        projectiles: ProjectilePool::with_capacity(config.projectile.initial_pool_capacity),
        draft: None,
    }
}

/// A roster must seat exactly one player in each slot.
fn validate_roster(players: &[Player]) -> Result<(), CoreError> {
    if players.len() != 2 {
        return Err(CoreError::InvalidRoster(format!(
            "expected 2 players, got {}",
            players.len()
        )));
    }
    for slot in PlayerSlot::ALL {
        if players.iter().filter(|p| p.slot == slot).count() != 1 {
            return Err(CoreError::InvalidRoster(format!(
                "slot {slot} must be filled exactly once"
            )));
        }
    }
    Ok(())
}

impl Simulation for SkirmishMatch {
    type Event = SkirmishEvent;

    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Skirmish".to_string(),
            description: "Two-player arena duel with drafted upgrades between rounds".to_string(),
            min_players: 2,
            max_players: 2,
            estimated_round_duration: Duration::from_secs(45),
        }
    }

    fn init(&mut self, players: &[Player]) -> Result<(), CoreError> {
        validate_roster(players)?;
        self.roster = players.to_vec();
        self.roster.sort_by_key(|p| p.slot);
        self.restart_match();
        Ok(())
    }

    fn update(&mut self, dt: f32, inputs: &PlayerInputs) -> Vec<SkirmishEvent> {
        if !dt.is_finite() || dt < 0.0 {
            tracing::debug!(dt, "Ignored non-finite frame time");
            return Vec::new();
        }
        for (&slot, bytes) in &inputs.inputs {
            self.apply_input(slot, bytes);
        }

        let mut events = Vec::new();
        match self.state.rounds.state() {
            MatchState::Paused | MatchState::GameOver => return events,
            MatchState::Playing => {
                self.state.elapsed += dt;
                let mut ctx = TickContext::default();
                self.step_combat(dt, &mut ctx);
                events = std::mem::take(&mut ctx.events);
                self.end_round_if_dead(&ctx.deaths, &mut events);
            },
            MatchState::RoundEnd => {
                self.state.elapsed += dt;
                self.pending_inputs.clear();
                for timer in self.state.rounds.advance(dt) {
                    self.on_timer(timer, &mut events);
                }
            },
        }

        self.observers.publish_all(&events);
        events
    }

    simulation_snapshot_boilerplate!(state_type: SkirmishState);

    fn apply_input(&mut self, slot: PlayerSlot, input: &[u8]) {
        match rmp_serde::from_slice::<PlayerInput>(input) {
            Ok(decoded) => self.set_input(slot, decoded),
            Err(e) => tracing::debug!(%slot, error = %e, "Dropped malformed player input"),
        }
    }

    fn pause(&mut self) {
        if self.state.rounds.pause() {
            tracing::debug!("Match paused");
        }
    }

    fn resume(&mut self) {
        if self.state.rounds.resume() {
            tracing::debug!("Match resumed");
        }
    }

    fn is_paused(&self) -> bool {
        self.match_state() == MatchState::Paused
    }

    fn is_match_complete(&self) -> bool {
        self.match_state() == MatchState::GameOver
    }

    fn scores(&self) -> Vec<PlayerScore> {
        PlayerSlot::ALL
            .iter()
            .map(|&slot| PlayerScore {
                slot,
                rounds_won: self.state.rounds.score(slot),
            })
            .collect()
    }
}

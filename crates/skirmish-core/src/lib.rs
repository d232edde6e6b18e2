pub mod error;
pub mod events;
pub mod game_trait;
pub mod player;
pub mod time;
pub mod upgrade;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::game_trait::{PlayerInputs, PlayerScore, Simulation};
    use crate::player::{Player, PlayerSlot};

    /// Both seats filled with default names and colors.
    pub fn make_players() -> Vec<Player> {
        PlayerSlot::ALL
            .iter()
            .map(|&slot| Player::new(slot, format!("Player{}", slot.number())))
            .collect()
    }

    /// Run N simulation ticks with empty inputs, returning all accumulated events.
    pub fn run_sim_ticks<S: Simulation>(sim: &mut S, n: usize, dt: f32) -> Vec<S::Event> {
        let empty = PlayerInputs::empty();
        let mut all_events = Vec::new();
        for _ in 0..n {
            all_events.extend(sim.update(dt, &empty));
        }
        all_events
    }

    /// Assert that the simulation's serialized state differs from `before`.
    pub fn assert_state_changed<S: Simulation>(sim: &S, before: &[u8]) {
        let after = sim.serialize_state();
        assert_ne!(
            before,
            &after[..],
            "Simulation state should have changed after operation"
        );
    }

    // ================================================================
    // Simulation Contract Tests
    // ================================================================
    // Generic checks every Simulation implementation must pass. Crates call
    // them from their own #[cfg(test)] modules with a concrete instance.

    /// After init() with both seats, serialize_state() must return non-empty bytes.
    pub fn contract_init_creates_state<S: Simulation>(sim: &mut S) {
        sim.init(&make_players())
            .expect("init with a full roster must succeed");
        assert!(
            !sim.serialize_state().is_empty(),
            "serialize_state() must return non-empty bytes after init"
        );
    }

    /// init() must reject a roster that does not fill both seats exactly once.
    pub fn contract_init_rejects_bad_roster<S: Simulation>(sim: &mut S) {
        let mut players = make_players();
        players.pop();
        assert!(sim.init(&players).is_err(), "one-player roster must fail");

        let mut players = make_players();
        players[1].slot = PlayerSlot::One;
        assert!(sim.init(&players).is_err(), "duplicate seat must fail");
    }

    /// apply_input() with valid data followed by update() must change state.
    pub fn contract_apply_input_changes_state<S: Simulation>(
        sim: &mut S,
        valid_input: &[u8],
        slot: PlayerSlot,
    ) {
        let before = sim.serialize_state();
        sim.apply_input(slot, valid_input);
        sim.update(0.1, &PlayerInputs::empty());
        assert_state_changed(sim, &before);
    }

    /// update() with dt>0 must advance state (round timer at least).
    pub fn contract_update_advances_time<S: Simulation>(sim: &mut S) {
        let before = sim.serialize_state();
        sim.update(0.5, &PlayerInputs::empty());
        assert_state_changed(sim, &before);
    }

    /// serialize_state → apply_state must be stable after one roundtrip.
    pub fn contract_state_roundtrip_preserves<S: Simulation>(sim: &mut S) {
        let state_a = sim.serialize_state();
        sim.apply_state(&state_a);
        let state_b = sim.serialize_state();
        sim.apply_state(&state_b);
        let state_c = sim.serialize_state();
        assert_eq!(
            state_b, state_c,
            "State must be stable after serialize→apply→serialize roundtrip"
        );
    }

    /// Garbage snapshot bytes must be ignored without panicking.
    pub fn contract_apply_garbage_state_ignored<S: Simulation>(sim: &mut S) {
        let before = sim.serialize_state();
        sim.apply_state(&[0xC1, 0xFF, 0x00, 0x13]);
        assert_eq!(before, sim.serialize_state(), "garbage must not alter state");
    }

    /// pause() must freeze state, resume() must unfreeze it.
    pub fn contract_pause_stops_updates<S: Simulation>(sim: &mut S) {
        sim.pause();
        assert!(sim.is_paused());
        let before = sim.serialize_state();
        sim.update(1.0, &PlayerInputs::empty());
        let during_pause = sim.serialize_state();
        assert_eq!(before, during_pause, "State must not change while paused");

        sim.resume();
        assert!(!sim.is_paused());
        sim.update(1.0, &PlayerInputs::empty());
        assert_state_changed(sim, &during_pause);
    }

    /// scores() must return one entry per seat.
    pub fn contract_scores_complete<S: Simulation>(sim: &S) -> Vec<PlayerScore> {
        let scores = sim.scores();
        assert_eq!(scores.len(), 2, "scores must have one entry per seat");
        scores
    }
}

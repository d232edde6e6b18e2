use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::player::{Player, PlayerSlot};

/// Core trait implemented by a Skirmish simulation.
///
/// The host owns the frame clock, input devices, and presentation; the
/// simulation only advances game state and reports what happened.
pub trait Simulation {
    /// Domain event type emitted by `update`.
    type Event;

    /// Metadata for the title / mode selection screen.
    fn metadata(&self) -> GameMetadata;

    /// Start (or restart) a match for the given roster.
    fn init(&mut self, players: &[Player]) -> Result<(), CoreError>;

    /// Called once per rendered frame with the elapsed time. Returns events in causal order.
    fn update(&mut self, dt: f32, inputs: &PlayerInputs) -> Vec<Self::Event>;

    /// Serialize the full simulation state into a snapshot.
    fn serialize_state(&self) -> Vec<u8>;

    /// Replace the simulation state with a snapshot. Invalid bytes are ignored.
    fn apply_state(&mut self, state: &[u8]);

    /// Feed encoded input for one seat. Malformed input is dropped.
    fn apply_input(&mut self, slot: PlayerSlot, input: &[u8]);

    /// Nominal frame rate in Hz the tuning constants were balanced for.
    fn tick_rate(&self) -> f32 {
        60.0
    }

    /// Suspend simulation (menus, focus loss).
    fn pause(&mut self);

    /// Resume after `pause`.
    fn resume(&mut self);

    fn is_paused(&self) -> bool;

    /// Whether the match has a winner.
    fn is_match_complete(&self) -> bool;

    /// Rounds won per seat.
    fn scores(&self) -> Vec<PlayerScore>;
}

/// Game metadata for the title screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    pub name: String,
    pub description: String,
    pub min_players: u8,
    pub max_players: u8,
    pub estimated_round_duration: Duration,
}

/// Encoded inputs from the seats for a single frame.
#[derive(Debug, Default)]
pub struct PlayerInputs {
    pub inputs: HashMap<PlayerSlot, Vec<u8>>,
}

impl PlayerInputs {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Score entry for a seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub slot: PlayerSlot,
    pub rounds_won: u32,
}

/// Generates the snapshot methods shared by simulations:
/// `serialize_state` and `apply_state`.
///
/// Requires the implementing struct to have a `state: $StateType` field and the
/// crate to depend on `rmp-serde` and `tracing`.
#[macro_export]
macro_rules! simulation_snapshot_boilerplate {
    (state_type: $StateType:ty) => {
        fn serialize_state(&self) -> Vec<u8> {
            rmp_serde::to_vec(&self.state).unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to serialize simulation state");
                Vec::new()
            })
        }

        fn apply_state(&mut self, state: &[u8]) {
            match rmp_serde::from_slice::<$StateType>(state) {
                Ok(s) => self.state = s,
                Err(e) => tracing::debug!(error = %e, "Dropped malformed state snapshot"),
            }
        }
    };
}

use serde::{Deserialize, Serialize};

use skirmish_core::player::PlayerSlot;
use skirmish_core::time::DeferredQueue;

/// Top-level phase of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchState {
    Playing,
    Paused,
    /// Victory pause and upgrade draft.
    RoundEnd,
    GameOver,
}

/// Timers driving the between-rounds flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundTimer {
    VictoryPause,
    DraftTurn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    pub round: u32,
    pub winner: PlayerSlot,
    pub loser: PlayerSlot,
    pub winner_score: u32,
}

/// Round counter, scores, and phase transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundManager {
    state: MatchState,
    round: u32,
    scores: [u32; 2],
    last_loser: Option<PlayerSlot>,
    match_winner: Option<PlayerSlot>,
    win_target: u32,
    timers: DeferredQueue<RoundTimer>,
}

impl RoundManager {
    pub fn new(win_target: u32) -> Self {
        Self {
            state: MatchState::Playing,
            round: 1,
            scores: [0; 2],
            last_loser: None,
            match_winner: None,
            win_target: win_target.max(1),
            timers: DeferredQueue::new(),
        }
    }

    /// Fresh match: round 1, no score.
    pub fn start_match(&mut self) {
        *self = Self::new(self.win_target);
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn scores(&self) -> [u32; 2] {
        self.scores
    }

    pub fn score(&self, slot: PlayerSlot) -> u32 {
        self.scores[slot.index()]
    }

    pub fn last_loser(&self) -> Option<PlayerSlot> {
        self.last_loser
    }

    pub fn match_winner(&self) -> Option<PlayerSlot> {
        self.match_winner
    }

    pub fn is_playing(&self) -> bool {
        self.state == MatchState::Playing
    }

    pub fn pause(&mut self) -> bool {
        if self.state != MatchState::Playing {
            return false;
        }
        self.state = MatchState::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state != MatchState::Paused {
            return false;
        }
        self.state = MatchState::Playing;
        true
    }

    /// Close the round because `dead` reached zero health. Only the first
    /// death while playing counts.
    pub fn end_round(&mut self, dead: PlayerSlot, victory_pause: f32) -> Option<RoundOutcome> {
        if self.state != MatchState::Playing {
            return None;
        }
        let winner = dead.other();
        self.scores[winner.index()] += 1;
        self.last_loser = Some(dead);
        self.state = MatchState::RoundEnd;
        self.timers.schedule(RoundTimer::VictoryPause, victory_pause);
        tracing::info!(round = self.round, %winner, "Round over");
        Some(RoundOutcome {
            round: self.round,
            winner,
            loser: dead,
            winner_score: self.scores[winner.index()],
        })
    }

    /// After the victory pause: decide whether the match is over.
    pub fn finish_victory_pause(&mut self) -> Option<PlayerSlot> {
        let leader = PlayerSlot::ALL
            .into_iter()
            .find(|&s| self.scores[s.index()] >= self.win_target);
        if let Some(winner) = leader {
            self.state = MatchState::GameOver;
            self.match_winner = Some(winner);
            self.timers.clear();
            tracing::info!(%winner, scores = ?self.scores, "Match over");
        }
        leader
    }

    pub fn schedule_draft_turn(&mut self, secs: f32) {
        self.timers.cancel(&RoundTimer::DraftTurn);
        self.timers.schedule(RoundTimer::DraftTurn, secs);
    }

    pub fn cancel_draft_turn(&mut self) {
        self.timers.cancel(&RoundTimer::DraftTurn);
    }

    pub fn draft_turn_remaining(&self) -> Option<f32> {
        self.timers.remaining(&RoundTimer::DraftTurn)
    }

    /// Leave the draft and start the next round.
    pub fn begin_next_round(&mut self) -> u32 {
        self.timers.clear();
        self.round += 1;
        self.state = MatchState::Playing;
        tracing::debug!(round = self.round, "Round started");
        self.round
    }

    /// Advance between-rounds timers. Frozen while paused or after the match.
    pub fn advance(&mut self, dt: f32) -> Vec<RoundTimer> {
        match self.state {
            MatchState::Paused | MatchState::GameOver => Vec::new(),
            MatchState::Playing | MatchState::RoundEnd => self.timers.advance(dt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn death_awards_round_to_other_player() {
        let mut rounds = RoundManager::new(5);
        let outcome = rounds.end_round(PlayerSlot::One, 2.0).unwrap();
        assert_eq!(outcome.winner, PlayerSlot::Two);
        assert_eq!(outcome.loser, PlayerSlot::One);
        assert_eq!(rounds.scores(), [0, 1]);
        assert_eq!(rounds.state(), MatchState::RoundEnd);
        assert_eq!(rounds.last_loser(), Some(PlayerSlot::One));
    }

    #[test]
    fn second_death_same_round_ignored() {
        let mut rounds = RoundManager::new(5);
        rounds.end_round(PlayerSlot::One, 2.0);
        assert!(rounds.end_round(PlayerSlot::Two, 2.0).is_none());
        assert_eq!(rounds.scores(), [0, 1]);
    }

    #[test]
    fn victory_pause_fires_after_delay() {
        let mut rounds = RoundManager::new(5);
        rounds.end_round(PlayerSlot::Two, 2.0);
        assert!(rounds.advance(1.5).is_empty());
        assert_eq!(rounds.advance(0.5), vec![RoundTimer::VictoryPause]);
        assert_eq!(rounds.finish_victory_pause(), None);
        assert_eq!(rounds.state(), MatchState::RoundEnd);
    }

    #[test]
    fn reaching_target_ends_match() {
        let mut rounds = RoundManager::new(2);
        rounds.end_round(PlayerSlot::Two, 0.0);
        rounds.advance(0.1);
        assert_eq!(rounds.finish_victory_pause(), None);
        rounds.begin_next_round();
        rounds.end_round(PlayerSlot::Two, 0.0);
        rounds.advance(0.1);
        assert_eq!(rounds.finish_victory_pause(), Some(PlayerSlot::One));
        assert_eq!(rounds.state(), MatchState::GameOver);
        assert!(rounds.advance(10.0).is_empty());
    }

    #[test]
    fn pause_only_from_playing() {
        let mut rounds = RoundManager::new(5);
        assert!(rounds.pause());
        assert!(!rounds.pause());
        assert!(rounds.resume());
        rounds.end_round(PlayerSlot::One, 2.0);
        assert!(!rounds.pause());
    }

    #[test]
    fn paused_timers_hold() {
        let mut rounds = RoundManager::new(5);
        rounds.schedule_draft_turn(1.0);
        rounds.pause();
        assert!(rounds.advance(5.0).is_empty());
        assert_eq!(rounds.draft_turn_remaining(), Some(1.0));
    }

    #[test]
    fn next_round_increments_counter() {
        let mut rounds = RoundManager::new(5);
        rounds.end_round(PlayerSlot::One, 2.0);
        rounds.schedule_draft_turn(15.0);
        assert_eq!(rounds.begin_next_round(), 2);
        assert!(rounds.is_playing());
        assert_eq!(rounds.draft_turn_remaining(), None);
    }

    #[test]
    fn start_match_resets() {
        let mut rounds = RoundManager::new(3);
        rounds.end_round(PlayerSlot::One, 2.0);
        rounds.start_match();
        assert_eq!(rounds.scores(), [0, 0]);
        assert_eq!(rounds.round(), 1);
        assert!(rounds.is_playing());
    }
}

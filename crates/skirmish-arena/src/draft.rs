use std::fmt;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use skirmish_core::player::PlayerSlot;

use crate::stats::PlayerStats;
use crate::upgrades::UpgradeId;

/// Rejected upgrade choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    /// No draft is running.
    NotDrafting,
    NotYourTurn {
        expected: PlayerSlot,
        got: PlayerSlot,
    },
    /// The id is not (or no longer) in the shared pool.
    NotOffered(UpgradeId),
    /// Non-stackable upgrade the picker already owns.
    Ineligible(UpgradeId),
}

impl fmt::Display for DraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftError::NotDrafting => write!(f, "no upgrade draft in progress"),
            DraftError::NotYourTurn { expected, got } => {
                write!(f, "{got} tried to pick during {expected}'s turn")
            },
            DraftError::NotOffered(id) => write!(f, "{} is not in the draft pool", id.name()),
            DraftError::Ineligible(id) => write!(f, "{} cannot be taken again", id.name()),
        }
    }
}

impl std::error::Error for DraftError {}

/// Draw up to `size` distinct upgrades at random.
pub fn draw_pool<R: Rng + ?Sized>(
    rng: &mut R,
    eligible: &[UpgradeId],
    size: usize,
) -> Vec<UpgradeId> {
    eligible.choose_multiple(rng, size).copied().collect()
}

/// One between-rounds draft: a shared pool, loser first, then winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// Upgrades still on offer.
    pool: Vec<UpgradeId>,
    order: [PlayerSlot; 2],
    turn: usize,
    picks: Vec<(PlayerSlot, UpgradeId)>,
}

impl Draft {
    pub fn new(loser: PlayerSlot, pool: Vec<UpgradeId>) -> Self {
        Self {
            pool,
            order: [loser, loser.other()],
            turn: 0,
            picks: Vec::new(),
        }
    }

    pub fn pool(&self) -> &[UpgradeId] {
        &self.pool
    }

    pub fn picks(&self) -> &[(PlayerSlot, UpgradeId)] {
        &self.picks
    }

    pub fn current_picker(&self) -> Option<PlayerSlot> {
        self.order.get(self.turn).copied()
    }

    pub fn is_complete(&self) -> bool {
        self.current_picker().is_none()
    }

    /// Remaining pool filtered by what `stats` may still take.
    pub fn options_for(&self, stats: &PlayerStats) -> Vec<UpgradeId> {
        self.pool
            .iter()
            .copied()
            .filter(|&id| stats.upgrades.is_eligible(id))
            .collect()
    }

    /// Validate and record a pick, ending the turn. The caller applies the effect.
    pub fn choose(
        &mut self,
        slot: PlayerSlot,
        id: UpgradeId,
        stats: &PlayerStats,
    ) -> Result<UpgradeId, DraftError> {
        let expected = self.current_picker().ok_or(DraftError::NotDrafting)?;
        if expected != slot {
            return Err(DraftError::NotYourTurn {
                expected,
                got: slot,
            });
        }
        let Some(index) = self.pool.iter().position(|&p| p == id) else {
            return Err(DraftError::NotOffered(id));
        };
        if !stats.upgrades.is_eligible(id) {
            return Err(DraftError::Ineligible(id));
        }
        self.pool.remove(index);
        self.picks.push((slot, id));
        self.turn += 1;
        Ok(id)
    }

    /// First option the current picker may take, for turn timeouts.
    pub fn auto_pick(&self, stats: &PlayerStats) -> Option<UpgradeId> {
        self.options_for(stats).first().copied()
    }

    /// Pass the turn without a pick.
    pub fn skip_turn(&mut self) {
        if self.turn < self.order.len() {
            self.turn += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::upgrades::eligible_upgrades;

    fn draft() -> Draft {
        Draft::new(
            PlayerSlot::Two,
            vec![UpgradeId::DamageUp, UpgradeId::PhaseDash, UpgradeId::Shield],
        )
    }

    #[test]
    fn loser_picks_first_then_winner() {
        let mut d = draft();
        let stats = PlayerStats::default();
        assert_eq!(d.current_picker(), Some(PlayerSlot::Two));
        d.choose(PlayerSlot::Two, UpgradeId::Shield, &stats).unwrap();
        assert_eq!(d.current_picker(), Some(PlayerSlot::One));
        d.choose(PlayerSlot::One, UpgradeId::DamageUp, &stats).unwrap();
        assert!(d.is_complete());
        assert_eq!(d.pool(), &[UpgradeId::PhaseDash]);
    }

    #[test]
    fn out_of_turn_rejected() {
        let mut d = draft();
        let err = d
            .choose(PlayerSlot::One, UpgradeId::Shield, &PlayerStats::default())
            .unwrap_err();
        assert_eq!(
            err,
            DraftError::NotYourTurn {
                expected: PlayerSlot::Two,
                got: PlayerSlot::One
            }
        );
    }

    #[test]
    fn taken_upgrade_no_longer_offered() {
        let mut d = draft();
        let stats = PlayerStats::default();
        d.choose(PlayerSlot::Two, UpgradeId::Shield, &stats).unwrap();
        assert_eq!(
            d.choose(PlayerSlot::One, UpgradeId::Shield, &stats),
            Err(DraftError::NotOffered(UpgradeId::Shield))
        );
    }

    #[test]
    fn owned_non_stackable_filtered_and_rejected() {
        let mut d = draft();
        let mut stats = PlayerStats::default();
        stats.apply_upgrade(UpgradeId::PhaseDash);
        assert_eq!(
            d.options_for(&stats),
            vec![UpgradeId::DamageUp, UpgradeId::Shield]
        );
        assert_eq!(
            d.choose(PlayerSlot::Two, UpgradeId::PhaseDash, &stats),
            Err(DraftError::Ineligible(UpgradeId::PhaseDash))
        );
    }

    #[test]
    fn auto_pick_takes_first_eligible() {
        let d = Draft::new(PlayerSlot::One, vec![UpgradeId::QuickFeet, UpgradeId::Armor]);
        let mut stats = PlayerStats::default();
        assert_eq!(d.auto_pick(&stats), Some(UpgradeId::QuickFeet));
        stats.apply_upgrade(UpgradeId::QuickFeet);
        assert_eq!(d.auto_pick(&stats), Some(UpgradeId::Armor));
    }

    #[test]
    fn skip_turn_advances() {
        let mut d = draft();
        d.skip_turn();
        assert_eq!(d.current_picker(), Some(PlayerSlot::One));
        d.skip_turn();
        d.skip_turn();
        assert!(d.is_complete());
    }

    #[test]
    fn finished_draft_reports_not_drafting() {
        let mut d = draft();
        d.skip_turn();
        d.skip_turn();
        assert_eq!(
            d.choose(PlayerSlot::One, UpgradeId::Shield, &PlayerStats::default()),
            Err(DraftError::NotDrafting)
        );
    }

    #[test]
    fn pool_is_distinct_and_eligible() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut stats = PlayerStats::default();
        stats.apply_upgrade(UpgradeId::PhaseDash);
        let eligible = eligible_upgrades(&stats);
        for _ in 0..50 {
            let pool = draw_pool(&mut rng, &eligible, 3);
            assert_eq!(pool.len(), 3);
            assert!(!pool.contains(&UpgradeId::PhaseDash));
            let mut sorted = pool.clone();
            sorted.sort_by_key(|id| *id as u8);
            sorted.dedup();
            assert_eq!(sorted.len(), 3);
        }
    }

    #[test]
    fn small_pool_when_few_eligible() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = draw_pool(&mut rng, &[UpgradeId::Armor], 3);
        assert_eq!(pool, vec![UpgradeId::Armor]);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            DraftError::NotOffered(UpgradeId::Armor).to_string(),
            "Armor is not in the draft pool"
        );
    }
}

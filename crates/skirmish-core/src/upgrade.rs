use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Trait for game-specific upgrade id enums.
pub trait UpgradeKind: Clone + Copy + PartialEq + Serialize + DeserializeOwned {
    /// The stat block the upgrade mutates.
    type Target;

    /// Non-stackable upgrades may appear at most once in a player's log.
    fn is_stackable(&self) -> bool;

    /// Apply the effect in place. Effects only touch their own fields.
    fn apply(&self, target: &mut Self::Target);
}

/// Ordered log of applied upgrades (insertion order = draft order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct UpgradeLog<K: UpgradeKind> {
    entries: Vec<K>,
}

impl<K: UpgradeKind> Default for UpgradeLog<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: UpgradeKind> UpgradeLog<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `kind` may still be taken.
    pub fn is_eligible(&self, kind: K) -> bool {
        kind.is_stackable() || !self.contains(kind)
    }

    pub fn contains(&self, kind: K) -> bool {
        self.entries.contains(&kind)
    }

    pub fn count(&self, kind: K) -> usize {
        self.entries.iter().filter(|&&k| k == kind).count()
    }

    /// Append `kind` if eligible. Returns whether it was recorded.
    pub fn record(&mut self, kind: K) -> bool {
        if !self.is_eligible(kind) {
            return false;
        }
        self.entries.push(kind);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[K] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    enum Perk {
        Power,
        Wings,
    }

    impl UpgradeKind for Perk {
        type Target = u32;

        fn is_stackable(&self) -> bool {
            matches!(self, Perk::Power)
        }

        fn apply(&self, target: &mut u32) {
            *target += 1;
        }
    }

    #[test]
    fn stackable_records_repeatedly() {
        let mut log = UpgradeLog::new();
        assert!(log.record(Perk::Power));
        assert!(log.record(Perk::Power));
        assert_eq!(log.count(Perk::Power), 2);
    }

    #[test]
    fn non_stackable_records_once() {
        let mut log = UpgradeLog::new();
        assert!(log.record(Perk::Wings));
        assert!(!log.is_eligible(Perk::Wings));
        assert!(!log.record(Perk::Wings));
        assert_eq!(log.count(Perk::Wings), 1);
    }

    #[test]
    fn preserves_draft_order() {
        let mut log = UpgradeLog::new();
        log.record(Perk::Wings);
        log.record(Perk::Power);
        log.record(Perk::Power);
        assert_eq!(log.as_slice(), &[Perk::Wings, Perk::Power, Perk::Power]);
    }

    #[test]
    fn json_roundtrip() {
        let mut log = UpgradeLog::new();
        log.record(Perk::Power);
        log.record(Perk::Wings);
        let json = serde_json::to_string(&log).unwrap();
        let back: UpgradeLog<Perk> = serde_json::from_str(&json).unwrap();
        assert_eq!(log, back);
    }
}

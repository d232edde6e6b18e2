use serde::{Deserialize, Serialize};

/// A timer scheduled against the frame clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deferred<K> {
    pub key: K,
    pub remaining: f32,
}

/// Deferred callbacks modelled as keyed timers.
///
/// The simulation never blocks; instead it schedules a key and reacts when
/// [`DeferredQueue::advance`] reports it as fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredQueue<K> {
    pending: Vec<Deferred<K>>,
}

impl<K> Default for DeferredQueue<K> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<K: PartialEq> DeferredQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `key` to fire after `delay` seconds. Negative delays fire on the next advance.
    pub fn schedule(&mut self, key: K, delay: f32) {
        self.pending.push(Deferred {
            key,
            remaining: delay.max(0.0),
        });
    }

    /// Drop every pending timer with this key. Returns whether any were removed.
    pub fn cancel(&mut self, key: &K) -> bool {
        let before = self.pending.len();
        self.pending.retain(|d| &d.key != key);
        self.pending.len() != before
    }

    pub fn is_scheduled(&self, key: &K) -> bool {
        self.pending.iter().any(|d| &d.key == key)
    }

    /// Seconds left on the first timer with this key.
    pub fn remaining(&self, key: &K) -> Option<f32> {
        self.pending
            .iter()
            .find(|d| &d.key == key)
            .map(|d| d.remaining)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Advance the clock by `dt` and return fired keys, earliest deadline first.
    pub fn advance(&mut self, dt: f32) -> Vec<K> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        for d in &mut self.pending {
            d.remaining -= dt;
        }
        let mut fired = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].remaining <= 0.0 {
                fired.push(self.pending.remove(i));
            } else {
                i += 1;
            }
        }
        fired.sort_by(|a, b| a.remaining.total_cmp(&b.remaining));
        fired.into_iter().map(|d| d.key).collect()
    }
}

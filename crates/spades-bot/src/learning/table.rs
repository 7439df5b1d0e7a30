//! Tabular action values with the one-step temporal-difference update.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// `(state, action) -> value`; unseen pairs read as 0.0. Entries are only
/// ever inserted or overwritten.
#[derive(Debug, Clone)]
pub struct ValueTable<S, A> {
    values: HashMap<(S, A), f64>,
}

impl<S, A> Default for ValueTable<S, A> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueEntry<S, A> {
    pub state: S,
    pub action: A,
    pub value: f64,
}

impl<S, A> ValueTable<S, A>
where
    S: Eq + Hash + Clone,
    A: Eq + Hash + Copy,
{
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, state: &S, action: A) -> f64 {
        self.values
            .get(&(state.clone(), action))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set(&mut self, state: S, action: A, value: f64) {
        self.values.insert((state, action), value);
    }

    /// Highest value over `actions`; 0.0 when there are none.
    pub fn max_value(&self, state: &S, actions: &[A]) -> f64 {
        actions
            .iter()
            .map(|action| self.value(state, *action))
            .fold(None, |best: Option<f64>, v| Some(best.map_or(v, |b| b.max(v))))
            .unwrap_or(0.0)
    }

    /// Every action in `actions` whose value equals the maximum.
    pub fn best_actions(&self, state: &S, actions: &[A]) -> Vec<A> {
        let best = self.max_value(state, actions);
        actions
            .iter()
            .copied()
            .filter(|action| self.value(state, *action) >= best)
            .collect()
    }

    /// `Q <- Q + alpha * (reward + discount * next_max - Q)`. Returns the new
    /// value.
    pub fn update(
        &mut self,
        state: S,
        action: A,
        reward: f64,
        next_max: f64,
        alpha: f64,
        discount: f64,
    ) -> f64 {
        let current = self.value(&state, action);
        let target = reward + discount * next_max;
        let updated = current + alpha * (target - current);
        self.set(state, action, updated);
        updated
    }
}

impl<S, A> ValueTable<S, A>
where
    S: Eq + Hash + Clone + Ord,
    A: Eq + Hash + Copy + Ord,
{
    /// Entries sorted by key so serialised tables are stable.
    pub fn entries(&self) -> Vec<ValueEntry<S, A>> {
        let mut entries: Vec<ValueEntry<S, A>> = self
            .values
            .iter()
            .map(|((state, action), value)| ValueEntry {
                state: state.clone(),
                action: *action,
                value: *value,
            })
            .collect();
        entries.sort_by(|a, b| a.state.cmp(&b.state).then(a.action.cmp(&b.action)));
        entries
    }

    pub fn from_entries(entries: Vec<ValueEntry<S, A>>) -> Self {
        let values = entries
            .into_iter()
            .map(|entry| ((entry.state, entry.action), entry.value))
            .collect();
        Self { values }
    }
}

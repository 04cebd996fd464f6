use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::state::StateKey;

/// Number of actions, one per cardinal direction.
pub const ACTIONS: usize = 4;

/// Action-values in `Direction::CLOCKWISE` order: Up, Right, Down, Left.
pub type ActionValues = [f64; ACTIONS];

/// One observed step, as consumed by [`QTable::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: StateKey,
    pub action: usize,
    pub reward: f64,
    pub next_state: StateKey,
    pub done: bool,
}

/// Tabular action-value function keyed by packed state.
///
/// Rows are created on first access with all values at zero and are never removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QTable {
    entries: HashMap<StateKey, ActionValues>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct states visited.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: StateKey) -> Option<&ActionValues> {
        self.entries.get(&key)
    }

    /// Row for `key`, inserted as zeros if missing.
    pub fn values_mut(&mut self, key: StateKey) -> &mut ActionValues {
        self.entries.entry(key).or_insert([0.0; ACTIONS])
    }

    /// One-step Q-learning: `Q(s,a) += alpha * (target - Q(s,a))` with
    /// `target = r` on terminal transitions and `r + gamma * max Q(s')` otherwise.
    ///
    /// Returns the updated `Q(s,a)`.
    pub fn update(&mut self, transition: &Transition, alpha: f64, gamma: f64) -> f64 {
        let target = if transition.done {
            transition.reward
        } else {
            transition.reward + gamma * max_value(self.values_mut(transition.next_state))
        };
        let q = &mut self.values_mut(transition.state)[transition.action];
        *q += alpha * (target - *q);
        *q
    }
}

pub fn max_value(values: &ActionValues) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Index of the largest value; ties are broken uniformly at random among all
/// tied indices. The random stream is only consumed when there is a tie.
pub fn argmax<R: Rng>(values: &ActionValues, rng: &mut R) -> usize {
    let best = max_value(values);
    let mut tied = [0usize; ACTIONS];
    let mut count = 0;
    for (i, value) in values.iter().enumerate() {
        if *value == best {
            tied[count] = i;
            count += 1;
        }
    }
    match count {
        1 => tied[0],
        _ => tied[rng.random_range(0..count)],
    }
}

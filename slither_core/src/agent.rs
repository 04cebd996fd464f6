use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    Direction,
    board::{Board, Outcome},
    config::TrainConfig,
    qtable::{self, ACTIONS, QTable, Transition},
    state::{State, StateKey},
};

/// Trait defining how a snake picks its next heading.
/// Policies decide based on the encoded [`State`] of the head vision.
pub trait Policy {
    /// `&mut self` lets a policy advance its own random stream.
    fn select_action(&mut self, state: &State) -> Direction;
}

/// Epsilon-greedy agent over a [`QTable`].
#[derive(Debug, Clone)]
pub struct QAgent {
    table: QTable,
    epsilon: f64,
    alpha: f64,
    gamma: f64,
    rng: StdRng,
}

impl QAgent {
    pub fn new(table: QTable, alpha: f64, gamma: f64, epsilon: f64, rng: StdRng) -> Self {
        Self {
            table,
            epsilon,
            alpha,
            gamma,
            rng,
        }
    }

    /// Pure exploitation over an already trained table.
    pub fn greedy(table: QTable, seed: u64) -> Self {
        let defaults = TrainConfig::default();
        Self::new(
            table,
            defaults.alpha,
            defaults.gamma,
            0.0,
            StdRng::seed_from_u64(seed),
        )
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    /// Geometric decay clamped at `floor`.
    pub fn decay_epsilon(&mut self, factor: f64, floor: f64) {
        self.epsilon = (self.epsilon * factor).max(floor);
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn into_table(self) -> QTable {
        self.table
    }

    pub fn learn(&mut self, transition: &Transition) -> f64 {
        self.table.update(transition, self.alpha, self.gamma)
    }

    /// With probability epsilon a uniformly random action, otherwise the argmax.
    /// Unseen states are inserted with zero values.
    pub fn select_index(&mut self, key: StateKey) -> usize {
        if self.rng.random::<f64>() < self.epsilon {
            self.rng.random_range(0..ACTIONS)
        } else {
            let values = *self.table.values_mut(key);
            qtable::argmax(&values, &mut self.rng)
        }
    }
}

impl Policy for QAgent {
    fn select_action(&mut self, state: &State) -> Direction {
        Direction::CLOCKWISE[self.select_index(state.key())]
    }
}

/// Picks any of the four directions uniformly.
#[derive(Debug)]
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomAgent {
    fn select_action(&mut self, _state: &State) -> Direction {
        Direction::CLOCKWISE[self.rng.random_range(0..ACTIONS)]
    }
}

/// How an episode driven by [`play_episode`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeReport {
    /// Snake length when the episode stopped.
    pub length: usize,
    pub steps: usize,
    /// Outcome of the last step, `None` if no step was taken.
    pub last_outcome: Option<Outcome>,
    pub terminal: bool,
}

/// Lets `policy` steer `board` until it is terminal or `max_steps` steps were taken.
///
/// The board is not reset first.
pub fn play_episode<P: Policy + ?Sized>(
    board: &mut Board,
    policy: &mut P,
    max_steps: usize,
    emit_trace: bool,
) -> EpisodeReport {
    let mut steps = 0;
    let mut last_outcome = None;
    while steps < max_steps && !board.is_terminal() {
        let state = State::from_vision(&board.vision());
        board.turn(policy.select_action(&state));
        last_outcome = Some(board.step(emit_trace));
        steps += 1;
    }
    EpisodeReport {
        length: board.snake_len(),
        steps,
        last_outcome,
        terminal: board.is_terminal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Always(Direction);

    impl Policy for Always {
        fn select_action(&mut self, _state: &State) -> Direction {
            self.0
        }
    }

    #[test]
    fn test_greedy_agent_follows_best_value() {
        let mut table = QTable::new();
        let key = StateKey(77);
        table.values_mut(key).copy_from_slice(&[0.0, 1.0, 9.0, -4.0]);
        let mut agent = QAgent::greedy(table, 1);
        for _ in 0..20 {
            assert_eq!(agent.select_index(key), 2);
        }
    }

    #[test]
    fn test_full_exploration_covers_all_actions() {
        let mut table = QTable::new();
        let key = StateKey(3);
        table.values_mut(key)[0] = 100.0;
        let mut agent = QAgent::new(table, 0.5, 0.9, 1.0, StdRng::seed_from_u64(9));
        let mut seen = [false; ACTIONS];
        for _ in 0..200 {
            seen[agent.select_index(key)] = true;
        }
        assert_eq!(seen, [true; ACTIONS]);
    }

    #[test]
    fn test_selection_inserts_unseen_state() {
        let mut agent = QAgent::greedy(QTable::new(), 0);
        agent.select_index(StateKey(12));
        assert_eq!(agent.table().get(StateKey(12)), Some(&[0.0; ACTIONS]));
    }

    #[test]
    fn test_decay_epsilon_stops_at_floor() {
        let mut agent = QAgent::new(QTable::new(), 0.5, 0.9, 0.9, StdRng::seed_from_u64(0));
        agent.decay_epsilon(0.5, 0.3);
        assert!((agent.epsilon() - 0.45).abs() < 1e-12);
        agent.decay_epsilon(0.5, 0.3);
        assert_eq!(agent.epsilon(), 0.3);
        agent.decay_epsilon(0.5, 0.3);
        assert_eq!(agent.epsilon(), 0.3);
    }

    #[test]
    fn test_learn_uses_agent_hyper_parameters() {
        let mut agent = QAgent::new(QTable::new(), 0.5, 0.0, 0.0, StdRng::seed_from_u64(0));
        let q = agent.learn(&Transition {
            state: StateKey(1),
            action: 3,
            reward: 10.0,
            next_state: StateKey(2),
            done: false,
        });
        assert_eq!(q, 5.0);
    }

    #[test]
    fn test_play_episode_ends_on_collision() {
        let mut board = Board::seeded(6, 4).unwrap();
        let report = play_episode(&mut board, &mut Always(Direction::Up), 1_000, false);
        assert!(report.terminal);
        assert!(report.steps <= 1_000);
        assert!(matches!(
            report.last_outcome,
            Some(Outcome::Collision | Outcome::ShrunkToDeath)
        ));
    }

    #[test]
    fn test_play_episode_respects_step_cap() {
        let mut board = Board::seeded(10, 2).unwrap();
        let report = play_episode(&mut board, &mut RandomAgent::new(5), 1, false);
        assert_eq!(report.steps, 1);
    }

    #[test]
    fn test_play_episode_on_terminal_board_takes_no_steps() {
        let mut board = Board::seeded(5, 8).unwrap();
        play_episode(&mut board, &mut Always(Direction::Left), 1_000, false);
        let report = play_episode(&mut board, &mut RandomAgent::new(1), 10, false);
        assert_eq!(report.steps, 0);
        assert_eq!(report.last_outcome, None);
    }
}

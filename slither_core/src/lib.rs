use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod board;
pub mod config;
pub mod error;
pub mod grid;
pub mod persistence;
pub mod qtable;
pub mod state;
pub mod trainer;
pub mod vision;

pub use agent::{EpisodeReport, Policy, QAgent, RandomAgent, play_episode};
pub use board::{Board, BoardError, Outcome, Snapshot};
pub use config::{ConfigError, TrainConfig};
pub use error::{Error, Result};
pub use persistence::{ModelMetadata, SavedModel, StorageError, load_model, save_model};
pub use qtable::{ActionValues, QTable, Transition};
pub use state::{State, StateKey};
pub use trainer::{RunResult, Trainer, TrainingSummary, train, train_independent};
pub use vision::{Sight, Vision, VisionError};

/// A square on the board. `(0, 0)` is the top-left corner and `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Cell { x, y }
    }

    /// The neighbouring cell one step towards `direction`. May lie off the board.
    pub fn step(self, direction: Direction) -> Cell {
        let (dx, dy) = direction.delta();
        Cell::new(self.x + dx, self.y + dy)
    }

    /// The four orthogonal neighbours, in `Direction::CLOCKWISE` order.
    pub fn neighbors(self) -> [Cell; 4] {
        Direction::CLOCKWISE.map(|direction| self.step(direction))
    }

    /// Direction of an orthogonally adjacent cell, `None` for anything else.
    pub fn direction_to(self, other: Cell) -> Option<Direction> {
        Direction::CLOCKWISE
            .into_iter()
            .find(|direction| self.step(*direction) == other)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Heading of the snake head.
///
/// A missing direction (for example the neck of a one-cell snake) is expressed as
/// `Option<Direction>`; the board never stores one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Canonical order shared by vision rays, action indices and Q-values.
    pub const CLOCKWISE: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// `(dx, dy)` of one step in this direction.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// The next direction after a 90° clockwise rotation.
    pub fn clockwise(self) -> Direction {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }

    /// Position in `CLOCKWISE`, which is also the action index.
    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Right => 1,
            Direction::Down => 2,
            Direction::Left => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown direction '{0}', expected one of UP, DOWN, LEFT, RIGHT")]
pub struct ParseDirectionError(String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UP" => Ok(Direction::Up),
            "DOWN" => Ok(Direction::Down),
            "LEFT" => Ok(Direction::Left),
            "RIGHT" => Ok(Direction::Right),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_step_follows_screen_coordinates() {
        let cell = Cell::new(2, 2);
        assert_eq!(cell.step(Direction::Up), Cell::new(2, 1));
        assert_eq!(cell.step(Direction::Down), Cell::new(2, 3));
        assert_eq!(cell.step(Direction::Left), Cell::new(1, 2));
        assert_eq!(cell.step(Direction::Right), Cell::new(3, 2));
    }

    #[test]
    fn test_direction_to_adjacent_only() {
        let cell = Cell::new(4, 4);
        assert_eq!(cell.direction_to(Cell::new(4, 5)), Some(Direction::Down));
        assert_eq!(cell.direction_to(Cell::new(3, 4)), Some(Direction::Left));
        assert_eq!(cell.direction_to(Cell::new(5, 5)), None);
        assert_eq!(cell.direction_to(cell), None);
    }

    #[test]
    fn test_clockwise_cycle_and_index() {
        let mut direction = Direction::Up;
        for expected in Direction::CLOCKWISE {
            assert_eq!(direction, expected);
            assert_eq!(Direction::CLOCKWISE[direction.index()], direction);
            direction = direction.clockwise();
        }
        assert_eq!(direction, Direction::Up);
    }

    #[test]
    fn test_parse_direction_names() {
        assert_eq!("UP".parse::<Direction>(), Ok(Direction::Up));
        assert_eq!("left".parse::<Direction>(), Ok(Direction::Left));
        assert!("NONE".parse::<Direction>().is_err());
        assert_eq!(Direction::Right.to_string(), "RIGHT");
    }
}

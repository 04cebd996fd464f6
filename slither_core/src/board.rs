use std::{collections::VecDeque, fmt};

use log::{debug, trace, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Cell, Direction,
    grid::Grid,
    vision::{Sight, Vision},
};

/// Smallest accepted board edge.
pub const MIN_GRID_SIZE: usize = 3;
/// Length of the snake after a reset.
pub const INITIAL_LENGTH: usize = 3;
/// Number of green apples kept on the board while space allows.
pub const GREEN_APPLES: usize = 2;
/// Random draws tried before placement falls back to a row-major scan.
const PLACEMENT_ATTEMPTS: usize = 256;

/// Errors raised while building a board.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("grid size {size} is too small, the board needs at least {min}x{min} cells")]
    GridTooSmall { size: usize, min: usize },
    #[error("no room for the apples and a {length}-cell snake on a {size}x{size} grid")]
    NoRoom { size: usize, length: usize },
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Static content of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tile {
    #[default]
    Empty,
    Snake,
    Green,
    Red,
}

impl From<Tile> for Sight {
    fn from(tile: Tile) -> Self {
        match tile {
            Tile::Empty => Sight::Empty,
            Tile::Snake => Sight::Snake,
            Tile::Green => Sight::Green,
            Tile::Red => Sight::Red,
        }
    }
}

/// Classification of a single [`Board::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Slid onto an empty cell.
    Moved,
    /// Ate a green apple and grew by one.
    Grew,
    /// Ate the red apple and shrank.
    AteRed,
    /// Ate the red apple with a single segment left. Terminal.
    ShrunkToDeath,
    /// Hit a wall or the snake itself, or stepped a terminal board. Terminal.
    Collision,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        matches!(self, Outcome::ShrunkToDeath | Outcome::Collision)
    }
}

/// Read-only copy of the board for rendering and telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub grid_size: usize,
    /// Head first.
    pub snake: Vec<Cell>,
    pub greens: Vec<Cell>,
    pub red: Option<Cell>,
    pub heading: Direction,
    pub terminal: bool,
}

/// The snake simulation.
///
/// Every mutation goes through [`Board::reset`], [`Board::turn`] or [`Board::step`],
/// which keep the snake contiguous and duplicate-free and keep apples off the
/// snake and off each other.
pub struct Board {
    size: usize,
    tiles: Grid<Tile>,
    snake: VecDeque<Cell>,
    greens: Vec<Cell>,
    red: Option<Cell>,
    heading: Direction,
    terminal: bool,
    rng: StdRng,
}

impl Board {
    /// Creates a board of `size`x`size` cells and places the first snake and apples.
    pub fn new(size: usize, rng: StdRng) -> Result<Self, BoardError> {
        let mut board = Board {
            size: 0,
            tiles: Grid::new(0, 0),
            snake: VecDeque::new(),
            greens: Vec::with_capacity(GREEN_APPLES),
            red: None,
            heading: Direction::Up,
            terminal: false,
            rng,
        };
        board.reset(size)?;
        Ok(board)
    }

    /// Creates a board whose random stream is fixed by `seed`.
    pub fn seeded(size: usize, seed: u64) -> Result<Self, BoardError> {
        Self::new(size, StdRng::seed_from_u64(seed))
    }

    /// Rebuilds a board from a snapshot, checking every board invariant.
    pub fn restore(snapshot: &Snapshot, rng: StdRng) -> Result<Self, BoardError> {
        let size = snapshot.grid_size;
        if size < MIN_GRID_SIZE {
            return Err(BoardError::GridTooSmall {
                size,
                min: MIN_GRID_SIZE,
            });
        }
        let invalid = |reason: String| Err(BoardError::InvalidSnapshot(reason));

        let mut tiles: Grid<Tile> = Grid::new(size, size);
        if snapshot.snake.is_empty() {
            return invalid("the snake has no segments".to_string());
        }
        for (i, &cell) in snapshot.snake.iter().enumerate() {
            if !tiles.contains(cell) {
                return invalid(format!("snake segment {cell} is off the board"));
            }
            if tiles[cell] != Tile::Empty {
                return invalid(format!("snake segment {cell} appears twice"));
            }
            if i > 0 && snapshot.snake[i - 1].direction_to(cell).is_none() {
                return invalid(format!("snake segment {cell} is not adjacent to its predecessor"));
            }
            tiles[cell] = Tile::Snake;
        }
        if snapshot.greens.len() > GREEN_APPLES {
            return invalid(format!(
                "{} green apples, at most {GREEN_APPLES} allowed",
                snapshot.greens.len()
            ));
        }
        let apples = snapshot
            .greens
            .iter()
            .map(|&cell| (cell, Tile::Green))
            .chain(snapshot.red.map(|cell| (cell, Tile::Red)));
        for (cell, tile) in apples {
            if tiles.get(cell) != Some(&Tile::Empty) {
                return invalid(format!(
                    "apple at {cell} is off the board or overlaps another entity"
                ));
            }
            tiles[cell] = tile;
        }

        Ok(Board {
            size,
            tiles,
            snake: snapshot.snake.iter().copied().collect(),
            greens: snapshot.greens.clone(),
            red: snapshot.red,
            heading: snapshot.heading,
            terminal: snapshot.terminal,
            rng,
        })
    }

    /// Starts a fresh game on a `grid_size`x`grid_size` board.
    ///
    /// Apples are placed first, then a three-cell snake grown from a random head
    /// through random free neighbours. The heading points away from the body and is
    /// rotated clockwise until the first forward step is safe.
    pub fn reset(&mut self, grid_size: usize) -> Result<(), BoardError> {
        if grid_size < MIN_GRID_SIZE {
            return Err(BoardError::GridTooSmall {
                size: grid_size,
                min: MIN_GRID_SIZE,
            });
        }
        let no_room = BoardError::NoRoom {
            size: grid_size,
            length: INITIAL_LENGTH,
        };

        self.size = grid_size;
        self.tiles = Grid::new(grid_size, grid_size);
        self.snake.clear();
        self.greens.clear();
        self.red = None;
        self.terminal = false;

        for _ in 0..GREEN_APPLES {
            let cell = self.random_free_cell().ok_or(no_room.clone())?;
            self.place_green(cell);
        }
        let red = self.random_free_cell().ok_or(no_room.clone())?;
        self.place_red(red);

        let body = self.sample_snake().ok_or(no_room)?;
        for cell in body {
            self.tiles[cell] = Tile::Snake;
            self.snake.push_back(cell);
        }

        let mut heading = self
            .neck_direction()
            .map(Direction::opposite)
            .unwrap_or(Direction::Up);
        for _ in 0..Direction::CLOCKWISE.len() {
            if self.is_safe_ahead(heading) {
                break;
            }
            heading = heading.clockwise();
        }
        self.heading = heading;

        debug!(
            "reset {}x{} board: snake {:?} heading {}, greens {:?}, red {:?}",
            self.size, self.size, self.snake, self.heading, self.greens, self.red
        );
        Ok(())
    }

    /// Changes the heading unless `direction` points back into the neck.
    pub fn turn(&mut self, direction: Direction) {
        if self.neck_direction() != Some(direction) {
            self.heading = direction;
        }
    }

    /// Advances the snake one cell along its heading.
    ///
    /// A terminal board is left untouched and reports [`Outcome::Collision`].
    /// With `emit_trace` the resulting head vision is logged at trace level.
    pub fn step(&mut self, emit_trace: bool) -> Outcome {
        if self.terminal {
            return Outcome::Collision;
        }

        let target = self.head().step(self.heading);
        let outcome = match self.tiles.get(target).copied() {
            None | Some(Tile::Snake) => {
                self.terminal = true;
                Outcome::Collision
            }
            Some(Tile::Green) => {
                self.greens.retain(|&green| green != target);
                self.advance(target, 0);
                if let Some(cell) = self.random_free_cell() {
                    self.place_green(cell);
                }
                Outcome::Grew
            }
            Some(Tile::Red) if self.snake.len() == 1 => {
                self.terminal = true;
                Outcome::ShrunkToDeath
            }
            Some(Tile::Red) => {
                self.red = None;
                self.advance(target, 2);
                if let Some(cell) = self.random_free_cell() {
                    self.place_red(cell);
                }
                Outcome::AteRed
            }
            Some(Tile::Empty) => {
                self.advance(target, 1);
                Outcome::Moved
            }
        };

        if emit_trace {
            trace!(
                "{:?} heading {}, length {}\n{}",
                outcome,
                self.heading,
                self.snake.len(),
                self.vision().render_cross()
            );
        }
        outcome
    }

    /// Casts the four rays from the head: Up, Right, Down, Left.
    pub fn vision(&self) -> Vision {
        let head = self.head();
        Vision::new(Direction::CLOCKWISE.map(|direction| self.ray(head, direction)))
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            grid_size: self.size,
            snake: self.snake.iter().copied().collect(),
            greens: self.greens.clone(),
            red: self.red,
            heading: self.heading,
            terminal: self.terminal,
        }
    }

    pub fn grid_size(&self) -> usize {
        self.size
    }

    pub fn head(&self) -> Cell {
        // The snake never shrinks below one segment.
        self.snake[0]
    }

    /// Number of snake segments, at least one.
    pub fn snake_len(&self) -> usize {
        self.snake.len()
    }

    /// Snake segments, head first.
    pub fn snake(&self) -> impl Iterator<Item = Cell> + '_ {
        self.snake.iter().copied()
    }

    pub fn greens(&self) -> &[Cell] {
        &self.greens
    }

    pub fn red(&self) -> Option<Cell> {
        self.red
    }

    pub fn heading(&self) -> Direction {
        self.heading
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Direction from the head to the second segment, `None` for a one-cell snake.
    pub fn neck_direction(&self) -> Option<Direction> {
        let neck = self.snake.get(1)?;
        self.head().direction_to(*neck)
    }

    fn ray(&self, from: Cell, direction: Direction) -> Vec<Sight> {
        let mut sights = Vec::with_capacity(self.size + 1);
        let mut cell = from;
        loop {
            cell = cell.step(direction);
            match self.tiles.get(cell) {
                Some(tile) => sights.push(Sight::from(*tile)),
                None => {
                    sights.push(Sight::Wall);
                    return sights;
                }
            }
        }
    }

    /// Moves the head onto `target` and drops `shed` tail segments.
    fn advance(&mut self, target: Cell, shed: usize) {
        self.snake.push_front(target);
        self.tiles[target] = Tile::Snake;
        for _ in 0..shed {
            if let Some(tail) = self.snake.pop_back() {
                self.tiles[tail] = Tile::Empty;
            }
        }
    }

    fn is_safe_ahead(&self, heading: Direction) -> bool {
        let ahead = self.head().step(heading);
        matches!(self.tiles.get(ahead), Some(tile) if *tile != Tile::Snake)
    }

    fn place_green(&mut self, cell: Cell) {
        self.tiles[cell] = Tile::Green;
        self.greens.push(cell);
    }

    fn place_red(&mut self, cell: Cell) {
        self.tiles[cell] = Tile::Red;
        self.red = Some(cell);
    }

    fn random_cell(&mut self) -> Cell {
        let size = self.size as i32;
        Cell::new(self.rng.random_range(0..size), self.rng.random_range(0..size))
    }

    /// Uniform random empty cell; `None` only when the board has no empty cell.
    fn random_free_cell(&mut self) -> Option<Cell> {
        for _ in 0..PLACEMENT_ATTEMPTS {
            let cell = self.random_cell();
            if self.tiles[cell] == Tile::Empty {
                return Some(cell);
            }
        }
        let fallback = self
            .tiles
            .enumerate()
            .find(|(_, tile)| **tile == Tile::Empty)
            .map(|(cell, _)| cell);
        if let Some(cell) = fallback {
            warn!(
                "random placement failed {PLACEMENT_ATTEMPTS} times, using first free cell {cell}"
            );
        }
        fallback
    }

    /// A cell the initial snake may occupy: on the board, empty, not yet in `body`.
    fn is_open(&self, cell: Cell, body: &[Cell]) -> bool {
        self.tiles.get(cell) == Some(&Tile::Empty) && !body.contains(&cell)
    }

    /// Picks the initial snake cells, head first.
    fn sample_snake(&mut self) -> Option<Vec<Cell>> {
        for _ in 0..PLACEMENT_ATTEMPTS {
            let head = self.random_free_cell()?;
            if let Some(body) = self.grow_from(head) {
                return Some(body);
            }
        }
        let body = self.scan_snake();
        if body.is_some() {
            warn!(
                "random snake placement failed {PLACEMENT_ATTEMPTS} times, using a scanned layout"
            );
        }
        body
    }

    /// Grows a snake from `head` through random open neighbours. `None` on a dead end.
    fn grow_from(&mut self, head: Cell) -> Option<Vec<Cell>> {
        let mut body = vec![head];
        while body.len() < INITIAL_LENGTH {
            let last = body[body.len() - 1];
            // Checked up front so the retry loop below always has a valid draw.
            if !last.neighbors().iter().any(|&n| self.is_open(n, &body)) {
                return None;
            }
            loop {
                let direction = Direction::CLOCKWISE[self.rng.random_range(0..4)];
                let candidate = last.step(direction);
                if self.is_open(candidate, &body) {
                    body.push(candidate);
                    break;
                }
            }
        }
        Some(body)
    }

    /// First three-cell path of open cells in row-major, clockwise order.
    fn scan_snake(&self) -> Option<Vec<Cell>> {
        let heads = self
            .tiles
            .enumerate()
            .filter(|(_, tile)| **tile == Tile::Empty)
            .map(|(cell, _)| cell);
        for head in heads {
            for neck in head.neighbors() {
                if !self.is_open(neck, &[head]) {
                    continue;
                }
                for tail in neck.neighbors() {
                    if self.is_open(tail, &[head, neck]) {
                        return Some(vec![head, neck, tail]);
                    }
                }
            }
        }
        None
    }
}

impl fmt::Display for Board {
    /// One text row per board row: `H` head, `S` body, `G` green, `R` red, `.` empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self.head();
        for y in 0..self.size as i32 {
            for x in 0..self.size as i32 {
                let cell = Cell::new(x, y);
                let symbol = match self.tiles[cell] {
                    Tile::Snake if cell == head => 'H',
                    Tile::Snake => 'S',
                    Tile::Green => 'G',
                    Tile::Red => 'R',
                    Tile::Empty => '.',
                };
                write!(f, "{symbol}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

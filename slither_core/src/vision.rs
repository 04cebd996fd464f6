//! What the snake head sees along the four cardinal directions.

use std::fmt::Write as _;

use crate::Direction;

/// One cell as seen from the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sight {
    Wall,
    Snake,
    Green,
    Red,
    Empty,
}

impl Sight {
    /// Single-character form used at the text boundary.
    pub fn symbol(self) -> char {
        match self {
            Sight::Wall => 'W',
            Sight::Snake => 'S',
            Sight::Green => 'G',
            Sight::Red => 'R',
            Sight::Empty => '0',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Sight> {
        match symbol {
            'W' => Some(Sight::Wall),
            'S' => Some(Sight::Snake),
            'G' => Some(Sight::Green),
            'R' => Some(Sight::Red),
            '0' => Some(Sight::Empty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VisionError {
    #[error("unknown vision symbol '{symbol}' in the {direction} ray")]
    UnknownSymbol { symbol: char, direction: Direction },
    #[error("the {direction} ray must end with exactly one wall")]
    Unterminated { direction: Direction },
}

/// Rays cast from the head, indexed in `Direction::CLOCKWISE` order.
///
/// Each ray starts at the cell adjacent to the head and ends with the wall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vision {
    rays: [Vec<Sight>; 4],
}

impl Vision {
    pub fn new(rays: [Vec<Sight>; 4]) -> Self {
        Vision { rays }
    }

    /// Parses the four text rays in `Up, Right, Down, Left` order.
    pub fn from_strings(rays: [&str; 4]) -> Result<Self, VisionError> {
        let mut parsed: [Vec<Sight>; 4] = Default::default();
        for (slot, (direction, text)) in parsed
            .iter_mut()
            .zip(Direction::CLOCKWISE.into_iter().zip(rays))
        {
            for symbol in text.chars() {
                let sight = Sight::from_symbol(symbol)
                    .ok_or(VisionError::UnknownSymbol { symbol, direction })?;
                slot.push(sight);
            }
            let walls = slot.iter().filter(|s| **s == Sight::Wall).count();
            if walls != 1 || slot.last() != Some(&Sight::Wall) {
                return Err(VisionError::Unterminated { direction });
            }
        }
        Ok(Vision { rays: parsed })
    }

    pub fn ray(&self, direction: Direction) -> &[Sight] {
        &self.rays[direction.index()]
    }

    /// Rays paired with their direction, in `Direction::CLOCKWISE` order.
    pub fn rays(&self) -> impl Iterator<Item = (Direction, &[Sight])> {
        Direction::CLOCKWISE
            .into_iter()
            .zip(self.rays.iter().map(Vec::as_slice))
    }

    pub fn to_strings(&self) -> [String; 4] {
        self.rays
            .clone()
            .map(|ray| ray.into_iter().map(Sight::symbol).collect())
    }

    /// Draws the rays as a cross around the head `H`, up ray on top.
    pub fn render_cross(&self) -> String {
        let up = self.ray(Direction::Up);
        let right = self.ray(Direction::Right);
        let down = self.ray(Direction::Down);
        let left = self.ray(Direction::Left);
        let pad = " ".repeat(left.len());

        let mut out = String::new();
        for sight in up.iter().rev() {
            let _ = writeln!(out, "{pad}{}", sight.symbol());
        }
        left.iter().rev().for_each(|s| out.push(s.symbol()));
        out.push('H');
        right.iter().for_each(|s| out.push(s.symbol()));
        out.push('\n');
        for sight in down {
            let _ = writeln!(out, "{pad}{}", sight.symbol());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_strings_round_trip() {
        let rays = ["0GW", "SW", "00RW", "W"];
        let vision = Vision::from_strings(rays).unwrap();
        assert_eq!(vision.ray(Direction::Up), &[Sight::Empty, Sight::Green, Sight::Wall]);
        assert_eq!(vision.ray(Direction::Left), &[Sight::Wall]);
        assert_eq!(vision.to_strings(), rays.map(String::from));
    }

    #[test]
    fn test_from_strings_rejects_bad_rays() {
        assert!(matches!(
            Vision::from_strings(["0W", "W", "X", "W"]),
            Err(VisionError::UnknownSymbol { symbol: 'X', direction: Direction::Down })
        ));
        assert!(matches!(
            Vision::from_strings(["00", "W", "W", "W"]),
            Err(VisionError::Unterminated { direction: Direction::Up })
        ));
        assert!(Vision::from_strings(["WW", "W", "W", "W"]).is_err());
    }

    #[test]
    fn test_render_cross() {
        let vision = Vision::from_strings(["GW", "0W", "W", "SW"]).unwrap();
        let expected = "  W\n  G\nWSH0W\n  W\n";
        assert_eq!(vision.render_cross(), expected);
    }
}

//! Discrete features extracted from the head vision, and their packed table key.

use serde::{Deserialize, Serialize};

use crate::{
    Direction,
    vision::{Sight, Vision},
};

/// Bits reserved for each packed field.
const FIELD_BITS: u32 = 4;
const FIELD_MASK: u64 = (1 << FIELD_BITS) - 1;
/// Number of fields in the packed key.
pub const KEY_FIELDS: usize = 13;

/// Packed form of a [`State`], the identity used by the Q-table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(pub u64);

/// Distance of the first matching cell along a ray, quantised.
///
/// `None` maps to 0; offsets 0, 1–2, 3–6 and 7+ map to 1, 2, 3 and 4.
pub fn bucket(offset: Option<usize>) -> u8 {
    match offset {
        None => 0,
        Some(0) => 1,
        Some(1..=2) => 2,
        Some(3..=6) => 3,
        Some(_) => 4,
    }
}

fn first_offset(ray: &[Sight], target: Sight) -> Option<usize> {
    ray.iter().position(|sight| *sight == target)
}

/// Feature vector seen by the agent. Arrays are indexed in `Direction::CLOCKWISE` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct State {
    /// Minimum of the body and wall buckets. 0 when no body is visible, since an
    /// absent symbol buckets to 0.
    pub danger: [u8; 4],
    pub green: [u8; 4],
    pub red: [u8; 4],
    /// 1-based index of the first direction that sees a green apple, 0 if none.
    pub nearest_green_direction: u8,
    /// Bucket of the green apple in `nearest_green_direction`, 0 if none.
    pub nearest_green_distance: u8,
}

impl State {
    pub fn from_vision(vision: &Vision) -> Self {
        let mut state = State::default();
        for (direction, ray) in vision.rays() {
            let i = direction.index();
            let body = bucket(first_offset(ray, Sight::Snake));
            let wall = bucket(first_offset(ray, Sight::Wall));
            state.danger[i] = body.min(wall);
            state.green[i] = bucket(first_offset(ray, Sight::Green));
            state.red[i] = bucket(first_offset(ray, Sight::Red));
        }
        if let Some(i) = state.green.iter().position(|&g| g > 0) {
            state.nearest_green_direction = i as u8 + 1;
            state.nearest_green_distance = state.green[i];
        }
        state
    }

    /// Packs the 13 key fields, 4 bits each, first field in the highest bits.
    pub fn key(&self) -> StateKey {
        let fields = self
            .danger
            .iter()
            .chain(&self.green)
            .chain(&self.red)
            .chain(std::iter::once(&self.nearest_green_direction));
        let packed = fields.fold(0u64, |acc, &field| {
            (acc << FIELD_BITS) | (u64::from(field) & FIELD_MASK)
        });
        StateKey(packed)
    }

    /// Inverse of [`State::key`]. The nearest-green distance is recovered from the
    /// green bucket of the nearest-green direction.
    pub fn from_key(key: StateKey) -> Self {
        let mut fields = [0u8; KEY_FIELDS];
        for (i, field) in fields.iter_mut().enumerate() {
            let shift = FIELD_BITS * (KEY_FIELDS - 1 - i) as u32;
            *field = ((key.0 >> shift) & FIELD_MASK) as u8;
        }
        let mut state = State::default();
        state.danger.copy_from_slice(&fields[0..4]);
        state.green.copy_from_slice(&fields[4..8]);
        state.red.copy_from_slice(&fields[8..12]);
        state.nearest_green_direction = fields[12];
        state.nearest_green_distance = match fields[12] {
            0 => 0,
            d => state.green[usize::from(d - 1)],
        };
        state
    }

    /// Direction of the nearest-green code, `None` when no green is visible.
    pub fn nearest_green(&self) -> Option<Direction> {
        match self.nearest_green_direction {
            0 => None,
            d => Direction::CLOCKWISE.get(usize::from(d - 1)).copied(),
        }
    }
}

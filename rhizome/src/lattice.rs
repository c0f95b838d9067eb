//! Lattice coordinates and the fixed clockwise neighbor slots.
//!
//! Slot layout around a pixel `n`:
//!
//! ```text
//!   0   1   2
//!   7   n   3
//!   6   5   4
//! ```
//!
//! Even slots are diagonal, odd slots are orthogonal. Opposite slots differ
//! by 4.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Integer lattice coordinate. Ordering is row-major (`y` first), which is
/// the canonical processing order for every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub y: i32,
    pub x: i32,
}

impl Coord {
    #[inline]
    pub const fn new(y: i32, x: i32) -> Self {
        Self { y, x }
    }

    #[inline]
    pub fn step(self, direction: Direction) -> Self {
        let (dy, dx) = direction.offset();
        Self::new(self.y + dy, self.x + dx)
    }

    #[inline]
    pub fn chebyshev(self, other: Self) -> u32 {
        (self.y - other.y)
            .unsigned_abs()
            .max((self.x - other.x).unsigned_abs())
    }

    #[inline]
    pub fn distance_squared(self, other: Self) -> i64 {
        let dy = (self.y - other.y) as i64;
        let dx = (self.x - other.x) as i64;
        dy * dy + dx * dx
    }

    #[inline]
    pub fn distance(self, other: Self) -> f64 {
        (self.distance_squared(other) as f64).sqrt()
    }

    /// Position as a vector with `x` horizontal and `y` pointing down.
    #[inline]
    pub fn as_dvec2(self) -> DVec2 {
        DVec2::new(self.x as f64, self.y as f64)
    }
}

impl From<(i32, i32)> for Coord {
    fn from((y, x): (i32, i32)) -> Self {
        Self::new(y, x)
    }
}

/// One of the eight neighbor slots, numbered clockwise from north-west.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Direction {
    NorthWest = 0,
    North = 1,
    NorthEast = 2,
    East = 3,
    SouthEast = 4,
    South = 5,
    SouthWest = 6,
    West = 7,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::NorthWest,
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
    ];

    /// Half of the neighborhood facing south-east. Probing only these from
    /// every pixel visits each adjacent pair exactly once.
    pub const FORWARD: [Direction; 4] = [
        Direction::East,
        Direction::SouthWest,
        Direction::South,
        Direction::SouthEast,
    ];

    #[inline]
    pub const fn slot(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_slot(slot: usize) -> Self {
        Self::ALL[slot % 8]
    }

    #[inline]
    pub fn opposite(self) -> Self {
        Self::from_slot(self.slot() + 4)
    }

    #[inline]
    pub const fn is_diagonal(self) -> bool {
        (self as u8) % 2 == 0
    }

    /// `(dy, dx)` offset of the neighbor in this slot.
    #[inline]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::NorthWest => (-1, -1),
            Direction::North => (-1, 0),
            Direction::NorthEast => (-1, 1),
            Direction::East => (0, 1),
            Direction::SouthEast => (1, 1),
            Direction::South => (1, 0),
            Direction::SouthWest => (1, -1),
            Direction::West => (0, -1),
        }
    }

    /// Slot in which `to` sits relative to `from`, if they are adjacent.
    pub fn between(from: Coord, to: Coord) -> Option<Self> {
        let dy = to.y - from.y;
        let dx = to.x - from.x;
        Self::ALL.into_iter().find(|d| d.offset() == (dy, dx))
    }
}

/// Bit set of occupied neighbor slots (bit `k` = slot `k`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SlotMask(u8);

impl SlotMask {
    pub const EMPTY: SlotMask = SlotMask(0);
    pub const FULL: SlotMask = SlotMask(0xFF);

    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Builds a mask from literal slot indices.
    pub const fn from_slots(slots: &[u8]) -> Self {
        let mut bits = 0u8;
        let mut i = 0;
        while i < slots.len() {
            bits |= 1 << slots[i];
            i += 1;
        }
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn insert(&mut self, direction: Direction) {
        self.0 |= 1 << direction.slot();
    }

    #[inline]
    pub const fn contains(self, slot: usize) -> bool {
        self.0 & (1 << slot) != 0
    }

    #[inline]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Occupied slot indices in ascending order.
    pub fn slots(self) -> impl Iterator<Item = usize> {
        (0..8).filter(move |&slot| self.contains(slot))
    }

    /// Number of maximal circular runs of occupied slots. Slots 7 and 0 are
    /// adjacent, so `{7, 0, 1}` is a single run. A full ring is one run.
    pub fn run_count(self) -> u32 {
        match self.0 {
            0 => 0,
            0xFF => 1,
            bits => {
                // A run starts at every occupied slot whose predecessor is empty.
                let predecessor = bits.rotate_left(1);
                (bits & !predecessor).count_ones()
            }
        }
    }
}

//! Error types for root tracing.

use thiserror::Error;

use crate::lattice::Coord;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error returned by the tracing pipeline and configuration loaders.
#[derive(Debug, Error)]
pub enum Error {
    #[error("degenerate input: {0}")]
    InputDegenerate(#[from] DegenerateInput),

    #[error("structural invariant violated: {0}")]
    InvariantViolation(#[from] InvariantViolation),

    #[error("configuration value `{field}` is out of range ({value}): {reason}")]
    ConfigOutOfRange {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("failed to read configuration: {0}")]
    ConfigParse(#[from] common::SerdeFormatError),
}

impl Error {
    pub(crate) fn out_of_range(
        field: &'static str,
        value: impl std::fmt::Display,
        reason: &'static str,
    ) -> Self {
        Error::ConfigOutOfRange {
            field,
            value: value.to_string(),
            reason,
        }
    }
}

/// Inputs that cannot produce a skeleton.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DegenerateInput {
    #[error("grid has no area ({width}x{height})")]
    EmptyGrid { width: usize, height: usize },

    #[error("grid contains no foreground pixels")]
    EmptyField,

    #[error("no region reaches the minimum size of {min_size} pixels")]
    NoRegionLargeEnough { min_size: usize },

    #[error("no skeleton pixel found near seed {seed:?}")]
    NoSeedPixel { seed: Coord },

    #[error("thinning removed every pixel")]
    EmptySkeleton,
}

/// A broken structural guarantee. Always a bug in a stage, never bad input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("pixel {at:?} links {neighbor:?} in slot {slot} without a reciprocal link")]
    MissingReciprocal {
        at: Coord,
        neighbor: Coord,
        slot: usize,
    },

    #[error("pixel {at:?} links {neighbor:?} in slot {slot} but they are not adjacent")]
    NonAdjacentNeighbor {
        at: Coord,
        neighbor: Coord,
        slot: usize,
    },

    #[error("pixel {at:?} references removed pixel #{id}")]
    DanglingReference { at: Coord, id: u32 },

    #[error("parent/child link between {parent:?} and {child:?} is one-sided")]
    OneSidedTreeLink { parent: Coord, child: Coord },

    #[error("pixel {at:?} has {count} parents")]
    MultipleParents { at: Coord, count: usize },

    #[error("pixel {at:?} has no radius")]
    MissingRadius { at: Coord },

    #[error("radius changes from {from} to {to} between neighbors {a:?} and {b:?}")]
    RadiusDiscontinuity { a: Coord, b: Coord, from: u32, to: u32 },

    #[error("pixel chain starting at {start:?} loops back on itself")]
    TreeCycle { start: Coord },

    #[error("segment #{segment} does not exist")]
    UnknownSegment { segment: u32 },

    #[error("segment #{segment} is empty")]
    EmptySegment { segment: u32 },

    #[error("segment #{segment} starts at {start:?} but its parent has {expected:?} at index {index}")]
    SegmentDiscontinuity {
        segment: u32,
        start: Coord,
        expected: Coord,
        index: usize,
    },

    #[error("segment #{segment} names parent #{parent} which does not list it as a branch")]
    OrphanedSegment { segment: u32, parent: u32 },

    #[error("segment #{segment} is attached at index {index} of a {len}-pixel parent")]
    AttachmentOutOfBounds {
        segment: u32,
        index: usize,
        len: usize,
    },

    #[error("remaining lengths cannot be resolved for {pending} segments")]
    UnresolvedRemainingLength { pending: usize },
}

//! Right-angle neighborhood patterns left behind by thinning.
//!
//! A pixel whose occupied slots match one of these exactly is a redundant
//! corner: its neighbors stay connected without it.

use crate::lattice::SlotMask;

const L_SHAPES: [SlotMask; 4] = [
    SlotMask::from_slots(&[1, 3]),
    SlotMask::from_slots(&[3, 5]),
    SlotMask::from_slots(&[5, 7]),
    SlotMask::from_slots(&[1, 7]),
];

const T_SHAPES: [SlotMask; 4] = [
    SlotMask::from_slots(&[1, 3, 5]),
    SlotMask::from_slots(&[3, 5, 7]),
    SlotMask::from_slots(&[1, 5, 7]),
    SlotMask::from_slots(&[1, 3, 7]),
];

const Z_SHAPES: [SlotMask; 8] = [
    SlotMask::from_slots(&[0, 1, 3]),
    SlotMask::from_slots(&[0, 5, 7]),
    SlotMask::from_slots(&[1, 2, 7]),
    SlotMask::from_slots(&[1, 3, 4]),
    SlotMask::from_slots(&[1, 6, 7]),
    SlotMask::from_slots(&[2, 3, 5]),
    SlotMask::from_slots(&[3, 5, 6]),
    SlotMask::from_slots(&[4, 5, 7]),
];

const W_SHAPES: [SlotMask; 4] = [
    SlotMask::from_slots(&[0, 1, 3, 4]),
    SlotMask::from_slots(&[0, 4, 5, 7]),
    SlotMask::from_slots(&[1, 2, 6, 7]),
    SlotMask::from_slots(&[2, 3, 5, 6]),
];

/// Whether the occupied slots match a removable right-angle pattern.
pub fn is_right_angle(mask: SlotMask) -> bool {
    L_SHAPES
        .iter()
        .chain(&T_SHAPES)
        .chain(&Z_SHAPES)
        .chain(&W_SHAPES)
        .any(|&pattern| pattern == mask)
}

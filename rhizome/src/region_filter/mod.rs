//! Connected-component sizing and seed selection.
//!
//! Components below the size threshold are collected during classification
//! and removed in one batch afterwards, so the component BFS never reads
//! links that are being cleared underneath it.


use std::collections::VecDeque;

use crate::lattice::Coord;
use crate::pixel_field::{PixelField, PixelId, Relink};

/// Result of one region-filter pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionOutcome {
    /// One seed per surviving component, in discovery (canonical) order.
    pub seeds: Vec<Coord>,
    pub kept_regions: usize,
    pub removed_regions: usize,
    pub removed_pixels: usize,
}

/// Drops every 8-connected component smaller than `min_size` and records a
/// seed for each survivor. A survivor containing `preferred` is seeded there;
/// otherwise at its largest-radius pixel (lowest coordinate on ties).
pub fn filter_regions(
    field: &mut PixelField,
    min_size: usize,
    preferred: Option<Coord>,
) -> RegionOutcome {
    field.clear_visited();
    let preferred_id = preferred.and_then(|c| field.id_at(c));

    let mut outcome = RegionOutcome::default();
    let mut trash: Vec<PixelId> = Vec::new();
    let mut queue = VecDeque::new();
    let start_ids: Vec<PixelId> = field.ids().collect();

    for start in start_ids {
        if field[start].is_visited() {
            continue;
        }

        let mut members = Vec::new();
        field.set_visited(start, true);
        queue.push_back(start);
        while let Some(id) = queue.pop_front() {
            members.push(id);
            for neighbor in field[id].neighbor_slots().into_iter().flatten() {
                if !field[neighbor].is_visited() {
                    field.set_visited(neighbor, true);
                    queue.push_back(neighbor);
                }
            }
        }

        if members.len() < min_size {
            outcome.removed_regions += 1;
            trash.extend_from_slice(&members);
            continue;
        }

        let seed = match preferred_id {
            Some(p) if members.contains(&p) => p,
            _ => thickest(field, &members),
        };
        outcome.seeds.push(field[seed].coord());
        outcome.kept_regions += 1;
    }

    field.clear_visited();
    outcome.removed_pixels = field.remove_all(&trash, Relink::Discard);

    tracing::debug!(
        kept = outcome.kept_regions,
        removed = outcome.removed_regions,
        removed_pixels = outcome.removed_pixels,
        "Region filter"
    );
    outcome
}

fn thickest(field: &PixelField, members: &[PixelId]) -> PixelId {
    let mut best = members[0];
    for &id in &members[1..] {
        let candidate = &field[id];
        let current = &field[best];
        let (rc, rb) = (candidate.radius().unwrap_or(0), current.radius().unwrap_or(0));
        if rc > rb || (rc == rb && candidate.coord() < current.coord()) {
            best = id;
        }
    }
    best
}

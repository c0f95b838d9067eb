//! Medial-axis thinning and tree linking.
//!
//! Thinning walks radius layers from the boundary inward. Each layer is
//! classified against a snapshot of the field, then the pixels marked for
//! removal are re-checked and removed in canonical order. A pixel the
//! snapshot kept is never removed in that layer, which keeps the outcome
//! independent of removal order inside a layer.
//!
//! After thinning, redundant right-angle corners are removed and the surviving
//! pixels are linked into parent/child trees by BFS from the seeds.

mod patterns;
mod seed;


pub use patterns::is_right_angle;
pub use seed::{find_best_pixel, resolve_seeds};

use std::collections::VecDeque;

use crate::error::{InvariantViolation, Result};
use crate::lattice::{Coord, SlotMask};
use crate::pixel_field::{PixelField, PixelId, Relink};

/// Counts from one skeletonization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonOutcome {
    /// Seeds after re-resolution, deduplicated, in input order.
    pub seeds: Vec<PixelId>,
    pub thinned: usize,
    pub right_angles: usize,
    /// Skeleton pixels no seed reaches. They stay in the field but belong to
    /// no tree.
    pub unreached: usize,
}

/// Whether a pixel with these occupied slots must survive thinning.
///
/// More than one run of occupied slots means the pixel bridges otherwise
/// separate neighbors. A single neighbor is a line tip and survives only if
/// it is orthogonal.
pub fn is_skeletal(mask: SlotMask) -> bool {
    match mask.count() {
        0 => false,
        1 => mask.slots().all(|slot| slot % 2 == 1),
        _ => mask.run_count() > 1,
    }
}

/// Thins the field, removes right-angle corners, re-resolves `seeds` and links
/// trees from them.
pub fn skeletonize(field: &mut PixelField, seeds: &[Coord]) -> Result<SkeletonOutcome> {
    let thinned = thin(field)?;
    let right_angles = remove_right_angles(field);
    let seeds = resolve_seeds(field, seeds)?;
    let reached = link_trees(field, &seeds);
    let unreached = field.len() - reached;

    if unreached > 0 {
        tracing::debug!(unreached, "Skeleton pixels not reachable from any seed");
    }

    Ok(SkeletonOutcome {
        seeds,
        thinned,
        right_angles,
        unreached,
    })
}

/// Layered thinning. Returns the number of pixels removed.
pub fn thin(field: &mut PixelField) -> Result<usize> {
    let layers = radius_layers(field)?;
    let mut removed = 0;

    for layer in layers {
        let candidates: Vec<PixelId> = layer
            .into_iter()
            .filter(|&id| field.contains(id) && !is_skeletal(field.occupied(id)))
            .collect();
        for id in candidates {
            if !is_skeletal(field.occupied(id)) && field.remove(id, Relink::Discard) {
                removed += 1;
            }
        }
    }
    Ok(removed)
}

/// Removes pixels whose neighborhood is exactly a right-angle pattern, in
/// canonical order against the current state. Tree links are carried over.
pub fn remove_right_angles(field: &mut PixelField) -> usize {
    let ids: Vec<PixelId> = field.ids().collect();
    let mut removed = 0;
    for id in ids {
        if field.contains(id)
            && is_right_angle(field.occupied(id))
            && field.remove(id, Relink::Preserve)
        {
            removed += 1;
        }
    }
    removed
}

/// BFS from `seeds`, recording parent -> child the first time a pixel is
/// reached. Returns the number of pixels reached, seeds included.
pub fn link_trees(field: &mut PixelField, seeds: &[PixelId]) -> usize {
    let mut reached = vec![false; field.id_bound()];
    let mut frontier: Vec<PixelId> = Vec::with_capacity(seeds.len());
    for &seed in seeds {
        if field.contains(seed) && !reached[seed.index()] {
            reached[seed.index()] = true;
            frontier.push(seed);
        }
    }

    let mut count = frontier.len();
    let mut queue: VecDeque<PixelId> = VecDeque::new();
    while !frontier.is_empty() {
        frontier.sort_unstable_by_key(|&id| field[id].coord());
        queue.extend(frontier.drain(..));

        while let Some(id) = queue.pop_front() {
            for neighbor in field[id].neighbor_slots().into_iter().flatten() {
                if !reached[neighbor.index()] {
                    reached[neighbor.index()] = true;
                    field.add_tree_link(id, neighbor);
                    frontier.push(neighbor);
                    count += 1;
                }
            }
        }
    }
    count
}

fn radius_layers(field: &PixelField) -> Result<Vec<Vec<PixelId>>> {
    let mut layers: Vec<Vec<PixelId>> = Vec::new();
    for (id, pixel) in field.iter() {
        let radius = pixel
            .radius()
            .ok_or(InvariantViolation::MissingRadius { at: pixel.coord() })? as usize;
        if layers.len() <= radius {
            layers.resize_with(radius + 1, Vec::new);
        }
        layers[radius].push(id);
    }
    Ok(layers)
}

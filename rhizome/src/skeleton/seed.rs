//! Seed resolution: nearest surviving pixel, then a climb to a thicker one.

use crate::error::{DegenerateInput, Result};
use crate::lattice::Coord;
use crate::pixel_field::{PixelField, PixelId};

/// Live pixel in the first non-empty Chebyshev ring around `target`, then
/// hill-climbed along strictly larger radii.
///
/// A target outside the grid is first clamped onto it, so the search never
/// looks past the image. Within the first non-empty ring the smallest
/// Euclidean distance wins, ties by row-major order; a closer pixel in a
/// later ring is not considered. The climb prefers the largest radius, then
/// the lowest slot index.
pub fn find_best_pixel(field: &PixelField, target: Coord) -> Option<PixelId> {
    let start = nearest_pixel(field, target)?;
    Some(climb(field, start))
}

/// Resolves each coordinate to its best pixel and drops duplicates, keeping
/// the first occurrence.
pub fn resolve_seeds(field: &PixelField, coords: &[Coord]) -> Result<Vec<PixelId>> {
    if field.is_empty() {
        return Err(DegenerateInput::EmptySkeleton.into());
    }
    let mut seeds = Vec::with_capacity(coords.len());
    for &coord in coords {
        let id = find_best_pixel(field, coord).ok_or(DegenerateInput::NoSeedPixel { seed: coord })?;
        if !seeds.contains(&id) {
            seeds.push(id);
        } else {
            tracing::debug!(?coord, "Seed collapsed onto an existing seed");
        }
    }
    Ok(seeds)
}

fn nearest_pixel(field: &PixelField, target: Coord) -> Option<PixelId> {
    if field.is_empty() {
        return None;
    }
    let target = clamp_to_grid(field, target);
    let max_ring = max_ring(field, target);

    for r in 0..=max_ring as i32 {
        let mut best: Option<(i64, Coord, PixelId)> = None;
        let mut consider = |coord: Coord| {
            if let Some(id) = field.id_at(coord) {
                let d = coord.distance_squared(target);
                if best.is_none_or(|(bd, bc, _)| (d, coord) < (bd, bc)) {
                    best = Some((d, coord, id));
                }
            }
        };

        if r == 0 {
            consider(target);
        } else {
            for dx in -r..=r {
                consider(Coord::new(target.y - r, target.x + dx));
                consider(Coord::new(target.y + r, target.x + dx));
            }
            for dy in -r + 1..r {
                consider(Coord::new(target.y + dy, target.x - r));
                consider(Coord::new(target.y + dy, target.x + r));
            }
        }

        if let Some((_, _, id)) = best {
            return Some(id);
        }
    }
    None
}

fn clamp_to_grid(field: &PixelField, target: Coord) -> Coord {
    let max_y = field.height().max(1) as i32 - 1;
    let max_x = field.width().max(1) as i32 - 1;
    Coord::new(target.y.clamp(0, max_y), target.x.clamp(0, max_x))
}

// Ring radius that reaches every cell of the grid from `target`.
fn max_ring(field: &PixelField, target: Coord) -> u32 {
    let w = field.width().max(1) as i32 - 1;
    let h = field.height().max(1) as i32 - 1;
    [
        Coord::new(0, 0),
        Coord::new(0, w),
        Coord::new(h, 0),
        Coord::new(h, w),
    ]
    .into_iter()
    .map(|corner| corner.chebyshev(target))
    .max()
    .unwrap_or(0)
}

fn climb(field: &PixelField, start: PixelId) -> PixelId {
    let mut current = start;
    loop {
        let radius = field[current].radius().unwrap_or(0);
        let mut best: Option<(u32, PixelId)> = None;
        for (_, neighbor) in field[current].neighbors() {
            let r = field[neighbor].radius().unwrap_or(0);
            // Slots are visited in ascending order, so strict `>` keeps the lowest slot.
            if r > radius && best.is_none_or(|(br, _)| r > br) {
                best = Some((r, neighbor));
            }
        }
        match best {
            Some((_, next)) => current = next,
            None => return current,
        }
    }
}

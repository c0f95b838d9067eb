//! Grid cleanup applied before tracing.
//!
//! These work on an owned `Buffer2<f32>` before the pipeline starts, so the
//! median filter is free to process rows in parallel.

use common::Buffer2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const ROWS_PER_CHUNK: usize = 8;

/// Rectangle in fractions of the image size, each bound in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

/// Zeroes every value below `mean * multiplier`. Returns the threshold used.
pub fn threshold_at_mean(grid: &mut Buffer2<f32>, multiplier: f32) -> f32 {
    let threshold = grid.mean() * multiplier;
    for value in grid.iter_mut() {
        if *value < threshold {
            *value = 0.0;
        }
    }
    threshold
}

/// 3x3 median filter. Border cells use the in-bounds part of their
/// neighborhood; even-sized neighborhoods take the lower middle value so
/// isolated foreground specks along the border are dropped too.
pub fn median_filter_3x3(grid: &Buffer2<f32>) -> Buffer2<f32> {
    let width = grid.width();
    let height = grid.height();
    if width == 0 || height == 0 {
        return grid.clone();
    }

    let pixels = grid.pixels();
    let mut output = vec![0.0f32; width * height];

    output
        .par_chunks_mut(width * ROWS_PER_CHUNK)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let y_start = chunk_idx * ROWS_PER_CHUNK;
            for (local_y, row) in chunk.chunks_mut(width).enumerate() {
                let y = y_start + local_y;
                for (x, out) in row.iter_mut().enumerate() {
                    *out = median_at(pixels, width, height, x, y);
                }
            }
        });

    Buffer2::new(width, height, output)
}

fn median_at(pixels: &[f32], width: usize, height: usize, x: usize, y: usize) -> f32 {
    let mut neighbors = [0.0f32; 9];
    let mut count = 0;
    for ny in y.saturating_sub(1)..(y + 2).min(height) {
        let row_offset = ny * width;
        for nx in x.saturating_sub(1)..(x + 2).min(width) {
            neighbors[count] = pixels[row_offset + nx];
            count += 1;
        }
    }
    let values = &mut neighbors[..count];
    values.sort_unstable_by(f32::total_cmp);
    values[(count - 1) / 2]
}

/// Zeroes a border `ratio * height` pixels thick on all four sides.
pub fn mask_margins(grid: &mut Buffer2<f32>, ratio: f64) {
    let margin = (grid.height() as f64 * ratio.clamp(0.0, 0.5)).round() as usize;
    if margin == 0 {
        return;
    }
    let (width, height) = (grid.width(), grid.height());
    for y in 0..height {
        let row = grid.row_mut(y);
        if y < margin || y + margin >= height {
            row.fill(0.0);
        } else {
            row[..margin.min(width)].fill(0.0);
            row[width.saturating_sub(margin)..].fill(0.0);
        }
    }
}

/// Zeroes the cells inside `rect`, for example a ruler in the scan.
pub fn mask_rect(grid: &mut Buffer2<f32>, rect: NormalizedRect) {
    let (width, height) = (grid.width(), grid.height());
    let scale = |t: f64, extent: usize| ((t.clamp(0.0, 1.0) * extent as f64).round() as usize).min(extent);
    let (top, bottom) = (scale(rect.top, height), scale(rect.bottom, height));
    let (left, right) = (scale(rect.left, width), scale(rect.right, width));
    if left >= right {
        return;
    }
    for y in top..bottom {
        grid.row_mut(y)[left..right].fill(0.0);
    }
}

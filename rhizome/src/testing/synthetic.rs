//! Synthetic root-like shapes for tests.
//!
//! Grid builders paint foreground cells with [`FOREGROUND`] on a zeroed
//! `Buffer2<f32>`. [`SkeletonSketch`] builds an already-thinned pixel field
//! with explicit radii and tree links, for tests that start after thinning.

use std::ops::RangeInclusive;

use common::Buffer2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::lattice::Coord;
use crate::neighbor_graph;
use crate::pixel_field::PixelField;

pub const FOREGROUND: f32 = 1.0;

pub fn blank(width: usize, height: usize) -> Buffer2<f32> {
    Buffer2::new_filled(width, height, 0.0)
}

/// Paint coordinates, silently skipping the ones outside the grid.
pub fn paint(grid: &mut Buffer2<f32>, coords: impl IntoIterator<Item = Coord>) {
    for coord in coords {
        if grid.contains(coord.x as i64, coord.y as i64) {
            grid[(coord.x as usize, coord.y as usize)] = FOREGROUND;
        }
    }
}

pub fn horizontal_line(width: usize, height: usize, y: i32, xs: RangeInclusive<i32>) -> Buffer2<f32> {
    let mut grid = blank(width, height);
    paint(&mut grid, xs.map(|x| Coord::new(y, x)));
    grid
}

pub fn filled_rect(
    width: usize,
    height: usize,
    rows: RangeInclusive<i32>,
    cols: RangeInclusive<i32>,
) -> Buffer2<f32> {
    let mut grid = blank(width, height);
    paint_rect(&mut grid, rows, cols);
    grid
}

pub fn paint_rect(grid: &mut Buffer2<f32>, rows: RangeInclusive<i32>, cols: RangeInclusive<i32>) {
    for y in rows {
        paint(grid, cols.clone().map(|x| Coord::new(y, x)));
    }
}

pub fn paint_disk(grid: &mut Buffer2<f32>, center: Coord, radius: f64) {
    let r = radius.ceil() as i32;
    for dy in -r..=r {
        for dx in -r..=r {
            if ((dy * dy + dx * dx) as f64) <= radius * radius {
                paint(grid, [Coord::new(center.y + dy, center.x + dx)]);
            }
        }
    }
}

pub fn disk(width: usize, height: usize, center: Coord, radius: f64) -> Buffer2<f32> {
    let mut grid = blank(width, height);
    paint_disk(&mut grid, center, radius);
    grid
}

/// Parse an ASCII sketch: `#` is foreground, anything else background.
pub fn from_ascii(rows: &[&str]) -> Buffer2<f32> {
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut grid = blank(width, rows.len());
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.bytes().enumerate() {
            if ch == b'#' {
                grid[(x, y)] = FOREGROUND;
            }
        }
    }
    grid
}

pub fn field_from_ascii(rows: &[&str]) -> PixelField {
    PixelField::from_grid(&from_ascii(rows))
}

/// Random union of disks and thick strokes, deterministic per `seed`.
pub fn random_blobs(width: usize, height: usize, shapes: usize, seed: u64) -> Buffer2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut grid = blank(width, height);
    for _ in 0..shapes {
        let center = Coord::new(
            rng.random_range(0..height as i32),
            rng.random_range(0..width as i32),
        );
        if rng.random_bool(0.5) {
            paint_disk(&mut grid, center, rng.random_range(1.0..6.0));
        } else {
            let half = rng.random_range(0..3);
            let len = rng.random_range(4..20);
            if rng.random_bool(0.5) {
                paint_rect(
                    &mut grid,
                    center.y - half..=center.y + half,
                    center.x..=center.x + len,
                );
            } else {
                paint_rect(
                    &mut grid,
                    center.y..=center.y + len,
                    center.x - half..=center.x + half,
                );
            }
        }
    }
    grid
}

/// Hand-built skeleton with explicit radii and parent -> child links.
#[derive(Debug, Clone, Default)]
pub struct SkeletonSketch {
    points: Vec<(Coord, u32)>,
    links: Vec<(Coord, Coord)>,
}

impl SkeletonSketch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chain of pixels, each the child of the previous one. When
    /// `from` is given it becomes the parent of the first pixel.
    pub fn chain(
        &mut self,
        from: Option<Coord>,
        points: impl IntoIterator<Item = (Coord, u32)>,
    ) -> &mut Self {
        let mut previous = from;
        for (coord, radius) in points {
            self.points.push((coord, radius));
            if let Some(parent) = previous {
                self.links.push((parent, coord));
            }
            previous = Some(coord);
        }
        self
    }

    pub fn build(&self, width: usize, height: usize) -> PixelField {
        let mut field = PixelField::from_coords(width, height, self.points.iter().map(|p| p.0));
        neighbor_graph::link_neighbors(&mut field);
        for &(coord, radius) in &self.points {
            if let Some(id) = field.id_at(coord) {
                field.set_radius(id, radius);
            }
        }
        for &(parent, child) in &self.links {
            if let (Some(p), Some(c)) = (field.id_at(parent), field.id_at(child)) {
                field.add_tree_link(p, c);
            }
        }
        field
    }
}

/// Points of a horizontal run at row `y` with constant radius.
pub fn row_points(y: i32, xs: RangeInclusive<i32>, radius: u32) -> Vec<(Coord, u32)> {
    xs.map(|x| (Coord::new(y, x), radius)).collect()
}

/// Points of a vertical run at column `x` with constant radius.
pub fn column_points(x: i32, ys: RangeInclusive<i32>, radius: u32) -> Vec<(Coord, u32)> {
    ys.map(|y| (Coord::new(y, x), radius)).collect()
}

//! Nodule detection along assembled branches.
//!
//! Two strategies, selected by [`NoduleMethod`]:
//! - sliding window: a pixel is nodule-like when its radius stands out
//!   against the running mean of the last `target_length` radii along the
//!   branch, or against an absolute multiple of the system average radius;
//! - threshold: fixed per-segment and system-wide radius thresholds.
//!
//! Flagged pixels are collected into an explicit set and grouped into
//! 8-connected clusters on demand.

mod threshold;
mod window;


pub use window::{DEBOUNCE_HISTORY, RadiusWindow};

use std::collections::VecDeque;

use glam::DVec2;
use hashbrown::HashMap;
use serde::Serialize;

use crate::assembly::{RootForest, SystemTotals};
use crate::config::{NoduleConfig, NoduleMethod};
use crate::lattice::{Coord, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodulePixel {
    pub coord: Coord,
    pub radius: u32,
}

/// A connected group of nodule pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoduleCluster {
    pub pixels: Vec<Coord>,
    pub max_radius: u32,
    /// Mean position, `x` horizontal and `y` down.
    pub centroid: DVec2,
}

/// Flagged pixels in canonical coordinate order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NoduleSet {
    pixels: Vec<NodulePixel>,
}

impl NoduleSet {
    pub fn pixels(&self) -> &[NodulePixel] {
        &self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.pixels.binary_search_by_key(&coord, |p| p.coord).is_ok()
    }

    /// Groups pixels into 8-connected clusters, ordered by their first pixel.
    pub fn clusters(&self) -> Vec<NoduleCluster> {
        let index: HashMap<Coord, usize> = self
            .pixels
            .iter()
            .enumerate()
            .map(|(i, p)| (p.coord, i))
            .collect();
        let mut assigned = vec![false; self.pixels.len()];
        let mut clusters = Vec::new();
        let mut queue = VecDeque::new();

        for start in 0..self.pixels.len() {
            if assigned[start] {
                continue;
            }
            assigned[start] = true;
            queue.push_back(start);
            let mut members = Vec::new();
            while let Some(i) = queue.pop_front() {
                members.push(i);
                for direction in Direction::ALL {
                    if let Some(&j) = index.get(&self.pixels[i].coord.step(direction))
                        && !assigned[j]
                    {
                        assigned[j] = true;
                        queue.push_back(j);
                    }
                }
            }
            members.sort_unstable();

            let pixels: Vec<Coord> = members.iter().map(|&i| self.pixels[i].coord).collect();
            let max_radius = members.iter().map(|&i| self.pixels[i].radius).max().unwrap_or(0);
            let centroid = pixels.iter().map(|c| c.as_dvec2()).sum::<DVec2>() / pixels.len() as f64;
            clusters.push(NoduleCluster {
                pixels,
                max_radius,
                centroid,
            });
        }
        clusters
    }
}

/// Runs the configured detector over the forest.
pub fn find_nodules(forest: &RootForest, totals: SystemTotals, config: &NoduleConfig) -> NoduleSet {
    let flagged = match config.method {
        NoduleMethod::SlidingWindow => window::WindowScanner::new(config, totals).scan(forest),
        NoduleMethod::Threshold => threshold::scan(forest, totals, config),
    };

    let mut pixels: Vec<NodulePixel> = Vec::with_capacity(flagged.len());
    for segment in forest.iter() {
        for point in segment.points() {
            if flagged.contains(&point.id) {
                pixels.push(NodulePixel {
                    coord: point.coord,
                    radius: point.radius,
                });
            }
        }
    }
    // Branch pixels appear in both parent and child segments.
    pixels.sort_unstable_by_key(|p| p.coord);
    pixels.dedup_by_key(|p| p.coord);

    tracing::debug!(pixels = pixels.len(), method = ?config.method, "Nodule scan");
    NoduleSet { pixels }
}

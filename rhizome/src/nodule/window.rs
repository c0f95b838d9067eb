//! Sliding radius window scan along branches.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};

use crate::assembly::{RootForest, SegmentId, SystemTotals};
use crate::config::NoduleConfig;
use crate::pixel_field::PixelId;

/// Trailing flag history length used to debounce single-pixel spikes.
pub const DEBOUNCE_HISTORY: usize = 3;

/// Running mean over the most recent `capacity` radii.
#[derive(Debug, Clone)]
pub struct RadiusWindow {
    values: VecDeque<u32>,
    sum: u64,
    capacity: usize,
}

impl RadiusWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            sum: 0,
            capacity,
        }
    }

    pub fn push(&mut self, radius: u32) {
        if self.values.len() == self.capacity
            && let Some(oldest) = self.values.pop_front()
        {
            self.sum -= oldest as u64;
        }
        self.values.push_back(radius);
        self.sum += radius as u64;
    }

    pub fn average(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum as f64 / self.values.len() as f64
        }
    }
}

/// Commits flagged pixels only as part of a run of at least two.
#[derive(Debug, Clone, Default)]
struct Debounce {
    history: [bool; DEBOUNCE_HISTORY],
    pending: Vec<PixelId>,
}

impl Debounce {
    fn observe(&mut self, id: PixelId, flagged: bool, out: &mut HashSet<PixelId>) {
        if flagged {
            if self.history.iter().any(|&h| h) {
                out.extend(self.pending.drain(..));
                out.insert(id);
            } else {
                self.pending.push(id);
            }
        } else {
            self.pending.clear();
        }
        self.history.rotate_left(1);
        self.history[DEBOUNCE_HISTORY - 1] = flagged;
    }
}

pub(super) struct WindowScanner {
    target_length: usize,
    radius_multiplier: f64,
    min_local_threshold: f64,
    absolute_threshold: f64,
    min_child_pixels: usize,
}

impl WindowScanner {
    pub(super) fn new(config: &NoduleConfig, totals: SystemTotals) -> Self {
        let target_length = ((totals.total_length / config.window_divisor) as usize).max(config.min_window);
        Self {
            target_length,
            radius_multiplier: config.radius_multiplier,
            min_local_threshold: config.min_local_multiplier * totals.average_radius,
            absolute_threshold: config.absolute_multiplier * totals.average_radius,
            min_child_pixels: config.min_child_pixels,
        }
    }

    /// Scans every root and, through an explicit work stack, every child
    /// branch large enough to matter.
    pub(super) fn scan(&self, forest: &RootForest) -> HashSet<PixelId> {
        let mut flagged = HashSet::new();
        let mut stack: Vec<SegmentId> = forest.roots().iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let children = self.scan_segment(forest, id, &mut flagged);
            stack.extend(children.into_iter().rev());
        }
        flagged
    }

    // Returns the children to scan next, in attachment order.
    fn scan_segment(
        &self,
        forest: &RootForest,
        id: SegmentId,
        flagged: &mut HashSet<PixelId>,
    ) -> Vec<SegmentId> {
        let Some(segment) = forest.get(id) else {
            return Vec::new();
        };
        let mut branches: HashMap<usize, Vec<SegmentId>> = HashMap::new();
        for attachment in segment.attachments() {
            branches
                .entry(attachment.index)
                .or_default()
                .push(attachment.segment);
        }

        let mut window = RadiusWindow::new(self.target_length);
        let mut debounce = Debounce::default();
        let mut to_scan = Vec::new();

        for (index, point) in segment.points().iter().enumerate() {
            window.push(point.radius);

            let mut spun_off = false;
            if let Some(children) = branches.get(&index) {
                for &child in children {
                    if forest.get(child).is_some_and(|c| c.len() > self.min_child_pixels) {
                        spun_off = true;
                        to_scan.push(child);
                    }
                }
            }

            let local_threshold = (self.radius_multiplier * window.average()).max(self.min_local_threshold);
            let radius = point.radius as f64;
            let is_nodule = (radius > local_threshold && !spun_off) || radius > self.absolute_threshold;
            debounce.observe(point.id, is_nodule, flagged);
        }
        to_scan
    }
}

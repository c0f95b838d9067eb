use hashbrown::HashSet;

use crate::assembly::{RootForest, SystemTotals};
use crate::config::NoduleConfig;
use crate::pixel_field::PixelId;

/// Flags pixels thicker than a per-segment or system-wide threshold on every
/// segment with more than `significant_segment_pixels` points.
pub(super) fn scan(forest: &RootForest, totals: SystemTotals, config: &NoduleConfig) -> HashSet<PixelId> {
    let global_threshold = config.global_multiplier * totals.average_radius;
    let mut flagged = HashSet::new();

    for segment in forest.iter() {
        if segment.len() <= config.significant_segment_pixels {
            continue;
        }
        let local_threshold = (config.local_multiplier * segment.average_radius()).max(config.min_nodule_radius);
        for point in segment.points() {
            let radius = point.radius as f64;
            if radius > local_threshold || radius > global_threshold {
                flagged.insert(point.id);
            }
        }
    }
    flagged
}

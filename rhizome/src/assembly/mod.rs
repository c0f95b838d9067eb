//! Cutting the linked skeleton into segments and assembling branches.
//!
//! Stages, in order:
//! 1. [`build_segments`]: follow single-child chains from each seed, cutting at
//!    branch points.
//! 2. [`remove_short_segments`]: prune short leaf spurs, cascading upward.
//! 3. [`compute_remaining_lengths`]: bottom-up longest path below each segment.
//! 4. [`untangle`]: merge each segment with its best continuation.

mod forest;
mod segment;
mod untangle;

#[cfg(test)]
mod tests;

pub use forest::{RootForest, SystemTotals};
pub use segment::{
    Attachment, DIRECTION_SPAN, RADIUS_PIXEL_OFFSET, RADIUS_SPAN, Segment, SegmentId, SegmentStats,
    SkeletonPoint,
};
pub use untangle::{choose_continuation, untangle};

use std::collections::VecDeque;

use crate::config::BranchSelection;
use crate::error::{InvariantViolation, Result};
use crate::pixel_field::{PixelField, PixelId, Relink};

/// Counts from one assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyOutcome {
    pub initial_segments: usize,
    pub short_segments_removed: usize,
    pub merges: usize,
    pub final_segments: usize,
}

/// Runs segmentation, pruning, remaining-length computation and untangling.
/// Pixels of pruned segments are removed from `field`.
pub fn assemble(
    field: &mut PixelField,
    seeds: &[PixelId],
    short_segment_multiplier: f64,
    selection: BranchSelection,
) -> Result<(RootForest, AssemblyOutcome)> {
    let mut forest = build_segments(field, seeds)?;
    let initial_segments = forest.len();

    let short_segments_removed = remove_short_segments(field, &mut forest, short_segment_multiplier)?;
    compute_remaining_lengths(&mut forest)?;
    let merges = untangle(&mut forest, selection)?;
    finalize(&mut forest)?;

    let outcome = AssemblyOutcome {
        initial_segments,
        short_segments_removed,
        merges,
        final_segments: forest.len(),
    };
    Ok((forest, outcome))
}

/// Refreshes statistics and remaining lengths after structural changes.
pub fn finalize(forest: &mut RootForest) -> Result<()> {
    for segment in forest.iter_mut() {
        segment.invalidate();
    }
    compute_remaining_lengths(forest)
}

/// Cuts the tree rooted at each seed into segments. Child traces start with
/// the branch pixel, so a child's first point equals its parent's point at
/// the attachment index.
pub fn build_segments(field: &PixelField, seeds: &[PixelId]) -> Result<RootForest> {
    let mut forest = RootForest::new();
    let mut queue: VecDeque<(SegmentId, usize, PixelId, PixelId)> = VecDeque::new();

    for &seed in seeds {
        if !field.contains(seed) {
            continue;
        }
        let chain = trace_chain(field, vec![seed])?;
        let segment = forest.push(points_of(field, &chain)?, None)?;
        enqueue_children(field, &mut queue, segment, &chain);

        while let Some((parent, index, junction, child)) = queue.pop_front() {
            let chain = trace_chain(field, vec![junction, child])?;
            let segment = forest.push(points_of(field, &chain)?, Some((parent, index)))?;
            enqueue_children(field, &mut queue, segment, &chain);
        }
    }
    Ok(forest)
}

fn enqueue_children(
    field: &PixelField,
    queue: &mut VecDeque<(SegmentId, usize, PixelId, PixelId)>,
    segment: SegmentId,
    chain: &[PixelId],
) {
    let Some(&end) = chain.last() else {
        return;
    };
    let mut children = field[end].children().to_vec();
    if children.len() < 2 {
        return;
    }
    children.sort_unstable_by_key(|&c| field[c].coord());
    let index = chain.len() - 1;
    for child in children {
        queue.push_back((segment, index, end, child));
    }
}

// Extends `chain` along single children until a leaf or a branch point.
fn trace_chain(field: &PixelField, mut chain: Vec<PixelId>) -> Result<Vec<PixelId>> {
    let limit = field.len() + 1;
    loop {
        let Some(&end) = chain.last() else {
            return Ok(chain);
        };
        match field[end].children() {
            [next] => {
                chain.push(*next);
                if chain.len() > limit {
                    return Err(InvariantViolation::TreeCycle {
                        start: field[chain[0]].coord(),
                    }
                    .into());
                }
            }
            _ => return Ok(chain),
        }
    }
}

fn points_of(field: &PixelField, chain: &[PixelId]) -> Result<Vec<SkeletonPoint>> {
    chain
        .iter()
        .map(|&id| {
            let pixel = &field[id];
            let radius = pixel
                .radius()
                .ok_or(InvariantViolation::MissingRadius { at: pixel.coord() })?;
            Ok(SkeletonPoint {
                id,
                coord: pixel.coord(),
                radius,
            })
        })
        .collect()
}

/// Prunes leaf segments with fewer points than `multiplier` times the radius
/// of their first point. A parent left without attachments becomes a
/// candidate in turn. The shared branch pixel is never removed. Returns the
/// number of segments removed.
pub fn remove_short_segments(
    field: &mut PixelField,
    forest: &mut RootForest,
    multiplier: f64,
) -> Result<usize> {
    if multiplier <= 0.0 {
        return Ok(0);
    }

    let mut candidates: Vec<SegmentId> = forest
        .iter()
        .filter(|s| s.attachments().is_empty())
        .map(Segment::id)
        .collect();
    let mut removed = 0;

    while !candidates.is_empty() {
        let mut next = Vec::new();
        for id in candidates {
            let Some(segment) = forest.get(id) else {
                continue;
            };
            if segment.parent().is_none() || !segment.attachments().is_empty() {
                continue;
            }
            let first_radius = segment.first().map_or(0, |p| p.radius);
            if segment.len() as f64 >= multiplier * first_radius as f64 {
                continue;
            }

            let pixels: Vec<PixelId> = segment.points()[1..].iter().map(|p| p.id).collect();
            field.remove_all(&pixels, Relink::Preserve);
            removed += 1;

            if let Some(parent) = forest.remove_leaf(id)?
                && forest[parent].attachments().is_empty()
            {
                next.push(parent);
            }
        }
        candidates = next;
    }

    if removed > 0 {
        tracing::debug!(removed, "Pruned short leaf segments");
    }
    Ok(removed)
}

/// Bottom-up remaining lengths via a work list: a segment is finalized once
/// every child is, as its own length plus the longest child remaining length.
pub fn compute_remaining_lengths(forest: &mut RootForest) -> Result<()> {
    forest.refresh_stats();

    let mut work: Vec<SegmentId> = forest
        .iter()
        .filter(|s| s.attachments().is_empty())
        .map(Segment::id)
        .collect();

    while !work.is_empty() {
        let mut next = Vec::new();
        let mut progressed = false;

        for id in work {
            let segment = &forest[id];
            if segment.remaining_length().is_some() {
                continue;
            }
            let children: Option<Vec<f64>> = segment
                .attachments()
                .iter()
                .map(|a| forest.get(a.segment).and_then(Segment::remaining_length))
                .collect();
            let Some(children) = children else {
                next.push(id);
                continue;
            };

            let longest_child = children.into_iter().fold(0.0, f64::max);
            let parent = segment.parent();
            let remaining = segment.total_length() + longest_child;
            forest.get_mut(id)?.remaining_length = Some(remaining);
            progressed = true;
            if let Some(p) = parent {
                next.push(p);
            }
        }

        next.sort_unstable();
        next.dedup();
        if !progressed && !next.is_empty() {
            return Err(InvariantViolation::UnresolvedRemainingLength { pending: next.len() }.into());
        }
        work = next;
    }
    Ok(())
}

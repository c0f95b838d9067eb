//! Merging segments into continuous branches.

use std::collections::VecDeque;

use common::EPSILON;

use crate::config::BranchSelection;
use crate::error::Result;

use super::forest::RootForest;
use super::segment::SegmentId;

/// Repeatedly merges each segment with the child that best continues it
/// until the segment ends in a leaf. Children not chosen stay attached as side
/// branches and are untangled in turn. Returns the number of merges.
pub fn untangle(forest: &mut RootForest, selection: BranchSelection) -> Result<usize> {
    let mut queue: VecDeque<SegmentId> = forest.roots().iter().copied().collect();
    let mut merges = 0;

    while let Some(id) = queue.pop_front() {
        if !forest.contains(id) {
            continue;
        }
        loop {
            let mut candidates: Vec<SegmentId> = forest[id]
                .endpoint_attachments()
                .map(|a| a.segment)
                .collect();
            if candidates.is_empty() {
                break;
            }
            candidates.sort_unstable();

            let chosen = if candidates.len() == 1 {
                candidates[0]
            } else {
                choose_continuation(forest, id, &candidates, selection)
            };
            queue.extend(candidates.iter().copied().filter(|&c| c != chosen));

            forest.merge(id, chosen)?;
            merges += 1;
        }
    }

    tracing::debug!(merges, segments = forest.len(), "Untangled");
    Ok(merges)
}

struct Candidate {
    id: SegmentId,
    remaining: f64,
    score: f64,
}

/// Picks the continuation among `candidates` (sorted by id). Ties beyond both
/// criteria keep the lower id.
pub fn choose_continuation(
    forest: &RootForest,
    parent: SegmentId,
    candidates: &[SegmentId],
    selection: BranchSelection,
) -> SegmentId {
    let parent_segment = &forest[parent];
    let mut best: Option<Candidate> = None;

    for &id in candidates {
        let segment = &forest[id];
        let candidate = Candidate {
            id,
            remaining: segment
                .remaining_length()
                .unwrap_or_else(|| segment.total_length()),
            score: parent_segment.score_candidate(segment),
        };
        best = match best {
            Some(current) if !is_better(&candidate, &current, selection) => Some(current),
            _ => Some(candidate),
        };
    }
    best.map(|c| c.id).unwrap_or(candidates[0])
}

fn is_better(a: &Candidate, b: &Candidate, selection: BranchSelection) -> bool {
    let ((pa, pb), (sa, sb)) = match selection {
        BranchSelection::LongestRemaining => ((a.remaining, b.remaining), (a.score, b.score)),
        BranchSelection::Geometric => ((a.score, b.score), (a.remaining, b.remaining)),
    };
    if (pa - pb).abs() > EPSILON {
        return pa > pb;
    }
    if (sa - sb).abs() > EPSILON {
        return sa > sb;
    }
    false
}

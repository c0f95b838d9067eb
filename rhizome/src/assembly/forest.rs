//! Segment arena with attachment topology.

use crate::error::{InvariantViolation, Result};

use super::segment::{Attachment, Segment, SegmentId, SkeletonPoint};

/// Aggregate measures over every live segment.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct SystemTotals {
    pub total_length: f64,
    /// Length-weighted mean of segment average radii. Falls back to the plain
    /// mean when every segment has zero length.
    pub average_radius: f64,
}

/// All segments of a traced root system. Removed and merged segments leave
/// tombstones, so ids stay stable.
#[derive(Debug, Clone, Default)]
pub struct RootForest {
    segments: Vec<Option<Segment>>,
    roots: Vec<SegmentId>,
    live: usize,
}

impl RootForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a segment. With `parent = Some((p, index))` an attachment is
    /// recorded on `p` at `index`.
    pub(crate) fn push(
        &mut self,
        points: Vec<SkeletonPoint>,
        parent: Option<(SegmentId, usize)>,
    ) -> Result<SegmentId> {
        let id = SegmentId(self.segments.len() as u32);
        if points.is_empty() {
            return Err(InvariantViolation::EmptySegment { segment: id.raw() }.into());
        }
        match parent {
            Some((p, index)) => {
                let parent_segment = self.get_mut(p)?;
                parent_segment.attachments.push(Attachment { index, segment: id });
            }
            None => self.roots.push(id),
        }
        self.segments
            .push(Some(Segment::new(id, points, parent.map(|(p, _)| p))));
        self.live += 1;
        Ok(id)
    }

    /// Live segment count.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Segments without a parent, in creation order.
    #[inline]
    pub fn roots(&self) -> &[SegmentId] {
        &self.roots
    }

    #[inline]
    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn contains(&self, id: SegmentId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn get_mut(&mut self, id: SegmentId) -> Result<&mut Segment> {
        self.segments
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| InvariantViolation::UnknownSegment { segment: id.raw() }.into())
    }

    pub fn ids(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.iter().map(|s| s.id)
    }

    /// Live segments in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.segments.iter().flatten()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Segment> + '_ {
        self.segments.iter_mut().flatten()
    }

    /// Number of ancestors of `id`; 0 for a root.
    pub fn depth(&self, id: SegmentId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(Segment::parent);
        while let Some(p) = current {
            depth += 1;
            current = self.get(p).and_then(Segment::parent);
        }
        depth
    }

    /// Removes a childless segment and its attachment on the parent. Returns
    /// the parent.
    pub(crate) fn remove_leaf(&mut self, id: SegmentId) -> Result<Option<SegmentId>> {
        let segment = self
            .segments
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(InvariantViolation::UnknownSegment { segment: id.raw() })?;
        debug_assert!(segment.attachments.is_empty());
        self.live -= 1;

        match segment.parent {
            Some(p) => {
                let parent = self.get_mut(p)?;
                parent.attachments.retain(|a| a.segment != id);
            }
            None => self.roots.retain(|&r| r != id),
        }
        Ok(segment.parent)
    }

    /// Absorbs `child` into `parent`. The child must be attached at the
    /// parent's last point. Its points (minus the shared first one) are
    /// appended, its attachments move over with shifted indices and its
    /// children are re-parented.
    pub(crate) fn merge(&mut self, parent: SegmentId, child: SegmentId) -> Result<()> {
        let parent_len = self.get(parent).map(Segment::len).unwrap_or(0);
        let child_segment = self
            .get(child)
            .ok_or(InvariantViolation::UnknownSegment { segment: child.raw() })?;

        if child_segment.parent != Some(parent) {
            return Err(InvariantViolation::OrphanedSegment {
                segment: child.raw(),
                parent: parent.raw(),
            }
            .into());
        }
        let offset = parent_len.saturating_sub(1);
        let attached_at_end = self
            .get(parent)
            .is_some_and(|p| p.attachments.iter().any(|a| a.segment == child && a.index == offset));
        if !attached_at_end {
            return Err(InvariantViolation::AttachmentOutOfBounds {
                segment: child.raw(),
                index: offset,
                len: parent_len,
            }
            .into());
        }

        let child_segment = self.segments[child.index()]
            .take()
            .ok_or(InvariantViolation::UnknownSegment { segment: child.raw() })?;
        self.live -= 1;

        let parent_segment = self.get_mut(parent)?;
        parent_segment.attachments.retain(|a| a.segment != child);
        parent_segment
            .points
            .extend_from_slice(&child_segment.points[1..]);
        parent_segment
            .attachments
            .extend(child_segment.attachments.iter().map(|a| Attachment {
                index: a.index + offset,
                segment: a.segment,
            }));
        parent_segment.invalidate();

        for attachment in &child_segment.attachments {
            self.get_mut(attachment.segment)?.parent = Some(parent);
        }
        Ok(())
    }

    /// Caches statistics on every live segment.
    pub fn refresh_stats(&mut self) {
        for segment in self.iter_mut() {
            segment.refresh_stats();
        }
    }

    pub fn totals(&self) -> SystemTotals {
        let mut total_length = 0.0;
        let mut weighted = 0.0;
        let mut plain = 0.0;
        for segment in self.iter() {
            let stats = segment.stats();
            total_length += stats.total_length;
            weighted += stats.total_length * stats.average_radius;
            plain += stats.average_radius;
        }
        let average_radius = if total_length > 0.0 {
            weighted / total_length
        } else if self.live > 0 {
            plain / self.live as f64
        } else {
            0.0
        };
        SystemTotals {
            total_length,
            average_radius,
        }
    }

    /// Checks attachment bounds, back references and continuity: a child's
    /// first pixel is its parent's pixel at the attachment index.
    pub fn verify(&self) -> Result<()> {
        for segment in self.iter() {
            if segment.points.is_empty() {
                return Err(InvariantViolation::EmptySegment {
                    segment: segment.id.raw(),
                }
                .into());
            }

            for attachment in &segment.attachments {
                let child = self.get(attachment.segment).ok_or(InvariantViolation::UnknownSegment {
                    segment: attachment.segment.raw(),
                })?;
                if child.parent != Some(segment.id) {
                    return Err(InvariantViolation::OrphanedSegment {
                        segment: child.id.raw(),
                        parent: segment.id.raw(),
                    }
                    .into());
                }
                let Some(anchor) = segment.points.get(attachment.index) else {
                    return Err(InvariantViolation::AttachmentOutOfBounds {
                        segment: child.id.raw(),
                        index: attachment.index,
                        len: segment.points.len(),
                    }
                    .into());
                };
                let start = child.points[0];
                if start.id != anchor.id {
                    return Err(InvariantViolation::SegmentDiscontinuity {
                        segment: child.id.raw(),
                        start: start.coord,
                        expected: anchor.coord,
                        index: attachment.index,
                    }
                    .into());
                }
            }

            if let Some(p) = segment.parent {
                let parent = self.get(p).ok_or(InvariantViolation::UnknownSegment { segment: p.raw() })?;
                if !parent.attachments.iter().any(|a| a.segment == segment.id) {
                    return Err(InvariantViolation::OrphanedSegment {
                        segment: segment.id.raw(),
                        parent: p.raw(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

impl std::ops::Index<SegmentId> for RootForest {
    type Output = Segment;

    fn index(&self, id: SegmentId) -> &Segment {
        self.get(id)
            .unwrap_or_else(|| panic!("segment #{} was removed", id.0))
    }
}

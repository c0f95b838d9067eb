//! Root segments and their geometric measures.

use glam::DVec2;
use serde::Serialize;

use crate::lattice::Coord;
use crate::pixel_field::PixelId;

/// Radius is counted from the pixel center, so a measured radius `r` spans
/// `r + 0.5` pixels to the boundary edge.
pub const RADIUS_PIXEL_OFFSET: f64 = 0.5;

/// Number of points spanned by the end and start direction vectors.
pub const DIRECTION_SPAN: usize = 15;

/// Number of points averaged for radius continuity.
pub const RADIUS_SPAN: usize = 5;

const DIRECTION_WEIGHT: f64 = 0.8;
const RADIUS_WEIGHT: f64 = 0.2;
const RADIUS_PENALTY_PER_PIXEL: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SegmentId(pub(crate) u32);

impl SegmentId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkeletonPoint {
    #[serde(skip)]
    pub id: PixelId,
    pub coord: Coord,
    pub radius: u32,
}

/// A child segment attached at `index` of its parent's points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub index: usize,
    pub segment: SegmentId,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SegmentStats {
    /// Sum of Euclidean steps between consecutive points.
    pub total_length: f64,
    /// Mean of `radius + RADIUS_PIXEL_OFFSET` over all points.
    pub average_radius: f64,
}

impl SegmentStats {
    pub fn measure(points: &[SkeletonPoint]) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let total_length = points
            .windows(2)
            .map(|w| w[0].coord.distance(w[1].coord))
            .sum();
        let average_radius = points
            .iter()
            .map(|p| p.radius as f64 + RADIUS_PIXEL_OFFSET)
            .sum::<f64>()
            / points.len() as f64;
        Self {
            total_length,
            average_radius,
        }
    }
}

/// Ordered pixel run between branch points, or from a seed to a leaf.
#[derive(Debug, Clone)]
pub struct Segment {
    pub(crate) id: SegmentId,
    pub(crate) points: Vec<SkeletonPoint>,
    pub(crate) parent: Option<SegmentId>,
    pub(crate) attachments: Vec<Attachment>,
    pub(crate) stats: Option<SegmentStats>,
    pub(crate) remaining_length: Option<f64>,
}

impl Segment {
    pub(crate) fn new(id: SegmentId, points: Vec<SkeletonPoint>, parent: Option<SegmentId>) -> Self {
        Self {
            id,
            points,
            parent,
            attachments: Vec::new(),
            stats: None,
            remaining_length: None,
        }
    }

    #[inline]
    pub fn id(&self) -> SegmentId {
        self.id
    }

    #[inline]
    pub fn points(&self) -> &[SkeletonPoint] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn first(&self) -> Option<&SkeletonPoint> {
        self.points.first()
    }

    #[inline]
    pub fn last(&self) -> Option<&SkeletonPoint> {
        self.points.last()
    }

    #[inline]
    pub fn parent(&self) -> Option<SegmentId> {
        self.parent
    }

    #[inline]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Attachments sitting on the last point.
    pub fn endpoint_attachments(&self) -> impl Iterator<Item = &Attachment> + '_ {
        let last = self.points.len().saturating_sub(1);
        self.attachments.iter().filter(move |a| a.index == last)
    }

    /// Cached statistics, or freshly measured ones if the cache was invalidated.
    pub fn stats(&self) -> SegmentStats {
        self.stats
            .unwrap_or_else(|| SegmentStats::measure(&self.points))
    }

    pub fn total_length(&self) -> f64 {
        self.stats().total_length
    }

    pub fn average_radius(&self) -> f64 {
        self.stats().average_radius
    }

    /// Own length plus the longest remaining length among children. `None`
    /// until computed.
    #[inline]
    pub fn remaining_length(&self) -> Option<f64> {
        self.remaining_length
    }

    pub(crate) fn refresh_stats(&mut self) {
        self.stats = Some(SegmentStats::measure(&self.points));
    }

    pub(crate) fn invalidate(&mut self) {
        self.stats = None;
        self.remaining_length = None;
    }

    /// Direction of travel over the last points.
    pub fn end_direction(&self) -> Option<DVec2> {
        let n = self.points.len();
        if n < 2 {
            return None;
        }
        let from = self.points[n.saturating_sub(DIRECTION_SPAN)].coord;
        let to = self.points[n - 1].coord;
        Some(to.as_dvec2() - from.as_dvec2())
    }

    /// Direction of travel over the first points.
    pub fn start_direction(&self) -> Option<DVec2> {
        let n = self.points.len();
        if n < 2 {
            return None;
        }
        let from = self.points[0].coord;
        let to = self.points[(DIRECTION_SPAN - 1).min(n - 1)].coord;
        Some(to.as_dvec2() - from.as_dvec2())
    }

    fn end_radius(&self) -> f64 {
        let n = self.points.len();
        average_offset_radius(&self.points[n.saturating_sub(RADIUS_SPAN)..])
    }

    fn start_radius(&self) -> f64 {
        average_offset_radius(&self.points[..RADIUS_SPAN.min(self.points.len())])
    }

    /// How well `candidate` continues this segment, from 0 to 100.
    ///
    /// Weighted blend of direction agreement (cosine between this segment's
    /// end and the candidate's start) and radius continuity.
    pub fn score_candidate(&self, candidate: &Segment) -> f64 {
        let direction = match (self.end_direction(), candidate.start_direction()) {
            (Some(a), Some(b)) if a.length_squared() > 0.0 && b.length_squared() > 0.0 => {
                let cos = a.normalize().dot(b.normalize()).clamp(-1.0, 1.0);
                100.0 * (1.0 + cos) / 2.0
            }
            _ => 50.0,
        };
        let radius_delta = (self.end_radius() - candidate.start_radius()).abs();
        let radius = (100.0 - RADIUS_PENALTY_PER_PIXEL * radius_delta).max(0.0);

        DIRECTION_WEIGHT * direction + RADIUS_WEIGHT * radius
    }
}

fn average_offset_radius(points: &[SkeletonPoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points
        .iter()
        .map(|p| p.radius as f64 + RADIUS_PIXEL_OFFSET)
        .sum::<f64>()
        / points.len() as f64
}

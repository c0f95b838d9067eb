//! Aggregate measurements of a traced root system.

use serde::Serialize;
use strum_macros::Display;

use crate::assembly::SegmentId;
use crate::error::{Error, Result};
use crate::pipeline::RootSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    #[default]
    Pixels,
    Centimeters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchSummary {
    pub id: SegmentId,
    pub parent: Option<SegmentId>,
    /// Index into the parent's points where this branch starts.
    pub attach_index: Option<usize>,
    /// 0 for a main root.
    pub depth: usize,
    pub pixel_count: usize,
    pub length: f64,
    pub average_radius: f64,
}

/// Serializable report of one run. Lengths and radii are in `unit`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub unit: LengthUnit,
    pub total_length: f64,
    pub average_radius: f64,
    pub average_diameter: f64,
    pub branch_count: usize,
    pub seed_count: usize,
    pub nodule_pixel_count: usize,
    pub nodule_cluster_count: usize,
    pub branches: Vec<BranchSummary>,
}

impl Summary {
    pub(crate) fn new(system: &RootSystem) -> Self {
        let forest = system.forest();
        let totals = system.totals();

        let branches = forest
            .iter()
            .map(|segment| {
                let parent = segment.parent();
                let attach_index = parent.and_then(|p| {
                    forest.get(p).and_then(|ps| {
                        ps.attachments()
                            .iter()
                            .find(|a| a.segment == segment.id())
                            .map(|a| a.index)
                    })
                });
                BranchSummary {
                    id: segment.id(),
                    parent,
                    attach_index,
                    depth: forest.depth(segment.id()),
                    pixel_count: segment.len(),
                    length: segment.total_length(),
                    average_radius: segment.average_radius(),
                }
            })
            .collect();

        Self {
            unit: LengthUnit::Pixels,
            total_length: totals.total_length,
            average_radius: totals.average_radius,
            average_diameter: 2.0 * totals.average_radius,
            branch_count: forest.len(),
            seed_count: system.seeds().len(),
            nodule_pixel_count: system.nodules().len(),
            nodule_cluster_count: system.nodules().clusters().len(),
            branches,
        }
    }

    /// Converts lengths and radii from pixels. Counts are unchanged.
    pub fn to_centimeters(&self, pixels_per_cm: f64) -> Result<Summary> {
        if !(pixels_per_cm.is_finite() && pixels_per_cm > 0.0) {
            return Err(Error::out_of_range(
                "pixels_per_cm",
                pixels_per_cm,
                "must be positive and finite",
            ));
        }
        if self.unit == LengthUnit::Centimeters {
            return Ok(self.clone());
        }

        let scale = |v: f64| v / pixels_per_cm;
        Ok(Summary {
            unit: LengthUnit::Centimeters,
            total_length: scale(self.total_length),
            average_radius: scale(self.average_radius),
            average_diameter: scale(self.average_diameter),
            branches: self
                .branches
                .iter()
                .map(|b| BranchSummary {
                    length: scale(b.length),
                    average_radius: scale(b.average_radius),
                    ..b.clone()
                })
                .collect(),
            ..self.clone()
        })
    }
}

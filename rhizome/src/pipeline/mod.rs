//! End-to-end tracing pipeline.
//!
//! The stages run in a fixed order and each one takes ownership of the pixel
//! arena from the previous one. An optional [`StageObserver`] sees a
//! read-only snapshot after every stage.


use std::time::Instant;

use common::Buffer2;
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumIter};

use crate::assembly::{self, RootForest, SystemTotals};
use crate::config::Config;
use crate::error::{DegenerateInput, Result};
use crate::lattice::Coord;
use crate::neighbor_graph;
use crate::nodule::{self, NoduleSet};
use crate::pixel_field::{FieldChecks, PixelField, PixelId};
use crate::region_filter;
use crate::skeleton;
use crate::summary::Summary;

const LATTICE_CHECKS: FieldChecks = FieldChecks {
    radius_present: true,
    radius_continuity: true,
    tree_links: false,
};

const SKELETON_CHECKS: FieldChecks = FieldChecks {
    radius_present: true,
    radius_continuity: true,
    tree_links: true,
};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, AsRefStr, Serialize)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    PixelField,
    NeighborGraph,
    RegionFilter,
    Skeleton,
    Assembly,
    Nodules,
}

/// Per-stage counts from one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Foreground pixels in the input grid.
    pub initial_pixels: usize,
    /// Undirected neighbor links.
    pub neighbor_links: usize,
    pub max_radius: u32,
    pub kept_regions: usize,
    pub removed_regions: usize,
    /// Pixels removed with regions below the minimum size.
    pub region_pixels_removed: usize,
    /// Pixels removed by layered thinning.
    pub thinned: usize,
    /// Pixels removed by right-angle cleanup.
    pub right_angles: usize,
    /// Skeleton pixels no seed reaches.
    pub unreached: usize,
    pub seeds: usize,
    pub initial_segments: usize,
    pub short_segments_removed: usize,
    pub merges: usize,
    pub final_segments: usize,
    pub nodule_pixels: usize,
}

/// Read-only view of the pipeline state after a stage completes.
#[derive(Debug, Clone, Copy)]
pub struct StageSnapshot<'a> {
    pub stage: Stage,
    pub field: &'a PixelField,
    pub forest: Option<&'a RootForest>,
    pub diagnostics: &'a Diagnostics,
}

/// Receives a snapshot after each stage.
pub trait StageObserver {
    fn on_stage(&mut self, snapshot: &StageSnapshot<'_>);
}

impl<F> StageObserver for F
where
    F: FnMut(&StageSnapshot<'_>),
{
    fn on_stage(&mut self, snapshot: &StageSnapshot<'_>) {
        self(snapshot)
    }
}

struct IgnoreStages;

impl StageObserver for IgnoreStages {
    fn on_stage(&mut self, _snapshot: &StageSnapshot<'_>) {}
}

/// Result of a complete run.
#[derive(Debug, Clone)]
pub struct RootSystem {
    skeleton: PixelField,
    forest: RootForest,
    nodules: NoduleSet,
    totals: SystemTotals,
    seeds: Vec<Coord>,
    diagnostics: Diagnostics,
}

impl RootSystem {
    /// Skeleton pixels left after pruning, with their tree links.
    pub fn skeleton(&self) -> &PixelField {
        &self.skeleton
    }

    pub fn forest(&self) -> &RootForest {
        &self.forest
    }

    pub fn nodules(&self) -> &NoduleSet {
        &self.nodules
    }

    pub fn totals(&self) -> SystemTotals {
        self.totals
    }

    /// Tree roots, one per surviving region.
    pub fn seeds(&self) -> &[Coord] {
        &self.seeds
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn summary(&self) -> Summary {
        Summary::new(self)
    }
}

// =============================================================================
// Stage state
// =============================================================================

struct Lattice {
    field: PixelField,
}

struct Regions {
    field: PixelField,
    seeds: Vec<Coord>,
}

struct Skeleton {
    field: PixelField,
    seeds: Vec<PixelId>,
}

struct Assembled {
    field: PixelField,
    forest: RootForest,
}

// =============================================================================
// RootTracer
// =============================================================================

/// Runs the tracing pipeline with a validated configuration.
///
/// # Example
///
/// ```rust,ignore
/// use rhizome::{Config, RootTracer};
///
/// let tracer = RootTracer::from_config(Config::load("trace.yaml")?)?;
/// let system = tracer.trace(&grid)?;
/// println!("{} branches", system.forest().len());
/// ```
#[derive(Debug, Default)]
pub struct RootTracer {
    config: Config,
}

impl RootTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `config` once; every run reuses it unchanged.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn trace(&self, grid: &Buffer2<f32>) -> Result<RootSystem> {
        self.trace_with_observer(grid, &mut IgnoreStages)
    }

    pub fn trace_with_observer(
        &self,
        grid: &Buffer2<f32>,
        observer: &mut impl StageObserver,
    ) -> Result<RootSystem> {
        let started = Instant::now();
        let mut diagnostics = Diagnostics::default();

        let lattice = self.build_lattice(grid, &mut diagnostics, observer)?;
        let regions = self.filter_regions(lattice, grid, &mut diagnostics, observer)?;
        let skeleton = self.skeletonize(regions, &mut diagnostics, observer)?;
        let assembled = self.assemble(skeleton, &mut diagnostics, observer)?;

        let stage_start = Instant::now();
        let totals = assembled.forest.totals();
        let nodules = if self.config.nodules.enabled {
            nodule::find_nodules(&assembled.forest, totals, &self.config.nodules)
        } else {
            NoduleSet::default()
        };
        diagnostics.nodule_pixels = nodules.len();
        tracing::info!(
            pixels = nodules.len(),
            elapsed_ms = stage_start.elapsed().as_millis() as u64,
            "Nodule detection"
        );
        notify(observer, Stage::Nodules, &assembled.field, Some(&assembled.forest), &diagnostics);

        let seeds = assembled
            .forest
            .roots()
            .iter()
            .filter_map(|&r| assembled.forest.get(r).and_then(|s| s.first()).map(|p| p.coord))
            .collect();

        tracing::info!(
            segments = assembled.forest.len(),
            total_length = totals.total_length,
            average_radius = totals.average_radius,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Root system traced"
        );

        Ok(RootSystem {
            skeleton: assembled.field,
            forest: assembled.forest,
            nodules,
            totals,
            seeds,
            diagnostics,
        })
    }

    fn build_lattice(
        &self,
        grid: &Buffer2<f32>,
        diagnostics: &mut Diagnostics,
        observer: &mut impl StageObserver,
    ) -> Result<Lattice> {
        if grid.width() == 0 || grid.height() == 0 {
            return Err(DegenerateInput::EmptyGrid {
                width: grid.width(),
                height: grid.height(),
            }
            .into());
        }

        let stage_start = Instant::now();
        let mut field = PixelField::from_grid(grid);
        if field.is_empty() {
            return Err(DegenerateInput::EmptyField.into());
        }
        diagnostics.initial_pixels = field.len();
        self.check_field(&field, FieldChecks::default())?;
        tracing::info!(
            pixels = field.len(),
            width = grid.width(),
            height = grid.height(),
            elapsed_ms = stage_start.elapsed().as_millis() as u64,
            "Pixel field built"
        );
        notify(observer, Stage::PixelField, &field, None, diagnostics);

        let stage_start = Instant::now();
        let stats = neighbor_graph::build(&mut field);
        diagnostics.neighbor_links = stats.links;
        diagnostics.max_radius = stats.max_radius;
        self.check_field(&field, LATTICE_CHECKS)?;
        tracing::info!(
            links = stats.links,
            max_radius = stats.max_radius,
            elapsed_ms = stage_start.elapsed().as_millis() as u64,
            "Neighbor graph built"
        );
        notify(observer, Stage::NeighborGraph, &field, None, diagnostics);

        Ok(Lattice { field })
    }

    fn filter_regions(
        &self,
        lattice: Lattice,
        grid: &Buffer2<f32>,
        diagnostics: &mut Diagnostics,
        observer: &mut impl StageObserver,
    ) -> Result<Regions> {
        let stage_start = Instant::now();
        let Lattice { mut field } = lattice;

        let preferred = self
            .config
            .seed
            .resolve(grid.width(), grid.height())
            .and_then(|target| skeleton::find_best_pixel(&field, target))
            .map(|id| field[id].coord());
        let min_size = self.config.min_region_size.min_pixels(grid.height());

        let outcome = region_filter::filter_regions(&mut field, min_size, preferred);
        if outcome.seeds.is_empty() {
            return Err(DegenerateInput::NoRegionLargeEnough { min_size }.into());
        }
        if let Some(preferred) = preferred
            && !outcome.seeds.contains(&preferred)
        {
            tracing::warn!(
                seed = ?preferred,
                min_size,
                "Preferred seed lies in a region below the minimum size; dropped"
            );
        }

        diagnostics.kept_regions = outcome.kept_regions;
        diagnostics.removed_regions = outcome.removed_regions;
        diagnostics.region_pixels_removed = outcome.removed_pixels;
        self.check_field(&field, LATTICE_CHECKS)?;
        tracing::info!(
            kept = outcome.kept_regions,
            removed = outcome.removed_regions,
            removed_pixels = outcome.removed_pixels,
            min_size,
            elapsed_ms = stage_start.elapsed().as_millis() as u64,
            "Regions filtered"
        );
        notify(observer, Stage::RegionFilter, &field, None, diagnostics);

        Ok(Regions {
            field,
            seeds: outcome.seeds,
        })
    }

    fn skeletonize(
        &self,
        regions: Regions,
        diagnostics: &mut Diagnostics,
        observer: &mut impl StageObserver,
    ) -> Result<Skeleton> {
        let stage_start = Instant::now();
        let Regions { mut field, seeds } = regions;

        let outcome = skeleton::skeletonize(&mut field, &seeds)?;
        diagnostics.thinned = outcome.thinned;
        diagnostics.right_angles = outcome.right_angles;
        diagnostics.unreached = outcome.unreached;
        diagnostics.seeds = outcome.seeds.len();
        self.check_field(&field, SKELETON_CHECKS)?;
        tracing::info!(
            pixels = field.len(),
            thinned = outcome.thinned,
            right_angles = outcome.right_angles,
            unreached = outcome.unreached,
            seeds = outcome.seeds.len(),
            elapsed_ms = stage_start.elapsed().as_millis() as u64,
            "Skeleton extracted"
        );
        notify(observer, Stage::Skeleton, &field, None, diagnostics);

        Ok(Skeleton {
            field,
            seeds: outcome.seeds,
        })
    }

    fn assemble(
        &self,
        skeleton: Skeleton,
        diagnostics: &mut Diagnostics,
        observer: &mut impl StageObserver,
    ) -> Result<Assembled> {
        let stage_start = Instant::now();
        let Skeleton { mut field, seeds } = skeleton;

        let (forest, outcome) = assembly::assemble(
            &mut field,
            &seeds,
            self.config.short_segment_multiplier,
            self.config.branch_selection,
        )?;
        diagnostics.initial_segments = outcome.initial_segments;
        diagnostics.short_segments_removed = outcome.short_segments_removed;
        diagnostics.merges = outcome.merges;
        diagnostics.final_segments = outcome.final_segments;

        forest.verify()?;
        self.check_field(&field, SKELETON_CHECKS)?;
        tracing::info!(
            initial = outcome.initial_segments,
            pruned = outcome.short_segments_removed,
            merges = outcome.merges,
            segments = outcome.final_segments,
            elapsed_ms = stage_start.elapsed().as_millis() as u64,
            "Segments assembled"
        );
        notify(observer, Stage::Assembly, &field, Some(&forest), diagnostics);

        Ok(Assembled { field, forest })
    }

    fn check_field(&self, field: &PixelField, checks: FieldChecks) -> Result<()> {
        if self.config.verify_invariants {
            field.verify(checks)?;
        }
        Ok(())
    }
}

fn notify(
    observer: &mut impl StageObserver,
    stage: Stage,
    field: &PixelField,
    forest: Option<&RootForest>,
    diagnostics: &Diagnostics,
) {
    tracing::debug!(%stage, "Stage complete");
    observer.on_stage(&StageSnapshot {
        stage,
        field,
        forest,
        diagnostics,
    });
}

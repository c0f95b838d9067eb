//! Rhizome - root-system reconstruction from thresholded scans.
//!
//! Turns a 2D grid of foreground intensities into a forest of root branches
//! with radii, lengths and nodule annotations:
//! - 8-connected pixel lattice with per-pixel distance-to-edge radii
//! - connected-region filtering and seeding
//! - layered medial-axis thinning and tree linking
//! - segmentation, short-branch pruning and untangling into branches
//! - nodule detection along each branch
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use rhizome::{Config, RootTracer, preprocess};
//!
//! let mut grid = load_scan("roots.png")?;
//! preprocess::threshold_at_mean(&mut grid, 1.0);
//! let grid = preprocess::median_filter_3x3(&grid);
//!
//! let tracer = RootTracer::from_config(Config::load("trace.yaml")?)?;
//! let system = tracer.trace(&grid)?;
//! let summary = system.summary().to_centimeters(118.0)?;
//! println!("{:.1} cm in {} branches", summary.total_length, summary.branch_count);
//! ```

mod config;
mod error;
mod lattice;
mod summary;

pub mod assembly;
pub mod neighbor_graph;
pub mod nodule;
pub mod pipeline;
pub mod pixel_field;
pub mod preprocess;
pub mod region_filter;
pub mod skeleton;

#[cfg(test)]
pub mod testing;

// ============================================================================
// Errors and configuration
// ============================================================================

pub use config::{BranchSelection, Config, NoduleConfig, NoduleMethod, RegionSize, SeedPoint};
pub use error::{DegenerateInput, Error, InvariantViolation, Result};

// ============================================================================
// Lattice and pixel arena
// ============================================================================

pub use lattice::{Coord, Direction, SlotMask};
pub use pixel_field::{FieldChecks, Pixel, PixelField, PixelId, Relink};

// ============================================================================
// Results
// ============================================================================

pub use assembly::{Attachment, RootForest, Segment, SegmentId, SkeletonPoint, SystemTotals};
pub use nodule::{NoduleCluster, NodulePixel, NoduleSet};
pub use summary::{BranchSummary, LengthUnit, Summary};

// ============================================================================
// Pipeline
// ============================================================================

pub use pipeline::{Diagnostics, RootSystem, RootTracer, Stage, StageObserver, StageSnapshot};

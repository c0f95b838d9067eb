//! Configuration for root tracing.
//!
//! [`Config`] is a flat struct whose fields are grouped by pipeline stage.
//! Every field has a tuned default, so a YAML or JSON file only needs to name
//! the values it overrides.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lattice::Coord;

// ============================================================================
// Enums
// ============================================================================

/// Where the user-supplied root seed lies.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeedPoint {
    /// No click point. Every surviving region seeds itself at its thickest pixel.
    #[default]
    None,
    /// Pixel coordinate.
    Absolute { y: i32, x: i32 },
    /// Fractions of the image height and width, each in `[0, 1]`.
    Normalized { y: f64, x: f64 },
}

impl SeedPoint {
    /// Lattice coordinate of the seed for a grid of the given size.
    pub fn resolve(&self, width: usize, height: usize) -> Option<Coord> {
        match *self {
            SeedPoint::None => None,
            SeedPoint::Absolute { y, x } => Some(Coord::new(y, x)),
            SeedPoint::Normalized { y, x } => {
                let scale = |t: f64, extent: usize| {
                    let max = extent.saturating_sub(1) as f64;
                    (t * max).round() as i32
                };
                Some(Coord::new(scale(y, height), scale(x, width)))
            }
        }
    }
}

/// Minimum connected-component size that survives region filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSize {
    Pixels(usize),
    /// Fraction of the image height, in `(0, 1]`.
    HeightFraction(f64),
}

impl Default for RegionSize {
    fn default() -> Self {
        RegionSize::HeightFraction(0.07)
    }
}

impl RegionSize {
    pub fn min_pixels(&self, height: usize) -> usize {
        match *self {
            RegionSize::Pixels(n) => n,
            RegionSize::HeightFraction(f) => ((height as f64 * f) as usize).max(1),
        }
    }
}

/// How untangling picks the child that continues a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchSelection {
    /// Longest remaining length wins, geometric score breaks ties.
    #[default]
    LongestRemaining,
    /// Best direction and radius continuity wins, remaining length breaks ties.
    Geometric,
}

/// Nodule detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoduleMethod {
    /// Sliding radius window along each branch.
    #[default]
    SlidingWindow,
    /// Fixed thresholds against segment and system average radius.
    Threshold,
}

// ============================================================================
// Nodule configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoduleConfig {
    pub enabled: bool,
    pub method: NoduleMethod,

    // -- Sliding window --
    /// Window length is total root length divided by this.
    pub window_divisor: f64,
    /// Smallest window length in pixels.
    pub min_window: usize,
    /// Flag a pixel whose radius exceeds this multiple of the window average.
    pub radius_multiplier: f64,
    /// Floor of the local threshold, as a multiple of the system average radius.
    pub min_local_multiplier: f64,
    /// Flag any pixel whose radius exceeds this multiple of the system average.
    pub absolute_multiplier: f64,
    /// Child branches with at most this many pixels are not scanned.
    pub min_child_pixels: usize,

    // -- Threshold --
    /// Segment-local threshold multiplier.
    pub local_multiplier: f64,
    /// Global threshold multiplier.
    pub global_multiplier: f64,
    /// Floor of the segment-local threshold, in pixels.
    pub min_nodule_radius: f64,
    /// Segments with at most this many pixels are skipped.
    pub significant_segment_pixels: usize,
}

impl Default for NoduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            method: NoduleMethod::SlidingWindow,
            window_divisor: 550.0,
            min_window: 25,
            radius_multiplier: 2.5,
            min_local_multiplier: 1.5,
            absolute_multiplier: 5.0,
            min_child_pixels: 2,
            local_multiplier: 1.5,
            global_multiplier: 10.0,
            min_nodule_radius: 12.0,
            significant_segment_pixels: 7,
        }
    }
}

impl NoduleConfig {
    pub fn validate(&self) -> Result<()> {
        positive_finite("nodules.window_divisor", self.window_divisor)?;
        if self.min_window == 0 {
            return Err(Error::out_of_range("nodules.min_window", 0, "must be at least 1"));
        }
        above_one("nodules.radius_multiplier", self.radius_multiplier)?;
        non_negative_finite("nodules.min_local_multiplier", self.min_local_multiplier)?;
        above_one("nodules.absolute_multiplier", self.absolute_multiplier)?;
        above_one("nodules.local_multiplier", self.local_multiplier)?;
        above_one("nodules.global_multiplier", self.global_multiplier)?;
        non_negative_finite("nodules.min_nodule_radius", self.min_nodule_radius)?;
        Ok(())
    }
}

// ============================================================================
// Main configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // -- Seeding --
    pub seed: SeedPoint,

    // -- Region filtering --
    pub min_region_size: RegionSize,

    // -- Assembly --
    /// Leaf segments shorter than this multiple of their first pixel's radius
    /// are pruned. Zero disables pruning.
    pub short_segment_multiplier: f64,
    pub branch_selection: BranchSelection,

    // -- Nodules --
    pub nodules: NoduleConfig,

    // -- Diagnostics --
    /// Check pixel-field invariants between stages. The segment forest is
    /// always verified after assembly.
    pub verify_invariants: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: SeedPoint::None,
            min_region_size: RegionSize::default(),
            short_segment_multiplier: 1.0,
            branch_selection: BranchSelection::LongestRemaining,
            nodules: NoduleConfig::default(),
            verify_invariants: true,
        }
    }
}

impl Config {
    /// Rejects values that would make a stage meaningless.
    pub fn validate(&self) -> Result<()> {
        match self.seed {
            SeedPoint::Normalized { y, x } => {
                unit_interval("seed.y", y)?;
                unit_interval("seed.x", x)?;
            }
            SeedPoint::Absolute { y, x } => {
                if y < 0 {
                    return Err(Error::out_of_range("seed.y", y, "must not be negative"));
                }
                if x < 0 {
                    return Err(Error::out_of_range("seed.x", x, "must not be negative"));
                }
            }
            SeedPoint::None => {}
        }

        match self.min_region_size {
            RegionSize::Pixels(0) => {
                return Err(Error::out_of_range("min_region_size", 0, "must be at least 1 pixel"));
            }
            RegionSize::Pixels(_) => {}
            RegionSize::HeightFraction(f) => {
                if !(f > 0.0 && f <= 1.0) {
                    return Err(Error::out_of_range(
                        "min_region_size",
                        f,
                        "height fraction must be in (0, 1]",
                    ));
                }
            }
        }

        non_negative_finite("short_segment_multiplier", self.short_segment_multiplier)?;
        self.nodules.validate()
    }

    /// Parses and validates a configuration document.
    pub fn from_str(text: &str, format: common::SerdeFormat) -> Result<Self> {
        let config: Config = common::deserialize(text, format)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a YAML or JSON file, chosen by extension.
    pub fn load(path: &str) -> Result<Self> {
        let config: Config = common::load_file(path)?;
        config.validate()?;
        Ok(config)
    }
}

fn positive_finite(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::out_of_range(field, value, "must be positive and finite"))
    }
}

fn non_negative_finite(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::out_of_range(field, value, "must be non-negative and finite"))
    }
}

// A multiplier at or below one flags roughly every pixel.
fn above_one(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 1.0 {
        Ok(())
    } else {
        Err(Error::out_of_range(field, value, "must be finite and greater than 1"))
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::out_of_range(field, value, "must be in [0, 1]"))
    }
}

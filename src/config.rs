//! Configuration constants and conversion options.

use serde::{Deserialize, Serialize};

use crate::model::Stock;

/// Floating-point comparison epsilon.
pub const EPS: f64 = 0.0001;

/// Maximum disagreement between an `R` word and the radius implied by the
/// arc offsets before the arc is rejected.
pub const ARC_RADIUS_TOLERANCE: f64 = 0.002;

/// Default maximum chordal deviation for arc segmentation, in program units.
pub const DEFAULT_ARC_TOLERANCE: f64 = 0.01;

/// Minimum number of linear segments an arc is split into.
pub const MIN_ARC_SEGMENTS: usize = 2;

/// Upper bound on segments per arc.
pub const MAX_ARC_SEGMENTS: usize = 100_000;

/// Default stock diameter in mm.
pub const DEFAULT_STOCK_DIAMETER: f64 = 25.0;

/// Overlap factor used when the working diameter is not adjusted.
pub const DEFAULT_OVERLAP_FACTOR: f64 = 1.0;

/// Overlap factor for indexed passes.
pub const DEFAULT_PASS_OVERLAP_FACTOR: f64 = 0.8;

/// Retract height used between indexed passes.
pub const DEFAULT_SAFE_Z: f64 = 5.0;

/// Spindle speed restored after each index.
pub const DEFAULT_SPINDLE_RPM: f64 = 12000.0;

/// Decimal places written for angles and feeds.
pub const DEFAULT_ANGLE_PRECISION: usize = 4;

/// Largest accepted angle precision.
pub const MAX_ANGLE_PRECISION: usize = 9;

/// Conversion factor: mm to inch.
pub const CONV_MM_INCH: f64 = 25.4;

/// Unit of measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Unit {
    #[default]
    #[value(name = "mm")]
    Millimeters,
    #[value(name = "inch")]
    Inches,
}

impl Unit {
    /// Get the conversion factor to convert from this unit to millimeters.
    pub fn to_mm_factor(&self) -> f64 {
        match self {
            Unit::Millimeters => 1.0,
            Unit::Inches => CONV_MM_INCH,
        }
    }

    /// Convert a length expressed in this unit into `target`.
    pub fn convert(&self, value: f64, target: Unit) -> f64 {
        if *self == target {
            value
        } else {
            value * self.to_mm_factor() / target.to_mm_factor()
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unit::Millimeters => write!(f, "mm"),
            Unit::Inches => write!(f, "inch"),
        }
    }
}

/// How the overlap factor enters the linear-to-angular mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapMode {
    /// Effective diameter is `diameter × overlap`.
    #[default]
    WorkingDiameter,
    /// Diameter is used as-is; the overlap scales the pass width
    /// (`tool_diameter × overlap`) which sets the pitch between repeated passes.
    IndexedPasses,
}

impl OverlapMode {
    /// Overlap factor applied when none is given.
    pub fn default_factor(&self) -> f64 {
        match self {
            OverlapMode::WorkingDiameter => DEFAULT_OVERLAP_FACTOR,
            OverlapMode::IndexedPasses => DEFAULT_PASS_OVERLAP_FACTOR,
        }
    }
}

impl std::fmt::Display for OverlapMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlapMode::WorkingDiameter => write!(f, "working-diameter"),
            OverlapMode::IndexedPasses => write!(f, "indexed-passes"),
        }
    }
}

/// Arc reprojection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ArcMode {
    /// Split arcs into linear segments within the chordal tolerance.
    #[default]
    Segment,
    /// Refuse arcs with an unsupported-geometry error.
    Reject,
}

/// Behaviour of the rotary coordinate past one revolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum WrapMode {
    /// Angles accumulate without bound.
    #[default]
    Unbounded,
    /// The axis is rebased into `[0, 360)` with `G92` before moves that
    /// start outside that range.
    Modulo,
}

/// How linear feed rates are rewritten for the rotary axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FeedScaling {
    /// `feed × degrees_per_unit` (degrees per minute).
    #[default]
    Scaled,
    /// Scale by the ratio of output to input vector length, for controllers
    /// that apply F to the combined move of all axes.
    Blended,
    /// Emit `G93` and an inverse-time F on every feed move.
    InverseTime,
}

/// How per-line errors are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReportingPolicy {
    /// Collect every error and report them together.
    #[default]
    Batch,
    /// Abort at the first error.
    Strict,
}

/// Target rotary axis letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum RotaryAxis {
    #[default]
    A,
    B,
    C,
    /// GRBL machines with the rotary driver wired to Y.
    Y,
}

impl RotaryAxis {
    /// Word letter written in the output.
    pub fn letter(&self) -> char {
        match self {
            RotaryAxis::A => 'A',
            RotaryAxis::B => 'B',
            RotaryAxis::C => 'C',
            RotaryAxis::Y => 'Y',
        }
    }
}

/// Output line numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Numbering {
    /// Keep the `N` words of the input where present.
    #[default]
    Preserve,
    /// Number every command line from `start` in steps of `increment`.
    Renumber { start: u32, increment: u32 },
}

/// Full set of options for one conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Stock being machined.
    pub stock: Stock,
    /// Arc reprojection strategy.
    pub arcs: ArcMode,
    /// Maximum chordal deviation for arc segmentation.
    pub arc_tolerance: f64,
    /// Wrap behaviour of the rotary coordinate.
    pub wrap: WrapMode,
    /// Feed rewriting.
    pub feed: FeedScaling,
    /// Rotary axis letter.
    pub axis: RotaryAxis,
    /// Batch or strict error reporting.
    pub policy: ReportingPolicy,
    /// Decimal places for angles and feeds.
    pub angle_precision: usize,
    /// Write the explanatory header comments.
    pub header: bool,
    /// Output line numbering.
    pub numbering: Numbering,
    /// Retract height between indexed passes.
    pub safe_z: f64,
    /// Spindle speed restored after each index.
    pub spindle_rpm: f64,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            stock: Stock::default(),
            arcs: ArcMode::default(),
            arc_tolerance: DEFAULT_ARC_TOLERANCE,
            wrap: WrapMode::default(),
            feed: FeedScaling::default(),
            axis: RotaryAxis::default(),
            policy: ReportingPolicy::default(),
            angle_precision: DEFAULT_ANGLE_PRECISION,
            header: true,
            numbering: Numbering::default(),
            safe_z: DEFAULT_SAFE_Z,
            spindle_rpm: DEFAULT_SPINDLE_RPM,
        }
    }
}

impl ConvertOptions {
    /// Options for a stock of the given diameter, everything else default.
    pub fn with_diameter(diameter: f64) -> Self {
        Self {
            stock: Stock::new(diameter),
            ..Default::default()
        }
    }

    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &std::path::Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Utility functions for floating-point comparisons.
pub mod float_cmp {
    use super::EPS;

    /// Check if two floats are approximately equal.
    #[inline]
    pub fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    /// Check if a float is approximately zero.
    #[inline]
    pub fn approx_zero(a: f64) -> bool {
        a.abs() < EPS
    }
}

/// Utility functions for angle operations.
pub mod angle {
    /// Normalize angle to 0-360 range (exclusive of 360).
    #[inline]
    pub fn normalize_degrees(angle: f64) -> f64 {
        let mut a = angle % 360.0;
        if a < 0.0 {
            a += 360.0;
        }
        // Handle 360.0 and -0.0 cases
        if a >= 360.0 || a == 0.0 {
            a = 0.0;
        }
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_convert() {
        assert_eq!(Unit::Millimeters.convert(25.4, Unit::Millimeters), 25.4);
        assert!(float_cmp::approx_eq(Unit::Millimeters.convert(25.4, Unit::Inches), 1.0));
        assert!(float_cmp::approx_eq(Unit::Inches.convert(2.0, Unit::Millimeters), 50.8));
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(angle::normalize_degrees(0.0), 0.0);
        assert_eq!(angle::normalize_degrees(360.0), 0.0);
        assert_eq!(angle::normalize_degrees(-90.0), 270.0);
        assert_eq!(angle::normalize_degrees(725.0), 5.0);
        assert_eq!(angle::normalize_degrees(-0.0), 0.0);
    }

    #[test]
    fn test_overlap_default_factor() {
        assert_eq!(OverlapMode::WorkingDiameter.default_factor(), 1.0);
        assert_eq!(OverlapMode::IndexedPasses.default_factor(), 0.8);
    }

    #[test]
    fn test_options_partial_json() {
        let options: ConvertOptions =
            serde_json::from_str(r#"{"stock": {"diameter": 40.0}, "wrap": "modulo"}"#).unwrap();
        assert_eq!(options.stock.diameter, 40.0);
        assert_eq!(options.stock.overlap_factor, DEFAULT_OVERLAP_FACTOR);
        assert_eq!(options.wrap, WrapMode::Modulo);
        assert_eq!(options.arc_tolerance, DEFAULT_ARC_TOLERANCE);
        assert!(options.header);
    }

    #[test]
    fn test_numbering_json() {
        let options: ConvertOptions = serde_json::from_str(
            r#"{"numbering": {"renumber": {"start": 100, "increment": 5}}}"#,
        )
        .unwrap();
        assert_eq!(
            options.numbering,
            Numbering::Renumber {
                start: 100,
                increment: 5
            }
        );
    }
}

//! Modal machine state threaded through the parse.

use crate::config::Unit;
use serde::{Deserialize, Serialize};

/// Absolute (G90) or incremental (G91) positioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Positioning {
    #[default]
    Absolute,
    Incremental,
}

/// Active plane for arcs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Plane {
    /// G17
    XY,
    /// G18, native plane of the two-axis source machine.
    #[default]
    XZ,
    /// G19
    YZ,
}

impl std::fmt::Display for Plane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Plane::XY => write!(f, "XY (G17)"),
            Plane::XZ => write!(f, "XZ (G18)"),
            Plane::YZ => write!(f, "YZ (G19)"),
        }
    }
}

/// Interpretation of F words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeedRateMode {
    /// G94: units per minute.
    #[default]
    UnitsPerMinute,
    /// G93: reciprocal of the move time in minutes.
    InverseTime,
}

/// Modal motion code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionMode {
    Rapid,
    Linear,
    ArcClockwise,
    ArcCounterClockwise,
}

/// Position of the two source axes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Position) -> f64 {
        ((other.x - self.x).powi(2) + (other.z - self.z).powi(2)).sqrt()
    }
}

/// Modal state of the source machine.
///
/// A plain value: every parse step receives the state before a line and
/// returns the state after it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MachineState {
    pub units: Unit,
    pub positioning: Positioning,
    pub plane: Plane,
    pub feed_mode: FeedRateMode,
    /// Active motion code, `None` until the program selects one.
    pub motion: Option<MotionMode>,
    /// Last programmed feed rate.
    pub feed_rate: Option<f64>,
    /// Absolute position after the line.
    pub position: Position,
}

impl MachineState {
    /// Return a copy switched to `units`, converting the tracked position.
    pub fn with_units(self, units: Unit) -> Self {
        if units == self.units {
            return self;
        }
        Self {
            units,
            position: Position::new(
                self.units.convert(self.position.x, units),
                self.units.convert(self.position.z, units),
            ),
            ..self
        }
    }

    /// Resolve an axis word against the current value.
    ///
    /// A missing word holds the value in absolute mode and is `+0` in
    /// incremental mode; both give the current value.
    pub fn resolve_axis(&self, current: f64, word: Option<f64>) -> f64 {
        match (self.positioning, word) {
            (_, None) => current,
            (Positioning::Absolute, Some(v)) => v,
            (Positioning::Incremental, Some(v)) => current + v,
        }
    }
}

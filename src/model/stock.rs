//! Cylindrical stock configuration.

use crate::config::{OverlapMode, Unit, DEFAULT_OVERLAP_FACTOR, DEFAULT_STOCK_DIAMETER};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Stock the rotary axis turns. Immutable for one conversion run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stock {
    /// Stock diameter.
    pub diameter: f64,
    /// Unit the diameter (and tool diameter) is given in.
    pub unit: Unit,
    /// Overlap factor in `(0, 1]`.
    pub overlap_factor: f64,
    /// How the overlap factor is applied.
    pub overlap_mode: OverlapMode,
    /// Cutter diameter, required for indexed passes.
    pub tool_diameter: Option<f64>,
}

impl Default for Stock {
    fn default() -> Self {
        Self {
            diameter: DEFAULT_STOCK_DIAMETER,
            unit: Unit::Millimeters,
            overlap_factor: DEFAULT_OVERLAP_FACTOR,
            overlap_mode: OverlapMode::WorkingDiameter,
            tool_diameter: None,
        }
    }
}

impl Stock {
    /// Create stock of the given diameter in mm.
    pub fn new(diameter: f64) -> Self {
        Self {
            diameter,
            ..Default::default()
        }
    }

    /// Set the overlap factor and mode.
    pub fn with_overlap(mut self, factor: f64, mode: OverlapMode) -> Self {
        self.overlap_factor = factor;
        self.overlap_mode = mode;
        self
    }

    /// Set the tool diameter.
    pub fn with_tool(mut self, tool_diameter: f64) -> Self {
        self.tool_diameter = Some(tool_diameter);
        self
    }

    /// Set the unit of the diameters.
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Diameter the X axis is wrapped around, in the stock unit.
    pub fn effective_diameter(&self) -> f64 {
        match self.overlap_mode {
            OverlapMode::WorkingDiameter => self.diameter * self.overlap_factor,
            OverlapMode::IndexedPasses => self.diameter,
        }
    }

    /// Circumference at the effective diameter, in the stock unit.
    pub fn circumference(&self) -> f64 {
        PI * self.effective_diameter()
    }

    /// Degrees of rotation per program unit of X travel.
    pub fn degrees_per_unit(&self, program_unit: Unit) -> f64 {
        let diameter = self.unit.convert(self.effective_diameter(), program_unit);
        360.0 / (PI * diameter)
    }

    /// Arc length on the effective circumference for `degrees` of rotation.
    pub fn arc_length(&self, degrees: f64, program_unit: Unit) -> f64 {
        degrees / self.degrees_per_unit(program_unit)
    }
}

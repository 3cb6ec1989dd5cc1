//! Indexed pass planning.

use std::f64::consts::PI;

use tracing::debug;

use crate::config::OverlapMode;
use crate::error::{ConvertError, Result};
use crate::model::{PassPlan, Stock};

/// Plan the passes needed to cover the stock circumference.
///
/// Each pass cuts a band `tool_diameter × overlap` wide; passes are spread
/// evenly around the full turn.
pub fn plan_passes(stock: &Stock) -> Result<PassPlan> {
    let tool = stock.tool_diameter.ok_or_else(|| ConvertError::Configuration {
        message: "indexed passes need a tool diameter".to_string(),
    })?;

    let pass_width = tool * stock.overlap_factor;
    if !pass_width.is_finite() || pass_width <= 0.0 {
        return Err(ConvertError::Configuration {
            message: format!("pass width must be positive, got {}", pass_width),
        });
    }

    let passes = ((PI * stock.diameter / pass_width).ceil() as u32).max(1);
    let plan = PassPlan {
        passes,
        step_degrees: 360.0 / passes as f64,
        pass_width,
    };
    debug!(
        "Indexed passes: {} x {:.4} deg (pass width {:.4})",
        plan.passes, plan.step_degrees, plan.pass_width
    );
    Ok(plan)
}

/// Pass plan for the stock, `None` unless indexed passes are selected.
pub fn pass_plan_for(stock: &Stock) -> Result<Option<PassPlan>> {
    match stock.overlap_mode {
        OverlapMode::IndexedPasses => plan_passes(stock).map(Some),
        OverlapMode::WorkingDiameter => Ok(None),
    }
}

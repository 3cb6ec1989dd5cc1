//! Validation of conversion options and program extents.

use tracing::warn;

use crate::config::{ConvertOptions, OverlapMode, Unit, MAX_ANGLE_PRECISION};
use crate::error::{ConvertError, Result};
use crate::model::ProgramSummary;

/// Validation result with warnings.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Whether validation passed.
    pub passed: bool,
    /// Warning messages.
    pub warnings: Vec<String>,
    /// Error messages.
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// Create a passing result.
    pub fn ok() -> Self {
        Self {
            passed: true,
            ..Default::default()
        }
    }

    /// Add a warning.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Add an error.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.passed = false;
    }

    /// Merge another result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
        if !other.passed {
            self.passed = false;
        }
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Check stock and options before any command is processed.
pub fn validate_options(options: &ConvertOptions) -> ValidationResult {
    let mut result = ValidationResult::ok();
    let stock = &options.stock;

    if !positive(stock.diameter) {
        result.add_error(format!(
            "Stock diameter must be positive, got {}",
            stock.diameter
        ));
    } else if Unit::Millimeters.convert(1.0, stock.unit) > stock.diameter {
        result.add_warning(format!(
            "Stock diameter {} {} is below 1 mm",
            stock.diameter, stock.unit
        ));
    }

    let overlap = stock.overlap_factor;
    if !(overlap.is_finite() && overlap > 0.0 && overlap <= 1.0) {
        result.add_error(format!(
            "Overlap factor must be in (0, 1], got {}",
            stock.overlap_factor
        ));
    }

    if let Some(tool) = stock.tool_diameter {
        if !positive(tool) {
            result.add_error(format!("Tool diameter must be positive, got {}", tool));
        } else if tool >= stock.diameter / 2.0 {
            result.add_error(format!(
                "Tool diameter {} must be smaller than half the stock diameter ({})",
                tool,
                stock.diameter / 2.0
            ));
        }
    }

    match stock.overlap_mode {
        OverlapMode::IndexedPasses if stock.tool_diameter.is_none() => {
            result.add_error("Indexed passes need a tool diameter");
        }
        OverlapMode::WorkingDiameter if stock.tool_diameter.is_some() => {
            result.add_warning("Tool diameter is only used by indexed passes");
        }
        _ => {}
    }

    if !positive(options.arc_tolerance) {
        result.add_error(format!(
            "Arc tolerance must be positive, got {}",
            options.arc_tolerance
        ));
    } else if positive(stock.diameter) && options.arc_tolerance >= stock.diameter / 2.0 {
        result.add_warning(format!(
            "Arc tolerance {} is not smaller than the stock radius",
            options.arc_tolerance
        ));
    }

    if options.angle_precision > MAX_ANGLE_PRECISION {
        result.add_error(format!(
            "Angle precision must be at most {} decimals, got {}",
            MAX_ANGLE_PRECISION, options.angle_precision
        ));
    }

    if !options.safe_z.is_finite() {
        result.add_error(format!("Safe Z must be finite, got {}", options.safe_z));
    }

    if !(options.spindle_rpm.is_finite() && options.spindle_rpm >= 0.0) {
        result.add_error(format!(
            "Spindle speed must not be negative, got {}",
            options.spindle_rpm
        ));
    }

    result
}

/// Validate options, turning errors into a configuration error.
///
/// Warnings are logged and returned.
pub fn ensure_valid(options: &ConvertOptions) -> Result<ValidationResult> {
    let result = validate_options(options);

    for warning in &result.warnings {
        warn!("{}", warning);
    }

    if !result.passed {
        return Err(ConvertError::Configuration {
            message: result.errors.join("; "),
        });
    }

    Ok(result)
}

/// Check that the X travel of a program fits on the stock.
pub fn check_program_extent(
    summary: &ProgramSummary,
    options: &ConvertOptions,
    program_unit: Unit,
) -> ValidationResult {
    let mut result = ValidationResult::ok();
    let circumference = options.stock.unit.convert(options.stock.circumference(), program_unit);
    let span = summary.x_span();

    if span > circumference + crate::config::EPS {
        result.add_warning(format!(
            "X travel {:.3} {} exceeds the stock circumference {:.3} {}, the toolpath overlaps",
            span, program_unit, circumference, program_unit
        ));
    }

    if summary.commands > 0 && summary.rapid_moves + summary.linear_moves + summary.arc_moves == 0 {
        result.add_warning("Program has no motion commands");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stock;

    fn options(stock: Stock) -> ConvertOptions {
        ConvertOptions {
            stock,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_options_pass() {
        let result = validate_options(&ConvertOptions::default());
        assert!(result.passed);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_bad_diameter() {
        for diameter in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let result = validate_options(&ConvertOptions::with_diameter(diameter));
            assert!(!result.passed, "diameter {}", diameter);
        }
    }

    #[test]
    fn test_bad_overlap() {
        for factor in [0.0, -0.5, 1.5] {
            let stock = Stock::new(20.0).with_overlap(factor, OverlapMode::WorkingDiameter);
            assert!(!validate_options(&options(stock)).passed, "factor {}", factor);
        }
        let stock = Stock::new(20.0).with_overlap(1.0, OverlapMode::WorkingDiameter);
        assert!(validate_options(&options(stock)).passed);
    }

    #[test]
    fn test_tool_diameter_rules() {
        let indexed = Stock::new(20.0).with_overlap(0.8, OverlapMode::IndexedPasses);
        assert!(!validate_options(&options(indexed)).passed);
        assert!(validate_options(&options(indexed.with_tool(3.0))).passed);
        assert!(!validate_options(&options(indexed.with_tool(10.0))).passed);
        assert!(!validate_options(&options(indexed.with_tool(-1.0))).passed);

        let result = validate_options(&options(Stock::new(20.0).with_tool(3.0)));
        assert!(result.passed);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_tolerance_and_precision() {
        let mut opts = ConvertOptions::with_diameter(20.0);
        opts.arc_tolerance = 0.0;
        assert!(!validate_options(&opts).passed);

        let mut opts = ConvertOptions::with_diameter(20.0);
        opts.angle_precision = MAX_ANGLE_PRECISION + 1;
        assert!(!validate_options(&opts).passed);
    }

    #[test]
    fn test_ensure_valid_returns_configuration_error() {
        let err = ensure_valid(&ConvertOptions::with_diameter(0.0)).unwrap_err();
        assert!(matches!(err, ConvertError::Configuration { .. }));
    }

    #[test]
    fn test_program_extent_warning() {
        let opts = ConvertOptions::with_diameter(10.0);
        let summary = ProgramSummary {
            commands: 2,
            linear_moves: 2,
            x_range: Some((0.0, 40.0)),
            ..Default::default()
        };
        let result = check_program_extent(&summary, &opts, Unit::Millimeters);
        assert!(result.passed);
        assert_eq!(result.warnings.len(), 1);

        let summary = ProgramSummary {
            x_range: Some((0.0, 20.0)),
            ..summary
        };
        assert!(check_program_extent(&summary, &opts, Unit::Millimeters)
            .warnings
            .is_empty());
    }
}

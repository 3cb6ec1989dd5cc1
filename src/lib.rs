//! rotary-convert - Convert XZ G-code programs for an indexed rotary axis.
//!
//! The X axis of a two-axis program is wrapped around cylindrical stock: every
//! X displacement becomes a rotation of the rotary axis, feeds are rescaled to
//! keep the surface speed, and arcs are replaced by chords.
//!
//! # Example
//!
//! ```no_run
//! use rotary_convert::{convert_program, ConvertOptions};
//!
//! let options = ConvertOptions::with_diameter(20.0);
//! let conversion = convert_program("G1 X10 Z0 F100\n", &options).unwrap();
//! println!("{}", conversion.text);
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod model;
pub mod parser;
pub mod transform;
pub mod validation;

use std::path::Path;

use tracing::{debug, info, warn};

// Re-exports for convenience
pub use config::{
    ArcMode, ConvertOptions, FeedScaling, Numbering, OverlapMode, ReportingPolicy, RotaryAxis,
    Unit, WrapMode,
};
pub use error::{ConvertError, Diagnostics, ErrorCode, ErrorReport, Result};
pub use generator::generate_gcode;
pub use model::{OutputProgram, Program, Stock};
pub use parser::{detect_tool_diameter, parse_program};
pub use transform::RotaryTransform;
pub use validation::{validate_options, ValidationResult};

/// Result of a conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Converted program text.
    pub text: String,
    /// Rewritten program before serialization.
    pub program: OutputProgram,
    /// Non-fatal findings.
    pub warnings: Vec<String>,
}

/// Fill the tool diameter from the program comments when indexed passes
/// need one and none was given.
pub fn with_detected_tool(text: &str, options: &ConvertOptions) -> ConvertOptions {
    let mut options = options.clone();
    let stock = &options.stock;
    if stock.overlap_mode == OverlapMode::IndexedPasses && stock.tool_diameter.is_none() {
        if let Some(tool) = detect_tool_diameter(text) {
            info!("Detected tool diameter {} from program comments", tool);
            options.stock.tool_diameter = Some(tool);
        }
    }
    options
}

/// Convert program text.
///
/// Runs the full pipeline:
/// 1. Validate the options (configuration errors stop here)
/// 2. Parse the program
/// 3. Rewrite it for the rotary axis
/// 4. Generate the output text
///
/// Line errors of the parse and the rewrite are collected together and
/// returned as one report, or the first one alone under a strict policy.
pub fn convert_program(text: &str, options: &ConvertOptions) -> Result<Conversion> {
    let options = with_detected_tool(text, options);
    let transform = RotaryTransform::new(&options)?;
    let mut warnings = validate_options(&options).warnings;

    let mut diagnostics = Diagnostics::new(options.policy);
    let program = parser::parse_program_with(text, &mut diagnostics)?;
    if program.command_count() == 0 && diagnostics.is_empty() {
        return Err(ConvertError::EmptyProgram);
    }

    let summary = program.summary();
    debug!(
        "Program: {} commands ({} rapid, {} linear, {} arc)",
        summary.commands, summary.rapid_moves, summary.linear_moves, summary.arc_moves
    );
    let extent = validation::check_program_extent(&summary, &options, program.final_state.units);
    for warning in &extent.warnings {
        warn!("{}", warning);
    }
    warnings.extend(extent.warnings);

    let output = transform.run_with(&program, &mut diagnostics)?;
    diagnostics.finish()?;

    let text = generate_gcode(&output, &options);
    Ok(Conversion {
        text,
        program: output,
        warnings,
    })
}

/// Read a program file.
pub fn read_program(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ConvertError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Err(ConvertError::EmptyFile {
            path: path.to_path_buf(),
        });
    }
    Ok(text)
}

/// Convert a program file and write the result to `output`.
pub fn convert_file(input: &Path, output: &Path, options: &ConvertOptions) -> Result<Conversion> {
    let text = read_program(input)?;
    let conversion = convert_program(&text, options)?;
    std::fs::write(output, &conversion.text)?;
    info!("Wrote {} lines to {}", conversion.text.lines().count(), output.display());
    Ok(conversion)
}

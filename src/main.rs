//! rotary-convert - CLI tool to convert XZ G-code for an indexed rotary axis.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use rotary_convert::{
    convert_program, parse_program, read_program, validate_options, with_detected_tool, ArcMode,
    ConvertOptions, FeedScaling, Numbering, OverlapMode, ReportingPolicy, RotaryAxis, Unit,
    WrapMode,
};

/// Convert XZ G-code programs to indexed rotary-axis programs for cylindrical stock.
#[derive(Parser, Debug)]
#[command(name = "rotary-convert")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input G-code file path
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path (default: <input>_rotary.nc)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Options file (JSON); flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stock diameter
    #[arg(short, long)]
    diameter: Option<f64>,

    /// Unit of the stock and tool diameters
    #[arg(long, value_enum)]
    unit: Option<Unit>,

    /// Overlap factor in (0, 1]
    #[arg(long)]
    overlap: Option<f64>,

    /// How the overlap factor is applied
    #[arg(long, value_enum)]
    overlap_mode: Option<OverlapMode>,

    /// Tool diameter (detected from program comments when omitted)
    #[arg(long)]
    tool_diameter: Option<f64>,

    /// Arc handling
    #[arg(long, value_enum)]
    arcs: Option<ArcMode>,

    /// Chordal tolerance for arc segmentation
    #[arg(long)]
    tolerance: Option<f64>,

    /// Rotary wrap behaviour
    #[arg(long, value_enum)]
    wrap: Option<WrapMode>,

    /// Feed rewriting
    #[arg(long, value_enum)]
    feed_mode: Option<FeedScaling>,

    /// Rotary axis letter
    #[arg(long, value_enum, ignore_case = true)]
    axis: Option<RotaryAxis>,

    /// Decimal places for angles and feeds
    #[arg(long)]
    precision: Option<usize>,

    /// Retract height between indexed passes
    #[arg(long)]
    safe_z: Option<f64>,

    /// Spindle speed restored after each index
    #[arg(long)]
    spindle_rpm: Option<f64>,

    /// Renumber output lines from this number
    #[arg(long)]
    renumber: Option<u32>,

    /// Increment for renumbered lines
    #[arg(long, default_value = "10")]
    increment: u32,

    /// Omit the header comments
    #[arg(long)]
    no_header: bool,

    /// Stop at the first error instead of reporting all of them
    #[arg(long)]
    strict: bool,

    /// Validate only, don't generate output
    #[arg(long)]
    validate: bool,

    /// Output the parsed program as JSON
    #[arg(long)]
    debug: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Build conversion options from the options file and the flags.
    fn options(&self) -> Result<ConvertOptions> {
        let mut options = match &self.config {
            Some(path) => ConvertOptions::from_json_file(path)
                .with_context(|| format!("Failed to read options from {}", path.display()))?,
            None => ConvertOptions::default(),
        };

        if let Some(diameter) = self.diameter {
            options.stock.diameter = diameter;
        }
        if let Some(unit) = self.unit {
            options.stock = options.stock.with_unit(unit);
        }
        if let Some(mode) = self.overlap_mode {
            options.stock.overlap_mode = mode;
            if self.overlap.is_none() {
                options.stock.overlap_factor = mode.default_factor();
            }
        }
        if let Some(overlap) = self.overlap {
            options.stock.overlap_factor = overlap;
        }
        if let Some(tool) = self.tool_diameter {
            options.stock = options.stock.with_tool(tool);
        }
        if let Some(arcs) = self.arcs {
            options.arcs = arcs;
        }
        if let Some(tolerance) = self.tolerance {
            options.arc_tolerance = tolerance;
        }
        if let Some(wrap) = self.wrap {
            options.wrap = wrap;
        }
        if let Some(feed) = self.feed_mode {
            options.feed = feed;
        }
        if let Some(axis) = self.axis {
            options.axis = axis;
        }
        if let Some(precision) = self.precision {
            options.angle_precision = precision;
        }
        if let Some(safe_z) = self.safe_z {
            options.safe_z = safe_z;
        }
        if let Some(rpm) = self.spindle_rpm {
            options.spindle_rpm = rpm;
        }
        if let Some(start) = self.renumber {
            options.numbering = Numbering::Renumber {
                start,
                increment: self.increment,
            };
        }
        if self.no_header {
            options.header = false;
        }
        if self.strict {
            options.policy = ReportingPolicy::Strict;
        }

        Ok(options)
    }
}

/// Default output path: `<stem>_rotary.nc` next to the input.
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{}_rotary.nc", stem))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let options = args.options()?;

    info!("Processing: {}", args.input.display());

    let text = read_program(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let options = with_detected_tool(&text, &options);

    // Validate options
    let validation = validate_options(&options);

    for warning in &validation.warnings {
        warn!("{}", warning);
    }

    for err in &validation.errors {
        error!("{}", err);
    }

    if !validation.passed {
        anyhow::bail!("Validation failed");
    }

    // Debug output
    if args.debug {
        let program = parse_program(&text, ReportingPolicy::Batch)
            .with_context(|| format!("Failed to parse {}", args.input.display()))?;
        let json = serde_json::to_string_pretty(&program)?;
        println!("{}", json);
        return Ok(());
    }

    // Validate-only mode
    if args.validate {
        let program = parse_program(&text, options.policy)
            .with_context(|| format!("Failed to parse {}", args.input.display()))?;
        let summary = program.summary();
        info!(
            "Parsed {} commands ({} rapid, {} linear, {} arc), X span {:.3}",
            summary.commands,
            summary.rapid_moves,
            summary.linear_moves,
            summary.arc_moves,
            summary.x_span()
        );
        if let Some(feed) = summary.first_feed {
            info!("First feed rate: {}", feed);
        }
        info!("Validation passed");
        return Ok(());
    }

    // Generate output
    let conversion = convert_program(&text, &options)
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input));

    std::fs::write(&output_path, &conversion.text)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    info!(
        "Degrees per unit: {:.6}",
        conversion.program.degrees_per_unit
    );
    if let Some(plan) = conversion.program.pass_plan {
        info!(
            "Passes: {}, angular step: {:.2} degrees",
            plan.passes, plan.step_degrees
        );
    }
    info!("Generated: {}", output_path.display());

    Ok(())
}

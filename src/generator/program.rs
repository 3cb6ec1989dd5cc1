//! Output program serialization.

use crate::config::{ConvertOptions, RotaryAxis};
use crate::model::{OutputCommand, OutputKind, OutputLine, OutputProgram};

use super::gcode::{format_coord, format_exact, GcodeWriter};

fn is_g_word(word: &str) -> bool {
    word.starts_with('G')
}

/// Write the explanatory header.
fn write_header(writer: &mut GcodeWriter, program: &OutputProgram, options: &ConvertOptions) {
    let stock = &options.stock;
    let axis = options.axis.letter();

    writer.write_comment("Rotary axis conversion of an XZ program");
    writer.write_comment(&format!(
        "Stock diameter: {} {}",
        format_exact(stock.diameter),
        stock.unit
    ));
    writer.write_comment(&format!(
        "Overlap: {} ({})",
        format_exact(stock.overlap_factor),
        stock.overlap_mode
    ));
    writer.write_comment(&format!(
        "Effective diameter: {} {}",
        format_coord(program.effective_diameter, 4),
        stock.unit
    ));
    writer.write_comment(&format!(
        "Degrees per unit of X: {}",
        format_coord(program.degrees_per_unit, 6)
    ));
    if let Some(plan) = program.pass_plan {
        writer.write_comment(&format!("Total passes: {}", plan.passes));
        writer.write_comment(&format!(
            "Angular displacement per pass: {:.2} degrees",
            plan.step_degrees
        ));
        writer.write_comment(&format!(
            "Pass width: {} {}",
            format_coord(plan.pass_width, 4),
            stock.unit
        ));
    }
    writer.write_comment("");
    writer.write_comment(&format!(
        "Calibration: 1.000 {} unit = 1.000 degree of rotation",
        axis
    ));
    if options.axis == RotaryAxis::Y {
        writer.write_comment("Configure GRBL $101 (Y steps/unit) as:");
        writer.write_comment("$101 = (motor_steps_per_rev x microsteps x gear_ratio) / 360");
        writer.write_comment("Example: 200 steps x 16 microsteps x 3:1 ratio = $101=26.67");
    }
    writer.write_comment("");
}

/// Compose the text of one command.
///
/// Order: modal G words, motion code, rotary word, Z, F, remaining words,
/// comments.
pub fn format_command(cmd: &OutputCommand, options: &ConvertOptions) -> String {
    let precision = options.angle_precision;
    let axis = options.axis.letter();

    match cmd.kind {
        OutputKind::Generated => return cmd.text.clone().unwrap_or_default(),
        OutputKind::PassThrough if cmd.text.is_some() => {
            return cmd.text.clone().unwrap_or_default()
        }
        OutputKind::Rebase => {
            return format!("G92 {}{}", axis, format_coord(cmd.angle.unwrap_or(0.0), precision))
        }
        _ => {}
    }

    let mut parts: Vec<String> = cmd.words.iter().filter(|w| is_g_word(w)).cloned().collect();
    match cmd.kind {
        OutputKind::RapidMove => parts.push("G0".to_string()),
        OutputKind::LinearMove => parts.push("G1".to_string()),
        _ => {}
    }
    if let Some(angle) = cmd.angle {
        parts.push(format!("{}{}", axis, format_coord(angle, precision)));
    }
    if let Some(z) = cmd.z {
        let z = if cmd.z_computed {
            format_coord(z, precision)
        } else {
            format_exact(z)
        };
        parts.push(format!("Z{}", z));
    }
    if let Some(feed) = cmd.feed {
        parts.push(format!("F{}", format_coord(feed, precision)));
    }
    parts.extend(cmd.words.iter().filter(|w| !is_g_word(w)).cloned());
    parts.extend(cmd.comments.iter().cloned());

    parts.join(" ")
}

/// Serialize an output program to G-code text.
pub fn generate_gcode(program: &OutputProgram, options: &ConvertOptions) -> String {
    let mut writer = GcodeWriter::new(options.numbering);

    if options.header {
        write_header(&mut writer, program, options);
    }

    for line in &program.lines {
        match line {
            OutputLine::Blank => writer.write_raw(""),
            OutputLine::Comment(text) => writer.write_raw(text),
            OutputLine::Command(cmd) => {
                writer.write_line(cmd.line_word.as_deref(), &format_command(cmd, options))
            }
        }
    }

    writer.take_output()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Numbering;
    use pretty_assertions::assert_eq;

    fn program(lines: Vec<OutputLine>) -> OutputProgram {
        OutputProgram {
            lines,
            degrees_per_unit: 1.0,
            effective_diameter: 114.5916,
            pass_plan: None,
        }
    }

    fn bare_options() -> ConvertOptions {
        ConvertOptions {
            header: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_format_motion_word_order() {
        let mut cmd = OutputCommand::new(OutputKind::LinearMove, Some(3));
        cmd.words = vec!["M8".to_string(), "G91".to_string()];
        cmd.angle = Some(57.29577951);
        cmd.z = Some(-0.5);
        cmd.feed = Some(572.957795);
        cmd.comments = vec!["(cut)".to_string()];
        assert_eq!(
            format_command(&cmd, &bare_options()),
            "G91 G1 A57.2958 Z-0.5 F572.9578 M8 (cut)"
        );
    }

    #[test]
    fn test_computed_z_uses_precision() {
        let mut cmd = OutputCommand::new(OutputKind::LinearMove, Some(4));
        cmd.angle = Some(351.33974596);
        cmd.z = Some(-4.999999999999997);
        cmd.z_computed = true;
        assert_eq!(format_command(&cmd, &bare_options()), "G1 A351.3397 Z-5");

        // Source values keep every digit
        cmd.z = Some(-1.23456);
        cmd.z_computed = false;
        assert_eq!(format_command(&cmd, &bare_options()), "G1 A351.3397 Z-1.23456");
    }

    #[test]
    fn test_format_special_kinds() {
        let options = ConvertOptions {
            axis: RotaryAxis::B,
            ..bare_options()
        };
        assert_eq!(
            format_command(&OutputCommand::rebase(None, 40.0), &options),
            "G92 B40"
        );
        assert_eq!(
            format_command(&OutputCommand::generated("M30"), &options),
            "M30"
        );
        assert_eq!(
            format_command(&OutputCommand::verbatim(2, "M3 S1000 (on)"), &options),
            "M3 S1000 (on)"
        );
    }

    #[test]
    fn test_generate_lines_in_order() {
        let mut cmd = OutputCommand::new(OutputKind::RapidMove, Some(2));
        cmd.line_word = Some("N20".to_string());
        cmd.angle = Some(90.0);
        let out = program(vec![
            OutputLine::Comment("(setup)".to_string()),
            OutputLine::Command(cmd),
            OutputLine::Blank,
        ]);
        assert_eq!(generate_gcode(&out, &bare_options()), "(setup)\nN20 G0 A90\n\n");

        let renumbered = ConvertOptions {
            numbering: Numbering::Renumber {
                start: 10,
                increment: 10,
            },
            ..bare_options()
        };
        assert_eq!(generate_gcode(&out, &renumbered), "(setup)\nN10 G0 A90\n\n");
    }

    #[test]
    fn test_header_mentions_calibration() {
        let options = ConvertOptions {
            axis: RotaryAxis::Y,
            ..Default::default()
        };
        let text = generate_gcode(&program(Vec::new()), &options);
        assert!(text.starts_with("; Rotary axis conversion"));
        assert!(text.contains("1.000 Y unit = 1.000 degree"));
        assert!(text.contains("$101"));
    }
}

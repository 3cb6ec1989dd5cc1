//! Whole-program parsing.

use tracing::debug;

use crate::config::ReportingPolicy;
use crate::error::{Diagnostics, Result};
use crate::model::{MachineState, Program, SourceLine};

use super::line::parse_line;
use super::words::{scan_annotation, split_comments};

const DIAMETER_KEYS: [&str; 3] = ["DIAMETER", "CD", "D"];
const RADIUS_KEYS: [&str; 3] = ["RADIUS", "CR", "R"];

/// Parse a program, reporting errors according to `policy`.
pub fn parse_program(text: &str, policy: ReportingPolicy) -> Result<Program> {
    let mut diagnostics = Diagnostics::new(policy);
    let program = parse_program_with(text, &mut diagnostics)?;
    diagnostics.finish()?;
    Ok(program)
}

/// Parse a program, recording errors into `diagnostics`.
///
/// A rejected line keeps its text but carries no command, and the state
/// before it is carried to the next line. Under a strict policy the first
/// error is returned at once.
pub fn parse_program_with(text: &str, diagnostics: &mut Diagnostics) -> Result<Program> {
    let mut state = MachineState::default();
    let mut lines = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let command = match parse_line(number, raw, &state) {
            Ok(parsed) => {
                state = parsed.state;
                parsed.command
            }
            Err(err) => {
                diagnostics.record(err)?;
                None
            }
        };
        lines.push(SourceLine {
            number,
            text: raw.trim().to_string(),
            command,
        });
    }

    let program = Program {
        lines,
        final_state: state,
    };
    debug!(
        "Parsed {} lines, {} commands",
        program.lines.len(),
        program.command_count()
    );
    Ok(program)
}

/// Find the cutting tool diameter in the comments of a program.
///
/// Diameter annotations (`D=6`, `CD6`, `DIAMETER: 6`) win over radius
/// annotations (`R=3`, `CR3`, `RADIUS 3`), which are doubled.
pub fn detect_tool_diameter(text: &str) -> Option<f64> {
    let comments: Vec<String> = text
        .lines()
        .filter_map(|line| split_comments(line).ok())
        .flat_map(|(_, comments)| comments)
        .collect();

    let positive = |v: &f64| *v > 0.0;
    comments
        .iter()
        .find_map(|c| scan_annotation(c, &DIAMETER_KEYS).filter(positive))
        .or_else(|| {
            comments
                .iter()
                .find_map(|c| scan_annotation(c, &RADIUS_KEYS).filter(positive))
                .map(|r| r * 2.0)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConvertError, ErrorCode};
    use crate::model::{CommandKind, Position};
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
(face the part)
G21 G90 G18

G0 X0 Z2
G1 Z-1 F100
X10
G2 X20 Z-1 R5
M5
";

    #[test]
    fn test_parse_sample() {
        let program = parse_program(SAMPLE, ReportingPolicy::Batch).unwrap();
        assert_eq!(program.lines.len(), 8);
        assert!(program.lines[0].command.is_none());
        assert!(program.lines[2].is_blank());
        assert_eq!(program.command_count(), 6);
        assert_eq!(program.final_state.position, Position::new(20.0, -1.0));

        let summary = program.summary();
        assert_eq!(summary.rapid_moves, 1);
        assert_eq!(summary.linear_moves, 2);
        assert_eq!(summary.arc_moves, 1);
        assert_eq!(summary.x_range, Some((0.0, 20.0)));
        assert_eq!(summary.first_feed, Some(100.0));
    }

    #[test]
    fn test_feed_inherited_across_lines() {
        let program = parse_program(SAMPLE, ReportingPolicy::Batch).unwrap();
        let x10 = program.lines[5].command.as_ref().unwrap();
        assert_eq!(x10.kind, CommandKind::LinearMove);
        assert_eq!(x10.feed, None);
        assert_eq!(x10.resolved_feed(), Some(100.0));
    }

    #[test]
    fn test_batch_collects_every_error() {
        let text = "G1 X1 F10\nG1 Y4\nG1 X2\nG2 X5 Z0\nG1 X3\n";
        let err = parse_program(text, ReportingPolicy::Batch).unwrap_err();
        match err {
            ConvertError::Report(report) => assert_eq!(report.lines(), vec![2, 4]),
            other => panic!("expected a report, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_stops_at_first_error() {
        let text = "G1 X1 F10\nG1 Y4\nG2 X5 Z0\n";
        let err = parse_program(text, ReportingPolicy::Strict).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseError);
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_rejected_line_keeps_prior_state() {
        let text = "G1 X1 F10\nG1 X5 Y4\nX2\n";
        let mut diagnostics = Diagnostics::new(ReportingPolicy::Batch);
        let program = parse_program_with(text, &mut diagnostics).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(program.lines[1].command.is_none());
        let last = program.lines[2].command.as_ref().unwrap();
        assert_eq!(last.start.x, 1.0);
    }

    #[test]
    fn test_empty_program_parses() {
        let program = parse_program("", ReportingPolicy::Batch).unwrap();
        assert!(program.lines.is_empty());
        let program = parse_program("(only)\n\n", ReportingPolicy::Batch).unwrap();
        assert_eq!(program.command_count(), 0);
    }

    // ==================== detect_tool_diameter tests ====================

    #[test]
    fn test_detect_tool_diameter() {
        assert_eq!(detect_tool_diameter("(T1 D=6.0 flat)\nG1 X1"), Some(6.0));
        assert_eq!(detect_tool_diameter("; tool CD3.175\n"), Some(3.175));
        assert_eq!(detect_tool_diameter("(RADIUS=1.5)\n"), Some(3.0));
        assert_eq!(detect_tool_diameter("(CR 2) (D4)\n"), Some(4.0));
        assert_eq!(detect_tool_diameter("G1 X1 R5\n"), None);
        assert_eq!(detect_tool_diameter("(no tool here)\n"), None);
    }
}

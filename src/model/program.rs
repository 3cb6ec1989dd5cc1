//! Parsed program.

use super::command::{Command, CommandKind};
use super::state::MachineState;
use serde::Serialize;

/// One source line with its parse result.
#[derive(Debug, Clone, Serialize)]
pub struct SourceLine {
    /// 1-based line number.
    pub number: usize,
    /// Trimmed source text.
    pub text: String,
    /// Parsed command, `None` for blank, comment-only and rejected lines.
    pub command: Option<Command>,
}

impl SourceLine {
    /// Whether the line has no content at all.
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Complete parsed program.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Program {
    pub lines: Vec<SourceLine>,
    /// Modal state after the last line.
    pub final_state: MachineState,
}

/// Counts and extents of a program.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgramSummary {
    pub lines: usize,
    pub commands: usize,
    pub rapid_moves: usize,
    pub linear_moves: usize,
    pub arc_moves: usize,
    /// Smallest and largest X reached.
    pub x_range: Option<(f64, f64)>,
    /// Smallest and largest Z reached.
    pub z_range: Option<(f64, f64)>,
    /// First F word of the program.
    pub first_feed: Option<f64>,
}

impl ProgramSummary {
    /// X travel covered by the program.
    pub fn x_span(&self) -> f64 {
        self.x_range.map(|(min, max)| max - min).unwrap_or(0.0)
    }
}

impl Program {
    /// Iterate over parsed commands in order.
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.lines.iter().filter_map(|l| l.command.as_ref())
    }

    /// Number of parsed commands.
    pub fn command_count(&self) -> usize {
        self.commands().count()
    }

    /// First explicit feed rate of the program.
    pub fn first_feed_rate(&self) -> Option<f64> {
        self.commands().find_map(|c| c.feed)
    }

    /// Compute counts and extents.
    pub fn summary(&self) -> ProgramSummary {
        let mut summary = ProgramSummary {
            lines: self.lines.len(),
            first_feed: self.first_feed_rate(),
            ..Default::default()
        };

        for cmd in self.commands() {
            summary.commands += 1;
            match cmd.kind {
                CommandKind::RapidMove => summary.rapid_moves += 1,
                CommandKind::LinearMove => summary.linear_moves += 1,
                CommandKind::ArcMove(_) => summary.arc_moves += 1,
                _ => continue,
            }
            for p in [cmd.start, cmd.end()] {
                summary.x_range = Some(extend(summary.x_range, p.x));
                summary.z_range = Some(extend(summary.z_range, p.z));
            }
        }

        summary
    }
}

fn extend(range: Option<(f64, f64)>, value: f64) -> (f64, f64) {
    match range {
        Some((min, max)) => (min.min(value), max.max(value)),
        None => (value, value),
    }
}

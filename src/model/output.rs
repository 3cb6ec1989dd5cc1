//! Rewritten commands produced by the rotary transform.

use serde::Serialize;

/// Kind of an output command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputKind {
    /// G0
    RapidMove,
    /// G1
    LinearMove,
    /// Line emitted as its source text.
    PassThrough,
    /// `G92` on the rotary axis, redefining its position without motion.
    Rebase,
    /// Program-level line generated by the converter (spindle, end of program).
    Generated,
}

/// One rewritten command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputCommand {
    pub kind: OutputKind,
    /// Source line this command came from, `None` for generated lines.
    pub source_line: Option<usize>,
    /// `N` word carried over from the source.
    pub line_word: Option<String>,
    /// Rotary word in degrees: absolute under G90, a delta under G91.
    pub angle: Option<f64>,
    /// Z word: the source value, or an interpolated arc point when
    /// `z_computed` is set.
    pub z: Option<f64>,
    /// Z was computed by the converter and is written at the output precision.
    pub z_computed: bool,
    /// F word to emit.
    pub feed: Option<f64>,
    /// Rewritten feed of the command, whether emitted or not.
    pub resolved_feed: Option<f64>,
    /// Pass-through words in source order.
    pub words: Vec<String>,
    /// Comments in source order.
    pub comments: Vec<String>,
    /// Verbatim text for pass-through and generated lines.
    pub text: Option<String>,
}

impl OutputCommand {
    /// An empty command of `kind`.
    pub fn new(kind: OutputKind, source_line: Option<usize>) -> Self {
        Self {
            kind,
            source_line,
            line_word: None,
            angle: None,
            z: None,
            z_computed: false,
            feed: None,
            resolved_feed: None,
            words: Vec::new(),
            comments: Vec::new(),
            text: None,
        }
    }

    /// A source line written back unchanged.
    pub fn verbatim(source_line: usize, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(OutputKind::PassThrough, Some(source_line))
        }
    }

    /// A rotary rebase to `angle`.
    pub fn rebase(source_line: Option<usize>, angle: f64) -> Self {
        Self {
            angle: Some(angle),
            ..Self::new(OutputKind::Rebase, source_line)
        }
    }

    /// A converter-generated line such as `M5`.
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(OutputKind::Generated, None)
        }
    }

    /// Whether the command moves an axis.
    pub fn is_motion(&self) -> bool {
        matches!(self.kind, OutputKind::RapidMove | OutputKind::LinearMove)
    }
}

/// One line of the output program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OutputLine {
    /// Blank source line.
    Blank,
    /// Line without a command (comment, tape marker), verbatim.
    Comment(String),
    /// Rewritten or passed-through command.
    Command(OutputCommand),
}

/// Indexed-pass layout of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PassPlan {
    /// Number of passes around the stock.
    pub passes: u32,
    /// Rotation between consecutive passes, in degrees.
    pub step_degrees: f64,
    /// Circumferential width cut by one pass.
    pub pass_width: f64,
}

impl PassPlan {
    /// Start angle of pass `pass` (0-based).
    pub fn offset(&self, pass: u32) -> f64 {
        pass as f64 * self.step_degrees
    }
}

/// Result of the rotary transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputProgram {
    pub lines: Vec<OutputLine>,
    /// Degrees per program unit at the start of the program.
    pub degrees_per_unit: f64,
    /// Effective diameter used for the mapping, in the stock unit.
    pub effective_diameter: f64,
    /// Pass layout when indexed passes are active.
    pub pass_plan: Option<PassPlan>,
}

impl OutputProgram {
    /// Iterate over output commands.
    pub fn commands(&self) -> impl Iterator<Item = &OutputCommand> {
        self.lines.iter().filter_map(|line| match line {
            OutputLine::Command(cmd) => Some(cmd),
            _ => None,
        })
    }

    /// Iterate over motion commands.
    pub fn motions(&self) -> impl Iterator<Item = &OutputCommand> {
        self.commands().filter(|cmd| cmd.is_motion())
    }

    /// Output commands produced from source line `line`.
    pub fn commands_for_line(&self, line: usize) -> Vec<&OutputCommand> {
        self.commands()
            .filter(|cmd| cmd.source_line == Some(line))
            .collect()
    }
}

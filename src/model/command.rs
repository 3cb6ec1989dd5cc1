//! Parsed program commands.

use super::state::{MachineState, Position};
use serde::{Deserialize, Serialize};

/// Arc direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArcDirection {
    /// G2
    Clockwise,
    /// G3
    CounterClockwise,
}

/// Kind of a parsed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    RapidMove,
    LinearMove,
    ArcMove(ArcDirection),
    /// Dwell, spindle, coolant, tool and other codes opaque to the transform.
    DwellOrMisc,
    /// Lines that only change modal state.
    SetModal,
}

impl CommandKind {
    /// Whether the command moves the machine.
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            CommandKind::RapidMove | CommandKind::LinearMove | CommandKind::ArcMove(_)
        )
    }
}

/// Arc words as written. `k` holds the Z offset whether it was written as
/// `K` or `J`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ArcWords {
    pub i: Option<f64>,
    pub k: Option<f64>,
    pub r: Option<f64>,
}

impl ArcWords {
    /// Whether any arc word was given.
    pub fn is_empty(&self) -> bool {
        self.i.is_none() && self.k.is_none() && self.r.is_none()
    }

    /// Whether center offsets were given.
    pub fn has_offsets(&self) -> bool {
        self.i.is_some() || self.k.is_some()
    }
}

/// One parsed command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    /// Command type.
    pub kind: CommandKind,
    /// 1-based source line number.
    pub line: usize,
    /// Source text without the leading `N` word.
    pub body: String,
    /// `N` word of the line, if any.
    pub line_word: Option<String>,
    /// X word value as written.
    pub x: Option<f64>,
    /// Z word value as written.
    pub z: Option<f64>,
    /// Arc words.
    pub arc: ArcWords,
    /// Explicit F word.
    pub feed: Option<f64>,
    /// Remaining words in source order, passed through verbatim.
    pub words: Vec<String>,
    /// Comments in source order, with their delimiters.
    pub comments: Vec<String>,
    /// Absolute position before the command.
    pub start: Position,
    /// Modal state after the command.
    pub state: MachineState,
}

impl Command {
    /// Absolute position after the command.
    pub fn end(&self) -> Position {
        self.state.position
    }

    /// Feed rate in effect for the command, explicit or inherited.
    pub fn resolved_feed(&self) -> Option<f64> {
        self.state.feed_rate
    }
}

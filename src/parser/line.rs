//! Single-line parser.

use crate::config::{float_cmp, Unit};
use crate::error::{ConvertError, Result};
use crate::model::{
    ArcDirection, ArcWords, Command, CommandKind, FeedRateMode, MachineState, MotionMode, Plane,
    Position, Positioning,
};
use crate::transform::ArcPath;

use super::words::{split_comments, strip_line_number, tokenize, Word};

/// Outcome of parsing one line.
#[derive(Debug, Clone)]
pub struct ParsedLine {
    /// Command on the line, `None` for blank and comment-only lines.
    pub command: Option<Command>,
    /// Modal state after the line.
    pub state: MachineState,
}

impl ParsedLine {
    fn unchanged(state: &MachineState) -> Self {
        Self {
            command: None,
            state: *state,
        }
    }
}

/// Words of one line, sorted by role.
#[derive(Debug, Default)]
struct Block {
    line_word: Option<String>,
    motion: Option<MotionMode>,
    dwell: bool,
    /// G codes outside the supported subset.
    other_g: Vec<String>,
    units: Option<Unit>,
    positioning: Option<Positioning>,
    plane: Option<Plane>,
    feed_mode: Option<FeedRateMode>,
    x: Option<Word>,
    z: Option<Word>,
    i: Option<Word>,
    j: Option<Word>,
    k: Option<Word>,
    r: Option<Word>,
    f: Option<Word>,
    misc: bool,
    words: Vec<String>,
}

fn set_once(slot: &mut Option<Word>, word: Word) -> std::result::Result<(), String> {
    if slot.is_some() {
        return Err(format!("duplicate {} word", word.letter));
    }
    *slot = Some(word);
    Ok(())
}

impl Block {
    fn add(&mut self, index: usize, word: Word) -> std::result::Result<(), String> {
        match word.letter {
            'N' if index == 0 => self.line_word = Some(word.text),
            'G' => self.add_g(word)?,
            'X' => set_once(&mut self.x, word)?,
            'Z' => set_once(&mut self.z, word)?,
            'I' => set_once(&mut self.i, word)?,
            'J' => set_once(&mut self.j, word)?,
            'K' => set_once(&mut self.k, word)?,
            'R' => set_once(&mut self.r, word)?,
            'F' => {
                if word.value < 0.0 {
                    return Err(format!("negative feed rate {}", word.text));
                }
                set_once(&mut self.f, word)?;
            }
            'Y' | 'A' | 'B' | 'C' | 'U' | 'V' | 'W' => {
                return Err(format!(
                    "axis {} is not present on the source machine",
                    word.letter
                ));
            }
            _ => {
                self.misc = true;
                self.words.push(word.text);
            }
        }
        Ok(())
    }

    fn add_g(&mut self, word: Word) -> std::result::Result<(), String> {
        let code = (word.value * 10.0).round() as i64;
        let motion = match code {
            0 => Some(MotionMode::Rapid),
            10 => Some(MotionMode::Linear),
            20 => Some(MotionMode::ArcClockwise),
            30 => Some(MotionMode::ArcCounterClockwise),
            _ => None,
        };
        if let Some(motion) = motion {
            if self.motion.is_some() {
                return Err("more than one motion code".to_string());
            }
            self.motion = Some(motion);
            return Ok(());
        }

        match code {
            40 => self.dwell = true,
            170 => self.plane = Some(Plane::XY),
            180 => self.plane = Some(Plane::XZ),
            190 => self.plane = Some(Plane::YZ),
            200 => self.units = Some(Unit::Inches),
            210 => self.units = Some(Unit::Millimeters),
            900 => self.positioning = Some(Positioning::Absolute),
            910 => self.positioning = Some(Positioning::Incremental),
            930 => self.feed_mode = Some(FeedRateMode::InverseTime),
            940 => self.feed_mode = Some(FeedRateMode::UnitsPerMinute),
            _ => self.other_g.push(word.text.clone()),
        }
        self.words.push(word.text);
        Ok(())
    }

    fn has_axes(&self) -> bool {
        self.x.is_some() || self.z.is_some()
    }

    fn has_arc_words(&self) -> bool {
        self.i.is_some() || self.j.is_some() || self.k.is_some() || self.r.is_some()
    }

    /// Resolve the Z offset, written as `K` or as `J`.
    fn z_offset(&self) -> std::result::Result<Option<f64>, String> {
        match (&self.j, &self.k) {
            (Some(j), Some(k)) if !float_cmp::approx_eq(j.value, k.value) => {
                Err(format!("conflicting Z offsets {} and {}", j.text, k.text))
            }
            (j, k) => Ok(k.as_ref().or(j.as_ref()).map(|w| w.value)),
        }
    }

    /// Give arc words back as pass-through words on lines that are not arcs.
    fn release_arc_words(&mut self) {
        for word in [self.i.take(), self.j.take(), self.k.take(), self.r.take()]
            .into_iter()
            .flatten()
        {
            self.words.push(word.text);
        }
    }
}

fn motion_kind(motion: MotionMode) -> CommandKind {
    match motion {
        MotionMode::Rapid => CommandKind::RapidMove,
        MotionMode::Linear => CommandKind::LinearMove,
        MotionMode::ArcClockwise => CommandKind::ArcMove(ArcDirection::Clockwise),
        MotionMode::ArcCounterClockwise => CommandKind::ArcMove(ArcDirection::CounterClockwise),
    }
}

/// Parse one line against the state before it.
///
/// Returns the command on the line (if any) and the state after it. Errors
/// carry the line number and raw text; the caller decides whether to go on.
pub fn parse_line(line: usize, text: &str, state: &MachineState) -> Result<ParsedLine> {
    let text = text.trim();
    let parse_err = |message: String| ConvertError::Parse {
        line,
        text: text.to_string(),
        message,
    };

    // Blank lines and tape markers carry no command
    if text.is_empty() || text.starts_with('%') {
        return Ok(ParsedLine::unchanged(state));
    }

    let (code, comments) = split_comments(text).map_err(&parse_err)?;
    let words = tokenize(&code).map_err(&parse_err)?;
    if words.is_empty() {
        return Ok(ParsedLine::unchanged(state));
    }

    let mut block = Block::default();
    for (index, word) in words.into_iter().enumerate() {
        block.add(index, word).map_err(&parse_err)?;
    }

    if block.has_axes() && (block.dwell || !block.other_g.is_empty()) {
        let code = block
            .other_g
            .first()
            .cloned()
            .unwrap_or_else(|| "G4".to_string());
        return Err(parse_err(format!("axis words with unsupported code {}", code)));
    }

    // Modal words take effect before the motion on the same line
    let mut next = *state;
    if let Some(units) = block.units {
        next = next.with_units(units);
    }
    if let Some(positioning) = block.positioning {
        next.positioning = positioning;
    }
    if let Some(plane) = block.plane {
        next.plane = plane;
    }
    if let Some(feed_mode) = block.feed_mode {
        next.feed_mode = feed_mode;
    }
    if let Some(f) = &block.f {
        next.feed_rate = Some(f.value);
    }
    if block.motion.is_some() {
        next.motion = block.motion;
    }

    let is_arc_motion = matches!(
        next.motion,
        Some(MotionMode::ArcClockwise) | Some(MotionMode::ArcCounterClockwise)
    );
    let moves = block.has_axes()
        || (block.motion.is_some() && is_arc_motion && block.has_arc_words());

    let kind = if moves {
        let motion = next.motion.ok_or_else(|| {
            parse_err("axis words without an active motion mode".to_string())
        })?;
        motion_kind(motion)
    } else if block.dwell || block.misc || !block.other_g.is_empty() {
        CommandKind::DwellOrMisc
    } else {
        CommandKind::SetModal
    };

    let mut arc = ArcWords::default();
    match kind {
        CommandKind::ArcMove(_) => {
            arc = ArcWords {
                i: block.i.as_ref().map(|w| w.value),
                k: block.z_offset().map_err(&parse_err)?,
                r: block.r.as_ref().map(|w| w.value),
            };
        }
        CommandKind::RapidMove | CommandKind::LinearMove if block.has_arc_words() => {
            return Err(parse_err("arc words on a straight move".to_string()));
        }
        _ => block.release_arc_words(),
    }

    let start = next.position;
    let x = block.x.as_ref().map(|w| w.value);
    let z = block.z.as_ref().map(|w| w.value);
    if kind.is_motion() {
        next.position = Position::new(next.resolve_axis(start.x, x), next.resolve_axis(start.z, z));
    }

    if let CommandKind::ArcMove(direction) = kind {
        if arc.is_empty() {
            return Err(ConvertError::Geometry {
                line,
                message: "arc needs a radius (R) or center offsets (I/K)".to_string(),
            });
        }
        // Arcs outside XZ are refused by the transform, not here
        if next.plane == Plane::XZ {
            ArcPath::resolve(start, next.position, &arc, direction)
                .map_err(|message| ConvertError::Geometry { line, message })?;
        }
    }

    let command = Command {
        kind,
        line,
        body: strip_line_number(text).to_string(),
        line_word: block.line_word,
        x,
        z,
        arc,
        feed: block.f.map(|w| w.value),
        words: block.words,
        comments,
        start,
        state: next,
    };

    Ok(ParsedLine {
        command: Some(command),
        state: next,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    fn parse(text: &str, state: &MachineState) -> ParsedLine {
        parse_line(1, text, state).unwrap()
    }

    fn command(text: &str, state: &MachineState) -> Command {
        parse(text, state).command.expect("expected a command")
    }

    fn at(x: f64, z: f64) -> MachineState {
        MachineState {
            position: Position::new(x, z),
            motion: Some(MotionMode::Linear),
            ..Default::default()
        }
    }

    #[test]
    fn test_blank_and_comment_lines() {
        let state = MachineState::default();
        assert!(parse("", &state).command.is_none());
        assert!(parse("   ", &state).command.is_none());
        assert!(parse("(setup)", &state).command.is_none());
        assert!(parse("; note", &state).command.is_none());
        assert!(parse("%", &state).command.is_none());
    }

    #[test]
    fn test_linear_move() {
        let cmd = command("G1 X10 Z-1 F100", &MachineState::default());
        assert_eq!(cmd.kind, CommandKind::LinearMove);
        assert_eq!(cmd.x, Some(10.0));
        assert_eq!(cmd.z, Some(-1.0));
        assert_eq!(cmd.feed, Some(100.0));
        assert_eq!(cmd.end(), Position::new(10.0, -1.0));
        assert_eq!(cmd.state.feed_rate, Some(100.0));
        assert_eq!(cmd.state.motion, Some(MotionMode::Linear));
    }

    #[test]
    fn test_modal_motion_reused() {
        let cmd = command("X5", &at(0.0, 0.0));
        assert_eq!(cmd.kind, CommandKind::LinearMove);
        assert_eq!(cmd.end(), Position::new(5.0, 0.0));
    }

    #[test]
    fn test_axis_without_motion_mode() {
        let err = parse_line(3, "X5", &MachineState::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseError);
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn test_missing_axis_holds_in_absolute() {
        let cmd = command("G1 Z-2", &at(7.0, 0.0));
        assert_eq!(cmd.end(), Position::new(7.0, -2.0));
        assert_eq!(cmd.x, None);
    }

    #[test]
    fn test_incremental_resolution() {
        let state = MachineState {
            positioning: Positioning::Incremental,
            ..at(7.0, 1.0)
        };
        let cmd = command("G1 X3", &state);
        assert_eq!(cmd.start, Position::new(7.0, 1.0));
        assert_eq!(cmd.end(), Position::new(10.0, 1.0));
    }

    #[test]
    fn test_modal_switch_applies_to_same_line() {
        let cmd = command("G91 G1 X2", &at(5.0, 0.0));
        assert_eq!(cmd.state.positioning, Positioning::Incremental);
        assert_eq!(cmd.end().x, 7.0);
        assert_eq!(cmd.words, vec!["G91".to_string()]);
    }

    #[test]
    fn test_set_modal_lines() {
        let parsed = parse("G20 G91", &MachineState::default());
        let cmd = parsed.command.unwrap();
        assert_eq!(cmd.kind, CommandKind::SetModal);
        assert_eq!(parsed.state.units, Unit::Inches);
        assert_eq!(parsed.state.positioning, Positioning::Incremental);

        let cmd = command("F250", &MachineState::default());
        assert_eq!(cmd.kind, CommandKind::SetModal);
        assert_eq!(cmd.state.feed_rate, Some(250.0));

        let cmd = command("G1", &MachineState::default());
        assert_eq!(cmd.kind, CommandKind::SetModal);
        assert_eq!(cmd.state.motion, Some(MotionMode::Linear));
    }

    #[test]
    fn test_misc_lines() {
        let cmd = command("M3 S12000", &MachineState::default());
        assert_eq!(cmd.kind, CommandKind::DwellOrMisc);
        assert_eq!(cmd.words, vec!["M3".to_string(), "S12000".to_string()]);

        let cmd = command("G4 P0.5", &MachineState::default());
        assert_eq!(cmd.kind, CommandKind::DwellOrMisc);

        let cmd = command("G54", &MachineState::default());
        assert_eq!(cmd.kind, CommandKind::DwellOrMisc);
    }

    #[test]
    fn test_feed_inherited() {
        let first = parse("G1 X1 F120", &MachineState::default());
        let second = command("G1 X2", &first.state);
        assert_eq!(second.feed, None);
        assert_eq!(second.resolved_feed(), Some(120.0));
    }

    #[test]
    fn test_unit_switch_converts_position() {
        let cmd = command("G20 G1 X2", &at(25.4, 0.0));
        assert!((cmd.start.x - 1.0).abs() < 1e-12);
        assert_eq!(cmd.end().x, 2.0);
    }

    #[test]
    fn test_line_word_and_comments() {
        let cmd = command("N40 G1 X1 (rough) ; pass 1", &at(0.0, 0.0));
        assert_eq!(cmd.line_word.as_deref(), Some("N40"));
        assert_eq!(cmd.body, "G1 X1 (rough) ; pass 1");
        assert_eq!(cmd.comments, vec!["(rough)".to_string(), "; pass 1".to_string()]);
    }

    #[test]
    fn test_unsupported_axes_rejected() {
        for text in ["G1 Y5", "G0 A90", "G1 X1 B2"] {
            let err = parse_line(1, text, &at(0.0, 0.0)).unwrap_err();
            assert_eq!(err.code(), ErrorCode::ParseError, "{}", text);
        }
    }

    #[test]
    fn test_x_on_unsupported_code() {
        assert!(parse_line(1, "G92 X0", &at(0.0, 0.0)).is_err());
        assert!(parse_line(1, "G28 X0", &at(0.0, 0.0)).is_err());
    }

    #[test]
    fn test_malformed_values() {
        assert!(parse_line(1, "G1 X1..2", &at(0.0, 0.0)).is_err());
        assert!(parse_line(1, "G1 X1 X2", &at(0.0, 0.0)).is_err());
        assert!(parse_line(1, "G1 F-5 X1", &at(0.0, 0.0)).is_err());
        assert!(parse_line(1, "G0 G1 X1", &at(0.0, 0.0)).is_err());
        assert!(parse_line(1, "G1 X1 I2", &at(0.0, 0.0)).is_err());
    }

    // ==================== arc tests ====================

    #[test]
    fn test_arc_with_offsets() {
        let cmd = command("G2 X10 Z5 I5 J0", &MachineState::default());
        assert_eq!(cmd.kind, CommandKind::ArcMove(ArcDirection::Clockwise));
        assert_eq!(cmd.arc.i, Some(5.0));
        assert_eq!(cmd.arc.k, Some(0.0));
        assert_eq!(cmd.end(), Position::new(10.0, 5.0));
    }

    #[test]
    fn test_arc_with_radius() {
        let cmd = command("G3 X10 Z0 R5", &MachineState::default());
        assert_eq!(cmd.kind, CommandKind::ArcMove(ArcDirection::CounterClockwise));
        assert_eq!(cmd.arc.r, Some(5.0));
    }

    #[test]
    fn test_arc_without_center_is_geometry_error() {
        let err = parse_line(9, "G2 X10 Z0", &MachineState::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::GeometryError);
        assert_eq!(err.line(), Some(9));
    }

    #[test]
    fn test_arc_radius_disagrees_with_offsets() {
        let err = parse_line(2, "G2 X10 Z0 I5 K0 R7", &MachineState::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::GeometryError);

        // Consistent pair is fine
        assert!(parse_line(2, "G2 X10 Z0 I5 K0 R5", &MachineState::default()).is_ok());
    }

    #[test]
    fn test_arc_radius_too_small() {
        let err = parse_line(2, "G2 X10 Z0 R2", &MachineState::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::GeometryError);
    }

    #[test]
    fn test_arc_conflicting_j_k() {
        let err = parse_line(2, "G2 X10 Z0 I5 J1 K0", &MachineState::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseError);
    }

    #[test]
    fn test_full_circle_from_offsets() {
        let cmd = command("G2 I5 K0", &MachineState::default());
        assert_eq!(cmd.kind, CommandKind::ArcMove(ArcDirection::Clockwise));
        assert_eq!(cmd.end(), cmd.start);
    }

    #[test]
    fn test_arc_outside_xz_left_to_transform() {
        let state = MachineState {
            plane: Plane::XY,
            ..MachineState::default()
        };
        let cmd = command("G2 X10 Z0 R2", &state);
        assert_eq!(cmd.kind, CommandKind::ArcMove(ArcDirection::Clockwise));
    }

    #[test]
    fn test_state_unchanged_by_input() {
        let before = at(1.0, 2.0);
        let parsed = parse("G91 G1 X5 F10", &before);
        assert_eq!(before.position, Position::new(1.0, 2.0));
        assert_eq!(before.positioning, Positioning::Absolute);
        assert_eq!(parsed.state.position, Position::new(6.0, 2.0));
    }
}

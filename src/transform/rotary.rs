//! XZ to rotary motion rewriting.

use tracing::{debug, warn};

use crate::config::{float_cmp, ConvertOptions, FeedScaling, EPS};
use crate::error::{ConvertError, Diagnostics, Result};
use crate::model::{
    Command, CommandKind, FeedRateMode, OutputCommand, OutputKind, OutputLine, OutputProgram,
    PassPlan, Plane, Position, Positioning, Program,
};
use crate::validation::ensure_valid;

use super::angle::{AngleMove, AngleTracker};
use super::arc::{strategy_for, ArcStrategy};
use super::passes::pass_plan_for;

/// Decides when an F word has to be written.
#[derive(Debug, Default)]
struct FeedTracker {
    last: Option<f64>,
    every_move: bool,
}

impl FeedTracker {
    /// F word for a move with rewritten feed `value`.
    ///
    /// Written when the source line had one, when it differs from the last
    /// written value, or on every move under inverse time.
    fn emit(&mut self, value: Option<f64>, explicit: bool) -> Option<f64> {
        let value = value?;
        let changed = self
            .last
            .map_or(true, |last| !float_cmp::approx_eq(last, value));
        if self.every_move || explicit || changed {
            self.last = Some(value);
            Some(value)
        } else {
            None
        }
    }
}

/// Output under construction, shared by all passes.
struct Emitter {
    tracker: AngleTracker,
    feeds: FeedTracker,
    lines: Vec<OutputLine>,
}

impl Emitter {
    fn push(&mut self, cmd: OutputCommand) {
        self.lines.push(OutputLine::Command(cmd));
    }

    fn push_move(&mut self, angle: Option<AngleMove>, mut cmd: OutputCommand) {
        if let Some(AngleMove {
            rebase: Some(rebase),
            ..
        }) = angle
        {
            self.push(OutputCommand::rebase(cmd.source_line, rebase));
        }
        cmd.angle = angle.map(|a| a.word);
        self.push(cmd);
    }
}

/// Round `value` to `precision` decimals.
fn round_to(value: f64, precision: usize) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (value * scale).round() / scale
}

fn is_feed_mode_word(word: &str) -> bool {
    word.strip_prefix('G')
        .and_then(|n| n.parse::<f64>().ok())
        .map_or(false, |v| v == 93.0 || v == 94.0)
}

/// Rewrites a parsed XZ program for a rotary axis.
pub struct RotaryTransform {
    options: ConvertOptions,
    arcs: Box<dyn ArcStrategy>,
    pass_plan: Option<PassPlan>,
}

impl RotaryTransform {
    /// Validate `options` and set up the transform.
    ///
    /// Fails with a configuration error before any command is looked at.
    pub fn new(options: &ConvertOptions) -> Result<Self> {
        ensure_valid(options)?;
        let pass_plan = pass_plan_for(&options.stock)?;
        let arcs = strategy_for(options);
        debug!(
            "Rotary transform: effective diameter {} {}, arcs {}, feed {:?}, wrap {:?}",
            options.stock.effective_diameter(),
            options.stock.unit,
            arcs.name(),
            options.feed,
            options.wrap
        );
        Ok(Self {
            options: options.clone(),
            arcs,
            pass_plan,
        })
    }

    fn inverse_time(&self) -> bool {
        self.options.feed == FeedScaling::InverseTime
    }

    /// Transform `program`, reporting errors according to the options.
    pub fn run(&self, program: &Program) -> Result<OutputProgram> {
        let mut diagnostics = Diagnostics::new(self.options.policy);
        let output = self.run_with(program, &mut diagnostics)?;
        diagnostics.finish()?;
        Ok(output)
    }

    /// Transform `program`, recording command errors into `diagnostics`.
    ///
    /// A failing command contributes no output; the rest is still rewritten
    /// so that every error of the program is found in one run.
    pub fn run_with(
        &self,
        program: &Program,
        diagnostics: &mut Diagnostics,
    ) -> Result<OutputProgram> {
        let mut em = Emitter {
            tracker: AngleTracker::new(self.options.wrap),
            feeds: FeedTracker {
                last: None,
                every_move: self.inverse_time(),
            },
            lines: Vec::new(),
        };

        if self.inverse_time() {
            em.push(OutputCommand::generated("G93"));
        }

        match self.pass_plan {
            None => self.emit_program(program, 0.0, &mut em, diagnostics)?,
            Some(plan) => {
                for pass in 0..plan.passes {
                    self.emit_pass_preamble(pass, &plan, &mut em);
                    self.emit_program(program, plan.offset(pass), &mut em, diagnostics)?;
                    // Later passes repeat the same commands and their errors
                    if !diagnostics.is_empty() {
                        break;
                    }
                }
            }
        }

        if self.inverse_time() {
            em.push(OutputCommand::generated("G94"));
        }
        if self.pass_plan.is_some() {
            self.emit_footer(&mut em);
        }

        let start_unit = program
            .commands()
            .next()
            .map(|c| c.state.units)
            .unwrap_or_default();

        Ok(OutputProgram {
            lines: em.lines,
            degrees_per_unit: self.options.stock.degrees_per_unit(start_unit),
            effective_diameter: self.options.stock.effective_diameter(),
            pass_plan: self.pass_plan,
        })
    }

    fn emit_program(
        &self,
        program: &Program,
        offset: f64,
        em: &mut Emitter,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        for line in &program.lines {
            let Some(cmd) = &line.command else {
                em.lines.push(if line.is_blank() {
                    OutputLine::Blank
                } else {
                    OutputLine::Comment(line.text.clone())
                });
                continue;
            };

            let result = match cmd.kind {
                CommandKind::RapidMove | CommandKind::LinearMove => {
                    self.emit_straight(cmd, offset, em)
                }
                CommandKind::ArcMove(_) => self.emit_arc(cmd, offset, em),
                CommandKind::DwellOrMisc | CommandKind::SetModal => {
                    self.emit_passthrough(cmd, em);
                    Ok(())
                }
            };
            if let Err(err) = result {
                diagnostics.record(err)?;
            }
        }
        Ok(())
    }

    fn degrees_per_unit(&self, cmd: &Command) -> f64 {
        self.options.stock.degrees_per_unit(cmd.state.units)
    }

    /// Words written through, without feed mode words under inverse time.
    fn pass_words(&self, cmd: &Command) -> Vec<String> {
        cmd.words
            .iter()
            .filter(|w| !(self.inverse_time() && is_feed_mode_word(w)))
            .cloned()
            .collect()
    }

    /// Rewritten feed of a move from `from` to `to`.
    ///
    /// `share` is the fraction of the source move's length this piece
    /// covers, used to split inverse-time feeds over arc segments.
    fn move_feed(
        &self,
        cmd: &Command,
        from: Position,
        to: Position,
        k: f64,
        share: f64,
    ) -> Result<Option<f64>> {
        let Some(feed) = cmd.resolved_feed() else {
            if self.inverse_time() {
                return Err(ConvertError::MissingFeed { line: cmd.line });
            }
            warn!("Line {}: no feed rate in effect", cmd.line);
            return Ok(None);
        };

        // Inverse-time input already describes move durations
        if cmd.state.feed_mode == FeedRateMode::InverseTime {
            return Ok(Some(if share > 0.0 { feed / share } else { feed }));
        }

        let dx = to.x - from.x;
        let dz = to.z - from.z;
        let length = (dx * dx + dz * dz).sqrt();
        let value = match self.options.feed {
            FeedScaling::Scaled => feed * k,
            FeedScaling::Blended if length < EPS => feed * k,
            FeedScaling::Blended => feed * ((k * dx).powi(2) + dz * dz).sqrt() / length,
            FeedScaling::InverseTime if length < EPS => feed,
            FeedScaling::InverseTime => feed / length,
        };
        Ok(Some(value))
    }

    fn rapid_feed(&self, cmd: &Command, k: f64) -> Option<f64> {
        let feed = cmd.feed?;
        if self.inverse_time() {
            None
        } else if cmd.state.feed_mode == FeedRateMode::InverseTime {
            Some(feed)
        } else {
            Some(feed * k)
        }
    }

    /// Rotary word for a move from `from` to `to` (X, program units).
    fn angle_move(
        tracker: &mut AngleTracker,
        offset: f64,
        positioning: Positioning,
        from: f64,
        to: f64,
        k: f64,
    ) -> AngleMove {
        match positioning {
            Positioning::Absolute => tracker.move_to(offset + to * k),
            Positioning::Incremental => tracker.move_by((to - from) * k),
        }
    }

    fn emit_straight(&self, cmd: &Command, offset: f64, em: &mut Emitter) -> Result<()> {
        let k = self.degrees_per_unit(cmd);
        let (kind, feed) = match cmd.kind {
            CommandKind::RapidMove => (OutputKind::RapidMove, self.rapid_feed(cmd, k)),
            _ => (
                OutputKind::LinearMove,
                self.move_feed(cmd, cmd.start, cmd.end(), k, 1.0)?,
            ),
        };

        let angle = cmd.x.map(|x| match cmd.state.positioning {
            Positioning::Absolute => em.tracker.move_to(offset + x * k),
            Positioning::Incremental => em.tracker.move_by(x * k),
        });

        let mut out = OutputCommand::new(kind, Some(cmd.line));
        out.line_word = cmd.line_word.clone();
        out.z = cmd.z;
        out.feed = em.feeds.emit(feed, cmd.feed.is_some());
        out.resolved_feed = feed;
        out.words = self.pass_words(cmd);
        out.comments = cmd.comments.clone();
        em.push_move(angle, out);
        Ok(())
    }

    fn emit_arc(&self, cmd: &Command, offset: f64, em: &mut Emitter) -> Result<()> {
        if cmd.state.plane != Plane::XZ {
            return Err(ConvertError::UnsupportedGeometry {
                line: cmd.line,
                message: format!("arc in the {} plane", cmd.state.plane),
            });
        }

        let points = self.arcs.reproject(cmd)?;
        let k = self.degrees_per_unit(cmd);

        let mut from = cmd.start;
        let mut segments = Vec::with_capacity(points.len());
        for to in points {
            segments.push((from, to));
            from = to;
        }
        let total: f64 = segments.iter().map(|(a, b)| a.distance(b)).sum();

        let feeds = segments
            .iter()
            .map(|(a, b)| {
                let share = if total > 0.0 { a.distance(b) / total } else { 1.0 };
                self.move_feed(cmd, *a, *b, k, share)
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("Line {}: arc as {} segments", cmd.line, segments.len());

        // Interior points are rounded to the output precision so that
        // incremental Z deltas add up to the programmed displacement
        let precision = self.options.angle_precision;
        let last = segments.len().saturating_sub(1);
        let z_at = |index: usize, p: Position| {
            if index == last {
                p.z
            } else {
                round_to(p.z, precision)
            }
        };

        let positioning = cmd.state.positioning;
        let mut from_z = cmd.start.z;
        for (index, ((a, b), feed)) in segments.into_iter().zip(feeds).enumerate() {
            let angle = Self::angle_move(&mut em.tracker, offset, positioning, a.x, b.x, k);
            let to_z = z_at(index, b);
            let mut out = OutputCommand::new(OutputKind::LinearMove, Some(cmd.line));
            out.z = Some(match positioning {
                Positioning::Absolute => to_z,
                Positioning::Incremental => to_z - from_z,
            });
            out.z_computed = index != last || positioning == Positioning::Incremental;
            out.feed = em.feeds.emit(feed, index == 0 && cmd.feed.is_some());
            out.resolved_feed = feed;
            if index == 0 {
                out.line_word = cmd.line_word.clone();
                out.words = self.pass_words(cmd);
                out.comments = cmd.comments.clone();
            }
            em.push_move(Some(angle), out);
            from_z = to_z;
        }
        Ok(())
    }

    fn emit_passthrough(&self, cmd: &Command, em: &mut Emitter) {
        let strips_words = self.inverse_time() && cmd.words.iter().any(|w| is_feed_mode_word(w));
        if cmd.feed.is_none() && !strips_words {
            let mut out = OutputCommand::verbatim(cmd.line, cmd.body.clone());
            out.line_word = cmd.line_word.clone();
            em.push(out);
            return;
        }

        let k = self.degrees_per_unit(cmd);
        let feed = cmd.feed.and_then(|f| {
            if self.inverse_time() {
                None
            } else if cmd.state.feed_mode == FeedRateMode::InverseTime {
                Some(f)
            } else {
                Some(f * k)
            }
        });

        let mut out = OutputCommand::new(OutputKind::PassThrough, Some(cmd.line));
        out.line_word = cmd.line_word.clone();
        out.words = self.pass_words(cmd);
        out.comments = cmd.comments.clone();
        out.feed = em.feeds.emit(feed, true);
        out.resolved_feed = feed;
        if out.words.is_empty() && out.feed.is_none() && out.comments.is_empty() {
            debug!("Line {}: nothing left after rewriting, dropped", cmd.line);
            return;
        }
        em.push(out);
    }

    fn emit_pass_preamble(&self, pass: u32, plan: &PassPlan, em: &mut Emitter) {
        em.lines
            .push(OutputLine::Comment(format!("; Pass {} of {}", pass + 1, plan.passes)));
        self.emit_retract(em);
        em.push(OutputCommand::generated("M5"));
        let angle = em.tracker.move_to(plan.offset(pass));
        em.push_move(Some(angle), OutputCommand::new(OutputKind::RapidMove, None));
        em.push(OutputCommand::generated(format!(
            "M3 S{}",
            self.options.spindle_rpm
        )));
    }

    fn emit_retract(&self, em: &mut Emitter) {
        let mut retract = OutputCommand::new(OutputKind::RapidMove, None);
        retract.words = vec!["G90".to_string()];
        retract.z = Some(self.options.safe_z);
        em.push(retract);
    }

    fn emit_footer(&self, em: &mut Emitter) {
        self.emit_retract(em);
        em.push(OutputCommand::generated("M5"));
        let home = em.tracker.home();
        em.push_move(Some(home), OutputCommand::new(OutputKind::RapidMove, None));
        em.push(OutputCommand::generated("M30"));
    }
}

//! Rotary axis position tracking and wrap handling.

use crate::config::{angle::normalize_degrees, float_cmp, WrapMode};

/// Rotary word for one move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleMove {
    /// Rebase to emit before the move, as the new controller position.
    pub rebase: Option<f64>,
    /// Rotary word of the move: a position under G90, a delta under G91.
    pub word: f64,
}

/// Tracks the rotary axis as the controller sees it.
///
/// The logical angle accumulates without bound. Under [`WrapMode::Modulo`]
/// the controller coordinate is pulled back into `[0, 360)` with a rebase
/// whenever a move starts outside that range; `shift` is the total amount
/// removed so far, always a multiple of 360. Move deltas are never altered,
/// so the direction of every move is kept.
#[derive(Debug, Clone)]
pub struct AngleTracker {
    wrap: WrapMode,
    position: f64,
    shift: f64,
}

impl AngleTracker {
    pub fn new(wrap: WrapMode) -> Self {
        Self {
            wrap,
            position: 0.0,
            shift: 0.0,
        }
    }

    /// Controller position of the axis.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Unwrapped angle.
    pub fn logical(&self) -> f64 {
        self.position + self.shift
    }

    fn rebase_if_needed(&mut self, delta: f64) -> Option<f64> {
        if self.wrap != WrapMode::Modulo || float_cmp::approx_zero(delta) {
            return None;
        }
        if (0.0..360.0).contains(&self.position) {
            return None;
        }
        let normalized = normalize_degrees(self.position);
        self.shift += self.position - normalized;
        self.position = normalized;
        Some(normalized)
    }

    /// Absolute move to the logical angle `target`.
    pub fn move_to(&mut self, target: f64) -> AngleMove {
        let rebase = self.rebase_if_needed(target - self.logical());
        self.position = target - self.shift;
        AngleMove {
            rebase,
            word: self.position,
        }
    }

    /// Incremental move by `delta`.
    pub fn move_by(&mut self, delta: f64) -> AngleMove {
        let rebase = self.rebase_if_needed(delta);
        self.position += delta;
        AngleMove {
            rebase,
            word: delta,
        }
    }

    /// Return the controller to zero.
    pub fn home(&mut self) -> AngleMove {
        self.position = 0.0;
        AngleMove {
            rebase: None,
            word: 0.0,
        }
    }
}

//! Rotary transformation of parsed programs.

mod angle;
mod arc;
mod passes;
mod rotary;

pub use angle::{AngleMove, AngleTracker};
pub use arc::{strategy_for, ArcPath, ArcStrategy, RejectArcs, SegmentArcs};
pub use passes::{pass_plan_for, plan_passes};
pub use rotary::RotaryTransform;

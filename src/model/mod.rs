//! Data model types for rotary conversion.

mod command;
mod output;
mod program;
mod state;
mod stock;

pub use command::{ArcDirection, ArcWords, Command, CommandKind};
pub use output::{OutputCommand, OutputKind, OutputLine, OutputProgram, PassPlan};
pub use program::{Program, ProgramSummary, SourceLine};
pub use state::{FeedRateMode, MachineState, MotionMode, Plane, Position, Positioning};
pub use stock::Stock;

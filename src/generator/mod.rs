//! G-code generator module.

mod gcode;
mod program;

pub use gcode::{format_coord, format_exact, GcodeWriter};
pub use program::{format_command, generate_gcode};

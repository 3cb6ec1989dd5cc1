//! G-code parser module.

mod line;
mod program;
mod words;

pub use line::{parse_line, ParsedLine};
pub use program::{detect_tool_diameter, parse_program, parse_program_with};
pub use words::{split_comments, strip_line_number, tokenize, Word};

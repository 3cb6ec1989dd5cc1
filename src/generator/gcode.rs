//! G-code writing utilities.

use crate::config::Numbering;

/// G-code writer with optional renumbering.
pub struct GcodeWriter {
    numbering: Numbering,
    /// Next line number when renumbering.
    line_number: u32,
    /// Output buffer.
    buffer: String,
}

impl GcodeWriter {
    /// Create a new G-code writer.
    pub fn new(numbering: Numbering) -> Self {
        let line_number = match numbering {
            Numbering::Renumber { start, .. } => start,
            Numbering::Preserve => 0,
        };
        Self {
            numbering,
            line_number,
            buffer: String::new(),
        }
    }

    /// Get the next line number when renumbering.
    pub fn current_line(&self) -> u32 {
        self.line_number
    }

    /// Get the generated G-code.
    pub fn output(&self) -> &str {
        &self.buffer
    }

    /// Take the generated G-code.
    pub fn take_output(self) -> String {
        self.buffer
    }

    /// Write a command line.
    ///
    /// `line_word` is the source `N` word, kept unless renumbering.
    pub fn write_line(&mut self, line_word: Option<&str>, content: &str) {
        match self.numbering {
            Numbering::Renumber { increment, .. } => {
                self.buffer.push_str(&format!("N{} ", self.line_number));
                self.line_number = self.line_number.saturating_add(increment);
            }
            Numbering::Preserve => {
                if let Some(word) = line_word {
                    self.buffer.push_str(word);
                    if !content.is_empty() {
                        self.buffer.push(' ');
                    }
                }
            }
        }
        self.write_raw(content);
    }

    /// Write a line without numbering.
    pub fn write_raw(&mut self, content: &str) {
        self.buffer.push_str(content);
        self.buffer.push('\n');
    }

    /// Write a comment line.
    pub fn write_comment(&mut self, comment: &str) {
        if comment.is_empty() {
            self.write_raw(";");
        } else {
            self.write_raw(&format!("; {}", comment));
        }
    }
}

fn clean_zero(s: String) -> String {
    if s == "-0" {
        "0".to_string()
    } else {
        s
    }
}

/// Format a value with at most `precision` decimals, trailing zeros removed.
pub fn format_coord(value: f64, precision: usize) -> String {
    let s = format!("{:.*}", precision, value);
    let s = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    };
    clean_zero(s)
}

/// Format a value with its shortest exact representation.
pub fn format_exact(value: f64) -> String {
    clean_zero(format!("{}", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_coord() {
        assert_eq!(format_coord(0.0, 4), "0");
        assert_eq!(format_coord(1.0, 4), "1");
        assert_eq!(format_coord(1.5, 4), "1.5");
        assert_eq!(format_coord(57.295779513, 4), "57.2958");
        assert_eq!(format_coord(-0.00001, 4), "0");
        assert_eq!(format_coord(-12.26, 1), "-12.3");
        assert_eq!(format_coord(120.0, 0), "120");
    }

    #[test]
    fn test_format_exact() {
        assert_eq!(format_exact(5.0), "5");
        assert_eq!(format_exact(-1.25), "-1.25");
        assert_eq!(format_exact(-0.0), "0");
        assert_eq!(format_exact(0.1), "0.1");
    }

    #[test]
    fn test_writer_preserves_line_words() {
        let mut writer = GcodeWriter::new(Numbering::Preserve);
        writer.write_line(Some("N10"), "G1 A5");
        writer.write_line(None, "M5");
        writer.write_comment("done");
        assert_eq!(writer.output(), "N10 G1 A5\nM5\n; done\n");
    }

    #[test]
    fn test_writer_renumbers() {
        let mut writer = GcodeWriter::new(Numbering::Renumber {
            start: 100,
            increment: 5,
        });
        writer.write_line(Some("N1"), "G0 Z5");
        writer.write_raw("(note)");
        writer.write_line(None, "M30");
        assert_eq!(writer.current_line(), 110);
        assert_eq!(writer.take_output(), "N100 G0 Z5\n(note)\nN105 M30\n");
    }
}

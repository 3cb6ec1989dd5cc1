//! Option and program validation.

mod validate;

pub use validate::{check_program_extent, ensure_valid, validate_options, ValidationResult};

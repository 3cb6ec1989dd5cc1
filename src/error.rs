//! Error types for rotary conversion.

use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

use crate::config::ReportingPolicy;

/// Error codes for conversion failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// File not found (-1)
    FileNotFound = -1,
    /// Empty file (-2)
    EmptyFile = -2,
    /// Malformed line or value (-3)
    ParseError = -3,
    /// Program holds no commands (-4)
    EmptyProgram = -4,
    /// Inconsistent or underspecified arc (E100)
    GeometryError = 100,
    /// Arc cannot be expressed under current settings (E101)
    UnsupportedGeometry = 101,
    /// Feed move without an active feed rate (E102)
    MissingFeed = 102,
    /// Invalid stock or options (E200)
    ConfigurationError = 200,
    /// Options file could not be read (E201)
    InvalidOptions = 201,
    /// Several line errors reported together (E300)
    BatchReport = 300,
}

/// Main error type for the converter.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Empty file: {path}")]
    EmptyFile { path: PathBuf },

    #[error("Parse error at line {line}: {message} in '{text}'")]
    Parse {
        line: usize,
        text: String,
        message: String,
    },

    #[error("Geometry error at line {line}: {message}")]
    Geometry { line: usize, message: String },

    #[error("Unsupported geometry at line {line}: {message}")]
    UnsupportedGeometry { line: usize, message: String },

    #[error("No feed rate active for feed move at line {line}")]
    MissingFeed { line: usize },

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("Program contains no commands")]
    EmptyProgram,

    #[error("{0}")]
    Report(ErrorReport),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid options file: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertError {
    /// Get the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ConvertError::FileNotFound { .. } => ErrorCode::FileNotFound,
            ConvertError::EmptyFile { .. } => ErrorCode::EmptyFile,
            ConvertError::Parse { .. } => ErrorCode::ParseError,
            ConvertError::Geometry { .. } => ErrorCode::GeometryError,
            ConvertError::UnsupportedGeometry { .. } => ErrorCode::UnsupportedGeometry,
            ConvertError::MissingFeed { .. } => ErrorCode::MissingFeed,
            ConvertError::Configuration { .. } => ErrorCode::ConfigurationError,
            ConvertError::EmptyProgram => ErrorCode::EmptyProgram,
            ConvertError::Report(_) => ErrorCode::BatchReport,
            ConvertError::Io(_) => ErrorCode::FileNotFound,
            ConvertError::Json(_) => ErrorCode::InvalidOptions,
        }
    }

    /// Get the numeric error code value.
    pub fn code_value(&self) -> i32 {
        self.code() as i32
    }

    /// Source line the error refers to, when it is local to a line.
    pub fn line(&self) -> Option<usize> {
        match self {
            ConvertError::Parse { line, .. }
            | ConvertError::Geometry { line, .. }
            | ConvertError::UnsupportedGeometry { line, .. }
            | ConvertError::MissingFeed { line } => Some(*line),
            _ => None,
        }
    }
}

/// Line errors of one conversion, ordered by source line.
#[derive(Debug, Default)]
pub struct ErrorReport {
    errors: Vec<ConvertError>,
}

impl ErrorReport {
    /// Build a report, sorting the errors by line number.
    pub fn new(mut errors: Vec<ConvertError>) -> Self {
        errors.sort_by_key(|e| e.line().unwrap_or(0));
        Self { errors }
    }

    /// Errors in line order.
    pub fn errors(&self) -> &[ConvertError] {
        &self.errors
    }

    /// Number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether the report is empty.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Line numbers in report order.
    pub fn lines(&self) -> Vec<usize> {
        self.errors.iter().filter_map(|e| e.line()).collect()
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error(s) in program", self.errors.len())?;
        for err in &self.errors {
            write!(f, "\n  {}", err)?;
        }
        Ok(())
    }
}

/// Collects line errors according to the reporting policy.
///
/// In strict mode `record` hands the error straight back so the caller's `?`
/// aborts; in batch mode the error is kept and processing continues.
#[derive(Debug)]
pub struct Diagnostics {
    policy: ReportingPolicy,
    errors: Vec<ConvertError>,
}

impl Diagnostics {
    /// Create an empty collector.
    pub fn new(policy: ReportingPolicy) -> Self {
        Self {
            policy,
            errors: Vec::new(),
        }
    }

    /// Record a line error.
    pub fn record(&mut self, err: ConvertError) -> Result<()> {
        match self.policy {
            ReportingPolicy::Strict => Err(err),
            ReportingPolicy::Batch => {
                warn!("{}", err);
                self.errors.push(err);
                Ok(())
            }
        }
    }

    /// Number of recorded errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turn the recorded errors into a batch report, if any.
    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ConvertError::Report(ErrorReport::new(self.errors)))
        }
    }
}

/// Result type alias for converter operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(line: usize) -> ConvertError {
        ConvertError::Geometry {
            line,
            message: "bad arc".to_string(),
        }
    }

    #[test]
    fn test_batch_collects_and_sorts() {
        let mut diagnostics = Diagnostics::new(ReportingPolicy::Batch);
        diagnostics.record(geometry(7)).unwrap();
        diagnostics.record(ConvertError::MissingFeed { line: 3 }).unwrap();
        assert_eq!(diagnostics.len(), 2);

        match diagnostics.finish() {
            Err(ConvertError::Report(report)) => {
                assert_eq!(report.lines(), vec![3, 7]);
                assert!(report.to_string().starts_with("2 error(s)"));
            }
            other => panic!("expected report, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_returns_first_error() {
        let mut diagnostics = Diagnostics::new(ReportingPolicy::Strict);
        let err = diagnostics.record(geometry(4)).unwrap_err();
        assert_eq!(err.line(), Some(4));
        assert!(diagnostics.is_empty());
        assert!(diagnostics.finish().is_ok());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(geometry(1).code(), ErrorCode::GeometryError);
        assert_eq!(
            ConvertError::Configuration {
                message: String::new()
            }
            .code_value(),
            200
        );
        assert_eq!(ConvertError::EmptyProgram.code_value(), -4);
    }
}

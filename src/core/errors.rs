//! Centralized error handling for the report engine
//!
//! Every stage of a render call (normalization, chart drawing, format assembly)
//! reports failures through [`ReportEngineError`] so callers can tell which stage
//! failed and decide whether to retry with corrected input.

use std::fmt;
use thiserror::Error;

use crate::report::ReportFormat;

/// Main error type for report engine operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportEngineError {
    #[error("Malformed scan input: {message}")]
    MalformedInput { message: String },

    #[error("Failed to generate {format} report: {message}")]
    ReportGeneration {
        format: ReportFormat,
        message: String,
    },

    #[error("Chart '{chart}' could not be rendered: {message}")]
    ChartRender { chart: String, message: String },

    #[error("Unsupported report format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported scan type: {0}")]
    UnsupportedScanType(String),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },
}

/// Result type for report engine operations
pub type ReportResult<T> = Result<T, ReportEngineError>;

impl ReportEngineError {
    /// Create a new malformed input error
    pub fn malformed_input<S: Into<String>>(message: S) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    /// Create a new generation error for the given format
    pub fn generation<S: Into<String>>(format: ReportFormat, message: S) -> Self {
        Self::ReportGeneration {
            format,
            message: message.into(),
        }
    }

    /// Create a new chart error
    pub fn chart<S1: Into<String>, S2: Into<String>>(chart: S1, message: S2) -> Self {
        Self::ChartRender {
            chart: chart.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Stage of the pipeline that produced this error
    pub fn stage(&self) -> ErrorStage {
        match self {
            ReportEngineError::MalformedInput { .. } => ErrorStage::Normalize,
            ReportEngineError::ReportGeneration { format, .. } => ErrorStage::Render(*format),
            ReportEngineError::ChartRender { .. } => ErrorStage::Chart,
            ReportEngineError::UnsupportedFormat(_) | ReportEngineError::UnsupportedScanType(_) => {
                ErrorStage::Argument
            }
            ReportEngineError::Config { .. } => ErrorStage::Configuration,
            ReportEngineError::Io { .. } => ErrorStage::Io,
        }
    }

    /// Whether resubmitting with corrected input could succeed
    pub fn is_input_error(&self) -> bool {
        matches!(
            self.stage(),
            ErrorStage::Normalize | ErrorStage::Argument
        )
    }
}

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStage {
    Normalize,
    Render(ReportFormat),
    Chart,
    Argument,
    Configuration,
    Io,
}

impl fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorStage::Normalize => write!(f, "normalize"),
            ErrorStage::Render(format) => write!(f, "render-{}", format.tag()),
            ErrorStage::Chart => write!(f, "chart"),
            ErrorStage::Argument => write!(f, "argument"),
            ErrorStage::Configuration => write!(f, "configuration"),
            ErrorStage::Io => write!(f, "io"),
        }
    }
}

impl From<std::io::Error> for ReportEngineError {
    fn from(err: std::io::Error) -> Self {
        ReportEngineError::io(format!("I/O operation failed: {}", err))
    }
}

impl From<serde_json::Error> for ReportEngineError {
    fn from(err: serde_json::Error) -> Self {
        ReportEngineError::malformed_input(format!("JSON parsing failed: {}", err))
    }
}

impl From<serde_yaml::Error> for ReportEngineError {
    fn from(err: serde_yaml::Error) -> Self {
        ReportEngineError::config(format!("YAML parsing failed: {}", err))
    }
}

/// Utility functions for error handling
pub mod utils {
    use super::*;
    use tracing::{error, warn};

    /// Log an error with a level matching the stage it came from
    pub fn log_error(err: &ReportEngineError) {
        match err.stage() {
            ErrorStage::Chart => {
                warn!(stage = %err.stage(), error = %err, "Chart skipped");
            }
            ErrorStage::Normalize | ErrorStage::Argument => {
                warn!(stage = %err.stage(), error = %err, "Rejected report input");
            }
            ErrorStage::Render(_) | ErrorStage::Configuration | ErrorStage::Io => {
                error!(stage = %err.stage(), error = %err, "Report generation failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_stage() {
        let err = ReportEngineError::malformed_input("missing host");
        assert_eq!(err.stage(), ErrorStage::Normalize);
        assert!(err.is_input_error());

        let err = ReportEngineError::generation(ReportFormat::Pdf, "font failure");
        assert_eq!(err.stage(), ErrorStage::Render(ReportFormat::Pdf));
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_generation_error_names_format() {
        let err = ReportEngineError::generation(ReportFormat::Html, "boom");
        let message = err.to_string();
        assert!(message.contains("hypertext"));
        assert!(message.contains("boom"));
        assert_eq!(err.stage().to_string(), "render-hypertext");
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ReportEngineError = parse_err.into();
        assert!(matches!(err, ReportEngineError::MalformedInput { .. }));
    }
}

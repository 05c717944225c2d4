pub mod config;
pub mod errors;

// Re-export commonly used types
pub use config::Config;
pub use errors::{ErrorStage, ReportEngineError, ReportResult};

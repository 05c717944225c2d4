//! NScan report engine
//!
//! Turns network scan results into security reports: a paginated PDF, a CSV
//! export and a self-contained HTML page, with risk tiers, recommendations
//! and embedded charts.

pub mod analysis;
pub mod core;
pub mod report;
pub mod scan;
pub mod testing;

pub use crate::core::{Config, ErrorStage, ReportEngineError, ReportResult};
pub use report::{RenderedReport, ReportEngine, ReportFormat, ReportMetadata};
pub use scan::{normalize, Finding, NormalizedScan, RiskLevel, ScanInput, ScanResult, ScanType};

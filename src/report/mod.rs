//! Report assembly
//!
//! A render call normalizes the scan once, aggregates statistics, draws the
//! charts, and hands the resulting [`ReportData`] to exactly one
//! [`Reporter`]. Reporters are built fresh for every call and own their
//! document builder, so independent calls never share mutable state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::analysis::{KnowledgeBase, OsStatistics, RecommendationEngine, ReportStatistics};
use crate::core::errors::{ReportEngineError, ReportResult};
use crate::scan::{NormalizedScan, ScanType};

pub mod charts;
pub mod csv_reporter;
pub mod html_reporter;
pub mod manager;
pub mod pagination;
pub mod pdf_reporter;
pub mod theme;

pub use charts::{Chart, ChartKind, ChartOptions, Charts, LegendEntry};
pub use manager::ReportEngine;
pub use theme::{Palette, RgbColor};

/// Output artifact kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Pdf,
    Csv,
    Html,
}

impl ReportFormat {
    /// Boundary tag of the format
    pub fn tag(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "paginated-document",
            ReportFormat::Csv => "tabular",
            ReportFormat::Html => "hypertext",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "application/pdf",
            ReportFormat::Csv => "text/csv",
            ReportFormat::Html => "text/html",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Csv => "csv",
            ReportFormat::Html => "html",
        }
    }

    pub fn all() -> [ReportFormat; 3] {
        [ReportFormat::Pdf, ReportFormat::Csv, ReportFormat::Html]
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = ReportEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" | "paginated-document" => Ok(ReportFormat::Pdf),
            "csv" | "tabular" => Ok(ReportFormat::Csv),
            "html" | "hypertext" => Ok(ReportFormat::Html),
            _ => Err(ReportEngineError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Caller-supplied description of the scan being reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub scan_type: ScanType,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<String>,
}

impl ReportMetadata {
    pub fn new<S: Into<String>>(scan_type: ScanType, timestamp: S) -> Self {
        Self {
            scan_type,
            timestamp: timestamp.into(),
            scan_id: None,
        }
    }

    pub fn with_scan_id<S: Into<String>>(mut self, scan_id: S) -> Self {
        self.scan_id = Some(scan_id.into()).filter(|id| !id.is_empty());
        self
    }

    /// Scan type in upper case, as printed on cover pages
    pub fn scan_type_label(&self) -> String {
        self.scan_type.tag().to_uppercase()
    }
}

/// Document layout chosen from the scan type, once per render call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportShape {
    /// Port findings, risk tiers and recommendations
    Standard,
    /// OS distributions and per-host OS matches
    OsDetection,
}

impl From<ScanType> for ReportShape {
    fn from(scan_type: ScanType) -> Self {
        match scan_type {
            ScanType::Os => ReportShape::OsDetection,
            // service and vuln scans carry no extra sections yet
            _ => ReportShape::Standard,
        }
    }
}

/// Immutable styling and reference data handed to every reporter
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub palette: Palette,
    pub knowledge_base: Arc<KnowledgeBase>,
    pub title: String,
    pub charts: ChartOptions,
    pub pdf: pdf_reporter::PdfLayout,
}

pub const DEFAULT_TITLE: &str = "NScan Enhanced Security Report";

impl Default for ReportContext {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            knowledge_base: Arc::new(KnowledgeBase::builtin()),
            title: DEFAULT_TITLE.to_string(),
            charts: ChartOptions::default(),
            pdf: pdf_reporter::PdfLayout::default(),
        }
    }
}

impl ReportContext {
    pub fn recommendations(&self) -> RecommendationEngine {
        RecommendationEngine::new(Arc::clone(&self.knowledge_base))
    }
}

/// Everything a reporter needs for one render call
#[derive(Debug, Clone)]
pub struct ReportData {
    pub metadata: ReportMetadata,
    pub shape: ReportShape,
    pub scan: NormalizedScan,
    pub statistics: ReportStatistics,
    pub os_statistics: OsStatistics,
    pub charts: Charts,
}

impl ReportData {
    /// Aggregate a normalized scan; charts are attached separately
    pub fn new(metadata: ReportMetadata, scan: NormalizedScan) -> Self {
        let statistics = ReportStatistics::aggregate(&scan);
        let os_statistics = OsStatistics::from_normalized(&scan);
        Self {
            shape: ReportShape::from(metadata.scan_type),
            metadata,
            scan,
            statistics,
            os_statistics,
            charts: Charts::default(),
        }
    }

    pub fn with_charts(mut self, charts: Charts) -> Self {
        self.charts = charts;
        self
    }
}

/// A complete artifact ready to hand to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReport {
    pub format: ReportFormat,
    pub content: Vec<u8>,
    pub mime_type: &'static str,
}

impl RenderedReport {
    pub fn new(format: ReportFormat, content: Vec<u8>) -> Self {
        Self {
            format,
            content,
            mime_type: format.mime_type(),
        }
    }

    /// Content as UTF-8 text; `None` for binary artifacts
    pub fn as_text(&self) -> Option<&str> {
        match self.format {
            ReportFormat::Pdf => None,
            ReportFormat::Csv | ReportFormat::Html => std::str::from_utf8(&self.content).ok(),
        }
    }

    /// `nscan_report_<scan type>[_<first 8 chars of scan id>].<ext>`
    pub fn suggested_filename(&self, metadata: &ReportMetadata) -> String {
        let mut name = format!("nscan_report_{}", metadata.scan_type.tag());
        if let Some(id) = &metadata.scan_id {
            let short: String = id.chars().take(8).collect();
            name.push('_');
            name.push_str(&short);
        }
        format!("{}.{}", name, self.format.file_extension())
    }
}

/// One output format
pub trait Reporter {
    /// Assemble the complete artifact or fail without partial output
    fn render(&self, data: &ReportData) -> ReportResult<Vec<u8>>;

    fn format(&self) -> ReportFormat;

    fn format_name(&self) -> &'static str;

    fn file_extension(&self) -> &'static str {
        self.format().file_extension()
    }
}

/// Escape text for HTML element and attribute content
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

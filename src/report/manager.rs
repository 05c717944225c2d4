use tracing::{info, warn};

use crate::core::errors::{utils::log_error, ReportEngineError, ReportResult};
use crate::report::{
    charts::ChartRenderer, csv_reporter::CsvReporter, html_reporter::HtmlReporter,
    pdf_reporter::PdfReporter, RenderedReport, ReportContext, ReportData, ReportFormat,
    ReportMetadata, Reporter,
};
use crate::scan::{normalize, ScanInput};

/// Report engine - normalizes a scan and drives one reporter per call
pub struct ReportEngine {
    context: ReportContext,
}

impl Default for ReportEngine {
    fn default() -> Self {
        Self::new(ReportContext::default())
    }
}

impl ReportEngine {
    pub fn new(context: ReportContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ReportContext {
        &self.context
    }

    /// Normalize and aggregate a scan; charts are drawn only when asked for
    /// and enabled in the context
    pub fn prepare(
        &self,
        input: impl Into<ScanInput>,
        metadata: ReportMetadata,
        with_charts: bool,
    ) -> ReportResult<ReportData> {
        let scan = normalize(input).map_err(|e| {
            log_error(&e);
            e
        })?;

        let data = ReportData::new(metadata, scan);
        if !(with_charts && self.context.charts.enabled) {
            return Ok(data);
        }

        let charts = ChartRenderer::new(&self.context.palette, &self.context.charts)
            .render(&data.scan.findings, &data.scan.port_states);
        Ok(data.with_charts(charts))
    }

    /// Produce one artifact in the given format
    pub fn render(
        &self,
        format: ReportFormat,
        input: impl Into<ScanInput>,
        metadata: ReportMetadata,
    ) -> ReportResult<RenderedReport> {
        info!(
            format = %format,
            scan_type = %metadata.scan_type,
            "Starting report generation"
        );

        let with_charts = matches!(format, ReportFormat::Pdf | ReportFormat::Html);
        let data = self.prepare(input, metadata, with_charts)?;
        let reporter = self.reporter(format);
        self.render_with(reporter.as_ref(), &data)
    }

    /// Run an already-built reporter over prepared data
    pub fn render_with(&self, reporter: &dyn Reporter, data: &ReportData) -> ReportResult<RenderedReport> {
        let format = reporter.format();
        let content = reporter.render(data).map_err(|e| {
            let err = match e {
                ReportEngineError::ReportGeneration { .. } => e,
                other => ReportEngineError::generation(format, other.to_string()),
            };
            log_error(&err);
            err
        })?;

        info!(
            format = reporter.format_name(),
            findings = data.scan.findings.len(),
            bytes = content.len(),
            "Report generated"
        );
        Ok(RenderedReport::new(format, content))
    }

    /// Render several formats from one input; a failing format is skipped
    /// unless every format fails
    pub fn render_all(
        &self,
        formats: &[ReportFormat],
        input: impl Into<ScanInput>,
        metadata: ReportMetadata,
    ) -> ReportResult<Vec<RenderedReport>> {
        let scan = input.into().into_scan_result().map_err(|e| {
            log_error(&e);
            e
        })?;

        let mut rendered = Vec::new();
        let mut last_error = None;
        for &format in formats {
            match self.render(format, scan.clone(), metadata.clone()) {
                Ok(report) => rendered.push(report),
                Err(e) => {
                    warn!("Failed to generate {} report: {}", format, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if rendered.is_empty() => Err(e),
            _ => Ok(rendered),
        }
    }

    /// Fresh reporter for one call
    pub fn reporter(&self, format: ReportFormat) -> Box<dyn Reporter> {
        match format {
            ReportFormat::Pdf => Box::new(PdfReporter::new(&self.context)),
            ReportFormat::Csv => Box::new(CsvReporter::new(&self.context)),
            ReportFormat::Html => Box::new(HtmlReporter::new(&self.context)),
        }
    }

    /// Formats this engine can produce
    pub fn supported_formats(&self) -> Vec<ReportFormat> {
        ReportFormat::all().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorStage;
    use crate::report::ChartOptions;
    use crate::scan::ScanType;
    use crate::testing::{MockReporter, TestUtils};

    #[test]
    fn test_render_with_wraps_reporter_io_error() {
        let engine = ReportEngine::default();
        let data = engine
            .prepare(TestUtils::mixed_scan(), TestUtils::metadata(ScanType::Full), false)
            .unwrap();

        let err = engine
            .render_with(&MockReporter::new(ReportFormat::Html).with_failure(), &data)
            .unwrap_err();
        match err {
            ReportEngineError::ReportGeneration { format, ref message } => {
                assert_eq!(format, ReportFormat::Html);
                assert!(message.contains("Mock reporter failure"), "{}", message);
            }
            other => panic!("Expected a generation error, got {:?}", other),
        }
    }

    #[test]
    fn test_engine_renders_every_format() {
        let engine = ReportEngine::default();
        for format in engine.supported_formats() {
            let report = engine
                .render(format, TestUtils::mixed_scan(), TestUtils::metadata(ScanType::Full))
                .unwrap();
            assert_eq!(report.format, format);
            assert!(!report.content.is_empty());
        }
    }

    #[test]
    fn test_malformed_input_fails_at_normalize() {
        let engine = ReportEngine::default();
        let result = engine.render(
            ReportFormat::Csv,
            r#"{"status": "ok"}"#,
            TestUtils::metadata(ScanType::Quick),
        );
        crate::assert_error_stage!(result, ErrorStage::Normalize);
    }

    #[test]
    fn test_prepare_without_charts() {
        let engine = ReportEngine::default();
        let data = engine
            .prepare(TestUtils::mixed_scan(), TestUtils::metadata(ScanType::Quick), false)
            .unwrap();
        assert!(data.charts.is_empty());

        let data = engine
            .prepare(TestUtils::mixed_scan(), TestUtils::metadata(ScanType::Quick), true)
            .unwrap();
        assert_eq!(data.charts.len(), 3);
    }

    #[test]
    fn test_charts_disabled_in_context() {
        let context = ReportContext {
            charts: ChartOptions {
                enabled: false,
                ..ChartOptions::default()
            },
            ..ReportContext::default()
        };
        let engine = ReportEngine::new(context);
        let data = engine
            .prepare(TestUtils::mixed_scan(), TestUtils::metadata(ScanType::Quick), true)
            .unwrap();
        assert!(data.charts.is_empty());
    }

    #[test]
    fn test_render_all() {
        let engine = ReportEngine::default();
        let reports = engine
            .render_all(
                &[ReportFormat::Csv, ReportFormat::Html],
                TestUtils::telnet_https_scan(),
                TestUtils::metadata(ScanType::Quick),
            )
            .unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].mime_type, "text/csv");
        assert_eq!(reports[1].mime_type, "text/html");
    }

    #[test]
    fn test_render_all_rejects_bad_input() {
        let engine = ReportEngine::default();
        let result = engine.render_all(&ReportFormat::all(), "[1, 2]", TestUtils::metadata(ScanType::Quick));
        crate::assert_error_stage!(result, ErrorStage::Normalize);
    }
}

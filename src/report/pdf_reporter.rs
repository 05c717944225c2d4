use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageFilter, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Rect, Rgb,
};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

use crate::analysis::recommendations::OS_RECOMMENDATIONS;
use crate::analysis::RecommendationEngine;
use crate::core::errors::{utils::log_error, ReportEngineError, ReportResult};
use crate::report::pagination::PageCursor;
use crate::report::theme::{Palette, RgbColor};
use crate::report::{Chart, ReportContext, ReportData, ReportFormat, ReportShape, Reporter};
use crate::scan::Finding;

const PT_TO_MM: f32 = 0.3528;
const WHITE: RgbColor = RgbColor(255, 255, 255);
const ROW_FILL: RgbColor = RgbColor(245, 245, 245);
const SCRIPT_OUTPUT_LIMIT: usize = 300;
const CHART_JPEG_QUALITY: u8 = 90;

/// Paper size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    A4,
    Letter,
}

impl PageSize {
    /// (width, height) in mm
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
        }
    }
}

/// Page geometry from the `pdf` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfLayout {
    pub page_size: PageSize,
    pub margin_mm: f32,
}

impl Default for PdfLayout {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            margin_mm: 20.0,
        }
    }
}

/// Builds the paginated security report
pub struct PdfReporter {
    title: String,
    palette: Palette,
    recommendations: RecommendationEngine,
    page_size: (f32, f32),
    margin: f32,
    font_size_title: f32,
    font_size_heading: f32,
    font_size_subheading: f32,
    font_size_body: f32,
    font_size_small: f32,
}

impl PdfReporter {
    pub fn new(context: &ReportContext) -> Self {
        Self {
            title: context.title.clone(),
            palette: context.palette.clone(),
            recommendations: context.recommendations(),
            page_size: context.pdf.page_size.dimensions(),
            margin: context.pdf.margin_mm,
            font_size_title: 20.0,
            font_size_heading: 16.0,
            font_size_subheading: 13.0,
            font_size_body: 11.0,
            font_size_small: 9.0,
        }
    }

    pub fn a4(context: &ReportContext) -> Self {
        Self {
            page_size: PageSize::A4.dimensions(),
            ..Self::new(context)
        }
    }

    pub fn letter(context: &ReportContext) -> Self {
        Self {
            page_size: PageSize::Letter.dimensions(),
            ..Self::new(context)
        }
    }

    fn render_pdf(&self, data: &ReportData) -> ReportResult<Vec<u8>> {
        let mut canvas = Canvas::new(&self.title, self.page_size, self.margin, self.palette.dark)?;

        self.add_cover(&mut canvas, data);

        match data.shape {
            ReportShape::Standard => {
                self.add_executive_summary(&mut canvas, data);
                self.add_charts(&mut canvas, data);
                self.add_findings_table(&mut canvas, data);
                self.add_recommendations(&mut canvas, data);
                self.add_script_results(&mut canvas, data);
            }
            ReportShape::OsDetection => {
                self.add_os_summary(&mut canvas, data);
                self.add_os_details(&mut canvas, data);
                self.add_os_recommendations(&mut canvas);
            }
        }

        canvas.finish()
    }

    fn add_cover(&self, canvas: &mut Canvas, data: &ReportData) {
        let banner_height = 30.0;
        let (width, height) = self.page_size;
        canvas.fill_rect(0.0, height - banner_height, width, banner_height, self.palette.primary);
        canvas.set_text_color(WHITE);
        canvas.text_at(
            &self.title,
            self.font_size_title,
            self.margin,
            height - banner_height / 2.0 - 3.0,
            true,
        );
        canvas.reset_text_color();

        canvas.advance(banner_height + 4.0 - self.margin);
        canvas.line(
            &format!("Scan Type: {}", data.metadata.scan_type_label()),
            self.font_size_body,
            false,
            0.0,
        );
        if let Some(scan_id) = &data.metadata.scan_id {
            canvas.line(&format!("Scan ID: {}", scan_id), self.font_size_body, false, 0.0);
        }
        canvas.line(
            &format!("Generated on: {}", data.metadata.timestamp),
            self.font_size_body,
            false,
            0.0,
        );
    }

    fn add_executive_summary(&self, canvas: &mut Canvas, data: &ReportData) {
        let stats = &data.statistics;

        canvas.page_break();
        canvas.line("Executive Summary", self.font_size_heading, true, 0.0);
        canvas.paragraph(
            &format!(
                "This report presents a comprehensive security analysis of the scan performed on {}. {}",
                data.metadata.timestamp,
                stats.narrative()
            ),
            self.font_size_body,
            0.0,
        );
        canvas.advance(4.0);

        let rows = [
            ("Total Hosts", stats.total_hosts),
            ("Open Ports", stats.open_ports),
            ("Closed Ports", stats.closed_ports),
            ("Filtered Ports", stats.filtered_ports),
            ("High Risk Findings", stats.risk.high),
            ("Medium Risk Findings", stats.risk.medium),
            ("Low Risk Findings", stats.risk.low),
        ];
        let rows: Vec<(String, String)> = rows
            .iter()
            .map(|(label, value)| (label.to_string(), value.to_string()))
            .collect();

        self.two_column_table(canvas, ("Metric", "Value"), &rows);
    }

    fn add_charts(&self, canvas: &mut Canvas, data: &ReportData) {
        if data.charts.is_empty() {
            return;
        }

        canvas.page_break();
        canvas.line("Visual Analysis", self.font_size_heading, true, 0.0);

        for chart in data.charts.iter() {
            if let Err(err) = self.add_chart(canvas, chart) {
                log_error(&err);
            }
        }
    }

    fn add_chart(&self, canvas: &mut Canvas, chart: &Chart) -> ReportResult<()> {
        let image_width = canvas.content_width() * 0.55;
        let image_height = image_width * chart.height as f32 / chart.width.max(1) as f32;
        let title_height = line_height(self.font_size_subheading);

        canvas.ensure(title_height + image_height + 6.0);
        canvas.line(chart.kind.title(), self.font_size_subheading, true, 0.0);

        let top = canvas.position();
        canvas.image(&chart.png, chart.kind.key(), self.margin, top - image_height, image_width)?;

        // legend beside the image
        let legend_x = self.margin + image_width + 6.0;
        let mut y = top - 5.0;
        for entry in &chart.legend {
            canvas.fill_rect(legend_x, y - 0.5, 3.0, 3.0, entry.color);
            canvas.text_at(
                &format!("{}: {} ({:.1}%)", entry.label, entry.value, entry.percentage),
                self.font_size_small,
                legend_x + 5.0,
                y,
                false,
            );
            y -= line_height(self.font_size_small);
        }

        canvas.advance(image_height + 6.0);
        Ok(())
    }

    fn add_findings_table(&self, canvas: &mut Canvas, data: &ReportData) {
        canvas.page_break();
        canvas.line("Detailed Findings", self.font_size_heading, true, 0.0);

        let findings = data.scan.sorted_findings();
        if findings.is_empty() {
            canvas.line("No open ports were found.", self.font_size_body, false, 0.0);
            return;
        }

        let columns = FindingsColumns::new(canvas.content_width());
        let row_height = 8.0;

        self.findings_header(canvas, &columns, row_height);
        for (i, finding) in findings.iter().enumerate() {
            if canvas.ensure(row_height) {
                self.findings_header(canvas, &columns, row_height);
            }
            self.findings_row(canvas, &columns, row_height, i, finding);
        }
    }

    fn findings_header(&self, canvas: &mut Canvas, columns: &FindingsColumns, row_height: f32) {
        canvas.ensure(row_height * 2.0);
        let bottom = canvas.position() - row_height;
        canvas.fill_rect(self.margin, bottom, canvas.content_width(), row_height, self.palette.primary);
        canvas.set_text_color(WHITE);
        for (x, label) in columns.offsets.iter().zip(FindingsColumns::HEADERS) {
            canvas.text_at(label, self.font_size_small, self.margin + x + 1.5, bottom + 2.5, true);
        }
        canvas.reset_text_color();
        canvas.advance(row_height);
    }

    fn findings_row(
        &self,
        canvas: &mut Canvas,
        columns: &FindingsColumns,
        row_height: f32,
        index: usize,
        finding: &Finding,
    ) {
        let bottom = canvas.position() - row_height;
        let fill = if index % 2 == 0 { ROW_FILL } else { WHITE };
        canvas.fill_rect(self.margin, bottom, canvas.content_width(), row_height, fill);

        let cells = [
            finding.host.clone(),
            finding.port_protocol(),
            finding.service.clone(),
            finding.product_version(),
        ];
        for ((x, width), cell) in columns.offsets.iter().zip(columns.widths).zip(cells.iter()) {
            canvas.text_at(
                &truncate(cell, chars_per_line(width - 3.0, self.font_size_small)),
                self.font_size_small,
                self.margin + x + 1.5,
                bottom + 2.5,
                false,
            );
        }

        let risk_x = self.margin + columns.offsets[4];
        canvas.fill_rect(risk_x, bottom, columns.widths[4], row_height, self.palette.risk(finding.risk_level));
        canvas.set_text_color(WHITE);
        canvas.text_at(finding.risk_level.as_str(), self.font_size_small, risk_x + 1.5, bottom + 2.5, true);
        canvas.reset_text_color();

        canvas.advance(row_height);
    }

    fn add_recommendations(&self, canvas: &mut Canvas, data: &ReportData) {
        let attention: Vec<Finding> = data
            .scan
            .sorted_findings()
            .into_iter()
            .filter(|f| f.risk_level.needs_attention())
            .collect();
        if attention.is_empty() {
            return;
        }

        canvas.page_break();
        canvas.line("Security Recommendations", self.font_size_heading, true, 0.0);
        canvas.paragraph(
            "The following recommendations address the high and medium risk findings identified in this scan. Implementing these recommendations will help improve your security posture.",
            self.font_size_body,
            0.0,
        );
        canvas.advance(3.0);

        let rec_size = self.font_size_small + 1.0;
        let wrap_width = chars_per_line(canvas.content_width() - 12.0, rec_size);

        for finding in &attention {
            let recommendations = self
                .recommendations
                .recommend(&finding.service, &finding.port.to_string());
            let lines: Vec<String> = recommendations
                .iter()
                .flat_map(|rec| {
                    wrap(rec, wrap_width)
                        .into_iter()
                        .enumerate()
                        .map(|(i, l)| if i == 0 { format!("- {}", l) } else { format!("  {}", l) })
                        .collect::<Vec<_>>()
                })
                .collect();

            let title_height = line_height(self.font_size_body) + 2.0;
            let block_height = title_height + lines.len() as f32 * line_height(rec_size) + 4.0;
            canvas.ensure(block_height);

            let color = self.palette.risk(finding.risk_level);
            let top = canvas.position();
            canvas.stroke_rect(self.margin, top - block_height, canvas.content_width(), block_height, color, 0.5);

            canvas.advance(1.5);
            canvas.set_text_color(color);
            canvas.line(
                &format!("{} - Port {} ({})", finding.host, finding.port, finding.service),
                self.font_size_body,
                true,
                3.0,
            );
            canvas.reset_text_color();
            for line in &lines {
                canvas.line(line, rec_size, false, 6.0);
            }

            canvas.set_position(top - block_height - 4.0);
        }
    }

    fn add_script_results(&self, canvas: &mut Canvas, data: &ReportData) {
        if data.scan.scripts.is_empty() {
            return;
        }

        canvas.ensure(40.0);
        canvas.advance(6.0);
        canvas.line("Script Results", self.font_size_heading, true, 0.0);

        for host in &data.scan.scripts {
            canvas.line(&format!("Host: {}", host.host), self.font_size_subheading, true, 0.0);
            for (name, output) in &host.scripts {
                canvas.line(name, self.font_size_body, true, 5.0);
                canvas.paragraph(
                    &truncate(&output.replace(['\n', '\r'], " "), SCRIPT_OUTPUT_LIMIT),
                    self.font_size_small,
                    10.0,
                );
            }
            canvas.advance(3.0);
        }
    }

    fn add_os_summary(&self, canvas: &mut Canvas, data: &ReportData) {
        let stats = &data.os_statistics;

        canvas.page_break();
        canvas.line("OS Detection Summary", self.font_size_heading, true, 0.0);
        canvas.paragraph(&stats.narrative(), self.font_size_body, 0.0);
        canvas.advance(4.0);

        canvas.line("OS Distribution by Type", self.font_size_subheading, true, 0.0);
        let types: Vec<(String, String)> = stats
            .os_types
            .iter()
            .map(|(k, n)| (k.to_string(), n.to_string()))
            .collect();
        self.two_column_table(canvas, ("OS Type", "Count"), &types);

        canvas.advance(6.0);
        canvas.line("OS Distribution by Vendor", self.font_size_subheading, true, 0.0);
        let vendors: Vec<(String, String)> = stats
            .vendors
            .iter()
            .map(|(k, n)| (k.to_string(), n.to_string()))
            .collect();
        self.two_column_table(canvas, ("Vendor", "Count"), &vendors);
    }

    fn add_os_details(&self, canvas: &mut Canvas, data: &ReportData) {
        canvas.page_break();
        canvas.line("Detailed OS Detection Results", self.font_size_heading, true, 0.0);

        for host in &data.scan.os_hosts {
            canvas.ensure(line_height(self.font_size_subheading) * 3.0);
            canvas.line(&format!("Host: {}", host.host), self.font_size_subheading, true, 0.0);

            if host.matches.is_empty() {
                canvas.line(
                    "No OS detection information available for this host",
                    self.font_size_body,
                    false,
                    5.0,
                );
            }

            for (i, os_match) in host.matches.iter().enumerate() {
                let accuracy = match os_match.accuracy {
                    Some(_) => format!("{}%", os_match.accuracy_display),
                    None => os_match.accuracy_display.clone(),
                };
                canvas.line(
                    &format!("OS Match {}: {} (Accuracy: {})", i + 1, os_match.name, accuracy),
                    self.font_size_body,
                    true,
                    5.0,
                );
                for class in &os_match.classes {
                    canvas.line(&format!("Type: {}", class.os_type), self.font_size_small, false, 12.0);
                    canvas.line(&format!("Vendor: {}", class.vendor), self.font_size_small, false, 12.0);
                    canvas.line(&format!("Family: {}", class.family), self.font_size_small, false, 12.0);
                    canvas.line(&format!("Generation: {}", class.generation), self.font_size_small, false, 12.0);
                }
                canvas.advance(2.0);
            }
            canvas.advance(5.0);
        }
    }

    fn add_os_recommendations(&self, canvas: &mut Canvas) {
        canvas.page_break();
        canvas.line("OS Security Recommendations", self.font_size_heading, true, 0.0);
        canvas.paragraph(
            "Based on the detected operating systems, consider implementing the following security recommendations:",
            self.font_size_body,
            0.0,
        );
        canvas.advance(3.0);
        for rec in OS_RECOMMENDATIONS {
            canvas.paragraph(&format!("- {}", rec), self.font_size_body, 5.0);
        }
    }

    fn two_column_table(&self, canvas: &mut Canvas, header: (&str, &str), rows: &[(String, String)]) {
        let row_height = 8.0;
        let column = canvas.content_width() * 0.4;

        let draw_header = |canvas: &mut Canvas| {
            let bottom = canvas.position() - row_height;
            canvas.fill_rect(self.margin, bottom, column * 2.0, row_height, self.palette.primary);
            canvas.set_text_color(WHITE);
            canvas.text_at(header.0, self.font_size_body, self.margin + 2.0, bottom + 2.5, true);
            canvas.text_at(header.1, self.font_size_body, self.margin + column + 2.0, bottom + 2.5, true);
            canvas.reset_text_color();
            canvas.advance(row_height);
        };

        canvas.ensure(row_height * 2.0);
        draw_header(canvas);

        for (i, (label, value)) in rows.iter().enumerate() {
            if canvas.ensure(row_height) {
                draw_header(canvas);
            }
            let bottom = canvas.position() - row_height;
            let fill = if i % 2 == 0 { ROW_FILL } else { WHITE };
            canvas.fill_rect(self.margin, bottom, column * 2.0, row_height, fill);
            canvas.text_at(
                &truncate(label, chars_per_line(column - 4.0, self.font_size_body)),
                self.font_size_body,
                self.margin + 2.0,
                bottom + 2.5,
                false,
            );
            canvas.text_at(value, self.font_size_body, self.margin + column + 2.0, bottom + 2.5, false);
            canvas.advance(row_height);
        }
    }
}

impl Reporter for PdfReporter {
    fn render(&self, data: &ReportData) -> ReportResult<Vec<u8>> {
        self.render_pdf(data)
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Pdf
    }

    fn format_name(&self) -> &'static str {
        "PDF"
    }
}

/// Column layout of the findings table, scaled to the printable width
struct FindingsColumns {
    offsets: [f32; 5],
    widths: [f32; 5],
}

impl FindingsColumns {
    const HEADERS: [&'static str; 5] = ["Host", "Port/Protocol", "Service", "Product & Version", "Risk Level"];
    const RATIOS: [f32; 5] = [50.0, 25.0, 30.0, 50.0, 25.0];

    fn new(content_width: f32) -> Self {
        let total: f32 = Self::RATIOS.iter().sum();
        let mut offsets = [0.0; 5];
        let mut widths = [0.0; 5];
        let mut x = 0.0;
        for (i, ratio) in Self::RATIOS.iter().enumerate() {
            offsets[i] = x;
            widths[i] = content_width * ratio / total;
            x += widths[i];
        }
        Self { offsets, widths }
    }
}

/// In-progress document owned by a single render call
struct Canvas {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    cursor: PageCursor,
    page_size: (f32, f32),
    margin: f32,
    text_color: RgbColor,
}

impl Canvas {
    fn new(title: &str, page_size: (f32, f32), margin: f32, text_color: RgbColor) -> ReportResult<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(page_size.0), Mm(page_size.1), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);

        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| pdf_error("Failed to load Helvetica", e))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| pdf_error("Failed to load Helvetica-Bold", e))?;

        let canvas = Self {
            doc,
            layer,
            regular,
            bold,
            cursor: PageCursor::for_page(page_size.1, margin),
            page_size,
            margin,
            text_color,
        };
        canvas.reset_text_color();
        Ok(canvas)
    }

    fn content_width(&self) -> f32 {
        self.page_size.0 - 2.0 * self.margin
    }

    fn position(&self) -> f32 {
        self.cursor.position()
    }

    fn set_position(&mut self, y: f32) {
        let delta = self.cursor.position() - y;
        self.cursor.advance(delta);
    }

    fn advance(&mut self, height: f32) {
        self.cursor.advance(height);
    }

    /// Start the next section on a fresh page
    fn page_break(&mut self) {
        self.cursor.break_page();
        self.add_page();
    }

    /// Make room for a block of `height`; returns whether a page break happened
    fn ensure(&mut self, height: f32) -> bool {
        if self.cursor.reserve(height) {
            self.add_page();
            true
        } else {
            false
        }
    }

    fn add_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(self.page_size.0), Mm(self.page_size.1), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.reset_text_color();
        debug!(page = self.cursor.page_index() + 1, "PDF page break");
    }

    fn font(&self, bold: bool) -> &IndirectFontRef {
        if bold {
            &self.bold
        } else {
            &self.regular
        }
    }

    fn set_text_color(&self, color: RgbColor) {
        self.layer.set_fill_color(pdf_color(color));
    }

    fn reset_text_color(&self) {
        self.set_text_color(self.text_color);
    }

    /// Text with its baseline at an absolute position
    fn text_at(&self, text: &str, size: f32, x: f32, y: f32, bold: bool) {
        self.layer.use_text(text, size, Mm(x), Mm(y), self.font(bold));
    }

    /// One line of text at the cursor, breaking the page first if needed
    fn line(&mut self, text: &str, size: f32, bold: bool, indent: f32) {
        let height = line_height(size);
        self.ensure(height);
        let baseline = self.cursor.position() - size * PT_TO_MM;
        self.text_at(text, size, self.margin + indent, baseline, bold);
        self.cursor.advance(height);
    }

    /// Word-wrapped text at the cursor
    fn paragraph(&mut self, text: &str, size: f32, indent: f32) {
        let width = chars_per_line(self.content_width() - indent, size);
        for line in wrap(text, width) {
            self.line(&line, size, false, indent);
        }
    }

    fn fill_rect(&self, x: f32, y: f32, width: f32, height: f32, color: RgbColor) {
        self.layer.set_fill_color(pdf_color(color));
        self.layer.add_rect(
            Rect::new(Mm(x), Mm(y), Mm(x + width), Mm(y + height)).with_mode(PaintMode::Fill),
        );
        self.reset_text_color();
    }

    fn stroke_rect(&self, x: f32, y: f32, width: f32, height: f32, color: RgbColor, thickness: f32) {
        self.layer.set_outline_color(pdf_color(color));
        self.layer.set_outline_thickness(thickness);
        let corners = [(x, y), (x + width, y), (x + width, y + height), (x, y + height)];
        self.layer.add_line(Line {
            points: corners
                .iter()
                .map(|(px, py)| (Point::new(Mm(*px), Mm(*py)), false))
                .collect(),
            is_closed: true,
        });
    }

    /// Embed a PNG with its lower-left corner at (x, y), scaled to `width` mm.
    /// The pixels are re-encoded as a DCT stream; raw samples are not compressed
    /// by printpdf outside release builds.
    fn image(&self, png: &[u8], name: &str, x: f32, y: f32, width: f32) -> ReportResult<()> {
        let decoded = image::load_from_memory(png)
            .map_err(|e| ReportEngineError::chart(name, format!("PNG could not be decoded: {}", e)))?;
        let rgb = decoded.to_rgb8();
        let jpeg = encode_jpeg(&rgb)
            .map_err(|e| ReportEngineError::chart(name, format!("JPEG encoding failed: {}", e)))?;
        let dpi = rgb.width() as f32 * 25.4 / width;

        let mut embedded = Image::from_dynamic_image(&DynamicImage::ImageRgb8(rgb));
        embedded.image.image_data = jpeg;
        embedded.image.image_filter = Some(ImageFilter::DCT);
        embedded.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(x)),
                translate_y: Some(Mm(y)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn finish(self) -> ReportResult<Vec<u8>> {
        let pages = self.cursor.page_index() + 1;
        let bytes = self
            .doc
            .save_to_bytes()
            .map_err(|e| pdf_error("Failed to generate PDF bytes", e))?;
        debug!(pages, bytes = bytes.len(), "PDF document assembled");
        Ok(bytes)
    }
}

fn encode_jpeg(rgb: &image::RgbImage) -> image::ImageResult<Vec<u8>> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, CHART_JPEG_QUALITY).encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ColorType::Rgb8,
    )?;
    Ok(jpeg)
}

fn pdf_error<E: Debug>(context: &str, err: E) -> ReportEngineError {
    ReportEngineError::generation(ReportFormat::Pdf, format!("{}: {:?}", context, err))
}

fn pdf_color(color: RgbColor) -> Color {
    let (r, g, b) = color.unit();
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.6
}

/// Rough Helvetica capacity of a line `width` mm wide
fn chars_per_line(width: f32, size: f32) -> usize {
    ((width / (size * PT_TO_MM * 0.5)) as usize).max(8)
}

/// Cut to `max` characters, marking the cut with `...`
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Greedy word wrap; words longer than a line are split
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

//! Chart rendering
//!
//! Charts are drawn straight onto an RGB raster and encoded as PNG so both
//! the PDF and the HTML reporter can embed the same bytes. Raster output
//! carries no text, so every chart ships with a legend the reporters print
//! next to the image.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use tracing::debug;

use super::theme::{Palette, RgbColor};
use crate::analysis::statistics::{FrequencyTable, PortStateCounts, RiskCounts};
use crate::core::errors::{utils::log_error, ReportEngineError, ReportResult};
use crate::scan::{Finding, RiskLevel};

const MIN_CANVAS: u32 = 16;
/// Largest accepted canvas edge in pixels
pub const MAX_CANVAS: u32 = 4096;
const PADDING: u32 = 12;

/// Chart options from the `charts` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOptions {
    pub enabled: bool,
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Bars shown in the services chart
    pub top_services: usize,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 600,
            height: 360,
            top_services: 10,
        }
    }
}

/// The charts a report can carry, in embedding order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChartKind {
    RiskLevels,
    PortStates,
    Services,
}

impl ChartKind {
    pub fn key(&self) -> &'static str {
        match self {
            ChartKind::RiskLevels => "risk_levels",
            ChartKind::PortStates => "port_states",
            ChartKind::Services => "services",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::RiskLevels => "Risk Level Distribution",
            ChartKind::PortStates => "Port States Distribution",
            ChartKind::Services => "Top Services",
        }
    }
}

/// One legend line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub value: usize,
    pub percentage: f64,
    pub color: RgbColor,
}

/// Encoded chart image plus its legend
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub kind: ChartKind,
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub legend: Vec<LegendEntry>,
}

impl Chart {
    /// `data:` URI for inline HTML images
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

/// Chart name -> chart; empty when nothing could be charted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Charts {
    charts: BTreeMap<ChartKind, Chart>,
}

impl Charts {
    pub fn insert(&mut self, chart: Chart) {
        self.charts.insert(chart.kind, chart);
    }

    pub fn get(&self, kind: ChartKind) -> Option<&Chart> {
        self.charts.get(&kind)
    }

    /// Charts in embedding order
    pub fn iter(&self) -> impl Iterator<Item = &Chart> {
        self.charts.values()
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
}

/// Draws the port-state, services and risk charts
pub struct ChartRenderer<'a> {
    palette: &'a Palette,
    options: &'a ChartOptions,
}

impl<'a> ChartRenderer<'a> {
    pub fn new(palette: &'a Palette, options: &'a ChartOptions) -> Self {
        Self { palette, options }
    }

    /// Render every chart that has data. Never fails: a chart that cannot be
    /// drawn is logged and left out.
    pub fn render(&self, findings: &[Finding], port_states: &PortStateCounts) -> Charts {
        let mut charts = Charts::default();

        let mut services = FrequencyTable::new();
        let mut risk = RiskCounts::default();
        for finding in findings {
            services.record(&finding.service);
            risk.record(finding.risk_level);
        }

        let attempts: [(ChartKind, bool); 3] = [
            (ChartKind::PortStates, !port_states.is_empty()),
            (ChartKind::Services, !services.is_empty()),
            (ChartKind::RiskLevels, risk.total() > 0),
        ];

        for (kind, has_data) in attempts {
            if !has_data {
                continue;
            }

            let drawn = match kind {
                ChartKind::PortStates => self.port_states_chart(port_states),
                ChartKind::Services => self.services_chart(&services),
                ChartKind::RiskLevels => self.risk_chart(&risk),
            };

            match drawn {
                Ok(chart) => charts.insert(chart),
                Err(err) => log_error(&err),
            }
        }

        debug!(charts = charts.len(), "Charts rendered");
        charts
    }

    fn port_states_chart(&self, port_states: &PortStateCounts) -> ReportResult<Chart> {
        let series = self.palette.series();
        let slices: Vec<(String, usize, RgbColor)> = port_states
            .table()
            .iter()
            .enumerate()
            .map(|(i, (state, count))| (state.to_string(), count, series[i % series.len()]))
            .collect();

        self.proportion_chart(ChartKind::PortStates, &slices, 0.0)
    }

    fn risk_chart(&self, risk: &RiskCounts) -> ReportResult<Chart> {
        let slices: Vec<(String, usize, RgbColor)> = RiskLevel::all()
            .into_iter()
            .map(|level| {
                (
                    level.as_str().to_string(),
                    risk.get(level),
                    self.palette.risk(level),
                )
            })
            .collect();

        // donut
        self.proportion_chart(ChartKind::RiskLevels, &slices, 0.5)
    }

    fn services_chart(&self, services: &FrequencyTable) -> ReportResult<Chart> {
        let (width, height) = self.canvas_size(ChartKind::Services)?;
        let top = services.top_n(self.options.top_services.max(1));
        let total = services.total();
        let max = top.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1);

        let mut canvas = self.canvas(width, height);
        let plot_width = width - 2 * PADDING;
        let plot_height = height - 2 * PADDING;
        let slot = plot_width / top.len().max(1) as u32;
        let bar_width = (slot * 7 / 10).max(1);
        let baseline = height - PADDING;

        for (i, (_, count)) in top.iter().enumerate() {
            let bar_height = ((*count as f64 / max as f64) * plot_height as f64).round() as u32;
            let x0 = PADDING + i as u32 * slot + slot.saturating_sub(bar_width) / 2;
            fill_rect(
                &mut canvas,
                x0,
                baseline.saturating_sub(bar_height),
                bar_width,
                bar_height,
                self.palette.primary,
            );
        }
        fill_rect(&mut canvas, PADDING, baseline, plot_width, 1, self.palette.dark);

        let legend = top
            .into_iter()
            .map(|(label, value)| LegendEntry {
                percentage: percentage(value, total),
                label,
                value,
                color: self.palette.primary,
            })
            .collect();

        self.finish(ChartKind::Services, canvas, legend)
    }

    /// Pie chart; `hole` is the inner radius as a fraction of the outer one
    fn proportion_chart(
        &self,
        kind: ChartKind,
        slices: &[(String, usize, RgbColor)],
        hole: f64,
    ) -> ReportResult<Chart> {
        let (width, height) = self.canvas_size(kind)?;
        let total: usize = slices.iter().map(|(_, n, _)| n).sum();
        if total == 0 {
            return Err(ReportEngineError::chart(kind.key(), "no data to plot"));
        }

        let mut canvas = self.canvas(width, height);
        let cx = width as f64 / 2.0;
        let cy = height as f64 / 2.0;
        let radius = (width.min(height) / 2 - PADDING) as f64;
        let inner = radius * hole;

        // cumulative upper bound of each slice as a fraction of the circle
        let mut bounds = Vec::with_capacity(slices.len());
        let mut acc = 0usize;
        for (_, count, color) in slices {
            acc += count;
            bounds.push((acc as f64 / total as f64, *color));
        }

        for (x, y, pixel) in canvas.enumerate_pixels_mut() {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            let distance = (dx * dx + dy * dy).sqrt();
            if distance > radius || distance < inner {
                continue;
            }

            // clockwise from twelve o'clock
            let mut angle = dx.atan2(-dy);
            if angle < 0.0 {
                angle += 2.0 * PI;
            }
            let t = angle / (2.0 * PI);

            if let Some((_, color)) = bounds.iter().find(|(bound, _)| t < *bound) {
                *pixel = Rgb([color.0, color.1, color.2]);
            }
        }

        let legend = slices
            .iter()
            .map(|(label, value, color)| LegendEntry {
                label: label.clone(),
                value: *value,
                percentage: percentage(*value, total),
                color: *color,
            })
            .collect();

        self.finish(kind, canvas, legend)
    }

    fn canvas_size(&self, kind: ChartKind) -> ReportResult<(u32, u32)> {
        let (width, height) = (self.options.width, self.options.height);
        if width < MIN_CANVAS + 2 * PADDING || height < MIN_CANVAS + 2 * PADDING {
            return Err(ReportEngineError::chart(
                kind.key(),
                format!("canvas {}x{} is too small", width, height),
            ));
        }
        if width > MAX_CANVAS || height > MAX_CANVAS {
            return Err(ReportEngineError::chart(
                kind.key(),
                format!("canvas {}x{} exceeds {} pixels per side", width, height, MAX_CANVAS),
            ));
        }
        Ok((width, height))
    }

    fn canvas(&self, width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    fn finish(&self, kind: ChartKind, canvas: RgbImage, legend: Vec<LegendEntry>) -> ReportResult<Chart> {
        let (width, height) = canvas.dimensions();
        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(canvas.as_raw(), width, height, ColorType::Rgb8)
            .map_err(|e| ReportEngineError::chart(kind.key(), e.to_string()))?;

        Ok(Chart {
            kind,
            png,
            width,
            height,
            legend,
        })
    }
}

fn fill_rect(canvas: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: RgbColor) {
    let (max_x, max_y) = canvas.dimensions();
    for py in y..(y + height).min(max_y) {
        for px in x..(x + width).min(max_x) {
            canvas.put_pixel(px, py, Rgb([color.0, color.1, color.2]));
        }
    }
}

fn percentage(value: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        value as f64 * 100.0 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::NormalizedScan;
    use crate::testing::TestUtils;

    const PNG_MAGIC: &[u8] = b"\x89PNG";

    #[test]
    fn test_empty_input_yields_no_charts() {
        let palette = Palette::default();
        let options = ChartOptions::default();
        let charts = ChartRenderer::new(&palette, &options).render(&[], &PortStateCounts::default());
        assert!(charts.is_empty());
    }

    #[test]
    fn test_all_charts_rendered() {
        let scan = NormalizedScan::from_scan(&TestUtils::mixed_scan());
        let palette = Palette::default();
        let options = ChartOptions::default();
        let charts = ChartRenderer::new(&palette, &options).render(&scan.findings, &scan.port_states);

        assert_eq!(charts.len(), 3);
        for chart in charts.iter() {
            assert!(chart.png.starts_with(PNG_MAGIC));
            assert!(!chart.legend.is_empty());
        }
        let kinds: Vec<ChartKind> = charts.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ChartKind::RiskLevels, ChartKind::PortStates, ChartKind::Services]
        );
    }

    #[test]
    fn test_closed_ports_only_chart_states() {
        let scan = NormalizedScan::from_scan(&crate::scan::ScanResult::new(vec![TestUtils::host(
            "10.0.0.2",
            vec![TestUtils::port(22, "closed", "ssh")],
        )]));
        let palette = Palette::default();
        let options = ChartOptions::default();
        let charts = ChartRenderer::new(&palette, &options).render(&scan.findings, &scan.port_states);

        assert_eq!(charts.len(), 1);
        assert!(charts.get(ChartKind::PortStates).is_some());
    }

    #[test]
    fn test_drawing_failure_degrades_to_empty() {
        let scan = NormalizedScan::from_scan(&TestUtils::mixed_scan());
        let palette = Palette::default();
        let options = ChartOptions {
            width: 4,
            height: 4,
            ..ChartOptions::default()
        };
        let charts = ChartRenderer::new(&palette, &options).render(&scan.findings, &scan.port_states);
        assert!(charts.is_empty());
    }

    #[test]
    fn test_oversized_canvas_degrades_to_empty() {
        let scan = NormalizedScan::from_scan(&TestUtils::mixed_scan());
        let palette = Palette::default();
        let options = ChartOptions {
            width: 100_000,
            height: 100_000,
            ..ChartOptions::default()
        };
        let charts = ChartRenderer::new(&palette, &options).render(&scan.findings, &scan.port_states);
        assert!(charts.is_empty());
    }

    #[test]
    fn test_services_legend_ranked() {
        let scan = NormalizedScan::from_scan(&crate::scan::ScanResult::new(vec![TestUtils::host(
            "10.0.0.3",
            vec![
                TestUtils::port(21, "open", "ftp"),
                TestUtils::port(80, "open", "http"),
                TestUtils::port(8080, "open", "http"),
            ],
        )]));
        let palette = Palette::default();
        let options = ChartOptions::default();
        let charts = ChartRenderer::new(&palette, &options).render(&scan.findings, &scan.port_states);

        let legend = &charts.get(ChartKind::Services).unwrap().legend;
        assert_eq!(legend[0].label, "http");
        assert_eq!(legend[0].value, 2);
        assert_eq!(legend[1].label, "ftp");
        assert!((legend[1].percentage - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_data_uri() {
        let chart = Chart {
            kind: ChartKind::Services,
            png: vec![1, 2, 3],
            width: 1,
            height: 1,
            legend: Vec::new(),
        };
        assert_eq!(chart.data_uri(), "data:image/png;base64,AQID");
    }
}

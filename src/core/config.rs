//! Configuration loaded from YAML, with per-field defaults so a partial
//! file is enough

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::analysis::{KnowledgeBase, PortInfo};
use crate::core::errors::{ReportEngineError, ReportResult};
use crate::report::pdf_reporter::PdfLayout;
use crate::report::charts::MAX_CANVAS;
use crate::report::{ChartOptions, Palette, ReportContext, ReportFormat, DEFAULT_TITLE};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub pdf: PdfLayout,
    #[serde(default)]
    pub charts: ChartOptions,
    #[serde(default)]
    pub palette: Palette,
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_report_format")]
    pub default_format: ReportFormat,
    #[serde(default = "default_title")]
    pub title: String,
}

/// Extra or overriding Knowledge Base entries, keyed by port number
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    #[serde(default)]
    pub extra_ports: BTreeMap<String, PortInfo>,
}

fn default_app_name() -> String { "NScan Report".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_output_dir() -> String { "./reports".to_string() }
fn default_report_format() -> ReportFormat { ReportFormat::Html }
fn default_title() -> String { DEFAULT_TITLE.to_string() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            default_format: default_report_format(),
            title: default_title(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ReportResult<Self> {
        let content = fs::read_to_string(&path).map_err(|e| {
            ReportEngineError::config(format!(
                "Config file could not be read: {} - Error: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a file, falling back to defaults when it is missing or invalid
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Config could not be loaded, using defaults: {}", e);
                Self::default_config()
            }
        }
    }

    /// Default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Apply `NSCAN_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(log_level) = env::var("NSCAN_LOG_LEVEL") {
            self.app.log_level = log_level;
        }

        if let Ok(output_dir) = env::var("NSCAN_OUTPUT_DIR") {
            self.report.output_dir = output_dir;
        }

        if let Ok(format) = env::var("NSCAN_REPORT_FORMAT") {
            match format.parse() {
                Ok(format) => self.report.default_format = format,
                Err(e) => warn!("Ignoring NSCAN_REPORT_FORMAT: {}", e),
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ReportResult<()> {
        if !LOG_LEVELS.contains(&self.app.log_level.to_lowercase().as_str()) {
            return Err(ReportEngineError::config(format!(
                "Invalid log level: {}",
                self.app.log_level
            )));
        }

        if !(0.0..=100.0).contains(&self.pdf.margin_mm) {
            return Err(ReportEngineError::config(format!(
                "PDF margin out of range: {} mm",
                self.pdf.margin_mm
            )));
        }

        if self.charts.top_services == 0 {
            return Err(ReportEngineError::config("charts.top_services must be at least 1"));
        }

        if self.charts.width > MAX_CANVAS || self.charts.height > MAX_CANVAS {
            return Err(ReportEngineError::config(format!(
                "Chart size {}x{} exceeds {} pixels per side",
                self.charts.width, self.charts.height, MAX_CANVAS
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ReportResult<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(&path, content).map_err(|e| {
            ReportEngineError::config(format!(
                "Failed to write config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Immutable context handed to every reporter
    pub fn report_context(&self) -> ReportContext {
        let knowledge_base = KnowledgeBase::builtin().with_entries(
            self.knowledge_base
                .extra_ports
                .iter()
                .map(|(port, info)| (port.clone(), info.clone())),
        );

        ReportContext {
            palette: self.palette.clone(),
            knowledge_base: Arc::new(knowledge_base),
            title: self.report.title.clone(),
            charts: self.charts.clone(),
            pdf: self.pdf.clone(),
        }
    }
}

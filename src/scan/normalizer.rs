//! Result normalization
//!
//! A single pass over the raw scan structure produces every record the
//! renderers need: per-port observations, open-port findings, per-state
//! counts, and the OS-detection summary. Renderers never walk the raw input
//! themselves, so the three output formats cannot disagree on counts.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{sort_by_risk, Finding, HostRecord, OsMatch, PortObservation, ScanResult};
use crate::analysis::risk::classify;
use crate::analysis::statistics::PortStateCounts;
use crate::core::errors::{ReportEngineError, ReportResult};

const UNKNOWN: &str = "Unknown";

/// Scan result in any of the shapes the engine accepts
#[derive(Debug, Clone)]
pub enum ScanInput {
    /// Already-structured hosts
    Structured(ScanResult),
    /// Untyped JSON tree (a host array or the scan API envelope)
    Json(Value),
    /// Serialized JSON text of either of the above
    Text(String),
}

impl From<ScanResult> for ScanInput {
    fn from(scan: ScanResult) -> Self {
        ScanInput::Structured(scan)
    }
}

impl From<Value> for ScanInput {
    fn from(value: Value) -> Self {
        ScanInput::Json(value)
    }
}

impl From<String> for ScanInput {
    fn from(text: String) -> Self {
        ScanInput::Text(text)
    }
}

impl From<&str> for ScanInput {
    fn from(text: &str) -> Self {
        ScanInput::Text(text.to_string())
    }
}

impl ScanInput {
    /// Resolve into structured hosts, failing with `MalformedInput`
    pub fn into_scan_result(self) -> ReportResult<ScanResult> {
        match self {
            ScanInput::Structured(scan) => Ok(scan),
            ScanInput::Json(value) => scan_from_value(value),
            ScanInput::Text(text) => {
                let value: Value = serde_json::from_str(&text)?;
                scan_from_value(value)
            }
        }
    }
}

fn scan_from_value(value: Value) -> ReportResult<ScanResult> {
    let hosts = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match map.remove("output") {
            Some(output @ Value::Array(_)) => output,
            Some(_) => {
                return Err(ReportEngineError::malformed_input(
                    "scan envelope 'output' is not a host list",
                ))
            }
            None if map.contains_key("host") || map.contains_key("address") => {
                Value::Array(vec![Value::Object(map)])
            }
            None => {
                return Err(ReportEngineError::malformed_input(
                    "expected a host list or a scan envelope with 'output'",
                ))
            }
        },
        other => {
            return Err(ReportEngineError::malformed_input(format!(
                "expected a host list, found {}",
                json_kind(&other)
            )))
        }
    };

    let scan: ScanResult = serde_json::from_value(hosts)?;
    Ok(scan)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// OS classification of one match, every field defaulting to `Unknown`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OsClassSummary {
    pub os_type: String,
    pub vendor: String,
    pub family: String,
    pub generation: String,
}

/// One OS match flattened for presentation and aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OsMatchSummary {
    pub name: String,
    /// Parsed accuracy; `None` when absent or not numeric
    pub accuracy: Option<f64>,
    /// Accuracy exactly as reported, `N/A` when absent
    pub accuracy_display: String,
    pub classes: Vec<OsClassSummary>,
}

impl From<&OsMatch> for OsMatchSummary {
    fn from(os_match: &OsMatch) -> Self {
        let classes = os_match
            .classes()
            .into_iter()
            .map(|class| OsClassSummary {
                os_type: or_unknown(class.os_type.as_deref()),
                vendor: or_unknown(class.vendor.as_deref()),
                family: or_unknown(class.osfamily.as_deref()),
                generation: or_unknown(class.osgen.as_deref()),
            })
            .collect();

        Self {
            name: os_match
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Unknown OS".to_string()),
            accuracy: os_match.accuracy.as_ref().and_then(|a| a.value()),
            accuracy_display: os_match
                .accuracy
                .as_ref()
                .map(|a| a.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            classes,
        }
    }
}

/// OS-detection results of one host; `matches` is empty when nothing was detected
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostOsSummary {
    pub host: String,
    pub matches: Vec<OsMatchSummary>,
}

/// Script output attached to one host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostScripts {
    pub host: String,
    pub scripts: Vec<(String, String)>,
}

/// Flattened view of a scan shared by the aggregator and every renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedScan {
    pub total_hosts: usize,
    /// Every port record in input order, whatever its state
    pub observations: Vec<PortObservation>,
    /// Open ports only, in input order
    pub findings: Vec<Finding>,
    pub port_states: PortStateCounts,
    pub os_hosts: Vec<HostOsSummary>,
    pub scripts: Vec<HostScripts>,
}

impl NormalizedScan {
    /// Walk a structured scan; every host/protocol/port is visited exactly once
    pub fn from_scan(scan: &ScanResult) -> Self {
        let mut normalized = NormalizedScan {
            total_hosts: scan.hosts.len(),
            ..Default::default()
        };

        for host in &scan.hosts {
            normalized.visit_host(host);
        }

        debug!(
            hosts = normalized.total_hosts,
            ports = normalized.observations.len(),
            findings = normalized.findings.len(),
            "Scan normalized"
        );

        normalized
    }

    fn visit_host(&mut self, host: &HostRecord) {
        for (protocol, ports) in &host.protocols {
            for port in ports {
                self.port_states.record(&port.state);

                let service = if port.service.trim().is_empty() {
                    UNKNOWN.to_string()
                } else {
                    port.service.clone()
                };

                if port.state == "open" {
                    self.findings.push(Finding {
                        host: host.address.clone(),
                        port: port.port,
                        protocol: protocol.clone(),
                        service: service.clone(),
                        product: port.product.clone(),
                        version: port.version.clone(),
                        risk_level: classify(&port.service),
                    });
                }

                self.observations.push(PortObservation {
                    host: host.address.clone(),
                    protocol: protocol.clone(),
                    port: port.port,
                    state: port.state.clone(),
                    service,
                    product: port.product.clone(),
                    version: port.version.clone(),
                });
            }
        }

        let matches = host
            .os
            .as_ref()
            .map(|os| os.matches.iter().map(OsMatchSummary::from).collect())
            .unwrap_or_default();
        self.os_hosts.push(HostOsSummary {
            host: host.address.clone(),
            matches,
        });

        if let Some(scripts) = host.scripts.as_ref().filter(|s| !s.is_empty()) {
            self.scripts.push(HostScripts {
                host: host.address.clone(),
                scripts: scripts
                    .iter()
                    .map(|(name, output)| (name.clone(), output.clone()))
                    .collect(),
            });
        }
    }

    /// Findings in presentation order (High -> Medium -> Low, stable)
    pub fn sorted_findings(&self) -> Vec<Finding> {
        let mut findings = self.findings.clone();
        sort_by_risk(&mut findings);
        findings
    }
}

/// Normalize a scan given in any accepted shape
pub fn normalize(input: impl Into<ScanInput>) -> ReportResult<NormalizedScan> {
    let scan = input.into().into_scan_result()?;
    validate(&scan)?;
    Ok(NormalizedScan::from_scan(&scan))
}

fn validate(scan: &ScanResult) -> ReportResult<()> {
    for (index, host) in scan.hosts.iter().enumerate() {
        if host.address.trim().is_empty() {
            return Err(ReportEngineError::malformed_input(format!(
                "host #{} has an empty address",
                index + 1
            )));
        }
    }
    Ok(())
}

fn or_unknown(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

//! Test utilities for the report engine
//!
//! Fixture builders for scans, hosts, ports and OS matches, plus a mock
//! reporter. Shared by unit tests, the integration suite and the benches.

use serde_json::Value;

use crate::core::errors::{ReportEngineError, ReportResult};
use crate::report::{ReportData, ReportFormat, ReportMetadata, Reporter};
use crate::scan::{
    Accuracy, HostRecord, OneOrMany, OrderedMap, OsClass, OsClassEntry, OsInfo, OsMatch,
    PortRecord, ScanResult, ScanType,
};

/// Reporter that echoes a summary line or fails on demand
pub struct MockReporter {
    format: ReportFormat,
    should_fail: bool,
}

impl MockReporter {
    pub fn new(format: ReportFormat) -> Self {
        Self {
            format,
            should_fail: false,
        }
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Reporter for MockReporter {
    fn render(&self, data: &ReportData) -> ReportResult<Vec<u8>> {
        if self.should_fail {
            return Err(ReportEngineError::io("Mock reporter failure"));
        }

        Ok(format!(
            "{} hosts, {} findings",
            data.statistics.total_hosts,
            data.scan.findings.len()
        )
        .into_bytes())
    }

    fn format(&self) -> ReportFormat {
        self.format
    }

    fn format_name(&self) -> &'static str {
        "Mock"
    }
}

/// Test utilities
pub struct TestUtils;

impl TestUtils {
    /// Port record with only the required fields set
    pub fn port(port: u16, state: &str, service: &str) -> PortRecord {
        PortRecord {
            port,
            state: state.to_string(),
            service: service.to_string(),
            ..Default::default()
        }
    }

    /// Port record with product and version
    pub fn versioned_port(port: u16, state: &str, service: &str, product: &str, version: &str) -> PortRecord {
        PortRecord {
            product: Some(product.to_string()),
            version: Some(version.to_string()),
            ..Self::port(port, state, service)
        }
    }

    /// Host with the given ports under `tcp`
    pub fn host(address: &str, tcp_ports: Vec<PortRecord>) -> HostRecord {
        let mut protocols = OrderedMap::new();
        if !tcp_ports.is_empty() {
            protocols.insert("tcp", tcp_ports);
        }

        HostRecord {
            address: address.to_string(),
            state: "up".to_string(),
            protocols,
            ..Default::default()
        }
    }

    /// Host carrying OS matches and no ports
    pub fn host_with_os(address: &str, matches: Vec<OsMatch>) -> HostRecord {
        HostRecord {
            os: Some(OsInfo { matches }),
            ..Self::host(address, Vec::new())
        }
    }

    /// OS match built from loosely-typed JSON pieces, the way the scanner
    /// emits them (`null` means absent)
    pub fn os_match(name: &str, accuracy: Value, osclass: Value) -> OsMatch {
        let accuracy = match accuracy {
            Value::Null => None,
            Value::Number(n) => n.as_f64().map(Accuracy::Number),
            Value::String(s) => Some(Accuracy::Text(s)),
            other => Some(Accuracy::Other(other)),
        };

        let osclass = match osclass {
            Value::Null => None,
            Value::Array(items) => Some(OneOrMany::Many(items.into_iter().map(Self::os_class_entry).collect())),
            other => Some(OneOrMany::One(Self::os_class_entry(other))),
        };

        OsMatch {
            name: Some(name.to_string()),
            accuracy,
            osclass,
        }
    }

    fn os_class_entry(value: Value) -> OsClassEntry {
        match value {
            Value::Object(map) => {
                let field = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
                OsClassEntry::Class(OsClass {
                    vendor: field("vendor"),
                    os_type: field("type"),
                    osfamily: field("osfamily"),
                    osgen: field("osgen"),
                })
            }
            other => OsClassEntry::Other(other),
        }
    }

    /// Single host with open telnet and open https
    pub fn telnet_https_scan() -> ScanResult {
        ScanResult::new(vec![Self::host(
            "10.0.0.5",
            vec![
                Self::port(23, "open", "telnet"),
                Self::port(443, "open", "https"),
            ],
        )])
    }

    /// Two hosts with a spread of states, services and protocols
    pub fn mixed_scan() -> ScanResult {
        let mut web = Self::host(
            "192.168.1.10",
            vec![
                Self::versioned_port(22, "open", "ssh", "OpenSSH", "8.9p1"),
                Self::port(23, "open", "telnet"),
                Self::versioned_port(80, "open", "http", "Apache httpd", "2.4.52"),
                Self::port(443, "closed", "https"),
                Self::port(3306, "filtered", "mysql"),
            ],
        );
        web.hostname = "web01.lan".to_string();
        web.protocols.insert(
            "udp",
            vec![
                Self::port(53, "open", "dns"),
                Self::port(161, "open|filtered", "snmp"),
            ],
        );
        web.scripts = Some(OrderedMap::from_iter([(
            "http-title",
            "Apache2 Ubuntu Default Page".to_string(),
        )]));

        let files = Self::host(
            "192.168.1.20",
            vec![
                Self::port(21, "open", "ftp"),
                Self::port(445, "open", "microsoft-ds"),
                Self::port(8080, "open", "http-proxy"),
            ],
        );

        ScanResult::new(vec![web, files])
    }

    /// Hosts with OS fingerprints, including a host without any
    pub fn os_scan() -> ScanResult {
        use serde_json::json;

        ScanResult::new(vec![
            Self::host_with_os(
                "10.0.0.1",
                vec![
                    Self::os_match(
                        "Linux 5.4",
                        json!("95"),
                        json!({"vendor": "Linux", "type": "general purpose", "osfamily": "Linux", "osgen": "5.X"}),
                    ),
                    Self::os_match("Linux 4.15", json!(80), json!([{"vendor": "Linux", "osfamily": "Linux"}])),
                ],
            ),
            Self::host_with_os(
                "10.0.0.2",
                vec![Self::os_match(
                    "Microsoft Windows 10",
                    json!("bad"),
                    json!([{"vendor": "Microsoft", "type": "general purpose"}, "junk"]),
                )],
            ),
            Self::host("10.0.0.3", vec![Self::port(22, "open", "ssh")]),
        ])
    }

    /// Synthetic scan for load tests
    pub fn large_scan(hosts: usize, ports_per_host: usize) -> ScanResult {
        const SERVICES: [&str; 8] = ["ssh", "http", "https", "ftp", "smtp", "mysql", "telnet", "rdp"];
        const STATES: [&str; 3] = ["open", "closed", "filtered"];

        ScanResult::new(
            (0..hosts)
                .map(|h| {
                    let ports = (0..ports_per_host)
                        .map(|p| {
                            Self::port(
                                (1 + p) as u16,
                                STATES[(h + p) % STATES.len()],
                                SERVICES[p % SERVICES.len()],
                            )
                        })
                        .collect();
                    Self::host(&format!("10.{}.{}.{}", h / 65536 % 256, h / 256 % 256, h % 256), ports)
                })
                .collect(),
        )
    }

    /// Metadata with a fixed timestamp and scan id
    pub fn metadata(scan_type: ScanType) -> ReportMetadata {
        ReportMetadata::new(scan_type, "2024-05-01T12:00:00+00:00")
            .with_scan_id("3f2b9c1e-8d4a-4c6b-9f00-1234567890ab")
    }
}

/// Assert that a result failed at the given stage
#[macro_export]
macro_rules! assert_error_stage {
    ($result:expr, $stage:expr) => {
        match $result {
            Ok(_) => panic!("Expected an error at stage {}", $stage),
            Err(err) => assert_eq!(err.stage(), $stage, "unexpected error: {}", err),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorStage;
    use crate::report::{ReportEngine, ReportFormat};
    use crate::scan::NormalizedScan;
    use serde_json::json;

    #[test]
    fn test_mixed_scan_shape() {
        let scan = TestUtils::mixed_scan();
        let normalized = NormalizedScan::from_scan(&scan);
        assert_eq!(normalized.total_hosts, 2);
        assert_eq!(normalized.observations.len(), 10);
        assert_eq!(normalized.findings.len(), 7);
    }

    #[test]
    fn test_os_match_fixture() {
        let os_match = TestUtils::os_match("Linux", json!(90), json!([{"vendor": "Linux"}, 3]));
        assert_eq!(os_match.accuracy, Some(Accuracy::Number(90.0)));
        assert_eq!(os_match.classes().len(), 1);
    }

    #[test]
    fn test_mock_reporter_failure_is_wrapped() {
        let engine = ReportEngine::default();
        let data = engine
            .prepare(TestUtils::telnet_https_scan(), TestUtils::metadata(ScanType::Quick), false)
            .unwrap();

        let ok = engine.render_with(&MockReporter::new(ReportFormat::Csv), &data).unwrap();
        assert_eq!(ok.as_text(), Some("1 hosts, 2 findings"));

        let result = engine.render_with(&MockReporter::new(ReportFormat::Csv).with_failure(), &data);
        assert_error_stage!(result, ErrorStage::Render(ReportFormat::Csv));
    }
}

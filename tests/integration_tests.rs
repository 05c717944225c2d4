//! Integration tests for the NScan report engine
//!
//! These tests drive the public API end to end: normalization, statistics,
//! recommendations, charts and the three output formats.

use nscan_report::analysis::recommendations::HTTPS_UPGRADE;
use nscan_report::analysis::{
    classify, KnowledgeBase, OsStatistics, PortStateCounts, RecommendationEngine, ReportStatistics,
};
use nscan_report::core::errors::ErrorStage;
use nscan_report::report::charts::ChartRenderer;
use nscan_report::report::{ChartOptions, Palette, ReportContext};
use nscan_report::scan::sort_by_risk;
use nscan_report::testing::TestUtils;
use nscan_report::{
    assert_error_stage, normalize, NormalizedScan, ReportEngine, ReportFormat, RiskLevel, ScanResult,
    ScanType,
};
use serde_json::json;
use std::sync::Arc;

fn fixtures() -> Vec<ScanResult> {
    vec![
        ScanResult::default(),
        TestUtils::telnet_https_scan(),
        TestUtils::mixed_scan(),
        TestUtils::os_scan(),
        TestUtils::large_scan(20, 12),
    ]
}

fn text(engine: &ReportEngine, format: ReportFormat, scan: ScanResult) -> String {
    let report = engine
        .render(format, scan, TestUtils::metadata(ScanType::Quick))
        .unwrap();
    report.as_text().unwrap().to_string()
}

#[test]
fn test_open_ports_equal_findings() {
    for scan in fixtures() {
        let normalized = normalize(scan).unwrap();
        assert_eq!(normalized.port_states.open(), normalized.findings.len());
    }
}

#[test]
fn test_classification_is_pure() {
    for finding in normalize(TestUtils::large_scan(4, 16)).unwrap().findings {
        assert_eq!(classify(&finding.service), finding.risk_level);
        assert_eq!(classify(&finding.service), classify(&finding.service));
    }
}

#[test]
fn test_risk_counts_sum_to_open_ports() {
    for scan in fixtures() {
        let stats = ReportStatistics::aggregate(&NormalizedScan::from_scan(&scan));
        assert_eq!(stats.risk.total(), stats.open_ports);
    }
}

#[test]
fn test_average_os_accuracy() {
    // "95", 80 and "bad" average to 87.5
    let stats = OsStatistics::from_scan(&TestUtils::os_scan());
    assert_eq!(stats.average_accuracy, 87.5);
    assert_eq!(stats.detected_os, 2);
    assert_eq!(stats.total_hosts, 3);

    let unparseable = ScanResult::new(vec![TestUtils::host_with_os(
        "10.0.0.1",
        vec![
            TestUtils::os_match("A", json!("n/a"), json!(null)),
            TestUtils::os_match("B", json!(null), json!(null)),
        ],
    )]);
    assert_eq!(OsStatistics::from_scan(&unparseable).average_accuracy, 0.0);
}

#[test]
fn test_sort_by_risk_is_stable() {
    let scan = ScanResult::new(vec![TestUtils::host(
        "10.0.0.7",
        vec![
            TestUtils::port(80, "open", "http"),
            TestUtils::port(22, "open", "ssh"),
            TestUtils::port(25, "open", "smtp"),
            TestUtils::port(21, "open", "ftp"),
            TestUtils::port(53, "open", "dns"),
        ],
    )]);
    let mut findings = normalize(scan).unwrap().findings;
    sort_by_risk(&mut findings);

    let ports: Vec<u16> = findings.iter().map(|f| f.port).collect();
    assert_eq!(ports, vec![21, 80, 25, 53, 22]);
}

#[test]
fn test_knowledge_base_recommendations_win() {
    let engine = RecommendationEngine::default();
    let curated = KnowledgeBase::builtin().lookup("21").unwrap().recommendations.clone();
    assert_eq!(engine.recommend("ftp", "21"), curated);
}

#[test]
fn test_heuristic_recommendations_without_entry() {
    let engine = RecommendationEngine::default();
    let recommendations = engine.recommend("custom-http-thing", "8080");
    assert!(recommendations.contains(&HTTPS_UPGRADE.to_string()));

    let kb = KnowledgeBase::builtin();
    for port in ["21", "22", "23", "80", "443", "3306"] {
        for curated in &kb.lookup(port).unwrap().recommendations {
            assert!(!recommendations.contains(curated));
        }
    }
}

#[test]
fn test_tabular_rows_cover_all_states() {
    let scan = ScanResult::new(vec![TestUtils::host(
        "10.0.0.8",
        vec![
            TestUtils::port(22, "open", "ssh"),
            TestUtils::port(8443, "open", "https-alt"),
            TestUtils::port(3389, "closed", "ms-wbt-server"),
        ],
    )]);
    let engine = ReportEngine::default();

    let csv = text(&engine, ReportFormat::Csv, scan.clone());
    assert_eq!(csv.lines().count(), 1 + 3);

    let html = text(&engine, ReportFormat::Html, scan);
    assert!(html.contains("<td>ssh</td>"));
    assert!(html.contains("<td>https-alt</td>"));
    assert!(!html.contains("<td>ms-wbt-server</td>"));
}

#[test]
fn test_end_to_end_telnet_and_https() {
    let engine = ReportEngine::default();
    let normalized = normalize(TestUtils::telnet_https_scan()).unwrap();
    assert_eq!(normalized.findings.len(), 2);

    // "https" carries the "http" keyword, so it lands in the medium tier
    let stats = ReportStatistics::aggregate(&normalized);
    assert_eq!(stats.risk.get(RiskLevel::High), 1);
    assert_eq!(stats.risk.get(RiskLevel::Medium), 1);
    assert_eq!(stats.risk.get(RiskLevel::Low), 0);

    let csv = text(&engine, ReportFormat::Csv, TestUtils::telnet_https_scan());
    assert_eq!(csv.lines().skip(1).count(), 2);

    let html = text(&engine, ReportFormat::Html, TestUtils::telnet_https_scan());
    let telnet = html.find("<td>telnet</td>").unwrap();
    let https = html.find("<td>https</td>").unwrap();
    assert!(telnet < https);

    let sorted = normalized.sorted_findings();
    assert_eq!(sorted[0].service, "telnet");
    assert_eq!(sorted[1].service, "https");

    let pdf = engine
        .render(ReportFormat::Pdf, TestUtils::telnet_https_scan(), TestUtils::metadata(ScanType::Quick))
        .unwrap();
    assert!(pdf.content.starts_with(b"%PDF"));
    assert_eq!(pdf.mime_type, "application/pdf");
}

#[test]
fn test_no_charts_for_empty_input() {
    let palette = Palette::default();
    let options = ChartOptions::default();
    let charts = ChartRenderer::new(&palette, &options).render(&[], &PortStateCounts::default());
    assert!(charts.is_empty());
}

#[test]
fn test_serialized_envelope_input() {
    let envelope = json!({
        "status": "success",
        "output": [{
            "host": "10.0.0.5",
            "hostname": "",
            "state": "up",
            "protocols": {"tcp": [
                {"port": "23", "state": "open", "service": "telnet"},
                {"port": 443, "state": "open", "name": "https", "product": "nginx", "version": "1.24"}
            ]}
        }],
        "raw": "",
        "timestamp": "2024-05-01T12:00:00Z"
    });

    let engine = ReportEngine::default();
    let report = engine
        .render(ReportFormat::Csv, envelope.to_string(), TestUtils::metadata(ScanType::Quick))
        .unwrap();
    let csv = report.as_text().unwrap();
    assert!(csv.contains("10.0.0.5,tcp,23,open,telnet,N/A,N/A,High,"));
    assert!(csv.contains("10.0.0.5,tcp,443,open,https,nginx,1.24,Medium,"));
}

#[test]
fn test_csv_rows_follow_protocol_input_order() {
    let envelope = json!({
        "status": "success",
        "output": [{
            "host": "10.0.0.9",
            "protocols": {
                "udp": [{"port": 53, "state": "open", "service": "dns"}],
                "tcp": [{"port": 80, "state": "open", "service": "http"}]
            }
        }]
    });

    let engine = ReportEngine::default();
    let report = engine
        .render(ReportFormat::Csv, envelope.to_string(), TestUtils::metadata(ScanType::Quick))
        .unwrap();
    let rows: Vec<&str> = report.as_text().unwrap().lines().skip(1).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("10.0.0.9,udp,53,"));
    assert!(rows[1].starts_with("10.0.0.9,tcp,80,"));
}

#[test]
fn test_errors_name_the_failing_stage() {
    let engine = ReportEngine::default();
    let metadata = TestUtils::metadata(ScanType::Quick);

    let result = engine.render(ReportFormat::Html, "not json", metadata.clone());
    assert_error_stage!(result, ErrorStage::Normalize);

    let result = engine.render(ReportFormat::Pdf, r#"[{"host": "", "protocols": {}}]"#, metadata);
    assert_error_stage!(result, ErrorStage::Normalize);

    let err = "xlsx".parse::<ReportFormat>().unwrap_err();
    assert_eq!(err.stage(), ErrorStage::Argument);
    assert!(err.is_input_error());
}

#[test]
fn test_os_scan_renders_os_flow() {
    let engine = ReportEngine::default();
    let report = engine
        .render(ReportFormat::Html, TestUtils::os_scan(), TestUtils::metadata(ScanType::Os))
        .unwrap();
    let html = report.as_text().unwrap();
    assert!(html.contains("OS Distribution"));
    assert!(html.contains("Microsoft"));
    assert!(!html.contains("Detailed Findings"));

    let pdf = engine
        .render(ReportFormat::Pdf, TestUtils::os_scan(), TestUtils::metadata(ScanType::Os))
        .unwrap();
    assert!(pdf.content.starts_with(b"%PDF"));
}

#[test]
fn test_parallel_render_calls_share_knowledge_base() {
    let context = ReportContext::default();
    let knowledge_base = Arc::clone(&context.knowledge_base);
    let engine = ReportEngine::new(context);

    let outputs: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| text(&engine, ReportFormat::Csv, TestUtils::mixed_scan())))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(knowledge_base.len(), 16);
}

#[test]
fn test_large_scan_all_formats() {
    let engine = ReportEngine::default();
    let reports = engine
        .render_all(&ReportFormat::all(), TestUtils::large_scan(30, 20), TestUtils::metadata(ScanType::Full))
        .unwrap();
    assert_eq!(reports.len(), 3);

    let csv = reports.iter().find(|r| r.format == ReportFormat::Csv).unwrap();
    assert_eq!(csv.as_text().unwrap().lines().count(), 1 + 30 * 20);
}

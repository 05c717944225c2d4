use std::fmt::Write;

use crate::analysis::{classify, RecommendationEngine};
use crate::core::errors::{ReportEngineError, ReportResult};
use crate::report::{ReportContext, ReportData, ReportFormat, Reporter};

const HEADER: [&str; 9] = [
    "Host",
    "Protocol",
    "Port",
    "State",
    "Service",
    "Product",
    "Version",
    "Risk Level",
    "Recommendations",
];

/// Flat export with one row per observed port, whatever its state
pub struct CsvReporter {
    recommendations: RecommendationEngine,
}

impl CsvReporter {
    pub fn new(context: &ReportContext) -> Self {
        Self {
            recommendations: context.recommendations(),
        }
    }

    fn render_csv(&self, data: &ReportData) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        writeln!(out, "{}", HEADER.join(","))?;

        for observation in &data.scan.observations {
            // closed and filtered ports are classified too
            let risk = classify(&observation.service);
            let recommendations = self
                .recommendations
                .recommend(&observation.service, &observation.port.to_string())
                .join(", ");

            writeln!(
                out,
                "{},{},{},{},{},{},{},{},{}",
                csv_escape(&observation.host),
                csv_escape(&observation.protocol),
                observation.port,
                csv_escape(&observation.state),
                csv_escape(&observation.service),
                csv_escape(or_na(observation.product.as_deref())),
                csv_escape(or_na(observation.version.as_deref())),
                risk,
                csv_escape(&recommendations),
            )?;
        }

        Ok(out)
    }
}

impl Reporter for CsvReporter {
    fn render(&self, data: &ReportData) -> ReportResult<Vec<u8>> {
        self.render_csv(data)
            .map(String::into_bytes)
            .map_err(|e| ReportEngineError::generation(ReportFormat::Csv, e.to_string()))
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Csv
    }

    fn format_name(&self) -> &'static str {
        "CSV"
    }
}

fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or("N/A")
}

fn csv_escape(s: &str) -> String {
    let needs_quoting = s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r');
    let has_formula_prefix = matches!(s.as_bytes().first(), Some(b'=' | b'+' | b'-' | b'@' | b'\t' | b'\r'));

    if has_formula_prefix {
        // leading quote keeps spreadsheets from evaluating the cell
        format!("\"'{}\"", s.replace('"', "\"\""))
    } else if needs_quoting {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{NormalizedScan, ScanResult, ScanType};
    use crate::testing::TestUtils;

    fn render(scan: ScanResult) -> String {
        let data = ReportData::new(TestUtils::metadata(ScanType::Quick), NormalizedScan::from_scan(&scan));
        let bytes = CsvReporter::new(&ReportContext::default()).render(&data).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_one_row_per_port_record() {
        let scan = ScanResult::new(vec![TestUtils::host(
            "10.0.0.8",
            vec![
                TestUtils::port(22, "open", "ssh"),
                TestUtils::port(80, "open", "http"),
                TestUtils::port(25, "closed", "smtp"),
            ],
        )]);
        let output = render(scan);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], HEADER.join(","));
    }

    #[test]
    fn test_closed_port_still_classified() {
        let scan = ScanResult::new(vec![TestUtils::host(
            "10.0.0.8",
            vec![TestUtils::port(23, "closed", "telnet")],
        )]);
        let output = render(scan);
        let row = output.lines().nth(1).unwrap();
        assert!(row.starts_with("10.0.0.8,tcp,23,closed,telnet,N/A,N/A,High,"));
        assert!(row.contains("Replace with SSH"));
    }

    #[test]
    fn test_recommendations_are_quoted() {
        let output = render(TestUtils::telnet_https_scan());
        let row = output.lines().nth(1).unwrap();
        assert!(row.ends_with("\"Replace with SSH, Disable if not required, Use VPN if must be used\""));
    }

    #[test]
    fn test_empty_scan_has_header_only() {
        let output = render(ScanResult::default());
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("hello,world"), "\"hello,world\"");
        assert_eq!(csv_escape("say \"hello\""), "\"say \"\"hello\"\"\"");
        assert_eq!(csv_escape("=cmd()"), "\"'=cmd()\"");
        assert_eq!(csv_escape("plain"), "plain");
    }
}

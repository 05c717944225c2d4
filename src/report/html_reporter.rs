use crate::analysis::recommendations::OS_RECOMMENDATIONS;
use crate::analysis::RecommendationEngine;
use crate::core::errors::ReportResult;
use crate::report::theme::Palette;
use crate::report::{html_escape, ReportContext, ReportData, ReportFormat, ReportShape, Reporter};
use crate::scan::Finding;

/// Self-contained HTML report; charts are inlined as data URIs
pub struct HtmlReporter {
    title: String,
    palette: Palette,
    recommendations: RecommendationEngine,
}

impl HtmlReporter {
    pub fn new(context: &ReportContext) -> Self {
        Self {
            title: context.title.clone(),
            palette: context.palette.clone(),
            recommendations: context.recommendations(),
        }
    }

    fn render_html(&self, data: &ReportData) -> String {
        let mut html = self.generate_html_header(data);

        match data.shape {
            ReportShape::Standard => {
                html.push_str(&self.generate_executive_summary(data));
                html.push_str(&self.generate_charts_section(data));
                html.push_str(&self.generate_findings_table(data));
                html.push_str(&self.generate_recommendations_section(data));
                html.push_str(&self.generate_script_results(data));
            }
            ReportShape::OsDetection => {
                html.push_str(&self.generate_os_summary(data));
                html.push_str(&self.generate_os_distribution(data));
                html.push_str(&self.generate_os_details(data));
                html.push_str(&self.generate_os_recommendations());
            }
        }

        html.push_str(&self.generate_html_footer());
        html
    }

    fn generate_html_header(&self, data: &ReportData) -> String {
        let heading = match data.shape {
            ReportShape::Standard => self.title.clone(),
            ReportShape::OsDetection => "NScan OS Detection Report".to_string(),
        };
        let scan_id = data
            .metadata
            .scan_id
            .as_ref()
            .map(|id| format!("<span>Scan ID: {}</span>", html_escape(id)))
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - {scan_type}</title>
    {css}
</head>
<body>
    <div class="container">
        <header class="report-header">
            <h1>{title}</h1>
            <div class="header-info">
                <span>Scan Type: {scan_type_label}</span>
                <span>Generated on: {timestamp}</span>
                {scan_id}
            </div>
        </header>
"#,
            title = html_escape(&heading),
            scan_type = data.metadata.scan_type,
            css = self.get_embedded_css(),
            scan_type_label = data.metadata.scan_type_label(),
            timestamp = html_escape(&data.metadata.timestamp),
            scan_id = scan_id,
        )
    }

    fn generate_executive_summary(&self, data: &ReportData) -> String {
        let stats = &data.statistics;
        format!(
            r#"
        <section class="executive-summary">
            <h2>Executive Summary</h2>
            <div class="summary-grid">
                <div class="summary-card"><h3>Hosts Scanned</h3><p>{}</p></div>
                <div class="summary-card"><h3>Open Ports</h3><p>{}</p></div>
                <div class="summary-card"><h3>Closed Ports</h3><p>{}</p></div>
                <div class="summary-card"><h3>Filtered Ports</h3><p>{}</p></div>
                <div class="summary-card"><h3>High Risk Findings</h3><p class="count-high">{}</p></div>
                <div class="summary-card"><h3>Medium Risk Findings</h3><p class="count-medium">{}</p></div>
                <div class="summary-card"><h3>Low Risk Findings</h3><p class="count-low">{}</p></div>
            </div>
            <p class="narrative">This report presents a comprehensive security analysis of the network scan performed. {}</p>
        </section>
"#,
            stats.total_hosts,
            stats.open_ports,
            stats.closed_ports,
            stats.filtered_ports,
            stats.risk.high,
            stats.risk.medium,
            stats.risk.low,
            stats.narrative(),
        )
    }

    fn generate_charts_section(&self, data: &ReportData) -> String {
        if data.charts.is_empty() {
            return String::new();
        }

        let mut charts = String::new();
        for chart in data.charts.iter() {
            let legend: String = chart
                .legend
                .iter()
                .map(|entry| {
                    format!(
                        r#"<li><span class="swatch" style="background: {};"></span>{}: {} ({:.1}%)</li>"#,
                        entry.color.hex(),
                        html_escape(&entry.label),
                        entry.value,
                        entry.percentage
                    )
                })
                .collect();

            charts.push_str(&format!(
                r#"
                <div class="chart-container">
                    <h3>{title}</h3>
                    <img src="{src}" alt="{key} chart">
                    <ul class="legend">{legend}</ul>
                </div>"#,
                title = chart.kind.title(),
                src = chart.data_uri(),
                key = chart.kind.key(),
                legend = legend,
            ));
        }

        format!(
            r#"
        <section class="charts">
            <h2>Visual Analysis</h2>
            <div class="charts-grid">{}
            </div>
        </section>
"#,
            charts
        )
    }

    fn generate_findings_table(&self, data: &ReportData) -> String {
        let findings = data.scan.sorted_findings();

        let rows: String = if findings.is_empty() {
            r#"
                    <tr><td colspan="5" class="empty">No open ports were found.</td></tr>"#
                .to_string()
        } else {
            findings
                .iter()
                .map(|finding| {
                    format!(
                        r#"
                    <tr>
                        <td>{}</td>
                        <td>{}</td>
                        <td>{}</td>
                        <td>{}</td>
                        <td><span class="risk-badge risk-{}">{}</span></td>
                    </tr>"#,
                        html_escape(&finding.host),
                        html_escape(&finding.port_protocol()),
                        html_escape(&finding.service),
                        html_escape(&finding.product_version()),
                        finding.risk_level.as_str().to_lowercase(),
                        finding.risk_level,
                    )
                })
                .collect()
        };

        format!(
            r#"
        <section class="findings">
            <h2>Detailed Findings</h2>
            <div class="findings-table-container">
                <table class="findings-table">
                    <thead>
                        <tr>
                            <th>Host</th>
                            <th>Port/Protocol</th>
                            <th>Service</th>
                            <th>Product &amp; Version</th>
                            <th>Risk Level</th>
                        </tr>
                    </thead>
                    <tbody>{}
                    </tbody>
                </table>
            </div>
        </section>
"#,
            rows
        )
    }

    fn generate_recommendations_section(&self, data: &ReportData) -> String {
        let attention: Vec<Finding> = data
            .scan
            .sorted_findings()
            .into_iter()
            .filter(|f| f.risk_level.needs_attention())
            .collect();
        if attention.is_empty() {
            return String::new();
        }

        let mut blocks = String::new();
        for finding in &attention {
            let port = finding.port.to_string();
            let risks = list_items(&self.recommendations.known_risks(&port));
            let recommendations = list_items(&self.recommendations.recommend(&finding.service, &port));
            let level = finding.risk_level.as_str().to_lowercase();

            blocks.push_str(&format!(
                r#"
            <div class="finding-detail {level}-risk">
                <div class="finding-header">
                    <div class="finding-title">{host} - Port {port} ({service})</div>
                    <span class="risk-badge risk-{level}">{risk}</span>
                </div>
                <p><strong>Description:</strong> {description}</p>
                <div>
                    <strong>Known Risks:</strong>
                    <ul>{risks}</ul>
                </div>
                <div class="recommendations">
                    <h4>Recommendations</h4>
                    <ul>{recommendations}</ul>
                </div>
            </div>"#,
                level = level,
                host = html_escape(&finding.host),
                port = finding.port,
                service = html_escape(&finding.service),
                risk = finding.risk_level,
                description = html_escape(&self.recommendations.describe(&finding.service, &port)),
                risks = risks,
                recommendations = recommendations,
            ));
        }

        format!(
            r#"
        <section class="recommendations-section">
            <h2>Security Recommendations</h2>
            <p class="narrative">The following recommendations address the high and medium risk findings identified in this scan. Implementing these recommendations will help improve your security posture.</p>{}
        </section>
"#,
            blocks
        )
    }

    fn generate_script_results(&self, data: &ReportData) -> String {
        if data.scan.scripts.is_empty() {
            return String::new();
        }

        let mut hosts = String::new();
        for host in &data.scan.scripts {
            let scripts: String = host
                .scripts
                .iter()
                .map(|(name, output)| {
                    format!(
                        r#"
                    <dt>{}</dt>
                    <dd><pre>{}</pre></dd>"#,
                        html_escape(name),
                        html_escape(output)
                    )
                })
                .collect();
            hosts.push_str(&format!(
                r#"
            <div class="finding-detail">
                <div class="finding-title">Host: {}</div>
                <dl class="script-output">{}
                </dl>
            </div>"#,
                html_escape(&host.host),
                scripts
            ));
        }

        format!(
            r#"
        <section class="scripts">
            <h2>Script Results</h2>{}
        </section>
"#,
            hosts
        )
    }

    fn generate_os_summary(&self, data: &ReportData) -> String {
        let stats = &data.os_statistics;
        format!(
            r#"
        <section class="executive-summary">
            <h2>OS Detection Summary</h2>
            <div class="summary-grid">
                <div class="summary-card"><h3>Hosts Scanned</h3><p>{}</p></div>
                <div class="summary-card"><h3>OS Detected</h3><p>{}</p></div>
                <div class="summary-card"><h3>Average Accuracy</h3><p>{:.1}%</p></div>
            </div>
            <p class="narrative">This report presents the results of an OS detection scan. {}</p>
        </section>
"#,
            stats.total_hosts,
            stats.detected_os,
            stats.average_accuracy,
            stats.narrative(),
        )
    }

    fn generate_os_distribution(&self, data: &ReportData) -> String {
        let table = |label: &str, entries: &crate::analysis::FrequencyTable| -> String {
            let rows: String = entries
                .iter()
                .map(|(key, count)| {
                    format!(
                        r#"
                        <tr><td>{}</td><td>{}</td></tr>"#,
                        html_escape(key),
                        count
                    )
                })
                .collect();
            format!(
                r#"
                <table class="findings-table">
                    <thead><tr><th>{}</th><th>Count</th></tr></thead>
                    <tbody>{}
                    </tbody>
                </table>"#,
                label, rows
            )
        };

        format!(
            r#"
        <section class="os-distribution">
            <h2>OS Distribution</h2>
            <div class="findings-table-container">
                <h3>OS Types</h3>{}
                <h3>OS Vendors</h3>{}
            </div>
        </section>
"#,
            table("OS Type", &data.os_statistics.os_types),
            table("Vendor", &data.os_statistics.vendors),
        )
    }

    fn generate_os_details(&self, data: &ReportData) -> String {
        let mut hosts = String::new();

        for host in &data.scan.os_hosts {
            let mut body = String::new();
            if host.matches.is_empty() {
                body.push_str(
                    r#"
                <p><em>No OS detection information available for this host</em></p>"#,
                );
            }

            for (i, os_match) in host.matches.iter().enumerate() {
                let accuracy = match os_match.accuracy {
                    Some(_) => format!("{}%", html_escape(&os_match.accuracy_display)),
                    None => html_escape(&os_match.accuracy_display),
                };
                let classes: String = os_match
                    .classes
                    .iter()
                    .map(|class| {
                        format!(
                            r#"
                    <div class="os-class">
                        <p>Type: {}</p>
                        <p>Vendor: {}</p>
                        <p>Family: {}</p>
                        <p>Generation: {}</p>
                    </div>"#,
                            html_escape(&class.os_type),
                            html_escape(&class.vendor),
                            html_escape(&class.family),
                            html_escape(&class.generation),
                        )
                    })
                    .collect();

                body.push_str(&format!(
                    r#"
                <div class="os-match">
                    <p><strong>OS Match {}:</strong> {} (Accuracy: {})</p>{}
                </div>"#,
                    i + 1,
                    html_escape(&os_match.name),
                    accuracy,
                    classes
                ));
            }

            hosts.push_str(&format!(
                r#"
            <div class="finding-detail">
                <div class="finding-header">
                    <div class="finding-title">Host: {}</div>
                </div>{}
            </div>"#,
                html_escape(&host.host),
                body
            ));
        }

        format!(
            r#"
        <section class="os-details">
            <h2>Detailed OS Detection Results</h2>{}
        </section>
"#,
            hosts
        )
    }

    fn generate_os_recommendations(&self) -> String {
        let items: Vec<String> = OS_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect();
        format!(
            r#"
        <section class="recommendations-section">
            <h2>OS Security Recommendations</h2>
            <p class="narrative">Based on the detected operating systems, consider implementing the following security recommendations:</p>
            <ul class="os-recommendations">{}</ul>
        </section>
"#,
            list_items(&items)
        )
    }

    fn generate_html_footer(&self) -> String {
        r#"
        <footer class="report-footer">
            <p>This report was generated by NScan Security Scanner.</p>
        </footer>
    </div>
</body>
</html>
"#
        .to_string()
    }

    fn get_embedded_css(&self) -> String {
        let palette = &self.palette;
        format!(
            r#"<style>
        :root {{
            --primary: {primary};
            --secondary: {secondary};
            --neutral: {neutral};
            --background: {background};
            --dark: {dark};
            --high-risk: {high};
            --medium-risk: {medium};
            --low-risk: {low};
        }}

        * {{ margin: 0; padding: 0; box-sizing: border-box; }}

        body {{
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            line-height: 1.6;
            color: var(--dark);
            background-color: var(--background);
        }}

        .container {{
            max-width: 1200px;
            margin: 0 auto;
            background: white;
            box-shadow: 0 0 20px rgba(0,0,0,0.1);
            min-height: 100vh;
        }}

        .report-header {{
            background: var(--primary);
            color: white;
            padding: 2rem;
            border-radius: 0 0 20px 20px;
        }}

        .report-header h1 {{ font-size: 2.2rem; margin-bottom: 1rem; }}

        .header-info {{
            display: flex;
            gap: 2rem;
            flex-wrap: wrap;
            font-size: 0.9rem;
            opacity: 0.9;
        }}

        section {{
            margin: 2rem;
            background: white;
            border-radius: 10px;
            box-shadow: 0 2px 10px rgba(0,0,0,0.1);
            overflow: hidden;
        }}

        section h2 {{
            background: #f8f9fa;
            padding: 1rem 2rem;
            border-bottom: 2px solid #e9ecef;
            color: #495057;
        }}

        section h3 {{ margin: 1rem 0 0.5rem; color: #495057; }}

        .narrative {{ padding: 0 2rem 1.5rem; }}

        .summary-grid {{
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
            gap: 1rem;
            padding: 2rem;
        }}

        .summary-card {{
            border: 1px solid #e9ecef;
            border-radius: 8px;
            padding: 1.5rem;
            text-align: center;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }}

        .summary-card p {{ font-size: 2rem; font-weight: bold; }}
        .count-high {{ color: var(--high-risk); }}
        .count-medium {{ color: var(--medium-risk); }}
        .count-low {{ color: var(--low-risk); }}

        .charts-grid {{
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(320px, 1fr));
            gap: 1.5rem;
            padding: 2rem;
        }}

        .chart-container img {{ max-width: 100%; }}
        .legend {{ list-style: none; font-size: 0.9rem; }}
        .swatch {{
            display: inline-block;
            width: 10px;
            height: 10px;
            margin-right: 0.5rem;
            border-radius: 2px;
        }}

        .findings-table-container {{ padding: 2rem; overflow-x: auto; }}

        .findings-table {{ width: 100%; border-collapse: collapse; margin: 1rem 0; }}

        .findings-table th,
        .findings-table td {{
            padding: 0.75rem 1rem;
            text-align: left;
            border-bottom: 1px solid #e9ecef;
        }}

        .findings-table th {{ background: #f8f9fa; font-weight: 600; color: #495057; }}
        .findings-table td.empty {{ text-align: center; color: var(--neutral); }}

        .risk-badge {{
            padding: 0.25rem 0.75rem;
            border-radius: 20px;
            font-weight: bold;
            color: white;
            font-size: 0.85rem;
        }}

        .risk-high {{ background: var(--high-risk); }}
        .risk-medium {{ background: var(--medium-risk); }}
        .risk-low {{ background: var(--low-risk); }}

        .finding-detail {{
            margin: 1rem 2rem;
            padding: 1rem;
            border: 1px solid #e9ecef;
            border-left: 4px solid var(--neutral);
            border-radius: 8px;
        }}

        .finding-detail.high-risk {{ border-left-color: var(--high-risk); }}
        .finding-detail.medium-risk {{ border-left-color: var(--medium-risk); }}

        .finding-header {{
            display: flex;
            align-items: center;
            justify-content: space-between;
            margin-bottom: 0.5rem;
        }}

        .finding-title {{ font-weight: 600; }}
        .finding-detail ul {{ margin: 0.5rem 0 0.5rem 1.5rem; }}
        .recommendations h4 {{ color: var(--primary); }}
        .os-match, .os-class {{ margin-left: 1.25rem; }}
        .os-recommendations {{ padding: 0 2rem 1.5rem 3.5rem; }}
        .script-output dt {{ font-weight: 600; margin-top: 0.5rem; }}
        .script-output pre {{ white-space: pre-wrap; background: #f8f9fa; padding: 0.5rem; }}

        .report-footer {{
            background: var(--dark);
            color: white;
            text-align: center;
            padding: 2rem;
            margin-top: 2rem;
        }}

        @media (max-width: 768px) {{
            section {{ margin: 1rem; }}
            .header-info {{ flex-direction: column; gap: 0.5rem; }}
            .summary-grid {{ grid-template-columns: 1fr; }}
        }}

        @media print {{
            body {{ background: white; }}
            .container {{ box-shadow: none; }}
            section {{ break-inside: avoid; box-shadow: none; border: 1px solid #ddd; }}
        }}
    </style>"#,
            primary = palette.primary.hex(),
            secondary = palette.secondary.hex(),
            neutral = palette.neutral.hex(),
            background = palette.background.hex(),
            dark = palette.dark.hex(),
            high = palette.high_risk.hex(),
            medium = palette.medium_risk.hex(),
            low = palette.low_risk.hex(),
        )
    }
}

impl Reporter for HtmlReporter {
    fn render(&self, data: &ReportData) -> ReportResult<Vec<u8>> {
        Ok(self.render_html(data).into_bytes())
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Html
    }

    fn format_name(&self) -> &'static str {
        "HTML"
    }
}

fn list_items(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("<li>{}</li>", html_escape(item)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::charts::ChartRenderer;
    use crate::scan::{NormalizedScan, ScanResult, ScanType};
    use crate::testing::TestUtils;

    fn render(scan: ScanResult, scan_type: ScanType) -> String {
        let context = ReportContext::default();
        let normalized = NormalizedScan::from_scan(&scan);
        let charts = ChartRenderer::new(&context.palette, &context.charts)
            .render(&normalized.findings, &normalized.port_states);
        let data = ReportData::new(TestUtils::metadata(scan_type), normalized).with_charts(charts);
        let bytes = HtmlReporter::new(&context).render(&data).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_html_reporter_creation() {
        let reporter = HtmlReporter::new(&ReportContext::default());
        assert_eq!(reporter.format_name(), "HTML");
        assert_eq!(reporter.file_extension(), "html");
    }

    #[test]
    fn test_html_generation() {
        let html = render(TestUtils::mixed_scan(), ScanType::Quick);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Executive Summary"));
        assert!(html.contains("data:image/png;base64,"));
        assert!(html.contains("Script Results"));
        assert!(html.contains("Scan ID: 3f2b9c1e-8d4a-4c6b-9f00-1234567890ab"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_findings_sorted_high_first() {
        let html = render(TestUtils::telnet_https_scan(), ScanType::Quick);
        let telnet = html.find("<td>telnet</td>").unwrap();
        let https = html.find("<td>https</td>").unwrap();
        assert!(telnet < https);
    }

    #[test]
    fn test_recommendation_block_context() {
        let html = render(TestUtils::telnet_https_scan(), ScanType::Quick);
        assert!(html.contains("10.0.0.5 - Port 23 (telnet)"));
        assert!(html.contains("Unencrypted remote terminal protocol"));
        assert!(html.contains("Clear-text passwords"));
        // https matches the "http" keyword and is Medium
        let telnet = html.find("10.0.0.5 - Port 23 (telnet)").unwrap();
        let https = html.find("10.0.0.5 - Port 443 (https)").unwrap();
        assert!(telnet < https);
    }

    #[test]
    fn test_closed_ports_not_listed() {
        let scan = ScanResult::new(vec![TestUtils::host(
            "10.0.0.8",
            vec![TestUtils::port(22, "open", "ssh"), TestUtils::port(25, "closed", "smtp")],
        )]);
        let html = render(scan, ScanType::Quick);
        assert!(html.contains("<td>ssh</td>"));
        assert!(!html.contains("<td>smtp</td>"));
    }

    #[test]
    fn test_markup_is_escaped() {
        let scan = ScanResult::new(vec![TestUtils::host(
            "10.0.0.9",
            vec![TestUtils::port(8000, "open", "<script>alert(1)</script>")],
        )]);
        let html = render(scan, ScanType::Quick);
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_os_flow() {
        let html = render(TestUtils::os_scan(), ScanType::Os);
        assert!(html.contains("OS Detection Summary"));
        assert!(html.contains("OS Match 1:</strong> Linux 5.4 (Accuracy: 95%)"));
        assert!(html.contains("No OS detection information available for this host"));
        assert!(html.contains("Average Accuracy</h3><p>87.5%"));
        assert!(html.contains(OS_RECOMMENDATIONS[0]));
        assert!(!html.contains("Detailed Findings"));
    }
}

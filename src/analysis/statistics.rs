//! Statistics aggregation over a normalized scan

use serde::Serialize;

use crate::scan::{HostOsSummary, NormalizedScan, RiskLevel, ScanResult};

/// Insertion-ordered counter; iteration follows first-seen order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrequencyTable {
    entries: Vec<(String, usize)>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: &str) {
        self.add(key, 1);
    }

    pub fn add(&mut self, key: &str, count: usize) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, n)) => *n += count,
            None => self.entries.push((key.to_string(), count)),
        }
    }

    pub fn get(&self, key: &str) -> usize {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(k, n)| (k.as_str(), *n))
    }

    /// Most frequent keys first; equal counts keep first-seen order
    pub fn top_n(&self, n: usize) -> Vec<(String, usize)> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Port counts per state across every port record, open or not
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortStateCounts {
    states: FrequencyTable,
}

impl PortStateCounts {
    pub fn record(&mut self, state: &str) {
        self.states.record(state);
    }

    pub fn open(&self) -> usize {
        self.states.get("open")
    }

    pub fn closed(&self) -> usize {
        self.states.get("closed")
    }

    /// Everything that is neither open nor closed
    pub fn filtered(&self) -> usize {
        self.total() - self.open() - self.closed()
    }

    pub fn total(&self) -> usize {
        self.states.total()
    }

    /// Raw per-state table, in first-seen order
    pub fn table(&self) -> &FrequencyTable {
        &self.states
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Findings per risk tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl RiskCounts {
    pub fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::High => self.high += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::Low => self.low += 1,
        }
    }

    pub fn get(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::High => self.high,
            RiskLevel::Medium => self.medium,
            RiskLevel::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Figures shared by the executive summary of every standard report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportStatistics {
    pub total_hosts: usize,
    pub open_ports: usize,
    pub closed_ports: usize,
    pub filtered_ports: usize,
    pub port_states: PortStateCounts,
    /// Computed over open ports only
    pub risk: RiskCounts,
    /// Service frequency over open ports only
    pub services: FrequencyTable,
}

impl ReportStatistics {
    pub fn aggregate(scan: &NormalizedScan) -> Self {
        let mut risk = RiskCounts::default();
        let mut services = FrequencyTable::new();

        for finding in &scan.findings {
            risk.record(finding.risk_level);
            services.record(&finding.service);
        }

        Self {
            total_hosts: scan.total_hosts,
            open_ports: scan.port_states.open(),
            closed_ports: scan.port_states.closed(),
            filtered_ports: scan.port_states.filtered(),
            port_states: scan.port_states.clone(),
            risk,
            services,
        }
    }

    /// One-sentence overview used by the executive summaries
    pub fn narrative(&self) -> String {
        format!(
            "The scan identified a total of {} open ports across {} host(s), with {} high risk, {} medium risk, and {} low risk findings.",
            self.open_ports, self.total_hosts, self.risk.high, self.risk.medium, self.risk.low
        )
    }
}

/// OS-detection figures
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OsStatistics {
    pub total_hosts: usize,
    /// Hosts with at least one OS match
    pub detected_os: usize,
    pub vendors: FrequencyTable,
    pub os_types: FrequencyTable,
    /// Mean of the parseable accuracies; 0 when none parsed
    pub average_accuracy: f64,
}

impl OsStatistics {
    /// Aggregate per-host OS summaries; malformed accuracies are skipped
    /// and do not count toward the average's denominator
    pub fn aggregate(hosts: &[HostOsSummary], total_hosts: usize) -> Self {
        let mut stats = OsStatistics {
            total_hosts,
            ..Default::default()
        };
        let mut accuracy_sum = 0.0;
        let mut accuracy_count = 0usize;

        for host in hosts {
            if !host.matches.is_empty() {
                stats.detected_os += 1;
            }

            for os_match in &host.matches {
                for class in &os_match.classes {
                    stats.vendors.record(&class.vendor);
                    stats.os_types.record(&class.os_type);
                }

                if let Some(accuracy) = os_match.accuracy {
                    accuracy_sum += accuracy;
                    accuracy_count += 1;
                }
            }
        }

        if accuracy_count > 0 {
            stats.average_accuracy = accuracy_sum / accuracy_count as f64;
        }

        stats
    }

    pub fn from_normalized(scan: &NormalizedScan) -> Self {
        Self::aggregate(&scan.os_hosts, scan.total_hosts)
    }

    pub fn from_scan(scan: &ScanResult) -> Self {
        Self::from_normalized(&NormalizedScan::from_scan(scan))
    }

    pub fn narrative(&self) -> String {
        format!(
            "OS detection identified operating systems on {} out of {} host(s), with an average detection accuracy of {:.1}%.",
            self.detected_os, self.total_hosts, self.average_accuracy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestUtils;
    use serde_json::json;

    #[test]
    fn test_frequency_table_ties_keep_first_seen() {
        let mut table = FrequencyTable::new();
        for key in ["ssh", "http", "ftp", "http", "ssh", "smtp"] {
            table.record(key);
        }
        let top = table.top_n(3);
        assert_eq!(top[0], ("ssh".to_string(), 2));
        assert_eq!(top[1], ("http".to_string(), 2));
        assert_eq!(top[2], ("ftp".to_string(), 1));
        assert_eq!(table.total(), 6);
    }

    #[test]
    fn test_port_state_counts() {
        let mut counts = PortStateCounts::default();
        for state in ["open", "closed", "filtered", "open|filtered", "open"] {
            counts.record(state);
        }
        assert_eq!(counts.open(), 2);
        assert_eq!(counts.closed(), 1);
        assert_eq!(counts.filtered(), 2);
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn test_risk_counts_sum_to_open_ports() {
        let scan = NormalizedScan::from_scan(&TestUtils::mixed_scan());
        let stats = ReportStatistics::aggregate(&scan);
        assert_eq!(stats.risk.total(), stats.open_ports);
        assert_eq!(stats.services.total(), stats.open_ports);
    }

    #[test]
    fn test_narrative() {
        let scan = NormalizedScan::from_scan(&TestUtils::telnet_https_scan());
        let stats = ReportStatistics::aggregate(&scan);
        assert_eq!(
            stats.narrative(),
            "The scan identified a total of 2 open ports across 1 host(s), with 1 high risk, 1 medium risk, and 0 low risk findings."
        );
    }

    #[test]
    fn test_average_accuracy_skips_malformed() {
        let scan = ScanResult::new(vec![
            TestUtils::host_with_os(
                "10.0.0.1",
                vec![
                    TestUtils::os_match("Linux 5.4", json!("95"), json!({"vendor": "Linux", "type": "general purpose"})),
                    TestUtils::os_match("Linux 4.x", json!(80), json!([{"vendor": "Linux"}])),
                ],
            ),
            TestUtils::host_with_os(
                "10.0.0.2",
                vec![TestUtils::os_match("Windows", json!("bad"), json!(null))],
            ),
            TestUtils::host("10.0.0.3", vec![]),
        ]);

        let stats = OsStatistics::from_scan(&scan);
        assert_eq!(stats.total_hosts, 3);
        assert_eq!(stats.detected_os, 2);
        assert!((stats.average_accuracy - 87.5).abs() < f64::EPSILON);
        assert_eq!(stats.vendors.get("Linux"), 2);
        assert_eq!(stats.os_types.get("general purpose"), 1);
        assert_eq!(stats.os_types.get("Unknown"), 1);
    }

    #[test]
    fn test_average_accuracy_zero_without_values() {
        let scan = ScanResult::new(vec![TestUtils::host_with_os(
            "10.0.0.1",
            vec![TestUtils::os_match("Mystery", json!(null), json!(null))],
        )]);
        let stats = OsStatistics::from_scan(&scan);
        assert_eq!(stats.average_accuracy, 0.0);
        assert_eq!(stats.detected_os, 1);
    }
}

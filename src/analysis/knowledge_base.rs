//! Well-known port reference data
//!
//! Maps port numbers to a canonical service name, a description, the known
//! risks of exposing it and curated recommendations. The table is immutable
//! once built and is shared between concurrent render calls through `Arc`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference entry for one well-known port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortInfo {
    pub service: String,
    pub description: String,
    pub risks: Vec<String>,
    pub recommendations: Vec<String>,
}

impl PortInfo {
    fn new(service: &str, description: &str, risks: [&str; 3], recommendations: [&str; 3]) -> Self {
        Self {
            service: service.to_string(),
            description: description.to_string(),
            risks: risks.iter().map(|s| s.to_string()).collect(),
            recommendations: recommendations.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Port number (as text) -> reference entry
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeBase {
    entries: BTreeMap<String, PortInfo>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KnowledgeBase {
    /// Empty table; every lookup falls through to heuristics
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Built-in table of commonly exposed services
    pub fn builtin() -> Self {
        let table = [
            (
                "20",
                PortInfo::new(
                    "FTP Data",
                    "File Transfer Protocol - Data Channel",
                    [
                        "Unencrypted data transmission",
                        "Potential for anonymous access",
                        "Vulnerable to brute force attacks",
                    ],
                    [
                        "Use SFTP or FTPS instead",
                        "Implement strong authentication",
                        "Use firewall rules to restrict access",
                    ],
                ),
            ),
            (
                "21",
                PortInfo::new(
                    "FTP Control",
                    "File Transfer Protocol - Control Channel",
                    [
                        "Clear text credentials",
                        "Directory traversal risks",
                        "Known exploits",
                    ],
                    [
                        "Use SFTP or FTPS instead",
                        "Implement strong authentication",
                        "Keep FTP server software updated",
                    ],
                ),
            ),
            (
                "22",
                PortInfo::new(
                    "SSH",
                    "Secure Shell - Encrypted remote access",
                    [
                        "Brute force attempts",
                        "Version-specific vulnerabilities",
                        "Key management risks",
                    ],
                    [
                        "Use key-based authentication",
                        "Disable root login",
                        "Keep SSH implementation updated",
                    ],
                ),
            ),
            (
                "23",
                PortInfo::new(
                    "Telnet",
                    "Unencrypted remote terminal protocol",
                    [
                        "Unencrypted communications",
                        "Clear-text passwords",
                        "Man-in-the-middle attacks",
                    ],
                    [
                        "Replace with SSH",
                        "Disable if not required",
                        "Use VPN if must be used",
                    ],
                ),
            ),
            (
                "25",
                PortInfo::new(
                    "SMTP",
                    "Simple Mail Transfer Protocol",
                    [
                        "Open relay attacks",
                        "Email spoofing",
                        "Vulnerability to spam attacks",
                    ],
                    [
                        "Implement SPF, DKIM and DMARC",
                        "Require authentication",
                        "Use TLS for transmission",
                    ],
                ),
            ),
            (
                "53",
                PortInfo::new(
                    "DNS",
                    "Domain Name System",
                    [
                        "Cache poisoning",
                        "DNS amplification attacks",
                        "Zone transfer vulnerabilities",
                    ],
                    [
                        "Implement DNSSEC",
                        "Restrict zone transfers",
                        "Keep DNS software updated",
                    ],
                ),
            ),
            (
                "80",
                PortInfo::new(
                    "HTTP",
                    "Web Server - Unencrypted web traffic",
                    [
                        "Man-in-the-middle attacks",
                        "Data interception",
                        "Web vulnerabilities",
                    ],
                    [
                        "Upgrade to HTTPS",
                        "Implement HTTP Strict Transport Security",
                        "Use Web Application Firewall",
                    ],
                ),
            ),
            (
                "110",
                PortInfo::new(
                    "POP3",
                    "Post Office Protocol - Email retrieval",
                    [
                        "Clear text authentication",
                        "Email content exposed",
                        "Outdated protocol vulnerabilities",
                    ],
                    [
                        "Use POP3S (TLS/SSL)",
                        "Consider IMAP as alternative",
                        "Implement strong authentication",
                    ],
                ),
            ),
            (
                "139",
                PortInfo::new(
                    "NetBIOS",
                    "NetBIOS Session Service",
                    [
                        "Information disclosure",
                        "Legacy protocol vulnerabilities",
                        "Potential for lateral movement",
                    ],
                    [
                        "Block at network boundary",
                        "Use VPN for required access",
                        "Disable if not needed",
                    ],
                ),
            ),
            (
                "143",
                PortInfo::new(
                    "IMAP",
                    "Internet Message Access Protocol",
                    [
                        "Clear text authentication",
                        "Email content exposed",
                        "Various implementation vulnerabilities",
                    ],
                    [
                        "Use IMAPS (TLS/SSL)",
                        "Implement strong authentication",
                        "Keep mail server updated",
                    ],
                ),
            ),
            (
                "443",
                PortInfo::new(
                    "HTTPS",
                    "Secure Web Server - Encrypted web traffic",
                    [
                        "SSL/TLS vulnerabilities",
                        "Certificate issues",
                        "Web application risks",
                    ],
                    [
                        "Keep TLS configuration updated",
                        "Use proper certificate management",
                        "Implement security headers",
                    ],
                ),
            ),
            (
                "445",
                PortInfo::new(
                    "SMB",
                    "Server Message Block - File sharing",
                    [
                        "EternalBlue and related exploits",
                        "Unauthorized access to shares",
                        "Lateral movement within network",
                    ],
                    [
                        "Keep fully patched",
                        "Block at network boundary",
                        "Use latest SMB version",
                    ],
                ),
            ),
            (
                "1433",
                PortInfo::new(
                    "MS SQL",
                    "Microsoft SQL Database Server",
                    [
                        "SQL injection attacks",
                        "Default or weak credentials",
                        "Excessive privileges",
                    ],
                    [
                        "Use strong authentication",
                        "Implement least privilege",
                        "Keep database patched",
                    ],
                ),
            ),
            (
                "3306",
                PortInfo::new(
                    "MySQL",
                    "MySQL Database Server",
                    [
                        "SQL injection attacks",
                        "Default or weak credentials",
                        "Public exposure risks",
                    ],
                    [
                        "Restrict remote access",
                        "Use strong passwords",
                        "Keep database updated",
                    ],
                ),
            ),
            (
                "3389",
                PortInfo::new(
                    "RDP",
                    "Remote Desktop Protocol",
                    [
                        "BlueKeep and similar vulnerabilities",
                        "Brute force attacks",
                        "Man-in-the-middle attacks",
                    ],
                    [
                        "Use Network Level Authentication",
                        "Implement 2FA",
                        "Use VPN for access",
                    ],
                ),
            ),
            (
                "5432",
                PortInfo::new(
                    "PostgreSQL",
                    "PostgreSQL Database Server",
                    [
                        "SQL injection attacks",
                        "Default or weak credentials",
                        "Public exposure risks",
                    ],
                    [
                        "Restrict remote access",
                        "Use strong authentication",
                        "Keep database updated",
                    ],
                ),
            ),
        ];

        Self {
            entries: table
                .into_iter()
                .map(|(port, info)| (port.to_string(), info))
                .collect(),
        }
    }

    /// Add or replace entries, returning the extended table
    pub fn with_entries<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (String, PortInfo)>,
    {
        self.entries.extend(entries);
        self
    }

    /// Exact lookup by port number text
    pub fn lookup(&self, port: &str) -> Option<&PortInfo> {
        self.entries.get(port)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

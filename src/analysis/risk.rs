//! Service risk classification

use crate::scan::RiskLevel;

/// Keywords that mark a service as high risk, checked first
pub const HIGH_RISK_KEYWORDS: [&str; 4] = ["telnet", "ftp", "rsh", "rlogin"];

/// Keywords that mark a service as medium risk
pub const MEDIUM_RISK_KEYWORDS: [&str; 6] = ["http", "smtp", "pop3", "imap", "dns", "smb"];

/// Classify a service name by case-insensitive substring match.
///
/// Unknown and empty service names are `Low`.
pub fn classify(service: &str) -> RiskLevel {
    let service = service.to_lowercase();

    if HIGH_RISK_KEYWORDS.iter().any(|k| service.contains(k)) {
        RiskLevel::High
    } else if MEDIUM_RISK_KEYWORDS.iter().any(|k| service.contains(k)) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_risk_services() {
        assert_eq!(classify("telnet"), RiskLevel::High);
        assert_eq!(classify("FTP"), RiskLevel::High);
        assert_eq!(classify("ftp-data"), RiskLevel::High);
        assert_eq!(classify("rlogin"), RiskLevel::High);
    }

    #[test]
    fn test_high_set_checked_before_medium() {
        // "sftp-over-http" contains both "ftp" and "http"
        assert_eq!(classify("sftp-over-http"), RiskLevel::High);
    }

    #[test]
    fn test_medium_risk_services() {
        assert_eq!(classify("http"), RiskLevel::Medium);
        assert_eq!(classify("https"), RiskLevel::Medium);
        assert_eq!(classify("microsoft-ds smb"), RiskLevel::Medium);
        assert_eq!(classify("domain dns"), RiskLevel::Medium);
    }

    #[test]
    fn test_low_risk_and_unknown() {
        assert_eq!(classify("ssh"), RiskLevel::Low);
        assert_eq!(classify(""), RiskLevel::Low);
        assert_eq!(classify("Unknown"), RiskLevel::Low);
    }

    #[test]
    fn test_classification_is_deterministic() {
        for service in ["telnet", "http", "mysql", ""] {
            assert_eq!(classify(service), classify(service));
        }
    }
}

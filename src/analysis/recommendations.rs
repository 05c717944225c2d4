//! Per-service remediation advice

use std::sync::Arc;

use super::knowledge_base::KnowledgeBase;

pub const HTTPS_UPGRADE: &str = "Consider upgrading to HTTPS for encrypted communication";
pub const SECURE_TRANSFER: &str = "Replace with SFTP or FTPS for secure file transfers";
pub const SSH_REPLACEMENT: &str = "Replace with SSH for secure remote access";
pub const RESTRICT_DATABASE: &str = "Restrict database access to trusted networks only";
pub const DATABASE_AUTH: &str = "Implement strong authentication and regular audits";

/// Advice returned when neither the knowledge base nor a heuristic applies
pub const GENERIC_RECOMMENDATIONS: [&str; 3] = [
    "Keep the service updated with security patches",
    "Restrict access to this service with proper firewall rules",
    "Monitor for suspicious activity",
];

/// Generic hardening advice closing every OS-detection report
pub const OS_RECOMMENDATIONS: [&str; 7] = [
    "Ensure all identified operating systems are up to date with the latest security patches",
    "Remove or update any end-of-life operating systems that no longer receive security updates",
    "Implement host-based firewalls on all systems",
    "Consider network segmentation based on OS types",
    "Implement regular vulnerability scanning for all detected operating systems",
    "Develop an incident response plan specific to the OS types in your environment",
    "Document all identified systems for IT asset management",
];

/// Derives recommendations from the knowledge base, then keyword heuristics
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    knowledge_base: Arc<KnowledgeBase>,
}

impl RecommendationEngine {
    pub fn new(knowledge_base: Arc<KnowledgeBase>) -> Self {
        Self { knowledge_base }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    /// Recommendations for a service on a port; never empty.
    ///
    /// An exact knowledge-base match on `port` wins outright. Otherwise each
    /// matching keyword heuristic contributes its lines, and the generic
    /// fallback is used when none matched.
    pub fn recommend(&self, service: &str, port: &str) -> Vec<String> {
        if let Some(info) = self.knowledge_base.lookup(port) {
            return info.recommendations.clone();
        }

        let service = service.to_lowercase();
        let mut recommendations = Vec::new();

        if service.contains("http") && port != "443" {
            recommendations.push(HTTPS_UPGRADE.to_string());
        }
        if service.contains("ftp") {
            recommendations.push(SECURE_TRANSFER.to_string());
        }
        if service.contains("telnet") {
            recommendations.push(SSH_REPLACEMENT.to_string());
        }
        if service.contains("sql") {
            recommendations.push(RESTRICT_DATABASE.to_string());
            recommendations.push(DATABASE_AUTH.to_string());
        }

        if recommendations.is_empty() {
            recommendations = GENERIC_RECOMMENDATIONS
                .iter()
                .map(|s| s.to_string())
                .collect();
        }

        recommendations
    }

    /// Knowledge-base description of a port, or a synthesized one
    pub fn describe(&self, service: &str, port: &str) -> String {
        self.knowledge_base
            .lookup(port)
            .map(|info| info.description.clone())
            .unwrap_or_else(|| format!("Port {} - {}", port, service))
    }

    /// Known risks of a port, or a placeholder when the port is not catalogued
    pub fn known_risks(&self, port: &str) -> Vec<String> {
        self.knowledge_base
            .lookup(port)
            .map(|info| info.risks.clone())
            .unwrap_or_else(|| vec!["Unknown risks".to_string()])
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(Arc::new(KnowledgeBase::builtin()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knowledge_base_wins() {
        let engine = RecommendationEngine::default();
        let recs = engine.recommend("ftp", "21");
        let curated = &engine.knowledge_base().lookup("21").unwrap().recommendations;
        assert_eq!(&recs, curated);
        assert!(!recs.contains(&SECURE_TRANSFER.to_string()));
    }

    #[test]
    fn test_http_heuristic_off_catalogue() {
        let engine = RecommendationEngine::default();
        let recs = engine.recommend("custom-http-thing", "8080");
        assert_eq!(recs, vec![HTTPS_UPGRADE.to_string()]);
        assert!(!recs.iter().any(|r| r == "Upgrade to HTTPS"));
    }

    #[test]
    fn test_http_on_443_gets_no_upgrade_advice() {
        let engine = RecommendationEngine::new(Arc::new(KnowledgeBase::empty()));
        let recs = engine.recommend("https", "443");
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0], GENERIC_RECOMMENDATIONS[0]);
    }

    #[test]
    fn test_heuristics_accumulate() {
        let engine = RecommendationEngine::default();
        let recs = engine.recommend("mysql-over-ftp", "9999");
        assert_eq!(
            recs,
            vec![
                SECURE_TRANSFER.to_string(),
                RESTRICT_DATABASE.to_string(),
                DATABASE_AUTH.to_string(),
            ]
        );
    }

    #[test]
    fn test_generic_fallback() {
        let engine = RecommendationEngine::default();
        let recs = engine.recommend("", "31337");
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[2], "Monitor for suspicious activity");
    }

    #[test]
    fn test_descriptions_and_risks() {
        let engine = RecommendationEngine::default();
        assert_eq!(engine.describe("ssh", "22"), "Secure Shell - Encrypted remote access");
        assert_eq!(engine.describe("proxy", "3128"), "Port 3128 - proxy");
        assert_eq!(engine.known_risks("3128"), vec!["Unknown risks".to_string()]);
    }
}

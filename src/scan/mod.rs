//! Scan input model and normalization
//!
//! The scanning collaborator hands over a nested host/protocol/port structure.
//! The types here accept that structure with all of its optional and
//! loosely-typed fields, and [`normalizer`] flattens it into the records every
//! renderer consumes.

pub mod normalizer;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use tracing::warn;

use crate::core::errors::ReportEngineError;

pub use normalizer::{
    normalize, HostOsSummary, HostScripts, NormalizedScan, OsClassSummary, OsMatchSummary, ScanInput,
};

/// Ordered list of scanned hosts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanResult {
    pub hosts: Vec<HostRecord>,
}

impl ScanResult {
    pub fn new(hosts: Vec<HostRecord>) -> Self {
        Self { hosts }
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// One scanned host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostRecord {
    #[serde(rename = "host", alias = "address")]
    pub address: String,
    #[serde(default, deserialize_with = "nullable")]
    pub hostname: String,
    #[serde(default, deserialize_with = "nullable")]
    pub state: String,
    #[serde(default, deserialize_with = "nullable")]
    pub protocols: OrderedMap<Vec<PortRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<OrderedMap<String>>,
}

/// String-keyed map that keeps entries in the order they were read
///
/// The scanner emits protocols and script results as JSON objects whose key
/// order is meaningful: findings of equal risk are presented in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced key keeps its original position
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, V)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a, V> IntoIterator for &'a OrderedMap<V> {
    type Item = &'a (String, V);
    type IntoIter = std::slice::Iter<'a, (String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map with string keys")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// One port observed on a host for a given protocol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortRecord {
    #[serde(deserialize_with = "port_number")]
    pub port: u16,
    pub state: String,
    #[serde(default, alias = "name", deserialize_with = "nullable")]
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extrainfo: Option<String>,
    #[serde(default, deserialize_with = "cpe_list", skip_serializing_if = "Vec::is_empty")]
    pub cpe: Vec<String>,
}

/// OS fingerprint block of a host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsInfo {
    #[serde(default, deserialize_with = "nullable")]
    pub matches: Vec<OsMatch>,
}

/// One OS fingerprint candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsMatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub accuracy: Option<Accuracy>,
    #[serde(default)]
    pub osclass: Option<OneOrMany<OsClassEntry>>,
}

impl OsMatch {
    /// OS classes of this match; a bare object counts as a one-element list
    /// and non-object entries are dropped
    pub fn classes(&self) -> Vec<&OsClass> {
        match &self.osclass {
            Some(entries) => entries
                .iter()
                .filter_map(|entry| match entry {
                    OsClassEntry::Class(class) => Some(class),
                    OsClassEntry::Other(value) => {
                        warn!(entry = %value, "Skipping malformed OS class entry");
                        None
                    }
                })
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Accuracy as reported by the scanner: a number, a numeric string, or junk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Accuracy {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl Accuracy {
    /// Numeric value when the accuracy parses as a number
    pub fn value(&self) -> Option<f64> {
        match self {
            Accuracy::Number(n) if n.is_finite() => Some(*n),
            Accuracy::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accuracy::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Accuracy::Number(n) => write!(f, "{}", n),
            Accuracy::Text(s) => write!(f, "{}", s),
            Accuracy::Other(v) => write!(f, "{}", v),
        }
    }
}

/// Classification attached to an OS match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsClass {
    pub vendor: Option<String>,
    #[serde(rename = "type")]
    pub os_type: Option<String>,
    pub osfamily: Option<String>,
    pub osgen: Option<String>,
}

/// An `osclass` list element; anything that is not an object is kept but ignored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OsClassEntry {
    Class(OsClass),
    Other(serde_json::Value),
}

/// A field the scanner emits either as a single value or as a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::Many(items) => items.iter(),
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Risk tier of a discovered service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Presentation rank: High first, Low last
    pub fn rank(&self) -> u8 {
        match self {
            RiskLevel::High => 0,
            RiskLevel::Medium => 1,
            RiskLevel::Low => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        }
    }

    /// High and Medium findings get dedicated recommendation blocks
    pub fn needs_attention(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Medium)
    }

    pub fn all() -> [RiskLevel; 3] {
        [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low]
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One open service on one host, with its computed risk tier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub service: String,
    pub product: Option<String>,
    pub version: Option<String>,
    pub risk_level: RiskLevel,
}

impl Finding {
    /// `port/protocol` column text
    pub fn port_protocol(&self) -> String {
        format!("{}/{}", self.port, self.protocol)
    }

    /// Product and version joined for display, `-` when neither is known
    pub fn product_version(&self) -> String {
        product_version(self.product.as_deref(), self.version.as_deref())
    }
}

/// Stable sort High -> Medium -> Low, keeping input order within a tier
pub fn sort_by_risk(findings: &mut [Finding]) {
    findings.sort_by_key(|f| f.risk_level.rank());
}

/// Every port record flattened, whatever its state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortObservation {
    pub host: String,
    pub protocol: String,
    pub port: u16,
    pub state: String,
    pub service: String,
    pub product: Option<String>,
    pub version: Option<String>,
}

pub(crate) fn product_version(product: Option<&str>, version: Option<&str>) -> String {
    let parts: Vec<&str> = [product, version]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("unknown"))
        .collect();

    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(" ")
    }
}

/// Scan profiles offered by the scanning collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    Quick,
    Full,
    Stealth,
    Vuln,
    Service,
    Os,
    Udp,
    Script,
    Custom,
}

impl ScanType {
    pub fn tag(&self) -> &'static str {
        match self {
            ScanType::Quick => "quick",
            ScanType::Full => "full",
            ScanType::Stealth => "stealth",
            ScanType::Vuln => "vuln",
            ScanType::Service => "service",
            ScanType::Os => "os",
            ScanType::Udp => "udp",
            ScanType::Script => "script",
            ScanType::Custom => "custom",
        }
    }

    /// Command-line arguments the scanner runs for this profile
    pub fn nmap_arguments(&self) -> &'static str {
        match self {
            ScanType::Quick => "-sV -F -T4 --version-intensity 5",
            ScanType::Full => "-sS -sV -O -p- -T4 --version-intensity 7",
            ScanType::Stealth => "-sS -Pn -T2 --version-intensity 0",
            ScanType::Vuln => "-sV -sC --script vuln -T4",
            ScanType::Service => "-sV -A --version-all",
            ScanType::Os => "-O -sV --osscan-guess --fuzzy",
            ScanType::Udp => "-sU -sV --version-intensity 5",
            ScanType::Script => "-sC -sV --script default,safe",
            ScanType::Custom => "-A -T4 -v",
        }
    }

    pub fn all() -> [ScanType; 9] {
        [
            ScanType::Quick,
            ScanType::Full,
            ScanType::Stealth,
            ScanType::Vuln,
            ScanType::Service,
            ScanType::Os,
            ScanType::Udp,
            ScanType::Script,
            ScanType::Custom,
        ]
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for ScanType {
    type Err = ReportEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quick" => Ok(ScanType::Quick),
            "full" => Ok(ScanType::Full),
            "stealth" => Ok(ScanType::Stealth),
            "vuln" | "vulnerability" => Ok(ScanType::Vuln),
            "service" => Ok(ScanType::Service),
            "os" => Ok(ScanType::Os),
            "udp" => Ok(ScanType::Udp),
            "script" => Ok(ScanType::Script),
            "custom" => Ok(ScanType::Custom),
            _ => Err(ReportEngineError::UnsupportedScanType(s.to_string())),
        }
    }
}

/// Treat an explicit `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn port_number<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u64),
        Text(String),
    }

    let raw = match PortValue::deserialize(deserializer)? {
        PortValue::Number(n) => n,
        PortValue::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid port number '{}'", s)))?,
    };

    u16::try_from(raw)
        .map_err(|_| serde::de::Error::custom(format!("port number {} out of range", raw)))
}

fn cpe_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<OneOrMany<String>>::deserialize(deserializer)?;
    Ok(value
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_host_record_accepts_loose_fields() {
        let host: HostRecord = serde_json::from_value(json!({
            "host": "10.0.0.5",
            "hostname": null,
            "state": "up",
            "protocols": {
                "tcp": [
                    {"port": "22", "state": "open", "service": "ssh", "cpe": "cpe:/a:openbsd:openssh"},
                    {"port": 80, "state": "closed", "service": null}
                ]
            }
        }))
        .unwrap();

        assert_eq!(host.address, "10.0.0.5");
        assert_eq!(host.hostname, "");
        let ports = host.protocols.get("tcp").unwrap();
        assert_eq!(ports[0].port, 22);
        assert_eq!(ports[0].cpe, vec!["cpe:/a:openbsd:openssh".to_string()]);
        assert_eq!(ports[1].service, "");
    }

    #[test]
    fn test_address_alias() {
        let host: HostRecord = serde_json::from_value(json!({"address": "192.168.1.1"})).unwrap();
        assert_eq!(host.address, "192.168.1.1");
        assert!(host.protocols.is_empty());
    }

    #[test]
    fn test_port_out_of_range_rejected() {
        let port = serde_json::from_value::<PortRecord>(json!({"port": 70000, "state": "open"}));
        assert!(port.is_err());
    }

    #[test]
    fn test_osclass_single_object_and_junk() {
        let single: OsMatch = serde_json::from_value(json!({
            "name": "Linux 5.x",
            "accuracy": "95",
            "osclass": {"vendor": "Linux", "type": "general purpose"}
        }))
        .unwrap();
        assert_eq!(single.classes().len(), 1);
        assert_eq!(single.classes()[0].vendor.as_deref(), Some("Linux"));

        let mixed: OsMatch = serde_json::from_value(json!({
            "name": "Windows",
            "osclass": [{"vendor": "Microsoft"}, "garbage", 42]
        }))
        .unwrap();
        assert_eq!(mixed.classes().len(), 1);
    }

    #[test]
    fn test_accuracy_parsing() {
        assert_eq!(Accuracy::Text("95".into()).value(), Some(95.0));
        assert_eq!(Accuracy::Number(80.0).value(), Some(80.0));
        assert_eq!(Accuracy::Text("bad".into()).value(), None);
        assert_eq!(Accuracy::Number(80.0).to_string(), "80");
    }

    #[test]
    fn test_risk_sort_is_stable() {
        let finding = |service: &str, risk| Finding {
            host: "h".into(),
            port: 1,
            protocol: "tcp".into(),
            service: service.into(),
            product: None,
            version: None,
            risk_level: risk,
        };
        let mut findings = vec![
            finding("a", RiskLevel::Low),
            finding("b", RiskLevel::High),
            finding("c", RiskLevel::Low),
            finding("d", RiskLevel::Medium),
            finding("e", RiskLevel::High),
        ];
        sort_by_risk(&mut findings);
        let order: Vec<&str> = findings.iter().map(|f| f.service.as_str()).collect();
        assert_eq!(order, vec!["b", "e", "d", "a", "c"]);
    }

    #[test]
    fn test_product_version_display() {
        assert_eq!(product_version(Some("OpenSSH"), Some("8.9")), "OpenSSH 8.9");
        assert_eq!(product_version(Some(""), Some("")), "-");
        assert_eq!(product_version(None, Some("2.4")), "2.4");
    }

    #[test]
    fn test_protocols_keep_input_order() {
        let host: HostRecord = serde_json::from_str(
            r#"{"host": "10.0.0.5",
                "protocols": {"udp": [{"port": 53, "state": "open"}], "tcp": [{"port": 80, "state": "open"}]},
                "scripts": {"ssh-hostkey": "2048 aa:bb", "banner": "SSH-2.0"}}"#,
        )
        .unwrap();

        assert_eq!(host.protocols.keys().collect::<Vec<_>>(), vec!["udp", "tcp"]);
        let scripts = host.scripts.unwrap();
        assert_eq!(scripts.keys().collect::<Vec<_>>(), vec!["ssh-hostkey", "banner"]);
    }

    #[test]
    fn test_ordered_map_replace_keeps_position() {
        let mut map: OrderedMap<u32> = [("b", 1), ("a", 2)].into_iter().collect();
        assert_eq!(map.insert("b", 3), Some(1));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(map.get("b"), Some(&3));

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"b":3,"a":2}"#);
    }

    #[test]
    fn test_nmap_arguments_per_profile() {
        assert_eq!(ScanType::Quick.nmap_arguments(), "-sV -F -T4 --version-intensity 5");
        assert!(ScanType::Os.nmap_arguments().contains("--osscan-guess"));
        assert!(ScanType::Udp.nmap_arguments().starts_with("-sU"));
        assert!(ScanType::Vuln.nmap_arguments().contains("--script vuln"));
        for scan_type in ScanType::all() {
            assert!(!scan_type.nmap_arguments().is_empty(), "{} has no arguments", scan_type);
        }
    }

    #[test]
    fn test_scan_type_parsing() {
        assert_eq!("OS".parse::<ScanType>().unwrap(), ScanType::Os);
        assert_eq!("vulnerability".parse::<ScanType>().unwrap(), ScanType::Vuln);
        assert!("ping".parse::<ScanType>().is_err());
    }
}

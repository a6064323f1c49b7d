use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::traffic_generator::GeneratorError;

/// Number of aggregate features fed to a classifier
pub const FEATURE_COUNT: usize = 5;

/// Feature names in classifier input order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "packet_rate",
    "unique_ips",
    "avg_packet_size",
    "protocol_diversity",
    "connection_rate",
];

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
}

/// Simulation loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Maximum retained samples per history buffer
    pub history_capacity: usize,
    /// Number of entries returned by the data endpoint
    pub recent_window: usize,
    /// Pause between ticks in milliseconds
    pub tick_interval_ms: u64,
    /// Upper bound on generated packet records per sample
    pub max_packets: u32,
    /// Intensity used when a start request omits it
    pub default_intensity: f64,
    /// Run duration used when a start request omits it
    pub default_duration_secs: f64,
    /// Buffered updates per push subscriber
    pub push_channel_capacity: usize,
    /// Maximum retained alerts
    pub alert_capacity: usize,
    /// Confidence above which an attack verdict raises an alert
    pub alert_confidence: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            recent_window: 20,
            tick_interval_ms: 1000,
            max_packets: 50,
            default_intensity: 1.0,
            default_duration_secs: 60.0,
            push_channel_capacity: 64,
            alert_capacity: 5,
            alert_confidence: 0.8,
        }
    }
}

/// Which classification strategy the process runs with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    RandomForest,
    RuleBased,
}

/// Detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Active classifier strategy
    pub classifier: ClassifierKind,
    /// Seed for synthetic training data and bootstrap sampling
    pub seed: u64,
    /// Trees in the forest
    pub n_estimators: usize,
    /// Total synthetic training samples, split evenly between classes
    pub training_samples: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierKind::RandomForest,
            seed: 42,
            n_estimators: 100,
            training_samples: 1000,
            max_depth: 8,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Simulation configuration
    pub simulation: SimulationConfig,
    /// Detection configuration
    pub detection: DetectionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            simulation: SimulationConfig::default(),
            detection: DetectionConfig::default(),
        }
    }
}

/// Synthetic attack profile
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    SynFlood,
    UdpFlood,
    HttpFlood,
}

impl AttackType {
    pub const ALL: [AttackType; 3] = [
        AttackType::SynFlood,
        AttackType::UdpFlood,
        AttackType::HttpFlood,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttackType::SynFlood => "syn_flood",
            AttackType::UdpFlood => "udp_flood",
            AttackType::HttpFlood => "http_flood",
        }
    }

    /// Parse an optional selector where absent or `"none"` means benign traffic.
    pub fn parse_selector(value: Option<&str>) -> Result<Option<AttackType>, GeneratorError> {
        match value {
            None | Some("none") => Ok(None),
            Some(name) => name.parse().map(Some),
        }
    }
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttackType {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttackType::ALL
            .into_iter()
            .find(|attack| attack.as_str() == s)
            .ok_or_else(|| GeneratorError::UnknownAttackType(s.to_string()))
    }
}

/// Transport tag of a synthetic packet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Http,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Tcp, Protocol::Udp, Protocol::Http];
}

/// One synthetic packet record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PacketRecord {
    pub timestamp: DateTime<Utc>,
    pub source_ip: String,
    pub destination_ip: String,
    pub protocol: Protocol,
    pub packet_size: u32,
    pub is_malicious: bool,
}

/// Aggregate traffic statistics consumed by a classifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FeatureVector {
    pub packet_rate: u32,
    pub unique_ips: u32,
    pub avg_packet_size: u32,
    pub protocol_diversity: f64,
    pub connection_rate: u32,
}

impl FeatureVector {
    /// Features in `FEATURE_NAMES` order
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.packet_rate as f64,
            self.unique_ips as f64,
            self.avg_packet_size as f64,
            self.protocol_diversity,
            self.connection_rate as f64,
        ]
    }
}

/// One synthesized observation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrafficSample {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub features: FeatureVector,
    pub packets: Vec<PacketRecord>,
    /// Ground truth chosen by the generator
    pub is_attack: bool,
    pub attack_type: Option<AttackType>,
}

/// One classifier verdict
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionResult {
    pub timestamp: DateTime<Utc>,
    pub is_attack: bool,
    /// Certainty in the verdict itself
    pub confidence: f64,
    pub attack_probability: f64,
}

/// Pair published to push subscribers on every tick
#[derive(Debug, Clone, Serialize)]
pub struct TrafficUpdate {
    pub traffic: TrafficSample,
    pub detection: DetectionResult,
}

/// Classifier metadata for the dashboard
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelInfo {
    pub model_type: String,
    pub n_estimators: usize,
    pub features: Vec<String>,
    pub feature_importance: Vec<f64>,
}

//! Rule-based attack scoring for the DDoS simulation service.
//!
//! This module scores a traffic sample by summing fixed increments for every
//! threshold rule that fires, then caps the total at 1.0.

use serde::{Deserialize, Serialize};

use crate::core::classifier::{Classifier, Verdict};
use crate::models::{FeatureVector, ModelInfo, FEATURE_NAMES};

/// Static importance weights reported for the rule set
pub const RULE_FEATURE_IMPORTANCE: [f64; 5] = [0.25, 0.20, 0.15, 0.20, 0.20];

/// Feature a rule condition inspects
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    PacketRate,
    UniqueIps,
    AvgPacketSize,
    ProtocolDiversity,
    ConnectionRate,
}

impl Feature {
    fn value(&self, features: &FeatureVector) -> f64 {
        match self {
            Feature::PacketRate => features.packet_rate as f64,
            Feature::UniqueIps => features.unique_ips as f64,
            Feature::AvgPacketSize => features.avg_packet_size as f64,
            Feature::ProtocolDiversity => features.protocol_diversity,
            Feature::ConnectionRate => features.connection_rate as f64,
        }
    }
}

/// Rule operator for comparing a feature against a threshold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum RuleOperator {
    /// Greater than
    GreaterThan,
    /// Less than
    LessThan,
}

/// Rule condition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RuleCondition {
    Compare {
        feature: Feature,
        operator: RuleOperator,
        threshold: f64,
    },
    All(Vec<RuleCondition>),
}

impl RuleCondition {
    pub fn above(feature: Feature, threshold: f64) -> Self {
        RuleCondition::Compare {
            feature,
            operator: RuleOperator::GreaterThan,
            threshold,
        }
    }

    pub fn below(feature: Feature, threshold: f64) -> Self {
        RuleCondition::Compare {
            feature,
            operator: RuleOperator::LessThan,
            threshold,
        }
    }

    pub fn matches(&self, features: &FeatureVector) -> bool {
        match self {
            RuleCondition::Compare {
                feature,
                operator,
                threshold,
            } => {
                let value = feature.value(features);
                match operator {
                    RuleOperator::GreaterThan => value > *threshold,
                    RuleOperator::LessThan => value < *threshold,
                }
            }
            RuleCondition::All(conditions) => conditions.iter().all(|c| c.matches(features)),
        }
    }
}

/// Scoring rule.
///
/// Tiers are checked in order and only the first matching tier contributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Rule name
    pub name: String,
    /// `(condition, increment)` pairs, strongest first
    pub tiers: Vec<(RuleCondition, f64)>,
}

impl Rule {
    fn single(name: &str, condition: RuleCondition, increment: f64) -> Self {
        Self {
            name: name.to_string(),
            tiers: vec![(condition, increment)],
        }
    }

    /// Increment contributed by this rule, zero when no tier matches
    pub fn score(&self, features: &FeatureVector) -> f64 {
        self.tiers
            .iter()
            .find(|(condition, _)| condition.matches(features))
            .map(|(_, increment)| *increment)
            .unwrap_or(0.0)
    }
}

/// Hand-tuned rule-based classifier
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    /// Create a rule engine with a custom rule set
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Sum of fired increments, capped at 1.0
    pub fn score(&self, features: &FeatureVector) -> f64 {
        self.rules
            .iter()
            .map(|rule| rule.score(features))
            .sum::<f64>()
            .min(1.0)
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        use Feature::*;

        Self::new(vec![
            Rule {
                name: "high_packet_rate".to_string(),
                tiers: vec![
                    (RuleCondition::above(PacketRate, 500.0), 0.4),
                    (RuleCondition::above(PacketRate, 300.0), 0.2),
                ],
            },
            Rule::single(
                "concentrated_sources",
                RuleCondition::All(vec![
                    RuleCondition::below(UniqueIps, 20.0),
                    RuleCondition::above(PacketRate, 200.0),
                ]),
                0.3,
            ),
            Rule::single("small_packets", RuleCondition::below(AvgPacketSize, 100.0), 0.2),
            Rule::single(
                "low_protocol_diversity",
                RuleCondition::below(ProtocolDiversity, 0.4),
                0.2,
            ),
            Rule::single(
                "high_connection_rate",
                RuleCondition::above(ConnectionRate, 100.0),
                0.3,
            ),
        ])
    }
}

impl Classifier for RuleEngine {
    fn classify(&self, features: &FeatureVector) -> Verdict {
        Verdict::from_probability(self.score(features))
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model_type: "Rule-based Classifier".to_string(),
            n_estimators: 1,
            features: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            feature_importance: RULE_FEATURE_IMPORTANCE.to_vec(),
        }
    }
}

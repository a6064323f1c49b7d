//! Classification strategies for synthetic traffic samples.
//!
//! Both strategies map a five-feature vector to a verdict and are chosen once
//! at startup from configuration.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;

use crate::core::ml_detector::ForestClassifier;
use crate::core::rule_engine::RuleEngine;
use crate::models::{ClassifierKind, DetectionConfig, DetectionResult, FeatureVector, ModelInfo};

/// Attack decision for one feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    pub is_attack: bool,
    /// Certainty in `is_attack`, in [0, 1]
    pub confidence: f64,
    /// Estimated probability of attack, in [0, 1]
    pub attack_probability: f64,
}

impl Verdict {
    /// Verdict for a probability under the `> 0.5` decision rule.
    pub fn from_probability(attack_probability: f64) -> Self {
        let attack_probability = attack_probability.clamp(0.0, 1.0);
        Self {
            is_attack: attack_probability > 0.5,
            confidence: attack_probability.max(1.0 - attack_probability),
            attack_probability,
        }
    }

    pub fn into_result(self, timestamp: DateTime<Utc>) -> DetectionResult {
        DetectionResult {
            timestamp,
            is_attack: self.is_attack,
            confidence: self.confidence,
            attack_probability: self.attack_probability,
        }
    }
}

/// A traffic classifier.
///
/// Implementations are stateless after initialization and safe to share
/// between the simulation loop and request handlers.
#[cfg_attr(test, mockall::automock)]
pub trait Classifier: Send + Sync {
    /// Classify one sample
    fn classify(&self, features: &FeatureVector) -> Verdict;

    /// Describe the classifier for the dashboard
    fn model_info(&self) -> ModelInfo;
}

/// Build the classifier selected by configuration
pub fn build_classifier(config: &DetectionConfig) -> Arc<dyn Classifier> {
    match config.classifier {
        ClassifierKind::RandomForest => {
            let classifier = ForestClassifier::new(config.clone());
            classifier.warm_up();
            info!(
                "Using random forest classifier ({} trees, seed {})",
                config.n_estimators, config.seed
            );
            Arc::new(classifier)
        }
        ClassifierKind::RuleBased => {
            info!("Using rule-based classifier");
            Arc::new(RuleEngine::default())
        }
    }
}

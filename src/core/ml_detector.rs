//! Model-based DDoS detection for the DDoS simulation service.
//!
//! This module trains a random forest on synthetic labeled traffic once per
//! process and uses it to classify generated samples.

use std::time::Instant;

use log::info;
use once_cell::sync::OnceCell;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::core::classifier::{Classifier, Verdict};
use crate::core::forest::{RandomForest, Sample, StandardScaler};
use crate::models::{DetectionConfig, FeatureVector, ModelInfo, FEATURE_COUNT, FEATURE_NAMES};

/// Per-feature `(mean, std_dev)` of benign training traffic
pub const BENIGN_DISTRIBUTION: [(f64, f64); FEATURE_COUNT] =
    [(100.0, 20.0), (50.0, 10.0), (1024.0, 200.0), (0.8, 0.1), (20.0, 5.0)];

/// Per-feature `(mean, std_dev)` of attack training traffic
pub const ATTACK_DISTRIBUTION: [(f64, f64); FEATURE_COUNT] =
    [(1000.0, 200.0), (10.0, 5.0), (64.0, 20.0), (0.2, 0.05), (200.0, 50.0)];

/// Fitted scaler and forest
pub struct TrainedModel {
    pub scaler: StandardScaler,
    pub forest: RandomForest,
}

impl TrainedModel {
    /// Probability that a feature vector is an attack
    pub fn attack_probability(&self, features: &FeatureVector) -> f64 {
        let scaled = self.scaler.transform(&features.to_array());
        self.forest.predict_proba(&scaled)
    }
}

/// Draw the synthetic training set: `n / 2` benign rows followed by `n / 2` attack rows.
pub fn training_data(rng: &mut StdRng, n_samples: usize) -> (Vec<Sample>, Vec<bool>) {
    let per_class = n_samples / 2;
    let mut samples = Vec::with_capacity(per_class * 2);
    let mut labels = Vec::with_capacity(per_class * 2);

    for (distribution, label) in [(&BENIGN_DISTRIBUTION, false), (&ATTACK_DISTRIBUTION, true)] {
        // Parameters are constants with positive deviations.
        let normals: Vec<Normal<f64>> = distribution
            .iter()
            .filter_map(|&(mean, std_dev)| Normal::new(mean, std_dev).ok())
            .collect();

        for _ in 0..per_class {
            let mut row = [0.0; FEATURE_COUNT];
            for (value, normal) in row.iter_mut().zip(&normals) {
                *value = normal.sample(rng);
            }
            samples.push(row);
            labels.push(label);
        }
    }

    (samples, labels)
}

/// Fit scaler and forest according to the detection configuration.
pub fn train(config: &DetectionConfig) -> TrainedModel {
    let started = Instant::now();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let (samples, labels) = training_data(&mut rng, config.training_samples);
    let scaler = StandardScaler::fit(&samples);
    let scaled: Vec<Sample> = samples.iter().map(|row| scaler.transform(row)).collect();
    let forest = RandomForest::fit(
        &mut rng,
        &scaled,
        &labels,
        config.n_estimators,
        config.max_depth,
    );

    info!(
        "Trained random forest on {} samples ({} trees) in {:?}",
        samples.len(),
        forest.n_estimators(),
        started.elapsed()
    );

    TrainedModel { scaler, forest }
}

/// Random forest classifier, trained on first use
pub struct ForestClassifier {
    /// Detection configuration
    config: DetectionConfig,
    /// Model, initialized at most once
    model: OnceCell<TrainedModel>,
}

impl ForestClassifier {
    /// Create a new, untrained classifier
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
        }
    }

    /// Train now instead of on the first classification
    pub fn warm_up(&self) {
        self.model();
    }

    pub fn is_trained(&self) -> bool {
        self.model.get().is_some()
    }

    fn model(&self) -> &TrainedModel {
        self.model.get_or_init(|| train(&self.config))
    }
}

impl Classifier for ForestClassifier {
    fn classify(&self, features: &FeatureVector) -> Verdict {
        Verdict::from_probability(self.model().attack_probability(features))
    }

    fn model_info(&self) -> ModelInfo {
        let model = self.model();
        ModelInfo {
            model_type: "Random Forest Classifier".to_string(),
            n_estimators: model.forest.n_estimators(),
            features: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            feature_importance: model.forest.feature_importance().to_vec(),
        }
    }
}

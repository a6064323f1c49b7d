//! Detection analytics for the DDoS simulation service.
//!
//! Compares classifier verdicts against the generator's ground truth over
//! the retained history.

use serde::{Deserialize, Serialize};

use crate::models::{DetectionResult, TrafficSample};

/// Confusion summary of verdicts against ground truth
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DetectionStats {
    pub samples: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
    /// `None` until at least one pair has been recorded
    pub accuracy: Option<f64>,
}

impl DetectionStats {
    /// Pair samples and verdicts in generation order.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a TrafficSample, &'a DetectionResult)>,
    ) -> Self {
        let mut stats = Self::default();
        for (sample, detection) in pairs {
            stats.record(sample.is_attack, detection.is_attack);
        }
        stats
    }

    fn record(&mut self, actual: bool, predicted: bool) {
        self.samples += 1;
        match (actual, predicted) {
            (true, true) => self.true_positives += 1,
            (false, true) => self.false_positives += 1,
            (false, false) => self.true_negatives += 1,
            (true, false) => self.false_negatives += 1,
        }
        let correct = self.true_positives + self.true_negatives;
        self.accuracy = Some(correct as f64 / self.samples as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureVector;
    use chrono::Utc;

    fn pair(actual: bool, predicted: bool) -> (TrafficSample, DetectionResult) {
        let timestamp = Utc::now();
        (
            TrafficSample {
                timestamp,
                features: FeatureVector {
                    packet_rate: 100,
                    unique_ips: 50,
                    avg_packet_size: 1000,
                    protocol_diversity: 0.8,
                    connection_rate: 20,
                },
                packets: Vec::new(),
                is_attack: actual,
                attack_type: None,
            },
            DetectionResult {
                timestamp,
                is_attack: predicted,
                confidence: 1.0,
                attack_probability: if predicted { 1.0 } else { 0.0 },
            },
        )
    }

    #[test]
    fn test_empty_history() {
        let stats = DetectionStats::from_pairs(std::iter::empty());
        assert_eq!(stats.samples, 0);
        assert_eq!(stats.accuracy, None);
    }

    #[test]
    fn test_confusion_counts() {
        let pairs = vec![
            pair(true, true),
            pair(true, true),
            pair(false, true),
            pair(false, false),
            pair(true, false),
        ];
        let stats = DetectionStats::from_pairs(pairs.iter().map(|(s, d)| (s, d)));

        assert_eq!(stats.samples, 5);
        assert_eq!(stats.true_positives, 2);
        assert_eq!(stats.false_positives, 1);
        assert_eq!(stats.true_negatives, 1);
        assert_eq!(stats.false_negatives, 1);
        assert_eq!(stats.accuracy, Some(0.6));
    }
}

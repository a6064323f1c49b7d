//! Alerting for the DDoS simulation service.
//!
//! This module turns high-confidence attack verdicts into dashboard alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AttackType, DetectionResult, TrafficSample};

/// Confidence at or above which an alert is critical
pub const CRITICAL_CONFIDENCE: f64 = 0.95;

/// Alert level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    /// Warning alert
    Warning,
    /// Critical alert
    Critical,
}

/// Alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Alert ID
    pub id: String,
    /// Alert level
    pub level: AlertLevel,
    /// Alert message
    pub message: String,
    /// Profile the generator was running when the alert fired
    pub attack_type: Option<AttackType>,
    /// Verdict confidence
    pub confidence: f64,
    /// Alert creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Decides which verdicts raise alerts
#[derive(Debug, Clone, Copy)]
pub struct AlertPolicy {
    /// Minimum (exclusive) confidence of an attack verdict
    pub confidence_threshold: f64,
}

impl AlertPolicy {
    pub fn new(confidence_threshold: f64) -> Self {
        Self { confidence_threshold }
    }

    /// Alert for a tick, if its verdict warrants one
    pub fn evaluate(&self, sample: &TrafficSample, detection: &DetectionResult) -> Option<Alert> {
        if !detection.is_attack || detection.confidence <= self.confidence_threshold {
            return None;
        }

        let level = if detection.confidence >= CRITICAL_CONFIDENCE {
            AlertLevel::Critical
        } else {
            AlertLevel::Warning
        };

        Some(Alert {
            id: Uuid::new_v4().to_string(),
            level,
            message: format!(
                "DDoS attack detected! Confidence: {:.1}%",
                detection.confidence * 100.0
            ),
            attack_type: sample.attack_type,
            confidence: detection.confidence,
            created_at: detection.timestamp,
        })
    }
}

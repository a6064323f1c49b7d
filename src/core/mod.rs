//! Core functionality for the DDoS simulation service.
//!
//! This module contains the core components of the service,
//! including traffic generation, classification, the simulation loop,
//! alerting and detection analytics.

pub mod analytics;
pub mod classifier;
pub mod forest;
pub mod history;
pub mod ml_detector;
pub mod monitoring;
pub mod rule_engine;
pub mod simulation;
pub mod traffic_generator;

pub use analytics::DetectionStats;
pub use classifier::{build_classifier, Classifier, Verdict};
pub use history::BoundedHistory;
pub use ml_detector::ForestClassifier;
pub use monitoring::{Alert, AlertLevel, AlertPolicy};
pub use rule_engine::{Rule, RuleCondition, RuleEngine};
pub use simulation::{
    RecentData, SimulationController, SimulationError, SimulationParams, SimulationStatus,
};
pub use traffic_generator::{generate, GeneratorError};

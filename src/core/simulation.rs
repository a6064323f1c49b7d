//! Simulation controller for the DDoS simulation service.
//!
//! Owns the run lifecycle and the bounded histories. A run is a single tokio
//! task that synthesizes a sample, classifies it, records both and publishes
//! the pair, once per tick, until it is stopped or its duration elapses.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::core::analytics::DetectionStats;
use crate::core::classifier::Classifier;
use crate::core::history::BoundedHistory;
use crate::core::monitoring::{Alert, AlertPolicy};
use crate::core::traffic_generator::{self, GeneratorError};
use crate::models::{
    AttackType, DetectionResult, ModelInfo, SimulationConfig, TrafficSample, TrafficUpdate,
};

/// Errors that can occur while controlling a simulation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Simulation already running")]
    AlreadyRunning,
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error("Invalid duration: {0} (must be a finite, non-negative number of seconds)")]
    InvalidDuration(f64),
}

/// Parameters of one simulation run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SimulationParams {
    pub attack_type: Option<AttackType>,
    pub intensity: f64,
    /// Run length in seconds
    pub duration: f64,
}

impl SimulationParams {
    fn validate(&self) -> Result<Duration, SimulationError> {
        if !self.intensity.is_finite() || self.intensity < 0.0 {
            return Err(GeneratorError::InvalidIntensity(self.intensity).into());
        }
        if self.duration < 0.0 {
            return Err(SimulationError::InvalidDuration(self.duration));
        }
        Duration::try_from_secs_f64(self.duration)
            .map_err(|_| SimulationError::InvalidDuration(self.duration))
    }
}

/// Current run state
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SimulationStatus {
    pub active: bool,
    pub sample_count: usize,
    pub last_timestamp: Option<DateTime<Utc>>,
}

/// Most recent samples and verdicts, oldest first
#[derive(Debug, Clone, Serialize)]
pub struct RecentData {
    pub traffic_data: Vec<TrafficSample>,
    pub detection_results: Vec<DetectionResult>,
}

struct History {
    traffic: BoundedHistory<TrafficSample>,
    detections: BoundedHistory<DetectionResult>,
    alerts: BoundedHistory<Alert>,
}

impl History {
    fn new(config: &SimulationConfig) -> Self {
        Self {
            traffic: BoundedHistory::new(config.history_capacity),
            detections: BoundedHistory::new(config.history_capacity),
            alerts: BoundedHistory::new(config.alert_capacity),
        }
    }
}

/// State shared between the controller and its running task
struct Shared {
    classifier: Arc<dyn Classifier>,
    config: SimulationConfig,
    alert_policy: AlertPolicy,
    history: RwLock<History>,
    updates: broadcast::Sender<TrafficUpdate>,
}

struct RunHandle {
    active: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Single-producer simulation controller
pub struct SimulationController {
    shared: Arc<Shared>,
    run: Mutex<Option<RunHandle>>,
}

impl SimulationController {
    /// Create an idle controller
    pub fn new(classifier: Arc<dyn Classifier>, config: SimulationConfig) -> Self {
        let (updates, _) = broadcast::channel(config.push_channel_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                classifier,
                alert_policy: AlertPolicy::new(config.alert_confidence),
                history: RwLock::new(History::new(&config)),
                config,
                updates,
            }),
            run: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.shared.config
    }

    /// Start a run on the current tokio runtime.
    ///
    /// # Returns
    ///
    /// * `Ok(params)` echoing the accepted parameters
    /// * `Err(SimulationError::AlreadyRunning)` if a run is active
    /// * `Err(SimulationError::Generator | InvalidDuration)` for invalid parameters
    pub fn start(&self, params: SimulationParams) -> Result<SimulationParams, SimulationError> {
        let duration = params.validate()?;

        let mut run = self.run.lock();
        if run.as_ref().map_or(false, |r| r.active.load(Ordering::SeqCst)) {
            return Err(SimulationError::AlreadyRunning);
        }
        // A stopped run may still be sleeping before it notices its flag
        if let Some(previous) = run.take() {
            previous.task.abort();
        }

        let active = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(run_loop(
            self.shared.clone(),
            params,
            duration,
            active.clone(),
        ));
        *run = Some(RunHandle { active, task });

        info!(
            "Simulation started (attack_type: {}, intensity: {}, duration: {}s)",
            params.attack_type.map_or("none", |a| a.as_str()),
            params.intensity,
            params.duration
        );
        Ok(params)
    }

    /// Ask the running loop to exit at its next check. Returns whether a run was active.
    pub fn stop(&self) -> bool {
        let run = self.run.lock();
        let was_active = run
            .as_ref()
            .map_or(false, |r| r.active.swap(false, Ordering::SeqCst));
        if was_active {
            info!("Simulation stop requested");
        }
        was_active
    }

    /// Stop the current run and wait for its task to finish
    pub async fn shutdown(&self) {
        let handle = {
            let mut run = self.run.lock();
            run.take()
        };
        if let Some(handle) = handle {
            handle.active.store(false, Ordering::SeqCst);
            if let Err(e) = handle.task.await {
                if e.is_panic() {
                    error!("Simulation task panicked: {}", e);
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.run
            .lock()
            .as_ref()
            .map_or(false, |r| r.active.load(Ordering::SeqCst))
    }

    /// Empty all histories; a running loop keeps appending afterwards.
    pub fn clear(&self) {
        let mut history = self.shared.history.write();
        history.traffic.clear();
        history.detections.clear();
        history.alerts.clear();
        info!("Simulation data cleared");
    }

    pub fn status(&self) -> SimulationStatus {
        let active = self.is_active();
        let history = self.shared.history.read();
        SimulationStatus {
            active,
            sample_count: history.traffic.len(),
            last_timestamp: history.traffic.last().map(|s| s.timestamp),
        }
    }

    pub fn recent(&self) -> RecentData {
        let window = self.shared.config.recent_window;
        let history = self.shared.history.read();
        RecentData {
            traffic_data: history.traffic.recent(window).cloned().collect(),
            detection_results: history.detections.recent(window).cloned().collect(),
        }
    }

    /// Retained alerts, newest last
    pub fn alerts(&self) -> Vec<Alert> {
        self.shared.history.read().alerts.iter().cloned().collect()
    }

    pub fn stats(&self) -> DetectionStats {
        let history = self.shared.history.read();
        DetectionStats::from_pairs(history.traffic.iter().zip(history.detections.iter()))
    }

    pub fn model_info(&self) -> ModelInfo {
        self.shared.classifier.model_info()
    }

    /// Receive every update published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<TrafficUpdate> {
        self.shared.updates.subscribe()
    }
}

async fn run_loop(
    shared: Arc<Shared>,
    params: SimulationParams,
    duration: Duration,
    active: Arc<AtomicBool>,
) {
    let started = Instant::now();
    let interval = Duration::from_millis(shared.config.tick_interval_ms);
    let mut ticks = 0u64;

    while active.load(Ordering::SeqCst) && started.elapsed() < duration {
        if let Err(e) = shared.tick(&params) {
            error!("Simulation tick failed: {}", e);
            break;
        }
        ticks += 1;
        tokio::time::sleep(interval).await;
    }

    active.store(false, Ordering::SeqCst);
    info!("Simulation finished after {} ticks", ticks);
}

impl Shared {
    fn tick(&self, params: &SimulationParams) -> Result<(), GeneratorError> {
        let sample = traffic_generator::generate(
            params.attack_type,
            params.intensity,
            self.config.max_packets,
        )?;
        let detection = self
            .classifier
            .classify(&sample.features)
            .into_result(sample.timestamp);
        debug!(
            "Tick verdict: is_attack={} confidence={:.3} (label is_attack={})",
            detection.is_attack, detection.confidence, sample.is_attack
        );

        let alert = self.alert_policy.evaluate(&sample, &detection);
        {
            let mut history = self.history.write();
            history.traffic.push(sample.clone());
            history.detections.push(detection.clone());
            if let Some(alert) = alert {
                history.alerts.push(alert);
            }
        }

        let update = TrafficUpdate {
            traffic: sample,
            detection,
        };
        if self.updates.send(update).is_err() {
            debug!("No push subscribers for traffic update");
        }
        Ok(())
    }
}

//! API endpoints for the DDoS simulation service.
//!
//! This module provides HTTP endpoints for controlling the simulation and
//! reading its traffic, verdicts, alerts and classifier metadata.

use std::convert::Infallible;
use std::sync::Arc;

use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpResponse, Responder, ResponseError};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;

use crate::core::{SimulationController, SimulationError, SimulationParams};
use crate::models::{AttackType, TrafficUpdate};

/// Event name used on the push channel
pub const UPDATE_EVENT: &str = "traffic_update";

pub struct ApiState {
    pub controller: Arc<SimulationController>,
}

/// API configuration function for Actix-web
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/health").route(web::get().to(health_check))),
    )
    .service(
        web::scope("/api/ddos")
            .route("/status", web::get().to(get_status))
            .route("/start", web::post().to(start_simulation))
            .route("/stop", web::post().to(stop_simulation))
            .route("/data", web::get().to(get_data))
            .route("/clear", web::post().to(clear_data))
            .route("/model-info", web::get().to(get_model_info))
            .route("/alerts", web::get().to(get_alerts))
            .route("/stats", web::get().to(get_stats))
            .route("/events", web::get().to(stream_events)),
    );
}

/// Errors returned to API clients
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

/// Error response body
#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

/// Health check endpoint response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Simulation start request
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StartRequest {
    pub attack_type: Option<String>,
    pub intensity: Option<f64>,
    pub duration: Option<f64>,
}

/// Simulation start response
#[derive(Serialize)]
struct StartResponse {
    message: String,
    attack_type: Option<AttackType>,
    intensity: f64,
    duration: f64,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn get_status(state: web::Data<ApiState>) -> impl Responder {
    HttpResponse::Ok().json(state.controller.status())
}

/// Parse a start request; an empty or `null` body means all defaults.
fn parse_start_request(body: &[u8]) -> Result<StartRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StartRequest::default());
    }
    serde_json::from_slice::<Option<StartRequest>>(body)
        .map(Option::unwrap_or_default)
        .map_err(|e| ApiError::InvalidBody(e.to_string()))
}

/// Simulation start endpoint
pub async fn start_simulation(
    state: web::Data<ApiState>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let request = parse_start_request(&body)?;
    let defaults = state.controller.config();

    let attack_type = AttackType::parse_selector(request.attack_type.as_deref())
        .map_err(SimulationError::from)?;
    let params = SimulationParams {
        attack_type,
        intensity: request.intensity.unwrap_or(defaults.default_intensity),
        duration: request.duration.unwrap_or(defaults.default_duration_secs),
    };

    let accepted = state.controller.start(params).map_err(|e| {
        warn!("Rejected simulation start: {}", e);
        e
    })?;

    Ok(HttpResponse::Ok().json(StartResponse {
        message: "Simulation started".to_string(),
        attack_type: accepted.attack_type,
        intensity: accepted.intensity,
        duration: accepted.duration,
    }))
}

async fn stop_simulation(state: web::Data<ApiState>) -> impl Responder {
    state.controller.stop();
    HttpResponse::Ok().json(MessageResponse::new("Simulation stopped"))
}

async fn get_data(state: web::Data<ApiState>) -> impl Responder {
    HttpResponse::Ok().json(state.controller.recent())
}

async fn clear_data(state: web::Data<ApiState>) -> impl Responder {
    state.controller.clear();
    HttpResponse::Ok().json(MessageResponse::new("Data cleared"))
}

async fn get_model_info(state: web::Data<ApiState>) -> impl Responder {
    HttpResponse::Ok().json(state.controller.model_info())
}

async fn get_alerts(state: web::Data<ApiState>) -> impl Responder {
    HttpResponse::Ok().json(state.controller.alerts())
}

async fn get_stats(state: web::Data<ApiState>) -> impl Responder {
    HttpResponse::Ok().json(state.controller.stats())
}

/// Encode one update as a Server-Sent Events frame
pub fn sse_frame(update: &TrafficUpdate) -> Result<web::Bytes, serde_json::Error> {
    let data = serde_json::to_string(update)?;
    Ok(web::Bytes::from(format!("event: {}\ndata: {}\n\n", UPDATE_EVENT, data)))
}

/// Push channel: one SSE frame per tick for as long as the client stays connected
async fn stream_events(state: web::Data<ApiState>) -> HttpResponse {
    let receiver = state.controller.subscribe();
    let stream = futures::stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(update) => match sse_frame(&update) {
                    Ok(frame) => return Some((Ok::<_, Infallible>(frame), receiver)),
                    Err(e) => warn!("Failed to encode traffic update: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Push subscriber lagged, skipped {} updates", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RuleEngine;
    use crate::models::SimulationConfig;
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn state(config: SimulationConfig) -> web::Data<ApiState> {
        let controller = SimulationController::new(Arc::new(RuleEngine::default()), config);
        web::Data::new(ApiState {
            controller: Arc::new(controller),
        })
    }

    fn fast_config() -> SimulationConfig {
        SimulationConfig {
            tick_interval_ms: 50,
            ..SimulationConfig::default()
        }
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(App::new().app_data($state.clone()).configure(super::config)).await
        };
    }

    #[actix_web::test]
    async fn test_health_check() {
        let state = state(fast_config());
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_initial_status() {
        let state = state(fast_config());
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/ddos/status").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body, json!({"active": false, "sample_count": 0, "last_timestamp": null}));
    }

    #[actix_web::test]
    async fn test_start_twice_is_rejected() {
        let state = state(fast_config());
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/ddos/start")
            .set_json(json!({"attack_type": "udp_flood", "intensity": 2.0, "duration": 30}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            json!({
                "message": "Simulation started",
                "attack_type": "udp_flood",
                "intensity": 2.0,
                "duration": 30.0
            })
        );

        let req = test::TestRequest::post()
            .uri("/api/ddos/start")
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Simulation already running");

        state.controller.shutdown().await;
    }

    #[actix_web::test]
    async fn test_empty_body_uses_defaults() {
        let state = state(fast_config());
        let app = app!(state);

        let req = test::TestRequest::post().uri("/api/ddos/start").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["attack_type"], Value::Null);
        assert_eq!(body["intensity"], 1.0);
        assert_eq!(body["duration"], 60.0);
        state.controller.shutdown().await;
    }

    #[actix_web::test]
    async fn test_invalid_requests_do_not_change_state() {
        let state = state(fast_config());
        let app = app!(state);

        let bodies = [
            json!({"attack_type": "smurf"}),
            json!({"attack_type": "syn_flood", "intensity": -2.0}),
            json!({"duration": -5}),
            json!({"intensity": "high"}),
        ];
        for body in bodies {
            let req = test::TestRequest::post()
                .uri("/api/ddos/start")
                .set_json(&body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {}", body);
            let err: Value = test::read_body_json(resp).await;
            assert!(err["error"].is_string());
        }

        let req = test::TestRequest::post()
            .uri("/api/ddos/start")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        assert!(!state.controller.is_active());
        assert_eq!(state.controller.status().sample_count, 0);
    }

    #[actix_web::test]
    async fn test_unknown_attack_type_message() {
        let state = state(fast_config());
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/ddos/start")
            .set_json(json!({"attack_type": "smurf"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let err: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(err.error, "Unknown attack type: smurf");
    }

    #[actix_web::test]
    async fn test_syn_flood_run_completes() {
        let state = state(fast_config());
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/ddos/start")
            .set_json(json!({"attack_type": "syn_flood", "intensity": 1.0, "duration": 0.1}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        tokio::time::sleep(Duration::from_millis(300)).await;

        let req = test::TestRequest::get().uri("/api/ddos/status").to_request();
        let status: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(status["active"], false);
        let count = status["sample_count"].as_u64().unwrap();
        assert!((1..=3).contains(&count));
        assert!(status["last_timestamp"].is_string());

        let req = test::TestRequest::get().uri("/api/ddos/data").to_request();
        let data: Value = test::call_and_read_body_json(&app, req).await;
        let traffic = data["traffic_data"].as_array().unwrap();
        assert_eq!(traffic.len() as u64, count);
        for sample in traffic {
            assert_eq!(sample["attack_type"], "syn_flood");
            assert_eq!(sample["is_attack"], true);
        }
        assert_eq!(data["detection_results"].as_array().unwrap().len() as u64, count);
    }

    #[actix_web::test]
    async fn test_benign_run_data() {
        let state = state(fast_config());
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/ddos/start")
            .set_json(json!({}))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        tokio::time::sleep(Duration::from_millis(20)).await;

        let req = test::TestRequest::get().uri("/api/ddos/data").to_request();
        let data: Value = test::call_and_read_body_json(&app, req).await;
        let traffic = data["traffic_data"].as_array().unwrap();
        assert!(!traffic.is_empty());
        for sample in traffic {
            assert_eq!(sample["is_attack"], false);
            let rate = sample["packet_rate"].as_u64().unwrap();
            assert!((80..=120).contains(&rate));
            assert!(sample["packets"].as_array().unwrap().len() <= 50);
        }
        for detection in data["detection_results"].as_array().unwrap() {
            assert_eq!(detection["is_attack"], false);
        }

        let req = test::TestRequest::post().uri("/api/ddos/stop").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Simulation stopped");
        assert!(!state.controller.is_active());
        state.controller.shutdown().await;
    }

    #[actix_web::test]
    async fn test_clear_then_data_is_empty() {
        let state = state(fast_config());
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/ddos/start")
            .set_json(json!({"attack_type": "http_flood", "duration": 0.05}))
            .to_request();
        test::call_service(&app, req).await;
        state.controller.shutdown().await;

        let req = test::TestRequest::post().uri("/api/ddos/clear").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Data cleared");

        let req = test::TestRequest::get().uri("/api/ddos/data").to_request();
        let data: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(data, json!({"traffic_data": [], "detection_results": []}));
    }

    #[actix_web::test]
    async fn test_stop_is_idempotent() {
        let state = state(fast_config());
        let app = app!(state);

        for _ in 0..2 {
            let req = test::TestRequest::post().uri("/api/ddos/stop").to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
        }
    }

    #[actix_web::test]
    async fn test_model_info() {
        let state = state(fast_config());
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/ddos/model-info").to_request();
        let info: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(info["model_type"], "Rule-based Classifier");
        assert_eq!(info["n_estimators"], 1);
        assert_eq!(
            info["features"],
            json!([
                "packet_rate",
                "unique_ips",
                "avg_packet_size",
                "protocol_diversity",
                "connection_rate"
            ])
        );
        assert_eq!(info["feature_importance"].as_array().unwrap().len(), 5);
    }

    #[actix_web::test]
    async fn test_alerts_and_stats() {
        let state = state(fast_config());
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/ddos/start")
            .set_json(json!({"attack_type": "syn_flood", "duration": 0.01}))
            .to_request();
        test::call_service(&app, req).await;
        // One tick, then the loop finds its duration elapsed
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!state.controller.is_active());

        let req = test::TestRequest::get().uri("/api/ddos/alerts").to_request();
        let alerts: Value = test::call_and_read_body_json(&app, req).await;
        let alerts = alerts.as_array().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["level"], "critical");
        assert_eq!(alerts[0]["attack_type"], "syn_flood");

        let req = test::TestRequest::get().uri("/api/ddos/stats").to_request();
        let stats: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats["samples"], 1);
        assert_eq!(stats["true_positives"], 1);
        assert_eq!(stats["accuracy"], 1.0);
    }

    #[actix_web::test]
    async fn test_events_stream_headers() {
        let state = state(fast_config());
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/ddos/events").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
    }

    #[actix_web::test]
    async fn test_sse_frame() {
        let traffic =
            crate::core::traffic_generator::generate(Some(AttackType::SynFlood), 1.0, 2).unwrap();
        let detection =
            crate::core::classifier::Verdict::from_probability(1.0).into_result(traffic.timestamp);
        let frame = sse_frame(&TrafficUpdate { traffic, detection }).unwrap();
        let text = std::str::from_utf8(&frame).unwrap();

        assert!(text.starts_with("event: traffic_update\ndata: {"));
        assert!(text.ends_with("}\n\n"));
        let data = text.lines().nth(1).unwrap().trim_start_matches("data: ");
        let payload: Value = serde_json::from_str(data).unwrap();
        assert_eq!(payload["traffic"]["attack_type"], "syn_flood");
        assert_eq!(payload["detection"]["is_attack"], true);
    }

    #[actix_web::test]
    async fn test_parse_start_request() {
        assert!(parse_start_request(b"").unwrap().attack_type.is_none());
        assert!(parse_start_request(b"null").unwrap().intensity.is_none());
        let request = parse_start_request(br#"{"attack_type": null, "duration": 5}"#).unwrap();
        assert_eq!(request.duration, Some(5.0));
        assert!(matches!(parse_start_request(b"[1]"), Err(ApiError::InvalidBody(_))));
    }
}

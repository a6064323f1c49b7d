//! DDoS Simulation Service
//!
//! This is the main entry point for the DDoS simulation service.
//! It initializes the application components and starts the web server.

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use log::info;

use ddos_simulation_service::api::{self, ApiState};
use ddos_simulation_service::config;
use ddos_simulation_service::core::{build_classifier, SimulationController};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    info!("Starting DDoS Simulation Service...");

    // Load configuration
    let config = config::load_config().context("Failed to load configuration")?;

    // Train or build the configured classifier before accepting requests
    let classifier = build_classifier(&config.detection);
    let controller = Arc::new(SimulationController::new(classifier, config.simulation.clone()));

    // Create API state
    let state = web::Data::new(ApiState {
        controller: controller.clone(),
    });

    info!("Listening on {}:{}", config.server.host, config.server.port);

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(api::config)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    controller.shutdown().await;
    info!("DDoS Simulation Service stopped");
    Ok(())
}

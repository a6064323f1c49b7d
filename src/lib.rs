//! DDoS Simulation Service
//!
//! Synthesizes network traffic samples, classifies them with a pluggable
//! detector and serves the rolling results over HTTP.

pub mod api;
pub mod config;
pub mod core;
pub mod models;

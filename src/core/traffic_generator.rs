//! Synthetic traffic generation for the DDoS simulation service.
//!
//! Produces one aggregate traffic sample per call, either benign or shaped
//! after one of the known flood profiles, together with a capped list of
//! per-packet records for the dashboard.

use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::models::{AttackType, FeatureVector, PacketRecord, Protocol, TrafficSample};

/// Destination address shared by every synthetic packet
pub const TARGET_IP: &str = "10.0.0.1";

/// Smallest packet size a record may carry
pub const MIN_PACKET_SIZE: u32 = 32;

/// Jitter applied around the average packet size
const PACKET_SIZE_JITTER: u32 = 100;

/// Errors that can occur while generating traffic
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneratorError {
    #[error("Unknown attack type: {0}")]
    UnknownAttackType(String),
    #[error("Invalid intensity: {0} (must be a finite, non-negative number)")]
    InvalidIntensity(f64),
}

/// Feature ranges for one traffic profile.
///
/// Integer ranges are inclusive. `packet_rate` and `connection_rate` scale with
/// intensity for attack profiles; everything else is fixed per profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficProfile {
    pub packet_rate: (u32, u32),
    pub unique_ips: (u32, u32),
    pub avg_packet_size: (u32, u32),
    pub protocol_diversity: (f64, f64),
    pub connection_rate: (u32, u32),
}

pub const BENIGN_PROFILE: TrafficProfile = TrafficProfile {
    packet_rate: (80, 120),
    unique_ips: (40, 60),
    avg_packet_size: (800, 1200),
    protocol_diversity: (0.7, 0.9),
    connection_rate: (15, 25),
};

impl TrafficProfile {
    /// Base (intensity 1.0) profile for an attack type
    pub fn for_attack(attack_type: AttackType) -> Self {
        match attack_type {
            AttackType::SynFlood => TrafficProfile {
                packet_rate: (800, 1200),
                unique_ips: (5, 15),
                avg_packet_size: (40, 80),
                protocol_diversity: (0.1, 0.3),
                connection_rate: (150, 250),
            },
            AttackType::UdpFlood => TrafficProfile {
                packet_rate: (600, 1000),
                unique_ips: (8, 20),
                avg_packet_size: (32, 64),
                protocol_diversity: (0.15, 0.25),
                connection_rate: (100, 200),
            },
            AttackType::HttpFlood => TrafficProfile {
                packet_rate: (400, 800),
                unique_ips: (10, 25),
                avg_packet_size: (200, 400),
                protocol_diversity: (0.2, 0.4),
                connection_rate: (80, 150),
            },
        }
    }

    /// Ranges in effect for a request, with rate ranges scaled by intensity
    pub fn resolve(attack_type: Option<AttackType>, intensity: f64) -> Self {
        match attack_type {
            None => BENIGN_PROFILE,
            Some(attack) => {
                let base = Self::for_attack(attack);
                Self {
                    packet_rate: scale_range(base.packet_rate, intensity),
                    connection_rate: scale_range(base.connection_rate, intensity),
                    ..base
                }
            }
        }
    }
}

// Truncates toward zero, matching integer conversion of the scaled bounds.
fn scale_range((low, high): (u32, u32), intensity: f64) -> (u32, u32) {
    ((low as f64 * intensity) as u32, (high as f64 * intensity) as u32)
}

/// Generate one traffic sample with the thread-local RNG.
pub fn generate(
    attack_type: Option<AttackType>,
    intensity: f64,
    max_packets: u32,
) -> Result<TrafficSample, GeneratorError> {
    generate_with_rng(&mut rand::thread_rng(), attack_type, intensity, max_packets)
}

/// Generate one traffic sample from the given random source.
pub fn generate_with_rng<R: Rng + ?Sized>(
    rng: &mut R,
    attack_type: Option<AttackType>,
    intensity: f64,
    max_packets: u32,
) -> Result<TrafficSample, GeneratorError> {
    if !intensity.is_finite() || intensity < 0.0 {
        return Err(GeneratorError::InvalidIntensity(intensity));
    }

    let profile = TrafficProfile::resolve(attack_type, intensity);
    let (div_low, div_high) = profile.protocol_diversity;
    let features = FeatureVector {
        packet_rate: rng.gen_range(profile.packet_rate.0..=profile.packet_rate.1),
        unique_ips: rng.gen_range(profile.unique_ips.0..=profile.unique_ips.1),
        avg_packet_size: rng.gen_range(profile.avg_packet_size.0..=profile.avg_packet_size.1),
        protocol_diversity: rng.gen_range(div_low..=div_high),
        connection_rate: rng.gen_range(profile.connection_rate.0..=profile.connection_rate.1),
    };
    let is_attack = attack_type.is_some();
    let timestamp = Utc::now();

    let packet_count = features.packet_rate.min(max_packets);
    let size_low = features
        .avg_packet_size
        .saturating_sub(PACKET_SIZE_JITTER)
        .max(MIN_PACKET_SIZE);
    let size_high = (features.avg_packet_size + PACKET_SIZE_JITTER).max(size_low);

    let packets = (0..packet_count)
        .map(|i| {
            // Spread evenly over one simulated second of traffic
            let offset_us = i as i64 * 1_000_000 / features.packet_rate as i64;
            PacketRecord {
                timestamp: timestamp + Duration::microseconds(offset_us),
                source_ip: format!("192.168.{}.{}", rng.gen_range(1..=255), rng.gen_range(1..=255)),
                destination_ip: TARGET_IP.to_string(),
                protocol: *Protocol::ALL.choose(&mut *rng).unwrap_or(&Protocol::Tcp),
                packet_size: rng.gen_range(size_low..=size_high),
                is_malicious: is_attack,
            }
        })
        .collect();

    Ok(TrafficSample {
        timestamp,
        features,
        packets,
        is_attack,
        attack_type,
    })
}

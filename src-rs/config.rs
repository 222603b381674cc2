use std::{env, time::Duration};

use crate::sweep::{DEFAULT_IDLE_CUTOFF, DEFAULT_SWEEP_INTERVAL};

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub trust_proxy: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_burst: u32,
    pub sweep_interval: Duration,
    pub idle_cutoff: Duration,
}

impl Config {
    /// Reads configuration from the environment. Absent, unparsable, or
    /// non-positive values fall back to the defaults.
    pub fn from_env() -> Self {
        Self {
            port: parse_u16(env::var("APP_PORT").ok(), 8080),
            trust_proxy: parse_trust_proxy(env::var("TRUST_PROXY").ok()),
            rate_limit_requests: parse_u32(env::var("RATE_LIMIT_REQUESTS").ok(), 100),
            rate_limit_burst: parse_u32(env::var("RATE_LIMIT_BURST").ok(), 10),
            sweep_interval: parse_seconds(
                env::var("RATE_LIMIT_SWEEP_SECONDS").ok(),
                DEFAULT_SWEEP_INTERVAL,
            ),
            idle_cutoff: parse_seconds(
                env::var("RATE_LIMIT_IDLE_CUTOFF_SECONDS").ok(),
                DEFAULT_IDLE_CUTOFF,
            ),
        }
    }
}

fn parse_trust_proxy(value: Option<String>) -> bool {
    match value {
        Some(value) => {
            let normalized = value.trim().to_lowercase();
            !matches!(normalized.as_str(), "false" | "0" | "off" | "no")
        }
        None => true,
    }
}

fn parse_u16(value: Option<String>, fallback: u16) -> u16 {
    value
        .and_then(|v| v.parse::<u16>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(fallback)
}

fn parse_u32(value: Option<String>, fallback: u32) -> u32 {
    value
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(fallback)
}

fn parse_seconds(value: Option<String>, fallback: Duration) -> Duration {
    value
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

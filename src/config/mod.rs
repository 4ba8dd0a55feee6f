//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Default listen address when neither PORT nor SERVER_ADDR is set
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";
/// Default broadcast period (20 snapshots per second)
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;
/// Default displacement applied per input message
pub const DEFAULT_STEP_SPEED: f64 = 5.0;
/// Default spawn rectangle, matching the reference play area
pub const DEFAULT_SPAWN_WIDTH: f64 = 800.0;
pub const DEFAULT_SPAWN_HEIGHT: f64 = 600.0;
/// Default per-connection outbound queue capacity
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

/// Rectangle new players are spawned in, anchored at the origin
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnArea {
    pub width: f64,
    pub height: f64,
}

impl Default for SpawnArea {
    fn default() -> Self {
        Self {
            width: DEFAULT_SPAWN_WIDTH,
            height: DEFAULT_SPAWN_HEIGHT,
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Period of the snapshot broadcast loop
    pub tick_interval: Duration,
    /// Displacement per accepted input message
    pub step_speed: f64,
    /// Bounds for randomized spawn coordinates
    pub spawn_area: SpawnArea,
    /// Capacity of each connection's outbound queue
    pub outbound_queue: usize,
    /// Optional seed for reproducible spawn positions
    pub spawn_seed: Option<u64>,

    /// Allowed client origins for CORS (None = any)
    pub client_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3000))),
            log_level: "info".to_string(),
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            step_speed: DEFAULT_STEP_SPEED,
            spawn_area: SpawnArea::default(),
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            spawn_seed: None,
            client_origin: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
        };

        let tick_ms: u64 = parse_or(&lookup, "TICK_INTERVAL_MS", DEFAULT_TICK_INTERVAL_MS)?;
        if tick_ms == 0 {
            return Err(ConfigError::Invalid("TICK_INTERVAL_MS"));
        }

        let step_speed: f64 = parse_or(&lookup, "STEP_SPEED", DEFAULT_STEP_SPEED)?;
        if !step_speed.is_finite() {
            return Err(ConfigError::Invalid("STEP_SPEED"));
        }

        let width: f64 = parse_or(&lookup, "SPAWN_WIDTH", DEFAULT_SPAWN_WIDTH)?;
        if !(width.is_finite() && width > 0.0) {
            return Err(ConfigError::Invalid("SPAWN_WIDTH"));
        }
        let height: f64 = parse_or(&lookup, "SPAWN_HEIGHT", DEFAULT_SPAWN_HEIGHT)?;
        if !(height.is_finite() && height > 0.0) {
            return Err(ConfigError::Invalid("SPAWN_HEIGHT"));
        }

        let outbound_queue: usize = parse_or(&lookup, "OUTBOUND_QUEUE", DEFAULT_OUTBOUND_QUEUE)?;
        if outbound_queue == 0 {
            return Err(ConfigError::Invalid("OUTBOUND_QUEUE"));
        }

        let spawn_seed = match lookup("SPAWN_SEED") {
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("SPAWN_SEED"))?,
            ),
            None => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            tick_interval: Duration::from_millis(tick_ms),
            step_speed,
            spawn_area: SpawnArea { width, height },
            outbound_queue,
            spawn_seed,

            client_origin: lookup("CLIENT_ORIGIN").filter(|s| !s.trim().is_empty()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

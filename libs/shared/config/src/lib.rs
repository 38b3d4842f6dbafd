use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_DATA_FILE: &str = "data.json";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_file: PathBuf,
    pub watcher_poll_interval: Duration,
    pub bind_addr: SocketAddr,
    /// `id:secret` pairs separated by commas.
    pub provider_credentials: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            watcher_poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            bind_addr: default_bind_addr(),
            provider_credentials: String::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            data_file: env::var("APPOINTMENTS_DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    warn!("APPOINTMENTS_DATA_FILE not set, using {}", DEFAULT_DATA_FILE);
                    PathBuf::from(DEFAULT_DATA_FILE)
                }),
            watcher_poll_interval: env::var("WATCHER_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|raw| match raw.parse::<u64>() {
                    Ok(0) | Err(_) => {
                        warn!(
                            "WATCHER_POLL_INTERVAL_SECS={} is not a positive integer, ignoring",
                            raw
                        );
                        None
                    }
                    Ok(secs) => Some(Duration::from_secs(secs)),
                })
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS)),
            bind_addr: env::var("API_BIND_ADDR")
                .ok()
                .and_then(|raw| match raw.parse::<SocketAddr>() {
                    Ok(addr) => Some(addr),
                    Err(e) => {
                        warn!("API_BIND_ADDR={} is invalid ({}), using default", raw, e);
                        None
                    }
                })
                .unwrap_or_else(default_bind_addr),
            provider_credentials: env::var("PROVIDER_CREDENTIALS")
                .unwrap_or_else(|_| {
                    warn!("PROVIDER_CREDENTIALS not set, provider login is disabled");
                    String::new()
                }),
        };

        if !config.is_login_configured() {
            warn!("No provider credentials configured - dashboards cannot log in");
        }

        config
    }

    /// Config pointing at a specific data file, everything else default.
    pub fn with_data_file(data_file: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            ..Self::default()
        }
    }

    pub fn is_login_configured(&self) -> bool {
        !self.provider_credentials.trim().is_empty()
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.data_file, PathBuf::from("data.json"));
        assert_eq!(config.watcher_poll_interval, Duration::from_secs(5));
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR.parse::<SocketAddr>().unwrap());
        assert!(!config.is_login_configured());
    }

    #[test]
    fn with_data_file_keeps_other_defaults() {
        let config = AppConfig::with_data_file("/tmp/bookings.json");
        assert_eq!(config.data_file, PathBuf::from("/tmp/bookings.json"));
        assert_eq!(config.watcher_poll_interval, Duration::from_secs(5));
    }
}

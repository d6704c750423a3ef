//! Application-level configuration loading, including the clock cadence.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::clock::{gate::DEFAULT_PERSIST_EVERY_TICKS, polling::PollingPolicy};

/// Default location on disk where binaries look for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BLIND_CLOCK_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    tick_period: Duration,
    persist_every_ticks: u32,
    polling: PollingPolicy,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        tick_millis = app_config.tick_period.as_millis() as u64,
                        persist_every_ticks = app_config.persist_every_ticks,
                        "loaded clock settings from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Countdown step of a clock session.
    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Steady ticks between two creator writes.
    pub fn persist_every_ticks(&self) -> u32 {
        self.persist_every_ticks
    }

    /// Fetch cadence per tournament status.
    pub fn polling_policy(&self) -> PollingPolicy {
        self.polling
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(1),
            persist_every_ticks: DEFAULT_PERSIST_EVERY_TICKS,
            polling: PollingPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    tick_millis: u64,
    persist_every_ticks: u32,
    poll_in_progress_secs: u64,
    poll_paused_secs: u64,
    poll_registering_secs: u64,
    poll_finished_secs: u64,
}

impl Default for RawConfig {
    fn default() -> Self {
        let polling = PollingPolicy::default();
        Self {
            tick_millis: 1_000,
            persist_every_ticks: DEFAULT_PERSIST_EVERY_TICKS,
            poll_in_progress_secs: polling.in_progress.as_secs(),
            poll_paused_secs: polling.paused.as_secs(),
            poll_registering_secs: polling.registering.as_secs(),
            poll_finished_secs: polling.finished.as_secs(),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        // Zero would spin the session loop.
        Self {
            tick_period: Duration::from_millis(value.tick_millis.max(1)),
            persist_every_ticks: value.persist_every_ticks.max(1),
            polling: PollingPolicy {
                in_progress: Duration::from_secs(value.poll_in_progress_secs.max(1)),
                paused: Duration::from_secs(value.poll_paused_secs.max(1)),
                registering: Duration::from_secs(value.poll_registering_secs.max(1)),
                finished: Duration::from_secs(value.poll_finished_secs.max(1)),
            },
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{ "poll_paused_secs": 45 }"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.polling_policy().paused, Duration::from_secs(45));
        assert_eq!(config.polling_policy().in_progress, Duration::from_secs(2));
        assert_eq!(config.tick_period(), Duration::from_secs(1));
        assert_eq!(config.persist_every_ticks(), 10);
    }

    #[test]
    fn zero_values_are_raised_to_the_minimum() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "tick_millis": 0, "persist_every_ticks": 0 }"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.tick_period(), Duration::from_millis(1));
        assert_eq!(config.persist_every_ticks(), 1);
    }

    #[test]
    fn defaults_match_an_empty_file() {
        let raw: RawConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(AppConfig::from(raw), AppConfig::default());
    }
}

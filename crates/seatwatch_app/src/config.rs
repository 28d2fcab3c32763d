//! Runtime configuration read from the process environment.

use std::time::Duration;

use seatwatch_engine::{
    PushSettings, SessionSettings, DEFAULT_PROVIDER_BASE, DEFAULT_PUSH_URL, DEFAULT_USER_AGENT,
};
use thiserror::Error;

use crate::logging::LogDestination;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub poll_interval: Duration,
    pub log_destination: LogDestination,
    pub provider_base: String,
    pub region_code: String,
    pub user_agent: String,
    pub push_url: String,
    pub push_access_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from `lookup`; unset or empty variables use defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let port = match get("PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                expected: "a port number",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let poll_interval = match get("POLL_INTERVAL_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "POLL_INTERVAL_SECS",
                        expected: "a positive number of seconds",
                        value,
                    })
                }
            },
            None => DEFAULT_POLL_INTERVAL,
        };

        let log_destination = match get("SEATWATCH_LOG") {
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "terminal" => LogDestination::Terminal,
                "file" => LogDestination::File,
                "both" => LogDestination::Both,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "SEATWATCH_LOG",
                        expected: "one of terminal, file, both",
                        value,
                    })
                }
            },
            None => LogDestination::Terminal,
        };

        Ok(Self {
            port,
            poll_interval,
            log_destination,
            provider_base: get("PROVIDER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PROVIDER_BASE.to_string()),
            region_code: get("PROVIDER_REGION").unwrap_or_else(|| "BANG".to_string()),
            user_agent: get("SESSION_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            push_url: get("EXPO_PUSH_URL").unwrap_or_else(|| DEFAULT_PUSH_URL.to_string()),
            push_access_token: get("EXPO_ACCESS_TOKEN"),
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            base_url: self.provider_base.clone(),
            region_code: self.region_code.clone(),
            user_agent: self.user_agent.clone(),
            ..SessionSettings::default()
        }
    }

    pub fn push_settings(&self) -> PushSettings {
        PushSettings {
            endpoint: self.push_url.clone(),
            access_token: self.push_access_token.clone(),
            ..PushSettings::default()
        }
    }
}

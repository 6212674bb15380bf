//! Runtime configuration read from the process environment.
//!
//! `main` loads an optional `.env` file first; parsing itself goes through a
//! lookup closure so it can be exercised without touching global state.

use crate::infrastructure::security::{
    DEFAULT_M_COST, DEFAULT_P_COST, DEFAULT_T_COST, HashingParams,
};
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Minimum length accepted by `Key::derive_from`.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("SESSION_SECRET must be at least 32 bytes, got {0}")]
    SessionSecretTooShort(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// `None` means an ephemeral key is generated at startup.
    pub secret: Option<Vec<u8>>,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            secret: None,
            cookie_name: "restaurant_session".to_string(),
            cookie_secure: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub session: SessionSettings,
    pub hashing: HashingParams,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_format: LogFormat::default(),
            session: SessionSettings::default(),
            hashing: HashingParams::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let secret = match lookup("SESSION_SECRET") {
            Some(raw) if !raw.is_empty() => {
                if raw.len() < MIN_SESSION_SECRET_LEN {
                    return Err(ConfigError::SessionSecretTooShort(raw.len()));
                }
                Some(raw.into_bytes())
            }
            _ => None,
        };

        Ok(Self {
            host: lookup("APP_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "APP_PORT", defaults.port)?,
            log_format: parse_or(&lookup, "LOG_FORMAT", defaults.log_format)?,
            session: SessionSettings {
                secret,
                cookie_name: lookup("SESSION_COOKIE_NAME")
                    .unwrap_or(defaults.session.cookie_name),
                cookie_secure: parse_flag(&lookup, "SESSION_COOKIE_SECURE", false)?,
            },
            hashing: HashingParams {
                m_cost: parse_or(&lookup, "ARGON2_M_COST", DEFAULT_M_COST)?,
                t_cost: parse_or(&lookup, "ARGON2_T_COST", DEFAULT_T_COST)?,
                p_cost: parse_or(&lookup, "ARGON2_P_COST", DEFAULT_P_COST)?,
            },
        })
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

fn parse_flag<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(default),
        Some("1" | "true" | "yes") => Ok(true),
        Some("0" | "false" | "no") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue {
            key,
            value: other.to_string(),
        }),
    }
}

//! Configuration module for the Trellis runtime.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `TRELLIS_TOAST_DURATION_MS` | No | 3000 | Auto-dismiss delay for toasts |
//! | `TRELLIS_TOAST_ERROR_DURATION_MS` | No | 5000 | Auto-dismiss delay for error toasts |
//! | `TRELLIS_SIDEBAR_BREAKPOINT` | No | 768 | Default sidebar breakpoint in pixels |
//! | `TRELLIS_VIEWPORT_WIDTH` | No | 1024 | Initial viewport width in pixels |
//! | `TRELLIS_LOCATION` | No | `/` | Initial location path |
//!
//! # Example
//!
//! ```no_run
//! use trellis_runtime::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Toasts close after {:?}", config.toast_duration);
//! ```

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Default auto-dismiss delay for non-error toasts.
pub const DEFAULT_TOAST_DURATION_MS: u64 = 3000;

/// Default auto-dismiss delay for error toasts.
pub const DEFAULT_TOAST_ERROR_DURATION_MS: u64 = 5000;

/// Default sidebar breakpoint in pixels.
pub const DEFAULT_SIDEBAR_BREAKPOINT: u32 = 768;

/// Default viewport width in pixels.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1024;

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Configuration for the Trellis runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Auto-dismiss delay for toasts without an explicit duration.
    pub toast_duration: Duration,

    /// Auto-dismiss delay for error toasts without an explicit duration.
    pub toast_error_duration: Duration,

    /// Breakpoint used by sidebars that do not declare `data-breakpoint`.
    pub sidebar_breakpoint: u32,

    /// Viewport width at startup.
    pub viewport_width: u32,

    /// Location path at startup.
    pub location: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            toast_duration: Duration::from_millis(DEFAULT_TOAST_DURATION_MS),
            toast_error_duration: Duration::from_millis(DEFAULT_TOAST_ERROR_DURATION_MS),
            sidebar_breakpoint: DEFAULT_SIDEBAR_BREAKPOINT,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            location: "/".to_string(),
        }
    }
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// Unset variables fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a variable is set but cannot be parsed, or
    /// if a toast duration is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let toast_duration = parse_duration_ms("TRELLIS_TOAST_DURATION_MS")?
            .unwrap_or(defaults.toast_duration);

        let toast_error_duration = parse_duration_ms("TRELLIS_TOAST_ERROR_DURATION_MS")?
            .unwrap_or(defaults.toast_error_duration);

        let sidebar_breakpoint =
            parse_u32("TRELLIS_SIDEBAR_BREAKPOINT")?.unwrap_or(defaults.sidebar_breakpoint);

        let viewport_width =
            parse_u32("TRELLIS_VIEWPORT_WIDTH")?.unwrap_or(defaults.viewport_width);

        let location = match env::var("TRELLIS_LOCATION") {
            Ok(val) if val.starts_with('/') => val,
            Ok(val) => {
                return Err(ConfigError::InvalidValue {
                    key: "TRELLIS_LOCATION".to_string(),
                    message: format!("expected an absolute path, got '{val}'"),
                })
            }
            Err(_) => defaults.location,
        };

        Ok(Self {
            toast_duration,
            toast_error_duration,
            sidebar_breakpoint,
            viewport_width,
            location,
        })
    }
}

fn parse_u32(key: &str) -> Result<Option<u32>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected non-negative integer, got '{val}'"),
            }),
        Err(_) => Ok(None),
    }
}

fn parse_duration_ms(key: &str) -> Result<Option<Duration>, ConfigError> {
    match env::var(key) {
        Ok(val) => {
            let ms = val
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("expected positive integer, got '{val}'"),
                })?;
            if ms == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "duration must be greater than 0".to_string(),
                });
            }
            Ok(Some(Duration::from_millis(ms)))
        }
        Err(_) => Ok(None),
    }
}

//! Configuration management for Pricelight
//!
//! The device runs from compiled-in constants (see `defaults`). A YAML file in
//! one of the well-known locations may override any subset of them.

use crate::error::{PricelightError, Result};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

pub use defaults::{DEFAULT_TAX, DEFAULT_TRANSPORT_FEE};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Network time synchronization
    pub clock: ClockConfig,

    /// Spot-price API and fetch cadence
    pub prices: PricesConfig,

    /// Relay/LED control loop
    pub control: ControlConfig,

    /// Display renderer selection and geometry
    pub display: DisplayConfig,

    /// Manual override HTTP surface
    pub web: WebConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level
    pub console_level: Option<String>,

    /// Optional file-specific level
    pub file_level: Option<String>,

    /// Path to log file (or directory)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// NTP synchronization and backoff
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// SNTP server as host:port
    pub ntp_server: String,

    /// Re-synchronize every N calls to `now()`
    pub resync_every: u64,

    /// Backoff after the first failure and after every success
    pub initial_backoff_ms: u64,

    /// Backoff ceiling
    pub max_backoff_ms: u64,

    /// Per-exchange SNTP timeout
    pub request_timeout_secs: u64,
}

/// Spot-price source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricesConfig {
    /// Scheme and host of the price API
    pub base_url: String,

    /// Currency code used in the `{CURRENCY}_per_kWh` field
    pub currency: String,

    /// Price area code used in the request path
    pub geography: String,

    /// IANA time zone that defines the local calendar day
    pub timezone: String,

    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,

    /// Lower bound of the randomized pause between fetch cycles
    pub min_cycle_secs: u64,

    /// Upper bound of the randomized pause between fetch cycles
    pub max_cycle_secs: u64,

    /// Number of upcoming hours published to renderers
    pub window_hours: usize,
}

/// Which output driver the control loop talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorKind {
    /// Log relay/LED transitions only
    Log,
    /// Write to sysfs GPIO/LED files
    Sysfs,
}

/// Brightness files of an RGB LED
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedPaths {
    pub red: String,
    pub green: String,
    pub blue: String,
}

/// Control loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Threshold price per kWh: at or below it the relay switches on
    pub max_price: Decimal,

    /// Poll period of the control loop
    pub poll_interval_ms: u64,

    /// Output driver
    pub actuator: ActuatorKind,

    /// Relay value file for the sysfs actuator
    pub relay_path: String,

    /// LED brightness files for the sysfs actuator
    pub led_paths: LedPaths,

    /// Full-scale LED brightness value
    pub led_max: u32,
}

/// Renderer variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayVariant {
    /// Hourly bars with tick marks
    Histogram,
    /// Vertical gauges including fees and tax
    Slider,
}

/// Histogram geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramLayout {
    pub bars: usize,
    pub bar_width: u32,
    pub bar_gap: u32,
    pub max_bar_height: u32,
    pub origin_x: i32,
    pub origin_y: i32,
    /// A tick and hour label every N bars
    pub label_every: usize,
}

/// Slider geometry and tariff constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SliderLayout {
    pub slots: usize,
    /// Grid fee per hour of day, same unit as `price * 100`
    pub transport_fee: Vec<Decimal>,
    /// Constant added to every slot
    pub tax: Decimal,
    /// Value that fills a gauge completely
    pub max_value: Decimal,
    pub spacing: i32,
    pub origin_x: i32,
    pub origin_y: i32,
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub variant: DisplayVariant,
    pub histogram: HistogramLayout,
    pub slider: SliderLayout,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Whether the manual override API is served
    pub enabled: bool,

    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl PricesConfig {
    /// Parse the configured time zone
    pub fn tz(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| {
            PricelightError::validation("prices.timezone".to_string(), e.to_string())
        })
    }

    /// Name of the JSON field that carries the price in the configured currency
    pub fn price_field(&self) -> String {
        format!("{}_per_kWh", self.currency)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        let default_paths = [
            "pricelight.yaml",
            "/data/pricelight.yaml",
            "/etc/pricelight/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.prices.base_url.trim().is_empty() {
            return Err(PricelightError::validation(
                "prices.base_url",
                "Base URL cannot be empty",
            ));
        }
        if self.prices.currency.trim().is_empty() {
            return Err(PricelightError::validation(
                "prices.currency",
                "Currency cannot be empty",
            ));
        }
        if self.prices.geography.trim().is_empty() {
            return Err(PricelightError::validation(
                "prices.geography",
                "Geography cannot be empty",
            ));
        }
        self.prices.tz()?;

        if self.prices.min_cycle_secs > self.prices.max_cycle_secs {
            return Err(PricelightError::validation(
                "prices.min_cycle_secs",
                "Must not exceed max_cycle_secs",
            ));
        }
        if self.prices.window_hours == 0 {
            return Err(PricelightError::validation(
                "prices.window_hours",
                "Must be greater than 0",
            ));
        }

        if self.clock.initial_backoff_ms == 0
            || self.clock.initial_backoff_ms > self.clock.max_backoff_ms
        {
            return Err(PricelightError::validation(
                "clock.initial_backoff_ms",
                "Must be positive and not exceed max_backoff_ms",
            ));
        }
        if self.clock.resync_every == 0 {
            return Err(PricelightError::validation(
                "clock.resync_every",
                "Must be greater than 0",
            ));
        }

        if self.control.poll_interval_ms == 0 {
            return Err(PricelightError::validation(
                "control.poll_interval_ms",
                "Must be greater than 0",
            ));
        }
        if self.control.max_price.is_sign_negative() {
            return Err(PricelightError::validation(
                "control.max_price",
                "Must not be negative",
            ));
        }

        if self.display.histogram.bars == 0 || self.display.histogram.label_every == 0 {
            return Err(PricelightError::validation(
                "display.histogram",
                "bars and label_every must be greater than 0",
            ));
        }
        if self.display.slider.slots == 0 {
            return Err(PricelightError::validation(
                "display.slider.slots",
                "Must be greater than 0",
            ));
        }
        if self.display.slider.transport_fee.len() != 24 {
            return Err(PricelightError::validation(
                "display.slider.transport_fee",
                "Must hold exactly 24 hourly entries",
            ));
        }

        Ok(())
    }
}

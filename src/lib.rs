//! # Pricelight - electricity spot-price indicator
//!
//! Firmware-style service for a small device that switches a relay and
//! colors an RGB LED by the day-ahead electricity price, and draws the
//! upcoming hours on an attached display.
//!
//! ## Architecture
//!
//! Two long-running tasks hand data over through a single snapshot:
//!
//! - `clock`: network-corrected wall clock (SNTP) with exponential backoff
//! - `prices`: per-day price requests, today/tomorrow cache and the fetch loop
//! - `situation`: single-writer hub publishing immutable snapshots
//! - `classify`: fixed-threshold and window-relative price classification
//! - `render`: histogram and slider renderers behind a narrow canvas trait
//! - `control`: polling loop driving relay, LED and display
//! - `web`: HTTP status and manual override
//! - `config`: YAML configuration with compiled-in defaults
//! - `logging`: structured logging and tracing

pub mod classify;
pub mod clock;
pub mod config;
pub mod control;
pub mod error;
pub mod logging;
pub mod prices;
pub mod render;
pub mod situation;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::{PricelightError, Result};

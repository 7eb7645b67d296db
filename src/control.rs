//! Relay and LED control loop
//!
//! Polls the situation snapshot on a short fixed period and drives the
//! outputs when it changes. The loop never touches the network; it reads the
//! latest snapshot and writes to local actuators and the display.

use crate::classify::Classification;
use crate::config::{ActuatorKind, ControlConfig};
use crate::error::{PricelightError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::render::{Canvas, Renderer, Rgb};
use crate::situation::Situation;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, MissedTickBehavior, interval};

/// Physical outputs
pub trait Actuator: Send {
    fn set_relay(&mut self, on: bool) -> Result<()>;
    fn set_color(&mut self, color: Rgb) -> Result<()>;
}

impl Actuator for Box<dyn Actuator> {
    fn set_relay(&mut self, on: bool) -> Result<()> {
        (**self).set_relay(on)
    }

    fn set_color(&mut self, color: Rgb) -> Result<()> {
        (**self).set_color(color)
    }
}

/// Actuator that only logs transitions
#[derive(Debug)]
pub struct LogActuator {
    relay: Option<bool>,
    color: Option<Rgb>,
    logger: StructuredLogger,
}

impl Default for LogActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl LogActuator {
    pub fn new() -> Self {
        Self {
            relay: None,
            color: None,
            logger: get_logger("actuator"),
        }
    }

    pub fn relay(&self) -> Option<bool> {
        self.relay
    }

    pub fn color(&self) -> Option<Rgb> {
        self.color
    }
}

impl Actuator for LogActuator {
    fn set_relay(&mut self, on: bool) -> Result<()> {
        if self.relay != Some(on) {
            self.logger
                .info(&format!("Relay {}", if on { "ON" } else { "OFF" }));
        }
        self.relay = Some(on);
        Ok(())
    }

    fn set_color(&mut self, color: Rgb) -> Result<()> {
        if self.color != Some(color) {
            self.logger.info(&format!("LED {}", color));
        }
        self.color = Some(color);
        Ok(())
    }
}

/// Relay GPIO and RGB LED brightness through sysfs value files
#[derive(Debug, Clone)]
pub struct SysfsActuator {
    relay_path: PathBuf,
    led_paths: [PathBuf; 3],
    led_max: u32,
}

impl SysfsActuator {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            relay_path: PathBuf::from(&config.relay_path),
            led_paths: [
                PathBuf::from(&config.led_paths.red),
                PathBuf::from(&config.led_paths.green),
                PathBuf::from(&config.led_paths.blue),
            ],
            led_max: config.led_max,
        }
    }

    fn write(path: &Path, value: String) -> Result<()> {
        std::fs::write(path, value).map_err(|e| {
            PricelightError::actuator(format!("Writing {}: {}", path.display(), e))
        })
    }
}

impl Actuator for SysfsActuator {
    fn set_relay(&mut self, on: bool) -> Result<()> {
        Self::write(&self.relay_path, if on { "1" } else { "0" }.to_string())
    }

    fn set_color(&mut self, color: Rgb) -> Result<()> {
        for (path, level) in self.led_paths.iter().zip(color.scaled(self.led_max)) {
            Self::write(path, level.to_string())?;
        }
        Ok(())
    }
}

pub fn actuator_from_config(config: &ControlConfig) -> Box<dyn Actuator> {
    match config.actuator {
        ActuatorKind::Log => Box::new(LogActuator::new()),
        ActuatorKind::Sysfs => Box::new(SysfsActuator::new(config)),
    }
}

/// Drives outputs from situation snapshots
pub struct ControlLoop<A: Actuator, C: Canvas> {
    snapshots: watch::Receiver<Arc<Situation>>,
    actuator: A,
    canvas: C,
    renderer: Renderer,
    max_price: Decimal,
    currency: String,
    poll_interval: Duration,
    last_seen: Option<Arc<Situation>>,
    applied: Option<Classification>,
    failing: bool,
    logger: StructuredLogger,
}

impl<A: Actuator, C: Canvas> ControlLoop<A, C> {
    pub fn new(
        snapshots: watch::Receiver<Arc<Situation>>,
        actuator: A,
        canvas: C,
        renderer: Renderer,
        config: &ControlConfig,
        currency: &str,
    ) -> Self {
        Self {
            snapshots,
            actuator,
            canvas,
            renderer,
            max_price: config.max_price,
            currency: currency.to_string(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            last_seen: None,
            applied: None,
            failing: false,
            logger: get_logger("control"),
        }
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    /// Classification currently applied to the outputs
    pub fn applied(&self) -> Option<Classification> {
        self.applied
    }

    fn apply(&mut self, classification: Classification, price: Option<Decimal>) -> Result<()> {
        self.actuator.set_relay(classification.relay_on())?;
        self.actuator.set_color(classification.color())?;
        self.logger
            .info(&classification.status_line(price, &self.currency));
        Ok(())
    }

    /// Check the snapshot once. Returns the classification when the
    /// situation changed or the outputs still have to be driven, `None`
    /// otherwise.
    ///
    /// A failed actuator write leaves `applied` empty, so the next tick
    /// retries it even though the situation did not change.
    pub fn poll_once(&mut self) -> Option<Classification> {
        let current = self.snapshots.borrow().clone();
        if self.applied.is_some()
            && let Some(prev) = &self.last_seen
            && prev.same_state(&current)
        {
            return None;
        }

        let classification = Classification::from_situation(&current, self.max_price);
        if self.applied != Some(classification) {
            let retrying = self.failing;
            match self.apply(classification, current.current_price) {
                Ok(()) => {
                    if retrying {
                        self.logger.info("Outputs recovered");
                    }
                    self.applied = Some(classification);
                    self.failing = false;
                }
                Err(e) => {
                    self.applied = None;
                    self.failing = true;
                    // Retried every tick; only the first failure is loud
                    let msg = format!("Failed to drive outputs: {}", e);
                    if retrying {
                        self.logger.debug(&msg);
                    } else {
                        self.logger.error(&msg);
                    }
                }
            }
        }

        if self.renderer.render(&current, &mut self.canvas) {
            self.logger.debug("Display redrawn");
        }

        self.last_seen = Some(current);
        Some(classification)
    }

    pub async fn run(mut self) {
        self.logger.info(&format!(
            "Control loop started (poll {} ms, threshold {} {}/kWh)",
            self.poll_interval.as_millis(),
            crate::classify::format_price(self.max_price),
            self.currency
        ));
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.poll_once();
        }
    }
}

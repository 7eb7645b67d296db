//! Shared view of the current price situation
//!
//! A single [`SituationHub`] task owns the state. The price fetcher and the
//! manual override API send [`SituationCommand`]s; the control loop and the
//! web layer read immutable snapshots from a `watch` channel.

use crate::error::{PricelightError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::prices::HourPrice;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Manual override switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManualState {
    On,
    Off,
    #[default]
    Auto,
}

impl ManualState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManualState::On => "on",
            ManualState::Off => "off",
            ManualState::Auto => "auto",
        }
    }
}

impl FromStr for ManualState {
    type Err = PricelightError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(ManualState::On),
            "off" => Ok(ManualState::Off),
            "auto" => Ok(ManualState::Auto),
            other => Err(PricelightError::validation(
                "state".to_string(),
                format!("Unknown manual state '{}'", other),
            )),
        }
    }
}

/// Snapshot read by the control loop and renderers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Situation {
    pub manual: ManualState,
    /// Price of the delivery hour containing "now", if known
    pub current_price: Option<Decimal>,
    /// Local hour of day (0-23) at the last price update
    pub current_hour: Option<u32>,
    /// Consecutive upcoming hours starting with the current one
    pub window: Vec<HourPrice>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Situation {
    /// Equal in everything that affects outputs; `updated_at` is ignored
    pub fn same_state(&self, other: &Situation) -> bool {
        self.manual == other.manual
            && self.current_price == other.current_price
            && self.current_hour == other.current_hour
            && self.window == other.window
    }
}

/// Price-derived part of a situation
#[derive(Debug, Clone, PartialEq)]
pub struct PriceUpdate {
    pub current_price: Option<Decimal>,
    pub current_hour: Option<u32>,
    pub window: Vec<HourPrice>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum SituationCommand {
    SetManual(ManualState),
    UpdatePrices(PriceUpdate),
}

/// Cloneable handle for writers and readers
#[derive(Debug, Clone)]
pub struct SituationHandle {
    commands: mpsc::UnboundedSender<SituationCommand>,
    snapshots: watch::Receiver<Arc<Situation>>,
}

impl SituationHandle {
    fn send(&self, command: SituationCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| PricelightError::generic("Situation hub is not running"))
    }

    pub fn set_manual(&self, state: ManualState) -> Result<()> {
        self.send(SituationCommand::SetManual(state))
    }

    pub fn update_prices(&self, update: PriceUpdate) -> Result<()> {
        self.send(SituationCommand::UpdatePrices(update))
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Situation>> {
        self.snapshots.clone()
    }

    pub fn current(&self) -> Arc<Situation> {
        self.snapshots.borrow().clone()
    }
}

/// Owner of the situation state
pub struct SituationHub {
    commands_rx: mpsc::UnboundedReceiver<SituationCommand>,
    snapshot_tx: watch::Sender<Arc<Situation>>,
    current: Situation,
    logger: StructuredLogger,
}

impl SituationHub {
    pub fn new(initial: Situation) -> (Self, SituationHandle) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(initial.clone()));
        let hub = Self {
            commands_rx,
            snapshot_tx,
            current: initial,
            logger: get_logger("situation"),
        };
        let handle = SituationHandle {
            commands: commands_tx,
            snapshots: snapshot_rx,
        };
        (hub, handle)
    }

    /// Apply one command; returns whether outputs may change
    pub fn apply(&mut self, command: SituationCommand) -> bool {
        let before = self.current.clone();
        match command {
            SituationCommand::SetManual(state) => {
                if state != self.current.manual {
                    self.logger
                        .info(&format!("Manual override set to {}", state.as_str()));
                }
                self.current.manual = state;
            }
            SituationCommand::UpdatePrices(update) => {
                self.current.current_price = update.current_price;
                self.current.current_hour = update.current_hour;
                self.current.window = update.window;
                self.current.updated_at = Some(update.at);
            }
        }
        self.snapshot_tx.send_replace(Arc::new(self.current.clone()));
        !before.same_state(&self.current)
    }

    pub async fn run(mut self) {
        while let Some(command) = self.commands_rx.recv().await {
            self.apply(command);
        }
        self.logger.debug("All situation writers dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_state_parses_case_insensitively() {
        assert_eq!("ON".parse::<ManualState>().unwrap(), ManualState::On);
        assert_eq!(" off ".parse::<ManualState>().unwrap(), ManualState::Off);
        assert_eq!("Auto".parse::<ManualState>().unwrap(), ManualState::Auto);
        assert!("maybe".parse::<ManualState>().is_err());
    }

    #[test]
    fn apply_publishes_snapshots() {
        let (mut hub, handle) = SituationHub::new(Situation::default());
        assert!(hub.apply(SituationCommand::SetManual(ManualState::On)));
        assert_eq!(handle.current().manual, ManualState::On);

        let at = Utc.with_ymd_and_hms(2023, 3, 9, 12, 0, 0).unwrap();
        let update = PriceUpdate {
            current_price: Some(Decimal::new(12, 2)),
            current_hour: Some(13),
            window: vec![HourPrice::new(at, Decimal::new(12, 2))],
            at,
        };
        assert!(hub.apply(SituationCommand::UpdatePrices(update.clone())));
        // Same prices at a later time do not count as a change
        let later = PriceUpdate {
            at: at + chrono::TimeDelta::minutes(2),
            ..update
        };
        assert!(!hub.apply(SituationCommand::UpdatePrices(later)));
        assert_eq!(handle.current().current_hour, Some(13));
    }

    #[tokio::test]
    async fn run_drains_commands_from_handles() {
        let (hub, handle) = SituationHub::new(Situation::default());
        let mut rx = handle.subscribe();
        tokio::spawn(hub.run());
        handle.set_manual(ManualState::Off).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().manual, ManualState::Off);
    }
}

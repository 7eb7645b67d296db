//! Network-corrected wall clock
//!
//! [`ClockSource`] adds an offset obtained through [`TimeSync`] to a
//! [`LocalClock`]. It re-synchronizes every `resync_every` calls, and backs
//! off exponentially while the time server cannot be reached. Callers get
//! `Err(ClockUnavailable)` for a cycle instead of a wrong time.

use crate::config::ClockConfig;
use crate::error::{PricelightError, Result};
use crate::logging::{StructuredLogger, get_logger};
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

pub mod sntp;

pub use sntp::SntpClient;

/// Obtains the difference between true time and the local clock
#[async_trait::async_trait]
pub trait TimeSync: Send + Sync {
    async fn synchronize(&self) -> Result<TimeDelta>;
}

/// The device's own, possibly wrong, clock
pub trait LocalClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Local clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl LocalClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Synchronization bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockState {
    pub last_adjustment: Option<TimeDelta>,
    pub sync_counter: u64,
    pub backoff_ms: u64,
}

/// Wall clock corrected by periodic network synchronization
pub struct ClockSource {
    sync: Box<dyn TimeSync>,
    local: Box<dyn LocalClock>,
    state: ClockState,
    resync_every: u64,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    logger: StructuredLogger,
}

impl ClockSource {
    pub fn new(sync: Box<dyn TimeSync>, local: Box<dyn LocalClock>, config: &ClockConfig) -> Self {
        Self {
            sync,
            local,
            state: ClockState {
                last_adjustment: None,
                sync_counter: 0,
                backoff_ms: config.initial_backoff_ms,
            },
            resync_every: config.resync_every.max(1),
            initial_backoff_ms: config.initial_backoff_ms,
            max_backoff_ms: config.max_backoff_ms,
            logger: get_logger("clock"),
        }
    }

    /// SNTP against the configured server and the system clock
    pub fn from_config(config: &ClockConfig) -> Self {
        let sntp = SntpClient::new(
            config.ntp_server.clone(),
            Duration::from_secs(config.request_timeout_secs),
        );
        Self::new(Box::new(sntp), Box::new(SystemClock), config)
    }

    pub fn state(&self) -> &ClockState {
        &self.state
    }

    fn sync_due(&self) -> bool {
        self.state.last_adjustment.is_none() || self.state.sync_counter % self.resync_every == 0
    }

    /// Current corrected time.
    ///
    /// A failed synchronization sleeps for the doubled backoff before
    /// returning `ClockUnavailable`, which throttles a retrying caller.
    /// The previous adjustment survives a failed periodic resync.
    pub async fn now(&mut self) -> Result<DateTime<Utc>> {
        let due = self.sync_due();
        self.state.sync_counter = self.state.sync_counter.wrapping_add(1);

        if due {
            match self.sync.synchronize().await {
                Ok(adjustment) => {
                    self.state.backoff_ms = self.initial_backoff_ms;
                    if self.state.last_adjustment.is_none() {
                        self.logger.info(&format!(
                            "Clock synchronized, offset {} ms",
                            adjustment.num_milliseconds()
                        ));
                    }
                    self.state.last_adjustment = Some(adjustment);
                }
                Err(e) => {
                    self.state.backoff_ms = self
                        .state
                        .backoff_ms
                        .saturating_mul(2)
                        .min(self.max_backoff_ms);
                    self.logger.warn(&format!(
                        "Time sync failed, retrying in {} ms: {}",
                        self.state.backoff_ms, e
                    ));
                    tokio::time::sleep(Duration::from_millis(self.state.backoff_ms)).await;
                    return Err(PricelightError::clock_unavailable(e.to_string()));
                }
            }
        }

        match self.state.last_adjustment {
            Some(adjustment) => Ok(self.local.now() + adjustment),
            None => Err(PricelightError::clock_unavailable("never synchronized")),
        }
    }

    /// Drop the adjustment so the next call synchronizes again
    pub fn forget_adjustment(&mut self) {
        if self.state.last_adjustment.take().is_some() {
            self.logger.info("Discarding clock adjustment");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClock(DateTime<Utc>);

    impl LocalClock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct CountingSync {
        calls: Arc<AtomicUsize>,
        offset: TimeDelta,
    }

    #[async_trait::async_trait]
    impl TimeSync for CountingSync {
        async fn synchronize(&self) -> Result<TimeDelta> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.offset)
        }
    }

    fn local() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 9, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn applies_offset_and_resyncs_periodically() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut config = ClockConfig::default();
        config.resync_every = 3;
        let mut clock = ClockSource::new(
            Box::new(CountingSync {
                calls: calls.clone(),
                offset: TimeDelta::seconds(30),
            }),
            Box::new(FixedClock(local())),
            &config,
        );

        for _ in 0..7 {
            assert_eq!(clock.now().await.unwrap(), local() + TimeDelta::seconds(30));
        }
        // calls 0, 3 and 6 synchronize
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn forget_forces_sync() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut clock = ClockSource::new(
            Box::new(CountingSync {
                calls: calls.clone(),
                offset: TimeDelta::zero(),
            }),
            Box::new(FixedClock(local())),
            &ClockConfig::default(),
        );
        clock.now().await.unwrap();
        clock.now().await.unwrap();
        clock.forget_adjustment();
        assert!(clock.state().last_adjustment.is_none());
        clock.now().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

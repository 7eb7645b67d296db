use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use pricelight::clock::{ClockSource, LocalClock, TimeSync};
use pricelight::config::ClockConfig;
use pricelight::error::{PricelightError, Result};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Replays scripted outcomes; an exhausted script keeps failing
struct ScriptedSync(Mutex<VecDeque<Option<TimeDelta>>>);

impl ScriptedSync {
    fn new(script: impl IntoIterator<Item = Option<TimeDelta>>) -> Self {
        Self(Mutex::new(script.into_iter().collect()))
    }
}

#[async_trait::async_trait]
impl TimeSync for ScriptedSync {
    async fn synchronize(&self) -> Result<TimeDelta> {
        match self.0.lock().unwrap().pop_front().flatten() {
            Some(offset) => Ok(offset),
            None => Err(PricelightError::network("unreachable")),
        }
    }
}

struct FixedClock;

impl LocalClock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 9, 12, 0, 0).unwrap()
    }
}

fn clock(script: Vec<Option<TimeDelta>>, resync_every: u64) -> ClockSource {
    let config = ClockConfig {
        resync_every,
        ..ClockConfig::default()
    };
    ClockSource::new(Box::new(ScriptedSync::new(script)), Box::new(FixedClock), &config)
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_per_failure_and_caps() {
    let mut clock = clock(vec![], 100);
    for n in 1..=10u32 {
        let started = tokio::time::Instant::now();
        let err = clock.now().await.unwrap_err();
        assert!(matches!(err, PricelightError::ClockUnavailable { .. }));

        let expected = (1000u64 * 2u64.pow(n)).min(300_000);
        assert_eq!(clock.state().backoff_ms, expected, "after {} failures", n);
        assert!(started.elapsed() >= Duration::from_millis(expected));
    }
    assert_eq!(clock.state().backoff_ms, 300_000);
    assert!(clock.state().last_adjustment.is_none());
}

#[tokio::test(start_paused = true)]
async fn success_resets_backoff() {
    let offset = TimeDelta::seconds(-7);
    let mut clock = clock(vec![None, None, Some(offset)], 100);
    assert!(clock.now().await.is_err());
    assert!(clock.now().await.is_err());
    assert_eq!(clock.state().backoff_ms, 4000);

    let now = clock.now().await.unwrap();
    assert_eq!(now, FixedClock.now() + offset);
    assert_eq!(clock.state().backoff_ms, 1000);
}

#[tokio::test(start_paused = true)]
async fn failed_resync_keeps_previous_adjustment() {
    let offset = TimeDelta::seconds(5);
    let mut clock = clock(vec![Some(offset)], 2);

    // call 0 syncs, call 1 reuses, call 2 tries to resync and fails
    assert_eq!(clock.now().await.unwrap(), FixedClock.now() + offset);
    assert_eq!(clock.now().await.unwrap(), FixedClock.now() + offset);
    assert!(clock.now().await.is_err());
    assert_eq!(clock.state().last_adjustment, Some(offset));

    // call 3 is between syncs and uses the kept adjustment
    assert_eq!(clock.now().await.unwrap(), FixedClock.now() + offset);
}

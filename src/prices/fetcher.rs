use super::cache::{PriceCache, Slot};
use super::client::PriceSource;
use super::types::{DayKey, HourPrice};
use crate::clock::ClockSource;
use crate::config::PricesConfig;
use crate::error::Result;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::situation::{PriceUpdate, SituationHandle};
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use rand::Rng;
use std::time::Duration;

/// Outcome of one `ensure_fetched` pass
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// Today's series, `None` while the slot is empty
    pub today: Option<Vec<HourPrice>>,
    /// Tomorrow's series, `None` while the slot is empty
    pub tomorrow: Option<Vec<HourPrice>>,
    /// HTTP requests issued in this pass
    pub requests: usize,
    /// A failure that a skewed wall clock could explain was seen
    pub clock_suspect: bool,
}

/// Randomized pause between fetch cycles, in `[min_secs, max_secs]`
pub fn jittered_delay(min_secs: u64, max_secs: u64) -> Duration {
    let (lo, hi) = if min_secs <= max_secs {
        (min_secs, max_secs)
    } else {
        (max_secs, min_secs)
    };
    let millis = rand::thread_rng().gen_range(lo * 1000..=hi * 1000);
    Duration::from_millis(millis)
}

/// Keeps today's and tomorrow's prices cached and publishes the upcoming
/// window to the situation hub.
pub struct PriceFetcher {
    source: Box<dyn PriceSource>,
    cache: PriceCache,
    tz: Tz,
    window_hours: usize,
    min_cycle_secs: u64,
    max_cycle_secs: u64,
    logger: StructuredLogger,
}

impl PriceFetcher {
    pub fn new(source: Box<dyn PriceSource>, config: &PricesConfig) -> Result<Self> {
        Ok(Self {
            source,
            cache: PriceCache::new(),
            tz: config.tz()?,
            window_hours: config.window_hours,
            min_cycle_secs: config.min_cycle_secs,
            max_cycle_secs: config.max_cycle_secs,
            logger: get_logger_with_context(
                LogContext::new("prices").with_geography(&config.geography),
            ),
        })
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Make sure both day slots are populated for the day containing `now`.
    ///
    /// Only empty slots are requested. Failures are logged and leave the
    /// slot empty for the next cycle.
    pub async fn ensure_fetched(&mut self, now: DateTime<Utc>) -> FetchReport {
        let today = DayKey::for_instant(now, &self.tz);
        let tomorrow = today.next();
        self.cache.roll_to(today, tomorrow);

        let mut report = FetchReport::default();
        for (slot, key) in [(Slot::Today, today), (Slot::Tomorrow, tomorrow)] {
            if !self.cache.needs_fetch(slot) {
                continue;
            }
            report.requests += 1;
            let log = self
                .logger
                .with_field("slot", slot.as_str().to_string())
                .with_field("day", key.to_string());
            match self.source.fetch_day(&key).await {
                Ok(prices) if prices.is_empty() => {
                    log.warn("No prices published");
                }
                Ok(prices) => {
                    let count = prices.len();
                    if self.cache.store(slot, key, prices) {
                        log.info(&format!("Fetched {} hourly prices", count));
                    }
                }
                Err(e) => {
                    let msg = format!("Fetch failed: {}", e);
                    if !e.is_transient() {
                        log.error(&msg);
                    } else if slot == Slot::Tomorrow {
                        // Tomorrow is routinely missing before the day-ahead
                        // auction closes
                        log.debug(&msg);
                    } else {
                        log.warn(&msg);
                    }
                    if e.suggests_clock_skew() {
                        report.clock_suspect = true;
                    }
                }
            }
        }

        let collect = |slot| {
            let prices = self.cache.prices(slot);
            (!prices.is_empty()).then(|| prices.to_vec())
        };
        report.today = collect(Slot::Today);
        report.tomorrow = collect(Slot::Tomorrow);
        report
    }

    /// Situation update for the instant `now`
    pub fn price_update(&self, now: DateTime<Utc>) -> PriceUpdate {
        let current_price = self.cache.price_at(now);
        let current_hour = current_price.map(|_| now.with_timezone(&self.tz).hour());
        PriceUpdate {
            current_price,
            current_hour,
            window: self.cache.upcoming(now, self.window_hours),
            at: now,
        }
    }

    /// One full cycle without the trailing sleep. Returns false when the
    /// clock was unavailable and nothing was done.
    pub async fn cycle(&mut self, clock: &mut ClockSource, situation: &SituationHandle) -> bool {
        let now = match clock.now().await {
            Ok(now) => now,
            Err(e) => {
                self.logger.debug(&format!("Skipping cycle: {}", e));
                return false;
            }
        };

        let report = self.ensure_fetched(now).await;
        if report.clock_suspect {
            self.logger
                .warn("Price request failed; clock may be off, forcing time resync");
            clock.forget_adjustment();
        }

        if let Err(e) = situation.update_prices(self.price_update(now)) {
            self.logger.error(&format!("Cannot publish prices: {}", e));
        }
        true
    }

    /// Fetch loop; runs for the lifetime of the process.
    ///
    /// An unavailable clock has already slept its backoff, so the loop
    /// retries right away in that case.
    pub async fn run(mut self, mut clock: ClockSource, situation: SituationHandle) {
        self.logger.info(&format!(
            "Price fetcher started (cycle {}-{} s, window {} h)",
            self.min_cycle_secs, self.max_cycle_secs, self.window_hours
        ));
        loop {
            if !self.cycle(&mut clock, &situation).await {
                continue;
            }
            tokio::time::sleep(jittered_delay(self.min_cycle_secs, self.max_cycle_secs)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_in_bounds() {
        for _ in 0..200 {
            let d = jittered_delay(100, 200);
            assert!(d >= Duration::from_secs(100) && d <= Duration::from_secs(200));
        }
        assert_eq!(jittered_delay(5, 5), Duration::from_secs(5));
    }
}

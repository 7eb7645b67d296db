use super::types::{DayKey, HourPrice};
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

/// The two day slots kept in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Today,
    Tomorrow,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Today => "today",
            Slot::Tomorrow => "tomorrow",
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CacheSlot {
    key: Option<DayKey>,
    prices: Vec<HourPrice>,
}

impl CacheSlot {
    fn keyed(key: DayKey) -> Self {
        Self {
            key: Some(key),
            prices: Vec::new(),
        }
    }
}

/// Price series for today and tomorrow, keyed by local day.
///
/// A slot is only refilled while it is empty. When the day rolls over a
/// populated tomorrow slot becomes the new today slot, so at most one new
/// request per day is needed in steady state.
#[derive(Debug, Clone, Default)]
pub struct PriceCache {
    today: CacheSlot,
    tomorrow: CacheSlot,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Align both slots with the current day keys.
    ///
    /// Slots whose key no longer matches are cleared, except that yesterday's
    /// tomorrow is promoted when it is exactly the new today.
    pub fn roll_to(&mut self, today: DayKey, tomorrow: DayKey) {
        if self.today.key != Some(today) {
            if self.tomorrow.key == Some(today) && !self.tomorrow.prices.is_empty() {
                self.today = std::mem::take(&mut self.tomorrow);
            } else {
                self.today = CacheSlot::keyed(today);
            }
        }
        if self.tomorrow.key != Some(tomorrow) {
            self.tomorrow = CacheSlot::keyed(tomorrow);
        }
    }

    fn slot(&self, slot: Slot) -> &CacheSlot {
        match slot {
            Slot::Today => &self.today,
            Slot::Tomorrow => &self.tomorrow,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut CacheSlot {
        match slot {
            Slot::Today => &mut self.today,
            Slot::Tomorrow => &mut self.tomorrow,
        }
    }

    pub fn key(&self, slot: Slot) -> Option<DayKey> {
        self.slot(slot).key
    }

    /// A slot needs a request while it holds no data
    pub fn needs_fetch(&self, slot: Slot) -> bool {
        self.slot(slot).prices.is_empty()
    }

    pub fn prices(&self, slot: Slot) -> &[HourPrice] {
        &self.slot(slot).prices
    }

    /// Store a fetched series. Returns false when the slot moved on to
    /// another day while the request was in flight.
    pub fn store(&mut self, slot: Slot, key: DayKey, mut prices: Vec<HourPrice>) -> bool {
        let target = self.slot_mut(slot);
        if target.key != Some(key) {
            return false;
        }
        prices.sort_by_key(|p| p.hour());
        target.prices = prices;
        true
    }

    /// Number of distinct day keys held
    pub fn len(&self) -> usize {
        let mut keys: Vec<DayKey> = [self.today.key, self.tomorrow.key]
            .into_iter()
            .flatten()
            .collect();
        keys.dedup();
        keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn all_prices(&self) -> impl Iterator<Item = &HourPrice> {
        self.today.prices.iter().chain(self.tomorrow.prices.iter())
    }

    /// Price of the delivery hour containing `instant`
    pub fn price_at(&self, instant: DateTime<Utc>) -> Option<Decimal> {
        self.all_prices()
            .find(|p| p.covers(instant))
            .map(|p| p.price())
    }

    /// Consecutive hours starting at the hour containing `from`.
    ///
    /// Stops at the first missing hour so index `i` is always `i` hours
    /// after the current one.
    pub fn upcoming(&self, from: DateTime<Utc>, limit: usize) -> Vec<HourPrice> {
        let Some(mut expected) = self
            .all_prices()
            .find(|p| p.covers(from))
            .map(|p| p.hour())
        else {
            return Vec::new();
        };
        let mut window = Vec::with_capacity(limit);
        let mut candidates: Vec<&HourPrice> =
            self.all_prices().filter(|p| p.hour() >= expected).collect();
        candidates.sort_by_key(|p| p.hour());

        for price in candidates {
            if window.len() >= limit || price.hour() != expected {
                break;
            }
            window.push(price.clone());
            expected += TimeDelta::hours(1);
        }
        window
    }
}

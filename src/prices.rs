//! Day-ahead spot prices
//!
//! Prices are requested per local calendar day from a public JSON API and
//! cached for today and tomorrow. The fetcher turns the cache into the
//! window of upcoming hours the rest of the device works from.

pub mod cache;
pub mod client;
pub mod fetcher;
pub mod types;

pub use cache::{PriceCache, Slot};
pub use client::{HttpPriceSource, PriceSource, parse_price_records};
pub use fetcher::{FetchReport, PriceFetcher, jittered_delay};
pub use types::{DayKey, HourPrice, hour_start};

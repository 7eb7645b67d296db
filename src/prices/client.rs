use super::types::{DayKey, HourPrice, hour_start};
use crate::config::PricesConfig;
use crate::error::{PricelightError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Source of one local day's price series
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_day(&self, day: &DayKey) -> Result<Vec<HourPrice>>;
}

/// One element of the API's JSON array
#[derive(Debug, Deserialize)]
struct PriceRecord {
    time_start: DateTime<FixedOffset>,
    time_end: DateTime<FixedOffset>,
    #[serde(flatten)]
    fields: HashMap<String, serde_json::Value>,
}

/// Parse a day's JSON body into hourly prices.
///
/// Records shorter than an hour (quarter-hour products) are averaged into
/// the hour they start in. The result is ordered by hour.
pub fn parse_price_records(body: &str, price_field: &str) -> Result<Vec<HourPrice>> {
    let records: Vec<PriceRecord> = serde_json::from_str(body)
        .map_err(|e| PricelightError::malformed(format!("Unexpected body shape: {}", e)))?;

    let mut hours: BTreeMap<DateTime<Utc>, (Decimal, u32)> = BTreeMap::new();
    for record in records {
        if record.time_end <= record.time_start {
            return Err(PricelightError::malformed(format!(
                "Record ends before it starts: {} .. {}",
                record.time_start, record.time_end
            )));
        }
        let value = record.fields.get(price_field).ok_or_else(|| {
            PricelightError::malformed(format!(
                "Record at {} has no {}",
                record.time_start, price_field
            ))
        })?;
        let price: Decimal = serde_json::from_value(value.clone()).map_err(|e| {
            PricelightError::malformed(format!("{} is not a number: {}", price_field, e))
        })?;

        let hour = hour_start(&record.time_start);
        let entry = hours.entry(hour).or_insert((Decimal::ZERO, 0));
        entry.0 += price;
        entry.1 += 1;
    }

    Ok(hours
        .into_iter()
        .map(|(hour, (sum, count))| {
            let price = if count == 1 {
                sum
            } else {
                sum / Decimal::from(count)
            };
            HourPrice::new(hour, price)
        })
        .collect())
}

/// Price source backed by the public spot-price HTTP API
pub struct HttpPriceSource {
    client: reqwest::Client,
    base_url: String,
    geography: String,
    price_field: String,
    logger: StructuredLogger,
}

impl HttpPriceSource {
    pub fn new(config: &PricesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let logger = get_logger_with_context(
            LogContext::new("prices").with_geography(&config.geography),
        );
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            geography: config.geography.clone(),
            price_field: config.price_field(),
            logger,
        })
    }

    /// `{base}/api/v1/prices/{YYYY}/{MM}-{DD}_{GEO}.json`
    pub fn url_for(&self, day: &DayKey) -> String {
        format!(
            "{}/api/v1/prices/{}_{}.json",
            self.base_url,
            day.as_path(),
            self.geography
        )
    }
}

#[async_trait::async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch_day(&self, day: &DayKey) -> Result<Vec<HourPrice>> {
        let url = self.url_for(day);
        self.logger.debug(&format!("GET {}", url));

        let resp = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("pricelight/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;

        if resp.status() != StatusCode::OK {
            return Err(PricelightError::bad_response(resp.status().as_u16()));
        }

        let body = resp.text().await?;
        let prices = parse_price_records(&body, &self.price_field)?;
        self.logger
            .debug(&format!("Parsed {} hourly prices for {}", prices.len(), day));
        Ok(prices)
    }
}

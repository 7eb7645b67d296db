use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Spot price of one delivery hour.
///
/// Fields are private so a record cannot change after it left the parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct HourPrice {
    hour: DateTime<Utc>,
    price: Decimal,
}

impl HourPrice {
    pub fn new(hour: DateTime<Utc>, price: Decimal) -> Self {
        Self { hour, price }
    }

    /// Start of the delivery hour
    pub fn hour(&self) -> DateTime<Utc> {
        self.hour
    }

    /// Price per kWh in the configured currency
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Hour of day (0-23) in the given time zone
    pub fn local_hour(&self, tz: &Tz) -> u32 {
        self.hour.with_timezone(tz).hour()
    }

    /// Whether `instant` falls inside this delivery hour
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.hour && instant < self.hour + chrono::TimeDelta::hours(1)
    }
}

/// Local calendar day used as cache key, rendered as `YYYY/MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Day that contains `instant` on the local calendar of `tz`
    pub fn for_instant(instant: DateTime<Utc>, tz: &Tz) -> Self {
        Self(tz.from_utc_datetime(&instant.naive_utc()).date_naive())
    }

    /// The calendar day after this one
    pub fn next(&self) -> Self {
        Self(self.0.succ_opt().unwrap_or(self.0))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Path segment used by the price API, e.g. `2023/03-09`
    pub fn as_path(&self) -> String {
        format!(
            "{:04}/{:02}-{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day()
        )
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_path())
    }
}

/// Start of the local hour containing `instant`.
///
/// Truncation happens on the wall clock of the instant's own offset, so
/// zones at a half or quarter hour from UTC keep their own hour boundaries.
pub fn hour_start<Z: TimeZone>(instant: &DateTime<Z>) -> DateTime<Utc> {
    let local = instant.naive_local();
    let into_hour = TimeDelta::seconds(i64::from(local.minute() * 60 + local.second()))
        + TimeDelta::nanoseconds(i64::from(local.nanosecond()));
    instant.with_timezone(&Utc) - into_hour
}

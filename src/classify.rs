//! Price classification
//!
//! Two independent schemes live here: a fixed threshold that decides the
//! relay, and a window-relative tertile bucketing used for coloring.

use crate::render::Rgb;
use crate::situation::{ManualState, Situation};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Outcome of comparing a price against the fixed threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceLevel {
    /// At or below the threshold
    On,
    /// Above the threshold, at most twice it
    MediumOff,
    /// Above twice the threshold
    HighOff,
}

pub fn threshold_level(price: Decimal, max_price: Decimal) -> PriceLevel {
    if price <= max_price {
        PriceLevel::On
    } else if price <= max_price * Decimal::TWO {
        PriceLevel::MediumOff
    } else {
        PriceLevel::HighOff
    }
}

/// What the outputs should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    ManualOn,
    ManualOff,
    GreenAutoOn,
    OrangeAutoOff,
    RedAutoOff,
    NoData,
}

impl Classification {
    /// Manual ON beats manual OFF beats the price threshold beats no data
    pub fn classify(manual: ManualState, price: Option<Decimal>, max_price: Decimal) -> Self {
        match (manual, price) {
            (ManualState::On, _) => Classification::ManualOn,
            (ManualState::Off, _) => Classification::ManualOff,
            (ManualState::Auto, Some(p)) => match threshold_level(p, max_price) {
                PriceLevel::On => Classification::GreenAutoOn,
                PriceLevel::MediumOff => Classification::OrangeAutoOff,
                PriceLevel::HighOff => Classification::RedAutoOff,
            },
            (ManualState::Auto, None) => Classification::NoData,
        }
    }

    pub fn from_situation(situation: &Situation, max_price: Decimal) -> Self {
        Self::classify(situation.manual, situation.current_price, max_price)
    }

    pub fn relay_on(&self) -> bool {
        matches!(
            self,
            Classification::ManualOn | Classification::GreenAutoOn
        )
    }

    pub fn color(&self) -> Rgb {
        match self {
            Classification::ManualOn => Rgb::BLUE,
            Classification::ManualOff => Rgb::DIM_WHITE,
            Classification::GreenAutoOn => Rgb::GREEN,
            Classification::OrangeAutoOff => Rgb::ORANGE,
            Classification::RedAutoOff => Rgb::RED,
            Classification::NoData => Rgb::OFF,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::ManualOn => "ManualOn",
            Classification::ManualOff => "ManualOff",
            Classification::GreenAutoOn => "GreenAutoOn",
            Classification::OrangeAutoOff => "OrangeAutoOff",
            Classification::RedAutoOff => "RedAutoOff",
            Classification::NoData => "NoData",
        }
    }

    /// Human-readable status line
    pub fn status_line(&self, price: Option<Decimal>, currency: &str) -> String {
        let relay = if self.relay_on() { "ON" } else { "OFF" };
        match price {
            Some(p) => format!(
                "{}: relay {}, price {} {}/kWh",
                self.as_str(),
                relay,
                format_price(p),
                currency
            ),
            None => format!("{}: relay {}, no price", self.as_str(), relay),
        }
    }
}

/// Third of the visible window a price falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tertile {
    Low,
    Mid,
    High,
}

impl Tertile {
    pub fn color(&self) -> Rgb {
        match self {
            Tertile::Low => Rgb::GREEN,
            Tertile::Mid => Rgb::ORANGE,
            Tertile::High => Rgb::RED,
        }
    }
}

/// Min/max of a window of prices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TertileWindow {
    pub min: Decimal,
    pub max: Decimal,
}

impl TertileWindow {
    /// `None` for an empty window
    pub fn new<I: IntoIterator<Item = Decimal>>(prices: I) -> Option<Self> {
        prices.into_iter().fold(None, |acc, p| match acc {
            None => Some(Self { min: p, max: p }),
            Some(w) => Some(Self {
                min: w.min.min(p),
                max: w.max.max(p),
            }),
        })
    }

    pub fn range(&self) -> Decimal {
        self.max - self.min
    }

    /// Bucket a price. A flat window puts everything in `Low`.
    pub fn classify(&self, price: Decimal) -> Tertile {
        let range = self.range();
        if range.is_zero() {
            return Tertile::Low;
        }
        // Compare 3 * offset against range multiples to stay exact
        let scaled = (price - self.min) * Decimal::from(3);
        if scaled < range {
            Tertile::Low
        } else if scaled < range * Decimal::TWO {
            Tertile::Mid
        } else {
            Tertile::High
        }
    }
}

/// Two fractional digits, rounding half away from zero
pub fn format_price(price: Decimal) -> String {
    let rounded = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Europe::Stockholm;
use pricelight::config::{DisplayConfig, DisplayVariant, PricesConfig};
use pricelight::error::{PricelightError, Result};
use pricelight::prices::{DayKey, HourPrice, PriceFetcher, PriceSource};
use pricelight::render::{Renderer, Rgb, TextCanvas};
use pricelight::situation::{Situation, SituationCommand, SituationHub};
use rust_decimal::Decimal;

/// Serves one fixed day and 404 for any other
struct OneDay {
    day: DayKey,
    prices: Vec<HourPrice>,
}

#[async_trait::async_trait]
impl PriceSource for OneDay {
    async fn fetch_day(&self, day: &DayKey) -> Result<Vec<HourPrice>> {
        if *day == self.day {
            Ok(self.prices.clone())
        } else {
            Err(PricelightError::bad_response(404))
        }
    }
}

/// Local midnight 2023-03-09 in Stockholm
fn midnight() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 3, 8, 23, 0, 0).unwrap()
}

/// Cheapest at 03:00, most expensive at 18:00
fn series() -> Vec<HourPrice> {
    (0..24)
        .map(|h| {
            let cents = match h {
                3 => 5,
                18 => 200,
                _ => 50 + h,
            };
            HourPrice::new(midnight() + TimeDelta::hours(h), Decimal::new(cents, 2))
        })
        .collect()
}

async fn situation_at(now: DateTime<Utc>) -> Situation {
    let source = OneDay {
        day: DayKey::for_instant(now, &Stockholm),
        prices: series(),
    };
    let mut fetcher = PriceFetcher::new(Box::new(source), &PricesConfig::default()).unwrap();
    fetcher.ensure_fetched(now).await;

    let (mut hub, handle) = SituationHub::new(Situation::default());
    hub.apply(SituationCommand::UpdatePrices(fetcher.price_update(now)));
    handle.current().as_ref().clone()
}

#[tokio::test]
async fn histogram_colors_cheapest_green_and_dearest_red() {
    // 01:20 local, so bar 0 is hour 1
    let situation = situation_at(midnight() + TimeDelta::minutes(80)).await;
    assert_eq!(situation.current_hour, Some(1));
    assert_eq!(situation.window.len(), 18);

    let mut renderer = Renderer::from_config(&DisplayConfig::default(), Stockholm);
    let mut canvas = TextCanvas::new();
    assert!(renderer.render(&situation, &mut canvas));

    assert_eq!(canvas.bar_color(2), Some(Rgb::GREEN), "hour 3");
    assert_eq!(canvas.bar_color(17), Some(Rgb::RED), "hour 18");
    assert_eq!(canvas.bar_height(17), Some(90));
    assert_eq!(canvas.label(0), Some("1"));
    assert_eq!(canvas.label(1), Some("4"));

    // Same situation again is a no-op
    assert!(!renderer.render(&situation, &mut canvas));
    assert_eq!(canvas.commits(), 1);
}

#[tokio::test]
async fn slider_shows_all_in_price_from_current_hour() {
    // 17:05 local: 7 hours of data left today, tomorrow unknown
    let situation = situation_at(midnight() + TimeDelta::minutes(17 * 60 + 5)).await;
    assert_eq!(situation.current_hour, Some(17));
    assert_eq!(situation.window.len(), 7);

    let config = DisplayConfig {
        variant: DisplayVariant::Slider,
        ..DisplayConfig::default()
    };
    let mut renderer = Renderer::from_config(&config, Stockholm);
    let mut canvas = TextCanvas::new();
    assert!(renderer.render(&situation, &mut canvas));

    // 18:00 is 2.00 * 100 + 53.00 + 53.50
    assert_eq!(canvas.slider_value(1), Some(Decimal::new(30650, 2)));
    assert_eq!(canvas.slider_color(1), Some(Rgb::RED));
    assert_eq!(canvas.label(0), Some("17"));
    assert_eq!(canvas.label(6), Some("23"));
    assert_eq!(canvas.label(7), Some(""));
    assert_eq!(canvas.slider_value(12), Some(Decimal::ZERO));
}

#[test]
fn empty_situation_renders_blank_frame() {
    let mut renderer = Renderer::from_config(&DisplayConfig::default(), Stockholm);
    let mut canvas = TextCanvas::new();
    assert!(renderer.render(&Situation::default(), &mut canvas));
    assert_eq!(canvas.bar_color(0), Some(Rgb::OFF));
    assert_eq!(canvas.label(0), Some(""));
    assert!(!canvas.tick(0));
}

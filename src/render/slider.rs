use super::canvas::{Canvas, Rgb};
use crate::classify::TertileWindow;
use crate::config::SliderLayout;
use crate::prices::HourPrice;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Hour-of-day label; midnight reads as 24
pub fn hour_label(hour_of_day: u32) -> String {
    match hour_of_day % 24 {
        0 => "24".to_string(),
        h => h.to_string(),
    }
}

/// Vertical gauges for consecutive hours, showing the all-in price
#[derive(Debug)]
pub struct SliderRenderer {
    layout: SliderLayout,
    tz: Tz,
    last: Option<(Vec<HourPrice>, Option<u32>)>,
}

impl SliderRenderer {
    /// Fees and labels follow the hour of day on the wall clock of `tz`
    pub fn new(layout: SliderLayout, tz: Tz) -> Self {
        Self {
            layout,
            tz,
            last: None,
        }
    }

    /// `price * 100 + transport_fee[hour] + tax`
    pub fn slot_value(&self, price: Decimal, hour_of_day: u32) -> Decimal {
        let fee = self
            .layout
            .transport_fee
            .get(hour_of_day as usize % 24)
            .copied()
            .unwrap_or_default();
        price * Decimal::ONE_HUNDRED + fee + self.layout.tax
    }

    fn fill(&self, value: Decimal) -> f32 {
        if self.layout.max_value <= Decimal::ZERO {
            return 0.0;
        }
        (value / self.layout.max_value)
            .to_f32()
            .unwrap_or(0.0)
            .clamp(0.0, 1.0)
    }

    /// Draw up to `slots` gauges starting at the current hour. Returns false
    /// when the state equals the last drawn one.
    pub fn render(
        &mut self,
        window: &[HourPrice],
        current_hour: Option<u32>,
        canvas: &mut dyn Canvas,
    ) -> bool {
        if let Some((prev_window, prev_hour)) = &self.last
            && prev_window.as_slice() == window
            && *prev_hour == current_hour
        {
            return false;
        }

        let values: Vec<(u32, Decimal)> = window
            .iter()
            .take(self.layout.slots)
            .map(|p| {
                let hour = p.local_hour(&self.tz);
                (hour, self.slot_value(p.price(), hour))
            })
            .collect();
        let tertiles = TertileWindow::new(values.iter().map(|(_, v)| *v));

        for index in 0..self.layout.slots {
            let x = self.layout.origin_x + index as i32 * self.layout.spacing;
            match (values.get(index), tertiles.as_ref()) {
                (Some((hour, value)), Some(t)) if current_hour.is_some() => {
                    canvas.set_slider(index, *value, self.fill(*value), t.classify(*value).color());
                    canvas.set_label(index, &hour_label(*hour), x, self.layout.origin_y);
                }
                _ => {
                    canvas.set_slider(index, Decimal::ZERO, 0.0, Rgb::OFF);
                    canvas.set_label(index, "", x, self.layout.origin_y);
                }
            }
        }
        canvas.commit();

        self.last = Some((window.to_vec(), current_hour));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::TextCanvas;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use chrono_tz::{Europe::Stockholm, UTC};

    fn window(n: usize) -> Vec<HourPrice> {
        window_from(Utc.with_ymd_and_hms(2023, 3, 9, 20, 0, 0).unwrap(), n)
    }

    fn window_from(start: DateTime<Utc>, n: usize) -> Vec<HourPrice> {
        (0..n)
            .map(|i| HourPrice::new(start + TimeDelta::hours(i as i64), Decimal::new(50, 2)))
            .collect()
    }

    #[test]
    fn midnight_is_labelled_24() {
        assert_eq!(hour_label(0), "24");
        assert_eq!(hour_label(7), "7");
        assert_eq!(hour_label(24), "24");
    }

    #[test]
    fn slot_value_adds_fee_and_tax() {
        let renderer = SliderRenderer::new(SliderLayout::default(), UTC);
        // 0.50 * 100 + 20.00 (night) + 53.50
        assert_eq!(renderer.slot_value(Decimal::new(50, 2), 23), Decimal::new(12350, 2));
        // 0.50 * 100 + 53.00 (day) + 53.50
        assert_eq!(renderer.slot_value(Decimal::new(50, 2), 12), Decimal::new(15650, 2));
    }

    #[test]
    fn slots_past_data_are_cleared() {
        let mut renderer = SliderRenderer::new(SliderLayout::default(), UTC);
        let mut canvas = TextCanvas::new();
        assert!(renderer.render(&window(5), Some(20), &mut canvas));
        assert_eq!(canvas.label(0), Some("20"));
        assert_eq!(canvas.label(4), Some("24"));
        assert_eq!(canvas.slider_value(5), Some(Decimal::ZERO));
        assert_eq!(canvas.label(5), Some(""));
        assert_eq!(canvas.label(12), Some(""));
        assert!(!renderer.render(&window(5), Some(20), &mut canvas));
    }

    #[test]
    fn fees_follow_local_hours_across_dst_start() {
        let mut renderer = SliderRenderer::new(SliderLayout::default(), Stockholm);
        let mut canvas = TextCanvas::new();
        // 00:00 local on 2023-03-26; the clock jumps from 02:00 to 03:00
        let start = Utc.with_ymd_and_hms(2023, 3, 25, 23, 0, 0).unwrap();
        assert!(renderer.render(&window_from(start, 8), Some(0), &mut canvas));
        assert_eq!(canvas.label(0), Some("24"));
        assert_eq!(canvas.label(2), Some("3"));
        assert_eq!(canvas.label(5), Some("6"));
        // Slot 5 is 06:00 local, already on the day fee
        assert_eq!(canvas.slider_value(4), Some(Decimal::new(12350, 2)));
        assert_eq!(canvas.slider_value(5), Some(Decimal::new(15650, 2)));
    }
}

use super::canvas::{Canvas, Rgb};
use crate::classify::TertileWindow;
use crate::config::HistogramLayout;
use crate::prices::HourPrice;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Hourly bars colored by tertile, with a tick and hour label every few bars
#[derive(Debug)]
pub struct HistogramRenderer {
    layout: HistogramLayout,
    tz: Tz,
    last: Option<(Vec<HourPrice>, Option<u32>)>,
}

impl HistogramRenderer {
    /// Hour labels are read on the wall clock of `tz`
    pub fn new(layout: HistogramLayout, tz: Tz) -> Self {
        Self {
            layout,
            tz,
            last: None,
        }
    }

    pub fn layout(&self) -> &HistogramLayout {
        &self.layout
    }

    fn bar_x(&self, index: usize) -> i32 {
        self.layout.origin_x + (index as u32 * (self.layout.bar_width + self.layout.bar_gap)) as i32
    }

    /// Bar height in pixels; the axis starts at zero or at the lowest
    /// (negative) price, whichever is lower
    fn bar_height(&self, price: Decimal, window: &TertileWindow) -> u32 {
        let base = window.min.min(Decimal::ZERO);
        let span = window.max - base;
        if span <= Decimal::ZERO {
            return 1;
        }
        let h = (price - base) * Decimal::from(self.layout.max_bar_height) / span;
        h.round().to_u32().unwrap_or(0).clamp(1, self.layout.max_bar_height)
    }

    /// Draw the window. Returns false when it equals the last drawn state.
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

        let visible = &window[..window.len().min(self.layout.bars)];
        let tertiles = TertileWindow::new(visible.iter().map(|p| p.price()));
        let label_every = self.layout.label_every.max(1);

        for index in 0..self.layout.bars {
            let x = self.bar_x(index);
            match (visible.get(index), tertiles.as_ref()) {
                (Some(price), Some(t)) => {
                    let color = t.classify(price.price()).color();
                    canvas.set_bar(index, x, self.bar_height(price.price(), t), color);
                }
                _ => canvas.set_bar(index, x, 0, Rgb::OFF),
            }

            let labelled = index % label_every == 0;
            canvas.set_tick(index, labelled && index < visible.len());
            if labelled {
                let text = match visible.get(index) {
                    Some(price) if current_hour.is_some() => {
                        price.local_hour(&self.tz).to_string()
                    }
                    _ => String::new(),
                };
                canvas.set_label(index / label_every, &text, x, self.layout.origin_y + 12);
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

    fn window(prices: &[i64]) -> Vec<HourPrice> {
        window_from(Utc.with_ymd_and_hms(2023, 3, 9, 12, 0, 0).unwrap(), prices)
    }

    fn window_from(start: DateTime<Utc>, prices: &[i64]) -> Vec<HourPrice> {
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| HourPrice::new(start + TimeDelta::hours(i as i64), Decimal::new(*p, 2)))
            .collect()
    }

    #[test]
    fn labels_wrap_past_midnight() {
        let mut renderer = HistogramRenderer::new(HistogramLayout::default(), UTC);
        let mut canvas = TextCanvas::new();
        let start = Utc.with_ymd_and_hms(2023, 3, 9, 22, 0, 0).unwrap();
        assert!(renderer.render(&window_from(start, &[10; 18]), Some(22), &mut canvas));
        assert_eq!(canvas.label(0), Some("22"));
        assert_eq!(canvas.label(1), Some("1"));
        assert_eq!(canvas.label(5), Some("13"));
        assert!(canvas.tick(3));
        assert!(!canvas.tick(4));
    }

    #[test]
    fn unchanged_state_is_not_redrawn() {
        let mut renderer = HistogramRenderer::new(HistogramLayout::default(), UTC);
        let mut canvas = TextCanvas::new();
        let w = window(&[10, 20, 30]);
        assert!(renderer.render(&w, Some(12), &mut canvas));
        assert!(!renderer.render(&w, Some(12), &mut canvas));
        assert!(renderer.render(&w, Some(13), &mut canvas));
        assert_eq!(canvas.commits(), 2);
    }

    #[test]
    fn short_window_blanks_remaining_bars() {
        let mut renderer = HistogramRenderer::new(HistogramLayout::default(), UTC);
        let mut canvas = TextCanvas::new();
        renderer.render(&window(&[10, 20, 30, 40]), Some(0), &mut canvas);
        assert_eq!(canvas.bar_color(0), Some(Rgb::GREEN));
        assert_eq!(canvas.bar_color(3), Some(Rgb::RED));
        assert_eq!(canvas.bar_height(3), Some(90));
        assert_eq!(canvas.bar_height(4), Some(0));
        assert_eq!(canvas.bar_color(17), Some(Rgb::OFF));
        assert_eq!(canvas.label(2), Some(""));
    }

    #[test]
    fn labels_skip_the_missing_hour_on_dst_start() {
        let mut renderer = HistogramRenderer::new(HistogramLayout::default(), Stockholm);
        let mut canvas = TextCanvas::new();
        // Local midnight on 2023-03-26; 02:00 does not exist that night
        let start = Utc.with_ymd_and_hms(2023, 3, 25, 23, 0, 0).unwrap();
        assert!(renderer.render(&window_from(start, &[10; 18]), Some(0), &mut canvas));
        assert_eq!(canvas.label(0), Some("0"));
        assert_eq!(canvas.label(1), Some("4"));
        assert_eq!(canvas.label(2), Some("7"));
    }
}

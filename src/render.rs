//! Display rendering
//!
//! Two renderer variants share the same input, the situation's window of
//! upcoming prices, and draw through the [`Canvas`] trait. Both skip the
//! redraw when neither the window nor the current hour changed.

pub mod canvas;
pub mod histogram;
pub mod slider;

pub use canvas::{Canvas, Rgb, TextCanvas};
pub use histogram::HistogramRenderer;
pub use slider::{SliderRenderer, hour_label};

use crate::config::{DisplayConfig, DisplayVariant};
use crate::situation::Situation;
use chrono_tz::Tz;

#[derive(Debug)]
pub enum Renderer {
    Histogram(HistogramRenderer),
    Slider(SliderRenderer),
}

impl Renderer {
    /// `tz` is the zone the hour labels and fee table refer to
    pub fn from_config(config: &DisplayConfig, tz: Tz) -> Self {
        match config.variant {
            DisplayVariant::Histogram => {
                Renderer::Histogram(HistogramRenderer::new(config.histogram.clone(), tz))
            }
            DisplayVariant::Slider => {
                Renderer::Slider(SliderRenderer::new(config.slider.clone(), tz))
            }
        }
    }

    /// Returns whether a frame was committed
    pub fn render(&mut self, situation: &Situation, canvas: &mut dyn Canvas) -> bool {
        match self {
            Renderer::Histogram(r) => r.render(&situation.window, situation.current_hour, canvas),
            Renderer::Slider(r) => r.render(&situation.window, situation.current_hour, canvas),
        }
    }
}

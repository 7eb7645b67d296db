use crate::logging::{StructuredLogger, get_logger};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 200, 0);
    pub const ORANGE: Rgb = Rgb::new(255, 140, 0);
    pub const RED: Rgb = Rgb::new(220, 0, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const DIM_WHITE: Rgb = Rgb::new(40, 40, 40);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels scaled to `[0, max]`
    pub fn scaled(&self, max: u32) -> [u32; 3] {
        [self.r, self.g, self.b].map(|c| c as u32 * max / 255)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Narrow drawing interface the renderers talk to.
///
/// Elements are addressed by index and keep their state until changed;
/// nothing becomes visible before `commit`.
pub trait Canvas: Send {
    fn set_bar(&mut self, index: usize, x: i32, height: u32, color: Rgb);
    fn set_tick(&mut self, index: usize, visible: bool);
    fn set_label(&mut self, index: usize, text: &str, x: i32, y: i32);
    /// `fill` is the gauge level in `[0, 1]`
    fn set_slider(&mut self, index: usize, value: Decimal, fill: f32, color: Rgb);
    fn commit(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
struct Bar {
    x: i32,
    height: u32,
    color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
struct Label {
    text: String,
    x: i32,
    y: i32,
}

#[derive(Debug, Clone, PartialEq)]
struct Slider {
    value: Decimal,
    fill: f32,
    color: Rgb,
}

/// Headless canvas that renders frames as text and logs them.
///
/// Used when no panel is attached and in tests.
#[derive(Debug)]
pub struct TextCanvas {
    bars: BTreeMap<usize, Bar>,
    ticks: BTreeMap<usize, bool>,
    labels: BTreeMap<usize, Label>,
    sliders: BTreeMap<usize, Slider>,
    last_frame: String,
    commits: usize,
    logger: StructuredLogger,
}

impl Default for TextCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl TextCanvas {
    pub fn new() -> Self {
        Self {
            bars: BTreeMap::new(),
            ticks: BTreeMap::new(),
            labels: BTreeMap::new(),
            sliders: BTreeMap::new(),
            last_frame: String::new(),
            commits: 0,
            logger: get_logger("display"),
        }
    }

    pub fn last_frame(&self) -> &str {
        &self.last_frame
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn bar_color(&self, index: usize) -> Option<Rgb> {
        self.bars.get(&index).map(|b| b.color)
    }

    pub fn bar_height(&self, index: usize) -> Option<u32> {
        self.bars.get(&index).map(|b| b.height)
    }

    pub fn tick(&self, index: usize) -> bool {
        self.ticks.get(&index).copied().unwrap_or(false)
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(&index).map(|l| l.text.as_str())
    }

    pub fn slider_value(&self, index: usize) -> Option<Decimal> {
        self.sliders.get(&index).map(|s| s.value)
    }

    pub fn slider_color(&self, index: usize) -> Option<Rgb> {
        self.sliders.get(&index).map(|s| s.color)
    }

    fn compose(&self) -> String {
        let mut lines = Vec::new();
        for (i, bar) in &self.bars {
            let tick = if self.tick(*i) { "|" } else { " " };
            lines.push(format!(
                "bar {:>2} {} x={:<4} h={:<3} {}",
                i, tick, bar.x, bar.height, bar.color
            ));
        }
        for (i, slider) in &self.sliders {
            lines.push(format!(
                "slider {:>2} {:>8} {:>3}% {}",
                i,
                slider.value.round_dp(1),
                (slider.fill * 100.0).round() as u32,
                slider.color
            ));
        }
        for (i, label) in &self.labels {
            if !label.text.is_empty() {
                lines.push(format!(
                    "label {:>2} ({},{}) {}",
                    i, label.x, label.y, label.text
                ));
            }
        }
        lines.join("\n")
    }
}

impl Canvas for TextCanvas {
    fn set_bar(&mut self, index: usize, x: i32, height: u32, color: Rgb) {
        self.bars.insert(index, Bar { x, height, color });
    }

    fn set_tick(&mut self, index: usize, visible: bool) {
        self.ticks.insert(index, visible);
    }

    fn set_label(&mut self, index: usize, text: &str, x: i32, y: i32) {
        self.labels.insert(
            index,
            Label {
                text: text.to_string(),
                x,
                y,
            },
        );
    }

    fn set_slider(&mut self, index: usize, value: Decimal, fill: f32, color: Rgb) {
        self.sliders.insert(
            index,
            Slider {
                value,
                fill: fill.clamp(0.0, 1.0),
                color,
            },
        );
    }

    fn commit(&mut self) {
        self.last_frame = self.compose();
        self.commits += 1;
        self.logger
            .trace(&format!("Frame {}:\n{}", self.commits, self.last_frame));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_scales_and_prints_hex() {
        assert_eq!(Rgb::ORANGE.to_string(), "#ff8c00");
        assert_eq!(Rgb::new(255, 0, 51).scaled(1), [1, 0, 0]);
        assert_eq!(Rgb::new(255, 0, 51).scaled(255), [255, 0, 51]);
    }

    #[test]
    fn commit_snapshots_elements() {
        let mut canvas = TextCanvas::new();
        canvas.set_bar(0, 8, 40, Rgb::GREEN);
        canvas.set_tick(0, true);
        canvas.set_label(0, "13", 8, 132);
        assert_eq!(canvas.last_frame(), "");
        canvas.commit();
        assert_eq!(canvas.commits(), 1);
        assert!(canvas.last_frame().contains("bar  0 | x=8"));
        assert!(canvas.last_frame().contains("#00c800"));
        assert!(canvas.last_frame().contains("13"));
    }
}

use std::f32::consts::TAU;

use crate::assistant::DisplayState;
use crate::canvas::{Canvas, Color, Gradient, Point, Rect};
use crate::config::VisualizerConfig;

/// How many full sine periods the wave spans across the surface
const WAVE_CYCLES: f32 = 2.0;
const WAVE_STROKE_WIDTH: f32 = 2.0;

/// Which rendering the frame loop produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualStyle {
    /// One gradient bar per frequency bin
    Bars,
    /// A stroked wave whose amplitude follows the captured volume
    Wave,
}

/// Turns the latest snapshot into draw calls
pub struct Scene {
    style: VisualStyle,
    config: VisualizerConfig,
    /// Stroke color of the wave; assistant mode re-tints this per display state
    pub tint: Color,
}

impl Scene {
    pub fn bars(config: VisualizerConfig) -> Self {
        Self {
            style: VisualStyle::Bars,
            config,
            tint: Color::WHITE,
        }
    }

    pub fn wave(config: VisualizerConfig) -> Self {
        Self {
            style: VisualStyle::Wave,
            config,
            tint: state_color(DisplayState::Listening),
        }
    }

    pub fn style(&self) -> VisualStyle {
        self.style
    }

    /// Clears the surface and redraws it from the snapshot and phase
    pub fn draw(&self, canvas: &mut dyn Canvas, snapshot: &[u8], phase: f32) {
        canvas.clear();
        match self.style {
            VisualStyle::Bars => self.draw_bars(canvas, snapshot),
            VisualStyle::Wave => self.draw_wave(canvas, snapshot, phase),
        }
    }

    fn draw_bars(&self, canvas: &mut dyn Canvas, snapshot: &[u8]) {
        if snapshot.is_empty() {
            return;
        }
        let (width, height) = canvas.size();
        let gradient = Gradient {
            top: self.config.gradient_top.into(),
            bottom: self.config.gradient_bottom.into(),
        };

        let bar_width = width / snapshot.len() as f32;
        let gap = bar_width * self.config.bar_gap_ratio;
        let mut x = 0.0;

        for &byte in snapshot {
            let bar_height = byte as f32 / 255.0 * height;
            canvas.fill_rect(
                Rect {
                    x,
                    y: height - bar_height,
                    w: (bar_width - gap).max(1.0),
                    h: bar_height,
                },
                gradient,
            );
            x += bar_width;
        }
    }

    fn draw_wave(&self, canvas: &mut dyn Canvas, snapshot: &[u8], phase: f32) {
        if snapshot.len() < 2 {
            return;
        }
        let (width, height) = canvas.size();
        let mid = height / 2.0;
        let amplitude = mean_amplitude(snapshot) * self.config.wave_amplitude * mid;

        let last = (snapshot.len() - 1) as f32;
        let points: Vec<Point> = (0..snapshot.len())
            .map(|i| {
                let t = i as f32 / last;
                Point {
                    x: t * width,
                    y: mid + amplitude * (phase + t * WAVE_CYCLES * TAU).sin(),
                }
            })
            .collect();

        canvas.stroke_polyline(&points, self.tint, WAVE_STROKE_WIDTH);
    }
}

/// Mean amplitude of a snapshot, normalized to 0.0-1.0
pub fn mean_amplitude(snapshot: &[u8]) -> f32 {
    if snapshot.is_empty() {
        return 0.0;
    }
    let sum: u32 = snapshot.iter().map(|&b| b as u32).sum();
    sum as f32 / snapshot.len() as f32 / 255.0
}

/// Color signalling the current cycle state
pub fn state_color(state: DisplayState) -> Color {
    match state {
        DisplayState::Listening => Color::rgba(0.92, 0.55, 0.55, 1.0),
        DisplayState::Processing => Color::rgba(0.95, 0.78, 0.35, 1.0),
        DisplayState::Speaking => Color::rgba(0.45, 0.68, 0.95, 1.0),
    }
}

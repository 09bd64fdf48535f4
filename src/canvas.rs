/// An RGBA color with components in 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[f32; 4]> for Color {
    fn from(c: [f32; 4]) -> Self {
        Self::rgba(c[0], c[1], c[2], c[3])
    }
}

/// A vertical gradient, top color at y, bottom color at y + h
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gradient {
    pub top: Color,
    pub bottom: Color,
}

impl Gradient {
    pub fn solid(color: Color) -> Self {
        Self {
            top: color,
            bottom: color,
        }
    }
}

/// A rectangle in surface pixels, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Immediate-mode drawing surface
///
/// The render loop issues one clear followed by fills/strokes per frame;
/// implementations batch however they like. Coordinates are in surface
/// pixels with the origin at the top-left.
pub trait Canvas {
    /// Surface size in pixels as (width, height)
    fn size(&self) -> (f32, f32);
    /// Wipes the previous frame's content
    fn clear(&mut self);
    /// Fills a rectangle with a vertical gradient
    fn fill_rect(&mut self, rect: Rect, gradient: Gradient);
    /// Strokes an open polyline
    fn stroke_polyline(&mut self, points: &[Point], color: Color, width: f32);
}

#[cfg(test)]
pub(crate) mod spy {
    use super::*;

    /// Records draw calls for assertions in render tests
    #[derive(Debug, Clone, PartialEq)]
    pub enum DrawCall {
        Clear,
        Rect { rect: Rect, gradient: Gradient },
        Polyline { points: Vec<Point>, color: Color },
    }

    pub struct RecordingCanvas {
        pub width: f32,
        pub height: f32,
        pub calls: Vec<DrawCall>,
    }

    impl RecordingCanvas {
        pub fn new(width: f32, height: f32) -> Self {
            Self {
                width,
                height,
                calls: Vec::new(),
            }
        }

        pub fn rects(&self) -> Vec<Rect> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    DrawCall::Rect { rect, .. } => Some(*rect),
                    _ => None,
                })
                .collect()
        }

        pub fn clear_count(&self) -> usize {
            self.calls
                .iter()
                .filter(|c| matches!(c, DrawCall::Clear))
                .count()
        }
    }

    impl Canvas for RecordingCanvas {
        fn size(&self) -> (f32, f32) {
            (self.width, self.height)
        }

        fn clear(&mut self) {
            self.calls.push(DrawCall::Clear);
        }

        fn fill_rect(&mut self, rect: Rect, gradient: Gradient) {
            self.calls.push(DrawCall::Rect { rect, gradient });
        }

        fn stroke_polyline(&mut self, points: &[Point], color: Color, _width: f32) {
            self.calls.push(DrawCall::Polyline {
                points: points.to_vec(),
                color,
            });
        }
    }
}

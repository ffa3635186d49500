//! Drawing surface abstraction.

use arcanvas_core::{CanvasMatrix, LightFilter};
use kurbo::{BezPath, Cap, Point, Rect, Stroke};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Whether a primitive is filled or outlined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaintStyle {
    #[default]
    Fill,
    Stroke,
}

/// How a primitive is painted.
#[derive(Debug, Clone)]
pub struct Paint {
    pub color: Color,
    pub style: PaintStyle,
    /// Stroke width, and the side length of a drawn point.
    pub stroke_width: f64,
    pub cap: Cap,
    pub text_size: f64,
    pub light_filter: Option<LightFilter>,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            style: PaintStyle::Fill,
            stroke_width: 0.0,
            cap: Cap::Butt,
            text_size: 12.0,
            light_filter: None,
        }
    }
}

impl Paint {
    pub fn fill(color: Color) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    pub fn stroke(color: Color, width: f64) -> Self {
        Self {
            color,
            style: PaintStyle::Stroke,
            stroke_width: width,
            ..Self::default()
        }
    }

    pub fn with_cap(mut self, cap: Cap) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_text_size(mut self, size: f64) -> Self {
        self.text_size = size;
        self
    }

    pub fn with_light_filter(mut self, filter: Option<LightFilter>) -> Self {
        self.light_filter = filter;
        self
    }

    /// Color after the light filter.
    pub fn effective_color(&self) -> Color {
        match self.light_filter {
            Some(filter) => filter.apply(self.color),
            None => self.color,
        }
    }

    /// Stroke description for kurbo/vello.
    pub fn kurbo_stroke(&self) -> Stroke {
        Stroke::new(self.stroke_width).with_caps(self.cap)
    }
}

/// A 2D target that draw calls render into.
///
/// The surface keeps a current [`CanvasMatrix`]. `set_transform` replaces it
/// outright; `save` and `restore` push and pop it.
pub trait DrawSurface {
    fn save(&mut self);

    /// Pop the last saved transform. Ignored when nothing is saved.
    fn restore(&mut self);

    fn set_transform(&mut self, transform: CanvasMatrix);

    fn transform(&self) -> CanvasMatrix;

    fn draw_circle(&mut self, center: Point, radius: f64, paint: &Paint);

    fn draw_round_rect(&mut self, rect: Rect, radius_x: f64, radius_y: f64, paint: &Paint);

    fn draw_rect(&mut self, rect: Rect, paint: &Paint);

    /// Draw `text` with its baseline starting at `origin`.
    fn draw_text(&mut self, text: &str, origin: Point, paint: &Paint);

    fn draw_path(&mut self, path: &BezPath, paint: &Paint);

    /// Draw each point as a dot of `paint.stroke_width`, shaped by `paint.cap`.
    fn draw_points(&mut self, points: &[Point], paint: &Paint);
}

/// Save/restore stack shared by the surface implementations.
#[derive(Debug, Clone, Default)]
pub(crate) struct TransformStack {
    current: CanvasMatrix,
    saved: Vec<CanvasMatrix>,
}

impl TransformStack {
    pub fn save(&mut self) {
        self.saved.push(self.current);
    }

    pub fn restore(&mut self) {
        match self.saved.pop() {
            Some(previous) => self.current = previous,
            None => log::warn!("restore() without matching save()"),
        }
    }

    pub fn set(&mut self, transform: CanvasMatrix) {
        self.current = transform;
    }

    pub fn current(&self) -> CanvasMatrix {
        self.current
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn reset(&mut self) {
        self.current = CanvasMatrix::IDENTITY;
        self.saved.clear();
    }
}

//! A surface that records draw calls instead of rasterizing them.

use crate::renderer::{DrawSurface, Paint, TransformStack};
use arcanvas_core::CanvasMatrix;
use kurbo::{BezPath, Point, Rect};

/// Geometry of a recorded draw call, in the caller's local coordinates.
#[derive(Debug, Clone)]
pub enum Primitive {
    Circle { center: Point, radius: f64 },
    RoundRect { rect: Rect, radius_x: f64, radius_y: f64 },
    Rect(Rect),
    Text { text: String, origin: Point },
    Path(BezPath),
    Points(Vec<Point>),
}

/// One recorded draw call with the transform that was active for it.
#[derive(Debug, Clone)]
pub struct DrawCommand {
    pub transform: CanvasMatrix,
    pub primitive: Primitive,
    pub paint: Paint,
}

impl DrawCommand {
    /// Map a local point through the recorded transform.
    pub fn map_point(&self, p: Point) -> Option<Point> {
        self.transform.map_point(p)
    }
}

/// Surface that keeps every draw call for later inspection or replay.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    stack: TransformStack,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Number of saves not yet restored.
    pub fn save_depth(&self) -> usize {
        self.stack.depth()
    }

    /// Drop recorded commands and reset the transform.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.stack.reset();
    }

    /// Play the recorded commands into another surface.
    pub fn replay(&self, target: &mut dyn DrawSurface) {
        for command in &self.commands {
            target.save();
            target.set_transform(command.transform);
            match &command.primitive {
                Primitive::Circle { center, radius } => target.draw_circle(*center, *radius, &command.paint),
                Primitive::RoundRect { rect, radius_x, radius_y } => {
                    target.draw_round_rect(*rect, *radius_x, *radius_y, &command.paint)
                }
                Primitive::Rect(rect) => target.draw_rect(*rect, &command.paint),
                Primitive::Text { text, origin } => target.draw_text(text, *origin, &command.paint),
                Primitive::Path(path) => target.draw_path(path, &command.paint),
                Primitive::Points(points) => target.draw_points(points, &command.paint),
            }
            target.restore();
        }
    }

    fn record(&mut self, primitive: Primitive, paint: &Paint) {
        self.commands.push(DrawCommand {
            transform: self.stack.current(),
            primitive,
            paint: paint.clone(),
        });
    }
}

impl DrawSurface for RecordingSurface {
    fn save(&mut self) {
        self.stack.save();
    }

    fn restore(&mut self) {
        self.stack.restore();
    }

    fn set_transform(&mut self, transform: CanvasMatrix) {
        self.stack.set(transform);
    }

    fn transform(&self) -> CanvasMatrix {
        self.stack.current()
    }

    fn draw_circle(&mut self, center: Point, radius: f64, paint: &Paint) {
        self.record(Primitive::Circle { center, radius }, paint);
    }

    fn draw_round_rect(&mut self, rect: Rect, radius_x: f64, radius_y: f64, paint: &Paint) {
        self.record(Primitive::RoundRect { rect, radius_x, radius_y }, paint);
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        self.record(Primitive::Rect(rect), paint);
    }

    fn draw_text(&mut self, text: &str, origin: Point, paint: &Paint) {
        self.record(
            Primitive::Text {
                text: text.to_string(),
                origin,
            },
            paint,
        );
    }

    fn draw_path(&mut self, path: &BezPath, paint: &Paint) {
        self.record(Primitive::Path(path.clone()), paint);
    }

    fn draw_points(&mut self, points: &[Point], paint: &Paint) {
        self.record(Primitive::Points(points.to_vec()), paint);
    }
}

//! Finger painting strokes anchored in the AR scene.

use kurbo::{BezPath, Point};
use peniko::Color;
use ultraviolet::Mat4;

/// A stroke being captured from touch input.
#[derive(Debug, Clone)]
struct Stroke {
    points: Vec<Point>,
    color: Color,
}

/// A stroke converted to a path, ready to draw.
#[derive(Debug, Clone)]
pub struct BuiltPath {
    pub path: BezPath,
    pub color: Color,
}

/// Collects touch strokes and turns them into paths.
///
/// Points are in surface units on the painting plane; the renderer scales
/// them into world space and places them at the anchor given by the model
/// matrix.
#[derive(Debug, Clone)]
pub struct FingerPainting {
    smooth: bool,
    model_matrix: Mat4,
    strokes: Vec<Stroke>,
    active: bool,
    built: Vec<BuiltPath>,
}

impl Default for FingerPainting {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FingerPainting {
    pub fn new(smooth: bool) -> Self {
        Self {
            smooth,
            model_matrix: Mat4::identity(),
            strokes: Vec::new(),
            active: false,
            built: Vec::new(),
        }
    }

    pub fn is_smooth(&self) -> bool {
        self.smooth
    }

    pub fn set_smooth(&mut self, smooth: bool) {
        self.smooth = smooth;
    }

    /// Anchor of the painting in world space.
    pub fn model_matrix(&self) -> Mat4 {
        self.model_matrix
    }

    pub fn set_model_matrix(&mut self, model: Mat4) {
        self.model_matrix = model;
    }

    /// Start a new stroke at `point`.
    pub fn begin_stroke(&mut self, point: Point, color: Color) {
        self.strokes.push(Stroke {
            points: vec![point],
            color,
        });
        self.active = true;
    }

    /// Extend the current stroke. Ignored when no stroke is active.
    pub fn add_point(&mut self, point: Point) {
        if !self.active {
            return;
        }
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.points.push(point);
        }
    }

    pub fn end_stroke(&mut self) {
        self.active = false;
    }

    /// Drop all strokes and built paths.
    pub fn reset(&mut self) {
        self.strokes.clear();
        self.built.clear();
        self.active = false;
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Rebuild one path per stroke.
    pub fn build_path(&mut self) {
        let smooth = self.smooth;
        self.built = self
            .strokes
            .iter()
            .map(|stroke| BuiltPath {
                path: if smooth {
                    smooth_path(&stroke.points)
                } else {
                    polyline_path(&stroke.points)
                },
                color: stroke.color,
            })
            .collect();
    }

    /// Paths from the last [`FingerPainting::build_path`] call.
    pub fn paths(&self) -> &[BuiltPath] {
        &self.built
    }
}

fn polyline_path(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let Some((first, rest)) = points.split_first() else {
        return path;
    };
    path.move_to(*first);
    if rest.is_empty() {
        // A tap still leaves a dot.
        path.line_to(*first);
    }
    for point in rest {
        path.line_to(*point);
    }
    path
}

/// Quadratic segments through stroke midpoints, using the captured points as
/// control points.
fn smooth_path(points: &[Point]) -> BezPath {
    if points.len() < 3 {
        return polyline_path(points);
    }
    let mut path = BezPath::new();
    path.move_to(points[0]);
    for window in points[1..].windows(2) {
        let control = window[0];
        let mid = control.midpoint(window[1]);
        path.quad_to(control, mid);
    }
    path.line_to(points[points.len() - 1]);
    path
}

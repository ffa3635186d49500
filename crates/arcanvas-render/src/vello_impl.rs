//! Vello-backed drawing surface.

use crate::renderer::{DrawSurface, Paint, PaintStyle, TransformStack};
use arcanvas_core::CanvasMatrix;
use kurbo::{Affine, BezPath, Cap, Circle, PathEl, Point, Rect, RoundedRect, Shape as KurboShape, StrokeOpts};
use parley::layout::{GlyphRun, PositionedLayoutItem};
use parley::{FontContext, LayoutContext, StyleProperty};
use peniko::{Brush, Fill};
use std::sync::Arc;
use vello::Scene;

/// Target flattening error in pixels.
const PIXEL_TOLERANCE: f64 = 0.25;

/// Builds a Vello scene from draw calls.
///
/// Affine transforms go straight to Vello. Perspective transforms cannot, so
/// geometry is stroked and flattened in local space and every vertex is
/// projected to pixels before filling.
pub struct VelloSurface {
    scene: Scene,
    stack: TransformStack,
    font_cx: FontContext,
    layout_cx: LayoutContext<Brush>,
    font_family: Option<String>,
}

impl Default for VelloSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl VelloSurface {
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            stack: TransformStack::default(),
            font_cx: FontContext::new(),
            layout_cx: LayoutContext::new(),
            font_family: None,
        }
    }

    /// Register font data and use its family for text. Returns the family name
    /// when the data contained a font.
    pub fn register_font(&mut self, data: Vec<u8>) -> Option<String> {
        let fonts = self
            .font_cx
            .collection
            .register_fonts(vello::peniko::Blob::new(Arc::new(data)), None);
        let family = fonts
            .first()
            .and_then(|(id, _)| self.font_cx.collection.family_name(*id))
            .map(str::to_string);
        if family.is_some() {
            self.font_family = family.clone();
        }
        family
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        self.stack.reset();
        std::mem::take(&mut self.scene)
    }

    /// Encode one shaped run. Returns the number of glyphs drawn.
    fn draw_glyph_run(&mut self, glyph_run: &GlyphRun<'_, Brush>, brush: &Brush, transform: Affine) -> usize {
        let run = glyph_run.run();
        let baseline = glyph_run.baseline();
        let glyphs: Vec<vello::Glyph> = glyph_run
            .glyphs()
            .scan(glyph_run.offset(), |pen, glyph| {
                let placed = vello::Glyph {
                    id: glyph.id,
                    x: *pen + glyph.x,
                    y: baseline - glyph.y,
                };
                *pen += glyph.advance;
                Some(placed)
            })
            .collect();
        if glyphs.is_empty() {
            return 0;
        }
        let count = glyphs.len();
        let skew = run
            .synthesis()
            .skew()
            .map(|angle| Affine::skew(f64::from(angle.to_radians().tan()), 0.0));
        self.scene
            .draw_glyphs(run.font())
            .brush(brush)
            .hint(false)
            .transform(transform)
            .glyph_transform(skew)
            .font_size(run.font_size())
            .normalized_coords(run.normalized_coords())
            .draw(Fill::NonZero, glyphs.into_iter());
        count
    }

    /// Fill or stroke `shape` under the current transform.
    fn render(&mut self, shape: BezPath, paint: &Paint) {
        let color = paint.effective_color();
        let transform = self.stack.current();

        if let Some(affine) = transform.to_affine() {
            match paint.style {
                PaintStyle::Fill => self.scene.fill(Fill::NonZero, affine, color, None, &shape),
                PaintStyle::Stroke => self.scene.stroke(&paint.kurbo_stroke(), affine, color, None, &shape),
            }
            return;
        }

        let anchor = first_point(&shape).unwrap_or(Point::ZERO);
        let tolerance = local_tolerance(&transform, anchor);
        let outline = match paint.style {
            PaintStyle::Fill => shape,
            PaintStyle::Stroke => kurbo::stroke(shape.iter(), &paint.kurbo_stroke(), &StrokeOpts::default(), tolerance),
        };
        let projected = project_path(&outline, &transform, tolerance);
        if projected.elements().is_empty() {
            return;
        }
        self.scene.fill(Fill::NonZero, Affine::IDENTITY, color, None, &projected);
    }
}

impl DrawSurface for VelloSurface {
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
        let tolerance = local_tolerance(&self.stack.current(), center);
        self.render(Circle::new(center, radius).to_path(tolerance), paint);
    }

    fn draw_round_rect(&mut self, rect: Rect, radius_x: f64, radius_y: f64, paint: &Paint) {
        // Kurbo corners are circular; use the smaller radius.
        let radius = radius_x.min(radius_y).max(0.0);
        let tolerance = local_tolerance(&self.stack.current(), rect.origin());
        self.render(RoundedRect::from_rect(rect, radius).to_path(tolerance), paint);
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        self.render(rect.to_path(0.1), paint);
    }

    fn draw_text(&mut self, text: &str, origin: Point, paint: &Paint) {
        if text.is_empty() {
            return;
        }
        // Glyphs need an affine transform; under perspective use the local
        // approximation at the text origin.
        let Some(transform) = self.stack.current().local_affine_at(origin) else {
            return;
        };
        let brush = Brush::Solid(paint.effective_color());

        let mut builder = self.layout_cx.ranged_builder(&mut self.font_cx, text, 1.0, false);
        builder.push_default(StyleProperty::FontSize(paint.text_size as f32));
        builder.push_default(StyleProperty::Brush(brush.clone()));
        let stack = match &self.font_family {
            Some(name) => parley::FontStack::Single(parley::FontFamily::Named(name.as_str().into())),
            None => parley::FontStack::Single(parley::FontFamily::Generic(parley::GenericFamily::SansSerif)),
        };
        builder.push_default(StyleProperty::FontStack(stack));
        let mut layout = builder.build(text);
        layout.break_all_lines(None);
        layout.align(None, parley::Alignment::Start, parley::AlignmentOptions::default());

        // Parley puts y = 0 at the top of the layout; `origin` is the baseline.
        let baseline = layout
            .lines()
            .next()
            .map(|line| line.metrics().baseline as f64)
            .unwrap_or(0.0);
        let text_transform = transform * Affine::translate((origin.x, origin.y - baseline));

        let mut glyph_count = 0;
        for line in layout.lines() {
            for item in line.items() {
                if let PositionedLayoutItem::GlyphRun(glyph_run) = item {
                    glyph_count += self.draw_glyph_run(&glyph_run, &brush, text_transform);
                }
            }
        }
        if glyph_count == 0 {
            log::trace!("No glyphs rendered for {:?}; is a font registered?", text);
        }
    }

    fn draw_path(&mut self, path: &BezPath, paint: &Paint) {
        self.render(path.clone(), paint);
    }

    fn draw_points(&mut self, points: &[Point], paint: &Paint) {
        let size = paint.stroke_width.max(1.0);
        let mut dots = BezPath::new();
        for &point in points {
            match paint.cap {
                Cap::Round => dots.extend(Circle::new(point, size / 2.0).path_elements(0.1)),
                Cap::Butt | Cap::Square => dots.extend(Rect::from_center_size(point, (size, size)).path_elements(0.1)),
            }
        }
        let fill = Paint {
            style: PaintStyle::Fill,
            ..paint.clone()
        };
        self.render(dots, &fill);
    }
}

fn first_point(path: &BezPath) -> Option<Point> {
    path.elements().iter().find_map(|el| match el {
        PathEl::MoveTo(p) => Some(*p),
        _ => None,
    })
}

/// Local-space tolerance that keeps flattening error near
/// [`PIXEL_TOLERANCE`] once projected.
fn local_tolerance(transform: &CanvasMatrix, anchor: Point) -> f64 {
    let scale = transform
        .local_affine_at(anchor)
        .map(|affine| affine.determinant().abs().sqrt())
        .filter(|s| s.is_finite() && *s > f64::EPSILON)
        .unwrap_or(1.0);
    PIXEL_TOLERANCE / scale
}

/// Flatten `path` and map every vertex through `transform`.
///
/// Each line is clipped against `w = NEAR_W` before the divide, so geometry
/// behind the camera is cut off instead of landing mirrored. A subpath that
/// leaves and re-enters the visible side is joined along the clip line.
fn project_path(path: &BezPath, transform: &CanvasMatrix, tolerance: f64) -> BezPath {
    let mut clipper = NearClipper::new(transform);
    kurbo::flatten(path.iter(), tolerance, |el| match el {
        PathEl::MoveTo(p) => clipper.move_to(p),
        PathEl::LineTo(p) => clipper.line_to(p),
        PathEl::ClosePath => clipper.close(),
        // flatten only emits lines
        PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
    });
    clipper.out
}

/// Smallest `w` kept when clipping.
const NEAR_W: f64 = 1e-3;

struct NearClipper<'a> {
    transform: &'a CanvasMatrix,
    out: BezPath,
    start: Option<Point>,
    prev: Option<Point>,
    started: bool,
}

impl<'a> NearClipper<'a> {
    fn new(transform: &'a CanvasMatrix) -> Self {
        Self {
            transform,
            out: BezPath::new(),
            start: None,
            prev: None,
            started: false,
        }
    }

    fn visible(&self, p: Point) -> bool {
        self.transform.w_at(p) >= NEAR_W
    }

    fn move_to(&mut self, p: Point) {
        self.start = Some(p);
        self.prev = Some(p);
        self.started = false;
        if self.visible(p) {
            self.emit(p);
        }
    }

    fn line_to(&mut self, p: Point) {
        let Some(a) = self.prev else {
            self.move_to(p);
            return;
        };
        let (a_in, b_in) = (self.visible(a), self.visible(p));
        if a_in != b_in {
            self.emit(self.crossing(a, p));
        }
        if b_in {
            self.emit(p);
        }
        self.prev = Some(p);
    }

    fn close(&mut self) {
        if let Some(start) = self.start {
            self.line_to(start);
        }
        if self.started {
            self.out.close_path();
        }
        self.started = false;
    }

    /// Point on `a..b` where `w` equals `NEAR_W`.
    fn crossing(&self, a: Point, b: Point) -> Point {
        let wa = self.transform.w_at(a);
        let wb = self.transform.w_at(b);
        a.lerp(b, (NEAR_W - wa) / (wb - wa))
    }

    fn emit(&mut self, p: Point) {
        let Some(q) = self.transform.map_point(p) else {
            return;
        };
        if self.started {
            self.out.line_to(q);
        } else {
            self.out.move_to(q);
            self.started = true;
        }
    }
}

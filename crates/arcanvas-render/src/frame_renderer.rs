//! Draws AR content onto a [`DrawSurface`] using the matrices of one frame.
//!
//! Every draw call follows the same steps: pick a model matrix, compose
//! `locals → model → view → projection → viewport`, set the composed matrix on
//! the surface (replacing whatever was there), draw, and restore. Missing
//! input makes a call a no-op rather than an error.

use crate::renderer::{DrawSurface, Paint, RenderResult};
use crate::shader::PlaneShader;
use arcanvas_core::matrix::{
    text_scale_matrix, transform_point, translation, translation_of, uniform_scale, xy_to_xz_rotation,
};
use arcanvas_core::{
    distance_to_plane, CanvasMatrix, DrawingType, FingerPainting, FrameContext, PointCloud, Pose,
    RendererConfig, TrackedPlane, TrackingState,
};
use kurbo::{BezPath, Cap, Point, Rect};
use std::path::Path;
use ultraviolet::{Mat4, Vec4};

/// Renders the demo drawables, finger painting, point cloud and planes.
#[derive(Debug, Clone, Default)]
pub struct FrameRenderer {
    config: RendererConfig,
    plane_shader: Option<PlaneShader>,
}

impl FrameRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RendererConfig) -> Self {
        Self {
            config,
            plane_shader: None,
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RendererConfig {
        &mut self.config
    }

    /// Load the plane grid texture. I/O failures are returned to the caller.
    pub fn initialize_plane_shader(&mut self, texture_path: &Path) -> RenderResult<()> {
        self.plane_shader = Some(PlaneShader::from_path(texture_path)?);
        Ok(())
    }

    pub fn plane_shader(&self) -> Option<&PlaneShader> {
        self.plane_shader.as_ref()
    }

    /// Empty painting using the configured smoothing.
    pub fn new_finger_painting(&self) -> FingerPainting {
        FingerPainting::new(self.config.smooth_painting)
    }

    /// Draw whichever drawable the config selects at the primary anchor.
    ///
    /// `text` is used by [`DrawingType::Text`], `radius` by
    /// [`DrawingType::Animation`].
    pub fn draw_current_drawable(&self, frame: &FrameContext, surface: &mut dyn DrawSurface, text: &str, radius: f64) {
        match self.config.drawing_type {
            DrawingType::Circle => self.draw_circle(frame, surface),
            DrawingType::Rect => self.draw_rect(frame, surface),
            DrawingType::Text => self.draw_text(frame, surface, text),
            DrawingType::Animation => self.draw_animated_round_rect(frame, surface, radius),
        }
    }

    pub fn draw_circle(&self, frame: &FrameContext, surface: &mut dyn DrawSurface) {
        let Some(model) = frame.primary_model_matrix() else {
            return;
        };
        let style = &self.config.style;
        let paint = Paint::fill(style.circle_color.into()).with_light_filter(frame.light_filter());
        let transform = frame.compose_with(&[], model);
        draw_with_transform(surface, &transform, |s| {
            s.draw_circle(Point::ZERO, style.circle_radius, &paint);
        });
    }

    /// Rounded rectangle whose corner radius the host changes over time.
    pub fn draw_animated_round_rect(&self, frame: &FrameContext, surface: &mut dyn DrawSurface, radius: f64) {
        let Some(model) = frame.primary_model_matrix() else {
            return;
        };
        let style = &self.config.style;
        let paint = Paint::fill(style.round_rect_color.into()).with_light_filter(frame.light_filter());
        let rect = Rect::new(0.0, 0.0, style.round_rect_size, style.round_rect_size);
        let transform = frame.compose_with(&[], model);
        draw_with_transform(surface, &transform, |s| {
            s.draw_round_rect(rect, radius, radius, &paint);
        });
    }

    pub fn draw_rect(&self, frame: &FrameContext, surface: &mut dyn DrawSurface) {
        let Some(model) = frame.primary_model_matrix() else {
            return;
        };
        let style = &self.config.style;
        let paint = Paint::fill(style.rect_color.into()).with_light_filter(frame.light_filter());
        let rect = Rect::new(0.0, 0.0, style.rect_size, style.rect_size);
        let transform = frame.compose_with(&[], model);
        draw_with_transform(surface, &transform, |s| {
            s.draw_rect(rect, &paint);
        });
    }

    /// Text lying flat on the anchor's ground plane.
    pub fn draw_text(&self, frame: &FrameContext, surface: &mut dyn DrawSurface, text: &str) {
        let Some(model) = frame.primary_model_matrix() else {
            return;
        };
        if text.is_empty() {
            return;
        }
        let style = &self.config.style;
        let paint = Paint::fill(style.text_color.into())
            .with_text_size(style.text_size)
            .with_light_filter(frame.light_filter());
        let locals = [text_scale_matrix(style.text_size as f32), xy_to_xz_rotation()];
        let transform = frame.compose_with(&locals, model);
        draw_with_transform(surface, &transform, |s| {
            s.draw_text(text, Point::ZERO, &paint);
        });
    }

    /// Build and draw the painting's strokes at its anchor.
    ///
    /// Only the translation of the painting's model matrix is used, so strokes
    /// stay flat on the ground regardless of the anchor's orientation.
    pub fn draw_finger_painting(&self, frame: &FrameContext, surface: &mut dyn DrawSurface, painting: &mut FingerPainting) {
        painting.build_path();
        if painting.paths().is_empty() {
            return;
        }

        let style = &self.config.style;
        let anchor = translation(translation_of(&painting.model_matrix()));
        let locals = [uniform_scale(style.painting_scale), xy_to_xz_rotation()];
        let transform = frame.compose_with(&locals, anchor);

        for built in painting.paths() {
            if built.path.elements().is_empty() {
                continue;
            }
            let paint = Paint::stroke(built.color, style.painting_stroke_width);
            draw_with_transform(surface, &transform, |s| {
                s.draw_path(&built.path, &paint);
            });
        }
    }

    /// Project feature points straight to pixels and draw them as dots.
    pub fn draw_point_cloud(&self, frame: &FrameContext, surface: &mut dyn DrawSurface, cloud: &PointCloud) {
        if cloud.is_empty() {
            return;
        }
        let vpv = frame.view_projection_viewport();
        let points = project_points(&vpv, cloud);
        if points.is_empty() {
            log::trace!("No point of {} projected onto the surface", cloud.len());
            return;
        }

        let style = &self.config.style;
        let paint = Paint::stroke(style.point_color.into(), style.point_size).with_cap(Cap::Square);
        surface.save();
        surface.set_transform(CanvasMatrix::IDENTITY);
        surface.draw_points(&points, &paint);
        surface.restore();
    }

    /// Outline every tracked, unmerged, camera-facing plane.
    pub fn draw_planes<P: TrackedPlane>(
        &self,
        frame: &FrameContext,
        surface: &mut dyn DrawSurface,
        camera_pose: &Pose,
        planes: &[P],
    ) {
        if planes.is_empty() {
            return;
        }
        let style = &self.config.style;
        let paint = Paint::stroke(style.plane_color.into(), style.plane_stroke_width);
        let locals = [xy_to_xz_rotation()];

        for plane in planes {
            if plane.tracking_state() != TrackingState::Tracking || plane.is_subsumed() {
                continue;
            }
            let center = plane.center_pose();
            if distance_to_plane(&center, camera_pose) < 0.0 {
                log::trace!("Skipping back-facing plane");
                continue;
            }
            let Some(outline) = plane_outline(plane.polygon()) else {
                continue;
            };
            let transform = frame.compose_with(&locals, center.to_matrix());
            draw_with_transform(surface, &transform, |s| {
                s.draw_path(&outline, &paint);
            });
        }
    }
}

/// Apply `transform` for the duration of `draw`, then restore the surface.
fn draw_with_transform(surface: &mut dyn DrawSurface, transform: &Mat4, draw: impl FnOnce(&mut dyn DrawSurface)) {
    surface.save();
    surface.set_transform(CanvasMatrix::from_4x4(transform));
    draw(&mut *surface);
    surface.restore();
}

/// Project world points to pixels, dropping any that do not land at a finite
/// position.
fn project_points(vpv: &Mat4, cloud: &PointCloud) -> Vec<Point> {
    let mut dropped = 0usize;
    let points: Vec<Point> = cloud
        .positions()
        .filter_map(|p| {
            let out = transform_point(vpv, Vec4::new(p.x, p.y, p.z, 1.0), true);
            if out.x.is_finite() && out.y.is_finite() {
                Some(Point::new(out.x as f64, out.y as f64))
            } else {
                dropped += 1;
                None
            }
        })
        .collect();
    if dropped > 0 {
        log::trace!("Dropped {} points with no finite projection", dropped);
    }
    points
}

/// Closed path through the polygon's `x, z` pairs. `None` without a vertex.
fn plane_outline(polygon: &[f32]) -> Option<BezPath> {
    let mut vertices = polygon
        .chunks_exact(2)
        .map(|v| Point::new(v[0] as f64, v[1] as f64));
    let first = vertices.next()?;
    let mut path = BezPath::new();
    path.move_to(first);
    for vertex in vertices {
        path.line_to(vertex);
    }
    path.close_path();
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{Primitive, RecordingSurface};
    use arcanvas_core::matrix::compose;
    use arcanvas_core::Plane;
    use kurbo::PathEl;
    use peniko::Color;
    use ultraviolet::Vec3;

    const EPS: f64 = 1e-3;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS
    }

    /// Camera at the origin looking down -Z with a simple perspective.
    fn perspective() -> Mat4 {
        let (n, f) = (0.1f32, 100.0f32);
        Mat4::new(
            Vec4::new(1.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 1.0, 0.0, 0.0),
            Vec4::new(0.0, 0.0, -(f + n) / (f - n), -1.0),
            Vec4::new(0.0, 0.0, -2.0 * f * n / (f - n), 0.0),
        )
    }

    fn frame() -> FrameContext {
        FrameContext::new()
            .with_viewport(800.0, 600.0)
            .with_projection(perspective())
    }

    fn anchored_frame() -> FrameContext {
        frame().with_model(translation(Vec3::new(0.0, 0.0, -2.0)))
    }

    fn quad() -> Vec<f32> {
        vec![-0.5, -0.5, 0.5, -0.5, 0.5, 0.5, -0.5, 0.5]
    }

    #[test]
    fn test_shape_draws_without_model_are_noops() {
        let renderer = FrameRenderer::new();
        let frame = frame();
        let mut surface = RecordingSurface::new();

        renderer.draw_circle(&frame, &mut surface);
        renderer.draw_rect(&frame, &mut surface);
        renderer.draw_animated_round_rect(&frame, &mut surface, 0.1);
        renderer.draw_text(&frame, &mut surface, "hello");
        for kind in [DrawingType::Circle, DrawingType::Rect, DrawingType::Text, DrawingType::Animation] {
            let mut config = RendererConfig::default();
            config.drawing_type = kind;
            FrameRenderer::with_config(config).draw_current_drawable(&frame, &mut surface, "hi", 0.1);
        }

        assert!(surface.is_empty());
        assert_eq!(surface.transform(), CanvasMatrix::IDENTITY);
        assert_eq!(surface.save_depth(), 0);
    }

    #[test]
    fn test_circle_uses_composed_transform() {
        let renderer = FrameRenderer::new();
        let frame = anchored_frame();
        let mut surface = RecordingSurface::new();
        renderer.draw_circle(&frame, &mut surface);

        assert_eq!(surface.len(), 1);
        let command = &surface.commands()[0];
        assert!(matches!(command.primitive, Primitive::Circle { radius, .. } if (radius - 0.1).abs() < 1e-12));
        // Anchor two meters ahead projects to the viewport center.
        assert!(close(command.map_point(Point::ZERO).unwrap(), Point::new(400.0, 300.0)));
        // 0.1 m to the right at 2 m depth: 0.05 NDC, 20 px.
        assert!(close(command.map_point(Point::new(0.1, 0.0)).unwrap(), Point::new(420.0, 300.0)));
        // Surface state is restored afterwards.
        assert_eq!(surface.transform(), CanvasMatrix::IDENTITY);
        assert_eq!(surface.save_depth(), 0);
    }

    #[test]
    fn test_light_filter_reaches_paint() {
        let renderer = FrameRenderer::new();
        let frame = anchored_frame().with_light_correction([1.0, 1.0, 1.0, 0.5]);
        let mut surface = RecordingSurface::new();
        renderer.draw_rect(&frame, &mut surface);
        let paint = &surface.commands()[0].paint;
        assert!(paint.light_filter.is_some());
        assert_eq!(paint.effective_color().to_rgba8().b, 128);
    }

    #[test]
    fn test_round_rect_radius_passes_through() {
        let renderer = FrameRenderer::new();
        let mut surface = RecordingSurface::new();
        renderer.draw_animated_round_rect(&anchored_frame(), &mut surface, 0.07);
        assert!(matches!(
            surface.commands()[0].primitive,
            Primitive::RoundRect { radius_x, radius_y, rect } if radius_x == 0.07 && radius_y == 0.07 && rect.width() == 0.5
        ));
    }

    #[test]
    fn test_text_lies_on_ground_plane() {
        let renderer = FrameRenderer::new();
        // Camera one meter above the anchor.
        let view = translation(Vec3::new(0.0, -1.0, 0.0));
        let frame = anchored_frame().with_view(view);
        let mut surface = RecordingSurface::new();
        renderer.draw_text(&frame, &mut surface, "AR");

        let command = &surface.commands()[0];
        assert_eq!(command.paint.text_size, 100.0);
        // 100 text units = 0.1 m along world X.
        let expected = {
            let m = frame.compose_with(&[], translation(Vec3::new(0.1, 0.0, -2.0)));
            let p = transform_point(&m, Vec4::new(0.0, 0.0, 0.0, 1.0), true);
            Point::new(p.x as f64, p.y as f64)
        };
        assert!(close(command.map_point(Point::new(100.0, 0.0)).unwrap(), expected));

        // Text y maps to world +Z, towards the camera, which moves down the screen.
        let origin = command.map_point(Point::ZERO).unwrap();
        let below = command.map_point(Point::new(0.0, 100.0)).unwrap();
        assert!(below.y > origin.y);
    }

    #[test]
    fn test_empty_text_is_noop() {
        let mut surface = RecordingSurface::new();
        FrameRenderer::new().draw_text(&anchored_frame(), &mut surface, "");
        assert!(surface.is_empty());
    }

    #[test]
    fn test_swapping_model_and_view_changes_transform() {
        let model = translation(Vec3::new(0.3, 0.0, -2.0));
        let view = compose(&[xy_to_xz_rotation(), translation(Vec3::new(0.0, 0.0, -1.0))]);
        let a = frame().with_model(model).with_view(view);
        let b = frame().with_model(view).with_view(model);

        let renderer = FrameRenderer::new();
        let mut sa = RecordingSurface::new();
        let mut sb = RecordingSurface::new();
        renderer.draw_rect(&a, &mut sa);
        renderer.draw_rect(&b, &mut sb);
        assert_ne!(sa.commands()[0].transform, sb.commands()[0].transform);
    }

    #[test]
    fn test_point_cloud_projection_matches_hand_computed() {
        // Identity view and projection: world x, y are NDC directly.
        let frame = FrameContext::new().with_viewport(800.0, 600.0);
        let cloud = PointCloud::from_points(&[[0.5, 0.25, -3.0, 1.0], [0.0, 0.0, 0.0, 0.5]]);
        let mut surface = RecordingSurface::new();
        FrameRenderer::new().draw_point_cloud(&frame, &mut surface, &cloud);

        let command = &surface.commands()[0];
        assert_eq!(command.transform, CanvasMatrix::IDENTITY);
        assert_eq!(command.paint.cap, Cap::Square);
        assert_eq!(command.paint.stroke_width, 6.0);
        let Primitive::Points(points) = &command.primitive else {
            panic!("expected points");
        };
        // x = (0.5 + 1) * 400, y = (1 - 0.25) * 300
        assert!(close(points[0], Point::new(600.0, 225.0)));
        assert!(close(points[1], Point::new(400.0, 300.0)));
    }

    #[test]
    fn test_point_cloud_with_perspective() {
        let frame = frame();
        let cloud = PointCloud::from_points(&[[1.0, 1.0, -4.0, 1.0]]);
        let mut surface = RecordingSurface::new();
        FrameRenderer::new().draw_point_cloud(&frame, &mut surface, &cloud);

        let Primitive::Points(points) = &surface.commands()[0].primitive else {
            panic!("expected points");
        };
        // NDC = (0.25, 0.25)
        assert!(close(points[0], Point::new(500.0, 225.0)));
    }

    #[test]
    fn test_point_cloud_drops_points_at_camera_plane() {
        // w = 0 for a point on the camera plane.
        let cloud = PointCloud::from_points(&[[1.0, 1.0, 0.0, 1.0], [0.0, 0.0, -1.0, 1.0]]);
        let mut surface = RecordingSurface::new();
        FrameRenderer::new().draw_point_cloud(&frame(), &mut surface, &cloud);
        let Primitive::Points(points) = &surface.commands()[0].primitive else {
            panic!("expected points");
        };
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn test_empty_point_cloud_is_noop() {
        let mut surface = RecordingSurface::new();
        FrameRenderer::new().draw_point_cloud(&frame(), &mut surface, &PointCloud::default());
        assert!(surface.is_empty());
    }

    #[test]
    fn test_planes_skip_subsumed_and_untracked() {
        let floor = Pose::from_translation(Vec3::new(0.0, -1.0, -2.0));
        let camera = Pose::identity();
        let visible = Plane::new(floor, quad());
        let planes = vec![
            visible.clone(),
            Plane::new(floor, quad()).with_subsumed_by(Some(visible.id)),
            Plane::new(floor, quad()).with_tracking_state(TrackingState::Paused),
            Plane::new(floor, quad()).with_tracking_state(TrackingState::Stopped),
        ];

        let mut surface = RecordingSurface::new();
        FrameRenderer::new().draw_planes(&frame(), &mut surface, &camera, &planes);
        assert_eq!(surface.len(), 1);
        assert_eq!(surface.save_depth(), 0);
    }

    #[test]
    fn test_back_facing_plane_is_skipped() {
        // Ceiling with its normal pointing up, camera below.
        let ceiling = Pose::from_translation(Vec3::new(0.0, 1.0, -2.0));
        let camera = Pose::identity();
        assert!(distance_to_plane(&ceiling, &camera) < 0.0);

        let mut surface = RecordingSurface::new();
        FrameRenderer::new().draw_planes(&frame(), &mut surface, &camera, &[Plane::new(ceiling, quad())]);
        assert!(surface.is_empty());
    }

    #[test]
    fn test_plane_outline_is_closed_stroke() {
        let floor = Pose::from_translation(Vec3::new(0.0, -1.0, -2.0));
        let mut surface = RecordingSurface::new();
        FrameRenderer::new().draw_planes(&frame(), &mut surface, &Pose::identity(), &[Plane::new(floor, quad())]);

        let command = &surface.commands()[0];
        assert_eq!(command.paint.style, crate::renderer::PaintStyle::Stroke);
        let Primitive::Path(path) = &command.primitive else {
            panic!("expected path");
        };
        let elements = path.elements();
        assert_eq!(elements.len(), 5);
        assert!(matches!(elements.last(), Some(PathEl::ClosePath)));

        // Plane center lands where the center pose projects.
        let expected = {
            let p = transform_point(
                &frame().view_projection_viewport(),
                Vec4::new(0.0, -1.0, -2.0, 1.0),
                true,
            );
            Point::new(p.x as f64, p.y as f64)
        };
        assert!(close(command.map_point(Point::ZERO).unwrap(), expected));
    }

    #[test]
    fn test_plane_without_vertices_is_skipped() {
        let floor = Pose::from_translation(Vec3::new(0.0, -1.0, -2.0));
        let mut surface = RecordingSurface::new();
        let planes = [Plane::new(floor, vec![]), Plane::new(floor, vec![0.5])];
        FrameRenderer::new().draw_planes(&frame(), &mut surface, &Pose::identity(), &planes);
        assert!(surface.is_empty());
    }

    #[test]
    fn test_no_planes_is_noop() {
        let mut surface = RecordingSurface::new();
        let planes: Vec<Plane> = Vec::new();
        FrameRenderer::new().draw_planes(&frame(), &mut surface, &Pose::identity(), &planes);
        assert!(surface.is_empty());
    }

    #[test]
    fn test_finger_painting() {
        let mut painting = FingerPainting::new(true);
        painting.set_model_matrix(translation(Vec3::new(0.0, -1.0, -2.0)));
        let mut surface = RecordingSurface::new();
        let renderer = FrameRenderer::new();

        renderer.draw_finger_painting(&frame(), &mut surface, &mut painting);
        assert!(surface.is_empty());

        let red = Color::from_rgba8(255, 0, 0, 200);
        painting.begin_stroke(Point::new(0.0, 0.0), red);
        painting.add_point(Point::new(100.0, 0.0));
        painting.end_stroke();
        painting.begin_stroke(Point::new(0.0, 50.0), Color::WHITE);
        painting.add_point(Point::new(0.0, 80.0));
        painting.end_stroke();

        renderer.draw_finger_painting(&frame(), &mut surface, &mut painting);
        assert_eq!(surface.len(), 2);
        let first = &surface.commands()[0];
        assert_eq!(first.paint.stroke_width, 30.0);
        assert_eq!(first.paint.color.to_rgba8().a, 200);
        // No painting-wide alpha overrides the path's own.
        assert_eq!(surface.commands()[1].paint.color.to_rgba8().a, 255);

        // 1000 painting units = 1 m along X, so 100 units = 0.1 m.
        let expected = {
            let p = transform_point(
                &frame().view_projection_viewport(),
                Vec4::new(0.1, -1.0, -2.0, 1.0),
                true,
            );
            Point::new(p.x as f64, p.y as f64)
        };
        assert!(close(first.map_point(Point::new(100.0, 0.0)).unwrap(), expected));
    }

    #[test]
    fn test_finger_painting_ignores_anchor_rotation() {
        let mut painting = FingerPainting::new(false);
        let rotated = compose(&[xy_to_xz_rotation(), translation(Vec3::new(0.0, -1.0, -2.0))]);
        painting.set_model_matrix(rotated);
        painting.begin_stroke(Point::ZERO, Color::WHITE);
        painting.add_point(Point::new(10.0, 10.0));

        let mut plain = painting.clone();
        plain.set_model_matrix(translation(Vec3::new(0.0, -1.0, -2.0)));

        let renderer = FrameRenderer::new();
        let mut a = RecordingSurface::new();
        let mut b = RecordingSurface::new();
        renderer.draw_finger_painting(&frame(), &mut a, &mut painting);
        renderer.draw_finger_painting(&frame(), &mut b, &mut plain);
        assert_eq!(a.commands()[0].transform, b.commands()[0].transform);
    }

    #[test]
    fn test_plane_shader_init_propagates_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = FrameRenderer::new();
        let result = renderer.initialize_plane_shader(&dir.path().join("trigrid.png"));
        assert!(matches!(result, Err(crate::RendererError::Io(_))));
        assert!(renderer.plane_shader().is_none());
    }

    #[test]
    fn test_new_finger_painting_follows_config() {
        let mut renderer = FrameRenderer::new();
        assert!(renderer.new_finger_painting().is_smooth());
        renderer.config_mut().smooth_painting = false;
        assert!(!renderer.new_finger_painting().is_smooth());
    }

    #[test]
    fn test_viewport_is_part_of_every_transform() {
        let small = anchored_frame();
        let mut large = anchored_frame();
        large.update_viewport(1600.0, 1200.0);

        let renderer = FrameRenderer::new();
        let mut a = RecordingSurface::new();
        let mut b = RecordingSurface::new();
        renderer.draw_circle(&small, &mut a);
        renderer.draw_circle(&large, &mut b);
        let pa = a.commands()[0].map_point(Point::ZERO).unwrap();
        let pb = b.commands()[0].map_point(Point::ZERO).unwrap();
        assert!(close(Point::new(pa.x * 2.0, pa.y * 2.0), pb));
    }
}

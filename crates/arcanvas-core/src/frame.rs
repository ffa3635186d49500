//! Per-frame state shared by every draw call.

use crate::light::LightFilter;
use crate::matrix::{compose, viewport_matrix};
use kurbo::Size;
use ultraviolet::Mat4;

/// Matrices and lighting for one rendered frame.
///
/// The host updates it once per frame from the tracker, then hands a shared
/// reference to each draw call. Setters are independent; the last write wins.
#[derive(Debug, Clone)]
pub struct FrameContext {
    projection: Mat4,
    view: Mat4,
    viewport: Size,
    light_filter: Option<LightFilter>,
    model_matrices: Vec<Mat4>,
}

impl Default for FrameContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameContext {
    /// Identity matrices, zero-sized viewport, no models.
    pub fn new() -> Self {
        Self {
            projection: Mat4::identity(),
            view: Mat4::identity(),
            viewport: Size::ZERO,
            light_filter: None,
            model_matrices: Vec::new(),
        }
    }

    pub fn update_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Size::new(width, height);
    }

    pub fn update_projection_matrix(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    pub fn update_view_matrix(&mut self, view: Mat4) {
        self.view = view;
    }

    /// Replace the light filter from an `[r, g, b, intensity]` estimate.
    pub fn update_light_color_filter(&mut self, correction: [f32; 4]) {
        self.light_filter = Some(LightFilter::from_color_correction(correction));
    }

    pub fn set_model_matrices(&mut self, models: Vec<Mat4>) {
        self.model_matrices = models;
    }

    pub fn push_model_matrix(&mut self, model: Mat4) {
        self.model_matrices.push(model);
    }

    pub fn clear_model_matrices(&mut self) {
        self.model_matrices.clear();
    }

    /// Set the viewport size.
    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.update_viewport(width, height);
        self
    }

    /// Set the projection matrix.
    pub fn with_projection(mut self, projection: Mat4) -> Self {
        self.projection = projection;
        self
    }

    /// Set the view matrix.
    pub fn with_view(mut self, view: Mat4) -> Self {
        self.view = view;
        self
    }

    /// Set the light filter from a color correction estimate.
    pub fn with_light_correction(mut self, correction: [f32; 4]) -> Self {
        self.update_light_color_filter(correction);
        self
    }

    /// Append a model matrix.
    pub fn with_model(mut self, model: Mat4) -> Self {
        self.model_matrices.push(model);
        self
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn light_filter(&self) -> Option<LightFilter> {
        self.light_filter
    }

    pub fn model_matrices(&self) -> &[Mat4] {
        &self.model_matrices
    }

    /// Model matrix of the object the shape draws are anchored to.
    pub fn primary_model_matrix(&self) -> Option<Mat4> {
        self.model_matrices.first().copied()
    }

    pub fn viewport_matrix(&self) -> Mat4 {
        viewport_matrix(self.viewport.width as f32, self.viewport.height as f32)
    }

    /// World space to surface pixels, with no model matrix.
    pub fn view_projection_viewport(&self) -> Mat4 {
        compose(&[self.view, self.projection, self.viewport_matrix()])
    }

    /// Local transforms (applied first, in order), then model, view,
    /// projection and viewport.
    pub fn compose_with(&self, locals: &[Mat4], model: Mat4) -> Mat4 {
        let mut chain = Vec::with_capacity(locals.len() + 4);
        chain.extend_from_slice(locals);
        chain.extend([model, self.view, self.projection, self.viewport_matrix()]);
        compose(&chain)
    }
}

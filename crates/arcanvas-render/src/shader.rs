//! Texture-backed shader for detected planes.

use crate::renderer::{RenderResult, RendererError};
use kurbo::Affine;
use peniko::Extend;
use std::path::Path;
use std::sync::Arc;

/// Scale from plane space to texture space. Keeps the grid texture readable at
/// the sizes planes are drawn at.
pub const PLANE_TEXTURE_SCALE: f64 = 0.000_05;

/// A repeating texture with its own local matrix.
#[derive(Debug, Clone)]
pub struct PlaneShader {
    image: peniko::ImageData,
    extend: Extend,
    local_matrix: Affine,
}

impl PlaneShader {
    /// Load and decode a texture file.
    ///
    /// Fails with [`RendererError::Io`] when the file cannot be opened and
    /// [`RendererError::Decode`] when its contents are not an image.
    pub fn from_path(path: &Path) -> RenderResult<Self> {
        let bytes = std::fs::read(path)?;
        let shader = Self::from_bytes(&bytes)?;
        log::debug!(
            "Loaded plane texture {} ({}x{})",
            path.display(),
            shader.width(),
            shader.height()
        );
        Ok(shader)
    }

    /// Decode an encoded image (PNG, JPEG or WebP).
    pub fn from_bytes(bytes: &[u8]) -> RenderResult<Self> {
        let decoded = ::image::load_from_memory(bytes).map_err(|e| RendererError::Decode(e.to_string()))?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self::from_rgba8(rgba.into_vec(), width, height))
    }

    /// Wrap raw RGBA8 pixels.
    pub fn from_rgba8(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        let image = peniko::ImageData {
            data: peniko::Blob::new(Arc::new(pixels)),
            format: peniko::ImageFormat::Rgba8,
            width,
            height,
            alpha_type: peniko::ImageAlphaType::Alpha,
        };
        Self {
            image,
            extend: Extend::Repeat,
            local_matrix: Affine::scale(PLANE_TEXTURE_SCALE),
        }
    }

    pub fn image(&self) -> &peniko::ImageData {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width
    }

    pub fn height(&self) -> u32 {
        self.image.height
    }

    /// Tiling mode, the same in both axes.
    pub fn extend(&self) -> Extend {
        self.extend
    }

    pub fn local_matrix(&self) -> Affine {
        self.local_matrix
    }

    pub fn set_local_matrix(&mut self, matrix: Affine) {
        self.local_matrix = matrix;
    }
}

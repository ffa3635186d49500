//! ArCanvas Render Library
//!
//! Drawing surfaces and the frame renderer that places AR content on them.
//! The default surface implementation uses Vello for GPU-accelerated rendering.

mod frame_renderer;
pub mod recording;
mod renderer;
mod shader;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use frame_renderer::FrameRenderer;
pub use recording::{DrawCommand, Primitive, RecordingSurface};
pub use renderer::{DrawSurface, Paint, PaintStyle, RenderResult, RendererError};
pub use shader::{PlaneShader, PLANE_TEXTURE_SCALE};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloSurface;

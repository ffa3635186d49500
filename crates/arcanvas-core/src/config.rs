//! Renderer configuration: which drawable to place and how each primitive looks.

use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Android-style argument order.
    pub fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Drawable placed at the primary anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingType {
    #[default]
    Circle,
    Rect,
    Text,
    /// Rounded rectangle whose corner radius the host animates.
    Animation,
}

impl DrawingType {
    /// Cycle to the next drawable.
    pub fn next(self) -> Self {
        match self {
            DrawingType::Circle => DrawingType::Rect,
            DrawingType::Rect => DrawingType::Text,
            DrawingType::Text => DrawingType::Animation,
            DrawingType::Animation => DrawingType::Circle,
        }
    }
}

/// Colors and sizes for every primitive. Lengths are in the primitive's local
/// units: meters for shapes and planes, surface units for text and painting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawStyle {
    pub circle_color: SerializableColor,
    pub circle_radius: f64,
    pub round_rect_color: SerializableColor,
    pub round_rect_size: f64,
    pub rect_color: SerializableColor,
    pub rect_size: f64,
    pub text_color: SerializableColor,
    pub text_size: f64,
    pub painting_stroke_width: f64,
    pub painting_scale: f32,
    pub point_color: SerializableColor,
    pub point_size: f64,
    pub plane_color: SerializableColor,
    pub plane_stroke_width: f64,
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self {
            circle_color: SerializableColor::argb(180, 100, 0, 0),
            circle_radius: 0.1,
            round_rect_color: SerializableColor::argb(180, 100, 0, 100),
            round_rect_size: 0.5,
            rect_color: SerializableColor::argb(180, 0, 0, 255),
            rect_size: 0.2,
            text_color: SerializableColor::argb(255, 0, 255, 0),
            text_size: 100.0,
            painting_stroke_width: 30.0,
            painting_scale: 0.001,
            point_color: SerializableColor::argb(220, 20, 232, 255),
            point_size: 6.0,
            plane_color: SerializableColor::argb(100, 255, 0, 0),
            plane_stroke_width: 0.01,
        }
    }
}

/// Top-level renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub drawing_type: DrawingType,
    pub smooth_painting: bool,
    pub style: DrawStyle,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            drawing_type: DrawingType::Circle,
            smooth_painting: true,
            style: DrawStyle::default(),
        }
    }
}

impl RendererConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            ConfigError::Io(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_json_str(&json)?;
        log::debug!("Loaded renderer config from {}", path.display());
        Ok(config)
    }
}

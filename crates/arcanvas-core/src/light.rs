//! Color correction from the tracker's light estimate.

use peniko::Color;

/// Per-channel multiplier derived from a light estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightFilter {
    scale: [f32; 3],
}

impl Default for LightFilter {
    fn default() -> Self {
        Self { scale: [1.0; 3] }
    }
}

impl LightFilter {
    /// Build from an `[r, g, b, pixel_intensity]` color correction.
    pub fn from_color_correction(correction: [f32; 4]) -> Self {
        let intensity = correction[3];
        Self {
            scale: [
                correction[0] * intensity,
                correction[1] * intensity,
                correction[2] * intensity,
            ],
        }
    }

    pub fn scale(&self) -> [f32; 3] {
        self.scale
    }

    /// Filter a color. Alpha is left alone and channels are clamped to `[0, 1]`.
    pub fn apply(&self, color: Color) -> Color {
        let [r, g, b, a] = color.components;
        Color::new([
            (r * self.scale[0]).clamp(0.0, 1.0),
            (g * self.scale[1]).clamp(0.0, 1.0),
            (b * self.scale[2]).clamp(0.0, 1.0),
            a,
        ])
    }
}

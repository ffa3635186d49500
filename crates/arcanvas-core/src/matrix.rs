//! Matrix composition helpers.
//!
//! AR trackers hand out column-major 4x4 `f32` matrices. Draw calls compose
//! them with fixed local transforms and then flatten the result into a
//! projective 3x3 [`CanvasMatrix`] that a 2D surface can apply.

use kurbo::{Affine, Point};
use std::ops::Mul;
use ultraviolet::{DMat3, DVec3, Mat4, Vec3, Vec4};

/// Below this magnitude a homogeneous coordinate counts as zero.
const W_EPSILON: f64 = 1e-12;

/// Multiply a list of matrices so that the first one is applied first.
///
/// `compose(&[a, b, c])` returns `c * b * a`. An empty list yields identity.
pub fn compose(matrices: &[Mat4]) -> Mat4 {
    matrices
        .iter()
        .fold(Mat4::identity(), |acc, m| *m * acc)
}

/// Matrix mapping clip space onto surface pixels.
///
/// Normalized device x in `[-1, 1]` maps to `[0, width]`; y is flipped so
/// that `+1` lands on the top edge of the surface.
pub fn viewport_matrix(width: f32, height: f32) -> Mat4 {
    let half_w = width * 0.5;
    let half_h = height * 0.5;
    Mat4::new(
        Vec4::new(half_w, 0.0, 0.0, 0.0),
        Vec4::new(0.0, -half_h, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(half_w, half_h, 0.0, 1.0),
    )
}

/// Rotation of +90° about X taking the surface plane onto the ground plane.
///
/// A point `(x, y, 0)` drawn on the surface ends up at `(x, 0, y)`, so a
/// horizontal text baseline lies flat on a detected plane.
pub fn xy_to_xz_rotation() -> Mat4 {
    Mat4::new(
        Vec4::new(1.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(0.0, -1.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 0.0, 1.0),
    )
}

/// Uniform scale in all three axes.
pub fn uniform_scale(s: f32) -> Mat4 {
    Mat4::new(
        Vec4::new(s, 0.0, 0.0, 0.0),
        Vec4::new(0.0, s, 0.0, 0.0),
        Vec4::new(0.0, 0.0, s, 0.0),
        Vec4::new(0.0, 0.0, 0.0, 1.0),
    )
}

/// Pure translation.
pub fn translation(offset: Vec3) -> Mat4 {
    Mat4::new(
        Vec4::new(1.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 1.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(offset.x, offset.y, offset.z, 1.0),
    )
}

/// Translation part of an affine 4x4.
pub fn translation_of(m: &Mat4) -> Vec3 {
    let t = m.cols[3];
    Vec3::new(t.x, t.y, t.z)
}

/// Scale applied to text so that a font of `text_size` units is a tenth of a
/// world unit tall.
pub fn text_scale_matrix(text_size: f32) -> Mat4 {
    uniform_scale(1.0 / (text_size * 10.0))
}

/// Apply `m` to a homogeneous point, optionally dividing by `w`.
pub fn transform_point(m: &Mat4, point: Vec4, perspective_divide: bool) -> Vec4 {
    let out = *m * point;
    if perspective_divide {
        Vec4::new(out.x / out.w, out.y / out.w, out.z / out.w, 1.0)
    } else {
        out
    }
}

/// Projective transform of the 2D drawing surface.
///
/// Built from a 4x4 by keeping rows and columns 0, 1 and 3: surface geometry
/// always has `z = 0` and the depth output is not needed for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasMatrix {
    m: DMat3,
}

impl Default for CanvasMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl CanvasMatrix {
    pub const IDENTITY: Self = Self {
        m: DMat3 {
            cols: [
                DVec3 { x: 1.0, y: 0.0, z: 0.0 },
                DVec3 { x: 0.0, y: 1.0, z: 0.0 },
                DVec3 { x: 0.0, y: 0.0, z: 1.0 },
            ],
        },
    };

    /// Flatten a composed 4x4 into a surface transform.
    pub fn from_4x4(m: &Mat4) -> Self {
        let col = |c: usize| {
            let v = m.cols[c];
            DVec3::new(v.x as f64, v.y as f64, v.w as f64)
        };
        Self {
            m: DMat3::new(col(0), col(1), col(3)),
        }
    }

    /// Build from row-major coefficients
    /// `[sx, kx, tx, ky, sy, ty, p0, p1, p2]`.
    pub fn from_row_major(v: [f64; 9]) -> Self {
        Self {
            m: DMat3::new(
                DVec3::new(v[0], v[3], v[6]),
                DVec3::new(v[1], v[4], v[7]),
                DVec3::new(v[2], v[5], v[8]),
            ),
        }
    }

    /// Row-major coefficients, the inverse of [`CanvasMatrix::from_row_major`].
    pub fn to_row_major(&self) -> [f64; 9] {
        let [c0, c1, c2] = self.m.cols;
        [c0.x, c1.x, c2.x, c0.y, c1.y, c2.y, c0.z, c1.z, c2.z]
    }

    /// Homogeneous `w` of `p` after mapping. Positive in front of the camera.
    pub fn w_at(&self, p: Point) -> f64 {
        let [c0, c1, c2] = self.m.cols;
        c0.z * p.x + c1.z * p.y + c2.z
    }

    /// Map a surface point. Returns `None` for points on or behind the
    /// vanishing line (`w <= 0`).
    pub fn map_point(&self, p: Point) -> Option<Point> {
        let v = self.m * DVec3::new(p.x, p.y, 1.0);
        if v.z < W_EPSILON {
            return None;
        }
        let mapped = Point::new(v.x / v.z, v.y / v.z);
        (mapped.x.is_finite() && mapped.y.is_finite()).then_some(mapped)
    }

    /// Whether the perspective row is `(0, 0, k)` with `k != 0`.
    pub fn is_affine(&self) -> bool {
        let [c0, c1, c2] = self.m.cols;
        c0.z.abs() < W_EPSILON && c1.z.abs() < W_EPSILON && c2.z.abs() >= W_EPSILON
    }

    /// Exact affine equivalent, when there is one.
    pub fn to_affine(&self) -> Option<Affine> {
        if !self.is_affine() {
            return None;
        }
        let [c0, c1, c2] = self.m.cols;
        let k = c2.z;
        Some(Affine::new([
            c0.x / k,
            c0.y / k,
            c1.x / k,
            c1.y / k,
            c2.x / k,
            c2.y / k,
        ]))
    }

    /// First-order affine approximation of the transform around `p`.
    ///
    /// Exact for affine matrices. `None` when `p` sits on or behind the
    /// vanishing line.
    pub fn local_affine_at(&self, p: Point) -> Option<Affine> {
        if let Some(affine) = self.to_affine() {
            return Some(affine);
        }
        let [c0, c1, c2] = self.m.cols;
        let x = c0.x * p.x + c1.x * p.y + c2.x;
        let y = c0.y * p.x + c1.y * p.y + c2.y;
        let w = self.w_at(p);
        if w < W_EPSILON {
            return None;
        }
        let w2 = w * w;
        let j00 = (c0.x * w - x * c0.z) / w2;
        let j01 = (c1.x * w - x * c1.z) / w2;
        let j10 = (c0.y * w - y * c0.z) / w2;
        let j11 = (c1.y * w - y * c1.z) / w2;
        let (fx, fy) = (x / w, y / w);
        Some(Affine::new([
            j00,
            j10,
            j01,
            j11,
            fx - (j00 * p.x + j01 * p.y),
            fy - (j10 * p.x + j11 * p.y),
        ]))
    }
}

impl From<Affine> for CanvasMatrix {
    fn from(affine: Affine) -> Self {
        let [a, b, c, d, e, f] = affine.as_coeffs();
        Self::from_row_major([a, c, e, b, d, f, 0.0, 0.0, 1.0])
    }
}

impl Mul for CanvasMatrix {
    type Output = CanvasMatrix;

    fn mul(self, rhs: CanvasMatrix) -> CanvasMatrix {
        CanvasMatrix { m: self.m * rhs.m }
    }
}

//! Snapshot types for the AR tracking feed.
//!
//! The tracker itself lives outside this crate. Hosts either copy its data
//! into [`Plane`] and [`PointCloud`] or implement [`TrackedPlane`] directly on
//! their own plane handles.

use serde::{Deserialize, Serialize};
use ultraviolet::{Mat4, Rotor3, Vec3};
use uuid::Uuid;

/// Unique identifier for a detected plane.
pub type PlaneId = Uuid;

/// Rigid transform from a local frame to world space.
#[derive(Debug, Clone, Copy)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Rotor3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub fn identity() -> Self {
        Self {
            translation: Vec3::zero(),
            rotation: Rotor3::identity(),
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Rotor3::identity(),
        }
    }

    /// Build from an `[x, y, z, w]` quaternion, the layout AR SDKs report.
    pub fn from_quaternion(quaternion: [f32; 4], translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Rotor3::from_quaternion_array(quaternion).normalized(),
        }
    }

    /// Model matrix of this pose.
    pub fn to_matrix(&self) -> Mat4 {
        let mut m = self.rotation.into_matrix().into_homogeneous();
        m.cols[3].x = self.translation.x;
        m.cols[3].y = self.translation.y;
        m.cols[3].z = self.translation.z;
        m
    }

    /// One of the local axes (0 = X, 1 = Y, 2 = Z) expressed in world space
    /// and scaled by `scale`.
    pub fn transformed_axis(&self, axis: usize, scale: f32) -> Vec3 {
        let local = match axis {
            0 => Vec3::unit_x(),
            1 => Vec3::unit_y(),
            _ => Vec3::unit_z(),
        };
        self.rotation * local * scale
    }
}

/// Tracking status reported for a trackable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackingState {
    /// Actively tracked this frame.
    Tracking,
    /// Temporarily lost; may resume.
    #[default]
    Paused,
    /// No longer tracked and never will be again.
    Stopped,
}

/// View of a detected plane as the renderer needs it.
pub trait TrackedPlane {
    /// Pose of the plane center. Its local Y axis is the plane normal.
    fn center_pose(&self) -> Pose;

    /// Boundary polygon as flattened `x, z` pairs in the plane's local frame.
    fn polygon(&self) -> &[f32];

    fn tracking_state(&self) -> TrackingState;

    /// Whether the tracker merged this plane into a larger one.
    fn is_subsumed(&self) -> bool;
}

/// Owned snapshot of a detected plane.
#[derive(Debug, Clone)]
pub struct Plane {
    pub id: PlaneId,
    pub center_pose: Pose,
    pub polygon: Vec<f32>,
    pub tracking_state: TrackingState,
    pub subsumed_by: Option<PlaneId>,
}

impl Plane {
    /// A tracked, unmerged plane.
    pub fn new(center_pose: Pose, polygon: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            center_pose,
            polygon,
            tracking_state: TrackingState::Tracking,
            subsumed_by: None,
        }
    }

    pub fn with_tracking_state(mut self, state: TrackingState) -> Self {
        self.tracking_state = state;
        self
    }

    pub fn with_subsumed_by(mut self, parent: Option<PlaneId>) -> Self {
        self.subsumed_by = parent;
        self
    }

    /// Number of complete `x, z` vertices.
    pub fn vertex_count(&self) -> usize {
        self.polygon.len() / 2
    }
}

impl TrackedPlane for Plane {
    fn center_pose(&self) -> Pose {
        self.center_pose
    }

    fn polygon(&self) -> &[f32] {
        &self.polygon
    }

    fn tracking_state(&self) -> TrackingState {
        self.tracking_state
    }

    fn is_subsumed(&self) -> bool {
        self.subsumed_by.is_some()
    }
}

/// Feature points reported by the tracker.
///
/// Stored as the raw `x, y, z, confidence` buffer.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    buffer: Vec<f32>,
}

impl PointCloud {
    pub fn from_raw(buffer: Vec<f32>) -> Self {
        Self { buffer }
    }

    pub fn from_points(points: &[[f32; 4]]) -> Self {
        Self {
            buffer: points.iter().flatten().copied().collect(),
        }
    }

    /// Complete points in the buffer. A trailing partial point is ignored.
    pub fn len(&self) -> usize {
        self.buffer.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// World-space positions, confidence dropped.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.buffer
            .chunks_exact(4)
            .map(|p| Vec3::new(p[0], p[1], p[2]))
    }

    /// Per-point confidence in `[0, 1]`.
    pub fn confidences(&self) -> impl Iterator<Item = f32> + '_ {
        self.buffer.chunks_exact(4).map(|p| p[3])
    }
}

/// Signed distance from a plane to the camera along the plane normal.
///
/// Negative when the camera is behind the plane, i.e. the plane faces away.
pub fn distance_to_plane(plane_pose: &Pose, camera_pose: &Pose) -> f32 {
    let normal = plane_pose.transformed_axis(1, 1.0);
    (camera_pose.translation - plane_pose.translation).dot(normal)
}

//! ArCanvas Core Library
//!
//! Matrix composition, AR tracking snapshots, finger painting and per-frame
//! state for drawing AR content onto a 2D surface.

pub mod ar;
pub mod config;
pub mod frame;
pub mod light;
pub mod matrix;
pub mod painting;

pub use ar::{distance_to_plane, Plane, PlaneId, PointCloud, Pose, TrackedPlane, TrackingState};
pub use config::{ConfigError, DrawStyle, DrawingType, RendererConfig, SerializableColor};
pub use frame::FrameContext;
pub use light::LightFilter;
pub use matrix::CanvasMatrix;
pub use painting::{BuiltPath, FingerPainting};

/// Re-exported so hosts build matrices with the same types.
pub use ultraviolet;

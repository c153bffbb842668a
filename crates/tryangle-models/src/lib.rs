//! Shared data models for the TryAngle composition engine.
//!
//! This crate provides Serde-serializable value types for:
//! - Whole-body keypoints (133-point index layout) and normalized boxes
//! - Reference and live snapshots
//! - Gate results and the five-gate evaluation
//! - Feedback categories, feedback items and unified actions
//! - Shot types, lens bands and device thermal tiers

pub mod aspect_ratio;
pub mod feedback;
pub mod gate;
pub mod geometry;
pub mod keypoint;
pub mod lens;
pub mod shot;
pub mod snapshot;
pub mod thermal;

// Re-export common types
pub use aspect_ratio::{AspectRatio, AspectRatioParseError};
pub use feedback::{ActionKind, FeedbackCategory, FeedbackItem, UnifiedFeedback};
pub use gate::{GateEvaluation, GateKind, GateResult};
pub use geometry::{BoundingBox, ImageSize};
pub use keypoint::{Keypoint, KeypointRegion, KEYPOINT_COUNT};
pub use lens::{FocalLengthInfo, FocalSource, LensType};
pub use shot::{CameraAngle, ShotType, ShotTypeParseError};
pub use snapshot::{ReferenceSnapshot, Snapshot};
pub use thermal::ThermalState;

//! Adaptive pose comparison.
//!
//! Compares live keypoints to the reference with region-dependent
//! visibility thresholds, so that unreliable regions (hands, face) neither
//! block nor distort the body comparison.
//!
//! # Pipeline
//! 1. Tiered visibility filter (body/feet, face, hands)
//! 2. Comparable set: indices visible on both sides
//! 3. Pose-type classification from visible groups
//! 4. Per-limb angle, direction and position comparison
//! 5. Secondary checks (feet, hands, face orientation, shoulder tilt)
//! 6. Frame-edge crop detection per required body group
//! 7. Aggregate accuracy for the pose gate

pub mod comparator;
pub mod crop;
pub mod groups;
pub mod secondary;
pub mod vector;

pub use comparator::{limb_score, LimbComparison, PoseComparator, PoseComparison};
pub use crop::{cropped_groups, is_cropped};
pub use groups::{BodyGroup, Limb, PoseType};
pub use secondary::{
    FaceComparison, FeetComparison, HandComparison, HandSide, ShoulderTiltComparison,
};

//! Whole-body keypoints.
//!
//! Index layout follows the 133-point whole-body convention shared by the
//! reference analysis and every live frame:
//!
//! - `0..=16`: body (COCO order)
//! - `17..=22`: feet
//! - `23..=90`: face (`23..=39` is the jaw contour)
//! - `91..=111`: left hand
//! - `112..=132`: right hand

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Total number of whole-body keypoints.
pub const KEYPOINT_COUNT: usize = 133;

pub const NOSE: usize = 0;
pub const LEFT_EYE: usize = 1;
pub const RIGHT_EYE: usize = 2;
pub const LEFT_EAR: usize = 3;
pub const RIGHT_EAR: usize = 4;
pub const LEFT_SHOULDER: usize = 5;
pub const RIGHT_SHOULDER: usize = 6;
pub const LEFT_ELBOW: usize = 7;
pub const RIGHT_ELBOW: usize = 8;
pub const LEFT_WRIST: usize = 9;
pub const RIGHT_WRIST: usize = 10;
pub const LEFT_HIP: usize = 11;
pub const RIGHT_HIP: usize = 12;
pub const LEFT_KNEE: usize = 13;
pub const RIGHT_KNEE: usize = 14;
pub const LEFT_ANKLE: usize = 15;
pub const RIGHT_ANKLE: usize = 16;

/// First and last index of the jaw contour.
pub const JAW_START: usize = 23;
pub const JAW_END: usize = 39;

/// First index (the wrist) of each hand block.
pub const LEFT_HAND_BASE: usize = 91;
pub const RIGHT_HAND_BASE: usize = 112;

/// A single keypoint in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Keypoint {
    /// X coordinate (0.0 = left, 1.0 = right)
    pub x: f64,
    /// Y coordinate (0.0 = top, 1.0 = bottom)
    pub y: f64,
    /// Estimator confidence (0.0-1.0)
    pub confidence: f64,
}

impl Keypoint {
    /// Create a keypoint, clamping coordinates and confidence into `[0, 1]`.
    ///
    /// NaN inputs collapse to `0.0`.
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
            confidence: clamp_unit(confidence),
        }
    }

    /// A keypoint the estimator did not find.
    pub fn missing() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            confidence: 0.0,
        }
    }

    /// Re-apply the clamping invariant (for values that came in through serde).
    pub fn sanitized(self) -> Self {
        Self::new(self.x, self.y, self.confidence)
    }

    /// Whether confidence reaches the given threshold.
    #[inline]
    pub fn is_visible(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }

    /// Euclidean distance to another keypoint.
    #[inline]
    pub fn distance_to(&self, other: &Keypoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Distance to the closest frame edge.
    #[inline]
    pub fn edge_distance(&self) -> f64 {
        self.x.min(1.0 - self.x).min(self.y).min(1.0 - self.y)
    }
}

impl Default for Keypoint {
    fn default() -> Self {
        Self::missing()
    }
}

/// Body region a keypoint index belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum KeypointRegion {
    Body,
    Feet,
    Face,
    LeftHand,
    RightHand,
}

impl KeypointRegion {
    /// Region for a keypoint index, `None` past the whole-body layout.
    pub fn of(index: usize) -> Option<Self> {
        match index {
            0..=16 => Some(Self::Body),
            17..=22 => Some(Self::Feet),
            23..=90 => Some(Self::Face),
            91..=111 => Some(Self::LeftHand),
            112..=132 => Some(Self::RightHand),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Feet => "feet",
            Self::Face => "face",
            Self::LeftHand => "left_hand",
            Self::RightHand => "right_hand",
        }
    }

    /// Whether this is one of the two hand blocks.
    pub fn is_hand(&self) -> bool {
        matches!(self, Self::LeftHand | Self::RightHand)
    }
}

/// Clamp into `[0, 1]`, mapping NaN to zero.
#[inline]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_clamps_on_ingestion() {
        let kp = Keypoint::new(-0.2, 1.4, 3.0);
        assert_eq!(kp.x, 0.0);
        assert_eq!(kp.y, 1.0);
        assert_eq!(kp.confidence, 1.0);

        let nan = Keypoint::new(f64::NAN, 0.5, f64::NAN);
        assert_eq!(nan.x, 0.0);
        assert_eq!(nan.confidence, 0.0);
    }

    #[test]
    fn test_sanitized_after_deserialize() {
        let kp: Keypoint = serde_json::from_str(r#"{"x":1.5,"y":0.5,"confidence":-1}"#).unwrap();
        let kp = kp.sanitized();
        assert_eq!(kp.x, 1.0);
        assert_eq!(kp.confidence, 0.0);
    }

    #[test]
    fn test_region_mapping() {
        assert_eq!(KeypointRegion::of(NOSE), Some(KeypointRegion::Body));
        assert_eq!(KeypointRegion::of(RIGHT_ANKLE), Some(KeypointRegion::Body));
        assert_eq!(KeypointRegion::of(17), Some(KeypointRegion::Feet));
        assert_eq!(KeypointRegion::of(JAW_START), Some(KeypointRegion::Face));
        assert_eq!(KeypointRegion::of(90), Some(KeypointRegion::Face));
        assert_eq!(KeypointRegion::of(LEFT_HAND_BASE), Some(KeypointRegion::LeftHand));
        assert_eq!(KeypointRegion::of(RIGHT_HAND_BASE), Some(KeypointRegion::RightHand));
        assert_eq!(KeypointRegion::of(132), Some(KeypointRegion::RightHand));
        assert_eq!(KeypointRegion::of(KEYPOINT_COUNT), None);
    }

    #[test]
    fn test_edge_distance() {
        assert!((Keypoint::new(0.01, 0.5, 1.0).edge_distance() - 0.01).abs() < 1e-9);
        assert!((Keypoint::new(0.5, 0.5, 1.0).edge_distance() - 0.5).abs() < 1e-9);
    }
}

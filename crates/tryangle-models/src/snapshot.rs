//! Reference and live snapshots.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;

use crate::aspect_ratio::AspectRatio;
use crate::geometry::{BoundingBox, ImageSize};
use crate::keypoint::Keypoint;
use crate::lens::FocalLengthInfo;
use crate::shot::{CameraAngle, ShotType};

/// Subject geometry measured on one image or camera frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Snapshot {
    /// Subject box; degenerate when no subject was found
    pub bbox: BoundingBox,
    /// Whole-body keypoints, possibly empty or partial
    #[serde(default)]
    pub keypoints: Vec<Keypoint>,
    /// Frame size in pixels
    pub image_size: ImageSize,
    /// Measured `width / height` of the frame
    pub aspect_ratio: f64,
    /// Background compression proxy (0.0 = wide, 1.0 = telephoto)
    #[serde(default)]
    pub compression_index: Option<f64>,
    /// Resolved focal length, when any estimator produced one
    #[serde(default)]
    pub focal_length: Option<FocalLengthInfo>,
    #[serde(default)]
    pub shot_type: ShotType,
    #[serde(default)]
    pub camera_angle: CameraAngle,
}

impl Snapshot {
    /// Snapshot with geometry only; derived fields are left unknown.
    pub fn new(bbox: BoundingBox, keypoints: Vec<Keypoint>, image_size: ImageSize) -> Self {
        Self {
            bbox,
            keypoints,
            image_size,
            aspect_ratio: image_size.aspect_ratio().unwrap_or(0.0),
            compression_index: None,
            focal_length: None,
            shot_type: ShotType::Unknown,
            camera_angle: CameraAngle::Unknown,
        }
    }

    /// Keypoint at `index`, `None` when the array is shorter.
    #[inline]
    pub fn keypoint(&self, index: usize) -> Option<&Keypoint> {
        self.keypoints.get(index)
    }

    /// Whether a subject was detected.
    pub fn has_subject(&self) -> bool {
        !self.bbox.is_degenerate()
    }

    /// Closest standard ratio, for display.
    pub fn named_aspect_ratio(&self) -> AspectRatio {
        AspectRatio::closest(self.aspect_ratio)
    }

    /// Re-clamp every value that may have bypassed the constructors.
    pub fn sanitized(mut self) -> Self {
        for kp in &mut self.keypoints {
            *kp = kp.sanitized();
        }
        self.bbox = BoundingBox::new(self.bbox.x, self.bbox.y, self.bbox.width, self.bbox.height);
        self.compression_index = self
            .compression_index
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0));
        self
    }
}

/// Published reference analysis.
///
/// Shared read-only across evaluations and replaced wholesale when a new
/// reference is selected. There is no mutable access.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSnapshot(Arc<Snapshot>);

impl ReferenceSnapshot {
    pub fn new(snapshot: Snapshot) -> Self {
        Self(Arc::new(snapshot.sanitized()))
    }

    /// Borrow the underlying snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        &self.0
    }

    /// Whether two handles point at the same published analysis.
    pub fn same_as(&self, other: &ReferenceSnapshot) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for ReferenceSnapshot {
    type Target = Snapshot;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Snapshot> for ReferenceSnapshot {
    fn from(snapshot: Snapshot) -> Self {
        Self::new(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_is_shared() {
        let snap = Snapshot::new(
            BoundingBox::new(0.3, 0.2, 0.4, 0.6),
            vec![Keypoint::new(0.5, 0.3, 0.9); 17],
            ImageSize::new(3000, 4000),
        );
        let reference = ReferenceSnapshot::new(snap);
        let copy = reference.clone();
        assert!(copy.same_as(&reference));
        assert!((reference.aspect_ratio - 0.75).abs() < 1e-9);
        assert_eq!(reference.named_aspect_ratio(), AspectRatio::PORTRAIT_3_4);
        assert!(reference.has_subject());
    }

    #[test]
    fn test_deserialized_snapshot_is_sanitized() {
        let json = r#"{
            "bbox": {"x": 0.9, "y": 0.1, "width": 0.5, "height": 0.5},
            "keypoints": [{"x": 2.0, "y": 0.5, "confidence": 0.9}],
            "image_size": {"width": 1080, "height": 1920},
            "aspect_ratio": 0.5625,
            "compression_index": 1.7
        }"#;
        let snap: Snapshot = serde_json::from_str(json).unwrap();
        let snap = snap.sanitized();
        assert_eq!(snap.keypoints[0].x, 1.0);
        assert!(snap.bbox.x2() <= 1.0 + 1e-9);
        assert_eq!(snap.compression_index, Some(1.0));
        assert_eq!(snap.shot_type, ShotType::Unknown);
    }

    #[test]
    fn test_schema_lists_snapshot_fields() {
        let schema = serde_json::to_value(schemars::schema_for!(Snapshot)).unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("bbox").is_some());
        assert!(properties.get("compression_index").is_some());
    }
}

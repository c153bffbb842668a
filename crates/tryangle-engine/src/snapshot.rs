//! Building snapshots from raw detector output.

use serde::{Deserialize, Serialize};
use tryangle_models::{BoundingBox, FocalSource, ImageSize, Keypoint, Snapshot};

use crate::config::PoseConfig;
use crate::focal::{self, DepthEstimate, FocalInputs, ZoomState};
use crate::framing::classify_shot;
use crate::margin;

/// Collaborator outputs for one camera frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveFrameInputs {
    pub image_size: ImageSize,
    /// Detector box; derived from the keypoints when absent
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub keypoints: Vec<Keypoint>,
    #[serde(default)]
    pub depth: Option<DepthEstimate>,
    #[serde(default)]
    pub zoom: Option<ZoomState>,
}

impl LiveFrameInputs {
    pub fn new(image_size: ImageSize) -> Self {
        Self {
            image_size,
            ..Default::default()
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_keypoints(mut self, keypoints: Vec<Keypoint>) -> Self {
        self.keypoints = keypoints;
        self
    }

    pub fn with_depth(mut self, depth: DepthEstimate) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_zoom(mut self, zoom: ZoomState) -> Self {
        self.zoom = Some(zoom);
        self
    }

    /// Snapshot of this frame.
    pub fn to_snapshot(&self, exif: Option<&[u8]>, config: &PoseConfig) -> Snapshot {
        build_snapshot(
            self.image_size,
            self.bbox,
            self.keypoints.clone(),
            &FocalInputs {
                exif_bytes: exif,
                crop_factor: self.zoom.map(|z| z.crop_factor),
                depth: self.depth.as_ref(),
                zoom: self.zoom.as_ref(),
            },
            config,
        )
    }
}

/// Assemble a snapshot and derive its shot type, angle and compression.
///
/// A missing box falls back to the box enclosing the visible keypoints. The
/// compression index stays unknown when only the default focal length is
/// available, so Gate 3 does not judge a guess.
pub fn build_snapshot(
    image_size: ImageSize,
    bbox: Option<BoundingBox>,
    keypoints: Vec<Keypoint>,
    focal: &FocalInputs<'_>,
    config: &PoseConfig,
) -> Snapshot {
    let keypoints: Vec<Keypoint> = keypoints.into_iter().map(Keypoint::sanitized).collect();
    let bbox = bbox
        .filter(|b| !b.is_degenerate())
        .or_else(|| BoundingBox::enclosing(&keypoints, config.body_confidence))
        .unwrap_or_else(BoundingBox::empty);

    let estimate = focal::estimate(focal);
    let shot_type = classify_shot(&keypoints, config);
    let camera_angle = margin::analyze(&bbox).camera_angle;

    let mut snapshot = Snapshot::new(bbox, keypoints, image_size);
    snapshot.compression_index =
        (estimate.info.source != FocalSource::Default).then_some(estimate.compression_index);
    snapshot.focal_length = Some(estimate.info);
    snapshot.shot_type = shot_type;
    snapshot.camera_angle = camera_angle;
    snapshot.sanitized()
}

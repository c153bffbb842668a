//! Keypoint visibility tiers, limbs and body groups.

use serde::{Deserialize, Serialize};
use std::fmt;
use tryangle_models::keypoint::{
    LEFT_ANKLE, LEFT_ELBOW, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, LEFT_WRIST, RIGHT_ANKLE,
    RIGHT_ELBOW, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER, RIGHT_WRIST,
};
use tryangle_models::{FeedbackCategory, Keypoint, KeypointRegion, ShotType};

use crate::config::PoseConfig;

/// Confidence a keypoint needs before it counts as visible.
pub fn visibility_threshold(index: usize, config: &PoseConfig) -> Option<f64> {
    Some(match KeypointRegion::of(index)? {
        KeypointRegion::Body | KeypointRegion::Feet => config.body_confidence,
        KeypointRegion::Face => config.face_confidence,
        KeypointRegion::LeftHand | KeypointRegion::RightHand => config.hand_confidence,
    })
}

/// The keypoint at `index` when it clears its region's threshold.
pub fn visible<'a>(
    keypoints: &'a [Keypoint],
    index: usize,
    config: &PoseConfig,
) -> Option<&'a Keypoint> {
    let threshold = visibility_threshold(index, config)?;
    keypoints.get(index).filter(|k| k.is_visible(threshold))
}

pub fn is_visible(keypoints: &[Keypoint], index: usize, config: &PoseConfig) -> bool {
    visible(keypoints, index, config).is_some()
}

/// Number of keypoints clearing their tier.
pub fn visible_count(keypoints: &[Keypoint], config: &PoseConfig) -> usize {
    (0..keypoints.len())
        .filter(|&i| is_visible(keypoints, i, config))
        .count()
}

/// Indices visible in both arrays.
pub fn comparable_indices(
    reference: &[Keypoint],
    live: &[Keypoint],
    config: &PoseConfig,
) -> Vec<usize> {
    (0..reference.len().min(live.len()))
        .filter(|&i| is_visible(reference, i, config) && is_visible(live, i, config))
        .collect()
}

/// Coarse pose classification from which body groups are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseType {
    FullBody,
    UpperBody,
    Portrait,
    Unknown,
}

impl PoseType {
    pub fn classify(keypoints: &[Keypoint], config: &PoseConfig) -> Self {
        let any = |group: BodyGroup| group.indices().any(|i| is_visible(keypoints, i, config));

        let head = any(BodyGroup::Head);
        let shoulders = any(BodyGroup::Shoulders);
        let arms = any(BodyGroup::Arms);
        let hips = any(BodyGroup::Hips);
        let legs = any(BodyGroup::Knees) || any(BodyGroup::Ankles);

        if shoulders && hips && legs {
            Self::FullBody
        } else if shoulders && (hips || arms) {
            Self::UpperBody
        } else if head {
            Self::Portrait
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullBody => "full_body",
            Self::UpperBody => "upper_body",
            Self::Portrait => "portrait",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PoseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Three-joint limb chains compared by angle and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limb {
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

impl Limb {
    pub const ALL: [Limb; 4] = [Limb::LeftArm, Limb::RightArm, Limb::LeftLeg, Limb::RightLeg];

    /// `(root, middle, end)` keypoint indices.
    pub fn joints(&self) -> (usize, usize, usize) {
        match self {
            Self::LeftArm => (LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST),
            Self::RightArm => (RIGHT_SHOULDER, RIGHT_ELBOW, RIGHT_WRIST),
            Self::LeftLeg => (LEFT_HIP, LEFT_KNEE, LEFT_ANKLE),
            Self::RightLeg => (RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE),
        }
    }

    pub fn category(&self) -> FeedbackCategory {
        match self {
            Self::LeftArm => FeedbackCategory::LeftArm,
            Self::RightArm => FeedbackCategory::RightArm,
            Self::LeftLeg => FeedbackCategory::LeftLeg,
            Self::RightLeg => FeedbackCategory::RightLeg,
        }
    }

    pub fn is_arm(&self) -> bool {
        matches!(self, Self::LeftArm | Self::RightArm)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::LeftArm => "left arm",
            Self::RightArm => "right arm",
            Self::LeftLeg => "left leg",
            Self::RightLeg => "right leg",
        }
    }
}

/// Body regions checked for frame-edge cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyGroup {
    Head,
    Shoulders,
    Arms,
    Hips,
    Knees,
    Ankles,
    Feet,
}

impl BodyGroup {
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        match self {
            Self::Head => 0..=4,
            Self::Shoulders => 5..=6,
            Self::Arms => 7..=10,
            Self::Hips => 11..=12,
            Self::Knees => 13..=14,
            Self::Ankles => 15..=16,
            Self::Feet => 17..=22,
        }
    }

    /// Groups a shot of this type is expected to contain.
    pub fn required_for(shot: ShotType) -> &'static [BodyGroup] {
        use BodyGroup::*;
        match shot {
            ShotType::ExtremeCloseUp => &[Head],
            ShotType::CloseUp => &[Head, Shoulders],
            ShotType::BustShot => &[Head, Shoulders, Arms],
            ShotType::MediumShot => &[Head, Shoulders, Arms, Hips],
            ShotType::KneeShot => &[Head, Shoulders, Arms, Hips, Knees],
            ShotType::FullShot | ShotType::Unknown => {
                &[Head, Shoulders, Arms, Hips, Knees, Ankles, Feet]
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Shoulders => "shoulders",
            Self::Arms => "arms",
            Self::Hips => "hips",
            Self::Knees => "knees",
            Self::Ankles => "ankles",
            Self::Feet => "feet",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(points: &[(usize, f64)]) -> Vec<Keypoint> {
        let mut kps = vec![Keypoint::missing(); 17];
        for &(i, c) in points {
            kps[i] = Keypoint::new(0.5, 0.1 + i as f64 * 0.05, c);
        }
        kps
    }

    #[test]
    fn test_tiered_thresholds() {
        let config = PoseConfig::default();
        assert_eq!(visibility_threshold(3, &config), Some(0.5));
        assert_eq!(visibility_threshold(20, &config), Some(0.5));
        assert_eq!(visibility_threshold(50, &config), Some(0.4));
        assert_eq!(visibility_threshold(100, &config), Some(0.3));
        assert_eq!(visibility_threshold(200, &config), None);

        let mut kps = vec![Keypoint::missing(); 133];
        kps[50] = Keypoint::new(0.5, 0.5, 0.45);
        kps[5] = Keypoint::new(0.5, 0.5, 0.45);
        kps[120] = Keypoint::new(0.5, 0.5, 0.35);
        assert!(is_visible(&kps, 50, &config));
        assert!(!is_visible(&kps, 5, &config));
        assert!(is_visible(&kps, 120, &config));
    }

    #[test]
    fn test_comparable_needs_both() {
        let config = PoseConfig::default();
        let a = body(&[(0, 0.9), (5, 0.9), (6, 0.9)]);
        let b = body(&[(0, 0.9), (5, 0.2), (6, 0.9), (7, 0.9)]);
        assert_eq!(comparable_indices(&a, &b, &config), vec![0, 6]);
    }

    #[test]
    fn test_pose_type_classification() {
        let config = PoseConfig::default();
        let all: Vec<(usize, f64)> = (0..17).map(|i| (i, 0.9)).collect();
        assert_eq!(PoseType::classify(&body(&all), &config), PoseType::FullBody);
        assert_eq!(
            PoseType::classify(&body(&[(0, 0.9), (5, 0.9), (6, 0.9), (7, 0.9)]), &config),
            PoseType::UpperBody
        );
        assert_eq!(PoseType::classify(&body(&[(0, 0.9), (1, 0.9)]), &config), PoseType::Portrait);
        assert_eq!(PoseType::classify(&[], &config), PoseType::Unknown);
    }

    #[test]
    fn test_required_groups_grow_with_shot() {
        assert_eq!(BodyGroup::required_for(ShotType::ExtremeCloseUp).len(), 1);
        assert!(BodyGroup::required_for(ShotType::FullShot).contains(&BodyGroup::Feet));
        assert!(!BodyGroup::required_for(ShotType::KneeShot).contains(&BodyGroup::Ankles));
    }
}

//! Adaptive pose comparison.

use serde::{Deserialize, Serialize};
use tracing::debug;
use tryangle_models::{Keypoint, ShotType};

use super::crop::cropped_groups;
use super::groups::{comparable_indices, visible, visible_count, BodyGroup, Limb, PoseType};
use super::secondary::{
    compare_face, compare_feet, compare_hands, compare_shoulder_tilt, FaceComparison,
    FeetComparison, HandComparison, ShoulderTiltComparison,
};
use super::vector::{cosine_similarity, joint_angle};
use crate::config::PoseConfig;

/// Angle (degrees) at which a limb scores zero.
const MAX_LIMB_DIFFERENCE: f64 = 180.0;

/// One limb compared between reference and live.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimbComparison {
    pub limb: Limb,
    pub reference_angle: f64,
    pub live_angle: f64,
    /// `|reference_angle - live_angle|`
    pub angle_difference: f64,
    /// Cosine similarity of the root-to-end directions
    pub direction_similarity: f64,
    /// Angle difference plus the direction penalty
    pub total_difference: f64,
    /// Live minus reference of `end.y - root.y`; positive means the end sits too low
    pub position_delta: f64,
    pub accuracy: f64,
}

impl LimbComparison {
    /// Whether the limb end has to come up to match the reference.
    pub fn needs_raise(&self) -> bool {
        self.position_delta > 0.0
    }
}

/// Combine angle difference and direction similarity.
///
/// Returns `(total_difference, accuracy)`.
pub fn limb_score(
    angle_difference: f64,
    direction_similarity: f64,
    config: &PoseConfig,
) -> (f64, f64) {
    let penalty = ((1.0 - direction_similarity) * config.direction_penalty_degrees).max(0.0);
    let total = angle_difference.abs() + penalty;
    (total, (1.0 - total / MAX_LIMB_DIFFERENCE).max(0.0))
}

/// Full comparison result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseComparison {
    pub reference_pose: PoseType,
    pub live_pose: PoseType,
    /// Reference had too few visible keypoints to judge
    pub skipped: bool,
    /// Keypoints visible in both snapshots
    pub comparable: usize,
    pub limbs: Vec<LimbComparison>,
    pub feet: Option<FeetComparison>,
    pub hands: Vec<HandComparison>,
    pub face: Option<FaceComparison>,
    pub shoulder_tilt: Option<ShoulderTiltComparison>,
    pub cropped_groups: Vec<BodyGroup>,
    /// Mean limb accuracy, 1.0 when nothing could be judged
    pub accuracy: f64,
}

impl PoseComparison {
    fn skipped(reference_pose: PoseType, live_pose: PoseType) -> Self {
        Self {
            reference_pose,
            live_pose,
            skipped: true,
            comparable: 0,
            limbs: Vec::new(),
            feet: None,
            hands: Vec::new(),
            face: None,
            shoulder_tilt: None,
            cropped_groups: Vec::new(),
            accuracy: 1.0,
        }
    }

    pub fn limb(&self, limb: Limb) -> Option<&LimbComparison> {
        self.limbs.iter().find(|l| l.limb == limb)
    }
}

/// Compares live keypoints against the reference pose.
#[derive(Debug, Clone, Default)]
pub struct PoseComparator {
    config: PoseConfig,
}

impl PoseComparator {
    pub fn new(config: PoseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PoseConfig {
        &self.config
    }

    pub fn compare(
        &self,
        reference: &[Keypoint],
        live: &[Keypoint],
        reference_shot: ShotType,
    ) -> PoseComparison {
        let config = &self.config;
        let reference_pose = PoseType::classify(reference, config);
        let live_pose = PoseType::classify(live, config);

        let reference_visible = visible_count(reference, config);
        if reference_visible < config.min_reference_keypoints {
            debug!(
                visible = reference_visible,
                required = config.min_reference_keypoints,
                "Reference pose too sparse, skipping comparison"
            );
            return PoseComparison::skipped(reference_pose, live_pose);
        }

        let limbs: Vec<LimbComparison> = Limb::ALL
            .iter()
            .filter_map(|&limb| self.compare_limb(reference, live, limb))
            .collect();

        let accuracy = if limbs.is_empty() {
            1.0
        } else {
            limbs.iter().map(|l| l.accuracy).sum::<f64>() / limbs.len() as f64
        };

        PoseComparison {
            reference_pose,
            live_pose,
            skipped: false,
            comparable: comparable_indices(reference, live, config).len(),
            feet: compare_feet(reference, live, config),
            hands: compare_hands(reference, live, config),
            face: compare_face(reference, live, config),
            shoulder_tilt: compare_shoulder_tilt(reference, live, config),
            cropped_groups: cropped_groups(reference, live, reference_shot, config),
            limbs,
            accuracy,
        }
    }

    /// Compare one limb; `None` when any of its joints is missing on either side.
    pub fn compare_limb(
        &self,
        reference: &[Keypoint],
        live: &[Keypoint],
        limb: Limb,
    ) -> Option<LimbComparison> {
        let config = &self.config;
        let (root, mid, end) = limb.joints();

        let r = (
            visible(reference, root, config)?,
            visible(reference, mid, config)?,
            visible(reference, end, config)?,
        );
        let l = (
            visible(live, root, config)?,
            visible(live, mid, config)?,
            visible(live, end, config)?,
        );

        let reference_angle = joint_angle(r.0, r.1, r.2)?;
        let live_angle = joint_angle(l.0, l.1, l.2)?;
        let direction_similarity = cosine_similarity(
            (r.2.x - r.0.x, r.2.y - r.0.y),
            (l.2.x - l.0.x, l.2.y - l.0.y),
        )?;

        let angle_difference = (reference_angle - live_angle).abs();
        let (total_difference, accuracy) =
            limb_score(angle_difference, direction_similarity, config);

        Some(LimbComparison {
            limb,
            reference_angle,
            live_angle,
            angle_difference,
            direction_similarity,
            total_difference,
            position_delta: (l.2.y - l.0.y) - (r.2.y - r.0.y),
            accuracy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tryangle_models::keypoint::{LEFT_ELBOW, LEFT_SHOULDER, LEFT_WRIST};

    /// Standing figure with arms hanging down.
    fn standing() -> Vec<Keypoint> {
        let coords = [
            (0.50, 0.10), // nose
            (0.48, 0.08),
            (0.52, 0.08),
            (0.46, 0.09),
            (0.54, 0.09),
            (0.60, 0.20), // left shoulder
            (0.40, 0.20), // right shoulder
            (0.62, 0.32),
            (0.38, 0.32),
            (0.63, 0.44), // left wrist
            (0.37, 0.44),
            (0.56, 0.50), // left hip
            (0.44, 0.50),
            (0.57, 0.68),
            (0.43, 0.68),
            (0.57, 0.86),
            (0.43, 0.86),
        ];
        coords
            .iter()
            .map(|&(x, y)| Keypoint::new(x, y, 0.9))
            .collect()
    }

    #[test]
    fn test_identical_pose_scores_one() {
        let comparator = PoseComparator::default();
        let pose = standing();
        let result = comparator.compare(&pose, &pose, ShotType::FullShot);
        assert!(!result.skipped);
        assert_eq!(result.limbs.len(), 4);
        assert!((result.accuracy - 1.0).abs() < 1e-9);
        assert_eq!(result.reference_pose, PoseType::FullBody);
        assert!(result.cropped_groups.is_empty());
    }

    #[test]
    fn test_raised_arm_detected() {
        let comparator = PoseComparator::default();
        let reference = standing();
        let mut live = reference.clone();
        live[LEFT_ELBOW] = Keypoint::new(0.70, 0.15, 0.9);
        live[LEFT_WRIST] = Keypoint::new(0.80, 0.08, 0.9);

        let result = comparator.compare(&live, &reference, ShotType::FullShot);
        let arm = result.limb(Limb::LeftArm).unwrap();
        // reference has the arm raised, live hangs down: live end is lower
        assert!(arm.needs_raise());
        assert!(arm.total_difference > 15.0);
        assert!(result.accuracy < 1.0);
        let leg = result.limb(Limb::LeftLeg).unwrap();
        assert!(leg.total_difference < 1e-9);
    }

    #[test]
    fn test_opposite_direction_penalized() {
        let config = PoseConfig::default();
        let (same, _) = limb_score(0.0, 1.0, &config);
        let (flipped, _) = limb_score(0.0, -1.0, &config);
        assert_eq!(same, 0.0);
        assert!((flipped - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_accuracy_monotonic_in_angle() {
        let config = PoseConfig::default();
        let mut last = f64::INFINITY;
        for diff in [0.0, 10.0, 30.0, 60.0, 120.0] {
            let (_, accuracy) = limb_score(diff, 0.8, &config);
            assert!(accuracy < last);
            last = accuracy;
        }
    }

    #[test]
    fn test_sparse_reference_skips() {
        let comparator = PoseComparator::default();
        let mut reference = vec![Keypoint::missing(); 17];
        for i in 0..4 {
            reference[i] = Keypoint::new(0.5, 0.1 + i as f64 * 0.02, 0.9);
        }
        let result = comparator.compare(&reference, &standing(), ShotType::Unknown);
        assert!(result.skipped);
        assert_eq!(result.accuracy, 1.0);
    }

    #[test]
    fn test_missing_joint_excludes_limb() {
        let comparator = PoseComparator::default();
        let reference = standing();
        let mut live = reference.clone();
        live[LEFT_SHOULDER] = Keypoint::new(0.60, 0.20, 0.1);
        let result = comparator.compare(&reference, &live, ShotType::FullShot);
        assert!(result.limb(Limb::LeftArm).is_none());
        assert_eq!(result.limbs.len(), 3);
        assert!((result.accuracy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_live_cannot_judge() {
        let comparator = PoseComparator::default();
        let result = comparator.compare(&standing(), &[], ShotType::FullShot);
        assert!(result.limbs.is_empty());
        assert_eq!(result.accuracy, 1.0);
    }
}

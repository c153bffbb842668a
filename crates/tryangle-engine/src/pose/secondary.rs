//! Secondary pose checks: feet, hands, face orientation and shoulder tilt.

use serde::{Deserialize, Serialize};
use tryangle_models::keypoint::{
    JAW_END, JAW_START, LEFT_HAND_BASE, LEFT_SHOULDER, NOSE, RIGHT_HAND_BASE, RIGHT_SHOULDER,
};
use tryangle_models::Keypoint;

use super::groups::visible;
use super::vector::cosine_similarity;
use crate::config::PoseConfig;

/// Offsets of the five fingertips from a hand block's wrist index.
const FINGERTIP_OFFSETS: [usize; 5] = [4, 8, 12, 16, 20];

const FEET: std::ops::RangeInclusive<usize> = 17..=22;

/// Foot-cluster centroid offset, live minus reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeetComparison {
    pub dx: f64,
    pub dy: f64,
    pub distance: f64,
}

pub fn compare_feet(
    reference: &[Keypoint],
    live: &[Keypoint],
    config: &PoseConfig,
) -> Option<FeetComparison> {
    let shared: Vec<usize> = FEET
        .filter(|&i| visible(reference, i, config).is_some() && visible(live, i, config).is_some())
        .collect();
    if shared.is_empty() {
        return None;
    }

    let (rx, ry) = centroid(reference, &shared);
    let (lx, ly) = centroid(live, &shared);
    let (dx, dy) = (lx - rx, ly - ry);
    Some(FeetComparison {
        dx,
        dy,
        distance: (dx * dx + dy * dy).sqrt(),
    })
}

fn centroid(keypoints: &[Keypoint], indices: &[usize]) -> (f64, f64) {
    let n = indices.len() as f64;
    let (sx, sy) = indices
        .iter()
        .filter_map(|&i| keypoints.get(i))
        .fold((0.0, 0.0), |(sx, sy), k| (sx + k.x, sy + k.y));
    (sx / n, sy / n)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandSide {
    Left,
    Right,
}

impl HandSide {
    fn base(&self) -> usize {
        match self {
            Self::Left => LEFT_HAND_BASE,
            Self::Right => RIGHT_HAND_BASE,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Left => "left hand",
            Self::Right => "right hand",
        }
    }
}

/// Per-hand finger direction dissimilarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandComparison {
    pub side: HandSide,
    /// Fingers with wrist and tip visible in both snapshots
    pub fingers_compared: usize,
    /// Mean `(1 - cos) / 2` over compared fingers, 0.0 = same shape
    pub difference: f64,
}

pub fn compare_hands(
    reference: &[Keypoint],
    live: &[Keypoint],
    config: &PoseConfig,
) -> Vec<HandComparison> {
    [HandSide::Left, HandSide::Right]
        .into_iter()
        .filter_map(|side| compare_hand(reference, live, side, config))
        .collect()
}

fn compare_hand(
    reference: &[Keypoint],
    live: &[Keypoint],
    side: HandSide,
    config: &PoseConfig,
) -> Option<HandComparison> {
    let wrist = side.base();
    let ref_wrist = visible(reference, wrist, config)?;
    let live_wrist = visible(live, wrist, config)?;

    let diffs: Vec<f64> = FINGERTIP_OFFSETS
        .iter()
        .filter_map(|&offset| {
            let tip = wrist + offset;
            let ref_tip = visible(reference, tip, config)?;
            let live_tip = visible(live, tip, config)?;
            let cos = cosine_similarity(
                (ref_tip.x - ref_wrist.x, ref_tip.y - ref_wrist.y),
                (live_tip.x - live_wrist.x, live_tip.y - live_wrist.y),
            )?;
            Some((1.0 - cos) / 2.0)
        })
        .collect();

    if diffs.is_empty() {
        return None;
    }
    Some(HandComparison {
        side,
        fingers_compared: diffs.len(),
        difference: diffs.iter().sum::<f64>() / diffs.len() as f64,
    })
}

/// Head turn measured as the nose's position between the jaw ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceComparison {
    /// 0.5 for a frontal face
    pub reference_ratio: f64,
    pub live_ratio: f64,
    /// Live minus reference
    pub delta: f64,
}

/// `d(nose, jaw start) / (d(nose, jaw start) + d(nose, jaw end))`.
pub fn face_ratio(keypoints: &[Keypoint], config: &PoseConfig) -> Option<f64> {
    let nose = visible(keypoints, NOSE, config)?;
    let start = visible(keypoints, JAW_START, config)?;
    let end = visible(keypoints, JAW_END, config)?;
    let a = nose.distance_to(start);
    let b = nose.distance_to(end);
    let total = a + b;
    (total > f64::EPSILON).then(|| a / total)
}

pub fn compare_face(
    reference: &[Keypoint],
    live: &[Keypoint],
    config: &PoseConfig,
) -> Option<FaceComparison> {
    let reference_ratio = face_ratio(reference, config)?;
    let live_ratio = face_ratio(live, config)?;
    Some(FaceComparison {
        reference_ratio,
        live_ratio,
        delta: live_ratio - reference_ratio,
    })
}

/// Torso lean in degrees from horizontal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShoulderTiltComparison {
    pub reference_degrees: f64,
    pub live_degrees: f64,
    /// Live minus reference
    pub delta: f64,
}

/// Positive when the subject's left shoulder sits lower than the right.
pub fn shoulder_tilt(keypoints: &[Keypoint], config: &PoseConfig) -> Option<f64> {
    let left = visible(keypoints, LEFT_SHOULDER, config)?;
    let right = visible(keypoints, RIGHT_SHOULDER, config)?;
    let dx = (left.x - right.x).abs();
    let dy = left.y - right.y;
    if dx <= f64::EPSILON && dy.abs() <= f64::EPSILON {
        return None;
    }
    Some(dy.atan2(dx).to_degrees())
}

pub fn compare_shoulder_tilt(
    reference: &[Keypoint],
    live: &[Keypoint],
    config: &PoseConfig,
) -> Option<ShoulderTiltComparison> {
    let reference_degrees = shoulder_tilt(reference, config)?;
    let live_degrees = shoulder_tilt(live, config)?;
    Some(ShoulderTiltComparison {
        reference_degrees,
        live_degrees,
        delta: live_degrees - reference_degrees,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> Vec<Keypoint> {
        vec![Keypoint::missing(); 133]
    }

    #[test]
    fn test_feet_centroid_shift() {
        let config = PoseConfig::default();
        let mut reference = blank();
        let mut live = blank();
        for i in 17..=19 {
            reference[i] = Keypoint::new(0.4, 0.9, 0.8);
            live[i] = Keypoint::new(0.5, 0.9, 0.8);
        }
        let feet = compare_feet(&reference, &live, &config).unwrap();
        assert!((feet.dx - 0.1).abs() < 1e-9);
        assert!(feet.dy.abs() < 1e-9);
        assert!(compare_feet(&blank(), &live, &config).is_none());
    }

    #[test]
    fn test_open_vs_closed_hand() {
        let config = PoseConfig::default();
        let mut reference = blank();
        let mut live = blank();
        reference[LEFT_HAND_BASE] = Keypoint::new(0.5, 0.5, 0.8);
        live[LEFT_HAND_BASE] = Keypoint::new(0.5, 0.5, 0.8);
        for offset in FINGERTIP_OFFSETS {
            // reference fingers point up, live fingers point down
            reference[LEFT_HAND_BASE + offset] = Keypoint::new(0.5, 0.4, 0.8);
            live[LEFT_HAND_BASE + offset] = Keypoint::new(0.5, 0.6, 0.8);
        }
        let hands = compare_hands(&reference, &live, &config);
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].side, HandSide::Left);
        assert_eq!(hands[0].fingers_compared, 5);
        assert!((hands[0].difference - 1.0).abs() < 1e-9);

        let same = compare_hands(&reference, &reference, &config);
        assert!(same[0].difference.abs() < 1e-9);
    }

    #[test]
    fn test_face_ratio_turn() {
        let config = PoseConfig::default();
        let mut frontal = blank();
        frontal[NOSE] = Keypoint::new(0.5, 0.3, 0.9);
        frontal[JAW_START] = Keypoint::new(0.4, 0.3, 0.9);
        frontal[JAW_END] = Keypoint::new(0.6, 0.3, 0.9);
        assert!((face_ratio(&frontal, &config).unwrap() - 0.5).abs() < 1e-9);

        let mut turned = frontal.clone();
        turned[NOSE] = Keypoint::new(0.45, 0.3, 0.9);
        let face = compare_face(&frontal, &turned, &config).unwrap();
        assert!(face.delta < -0.1);
    }

    #[test]
    fn test_shoulder_tilt_degrees() {
        let config = PoseConfig::default();
        let mut level = blank();
        level[LEFT_SHOULDER] = Keypoint::new(0.6, 0.3, 0.9);
        level[RIGHT_SHOULDER] = Keypoint::new(0.4, 0.3, 0.9);
        assert!(shoulder_tilt(&level, &config).unwrap().abs() < 1e-9);

        let mut leaning = level.clone();
        leaning[LEFT_SHOULDER] = Keypoint::new(0.6, 0.5, 0.9);
        let tilt = compare_shoulder_tilt(&level, &leaning, &config).unwrap();
        assert!((tilt.delta - 45.0).abs() < 1e-9);
    }
}

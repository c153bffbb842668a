//! Shot-type classification and subject occupancy.

use tryangle_models::keypoint::{
    LEFT_ANKLE, LEFT_ELBOW, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, NOSE, RIGHT_ANKLE, RIGHT_ELBOW,
    RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER,
};
use tryangle_models::{BoundingBox, Keypoint, ShotType};

use crate::config::PoseConfig;
use crate::pose::groups::{visible, BodyGroup};

/// Visible foot keypoints that alone make a full shot.
const FULL_SHOT_FEET: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum LowestPart {
    Face,
    Shoulder,
    Elbow,
    Hip,
    Knee,
    Ankle,
}

const PARTS: [(LowestPart, [usize; 2]); 5] = [
    (LowestPart::Shoulder, [LEFT_SHOULDER, RIGHT_SHOULDER]),
    (LowestPart::Elbow, [LEFT_ELBOW, RIGHT_ELBOW]),
    (LowestPart::Hip, [LEFT_HIP, RIGHT_HIP]),
    (LowestPart::Knee, [LEFT_KNEE, RIGHT_KNEE]),
    (LowestPart::Ankle, [LEFT_ANKLE, RIGHT_ANKLE]),
];

/// Classify the shot from the lowest visible body part.
///
/// With the nose visible the lowest part below it decides; without it the
/// frame is a partial view and only the widest visible group counts.
pub fn classify_shot(keypoints: &[Keypoint], config: &PoseConfig) -> ShotType {
    let seen = |i: usize| visible(keypoints, i, config);
    let any = |pair: [usize; 2]| pair.iter().any(|&i| seen(i).is_some());

    let feet = BodyGroup::Feet.indices().filter(|&i| seen(i).is_some()).count();
    if feet >= FULL_SHOT_FEET {
        return ShotType::FullShot;
    }

    let Some(nose) = seen(NOSE) else {
        return partial_view(&any);
    };

    let mut lowest = (LowestPart::Face, nose.y);
    for (part, pair) in PARTS {
        for i in pair {
            if let Some(k) = seen(i) {
                if k.y > lowest.1 {
                    lowest = (part, k.y);
                }
            }
        }
    }

    match lowest.0 {
        LowestPart::Ankle => ShotType::FullShot,
        LowestPart::Knee => ShotType::KneeShot,
        LowestPart::Hip if any([LEFT_ELBOW, RIGHT_ELBOW]) => ShotType::MediumShot,
        LowestPart::Hip | LowestPart::Elbow => ShotType::BustShot,
        LowestPart::Shoulder => ShotType::CloseUp,
        LowestPart::Face => ShotType::ExtremeCloseUp,
    }
}

fn partial_view(any: &impl Fn([usize; 2]) -> bool) -> ShotType {
    if any([LEFT_ANKLE, RIGHT_ANKLE]) {
        ShotType::FullShot
    } else if any([LEFT_KNEE, RIGHT_KNEE]) {
        ShotType::KneeShot
    } else if any([LEFT_HIP, RIGHT_HIP]) {
        ShotType::MediumShot
    } else if any([LEFT_SHOULDER, RIGHT_SHOULDER]) {
        ShotType::BustShot
    } else {
        ShotType::Unknown
    }
}

/// Fraction of the frame covered by the subject.
pub fn occupancy(bbox: &BoundingBox) -> f64 {
    if bbox.is_degenerate() {
        0.0
    } else {
        bbox.area()
    }
}

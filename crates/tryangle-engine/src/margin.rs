//! Margin and balance analysis.
//!
//! Measures how much free space surrounds the subject and how that space is
//! distributed. With a reference box the analysis becomes relative: signed
//! deltas plus a camera movement direction instead of an absolute verdict.
//!
//! All functions are pure.

use serde::{Deserialize, Serialize};
use tryangle_models::{BoundingBox, CameraAngle};

/// Margin below which the subject is considered to touch an edge.
pub const EDGE_CONTACT: f64 = 0.01;

/// Preferred share of vertical free space above the subject (1:2 headroom).
pub const IDEAL_TOP_RATIO: f64 = 1.0 / 3.0;

/// Centre offset below which no movement is suggested.
const DIRECTION_DEADZONE: f64 = 0.02;

/// Weights for the relative position score.
const HORIZONTAL_WEIGHT: f64 = 0.4;
const VERTICAL_WEIGHT: f64 = 0.3;
const BOTTOM_WEIGHT: f64 = 0.3;

/// Free space on each side of the subject, as fractions of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Margins {
    pub fn from_bbox(bbox: &BoundingBox) -> Self {
        Self {
            top: bbox.y.max(0.0),
            bottom: (1.0 - bbox.y2()).max(0.0),
            left: bbox.x.max(0.0),
            right: (1.0 - bbox.x2()).max(0.0),
        }
    }

    /// Share of horizontal free space on the left (0.5 when none is free).
    pub fn left_ratio(&self) -> f64 {
        let total = self.left + self.right;
        if total <= f64::EPSILON {
            0.5
        } else {
            self.left / total
        }
    }

    /// Share of vertical free space above the subject.
    pub fn top_ratio(&self) -> f64 {
        let total = self.top + self.bottom;
        if total <= f64::EPSILON {
            IDEAL_TOP_RATIO
        } else {
            self.top / total
        }
    }

    /// `1 - |leftRatio - rightRatio|`.
    pub fn horizontal_balance(&self) -> f64 {
        let left = self.left_ratio();
        (1.0 - (left - (1.0 - left)).abs()).clamp(0.0, 1.0)
    }

    /// Peaks when the top margin is half the bottom margin.
    pub fn vertical_balance(&self) -> f64 {
        (1.0 - (self.top_ratio() - IDEAL_TOP_RATIO).abs() / (1.0 - IDEAL_TOP_RATIO)).clamp(0.0, 1.0)
    }

    pub fn edge_contact(&self) -> EdgeContact {
        EdgeContact {
            top: self.top < EDGE_CONTACT,
            bottom: self.bottom < EDGE_CONTACT,
            left: self.left < EDGE_CONTACT,
            right: self.right < EDGE_CONTACT,
        }
    }
}

/// Which frame edges the subject touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeContact {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl EdgeContact {
    pub fn count(&self) -> usize {
        [self.top, self.bottom, self.left, self.right]
            .iter()
            .filter(|&&t| t)
            .count()
    }

    /// Touching two or more edges reads as the subject being cut off.
    pub fn is_cropped(&self) -> bool {
        self.count() >= 2
    }
}

/// Absolute margin analysis of one box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginAnalysis {
    pub margins: Margins,
    pub horizontal_balance: f64,
    pub vertical_balance: f64,
    /// Mean of the two balance scores
    pub balance_score: f64,
    pub edges: EdgeContact,
    pub cropped: bool,
    pub camera_angle: CameraAngle,
}

/// Analyze a single subject box.
pub fn analyze(bbox: &BoundingBox) -> MarginAnalysis {
    let margins = Margins::from_bbox(bbox);
    let horizontal_balance = margins.horizontal_balance();
    let vertical_balance = margins.vertical_balance();
    let edges = margins.edge_contact();

    MarginAnalysis {
        margins,
        horizontal_balance,
        vertical_balance,
        balance_score: (horizontal_balance + vertical_balance) / 2.0,
        edges,
        cropped: edges.is_cropped(),
        camera_angle: if bbox.is_degenerate() {
            CameraAngle::Unknown
        } else {
            CameraAngle::from_margins(margins.top, margins.bottom)
        },
    }
}

/// Centre offset of a box from its balanced placement: horizontally centred
/// with 1:2 headroom. Positive values mean the subject sits right of or
/// below that spot.
pub fn balance_offset(bbox: &BoundingBox) -> (f64, f64) {
    let target_cy = (1.0 - bbox.height).max(0.0) * IDEAL_TOP_RATIO + bbox.height / 2.0;
    (bbox.cx() - 0.5, bbox.cy() - target_cy)
}

/// Direction the camera should move to bring the subject into place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arrow {
    None,
    Left,
    Right,
    Up,
    Down,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Arrow {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::None => "·",
            Self::Left => "←",
            Self::Right => "→",
            Self::Up => "↑",
            Self::Down => "↓",
            Self::UpLeft => "↖",
            Self::UpRight => "↗",
            Self::DownLeft => "↙",
            Self::DownRight => "↘",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementDirection {
    pub arrow: Arrow,
    /// Centre offset length (normalized)
    pub magnitude: f64,
}

impl MovementDirection {
    /// Camera direction that follows a subject offset of `(dx, dy)`.
    ///
    /// A subject sitting right of its target needs the camera to pan right;
    /// a subject sitting low needs the camera to tilt down.
    pub fn from_offset(dx: f64, dy: f64) -> Self {
        let horizontal = if dx > DIRECTION_DEADZONE {
            1
        } else if dx < -DIRECTION_DEADZONE {
            -1
        } else {
            0
        };
        let vertical = if dy > DIRECTION_DEADZONE {
            1
        } else if dy < -DIRECTION_DEADZONE {
            -1
        } else {
            0
        };

        let arrow = match (horizontal, vertical) {
            (0, 0) => Arrow::None,
            (-1, 0) => Arrow::Left,
            (1, 0) => Arrow::Right,
            (0, -1) => Arrow::Up,
            (0, 1) => Arrow::Down,
            (-1, -1) => Arrow::UpLeft,
            (1, -1) => Arrow::UpRight,
            (-1, 1) => Arrow::DownLeft,
            _ => Arrow::DownRight,
        };

        Self {
            arrow,
            magnitude: (dx * dx + dy * dy).sqrt(),
        }
    }
}

/// Current box compared against the reference box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeMargins {
    /// Centre delta, positive when the subject sits right of the reference
    pub dx: f64,
    /// Centre delta, positive when the subject sits below the reference
    pub dy: f64,
    /// `(left - right)` current minus reference
    pub horizontal_shift: f64,
    /// Top share of vertical free space, current minus reference
    pub vertical_diff: f64,
    /// Bottom margin, current minus reference
    pub bottom_diff: f64,
    pub horizontal_score: f64,
    pub vertical_score: f64,
    pub bottom_score: f64,
    /// Weighted position score, 1.0 for identical boxes
    pub position_score: f64,
    pub direction: MovementDirection,
}

/// Compare a live box against the reference box.
pub fn compare(current: &BoundingBox, reference: &BoundingBox) -> RelativeMargins {
    let cur = Margins::from_bbox(current);
    let refm = Margins::from_bbox(reference);

    let horizontal_shift = (cur.left - cur.right) - (refm.left - refm.right);
    let vertical_diff = cur.top_ratio() - refm.top_ratio();
    let bottom_diff = cur.bottom - refm.bottom;

    let horizontal_score = diff_score(horizontal_shift);
    let vertical_score = diff_score(vertical_diff);
    let bottom_score = diff_score(bottom_diff);

    let dx = current.cx() - reference.cx();
    let dy = current.cy() - reference.cy();

    RelativeMargins {
        dx,
        dy,
        horizontal_shift,
        vertical_diff,
        bottom_diff,
        horizontal_score,
        vertical_score,
        bottom_score,
        position_score: HORIZONTAL_WEIGHT * horizontal_score
            + VERTICAL_WEIGHT * vertical_score
            + BOTTOM_WEIGHT * bottom_score,
        direction: MovementDirection::from_offset(dx, dy),
    }
}

#[inline]
fn diff_score(diff: f64) -> f64 {
    (1.0 - 2.0 * diff.abs()).clamp(0.0, 1.0)
}

/// Camera tilt, in whole degrees, for a vertical offset given in percent.
pub fn tilt_degrees(percent: f64) -> u32 {
    let percent = percent.abs();
    if percent < 5.0 {
        2
    } else if percent < 10.0 {
        5
    } else if percent < 15.0 {
        8
    } else if percent < 20.0 {
        10
    } else {
        (percent * 0.5).min(15.0) as u32
    }
}

/// Walking distance hint for an offset given in percent of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepHint {
    ALittle,
    HalfStep,
    OneStep,
    TwoSteps,
    ThreeSteps,
    FourOrMore,
}

impl StepHint {
    pub fn from_percent(percent: f64) -> Self {
        let percent = percent.abs();
        if percent < 5.0 {
            Self::ALittle
        } else if percent < 10.0 {
            Self::HalfStep
        } else if percent < 20.0 {
            Self::OneStep
        } else if percent < 30.0 {
            Self::TwoSteps
        } else if percent < 40.0 {
            Self::ThreeSteps
        } else {
            Self::FourOrMore
        }
    }

    pub fn phrase(&self) -> &'static str {
        match self {
            Self::ALittle => "a little",
            Self::HalfStep => "half a step",
            Self::OneStep => "one step",
            Self::TwoSteps => "two steps",
            Self::ThreeSteps => "three steps",
            Self::FourOrMore => "four or more steps",
        }
    }
}

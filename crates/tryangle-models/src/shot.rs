//! Shot types and camera angles.
//!
//! Shot types are ordered from tightest to widest framing; the order is
//! what the framing gate measures distance on.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Discrete framing classification inferred from visible body keypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShotType {
    /// Face only.
    ExtremeCloseUp,
    /// Face and shoulders.
    CloseUp,
    /// Chest up.
    BustShot,
    /// Waist up.
    MediumShot,
    /// Knees up.
    KneeShot,
    /// Head to feet.
    FullShot,
    /// Not enough keypoints to decide.
    #[default]
    Unknown,
}

impl ShotType {
    /// All known shot types, tightest first.
    pub const ORDERED: &'static [ShotType] = &[
        ShotType::ExtremeCloseUp,
        ShotType::CloseUp,
        ShotType::BustShot,
        ShotType::MediumShot,
        ShotType::KneeShot,
        ShotType::FullShot,
    ];

    /// Position in the tight-to-wide order, `None` for `Unknown`.
    pub fn order(&self) -> Option<usize> {
        match self {
            Self::ExtremeCloseUp => Some(0),
            Self::CloseUp => Some(1),
            Self::BustShot => Some(2),
            Self::MediumShot => Some(3),
            Self::KneeShot => Some(4),
            Self::FullShot => Some(5),
            Self::Unknown => None,
        }
    }

    /// Bust and medium shots are interchangeable framings of the upper body.
    pub fn same_category(&self, other: &ShotType) -> bool {
        self == other
            || matches!(
                (self, other),
                (Self::BustShot, Self::MediumShot) | (Self::MediumShot, Self::BustShot)
            )
    }

    /// Number of order steps between two shot types.
    pub fn steps_to(&self, other: &ShotType) -> Option<usize> {
        Some(self.order()?.abs_diff(other.order()?))
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtremeCloseUp => "extreme_closeup",
            Self::CloseUp => "closeup",
            Self::BustShot => "bust_shot",
            Self::MediumShot => "medium_shot",
            Self::KneeShot => "knee_shot",
            Self::FullShot => "full_shot",
            Self::Unknown => "unknown",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ExtremeCloseUp => "extreme close-up",
            Self::CloseUp => "close-up",
            Self::BustShot => "bust shot",
            Self::MediumShot => "medium shot",
            Self::KneeShot => "knee shot",
            Self::FullShot => "full shot",
            Self::Unknown => "unknown shot",
        }
    }
}

impl fmt::Display for ShotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ShotType {
    type Err = ShotTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "extreme_closeup" | "extreme_close_up" => Ok(Self::ExtremeCloseUp),
            "closeup" | "close_up" => Ok(Self::CloseUp),
            "bust_shot" | "bust" => Ok(Self::BustShot),
            "medium_shot" | "medium" => Ok(Self::MediumShot),
            "knee_shot" | "knee" => Ok(Self::KneeShot),
            "full_shot" | "full" => Ok(Self::FullShot),
            "unknown" => Ok(Self::Unknown),
            _ => Err(ShotTypeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown shot type: {0}")]
pub struct ShotTypeParseError(String);

/// Vertical camera angle relative to the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CameraAngle {
    /// Camera above the subject, more floor than headroom.
    HighAngle,
    EyeLevel,
    /// Camera below the subject, more headroom than floor.
    LowAngle,
    #[default]
    Unknown,
}

impl CameraAngle {
    /// Margin difference beyond which the frame reads as angled.
    const MARGIN_SKEW: f64 = 0.1;

    /// Infer the angle from the subject's top and bottom margins.
    pub fn from_margins(top: f64, bottom: f64) -> Self {
        if bottom > top + Self::MARGIN_SKEW {
            Self::HighAngle
        } else if top > bottom + Self::MARGIN_SKEW {
            Self::LowAngle
        } else {
            Self::EyeLevel
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighAngle => "high_angle",
            Self::EyeLevel => "eye_level",
            Self::LowAngle => "low_angle",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CameraAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

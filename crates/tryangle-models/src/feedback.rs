//! Feedback categories, items and unified actions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::gate::GateKind;

/// Closed set of things the user can be told to fix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCategory {
    NoReference,
    NoSubject,
    AspectRatio,
    ShotType,
    SubjectSize,
    SubjectCropped,
    HorizontalPosition,
    VerticalPosition,
    Compression,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
    ShoulderTilt,
    FaceOrientation,
    Hands,
    Feet,
    BodyCropped,
}

impl FeedbackCategory {
    pub const ALL: &'static [FeedbackCategory] = &[
        FeedbackCategory::NoReference,
        FeedbackCategory::NoSubject,
        FeedbackCategory::AspectRatio,
        FeedbackCategory::ShotType,
        FeedbackCategory::SubjectSize,
        FeedbackCategory::SubjectCropped,
        FeedbackCategory::HorizontalPosition,
        FeedbackCategory::VerticalPosition,
        FeedbackCategory::Compression,
        FeedbackCategory::LeftArm,
        FeedbackCategory::RightArm,
        FeedbackCategory::LeftLeg,
        FeedbackCategory::RightLeg,
        FeedbackCategory::ShoulderTilt,
        FeedbackCategory::FaceOrientation,
        FeedbackCategory::Hands,
        FeedbackCategory::Feet,
        FeedbackCategory::BodyCropped,
    ];

    /// Limb categories keep showing through brief absences.
    pub fn is_sticky(&self) -> bool {
        matches!(
            self,
            Self::LeftArm | Self::RightArm | Self::LeftLeg | Self::RightLeg
        )
    }

    /// Gate this category reports on; `None` for missing-input notices.
    pub fn gate(&self) -> Option<GateKind> {
        match self {
            Self::NoReference | Self::NoSubject => None,
            Self::AspectRatio => Some(GateKind::AspectRatio),
            Self::ShotType | Self::SubjectSize | Self::SubjectCropped | Self::BodyCropped => {
                Some(GateKind::Framing)
            }
            Self::HorizontalPosition | Self::VerticalPosition => Some(GateKind::Position),
            Self::Compression => Some(GateKind::Compression),
            Self::LeftArm
            | Self::RightArm
            | Self::LeftLeg
            | Self::RightLeg
            | Self::ShoulderTilt
            | Self::FaceOrientation
            | Self::Hands
            | Self::Feet => Some(GateKind::Pose),
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::NoReference => "🖼️",
            Self::NoSubject => "👀",
            Self::AspectRatio => "📐",
            Self::ShotType | Self::SubjectSize => "🔍",
            Self::SubjectCropped | Self::BodyCropped => "✂️",
            Self::HorizontalPosition => "↔️",
            Self::VerticalPosition => "↕️",
            Self::Compression => "🔭",
            Self::LeftArm | Self::RightArm => "💪",
            Self::LeftLeg | Self::RightLeg => "🦵",
            Self::ShoulderTilt => "🤷",
            Self::FaceOrientation => "🙂",
            Self::Hands => "✋",
            Self::Feet => "🦶",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoReference => "no_reference",
            Self::NoSubject => "no_subject",
            Self::AspectRatio => "aspect_ratio",
            Self::ShotType => "shot_type",
            Self::SubjectSize => "subject_size",
            Self::SubjectCropped => "subject_cropped",
            Self::HorizontalPosition => "horizontal_position",
            Self::VerticalPosition => "vertical_position",
            Self::Compression => "compression",
            Self::LeftArm => "left_arm",
            Self::RightArm => "right_arm",
            Self::LeftLeg => "left_leg",
            Self::RightLeg => "right_leg",
            Self::ShoulderTilt => "shoulder_tilt",
            Self::FaceOrientation => "face_orientation",
            Self::Hands => "hands",
            Self::Feet => "feet",
            Self::BodyCropped => "body_cropped",
        }
    }
}

impl fmt::Display for FeedbackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recommendation consumed by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackItem {
    /// Lower is more important
    pub priority: u32,
    pub icon: String,
    pub message: String,
    pub category: FeedbackCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl FeedbackItem {
    pub fn new(category: FeedbackCategory, priority: u32, message: impl Into<String>) -> Self {
        Self {
            priority,
            icon: category.icon().to_string(),
            message: message.into(),
            category,
            current_value: None,
            target_value: None,
            tolerance: None,
            unit: None,
        }
    }

    /// Attach measured and target values.
    pub fn with_values(
        mut self,
        current: f64,
        target: f64,
        tolerance: f64,
        unit: impl Into<String>,
    ) -> Self {
        self.current_value = Some(current);
        self.target_value = Some(target);
        self.tolerance = Some(tolerance);
        self.unit = Some(unit.into());
        self
    }
}

/// Physically realizable instruction chosen by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    TiltUp,
    TiltDown,
    MoveForwardTiltDown,
    MoveForwardTiltUp,
    MoveBackwardTiltDown,
    MoveBackwardTiltUp,
    ZoomIn,
    ZoomOut,
    ZoomInStepBack,
    ZoomInStepForward,
    ZoomOutStepBack,
    ZoomOutStepForward,
    MatchAspectRatio,
    AdjustPose,
    Hold,
}

impl ActionKind {
    pub fn is_zoom(&self) -> bool {
        matches!(
            self,
            Self::ZoomIn
                | Self::ZoomOut
                | Self::ZoomInStepBack
                | Self::ZoomInStepForward
                | Self::ZoomOutStepBack
                | Self::ZoomOutStepForward
        )
    }

    /// Number of physical motions the user has to perform.
    pub fn component_count(&self) -> usize {
        match self {
            Self::MoveForwardTiltDown
            | Self::MoveForwardTiltUp
            | Self::MoveBackwardTiltDown
            | Self::MoveBackwardTiltUp
            | Self::ZoomInStepBack
            | Self::ZoomInStepForward
            | Self::ZoomOutStepBack
            | Self::ZoomOutStepForward => 2,
            Self::Hold => 0,
            _ => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MoveForward => "move_forward",
            Self::MoveBackward => "move_backward",
            Self::MoveLeft => "move_left",
            Self::MoveRight => "move_right",
            Self::TiltUp => "tilt_up",
            Self::TiltDown => "tilt_down",
            Self::MoveForwardTiltDown => "move_forward_tilt_down",
            Self::MoveForwardTiltUp => "move_forward_tilt_up",
            Self::MoveBackwardTiltDown => "move_backward_tilt_down",
            Self::MoveBackwardTiltUp => "move_backward_tilt_up",
            Self::ZoomIn => "zoom_in",
            Self::ZoomOut => "zoom_out",
            Self::ZoomInStepBack => "zoom_in_step_back",
            Self::ZoomInStepForward => "zoom_in_step_forward",
            Self::ZoomOutStepBack => "zoom_out_step_back",
            Self::ZoomOutStepForward => "zoom_out_step_forward",
            Self::MatchAspectRatio => "match_aspect_ratio",
            Self::AdjustPose => "adjust_pose",
            Self::Hold => "hold",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One instruction predicted to resolve several failing gates at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UnifiedFeedback {
    pub primary_action: ActionKind,
    /// Action strength: zoom ratio for zoom actions, otherwise a `[0, 1]` amount
    pub magnitude: f64,
    /// Gates the action is predicted to fix
    pub expected_results: Vec<GateKind>,
    pub message: String,
    /// Ordered sub-steps for compound actions
    #[serde(default)]
    pub steps: Vec<String>,
}

impl UnifiedFeedback {
    pub fn new(
        primary_action: ActionKind,
        magnitude: f64,
        expected_results: Vec<GateKind>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            primary_action,
            magnitude,
            expected_results,
            message: message.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.steps = steps;
        self
    }

    pub fn hold(message: impl Into<String>) -> Self {
        Self::new(ActionKind::Hold, 0.0, Vec::new(), message)
    }

    pub fn fixes(&self, gate: GateKind) -> bool {
        self.expected_results.contains(&gate)
    }
}

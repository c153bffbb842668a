//! Five-gate composition evaluation.
//!
//! Each gate scores one aspect of the live frame against the reference:
//!
//! | Gate | Checks |
//! |------|--------|
//! | 0 | aspect ratio |
//! | 1 | shot type and subject size |
//! | 2 | subject position |
//! | 3 | background compression |
//! | 4 | pose |
//!
//! The evaluation is pure: the same reference and live snapshot always give
//! the same scores. Detailed [`FeedbackItem`]s are derived afterwards from
//! the failing gates and the measurements kept in [`GateDetails`].

use serde::Serialize;
use tracing::debug;
use tryangle_models::keypoint::{LEFT_HIP, LEFT_SHOULDER, RIGHT_HIP, RIGHT_SHOULDER};
use tryangle_models::{
    AspectRatio, FeedbackCategory, FeedbackItem, GateEvaluation, GateKind, GateResult, Keypoint,
    LensType, ShotType, Snapshot,
};

use crate::config::{CompressionMode, EngineConfig};
use crate::focal::focal_from_compression_index;
use crate::framing::occupancy;
use crate::margin::{self, MarginAnalysis, RelativeMargins, StepHint};
use crate::pose::groups::visible;
use crate::pose::{BodyGroup, Limb, PoseComparator, PoseComparison};

// ============================================================================
// Constants
// ============================================================================

/// Occupancy band used when the reference has no subject box.
pub const OCCUPANCY_BAND: (f64, f64) = (0.15, 0.8);

/// Compression band used when there is nothing to compare against.
pub const COMPRESSION_BAND: (f64, f64) = (0.3, 0.7);

/// Compression difference at which the relative score reaches zero.
const COMPRESSION_SPAN: f64 = 0.5;

/// Distance outside the band at which the absolute score reaches zero.
const COMPRESSION_BAND_FALLOFF: f64 = 0.3;

const SAME_CATEGORY_PENALTY: f64 = 0.15;
const PENALTY_PER_STEP: f64 = 0.4;

const MARGIN_WEIGHT: f64 = 0.8;
const STRUCTURAL_WEIGHT: f64 = 0.2;

/// Centre offset that earns its own position item.
const POSITION_ITEM_OFFSET: f64 = 0.05;

/// Relative occupancy error that earns a size item.
const SIZE_ITEM_ERROR: f64 = 0.1;

/// Feedback priorities: `gate index * 10 + sub-priority`.
pub mod priority {
    pub const ASPECT_RATIO: u32 = 0;
    pub const SHOT_TYPE: u32 = 10;
    pub const SUBJECT_SIZE: u32 = 11;
    pub const SUBJECT_CROPPED: u32 = 12;
    pub const BODY_CROPPED: u32 = 13;
    pub const HORIZONTAL: u32 = 20;
    pub const VERTICAL: u32 = 21;
    pub const COMPRESSION: u32 = 30;
    pub const LIMB_BASE: u32 = 40;
    pub const SHOULDER_TILT: u32 = 44;
    pub const FACE: u32 = 45;
    pub const HANDS: u32 = 46;
    pub const FEET: u32 = 47;
    pub const NO_SUBJECT: u32 = 90;
    pub const NO_REFERENCE: u32 = 99;
}

// ============================================================================
// Details
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AspectDetails {
    pub reference_ratio: f64,
    pub live_ratio: f64,
    /// `None` when either ratio is unknown
    pub relative_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FramingDetails {
    pub reference_shot: ShotType,
    pub live_shot: ShotType,
    /// `None` when the reference has no subject box
    pub reference_occupancy: Option<f64>,
    pub live_occupancy: f64,
    pub occupancy_score: f64,
    pub shot_penalty: f64,
    /// Live box touches two or more edges while the reference does not
    pub edge_cropped: bool,
    pub cropped_groups: Vec<BodyGroup>,
    pub live_margins: MarginAnalysis,
}

impl FramingDetails {
    pub fn is_cropped(&self) -> bool {
        self.edge_cropped || !self.cropped_groups.is_empty()
    }

    /// Signed relative size error, positive when the live subject is larger.
    pub fn size_error(&self) -> Option<f64> {
        self.reference_occupancy
            .map(|r| (self.live_occupancy - r) / r)
    }

    pub fn shot_mismatch(&self) -> bool {
        self.reference_shot.is_known()
            && self.live_shot.is_known()
            && !self.reference_shot.same_category(&self.live_shot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionDetails {
    /// `None` when the reference has no subject box
    pub relative: Option<RelativeMargins>,
    /// Live minus reference torso centroid, when both are visible
    pub structural_offset: Option<(f64, f64)>,
    pub structural_score: Option<f64>,
    /// Balance score used when there is no reference box
    pub balance_score: f64,
    /// Live offset from the balanced placement
    pub balance_offset: (f64, f64),
}

impl PositionDetails {
    /// Centre offset of the live subject relative to the reference, or to
    /// the balanced placement when the reference has no box.
    pub fn offset(&self) -> (f64, f64) {
        self.relative
            .map(|r| (r.dx, r.dy))
            .unwrap_or(self.balance_offset)
    }
}

/// How Gate 3 judged the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionPath {
    Relative,
    Band,
    Unjudged,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompressionDetails {
    pub path: CompressionPath,
    pub reference_index: Option<f64>,
    pub live_index: Option<f64>,
    /// Index the live frame has to reach
    pub target_index: Option<f64>,
    pub live_focal_35mm: Option<f64>,
    pub target_focal_35mm: Option<f64>,
}

/// Measurements behind each gate score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateDetails {
    pub aspect: AspectDetails,
    pub framing: FramingDetails,
    pub position: PositionDetails,
    pub compression: CompressionDetails,
    pub pose: PoseComparison,
}

/// Evaluation plus the measurements that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateReport {
    pub evaluation: GateEvaluation,
    pub details: GateDetails,
}

// ============================================================================
// Engine
// ============================================================================

/// Scores live snapshots against a reference.
#[derive(Debug, Clone)]
pub struct GateEngine {
    config: EngineConfig,
    pose: PoseComparator,
}

impl GateEngine {
    pub fn new(config: EngineConfig) -> Self {
        let pose = PoseComparator::new(config.pose.clone());
        Self { config, pose }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run all five gates.
    pub fn evaluate_snapshots(&self, reference: &Snapshot, live: &Snapshot) -> GateReport {
        let pose = self
            .pose
            .compare(&reference.keypoints, &live.keypoints, reference.shot_type);

        let aspect = self.aspect_details(reference, live);
        let framing = self.framing_details(reference, live, &pose);
        let position = self.position_details(reference, live);
        let compression = self.compression_details(reference, live);

        let details = GateDetails {
            aspect,
            framing,
            position,
            compression,
            pose,
        };

        let evaluation = GateEvaluation::from_fn(|kind| self.score_gate(kind, &details));

        debug!(
            overall = evaluation.overall_score(),
            passed = evaluation.passed_count(),
            "Gate evaluation complete"
        );

        GateReport {
            evaluation,
            details,
        }
    }

    fn score_gate(&self, kind: GateKind, details: &GateDetails) -> GateResult {
        let threshold = self.config.thresholds.for_gate(kind);
        match kind {
            GateKind::AspectRatio => self.aspect_gate(&details.aspect, threshold),
            GateKind::Framing => self.framing_gate(&details.framing, threshold),
            GateKind::Position => self.position_gate(&details.position, threshold),
            GateKind::Compression => self.compression_gate(&details.compression, threshold),
            GateKind::Pose => self.pose_gate(&details.pose, threshold),
        }
    }

    // ------------------------------------------------------------------------
    // Gate 0: aspect ratio
    // ------------------------------------------------------------------------

    fn aspect_details(&self, reference: &Snapshot, live: &Snapshot) -> AspectDetails {
        let known = |r: f64| r.is_finite() && r > 0.0;
        let relative_error = (known(reference.aspect_ratio) && known(live.aspect_ratio))
            .then(|| (live.aspect_ratio - reference.aspect_ratio).abs() / reference.aspect_ratio);
        AspectDetails {
            reference_ratio: reference.aspect_ratio,
            live_ratio: live.aspect_ratio,
            relative_error,
        }
    }

    fn aspect_gate(&self, aspect: &AspectDetails, threshold: f64) -> GateResult {
        let Some(error) = aspect.relative_error else {
            return GateResult::trivially_passed(
                GateKind::AspectRatio,
                threshold,
                "Aspect ratio unknown",
            );
        };

        let target = AspectRatio::closest(aspect.reference_ratio);
        if error <= self.config.aspect_ratio_tolerance {
            GateResult::new(
                GateKind::AspectRatio,
                1.0,
                threshold,
                format!("Aspect ratio matches ({})", target),
            )
        } else {
            GateResult::new(
                GateKind::AspectRatio,
                0.0,
                threshold,
                format!(
                    "Switch the camera to {} (currently {})",
                    target,
                    AspectRatio::closest(aspect.live_ratio)
                ),
            )
        }
    }

    // ------------------------------------------------------------------------
    // Gate 1: framing
    // ------------------------------------------------------------------------

    fn framing_details(
        &self,
        reference: &Snapshot,
        live: &Snapshot,
        pose: &PoseComparison,
    ) -> FramingDetails {
        let live_occupancy = occupancy(&live.bbox);
        let reference_occupancy = reference
            .has_subject()
            .then(|| occupancy(&reference.bbox));

        let occupancy_score = match reference_occupancy {
            Some(target) => (1.0 - (live_occupancy - target).abs() / target).clamp(0.0, 1.0),
            None => band_score(live_occupancy),
        };

        let shot_penalty = shot_penalty(reference.shot_type, live.shot_type);
        let live_margins = margin::analyze(&live.bbox);
        let reference_cropped = margin::analyze(&reference.bbox).cropped;

        FramingDetails {
            reference_shot: reference.shot_type,
            live_shot: live.shot_type,
            reference_occupancy,
            live_occupancy,
            occupancy_score,
            shot_penalty,
            edge_cropped: live_margins.cropped && !reference_cropped,
            cropped_groups: pose.cropped_groups.clone(),
            live_margins,
        }
    }

    fn framing_gate(&self, framing: &FramingDetails, threshold: f64) -> GateResult {
        let mut score = (1.0 - framing.shot_penalty) * framing.occupancy_score;
        if framing.is_cropped() {
            score = score.min(threshold * 0.5);
        }

        let feedback = if framing.is_cropped() {
            "Subject is cut off at the frame edge, step back".to_string()
        } else if framing.shot_penalty > 0.0 {
            format!(
                "Frame a {} (currently {})",
                framing.reference_shot.label(),
                framing.live_shot.label()
            )
        } else if let Some(target) = framing.reference_occupancy {
            size_message(framing.live_occupancy, target)
        } else if framing.live_occupancy < OCCUPANCY_BAND.0 {
            "Subject too small, move closer".to_string()
        } else if framing.live_occupancy > OCCUPANCY_BAND.1 {
            "Subject too large, step back".to_string()
        } else {
            "Framing matches".to_string()
        };

        let result = GateResult::new(GateKind::Framing, score, threshold, feedback);
        if result.passed {
            GateResult {
                feedback: "Framing matches".to_string(),
                ..result
            }
        } else {
            result
        }
    }

    // ------------------------------------------------------------------------
    // Gate 2: position
    // ------------------------------------------------------------------------

    fn position_details(&self, reference: &Snapshot, live: &Snapshot) -> PositionDetails {
        let relative = reference
            .has_subject()
            .then(|| margin::compare(&live.bbox, &reference.bbox));

        let structural_offset = self.torso_offset(&reference.keypoints, &live.keypoints);
        let structural_score = structural_offset
            .map(|(dx, dy)| (1.0 - 2.0 * (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0));

        PositionDetails {
            relative,
            structural_offset,
            structural_score,
            balance_score: margin::analyze(&live.bbox).balance_score,
            balance_offset: margin::balance_offset(&live.bbox),
        }
    }

    /// Offset between torso centroids over shoulders and hips seen on both sides.
    fn torso_offset(&self, reference: &[Keypoint], live: &[Keypoint]) -> Option<(f64, f64)> {
        let config = &self.config.pose;
        let torso = [LEFT_SHOULDER, RIGHT_SHOULDER, LEFT_HIP, RIGHT_HIP];
        let pairs: Vec<(&Keypoint, &Keypoint)> = torso
            .iter()
            .filter_map(|&i| Some((visible(reference, i, config)?, visible(live, i, config)?)))
            .collect();

        if pairs.is_empty() {
            return None;
        }

        let n = pairs.len() as f64;
        let (rx, ry, lx, ly) = pairs.iter().fold((0.0, 0.0, 0.0, 0.0), |acc, (r, l)| {
            (acc.0 + r.x, acc.1 + r.y, acc.2 + l.x, acc.3 + l.y)
        });
        Some(((lx - rx) / n, (ly - ry) / n))
    }

    fn position_gate(&self, position: &PositionDetails, threshold: f64) -> GateResult {
        let Some(relative) = position.relative else {
            let result = GateResult::new(
                GateKind::Position,
                position.balance_score,
                threshold,
                "Subject is well balanced",
            );
            if result.passed {
                return result;
            }
            let (dx, dy) = position.balance_offset;
            let feedback = if dx.abs() >= dy.abs() {
                horizontal_message(dx)
            } else {
                vertical_message(dy)
            };
            return GateResult { feedback, ..result };
        };

        let score = match position.structural_score {
            Some(structural) => {
                MARGIN_WEIGHT * relative.position_score + STRUCTURAL_WEIGHT * structural
            }
            None => relative.position_score,
        };

        let result = GateResult::new(GateKind::Position, score, threshold, "Position matches");
        if result.passed {
            return result;
        }

        let feedback = if relative.dx.abs() >= relative.dy.abs() {
            horizontal_message(relative.dx)
        } else {
            vertical_message(relative.dy)
        };
        GateResult { feedback, ..result }
    }

    // ------------------------------------------------------------------------
    // Gate 3: compression
    // ------------------------------------------------------------------------

    fn compression_details(&self, reference: &Snapshot, live: &Snapshot) -> CompressionDetails {
        let reference_index = reference.compression_index;
        let live_index = live.compression_index;

        let path = match (self.config.compression_mode, reference_index, live_index) {
            (CompressionMode::Auto | CompressionMode::ReferenceRelative, Some(_), Some(_)) => {
                CompressionPath::Relative
            }
            (CompressionMode::Auto | CompressionMode::AbsoluteBand, _, Some(_)) => {
                CompressionPath::Band
            }
            _ => CompressionPath::Unjudged,
        };

        let target_index = match (path, live_index) {
            (CompressionPath::Relative, _) => reference_index,
            (CompressionPath::Band, Some(live)) => {
                Some(live.clamp(COMPRESSION_BAND.0, COMPRESSION_BAND.1))
            }
            _ => None,
        };

        let live_focal_35mm = live
            .focal_length
            .map(|f| f.focal_length_35mm)
            .or_else(|| live_index.map(focal_from_compression_index));

        let target_focal_35mm = match path {
            CompressionPath::Relative => reference
                .focal_length
                .map(|f| f.focal_length_35mm)
                .or_else(|| target_index.map(focal_from_compression_index)),
            _ => target_index.map(focal_from_compression_index),
        };

        CompressionDetails {
            path,
            reference_index,
            live_index,
            target_index,
            live_focal_35mm,
            target_focal_35mm,
        }
    }

    fn compression_gate(&self, compression: &CompressionDetails, threshold: f64) -> GateResult {
        let (Some(live), Some(target)) = (compression.live_index, compression.target_index) else {
            return GateResult::trivially_passed(
                GateKind::Compression,
                threshold,
                "Compression cannot be judged",
            );
        };

        let score = match compression.path {
            CompressionPath::Relative => 1.0 - (live - target).abs() / COMPRESSION_SPAN,
            _ => 1.0 - (live - target).abs() / COMPRESSION_BAND_FALLOFF,
        };

        let result = GateResult::new(GateKind::Compression, score, threshold, "Lens matches");
        if result.passed {
            return result;
        }

        let wanted = LensType::from_compression_index(target);
        let current = LensType::from_compression_index(live);
        let feedback = if live < target {
            format!("Zoom in for a {} look (currently {})", wanted.label(), current.label())
        } else {
            format!("Zoom out for a {} look (currently {})", wanted.label(), current.label())
        };
        GateResult { feedback, ..result }
    }

    // ------------------------------------------------------------------------
    // Gate 4: pose
    // ------------------------------------------------------------------------

    fn pose_gate(&self, pose: &PoseComparison, threshold: f64) -> GateResult {
        if pose.skipped {
            return GateResult::trivially_passed(
                GateKind::Pose,
                threshold,
                "Reference pose too sparse to compare",
            );
        }

        let result = GateResult::new(GateKind::Pose, pose.accuracy, threshold, "Pose matches");
        if result.passed {
            return result;
        }

        let worst = pose
            .limbs
            .iter()
            .max_by(|a, b| a.total_difference.total_cmp(&b.total_difference));
        let feedback = match worst {
            Some(limb) => limb_message(limb.limb, limb.needs_raise()),
            None => "Adjust your pose".to_string(),
        };
        GateResult { feedback, ..result }
    }

    // ========================================================================
    // Feedback items
    // ========================================================================

    /// Detailed items for every failing gate, sorted by priority.
    pub fn feedback_items(&self, report: &GateReport) -> Vec<FeedbackItem> {
        let evaluation = &report.evaluation;
        let details = &report.details;
        let mut items = Vec::new();

        for result in evaluation.failing() {
            match result.gate {
                GateKind::AspectRatio => items.push(
                    FeedbackItem::new(
                        FeedbackCategory::AspectRatio,
                        priority::ASPECT_RATIO,
                        &result.feedback,
                    )
                    .with_values(
                        details.aspect.live_ratio,
                        details.aspect.reference_ratio,
                        self.config.aspect_ratio_tolerance,
                        "ratio",
                    ),
                ),
                GateKind::Framing => {
                    self.framing_items(&details.framing, &result.feedback, &mut items)
                }
                GateKind::Position => self.position_items(&details.position, &mut items),
                GateKind::Compression => {
                    let mut item = FeedbackItem::new(
                        FeedbackCategory::Compression,
                        priority::COMPRESSION,
                        &result.feedback,
                    );
                    if let (Some(live), Some(target)) =
                        (details.compression.live_index, details.compression.target_index)
                    {
                        let tolerance = COMPRESSION_SPAN * (1.0 - result.threshold);
                        item = item.with_values(live, target, tolerance, "index");
                    }
                    items.push(item);
                }
                GateKind::Pose => self.pose_items(&details.pose, &result.feedback, &mut items),
            }
        }

        items.sort_by_key(|i| i.priority);
        items
    }

    fn framing_items(
        &self,
        framing: &FramingDetails,
        fallback: &str,
        items: &mut Vec<FeedbackItem>,
    ) {
        let start = items.len();

        if framing.shot_mismatch() {
            items.push(FeedbackItem::new(
                FeedbackCategory::ShotType,
                priority::SHOT_TYPE,
                format!(
                    "Frame a {} (currently {})",
                    framing.reference_shot.label(),
                    framing.live_shot.label()
                ),
            ));
        }

        if let (Some(error), Some(target)) = (framing.size_error(), framing.reference_occupancy) {
            if error.abs() > SIZE_ITEM_ERROR {
                items.push(
                    FeedbackItem::new(
                        FeedbackCategory::SubjectSize,
                        priority::SUBJECT_SIZE,
                        size_message(framing.live_occupancy, target),
                    )
                    .with_values(
                        framing.live_occupancy * 100.0,
                        target * 100.0,
                        SIZE_ITEM_ERROR * 100.0,
                        "%",
                    ),
                );
            }
        }

        if framing.edge_cropped {
            items.push(FeedbackItem::new(
                FeedbackCategory::SubjectCropped,
                priority::SUBJECT_CROPPED,
                "Subject touches the frame edges, step back",
            ));
        }

        if !framing.cropped_groups.is_empty() {
            let names: Vec<&str> = framing.cropped_groups.iter().map(BodyGroup::label).collect();
            items.push(FeedbackItem::new(
                FeedbackCategory::BodyCropped,
                priority::BODY_CROPPED,
                format!("Keep the {} inside the frame", names.join(", ")),
            ));
        }

        if items.len() == start {
            items.push(FeedbackItem::new(
                FeedbackCategory::SubjectSize,
                priority::SUBJECT_SIZE,
                fallback,
            ));
        }
    }

    fn position_items(&self, position: &PositionDetails, items: &mut Vec<FeedbackItem>) {
        let (dx, dy) = position.offset();

        let horizontal = || {
            FeedbackItem::new(
                FeedbackCategory::HorizontalPosition,
                priority::HORIZONTAL,
                horizontal_message(dx),
            )
            .with_values(dx * 100.0, 0.0, POSITION_ITEM_OFFSET * 100.0, "%")
        };
        let vertical = || {
            FeedbackItem::new(
                FeedbackCategory::VerticalPosition,
                priority::VERTICAL,
                vertical_message(dy),
            )
            .with_values(dy * 100.0, 0.0, POSITION_ITEM_OFFSET * 100.0, "%")
        };

        let wide_x = dx.abs() > POSITION_ITEM_OFFSET;
        let wide_y = dy.abs() > POSITION_ITEM_OFFSET;
        if wide_x {
            items.push(horizontal());
        }
        if wide_y {
            items.push(vertical());
        }
        if !wide_x && !wide_y {
            if dx.abs() >= dy.abs() {
                items.push(horizontal());
            } else {
                items.push(vertical());
            }
        }
    }

    fn pose_items(&self, pose: &PoseComparison, fallback: &str, items: &mut Vec<FeedbackItem>) {
        let config = &self.config.pose;
        let start = items.len();

        for (offset, limb) in Limb::ALL.iter().enumerate() {
            let Some(cmp) = pose.limb(*limb) else { continue };
            if cmp.total_difference > config.limb_tolerance_degrees {
                items.push(
                    FeedbackItem::new(
                        limb.category(),
                        priority::LIMB_BASE + offset as u32,
                        limb_message(*limb, cmp.needs_raise()),
                    )
                    .with_values(
                        cmp.live_angle,
                        cmp.reference_angle,
                        config.limb_tolerance_degrees,
                        "°",
                    ),
                );
            }
        }

        if let Some(tilt) = pose.shoulder_tilt {
            if tilt.delta.abs() > config.shoulder_tilt_tolerance_degrees {
                let side = if tilt.delta > 0.0 { "left" } else { "right" };
                items.push(
                    FeedbackItem::new(
                        FeedbackCategory::ShoulderTilt,
                        priority::SHOULDER_TILT,
                        format!("Raise your {} shoulder slightly", side),
                    )
                    .with_values(
                        tilt.live_degrees,
                        tilt.reference_degrees,
                        config.shoulder_tilt_tolerance_degrees,
                        "°",
                    ),
                );
            }
        }

        if let Some(face) = pose.face {
            if face.delta.abs() > config.face_tolerance {
                // nose closer to the jaw end means the head turned toward the image right
                let side = if face.delta > 0.0 { "right" } else { "left" };
                items.push(
                    FeedbackItem::new(
                        FeedbackCategory::FaceOrientation,
                        priority::FACE,
                        format!("Turn your head a little to the {}", side),
                    )
                    .with_values(
                        face.live_ratio,
                        face.reference_ratio,
                        config.face_tolerance,
                        "ratio",
                    ),
                );
            }
        }

        if let Some(hand) = pose
            .hands
            .iter()
            .filter(|h| h.difference > config.hand_tolerance)
            .max_by(|a, b| a.difference.total_cmp(&b.difference))
        {
            items.push(FeedbackItem::new(
                FeedbackCategory::Hands,
                priority::HANDS,
                format!("Match the {} gesture", hand.side.label()),
            ));
        }

        if let Some(feet) = pose.feet {
            if feet.distance > config.feet_tolerance {
                items.push(
                    FeedbackItem::new(
                        FeedbackCategory::Feet,
                        priority::FEET,
                        "Adjust your stance to match the reference",
                    )
                    .with_values(feet.distance, 0.0, config.feet_tolerance, "frame"),
                );
            }
        }

        if items.len() == start {
            items.push(FeedbackItem::new(
                FeedbackCategory::LeftArm,
                priority::LIMB_BASE,
                fallback,
            ));
        }
    }
}

/// Item shown when there is nothing to evaluate.
pub fn missing_input_item(category: FeedbackCategory) -> FeedbackItem {
    match category {
        FeedbackCategory::NoReference => FeedbackItem::new(
            category,
            priority::NO_REFERENCE,
            "Select a reference photo to start",
        ),
        _ => FeedbackItem::new(
            FeedbackCategory::NoSubject,
            priority::NO_SUBJECT,
            "No subject detected, point the camera at the person",
        ),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn band_score(occupancy: f64) -> f64 {
    let (low, high) = OCCUPANCY_BAND;
    if occupancy < low {
        occupancy / low
    } else if occupancy > high {
        ((1.0 - occupancy) / (1.0 - high)).clamp(0.0, 1.0)
    } else {
        1.0
    }
}

fn shot_penalty(reference: ShotType, live: ShotType) -> f64 {
    if reference == live {
        return 0.0;
    }
    if reference.same_category(&live) {
        return SAME_CATEGORY_PENALTY;
    }
    match reference.steps_to(&live) {
        Some(steps) => (PENALTY_PER_STEP * steps as f64).min(1.0),
        None => 0.0,
    }
}

fn size_message(live: f64, target: f64) -> String {
    let percent = if target > 0.0 { (live - target) / target * 100.0 } else { 0.0 };
    let hint = StepHint::from_percent(percent).phrase();
    if live < target {
        format!("Subject too small, move closer {}", hint)
    } else {
        format!("Subject too large, step back {}", hint)
    }
}

fn horizontal_message(dx: f64) -> String {
    let hint = StepHint::from_percent(dx * 100.0).phrase();
    if dx > 0.0 {
        format!("Move the camera right {}", hint)
    } else {
        format!("Move the camera left {}", hint)
    }
}

fn vertical_message(dy: f64) -> String {
    let degrees = margin::tilt_degrees(dy * 100.0);
    if dy > 0.0 {
        format!("Tilt the camera down about {}°", degrees)
    } else {
        format!("Tilt the camera up about {}°", degrees)
    }
}

fn limb_message(limb: Limb, raise: bool) -> String {
    if raise {
        format!("Raise your {}", limb.label())
    } else {
        format!("Lower your {}", limb.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tryangle_models::{BoundingBox, ImageSize};

    fn snapshot(bbox: BoundingBox) -> Snapshot {
        let mut s = Snapshot::new(bbox, Vec::new(), ImageSize::new(3000, 4000));
        s.compression_index = Some(0.4);
        s
    }

    fn reference() -> Snapshot {
        snapshot(BoundingBox::new(0.3, 0.2, 0.4, 0.6))
    }

    #[test]
    fn test_identity_passes_everything() {
        let engine = GateEngine::new(EngineConfig::default());
        let reference = reference();
        let report = engine.evaluate_snapshots(&reference, &reference);
        assert!(report.evaluation.all_passed());
        assert!((report.evaluation.overall_score() - 1.0).abs() < 1e-9);
        assert!(engine.feedback_items(&report).is_empty());
    }

    #[test]
    fn test_aspect_mismatch_scores_zero() {
        let engine = GateEngine::new(EngineConfig::default());
        let reference = reference();
        let mut live = reference.clone();
        live.image_size = ImageSize::new(4000, 3000);
        live.aspect_ratio = 4.0 / 3.0;

        let report = engine.evaluate_snapshots(&reference, &live);
        let aspect = report.evaluation.result(GateKind::AspectRatio);
        assert_eq!(aspect.score, 0.0);
        assert!(aspect.feedback.contains("3:4"));
        assert_eq!(report.evaluation.primary_feedback(), aspect.feedback);
    }

    #[test]
    fn test_small_aspect_error_tolerated() {
        let engine = GateEngine::new(EngineConfig::default());
        let reference = reference();
        let mut live = reference.clone();
        live.aspect_ratio = reference.aspect_ratio * 1.015;
        let report = engine.evaluate_snapshots(&reference, &live);
        assert!(report.evaluation.passed(GateKind::AspectRatio));
    }

    #[test]
    fn test_framing_score_falls_with_size_error() {
        let engine = GateEngine::new(EngineConfig::default());
        let reference = reference();
        let mut last = f64::INFINITY;
        for width in [0.4, 0.35, 0.3, 0.2, 0.1] {
            let live = snapshot(BoundingBox::new(0.3, 0.2, width, 0.6));
            let score = engine
                .evaluate_snapshots(&reference, &live)
                .evaluation
                .result(GateKind::Framing)
                .score;
            assert!(score < last);
            last = score;
        }
    }

    #[test]
    fn test_shot_penalty_ladder() {
        assert_eq!(shot_penalty(ShotType::FullShot, ShotType::FullShot), 0.0);
        assert_eq!(shot_penalty(ShotType::BustShot, ShotType::MediumShot), 0.15);
        assert!((shot_penalty(ShotType::FullShot, ShotType::KneeShot) - 0.4).abs() < 1e-9);
        assert_eq!(shot_penalty(ShotType::FullShot, ShotType::CloseUp), 1.0);
        assert_eq!(shot_penalty(ShotType::FullShot, ShotType::Unknown), 0.0);
    }

    #[test]
    fn test_edge_crop_caps_framing() {
        let engine = GateEngine::new(EngineConfig::default());
        let reference = reference();
        // same area, but glued to the top-left corner
        let live = snapshot(BoundingBox::new(0.0, 0.0, 0.4, 0.6));
        let report = engine.evaluate_snapshots(&reference, &live);
        let framing = report.evaluation.result(GateKind::Framing);
        assert!(framing.score <= 0.65 * 0.5 + 1e-9);
        assert!(!framing.passed);
        let items = engine.feedback_items(&report);
        assert!(items.iter().any(|i| i.category == FeedbackCategory::SubjectCropped));
    }

    #[test]
    fn test_degenerate_reference_uses_band() {
        let engine = GateEngine::new(EngineConfig::default());
        let reference = snapshot(BoundingBox::empty());
        let live = snapshot(BoundingBox::new(0.3, 0.2, 0.4, 0.6));
        let report = engine.evaluate_snapshots(&reference, &live);
        assert!(report.details.framing.reference_occupancy.is_none());
        assert!(report.evaluation.passed(GateKind::Framing));
        assert_eq!(band_score(0.05), 0.05 / 0.15);
    }

    #[test]
    fn test_position_items_follow_offset() {
        let engine = GateEngine::new(EngineConfig::default());
        let reference = reference();
        let live = snapshot(BoundingBox::new(0.55, 0.2, 0.4, 0.6));
        let report = engine.evaluate_snapshots(&reference, &live);
        assert!(!report.evaluation.passed(GateKind::Position));

        let items = engine.feedback_items(&report);
        let horizontal = items
            .iter()
            .find(|i| i.category == FeedbackCategory::HorizontalPosition)
            .unwrap();
        assert_eq!(horizontal.priority, 20);
        assert!(horizontal.message.contains("right"));
        assert!(items.iter().all(|i| i.category != FeedbackCategory::VerticalPosition));
    }

    #[test]
    fn test_compression_relative_and_band() {
        let mut reference = reference();
        let mut live = reference.clone();
        live.compression_index = Some(0.9);

        let engine = GateEngine::new(EngineConfig::default());
        let report = engine.evaluate_snapshots(&reference, &live);
        let result = report.evaluation.result(GateKind::Compression);
        assert!((result.score - 0.0).abs() < 1e-9);
        assert!(result.feedback.starts_with("Zoom out"));
        assert_eq!(report.details.compression.path, CompressionPath::Relative);

        reference.compression_index = None;
        let report = engine.evaluate_snapshots(&reference, &live);
        assert_eq!(report.details.compression.path, CompressionPath::Band);
        let expected = 1.0 - (0.9 - 0.7) / 0.3;
        assert!((report.evaluation.result(GateKind::Compression).score - expected).abs() < 1e-9);

        live.compression_index = None;
        let report = engine.evaluate_snapshots(&reference, &live);
        assert_eq!(report.details.compression.path, CompressionPath::Unjudged);
        assert!(report.evaluation.passed(GateKind::Compression));
    }

    #[test]
    fn test_compression_mode_forces_band() {
        let reference = reference();
        let mut live = reference.clone();
        live.compression_index = Some(0.6);

        let relative = GateEngine::new(EngineConfig::default());
        let report = relative.evaluate_snapshots(&reference, &live);
        assert!((report.evaluation.result(GateKind::Compression).score - 0.6).abs() < 1e-9);

        let band = GateEngine::new(
            EngineConfig::default().with_compression_mode(CompressionMode::AbsoluteBand),
        );
        let report = band.evaluate_snapshots(&reference, &live);
        assert_eq!(report.evaluation.result(GateKind::Compression).score, 1.0);
    }

    #[test]
    fn test_missing_input_items() {
        let item = missing_input_item(FeedbackCategory::NoReference);
        assert_eq!(item.priority, 99);
        let item = missing_input_item(FeedbackCategory::NoSubject);
        assert_eq!(item.priority, 90);
    }
}

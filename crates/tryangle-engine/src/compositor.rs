//! Unified feedback compositor.
//!
//! Turns the failing gates into one physically realizable instruction. The
//! compositor only predicts which gates an action will fix; it never changes
//! a gate's pass/fail outcome.

use tryangle_models::{ActionKind, GateKind, UnifiedFeedback};

use crate::config::CompositorConfig;
use crate::gates::{GateReport, OCCUPANCY_BAND};
use crate::margin::{tilt_degrees, StepHint};

/// Offset below which no pan or tilt is suggested.
const MOVE_DEADZONE: f64 = 0.02;

/// Distance correction the frame needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeIssue {
    Closer,
    Farther,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalIssue {
    TiltUp,
    TiltDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalIssue {
    Left,
    Right,
}

/// Corrections the distance and position gates are asking for.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveIssues {
    pub size: Option<SizeIssue>,
    pub vertical: Option<VerticalIssue>,
    pub horizontal: Option<HorizontalIssue>,
    /// Relative size error in percent
    pub size_percent: f64,
    pub dx: f64,
    pub dy: f64,
}

impl MoveIssues {
    pub fn is_empty(&self) -> bool {
        self.size.is_none() && self.vertical.is_none() && self.horizontal.is_none()
    }
}

/// Physical components of a distance/position action.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    action: ActionKind,
    size: Option<SizeIssue>,
    vertical: Option<VerticalIssue>,
    horizontal: Option<HorizontalIssue>,
}

impl Candidate {
    const fn new(
        action: ActionKind,
        size: Option<SizeIssue>,
        vertical: Option<VerticalIssue>,
        horizontal: Option<HorizontalIssue>,
    ) -> Self {
        Self {
            action,
            size,
            vertical,
            horizontal,
        }
    }

    /// Issues this candidate resolves, `None` when any component is unwanted.
    fn coverage(&self, issues: &MoveIssues) -> Option<usize> {
        let covered = component_match(self.size, issues.size)?
            + component_match(self.vertical, issues.vertical)?
            + component_match(self.horizontal, issues.horizontal)?;
        (covered > 0).then_some(covered)
    }
}

fn component_match<T: PartialEq>(component: Option<T>, wanted: Option<T>) -> Option<usize> {
    match component {
        None => Some(0),
        Some(_) if component == wanted => Some(1),
        Some(_) => None,
    }
}

/// Candidates in fixed declaration order.
const CANDIDATES: [Candidate; 10] = {
    use HorizontalIssue as H;
    use SizeIssue as S;
    use VerticalIssue as V;
    [
        Candidate::new(ActionKind::MoveForward, Some(S::Closer), None, None),
        Candidate::new(ActionKind::MoveBackward, Some(S::Farther), None, None),
        Candidate::new(ActionKind::MoveLeft, None, None, Some(H::Left)),
        Candidate::new(ActionKind::MoveRight, None, None, Some(H::Right)),
        Candidate::new(ActionKind::TiltUp, None, Some(V::TiltUp), None),
        Candidate::new(ActionKind::TiltDown, None, Some(V::TiltDown), None),
        Candidate::new(ActionKind::MoveForwardTiltDown, Some(S::Closer), Some(V::TiltDown), None),
        Candidate::new(ActionKind::MoveForwardTiltUp, Some(S::Closer), Some(V::TiltUp), None),
        Candidate::new(ActionKind::MoveBackwardTiltDown, Some(S::Farther), Some(V::TiltDown), None),
        Candidate::new(ActionKind::MoveBackwardTiltUp, Some(S::Farther), Some(V::TiltUp), None),
    ]
};

/// Chooses the single action shown to the user.
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    config: CompositorConfig,
}

impl Compositor {
    pub fn new(config: CompositorConfig) -> Self {
        Self { config }
    }

    pub fn compose(&self, report: &GateReport) -> UnifiedFeedback {
        let evaluation = &report.evaluation;
        let failing = evaluation.failing_gates();

        if failing.is_empty() {
            return UnifiedFeedback::hold(evaluation.primary_feedback());
        }

        if failing.contains(&GateKind::AspectRatio) {
            return UnifiedFeedback::new(
                ActionKind::MatchAspectRatio,
                1.0,
                vec![GateKind::AspectRatio],
                &evaluation.result(GateKind::AspectRatio).feedback,
            );
        }

        if failing == [GateKind::Pose] {
            return adjust_pose(report);
        }

        if failing.contains(&GateKind::Compression) {
            if let Some(zoom) = self.zoom_action(report) {
                return zoom;
            }
        }

        let issues = move_issues(report);
        match best_candidate(&issues) {
            Some(candidate) => build_move(candidate, &issues),
            None if failing.contains(&GateKind::Pose) => adjust_pose(report),
            None => gate_action(report, failing[0]),
        }
    }

    /// Zoom action for a failing compression gate, `None` when the ratio is too small.
    fn zoom_action(&self, report: &GateReport) -> Option<UnifiedFeedback> {
        let compression = &report.details.compression;
        let current = compression.live_focal_35mm.filter(|f| *f > 0.0)?;
        let target = compression.target_focal_35mm.filter(|f| *f > 0.0)?;
        let ratio = target / current;
        if (ratio - 1.0).abs() <= self.config.zoom_ratio_threshold {
            return None;
        }

        let framing = &report.details.framing;
        let framing_failing = !report.evaluation.passed(GateKind::Framing);
        let predicted = framing.live_occupancy * ratio;
        let band = self.config.occupancy_band;

        let step = framing.reference_occupancy.and_then(|reference| {
            if predicted > reference * (1.0 + band) {
                Some((SizeIssue::Farther, (predicted - reference) / reference * 100.0))
            } else if predicted < reference * (1.0 - band) {
                Some((SizeIssue::Closer, (reference - predicted) / reference * 100.0))
            } else {
                None
            }
        });

        let zoom_in = ratio > 1.0;
        let zoom_step = if zoom_in {
            format!("Zoom in to {:.1}x", ratio)
        } else {
            format!("Zoom out to {:.1}x", ratio)
        };

        let in_band = framing.reference_occupancy.is_some() && step.is_none();
        let (action, steps) = match step {
            None => (
                if zoom_in { ActionKind::ZoomIn } else { ActionKind::ZoomOut },
                vec![zoom_step],
            ),
            Some((issue, percent)) => {
                let hint = StepHint::from_percent(percent).phrase();
                let action = match (zoom_in, issue) {
                    (true, SizeIssue::Farther) => ActionKind::ZoomInStepBack,
                    (true, SizeIssue::Closer) => ActionKind::ZoomInStepForward,
                    (false, SizeIssue::Farther) => ActionKind::ZoomOutStepBack,
                    (false, SizeIssue::Closer) => ActionKind::ZoomOutStepForward,
                };
                let move_step = match issue {
                    SizeIssue::Farther => format!("Step back {}", hint),
                    SizeIssue::Closer => format!("Step forward {}", hint),
                };
                (action, vec![zoom_step, move_step])
            }
        };

        let mut expected = vec![GateKind::Compression];
        if framing_failing && (in_band || step.is_some()) {
            expected.insert(0, GateKind::Framing);
        }

        let message = steps.join(", then ");
        let feedback = UnifiedFeedback::new(action, ratio, expected, message);
        Some(if steps.len() > 1 {
            feedback.with_steps(steps)
        } else {
            feedback
        })
    }
}

/// Read the distance and position corrections off the gate details.
pub fn move_issues(report: &GateReport) -> MoveIssues {
    let evaluation = &report.evaluation;
    let framing = &report.details.framing;
    let (dx, dy) = report.details.position.offset();

    let size_percent = framing.size_error().map(|e| e * 100.0).unwrap_or(0.0);

    let size = if evaluation.passed(GateKind::Framing) {
        None
    } else if framing.is_cropped() {
        Some(SizeIssue::Farther)
    } else if let (Some(reference), Some(live)) = (
        framing.reference_shot.order().filter(|_| framing.shot_penalty > 0.0),
        framing.live_shot.order(),
    ) {
        // a wider live shot means the camera is too far away
        if live > reference {
            Some(SizeIssue::Closer)
        } else {
            Some(SizeIssue::Farther)
        }
    } else if let Some(reference) = framing.reference_occupancy {
        if framing.live_occupancy < reference {
            Some(SizeIssue::Closer)
        } else {
            Some(SizeIssue::Farther)
        }
    } else if framing.live_occupancy < OCCUPANCY_BAND.0 {
        Some(SizeIssue::Closer)
    } else if framing.live_occupancy > OCCUPANCY_BAND.1 {
        Some(SizeIssue::Farther)
    } else {
        None
    };

    let position_failing = !evaluation.passed(GateKind::Position);
    let vertical = (position_failing && dy.abs() > MOVE_DEADZONE).then(|| {
        if dy > 0.0 {
            VerticalIssue::TiltDown
        } else {
            VerticalIssue::TiltUp
        }
    });
    let horizontal = (position_failing && dx.abs() > MOVE_DEADZONE).then(|| {
        if dx > 0.0 {
            HorizontalIssue::Right
        } else {
            HorizontalIssue::Left
        }
    });

    MoveIssues {
        size,
        vertical,
        horizontal,
        size_percent,
        dx,
        dy,
    }
}

/// Highest coverage first, then fewer components, then declaration order.
fn best_candidate(issues: &MoveIssues) -> Option<Candidate> {
    if issues.is_empty() {
        return None;
    }
    let mut best: Option<(usize, usize, Candidate)> = None;
    for candidate in CANDIDATES {
        let Some(coverage) = candidate.coverage(issues) else {
            continue;
        };
        let components = candidate.action.component_count();
        let better = match best {
            None => true,
            Some((c, k, _)) => coverage > c || (coverage == c && components < k),
        };
        if better {
            best = Some((coverage, components, candidate));
        }
    }
    best.map(|(_, _, c)| c)
}

fn build_move(candidate: Candidate, issues: &MoveIssues) -> UnifiedFeedback {
    let mut steps = Vec::new();
    let mut expected = Vec::new();
    let mut magnitude: f64 = 0.0;

    if let Some(size) = candidate.size {
        let hint = StepHint::from_percent(issues.size_percent).phrase();
        steps.push(match size {
            SizeIssue::Closer => format!("Move forward {}", hint),
            SizeIssue::Farther => format!("Step back {}", hint),
        });
        expected.push(GateKind::Framing);
        magnitude = magnitude.max((issues.size_percent / 100.0).abs());
    }

    if let Some(horizontal) = candidate.horizontal {
        let hint = StepHint::from_percent(issues.dx * 100.0).phrase();
        steps.push(match horizontal {
            HorizontalIssue::Left => format!("Move left {}", hint),
            HorizontalIssue::Right => format!("Move right {}", hint),
        });
        magnitude = magnitude.max(issues.dx.abs());
    }

    if let Some(vertical) = candidate.vertical {
        let degrees = tilt_degrees(issues.dy * 100.0);
        steps.push(match vertical {
            VerticalIssue::TiltUp => format!("Tilt up about {}°", degrees),
            VerticalIssue::TiltDown => format!("Tilt down about {}°", degrees),
        });
        magnitude = magnitude.max(issues.dy.abs());
    }

    if candidate.horizontal.is_some() || candidate.vertical.is_some() {
        expected.push(GateKind::Position);
    }

    let message = steps.join(", then ");
    let feedback = UnifiedFeedback::new(candidate.action, magnitude.min(1.0), expected, message);
    if steps.len() > 1 {
        feedback.with_steps(steps)
    } else {
        feedback
    }
}

/// Single-component action for one failing gate, used when no movement
/// candidate covers the detected issues.
fn gate_action(report: &GateReport, gate: GateKind) -> UnifiedFeedback {
    let details = &report.details;
    let result = report.evaluation.result(gate);
    let magnitude = (1.0 - result.score).clamp(0.0, 1.0);

    let action = match gate {
        GateKind::AspectRatio => ActionKind::MatchAspectRatio,
        GateKind::Framing => {
            let framing = &details.framing;
            let target = framing
                .reference_occupancy
                .unwrap_or((OCCUPANCY_BAND.0 + OCCUPANCY_BAND.1) / 2.0);
            if framing.live_occupancy < target {
                ActionKind::MoveForward
            } else {
                ActionKind::MoveBackward
            }
        }
        GateKind::Position => {
            let (dx, dy) = details.position.offset();
            match (dx.abs() >= dy.abs(), dx > 0.0, dy > 0.0) {
                (true, true, _) => ActionKind::MoveRight,
                (true, false, _) => ActionKind::MoveLeft,
                (false, _, true) => ActionKind::TiltDown,
                (false, _, false) => ActionKind::TiltUp,
            }
        }
        GateKind::Compression => {
            let compression = &details.compression;
            match (compression.live_index, compression.target_index) {
                (Some(live), Some(target)) if live > target => ActionKind::ZoomOut,
                _ => ActionKind::ZoomIn,
            }
        }
        GateKind::Pose => return adjust_pose(report),
    };

    UnifiedFeedback::new(action, magnitude, vec![gate], &result.feedback)
}

fn adjust_pose(report: &GateReport) -> UnifiedFeedback {
    let result = report.evaluation.result(GateKind::Pose);
    UnifiedFeedback::new(
        ActionKind::AdjustPose,
        1.0 - result.score,
        vec![GateKind::Pose],
        &result.feedback,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::gates::GateEngine;
    use tryangle_models::{BoundingBox, ImageSize, Snapshot};

    fn snapshot(bbox: BoundingBox, compression: f64) -> Snapshot {
        let mut s = Snapshot::new(bbox, Vec::new(), ImageSize::new(3000, 4000));
        s.compression_index = Some(compression);
        s
    }

    fn compose(reference: &Snapshot, live: &Snapshot) -> UnifiedFeedback {
        let report = GateEngine::new(EngineConfig::default()).evaluate_snapshots(reference, live);
        Compositor::default().compose(&report)
    }

    #[test]
    fn test_identity_holds() {
        let reference = snapshot(BoundingBox::new(0.3, 0.2, 0.4, 0.6), 0.4);
        let unified = compose(&reference, &reference);
        assert_eq!(unified.primary_action, ActionKind::Hold);
        assert!(unified.expected_results.is_empty());
    }

    #[test]
    fn test_off_balance_subject_without_reference_box_moves() {
        let reference = snapshot(BoundingBox::empty(), 0.4);
        let live = snapshot(BoundingBox::new(0.0, 0.3, 0.3, 0.4), 0.4);
        let report = GateEngine::new(EngineConfig::default()).evaluate_snapshots(&reference, &live);
        assert!(!report.evaluation.passed(GateKind::Position));

        let unified = Compositor::default().compose(&report);
        assert_ne!(unified.primary_action, ActionKind::Hold);
        assert!(unified.fixes(GateKind::Position));
        // left of centre and low, the horizontal move is declared first
        assert_eq!(unified.primary_action, ActionKind::MoveLeft);
    }

    #[test]
    fn test_failing_gate_never_holds() {
        let reference = snapshot(BoundingBox::empty(), 0.4);
        let live = snapshot(BoundingBox::new(0.0, 0.3, 0.3, 0.4), 0.4);
        let mut report =
            GateEngine::new(EngineConfig::default()).evaluate_snapshots(&reference, &live);
        // offsets inside the deadzone leave no movement candidate
        report.details.position.balance_offset = (0.01, 0.0);

        let unified = Compositor::default().compose(&report);
        assert_eq!(unified.primary_action, ActionKind::MoveRight);
        assert_eq!(unified.expected_results, vec![GateKind::Position]);
    }

    #[test]
    fn test_small_subject_moves_forward() {
        let reference = snapshot(BoundingBox::new(0.3, 0.2, 0.4, 0.6), 0.4);
        let live = snapshot(BoundingBox::new(0.4, 0.35, 0.2, 0.3), 0.4);
        let unified = compose(&reference, &live);
        assert_eq!(unified.primary_action, ActionKind::MoveForward);
        assert_eq!(unified.expected_results, vec![GateKind::Framing]);
        assert!(unified.message.starts_with("Move forward"));
    }

    #[test]
    fn test_low_and_small_subject_gets_compound_action() {
        let reference = snapshot(BoundingBox::new(0.3, 0.2, 0.4, 0.6), 0.4);
        let live = snapshot(BoundingBox::new(0.4, 0.65, 0.2, 0.3), 0.4);
        let unified = compose(&reference, &live);
        assert_eq!(unified.primary_action, ActionKind::MoveForwardTiltDown);
        assert_eq!(unified.expected_results, vec![GateKind::Framing, GateKind::Position]);
        assert_eq!(unified.steps.len(), 2);
    }

    #[test]
    fn test_zoom_in_when_lens_too_wide() {
        let reference = snapshot(BoundingBox::new(0.3, 0.2, 0.4, 0.6), 0.8);
        let live = snapshot(BoundingBox::new(0.3, 0.2, 0.4, 0.6), 0.3);
        let unified = compose(&reference, &live);
        assert!(unified.primary_action.is_zoom());
        assert!(unified.magnitude > 1.1);
        assert!(unified.fixes(GateKind::Compression));
        // same occupancy now would overshoot after zooming in
        assert_eq!(unified.primary_action, ActionKind::ZoomInStepBack);
    }

    #[test]
    fn test_tie_prefers_declaration_order() {
        let issues = MoveIssues {
            size: Some(SizeIssue::Closer),
            horizontal: Some(HorizontalIssue::Right),
            ..Default::default()
        };
        let best = best_candidate(&issues).unwrap();
        assert_eq!(best.action, ActionKind::MoveForward);

        let issues = MoveIssues {
            horizontal: Some(HorizontalIssue::Left),
            vertical: Some(VerticalIssue::TiltUp),
            ..Default::default()
        };
        assert_eq!(best_candidate(&issues).unwrap().action, ActionKind::MoveLeft);
        assert!(best_candidate(&MoveIssues::default()).is_none());
    }

    #[test]
    fn test_compound_beats_single_components() {
        let issues = MoveIssues {
            size: Some(SizeIssue::Farther),
            vertical: Some(VerticalIssue::TiltUp),
            ..Default::default()
        };
        assert_eq!(
            best_candidate(&issues).unwrap().action,
            ActionKind::MoveBackwardTiltUp
        );
    }
}

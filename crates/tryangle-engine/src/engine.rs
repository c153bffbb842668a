//! Composition engine facade.
//!
//! One explicitly constructed instance per capture session. Its state is
//! only mutated through [`CompositionEngine::set_reference`],
//! [`CompositionEngine::reset`], pause/resume and
//! [`CompositionEngine::evaluate`].

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};
use tryangle_models::{
    FeedbackCategory, FeedbackItem, GateEvaluation, ReferenceSnapshot, Snapshot, UnifiedFeedback,
};

use crate::compositor::Compositor;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::gates::{missing_input_item, GateEngine, GateReport};
use crate::metrics;
use crate::snapshot::LiveFrameInputs;
use crate::stabilizer::{CategoryStatus, CompletedEvent, FeedbackStabilizer};

/// Everything the UI needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    /// `None` when gate scoring was bypassed
    pub evaluation: Option<GateEvaluation>,
    pub unified: Option<UnifiedFeedback>,
    /// Stabilized items, most important first
    pub feedback: Vec<FeedbackItem>,
    pub is_perfect: bool,
    /// Overall gate score, 0.0 without an evaluation
    pub perfect_score: f64,
    pub statuses: BTreeMap<FeedbackCategory, CategoryStatus>,
    pub completed: Vec<CompletedEvent>,
    /// The perfect lock engaged on this frame
    pub newly_perfect: bool,
    pub paused: bool,
}

impl FrameReport {
    pub fn primary_feedback(&self) -> Option<&str> {
        self.evaluation.as_ref().map(GateEvaluation::primary_feedback)
    }
}

/// Stateful composition engine.
#[derive(Debug)]
pub struct CompositionEngine {
    config: EngineConfig,
    gates: GateEngine,
    compositor: Compositor,
    stabilizer: FeedbackStabilizer,
    reference: Option<ReferenceSnapshot>,
    paused: bool,
}

impl CompositionEngine {
    /// Create an engine from a validated configuration.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            gates: GateEngine::new(config.clone()),
            compositor: Compositor::new(config.compositor),
            stabilizer: FeedbackStabilizer::new(config.stabilizer),
            reference: None,
            paused: false,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Publish a new reference; feedback history starts over.
    pub fn set_reference(&mut self, reference: ReferenceSnapshot) {
        info!(
            shot_type = %reference.shot_type,
            has_subject = reference.has_subject(),
            "Reference set"
        );
        self.reference = Some(reference);
        self.stabilizer.reset();
    }

    pub fn reference(&self) -> Option<&ReferenceSnapshot> {
        self.reference.as_ref()
    }

    /// Drop the reference and all feedback history.
    pub fn reset(&mut self) {
        self.reference = None;
        self.stabilizer.reset();
        debug!("Engine reset");
    }

    /// Make evaluations no-ops until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.stabilizer.reset();
            debug!("Engine paused");
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            debug!("Engine resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Evaluate a live frame against the current reference.
    pub fn evaluate(&mut self, inputs: &LiveFrameInputs, now: Instant) -> FrameReport {
        if self.paused {
            return self.paused_report();
        }
        let Some(reference) = self.reference.clone() else {
            return self.missing_input(FeedbackCategory::NoReference, now);
        };
        self.evaluate_against(&reference, inputs, now)
    }

    /// Evaluate a live frame against an explicit reference.
    pub fn evaluate_against(
        &mut self,
        reference: &ReferenceSnapshot,
        inputs: &LiveFrameInputs,
        now: Instant,
    ) -> FrameReport {
        if self.paused {
            return self.paused_report();
        }
        let live = inputs.to_snapshot(None, &self.config.pose);
        self.evaluate_snapshot(reference, &live, now)
    }

    /// Evaluate an already-built live snapshot.
    pub fn evaluate_snapshot(
        &mut self,
        reference: &Snapshot,
        live: &Snapshot,
        now: Instant,
    ) -> FrameReport {
        if self.paused {
            return self.paused_report();
        }
        if !live.has_subject() {
            return self.missing_input(FeedbackCategory::NoSubject, now);
        }

        let started = Instant::now();
        let report = self.gates.evaluate_snapshots(reference, live);
        let items = self.gates.feedback_items(&report);
        let unified = self.compositor.compose(&report);
        let GateReport { evaluation, .. } = report;

        let stabilized = self
            .stabilizer
            .update(items, evaluation.all_passed(), now);

        metrics::record_evaluation(&evaluation, started.elapsed().as_secs_f64());
        if stabilized.newly_perfect {
            metrics::record_perfect_lock();
            info!(
                streak = stabilized.perfect_streak,
                score = evaluation.overall_score(),
                "Composition locked"
            );
        }

        FrameReport {
            perfect_score: evaluation.overall_score(),
            evaluation: Some(evaluation),
            unified: Some(unified),
            feedback: stabilized.items,
            is_perfect: stabilized.is_perfect,
            statuses: stabilized.statuses,
            completed: stabilized.completed,
            newly_perfect: stabilized.newly_perfect,
            paused: false,
        }
    }

    /// Gate scoring bypassed; only the missing-input notice is shown.
    fn missing_input(&mut self, category: FeedbackCategory, now: Instant) -> FrameReport {
        self.stabilizer.interrupt();
        metrics::record_missing_input(category.as_str());
        FrameReport {
            evaluation: None,
            unified: None,
            feedback: vec![missing_input_item(category)],
            is_perfect: false,
            perfect_score: 0.0,
            statuses: self.stabilizer.statuses(),
            completed: self.stabilizer.completed(now),
            newly_perfect: false,
            paused: false,
        }
    }

    fn paused_report(&self) -> FrameReport {
        FrameReport {
            evaluation: None,
            unified: None,
            feedback: Vec::new(),
            is_perfect: false,
            perfect_score: 0.0,
            statuses: self.stabilizer.statuses(),
            completed: Vec::new(),
            newly_perfect: false,
            paused: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StabilizerConfig;
    use tryangle_models::{BoundingBox, ImageSize};

    fn inputs(bbox: BoundingBox) -> LiveFrameInputs {
        LiveFrameInputs::new(ImageSize::new(1080, 1440)).with_bbox(bbox)
    }

    fn reference() -> ReferenceSnapshot {
        ReferenceSnapshot::new(
            inputs(BoundingBox::new(0.3, 0.2, 0.4, 0.6)).to_snapshot(None, &Default::default()),
        )
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.thresholds.framing = 1.5;
        assert!(CompositionEngine::new(config).is_err());
    }

    #[test]
    fn test_no_reference_notice() {
        let mut engine = CompositionEngine::new(EngineConfig::default()).unwrap();
        let report = engine.evaluate(&inputs(BoundingBox::new(0.3, 0.2, 0.4, 0.6)), Instant::now());
        assert!(report.evaluation.is_none());
        assert_eq!(report.feedback.len(), 1);
        assert_eq!(report.feedback[0].category, FeedbackCategory::NoReference);
        assert_eq!(report.feedback[0].priority, 99);
    }

    #[test]
    fn test_no_subject_bypasses_gates() {
        let mut engine = CompositionEngine::new(EngineConfig::default()).unwrap();
        engine.set_reference(reference());
        let report = engine.evaluate(&inputs(BoundingBox::empty()), Instant::now());
        assert!(report.evaluation.is_none());
        assert_eq!(report.feedback[0].category, FeedbackCategory::NoSubject);
    }

    #[test]
    fn test_matching_frame_reaches_perfect() {
        let mut engine = CompositionEngine::new(EngineConfig::default()).unwrap();
        engine.set_reference(reference());
        let now = Instant::now();
        let frame = inputs(BoundingBox::new(0.3, 0.2, 0.4, 0.6));

        let mut reports = (0..5).map(|_| engine.evaluate(&frame, now));
        let first = reports.next().unwrap();
        assert!(first.evaluation.as_ref().unwrap().all_passed());
        assert!(!first.is_perfect);
        let last = reports.last().unwrap();
        assert!(last.is_perfect);
        assert!(last.newly_perfect);
        assert!((last.perfect_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pause_is_noop_and_resets_hysteresis() {
        let config = EngineConfig::default().with_stabilizer(StabilizerConfig {
            history_threshold: 1,
            ..Default::default()
        });
        let mut engine = CompositionEngine::new(config).unwrap();
        engine.set_reference(reference());
        let now = Instant::now();
        let small = inputs(BoundingBox::new(0.4, 0.35, 0.2, 0.3));

        assert!(!engine.evaluate(&small, now).feedback.is_empty());

        engine.pause();
        let paused = engine.evaluate(&small, now);
        assert!(paused.paused);
        assert!(paused.evaluation.is_none());
        assert!(paused.feedback.is_empty());
        assert!(paused
            .statuses
            .values()
            .all(|s| *s == CategoryStatus::Satisfied));

        engine.resume();
        assert!(engine.evaluate(&small, now).evaluation.is_some());
    }

    #[test]
    fn test_set_reference_resets_history() {
        let config = EngineConfig::default().with_stabilizer(StabilizerConfig {
            history_threshold: 1,
            ..Default::default()
        });
        let mut engine = CompositionEngine::new(config).unwrap();
        engine.set_reference(reference());
        let now = Instant::now();
        engine.evaluate(&inputs(BoundingBox::new(0.4, 0.35, 0.2, 0.3)), now);

        engine.set_reference(reference());
        assert!(engine
            .evaluate(&inputs(BoundingBox::new(0.3, 0.2, 0.4, 0.6)), now)
            .completed
            .is_empty());
    }
}

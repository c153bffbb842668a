//! Engine metrics.
//!
//! Recorded through the `metrics` facade; binaries decide whether a
//! recorder (e.g. Prometheus) is installed.

use metrics::{counter, gauge, histogram};
use tryangle_models::{GateEvaluation, ThermalState};

use crate::scheduler::PipelineStage;

/// Metric names as constants for consistency.
pub mod names {
    // Evaluation metrics
    pub const EVALUATIONS_TOTAL: &str = "tryangle_evaluations_total";
    pub const EVALUATION_DURATION_SECONDS: &str = "tryangle_evaluation_duration_seconds";
    pub const GATE_RESULTS_TOTAL: &str = "tryangle_gate_results_total";
    pub const PERFECT_LOCKS_TOTAL: &str = "tryangle_perfect_locks_total";
    pub const MISSING_INPUT_TOTAL: &str = "tryangle_missing_input_total";

    // Session metrics
    pub const FRAMES_DROPPED_TOTAL: &str = "tryangle_frames_dropped_total";
    pub const REFERENCES_ANALYZED_TOTAL: &str = "tryangle_references_analyzed_total";
    pub const COLLABORATOR_FAILURES_TOTAL: &str = "tryangle_collaborator_failures_total";

    // Scheduler metrics
    pub const STAGES_SKIPPED_TOTAL: &str = "tryangle_stages_skipped_total";
    pub const THERMAL_TIER: &str = "tryangle_thermal_tier";
}

/// Record a completed evaluation and its per-gate outcome.
pub fn record_evaluation(evaluation: &GateEvaluation, duration_secs: f64) {
    let labels = [("all_passed", evaluation.all_passed().to_string())];
    counter!(names::EVALUATIONS_TOTAL, &labels).increment(1);
    histogram!(names::EVALUATION_DURATION_SECONDS).record(duration_secs);

    for result in evaluation.results() {
        let labels = [
            ("gate", result.gate.as_str().to_string()),
            ("passed", result.passed.to_string()),
        ];
        counter!(names::GATE_RESULTS_TOTAL, &labels).increment(1);
    }
}

/// Record a frame that skipped gate scoring for lack of input.
pub fn record_missing_input(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::MISSING_INPUT_TOTAL, &labels).increment(1);
}

pub fn record_perfect_lock() {
    counter!(names::PERFECT_LOCKS_TOTAL).increment(1);
}

/// Record a frame dropped because an evaluation was already in flight.
pub fn record_frame_dropped() {
    counter!(names::FRAMES_DROPPED_TOTAL).increment(1);
}

pub fn record_reference_analyzed(has_subject: bool) {
    let labels = [("has_subject", has_subject.to_string())];
    counter!(names::REFERENCES_ANALYZED_TOTAL, &labels).increment(1);
}

pub fn record_collaborator_failure(provider: &str) {
    let labels = [("provider", provider.to_string())];
    counter!(names::COLLABORATOR_FAILURES_TOTAL, &labels).increment(1);
}

pub fn record_stage_skipped(stage: PipelineStage) {
    let labels = [("stage", stage.as_str().to_string())];
    counter!(names::STAGES_SKIPPED_TOTAL, &labels).increment(1);
}

pub fn record_thermal_state(state: ThermalState) {
    gauge!(names::THERMAL_TIER).set(state.tier() as f64);
}

//! Gate results and the five-gate evaluation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::keypoint::clamp_unit;

/// Message reported when every gate passes.
pub const SUCCESS_MESSAGE: &str = "Perfect! Everything matches the reference";

/// The five composition criteria, in evaluation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    AspectRatio,
    Framing,
    Position,
    Compression,
    Pose,
}

impl GateKind {
    /// All gates in fixed order. Never reordered.
    pub const ALL: [GateKind; 5] = [
        GateKind::AspectRatio,
        GateKind::Framing,
        GateKind::Position,
        GateKind::Compression,
        GateKind::Pose,
    ];

    pub fn index(&self) -> usize {
        match self {
            Self::AspectRatio => 0,
            Self::Framing => 1,
            Self::Position => 2,
            Self::Compression => 3,
            Self::Pose => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AspectRatio => "aspect_ratio",
            Self::Framing => "framing",
            Self::Position => "position",
            Self::Compression => "compression",
            Self::Pose => "pose",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AspectRatio => "Aspect ratio",
            Self::Framing => "Framing",
            Self::Position => "Position",
            Self::Compression => "Compression",
            Self::Pose => "Pose",
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GateResult {
    pub gate: GateKind,
    /// Score in `[0, 1]`
    pub score: f64,
    /// Pass threshold in `[0, 1]`
    pub threshold: f64,
    /// `score >= threshold`
    pub passed: bool,
    /// Correction message (or confirmation when passed)
    pub feedback: String,
}

impl GateResult {
    /// Build a result; `passed` is derived, never supplied.
    pub fn new(gate: GateKind, score: f64, threshold: f64, feedback: impl Into<String>) -> Self {
        let score = clamp_unit(score);
        let threshold = clamp_unit(threshold);
        Self {
            gate,
            score,
            threshold,
            passed: score >= threshold,
            feedback: feedback.into(),
        }
    }

    /// A gate that could not be judged and therefore does not penalize.
    pub fn trivially_passed(gate: GateKind, threshold: f64, feedback: impl Into<String>) -> Self {
        Self::new(gate, 1.0, threshold, feedback)
    }
}

/// Exactly five gate results in fixed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GateEvaluation {
    results: [GateResult; 5],
}

impl GateEvaluation {
    /// Build an evaluation by scoring each gate in order.
    ///
    /// The gate tag on each result is forced to the kind it was produced
    /// for, so the fixed order holds by construction.
    pub fn from_fn(mut score: impl FnMut(GateKind) -> GateResult) -> Self {
        let results = std::array::from_fn(|i| {
            let kind = GateKind::ALL[i];
            let mut result = score(kind);
            result.gate = kind;
            result
        });
        Self { results }
    }

    pub fn results(&self) -> &[GateResult; 5] {
        &self.results
    }

    pub fn result(&self, gate: GateKind) -> &GateResult {
        &self.results[gate.index()]
    }

    pub fn passed(&self, gate: GateKind) -> bool {
        self.result(gate).passed
    }

    /// Mean of the five scores.
    pub fn overall_score(&self) -> f64 {
        self.results.iter().map(|r| r.score).sum::<f64>() / self.results.len() as f64
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// True only when all five gates pass.
    pub fn all_passed(&self) -> bool {
        self.passed_count() == GateKind::ALL.len()
    }

    /// Failing gates, lowest order first.
    pub fn failing(&self) -> impl Iterator<Item = &GateResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Failing gate kinds, lowest order first.
    pub fn failing_gates(&self) -> Vec<GateKind> {
        self.failing().map(|r| r.gate).collect()
    }

    /// Message of the lowest-ordered failing gate, or the success message.
    pub fn primary_feedback(&self) -> &str {
        self.failing()
            .next()
            .map(|r| r.feedback.as_str())
            .unwrap_or(SUCCESS_MESSAGE)
    }

    /// Messages of every failing gate.
    pub fn all_feedbacks(&self) -> Vec<String> {
        self.failing().map(|r| r.feedback.clone()).collect()
    }
}

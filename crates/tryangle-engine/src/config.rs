//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tryangle_models::{GateKind, ThermalState};

use crate::error::{EngineError, EngineResult};

/// Which scoring path Gate 3 takes.
///
/// Deployments differ in whether both snapshots reliably carry a
/// compression index, so the path is a configuration choice.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMode {
    /// Reference-relative when both indices exist, else the absolute band.
    #[default]
    Auto,
    /// Always compare against the reference; unjudgeable without both indices.
    ReferenceRelative,
    /// Always judge the live index against the ideal band.
    AbsoluteBand,
}

impl CompressionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::ReferenceRelative => "reference_relative",
            Self::AbsoluteBand => "absolute_band",
        }
    }
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CompressionMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "reference_relative" | "relative" => Ok(Self::ReferenceRelative),
            "absolute_band" | "absolute" | "band" => Ok(Self::AbsoluteBand),
            _ => Err(EngineError::invalid_config(format!(
                "unknown compression mode: {}",
                s
            ))),
        }
    }
}

/// Pass thresholds for the five gates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GateThresholds {
    /// Binary gate, so anything below 1.0 would let a mismatch through
    pub aspect_ratio: f64,
    pub framing: f64,
    pub position: f64,
    pub compression: f64,
    pub pose: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            aspect_ratio: 1.0,
            framing: 0.65,
            position: 0.70,
            compression: 0.60,
            pose: 0.70,
        }
    }
}

impl GateThresholds {
    pub fn for_gate(&self, gate: GateKind) -> f64 {
        match gate {
            GateKind::AspectRatio => self.aspect_ratio,
            GateKind::Framing => self.framing,
            GateKind::Position => self.position,
            GateKind::Compression => self.compression,
            GateKind::Pose => self.pose,
        }
    }
}

/// Pose comparison settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoseConfig {
    // ============================================
    // Visibility tiers
    // ============================================
    /// Confidence needed for body and feet keypoints.
    pub body_confidence: f64,

    /// Confidence needed for face keypoints.
    pub face_confidence: f64,

    /// Confidence needed for hand keypoints.
    pub hand_confidence: f64,

    /// Reference needs at least this many visible keypoints to be judged.
    pub min_reference_keypoints: usize,

    // ============================================
    // Limb scoring
    // ============================================
    /// Degrees added per unit of `(1 - cosine)` direction dissimilarity.
    pub direction_penalty_degrees: f64,

    /// Total limb difference (degrees) above which a limb gets feedback.
    pub limb_tolerance_degrees: f64,

    // ============================================
    // Secondary checks
    // ============================================
    /// Shoulder tilt difference (degrees) above which feedback is given.
    pub shoulder_tilt_tolerance_degrees: f64,

    /// Face orientation ratio difference above which feedback is given.
    pub face_tolerance: f64,

    /// Mean finger dissimilarity above which hand feedback is given.
    pub hand_tolerance: f64,

    /// Foot centroid offset (normalized) above which feedback is given.
    pub feet_tolerance: f64,

    // ============================================
    // Crop detection
    // ============================================
    /// Live confidence band that reads as "cut by the frame edge".
    pub crop_confidence_min: f64,
    pub crop_confidence_max: f64,

    /// Distance from an edge (normalized) counting as "at the edge".
    pub crop_edge_margin: f64,

    /// Reference confidence a cropped point must have had.
    pub crop_reference_confidence: f64,

    /// Fraction of a group's points that must be cropped.
    pub crop_group_fraction: f64,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            body_confidence: 0.5,
            face_confidence: 0.4,
            hand_confidence: 0.3,
            min_reference_keypoints: 5,
            direction_penalty_degrees: 30.0,
            limb_tolerance_degrees: 15.0,
            shoulder_tilt_tolerance_degrees: 5.0,
            face_tolerance: 0.1,
            hand_tolerance: 0.3,
            feet_tolerance: 0.1,
            crop_confidence_min: 0.1,
            crop_confidence_max: 0.3,
            crop_edge_margin: 0.05,
            crop_reference_confidence: 0.5,
            crop_group_fraction: 0.5,
        }
    }
}

/// Hysteresis settings for the feedback stabilizer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StabilizerConfig {
    /// Consecutive detections before a category is surfaced.
    pub history_threshold: u32,

    /// Consecutive absences before a surfaced category is cleared.
    pub disappeared_threshold: u32,

    /// Consecutive all-passed frames before the ready signal.
    pub perfect_threshold: u32,

    /// How long a "completed" event stays visible (ms).
    pub completed_display_ms: u64,

    /// Maximum surfaced items returned per frame.
    pub max_items: usize,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            history_threshold: 3,
            disappeared_threshold: 2,
            perfect_threshold: 5,
            completed_display_ms: 2_000,
            max_items: 5,
        }
    }
}

impl StabilizerConfig {
    pub fn completed_display(&self) -> Duration {
        Duration::from_millis(self.completed_display_ms)
    }
}

/// Frame intervals for level-2 and level-3 stages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageIntervals {
    /// Level 2 runs every N frames.
    pub level2_every: u32,
    /// Level 3 runs every M frames (M > N).
    pub level3_every: u32,
}

impl StageIntervals {
    pub const fn new(level2_every: u32, level3_every: u32) -> Self {
        Self {
            level2_every,
            level3_every,
        }
    }
}

/// Thermal ladder for the frame scheduler.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub nominal: StageIntervals,
    pub fair: StageIntervals,
    pub serious: StageIntervals,
    pub critical: StageIntervals,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            nominal: StageIntervals::new(2, 6),
            fair: StageIntervals::new(3, 10),
            serious: StageIntervals::new(5, 20),
            critical: StageIntervals::new(10, 40),
        }
    }
}

impl SchedulerConfig {
    pub fn intervals(&self, thermal: ThermalState) -> StageIntervals {
        match thermal {
            ThermalState::Nominal => self.nominal,
            ThermalState::Fair => self.fair,
            ThermalState::Serious => self.serious,
            ThermalState::Critical => self.critical,
        }
    }
}

/// Unified-action compositor settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CompositorConfig {
    /// Zoom is suggested only when `|zoom_ratio - 1|` exceeds this.
    pub zoom_ratio_threshold: f64,

    /// Relative band around the target occupancy treated as "right size".
    pub occupancy_band: f64,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            zoom_ratio_threshold: 0.1,
            occupancy_band: 0.15,
        }
    }
}

/// Top-level configuration for the composition engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub thresholds: GateThresholds,

    /// Relative error allowed between aspect ratios (Gate 0).
    pub aspect_ratio_tolerance: f64,

    pub compression_mode: CompressionMode,

    pub pose: PoseConfig,

    pub stabilizer: StabilizerConfig,

    pub scheduler: SchedulerConfig,

    pub compositor: CompositorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: GateThresholds::default(),
            aspect_ratio_tolerance: 0.02,
            compression_mode: CompressionMode::Auto,
            pose: PoseConfig::default(),
            stabilizer: StabilizerConfig::default(),
            scheduler: SchedulerConfig::default(),
            compositor: CompositorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Tighter thresholds and a longer lock streak.
    pub fn strict() -> Self {
        Self {
            thresholds: GateThresholds {
                aspect_ratio: 1.0,
                framing: 0.75,
                position: 0.80,
                compression: 0.70,
                pose: 0.80,
            },
            stabilizer: StabilizerConfig {
                perfect_threshold: 8,
                ..Default::default()
            },
            pose: PoseConfig {
                limb_tolerance_degrees: 10.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Looser thresholds for casual use.
    pub fn relaxed() -> Self {
        Self {
            thresholds: GateThresholds {
                aspect_ratio: 1.0,
                framing: 0.55,
                position: 0.60,
                compression: 0.50,
                pose: 0.60,
            },
            stabilizer: StabilizerConfig {
                perfect_threshold: 3,
                ..Default::default()
            },
            pose: PoseConfig {
                limb_tolerance_degrees: 20.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Create config from environment variables, starting from defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            thresholds: GateThresholds {
                aspect_ratio: defaults.thresholds.aspect_ratio,
                framing: std::env::var("TRYANGLE_FRAMING_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.thresholds.framing),
                position: std::env::var("TRYANGLE_POSITION_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.thresholds.position),
                compression: std::env::var("TRYANGLE_COMPRESSION_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.thresholds.compression),
                pose: std::env::var("TRYANGLE_POSE_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.thresholds.pose),
            },
            aspect_ratio_tolerance: std::env::var("TRYANGLE_ASPECT_TOLERANCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.aspect_ratio_tolerance),
            compression_mode: std::env::var("TRYANGLE_COMPRESSION_MODE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.compression_mode),
            stabilizer: StabilizerConfig {
                history_threshold: std::env::var("TRYANGLE_HISTORY_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.stabilizer.history_threshold),
                disappeared_threshold: std::env::var("TRYANGLE_DISAPPEARED_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.stabilizer.disappeared_threshold),
                perfect_threshold: std::env::var("TRYANGLE_PERFECT_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.stabilizer.perfect_threshold),
                ..defaults.stabilizer
            },
            ..defaults
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> EngineResult<()> {
        for gate in GateKind::ALL {
            let t = self.thresholds.for_gate(gate);
            if !(0.0..=1.0).contains(&t) {
                return Err(EngineError::invalid_config(format!(
                    "{} threshold {} outside [0, 1]",
                    gate, t
                )));
            }
        }
        if !(0.0..1.0).contains(&self.aspect_ratio_tolerance) {
            return Err(EngineError::invalid_config(format!(
                "aspect ratio tolerance {} outside [0, 1)",
                self.aspect_ratio_tolerance
            )));
        }
        let s = &self.stabilizer;
        if s.history_threshold == 0 || s.disappeared_threshold == 0 || s.perfect_threshold == 0 {
            return Err(EngineError::invalid_config(
                "stabilizer thresholds must be at least 1",
            ));
        }
        if s.max_items == 0 {
            return Err(EngineError::invalid_config("max_items must be at least 1"));
        }
        for thermal in ThermalState::ALL {
            let i = self.scheduler.intervals(*thermal);
            if i.level2_every == 0 || i.level2_every >= i.level3_every {
                return Err(EngineError::invalid_config(format!(
                    "{} intervals need 0 < N < M, got N={} M={}",
                    thermal, i.level2_every, i.level3_every
                )));
            }
        }
        let p = &self.pose;
        if p.crop_confidence_min > p.crop_confidence_max {
            return Err(EngineError::invalid_config("crop confidence band is inverted"));
        }
        if self.compositor.occupancy_band < 0.0 || self.compositor.zoom_ratio_threshold < 0.0 {
            return Err(EngineError::invalid_config(
                "compositor bands must be non-negative",
            ));
        }
        Ok(())
    }

    pub fn with_thresholds(mut self, thresholds: GateThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_compression_mode(mut self, mode: CompressionMode) -> Self {
        self.compression_mode = mode;
        self
    }

    pub fn with_stabilizer(mut self, stabilizer: StabilizerConfig) -> Self {
        self.stabilizer = stabilizer;
        self
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_pose(mut self, pose: PoseConfig) -> Self {
        self.pose = pose;
        self
    }

    pub fn with_aspect_ratio_tolerance(mut self, tolerance: f64) -> Self {
        self.aspect_ratio_tolerance = tolerance;
        self
    }
}

//! Thermal-aware frame scheduling.
//!
//! The bounding box runs on every frame, pose every N frames and depth every
//! M frames, with N and M widening as the device heats up. A stage that is
//! still running from an earlier frame is skipped, never queued.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use tryangle_models::ThermalState;

use crate::config::SchedulerConfig;
use crate::metrics;

/// Inference stages in increasing cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    BoundingBox,
    Pose,
    Depth,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 3] = [Self::BoundingBox, Self::Pose, Self::Depth];

    /// Level 1 runs every frame, levels 2 and 3 on intervals.
    pub fn level(&self) -> u8 {
        match self {
            Self::BoundingBox => 1,
            Self::Pose => 2,
            Self::Depth => 3,
        }
    }

    fn index(&self) -> usize {
        self.level() as usize - 1
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BoundingBox => "bounding_box",
            Self::Pose => "pose",
            Self::Depth => "depth",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stages to run for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagePlan {
    pub frame_index: u64,
    pub thermal: ThermalState,
    /// Due and not already running
    pub due: Vec<PipelineStage>,
    /// Due but still running from an earlier frame
    pub skipped: Vec<PipelineStage>,
}

impl StagePlan {
    pub fn runs(&self, stage: PipelineStage) -> bool {
        self.due.contains(&stage)
    }
}

/// Marks a stage as in flight until dropped.
#[derive(Debug)]
pub struct StageGuard {
    stage: PipelineStage,
    flag: Arc<AtomicBool>,
}

impl StageGuard {
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Decides which stages run on each frame.
#[derive(Debug)]
pub struct FrameScheduler {
    config: SchedulerConfig,
    frame: AtomicU64,
    thermal: AtomicU8,
    in_flight: [Arc<AtomicBool>; 3],
    skipped: [AtomicU64; 3],
}

impl FrameScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            frame: AtomicU64::new(0),
            thermal: AtomicU8::new(ThermalState::Nominal.tier()),
            in_flight: std::array::from_fn(|_| Arc::new(AtomicBool::new(false))),
            skipped: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    pub fn thermal(&self) -> ThermalState {
        let tier = self.thermal.load(Ordering::Acquire) as usize;
        ThermalState::ALL.get(tier).copied().unwrap_or_default()
    }

    pub fn set_thermal(&self, state: ThermalState) {
        let previous = self.thermal.swap(state.tier(), Ordering::AcqRel);
        if previous != state.tier() {
            debug!(thermal = %state, "Thermal state changed");
            metrics::record_thermal_state(state);
        }
    }

    /// Plan the next frame.
    pub fn plan(&self) -> StagePlan {
        let frame_index = self.frame.fetch_add(1, Ordering::AcqRel);
        let thermal = self.thermal();
        let intervals = self.config.intervals(thermal);

        let mut due = Vec::with_capacity(3);
        let mut skipped = Vec::new();

        for stage in PipelineStage::ALL {
            let every = match stage {
                PipelineStage::BoundingBox => 1,
                PipelineStage::Pose => intervals.level2_every.max(1),
                PipelineStage::Depth => intervals.level3_every.max(1),
            };
            if frame_index % u64::from(every) != 0 {
                continue;
            }
            if self.is_in_flight(stage) {
                self.skipped[stage.index()].fetch_add(1, Ordering::Relaxed);
                metrics::record_stage_skipped(stage);
                skipped.push(stage);
            } else {
                due.push(stage);
            }
        }

        StagePlan {
            frame_index,
            thermal,
            due,
            skipped,
        }
    }

    /// Claim a stage; `None` when it is already running.
    pub fn try_begin(&self, stage: PipelineStage) -> Option<StageGuard> {
        let flag = &self.in_flight[stage.index()];
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| StageGuard {
                stage,
                flag: Arc::clone(flag),
            })
    }

    pub fn is_in_flight(&self, stage: PipelineStage) -> bool {
        self.in_flight[stage.index()].load(Ordering::Acquire)
    }

    /// How often `stage` was due but skipped.
    pub fn skipped_count(&self, stage: PipelineStage) -> u64 {
        self.skipped[stage.index()].load(Ordering::Relaxed)
    }

    pub fn frames_planned(&self) -> u64 {
        self.frame.load(Ordering::Acquire)
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_runs(scheduler: &FrameScheduler, stage: PipelineStage, frames: usize) -> usize {
        (0..frames).filter(|_| scheduler.plan().runs(stage)).count()
    }

    #[test]
    fn test_nominal_intervals() {
        let scheduler = FrameScheduler::default();
        assert_eq!(count_runs(&scheduler, PipelineStage::BoundingBox, 12), 12);

        let scheduler = FrameScheduler::default();
        assert_eq!(count_runs(&scheduler, PipelineStage::Pose, 12), 6);

        let scheduler = FrameScheduler::default();
        assert_eq!(count_runs(&scheduler, PipelineStage::Depth, 12), 2);
    }

    #[test]
    fn test_critical_thermal_widens_intervals() {
        let scheduler = FrameScheduler::default();
        scheduler.set_thermal(ThermalState::Critical);
        assert_eq!(scheduler.thermal(), ThermalState::Critical);
        assert_eq!(count_runs(&scheduler, PipelineStage::Pose, 40), 4);

        let scheduler = FrameScheduler::default();
        scheduler.set_thermal(ThermalState::Critical);
        assert_eq!(count_runs(&scheduler, PipelineStage::Depth, 40), 1);
    }

    #[test]
    fn test_in_flight_stage_is_skipped() {
        let scheduler = FrameScheduler::default();
        let guard = scheduler.try_begin(PipelineStage::Depth).unwrap();
        assert!(scheduler.try_begin(PipelineStage::Depth).is_none());

        let plan = scheduler.plan();
        assert_eq!(plan.frame_index, 0);
        assert!(!plan.runs(PipelineStage::Depth));
        assert_eq!(plan.skipped, vec![PipelineStage::Depth]);
        assert_eq!(scheduler.skipped_count(PipelineStage::Depth), 1);

        drop(guard);
        assert!(!scheduler.is_in_flight(PipelineStage::Depth));
        assert!(scheduler.try_begin(PipelineStage::Depth).is_some());
    }

    #[test]
    fn test_guard_reports_stage() {
        let scheduler = FrameScheduler::default();
        let guard = scheduler.try_begin(PipelineStage::Pose).unwrap();
        assert_eq!(guard.stage(), PipelineStage::Pose);
        assert_eq!(guard.stage().level(), 2);
    }
}

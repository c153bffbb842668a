#![deny(unreachable_patterns)]
//! Composition evaluation and feedback engine.
//!
//! This crate provides:
//! - Margin, balance and camera-angle analysis of subject boxes
//! - Focal length and perspective compression estimation (EXIF, zoom, depth)
//! - Adaptive pose comparison with tiered keypoint visibility
//! - The five-gate evaluator (aspect ratio, framing, position, compression, pose)
//! - A compositor that merges gate corrections into one camera action
//! - Temporal stabilization of feedback and the perfect-composition lock
//! - Thermal-aware stage scheduling and single-flight live sessions

pub mod compositor;
pub mod config;
pub mod engine;
pub mod error;
pub mod exif;
pub mod focal;
pub mod framing;
pub mod gates;
pub mod logging;
pub mod margin;
pub mod metrics;
pub mod pose;
pub mod providers;
pub mod scheduler;
pub mod session;
pub mod snapshot;
pub mod stabilizer;


pub use compositor::{Compositor, MoveIssues};
pub use config::{
    CompositorConfig, CompressionMode, EngineConfig, GateThresholds, PoseConfig, SchedulerConfig,
    StabilizerConfig, StageIntervals,
};
pub use engine::{CompositionEngine, FrameReport};
pub use error::{EngineError, EngineResult};
pub use focal::{DepthEstimate, FocalEstimate, FocalInputs, ZoomState};
pub use gates::{GateEngine, GateReport};
pub use logging::SessionLogger;
pub use margin::{MarginAnalysis, Margins, MovementDirection, RelativeMargins};
pub use pose::{PoseComparator, PoseComparison};
pub use providers::{BoundingBoxProvider, Collaborators, DepthProvider, ImageFrame, PoseProvider};
pub use scheduler::{FrameScheduler, PipelineStage, StagePlan};
pub use session::{FrameOutcome, LiveSession, ReferenceAnalyzer};
pub use snapshot::{build_snapshot, LiveFrameInputs};
pub use stabilizer::{CategoryStatus, CompletedEvent, FeedbackStabilizer};

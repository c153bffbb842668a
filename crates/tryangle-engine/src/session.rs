//! Reference analysis and live capture sessions.
//!
//! At most one live evaluation is in flight per session. A frame that
//! arrives while another is being evaluated is dropped and counted, never
//! queued. The latest [`FrameReport`] is published through a single
//! `watch` channel that the UI subscribes to.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{watch, Mutex, Semaphore};
use tracing::{debug, Instrument};
use tryangle_models::{BoundingBox, Keypoint, ReferenceSnapshot, ThermalState};
use uuid::Uuid;

use crate::config::{EngineConfig, PoseConfig};
use crate::engine::{CompositionEngine, FrameReport};
use crate::error::{EngineError, EngineResult};
use crate::focal::{DepthEstimate, FocalInputs};
use crate::logging::SessionLogger;
use crate::metrics;
use crate::providers::{Collaborators, ImageFrame};
use crate::scheduler::{FrameScheduler, PipelineStage};
use crate::snapshot::{build_snapshot, LiveFrameInputs};

/// One-time analysis of a reference image.
#[derive(Debug, Clone)]
pub struct ReferenceAnalyzer {
    collaborators: Collaborators,
    config: PoseConfig,
}

impl ReferenceAnalyzer {
    pub fn new(collaborators: Collaborators, config: PoseConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Run depth, then subject and pose detection, then finalize.
    pub async fn analyze(
        &self,
        image: &ImageFrame,
        exif: Option<&[u8]>,
    ) -> EngineResult<ReferenceSnapshot> {
        if image.size.is_empty() {
            return Err(EngineError::invalid_input(format!(
                "reference image has zero size ({}x{})",
                image.size.width, image.size.height
            )));
        }

        let depth = self.collaborators.estimate_depth(image).await;
        let bbox = self.collaborators.detect_subject(image).await;
        let keypoints = self.collaborators.detect_pose(image).await.unwrap_or_default();

        let reference = self.finalize(image, exif, bbox, keypoints, depth.as_ref());
        metrics::record_reference_analyzed(reference.has_subject());
        debug!(
            shot_type = %reference.shot_type,
            compression = ?reference.compression_index,
            "Reference analyzed"
        );
        Ok(reference)
    }

    fn finalize(
        &self,
        image: &ImageFrame,
        exif: Option<&[u8]>,
        bbox: Option<BoundingBox>,
        keypoints: Vec<Keypoint>,
        depth: Option<&DepthEstimate>,
    ) -> ReferenceSnapshot {
        let focal = FocalInputs {
            exif_bytes: exif,
            crop_factor: image.zoom.map(|z| z.crop_factor),
            depth,
            zoom: image.zoom.as_ref(),
        };
        ReferenceSnapshot::new(build_snapshot(image.size, bbox, keypoints, &focal, &self.config))
    }
}

/// What happened to a submitted frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Evaluated(Box<FrameReport>),
    /// Another evaluation was still running
    Dropped,
    /// The session is paused
    Paused,
}

/// Latest collaborator outputs, reused on frames where a stage is not due.
#[derive(Debug, Clone, Default)]
struct CachedOutputs {
    bbox: Option<BoundingBox>,
    keypoints: Vec<Keypoint>,
    depth: Option<DepthEstimate>,
}

/// A live capture session.
pub struct LiveSession {
    id: Uuid,
    engine: Arc<Mutex<CompositionEngine>>,
    permit: Arc<Semaphore>,
    scheduler: Arc<FrameScheduler>,
    cache: Arc<Mutex<CachedOutputs>>,
    collaborators: Collaborators,
    analyzer: ReferenceAnalyzer,
    state: watch::Sender<Option<FrameReport>>,
    dropped: AtomicU64,
    logger: SessionLogger,
}

impl LiveSession {
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> EngineResult<Self> {
        let id = Uuid::new_v4();
        let logger = SessionLogger::new(&id, "live_capture");
        let scheduler = Arc::new(FrameScheduler::new(config.scheduler));
        let analyzer = ReferenceAnalyzer::new(collaborators.clone(), config.pose.clone());
        let engine = CompositionEngine::new(config)?;
        let (state, _) = watch::channel(None);

        logger.log_start("session created");

        Ok(Self {
            id,
            engine: Arc::new(Mutex::new(engine)),
            permit: Arc::new(Semaphore::new(1)),
            scheduler,
            cache: Arc::new(Mutex::new(CachedOutputs::default())),
            collaborators,
            analyzer,
            state,
            dropped: AtomicU64::new(0),
            logger,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Receiver for the latest frame report.
    pub fn subscribe(&self) -> watch::Receiver<Option<FrameReport>> {
        self.state.subscribe()
    }

    /// Latest published report.
    pub fn latest(&self) -> Option<FrameReport> {
        self.state.borrow().clone()
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Analyze a reference image and publish it.
    pub async fn set_reference(
        &self,
        image: &ImageFrame,
        exif: Option<&[u8]>,
    ) -> EngineResult<ReferenceSnapshot> {
        let reference = match self.analyzer.analyze(image, exif).await {
            Ok(reference) => reference,
            Err(e) => {
                self.logger.log_error(&format!("reference analysis failed: {}", e));
                return Err(e);
            }
        };
        self.publish_reference(reference.clone()).await;
        Ok(reference)
    }

    /// Publish an already analyzed reference.
    pub async fn publish_reference(&self, reference: ReferenceSnapshot) {
        self.logger
            .log_reference(reference.shot_type.as_str(), reference.has_subject());
        self.engine.lock().await.set_reference(reference);
        *self.cache.lock().await = CachedOutputs::default();
    }

    pub async fn pause(&self) {
        self.engine.lock().await.pause();
        self.state.send_replace(None);
    }

    pub async fn resume(&self) {
        self.engine.lock().await.resume();
    }

    pub fn set_thermal(&self, state: ThermalState) {
        self.scheduler.set_thermal(state);
    }

    /// Evaluate one camera frame, or drop it when an evaluation is in flight.
    pub async fn submit_frame(&self, frame: ImageFrame) -> FrameOutcome {
        let Ok(_permit) = Arc::clone(&self.permit).try_acquire_owned() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            metrics::record_frame_dropped();
            return FrameOutcome::Dropped;
        };

        if self.engine.lock().await.is_paused() {
            return FrameOutcome::Paused;
        }

        let span = self.logger.create_span();
        let report = self.run_frame(frame).instrument(span).await;

        // paused while this frame was in flight
        if report.paused {
            return FrameOutcome::Paused;
        }

        if report.newly_perfect {
            self.logger.log_perfect(
                self.engine.lock().await.config().stabilizer.perfect_threshold,
                report.perfect_score,
            );
        }
        self.state.send_replace(Some(report.clone()));
        FrameOutcome::Evaluated(Box::new(report))
    }

    async fn run_frame(&self, frame: ImageFrame) -> FrameReport {
        let plan = self.scheduler.plan();

        if plan.runs(PipelineStage::BoundingBox) {
            if let Some(_guard) = self.scheduler.try_begin(PipelineStage::BoundingBox) {
                let bbox = self.collaborators.detect_subject(&frame).await;
                let mut cache = self.cache.lock().await;
                if bbox.is_none() && self.collaborators.subject.is_some() {
                    cache.keypoints.clear();
                }
                cache.bbox = bbox;
            }
        }

        if plan.runs(PipelineStage::Pose) {
            if let Some(_guard) = self.scheduler.try_begin(PipelineStage::Pose) {
                let keypoints = self.collaborators.detect_pose(&frame).await;
                self.cache.lock().await.keypoints = keypoints.unwrap_or_default();
            }
        }

        if plan.runs(PipelineStage::Depth) {
            self.spawn_depth(&frame);
        }

        let inputs = {
            let cache = self.cache.lock().await;
            LiveFrameInputs {
                image_size: frame.size,
                bbox: cache.bbox,
                keypoints: cache.keypoints.clone(),
                depth: cache.depth,
                zoom: frame.zoom,
            }
        };

        self.engine.lock().await.evaluate(&inputs, Instant::now())
    }

    /// Depth runs in the background; later frames pick up its result.
    fn spawn_depth(&self, frame: &ImageFrame) {
        if self.collaborators.depth.is_none() {
            return;
        }
        let Some(guard) = self.scheduler.try_begin(PipelineStage::Depth) else {
            return;
        };

        let collaborators = self.collaborators.clone();
        let cache = Arc::clone(&self.cache);
        let frame = frame.clone();
        tokio::spawn(async move {
            let depth = collaborators.estimate_depth(&frame).await;
            if depth.is_some() {
                cache.lock().await.depth = depth;
            }
            drop(guard);
        });
    }
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("id", &self.id)
            .field("collaborators", &self.collaborators)
            .field("dropped", &self.dropped_frames())
            .finish()
    }
}

//! Collaborator traits for external inference.
//!
//! Subject detection, pose estimation and depth estimation run outside the
//! engine. Each is optional: a provider may return `Ok(None)` when it found
//! nothing, and an `Err` is logged and treated the same way.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use tryangle_models::{BoundingBox, ImageSize, Keypoint};

use crate::error::EngineResult;
use crate::focal::{DepthEstimate, ZoomState};
use crate::metrics;

/// One image handed to the collaborators.
#[derive(Debug, Clone)]
pub struct ImageFrame {
    pub size: ImageSize,
    /// Encoded or raw pixel data, opaque to the engine
    pub data: Arc<[u8]>,
    /// Camera zoom state when the frame was captured
    pub zoom: Option<ZoomState>,
}

impl ImageFrame {
    pub fn new(size: ImageSize, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            size,
            data: data.into(),
            zoom: None,
        }
    }

    pub fn with_zoom(mut self, zoom: ZoomState) -> Self {
        self.zoom = Some(zoom);
        self
    }
}

/// Subject (person) detector.
#[async_trait]
pub trait BoundingBoxProvider: Send + Sync {
    /// Detect the main subject, in normalized coordinates.
    async fn detect_subject(&self, frame: &ImageFrame) -> EngineResult<Option<BoundingBox>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Whole-body pose estimator.
#[async_trait]
pub trait PoseProvider: Send + Sync {
    /// Detect keypoints in the 133-point layout; shorter arrays are allowed.
    async fn detect_pose(&self, frame: &ImageFrame) -> EngineResult<Option<Vec<Keypoint>>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Monocular depth estimator.
#[async_trait]
pub trait DepthProvider: Send + Sync {
    async fn estimate_depth(&self, frame: &ImageFrame) -> EngineResult<Option<DepthEstimate>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// The set of collaborators a session or analyzer may call.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub subject: Option<Arc<dyn BoundingBoxProvider>>,
    pub pose: Option<Arc<dyn PoseProvider>>,
    pub depth: Option<Arc<dyn DepthProvider>>,
}

impl Collaborators {
    pub fn with_subject(mut self, provider: Arc<dyn BoundingBoxProvider>) -> Self {
        self.subject = Some(provider);
        self
    }

    pub fn with_pose(mut self, provider: Arc<dyn PoseProvider>) -> Self {
        self.pose = Some(provider);
        self
    }

    pub fn with_depth(mut self, provider: Arc<dyn DepthProvider>) -> Self {
        self.depth = Some(provider);
        self
    }

    pub async fn detect_subject(&self, frame: &ImageFrame) -> Option<BoundingBox> {
        let provider = self.subject.as_ref()?;
        degrade(provider.name(), provider.detect_subject(frame)).await
    }

    pub async fn detect_pose(&self, frame: &ImageFrame) -> Option<Vec<Keypoint>> {
        let provider = self.pose.as_ref()?;
        degrade(provider.name(), provider.detect_pose(frame)).await
    }

    pub async fn estimate_depth(&self, frame: &ImageFrame) -> Option<DepthEstimate> {
        let provider = self.depth.as_ref()?;
        degrade(provider.name(), provider.estimate_depth(frame)).await
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("subject", &self.subject.as_ref().map(|p| p.name()))
            .field("pose", &self.pose.as_ref().map(|p| p.name()))
            .field("depth", &self.depth.as_ref().map(|p| p.name()))
            .finish()
    }
}

/// Await a collaborator call, turning failures into "nothing found".
pub async fn degrade<T>(
    provider: &str,
    call: impl Future<Output = EngineResult<Option<T>>>,
) -> Option<T> {
    match call.await {
        Ok(value) => value,
        Err(e) => {
            warn!(provider = %provider, error = %e, "Collaborator failed, continuing without it");
            metrics::record_collaborator_failure(provider);
            None
        }
    }
}

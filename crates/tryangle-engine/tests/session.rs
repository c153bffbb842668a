//! Live session behaviour with fake collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tryangle_engine::{
    BoundingBoxProvider, Collaborators, EngineConfig, EngineError, EngineResult, FrameOutcome,
    ImageFrame, LiveSession, PoseProvider, ReferenceAnalyzer,
};
use tryangle_models::{BoundingBox, FeedbackCategory, ImageSize, Keypoint, ShotType};

fn subject() -> BoundingBox {
    BoundingBox::new(0.3, 0.2, 0.4, 0.6)
}

fn figure() -> Vec<Keypoint> {
    [
        (0.50, 0.24),
        (0.48, 0.22),
        (0.52, 0.22),
        (0.46, 0.23),
        (0.54, 0.23),
        (0.60, 0.32),
        (0.40, 0.32),
        (0.62, 0.42),
        (0.38, 0.42),
        (0.63, 0.52),
        (0.37, 0.52),
        (0.56, 0.54),
        (0.44, 0.54),
        (0.57, 0.66),
        (0.43, 0.66),
        (0.57, 0.78),
        (0.43, 0.78),
    ]
    .iter()
    .map(|&(x, y)| Keypoint::new(x, y, 0.9))
    .collect()
}

fn image() -> ImageFrame {
    ImageFrame::new(ImageSize::new(1080, 1440), vec![0u8; 16])
}

struct FixedSubject {
    calls: AtomicUsize,
}

#[async_trait]
impl BoundingBoxProvider for FixedSubject {
    async fn detect_subject(&self, _frame: &ImageFrame) -> EngineResult<Option<BoundingBox>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(subject()))
    }

    fn name(&self) -> &'static str {
        "fixed_subject"
    }
}

struct FixedPose;

#[async_trait]
impl PoseProvider for FixedPose {
    async fn detect_pose(&self, _frame: &ImageFrame) -> EngineResult<Option<Vec<Keypoint>>> {
        Ok(Some(figure()))
    }

    fn name(&self) -> &'static str {
        "fixed_pose"
    }
}

/// Blocks until released, so a second frame arrives mid-evaluation.
struct GatedSubject {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl BoundingBoxProvider for GatedSubject {
    async fn detect_subject(&self, _frame: &ImageFrame) -> EngineResult<Option<BoundingBox>> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Some(subject()))
    }

    fn name(&self) -> &'static str {
        "gated_subject"
    }
}

struct FailingSubject;

#[async_trait]
impl BoundingBoxProvider for FailingSubject {
    async fn detect_subject(&self, _frame: &ImageFrame) -> EngineResult<Option<BoundingBox>> {
        Err(EngineError::collaborator("failing_subject", "model not loaded"))
    }

    fn name(&self) -> &'static str {
        "failing_subject"
    }
}

fn fixed() -> Collaborators {
    Collaborators::default()
        .with_subject(Arc::new(FixedSubject {
            calls: AtomicUsize::new(0),
        }))
        .with_pose(Arc::new(FixedPose))
}

#[tokio::test]
async fn test_reference_analysis() {
    let analyzer = ReferenceAnalyzer::new(fixed(), Default::default());
    let reference = analyzer.analyze(&image(), None).await.unwrap();

    assert!(reference.has_subject());
    assert_eq!(reference.shot_type, ShotType::FullShot);
    assert!(reference.compression_index.is_none());
}

#[tokio::test]
async fn test_zero_size_reference_rejected() {
    let analyzer = ReferenceAnalyzer::new(fixed(), Default::default());
    let empty = ImageFrame::new(ImageSize::new(0, 0), Vec::new());

    let result = analyzer.analyze(&empty, None).await;
    assert!(matches!(result, Err(EngineError::InvalidInput(_))));
}

#[tokio::test]
async fn test_frame_without_reference_reports_notice() {
    let session = LiveSession::new(EngineConfig::default(), fixed()).unwrap();

    let FrameOutcome::Evaluated(report) = session.submit_frame(image()).await else {
        panic!("frame should be evaluated");
    };
    assert_eq!(report.feedback[0].category, FeedbackCategory::NoReference);
}

#[tokio::test]
async fn test_matching_frames_publish_reports() {
    let session = LiveSession::new(EngineConfig::default(), fixed()).unwrap();
    session.set_reference(&image(), None).await.unwrap();
    let mut updates = session.subscribe();

    let FrameOutcome::Evaluated(report) = session.submit_frame(image()).await else {
        panic!("frame should be evaluated");
    };
    assert!(report.evaluation.as_ref().unwrap().all_passed());

    updates.changed().await.unwrap();
    assert_eq!(updates.borrow().as_ref(), Some(&*report));
    assert_eq!(session.latest().as_ref(), Some(&*report));
}

#[tokio::test]
async fn test_frame_dropped_while_evaluation_in_flight() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let collaborators = Collaborators::default()
        .with_subject(Arc::new(GatedSubject {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        }))
        .with_pose(Arc::new(FixedPose));
    let session = Arc::new(LiveSession::new(EngineConfig::default(), collaborators).unwrap());

    let first = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.submit_frame(image()).await }
    });
    entered.notified().await;

    assert_eq!(session.submit_frame(image()).await, FrameOutcome::Dropped);
    assert_eq!(session.dropped_frames(), 1);

    release.notify_one();
    assert!(matches!(first.await.unwrap(), FrameOutcome::Evaluated(_)));
}

#[tokio::test]
async fn test_pause_and_resume() {
    let session = LiveSession::new(EngineConfig::default(), fixed()).unwrap();
    session.set_reference(&image(), None).await.unwrap();

    session.pause().await;
    assert_eq!(session.submit_frame(image()).await, FrameOutcome::Paused);
    assert!(session.latest().is_none());

    session.resume().await;
    assert!(matches!(
        session.submit_frame(image()).await,
        FrameOutcome::Evaluated(_)
    ));
}

#[tokio::test]
async fn test_pause_during_in_flight_frame() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let collaborators = Collaborators::default()
        .with_subject(Arc::new(GatedSubject {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        }))
        .with_pose(Arc::new(FixedPose));
    let session = Arc::new(LiveSession::new(EngineConfig::default(), collaborators).unwrap());

    let in_flight = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.submit_frame(image()).await }
    });
    entered.notified().await;

    session.pause().await;
    release.notify_one();

    assert_eq!(in_flight.await.unwrap(), FrameOutcome::Paused);
    assert!(session.latest().is_none());
}

#[tokio::test]
async fn test_failing_collaborator_degrades_to_no_subject() {
    let collaborators = Collaborators::default().with_subject(Arc::new(FailingSubject));
    let session = LiveSession::new(EngineConfig::default(), collaborators).unwrap();
    session
        .publish_reference(
            ReferenceAnalyzer::new(fixed(), Default::default())
                .analyze(&image(), None)
                .await
                .unwrap(),
        )
        .await;

    let FrameOutcome::Evaluated(report) = session.submit_frame(image()).await else {
        panic!("frame should be evaluated");
    };
    assert!(report.evaluation.is_none());
    assert_eq!(report.feedback[0].category, FeedbackCategory::NoSubject);
}

#[tokio::test]
async fn test_subject_detection_runs_every_frame() {
    let provider = Arc::new(FixedSubject {
        calls: AtomicUsize::new(0),
    });
    let collaborators = Collaborators::default().with_subject(provider.clone());
    let session = LiveSession::new(EngineConfig::default(), collaborators).unwrap();

    for _ in 0..4 {
        session.submit_frame(image()).await;
    }
    assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
    assert_eq!(session.scheduler().frames_planned(), 4);
}

//! Recorded session replay.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tryangle_engine::{CompositionEngine, EngineConfig, FrameReport, LiveFrameInputs, SessionLogger};
use tryangle_models::{ActionKind, ReferenceSnapshot};
use uuid::Uuid;

fn default_frame_interval_ms() -> u64 {
    33
}

/// A recorded capture session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedSession {
    pub reference: LiveFrameInputs,
    /// Raw EXIF (TIFF) block of the reference image
    #[serde(default)]
    pub reference_exif: Option<PathBuf>,
    pub frames: Vec<LiveFrameInputs>,
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

/// One line of replay output.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayLine {
    pub frame: usize,
    pub primary_feedback: Option<String>,
    pub action: Option<ActionKind>,
    pub report: FrameReport,
}

/// Summary printed after the last frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub frames: usize,
    pub evaluated: usize,
    pub perfect_frames: usize,
    /// First frame on which the perfect lock engaged
    pub first_lock: Option<usize>,
}

pub async fn load(path: &std::path::Path) -> Result<RecordedSession> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading session file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing session file {}", path.display()))
}

async fn reference_exif(
    session: &RecordedSession,
    base: &std::path::Path,
) -> Result<Option<Vec<u8>>> {
    let Some(path) = &session.reference_exif else {
        return Ok(None);
    };
    let path = base.join(path);
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("reading EXIF block {}", path.display()))?;
    Ok(Some(bytes))
}

/// Replay every frame, handing each output line to `emit`.
pub async fn run(
    session: &RecordedSession,
    base: &std::path::Path,
    config: EngineConfig,
    mut emit: impl FnMut(&ReplayLine) -> Result<()>,
) -> Result<ReplaySummary> {
    let logger = SessionLogger::new(&Uuid::new_v4(), "replay");
    logger.log_start(&format!("{} frames", session.frames.len()));

    let exif = reference_exif(session, base).await?;
    let reference = ReferenceSnapshot::new(
        session
            .reference
            .to_snapshot(exif.as_deref(), &config.pose),
    );
    if !reference.has_subject() {
        logger.log_warning("reference has no detectable subject");
    }
    logger.log_reference(reference.shot_type.as_str(), reference.has_subject());

    let mut engine = CompositionEngine::new(config).context("invalid engine configuration")?;
    engine.set_reference(reference);

    let start = Instant::now();
    let interval = Duration::from_millis(session.frame_interval_ms);
    let mut summary = ReplaySummary {
        frames: session.frames.len(),
        ..Default::default()
    };

    for (index, frame) in session.frames.iter().enumerate() {
        let now = start + interval * index as u32;
        let report = engine.evaluate(frame, now);

        if report.evaluation.is_some() {
            summary.evaluated += 1;
        }
        if report.is_perfect {
            summary.perfect_frames += 1;
        }
        if report.newly_perfect && summary.first_lock.is_none() {
            summary.first_lock = Some(index);
        }

        emit(&ReplayLine {
            frame: index,
            primary_feedback: report.primary_feedback().map(str::to_string),
            action: report.unified.as_ref().map(|u| u.primary_action),
            report,
        })?;
    }

    logger.log_completion(&format!(
        "{} evaluated, {} perfect",
        summary.evaluated, summary.perfect_frames
    ));
    Ok(summary)
}

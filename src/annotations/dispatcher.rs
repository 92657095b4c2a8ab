//! Annotation fetch dispatcher: issues the four per-video detection
//! requests concurrently and persists each response as a JSON artifact.
//!
//! The dispatcher is stateless and safe to invoke repeatedly; skip-if-exists
//! policy belongs to the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::annotations::service::{
    AnnotateRequest, AnnotationService, DetectionFeature, FaceDetectionConfig,
    PersonDetectionConfig, SpeechTranscriptionConfig, VideoContext,
};
use crate::annotations::AnnotationKind;
use crate::error::{PipelineError, Result};
use crate::video::VideoAsset;

/// Outcome of one annotation kind's fetch.
#[derive(Debug)]
pub struct KindOutcome {
    pub kind: AnnotationKind,
    /// Written artifact path on success
    pub artifact_path: Option<PathBuf>,
    pub error: Option<PipelineError>,
}

impl KindOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-video dispatch report: one outcome per annotation kind.
#[derive(Debug)]
pub struct DispatchReport {
    pub outcomes: Vec<KindOutcome>,
}

impl DispatchReport {
    pub fn successful(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed_kinds(&self) -> Vec<AnnotationKind> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.kind)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| o.is_success())
    }
}

/// Dispatches the four annotation requests for one video against a bounded
/// worker pool and blocks until all of them have finished.
pub struct AnnotationDispatcher {
    service: Arc<dyn AnnotationService>,
    worker_semaphore: Arc<Semaphore>,
    request_timeout: Duration,
}

impl AnnotationDispatcher {
    /// Pool size follows the number of available execution units.
    pub fn new(service: Arc<dyn AnnotationService>, request_timeout: Duration) -> Self {
        Self {
            service,
            worker_semaphore: Arc::new(Semaphore::new(num_cpus::get())),
            request_timeout,
        }
    }

    /// Issue all four detection requests for `video` and write one artifact
    /// per kind under `dest_dir`.
    ///
    /// A timeout or service failure on one kind is recorded in the report
    /// and does not cancel sibling requests; those run to completion and
    /// their artifacts are still written.
    pub async fn dispatch(&self, video: &VideoAsset, dest_dir: &Path) -> Result<DispatchReport> {
        tokio::fs::create_dir_all(dest_dir).await?;

        info!(
            "🚀 Dispatching {} annotation requests for {}",
            AnnotationKind::ALL.len(),
            video.filename
        );

        let mut handles = Vec::new();
        for kind in AnnotationKind::ALL {
            let request = build_request(kind, &video.blob);
            let artifact_path = dest_dir.join(kind.file_name());
            let service = Arc::clone(&self.service);
            let semaphore = Arc::clone(&self.worker_semaphore);
            let timeout = self.request_timeout;
            let video_name = video.filename.clone();

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return KindOutcome {
                            kind,
                            artifact_path: None,
                            error: Some(PipelineError::ExternalService(
                                "worker pool closed".to_string(),
                            )),
                        }
                    }
                };
                fetch_one(service, kind, request, artifact_path, timeout, &video_name).await
            }));
        }

        let mut outcomes = Vec::new();
        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!("Annotation task panicked: {}", e);
                    return Err(PipelineError::ExternalService(format!(
                        "annotation task failed: {}",
                        e
                    )));
                }
            }
        }
        // Tasks complete in arbitrary order; keep the report in kind order
        outcomes.sort_by_key(|o| AnnotationKind::ALL.iter().position(|k| *k == o.kind));

        let report = DispatchReport { outcomes };
        info!(
            "📦 Annotation fetch for {}: {}/{} kinds succeeded",
            video.filename,
            report.successful(),
            AnnotationKind::ALL.len()
        );
        Ok(report)
    }
}

/// Run one detection request with a bounded wait and persist its response.
async fn fetch_one(
    service: Arc<dyn AnnotationService>,
    kind: AnnotationKind,
    request: AnnotateRequest,
    artifact_path: PathBuf,
    timeout: Duration,
    video_name: &str,
) -> KindOutcome {
    info!("🔍 Processing {} for {}...", kind, video_name);

    let response = match tokio::time::timeout(timeout, service.annotate(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            warn!("{} request failed for {}: {}", kind, video_name, e);
            return KindOutcome {
                kind,
                artifact_path: None,
                error: Some(e),
            };
        }
        Err(_) => {
            let error = PipelineError::RequestTimeout {
                kind,
                timeout_secs: timeout.as_secs(),
            };
            warn!("{} for {}", error, video_name);
            return KindOutcome {
                kind,
                artifact_path: None,
                error: Some(error),
            };
        }
    };

    let json = match serde_json::to_string_pretty(&response) {
        Ok(json) => json,
        Err(e) => {
            return KindOutcome {
                kind,
                artifact_path: None,
                error: Some(e.into()),
            }
        }
    };
    if let Err(e) = tokio::fs::write(&artifact_path, json).await {
        return KindOutcome {
            kind,
            artifact_path: None,
            error: Some(e.into()),
        };
    }

    info!("✅ Finished {} for {}", kind, video_name);
    KindOutcome {
        kind,
        artifact_path: Some(artifact_path),
        error: None,
    }
}

/// Build the request for one annotation kind: one standard bundle and three
/// area-scoped requests with their detection contexts.
fn build_request(kind: AnnotationKind, blob: &[u8]) -> AnnotateRequest {
    match kind {
        AnnotationKind::Generic => AnnotateRequest {
            features: vec![
                DetectionFeature::TextDetection,
                DetectionFeature::ShotChangeDetection,
                DetectionFeature::LogoRecognition,
                DetectionFeature::LabelDetection,
            ],
            input_content: blob.to_vec(),
            context: None,
        },
        AnnotationKind::Face => AnnotateRequest {
            features: vec![DetectionFeature::FaceDetection],
            input_content: blob.to_vec(),
            context: Some(VideoContext {
                face_detection: Some(FaceDetectionConfig {
                    include_bounding_boxes: true,
                    include_attributes: true,
                }),
                ..Default::default()
            }),
        },
        AnnotationKind::People => AnnotateRequest {
            features: vec![DetectionFeature::PersonDetection],
            input_content: blob.to_vec(),
            context: Some(VideoContext {
                person_detection: Some(PersonDetectionConfig {
                    include_bounding_boxes: true,
                    include_attributes: true,
                    include_pose_landmarks: true,
                }),
                ..Default::default()
            }),
        },
        AnnotationKind::Speech => AnnotateRequest {
            features: vec![DetectionFeature::SpeechTranscription],
            input_content: blob.to_vec(),
            context: Some(VideoContext {
                speech_transcription: Some(SpeechTranscriptionConfig {
                    language_code: "en-US".to_string(),
                    enable_automatic_punctuation: true,
                }),
                ..Default::default()
            }),
        },
    }
}

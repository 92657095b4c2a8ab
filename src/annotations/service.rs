//! Annotation service seam: the request shape, the detection feature codes,
//! and a reqwest-backed client for the Video Intelligence API.
//!
//! Enum-typed fields cross the wire as integers, never as names.

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Detection features understood by the annotation service. The numeric
/// codes are the service's wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionFeature {
    LabelDetection,
    ShotChangeDetection,
    FaceDetection,
    SpeechTranscription,
    TextDetection,
    LogoRecognition,
    PersonDetection,
}

impl DetectionFeature {
    pub fn code(&self) -> u32 {
        match self {
            DetectionFeature::LabelDetection => 1,
            DetectionFeature::ShotChangeDetection => 2,
            DetectionFeature::FaceDetection => 4,
            DetectionFeature::SpeechTranscription => 6,
            DetectionFeature::TextDetection => 7,
            DetectionFeature::LogoRecognition => 12,
            DetectionFeature::PersonDetection => 14,
        }
    }
}

/// Per-area request context (bounding boxes, language, pose landmarks).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoContext {
    pub face_detection: Option<FaceDetectionConfig>,
    pub person_detection: Option<PersonDetectionConfig>,
    pub speech_transcription: Option<SpeechTranscriptionConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaceDetectionConfig {
    pub include_bounding_boxes: bool,
    pub include_attributes: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonDetectionConfig {
    pub include_bounding_boxes: bool,
    pub include_attributes: bool,
    pub include_pose_landmarks: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechTranscriptionConfig {
    pub language_code: String,
    pub enable_automatic_punctuation: bool,
}

impl VideoContext {
    fn to_json(&self) -> Value {
        let mut context = serde_json::Map::new();
        if let Some(face) = &self.face_detection {
            context.insert(
                "face_detection_config".to_string(),
                json!({
                    "include_bounding_boxes": face.include_bounding_boxes,
                    "include_attributes": face.include_attributes,
                }),
            );
        }
        if let Some(person) = &self.person_detection {
            context.insert(
                "person_detection_config".to_string(),
                json!({
                    "include_bounding_boxes": person.include_bounding_boxes,
                    "include_attributes": person.include_attributes,
                    "include_pose_landmarks": person.include_pose_landmarks,
                }),
            );
        }
        if let Some(speech) = &self.speech_transcription {
            context.insert(
                "speech_transcription_config".to_string(),
                json!({
                    "language_code": speech.language_code,
                    "enable_automatic_punctuation": speech.enable_automatic_punctuation,
                }),
            );
        }
        Value::Object(context)
    }
}

/// One annotation request: a feature list, the input content blob, and an
/// optional per-area context.
#[derive(Debug, Clone)]
pub struct AnnotateRequest {
    pub features: Vec<DetectionFeature>,
    pub input_content: Vec<u8>,
    pub context: Option<VideoContext>,
}

impl AnnotateRequest {
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "features": self.features.iter().map(|f| f.code()).collect::<Vec<_>>(),
            "input_content": base64::engine::general_purpose::STANDARD.encode(&self.input_content),
        });
        if let Some(context) = &self.context {
            body["video_context"] = context.to_json();
        }
        body
    }
}

/// External annotation service. Implementations resolve the long-running
/// operation within the caller's bounded wait and return the raw structured
/// response as plain JSON.
#[async_trait]
pub trait AnnotationService: Send + Sync {
    async fn annotate(&self, request: AnnotateRequest) -> Result<Value>;
}

/// Video Intelligence API client: submits `videos:annotate` and polls the
/// returned operation until it is done.
pub struct VideoIntelligenceClient {
    client: reqwest::Client,
    endpoint: String,
    poll_interval: Duration,
}

impl VideoIntelligenceClient {
    pub fn new(endpoint: String, poll_interval_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PipelineError::ExternalService(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            poll_interval: Duration::from_secs(poll_interval_seconds),
        })
    }

    async fn submit(&self, request: &AnnotateRequest) -> Result<String> {
        let url = format!("{}/videos:annotate", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&request.to_json())
            .send()
            .await
            .map_err(|e| PipelineError::ExternalService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::ExternalService(format!(
                "annotation service returned {}",
                response.status()
            )));
        }

        let operation: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::ExternalService(e.to_string()))?;

        operation
            .get("name")
            .and_then(|n| n.as_str())
            .map(|n| n.to_string())
            .ok_or_else(|| {
                PipelineError::ExternalService("operation response has no name".to_string())
            })
    }

    async fn poll(&self, operation_name: &str) -> Result<Value> {
        let url = format!("{}/operations/{}", self.endpoint, operation_name);
        loop {
            let operation: Value = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| PipelineError::ExternalService(e.to_string()))?
                .json()
                .await
                .map_err(|e| PipelineError::ExternalService(e.to_string()))?;

            if operation.get("done").and_then(|d| d.as_bool()) == Some(true) {
                if let Some(error) = operation.get("error") {
                    return Err(PipelineError::ExternalService(error.to_string()));
                }
                return operation.get("response").cloned().ok_or_else(|| {
                    PipelineError::ExternalService("completed operation has no response".to_string())
                });
            }

            debug!("Operation {} still running, polling again...", operation_name);
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl AnnotationService for VideoIntelligenceClient {
    async fn annotate(&self, request: AnnotateRequest) -> Result<Value> {
        let operation_name = self.submit(&request).await?;
        debug!("Submitted annotation operation: {}", operation_name);
        self.poll(&operation_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_codes_are_wire_integers() {
        assert_eq!(DetectionFeature::LabelDetection.code(), 1);
        assert_eq!(DetectionFeature::ShotChangeDetection.code(), 2);
        assert_eq!(DetectionFeature::SpeechTranscription.code(), 6);
        assert_eq!(DetectionFeature::TextDetection.code(), 7);
        assert_eq!(DetectionFeature::LogoRecognition.code(), 12);
        assert_eq!(DetectionFeature::PersonDetection.code(), 14);
    }

    #[test]
    fn test_request_serializes_features_as_integers() {
        let request = AnnotateRequest {
            features: vec![
                DetectionFeature::TextDetection,
                DetectionFeature::ShotChangeDetection,
            ],
            input_content: b"video-bytes".to_vec(),
            context: None,
        };
        let body = request.to_json();
        assert_eq!(body["features"], json!([7, 2]));
        assert!(body["input_content"].is_string());
        assert!(body.get("video_context").is_none());
    }

    #[test]
    fn test_speech_context_serialization() {
        let request = AnnotateRequest {
            features: vec![DetectionFeature::SpeechTranscription],
            input_content: Vec::new(),
            context: Some(VideoContext {
                speech_transcription: Some(SpeechTranscriptionConfig {
                    language_code: "en-US".to_string(),
                    enable_automatic_punctuation: true,
                }),
                ..Default::default()
            }),
        };
        let body = request.to_json();
        assert_eq!(
            body["video_context"]["speech_transcription_config"]["language_code"],
            "en-US"
        );
    }
}

//! Annotation model: kinds, typed detection records, and the per-video
//! annotation set consumed by the feature detectors.
//!
//! Field names mirror the annotation service schema verbatim (snake_case);
//! time offsets arrive as seconds-suffixed strings ("2.5s") and are parsed
//! at the point of use.

pub mod dispatcher;
pub mod service;
pub mod store;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::knowledge_graph::BrandKnowledge;

/// Closed set of annotation artifact kinds, one per detection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    /// Text, shot-change, logo and label detection bundled in one request
    Generic,
    Face,
    People,
    Speech,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 4] = [
        AnnotationKind::Generic,
        AnnotationKind::Face,
        AnnotationKind::People,
        AnnotationKind::Speech,
    ];

    /// Canonical artifact file stem. Only the serialization boundary uses
    /// this string form.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            AnnotationKind::Generic => "generic_annotations",
            AnnotationKind::Face => "face_annotations",
            AnnotationKind::People => "people_annotations",
            AnnotationKind::Speech => "speech_annotations",
        }
    }

    /// Artifact file name within a video's annotation directory.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.artifact_name())
    }
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.artifact_name())
    }
}

/// Parse a seconds-suffixed offset string ("2.5s") into seconds.
///
/// A missing or empty offset counts as 0, matching the service's habit of
/// omitting zero-valued fields.
pub fn offset_seconds(offset: Option<&String>) -> f64 {
    match offset {
        Some(raw) => raw.trim_end_matches('s').parse::<f64>().unwrap_or(0.0),
        None => 0.0,
    }
}

/// A video segment with start/end offsets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoSegment {
    #[serde(default)]
    pub start_time_offset: Option<String>,
    #[serde(default)]
    pub end_time_offset: Option<String>,
}

impl VideoSegment {
    pub fn start_seconds(&self) -> f64 {
        offset_seconds(self.start_time_offset.as_ref())
    }

    pub fn end_seconds(&self) -> f64 {
        offset_seconds(self.end_time_offset.as_ref())
    }
}

/// A detected shot boundary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShotAnnotation {
    #[serde(default)]
    pub start_time_offset: Option<String>,
    #[serde(default)]
    pub end_time_offset: Option<String>,
}

impl ShotAnnotation {
    pub fn start_seconds(&self) -> f64 {
        offset_seconds(self.start_time_offset.as_ref())
    }

    pub fn end_seconds(&self) -> f64 {
        offset_seconds(self.end_time_offset.as_ref())
    }
}

/// An entity recognized by the service (logo, label).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub entity_id: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RotatedBoundingBox {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedBoundingBox {
    #[serde(default)]
    pub left: Option<f64>,
    #[serde(default)]
    pub top: Option<f64>,
    #[serde(default)]
    pub right: Option<f64>,
    #[serde(default)]
    pub bottom: Option<f64>,
}

/// On-screen text with the segments and frames it appears in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextAnnotation {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub segments: Vec<TextSegment>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextSegment {
    #[serde(default)]
    pub segment: Option<VideoSegment>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub frames: Vec<TextFrame>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextFrame {
    #[serde(default)]
    pub rotated_bounding_box: Option<RotatedBoundingBox>,
    #[serde(default)]
    pub time_offset: Option<String>,
}

impl TextFrame {
    pub fn time_seconds(&self) -> f64 {
        offset_seconds(self.time_offset.as_ref())
    }
}

/// One tracked appearance (logo, face or person) across consecutive frames.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub segment: Option<VideoSegment>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub timestamped_objects: Vec<TimestampedObject>,
}

impl Track {
    pub fn start_seconds(&self) -> f64 {
        self.segment
            .as_ref()
            .map(|s| s.start_seconds())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimestampedObject {
    #[serde(default)]
    pub normalized_bounding_box: Option<NormalizedBoundingBox>,
    #[serde(default)]
    pub time_offset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogoRecognitionAnnotation {
    #[serde(default)]
    pub entity: Entity,
    #[serde(default)]
    pub tracks: Vec<Track>,
    /// Segments where the logo appears without per-track confidence
    #[serde(default)]
    pub segments: Vec<VideoSegment>,
}

/// A label (entity) detected at segment, shot or frame level.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelAnnotation {
    #[serde(default)]
    pub entity: Entity,
    #[serde(default)]
    pub segments: Vec<LabelSegment>,
    #[serde(default)]
    pub frames: Vec<LabelFrame>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelSegment {
    #[serde(default)]
    pub segment: Option<VideoSegment>,
    #[serde(default)]
    pub confidence: f64,
}

impl LabelSegment {
    pub fn start_seconds(&self) -> f64 {
        self.segment
            .as_ref()
            .map(|s| s.start_seconds())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelFrame {
    #[serde(default)]
    pub time_offset: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceDetectionAnnotation {
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonDetectionAnnotation {
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeechTranscription {
    #[serde(default)]
    pub alternatives: Vec<SpeechAlternative>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeechAlternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: f64,
    /// Word-level timing; only words carry offsets usable for the
    /// first-5-seconds features
    #[serde(default)]
    pub words: Vec<WordInfo>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WordInfo {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

impl WordInfo {
    pub fn start_seconds(&self) -> f64 {
        offset_seconds(self.start_time.as_ref())
    }
}

/// Payload of one generic (standard) annotation request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenericAnnotations {
    #[serde(default)]
    pub shot_annotations: Vec<ShotAnnotation>,
    #[serde(default)]
    pub text_annotations: Vec<TextAnnotation>,
    #[serde(default)]
    pub logo_recognition_annotations: Vec<LogoRecognitionAnnotation>,
    #[serde(default)]
    pub segment_label_annotations: Vec<LabelAnnotation>,
    #[serde(default)]
    pub shot_label_annotations: Vec<LabelAnnotation>,
    #[serde(default)]
    pub frame_label_annotations: Vec<LabelAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceAnnotations {
    #[serde(default)]
    pub face_detection_annotations: Vec<FaceDetectionAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PeopleAnnotations {
    #[serde(default)]
    pub person_detection_annotations: Vec<PersonDetectionAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeechAnnotations {
    #[serde(default)]
    pub speech_transcriptions: Vec<SpeechTranscription>,
}

/// The normalized result of one detection request.
///
/// Collections are time-ordered by start offset (store normalization); an
/// artifact with zero records for its kind is valid and means "nothing
/// detected".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnnotationArtifact {
    Generic(GenericAnnotations),
    Face(FaceAnnotations),
    People(PeopleAnnotations),
    Speech(SpeechAnnotations),
}

impl AnnotationArtifact {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            AnnotationArtifact::Generic(_) => AnnotationKind::Generic,
            AnnotationArtifact::Face(_) => AnnotationKind::Face,
            AnnotationArtifact::People(_) => AnnotationKind::People,
            AnnotationArtifact::Speech(_) => AnnotationKind::Speech,
        }
    }

    /// Sort every record collection by start offset.
    pub fn normalize(&mut self) {
        match self {
            AnnotationArtifact::Generic(g) => {
                g.shot_annotations
                    .sort_by(|a, b| a.start_seconds().total_cmp(&b.start_seconds()));
                for label in g
                    .segment_label_annotations
                    .iter_mut()
                    .chain(g.shot_label_annotations.iter_mut())
                {
                    label
                        .segments
                        .sort_by(|a, b| a.start_seconds().total_cmp(&b.start_seconds()));
                }
            }
            AnnotationArtifact::Face(f) => {
                f.face_detection_annotations
                    .iter_mut()
                    .for_each(|a| sort_tracks(&mut a.tracks));
            }
            AnnotationArtifact::People(p) => {
                p.person_detection_annotations
                    .iter_mut()
                    .for_each(|a| sort_tracks(&mut a.tracks));
            }
            AnnotationArtifact::Speech(s) => {
                for transcription in &mut s.speech_transcriptions {
                    for alternative in &mut transcription.alternatives {
                        alternative
                            .words
                            .sort_by(|a, b| a.start_seconds().total_cmp(&b.start_seconds()));
                    }
                }
            }
        }
    }
}

fn sort_tracks(tracks: &mut [Track]) {
    tracks.sort_by(|a, b| a.start_seconds().total_cmp(&b.start_seconds()));
}

/// All annotation artifacts loaded for one video, plus the pre-resolved
/// brand knowledge detectors need. Kinds whose artifact files were absent
/// are simply not present in the map.
#[derive(Debug, Clone, Default)]
pub struct AnnotationSet {
    artifacts: HashMap<AnnotationKind, AnnotationArtifact>,
    knowledge: BrandKnowledge,
}

impl AnnotationSet {
    pub fn new(
        artifacts: HashMap<AnnotationKind, AnnotationArtifact>,
        knowledge: BrandKnowledge,
    ) -> Self {
        Self {
            artifacts,
            knowledge,
        }
    }

    pub fn has_kind(&self, kind: AnnotationKind) -> bool {
        self.artifacts.contains_key(&kind)
    }

    pub fn has_kinds(&self, kinds: &[AnnotationKind]) -> bool {
        kinds.iter().all(|k| self.has_kind(*k))
    }

    pub fn generic(&self) -> Option<&GenericAnnotations> {
        match self.artifacts.get(&AnnotationKind::Generic) {
            Some(AnnotationArtifact::Generic(g)) => Some(g),
            _ => None,
        }
    }

    pub fn face(&self) -> Option<&FaceAnnotations> {
        match self.artifacts.get(&AnnotationKind::Face) {
            Some(AnnotationArtifact::Face(f)) => Some(f),
            _ => None,
        }
    }

    pub fn people(&self) -> Option<&PeopleAnnotations> {
        match self.artifacts.get(&AnnotationKind::People) {
            Some(AnnotationArtifact::People(p)) => Some(p),
            _ => None,
        }
    }

    pub fn speech(&self) -> Option<&SpeechAnnotations> {
        match self.artifacts.get(&AnnotationKind::Speech) {
            Some(AnnotationArtifact::Speech(s)) => Some(s),
            _ => None,
        }
    }

    pub fn knowledge(&self) -> &BrandKnowledge {
        &self.knowledge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_seconds_parsing() {
        assert_eq!(offset_seconds(Some(&"2.5s".to_string())), 2.5);
        assert_eq!(offset_seconds(Some(&"0s".to_string())), 0.0);
        assert_eq!(offset_seconds(Some(&"12".to_string())), 12.0);
        assert_eq!(offset_seconds(None), 0.0);
        assert_eq!(offset_seconds(Some(&"garbage".to_string())), 0.0);
    }

    #[test]
    fn test_artifact_names() {
        assert_eq!(
            AnnotationKind::Generic.file_name(),
            "generic_annotations.json"
        );
        assert_eq!(AnnotationKind::Speech.artifact_name(), "speech_annotations");
    }

    #[test]
    fn test_normalize_sorts_shots() {
        let mut artifact = AnnotationArtifact::Generic(GenericAnnotations {
            shot_annotations: vec![
                ShotAnnotation {
                    start_time_offset: Some("4.1s".to_string()),
                    end_time_offset: Some("6s".to_string()),
                },
                ShotAnnotation {
                    start_time_offset: Some("0s".to_string()),
                    end_time_offset: Some("4.1s".to_string()),
                },
            ],
            ..Default::default()
        });
        artifact.normalize();

        let AnnotationArtifact::Generic(generic) = artifact else {
            panic!("expected generic artifact");
        };
        assert_eq!(generic.shot_annotations[0].start_seconds(), 0.0);
        assert_eq!(generic.shot_annotations[1].start_seconds(), 4.1);
    }

    #[test]
    fn test_set_kind_accessors() {
        let mut artifacts = HashMap::new();
        artifacts.insert(
            AnnotationKind::Face,
            AnnotationArtifact::Face(FaceAnnotations::default()),
        );
        let set = AnnotationSet::new(artifacts, BrandKnowledge::default());

        assert!(set.has_kind(AnnotationKind::Face));
        assert!(!set.has_kind(AnnotationKind::Speech));
        assert!(set.face().is_some());
        assert!(set.generic().is_none());
        assert!(!set.has_kinds(&[AnnotationKind::Face, AnnotationKind::Generic]));
    }
}

//! Annotation store: loads persisted JSON artifacts into the canonical
//! in-memory shape.
//!
//! The annotation service returns a one-element `annotation_results` list
//! per request; this store consumes element [0] and treats anything else
//! as a malformed artifact.

use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::annotations::{
    AnnotationArtifact, AnnotationKind, AnnotationSet, FaceAnnotations, GenericAnnotations,
    PeopleAnnotations, SpeechAnnotations,
};
use crate::error::{PipelineError, Result};
use crate::knowledge_graph::BrandKnowledge;

/// Load one artifact file as the given kind.
///
/// Fails with [`PipelineError::MalformedArtifact`] if the file is missing,
/// not valid JSON, lacks the `annotation_results` key, or the results list
/// is empty.
pub async fn load(path: &Path, kind: AnnotationKind) -> Result<AnnotationArtifact> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PipelineError::malformed(path, format!("cannot read file: {}", e)))?;

    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| PipelineError::malformed(path, format!("invalid JSON: {}", e)))?;

    let results = value
        .get("annotation_results")
        .and_then(|v| v.as_array())
        .ok_or_else(|| PipelineError::malformed(path, "missing annotation_results array"))?;

    let first = results
        .first()
        .ok_or_else(|| PipelineError::malformed(path, "annotation_results is empty"))?
        .clone();

    let mut artifact = match kind {
        AnnotationKind::Generic => {
            let payload: GenericAnnotations = serde_json::from_value(first)
                .map_err(|e| PipelineError::malformed(path, format!("unexpected shape: {}", e)))?;
            AnnotationArtifact::Generic(payload)
        }
        AnnotationKind::Face => {
            let payload: FaceAnnotations = serde_json::from_value(first)
                .map_err(|e| PipelineError::malformed(path, format!("unexpected shape: {}", e)))?;
            AnnotationArtifact::Face(payload)
        }
        AnnotationKind::People => {
            let payload: PeopleAnnotations = serde_json::from_value(first)
                .map_err(|e| PipelineError::malformed(path, format!("unexpected shape: {}", e)))?;
            AnnotationArtifact::People(payload)
        }
        AnnotationKind::Speech => {
            let payload: SpeechAnnotations = serde_json::from_value(first)
                .map_err(|e| PipelineError::malformed(path, format!("unexpected shape: {}", e)))?;
            AnnotationArtifact::Speech(payload)
        }
    };

    artifact.normalize();
    debug!("📋 Loaded {} artifact from {}", kind, path.display());
    Ok(artifact)
}

/// Load every artifact present in a video's annotation directory.
///
/// Kinds whose files are absent are skipped with a warning; the features
/// requiring them are later omitted from the verdict list. A present but
/// malformed file is an error.
pub async fn load_dir(dir: &Path, knowledge: BrandKnowledge) -> Result<AnnotationSet> {
    let mut artifacts = HashMap::new();
    for kind in AnnotationKind::ALL {
        let path = dir.join(kind.file_name());
        if !path.exists() {
            warn!(
                "No {} artifact in {}; dependent features will be skipped",
                kind,
                dir.display()
            );
            continue;
        }
        artifacts.insert(kind, load(&path, kind).await?);
    }
    Ok(AnnotationSet::new(artifacts, knowledge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_artifact(dir: &Path, kind: AnnotationKind, body: &str) {
        std::fs::write(dir.join(kind.file_name()), body).unwrap();
    }

    const GENERIC_BODY: &str = r#"{
        "annotation_results": [{
            "shot_annotations": [
                {"start_time_offset": "2.5s", "end_time_offset": "4s"},
                {"start_time_offset": "0s", "end_time_offset": "2.5s"}
            ],
            "text_annotations": [{"text": "SHOP NOW", "segments": []}]
        }]
    }"#;

    #[tokio::test]
    async fn test_load_generic_artifact() {
        let tmp = TempDir::new().unwrap();
        write_artifact(tmp.path(), AnnotationKind::Generic, GENERIC_BODY);

        let artifact = load(
            &tmp.path().join(AnnotationKind::Generic.file_name()),
            AnnotationKind::Generic,
        )
        .await
        .unwrap();

        let AnnotationArtifact::Generic(generic) = artifact else {
            panic!("expected generic artifact");
        };
        // Normalized: shots ordered by start offset
        assert_eq!(generic.shot_annotations[0].start_seconds(), 0.0);
        assert_eq!(generic.text_annotations[0].text, "SHOP NOW");
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        write_artifact(tmp.path(), AnnotationKind::Generic, GENERIC_BODY);
        let path = tmp.path().join(AnnotationKind::Generic.file_name());

        let first = load(&path, AnnotationKind::Generic).await.unwrap();
        let second = load(&path, AnnotationKind::Generic).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_file_is_malformed() {
        let tmp = TempDir::new().unwrap();
        let result = load(&tmp.path().join("nope.json"), AnnotationKind::Face).await;
        assert!(matches!(
            result,
            Err(PipelineError::MalformedArtifact { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_results_list_is_malformed() {
        let tmp = TempDir::new().unwrap();
        write_artifact(
            tmp.path(),
            AnnotationKind::Speech,
            r#"{"annotation_results": []}"#,
        );
        let result = load(
            &tmp.path().join(AnnotationKind::Speech.file_name()),
            AnnotationKind::Speech,
        )
        .await;
        assert!(matches!(
            result,
            Err(PipelineError::MalformedArtifact { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_top_level_key_is_malformed() {
        let tmp = TempDir::new().unwrap();
        write_artifact(tmp.path(), AnnotationKind::People, r#"{"results": []}"#);
        let result = load(
            &tmp.path().join(AnnotationKind::People.file_name()),
            AnnotationKind::People,
        )
        .await;
        assert!(matches!(
            result,
            Err(PipelineError::MalformedArtifact { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_dir_skips_absent_kinds() {
        let tmp = TempDir::new().unwrap();
        write_artifact(tmp.path(), AnnotationKind::Generic, GENERIC_BODY);

        let set = load_dir(tmp.path(), BrandKnowledge::default())
            .await
            .unwrap();
        assert!(set.has_kind(AnnotationKind::Generic));
        assert!(!set.has_kind(AnnotationKind::Speech));
        assert!(!set.has_kind(AnnotationKind::Face));
    }

    #[tokio::test]
    async fn test_empty_records_is_valid() {
        let tmp = TempDir::new().unwrap();
        write_artifact(
            tmp.path(),
            AnnotationKind::Face,
            r#"{"annotation_results": [{}]}"#,
        );
        let artifact = load(
            &tmp.path().join(AnnotationKind::Face.file_name()),
            AnnotationKind::Face,
        )
        .await
        .unwrap();
        let AnnotationArtifact::Face(face) = artifact else {
            panic!("expected face artifact");
        };
        assert!(face.face_detection_annotations.is_empty());
    }
}

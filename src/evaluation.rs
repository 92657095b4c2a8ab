//! Evaluation aggregator: runs the feature catalog over one video's
//! annotation set and folds the verdicts into a score and bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::detectors::{FeatureCatalog, FeatureVerdict};
use crate::annotations::AnnotationSet;
use crate::video::VideoAsset;

/// Adherence bucket derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictBucket {
    Excellent,
    MightImprove,
    NeedsReview,
}

impl VerdictBucket {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            VerdictBucket::Excellent
        } else if score >= 65.0 {
            VerdictBucket::MightImprove
        } else {
            VerdictBucket::NeedsReview
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VerdictBucket::Excellent => "✅ Excellent",
            VerdictBucket::MightImprove => "⚠ Might Improve",
            VerdictBucket::NeedsReview => "❌ Needs Review",
        }
    }
}

/// All verdicts for one video plus the derived score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub video_name: String,
    pub video_url: String,
    pub verdicts: Vec<FeatureVerdict>,
    pub score: f64,
    pub analyzed_at: DateTime<Utc>,
}

impl EvaluationResult {
    pub fn detected_count(&self) -> usize {
        self.verdicts.iter().filter(|v| v.detected).count()
    }

    pub fn bucket(&self) -> VerdictBucket {
        VerdictBucket::from_score(self.score)
    }
}

/// Percentage of detected features; zero when nothing was evaluated.
pub fn calculate_score(verdicts: &[FeatureVerdict]) -> f64 {
    if verdicts.is_empty() {
        return 0.0;
    }
    let detected = verdicts.iter().filter(|v| v.detected).count();
    100.0 * detected as f64 / verdicts.len() as f64
}

/// Run every catalog feature whose required annotation kinds are present.
/// Features missing a kind (a failed or skipped request) are skipped with a
/// warning rather than counted against the video.
pub fn evaluate(config: &Config, video: &VideoAsset, set: &AnnotationSet) -> EvaluationResult {
    let catalog = FeatureCatalog::standard();
    let mut verdicts = Vec::with_capacity(catalog.len());

    for feature in catalog.features() {
        if !set.has_kinds(feature.required_kinds) {
            warn!(
                "⚠ Skipping '{}' for {}: required annotations missing",
                feature.id, video.filename
            );
            continue;
        }
        let verdict = (feature.detector)(config, set, feature);
        debug!(
            "{} -> {}",
            verdict.id,
            if verdict.detected { "detected" } else { "not detected" }
        );
        verdicts.push(verdict);
    }

    let score = calculate_score(&verdicts);
    info!(
        "📊 {}: {}/{} features detected ({:.2}%)",
        video.filename,
        verdicts.iter().filter(|v| v.detected).count(),
        verdicts.len(),
        score
    );

    EvaluationResult {
        video_name: video.filename.clone(),
        video_url: video.video_url.clone(),
        verdicts,
        score,
        analyzed_at: Utc::now(),
    }
}

/// Attach a second evaluation source's booleans to matching verdicts.
///
/// Matching is by feature id; the primary verdict is never replaced.
/// Secondary verdicts with no primary counterpart are logged and dropped.
pub fn merge_secondary(result: &mut EvaluationResult, secondary: &[FeatureVerdict]) {
    for incoming in secondary {
        match result.verdicts.iter_mut().find(|v| v.id == incoming.id) {
            Some(verdict) => {
                verdict.secondary_detected = Some(incoming.detected);
                verdict.multi_source = true;
            }
            None => {
                warn!(
                    "Dropping secondary verdict '{}': no matching feature",
                    incoming.id
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{
        AnnotationArtifact, AnnotationKind, FaceAnnotations, GenericAnnotations,
        PeopleAnnotations, ShotAnnotation, SpeechAnnotations,
    };
    use crate::config::ConfigBuilder;
    use crate::detectors::{FeatureCategory, FeatureDefinition};
    use crate::knowledge_graph::BrandKnowledge;
    use std::collections::HashMap;

    fn config() -> Config {
        ConfigBuilder::new().with_brand("Acme", "Acme").build()
    }

    fn video() -> VideoAsset {
        VideoAsset {
            blob: Vec::new(),
            filename: "spot.mp4".to_string(),
            video_url: "videos/spot.mp4".to_string(),
            id: "spot".to_string(),
        }
    }

    fn full_set() -> AnnotationSet {
        let mut artifacts = HashMap::new();
        artifacts.insert(
            AnnotationKind::Generic,
            AnnotationArtifact::Generic(GenericAnnotations {
                shot_annotations: vec![ShotAnnotation {
                    start_time_offset: Some("0s".to_string()),
                    end_time_offset: Some("2.5s".to_string()),
                }],
                ..Default::default()
            }),
        );
        artifacts.insert(
            AnnotationKind::Face,
            AnnotationArtifact::Face(FaceAnnotations::default()),
        );
        artifacts.insert(
            AnnotationKind::People,
            AnnotationArtifact::People(PeopleAnnotations::default()),
        );
        artifacts.insert(
            AnnotationKind::Speech,
            AnnotationArtifact::Speech(SpeechAnnotations::default()),
        );
        AnnotationSet::new(artifacts, BrandKnowledge::default())
    }

    fn verdict(id: &str, detected: bool) -> FeatureVerdict {
        let definition = FeatureDefinition {
            id: Box::leak(id.to_string().into_boxed_str()),
            name: "test",
            category: FeatureCategory::Attract,
            criteria: "",
            required_kinds: &[AnnotationKind::Generic],
            detector: |_, _, d| FeatureVerdict::new(d, false, None),
        };
        FeatureVerdict::new(&definition, detected, None)
    }

    #[test]
    fn test_score_calculation() {
        let verdicts = vec![
            verdict("a", true),
            verdict("b", true),
            verdict("c", false),
            verdict("d", false),
        ];
        assert_eq!(calculate_score(&verdicts), 50.0);
        assert_eq!(calculate_score(&[]), 0.0);
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(VerdictBucket::from_score(80.0), VerdictBucket::Excellent);
        assert_eq!(
            VerdictBucket::from_score(79.9999),
            VerdictBucket::MightImprove
        );
        assert_eq!(VerdictBucket::from_score(65.0), VerdictBucket::MightImprove);
        assert_eq!(
            VerdictBucket::from_score(64.9999),
            VerdictBucket::NeedsReview
        );
        assert_eq!(VerdictBucket::from_score(100.0), VerdictBucket::Excellent);
        assert_eq!(VerdictBucket::from_score(0.0), VerdictBucket::NeedsReview);
    }

    #[test]
    fn test_evaluate_runs_full_catalog_when_all_kinds_present() {
        let result = evaluate(&config(), &video(), &full_set());
        assert_eq!(result.verdicts.len(), FeatureCatalog::standard().len());
        // One shot ending at 2.5s passes dynamic start
        assert!(result
            .verdicts
            .iter()
            .find(|v| v.id == "a_dynamic_start")
            .unwrap()
            .detected);
    }

    #[test]
    fn test_evaluate_skips_features_with_missing_kinds() {
        let mut artifacts = HashMap::new();
        artifacts.insert(
            AnnotationKind::Generic,
            AnnotationArtifact::Generic(GenericAnnotations::default()),
        );
        let set = AnnotationSet::new(artifacts, BrandKnowledge::default());

        let result = evaluate(&config(), &video(), &set);
        assert!(result.verdicts.len() < FeatureCatalog::standard().len());
        assert!(result.verdicts.iter().all(|v| {
            v.id != "c_visible_face_1st_5_secs" && v.id != "d_call_to_action_speech"
        }));
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let config = config();
        let video = video();
        let set = full_set();
        let first = evaluate(&config, &video, &set);
        let second = evaluate(&config, &video, &set);
        assert_eq!(first.verdicts, second.verdicts);
        assert_eq!(first.score, second.score);
    }

    #[test]
    fn test_merge_attaches_secondary_and_drops_unmatched() {
        let mut result = EvaluationResult {
            video_name: "spot.mp4".to_string(),
            video_url: String::new(),
            verdicts: vec![verdict("f1", true), verdict("f3", false)],
            score: 50.0,
            analyzed_at: Utc::now(),
        };

        merge_secondary(&mut result, &[verdict("f1", false), verdict("f2", true)]);

        let f1 = result.verdicts.iter().find(|v| v.id == "f1").unwrap();
        assert!(f1.detected);
        assert_eq!(f1.secondary_detected, Some(false));
        assert!(f1.multi_source);

        let f3 = result.verdicts.iter().find(|v| v.id == "f3").unwrap();
        assert!(f3.secondary_detected.is_none());
        assert!(!f3.multi_source);

        // f2 had no counterpart and was dropped
        assert_eq!(result.verdicts.len(), 2);
    }
}

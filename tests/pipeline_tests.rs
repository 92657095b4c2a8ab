//! End-to-end pipeline coverage: dispatch against a mock annotation
//! service, reload the written artifacts, evaluate, and render the report.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use abcd_analyzer::annotations::dispatcher::AnnotationDispatcher;
use abcd_analyzer::annotations::service::{AnnotateRequest, AnnotationService, DetectionFeature};
use abcd_analyzer::annotations::{store, AnnotationKind};
use abcd_analyzer::config::ConfigBuilder;
use abcd_analyzer::detectors::FeatureCatalog;
use abcd_analyzer::evaluation::{evaluate, VerdictBucket};
use abcd_analyzer::knowledge_graph::BrandKnowledge;
use abcd_analyzer::report;
use abcd_analyzer::video::VideoAsset;
use abcd_analyzer::Result;

/// Answers each request with a canned per-kind payload for a short,
/// fast-paced video that mentions the brand early.
struct CannedService;

#[async_trait]
impl AnnotationService for CannedService {
    async fn annotate(&self, request: AnnotateRequest) -> Result<Value> {
        let payload = if request.features.contains(&DetectionFeature::FaceDetection) {
            json!({
                "face_detection_annotations": [{
                    "tracks": [{
                        "segment": {"start_time_offset": "0.5s", "end_time_offset": "4s"},
                        "confidence": 0.93,
                        "timestamped_objects": [{
                            "normalized_bounding_box": {
                                "left": 0.2, "right": 0.8, "top": 0.1, "bottom": 0.9
                            },
                            "time_offset": "1s"
                        }]
                    }]
                }]
            })
        } else if request.features.contains(&DetectionFeature::PersonDetection) {
            json!({
                "person_detection_annotations": [{
                    "tracks": [{
                        "segment": {"start_time_offset": "0s", "end_time_offset": "10s"},
                        "confidence": 0.88
                    }]
                }]
            })
        } else if request.features.contains(&DetectionFeature::SpeechTranscription) {
            json!({
                "speech_transcriptions": [{
                    "alternatives": [{
                        "transcript": "Acme rocket skates, shop now",
                        "confidence": 0.91,
                        "words": [
                            {"word": "Acme", "start_time": "0.4s", "end_time": "0.8s"},
                            {"word": "rocket", "start_time": "0.9s", "end_time": "1.2s"},
                            {"word": "skates", "start_time": "1.3s", "end_time": "1.7s"},
                            {"word": "shop", "start_time": "2.0s", "end_time": "2.3s"},
                            {"word": "now", "start_time": "2.4s", "end_time": "2.6s"}
                        ]
                    }]
                }]
            })
        } else {
            json!({
                "shot_annotations": [
                    {"start_time_offset": "0s", "end_time_offset": "1s"},
                    {"start_time_offset": "1s", "end_time_offset": "1.8s"},
                    {"start_time_offset": "1.8s", "end_time_offset": "2.6s"},
                    {"start_time_offset": "2.6s", "end_time_offset": "3.4s"},
                    {"start_time_offset": "3.4s", "end_time_offset": "4.2s"},
                    {"start_time_offset": "4.2s", "end_time_offset": "5s"}
                ],
                "text_annotations": [{
                    "text": "Acme Rocket Skates - Shop Now",
                    "segments": [{
                        "segment": {"start_time_offset": "0.5s", "end_time_offset": "3s"},
                        "confidence": 0.95,
                        "frames": [{"time_offset": "0.5s"}]
                    }]
                }]
            })
        };
        Ok(json!({ "annotation_results": [payload] }))
    }
}

fn asset() -> VideoAsset {
    VideoAsset {
        blob: b"fake-video-bytes".to_vec(),
        filename: "acme_spot.mp4".to_string(),
        video_url: "videos/acme_spot.mp4".to_string(),
        id: "acme_spot.mp4".to_string(),
    }
}

#[tokio::test]
async fn dispatch_load_evaluate_report() {
    let tmp = TempDir::new().unwrap();
    let config = ConfigBuilder::new()
        .with_brand("Acme", "Acme")
        .with_products("Rocket Skates", "footwear")
        .with_annotations_dir(tmp.path().to_path_buf())
        .build();

    let video = asset();
    let annotation_dir = config.annotation_dir_for(&video.filename);

    let dispatcher =
        AnnotationDispatcher::new(Arc::new(CannedService), Duration::from_secs(5));
    let dispatch = dispatcher.dispatch(&video, &annotation_dir).await.unwrap();
    assert!(dispatch.is_complete());

    let set = store::load_dir(&annotation_dir, BrandKnowledge::default())
        .await
        .unwrap();
    assert!(set.has_kinds(&AnnotationKind::ALL));

    let result = evaluate(&config, &video, &set);
    assert_eq!(result.verdicts.len(), FeatureCatalog::standard().len());

    let by_id = |id: &str| result.verdicts.iter().find(|v| v.id == id).unwrap();
    // First shot ends at 1s, well under the 3000ms cutoff
    assert!(by_id("a_dynamic_start").detected);
    // Six shots inside the first five seconds
    assert!(by_id("a_quick_pacing").detected);
    assert!(by_id("a_supers").detected);
    // Brand name on screen and spoken early
    assert!(by_id("b_brand_visuals").detected);
    assert!(by_id("b_brand_mention_speech_1st_5_secs").detected);
    assert!(by_id("b_product_mention_text").detected);
    assert!(by_id("b_product_mention_speech").detected);
    // Large confident face track starting early
    assert!(by_id("c_visible_face_1st_5_secs").detected);
    assert!(by_id("c_visible_face_close_up").detected);
    assert!(by_id("c_presence_of_people").detected);
    // "shop now" on screen and in speech
    assert!(by_id("d_call_to_action_text").detected);
    assert!(by_id("d_call_to_action_speech").detected);
    assert!(by_id("d_audio_speech_early_1st_5_secs").detected);

    let rendered = report::render(&config, &result);
    assert!(rendered.contains("Brand: Acme"));
    assert!(rendered.contains("Asset: acme_spot.mp4"));
    assert!(rendered.contains("Video score:"));
}

#[tokio::test]
async fn missing_artifact_skips_dependent_features() {
    let tmp = TempDir::new().unwrap();
    let config = ConfigBuilder::new()
        .with_brand("Acme", "Acme")
        .with_annotations_dir(tmp.path().to_path_buf())
        .build();
    let video = asset();
    let annotation_dir = config.annotation_dir_for(&video.filename);

    let dispatcher =
        AnnotationDispatcher::new(Arc::new(CannedService), Duration::from_secs(5));
    dispatcher.dispatch(&video, &annotation_dir).await.unwrap();

    // Simulate a timed-out speech request by removing its artifact
    std::fs::remove_file(annotation_dir.join(AnnotationKind::Speech.file_name())).unwrap();

    let set = store::load_dir(&annotation_dir, BrandKnowledge::default())
        .await
        .unwrap();
    assert!(!set.has_kind(AnnotationKind::Speech));

    let result = evaluate(&config, &video, &set);
    let speech_only: Vec<_> = FeatureCatalog::standard()
        .features()
        .iter()
        .filter(|f| f.required_kinds.contains(&AnnotationKind::Speech))
        .map(|f| f.id)
        .collect();
    for id in speech_only {
        assert!(
            result.verdicts.iter().all(|v| v.id != id),
            "{} should have been skipped",
            id
        );
    }
    // Generic-only features still ran
    assert!(result.verdicts.iter().any(|v| v.id == "a_dynamic_start"));
}

#[tokio::test]
async fn score_and_bucket_follow_detection_ratio() {
    let tmp = TempDir::new().unwrap();
    let config = ConfigBuilder::new()
        .with_brand("Acme", "Acme")
        .with_products("Rocket Skates", "footwear")
        .with_annotations_dir(tmp.path().to_path_buf())
        .build();
    let video = asset();
    let annotation_dir = config.annotation_dir_for(&video.filename);

    let dispatcher =
        AnnotationDispatcher::new(Arc::new(CannedService), Duration::from_secs(5));
    dispatcher.dispatch(&video, &annotation_dir).await.unwrap();
    let set = store::load_dir(&annotation_dir, BrandKnowledge::default())
        .await
        .unwrap();

    let result = evaluate(&config, &video, &set);
    let detected = result.verdicts.iter().filter(|v| v.detected).count();
    let expected = 100.0 * detected as f64 / result.verdicts.len() as f64;
    assert!((result.score - expected).abs() < f64::EPSILON);
    assert_eq!(result.bucket(), VerdictBucket::from_score(result.score));
}

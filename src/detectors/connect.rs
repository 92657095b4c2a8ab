//! Connect detectors: faces, people, and overall pacing.

use crate::annotations::AnnotationSet;
use crate::config::Config;
use crate::detectors::helpers::face_box_surface;
use crate::detectors::{FeatureDefinition, FeatureVerdict};

pub fn detect_visible_face_first_5_secs(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match faces(config, set) {
        Some((detected, _)) => FeatureVerdict::new(definition, detected, None),
        None => FeatureVerdict::no_annotations(definition),
    }
}

pub fn detect_visible_face_close_up(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match faces(config, set) {
        Some((_, (detected, evidence))) => FeatureVerdict::new(definition, detected, evidence),
        None => FeatureVerdict::no_annotations(definition),
    }
}

/// One pass over the face tracks computing both face features: presence in
/// the early window, and any close-up (bounding box covering at least the
/// surface fraction threshold).
fn faces(config: &Config, set: &AnnotationSet) -> Option<(bool, (bool, Option<String>))> {
    let face = set.face()?;
    if face.face_detection_annotations.is_empty() {
        return None;
    }

    let mut early = false;
    let mut close_up = false;
    let mut evidence = None;

    for annotation in &face.face_detection_annotations {
        for track in &annotation.tracks {
            if track.confidence < config.thresholds.confidence_threshold {
                continue;
            }
            if track.start_seconds() < config.thresholds.early_time_seconds {
                early = true;
            }
            for object in &track.timestamped_objects {
                if let Some(bounding_box) = &object.normalized_bounding_box {
                    let surface = face_box_surface(bounding_box);
                    if surface >= config.thresholds.face_surface_threshold {
                        close_up = true;
                        evidence.get_or_insert_with(|| {
                            format!("face covers {:.0}% of the frame", surface * 100.0)
                        });
                    }
                }
            }
        }
    }

    Some((early, (close_up, evidence)))
}

pub fn detect_presence_of_people(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match people(config, set) {
        Some((detected, _)) => FeatureVerdict::new(definition, detected, None),
        None => FeatureVerdict::no_annotations(definition),
    }
}

pub fn detect_presence_of_people_first_5_secs(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match people(config, set) {
        Some((_, detected)) => FeatureVerdict::new(definition, detected, None),
        None => FeatureVerdict::no_annotations(definition),
    }
}

fn people(config: &Config, set: &AnnotationSet) -> Option<(bool, bool)> {
    let people = set.people()?;
    if people.person_detection_annotations.is_empty() {
        return None;
    }

    let mut found = false;
    let mut found_early = false;
    for annotation in &people.person_detection_annotations {
        for track in &annotation.tracks {
            if track.confidence < config.thresholds.confidence_threshold {
                continue;
            }
            found = true;
            if track.start_seconds() < config.thresholds.early_time_seconds {
                found_early = true;
            }
        }
    }
    Some((found, found_early))
}

pub fn detect_overall_pacing(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    let Some(generic) = set.generic() else {
        return FeatureVerdict::no_annotations(definition);
    };
    let shots = &generic.shot_annotations;
    if shots.is_empty() {
        return FeatureVerdict::no_annotations(definition);
    }

    let total: f64 = shots
        .iter()
        .map(|shot| shot.end_seconds() - shot.start_seconds())
        .sum();
    let average = total / shots.len() as f64;
    let detected = average <= config.thresholds.avg_shot_duration_seconds;
    FeatureVerdict::new(
        definition,
        detected,
        Some(format!("average shot duration {:.2}s", average)),
    )
}

//! Brand detectors: brand visuals (text + logo), brand/product mentions in
//! speech and text, and product visuals via label annotations.
//!
//! Logo and product entity matching uses the pre-resolved Knowledge Graph
//! entities carried in the annotation set.

use tracing::debug;

use crate::annotations::{AnnotationSet, LabelSegment};
use crate::config::Config;
use crate::detectors::helpers::{
    detected_text_in_first_seconds, find_elements_in_transcript, logo_box_surface,
    quad_surface_area,
};
use crate::detectors::{FeatureDefinition, FeatureVerdict};

pub fn detect_brand_visuals(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match brand_visuals(config, set) {
        Some((detected, _, evidence)) => FeatureVerdict::new(definition, detected, evidence),
        None => FeatureVerdict::no_annotations(definition),
    }
}

pub fn detect_brand_visuals_first_5_secs(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match brand_visuals(config, set) {
        Some((_, detected, evidence)) => FeatureVerdict::new(definition, detected, evidence),
        None => FeatureVerdict::no_annotations(definition),
    }
}

/// Brand presence in on-screen text and recognized logos. Returns
/// (whole video, early window, evidence) or None when the artifact has
/// neither text nor logo records.
fn brand_visuals(
    config: &Config,
    set: &AnnotationSet,
) -> Option<(bool, bool, Option<String>)> {
    let generic = set.generic()?;
    if generic.text_annotations.is_empty() && generic.logo_recognition_annotations.is_empty() {
        return None;
    }

    let mut brand_visuals = false;
    let mut brand_visuals_early = false;
    let mut evidence = None;

    // On-screen text containing a brand variation
    for text_annotation in &generic.text_annotations {
        let text = text_annotation.text.to_lowercase();
        let found_brand = config
            .brand
            .brand_variations
            .iter()
            .any(|brand| text.contains(&brand.to_lowercase()));
        if !found_brand {
            continue;
        }
        brand_visuals = true;
        evidence.get_or_insert_with(|| format!("brand text '{}'", text_annotation.text));

        let (found_early, frame) = detected_text_in_first_seconds(config, text_annotation);
        if found_early {
            brand_visuals_early = true;
            if let Some(bounding_box) = frame.and_then(|f| f.rotated_bounding_box.as_ref()) {
                let surface = quad_surface_area(&bounding_box.vertices);
                if surface > config.thresholds.logo_size_threshold {
                    evidence = Some(format!(
                        "brand text '{}' covers {:.1}% of the frame early",
                        text_annotation.text, surface
                    ));
                }
            }
        }
    }

    // Recognized logos matched against the brand's Knowledge Graph entities
    let knowledge = set.knowledge();
    for logo in &generic.logo_recognition_annotations {
        let entity_matches = knowledge.brand_entities.contains_key(&logo.entity.entity_id)
            || knowledge.brand_entity_list().iter().any(|e| {
                e.description.to_lowercase() == logo.entity.description.to_lowercase()
                    || e.name.to_lowercase() == logo.entity.description.to_lowercase()
            });
        if !entity_matches {
            continue;
        }

        for track in &logo.tracks {
            if track.confidence < config.thresholds.confidence_threshold {
                continue;
            }
            brand_visuals = true;
            evidence.get_or_insert_with(|| format!("logo '{}'", logo.entity.description));
            if track.start_seconds() <= config.thresholds.early_time_seconds {
                brand_visuals_early = true;
                for object in &track.timestamped_objects {
                    if let Some(bounding_box) = &object.normalized_bounding_box {
                        let surface = logo_box_surface(bounding_box);
                        if surface > config.thresholds.logo_size_threshold {
                            evidence = Some(format!(
                                "logo '{}' covers {:.1}% of the frame early",
                                logo.entity.description, surface
                            ));
                        }
                    }
                }
            }
        }

        // Logo segments carry no confidence; they only feed the early check
        for segment in &logo.segments {
            if segment.start_seconds() <= config.thresholds.early_time_seconds {
                brand_visuals_early = true;
            }
        }
    }

    Some((brand_visuals, brand_visuals_early, evidence))
}

pub fn detect_brand_mention_speech(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match brand_mention_speech(config, set) {
        Some((detected, _)) => FeatureVerdict::new(definition, detected, None),
        None => FeatureVerdict::no_annotations(definition),
    }
}

pub fn detect_brand_mention_speech_first_5_secs(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match brand_mention_speech(config, set) {
        Some((_, detected)) => FeatureVerdict::new(definition, detected, None),
        None => FeatureVerdict::no_annotations(definition),
    }
}

fn brand_mention_speech(config: &Config, set: &AnnotationSet) -> Option<(bool, bool)> {
    let speech = set.speech()?;
    if speech.speech_transcriptions.is_empty() {
        return None;
    }
    Some(find_elements_in_transcript(
        config,
        speech,
        &config.brand.brand_variations,
        &[],
        false,
    ))
}

pub fn detect_product_mention_speech(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match product_mention_speech(config, set) {
        Some((detected, _)) => FeatureVerdict::new(definition, detected, None),
        None => FeatureVerdict::no_annotations(definition),
    }
}

pub fn detect_product_mention_speech_first_5_secs(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match product_mention_speech(config, set) {
        Some((_, detected)) => FeatureVerdict::new(definition, detected, None),
        None => FeatureVerdict::no_annotations(definition),
    }
}

fn product_mention_speech(config: &Config, set: &AnnotationSet) -> Option<(bool, bool)> {
    let speech = set.speech()?;
    if speech.speech_transcriptions.is_empty() {
        return None;
    }
    Some(find_elements_in_transcript(
        config,
        speech,
        &config.brand.branded_products,
        &config.brand.branded_products_categories,
        false,
    ))
}

pub fn detect_product_mention_text(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match product_mention_text(config, set) {
        Some((detected, _)) => FeatureVerdict::new(definition, detected, None),
        None => FeatureVerdict::no_annotations(definition),
    }
}

pub fn detect_product_mention_text_first_5_secs(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match product_mention_text(config, set) {
        Some((_, detected)) => FeatureVerdict::new(definition, detected, None),
        None => FeatureVerdict::no_annotations(definition),
    }
}

fn product_mention_text(config: &Config, set: &AnnotationSet) -> Option<(bool, bool)> {
    let generic = set.generic()?;
    if generic.text_annotations.is_empty() {
        return None;
    }

    let mut found = false;
    let mut found_early = false;
    for text_annotation in &generic.text_annotations {
        let text = text_annotation.text.to_lowercase();
        let matched = config
            .brand
            .branded_products
            .iter()
            .chain(config.brand.branded_products_categories.iter())
            .any(|product| text.contains(&product.to_lowercase()));
        if matched {
            found = true;
            let (early, _) = detected_text_in_first_seconds(config, text_annotation);
            if early {
                found_early = true;
            }
        }
    }
    Some((found, found_early))
}

pub fn detect_product_visuals(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match product_visuals(config, set) {
        Some((detected, _)) => FeatureVerdict::new(definition, detected, None),
        None => FeatureVerdict::no_annotations(definition),
    }
}

pub fn detect_product_visuals_first_5_secs(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match product_visuals(config, set) {
        Some((_, detected)) => FeatureVerdict::new(definition, detected, None),
        None => FeatureVerdict::no_annotations(definition),
    }
}

/// Branded product presence in label annotations at segment, shot and
/// frame level.
fn product_visuals(config: &Config, set: &AnnotationSet) -> Option<(bool, bool)> {
    let generic = set.generic()?;
    if generic.segment_label_annotations.is_empty()
        && generic.shot_label_annotations.is_empty()
        && generic.frame_label_annotations.is_empty()
    {
        return None;
    }

    let mut found = false;
    let mut found_early = false;

    let mut check = |entity_id: &str, description: &str, segment: &LabelSegment| {
        if !product_entity_matches(config, set, entity_id, description) {
            return;
        }
        if segment.confidence >= config.thresholds.confidence_threshold {
            found = true;
            if segment.start_seconds() <= config.thresholds.early_time_seconds {
                found_early = true;
            }
        }
    };

    for label in generic
        .segment_label_annotations
        .iter()
        .chain(generic.shot_label_annotations.iter())
    {
        for segment in &label.segments {
            check(&label.entity.entity_id, &label.entity.description, segment);
        }
    }

    // Frame-level labels carry a time offset instead of a segment
    for label in &generic.frame_label_annotations {
        if !product_entity_matches(config, set, &label.entity.entity_id, &label.entity.description)
        {
            continue;
        }
        for frame in &label.frames {
            if frame.confidence >= config.thresholds.confidence_threshold {
                found = true;
                let offset =
                    crate::annotations::offset_seconds(frame.time_offset.as_ref());
                if offset <= config.thresholds.early_time_seconds {
                    found_early = true;
                }
            }
        }
    }

    debug!("product visuals: {} (early: {})", found, found_early);
    Some((found, found_early))
}

fn product_entity_matches(
    config: &Config,
    set: &AnnotationSet,
    entity_id: &str,
    description: &str,
) -> bool {
    let description = description.to_lowercase();
    set.knowledge().product_entities.contains_key(entity_id)
        || config
            .brand
            .branded_products
            .iter()
            .any(|p| p.to_lowercase() == description)
        || config
            .brand
            .branded_products_categories
            .iter()
            .any(|c| c.to_lowercase() == description)
}

#[cfg(test)]
pub(crate) fn generic_set(generic: crate::annotations::GenericAnnotations) -> AnnotationSet {
    use crate::annotations::{AnnotationArtifact, AnnotationKind};
    use crate::knowledge_graph::BrandKnowledge;
    use std::collections::HashMap;

    let mut artifacts = HashMap::new();
    artifacts.insert(AnnotationKind::Generic, AnnotationArtifact::Generic(generic));
    AnnotationSet::new(artifacts, BrandKnowledge::default())
}

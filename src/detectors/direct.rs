//! Direct detectors: calls to action and early audio.

use crate::annotations::AnnotationSet;
use crate::config::Config;
use crate::detectors::helpers::find_elements_in_transcript;
use crate::detectors::{FeatureDefinition, FeatureVerdict};

/// Stock call-to-action phrases, matched case-insensitively alongside any
/// configured brand-specific phrases.
pub const STOCK_CALL_TO_ACTIONS: &[&str] = &[
    "LEARN MORE",
    "GET QUOTE",
    "APPLY NOW",
    "SIGN UP",
    "CONTACT US",
    "SUBSCRIBE",
    "DOWNLOAD",
    "BOOK NOW",
    "SHOP NOW",
    "BUY NOW",
    "DONATE NOW",
    "ORDER NOW",
    "PLAY NOW",
    "SEE MORE",
    "START NOW",
    "VISIT SITE",
    "WATCH NOW",
];

fn call_to_actions(config: &Config) -> Vec<String> {
    STOCK_CALL_TO_ACTIONS
        .iter()
        .map(|cta| cta.to_string())
        .chain(config.brand.branded_call_to_actions.iter().cloned())
        .collect()
}

pub fn detect_call_to_action_text(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    let Some(generic) = set.generic() else {
        return FeatureVerdict::no_annotations(definition);
    };
    if generic.text_annotations.is_empty() {
        return FeatureVerdict::no_annotations(definition);
    }

    let phrases = call_to_actions(config);
    for text_annotation in &generic.text_annotations {
        let text = text_annotation.text.to_lowercase();
        if let Some(phrase) = phrases.iter().find(|p| text.contains(&p.to_lowercase())) {
            return FeatureVerdict::new(
                definition,
                true,
                Some(format!("'{}' in on-screen text", phrase)),
            );
        }
    }
    FeatureVerdict::new(definition, false, None)
}

pub fn detect_call_to_action_speech(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    let Some(speech) = set.speech() else {
        return FeatureVerdict::no_annotations(definition);
    };
    if speech.speech_transcriptions.is_empty() {
        return FeatureVerdict::no_annotations(definition);
    }

    let phrases = call_to_actions(config);
    let (detected, _) = find_elements_in_transcript(config, speech, &phrases, &[], false);
    FeatureVerdict::new(definition, detected, None)
}

pub fn detect_audio_speech_early(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    let Some(speech) = set.speech() else {
        return FeatureVerdict::no_annotations(definition);
    };
    if speech.speech_transcriptions.is_empty() {
        return FeatureVerdict::no_annotations(definition);
    }

    let mut detected = false;
    for transcription in &speech.speech_transcriptions {
        for alternative in &transcription.alternatives {
            if alternative.confidence < config.thresholds.confidence_threshold {
                continue;
            }
            if alternative
                .words
                .iter()
                .any(|word| word.start_seconds() <= config.thresholds.early_time_seconds)
            {
                detected = true;
            }
        }
    }
    FeatureVerdict::new(definition, detected, None)
}

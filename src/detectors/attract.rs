//! Attract detectors: dynamic start, quick pacing and supers.
//!
//! Annotations used: shot annotations for pacing, text annotations for
//! supers, the speech transcript for supers with audio.

use tracing::debug;

use crate::annotations::AnnotationSet;
use crate::config::Config;
use crate::detectors::helpers::find_elements_in_transcript;
use crate::detectors::{FeatureDefinition, FeatureVerdict};

/// Pass iff the first shot ends strictly before the configured cutoff.
///
/// The end offset is a float count of seconds (possibly "s"-suffixed);
/// it is scaled to nanoseconds and down to milliseconds before the
/// comparison, preserving the service's literal unit arithmetic.
pub fn detect_dynamic_start(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    let Some(generic) = set.generic() else {
        return FeatureVerdict::no_annotations(definition);
    };
    let Some(first_shot) = generic.shot_annotations.first() else {
        return FeatureVerdict::no_annotations(definition);
    };

    let first_shot_ms = (first_shot.end_seconds() * 1e9) / 1e6;
    let detected = first_shot_ms < config.thresholds.dynamic_cutoff_ms;
    debug!("{}: {}", definition.name, detected);

    FeatureVerdict::new(
        definition,
        detected,
        Some(format!(
            "first shot ends at {:.0}ms (cutoff {:.0}ms)",
            first_shot_ms, config.thresholds.dynamic_cutoff_ms
        )),
    )
}

pub fn detect_quick_pacing(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match pacing(config, set) {
        Some((quick_pacing, _)) => FeatureVerdict::new(definition, quick_pacing, None),
        None => FeatureVerdict::no_annotations(definition),
    }
}

pub fn detect_quick_pacing_first_5_secs(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    match pacing(config, set) {
        Some((_, quick_pacing_early)) => FeatureVerdict::new(definition, quick_pacing_early, None),
        None => FeatureVerdict::no_annotations(definition),
    }
}

const REQUIRED_SECS_FOR_QUICK_PACING: f64 = 5.0;
const REQUIRED_SHOTS_FOR_QUICK_PACING: usize = 5;

/// Count shots inside rolling 5-second windows; a window that accumulates
/// at least 5 shots before it is spent passes. Returns (whole video, early
/// window) or None when there are no shot annotations.
fn pacing(config: &Config, set: &AnnotationSet) -> Option<(bool, bool)> {
    let generic = set.generic()?;
    if generic.shot_annotations.is_empty() {
        return None;
    }

    let mut quick_pacing = false;
    let mut quick_pacing_early = false;
    let mut window_time = 0.0;
    let mut window_shots = 0usize;
    let mut early_shots = 0usize;

    // Shots are sorted by start offset on load
    for shot in &generic.shot_annotations {
        let shot_time = shot.end_seconds() - shot.start_seconds();
        window_time += shot_time;
        if window_time < REQUIRED_SECS_FOR_QUICK_PACING {
            window_shots += 1;
            if shot.start_seconds() < config.thresholds.early_time_seconds {
                early_shots += 1;
            }
        } else {
            if window_shots >= REQUIRED_SHOTS_FOR_QUICK_PACING {
                quick_pacing = true;
            }
            if early_shots >= REQUIRED_SHOTS_FOR_QUICK_PACING {
                quick_pacing_early = true;
            }
            window_time = 0.0;
            window_shots = 0;
        }
    }

    Some((quick_pacing, quick_pacing_early))
}

/// Pass iff any on-screen text was detected at all.
pub fn detect_supers(
    _config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    let Some(generic) = set.generic() else {
        return FeatureVerdict::no_annotations(definition);
    };
    if generic.text_annotations.is_empty() {
        return FeatureVerdict::no_annotations(definition);
    }
    FeatureVerdict::new(
        definition,
        true,
        Some(format!(
            "{} text annotations detected",
            generic.text_annotations.len()
        )),
    )
}

/// Pass iff some detected on-screen text also occurs in the confident
/// speech transcript. Short text entries (≤ 3 chars) are ignored.
pub fn detect_supers_with_audio(
    config: &Config,
    set: &AnnotationSet,
    definition: &FeatureDefinition,
) -> FeatureVerdict {
    let (Some(generic), Some(speech)) = (set.generic(), set.speech()) else {
        return FeatureVerdict::no_annotations(definition);
    };
    if generic.text_annotations.is_empty() || speech.speech_transcriptions.is_empty() {
        return FeatureVerdict::no_annotations(definition);
    }

    let detected_text: Vec<String> = generic
        .text_annotations
        .iter()
        .map(|t| t.text.clone())
        .collect();

    let (supers_with_audio, _) =
        find_elements_in_transcript(config, speech, &detected_text, &[], true);
    debug!("{}: {}", definition.name, supers_with_audio);

    FeatureVerdict::new(definition, supers_with_audio, None)
}

//! Shared helpers for transcript search, early-window text detection and
//! bounding-box geometry.

use crate::annotations::{
    NormalizedBoundingBox, SpeechAnnotations, TextAnnotation, TextFrame, Vertex,
};
use crate::config::Config;

/// Search the speech transcript for any of `elements` or
/// `element_categories`, both over the whole video and restricted to the
/// first-seconds window (reconstructed from word timings, since only the
/// word records carry offsets).
///
/// `apply_length_condition` filters out elements shorter than 4 characters;
/// needed when elements come from text annotations, where entries are
/// sometimes a single character.
pub fn find_elements_in_transcript(
    config: &Config,
    speech: &SpeechAnnotations,
    elements: &[String],
    element_categories: &[String],
    apply_length_condition: bool,
) -> (bool, bool) {
    let mut found = false;
    let mut early_words: Vec<&str> = Vec::new();

    for transcription in &speech.speech_transcriptions {
        for alternative in &transcription.alternatives {
            if alternative.confidence < config.thresholds.confidence_threshold {
                continue;
            }
            if transcript_contains(
                elements,
                element_categories,
                &alternative.transcript,
                apply_length_condition,
            ) {
                found = true;
            }
            // Words are sorted by start offset on load
            for word in &alternative.words {
                if word.start_seconds() <= config.thresholds.early_time_seconds {
                    early_words.push(&word.word);
                }
            }
        }
    }

    let early_transcript = early_words.join(" ");
    let found_early = transcript_contains(
        elements,
        element_categories,
        &early_transcript,
        apply_length_condition,
    );

    (found, found_early)
}

fn transcript_contains(
    elements: &[String],
    element_categories: &[String],
    transcript: &str,
    apply_length_condition: bool,
) -> bool {
    let transcript = transcript.to_lowercase();
    let element_found = elements.iter().any(|element| {
        (!apply_length_condition || element.len() > 3)
            && transcript.contains(&element.to_lowercase())
    });
    element_found
        || element_categories
            .iter()
            .any(|category| transcript.contains(&category.to_lowercase()))
}

/// Whether the text annotation appears within the early time window, and
/// the first frame it was found in (for surface-area checks).
pub fn detected_text_in_first_seconds<'a>(
    config: &Config,
    annotation: &'a TextAnnotation,
) -> (bool, Option<&'a TextFrame>) {
    for segment in &annotation.segments {
        let start = segment
            .segment
            .as_ref()
            .map(|s| s.start_seconds())
            .unwrap_or(0.0);
        if start > config.thresholds.early_time_seconds {
            continue;
        }
        for frame in &segment.frames {
            if frame.time_seconds() <= config.thresholds.early_time_seconds {
                return (true, Some(frame));
            }
        }
    }
    (false, None)
}

/// Surface area of a quadrilateral given its four vertices, scaled by 100
/// to a percentage of the frame.
pub fn quad_surface_area(vertices: &[Vertex]) -> f64 {
    if vertices.len() != 4 {
        return 0.0;
    }
    let tri = |a: &Vertex, b: &Vertex| 0.5 * (a.x * b.y - b.x * a.y).abs();
    let area = tri(&vertices[0], &vertices[1])
        + tri(&vertices[1], &vertices[2])
        + tri(&vertices[2], &vertices[3])
        + tri(&vertices[3], &vertices[0]);
    area * 100.0
}

/// Fraction of the frame covered by a face bounding box. Missing edges
/// default to the full frame.
pub fn face_box_surface(bounding_box: &NormalizedBoundingBox) -> f64 {
    let left = bounding_box.left.unwrap_or(0.0);
    let right = bounding_box.right.unwrap_or(1.0);
    let top = bounding_box.top.unwrap_or(0.0);
    let bottom = bounding_box.bottom.unwrap_or(1.0);
    (right - left) * (bottom - top)
}

/// Logo bounding-box surface as a percentage of the frame. Missing edges
/// default to zero.
pub fn logo_box_surface(bounding_box: &NormalizedBoundingBox) -> f64 {
    let height = bounding_box.bottom.unwrap_or(0.0) - bounding_box.top.unwrap_or(0.0);
    let width = bounding_box.right.unwrap_or(0.0) - bounding_box.left.unwrap_or(0.0);
    height * width * 100.0
}

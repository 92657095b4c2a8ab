//! Feature detector catalog: independent, side-effect-free functions that
//! map one video's annotations plus configuration to a boolean verdict per
//! rubric feature.

pub mod attract;
pub mod brand;
pub mod connect;
pub mod direct;
pub mod helpers;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::annotations::{AnnotationKind, AnnotationSet};
use crate::config::Config;

/// ABCD rubric categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureCategory {
    Attract,
    Brand,
    Connect,
    Direct,
}

impl std::fmt::Display for FeatureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FeatureCategory::Attract => "Attract",
            FeatureCategory::Brand => "Brand",
            FeatureCategory::Connect => "Connect",
            FeatureCategory::Direct => "Direct",
        };
        f.write_str(label)
    }
}

/// A detector: pure over its inputs, logging aside.
pub type DetectorFn = fn(&Config, &AnnotationSet, &FeatureDefinition) -> FeatureVerdict;

/// Static definition of one rubric feature. Immutable once the catalog is
/// built.
#[derive(Clone)]
pub struct FeatureDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub category: FeatureCategory,
    /// Human-readable pass condition
    pub criteria: &'static str,
    /// Annotation kinds this feature's detector reads
    pub required_kinds: &'static [AnnotationKind],
    pub detector: DetectorFn,
}

impl std::fmt::Debug for FeatureDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("required_kinds", &self.required_kinds)
            .finish()
    }
}

/// Detector output for one feature on one video. Never mutated after
/// creation except by the cross-source merge, which attaches the secondary
/// source's boolean without replacing the primary verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVerdict {
    pub id: String,
    pub name: String,
    pub category: FeatureCategory,
    pub detected: bool,
    /// Free-form supporting detail
    pub evidence: Option<String>,
    /// Second evaluation source's boolean, attached by the merge step
    pub secondary_detected: Option<bool>,
    /// True once more than one source has evaluated this feature
    pub multi_source: bool,
}

impl FeatureVerdict {
    pub fn new(definition: &FeatureDefinition, detected: bool, evidence: Option<String>) -> Self {
        Self {
            id: definition.id.to_string(),
            name: definition.name.to_string(),
            category: definition.category,
            detected,
            evidence,
            secondary_detected: None,
            multi_source: false,
        }
    }

    /// Graceful degradation when a required kind has no records.
    pub fn no_annotations(definition: &FeatureDefinition) -> Self {
        Self::new(definition, false, Some("no annotations found".to_string()))
    }
}

const GENERIC: &[AnnotationKind] = &[AnnotationKind::Generic];
const FACE: &[AnnotationKind] = &[AnnotationKind::Face];
const PEOPLE: &[AnnotationKind] = &[AnnotationKind::People];
const SPEECH: &[AnnotationKind] = &[AnnotationKind::Speech];
const GENERIC_AND_SPEECH: &[AnnotationKind] = &[AnnotationKind::Generic, AnnotationKind::Speech];

/// Ordered registry of feature definitions; ids are unique.
#[derive(Debug, Clone)]
pub struct FeatureCatalog {
    features: Vec<FeatureDefinition>,
}

impl FeatureCatalog {
    fn new(features: Vec<FeatureDefinition>) -> Self {
        let mut seen = HashSet::new();
        for feature in &features {
            assert!(seen.insert(feature.id), "duplicate feature id: {}", feature.id);
        }
        Self { features }
    }

    pub fn features(&self) -> &[FeatureDefinition] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// The full ABCD feature set evaluated with annotations.
    pub fn standard() -> Self {
        Self::new(vec![
            FeatureDefinition {
                id: "a_dynamic_start",
                name: "Dynamic Start",
                category: FeatureCategory::Attract,
                criteria: "The first shot ends before the configured cutoff",
                required_kinds: GENERIC,
                detector: attract::detect_dynamic_start,
            },
            FeatureDefinition {
                id: "a_quick_pacing",
                name: "Quick Pacing",
                category: FeatureCategory::Attract,
                criteria: "At least 5 shots within any 5 contiguous seconds",
                required_kinds: GENERIC,
                detector: attract::detect_quick_pacing,
            },
            FeatureDefinition {
                id: "a_quick_pacing_1st_5_secs",
                name: "Quick Pacing (First 5 seconds)",
                category: FeatureCategory::Attract,
                criteria: "At least 5 shots start within the early time window",
                required_kinds: GENERIC,
                detector: attract::detect_quick_pacing_first_5_secs,
            },
            FeatureDefinition {
                id: "a_supers",
                name: "Supers",
                category: FeatureCategory::Attract,
                criteria: "Any overlaid text is detected in the video",
                required_kinds: GENERIC,
                detector: attract::detect_supers,
            },
            FeatureDefinition {
                id: "a_supers_with_audio",
                name: "Supers with Audio",
                category: FeatureCategory::Attract,
                criteria: "Detected on-screen text also appears in the speech transcript",
                required_kinds: GENERIC_AND_SPEECH,
                detector: attract::detect_supers_with_audio,
            },
            FeatureDefinition {
                id: "b_brand_visuals",
                name: "Brand Visuals",
                category: FeatureCategory::Brand,
                criteria: "Brand name appears in on-screen text or a brand logo is recognized",
                required_kinds: GENERIC,
                detector: brand::detect_brand_visuals,
            },
            FeatureDefinition {
                id: "b_brand_visuals_1st_5_secs",
                name: "Brand Visuals (First 5 seconds)",
                category: FeatureCategory::Brand,
                criteria: "Brand name or logo appears within the early time window",
                required_kinds: GENERIC,
                detector: brand::detect_brand_visuals_first_5_secs,
            },
            FeatureDefinition {
                id: "b_brand_mention_speech",
                name: "Brand Mention (Speech)",
                category: FeatureCategory::Brand,
                criteria: "A brand variation is spoken in the transcript",
                required_kinds: SPEECH,
                detector: brand::detect_brand_mention_speech,
            },
            FeatureDefinition {
                id: "b_brand_mention_speech_1st_5_secs",
                name: "Brand Mention (Speech) (First 5 seconds)",
                category: FeatureCategory::Brand,
                criteria: "A brand variation is spoken within the early time window",
                required_kinds: SPEECH,
                detector: brand::detect_brand_mention_speech_first_5_secs,
            },
            FeatureDefinition {
                id: "b_product_mention_text",
                name: "Product Mention (Text)",
                category: FeatureCategory::Brand,
                criteria: "A branded product or category appears in on-screen text",
                required_kinds: GENERIC,
                detector: brand::detect_product_mention_text,
            },
            FeatureDefinition {
                id: "b_product_mention_text_1st_5_secs",
                name: "Product Mention (Text) (First 5 seconds)",
                category: FeatureCategory::Brand,
                criteria: "A branded product or category appears in text within the early window",
                required_kinds: GENERIC,
                detector: brand::detect_product_mention_text_first_5_secs,
            },
            FeatureDefinition {
                id: "b_product_mention_speech",
                name: "Product Mention (Speech)",
                category: FeatureCategory::Brand,
                criteria: "A branded product or category is spoken in the transcript",
                required_kinds: SPEECH,
                detector: brand::detect_product_mention_speech,
            },
            FeatureDefinition {
                id: "b_product_mention_speech_1st_5_secs",
                name: "Product Mention (Speech) (First 5 seconds)",
                category: FeatureCategory::Brand,
                criteria: "A branded product or category is spoken within the early window",
                required_kinds: SPEECH,
                detector: brand::detect_product_mention_speech_first_5_secs,
            },
            FeatureDefinition {
                id: "b_product_visuals",
                name: "Product Visuals",
                category: FeatureCategory::Brand,
                criteria: "A branded product or category is recognized as a label",
                required_kinds: GENERIC,
                detector: brand::detect_product_visuals,
            },
            FeatureDefinition {
                id: "b_product_visuals_1st_5_secs",
                name: "Product Visuals (First 5 seconds)",
                category: FeatureCategory::Brand,
                criteria: "A branded product label appears within the early time window",
                required_kinds: GENERIC,
                detector: brand::detect_product_visuals_first_5_secs,
            },
            FeatureDefinition {
                id: "c_visible_face_1st_5_secs",
                name: "Visible Face (First 5 seconds)",
                category: FeatureCategory::Connect,
                criteria: "A face track above the confidence threshold starts early",
                required_kinds: FACE,
                detector: connect::detect_visible_face_first_5_secs,
            },
            FeatureDefinition {
                id: "c_visible_face_close_up",
                name: "Visible Face (Close Up)",
                category: FeatureCategory::Connect,
                criteria: "A face bounding box covers at least the surface threshold",
                required_kinds: FACE,
                detector: connect::detect_visible_face_close_up,
            },
            FeatureDefinition {
                id: "c_presence_of_people",
                name: "Presence of People",
                category: FeatureCategory::Connect,
                criteria: "A person track above the confidence threshold exists",
                required_kinds: PEOPLE,
                detector: connect::detect_presence_of_people,
            },
            FeatureDefinition {
                id: "c_presence_of_people_1st_5_secs",
                name: "Presence of People (First 5 seconds)",
                category: FeatureCategory::Connect,
                criteria: "A person track above the confidence threshold starts early",
                required_kinds: PEOPLE,
                detector: connect::detect_presence_of_people_first_5_secs,
            },
            FeatureDefinition {
                id: "c_overall_pacing",
                name: "Overall Pacing",
                category: FeatureCategory::Connect,
                criteria: "Average shot duration is at most the configured threshold",
                required_kinds: GENERIC,
                detector: connect::detect_overall_pacing,
            },
            FeatureDefinition {
                id: "d_call_to_action_text",
                name: "Call To Action (Text)",
                category: FeatureCategory::Direct,
                criteria: "A stock or branded call-to-action appears in on-screen text",
                required_kinds: GENERIC,
                detector: direct::detect_call_to_action_text,
            },
            FeatureDefinition {
                id: "d_call_to_action_speech",
                name: "Call To Action (Speech)",
                category: FeatureCategory::Direct,
                criteria: "A stock or branded call-to-action is spoken in the transcript",
                required_kinds: SPEECH,
                detector: direct::detect_call_to_action_speech,
            },
            FeatureDefinition {
                id: "d_audio_speech_early_1st_5_secs",
                name: "Audio Early (First 5 seconds)",
                category: FeatureCategory::Direct,
                criteria: "Confident speech occurs within the early time window",
                required_kinds: SPEECH,
                detector: direct::detect_audio_speech_early,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_ids_are_unique() {
        let catalog = FeatureCatalog::standard();
        let mut ids = HashSet::new();
        for feature in catalog.features() {
            assert!(ids.insert(feature.id));
        }
        assert_eq!(ids.len(), catalog.len());
    }

    #[test]
    fn test_catalog_covers_all_categories() {
        let catalog = FeatureCatalog::standard();
        for category in [
            FeatureCategory::Attract,
            FeatureCategory::Brand,
            FeatureCategory::Connect,
            FeatureCategory::Direct,
        ] {
            assert!(
                catalog.features().iter().any(|f| f.category == category),
                "no features in category {}",
                category
            );
        }
    }

    #[test]
    fn test_every_feature_declares_required_kinds() {
        for feature in FeatureCatalog::standard().features() {
            assert!(
                !feature.required_kinds.is_empty(),
                "feature {} declares no annotation kinds",
                feature.id
            );
        }
    }
}

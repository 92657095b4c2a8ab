/// ABCD Analyzer
///
/// Assesses marketing videos against the ABCD rubric (Attract, Brand,
/// Connect, Direct) using machine annotations fetched from a video
/// intelligence service, with an optional LLM second opinion.

pub mod annotations;
pub mod config;
pub mod detectors;
pub mod error;
pub mod evaluation;
pub mod knowledge_graph;
pub mod llm;
pub mod report;
pub mod video;

// Re-export main types for easy access
pub use crate::annotations::dispatcher::{AnnotationDispatcher, DispatchReport};
pub use crate::annotations::service::{AnnotationService, VideoIntelligenceClient};
pub use crate::annotations::{AnnotationKind, AnnotationSet};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::detectors::{FeatureCatalog, FeatureVerdict};
pub use crate::error::{PipelineError, Result};
pub use crate::evaluation::{evaluate, EvaluationResult, VerdictBucket};
pub use crate::knowledge_graph::{BrandKnowledge, KnowledgeGraphClient};
pub use crate::video::VideoAsset;

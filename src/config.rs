use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the ABCD analyzer.
///
/// Constructed once per run, before any concurrent work starts, and never
/// mutated afterwards. Components receive it by shared reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Brand identity used by brand/product detectors
    pub brand: BrandConfig,

    /// Numeric thresholds consumed by the feature detectors
    pub thresholds: ThresholdConfig,

    /// Annotation service and Knowledge Graph settings
    pub service: ServiceConfig,

    /// Optional LLM-based secondary evaluation source
    pub llm: LlmConfig,

    /// Output and storage settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    /// Name of the brand featured in the videos
    pub brand_name: String,

    /// Variations on the brand name (e.g. misspellings, abbreviations)
    pub brand_variations: Vec<String>,

    /// Products expected to appear in the videos
    pub branded_products: Vec<String>,

    /// Product categories expected to appear in the videos
    pub branded_products_categories: Vec<String>,

    /// Brand-specific call-to-action phrases
    pub branded_call_to_actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// How soon in the video something must appear to count as "early"
    pub early_time_seconds: f64,

    /// Level of certainty for a positive match
    pub confidence_threshold: f64,

    /// Minimum fraction of the frame a face must cover for close-ups
    pub face_surface_threshold: f64,

    /// Minimum logo surface area (percentage of frame)
    pub logo_size_threshold: f64,

    /// Average shot duration below which pacing counts as quick
    pub avg_shot_duration_seconds: f64,

    /// First-shot cutoff for the dynamic start feature, in milliseconds
    pub dynamic_cutoff_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Annotation service endpoint
    pub endpoint: String,

    /// Bounded wait for each long-running annotation request (seconds)
    pub request_timeout_seconds: u64,

    /// Poll interval while waiting for a long-running operation (seconds)
    pub poll_interval_seconds: u64,

    /// Knowledge Graph API key; brand/product entity lookups are skipped
    /// when absent
    pub knowledge_graph_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Enable the model-based secondary evaluation source
    pub enabled: bool,

    /// API endpoint
    pub endpoint: String,

    /// API key
    pub api_key: Option<String>,

    /// Model to use
    pub model: String,

    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_output_tokens: u32,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Local root under which per-video annotation artifacts are stored
    pub annotations_dir: PathBuf,

    /// Supported video file extensions for discovery
    pub video_extensions: Vec<String>,
}

impl Config {
    /// Load configuration from file, falling back to environment overrides.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "abcd-analyzer.toml",
            "config/abcd-analyzer.toml",
            "~/.config/abcd-analyzer/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config.with_env_overrides());
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Ok(Self::default().with_env_overrides())
    }

    /// Apply environment variable overrides on top of the current values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("ABCD_KNOWLEDGE_GRAPH_API_KEY") {
            self.service.knowledge_graph_api_key = Some(key.trim().to_string());
        }
        if let Ok(key) = std::env::var("ABCD_LLM_API_KEY") {
            self.llm.api_key = Some(key.trim().to_string());
        }
        if let Ok(dir) = std::env::var("ABCD_ANNOTATIONS_DIR") {
            self.output.annotations_dir = PathBuf::from(dir);
        }
        if let Ok(brand) = std::env::var("ABCD_BRAND_NAME") {
            self.brand.brand_name = brand;
        }
        self
    }

    /// Validate configuration before any processing starts.
    pub fn validate(&self) -> Result<()> {
        if self.brand.brand_name.is_empty() {
            return Err(anyhow!("brand_name must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.thresholds.confidence_threshold) {
            return Err(anyhow!("confidence_threshold must be within [0, 1]"));
        }
        if self.service.request_timeout_seconds == 0 {
            return Err(anyhow!("request_timeout_seconds must be greater than 0"));
        }
        if self.llm.enabled && self.llm.api_key.is_none() {
            return Err(anyhow!("LLM evaluation enabled but no API key configured"));
        }
        Ok(())
    }

    /// Directory holding one video's annotation artifacts.
    pub fn annotation_dir_for(&self, video_name: &str) -> PathBuf {
        self.output.annotations_dir.join(video_name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            brand: BrandConfig {
                brand_name: String::new(),
                brand_variations: Vec::new(),
                branded_products: Vec::new(),
                branded_products_categories: Vec::new(),
                branded_call_to_actions: Vec::new(),
            },
            thresholds: ThresholdConfig {
                early_time_seconds: 5.0,
                confidence_threshold: 0.5,
                face_surface_threshold: 0.15,
                logo_size_threshold: 3.5,
                avg_shot_duration_seconds: 2.0,
                dynamic_cutoff_ms: 3000.0,
            },
            service: ServiceConfig {
                endpoint: "https://videointelligence.googleapis.com/v1".to_string(),
                request_timeout_seconds: 800,
                poll_interval_seconds: 10,
                knowledge_graph_api_key: None,
            },
            llm: LlmConfig {
                enabled: false,
                endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                api_key: None,
                model: "gemini-1.5-flash".to_string(),
                temperature: 0.0,
                max_output_tokens: 8192,
                timeout_seconds: 120,
            },
            output: OutputConfig {
                annotations_dir: PathBuf::from("./annotations"),
                video_extensions: vec![
                    "mp4".to_string(),
                    "mov".to_string(),
                    "webm".to_string(),
                    "mkv".to_string(),
                    "avi".to_string(),
                ],
            },
        }
    }
}

/// Builder for programmatic config creation. The resulting [`Config`] is
/// immutable for the rest of the run.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_brand(mut self, name: &str, variations: &str) -> Self {
        self.config.brand.brand_name = name.to_string();
        self.config.brand.brand_variations = split_list(variations);
        self
    }

    pub fn with_products(mut self, products: &str, categories: &str) -> Self {
        self.config.brand.branded_products = split_list(products);
        self.config.brand.branded_products_categories = split_list(categories);
        self
    }

    pub fn with_call_to_actions(mut self, call_to_actions: &str) -> Self {
        self.config.brand.branded_call_to_actions = split_list(call_to_actions);
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.config.thresholds.confidence_threshold = threshold;
        self
    }

    pub fn with_dynamic_cutoff_ms(mut self, cutoff: f64) -> Self {
        self.config.thresholds.dynamic_cutoff_ms = cutoff;
        self
    }

    pub fn with_annotations_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.annotations_dir = dir;
        self
    }

    pub fn with_knowledge_graph_api_key(mut self, key: String) -> Self {
        self.config.service.knowledge_graph_api_key = Some(key);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Comma-delimited list to trimmed entries, empty items dropped.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

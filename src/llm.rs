//! Optional LLM-based secondary evaluation source.
//!
//! Disabled by default; when enabled the model's verdicts are merged next
//! to the annotation-based ones, never replacing them.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::detectors::{FeatureCatalog, FeatureVerdict};
use crate::error::{PipelineError, Result};
use crate::video::VideoAsset;

/// Generation provider seam; swap implementations for testing.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Gemini-style generateContent provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiProvider {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .llm
            .api_key
            .clone()
            .ok_or_else(|| PipelineError::ExternalService("LLM API key not configured".into()))?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.llm.timeout_seconds))
            .build()
            .map_err(|e| PipelineError::ExternalService(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.llm.endpoint.clone(),
            model: config.llm.model.clone(),
            api_key,
            temperature: config.llm.temperature,
            max_output_tokens: config.llm.max_output_tokens,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            }
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::ExternalService(format!("LLM request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(PipelineError::ExternalService(format!(
                "LLM request returned {}",
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::ExternalService(format!("LLM response: {}", e)))?;
        payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                PipelineError::ExternalService("LLM response missing text part".into())
            })
    }
}

/// Ask the model for a boolean per catalog feature and parse its answer.
pub async fn evaluate_features_with_llm(
    provider: &dyn LlmProvider,
    video: &VideoAsset,
    catalog: &FeatureCatalog,
) -> Result<Vec<FeatureVerdict>> {
    let prompt = build_prompt(video, catalog);
    debug!("🤖 Requesting LLM evaluation for {}", video.filename);
    let output = provider.generate(&prompt).await?;
    Ok(parse_verdicts(&output, catalog))
}

fn build_prompt(video: &VideoAsset, catalog: &FeatureCatalog) -> String {
    let mut prompt = format!(
        "You are evaluating the marketing video '{}' against a feature rubric.\n\
         For each feature, answer whether the video meets the criteria.\n\
         Respond with a JSON array of objects: {{\"id\": string, \"detected\": boolean}}.\n\n\
         Features:\n",
        video.filename
    );
    for feature in catalog.features() {
        prompt.push_str(&format!("- {}: {}\n", feature.id, feature.criteria));
    }
    prompt
}

/// Parse the model output into verdicts for known feature ids. Malformed
/// entries and unknown ids are skipped with a warning.
fn parse_verdicts(output: &str, catalog: &FeatureCatalog) -> Vec<FeatureVerdict> {
    let stripped = strip_code_fence(output);
    let parsed: Vec<Value> = match serde_json::from_str(stripped) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            warn!("LLM output was valid JSON but not an array");
            return Vec::new();
        }
        Err(e) => {
            warn!("LLM output was not valid JSON: {}", e);
            return Vec::new();
        }
    };

    let mut verdicts = Vec::new();
    for item in parsed {
        let Some(id) = item["id"].as_str() else {
            warn!("LLM verdict entry missing id: {}", item);
            continue;
        };
        let Some(detected) = item["detected"].as_bool() else {
            warn!("LLM verdict '{}' missing boolean detected field", id);
            continue;
        };
        match catalog.features().iter().find(|f| f.id == id) {
            Some(feature) => verdicts.push(FeatureVerdict::new(feature, detected, None)),
            None => warn!("LLM returned unknown feature id '{}'", id),
        }
    }
    verdicts
}

/// Models habitually wrap JSON in markdown fences.
fn strip_code_fence(output: &str) -> &str {
    let trimmed = output.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verdicts_known_ids() {
        let catalog = FeatureCatalog::standard();
        let output = r#"[
            {"id": "a_dynamic_start", "detected": true},
            {"id": "b_brand_visuals", "detected": false}
        ]"#;
        let verdicts = parse_verdicts(output, &catalog);
        assert_eq!(verdicts.len(), 2);
        assert!(verdicts[0].detected);
        assert!(!verdicts[1].detected);
    }

    #[test]
    fn test_parse_verdicts_skips_unknown_and_malformed() {
        let catalog = FeatureCatalog::standard();
        let output = r#"[
            {"id": "no_such_feature", "detected": true},
            {"detected": true},
            {"id": "a_supers"},
            {"id": "a_supers", "detected": true}
        ]"#;
        let verdicts = parse_verdicts(output, &catalog);
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].id, "a_supers");
    }

    #[test]
    fn test_parse_verdicts_rejects_non_json() {
        let catalog = FeatureCatalog::standard();
        assert!(parse_verdicts("I think the video is great", &catalog).is_empty());
        assert!(parse_verdicts("{\"id\": \"a_supers\"}", &catalog).is_empty());
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n[]\n```"), "[]");
        assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fence("[]"), "[]");
    }

    #[test]
    fn test_prompt_lists_every_feature() {
        let catalog = FeatureCatalog::standard();
        let video = VideoAsset {
            blob: Vec::new(),
            filename: "spot.mp4".to_string(),
            video_url: String::new(),
            id: "spot".to_string(),
        };
        let prompt = build_prompt(&video, &catalog);
        for feature in catalog.features() {
            assert!(prompt.contains(feature.id));
        }
    }
}

//! Knowledge Graph entity lookup used by the brand/product detectors.
//!
//! Lookups run once per video, before detector execution, so detectors stay
//! pure and synchronous. Failures here indicate a configuration problem
//! (typically a bad API key) and are fatal for the run.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{PipelineError, Result};

const KG_SEARCH_URL: &str = "https://kgsearch.googleapis.com/v1/entities:search";

/// One resolved Knowledge Graph entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KgEntity {
    pub entity_id: String,
    pub name: String,
    pub description: String,
}

/// Pre-resolved entities for the configured brand variations and branded
/// products. Empty when no API key is configured.
#[derive(Debug, Clone, Default)]
pub struct BrandKnowledge {
    /// Entity id -> entity, for brand name variations
    pub brand_entities: HashMap<String, KgEntity>,
    /// Entity id -> entity, for branded products
    pub product_entities: HashMap<String, KgEntity>,
}

impl BrandKnowledge {
    pub fn brand_entity_list(&self) -> Vec<&KgEntity> {
        self.brand_entities.values().collect()
    }
}

#[derive(Debug, Deserialize)]
struct KgSearchResponse {
    #[serde(rename = "itemListElement", default)]
    item_list_element: Vec<KgListElement>,
}

#[derive(Debug, Deserialize)]
struct KgListElement {
    result: KgResult,
}

#[derive(Debug, Deserialize)]
struct KgResult {
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
}

/// Client for the Knowledge Graph search API.
pub struct KnowledgeGraphClient {
    client: reqwest::Client,
    api_key: String,
}

impl KnowledgeGraphClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PipelineError::ExternalService(e.to_string()))?;
        Ok(Self { client, api_key })
    }

    /// Resolve a list of queries to exact-name-matched entities.
    ///
    /// Only results whose name equals the query (case-insensitive) are kept;
    /// the `kg:` prefix is stripped from entity ids. Any HTTP failure is
    /// logged and re-raised as [`PipelineError::ExternalService`].
    pub async fn entities(&self, queries: &[String]) -> Result<HashMap<String, KgEntity>> {
        let mut entities = HashMap::new();
        for query in queries {
            let url = format!(
                "{}?query={}&limit=10&key={}",
                KG_SEARCH_URL,
                urlencoding::encode(query),
                urlencoding::encode(&self.api_key)
            );
            let response = self.search(&url).await.map_err(|e| {
                error!(
                    "Knowledge Graph lookup failed for '{}'. Check that your API key is correct: {}",
                    query, e
                );
                e
            })?;

            for element in response.item_list_element {
                if query.to_lowercase() == element.result.name.to_lowercase() {
                    // Ids arrive as "kg:/m/..."; keep the bare "/m/..." form
                    let entity_id = element.result.id.chars().skip(3).collect::<String>();
                    entities.insert(
                        entity_id.clone(),
                        KgEntity {
                            entity_id,
                            name: element.result.name,
                            description: element.result.description,
                        },
                    );
                }
            }
        }
        debug!("Resolved {} Knowledge Graph entities", entities.len());
        Ok(entities)
    }

    async fn search(&self, url: &str) -> Result<KgSearchResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::ExternalService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::ExternalService(format!(
                "Knowledge Graph API returned {}",
                response.status()
            )));
        }

        response
            .json::<KgSearchResponse>()
            .await
            .map_err(|e| PipelineError::ExternalService(e.to_string()))
    }

    /// Resolve brand variations and branded products in one pass.
    pub async fn brand_knowledge(
        &self,
        brand_variations: &[String],
        branded_products: &[String],
    ) -> Result<BrandKnowledge> {
        Ok(BrandKnowledge {
            brand_entities: self.entities(brand_variations).await?,
            product_entities: self.entities(branded_products).await?,
        })
    }
}

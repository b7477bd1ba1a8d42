//! Google Document AI extraction backend.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use facture_core::{defaults, DocumentEntity, DocumentExtractionBackend, Error, Result};

/// Document AI online-processing backend.
///
/// One blocking call per document against the processor's `:process`
/// endpoint. No retries, no batching; upstream failures surface as
/// [`Error::Extraction`].
pub struct GoogleDocAiBackend {
    client: reqwest::Client,
    base_url: String,
    resource: String,
    access_token: String,
    timeout_secs: u64,
}

impl GoogleDocAiBackend {
    pub fn new(
        base_url: String,
        project_id: String,
        location: String,
        processor_id: String,
        access_token: String,
    ) -> Self {
        let resource = format!(
            "projects/{}/locations/{}/processors/{}",
            project_id, location, processor_id
        );
        info!(processor = %resource, "Initializing Document AI backend");
        Self {
            client: reqwest::Client::new(),
            base_url,
            resource,
            access_token,
            timeout_secs: defaults::DOCAI_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables.
    ///
    /// `GCP_PROJECT_ID`, `DOCAI_PROCESSOR_ID`, and `DOCAI_ACCESS_TOKEN` are
    /// required; `DOCAI_LOCATION` defaults to `us` and `DOCAI_BASE_URL`
    /// defaults to the location's regional endpoint.
    pub fn from_env() -> Result<Self> {
        let project_id = require_env(defaults::ENV_GCP_PROJECT_ID)?;
        let processor_id = require_env(defaults::ENV_DOCAI_PROCESSOR_ID)?;
        let access_token = require_env(defaults::ENV_DOCAI_ACCESS_TOKEN)?;
        let location = std::env::var(defaults::ENV_DOCAI_LOCATION)
            .unwrap_or_else(|_| defaults::DOCAI_LOCATION.to_string());
        let base_url = std::env::var(defaults::ENV_DOCAI_BASE_URL)
            .unwrap_or_else(|_| format!("https://{}-documentai.googleapis.com", location));

        Ok(Self::new(
            base_url,
            project_id,
            location,
            processor_id,
            access_token,
        ))
    }
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Config(format!(
            "{} must be set for document extraction",
            name
        ))),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest {
    raw_document: RawDocument,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    content: String, // base64 encoded
    mime_type: String,
}

#[derive(Deserialize)]
struct ProcessResponse {
    #[serde(default)]
    document: WireDocument,
}

#[derive(Deserialize, Default)]
struct WireDocument {
    #[serde(default)]
    entities: Vec<WireEntity>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEntity {
    #[serde(rename = "type", default)]
    entity_type: String,
    #[serde(default)]
    mention_text: String,
    #[serde(default)]
    normalized_value: Option<WireNormalizedValue>,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    properties: Vec<WireEntity>,
}

#[derive(Deserialize)]
struct WireNormalizedValue {
    #[serde(default)]
    text: String,
}

impl From<WireEntity> for DocumentEntity {
    fn from(wire: WireEntity) -> Self {
        DocumentEntity {
            entity_type: wire.entity_type,
            mention_text: wire.mention_text,
            normalized_text: wire.normalized_value.map(|n| n.text).unwrap_or_default(),
            confidence: wire.confidence,
            properties: wire.properties.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl DocumentExtractionBackend for GoogleDocAiBackend {
    async fn extract_entities(
        &self,
        file_data: &[u8],
        mime_type: &str,
    ) -> Result<Vec<DocumentEntity>> {
        let request = ProcessRequest {
            raw_document: RawDocument {
                content: base64::engine::general_purpose::STANDARD.encode(file_data),
                mime_type: mime_type.to_string(),
            },
        };

        let url = format!("{}/v1/{}:process", self.base_url, self.resource);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Extraction(format!("Document AI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Extraction(format!(
                "Document AI returned {}: {}",
                status, body
            )));
        }

        let result: ProcessResponse = response.json().await.map_err(|e| {
            Error::Extraction(format!("Failed to parse Document AI response: {}", e))
        })?;

        let entities: Vec<DocumentEntity> = result
            .document
            .entities
            .into_iter()
            .map(Into::into)
            .collect();

        debug!(
            processor = %self.resource,
            entity_count = entities.len(),
            "Document processed"
        );

        Ok(entities)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/v1/{}", self.base_url, self.resource);
        match self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn processor_name(&self) -> &str {
        &self.resource
    }
}

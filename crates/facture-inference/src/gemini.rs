//! Gemini description refinement backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use facture_core::{defaults, DescriptionRefinementBackend, Error, Result};

/// Instruction prepended to every refinement request. Line-item mentions
/// arrive comma separated, but a comma can also introduce extra detail for
/// the same item, and text after a line break is usually peripheral
/// (quantities, SKUs, legal boilerplate) rather than another item name.
const REFINEMENT_INSTRUCTION: &str = "The text below contains item descriptions extracted from \
an invoice. Descriptions are comma separated, but a segment after a comma may be extra detail \
about the same item rather than a new one, so judge each segment on its own. Text following a \
line break is usually peripheral information; keep it only when it is plausibly an item name. \
For each description identify the most likely item name, a single word or a phrase. Answer with \
the names only, on one line, comma separated, with no explanation. Double-check that no item \
name has been left out.";

/// Gemini `generateContent` backend for cleaning noisy descriptions.
pub struct GeminiRefinementBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

impl GeminiRefinementBackend {
    pub fn new(base_url: String, model: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            model,
            api_key,
            timeout_secs: defaults::GEMINI_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables.
    ///
    /// `GEMINI_API_KEY` is required; `GEMINI_MODEL` and `GEMINI_BASE_URL`
    /// have defaults.
    pub fn from_env() -> Result<Self> {
        let api_key = match std::env::var(defaults::ENV_GEMINI_API_KEY) {
            Ok(key) if !key.is_empty() => key,
            _ => {
                return Err(Error::Config(format!(
                    "{} must be set for description refinement",
                    defaults::ENV_GEMINI_API_KEY
                )))
            }
        };
        let model = std::env::var(defaults::ENV_GEMINI_MODEL)
            .unwrap_or_else(|_| defaults::GEMINI_MODEL.to_string());
        let base_url = std::env::var(defaults::ENV_GEMINI_BASE_URL)
            .unwrap_or_else(|_| defaults::GEMINI_BASE_URL.to_string());

        Ok(Self::new(base_url, model, api_key))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

/// Safety filter override; all four harm categories are sent at BLOCK_NONE
/// so invoice text is never withheld.
#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[async_trait]
impl DescriptionRefinementBackend for GeminiRefinementBackend {
    async fn refine_description(&self, description: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: format!("{}\n\n{}", REFINEMENT_INSTRUCTION, description),
                }],
            }],
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Refinement(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Refinement(format!(
                "Gemini returned {}: {}",
                status, body
            )));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Refinement(format!("Failed to parse Gemini response: {}", e)))?;

        let text = result
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .ok_or_else(|| Error::Refinement("Gemini returned no candidates".to_string()))?;

        // Collapse the model's line breaks and padding into single spaces.
        let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");

        debug!(
            model = %self.model,
            response_len = cleaned.len(),
            "Description refined"
        );

        Ok(cleaned)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/v1beta/models/{}", self.base_url, self.model);
        match self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

//! Mock backends for deterministic testing.
//!
//! Stand-ins for the document understanding and refinement services so the
//! reconciler and the HTTP layer can be exercised without network access.
//!
//! ## Usage
//!
//! ```rust
//! use facture_inference::mock::MockRefinementBackend;
//! use facture_core::DescriptionRefinementBackend;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let backend = MockRefinementBackend::new()
//!     .with_response_mapping("2x Widget\nSKU 443", "Widget");
//!
//! let refined = backend.refine_description("2x Widget\nSKU 443").await.unwrap();
//! assert_eq!(refined, "Widget");
//! # }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use facture_core::{
    DescriptionRefinementBackend, DocumentEntity, DocumentExtractionBackend, Error, Result,
};

/// One logged backend invocation, for assertions.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    pub input: String,
}

/// Mock document extraction backend returning a configured entity list.
#[derive(Clone, Default)]
pub struct MockExtractionBackend {
    entities: Vec<DocumentEntity>,
    fail_with: Option<String>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl MockExtractionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entities every extraction call returns.
    pub fn with_entities(mut self, entities: Vec<DocumentEntity>) -> Self {
        self.entities = entities;
        self
    }

    /// Make every extraction call fail with the given message.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentExtractionBackend for MockExtractionBackend {
    async fn extract_entities(
        &self,
        file_data: &[u8],
        mime_type: &str,
    ) -> Result<Vec<DocumentEntity>> {
        self.call_log.lock().unwrap().push(MockCall {
            operation: "extract_entities".to_string(),
            input: format!("{} bytes, {}", file_data.len(), mime_type),
        });
        match &self.fail_with {
            Some(message) => Err(Error::Extraction(message.clone())),
            None => Ok(self.entities.clone()),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.fail_with.is_none())
    }

    fn processor_name(&self) -> &str {
        "mock-processor"
    }
}

/// Mock refinement backend with per-input response mappings.
///
/// Unmapped inputs fall back to whitespace normalization of the input
/// itself, which keeps reconciliation output deterministic and readable
/// in assertions.
#[derive(Clone, Default)]
pub struct MockRefinementBackend {
    responses: HashMap<String, String>,
    fail_with: Option<String>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl MockRefinementBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response mapping for a specific input.
    pub fn with_response_mapping(
        mut self,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        self.responses.insert(input.into(), output.into());
        self
    }

    /// Make every refinement call fail with the given message.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Number of refinement calls made.
    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }
}

#[async_trait]
impl DescriptionRefinementBackend for MockRefinementBackend {
    async fn refine_description(&self, description: &str) -> Result<String> {
        self.call_log.lock().unwrap().push(MockCall {
            operation: "refine_description".to_string(),
            input: description.to_string(),
        });
        match &self.fail_with {
            Some(message) => Err(Error::Refinement(message.clone())),
            None => Ok(self
                .responses
                .get(description)
                .cloned()
                .unwrap_or_else(|| {
                    description.split_whitespace().collect::<Vec<_>>().join(" ")
                })),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.fail_with.is_none())
    }

    fn model_name(&self) -> &str {
        "mock-refiner"
    }
}

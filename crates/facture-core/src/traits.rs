//! Core traits for the external AI collaborators.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability: the reconciler
//! and the HTTP layer only ever see these seams.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::DocumentEntity;

/// Backend that turns a document into typed, confidence-scored entities.
#[async_trait]
pub trait DocumentExtractionBackend: Send + Sync {
    /// Process a document and return its recognized entities.
    async fn extract_entities(
        &self,
        file_data: &[u8],
        mime_type: &str,
    ) -> Result<Vec<DocumentEntity>>;

    /// Check if the extraction backend is available.
    async fn health_check(&self) -> Result<bool>;

    /// The processor resource handling requests.
    fn processor_name(&self) -> &str;
}

/// Backend that cleans a noisy line-item description into item names.
///
/// Given text possibly containing several comma-separated item mentions
/// with embedded line breaks and peripheral noise, implementations return
/// a whitespace-normalized, comma-separated list of the most likely item
/// name(s).
#[async_trait]
pub trait DescriptionRefinementBackend: Send + Sync {
    /// Refine one raw description.
    async fn refine_description(&self, description: &str) -> Result<String>;

    /// Check if the refinement backend is available.
    async fn health_check(&self) -> Result<bool>;

    /// The model name being used.
    fn model_name(&self) -> &str;
}

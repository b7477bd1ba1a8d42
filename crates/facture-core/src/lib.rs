//! # facture-core
//!
//! Core types, traits, and abstractions for the facture invoice
//! extraction service.
//!
//! This crate provides the foundational data structures, the field
//! reconciler, and the backend trait definitions that the other facture
//! crates depend on.

pub mod amount;
pub mod defaults;
pub mod error;
pub mod export;
pub mod file_safety;
pub mod logging;
pub mod models;
pub mod reconcile;
pub mod traits;

// Re-export commonly used types at crate root
pub use amount::normalize_amount;
pub use error::{Error, Result};
pub use export::render_csv;
pub use file_safety::{detect_mime_type, validate_file, ValidationResult};
pub use models::{
    flatten_entities, AmountValue, DocumentEntity, ExtractedEntity, InvoiceField, InvoiceRecord,
};
pub use reconcile::reconcile_entities;
pub use traits::{DescriptionRefinementBackend, DocumentExtractionBackend};

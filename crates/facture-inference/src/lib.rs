//! # facture-inference
//!
//! External AI service backends for facture.
//!
//! This crate provides:
//! - Google Document AI backend for entity extraction
//! - Gemini backend for line-item description refinement
//! - Deterministic mock backends (feature `mock`) for testing
//!
//! The trait seams live in `facture-core`; handlers and the reconciler
//! only ever depend on those, so any backend here can be swapped for a
//! stand-in.
//!
//! # Example
//!
//! ```rust,no_run
//! use facture_inference::GeminiRefinementBackend;
//! use facture_core::DescriptionRefinementBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = GeminiRefinementBackend::from_env().unwrap();
//!     let names = backend.refine_description("2x Widget\nSKU 443").await.unwrap();
//!     println!("{names}");
//! }
//! ```

pub mod docai;
pub mod gemini;

// Mock backends for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use facture_core::*;

pub use docai::GoogleDocAiBackend;
pub use gemini::GeminiRefinementBackend;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockExtractionBackend, MockRefinementBackend};

//! Centralized default constants for the facture service.
//!
//! **This module is the single source of truth** for all shared default
//! values. The crates reference these constants instead of defining their
//! own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default rate limit: max requests per period.
pub const RATE_LIMIT_REQUESTS: u64 = 100;

/// Default rate limit: period in seconds.
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

/// Default CORS max-age in seconds (1 hour).
pub const CORS_MAX_AGE_SECS: u64 = 3600;

/// Default allowed CORS origins (the bundled frontend dev server plus a
/// local production build).
pub const ALLOWED_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

// =============================================================================
// FILE UPLOAD
// =============================================================================

/// Maximum upload size in bytes (20 MB).
/// Configurable via `MAX_UPLOAD_SIZE_BYTES` env var.
/// Enforced at two layers:
/// 1. `RequestBodyLimitLayer` on the router
/// 2. `validate_file()` size check in the process handler
pub const MAX_UPLOAD_SIZE_BYTES: usize = 20 * 1024 * 1024;

/// Maximum request body size in bytes. The upload cap plus headroom for
/// multipart framing.
pub const MAX_BODY_SIZE_BYTES: usize = MAX_UPLOAD_SIZE_BYTES + 1024 * 1024;

/// Maximum filename length (ext4/NTFS compatible).
pub const FILENAME_MAX_LENGTH: usize = 255;

/// MIME type assumed when detection finds nothing better. Scanned invoice
/// uploads are overwhelmingly JPEG photos.
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

// =============================================================================
// DOCUMENT UNDERSTANDING
// =============================================================================

/// Environment variable for the Google Cloud project id.
pub const ENV_GCP_PROJECT_ID: &str = "GCP_PROJECT_ID";

/// Environment variable for the Document AI processor id.
pub const ENV_DOCAI_PROCESSOR_ID: &str = "DOCAI_PROCESSOR_ID";

/// Environment variable for the Document AI location ("us" or "eu").
pub const ENV_DOCAI_LOCATION: &str = "DOCAI_LOCATION";

/// Default Document AI location.
pub const DOCAI_LOCATION: &str = "us";

/// Environment variable for the Document AI bearer token.
pub const ENV_DOCAI_ACCESS_TOKEN: &str = "DOCAI_ACCESS_TOKEN";

/// Environment variable overriding the Document AI endpoint (tests,
/// regional endpoints).
pub const ENV_DOCAI_BASE_URL: &str = "DOCAI_BASE_URL";

/// Timeout for document processing requests in seconds.
pub const DOCAI_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// TEXT REFINEMENT
// =============================================================================

/// Environment variable for the Gemini API key.
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// Environment variable for the Gemini model name.
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";

/// Default Gemini model for description refinement.
pub const GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Environment variable overriding the Gemini endpoint.
pub const ENV_GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";

/// Default Gemini endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Timeout for refinement requests in seconds.
pub const GEMINI_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// EXPORT
// =============================================================================

/// Filename advertised in the Content-Disposition header of the generated
/// tabular response.
pub const OUTPUT_FILENAME: &str = "output.csv";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_limit_covers_upload_limit() {
        const {
            assert!(MAX_BODY_SIZE_BYTES > MAX_UPLOAD_SIZE_BYTES);
        }
    }

    #[test]
    fn default_mime_is_an_image() {
        assert!(DEFAULT_MIME_TYPE.starts_with("image/"));
    }

    #[test]
    fn default_origins_parse_as_urls() {
        for origin in ALLOWED_ORIGINS.split(',') {
            assert!(origin.starts_with("http://") || origin.starts_with("https://"));
        }
    }
}

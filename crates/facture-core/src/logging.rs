//! Structured logging schema and field name constants for facture.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (entities, fields) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across request → backend calls.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "reconcile", "docai", "gemini"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "process_invoice", "extract_entities", "refine_description"
pub const OPERATION: &str = "op";

// ─── Upload fields ─────────────────────────────────────────────────────────

/// Original filename of the uploaded document.
pub const FILENAME: &str = "filename";

/// Detected MIME type of the uploaded document.
pub const MIME_TYPE: &str = "mime_type";

/// Byte size of the uploaded document.
pub const FILE_SIZE: &str = "file_size";

// ─── Reconciliation fields ─────────────────────────────────────────────────

/// Number of flat entities fed to the reconciler.
pub const ENTITY_COUNT: &str = "entity_count";

/// Number of output fields populated after reconciliation.
pub const FIELD_COUNT: &str = "field_count";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for refinement.
pub const MODEL: &str = "model";

/// Document AI processor resource used for extraction.
pub const PROCESSOR: &str = "processor";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

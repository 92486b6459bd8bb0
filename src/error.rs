use thiserror::Error;

/// Failure taxonomy for an export invocation.
///
/// Carried as the typed source inside `anyhow` chains so the entry point
/// and tests can tell the classes apart without string matching.
#[derive(Debug, Error)]
pub enum ExportError {
  /// Malformed month identifier; fatal before any state is touched.
  #[error("invalid month identifier: {0} (expected YYYY-MM)")]
  Validation(String),

  /// Upstream feed or detail call returned non-success; the status and
  /// body are carried verbatim. No internal retry; the scheduler
  /// re-invokes and resumes from the committed checkpoint.
  #[error("upstream request failed: HTTP {status}: {body}")]
  Upstream { status: u16, body: String },

  /// Identity or comment lookup failed for one record. Policy degrades to
  /// placeholders instead of surfacing this; kept for callers that opt
  /// into strict enrichment.
  #[error("enrichment failed for ticket {ticket_id}: {reason}")]
  Enrichment { ticket_id: i64, reason: String },

  /// Store write failed; the checkpoint must not advance past the page.
  #[error("persistence failed: {0}")]
  Persistence(String),

  /// Artifact creation, sharing, or notification failed; the checkpoint
  /// stays intact so finalization can be retried.
  #[error("finalization failed: {0}")]
  Finalization(String),
}

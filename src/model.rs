// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the data model (tickets, users, comments, enriched rows, audit entries) shared by the controller, store, and report
// role: model/types
// outputs: Serializable structs with stable field names; unknown upstream fields are ignored on deserialize
// invariants: EnrichedRow is append-only once staged; AuditEntry fields never change shape; timestamps are UNIX seconds
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::{Deserialize, Serialize};

/// A raw upstream ticket as returned by the incremental feed.
///
/// Owned by the helpdesk; read-only here. Upstream sends many more fields
/// than these; serde drops the rest.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Ticket {
  pub id: i64,
  pub created_at: i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub requester_id: Option<i64>,
  #[serde(default)]
  pub channel: String,
  #[serde(default)]
  pub subject: String,
  #[serde(default)]
  pub status: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
  pub id: i64,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Comment {
  pub id: i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub author_id: Option<i64>,
  #[serde(default)]
  pub public: bool,
  #[serde(default)]
  pub body: String,
}

/// One page of the time-ordered incremental feed.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TicketPage {
  pub records: Vec<Ticket>,
  pub end_time: i64,
  pub end_of_stream: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub next_page: Option<String>,
}

/// A denormalized output row: one in-window ticket plus requester identity
/// and the labeled public-comment digest.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EnrichedRow {
  pub ticket_id: i64,
  pub created_at: i64,
  pub requester_email: String,
  pub channel: String,
  pub subject: String,
  pub body_digest: String,
}

/// One append-only audit record per controller iteration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditEntry {
  pub timestamp: i64,
  pub window_id: String,
  pub cursor: i64,
  pub records_fetched: usize,
  pub records_saved: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_record_id: Option<i64>,
  pub status: String,
}

/// The JSON status body the entry point reports.
///
/// `processed`/`total` are per-invocation counters: rows appended to
/// staging and records fetched from the feed.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
  pub processed: usize,
  pub total: usize,
  pub completed: bool,
}

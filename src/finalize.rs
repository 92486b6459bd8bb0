// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Turn a drained window's staging rows into the shared report artifact, notify recipients, and release resume state
// role: processing/finalizer
// inputs: ExportWindow, final cursor, cumulative run counters, collaborator seams (store, sink, notifier)
// outputs: Published artifact, access grants, notification email, cleared staging + checkpoint, final audit entry
// side_effects: Report file written, grants recorded, email sent, store regions cleared
// invariants:
// - Any failure before the clears leaves the checkpoint intact; a re-run retries finalization only
// - The checkpoint is cleared before staging rows so a retry never republishes an empty report
// - Artifact name is deterministic per window; republish overwrites, grants are deduplicated
// - Notification is at-least-once across retries (stated, not accidental)
// errors: Publish/share/notify failures surface as Finalization errors
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::Result;

use crate::error::ExportError;
use crate::model::AuditEntry;
use crate::notify::Notifier;
use crate::report::{ReportArtifact, ReportSink};
use crate::store::ExportStore;
use crate::window::ExportWindow;

pub struct Finalizer<'a> {
  pub store: &'a dyn ExportStore,
  pub sink: &'a dyn ReportSink,
  pub notifier: Option<&'a dyn Notifier>,
  pub recipients: &'a [String],
}

impl Finalizer<'_> {
  #[allow(clippy::too_many_arguments)]
  pub fn finalize(
    &self,
    window: &ExportWindow,
    cursor: i64,
    records_fetched: usize,
    records_saved: usize,
    last_record_id: Option<i64>,
    now: i64,
  ) -> Result<ReportArtifact> {
    let mut rows = self.store.read_rows(&window.id)?;
    // Report readers expect chronological order; arrival order already is,
    // modulo replayed pages
    rows.sort_by_key(|r| (r.created_at, r.ticket_id));

    let artifact = self
      .sink
      .publish(&window.id, &rows)
      .map_err(|err| ExportError::Finalization(format!("publishing report: {err:#}")))?;

    self
      .sink
      .share(&artifact, self.recipients)
      .map_err(|err| ExportError::Finalization(format!("sharing report: {err:#}")))?;

    match self.notifier {
      Some(notifier) => notifier
        .notify(self.recipients, &window.id, &artifact)
        .map_err(|err| ExportError::Finalization(format!("notifying recipients: {err:#}")))?,
      None => log::warn!("notification disabled: no outbound-mail configuration"),
    }

    self.store.clear_checkpoint(&window.id)?;
    self.store.clear_rows(&window.id)?;

    self.store.append_audit(&AuditEntry {
      timestamp: now,
      window_id: window.id.clone(),
      cursor,
      records_fetched,
      records_saved,
      last_record_id,
      status: "Export Complete".to_string(),
    })?;

    log::info!("window {} finalized: {} row(s) in {}", window.id, rows.len(), artifact.location);
    Ok(artifact)
  }
}

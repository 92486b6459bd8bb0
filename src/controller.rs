// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Drive the incremental export of one window: seed or resume the checkpoint, page the feed, filter, enrich, persist, commit, finalize
// role: processing/controller
// inputs: ExportWindow, collaborator seams (feed, store, finalizer), work-unit budget, optional now override
// outputs: RunStatus {processed, total, completed}; staging rows, checkpoint commits, audit entries as side effects
// side_effects: Store writes after every consumed page; one audit entry per iteration
// invariants:
// - Checkpoint commits only after the page's rows are persisted (commit-after-write, never before)
// - Checkpoint never moves backwards; cursor >= window.start always
// - A record is admitted iff window.start <= created_at < window.end; out-of-window records are dropped silently
// - Zero-admission pages still advance the checkpoint
// - Completion means cursor >= window.end; feed exhaustion alone returns completed=false
// errors: Upstream and persistence failures abort the invocation; the committed checkpoint makes re-invocation safe
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::enrich::Enricher;
use crate::finalize::Finalizer;
use crate::model::{EnrichedRow, RunStatus};
use crate::store::ExportStore;
use crate::upstream::HelpdeskApi;
use crate::util::effective_now;
use crate::window::ExportWindow;

pub struct ExportController<'a> {
  pub window: ExportWindow,
  pub feed: &'a dyn HelpdeskApi,
  pub store: &'a dyn ExportStore,
  pub finalizer: Finalizer<'a>,
  /// Pages consumed per invocation before handing back to the scheduler;
  /// 0 means run until the window is drained.
  pub max_pages: usize,
  pub now_override: Option<DateTime<Utc>>,
}

impl ExportController<'_> {
  /// One bounded work unit: resume (or seed) the checkpoint, consume feed
  /// pages, and finalize when the window is drained. Safe to re-invoke:
  /// progress is committed per page, staging appends are idempotent.
  pub fn run(&self) -> Result<RunStatus> {
    let window_id = self.window.id.clone();

    // SEEDING
    let mut cursor = match self.store.read_checkpoint(&window_id)? {
      Some(committed) => committed,
      None => {
        // Fresh run: stale staging or audit rows from an abandoned
        // attempt at this window must not bleed into the new one
        self.store.clear_rows(&window_id)?;
        self.store.reset_audit(&window_id)?;
        self.store.write_checkpoint(&window_id, self.window.start)?;
        self.window.start
      }
    };

    let enricher = Enricher::new(self.feed);
    let mut fetched = 0usize;
    let mut saved = 0usize;
    let mut last_admitted: Option<i64> = None;
    let mut pages = 0usize;
    let mut end_of_feed = false;

    while cursor < self.window.end && !end_of_feed {
      if self.max_pages > 0 && pages >= self.max_pages {
        // Budget spent; the checkpoint is already committed, so the next
        // invocation continues exactly here
        log::info!("window {window_id}: page budget reached at cursor {cursor}, yielding");
        return Ok(RunStatus { processed: saved, total: fetched, completed: false });
      }

      // FETCHING
      let page = self.feed.fetch_page(cursor)?;
      pages += 1;
      fetched += page.records.len();

      // FILTERING + PERSISTING
      let rows: Vec<EnrichedRow> = page
        .records
        .iter()
        .filter(|t| self.window.contains(t.created_at))
        .map(|t| enricher.enrich(t))
        .collect();
      if let Some(last) = rows.last() {
        last_admitted = Some(last.ticket_id);
      }
      saved += self.store.append_rows(&window_id, &rows)?;

      // CHECKPOINTING: the paginator promises end_time >= cursor; never
      // move backwards even if it misbehaves
      let new_cursor = page.end_time.max(cursor);
      self.store.write_checkpoint(&window_id, new_cursor)?;
      self.append_progress_audit(new_cursor, fetched, saved, last_admitted)?;
      log::info!(
        "window {window_id}: cursor {cursor} -> {new_cursor}, {fetched} fetched, {saved} saved this run"
      );

      let stalled = new_cursor == cursor && page.records.is_empty();
      cursor = new_cursor;
      end_of_feed = page.end_of_stream;

      if stalled && !end_of_feed {
        log::warn!("window {window_id}: feed made no progress at cursor {cursor}, yielding");
        return Ok(RunStatus { processed: saved, total: fetched, completed: false });
      }
    }

    // DONE detection: the feed is time-ordered, so a cursor at or past the
    // window end proves every in-window record has been considered
    if cursor < self.window.end {
      log::info!("window {window_id}: feed drained at cursor {cursor}, window still open");
      return Ok(RunStatus { processed: saved, total: fetched, completed: false });
    }

    let now = effective_now(self.now_override).timestamp();
    self.finalizer.finalize(&self.window, cursor, fetched, saved, last_admitted, now)?;
    Ok(RunStatus { processed: saved, total: fetched, completed: true })
  }

  fn append_progress_audit(
    &self,
    cursor: i64,
    records_fetched: usize,
    records_saved: usize,
    last_record_id: Option<i64>,
  ) -> Result<()> {
    self.store.append_audit(&crate::model::AuditEntry {
      timestamp: effective_now(self.now_override).timestamp(),
      window_id: self.window.id.clone(),
      cursor,
      records_fetched,
      records_saved,
      last_record_id,
      status: "In Progress".to_string(),
    })
  }
}

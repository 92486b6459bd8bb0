use anyhow::Result;

use crate::cli::ExportConfig;
use crate::controller::ExportController;
use crate::finalize::Finalizer;
use crate::model::{AuditEntry, RunStatus};
use crate::notify::{Notifier, SmtpNotifier};
use crate::report::CsvReportSink;
use crate::store::{ExportStore, JsonStore};
use crate::upstream::HttpHelpdeskApi;
use crate::util::{effective_now, parse_now_override};
use crate::window::resolve_window;

/// Wire the concrete collaborators and run one export work unit for the
/// configured window.
///
/// Any unhandled failure leaves one `ERROR:` record in the audit trail
/// before propagating; nothing is swallowed.
pub fn run_export(cfg: &ExportConfig) -> Result<RunStatus> {
  let now_opt = parse_now_override(cfg.now_override.as_deref());

  // Window resolution fails before any state is touched
  let window = resolve_window(cfg.month.as_deref(), effective_now(now_opt))?;
  log::info!("exporting window {} [{}, {})", window.id, window.start, window.end);

  let store = JsonStore::open(&cfg.store_dir)?;
  let feed = HttpHelpdeskApi::new(&cfg.base_url, &cfg.identity, &cfg.secret);
  let sink = CsvReportSink::new(&cfg.report_dir);
  let notifier = cfg.smtp.as_ref().map(SmtpNotifier::new).transpose()?;

  let controller = ExportController {
    window: window.clone(),
    feed: &feed,
    store: &store,
    finalizer: Finalizer {
      store: &store,
      sink: &sink,
      notifier: notifier.as_ref().map(|n| n as &dyn Notifier),
      recipients: &cfg.recipients,
    },
    max_pages: cfg.max_pages,
    now_override: now_opt,
  };

  match controller.run() {
    Ok(status) => Ok(status),
    Err(err) => {
      let cursor = store.read_checkpoint(&window.id).ok().flatten().unwrap_or(window.start);
      let entry = AuditEntry {
        timestamp: effective_now(now_opt).timestamp(),
        window_id: window.id.clone(),
        cursor,
        records_fetched: 0,
        records_saved: 0,
        last_record_id: None,
        status: format!("ERROR: {err:#}"),
      };
      if let Err(audit_err) = store.append_audit(&entry) {
        log::error!("could not record failure in audit log: {audit_err:#}");
      }
      Err(err)
    }
  }
}

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use anyhow::Result;
use ticket_activity_export::model::{AuditEntry, Comment, EnrichedRow, Ticket, TicketPage, User};
use ticket_activity_export::notify::Notifier;
use ticket_activity_export::report::{ReportArtifact, ReportSink};
use ticket_activity_export::store::ExportStore;
use ticket_activity_export::upstream::HelpdeskApi;

/// In-memory stand-in for the durable container, with failure knobs and a
/// record of every checkpoint commit for monotonicity assertions.
#[derive(Default)]
pub struct MemoryStore {
  pub checkpoints: RefCell<BTreeMap<String, i64>>,
  pub rows: RefCell<BTreeMap<String, Vec<EnrichedRow>>>,
  pub audit: RefCell<Vec<AuditEntry>>,
  pub checkpoint_history: RefCell<Vec<i64>>,
  pub fail_checkpoint_writes: Cell<bool>,
  pub fail_row_appends: Cell<bool>,
}

impl MemoryStore {
  #[allow(dead_code)]
  pub fn new() -> Self {
    Self::default()
  }

  #[allow(dead_code)]
  pub fn audit_statuses(&self) -> Vec<String> {
    self.audit.borrow().iter().map(|e| e.status.clone()).collect()
  }
}

impl ExportStore for MemoryStore {
  fn read_checkpoint(&self, window_id: &str) -> Result<Option<i64>> {
    Ok(self.checkpoints.borrow().get(window_id).copied())
  }

  fn write_checkpoint(&self, window_id: &str, cursor: i64) -> Result<()> {
    if self.fail_checkpoint_writes.get() {
      anyhow::bail!("checkpoint region unavailable");
    }
    self.checkpoints.borrow_mut().insert(window_id.to_string(), cursor);
    self.checkpoint_history.borrow_mut().push(cursor);
    Ok(())
  }

  fn clear_checkpoint(&self, window_id: &str) -> Result<()> {
    self.checkpoints.borrow_mut().remove(window_id);
    Ok(())
  }

  fn append_rows(&self, window_id: &str, rows: &[EnrichedRow]) -> Result<usize> {
    if self.fail_row_appends.get() {
      anyhow::bail!("staging region unavailable");
    }
    let mut all = self.rows.borrow_mut();
    let staged = all.entry(window_id.to_string()).or_default();
    let seen: HashSet<i64> = staged.iter().map(|r| r.ticket_id).collect();

    let mut appended = 0usize;
    for row in rows {
      if seen.contains(&row.ticket_id) {
        continue;
      }
      staged.push(row.clone());
      appended += 1;
    }
    Ok(appended)
  }

  fn read_rows(&self, window_id: &str) -> Result<Vec<EnrichedRow>> {
    Ok(self.rows.borrow().get(window_id).cloned().unwrap_or_default())
  }

  fn clear_rows(&self, window_id: &str) -> Result<()> {
    self.rows.borrow_mut().remove(window_id);
    Ok(())
  }

  fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
    self.audit.borrow_mut().push(entry.clone());
    Ok(())
  }

  fn reset_audit(&self, window_id: &str) -> Result<()> {
    self.audit.borrow_mut().retain(|e| e.window_id != window_id);
    Ok(())
  }
}

/// Scripted upstream: hands out pre-built pages in order and records the
/// cursor of every fetch. Once the script runs dry it reports end-of-feed
/// without advancing.
#[derive(Default)]
pub struct ScriptedFeed {
  pub pages: RefCell<VecDeque<TicketPage>>,
  pub fetch_cursors: RefCell<Vec<i64>>,
  pub users: HashMap<i64, User>,
  pub comments: HashMap<i64, Vec<Comment>>,
  pub fail_user_lookups: Cell<bool>,
}

impl ScriptedFeed {
  #[allow(dead_code)]
  pub fn new(pages: Vec<TicketPage>) -> Self {
    Self {
      pages: RefCell::new(pages.into()),
      ..Self::default()
    }
  }
}

impl HelpdeskApi for ScriptedFeed {
  fn fetch_page(&self, cursor: i64) -> Result<TicketPage> {
    self.fetch_cursors.borrow_mut().push(cursor);
    match self.pages.borrow_mut().pop_front() {
      Some(page) => Ok(page),
      None => Ok(TicketPage {
        records: Vec::new(),
        end_time: cursor,
        end_of_stream: true,
        next_page: None,
      }),
    }
  }

  fn fetch_user(&self, id: i64) -> Result<Option<User>> {
    if self.fail_user_lookups.get() {
      anyhow::bail!("user service unavailable");
    }
    Ok(self.users.get(&id).cloned())
  }

  fn fetch_comments(&self, ticket_id: i64) -> Result<Vec<Comment>> {
    Ok(self.comments.get(&ticket_id).cloned().unwrap_or_default())
  }
}

/// Report sink double recording publishes and grants.
#[derive(Default)]
pub struct RecordingSink {
  pub published: RefCell<Vec<(String, Vec<EnrichedRow>)>>,
  pub shared: RefCell<Vec<Vec<String>>>,
  pub fail_publish: Cell<bool>,
}

impl ReportSink for RecordingSink {
  fn publish(&self, window_id: &str, rows: &[EnrichedRow]) -> Result<ReportArtifact> {
    if self.fail_publish.get() {
      anyhow::bail!("report backend unavailable");
    }
    self.published.borrow_mut().push((window_id.to_string(), rows.to_vec()));
    Ok(ReportArtifact {
      name: format!("ticket-report-{window_id}.csv"),
      location: format!("memory://ticket-report-{window_id}.csv"),
    })
  }

  fn share(&self, _artifact: &ReportArtifact, recipients: &[String]) -> Result<()> {
    self.shared.borrow_mut().push(recipients.to_vec());
    Ok(())
  }
}

#[derive(Default)]
pub struct RecordingNotifier {
  pub notified: RefCell<Vec<(Vec<String>, String, String)>>,
}

impl Notifier for RecordingNotifier {
  fn notify(&self, recipients: &[String], window_id: &str, artifact: &ReportArtifact) -> Result<()> {
    self
      .notified
      .borrow_mut()
      .push((recipients.to_vec(), window_id.to_string(), artifact.location.clone()));
    Ok(())
  }
}

#[allow(dead_code)]
pub fn ticket(id: i64, created_at: i64, requester_id: Option<i64>) -> Ticket {
  Ticket {
    id,
    created_at,
    requester_id,
    channel: "web".into(),
    subject: format!("ticket {id}"),
    status: "open".into(),
  }
}

#[allow(dead_code)]
pub fn page(records: Vec<Ticket>, end_time: i64, end_of_stream: bool) -> TicketPage {
  TicketPage {
    records,
    end_time,
    end_of_stream,
    next_page: None,
  }
}

#[allow(dead_code)]
pub fn recipients() -> Vec<String> {
  vec!["ops@example.com".to_string(), "lead@example.com".to_string()]
}

// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Helpdesk API access: the incremental ticket feed plus per-record user and comment lookups
// role: upstream/http-client
// inputs: Base URL, identity + secret (Basic auth), feed cursor, record ids
// outputs: Typed pages, users, and comments parsed from JSON responses
// side_effects: Network calls to the helpdesk API
// invariants:
// - Feed records arrive ordered by ascending feed position; end_time >= the requested cursor
// - Non-success responses surface status and body verbatim; no retry here (the scheduler re-invokes)
// - A 404 on a user lookup is "absent", not an error
// errors: Upstream errors carry the HTTP status and response body
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;

use crate::error::ExportError;
use crate::model::{Comment, TicketPage, User};

/// Seam over the helpdesk API. The controller and enricher only ever see
/// this trait; tests inject scripted implementations.
pub trait HelpdeskApi {
  /// Fetch one page of the time-ordered incremental feed at `cursor`.
  fn fetch_page(&self, cursor: i64) -> Result<TicketPage>;
  /// Resolve a user by id; `None` when the upstream has no such user.
  fn fetch_user(&self, id: i64) -> Result<Option<User>>;
  /// List all comments for a ticket, upstream order preserved.
  fn fetch_comments(&self, ticket_id: i64) -> Result<Vec<Comment>>;
}

/// `Authorization` header value for the helpdesk's Basic auth scheme.
pub fn basic_auth_header(identity: &str, secret: &str) -> String {
  format!("Basic {}", BASE64.encode(format!("{identity}:{secret}")))
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
  user: User,
}

#[derive(Debug, Deserialize)]
struct CommentsEnvelope {
  comments: Vec<Comment>,
}

pub struct HttpHelpdeskApi {
  agent: ureq::Agent,
  base_url: String,
  auth_header: String,
}

impl HttpHelpdeskApi {
  pub fn new(base_url: &str, identity: &str, secret: &str) -> Self {
    Self {
      agent: ureq::AgentBuilder::new().build(),
      base_url: base_url.trim_end_matches('/').to_string(),
      auth_header: basic_auth_header(identity, secret),
    }
  }

  fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ureq::Response> {
    let url = format!("{}{}", self.base_url, path);
    let mut req = self
      .agent
      .get(&url)
      .set("Authorization", &self.auth_header)
      .set("Accept", "application/json");

    for (name, value) in query {
      req = req.query(name, value);
    }

    match req.call() {
      Ok(resp) => Ok(resp),
      Err(ureq::Error::Status(status, resp)) => {
        let body = resp.into_string().unwrap_or_default();
        Err(ExportError::Upstream { status, body }.into())
      }
      Err(err) => Err(anyhow::Error::new(err).context(format!("calling {url}"))),
    }
  }
}

impl HelpdeskApi for HttpHelpdeskApi {
  fn fetch_page(&self, cursor: i64) -> Result<TicketPage> {
    let resp = self.get("/api/v2/incremental/tickets", &[("start_time", cursor.to_string())])?;
    resp.into_json::<TicketPage>().context("parsing incremental feed page")
  }

  fn fetch_user(&self, id: i64) -> Result<Option<User>> {
    let resp = match self.get(&format!("/api/v2/users/{id}"), &[]) {
      Ok(resp) => resp,
      Err(err) => {
        // Guard: an absent user is a data condition, not a failure
        if let Some(ExportError::Upstream { status: 404, .. }) = err.downcast_ref::<ExportError>() {
          return Ok(None);
        }
        return Err(err);
      }
    };
    let envelope = resp.into_json::<UserEnvelope>().context("parsing user lookup")?;
    Ok(Some(envelope.user))
  }

  fn fetch_comments(&self, ticket_id: i64) -> Result<Vec<Comment>> {
    let resp = self.get(&format!("/api/v2/tickets/{ticket_id}/comments"), &[])?;
    let envelope = resp.into_json::<CommentsEnvelope>().context("parsing ticket comments")?;
    Ok(envelope.comments)
  }
}

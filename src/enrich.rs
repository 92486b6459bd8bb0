use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::Result;

use crate::error::ExportError;
use crate::model::{EnrichedRow, Ticket};
use crate::upstream::HelpdeskApi;

/// Separator between labeled comment bodies in the digest.
pub const COMMENT_SEPARATOR: &str = "\n\n";

/// Placeholder used when requester identity cannot be resolved.
pub const MISSING_REQUESTER: &str = "N/A";

/// Turns a raw ticket into one denormalized output row: requester identity
/// plus the ordered, labeled digest of public comments.
///
/// Lookups are best-effort by policy: a failed user or comment call
/// degrades that ticket to placeholders and logs the ticket id, rather
/// than aborting the batch. Requester lookups are cached per run.
pub struct Enricher<'a> {
  api: &'a dyn HelpdeskApi,
  user_cache: RefCell<HashMap<i64, Option<String>>>,
}

impl<'a> Enricher<'a> {
  pub fn new(api: &'a dyn HelpdeskApi) -> Self {
    Self {
      api,
      user_cache: RefCell::new(HashMap::new()),
    }
  }

  pub fn enrich(&self, ticket: &Ticket) -> EnrichedRow {
    EnrichedRow {
      ticket_id: ticket.id,
      created_at: ticket.created_at,
      requester_email: self.resolve_requester(ticket),
      channel: ticket.channel.clone(),
      subject: ticket.subject.clone(),
      body_digest: self.build_digest(ticket),
    }
  }

  fn resolve_requester(&self, ticket: &Ticket) -> String {
    // Guard: a ticket may carry no requester at all
    let requester_id = match ticket.requester_id {
      Some(id) => id,
      None => return MISSING_REQUESTER.to_string(),
    };

    if let Some(cached) = self.user_cache.borrow().get(&requester_id) {
      return cached.clone().unwrap_or_else(|| MISSING_REQUESTER.to_string());
    }

    match self.lookup_email(ticket.id, requester_id) {
      Ok(email) => {
        self.user_cache.borrow_mut().insert(requester_id, email.clone());
        email.unwrap_or_else(|| MISSING_REQUESTER.to_string())
      }
      Err(err) => {
        // Transient failures are not cached; the next record retries
        log::warn!("requester lookup degraded to placeholder: {err:#}");
        MISSING_REQUESTER.to_string()
      }
    }
  }

  fn lookup_email(&self, ticket_id: i64, requester_id: i64) -> Result<Option<String>> {
    let user = self.api.fetch_user(requester_id).map_err(|err| ExportError::Enrichment {
      ticket_id,
      reason: format!("user {requester_id}: {err:#}"),
    })?;
    Ok(user.map(|u| u.email).filter(|email| !email.is_empty()))
  }

  fn build_digest(&self, ticket: &Ticket) -> String {
    let comments = match self.api.fetch_comments(ticket.id) {
      Ok(comments) => comments,
      Err(err) => {
        let err = ExportError::Enrichment {
          ticket_id: ticket.id,
          reason: format!("comments: {err:#}"),
        };
        log::warn!("comment digest degraded to empty: {err}");
        return String::new();
      }
    };

    let labeled: Vec<String> = comments
      .iter()
      .filter(|c| c.public)
      .map(|c| {
        let label = match (c.author_id, ticket.requester_id) {
          (Some(author), Some(requester)) if author == requester => "Requester",
          _ => "Agent",
        };
        format!("{label}: {body}", body = c.body)
      })
      .collect();

    labeled.join(COMMENT_SEPARATOR)
  }
}

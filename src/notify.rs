use std::str::FromStr;

use anyhow::{Context, Result};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::report::ReportArtifact;

/// Outbound-mail settings; absent entirely when notification is disabled.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
  pub host: String,
  pub port: u16,
  pub identity: String,
  pub credential: String,
}

/// Seam over completion notification. One message per completed window.
pub trait Notifier {
  /// Delivery is at-least-once across finalization retries: a retry after
  /// a post-send failure sends again.
  fn notify(&self, recipients: &[String], window_id: &str, artifact: &ReportArtifact) -> Result<()>;
}

pub struct SmtpNotifier {
  from: Mailbox,
  mailer: SmtpTransport,
}

impl SmtpNotifier {
  pub fn new(cfg: &SmtpConfig) -> Result<Self> {
    let from = Mailbox::from_str(&cfg.identity).with_context(|| format!("invalid sender mailbox: {}", cfg.identity))?;

    let credentials = Credentials::new(cfg.identity.clone(), cfg.credential.clone());
    let builder = if cfg.port == 465 {
      SmtpTransport::relay(&cfg.host).with_context(|| format!("invalid smtp relay host: {}", cfg.host))?
    } else {
      SmtpTransport::starttls_relay(&cfg.host).with_context(|| format!("invalid smtp starttls host: {}", cfg.host))?
    };
    let mailer = builder.port(cfg.port).credentials(credentials).build();

    Ok(Self { from, mailer })
  }
}

pub fn parse_recipients(recipients: &[String]) -> Result<Vec<Mailbox>> {
  recipients
    .iter()
    .map(|r| Mailbox::from_str(r).with_context(|| format!("invalid recipient: {r}")))
    .collect()
}

pub fn notification_subject(window_id: &str) -> String {
  format!("Ticket activity report {window_id}")
}

pub fn notification_body(window_id: &str, artifact: &ReportArtifact) -> String {
  format!(
    "The ticket activity export for {window_id} is complete.\n\nReport: {name}\nLocation: {location}\n",
    name = artifact.name,
    location = artifact.location
  )
}

impl Notifier for SmtpNotifier {
  fn notify(&self, recipients: &[String], window_id: &str, artifact: &ReportArtifact) -> Result<()> {
    let mut builder = Message::builder().from(self.from.clone()).subject(notification_subject(window_id));
    for mailbox in parse_recipients(recipients)? {
      builder = builder.to(mailbox);
    }

    let email = builder
      .body(notification_body(window_id, artifact))
      .context("building notification message")?;

    self.mailer.send(&email).context("sending notification via SMTP")?;
    log::info!("notified {} recipient(s) for window {window_id}", recipients.len());
    Ok(())
  }
}

use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;

use crate::notify::SmtpConfig;

#[derive(Parser, Debug)]
#[command(
    name = "ticket-activity-export",
    version,
    about = "Incremental export of helpdesk ticket activity to a monthly report",
    long_about = None
)]
pub struct Cli {
  /// Calendar month to export, e.g. 2025-12 (default: previous calendar month, UTC)
  #[arg(long, env = "EXPORT_MONTH")]
  pub month: Option<String>,

  /// Helpdesk API base URL, e.g. https://acme.helpdesk.example
  #[arg(long, env = "HELPDESK_BASE_URL")]
  pub base_url: Option<String>,

  /// Helpdesk API identity (Basic auth username)
  #[arg(long, env = "HELPDESK_IDENTITY")]
  pub identity: Option<String>,

  /// Helpdesk API secret (Basic auth password)
  #[arg(long, env = "HELPDESK_SECRET", hide_env_values = true)]
  pub secret: Option<String>,

  /// Directory holding the checkpoint, staging, and audit-log regions
  #[arg(long, env = "EXPORT_STORE_DIR", default_value = "export-store")]
  pub store_dir: PathBuf,

  /// Directory the finished report is written to (default: <store-dir>/reports)
  #[arg(long, env = "REPORT_DIR")]
  pub report_dir: Option<PathBuf>,

  /// Comma-separated recipient email addresses
  #[arg(long, env = "REPORT_RECIPIENTS")]
  pub recipients: Option<String>,

  /// SMTP relay host for the completion email (notification disabled when absent)
  #[arg(long, env = "SMTP_HOST")]
  pub smtp_host: Option<String>,

  /// SMTP relay port (465 selects the implicit-TLS relay)
  #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
  pub smtp_port: u16,

  /// Outbound-mail identity (sender address and SMTP username)
  #[arg(long, env = "SMTP_IDENTITY")]
  pub smtp_identity: Option<String>,

  /// Outbound-mail credential
  #[arg(long, env = "SMTP_CREDENTIAL", hide_env_values = true)]
  pub smtp_credential: Option<String>,

  /// Feed pages to consume in this invocation (0 = run until drained)
  #[arg(long, default_value_t = 0)]
  pub max_pages: usize,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Override the "now" instant for default-month resolution (hidden; tests only)
  #[arg(long = "now-override", hide = true)]
  pub now_override: Option<String>,
}

/// The explicit configuration handed to every component. Constructed once
/// here; nothing downstream reads ambient environment state.
#[derive(Debug, Clone)]
pub struct ExportConfig {
  pub month: Option<String>,
  pub base_url: String,
  pub identity: String,
  pub secret: String,
  pub store_dir: String,
  pub report_dir: String,
  pub recipients: Vec<String>,
  pub smtp: Option<SmtpConfig>,
  pub max_pages: usize,
  pub now_override: Option<String>,
}

pub fn normalize(cli: Cli) -> Result<ExportConfig> {
  let base_url = match cli.base_url {
    Some(url) if !url.trim().is_empty() => url.trim().to_string(),
    _ => bail!("Provide --base-url (or HELPDESK_BASE_URL)"),
  };
  let identity = match cli.identity {
    Some(id) if !id.trim().is_empty() => id.trim().to_string(),
    _ => bail!("Provide --identity (or HELPDESK_IDENTITY)"),
  };
  let secret = match cli.secret {
    Some(s) if !s.is_empty() => s,
    _ => bail!("Provide --secret (or HELPDESK_SECRET)"),
  };

  let recipients: Vec<String> = cli
    .recipients
    .as_deref()
    .unwrap_or_default()
    .split(',')
    .map(|r| r.trim().to_string())
    .filter(|r| !r.is_empty())
    .collect();
  if recipients.is_empty() {
    bail!("Provide --recipients (or REPORT_RECIPIENTS) with at least one address");
  }

  let smtp = match (cli.smtp_host, cli.smtp_identity, cli.smtp_credential) {
    (Some(host), Some(identity), Some(credential)) => Some(SmtpConfig {
      host,
      port: cli.smtp_port,
      identity,
      credential,
    }),
    (None, None, None) => None,
    _ => bail!("Incomplete outbound-mail configuration: set all of --smtp-host, --smtp-identity, --smtp-credential, or none"),
  };

  let store_dir = cli.store_dir.to_string_lossy().to_string();
  let report_dir = match cli.report_dir {
    Some(dir) => dir.to_string_lossy().to_string(),
    None => cli.store_dir.join("reports").to_string_lossy().to_string(),
  };

  Ok(ExportConfig {
    month: cli.month,
    base_url,
    identity,
    secret,
    store_dir,
    report_dir,
    recipients,
    smtp,
    max_pages: cli.max_pages,
    now_override: cli.now_override,
  })
}

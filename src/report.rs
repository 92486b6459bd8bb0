use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::EnrichedRow;
use crate::util::iso_utc;

/// Column header of the final report artifact.
pub const REPORT_HEADER: [&str; 6] = [
  "Ticket ID",
  "Created At",
  "Requester Email",
  "Channel",
  "Subject",
  "Public Comments",
];

/// A published report: deterministic name plus an addressable location.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
  pub name: String,
  pub location: String,
}

/// Seam over report materialization and access grants.
pub trait ReportSink {
  /// Create (or re-create) the window's report from the given rows.
  /// Deterministic naming makes a retry overwrite rather than duplicate.
  fn publish(&self, window_id: &str, rows: &[EnrichedRow]) -> Result<ReportArtifact>;
  /// Grant access to every recipient. Grants already present are kept
  /// as-is, so retries never duplicate them.
  fn share(&self, artifact: &ReportArtifact, recipients: &[String]) -> Result<()>;
}

/// CSV-on-disk sink: the spreadsheet artifact plus a sidecar recording
/// which recipients have been granted access.
pub struct CsvReportSink {
  dir: PathBuf,
}

impl CsvReportSink {
  pub fn new<P: AsRef<Path>>(dir: P) -> Self {
    Self { dir: dir.as_ref().to_path_buf() }
  }

  fn grants_path(artifact: &ReportArtifact) -> String {
    format!("{}.recipients.json", artifact.location)
  }
}

impl ReportSink for CsvReportSink {
  fn publish(&self, window_id: &str, rows: &[EnrichedRow]) -> Result<ReportArtifact> {
    std::fs::create_dir_all(&self.dir).with_context(|| format!("creating report directory {}", self.dir.display()))?;

    let name = format!("ticket-report-{window_id}.csv");
    let path = self.dir.join(&name);
    let mut writer = csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))?;

    writer.write_record(REPORT_HEADER).context("writing report header")?;
    for row in rows {
      writer
        .write_record([
          row.ticket_id.to_string(),
          iso_utc(row.created_at),
          row.requester_email.clone(),
          row.channel.clone(),
          row.subject.clone(),
          row.body_digest.clone(),
        ])
        .with_context(|| format!("writing report row for ticket {}", row.ticket_id))?;
    }
    writer.flush().with_context(|| format!("flushing {}", path.display()))?;

    Ok(ReportArtifact {
      name,
      location: path.to_string_lossy().to_string(),
    })
  }

  fn share(&self, artifact: &ReportArtifact, recipients: &[String]) -> Result<()> {
    let grants_path = Self::grants_path(artifact);

    let mut granted: BTreeSet<String> = if Path::new(&grants_path).exists() {
      let buf = std::fs::read(&grants_path).with_context(|| format!("reading {grants_path}"))?;
      serde_json::from_slice::<Vec<String>>(&buf)
        .with_context(|| format!("parsing {grants_path}"))?
        .into_iter()
        .collect()
    } else {
      BTreeSet::new()
    };

    for recipient in recipients {
      if granted.insert(recipient.clone()) {
        log::info!("granted report access to {recipient}");
      }
    }

    let listed: Vec<&String> = granted.iter().collect();
    std::fs::write(&grants_path, serde_json::to_vec_pretty(&listed)?)
      .with_context(|| format!("writing {grants_path}"))
  }
}

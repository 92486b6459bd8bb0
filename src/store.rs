// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Durable container for checkpoints, staging rows, and the audit trail, behind the ExportStore seam
// role: persistence/store
// inputs: Window ids, cursors, enriched rows, audit entries
// outputs: JSON regions on disk (checkpoints map, per-window staging lines, audit log lines)
// side_effects: Reads and writes files under the container directory on every operation
// invariants:
// - No caching: every read reflects the latest committed write from any process
// - Checkpoint keys are always scoped by window id
// - append_rows skips ticket ids already staged (idempotent under replay)
// - Audit lines are append-only except for the explicit fresh-run reset
// errors: Store write failures surface as Persistence errors; the controller must not advance past them
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::ExportError;
use crate::model::{AuditEntry, EnrichedRow};

/// Seam over the durable container the export run owns: a key-value
/// checkpoint region, a per-window staging region, and the audit trail.
pub trait ExportStore {
  /// Last committed cursor for the window, or None on a fresh run.
  fn read_checkpoint(&self, window_id: &str) -> Result<Option<i64>>;
  /// Durably replace the cursor for the window. Idempotent under retry.
  fn write_checkpoint(&self, window_id: &str, cursor: i64) -> Result<()>;
  /// Remove the checkpoint; only after successful finalization.
  fn clear_checkpoint(&self, window_id: &str) -> Result<()>;

  /// Append rows in arrival order, skipping ticket ids already staged.
  /// Returns the number actually appended.
  fn append_rows(&self, window_id: &str, rows: &[EnrichedRow]) -> Result<usize>;
  fn read_rows(&self, window_id: &str) -> Result<Vec<EnrichedRow>>;
  fn clear_rows(&self, window_id: &str) -> Result<()>;

  fn append_audit(&self, entry: &AuditEntry) -> Result<()>;
  /// Drop audit entries for the window; fresh-run reset only.
  fn reset_audit(&self, window_id: &str) -> Result<()>;
}

fn persistence(err: anyhow::Error) -> anyhow::Error {
  anyhow::Error::new(ExportError::Persistence(format!("{err:#}")))
}

/// File-backed container: a directory holding `checkpoints.json`,
/// `staging-<window>.jsonl`, and `audit-log.jsonl`.
pub struct JsonStore {
  dir: PathBuf,
}

impl JsonStore {
  pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
    let dir = dir.as_ref().to_path_buf();
    std::fs::create_dir_all(&dir)
      .with_context(|| format!("creating store container {}", dir.display()))
      .map_err(persistence)?;
    Ok(Self { dir })
  }

  fn checkpoints_path(&self) -> PathBuf {
    self.dir.join("checkpoints.json")
  }

  fn staging_path(&self, window_id: &str) -> PathBuf {
    self.dir.join(format!("staging-{window_id}.jsonl"))
  }

  fn audit_path(&self) -> PathBuf {
    self.dir.join("audit-log.jsonl")
  }

  fn load_checkpoints(&self) -> Result<BTreeMap<String, i64>> {
    let path = self.checkpoints_path();
    if !path.exists() {
      return Ok(BTreeMap::new());
    }
    let buf = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&buf).with_context(|| format!("parsing {}", path.display()))
  }

  fn save_checkpoints(&self, map: &BTreeMap<String, i64>) -> Result<()> {
    let path = self.checkpoints_path();
    std::fs::write(&path, serde_json::to_vec_pretty(map)?)
      .with_context(|| format!("writing {}", path.display()))
  }

  fn read_lines<T: serde::de::DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
      return Ok(Vec::new());
    }
    let buf = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let mut out = Vec::new();
    for line in buf.lines() {
      if line.trim().is_empty() {
        continue;
      }
      let item = serde_json::from_str(line).with_context(|| format!("parsing a line of {}", path.display()))?;
      out.push(item);
    }
    Ok(out)
  }

  fn append_line<T: serde::Serialize>(&self, path: &Path, item: &T) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(path)
      .with_context(|| format!("opening {} for append", path.display()))?;
    let line = serde_json::to_string(item)?;
    writeln!(file, "{line}").with_context(|| format!("appending to {}", path.display()))
  }
}

impl ExportStore for JsonStore {
  fn read_checkpoint(&self, window_id: &str) -> Result<Option<i64>> {
    Ok(self.load_checkpoints()?.get(window_id).copied())
  }

  fn write_checkpoint(&self, window_id: &str, cursor: i64) -> Result<()> {
    let mut map = self.load_checkpoints().map_err(persistence)?;
    map.insert(window_id.to_string(), cursor);
    self.save_checkpoints(&map).map_err(persistence)
  }

  fn clear_checkpoint(&self, window_id: &str) -> Result<()> {
    let mut map = self.load_checkpoints().map_err(persistence)?;
    map.remove(window_id);
    self.save_checkpoints(&map).map_err(persistence)
  }

  fn append_rows(&self, window_id: &str, rows: &[EnrichedRow]) -> Result<usize> {
    let path = self.staging_path(window_id);
    let staged: Vec<EnrichedRow> = self.read_lines(&path)?;
    let seen: HashSet<i64> = staged.iter().map(|r| r.ticket_id).collect();

    let mut appended = 0usize;
    for row in rows {
      if seen.contains(&row.ticket_id) {
        continue;
      }
      self.append_line(&path, row).map_err(persistence)?;
      appended += 1;
    }
    Ok(appended)
  }

  fn read_rows(&self, window_id: &str) -> Result<Vec<EnrichedRow>> {
    self.read_lines(&self.staging_path(window_id))
  }

  fn clear_rows(&self, window_id: &str) -> Result<()> {
    let path = self.staging_path(window_id);
    if path.exists() {
      std::fs::remove_file(&path)
        .with_context(|| format!("removing {}", path.display()))
        .map_err(persistence)?;
    }
    Ok(())
  }

  fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
    self.append_line(&self.audit_path(), entry).map_err(persistence)
  }

  fn reset_audit(&self, window_id: &str) -> Result<()> {
    let path = self.audit_path();
    let entries: Vec<AuditEntry> = self.read_lines(&path)?;
    let kept: Vec<&AuditEntry> = entries.iter().filter(|e| e.window_id != window_id).collect();

    let mut buf = String::new();
    for entry in kept {
      buf.push_str(&serde_json::to_string(entry)?);
      buf.push('\n');
    }
    std::fs::write(&path, buf)
      .with_context(|| format!("rewriting {}", path.display()))
      .map_err(persistence)
  }
}

// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Utilities for time formatting, deterministic "now" handling, directory preparation, and man page rendering
// role: utilities/helpers
// inputs: Epoch seconds; optional now override; paths; clap CommandFactory
// outputs: RFC3339 UTC timestamps, effective now, ensured directories, man page text
// side_effects: prepare_dir creates directories
// invariants:
// - iso_utc is locale-independent and always ends in Z
// - effective_now returns the override verbatim when present
// errors: IO errors bubble with context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use clap::CommandFactory;

/// Formats a UNIX epoch timestamp as an RFC3339 UTC string.
pub fn iso_utc(epoch: i64) -> String {
  match Utc.timestamp_opt(epoch, 0).single() {
    Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
    None => format!("epoch:{epoch}"),
  }
}

/// Parse a `--now-override` string into a UTC instant.
/// Accepts RFC3339 (e.g. 2025-12-15T12:00:00Z) or a naive timestamp
/// formatted as `%Y-%m-%dT%H:%M:%S`, read as UTC.
pub fn parse_now_override(s: Option<&str>) -> Option<DateTime<Utc>> {
  s.and_then(|raw| {
    chrono::DateTime::parse_from_rfc3339(raw)
      .ok()
      .map(|dt| dt.with_timezone(&Utc))
      .or_else(|| {
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
          .ok()
          .map(|ndt| Utc.from_utc_datetime(&ndt))
      })
  })
}

/// Returns the effective "now" given an optional override.
///
/// Centralizes our handling of test determinism without sprinkling
/// `Utc::now()` throughout the code.
pub fn effective_now(override_now: Option<DateTime<Utc>>) -> DateTime<Utc> {
  override_now.unwrap_or_else(Utc::now)
}

/// Ensure a directory exists, returning it as an owned path string.
pub fn prepare_dir<P: AsRef<Path>>(dir: P) -> Result<String> {
  let dir = dir.as_ref();
  std::fs::create_dir_all(dir).with_context(|| format!("creating directory {}", dir.display()))?;
  Ok(dir.to_string_lossy().to_string())
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}

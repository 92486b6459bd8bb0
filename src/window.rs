use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;

// Windowing types live here to keep the controller focused.

/// The half-open calendar-month interval `[start, end)` an export run
/// targets, in UNIX seconds (UTC). Immutable once computed for a run.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct ExportWindow {
  pub id: String,
  pub start: i64,
  pub end: i64,
}

impl ExportWindow {
  /// Half-open membership: start inclusive, end exclusive.
  pub fn contains(&self, ts: i64) -> bool {
    self.start <= ts && ts < self.end
  }
}

static RE_MONTH: Lazy<regex::Regex> = Lazy::new(|| regex::Regex::new(r"^\d{4}-\d{2}$").unwrap());

fn month_start_epoch(year: i32, month: u32) -> Result<i64> {
  let dt = Utc
    .with_ymd_and_hms(year, month, 1, 0, 0, 0)
    .single()
    .with_context(|| format!("computing first instant of {year:04}-{month:02}"))?;
  Ok(dt.timestamp())
}

/// Compute the window for a `YYYY-MM` month identifier.
///
/// Fails with a `Validation` error on malformed input; nothing is mutated
/// on failure.
pub fn month_window(year_month: &str) -> Result<ExportWindow> {
  if !RE_MONTH.is_match(year_month) {
    return Err(ExportError::Validation(year_month.to_string()).into());
  }

  let parts: Vec<&str> = year_month.split('-').collect();
  let y: i32 = parts[0].parse().context("parsing year in month identifier")?;
  let m: u32 = parts[1].parse().context("parsing month in month identifier")?;

  if !(1..=12).contains(&m) {
    return Err(ExportError::Validation(year_month.to_string()).into());
  }

  let (next_y, next_m) = if m == 12 { (y + 1, 1) } else { (y, m + 1) };

  Ok(ExportWindow {
    id: format!("{y:04}-{m:02}"),
    start: month_start_epoch(y, m)?,
    end: month_start_epoch(next_y, next_m)?,
  })
}

/// The calendar month before `now`, in UTC.
pub fn previous_month(now: DateTime<Utc>) -> Result<ExportWindow> {
  let y = now.year();
  let m = now.month();
  let (last_y, last_m) = if m == 1 { (y - 1, 12) } else { (y, m - 1) };

  month_window(&format!("{last_y:04}-{last_m:02}"))
}

/// Resolve the target window: an explicit month identifier wins; absent
/// means the previous calendar month relative to `now`.
pub fn resolve_window(month: Option<&str>, now: DateTime<Utc>) -> Result<ExportWindow> {
  match month {
    Some(ym) => month_window(ym),
    None => previous_month(now),
  }
}

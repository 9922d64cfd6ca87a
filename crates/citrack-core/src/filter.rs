//! Row filters: exact source country, exact destination country and an
//! inclusive local-time date range, combined with AND.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  row::{ChangeRow, SortOrder, sort_rows},
  time::{earliest_in, latest_in},
};

/// Calendar-day bounds. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
  pub start: Option<NaiveDate>,
  pub end:   Option<NaiveDate>,
}

impl DateRange {
  pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
    if let (Some(start), Some(end)) = (start, end)
      && start > end
    {
      return Err(Error::InvertedDateRange { start, end });
    }
    Ok(Self { start, end })
  }

  /// Parse `START..END` where either side may be blank; a single date means
  /// that one day.
  pub fn parse(input: &str) -> Result<Self> {
    let input = input.trim();
    match input.split_once("..") {
      Some((start, end)) => Self::new(parse_day(start)?, parse_day(end)?),
      None => {
        let day = parse_day(input)?;
        Self::new(day, day)
      }
    }
  }

  pub fn is_open(&self) -> bool { self.start.is_none() && self.end.is_none() }

  /// Start at 00:00:00.000 and end at 23:59:59.999, both wall-clock in `tz`.
  pub fn bounds_in<Tz: TimeZone>(
    &self,
    tz: &Tz,
  ) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    (
      self.start.map(|d| earliest_in(tz, d.and_time(NaiveTime::MIN))),
      self.end.map(|d| latest_in(tz, d.and_time(end_of_day))),
    )
  }
}

fn parse_day(raw: &str) -> Result<Option<NaiveDate>> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Ok(None);
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .map(Some)
    .map_err(|_| Error::InvalidDate(raw.to_string()))
}

impl std::fmt::Display for DateRange {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let side = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
    write!(f, "{}..{}", side(self.start), side(self.end))
  }
}

/// Composable row filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
  pub from_country: Option<String>,
  pub to_country:   Option<String>,
  pub dates:        DateRange,
}

impl RowFilter {
  pub fn is_empty(&self) -> bool {
    self.from_country.is_none() && self.to_country.is_none() && self.dates.is_open()
  }

  /// A row without a valid date never satisfies an active date bound.
  pub fn matches_in<Tz: TimeZone>(&self, row: &ChangeRow, tz: &Tz) -> bool {
    if let Some(from) = &self.from_country
      && row.from_country_id.as_ref() != Some(from)
    {
      return false;
    }
    if let Some(to) = &self.to_country
      && row.to_country_id.as_ref() != Some(to)
    {
      return false;
    }
    if self.dates.is_open() {
      return true;
    }
    let Some(date) = row.date else {
      return false;
    };
    let (start, end) = self.dates.bounds_in(tz);
    start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e)
  }
}

/// Filter then sort: the sequence the table and the grouping operate on.
pub fn view_rows_in<Tz: TimeZone>(
  rows: impl IntoIterator<Item = ChangeRow>,
  filter: &RowFilter,
  order: SortOrder,
  tz: &Tz,
) -> Vec<ChangeRow> {
  let mut rows: Vec<_> = rows
    .into_iter()
    .filter(|row| filter.matches_in(row, tz))
    .collect();
  sort_rows(&mut rows, order);
  rows
}

pub fn view_rows(
  rows: impl IntoIterator<Item = ChangeRow>,
  filter: &RowFilter,
  order: SortOrder,
) -> Vec<ChangeRow> {
  view_rows_in(rows, filter, order, &Local)
}

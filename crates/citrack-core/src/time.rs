//! Timestamp parsing shared by the user and change models.

use chrono::{
  DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};

/// Zone-less layouts the upstream has been seen to emit.
const NAIVE_FORMATS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
];

/// Parse an upstream timestamp.
///
/// Accepts RFC 3339, integer milliseconds since the Unix epoch, and
/// zone-less date-times or bare dates, which are read as wall-clock time in
/// `tz`. Anything else, including the empty string, yields `None`.
pub fn parse_instant_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Utc>> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.with_timezone(&Utc));
  }
  if raw.bytes().all(|b| b.is_ascii_digit()) {
    return raw
      .parse::<i64>()
      .ok()
      .and_then(DateTime::from_timestamp_millis);
  }
  NAIVE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    .or_else(|| {
      NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
    })
    .map(|naive| earliest_in(tz, naive))
}

/// First instant at which `tz` shows the wall-clock time `naive`.
///
/// Falls back to reading `naive` as UTC when the local time does not exist
/// (a DST gap).
pub fn earliest_in<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
  match tz.from_local_datetime(&naive) {
    LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
    LocalResult::None => tz.from_utc_datetime(&naive).with_timezone(&Utc),
  }
}

/// Last instant at which `tz` shows the wall-clock time `naive`.
pub fn latest_in<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
  match tz.from_local_datetime(&naive) {
    LocalResult::Single(t) | LocalResult::Ambiguous(_, t) => t.with_timezone(&Utc),
    LocalResult::None => tz.from_utc_datetime(&naive).with_timezone(&Utc),
  }
}

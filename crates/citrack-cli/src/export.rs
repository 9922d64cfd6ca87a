//! Headless mode: run the tracker once and print the result as JSON.

use anyhow::Context as _;
use chrono::{Local, TimeZone};
use citrack_client::{
  ApiClient,
  tracker::{ChangeLog, FailedUser, Tracker, TrackerEvent, TrackerOptions, TrackerReport},
};
use citrack_core::{
  country::Country,
  filter::{RowFilter, view_rows_in},
  group::group_by_username,
  links::Links,
  row::{ChangeRow, SortOrder},
};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct Export {
  pub country:      Option<Country>,
  pub summary:      Summary,
  pub groups:       Vec<ExportGroup>,
  pub failed_users: Vec<FailedUser>,
  pub failed_logs:  Vec<FailedLog>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Summary {
  pub total_users: usize,
  pub active:      usize,
  pub inactive:    usize,
  pub rows_total:  usize,
  pub rows_shown:  usize,
}

#[derive(Debug, Serialize)]
pub struct ExportGroup {
  pub username:    String,
  pub user_id:     String,
  pub profile_url: String,
  pub rows:        Vec<ChangeRow>,
}

#[derive(Debug, Serialize)]
pub struct FailedLog {
  pub user_id:  String,
  pub username: String,
  pub error:    String,
}

/// Shape a finished report into the export document.
pub fn build_in<Tz: TimeZone>(
  report: &TrackerReport,
  country: Option<Country>,
  filter: &RowFilter,
  order: SortOrder,
  links: &Links,
  tz: &Tz,
) -> Export {
  let all = report.rows_in(tz);
  let rows_total = all.len();
  let shown = view_rows_in(all, filter, order, tz);
  let rows_shown = shown.len();

  let groups = group_by_username(shown)
    .into_iter()
    .map(|g| ExportGroup {
      profile_url: links.profile_url(&g.user_id),
      username:    g.username,
      user_id:     g.user_id,
      rows:        g.rows,
    })
    .collect();

  let failed_logs = report
    .players
    .iter()
    .filter_map(|p| match &p.changes {
      ChangeLog::Failed(error) => Some(FailedLog {
        user_id:  p.user.user_id.clone(),
        username: p.user.username.clone(),
        error:    error.clone(),
      }),
      _ => None,
    })
    .collect();

  Export {
    country,
    summary: Summary {
      total_users: report.progress.total,
      active: report.active,
      inactive: report.inactive,
      rows_total,
      rows_shown,
    },
    groups,
    failed_users: report.failed_users.clone(),
    failed_logs,
  }
}

/// Run the tracker for `country_id` and write the export to stdout.
pub async fn run(
  client: ApiClient,
  options: TrackerOptions,
  country_id: &str,
  filter: &RowFilter,
  order: SortOrder,
) -> anyhow::Result<()> {
  let country = client.get_country_by_id(country_id).await;
  let tracker = Tracker::new(client.clone(), options);

  let report = tracker
    .run(country_id, |event| {
      if let TrackerEvent::UserClassified { progress, user } = &event {
        info!(
          current = progress.current,
          total = progress.total,
          username = %user.username,
          active = user.active,
          "user classified"
        );
      }
    })
    .await
    .context("roster fetch failed")?;

  let export = build_in(&report, country, filter, order, client.links(), &Local);
  println!("{}", serde_json::to_string_pretty(&export)?);
  Ok(())
}

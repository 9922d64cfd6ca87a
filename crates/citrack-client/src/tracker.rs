//! The tracker pipeline: roster → per-user activity check → change logs.
//!
//! Requests go out strictly one at a time. Each step is reported as a
//! [`TrackerEvent`], and [`TrackerReport::apply`] folds those events into the
//! accumulated result, so a caller mirroring the stream of events ends up
//! with the same report the pipeline returns.

use chrono::{Local, TimeZone};
use citrack_core::{
  change::CitizenshipChange,
  page::Page,
  row::{ChangeRow, flatten_in},
  user::UserLite,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{ApiClient, DEFAULT_PAGE_SIZE, Result};

// ─── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerOptions {
  pub page_size:      u32,
  /// Walk every page of the roster and of each change log instead of
  /// reading only the first.
  pub follow_cursors: bool,
}

impl Default for TrackerOptions {
  fn default() -> Self {
    Self {
      page_size:      DEFAULT_PAGE_SIZE,
      follow_cursors: false,
    }
  }
}

// ─── Progress and per-player state ───────────────────────────────────────────

/// Users processed so far out of the roster size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
  pub current: usize,
  pub total:   usize,
}

impl Progress {
  pub fn ratio(&self) -> f64 {
    if self.total == 0 {
      0.0
    } else {
      self.current as f64 / self.total as f64
    }
  }
}

/// Change-log state of one active player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ChangeLog {
  Loading,
  Loaded(Vec<CitizenshipChange>),
  Failed(String),
}

impl ChangeLog {
  pub fn changes(&self) -> &[CitizenshipChange] {
    match self {
      Self::Loaded(changes) => changes,
      Self::Loading | Self::Failed(_) => &[],
    }
  }
}

/// An active player and their change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
  pub user:    UserLite,
  pub changes: ChangeLog,
}

/// A roster member whose lite record could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUser {
  pub user_id:  String,
  pub username: String,
  pub error:    String,
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
  RosterLoaded {
    total: usize,
  },
  UserClassified {
    progress: Progress,
    user:     UserLite,
  },
  UserFailed {
    progress: Progress,
    failed:   FailedUser,
  },
  ChangesLoaded {
    user_id: String,
    changes: Vec<CitizenshipChange>,
  },
  ChangesFailed {
    user_id: String,
    error:   String,
  },
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// Everything accumulated by one tracker run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerReport {
  pub country_id:   String,
  pub progress:     Progress,
  pub active:       usize,
  pub inactive:     usize,
  pub failed_users: Vec<FailedUser>,
  /// Active players only, in roster order.
  pub players:      Vec<PlayerRecord>,
}

impl TrackerReport {
  pub fn new(country_id: impl Into<String>) -> Self {
    Self {
      country_id: country_id.into(),
      ..Default::default()
    }
  }

  /// Fold one event into the report.
  pub fn apply(&mut self, event: &TrackerEvent) {
    match event {
      TrackerEvent::RosterLoaded { total } => {
        self.progress = Progress {
          current: 0,
          total:   *total,
        };
      }
      TrackerEvent::UserClassified { progress, user } => {
        self.progress = *progress;
        if user.active {
          self.active += 1;
          self.players.push(PlayerRecord {
            user:    user.clone(),
            changes: ChangeLog::Loading,
          });
        } else {
          self.inactive += 1;
        }
      }
      TrackerEvent::UserFailed { progress, failed } => {
        self.progress = *progress;
        self.failed_users.push(failed.clone());
      }
      TrackerEvent::ChangesLoaded { user_id, changes } => {
        if let Some(player) = self.player_mut(user_id) {
          player.changes = ChangeLog::Loaded(changes.clone());
        }
      }
      TrackerEvent::ChangesFailed { user_id, error } => {
        if let Some(player) = self.player_mut(user_id) {
          player.changes = ChangeLog::Failed(error.clone());
        }
      }
    }
  }

  fn player_mut(&mut self, user_id: &str) -> Option<&mut PlayerRecord> {
    self.players.iter_mut().rev().find(|p| p.user.user_id == user_id)
  }

  pub fn player(&self, user_id: &str) -> Option<&PlayerRecord> {
    self.players.iter().find(|p| p.user.user_id == user_id)
  }

  /// Players whose change log failed to load.
  pub fn failed_logs(&self) -> usize {
    self
      .players
      .iter()
      .filter(|p| matches!(p.changes, ChangeLog::Failed(_)))
      .count()
  }

  /// Flatten every loaded change into rows, in roster then log order.
  pub fn rows_in<Tz: TimeZone>(&self, tz: &Tz) -> Vec<ChangeRow> {
    self
      .players
      .iter()
      .flat_map(|p| flatten_in(&p.user, p.changes.changes(), tz))
      .collect()
  }

  pub fn rows(&self) -> Vec<ChangeRow> { self.rows_in(&Local) }
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

/// Drives one sequential run over a country's roster.
#[derive(Clone)]
pub struct Tracker {
  client:  ApiClient,
  options: TrackerOptions,
}

impl Tracker {
  pub fn new(client: ApiClient, options: TrackerOptions) -> Self { Self { client, options } }

  /// Run the pipeline for `country_id`, calling `on_event` after every step.
  ///
  /// Only a roster failure aborts the run. A user whose lite record cannot
  /// be fetched is recorded and skipped; a failed change log is recorded on
  /// that player.
  pub async fn run<F>(&self, country_id: &str, mut on_event: F) -> Result<TrackerReport>
  where
    F: FnMut(TrackerEvent),
  {
    let mut report = TrackerReport::new(country_id);
    let mut emit = |event: TrackerEvent, report: &mut TrackerReport| {
      report.apply(&event);
      on_event(event);
    };

    let roster = self.fetch_roster(country_id).await?;
    let total = roster.len();
    info!(country_id, total, "roster loaded");
    emit(TrackerEvent::RosterLoaded { total }, &mut report);

    for (index, member) in roster.into_iter().enumerate() {
      let progress = Progress {
        current: index + 1,
        total,
      };

      let user = match self.client.get_user_lite(&member.user_id).await {
        Ok(user) => user,
        Err(e) => {
          warn!(user_id = %member.user_id, error = %e, "user lookup failed, skipping");
          let failed = FailedUser {
            user_id:  member.user_id,
            username: member.username,
            error:    e.to_string(),
          };
          emit(TrackerEvent::UserFailed { progress, failed }, &mut report);
          continue;
        }
      };

      let active = user.active;
      let user_id = user.user_id.clone();
      emit(TrackerEvent::UserClassified { progress, user }, &mut report);
      if !active {
        continue;
      }

      let event = match self.fetch_changes(&user_id).await {
        Ok(changes) => {
          debug!(%user_id, count = changes.len(), "change log loaded");
          TrackerEvent::ChangesLoaded { user_id, changes }
        }
        Err(e) => {
          warn!(%user_id, error = %e, "change log fetch failed");
          TrackerEvent::ChangesFailed {
            user_id,
            error: e.to_string(),
          }
        }
      };
      emit(event, &mut report);
    }

    info!(
      country_id,
      active = report.active,
      inactive = report.inactive,
      failed = report.failed_users.len(),
      "tracker run finished"
    );
    Ok(report)
  }

  async fn fetch_roster(&self, country_id: &str) -> Result<Vec<UserLite>> {
    let limit = Some(self.options.page_size);
    let first = self.client.get_users_by_country(country_id, None, limit).await?;
    self
      .drain(first, |cursor| async move {
        self.client.get_users_by_country(country_id, Some(&cursor), limit).await
      })
      .await
  }

  async fn fetch_changes(&self, user_id: &str) -> Result<Vec<CitizenshipChange>> {
    let limit = self.options.page_size;
    let first = self
      .client
      .get_citizenship_changes_sized(user_id, None, limit)
      .await?;
    self
      .drain(first, |cursor| async move {
        self
          .client
          .get_citizenship_changes_sized(user_id, Some(&cursor), limit)
          .await
      })
      .await
  }

  /// Collect `first` and, when following cursors, every later page. Stops on
  /// a missing or repeated cursor.
  async fn drain<T, F, Fut>(&self, first: Page<T>, mut next: F) -> Result<Vec<T>>
  where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
  {
    let mut cursor = first.cursor().map(str::to_string);
    let mut items = first.items;
    if !self.options.follow_cursors {
      return Ok(items);
    }

    let mut seen = Vec::new();
    while let Some(c) = cursor.take() {
      if seen.contains(&c) {
        warn!(cursor = %c, "upstream repeated a cursor, stopping");
        break;
      }
      seen.push(c.clone());
      let page = next(c).await?;
      cursor = page.cursor().map(str::to_string);
      items.extend(page.items);
    }
    Ok(items)
  }
}

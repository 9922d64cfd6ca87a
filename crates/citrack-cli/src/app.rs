//! Application state machine and event dispatcher.

use citrack_client::{
  ApiClient,
  tracker::{Tracker, TrackerEvent, TrackerOptions, TrackerReport},
};
use citrack_core::{
  country::Country,
  filter::{DateRange, RowFilter, view_rows},
  group::{RowGroup, group_by_username},
  row::{ChangeRow, SortOrder, country_label},
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use tokio::sync::mpsc::{self, UnboundedReceiver, error::TryRecvError};
use tracing::info;

// ─── Screen ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  /// Country picker; right pane previews the country under the cursor.
  CountryList,
  /// Grouped change table for the current run.
  Overview,
  /// Timeline of the player selected in the overview.
  Timeline,
}

/// What the keyboard is currently typing into, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
  Normal,
  CountrySearch,
  Token,
  FromCountry,
  ToCountry,
  Dates,
}

impl InputMode {
  pub fn prompt(self) -> &'static str {
    match self {
      Self::Normal => "",
      Self::CountrySearch => "/",
      Self::Token => "Token: ",
      Self::FromCountry => "From country: ",
      Self::ToCountry => "To country: ",
      Self::Dates => "Dates (YYYY-MM-DD..YYYY-MM-DD): ",
    }
  }
}

// ─── Run ──────────────────────────────────────────────────────────────────────

/// Message from the background tracker task.
#[derive(Debug)]
pub enum RunMessage {
  Event(TrackerEvent),
  Finished,
  Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
  Running,
  Finished,
  Aborted(String),
}

/// A tracker run in progress or done, mirrored from its event stream.
pub struct Run {
  pub country: Country,
  pub report:  TrackerReport,
  pub status:  RunStatus,
  rx:          UnboundedReceiver<RunMessage>,
}

impl Run {
  /// Spawn the tracker for `country` and return the receiving side.
  ///
  /// There is no cancellation: dropping the run only stops listening.
  fn spawn(client: ApiClient, options: TrackerOptions, country: Country) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let tracker = Tracker::new(client, options);
    let country_id = country.country_id.clone();

    tokio::spawn(async move {
      let result = tracker
        .run(&country_id, |event| {
          let _ = tx.send(RunMessage::Event(event));
        })
        .await;
      let last = match result {
        Ok(_) => RunMessage::Finished,
        Err(e) => RunMessage::Aborted(e.to_string()),
      };
      let _ = tx.send(last);
    });

    Self {
      report: TrackerReport::new(country.country_id.clone()),
      country,
      status: RunStatus::Running,
      rx,
    }
  }

  /// Apply every message received since the last call.
  fn drain(&mut self) {
    loop {
      match self.rx.try_recv() {
        Ok(RunMessage::Event(event)) => self.report.apply(&event),
        Ok(RunMessage::Finished) => self.status = RunStatus::Finished,
        Ok(RunMessage::Aborted(message)) => self.status = RunStatus::Aborted(message),
        Err(TryRecvError::Empty) => break,
        Err(TryRecvError::Disconnected) => {
          if self.status == RunStatus::Running {
            self.status = RunStatus::Aborted("tracker task ended unexpectedly".into());
          }
          break;
        }
      }
    }
  }
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  /// Current screen / keyboard focus.
  pub screen: Screen,

  pub mode: InputMode,

  /// Text typed in the current input mode (not the country search).
  pub input: String,

  /// All countries, as loaded on startup.
  pub countries: Vec<Country>,

  /// Fuzzy query over the country list.
  pub country_filter: String,

  /// Cursor position within the *filtered* country list.
  pub country_cursor: usize,

  /// Country waiting for the token prompt to be answered before its run
  /// starts.
  pending_country: Option<Country>,

  pub run: Option<Run>,

  pub row_filter: RowFilter,

  pub sort: SortOrder,

  /// Cursor over the username groups of the overview.
  pub group_cursor: usize,

  pub timeline_scroll: usize,

  /// One-line status message shown in the status bar.
  pub status_msg: String,

  pub client: ApiClient,

  options: TrackerOptions,
}

impl App {
  pub fn new(client: ApiClient, options: TrackerOptions) -> Self {
    Self {
      screen: Screen::CountryList,
      mode: InputMode::Normal,
      input: String::new(),
      countries: Vec::new(),
      country_filter: String::new(),
      country_cursor: 0,
      pending_country: None,
      run: None,
      row_filter: RowFilter::default(),
      sort: SortOrder::default(),
      group_cursor: 0,
      timeline_scroll: 0,
      status_msg: String::new(),
      client,
      options,
    }
  }

  // ── Data loading ──────────────────────────────────────────────────────────

  /// Fetch the country list. Failures surface as an empty list.
  pub async fn load_countries(&mut self) {
    self.status_msg = "Loading countries…".into();
    let mut countries = self.client.get_all_countries().await;
    countries.sort_by(|a, b| a.name.cmp(&b.name));
    self.status_msg = if countries.is_empty() {
      "No countries loaded; check the log file.".into()
    } else {
      String::new()
    };
    self.countries = countries;
    self.country_cursor = 0;
  }

  /// Start tracking `country_id`, resolving it through the cache or the
  /// upstream lookup.
  pub async fn track_country_id(&mut self, country_id: &str) {
    let country = match self.countries.iter().find(|c| c.country_id == country_id) {
      Some(c) => Some(c.clone()),
      None => self.client.get_country_by_id(country_id).await,
    };
    match country {
      Some(country) => self.request_run(country),
      None => self.status_msg = format!("Unknown country {country_id}"),
    }
  }

  /// Ask for a token first when none is set, otherwise start right away.
  fn request_run(&mut self, country: Country) {
    if self.client.has_auth_token() {
      self.start_run(country);
    } else {
      self.pending_country = Some(country);
      self.begin_input(InputMode::Token);
    }
  }

  fn start_run(&mut self, country: Country) {
    info!(country_id = %country.country_id, name = %country.name, "starting tracker run");
    self.status_msg = format!("Tracking {}…", country.name);
    self.run = Some(Run::spawn(self.client.clone(), self.options, country));
    self.group_cursor = 0;
    self.timeline_scroll = 0;
    self.screen = Screen::Overview;
  }

  /// Pull pending tracker messages into the mirrored report.
  pub fn poll_run(&mut self) {
    let Some(run) = self.run.as_mut() else {
      return;
    };
    let was_running = run.status == RunStatus::Running;
    run.drain();
    if was_running {
      match &run.status {
        RunStatus::Running => {}
        RunStatus::Finished => self.status_msg = format!("Finished {}", run.country.name),
        RunStatus::Aborted(message) => self.status_msg = format!("Error: {message}"),
      }
    }
    let groups = self.groups().len();
    if groups > 0 && self.group_cursor >= groups {
      self.group_cursor = groups - 1;
    }
  }

  // ── Derived views ─────────────────────────────────────────────────────────

  /// Countries that match the fuzzy query.
  pub fn filtered_countries(&self) -> Vec<&Country> {
    if self.country_filter.is_empty() {
      return self.countries.iter().collect();
    }
    let matcher = SkimMatcherV2::default();
    self
      .countries
      .iter()
      .filter(|c| {
        matcher.fuzzy_match(&c.name, &self.country_filter).is_some()
          || c
            .code
            .as_deref()
            .is_some_and(|code| code.eq_ignore_ascii_case(&self.country_filter))
      })
      .collect()
  }

  /// The country under the list cursor, if any.
  pub fn cursor_country(&self) -> Option<&Country> {
    self.filtered_countries().get(self.country_cursor).copied()
  }

  /// Filtered, sorted rows of the current run.
  pub fn rows(&self) -> Vec<ChangeRow> {
    match &self.run {
      Some(run) => view_rows(run.report.rows(), &self.row_filter, self.sort),
      None => Vec::new(),
    }
  }

  pub fn total_rows(&self) -> usize {
    self.run.as_ref().map_or(0, |run| run.report.rows().len())
  }

  pub fn groups(&self) -> Vec<RowGroup> { group_by_username(self.rows()) }

  pub fn selected_group(&self) -> Option<RowGroup> {
    self.groups().into_iter().nth(self.group_cursor)
  }

  /// Display name for a country end of a row.
  pub fn country_label(&self, id: Option<&str>, name: Option<&str>) -> String {
    country_label(id, name, |id| {
      self.client.cached_country(id).map(|c| c.name)
    })
  }

  /// Map a typed reference (id, name or code) to a country identifier.
  fn resolve_country(&self, reference: &str) -> String {
    self
      .countries
      .iter()
      .find(|c| c.matches_reference(reference))
      .map(|c| c.country_id.clone())
      .unwrap_or_else(|| reference.trim().to_string())
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    // Global: Ctrl-C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Ok(false);
    }

    match self.mode {
      InputMode::Normal => {}
      InputMode::CountrySearch => {
        self.handle_search_key(key);
        return Ok(true);
      }
      _ => {
        self.handle_input_key(key);
        return Ok(true);
      }
    }

    match self.screen {
      Screen::CountryList => Ok(self.handle_list_key(key)),
      Screen::Overview => Ok(self.handle_overview_key(key)),
      Screen::Timeline => Ok(self.handle_timeline_key(key)),
    }
  }

  fn begin_input(&mut self, mode: InputMode) {
    self.mode = mode;
    self.input.clear();
  }

  fn handle_search_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = InputMode::Normal;
        self.country_filter.clear();
        self.country_cursor = 0;
      }
      KeyCode::Enter => {
        self.mode = InputMode::Normal;
        self.country_cursor = 0;
        // Start right away if there's exactly one match.
        let only = match self.filtered_countries().as_slice() {
          [one] => Some((*one).clone()),
          _ => None,
        };
        if let Some(country) = only {
          self.request_run(country);
        }
      }
      KeyCode::Backspace => {
        self.country_filter.pop();
        self.country_cursor = 0;
      }
      KeyCode::Char(c) => {
        self.country_filter.push(c);
        self.country_cursor = 0;
      }
      _ => {}
    }
  }

  fn handle_input_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        if self.mode == InputMode::Token {
          self.pending_country = None;
        }
        self.mode = InputMode::Normal;
        self.input.clear();
      }
      KeyCode::Enter => {
        let mode = self.mode;
        let input = std::mem::take(&mut self.input);
        self.mode = InputMode::Normal;
        self.submit_input(mode, &input);
      }
      KeyCode::Backspace => {
        self.input.pop();
      }
      KeyCode::Char(c) => self.input.push(c),
      _ => {}
    }
  }

  fn submit_input(&mut self, mode: InputMode, input: &str) {
    match mode {
      InputMode::Normal | InputMode::CountrySearch => {}
      InputMode::Token => {
        self.client.set_auth_token(input);
        self.status_msg = if self.client.has_auth_token() {
          "Token set.".into()
        } else {
          "No token: change logs will not load.".into()
        };
        if let Some(country) = self.pending_country.take() {
          self.start_run(country);
        }
      }
      InputMode::FromCountry => {
        let id = (!input.trim().is_empty()).then(|| self.resolve_country(input));
        self.row_filter.from_country = id;
        self.group_cursor = 0;
      }
      InputMode::ToCountry => {
        let id = (!input.trim().is_empty()).then(|| self.resolve_country(input));
        self.row_filter.to_country = id;
        self.group_cursor = 0;
      }
      InputMode::Dates => match DateRange::parse(input) {
        Ok(range) => {
          self.row_filter.dates = range;
          self.group_cursor = 0;
        }
        Err(e) => self.status_msg = format!("Error: {e}"),
      },
    }
  }

  fn handle_list_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      // Quit
      KeyCode::Char('q') => return false,

      // Navigation
      KeyCode::Down | KeyCode::Char('j') => {
        let len = self.filtered_countries().len();
        if len > 0 && self.country_cursor + 1 < len {
          self.country_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.country_cursor = self.country_cursor.saturating_sub(1);
      }

      // Track
      KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
        if let Some(country) = self.cursor_country().cloned() {
          self.request_run(country);
        }
      }

      // Back to a run still in memory
      KeyCode::Tab if self.run.is_some() => self.screen = Screen::Overview,

      // Filter
      KeyCode::Char('/') => {
        self.mode = InputMode::CountrySearch;
        self.country_filter.clear();
        self.country_cursor = 0;
      }

      KeyCode::Char('T') => self.begin_input(InputMode::Token),

      _ => {}
    }
    true
  }

  fn handle_overview_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Char('q') => return false,

      KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => {
        self.screen = Screen::CountryList;
      }

      KeyCode::Down | KeyCode::Char('j') => {
        let len = self.groups().len();
        if len > 0 && self.group_cursor + 1 < len {
          self.group_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.group_cursor = self.group_cursor.saturating_sub(1);
      }

      KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
        if self.selected_group().is_some() {
          self.timeline_scroll = 0;
          self.screen = Screen::Timeline;
        }
      }

      // Sort and filters
      KeyCode::Char('s') => self.sort = self.sort.toggle(),
      KeyCode::Char('f') => self.begin_input(InputMode::FromCountry),
      KeyCode::Char('t') => self.begin_input(InputMode::ToCountry),
      KeyCode::Char('d') => self.begin_input(InputMode::Dates),
      KeyCode::Char('c') => {
        self.row_filter = RowFilter::default();
        self.group_cursor = 0;
      }

      // Re-run the current country
      KeyCode::Char('r') => {
        if let Some(country) = self.run.as_ref().map(|r| r.country.clone()) {
          self.request_run(country);
        }
      }

      KeyCode::Char('T') => self.begin_input(InputMode::Token),

      _ => {}
    }
    true
  }

  fn handle_timeline_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Char('q') => return false,

      KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => {
        self.screen = Screen::Overview;
      }

      KeyCode::Down | KeyCode::Char('j') => {
        let len = self.selected_group().map_or(0, |g| g.rows.len());
        if self.timeline_scroll + 1 < len {
          self.timeline_scroll += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.timeline_scroll = self.timeline_scroll.saturating_sub(1);
      }

      // Quick switching between players
      KeyCode::Char(']') | KeyCode::PageDown => {
        let len = self.groups().len();
        if len > 0 && self.group_cursor + 1 < len {
          self.group_cursor += 1;
          self.timeline_scroll = 0;
        }
      }
      KeyCode::Char('[') | KeyCode::PageUp => {
        if self.group_cursor > 0 {
          self.group_cursor -= 1;
          self.timeline_scroll = 0;
        }
      }

      _ => {}
    }
    true
  }
}

#[cfg(test)]
mod tests {
  use citrack_client::{
    ApiConfig,
    tracker::{PlayerRecord, Progress},
  };
  use citrack_core::{
    change::{ChangeDetails, CitizenshipChange},
    user::UserLite,
  };
  use crossterm::event::KeyEventKind;

  use super::*;

  fn key(code: KeyCode) -> KeyEvent { KeyEvent::new(code, KeyModifiers::NONE) }

  fn country(id: &str, name: &str, code: &str) -> Country {
    Country {
      country_id: id.into(),
      name:       name.into(),
      code:       Some(code.into()),
      flag_url:   None,
    }
  }

  fn change(id: &str, from: &str, to: &str, at: &str) -> CitizenshipChange {
    CitizenshipChange {
      change_id:  id.into(),
      user_id:    None,
      country_id: None,
      created_at: Some(at.into()),
      timestamp:  None,
      details:    ChangeDetails {
        from_country_id: Some(from.into()),
        to_country_id: Some(to.into()),
        ..Default::default()
      },
    }
  }

  fn player(id: &str, name: &str, changes: Vec<CitizenshipChange>) -> PlayerRecord {
    PlayerRecord {
      user:    UserLite {
        user_id:            id.into(),
        username:           name.into(),
        last_connection_at: None,
        active:             true,
      },
      changes: citrack_client::tracker::ChangeLog::Loaded(changes),
    }
  }

  /// An app holding a finished run, without any network behind it.
  fn app_with_run() -> App {
    let client = ApiClient::new(ApiConfig::default()).unwrap();
    let mut app = App::new(client, TrackerOptions::default());
    app.countries = vec![country("fr", "France", "FR"), country("es", "Spain", "ES")];
    let (_tx, rx) = mpsc::unbounded_channel();
    let mut report = TrackerReport::new("fr");
    report.progress = Progress { current: 2, total: 2 };
    report.players = vec![
      player("u1", "alice", vec![
        change("a1", "fr", "es", "2024-01-01T00:00:00Z"),
        change("a2", "es", "fr", "2024-03-01T00:00:00Z"),
      ]),
      player("u2", "bob", vec![change("b1", "fr", "es", "2024-02-01T00:00:00Z")]),
    ];
    app.run = Some(Run {
      country: app.countries[0].clone(),
      report,
      status: RunStatus::Finished,
      rx,
    });
    app.screen = Screen::Overview;
    app
  }

  async fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
      app.handle_key(key(KeyCode::Char(c))).await.unwrap();
    }
    app.handle_key(key(KeyCode::Enter)).await.unwrap();
  }

  #[tokio::test]
  async fn groups_follow_sorted_order() {
    let mut app = app_with_run();
    let names: Vec<_> = app.groups().into_iter().map(|g| g.username).collect();
    assert_eq!(names, ["alice", "bob"]);

    app.handle_key(key(KeyCode::Char('s'))).await.unwrap();
    assert_eq!(app.sort, SortOrder::Descending);
    let first: Vec<_> = app.rows().into_iter().map(|r| r.change_id).collect();
    assert_eq!(first, ["a2", "b1", "a1"]);
  }

  #[tokio::test]
  async fn from_filter_resolves_country_names() {
    let mut app = app_with_run();
    app.handle_key(key(KeyCode::Char('f'))).await.unwrap();
    assert_eq!(app.mode, InputMode::FromCountry);
    type_text(&mut app, "france").await;
    assert_eq!(app.row_filter.from_country.as_deref(), Some("fr"));
    assert_eq!(app.rows().len(), 2);
    assert_eq!(app.total_rows(), 3);

    app.handle_key(key(KeyCode::Char('c'))).await.unwrap();
    assert!(app.row_filter.is_empty());
  }

  #[tokio::test]
  async fn bad_date_input_keeps_previous_filter() {
    let mut app = app_with_run();
    app.handle_key(key(KeyCode::Char('d'))).await.unwrap();
    type_text(&mut app, "2024-02-30").await;
    assert!(app.row_filter.dates.is_open());
    assert!(app.status_msg.starts_with("Error"));
  }

  #[tokio::test]
  async fn timeline_navigation() {
    let mut app = app_with_run();
    app.handle_key(key(KeyCode::Enter)).await.unwrap();
    assert_eq!(app.screen, Screen::Timeline);
    app.handle_key(key(KeyCode::Char(']'))).await.unwrap();
    assert_eq!(app.selected_group().unwrap().username, "bob");
    app.handle_key(key(KeyCode::Esc)).await.unwrap();
    assert_eq!(app.screen, Screen::Overview);
  }

  #[tokio::test]
  async fn tracking_without_token_prompts_first() {
    let mut app = app_with_run();
    app.screen = Screen::CountryList;
    app.run = None;
    app.handle_key(key(KeyCode::Enter)).await.unwrap();
    assert_eq!(app.mode, InputMode::Token);
    assert!(app.run.is_none());

    app.handle_key(key(KeyCode::Esc)).await.unwrap();
    assert_eq!(app.mode, InputMode::Normal);
    assert!(app.run.is_none());
  }

  #[tokio::test]
  async fn country_search_narrows_list() {
    let mut app = app_with_run();
    app.screen = Screen::CountryList;
    app.handle_key(key(KeyCode::Char('/'))).await.unwrap();
    app.handle_key(key(KeyCode::Char('s'))).await.unwrap();
    app.handle_key(key(KeyCode::Char('p'))).await.unwrap();
    let names: Vec<_> = app.filtered_countries().iter().map(|c| c.name.clone()).collect();
    assert_eq!(names, ["Spain"]);
  }

  #[tokio::test]
  async fn ctrl_c_quits() {
    let mut app = app_with_run();
    let quit = KeyEvent {
      kind: KeyEventKind::Press,
      ..KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
    };
    assert!(!app.handle_key(quit).await.unwrap());
  }
}

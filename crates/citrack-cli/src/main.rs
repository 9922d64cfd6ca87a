//! `citrack` — terminal UI tracking citizenship changes of a country's
//! active players.
//!
//! # Usage
//!
//! ```
//! citrack --token "$TOKEN"
//! citrack --config ~/.config/citrack.toml --country 6813b6d546e731854c7ac8a5
//! citrack --json --country 6813b6d546e731854c7ac8a5 --dates 2025-01-01..
//! ```

mod app;
mod config;
mod export;
mod ui;

use std::{
  io,
  path::{Path, PathBuf},
  sync::Mutex,
  time::Duration,
};

use anyhow::{Context, Result};
use app::App;
use citrack_client::ApiClient;
use citrack_core::{
  filter::{DateRange, RowFilter},
  row::SortOrder,
};
use clap::Parser;
use config::{Overrides, Settings};
use crossterm::{
  event::{self, Event, KeyEventKind},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "citrack", version, about = "Track citizenship changes of a country's active players")]
struct Args {
  /// Path to a TOML config file. Missing is fine.
  #[arg(short, long, value_name = "FILE", default_value = "citrack.toml")]
  config: PathBuf,

  /// Base URL of the upstream API.
  #[arg(long, env = "CITRACK_URL")]
  url: Option<String>,

  /// Authorization token for the change-log endpoint.
  #[arg(long, env = "CITRACK_TOKEN", hide_env_values = true)]
  token: Option<String>,

  /// Country identifier to track immediately.
  #[arg(long, value_name = "ID")]
  country: Option<String>,

  /// Print the result as JSON instead of opening the UI.
  #[arg(long, requires = "country")]
  json: bool,

  /// Follow pagination cursors for the roster and every change log.
  #[arg(long)]
  all_pages: bool,

  /// Log file for the UI (headless mode logs to stderr).
  #[arg(long, value_name = "FILE")]
  log_file: Option<PathBuf>,

  /// Headless only: keep changes leaving this country id.
  #[arg(long, value_name = "ID", requires = "json")]
  from_country: Option<String>,

  /// Headless only: keep changes joining this country id.
  #[arg(long, value_name = "ID", requires = "json")]
  to_country: Option<String>,

  /// Headless only: date range `START..END`, either side optional.
  #[arg(long, value_name = "RANGE", requires = "json")]
  dates: Option<String>,

  /// Headless only: newest changes first.
  #[arg(long, requires = "json")]
  desc: bool,
}

// ─── Logging ──────────────────────────────────────────────────────────────────

/// Install the global subscriber. The UI owns the terminal, so it logs to a
/// file; headless runs log to stderr so stdout stays pure JSON.
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .from_env_lossy();

  match log_file {
    Some(path) => {
      let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    }
  }
  Ok(())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // Flags override environment, which overrides the file and the defaults.
  let settings = Settings::load(&args.config)?.apply(Overrides {
    base_url:       args.url.clone(),
    follow_cursors: args.all_pages,
    log_file:       args.log_file.clone(),
  });

  init_tracing((!args.json).then_some(settings.log_file.as_path()))?;

  let client = ApiClient::new(settings.api_config()).context("creating API client")?;
  if let Some(token) = &args.token {
    client.set_auth_token(token.as_str());
  }
  let options = settings.tracker_options();

  if args.json {
    let country_id = args.country.as_deref().unwrap_or_default();
    let filter = RowFilter {
      from_country: args.from_country.clone(),
      to_country:   args.to_country.clone(),
      dates:        DateRange::parse(args.dates.as_deref().unwrap_or_default())?,
    };
    let order = if args.desc { SortOrder::Descending } else { SortOrder::Ascending };
    return export::run(client, options, country_id, &filter, order).await;
  }

  let mut app = App::new(client, options);

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // Load initial data.
  app.load_countries().await;
  if let Some(country_id) = &args.country {
    app.track_country_id(country_id).await;
  }

  // Run the event loop; restore terminal even on error.
  let run_result = run_event_loop(&mut terminal, &mut app).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
) -> Result<()> {
  loop {
    app.poll_run();
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    match maybe_event {
      Some(Event::Key(key)) if key.kind == KeyEventKind::Press => {
        if !app.handle_key(key).await? {
          break;
        }
      }
      // Resizes redraw on the next iteration.
      _ => {}
    }
  }

  Ok(())
}

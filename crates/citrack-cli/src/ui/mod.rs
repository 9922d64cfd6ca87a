//! TUI rendering — orchestrates all panes.

pub mod country_list;
pub mod overview;
pub mod progress;
pub mod timeline;

use chrono::Local;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};

use crate::app::{App, InputMode, Screen};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
  let area = f.area();

  // Vertical stack: header, body, status bar.
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0], app);
  draw_body(f, rows[1], app);
  draw_status(f, rows[2], app);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let date = Local::now().format("%Y-%m-%d").to_string();
  let token = if app.client.has_auth_token() { "token ✓" } else { "no token" };

  let title = match &app.run {
    Some(run) => format!(" citrack · {}", run.country.label()),
    None => " citrack".to_string(),
  };
  let left = Span::styled(
    title,
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let right = Span::styled(
    format!("{token}  {date} "),
    Style::default().fg(Color::Gray),
  );

  // Simple left-right header: pad the middle.
  let left_width = left.width() as u16;
  let right_width = right.width() as u16;
  let pad = area
    .width
    .saturating_sub(left_width)
    .saturating_sub(right_width);

  let line = Line::from(vec![
    left,
    Span::raw(" ".repeat(pad as usize)),
    right,
  ]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Body ─────────────────────────────────────────────────────────────────────

fn draw_body(f: &mut Frame, area: Rect, app: &App) {
  // Split into left pane (30%) and right pane (70%).
  let cols = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
    .split(area);

  match app.screen {
    Screen::CountryList => {
      country_list::draw(f, cols[0], app);
      country_list::draw_preview(f, cols[1], app);
    }
    Screen::Overview => {
      progress::draw(f, cols[0], app);
      overview::draw(f, cols[1], app);
    }
    Screen::Timeline => {
      progress::draw(f, cols[0], app);
      timeline::draw(f, cols[1], app);
    }
  }
}

/// A bordered pane with a dim one-line hint, for empty states.
pub(crate) fn draw_hint(f: &mut Frame, area: Rect, title: &str, hint: &str) {
  let block = Block::default()
    .title(format!(" {title} "))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(
    Paragraph::new(hint.to_string()).style(Style::default().fg(Color::DarkGray)),
    inner,
  );
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let (mode_label, hints) = match (&app.screen, app.mode) {
    (Screen::CountryList, InputMode::CountrySearch) => (
      "SEARCH",
      "Type to filter  Esc cancel  Enter select",
    ),
    (_, InputMode::Normal) => match app.screen {
      Screen::CountryList => (
        "NORMAL",
        "↑↓/jk navigate  / search  Enter track  Tab overview  T token  q quit",
      ),
      Screen::Overview => (
        "OVERVIEW",
        "↑↓ player  Enter timeline  s sort  f/t/d filter  c clear  r rerun  Esc back",
      ),
      Screen::Timeline => (
        "TIMELINE",
        "↑↓/jk scroll  [ prev  ] next  Esc back  q quit",
      ),
    },
    _ => ("INPUT", "Enter confirm  Esc cancel"),
  };

  let status = match app.mode {
    InputMode::Normal | InputMode::CountrySearch if app.status_msg.is_empty() => {
      hints.to_string()
    }
    InputMode::Normal | InputMode::CountrySearch => app.status_msg.clone(),
    // Never echo the token.
    InputMode::Token => format!("{}{}_", app.mode.prompt(), "*".repeat(app.input.chars().count())),
    mode => format!("{}{}_", mode.prompt(), app.input),
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(
    format!("  {status}"),
    Style::default().fg(Color::Gray),
  );

  let line = Line::from(vec![mode_span, hint_span]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}

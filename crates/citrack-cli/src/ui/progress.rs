//! Run progress — left panel on the tracker screens.

use citrack_client::tracker::ChangeLog;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};

use crate::app::{App, RunStatus};

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let Some(run) = &app.run else {
    super::draw_hint(f, area, "Run", "No run yet.");
    return;
  };
  let report = &run.report;

  let block = Block::default()
    .title(" Run ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let parts = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Min(0)])
    .split(inner);

  let (color, state) = match &run.status {
    RunStatus::Running => (Color::Cyan, "running"),
    RunStatus::Finished => (Color::Green, "done"),
    RunStatus::Aborted(_) => (Color::Red, "aborted"),
  };
  let gauge = Gauge::default()
    .gauge_style(Style::default().fg(color).bg(Color::Black))
    .ratio(report.progress.ratio().clamp(0.0, 1.0))
    .label(format!(
      "{}/{} {state}",
      report.progress.current, report.progress.total
    ));
  f.render_widget(gauge, parts[0]);

  let mut lines = vec![
    Line::from(vec![
      Span::styled(format!("{} active", report.active), Style::default().fg(Color::Green)),
      Span::raw("  "),
      Span::styled(
        format!("{} inactive", report.inactive),
        Style::default().fg(Color::DarkGray),
      ),
    ]),
    Line::from(""),
  ];

  if let RunStatus::Aborted(message) = &run.status {
    lines.push(Line::from(Span::styled(
      message.clone(),
      Style::default().fg(Color::Red),
    )));
    lines.push(Line::from(""));
  }

  // Active players and the state of their logs.
  for player in &report.players {
    let (badge, style) = match &player.changes {
      ChangeLog::Loading => ("…".to_string(), Style::default().fg(Color::Yellow)),
      ChangeLog::Loaded(changes) => (changes.len().to_string(), Style::default()),
      ChangeLog::Failed(_) => ("!".to_string(), Style::default().fg(Color::Red)),
    };
    lines.push(Line::from(vec![
      Span::styled(format!("{badge:>4} "), style.add_modifier(Modifier::BOLD)),
      Span::raw(player.user.username.clone()),
    ]));
  }

  if !report.failed_users.is_empty() {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
      format!("{} lookups failed", report.failed_users.len()),
      Style::default().fg(Color::Red),
    )));
    for failed in &report.failed_users {
      let name = if failed.username.is_empty() { &failed.user_id } else { &failed.username };
      lines.push(Line::from(Span::styled(
        format!("  {name}"),
        Style::default().fg(Color::DarkGray),
      )));
    }
  }

  // parts[1] is a spacer under the gauge.
  f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), parts[2]);
}

//! Player timeline — right panel, one player's changes oldest first.

use citrack_client::tracker::ChangeLog;
use citrack_core::row::{ChangeRow, SortOrder, sort_rows};
use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};

use crate::app::App;

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let Some(group) = app.selected_group() else {
    super::draw_hint(f, area, "Timeline", "No player selected.");
    return;
  };

  let block = Block::default()
    .title(format!(" {} ", group.username))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let player = app
    .run
    .as_ref()
    .and_then(|run| run.report.player(&group.user_id));

  let dim = Style::default().fg(Color::DarkGray);
  let mut lines = vec![Line::from(Span::styled(
    app.client.links().profile_url(&group.user_id),
    dim,
  ))];
  if let Some(player) = player {
    let seen = player
      .user
      .last_connection_at
      .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
      .unwrap_or_else(|| "never".into());
    lines.push(Line::from(Span::styled(format!("last seen {seen}"), dim)));
    if let ChangeLog::Failed(error) = &player.changes {
      lines.push(Line::from(Span::styled(
        format!("change log failed: {error}"),
        Style::default().fg(Color::Red),
      )));
    }
  }
  lines.push(Line::from(""));
  let header_lines = lines.len();

  // The timeline always reads oldest first, whatever the table order.
  let mut rows: Vec<ChangeRow> = group.rows;
  sort_rows(&mut rows, SortOrder::Ascending);

  let last = rows.len().saturating_sub(1);
  for (i, row) in rows.iter().enumerate() {
    let from = app.country_label(row.from_country_id.as_deref(), row.from_country_name.as_deref());
    let to = app.country_label(row.to_country_id.as_deref(), row.to_country_name.as_deref());
    lines.push(Line::from(vec![
      Span::styled("● ", Style::default().fg(Color::Cyan)),
      Span::styled(
        format!("{:<17}", row.date_label()),
        Style::default().add_modifier(Modifier::BOLD),
      ),
      Span::raw(from),
      Span::styled(" → ", Style::default().fg(Color::Yellow)),
      Span::raw(to),
    ]));
    if i < last {
      lines.push(Line::from(Span::styled("│", Style::default().fg(Color::Cyan))));
    }
  }

  // Each change takes two lines; keep the scroll on change boundaries.
  let scroll = if app.timeline_scroll == 0 { 0 } else { header_lines + app.timeline_scroll * 2 };
  f.render_widget(Paragraph::new(lines).scroll((scroll as u16, 0)), inner);
}

//! Overview table — right panel, changes grouped by player.

use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
};

use crate::app::App;

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let groups = app.groups();
  let shown: usize = groups.iter().map(|g| g.rows.len()).sum();

  let block = Block::default()
    .title(format!(
      " Changes ({shown}/{}) date {} ",
      app.total_rows(),
      app.sort.arrow()
    ))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let parts = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Length(1), Constraint::Min(0)])
    .split(inner);
  f.render_widget(Paragraph::new(filter_line(app)), parts[0]);

  if groups.is_empty() {
    f.render_widget(
      Paragraph::new("No citizenship changes to show.").style(Style::default().fg(Color::DarkGray)),
      parts[1],
    );
    return;
  }

  let selected = Style::default().bg(Color::Blue).fg(Color::White);
  let mut rows = Vec::with_capacity(shown);
  let mut first_selected_row = 0;

  for (index, group) in groups.iter().enumerate() {
    let is_cursor = index == app.group_cursor;
    if is_cursor {
      first_selected_row = rows.len();
    }
    for (n, row) in group.rows.iter().enumerate() {
      let player = if n == 0 { group.username.clone() } else { String::new() };
      let style = if is_cursor { selected } else { Style::default() };
      rows.push(
        Row::new(vec![
          Cell::from(player).style(Style::default().add_modifier(Modifier::BOLD)),
          Cell::from(row.date_label()),
          Cell::from(app.country_label(row.from_country_id.as_deref(), row.from_country_name.as_deref())),
          Cell::from(app.country_label(row.to_country_id.as_deref(), row.to_country_name.as_deref())),
        ])
        .style(style),
      );
    }
  }

  let header = Row::new(vec!["Player", "Date", "From", "To"]).style(
    Style::default()
      .fg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let table = Table::new(
    rows,
    [
      Constraint::Percentage(25),
      Constraint::Length(17),
      Constraint::Percentage(30),
      Constraint::Percentage(30),
    ],
  )
  .header(header);

  let mut state = TableState::default().with_selected(Some(first_selected_row));
  f.render_stateful_widget(table, parts[1], &mut state);
}

/// One line summarising the active filters.
fn filter_line(app: &App) -> Line<'static> {
  let filter = &app.row_filter;
  if filter.is_empty() {
    return Line::from(Span::styled(
      "no filters",
      Style::default().fg(Color::DarkGray),
    ));
  }

  let mut spans = Vec::new();
  let mut push = |label: &str, value: String| {
    spans.push(Span::styled(format!("{label} "), Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(format!("{value}  "), Style::default().fg(Color::Yellow)));
  };
  if let Some(from) = &filter.from_country {
    push("from", app.country_label(Some(from), None));
  }
  if let Some(to) = &filter.to_country {
    push("to", app.country_label(Some(to), None));
  }
  if !filter.dates.is_open() {
    push("dates", filter.dates.to_string());
  }
  Line::from(spans)
}

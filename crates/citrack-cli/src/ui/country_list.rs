//! Country picker — left panel, with a preview of the country under the
//! cursor on the right.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::app::{App, InputMode};

/// Render the country list into `area`.
pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let filtered = app.filtered_countries();
  let total = app.countries.len();
  let searching = app.mode == InputMode::CountrySearch;

  // Title with count.
  let title = if searching || !app.country_filter.is_empty() {
    format!(" Countries ({}/{}) ", filtered.len(), total)
  } else {
    format!(" Countries ({}) ", total)
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let items: Vec<ListItem> = filtered
    .iter()
    .map(|country| {
      let code = country.code.as_deref().unwrap_or("··").to_uppercase();
      ListItem::new(Line::from(vec![
        Span::styled(format!("{code:<3}"), Style::default().fg(Color::DarkGray)),
        Span::raw(country.name.clone()),
      ]))
    })
    .collect();

  let mut inner_area = block.inner(area);
  f.render_widget(block, area);

  // Search bar on the last line while a query is typed or set.
  if (searching || !app.country_filter.is_empty()) && inner_area.height > 2 {
    let filter_area = Rect {
      x:      inner_area.x,
      y:      inner_area.y + inner_area.height - 1,
      width:  inner_area.width,
      height: 1,
    };
    inner_area.height = inner_area.height.saturating_sub(1);

    let filter_text = if searching {
      format!("/{}_", app.country_filter)
    } else {
      format!("/{}", app.country_filter)
    };
    f.render_widget(
      Paragraph::new(filter_text).style(Style::default().fg(Color::Yellow)),
      filter_area,
    );
  }

  let mut state = ListState::default();
  state.select(if filtered.is_empty() {
    None
  } else {
    Some(app.country_cursor)
  });

  f.render_stateful_widget(
    List::new(items).highlight_style(
      Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD),
    ),
    inner_area,
    &mut state,
  );
}

/// Render details of the country under the cursor.
pub fn draw_preview(f: &mut Frame, area: Rect, app: &App) {
  let Some(country) = app.cursor_country() else {
    super::draw_hint(f, area, "Country", "No countries to show.");
    return;
  };

  let block = Block::default()
    .title(format!(" {} ", country.name))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let label = |text: &str| {
    Span::styled(
      format!("{text:<10}"),
      Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD),
    )
  };

  let mut lines = vec![
    Line::from(vec![label("id"), Span::raw(country.country_id.clone())]),
    Line::from(vec![
      label("code"),
      Span::raw(country.code.clone().unwrap_or_else(|| "—".into())),
    ]),
  ];
  if let Some(flag) = &country.flag_url {
    lines.push(Line::from(vec![label("flag"), Span::raw(flag.clone())]));
  }
  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(
    "Enter to track citizenship changes of this country's active players.",
    Style::default().fg(Color::DarkGray),
  )));

  f.render_widget(Paragraph::new(lines), inner);
}

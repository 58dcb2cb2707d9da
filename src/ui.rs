use crate::app::{App, DateField, ErrorModal, Focus};
use crate::braille::BrailleCanvas;
use crate::color::Rgb;
use crate::map::{Legend, Lod, MapLayers, Popup};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Widget, Wrap},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 36;
const CONTROLS_HEIGHT: u16 = 14;

/// Screen regions
pub struct UiLayout {
    pub sidebar: Rect,
    /// Map area inside its border
    pub map: Rect,
    pub status: Rect,
}

pub fn layout(area: Rect) -> UiLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Sidebar + map
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
        .split(rows[0]);

    UiLayout {
        sidebar: columns[0],
        map: map_block(false).inner(columns[1]),
        status: rows[1],
    }
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let regions = layout(area);

    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(CONTROLS_HEIGHT), Constraint::Min(3)])
        .split(regions.sidebar);

    render_controls(frame, app, sidebar[0]);
    render_legend(frame, app, sidebar[1]);
    render_map(frame, app, regions.map);
    render_status_bar(frame, app, regions.status);

    if app.focus == Focus::Resource && !app.autocomplete.suggestions().is_empty() {
        render_suggestions(frame, app, sidebar[0], area);
    }
    if let Some(popup) = &app.popup {
        render_popup(frame, popup, regions.map);
    }
    if let Some(modal) = &app.error {
        render_error(frame, modal, area);
    }
}

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

fn map_block(loading: bool) -> Block<'static> {
    let title = if loading { " World Map · loading… " } else { " World Map " };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Style of a sidebar control given focus and availability
fn control_style(focused: bool, enabled: bool) -> Style {
    match (focused, enabled) {
        (_, false) => Style::default().fg(Color::DarkGray),
        (true, true) => Style::default().fg(Color::Black).bg(Color::Cyan),
        (false, true) => Style::default().fg(Color::White),
    }
}

fn control_line<'a>(label: &'a str, value: String, focused: bool, enabled: bool) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{:<10}", label), Style::default().fg(Color::DarkGray)),
        Span::styled(value, control_style(focused, enabled)),
    ])
}

fn render_controls(frame: &mut Frame, app: &App, area: Rect) {
    let availability = app.availability();
    let focus = app.focus;

    let resource_value = if app.autocomplete.input().is_empty() {
        format!("[{:<20}]", "type 3+ letters")
    } else {
        format!("[{:<20}]", app.autocomplete.input())
    };
    let date_value = |field: DateField| {
        let text = app.date_input(field);
        format!("[{:<10}]", if text.is_empty() { "YYYY-MM-DD" } else { text })
    };

    let mut lines = vec![
        control_line(
            "Type",
            format!("◂ {} ▸", app.selection.resource_type()),
            focus == Focus::ResourceType,
            availability.resource_type,
        ),
        control_line(
            "Mode",
            format!("◂ {} ▸", app.selection.mode()),
            focus == Focus::Mode,
            availability.mode,
        ),
        control_line(
            "Resource",
            resource_value,
            focus == Focus::Resource,
            availability.resource,
        ),
    ];

    let dim = Style::default().fg(Color::DarkGray);
    match (&app.selected_label, app.selection.resource_id()) {
        (Some(label), Some(_)) => {
            lines.push(Line::from(Span::styled(
                format!("          ✓ {}", label),
                Style::default().fg(Color::Green),
            )));
            let image = app.catalog.image_for(label).unwrap_or("no image");
            lines.push(Line::from(Span::styled(format!("          {}", image), dim)));
        }
        _ => {
            lines.push(Line::from(Span::styled(
                format!("          {} entries", app.catalog.len()),
                dim,
            )));
            lines.push(Line::default());
        }
    }
    lines.push(control_line(
        "From",
        date_value(DateField::Start),
        focus == Focus::StartDate,
        availability.start_date,
    ));
    lines.push(control_line(
        "To",
        date_value(DateField::End),
        focus == Focus::EndDate,
        availability.end_date,
    ));
    if let Some(bounds) = app.date_bounds {
        let span = match (bounds.from, bounds.to) {
            (Some(from), Some(to)) => format!("          data {} .. {}", from, to),
            _ => "          no imported data".to_string(),
        };
        lines.push(Line::from(Span::styled(span, Style::default().fg(Color::DarkGray))));
    } else {
        lines.push(Line::default());
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "   [ Update map ]   ",
        control_style(focus == Focus::Update, availability.update).add_modifier(Modifier::BOLD),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " trendmap ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Dropdown under the resource input
fn render_suggestions(frame: &mut Frame, app: &App, controls: Rect, screen: Rect) {
    let suggestions = app.autocomplete.suggestions();
    // Border + type + mode + resource rows
    let top = controls.y + 4;
    let height = (suggestions.len() as u16 + 2).min(screen.height.saturating_sub(top));
    let area = Rect {
        x: controls.x + 10,
        y: top,
        width: (SIDEBAR_WIDTH + 20).min(screen.width.saturating_sub(controls.x + 10)),
        height,
    };

    let items: Vec<ListItem> = suggestions.iter().map(|s| ListItem::new(s.as_str())).collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    let mut state = ListState::default().with_selected(app.autocomplete.highlighted());

    frame.render_widget(Clear, area);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_legend(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let Some(legend) = app.map_renderer.legend() else {
        frame.render_widget(block.title(" Legend "), area);
        return;
    };

    let swatch = |color: Rgb| Span::styled("██ ", Style::default().fg(to_color(color)));
    let mut lines = Vec::new();
    match legend {
        Legend::Gradient {
            entries,
            low_label,
            high_label,
            ..
        } => {
            lines.push(Line::from(Span::styled(*low_label, Style::default().fg(Color::DarkGray))));
            for entry in entries {
                lines.push(Line::from(vec![swatch(entry.color), Span::raw(entry.label.clone())]));
            }
            lines.push(Line::from(Span::styled(*high_label, Style::default().fg(Color::DarkGray))));
        }
        Legend::Categorical { entries, .. } => {
            let rows = area.height.saturating_sub(2) as usize;
            let (shown, hidden) = legend_rows(entries.len(), rows);
            for entry in &entries[..shown] {
                let count = entry.count.map(|c| format!(" ({})", c)).unwrap_or_default();
                lines.push(Line::from(vec![
                    swatch(entry.color),
                    Span::raw(entry.label.clone()),
                    Span::styled(count, Style::default().fg(Color::DarkGray)),
                ]));
            }
            if hidden > 0 {
                lines.push(Line::from(Span::styled(
                    format!("… {} more", hidden),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
    }

    let block = block.title(Span::styled(
        format!(" {} ", legend.title()),
        Style::default().fg(Color::Cyan),
    ));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Entries shown and hidden when `total` entries share `rows` lines.
/// An overflowing list gives up its last row to the "more" marker.
fn legend_rows(total: usize, rows: usize) -> (usize, usize) {
    if total <= rows {
        (total, 0)
    } else {
        let shown = rows.saturating_sub(1);
        (shown, total - shown)
    }
}

fn render_map(frame: &mut Frame, app: &App, inner: Rect) {
    let block = map_block(app.is_loading());
    let outer = Rect {
        x: inner.x.saturating_sub(1),
        y: inner.y.saturating_sub(1),
        width: inner.width + 2,
        height: inner.height + 2,
    };
    frame.render_widget(block, outer);

    let mut viewport = app.map_view.viewport.clone();
    // Braille gives 2x4 resolution per character
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let layers = app.map_renderer.render(inner.width as usize, inner.height as usize, &viewport);
    frame.render_widget(MapWidget { layers }, inner);
}

/// Braille map: base outline at the back, then country fills and outlines
struct MapWidget {
    layers: MapLayers,
}

impl MapWidget {
    fn render_base(canvas: &BrailleCanvas, area: Rect, buf: &mut Buffer) {
        for row_idx in 0..canvas.height().min(area.height as usize) {
            let y = area.y + row_idx as u16;
            for (col_idx, ch) in canvas.row_to_string(row_idx).chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                // Skip empty braille characters (U+2800)
                if ch == '\u{2800}' {
                    continue;
                }
                buf[(area.x + col_idx as u16, y)].set_char(ch).set_fg(Color::Cyan);
            }
        }
    }

    fn render_overlay(canvas: &BrailleCanvas, area: Rect, buf: &mut Buffer) {
        for row in 0..canvas.height().min(area.height as usize) {
            for col in 0..canvas.width().min(area.width as usize) {
                let cell = &mut buf[(area.x + col as u16, area.y + row as u16)];
                let fill = canvas.fill_at(col, row);
                if let Some(fill) = fill {
                    cell.set_bg(to_color(fill));
                }
                if let Some(glyph) = canvas.glyph_at(col, row) {
                    let fg = match fill {
                        Some(fill) if !fill.is_light() => Color::White,
                        _ => Color::Black,
                    };
                    cell.set_char(glyph).set_fg(fg);
                }
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Self::render_base(&self.layers.base, area, buf);
        Self::render_overlay(&self.layers.overlay, area, buf);
    }
}

fn render_popup(frame: &mut Frame, popup: &Popup, map: Rect) {
    let mut lines: Vec<Line> = popup.lines.iter().map(|l| Line::from(l.as_str())).collect();
    if let Some(link) = &popup.link {
        lines.push(Line::from(Span::styled(link.as_str(), Style::default().fg(Color::Cyan))));
    }

    let width = lines
        .iter()
        .map(Line::width)
        .chain(std::iter::once(popup.title.chars().count() + 4))
        .max()
        .unwrap_or(0) as u16
        + 2;
    let area = Rect {
        x: map.x + map.width.saturating_sub(width.min(map.width)),
        y: map.y,
        width: width.min(map.width),
        height: (lines.len() as u16 + 2).min(map.height),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            format!(" {} ", popup.title),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_error(frame: &mut Frame, modal: &ErrorModal, screen: Rect) {
    let mut lines = Vec::new();
    if let Some(url) = &modal.url {
        lines.push(Line::from(vec![
            Span::styled("URL:    ", Style::default().fg(Color::DarkGray)),
            Span::raw(url.as_str()),
        ]));
    }
    if let Some(status) = modal.status {
        lines.push(Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::DarkGray)),
            Span::styled(status.to_string(), Style::default().fg(Color::Red)),
        ]));
    }
    lines.push(Line::default());
    lines.push(Line::from(modal.message.as_str()));
    lines.push(Line::default());
    lines.push(Line::from(Span::styled("Enter/Esc to close", Style::default().fg(Color::DarkGray))));

    let width = screen.width.saturating_sub(4).min(70);
    let height = (lines.len() as u16 + 4).min(screen.height);
    let area = Rect {
        x: screen.x + (screen.width - width) / 2,
        y: screen.y + (screen.height - height) / 2,
        width,
        height,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(
            format!(" {} ", modal.title),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();

    if app.map_view.shows_zoom_control() {
        spans.extend([
            Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
            Span::styled(app.map_view.zoom_label(), Style::default().fg(Color::Yellow)),
            Span::styled(" (", Style::default().fg(Color::DarkGray)),
            Span::styled(
                Lod::from_zoom(app.map_view.viewport.zoom).label(),
                Style::default().fg(Color::Magenta),
            ),
            Span::styled(") ", Style::default().fg(Color::DarkGray)),
            Span::styled(app.map_view.center_label(), Style::default().fg(Color::Cyan)),
            Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        ]);
    } else {
        spans.push(Span::styled(" Loading… | ", Style::default().fg(Color::Yellow)));
    }

    if let Some(status) = &app.status {
        spans.push(Span::styled(status.as_str(), Style::default().fg(Color::White)));
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
    }

    spans.push(Span::styled(
        "tab:focus ←/→:change enter:select/update hjkl:pan +/-:zoom r:reset q:quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::map::{ChoroplethLayer, LegendEntry};
    use crate::state::ResourceType;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let area = buffer.area;
        let mut text = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_layout_reserves_sidebar_and_status() {
        let regions = layout(Rect::new(0, 0, 120, 40));
        assert_eq!(regions.sidebar.width, SIDEBAR_WIDTH);
        assert_eq!(regions.status.y, 39);
        assert_eq!(regions.map.x, SIDEBAR_WIDTH + 1);
        assert_eq!(regions.map.width, 120 - SIDEBAR_WIDTH - 2);
        assert_eq!(regions.map.height, 37);
    }

    #[test]
    fn test_legend_rows_reserve_marker() {
        assert_eq!(legend_rows(5, 10), (5, 0));
        assert_eq!(legend_rows(10, 10), (10, 0));
        assert_eq!(legend_rows(65, 10), (9, 56));
        assert_eq!(legend_rows(3, 0), (0, 3));
    }

    #[test]
    fn test_render_truncates_long_categorical_legend() {
        let mut app = App::new(&AppConfig::default(), 82, 37);
        let entries = (0..65)
            .map(|i| LegendEntry {
                label: format!("Artist {}", i),
                color: Rgb::new(200, 40, 40),
                count: Some(1),
            })
            .collect();
        let legend = Legend::Categorical {
            title: "Top artists".into(),
            entries,
        };
        let (layer, _) = ChoroplethLayer::trends(Vec::new(), ResourceType::Artist);
        app.map_renderer.show(layer, legend);

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| render(frame, &app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Artist 0 (1)"));
        assert!(!text.contains("Artist 64"));
        assert!(text.contains(" more"));
    }

    #[test]
    fn test_render_shows_controls_and_zoom() {
        let app = App::new(&AppConfig::default(), 82, 37);
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| render(frame, &app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("artist"));
        assert!(text.contains("popularity"));
        assert!(text.contains("Update map"));
        assert!(text.contains("Zoom: 1.0x"));
    }

    #[test]
    fn test_render_error_modal() {
        let mut app = App::new(&AppConfig::default(), 82, 37);
        app.error = Some(ErrorModal {
            title: "Failed to load map".into(),
            url: Some("http://localhost:8080/api/maps/trends/track".into()),
            status: Some(502),
            message: "bad gateway".into(),
        });
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| render(frame, &app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Failed to load map"));
        assert!(text.contains("502"));
    }
}

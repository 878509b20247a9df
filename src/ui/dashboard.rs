use crate::highlight::HighlightStyle;
use crate::model::{Element, Status};
use crate::ui::app::{App, FocusPanel};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, List, ListItem, Paragraph, Row, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Table,
    },
    Frame,
};

const BRAND_DARK: Color = Color::Rgb(0x1F, 0x2F, 0x3C);
const BRAND_SELECT_BG: Color = Color::Rgb(0xC3, 0xD3, 0xE0);
const BRAND_ORANGE: Color = Color::Rgb(0x9E, 0x68, 0x3C);
const BRAND_MUTED: Color = Color::Rgb(0x71, 0x65, 0x65);

const HEADER_STYLE: Style = Style::new().fg(BRAND_DARK).add_modifier(Modifier::BOLD);
const SELECTED_STYLE: Style = Style::new()
    .bg(BRAND_SELECT_BG)
    .fg(BRAND_DARK)
    .add_modifier(Modifier::BOLD);

fn status_color(status: Status) -> Color {
    let rgb = status.color();
    Color::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

fn highlight_color(style: Option<HighlightStyle>) -> Color {
    style.map_or(BRAND_MUTED, |s| {
        let (r, g, b) = s.rgb();
        Color::Rgb(r, g, b)
    })
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(BRAND_ORANGE)
    } else {
        Style::default()
    }
}

pub fn draw_dashboard(frame: &mut Frame, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(3), // Header
        Constraint::Min(10),   // Main content
        Constraint::Length(3), // Footer
    ])
    .split(frame.area());

    draw_header(frame, chunks[0], app);
    draw_main_content(frame, chunks[1], app);
    draw_footer(frame, chunks[2], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let summary = &app.run.results.summary;
    let title = format!(
        " IDS Checker | {} | {} | {} elements | {}/{} specs failing | {} issues ",
        app.model.project_name,
        app.store.title().unwrap_or("no IDS"),
        app.elements.len(),
        summary.failed_specs,
        summary.total_specs,
        app.issues.len()
    );

    let header = Paragraph::new(title)
        .style(HEADER_STYLE)
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(header, area);
}

fn draw_main_content(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::horizontal([
        Constraint::Percentage(30), // Specifications
        Constraint::Percentage(35), // Elements
        Constraint::Percentage(35), // Detail
    ])
    .split(area);

    draw_specifications(frame, chunks[0], app);
    draw_elements(frame, chunks[1], app);
    draw_detail(frame, chunks[2], app);
}

fn draw_specifications(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus_panel == FocusPanel::Specifications;
    let rows = app.spec_rows();

    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let is_selected = i == app.selected_spec;
            let style = if is_selected && is_focused {
                SELECTED_STYLE
            } else if is_selected {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let counts = match &row.skipped {
                Some(_) => Span::styled(" skipped", Style::default().fg(BRAND_MUTED)),
                None => Span::styled(
                    format!(" ✓{} ✗{}", row.passed, row.failed),
                    Style::default().fg(if row.failed > 0 {
                        status_color(Status::Fail)
                    } else {
                        status_color(Status::Pass)
                    }),
                ),
            };

            ListItem::new(Line::from(vec![Span::styled(&row.name, style), counts]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(format!(" Specifications ({}) ", rows.len()))
            .borders(Borders::ALL)
            .border_style(border_style(is_focused)),
    );

    frame.render_widget(list, area);
}

fn draw_elements(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus_panel == FocusPanel::Elements;
    let selected_id = app.selected_detail().map(|e| e.id);

    // Subtract borders and header
    let visible_rows = (area.height as usize).saturating_sub(3);
    let scroll_offset = if app.selected_element >= visible_rows {
        app.selected_element - visible_rows + 1
    } else {
        0
    };

    let header = Row::new(vec!["", "Type", "GlobalId", "Status"])
        .style(HEADER_STYLE)
        .height(1);

    let rows: Vec<Row> = app
        .elements
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(visible_rows)
        .map(|(i, element)| {
            let style = if i == app.selected_element && is_focused {
                SELECTED_STYLE
            } else if i == app.selected_element {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let marker = if selected_id.as_deref() == Some(element.id.as_str()) {
                "►"
            } else {
                "■"
            };

            Row::new(vec![
                Line::from(Span::styled(
                    marker,
                    Style::default().fg(highlight_color(app.style_of(element))),
                )),
                Line::from(element.element_type.clone()),
                Line::from(element.id.clone()),
                Line::from(Span::styled(
                    element.status.as_str(),
                    Style::default().fg(status_color(element.status)),
                )),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(2),
        Constraint::Percentage(25),
        Constraint::Percentage(50),
        Constraint::Percentage(20),
    ];

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(format!(" Elements ({}) ", app.elements.len()))
            .borders(Borders::ALL)
            .border_style(border_style(is_focused)),
    );

    frame.render_widget(table, area);

    if app.elements.len() > visible_rows {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));
        let mut scrollbar_state =
            ScrollbarState::new(app.elements.len()).position(app.selected_element);

        let scrollbar_area = Rect {
            x: area.x + area.width - 1,
            y: area.y + 2,
            width: 1,
            height: area.height - 3,
        };
        frame.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);
    }
}

fn draw_detail(frame: &mut Frame, area: Rect, app: &App) {
    let Some(element) = app.selected_detail() else {
        let hint = Paragraph::new("Press Enter to select an element")
            .style(Style::default().fg(BRAND_MUTED))
            .block(Block::default().title(" Detail ").borders(Borders::ALL));
        frame.render_widget(hint, area);
        return;
    };

    let chunks = Layout::vertical([
        Constraint::Length(4), // Status lines
        Constraint::Min(4),    // Properties
    ])
    .split(area);

    draw_status(frame, chunks[0], &element);

    let rows: Vec<Row> = element
        .props
        .iter()
        .map(|(name, value)| Row::new(vec![name.clone(), value.to_string()]))
        .collect();

    let widths = [Constraint::Percentage(55), Constraint::Percentage(45)];
    let table = Table::new(rows, widths)
        .header(Row::new(vec!["Property", "Value"]).style(HEADER_STYLE))
        .block(
            Block::default()
                .title(format!(" Properties ({}) ", element.props.len()))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, chunks[1]);
}

fn draw_status(frame: &mut Frame, area: Rect, element: &Element) {
    let local = App::local_check(element);
    let lines = vec![
        Line::from(vec![
            Span::styled("IDS: ", Style::default().fg(BRAND_MUTED)),
            Span::styled(
                element.status.as_str(),
                Style::default()
                    .fg(status_color(element.status))
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Local rules: ", Style::default().fg(BRAND_MUTED)),
            Span::styled(local.as_str(), Style::default().fg(status_color(local))),
        ]),
    ];

    let widget = Paragraph::new(lines).block(
        Block::default()
            .title(format!(" {} {} ", element.element_type, element.id))
            .borders(Borders::ALL),
    );
    frame.render_widget(widget, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let help = " ←→ Panel | ↑↓ Move | Enter Select | Esc Deselect | r Re-check | s Suggest | i Issue | q Quit ";
    let text = match &app.message {
        Some(message) => format!(" {message} |{help}"),
        None => help.to_string(),
    };
    let footer = Paragraph::new(text)
        .style(Style::default().fg(BRAND_MUTED))
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(footer, area);
}

use crate::app::App;
use crate::braille::BrailleCanvas;
use crate::chart::{PROPOSAL_COLOR, STRUCTURE_COLOR, TREE_COLOR};
use crate::map::{Category, Label, MapLayers};
use crate::workflow::{FormField, ProposalForm};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 34;
const MODAL_WIDTH: u16 = 46;
const MODAL_HEIGHT: u16 = 11;

/// Screen regions, shared by drawing and mouse hit-testing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScreenLayout {
    /// Map including its border
    pub map: Rect,
    /// Braille drawing area inside the border
    pub map_inner: Rect,
    pub layers: Rect,
    /// One checkbox row per entry of `Category::CONTROLS`
    pub layer_rows: [Rect; 4],
    pub add_button: Rect,
    pub chart: Rect,
    pub help: Rect,
    pub status: Rect,
}

/// Modal form regions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModalLayout {
    pub area: Rect,
    pub close: Rect,
    pub save: Rect,
    pub cancel: Rect,
}

pub fn screen_layout(area: Rect) -> ScreenLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(SIDEBAR_WIDTH)])
        .split(rows[0]);

    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Layer checkboxes
            Constraint::Length(3), // Add shade control
            Constraint::Min(8),    // Chart
            Constraint::Length(7), // Key help
        ])
        .split(columns[1]);

    let map = columns[0];
    let layers = sidebar[0];
    let layers_inner = Block::default().borders(Borders::ALL).inner(layers);
    let layer_rows = std::array::from_fn(|i| {
        let y = layers_inner.y + i as u16;
        if y < layers_inner.y + layers_inner.height {
            Rect::new(layers_inner.x, y, layers_inner.width, 1)
        } else {
            Rect::default()
        }
    });

    ScreenLayout {
        map,
        map_inner: Block::default().borders(Borders::ALL).inner(map),
        layers,
        layer_rows,
        add_button: sidebar[1],
        chart: sidebar[2],
        help: sidebar[3],
        status: rows[1],
    }
}

/// Place the form over the half of the map that does not hold the pin
pub fn modal_layout(map_inner: Rect, pin_col: Option<u16>) -> ModalLayout {
    let width = MODAL_WIDTH.min(map_inner.width);
    let height = MODAL_HEIGHT.min(map_inner.height);
    let pin_on_left = pin_col.is_some_and(|c| c < map_inner.x + map_inner.width / 2);
    let x = if pin_on_left {
        map_inner.x + map_inner.width - width
    } else {
        map_inner.x
    };
    let area = Rect::new(x, map_inner.y, width, height);

    let bottom = area.y + area.height.saturating_sub(2);
    ModalLayout {
        area,
        close: Rect::new((area.x + area.width).saturating_sub(5), area.y, 3, 1),
        save: Rect::new(area.x + 2, bottom, 10, 1),
        cancel: Rect::new(area.x + 14, bottom, 12, 1),
    }
}

pub fn contains(rect: Rect, col: u16, row: u16) -> bool {
    col >= rect.x && col < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}

pub fn category_color(category: Category) -> Color {
    match category {
        Category::Trees => TREE_COLOR,
        Category::Structures => STRUCTURE_COLOR,
        Category::HeatZones => Color::Red,
        Category::Proposals => PROPOSAL_COLOR,
    }
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let layout = screen_layout(frame.area());

    render_map(frame, app, &layout);
    render_layer_controls(frame, app, &layout);
    render_add_button(frame, app, layout.add_button);
    if let Some(chart) = app.data.chart.current() {
        frame.render_widget(chart, layout.chart);
    }
    render_help(frame, layout.help);
    render_status_bar(frame, app, layout.status);

    if app.workflow.is_reviewing() {
        let modal = modal_layout(layout.map_inner, app.candidate_cell().map(|(c, _)| c));
        render_form(frame, app.workflow.form(), &modal);
    }
    if let Some(label) = &app.popup {
        render_popup(frame, label, layout.map_inner);
    }
    if let Some(message) = &app.notice {
        render_notice(frame, message, frame.area());
    }
}

fn render_map(frame: &mut Frame, app: &App, layout: &ScreenLayout) {
    let title = if app.workflow.is_armed() && !app.workflow.is_reviewing() {
        Span::styled(
            " Click the map to place the pin (Esc to cancel) ",
            Style::default().fg(Color::Black).bg(PROPOSAL_COLOR),
        )
    } else {
        Span::styled(
            " Urban Shade Map ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(title);
    frame.render_widget(block, layout.map);

    let inner = layout.map_inner;
    let layers = app.map_renderer.render(
        inner.width as usize,
        inner.height as usize,
        &app.viewport,
        &app.data.registry,
        app.workflow.candidate().map(|c| (c.lng, c.lat)),
    );

    let cursor_pos = if app.workflow.is_armed() && !app.workflow.is_reviewing() {
        app.mouse_pos
            .filter(|&(col, row)| contains(inner, col, row))
            .map(|(col, row)| (col - inner.x, row - inner.y))
    } else {
        None
    };

    frame.render_widget(MapWidget { layers, cursor_pos }, inner);
}

/// Custom widget that stacks the Braille layers, each in its own color
struct MapWidget {
    layers: MapLayers,
    cursor_pos: Option<(u16, u16)>,
}

impl MapWidget {
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for (row_idx, row_str) in canvas.rows().enumerate() {
            if row_idx >= area.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;

            for (col_idx, ch) in row_str.chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                // Skip empty braille characters (U+2800)
                if ch == '\u{2800}' {
                    continue;
                }
                let x = area.x + col_idx as u16;
                buf[(x, y)].set_char(ch).set_fg(color);
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Self::render_layer(&self.layers.base, Color::DarkGray, area, buf);

        for (category, canvas) in &self.layers.overlays {
            Self::render_layer(canvas, category_color(*category), area, buf);
        }

        if let Some(candidate) = &self.layers.candidate {
            Self::render_layer(candidate, Color::LightMagenta, area, buf);
        }

        if let Some((cx, cy)) = self.cursor_pos {
            let x = area.x + cx;
            let y = area.y + cy;
            if x < area.x + area.width && y < area.y + area.height {
                buf[(x, y)].set_char('╋').set_fg(Color::LightMagenta);
            }
        }
    }
}

fn render_layer_controls(frame: &mut Frame, app: &App, layout: &ScreenLayout) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(" Layers ", Style::default().fg(Color::Cyan)));
    frame.render_widget(block, layout.layers);

    for (i, (category, row)) in Category::CONTROLS.iter().zip(layout.layer_rows).enumerate() {
        if row.height == 0 {
            continue;
        }
        let visible = app.data.registry.is_visible(*category);
        let count = app.data.registry.group(*category).len();
        let line = Line::from(vec![
            Span::styled(
                if visible { "[x] " } else { "[ ] " },
                Style::default().fg(if visible { Color::Green } else { Color::DarkGray }),
            ),
            Span::styled(format!("{} ", i + 1), Style::default().fg(Color::DarkGray)),
            Span::styled("● ", Style::default().fg(category_color(*category))),
            Span::raw(format!("{} ({count})", category.title())),
        ]);
        frame.render_widget(Paragraph::new(line), row);
    }
}

fn render_add_button(frame: &mut Frame, app: &App, area: Rect) {
    let (text, style) = if app.workflow.is_armed() {
        (
            " ● Adding shade... ",
            Style::default()
                .fg(Color::Black)
                .bg(PROPOSAL_COLOR)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        (" + Add shade (a) ", Style::default().fg(PROPOSAL_COLOR))
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.workflow.is_armed() {
            PROPOSAL_COLOR
        } else {
            Color::DarkGray
        }));
    frame.render_widget(Paragraph::new(Line::from(Span::styled(text, style))).block(block), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let text = |t: &'static str| Span::styled(t, Style::default().fg(Color::Gray));
    let lines = vec![
        Line::from(vec![key("1-4"), text(" toggle layers  "), key("a"), text(" add")]),
        Line::from(vec![key("hjkl"), text(" pan  "), key("+/-"), text(" zoom  "), key("g"), text(" grid")]),
        Line::from(vec![key("click"), text(" feature info  "), key("r"), text(" reset")]),
        Line::from(vec![key("drag"), text(" pan / move pin")]),
        Line::from(vec![key("q"), text(" quit")]),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(" Keys ", Style::default().fg(Color::Cyan)));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_form(frame: &mut Frame, form: &ProposalForm, modal: &ModalLayout) {
    frame.render_widget(Clear, modal.area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(PROPOSAL_COLOR))
        .title(Span::styled(
            " Propose shade ",
            Style::default().fg(PROPOSAL_COLOR).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(modal.area);
    frame.render_widget(block, modal.area);
    frame.render_widget(
        Paragraph::new(Span::styled(" ✕ ", Style::default().fg(Color::Red))),
        modal.close,
    );

    let caption = |text: &'static str| Span::styled(text, Style::default().fg(Color::Gray));
    let field_style = |field: FormField| {
        if form.focus == field {
            Style::default().fg(Color::Black).bg(Color::White)
        } else {
            Style::default().fg(Color::White)
        }
    };
    let cursor = |field: FormField| if form.focus == field { "▏" } else { "" };
    let read_only = Style::default().fg(Color::DarkGray);

    let lines = vec![
        Line::from(vec![
            caption("Name*       "),
            Span::styled(format!("{}{}", form.name, cursor(FormField::Name)), field_style(FormField::Name)),
        ]),
        Line::from(vec![
            caption("Type        "),
            Span::styled(format!("◀ {} ▶", form.kind), field_style(FormField::Type)),
        ]),
        Line::from(vec![
            caption("Description "),
            Span::styled(
                format!("{}{}", form.desc, cursor(FormField::Description)),
                field_style(FormField::Description),
            ),
        ]),
        Line::from(vec![caption("Latitude    "), Span::styled(form.lat.as_str(), read_only)]),
        Line::from(vec![caption("Longitude   "), Span::styled(form.lng.as_str(), read_only)]),
        Line::from(Span::styled(
            "Tab: next field  ←/→: type  drag pin to move",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), inner);

    frame.render_widget(
        Paragraph::new(Span::styled(
            "[ Save ⏎ ]",
            Style::default().fg(Color::Black).bg(Color::Green),
        )),
        modal.save,
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            "[ Cancel ⎋ ]",
            Style::default().fg(Color::White).bg(Color::DarkGray),
        )),
        modal.cancel,
    );
}

/// Feature details at the bottom of the map
fn render_popup(frame: &mut Frame, label: &Label, map_inner: Rect) {
    let height = if label.description.is_empty() { 3 } else { 4 };
    let width = map_inner.width.min(50);
    if map_inner.height < height {
        return;
    }
    let area = Rect::new(
        map_inner.x,
        map_inner.y + map_inner.height - height,
        width,
        height,
    );
    frame.render_widget(Clear, area);

    let mut lines = vec![Line::from(Span::styled(
        label.title.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    if !label.description.is_empty() {
        lines.push(Line::from(label.description.as_str()));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Blocking notification, dismissed by any key
fn render_notice(frame: &mut Frame, message: &str, screen: Rect) {
    let width = screen.width.min(50);
    let height = screen.height.min(7);
    let area = Rect::new(
        screen.x + (screen.width - width) / 2,
        screen.y + (screen.height - height) / 2,
        width,
        height,
    );
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(" Notice ", Style::default().fg(Color::Red)));
    let lines = vec![
        Line::from(message),
        Line::from(""),
        Line::from(Span::styled("Press any key", Style::default().fg(Color::DarkGray))),
    ];
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
    ];
    if let Some(pointer) = app.pointer_coords() {
        spans.push(Span::styled(" | pointer ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(pointer, Style::default().fg(Color::Cyan)));
    }
    if let Some(status) = &app.status {
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(status.as_str(), Style::default().fg(Color::Green)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

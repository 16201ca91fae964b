use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    prelude::*,
    style::{Color, Modifier, Style},
    symbols,
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, List, ListItem,
        ListState, Paragraph,
    },
};
use std::io::{Stdout, stdout};

use crate::chart::ChartSurface;
use crate::flagged::FlaggedList;
use crate::generator::RequestGenerator;
use crate::state::{AppState, InputMode, StatusLine};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

pub fn init() -> Result<Tui> {
    stdout().execute(EnterAlternateScreen)?;
    enable_raw_mode()?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore() -> Result<()> {
    stdout().execute(LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// アプリケーションのUI全体を描画
pub fn ui(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(35),
            Constraint::Min(8),
            Constraint::Length(10),
        ])
        .split(f.area());

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[2]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(32)])
        .split(chunks[3]);

    render_filter_pane(f, chunks[0], state);
    render_global_pane(f, chunks[1], state);
    render_flagged_pane(f, middle[0], &state.flagged);
    render_drilldown_pane(f, middle[1], state);
    render_log_pane(f, bottom[0], &state.generator);
    render_control_pane(f, bottom[1], &state.generator, state.status.as_ref());
}

fn render_filter_pane(f: &mut Frame, area: Rect, state: &AppState) {
    let (title, text, color) = match state.input_mode {
        InputMode::Editing => (
            "Filter Input (Enter: apply, Esc: cancel)",
            format!("{}_", state.editing_text),
            Color::Yellow,
        ),
        InputMode::Normal if state.flagged.filter_text().is_empty() => (
            "Filter Input",
            "Press '/' to filter flagged keys... (Press 'q' to quit)".to_string(),
            Color::DarkGray,
        ),
        InputMode::Normal => (
            "Filter Input",
            format!("/{}/  (Press '/' to edit)", state.flagged.filter_text()),
            Color::Yellow,
        ),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(color));
    f.render_widget(Paragraph::new(text).block(block), area);
}

fn render_global_pane(f: &mut Frame, area: Rect, state: &AppState) {
    let surface = &state.global_chart;
    let title = match state.global_summary {
        Some(s) => format!(
            "{} (active {}, queued {}, flagged {})",
            surface.label(),
            s.active,
            s.queued,
            s.flagged
        ),
        None => format!("{} (waiting for data...)", surface.label()),
    };
    render_line_chart(f, area, surface, title);
}

fn render_line_chart(f: &mut Frame, area: Rect, surface: &ChartSurface, title: String) {
    let points = surface.points();
    let dataset = Dataset::default()
        .name(surface.label())
        .graph_type(GraphType::Line)
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(surface.color()))
        .data(&points);

    let x_max = surface.values().len().saturating_sub(1).max(1) as f64;
    let y_max = (surface.max_value().max(1) as f64 * 1.2).ceil();

    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(surface.color())),
        )
        .x_axis(
            Axis::default()
                .bounds([0.0, x_max])
                .labels(edge_labels(surface.labels())),
        )
        .y_axis(
            Axis::default()
                .title("req/s")
                .bounds([0.0, y_max])
                .labels(vec![Line::from("0"), Line::from(format!("{y_max:.0}"))]),
        );
    f.render_widget(chart, area);
}

// 先頭・中央・末尾のラベルのみ
fn edge_labels(labels: &[String]) -> Vec<Line<'static>> {
    match labels {
        [] => Vec::new(),
        [only] => vec![Line::from(only.clone())],
        _ => {
            let mid = labels.len() / 2;
            vec![
                Line::from(labels[0].clone()),
                Line::from(labels[mid].clone()),
                Line::from(labels[labels.len() - 1].clone()),
            ]
        }
    }
}

fn render_flagged_pane(f: &mut Frame, area: Rect, flagged: &FlaggedList) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Flagged ({} items, Enter: show history)", flagged.len()))
        .border_style(Style::default().fg(Color::Magenta));

    let items: Vec<ListItem> = flagged
        .visible()
        .map(|item| {
            let line = Line::from(vec![
                Span::styled(&item.key, Style::default().fg(Color::Red)),
                Span::raw(" - "),
                Span::raw(&item.reason),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut list_state = ListState::default();
    list_state.select(flagged.cursor());
    f.render_stateful_widget(list, area, &mut list_state);
}

fn render_drilldown_pane(f: &mut Frame, area: Rect, state: &AppState) {
    let surface = &state.drilldown_chart;
    let title = match &state.selected_key {
        Some(key) => format!("History for: {key}"),
        None => "History (select a flagged key)".to_string(),
    };
    render_bar_chart(f, area, surface, title);
}

fn render_bar_chart(f: &mut Frame, area: Rect, surface: &ChartSurface, title: String) {
    let style = Style::default().fg(surface.color());
    let bars: Vec<Bar> = surface
        .values()
        .iter()
        .zip(surface.labels())
        .enumerate()
        .map(|(i, (value, label))| {
            // 10本ごとに秒の下2桁を出す
            let bar = Bar::default()
                .value(*value)
                .text_value(String::new())
                .style(style);
            if i % 10 == 0 {
                let short = &label[label.len().saturating_sub(2)..];
                bar.label(Line::from(short.to_string()))
            } else {
                bar
            }
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{title} [{}: {}]", surface.label(), surface.total()))
                .border_style(style),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(1)
        .bar_gap(0)
        .max(surface.max_value().max(1));
    f.render_widget(chart, area);
}

fn render_log_pane(f: &mut Frame, area: Rect, generator: &RequestGenerator) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Request Log ({} lines)", generator.log().len()))
        .border_style(Style::default().fg(Color::Blue));

    let items: Vec<ListItem> = generator
        .log()
        .iter()
        .map(|line| {
            let style = if line.starts_with('[') {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            };
            ListItem::new(Line::from(Span::styled(line.as_str(), style)))
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn render_control_pane(
    f: &mut Frame,
    area: Rect,
    generator: &RequestGenerator,
    status: Option<&StatusLine>,
) {
    let button_style = if generator.is_repeating() {
        Style::default().fg(Color::Black).bg(Color::Red)
    } else {
        Style::default().fg(Color::Black).bg(Color::Green)
    };

    let mut lines = vec![
        Line::from(Span::styled(
            format!("[space] {}", generator.button_label()),
            button_style,
        )),
        Line::from("[s] send once  [r] refresh"),
        Line::from("[u] unblock  [x] clear logs"),
        Line::from("[c] copy key"),
        Line::from(format!("in flight: {}", generator.in_flight())),
    ];
    if let Some(status) = status {
        let color = if status.is_error {
            Color::Red
        } else {
            Color::Cyan
        };
        lines.push(Line::from(Span::styled(
            status.text.clone(),
            Style::default().fg(color),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Load Generator")
        .border_style(Style::default().fg(Color::Yellow));
    let text = Paragraph::new(lines)
        .block(block)
        .wrap(ratatui::widgets::Wrap { trim: true });
    f.render_widget(text, area);
}

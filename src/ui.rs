use crate::api::PredictionResult;
use crate::dashboard::Dashboard;
use crate::selection::{AssetClass, TimeRange};
use crate::state::{NoticeKind, SeriesSource};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Chart, Clear, Dataset, GraphType, List, ListItem, ListState, Paragraph, Tabs, Wrap,
    },
};

const UP_ARROW: &str = "▲";
const DOWN_ARROW: &str = "▼";

/// Static model-health figures shown until the backend exposes real ones.
const MODEL_HEALTH: [(&str, &str); 4] = [
    ("Accuracy", "87.5%"),
    ("RMSE", "2.35"),
    ("MAE", "1.82"),
    ("Last Updated", "2025-10-25"),
];

#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    pub label: &'static str,
    pub price: String,
    pub change: String,
    pub up: Option<bool>,
}

/// Next day/week/month tiles. With a live prediction the day tile carries it
/// and the longer horizons are unavailable; before that, sample figures are
/// shown.
pub fn prediction_tiles(prediction: Option<&PredictionResult>) -> [Tile; 3] {
    match prediction {
        Some(p) => [
            Tile {
                label: "Next Day",
                price: format!("${:.2}", p.predicted_price),
                change: signed_percent(p.change, p.change_percent),
                up: Some(p.is_up()),
            },
            Tile { label: "Next Week", price: "n/a".into(), change: String::new(), up: None },
            Tile { label: "Next Month", price: "n/a".into(), change: String::new(), up: None },
        ],
        None => [
            Tile { label: "Next Day", price: "$261.25".into(), change: "+1.89%".into(), up: Some(true) },
            Tile { label: "Next Week", price: "$272.80".into(), change: "+6.4%".into(), up: Some(true) },
            Tile { label: "Next Month", price: "$245.60".into(), change: "-4.2%".into(), up: Some(false) },
        ],
    }
}

fn signed_percent(change: f64, change_percent: f64) -> String {
    let sign = if change >= 0.0 { "+" } else { "" };
    format!("{}{:.2}%", sign, change_percent)
}

/// Percent change with a direction arrow, green when `change >= 0`.
pub fn change_badge(prediction: &PredictionResult) -> Span<'static> {
    let (arrow, color) = if prediction.is_up() {
        (UP_ARROW, Color::Green)
    } else {
        (DOWN_ARROW, Color::Red)
    };
    Span::styled(
        format!("{} {}", signed_percent(prediction.change, prediction.change_percent), arrow),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )
}

fn direction_color(up: Option<bool>) -> Color {
    match up {
        Some(true) => Color::Green,
        Some(false) => Color::Red,
        None => Color::Gray,
    }
}

pub fn render(f: &mut Frame, dash: &Dashboard) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, dash, layout[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(layout[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(8),
        ])
        .split(columns[0]);

    render_asset_class(f, dash, left[0]);
    render_symbols(f, dash, left[1]);
    render_predict_button(f, dash, left[2]);
    render_time_range(f, dash, left[3]);
    render_model_health(f, left[4]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(5)])
        .split(columns[1]);

    render_chart(f, dash, right[0]);
    render_tiles(f, dash, right[1]);

    render_footer(f, dash, layout[2]);

    if dash.notice().is_some() {
        render_notice(f, dash);
    }
}

fn render_header(f: &mut Frame, dash: &Dashboard, area: Rect) {
    let sel = dash.selection();
    let spans = vec![
        Span::styled(" Oasis ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" | "),
        Span::styled("Stock & Cryptocurrency Price Prediction", Style::default().fg(Color::Gray)),
        Span::raw(" | "),
        Span::styled(
            format!("{} {}", sel.symbol(), sel.time_range().label()),
            Style::default().fg(Color::Yellow),
        ),
    ];
    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_footer(f: &mut Frame, dash: &Dashboard, area: Rect) {
    let hint = if dash.notice().is_some() {
        "Enter/Esc: dismiss"
    } else {
        "Tab: asset type | Up/Down/F1-F4: symbol | Left/Right: range | p: predict | m: refresh model | q/Esc: quit"
    };

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(" Controls: ", Style::default().fg(Color::Gray)),
        Span::styled(hint, Style::default().fg(Color::White)),
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(footer, area);
}

fn render_asset_class(f: &mut Frame, dash: &Dashboard, area: Rect) {
    let selected = match dash.selection().asset_class() {
        AssetClass::Stock => 0,
        AssetClass::Crypto => 1,
    };
    let tabs = Tabs::new(vec![AssetClass::Stock.label(), AssetClass::Crypto.label()])
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(Style::default().fg(Color::White).bg(Color::Blue).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL).title(" Asset Type "));
    f.render_widget(tabs, area);
}

fn render_symbols(f: &mut Frame, dash: &Dashboard, area: Rect) {
    let sel = dash.selection();
    let items: Vec<ListItem> = sel
        .catalog()
        .iter()
        .map(|e| ListItem::new(format!("{} - {}", e.value, e.label)))
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Select Symbol "))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(sel.symbol_index());
    f.render_stateful_widget(list, area, &mut state);
}

fn render_predict_button(f: &mut Frame, dash: &Dashboard, area: Rect) {
    let (label, style) = if dash.is_pending() {
        ("Predicting...", Style::default().fg(Color::DarkGray))
    } else {
        ("[p] Predict Price", Style::default().fg(Color::White).bg(Color::Blue).add_modifier(Modifier::BOLD))
    };
    let button = Paragraph::new(label)
        .style(style)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(button, area);
}

fn render_time_range(f: &mut Frame, dash: &Dashboard, area: Rect) {
    let current = dash.selection().time_range();
    let selected = TimeRange::ALL.iter().position(|r| *r == current).unwrap_or(0);
    let tabs = Tabs::new(TimeRange::ALL.iter().map(|r| r.label()).collect::<Vec<_>>())
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(Style::default().fg(Color::White).bg(Color::Blue).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL).title(" Time Range "));
    f.render_widget(tabs, area);
}

fn render_model_health(f: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = MODEL_HEALTH
        .iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("{:<14}", label), Style::default().fg(Color::Gray)),
                Span::styled(*value, Style::default().fg(Color::White)),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "[m] Refresh Model",
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    )));

    let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Model Health "));
    f.render_widget(panel, area);
}

fn render_chart(f: &mut Frame, dash: &Dashboard, area: Rect) {
    let history = dash.history();
    let mut title = vec![Span::styled(
        format!(" {} - Price Chart ", dash.selection().symbol()),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if history.source() == SeriesSource::Fallback {
        title.push(Span::styled("(sample data) ", Style::default().fg(Color::DarkGray)));
    }
    if let Some(p) = dash.prediction() {
        title.push(Span::styled(
            format!("${:.2} ", p.current_price),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));
        title.push(change_badge(p));
        title.push(Span::raw(" "));
    }
    let block = Block::default().borders(Borders::ALL).title(Line::from(title));

    let points = history.points();
    if points.is_empty() {
        let message = match history.source() {
            SeriesSource::Empty => "Loading price history...",
            SeriesSource::Backend | SeriesSource::Fallback => "No data for this range",
        };
        let text = Paragraph::new(message)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(text, area);
        return;
    }

    let data: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.price))
        .collect();
    let min_price = points.iter().map(|p| p.price).fold(f64::INFINITY, f64::min);
    let max_price = points.iter().map(|p| p.price).fold(f64::NEG_INFINITY, f64::max);
    let x_max = (points.len().saturating_sub(1)).max(1) as f64;

    let first_date = points.first().map(|p| p.date.to_string()).unwrap_or_default();
    let last_date = points.last().map(|p| p.date.to_string()).unwrap_or_default();

    let datasets = vec![Dataset::default()
        .name(dash.selection().symbol())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data)];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(vec![
                    Span::styled(first_date, Style::default().fg(Color::Gray)),
                    Span::styled(last_date, Style::default().fg(Color::Gray)),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("Price")
                .style(Style::default().fg(Color::Gray))
                .bounds([min_price * 0.99, max_price * 1.01])
                .labels(vec![
                    Span::styled(format!("{:.2}", min_price), Style::default().fg(Color::Gray)),
                    Span::styled(format!("{:.2}", max_price), Style::default().fg(Color::Gray)),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_tiles(f: &mut Frame, dash: &Dashboard, area: Rect) {
    let outer = Block::default().borders(Borders::ALL).title(" Price Prediction ");
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(inner);

    let sample = dash.prediction().is_none();
    for (tile, cell) in prediction_tiles(dash.prediction()).iter().zip(cells.iter()) {
        let color = direction_color(tile.up);
        let label = if sample {
            format!("{} (sample)", tile.label)
        } else {
            tile.label.to_string()
        };
        let text = vec![
            Line::from(Span::styled(label, Style::default().fg(Color::Gray))),
            Line::from(vec![
                Span::styled(tile.price.clone(), Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(" "),
                Span::styled(tile.change.clone(), Style::default().fg(color)),
            ]),
        ];
        f.render_widget(Paragraph::new(text).alignment(Alignment::Center), *cell);
    }
}

fn render_notice(f: &mut Frame, dash: &Dashboard) {
    let Some(notice) = dash.notice() else {
        return;
    };
    let (title, color) = match notice.kind {
        NoticeKind::Success => (" Done ", Color::Green),
        NoticeKind::Error => (" Error ", Color::Red),
    };
    let area = centered_rect(50, 7, f.area());
    let body = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(notice.message.as_str(), Style::default().fg(color))),
        Line::from(""),
        Line::from(Span::styled("Press Enter to continue", Style::default().fg(Color::Gray))),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(color)),
    );

    f.render_widget(Clear, area);
    f.render_widget(body, area);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height),
            Constraint::Fill(1),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::PREDICTION_FAILED;
    use crate::dashboard::testing::{FakeApi, sample_prediction};
    use crate::selection::Selection;
    use ratatui::{Terminal, backend::TestBackend, buffer::Buffer};
    use std::sync::Arc;

    fn draw(dash: &Dashboard) -> Buffer {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|f| render(f, dash)).unwrap();
        terminal.backend().buffer().clone()
    }

    fn text(buffer: &Buffer) -> String {
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    fn arrow_colors(buffer: &Buffer, arrow: &str) -> Vec<Color> {
        buffer
            .content()
            .iter()
            .filter(|c| c.symbol() == arrow)
            .map(|c| c.fg)
            .collect()
    }

    async fn predicted(change: f64) -> Dashboard {
        let api = Arc::new(FakeApi::default());
        *api.prediction.lock().unwrap() = Some(sample_prediction("AAPL", change));
        let mut dash = Dashboard::new(api, Selection::default());
        dash.request_prediction();
        dash.next_event().await;
        dash
    }

    #[test]
    fn test_tiles_without_prediction_are_samples() {
        let tiles = prediction_tiles(None);
        assert_eq!(tiles[0].price, "$261.25");
        assert_eq!(tiles[2].up, Some(false));
    }

    #[test]
    fn test_tiles_follow_live_prediction() {
        let p = sample_prediction("AAPL", -1.5);
        let tiles = prediction_tiles(Some(&p));
        assert_eq!(tiles[0].price, "$228.50");
        assert_eq!(tiles[0].change, format!("{:.2}%", p.change_percent));
        assert_eq!(tiles[0].up, Some(false));
        assert_eq!(tiles[1].price, "n/a");
    }

    #[test]
    fn test_change_badge_direction() {
        let down = change_badge(&sample_prediction("AAPL", -1.5));
        assert!(down.content.ends_with(DOWN_ARROW));
        assert_eq!(down.style.fg, Some(Color::Red));

        let flat = change_badge(&sample_prediction("AAPL", 0.0));
        assert!(flat.content.starts_with('+'));
        assert_eq!(flat.style.fg, Some(Color::Green));
    }

    #[test]
    fn test_initial_screen_renders_controls() {
        let dash = Dashboard::new(Arc::new(FakeApi::default()), Selection::default());
        let screen = text(&draw(&dash));
        assert!(screen.contains("Oasis"));
        assert!(screen.contains("TSLA - Tesla"));
        assert!(screen.contains("Predict Price"));
        assert!(screen.contains("Accuracy"));
        assert!(screen.contains("87.5%"));
        assert!(screen.contains("Loading price history..."));
    }

    #[tokio::test]
    async fn test_negative_change_renders_down_indicator() {
        let dash = predicted(-1.5).await;
        let buffer = draw(&dash);

        assert!(arrow_colors(&buffer, UP_ARROW).is_empty());
        let downs = arrow_colors(&buffer, DOWN_ARROW);
        assert!(!downs.is_empty());
        assert!(downs.iter().all(|c| *c == Color::Red));
    }

    #[tokio::test]
    async fn test_positive_change_renders_up_indicator() {
        let dash = predicted(4.83).await;
        let buffer = draw(&dash);

        assert!(arrow_colors(&buffer, DOWN_ARROW).is_empty());
        assert!(arrow_colors(&buffer, UP_ARROW).iter().all(|c| *c == Color::Green));
    }

    #[tokio::test]
    async fn test_failed_prediction_shows_notice_overlay() {
        let mut dash = Dashboard::new(Arc::new(FakeApi::default()), Selection::default());
        dash.request_prediction();
        dash.next_event().await;

        let screen = text(&draw(&dash));
        assert!(screen.contains(PREDICTION_FAILED));
        assert!(screen.contains("Enter/Esc: dismiss"));
    }

    #[tokio::test]
    async fn test_empty_backend_series_is_not_loading() {
        let api = Arc::new(FakeApi::default());
        api.series.lock().unwrap().insert("TSLA".into(), Vec::new());
        let mut dash = Dashboard::new(api, Selection::default());

        dash.start();
        assert!(text(&draw(&dash)).contains("Loading price history..."));
        dash.next_event().await;

        let screen = text(&draw(&dash));
        assert!(screen.contains("No data for this range"));
        assert!(!screen.contains("Loading price history..."));
    }

    #[tokio::test]
    async fn test_fallback_series_is_charted() {
        let mut dash = Dashboard::new(Arc::new(FakeApi::default()), Selection::default());
        dash.start();
        dash.next_event().await;

        let screen = text(&draw(&dash));
        assert!(screen.contains("(sample data)"));
        assert!(screen.contains("2025-10-18"));
        assert!(screen.contains("256.42"));
    }
}

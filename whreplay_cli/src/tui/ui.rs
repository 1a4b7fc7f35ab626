//! TUI rendering functions

use super::app::{Focus, Notification, TuiApp, Variant};
use crate::format::{format_duration_short, full_time, full_time_millis, relative_time, truncate_str};
use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use whreplay_common::{format_body, CapturedRequest, DestinationState, Header, Replay};

/// Draw the TUI
pub fn draw(frame: &mut Frame, app: &TuiApp) {
    draw_at(frame, app, Utc::now());
}

/// Draw with an explicit clock for relative times
pub fn draw_at(frame: &mut Frame, app: &TuiApp, now: DateTime<Utc>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Length(1), // Custom URL
            Constraint::Length(3), // Replay URL input
            Constraint::Min(5),    // Requests + detail
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    draw_title_bar(frame, app, chunks[0]);
    draw_custom_url(frame, app, chunks[1]);
    draw_destination(frame, app, chunks[2]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(chunks[3]);

    draw_request_list(frame, app, body[0], now);
    match app.state.current() {
        Some(req) => draw_request_detail(frame, app, req, body[1]),
        None => draw_help(frame, app, body[1]),
    }

    draw_footer(frame, app, chunks[4]);

    if app.confirm_reset {
        draw_reset_dialog(frame);
    }
    draw_notifications(frame, app);
}

/// Draw the title bar with identity and polling status
fn draw_title_bar(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let (status, status_color) = if app.state.activity().is_idle() {
        ("idle", Color::Yellow)
    } else {
        ("live", Color::Green)
    };

    let line = Line::from(vec![
        Span::styled(" Webhook Replay ", Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(format!(" v{}  ", app.version), Style::default().fg(Color::DarkGray)),
        Span::styled("Status ", Style::default().fg(Color::DarkGray)),
        Span::styled(status, Style::default().fg(status_color).add_modifier(Modifier::BOLD)),
        Span::styled("  Ident ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            app.state.ident().unwrap_or("unregistered").to_string(),
            Style::default().fg(Color::White),
        ),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

fn draw_custom_url(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let url = app.custom_url().unwrap_or_else(|| "registering...".to_string());
    let line = Line::from(vec![
        Span::styled(" Custom URL: ", Style::default().fg(Color::DarkGray)),
        Span::styled(url, Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Draw the replay destination input and the send button state
fn draw_destination(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let focused = matches!(app.focus, Focus::Destination);
    let destination = app.state.destination();

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(24)])
        .split(area);

    let (visible, cursor) = input_view(destination, chunks[0].width.saturating_sub(2));
    let text = if destination.is_empty() && !focused {
        Span::styled("https://your-server.com/your-endpoint", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(visible, Style::default().fg(Color::White))
    };

    let border = if focused { Color::Cyan } else { Color::DarkGray };
    let input = Paragraph::new(Line::from(text)).block(
        Block::default()
            .title(" Replay URL ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(input, chunks[0]);

    if focused {
        let x = chunks[0].x.saturating_add(1).saturating_add(cursor);
        frame.set_cursor_position(Position::new(x, chunks[0].y.saturating_add(1)));
    }

    let (label, style) = send_button(app);
    let button = Paragraph::new(Line::from(Span::styled(label, style))).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(button, chunks[1]);
}

/// Tail of `text` that fits in `width` cells with one left for the cursor,
/// and the cursor column within it
fn input_view(text: &str, width: u16) -> (String, u16) {
    let room = usize::from(width.saturating_sub(1));
    let len = text.chars().count();
    let skip = len.saturating_sub(room);
    let visible: String = text.chars().skip(skip).collect();
    (visible, u16::try_from(len - skip).unwrap_or(u16::MAX))
}

fn send_button(app: &TuiApp) -> (&'static str, Style) {
    if app.sending {
        return ("Sending...", Style::default().fg(Color::Yellow));
    }
    if !DestinationState::of(app.state.destination()).is_ready() {
        return ("Configure replay URL", Style::default().fg(Color::DarkGray));
    }
    if !app.state.can_send() {
        return ("No request selected", Style::default().fg(Color::DarkGray));
    }
    (
        "⏎ Send Replay",
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    )
}

/// Draw the captured request list
fn draw_request_list(frame: &mut Frame, app: &TuiApp, area: Rect, now: DateTime<Utc>) {
    let idle = if app.state.activity().is_idle() {
        "(not updating, idle) "
    } else {
        ""
    };
    let block = Block::default()
        .title(format!(" Captured Requests ({}) {}", app.state.requests().len(), idle))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    if app.state.requests().is_empty() {
        let text = if app.state.is_loaded() {
            "You do not have any captured requests. Once you send a request to your custom URL it will appear here."
        } else {
            "Loading requests..."
        };
        let hint = Paragraph::new(Span::styled(text, Style::default().fg(Color::DarkGray)))
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(hint, area);
        return;
    }

    let path_width = (area.width as usize).saturating_sub(12).max(10);
    let items: Vec<ListItem> = app
        .state
        .requests()
        .iter()
        .map(|req| {
            let replays = match req.replays.len() {
                0 => String::new(),
                1 => " · 1 replay".to_string(),
                n => format!(" · {} replays", n),
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(format!("{:>6} ", truncate_str(&req.meth, 6)), method_style(&req.meth)),
                    Span::styled(truncate_str(&req.loc, path_width), Style::default().fg(Color::White)),
                ]),
                Line::from(vec![
                    Span::styled(
                        format!("       {}", relative_time(req.time, now)),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(replays, Style::default().fg(Color::Cyan)),
                ]),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Rgb(40, 40, 60)).add_modifier(Modifier::BOLD));

    let mut state = ListState::default();
    state.select(app.state.selected_index());
    frame.render_stateful_widget(list, area, &mut state);
}

/// Draw the selected request with its stats, body and replays
fn draw_request_detail(frame: &mut Frame, app: &TuiApp, req: &CapturedRequest, area: Rect) {
    let lines = request_detail_lines(req, app.state.destination());

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0))
        .block(
            Block::default()
                .title(format!(" {} {} ", req.meth, req.loc))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(paragraph, area);
}

fn request_detail_lines<'a>(req: &'a CapturedRequest, destination: &str) -> Vec<Line<'a>> {
    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("{} ", req.meth), method_style(&req.meth).add_modifier(Modifier::BOLD)),
            Span::styled(req.loc.as_str(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(Span::styled(
            full_time(&req.time.with_timezone(&Local)),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];

    lines.push(section_title("Request Headers:"));
    lines.extend(header_rows(&req.headers));
    lines.push(Line::from(""));

    lines.push(section_title("Replay Stats:"));
    let stats = req.stats();
    let rows = stats.rows();
    let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, value) in rows {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<width$}  ", name, width = width), Style::default().fg(Color::DarkGray)),
            Span::raw(value),
        ]));
    }
    lines.push(Line::from(""));

    push_body(&mut lines, "Request Body:", &req.body);
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled(
        "Replays",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )));
    let prompt = if DestinationState::of(destination).is_ready() {
        Span::styled(
            format!("Send new replay! {} to {}", req.meth, destination),
            Style::default().fg(Color::Green),
        )
    } else {
        Span::styled(
            "You must configure your replay URL before you can send a replay",
            Style::default().fg(Color::DarkGray),
        )
    };
    lines.push(Line::from(prompt));
    lines.push(Line::from(""));

    if req.replays.is_empty() {
        lines.push(Line::from(Span::styled(
            "You haven't replayed this request yet. When you do, you will see the HTTP responses here.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for replay in &req.replays {
        lines.extend(replay_lines(req, replay));
        lines.push(Line::from(""));
    }

    lines
}

fn replay_lines<'a>(req: &'a CapturedRequest, replay: &'a Replay) -> Vec<Line<'a>> {
    let chip_style = if replay.is_good_status() {
        Style::default().fg(Color::Black).bg(Color::Green)
    } else {
        Style::default().fg(Color::White).bg(Color::Red)
    };

    let mut lines = vec![Line::from(vec![
        Span::styled("━━ ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{} ", req.meth), method_style(&req.meth)),
        Span::styled(replay.loc.as_str(), Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!(" {} ", replay.status_label()),
            chip_style.add_modifier(Modifier::BOLD),
        ),
    ])];

    lines.push(section_title("Response Headers:"));
    lines.extend(header_rows(&replay.resp_headers));

    lines.push(section_title("Response Timing:"));
    let timing = [
        ("Response time", format_duration_short(replay.duration_ms())),
        ("Sent at", full_time_millis(&replay.start_at.with_timezone(&Local))),
        ("Response at", full_time_millis(&replay.end_at.with_timezone(&Local))),
    ];
    for (name, value) in timing {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<13}  ", name), Style::default().fg(Color::DarkGray)),
            Span::raw(value),
        ]));
    }

    let (title, text) = replay.display_body();
    push_body(&mut lines, title, text);
    lines
}

fn section_title(title: &str) -> Line<'_> {
    Line::from(Span::styled(title, Style::default().fg(Color::White).add_modifier(Modifier::BOLD)))
}

fn header_rows(headers: &[Header]) -> Vec<Line<'_>> {
    if headers.is_empty() {
        return vec![Line::from(Span::styled("  (none)", Style::default().fg(Color::DarkGray)))];
    }
    let width = headers.iter().map(|h| h.key.len()).max().unwrap_or(0);
    headers
        .iter()
        .map(|h| {
            Line::from(vec![
                Span::styled(format!("  {:<width$}  ", h.key, width = width), Style::default().fg(Color::Cyan)),
                Span::raw(h.value.as_str()),
            ])
        })
        .collect()
}

fn push_body(lines: &mut Vec<Line<'_>>, title: &str, raw: &str) {
    let body = format_body(raw);
    let kind = if body.is_json { " (json)" } else { "" };
    lines.push(Line::from(vec![
        Span::styled(title.to_string(), Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        Span::styled(kind, Style::default().fg(Color::DarkGray)),
    ]));
    let style = if body.is_json {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    };
    for line in body.text.lines() {
        lines.push(Line::from(Span::styled(format!("  {}", line), style)));
    }
}

/// Shown until a request is selected
fn draw_help(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let url = app.custom_url().unwrap_or_else(|| "<your custom URL>".to_string());
    let dim = Style::default().fg(Color::DarkGray);
    let code = Style::default().fg(Color::Yellow);

    let mut lines = vec![
        Line::from(Span::styled(
            "You haven't received any requests yet!",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled("Send HTTP requests to your custom URL and they will appear here.", dim)),
        Line::from(""),
        Line::from(Span::styled("For example, you could send the following HTTP request with cURL:", dim)),
        Line::from(Span::styled("curl -X 'POST' \\", code)),
        Line::from(Span::styled("     -H 'content-type: application/json' \\", code)),
        Line::from(Span::styled(
            "     --data '{\"colors\": [{\"color\": \"red\", \"category\": \"hue\", \"type\": \"primary\"}]}' \\",
            code,
        )),
        Line::from(Span::styled(format!("     {}", url), code)),
        Line::from(""),
        Line::from(Span::styled(
            "Alternatively, press o to open your custom URL in the browser, or scan:",
            dim,
        )),
    ];
    lines.extend(
        app.qr_code_lines
            .iter()
            .map(|l| Line::from(Span::styled(l.as_str(), Style::default().fg(Color::White)))),
    );
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "After you send a request, wait for the list to update automatically (every 10 seconds), or press s to sync immediately.",
        dim,
    )));

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(" Getting started ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(paragraph, area);
}

/// Draw the footer with key hints
fn draw_footer(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let hints: &[(&str, &str)] = match app.focus {
        Focus::Destination => &[("Enter/Esc", "Done"), ("Ctrl+U", "Clear"), ("Ctrl+C", "Quit")],
        Focus::RequestList => &[
            ("↑/↓", "Select"),
            ("Tab", "Edit URL"),
            ("Enter", "Send replay"),
            ("s", "Sync"),
            ("PgUp/PgDn", "Scroll"),
            ("o", "Open URL"),
            ("R", "Reset"),
            ("q", "Quit"),
        ],
    };

    let spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, label)| {
            [
                Span::styled(*key, Style::default().fg(Color::Cyan)),
                Span::styled(format!(" {}  ", label), Style::default().fg(Color::DarkGray)),
            ]
        })
        .collect();

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_reset_dialog(frame: &mut Frame) {
    let area = centered_rect(56, 7, frame.area());
    let lines = vec![
        Line::from(Span::styled(
            "Are you sure you want to reset?",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "You will lose all your captured requests and replays",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(" Reset    "),
            Span::styled("n", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(" Cancel"),
        ]),
    ];

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title(" Reset ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        ),
        area,
    );
}

/// Draw the notification stack in the top right corner
fn draw_notifications(frame: &mut Frame, app: &TuiApp) {
    if app.notifications.is_empty() {
        return;
    }

    let full = frame.area();
    let width = full.width.min(60);
    let inner_width = width.saturating_sub(2).max(1) as usize;
    let lines: Vec<Line> = app
        .notifications
        .iter()
        .map(|n| notification_line(n, inner_width))
        .collect();

    let height = (lines.len() as u16 + 2).min(full.height);
    let area = Rect::new(full.x + full.width - width, full.y, width, height);

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        ),
        area,
    );
}

fn notification_line(notification: &Notification, width: usize) -> Line<'static> {
    let color = match notification.variant {
        Variant::Success => Color::Green,
        Variant::Info => Color::Cyan,
        Variant::Error => Color::Red,
    };
    Line::from(Span::styled(
        truncate_str(&notification.message, width),
        Style::default().fg(color),
    ))
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// Get style for HTTP method
fn method_style(method: &str) -> Style {
    match method {
        "GET" => Style::default().fg(Color::Green),
        "POST" => Style::default().fg(Color::Yellow),
        "PUT" => Style::default().fg(Color::Blue),
        "PATCH" => Style::default().fg(Color::Magenta),
        "DELETE" => Style::default().fg(Color::Red),
        "HEAD" => Style::default().fg(Color::Cyan),
        _ => Style::default().fg(Color::White),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ViewState;
    use chrono::{Duration, TimeZone};
    use ratatui::{backend::TestBackend, Terminal};
    use std::time::Instant;

    fn render(app: &TuiApp, now: DateTime<Utc>) -> String {
        let backend = TestBackend::new(140, 60);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw_at(f, app, now)).unwrap();

        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn sample_request(now: DateTime<Utc>) -> CapturedRequest {
        let start = now - Duration::seconds(30);
        CapturedRequest {
            id: 1,
            meth: "POST".to_string(),
            loc: "/create/abc/hook".to_string(),
            time: now - Duration::seconds(42),
            body: r#"{"hello":"world"}"#.to_string(),
            headers: vec![Header::new("Content-Type", "application/json")],
            replays: vec![
                Replay {
                    id: 1,
                    req_id: 1,
                    loc: "https://example.org/in".to_string(),
                    resp_code: Some(204),
                    resp_body: Some(String::new()),
                    start_at: start,
                    end_at: start + Duration::milliseconds(120),
                    resp_headers: vec![Header::new("Server", "nginx")],
                    err_str: None,
                },
                Replay {
                    id: 2,
                    req_id: 1,
                    loc: "https://down.example.org".to_string(),
                    resp_code: None,
                    resp_body: None,
                    start_at: start,
                    end_at: start + Duration::milliseconds(80),
                    resp_headers: Vec::new(),
                    err_str: Some("connection refused".to_string()),
                },
            ],
        }
    }

    fn app_with(requests: Option<Vec<CapturedRequest>>, destination: &str) -> TuiApp {
        let mut state = ViewState::new(Some("abc".to_string()), destination.to_string());
        if let Some(requests) = requests {
            state = state.with_requests(requests);
        }
        TuiApp::new("http://localhost:5000".to_string(), state, Instant::now())
    }

    #[test]
    fn test_help_shown_without_requests() {
        let now = Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap();
        let screen = render(&app_with(Some(Vec::new()), ""), now);

        assert!(screen.contains("You haven't received any requests yet!"));
        assert!(screen.contains("http://localhost:5000/create/abc/"));
        assert!(screen.contains("You do not have any captured requests."));
        assert!(screen.contains("Configure replay URL"));
    }

    #[test]
    fn test_loading_before_first_fetch() {
        let now = Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap();
        let screen = render(&app_with(None, ""), now);
        assert!(screen.contains("Loading requests..."));
    }

    #[test]
    fn test_selected_request_detail() {
        let now = Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap();
        let screen = render(&app_with(Some(vec![sample_request(now)]), "https://example.org/in"), now);

        assert!(screen.contains("42 seconds ago · 2 replays"));
        assert!(screen.contains("Content-Type  application/json"));
        assert!(screen.contains("Attempted replays:"));
        assert!(screen.contains("Average response time:  100ms"));
        assert!(screen.contains("\"hello\": \"world\""));
        assert!(screen.contains("Send new replay! POST to https://example.org/in"));
        assert!(screen.contains(" 204 "));
        assert!(screen.contains(" ERROR "));
        assert!(screen.contains("connection refused"));
        assert!(screen.contains("Send Replay"));
    }

    #[test]
    fn test_idle_marker_and_dialog() {
        let now = Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap();
        let mut app = app_with(Some(Vec::new()), "");
        app.state = std::mem::take(&mut app.state).with_activity(crate::idle::Activity::Idle);
        app.confirm_reset = true;

        let screen = render(&app, now);
        assert!(screen.contains("(not updating, idle)"));
        assert!(screen.contains("Are you sure you want to reset?"));
    }

    #[test]
    fn test_input_view_scrolls_long_urls() {
        assert_eq!(input_view("", 10), (String::new(), 0));
        assert_eq!(input_view("http://x.io", 20), ("http://x.io".to_string(), 11));
        assert_eq!(input_view("https://example.org/in", 10), ("le.org/in".to_string(), 9));
        assert_eq!(input_view("abc", 0), (String::new(), 0));

        let pasted = "a".repeat(70_000);
        let (visible, cursor) = input_view(&pasted, 40);
        assert_eq!(visible.len(), 39);
        assert_eq!(cursor, 39);
    }

    #[test]
    fn test_long_destination_shows_its_end() {
        let now = Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap();
        let destination = format!("https://example.org/{}end", "x".repeat(70_000));
        let mut app = app_with(Some(Vec::new()), &destination);
        app.focus = Focus::Destination;

        let screen = render(&app, now);
        assert!(screen.contains("xxxxend"));
    }

    #[test]
    fn test_notifications_rendered() {
        let now = Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap();
        let mut app = app_with(Some(Vec::new()), "");
        app.notify(Variant::Error, "Error: Request to /requests failed.", Instant::now());

        let screen = render(&app, now);
        assert!(screen.contains("Error: Request to /requests failed."));
    }
}

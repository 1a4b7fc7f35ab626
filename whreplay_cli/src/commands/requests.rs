//! Request listing commands (ls, show)

use super::Backend;
use crate::config::Config;
use crate::format::{format_duration_short, full_time, full_time_millis, relative_time, truncate_str};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, Utc};
use console::style;
use whreplay_common::{format_body, CapturedRequest, Header, Replay};

/// List captured requests
pub async fn list(mut config: Config) -> Result<()> {
    let backend = Backend::connect(&config)?;
    backend.ensure_identity(&mut config).await?;

    let requests = backend
        .client
        .list_requests()
        .await
        .ok_or_else(|| backend.failure())?;
    backend.sync_identity(&mut config)?;

    if requests.is_empty() {
        println!("No captured requests.");
        println!();
        if let Some(url) = config.custom_url() {
            println!("Send a request to: {}", url);
        }
        return Ok(());
    }

    // Print header
    println!(
        "{:<8} {:<7} {:<40} {:<16} {:<8} {:<6}",
        "ID", "METHOD", "PATH", "RECEIVED", "REPLAYS", "LAST"
    );
    println!("{}", "-".repeat(90));

    let now = Utc::now();
    for req in &requests {
        println!("{}", request_row(req, now));
    }

    Ok(())
}

/// Show one captured request with its replays
pub async fn show(mut config: Config, id: i64) -> Result<()> {
    let backend = Backend::connect(&config)?;
    backend.ensure_identity(&mut config).await?;

    let requests = backend
        .client
        .list_requests()
        .await
        .ok_or_else(|| backend.failure())?;
    backend.sync_identity(&mut config)?;
    let req = requests
        .iter()
        .find(|r| r.id == id)
        .ok_or_else(|| anyhow!("Request not found: {}", id))?;

    print_request(req);
    Ok(())
}

fn request_row(req: &CapturedRequest, now: DateTime<Utc>) -> String {
    let last = req
        .latest_replay()
        .map(|r| r.status_label())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{:<8} {:<7} {:<40} {:<16} {:<8} {:<6}",
        req.id,
        req.meth,
        truncate_str(&req.loc, 38),
        relative_time(req.time, now),
        req.replays.len(),
        last
    )
}

fn print_request(req: &CapturedRequest) {
    println!(
        "{} {}",
        style(&req.meth).yellow().bold(),
        style(&req.loc).bold()
    );
    println!("{}", style(full_time(&req.time.with_timezone(&Local))).dim());
    println!();

    println!("{}", style("Request Headers:").bold());
    print_headers(&req.headers);
    println!();

    println!("{}", style("Replay Stats:").bold());
    for (name, value) in req.stats().rows() {
        println!("  {:<22}  {}", style(name).dim(), value);
    }
    println!();

    print_body("Request Body:", &req.body);

    println!();
    println!("{}", style("Replays").cyan().bold());
    if req.replays.is_empty() {
        println!(
            "{}",
            style("You haven't replayed this request yet. When you do, you will see the HTTP responses here.").dim()
        );
    }
    for replay in &req.replays {
        println!();
        print_replay(req, replay);
    }
}

pub(crate) fn print_replay(req: &CapturedRequest, replay: &Replay) {
    let status = format!(" {} ", replay.status_label());
    let status = if replay.is_good_status() {
        style(status).black().on_green()
    } else {
        style(status).white().on_red()
    };
    println!("{} {} {}", style(&req.meth).yellow(), replay.loc, status);

    println!("{}", style("Response Headers:").bold());
    print_headers(&replay.resp_headers);

    println!("{}", style("Response Timing:").bold());
    for (name, value) in replay_timing(replay) {
        println!("  {:<13}  {}", style(name).dim(), value);
    }

    let (title, text) = replay.display_body();
    print_body(title, text);
}

fn replay_timing(replay: &Replay) -> [(&'static str, String); 3] {
    [
        ("Response time", format_duration_short(replay.duration_ms())),
        ("Sent at", full_time_millis(&replay.start_at.with_timezone(&Local))),
        ("Response at", full_time_millis(&replay.end_at.with_timezone(&Local))),
    ]
}

fn print_headers(headers: &[Header]) {
    if headers.is_empty() {
        println!("  {}", style("(none)").dim());
        return;
    }
    let width = headers.iter().map(|h| h.key.len()).max().unwrap_or(0);
    for header in headers {
        println!("  {:<width$}  {}", style(&header.key).cyan(), header.value, width = width);
    }
}

fn print_body(title: &str, raw: &str) {
    let body = format_body(raw);
    println!("{}", style(title).bold());
    for line in body.text.lines() {
        println!("  {}", line);
    }
}

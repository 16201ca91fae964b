//! ヘッドレスの負荷確認。`/api/request` を一定間隔で叩き、応答を1行ずつ出す。
use std::time::Duration;

use tokio::time;
use tracing::{info, warn};

use crate::api::{ApiError, StatsClient};
use crate::generator::CONNECT_ERROR_LINE;

#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub count: usize,
    pub interval: Duration,
    pub stop_on: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProbeReport {
    pub lines: Vec<String>,
    pub stopped_early: bool,
}

pub async fn run(client: &StatsClient, options: &ProbeOptions) -> ProbeReport {
    let mut report = ProbeReport::default();
    info!(base_url = client.base_url(), count = options.count, "probe started");

    for i in 1..=options.count {
        let (line, verdict) = match client.send_request().await {
            Ok(outcome) => (format!("Req {i}: 200 - {}", outcome.status), Some(outcome.status)),
            Err(ApiError::Status { status, detail, .. }) => {
                let text = detail.unwrap_or_else(|| status.to_string());
                (format!("Req {i}: {} - {text}", status.as_u16()), Some(text))
            }
            Err(e) => {
                warn!(error = %e, "probe request failed");
                (format!("Req {i}: {CONNECT_ERROR_LINE}"), None)
            }
        };
        println!("{line}");
        report.lines.push(line);

        let hit = match (&options.stop_on, &verdict) {
            (Some(needle), Some(text)) => text.contains(needle.as_str()),
            _ => false,
        };
        if hit {
            info!(request = i, "stop condition observed");
            report.stopped_early = true;
            break;
        }

        if i < options.count {
            time::sleep(options.interval).await;
        }
    }

    let summary = match client.global_stats().await {
        Ok(stats) => format!(
            "Current stats: timestamps={} active={} queued={} flagged={}",
            stats.timestamps.len(),
            stats.active_requests.unwrap_or(0),
            stats.queued_requests.unwrap_or(0),
            stats.total_flagged.unwrap_or(0)
        ),
        Err(e) => format!("Current stats unavailable: {e}"),
    };
    println!("{summary}");
    report.lines.push(summary);

    report
}

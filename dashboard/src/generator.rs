use std::collections::VecDeque;
use std::time::Duration;

use tracing::{info, warn};

use crate::api::ApiError;
use crate::poll::Poller;
use crate::scheduler::{FirstTick, RepeatTimer};
use crate::types::RequestOutcome;

/// 表示するログの最大保持件数
const MAX_LOG_LINES: usize = 500;

pub const START_LABEL: &str = "Start Spam Mode";
pub const STOP_LABEL: &str = "Stop Spam Mode";
pub const CONNECT_ERROR_LINE: &str = "Error connecting to server";

/// 負荷テスト用のリクエスト送信器
#[derive(Debug)]
pub struct RequestGenerator {
    log: VecDeque<String>,
    repeat: RepeatTimer,
    in_flight: usize,
}

impl RequestGenerator {
    /// `cadence` は連続送信モードの送信間隔
    pub fn new(cadence: Duration) -> Self {
        Self {
            log: VecDeque::with_capacity(MAX_LOG_LINES),
            repeat: RepeatTimer::new(cadence, FirstTick::AfterPeriod),
            in_flight: 0,
        }
    }

    /// 1件送信する。結果は `record` で反映される
    pub fn send_once(&mut self, poller: &Poller) {
        self.in_flight += 1;
        poller.send_request();
    }

    /// 連続送信モードの切り替え。切り替え後に動作中なら true
    pub fn toggle_repeat(&mut self) -> bool {
        let running = self.repeat.toggle();
        info!(
            running,
            cadence_ms = self.repeat.period().as_millis() as u64,
            "spam mode toggled"
        );
        running
    }

    pub fn is_repeating(&self) -> bool {
        self.repeat.is_running()
    }

    pub fn button_label(&self) -> &'static str {
        if self.is_repeating() {
            STOP_LABEL
        } else {
            START_LABEL
        }
    }

    /// 連続送信モードの次の送信タイミングまで待つ（停止中は完了しない）
    pub async fn next_repeat(&mut self) {
        self.repeat.tick().await;
    }

    /// 応答をログの先頭に追加する
    pub fn record(&mut self, result: Result<RequestOutcome, ApiError>, time: &str) {
        self.in_flight = self.in_flight.saturating_sub(1);

        let line = match result {
            Ok(outcome) => format_outcome(&outcome, time),
            Err(e) => {
                warn!(error = %e, "request failed");
                CONNECT_ERROR_LINE.to_string()
            }
        };

        self.log.push_front(line);
        if self.log.len() > MAX_LOG_LINES {
            self.log.pop_back();
        }
    }

    pub fn log(&self) -> &VecDeque<String> {
        &self.log
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

fn format_outcome(outcome: &RequestOutcome, time: &str) -> String {
    let mut line = format!(
        "[{time}] Status: {} (Active: {})",
        outcome.status,
        outcome.active_or_zero()
    );
    if let Some(queue) = outcome.queue.filter(|q| *q > 0) {
        line.push_str(&format!(" (Queue: {queue})"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StatsClient;
    use crate::poll::Update;
    use crate::test_support::{closed_port_url, fake_server};
    use reqwest::StatusCode;
    use tokio::time;

    fn outcome(status: &str, active: Option<u64>, queue: Option<u64>) -> RequestOutcome {
        RequestOutcome {
            status: status.to_string(),
            active,
            queue,
        }
    }

    #[test]
    fn outcome_lines_are_newest_first() {
        let mut generator = RequestGenerator::new(Duration::from_millis(250));
        generator.record(Ok(outcome("Processed", Some(3), Some(0))), "10:00:00");
        generator.record(Ok(outcome("Processed (After Waiting)", None, Some(2))), "10:00:01");

        let lines: Vec<&str> = generator.log().iter().map(String::as_str).collect();
        assert_eq!(
            lines,
            vec![
                "[10:00:01] Status: Processed (After Waiting) (Active: 0) (Queue: 2)",
                "[10:00:00] Status: Processed (Active: 3)",
            ]
        );
    }

    #[test]
    fn non_success_status_becomes_error_line() {
        let mut generator = RequestGenerator::new(Duration::from_millis(250));
        generator.record(
            Err(ApiError::Status {
                endpoint: "/api/request".to_string(),
                status: StatusCode::TOO_MANY_REQUESTS,
                detail: Some("Rate limited".to_string()),
            }),
            "10:00:00",
        );

        assert_eq!(generator.log().len(), 1);
        assert_eq!(generator.log()[0], CONNECT_ERROR_LINE);
    }

    #[test]
    fn log_is_bounded() {
        let mut generator = RequestGenerator::new(Duration::from_millis(250));
        for i in 0..(MAX_LOG_LINES + 20) {
            generator.record(Ok(outcome("Processed", Some(i as u64), None)), "10:00:00");
        }

        assert_eq!(generator.log().len(), MAX_LOG_LINES);
        assert!(generator.log()[0].ends_with(&format!("(Active: {})", MAX_LOG_LINES + 19)));
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_twice_restores_label_and_stops_firing() {
        let mut generator = RequestGenerator::new(Duration::from_millis(250));
        assert_eq!(generator.button_label(), START_LABEL);

        assert!(generator.toggle_repeat());
        assert_eq!(generator.button_label(), STOP_LABEL);

        let mut fired = 0;
        for _ in 0..4 {
            generator.next_repeat().await;
            fired += 1;
        }
        assert_eq!(fired, 4);

        assert!(!generator.toggle_repeat());
        assert_eq!(generator.button_label(), START_LABEL);

        let waited = time::timeout(Duration::from_secs(5), generator.next_repeat()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn failed_send_logs_one_error_and_keeps_repeating() {
        let (poller, mut updates) = Poller::channel(StatsClient::new(&closed_port_url().await));
        let mut generator = RequestGenerator::new(Duration::from_millis(250));
        generator.toggle_repeat();

        generator.send_once(&poller);
        assert_eq!(generator.in_flight(), 1);

        match updates.recv().await.unwrap() {
            Update::Request(result) => generator.record(result, "10:00:00"),
            other => panic!("unexpected update: {other:?}"),
        }

        let lines: Vec<&str> = generator.log().iter().map(String::as_str).collect();
        assert_eq!(lines, vec![CONNECT_ERROR_LINE]);
        assert_eq!(generator.in_flight(), 0);
        assert!(generator.is_repeating());
    }

    #[tokio::test]
    async fn in_flight_request_still_logs_after_stop() {
        let (poller, mut updates) = Poller::channel(StatsClient::new(&fake_server().await));
        let mut generator = RequestGenerator::new(Duration::from_millis(250));
        generator.toggle_repeat();
        generator.send_once(&poller);
        generator.toggle_repeat();

        match updates.recv().await.unwrap() {
            Update::Request(result) => generator.record(result, "10:00:00"),
            other => panic!("unexpected update: {other:?}"),
        }

        assert_eq!(generator.log()[0], "[10:00:00] Status: Processed (Active: 3)");
        assert!(!generator.is_repeating());
    }
}

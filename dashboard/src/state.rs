use chrono::{DateTime, Local};
use ratatui::style::Color;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::bucket::{DRILLDOWN_WINDOW, GLOBAL_WINDOW, bucketize};
use crate::chart::{ChartKind, ChartSurface};
use crate::flagged::FlaggedList;
use crate::generator::RequestGenerator;
use crate::poll::{AdminAction, Update};
use crate::types::GlobalStats;

/// アプリケーションの入力モードの管理用の列挙型
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// 状態の反映後にメインループが行うべき処理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    Nothing,
    RefreshGlobal,
}

/// 全体統計のうちグラフ以外の値
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlobalSummary {
    pub active: u64,
    pub queued: u64,
    pub flagged: u64,
}

impl From<&GlobalStats> for GlobalSummary {
    fn from(stats: &GlobalStats) -> Self {
        Self {
            active: stats.active_requests.unwrap_or(0),
            queued: stats.queued_requests.unwrap_or(0),
            flagged: stats.total_flagged.unwrap_or(0),
        }
    }
}

/// 取得に失敗した処理の種類。成功したときに自分のエラーだけを消すために持つ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Global,
    Flagged,
    History,
    Admin,
}

impl FetchSource {
    fn label(self) -> &'static str {
        match self {
            FetchSource::Global => "global stats",
            FetchSource::Flagged => "flagged list",
            FetchSource::History => "key history",
            FetchSource::Admin => "admin action",
        }
    }
}

/// ステータス行に出すメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub is_error: bool,
    pub source: Option<FetchSource>,
}

impl StatusLine {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
            source: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
            source: None,
        }
    }

    fn fetch_failed(source: FetchSource, error: &ApiError) -> Self {
        Self {
            text: format!("{}: {error}", source.label()),
            is_error: true,
            source: Some(source),
        }
    }
}

/// アプリケーション全体の状態を保持する構造体
#[derive(Debug)]
pub struct AppState {
    pub global_chart: ChartSurface,
    pub drilldown_chart: ChartSurface,
    pub flagged: FlaggedList,
    pub selected_key: Option<String>,
    pub generator: RequestGenerator,
    pub global_summary: Option<GlobalSummary>,
    pub status: Option<StatusLine>,
    pub editing_text: String,
    pub input_mode: InputMode,
}

impl AppState {
    pub fn new(flagged: FlaggedList, generator: RequestGenerator) -> Self {
        Self {
            global_chart: ChartSurface::initialize(
                ChartKind::Line,
                "Global Requests/Sec",
                Color::Blue,
            ),
            drilldown_chart: ChartSurface::initialize(ChartKind::Bar, "IP Activity", Color::Red),
            flagged,
            selected_key: None,
            generator,
            global_summary: None,
            status: None,
            editing_text: String::new(),
            input_mode: InputMode::Normal,
        }
    }

    /// 取得結果を反映する。`now` はバケットの終端とログの時刻に使う
    pub fn apply(&mut self, update: Update, now: DateTime<Local>) -> FollowUp {
        let second = now.timestamp();

        match update {
            Update::Global(Ok(stats)) => {
                let buckets = bucketize(&stats.timestamps, second, GLOBAL_WINDOW);
                self.global_chart.update(&buckets);
                self.global_summary = Some(GlobalSummary::from(&stats));
                debug!(
                    total = self.global_chart.total(),
                    now = second,
                    "global chart refreshed"
                );
                self.clear_error(FetchSource::Global);
            }
            Update::Global(Err(e)) => self.report_error(FetchSource::Global, &e),
            Update::Flagged(Ok(snapshot)) => {
                self.flagged.render(&snapshot);
                self.clear_error(FetchSource::Flagged);
            }
            Update::Flagged(Err(e)) => self.report_error(FetchSource::Flagged, &e),
            Update::History { key, result } => {
                if self.selected_key.as_deref() != Some(key.as_str()) {
                    debug!(key = %key, "discarding history for a key that is no longer selected");
                    return FollowUp::Nothing;
                }
                match result {
                    Ok(history) => {
                        let buckets = bucketize(&history.history, second, DRILLDOWN_WINDOW);
                        self.drilldown_chart.update(&buckets);
                        debug!(key = %key, total = self.drilldown_chart.total(), "drill-down refreshed");
                        self.clear_error(FetchSource::History);
                    }
                    Err(e) => self.report_error(FetchSource::History, &e),
                }
            }
            Update::Request(result) => {
                let time = now.format("%H:%M:%S").to_string();
                self.generator.record(result, &time);
            }
            Update::Admin { action, result } => match result {
                Ok(reply) => {
                    info!(?action, status = %reply.status, "admin action completed");
                    if let AdminAction::Unblock(key) = &action {
                        self.flagged.remove(key);
                    }
                    let text = if reply.message.is_empty() {
                        reply.status
                    } else {
                        reply.message
                    };
                    self.status = Some(StatusLine::info(text));
                    return FollowUp::RefreshGlobal;
                }
                Err(e) => self.report_error(FetchSource::Admin, &e),
            },
        }

        FollowUp::Nothing
    }

    /// 履歴表示の対象キーを切り替える
    pub fn select_key(&mut self, key: String) {
        self.selected_key = Some(key);
    }

    fn report_error(&mut self, source: FetchSource, error: &ApiError) {
        warn!(what = source.label(), error = %error, "fetch failed");
        self.status = Some(StatusLine::fetch_failed(source, error));
    }

    // 同じ取得元のエラーだけを消す
    fn clear_error(&mut self, source: FetchSource) {
        if self
            .status
            .as_ref()
            .is_some_and(|s| s.source == Some(source))
        {
            self.status = None;
        }
    }

    pub fn start_editing(&mut self) {
        self.editing_text = self.flagged.filter_text().to_string();
        self.input_mode = InputMode::Editing;
    }

    pub fn submit_editing(&mut self) {
        let text = std::mem::take(&mut self.editing_text);
        self.flagged.set_filter(text);
        self.input_mode = InputMode::Normal;
    }

    pub fn cancel_editing(&mut self) {
        self.editing_text.clear();
        self.input_mode = InputMode::Normal;
    }
}

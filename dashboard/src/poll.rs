use std::future::Future;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::api::{ApiError, StatsClient};
use crate::types::{AdminReply, FlaggedSnapshot, GlobalStats, KeyHistory, RequestOutcome};

/// 管理操作の種類
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    Unblock(String),
    ClearLogs,
}

/// 非同期に取得した結果。メインループで一つずつ状態に反映する
#[derive(Debug)]
pub enum Update {
    Global(Result<GlobalStats, ApiError>),
    Flagged(Result<FlaggedSnapshot, ApiError>),
    History {
        key: String,
        result: Result<KeyHistory, ApiError>,
    },
    Request(Result<RequestOutcome, ApiError>),
    Admin {
        action: AdminAction,
        result: Result<AdminReply, ApiError>,
    },
}

/// 各取得処理を個別のタスクで走らせ、結果をチャネルへ送る。
///
/// 取得同士は互いを待たないので、一方の失敗がもう一方を止めることはない。
/// 同じ画面向けの結果は届いた順にそのまま反映する（後着優先）。
#[derive(Debug, Clone)]
pub struct Poller {
    client: StatsClient,
    updates: UnboundedSender<Update>,
}

impl Poller {
    pub fn channel(client: StatsClient) -> (Self, UnboundedReceiver<Update>) {
        let (updates, rx) = mpsc::unbounded_channel();
        (Self { client, updates }, rx)
    }

    /// 全体グラフとフラグ一覧の更新
    pub fn refresh_global(&self) {
        let client = self.client.clone();
        self.spawn(async move { Update::Global(client.global_stats().await) });

        let client = self.client.clone();
        self.spawn(async move { Update::Flagged(client.flagged().await) });
    }

    /// 選択中キーの履歴の更新
    pub fn refresh_drilldown(&self, key: &str) {
        let client = self.client.clone();
        let key = key.to_string();
        self.spawn(async move {
            let result = client.key_history(&key).await;
            Update::History { key, result }
        });
    }

    pub fn send_request(&self) {
        let client = self.client.clone();
        self.spawn(async move { Update::Request(client.send_request().await) });
    }

    pub fn unblock(&self, key: &str) {
        let client = self.client.clone();
        let key = key.to_string();
        self.spawn(async move {
            let result = client.unblock(&key).await;
            Update::Admin {
                action: AdminAction::Unblock(key),
                result,
            }
        });
    }

    pub fn clear_logs(&self) {
        let client = self.client.clone();
        self.spawn(async move {
            Update::Admin {
                action: AdminAction::ClearLogs,
                result: client.clear_logs().await,
            }
        });
    }

    fn spawn<F>(&self, fetch: F)
    where
        F: Future<Output = Update> + Send + 'static,
    {
        let updates = self.updates.clone();
        tokio::spawn(async move {
            // 受信側が閉じていれば終了処理中なので捨てる
            if updates.send(fetch.await).is_err() {
                debug!("update receiver closed; dropping result");
            }
        });
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// APIエンドポイントのパス定数
pub const GLOBAL_STATS_PATH: &str = "/api/stats/global";
pub const FLAGGED_PATH: &str = "/api/stats/flagged";
pub const KEY_HISTORY_PATH: &str = "/api/stats/ip";
pub const REQUEST_PATH: &str = "/api/request";
pub const UNBLOCK_PATH: &str = "/api/admin/unblock";
pub const CLEAR_LOGS_PATH: &str = "/api/admin/clear-logs";

// 全体の統計（直近のリクエスト時刻の一覧）
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GlobalStats {
    pub timestamps: Vec<f64>,
    #[serde(default)]
    pub active_requests: Option<u64>,
    #[serde(default)]
    pub queued_requests: Option<u64>,
    #[serde(default)]
    pub total_flagged: Option<u64>,
}

// フラグ付きキーの理由
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FlaggedEntry {
    pub reason: String,
    #[serde(default)]
    pub flagged_at: Option<f64>,
}

/// サーバーから毎回まるごと置き換えられるフラグ一覧
pub type FlaggedSnapshot = BTreeMap<String, FlaggedEntry>;

// キーごとのリクエスト履歴
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct KeyHistory {
    pub history: Vec<f64>,
}

// /api/request の応答
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub status: String,
    #[serde(default)]
    pub active: Option<u64>,
    #[serde(default)]
    pub queue: Option<u64>,
}

impl RequestOutcome {
    /// `active` が無い、または null の場合は 0
    pub fn active_or_zero(&self) -> u64 {
        self.active.unwrap_or(0)
    }
}

// 管理系エンドポイントの応答
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AdminReply {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_outcome_defaults_active_to_zero() {
        let missing: RequestOutcome = serde_json::from_str(r#"{"status":"Processed"}"#).unwrap();
        assert_eq!(missing.active_or_zero(), 0);

        let null: RequestOutcome =
            serde_json::from_str(r#"{"status":"Processed","active":null}"#).unwrap();
        assert_eq!(null.active_or_zero(), 0);

        let present: RequestOutcome =
            serde_json::from_str(r#"{"status":"Processed","active":7,"queue":2}"#).unwrap();
        assert_eq!(present.active_or_zero(), 7);
        assert_eq!(present.queue, Some(2));
    }

    #[test]
    fn flagged_snapshot_parses_server_mapping() {
        let body = r#"{
            "10.0.0.9": {"reason": "Bot-like regularity (Var: 0.0001)", "flagged_at": 1700000000.5},
            "10.0.0.2": {"reason": "manual"}
        }"#;
        let snapshot: FlaggedSnapshot = serde_json::from_str(body).unwrap();

        let keys: Vec<&str> = snapshot.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["10.0.0.2", "10.0.0.9"]);
        assert_eq!(snapshot["10.0.0.2"].flagged_at, None);
    }

    #[test]
    fn global_stats_tolerates_missing_extras() {
        let stats: GlobalStats = serde_json::from_str(r#"{"timestamps":[1.5,2.0]}"#).unwrap();
        assert_eq!(stats.timestamps, vec![1.5, 2.0]);
        assert_eq!(stats.active_requests, None);
    }
}

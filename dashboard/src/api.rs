//! ダッシュボードが読むサーバー側APIのクライアント。
//!
//! 読み取り用の3エンドポイントと、負荷テスト用の `/api/request`、
//! 管理用の2エンドポイントを扱う。タイムアウトは設定しない。
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::types::{
    AdminReply, CLEAR_LOGS_PATH, FLAGGED_PATH, FlaggedSnapshot, GLOBAL_STATS_PATH, GlobalStats,
    KEY_HISTORY_PATH, KeyHistory, REQUEST_PATH, RequestOutcome, UNBLOCK_PATH,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not reach {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}{}", detail_suffix(.detail))]
    Status {
        endpoint: String,
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot build a request URL from {base_url}")]
    BaseUrl { base_url: String },
    #[error("{key:?} cannot be used as a path segment")]
    InvalidKey { key: String },
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default()
}

// 2xx以外の応答に含まれることがある説明
#[derive(Deserialize)]
struct ErrorBody {
    status: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StatsClient {
    base_url: String,
    http: reqwest::Client,
}

impl StatsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn global_stats(&self) -> Result<GlobalStats, ApiError> {
        self.call(Method::GET, GLOBAL_STATS_PATH, None).await
    }

    pub async fn flagged(&self) -> Result<FlaggedSnapshot, ApiError> {
        self.call(Method::GET, FLAGGED_PATH, None).await
    }

    pub async fn key_history(&self, key: &str) -> Result<KeyHistory, ApiError> {
        self.call(Method::GET, KEY_HISTORY_PATH, Some(key)).await
    }

    pub async fn send_request(&self) -> Result<RequestOutcome, ApiError> {
        self.call(Method::GET, REQUEST_PATH, None).await
    }

    pub async fn unblock(&self, key: &str) -> Result<AdminReply, ApiError> {
        self.call(Method::POST, UNBLOCK_PATH, Some(key)).await
    }

    pub async fn clear_logs(&self) -> Result<AdminReply, ApiError> {
        self.call(Method::POST, CLEAR_LOGS_PATH, None).await
    }

    /// `path` の後ろに `key` を1セグメントとして付けたURL。
    ///
    /// キーはサーバー側のヘッダー由来なので、`/` や `#` はエスケープして
    /// 別のエンドポイントやフラグメントに化けないようにする。
    fn url_for(&self, path: &str, key: Option<&str>) -> Result<Url, ApiError> {
        let base_error = || ApiError::BaseUrl {
            base_url: self.base_url.clone(),
        };
        if let Some(key) = key {
            // "." と ".." はURLの正規化で消えてしまう
            if matches!(key, "" | "." | "..") {
                return Err(ApiError::InvalidKey {
                    key: key.to_string(),
                });
            }
        }

        let mut url = Url::parse(&self.base_url).map_err(|_| base_error())?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| base_error())?;
            segments.pop_if_empty();
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
            if let Some(key) = key {
                segments.push(key);
            }
        }
        Ok(url)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        key: Option<&str>,
    ) -> Result<T, ApiError> {
        let url = self.url_for(path, key)?;
        let endpoint = match key {
            Some(key) => format!("{path}/{key}"),
            None => path.to_string(),
        };
        let transport = |source| ApiError::Transport {
            endpoint: endpoint.clone(),
            source,
        };

        let response = self
            .http
            .request(method, url)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.status.or(b.detail));
            return Err(ApiError::Status {
                endpoint,
                status,
                detail,
            });
        }

        serde_json::from_slice(&body).map_err(|source| ApiError::Decode {
            endpoint,
            source,
        })
    }
}

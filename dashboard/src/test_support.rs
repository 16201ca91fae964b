//! テスト用のサーバー（ローカルポートで axum を起動する）
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use crate::bucket::unix_now;

pub(crate) const FLAGGED_KEY: &str = "10.0.0.7";

pub(crate) async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// 誰も待ち受けていないアドレス
pub(crate) async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub(crate) fn stats_router() -> Router {
    Router::new()
        .route("/api/stats/global", get(global_stats))
        .route("/api/stats/flagged", get(flagged))
        .route("/api/stats/ip/{key}", get(key_history))
        .route("/api/request", get(request))
        .route("/api/admin/unblock/{key}", post(unblock))
        .route("/api/admin/clear-logs", post(clear_logs))
}

pub(crate) async fn fake_server() -> String {
    serve(stats_router()).await
}

pub(crate) async fn global_stats() -> Json<serde_json::Value> {
    let now = unix_now() as f64;
    Json(json!({
        "timestamps": [now + 0.25, now - 1.5, now - 2.0],
        "active_requests": 4,
        "queued_requests": 1,
        "total_flagged": 1
    }))
}

async fn flagged() -> Json<serde_json::Value> {
    Json(json!({
        FLAGGED_KEY: { "reason": "Bot-like regularity (Var: 0.0001)", "flagged_at": 1_700_000_000.0 }
    }))
}

async fn key_history(Path(key): Path<String>) -> Json<serde_json::Value> {
    if key != FLAGGED_KEY {
        return Json(json!({ "history": [] }));
    }
    let now = unix_now() as f64;
    Json(json!({ "history": [now, now, now - 5.0] }))
}

async fn request() -> Json<serde_json::Value> {
    Json(json!({ "status": "Processed", "active": 3, "queue": 0 }))
}

async fn unblock(Path(key): Path<String>) -> impl IntoResponse {
    if key == FLAGGED_KEY {
        (
            StatusCode::OK,
            Json(json!({ "status": "Success", "message": format!("IP {key} unblocked") })),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "IP not found in blocklist" })),
        )
    }
}

async fn clear_logs() -> Json<serde_json::Value> {
    Json(json!({ "status": "Success", "message": "All logs cleared" }))
}

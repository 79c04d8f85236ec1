//! HTTP 服务：Orchestrator 之上的薄门面
//!
//! 路由：GET /health 健康检查、POST /ask 处理用户输入、GET /history 查询
//! 持久化历史。全局允许跨域（前端独立部署）。核心只收发纯数据，
//! JSON 编解码与状态码都在这一层。

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tower_http::cors::CorsLayer;

use crate::core::{AssistantError, Orchestrator};

/// 服务共享状态
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

const DEFAULT_USER: &str = "default_user";

/// /ask 请求体
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub input: Option<String>,
    /// 请求级上下文覆盖项（同名键覆盖存储中的值）
    pub context: Option<Map<String, Value>>,
    pub user_id: Option<String>,
}

/// /history 查询参数
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

/// 构建路由
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask))
        .route("/history", get(history))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 启动 HTTP 服务
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Andy server listening on {}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}

/// 健康检查
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// 处理用户输入
async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> (StatusCode, Json<Value>) {
    let Some(input) = req.input else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "缺少必要参数 input"})),
        );
    };
    let user_id = req.user_id.as_deref().unwrap_or(DEFAULT_USER);

    tracing::info!(user_id, "Received /ask request");

    match state
        .orchestrator
        .process(user_id, &input, req.context)
        .await
    {
        Ok(reply) => match serde_json::to_value(&reply) {
            Ok(value) => (StatusCode::OK, Json(value)),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("序列化响应失败: {}", e)})),
            ),
        },
        Err(AssistantError::EmptyInput) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "输入不能为空"})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": e.to_string()})),
        ),
    }
}

/// 查询持久化历史（时间正序）
async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> (StatusCode, Json<Value>) {
    let user_id = query.user_id.as_deref().unwrap_or(DEFAULT_USER);
    let limit = query.limit.unwrap_or(10);

    match state.orchestrator.memory().get_history(user_id, limit).await {
        Ok(records) => (
            StatusCode::OK,
            Json(json!({ "user_id": user_id, "history": records })),
        ),
        Err(e @ crate::memory::StoreError::InvalidLimit(_)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": e.to_string()})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": e.to_string()})),
        ),
    }
}

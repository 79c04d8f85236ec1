//! 长期记忆：对话历史持久化
//!
//! HistoryStore 为追加写 + 按序读的存储抽象：SqliteHistoryStore（sqlx 异步
//! SQLite）为默认实现；MemoryHistoryStore 为无持久化的降级模式。
//! 行插入后不再修改或重排，读取按自增主键排序（同一时间戳下仍保持插入序）。

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use thiserror::Error;
use tokio::sync::RwLock;

use super::conversation::ConversationTurn;

/// 持久化层错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid limit: {0} (must be >= 1)")]
    InvalidLimit(usize),
}

/// 一条持久化的历史记录（按 user_id + 自增序号定位，追加后只读）
#[derive(Clone, Debug, Serialize)]
pub struct HistoryRecord {
    pub timestamp: String,
    pub user: String,
    pub assistant: String,
}

/// 历史存储抽象：追加一轮对话 / 读取最近 limit 条（时间正序返回）
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, user_id: &str, turn: &ConversationTurn) -> Result<(), StoreError>;

    /// 最近 limit 条记录，按插入序（最旧在前）返回；limit 必须 >= 1
    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>, StoreError>;
}

/// SQLite 持久化：conversation_history 追加写，user_profile 仅建表保留
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// 打开（不存在则创建）数据库并初始化表结构
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let store = Self { pool };
        store.init_tables().await?;

        Ok(store)
    }

    /// 初始化数据库表
    async fn init_tables(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS conversation_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL DEFAULT 'default_user',
                timestamp TEXT NOT NULL,
                user_input TEXT NOT NULL,
                assistant_response TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        // 用户画像表：仅保留存储形状，当前无读写路径
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_profile (
                user_id TEXT PRIMARY KEY,
                profile_data TEXT,
                last_updated TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_history_user ON conversation_history(user_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, user_id: &str, turn: &ConversationTurn) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO conversation_history (user_id, timestamp, user_input, assistant_response)
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&turn.timestamp)
        .bind(&turn.user)
        .bind(&turn.assistant)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>, StoreError> {
        if limit == 0 {
            return Err(StoreError::InvalidLimit(limit));
        }

        // 按自增主键倒序取最近 limit 条，再反转为时间正序
        let rows = sqlx::query(
            "SELECT timestamp, user_input, assistant_response FROM conversation_history
             WHERE user_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut records: Vec<HistoryRecord> = rows
            .into_iter()
            .map(|row| HistoryRecord {
                timestamp: row.get(0),
                user: row.get(1),
                assistant: row.get(2),
            })
            .collect();
        records.reverse();

        Ok(records)
    }
}

/// 内存历史存储：进程内 Vec，按插入序追加；用于无持久化的降级模式与测试
#[derive(Default)]
pub struct MemoryHistoryStore {
    records: RwLock<HashMap<String, Vec<HistoryRecord>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, user_id: &str, turn: &ConversationTurn) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records
            .entry(user_id.to_string())
            .or_default()
            .push(HistoryRecord {
                timestamp: turn.timestamp.clone(),
                user: turn.user.clone(),
                assistant: turn.assistant.clone(),
            });
        Ok(())
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>, StoreError> {
        if limit == 0 {
            return Err(StoreError::InvalidLimit(limit));
        }

        let records = self.records.read().await;
        let all = records.get(user_id).map(|v| v.as_slice()).unwrap_or(&[]);
        let start = all.len().saturating_sub(limit);
        Ok(all[start..].to_vec())
    }
}

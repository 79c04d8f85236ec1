//! 记忆层：短期（进程内有界）+ 长期（持久化追加写）
//!
//! Memory 按 user_id 隔离会话：短期记忆为每用户最近 max_turns 轮对话的
//! FIFO 窗口，长期记忆为 HistoryStore 的追加写。append 在每用户锁内依次
//! 完成两步写入：持久化失败只记录并上报降级标志，不回滚短期记忆。

pub mod conversation;
pub mod store;

pub use conversation::{ConversationContext, ConversationTurn, SessionContext};
pub use store::{HistoryRecord, HistoryStore, MemoryHistoryStore, SqliteHistoryStore, StoreError};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde_json::Map;
use tokio::sync::{Mutex, RwLock};

/// 连续持久化失败达到该次数后置降级标志，成功一次即复位
const DEGRADED_AFTER_FAILURES: u32 = 3;

/// 双层对话记忆管理器（按 user_id 隔离）
pub struct Memory {
    max_turns: usize,
    /// user_id -> 会话短期记忆；每用户一把锁，append 串行化互不跨用户阻塞
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionContext>>>>,
    store: Arc<dyn HistoryStore>,
    /// 连续持久化失败计数
    durable_failures: AtomicU32,
}

impl Memory {
    pub fn new(max_turns: usize, store: Arc<dyn HistoryStore>) -> Self {
        Self {
            max_turns,
            sessions: RwLock::new(HashMap::new()),
            store,
            durable_failures: AtomicU32::new(0),
        }
    }

    /// 获取或创建用户的会话（双重检查，避免写锁竞争下重复创建）
    async fn get_or_create(&self, user_id: &str) -> Arc<Mutex<SessionContext>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(user_id) {
                return Arc::clone(session);
            }
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(user_id) {
            return Arc::clone(session);
        }

        let session = Arc::new(Mutex::new(SessionContext::new(self.max_turns)));
        sessions.insert(user_id.to_string(), Arc::clone(&session));
        session
    }

    /// 当前对话上下文的只读快照（无会话时返回空历史）
    pub async fn get_context(&self, user_id: &str) -> ConversationContext {
        // 先克隆会话句柄并释放 map 读锁，再等会话锁：append 可能正持有
        // 会话锁做持久化 I/O，若此时还攥着 map 锁，其他用户的首次
        // get_or_create 会被这次无关的慢写入卡住
        let session = {
            let sessions = self.sessions.read().await;
            sessions.get(user_id).cloned()
        };

        let history = match session {
            Some(session) => session.lock().await.turns().to_vec(),
            None => Vec::new(),
        };

        ConversationContext {
            history,
            snapshot_at: chrono::Utc::now().to_rfc3339(),
            extras: Map::new(),
        }
    }

    /// 追加一轮对话：先更新短期记忆（超界裁剪最旧），再写长期存储。
    ///
    /// 两步都在该用户的会话锁内执行，保证同一用户的 append 串行、
    /// 短期窗口与持久化追加序一致；不同用户各持各锁，互不阻塞。
    /// 持久化失败不回滚短期记忆，错误返回给调用方并计入降级计数。
    pub async fn append(&self, user_id: &str, turn: ConversationTurn) -> Result<(), StoreError> {
        let session = self.get_or_create(user_id).await;
        let mut session = session.lock().await;

        session.push(turn.clone());

        match self.store.append(user_id, &turn).await {
            Ok(()) => {
                self.durable_failures.store(0, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                let failures = self.durable_failures.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    user_id,
                    consecutive_failures = failures,
                    "Durable append failed, session continues in-memory: {}",
                    e
                );
                Err(e)
            }
        }
    }

    /// 读取持久化历史：最近 limit 条，时间正序。纯读操作。
    pub async fn get_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, StoreError> {
        self.store.recent(user_id, limit).await
    }

    /// 持久化是否已降级（连续失败达到阈值）
    pub fn persistence_degraded(&self) -> bool {
        self.durable_failures.load(Ordering::Relaxed) >= DEGRADED_AFTER_FAILURES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::{Duration, Instant};

    use async_trait::async_trait;

    fn memory(max_turns: usize) -> Memory {
        Memory::new(max_turns, Arc::new(MemoryHistoryStore::new()))
    }

    /// 对指定用户的持久化写入很慢的存储：模拟单用户的 I/O 悬挂
    struct SlowStore {
        slow_user: &'static str,
        delay: Duration,
    }

    #[async_trait]
    impl HistoryStore for SlowStore {
        async fn append(&self, user_id: &str, _turn: &ConversationTurn) -> Result<(), StoreError> {
            if user_id == self.slow_user {
                tokio::time::sleep(self.delay).await;
            }
            Ok(())
        }

        async fn recent(
            &self,
            _user_id: &str,
            _limit: usize,
        ) -> Result<Vec<HistoryRecord>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_window_keeps_last_k_turns() {
        let mem = memory(2);
        for i in 0..3 {
            let turn = ConversationTurn::new(format!("q{}", i), format!("a{}", i));
            mem.append("u1", turn).await.unwrap();
        }

        let ctx = mem.get_context("u1").await;
        assert_eq!(ctx.history.len(), 2);
        assert_eq!(ctx.history[0].user, "q1");
        assert_eq!(ctx.history[1].user, "q2");
    }

    #[tokio::test]
    async fn test_context_is_isolated_copy() {
        let mem = memory(10);
        mem.append("u1", ConversationTurn::new("q", "a"))
            .await
            .unwrap();

        let mut ctx = mem.get_context("u1").await;
        ctx.history.clear();

        // 外部修改快照不影响存储中的会话
        assert_eq!(mem.get_context("u1").await.history.len(), 1);
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let mem = memory(10);
        mem.append("u1", ConversationTurn::new("q1", "a1"))
            .await
            .unwrap();
        mem.append("u2", ConversationTurn::new("q2", "a2"))
            .await
            .unwrap();

        assert_eq!(mem.get_context("u1").await.history[0].user, "q1");
        assert_eq!(mem.get_context("u2").await.history[0].user, "q2");
        assert!(mem.get_context("u3").await.history.is_empty());
    }

    #[tokio::test]
    async fn test_slow_durable_write_does_not_block_other_users() {
        let mem = Arc::new(Memory::new(
            10,
            Arc::new(SlowStore {
                slow_user: "user_a",
                delay: Duration::from_secs(1),
            }),
        ));

        // user_a 的 append 在会话锁内做慢持久化写入
        let appender = {
            let mem = Arc::clone(&mem);
            tokio::spawn(async move {
                mem.append("user_a", ConversationTurn::new("q", "a"))
                    .await
                    .unwrap();
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // 同一用户的并发 get_context 会停在会话锁上；此时不得占着 map 锁
        let reader = {
            let mem = Arc::clone(&mem);
            tokio::spawn(async move { mem.get_context("user_a").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // 新用户的首次 append 需要 map 写锁，不能被 user_a 的慢写入卡住
        let start = Instant::now();
        mem.append("user_b", ConversationTurn::new("q", "a"))
            .await
            .unwrap();
        let elapsed = start.elapsed();
        assert!(
            elapsed < Duration::from_millis(500),
            "user_b append blocked for {:?} behind user_a's durable write",
            elapsed
        );

        appender.await.unwrap();
        reader.await.unwrap();
    }

    #[tokio::test]
    async fn test_history_round_trip_order() {
        let mem = memory(2);
        for i in 0..5 {
            let turn = ConversationTurn::new(format!("q{}", i), format!("a{}", i));
            mem.append("u1", turn).await.unwrap();
        }

        // 短期窗口只剩最近 2 轮，但持久化历史完整保留 5 条
        let history = mem.get_history("u1", 5).await.unwrap();
        assert_eq!(history.len(), 5);
        for (i, record) in history.iter().enumerate() {
            assert_eq!(record.user, format!("q{}", i));
        }
    }
}

//! 短期记忆：对话历史
//!
//! 每轮对话为一条 user/assistant 配对，按时间顺序保留最近 max_turns 轮，
//! 超出时丢弃最旧的（FIFO 裁剪），供技能构造 LLM 上下文使用。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 单轮对话：用户输入 + 助手回复 + RFC3339 时间戳。创建后不可变。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user: String,
    pub assistant: String,
    pub timestamp: String,
}

impl ConversationTurn {
    /// 以当前时刻创建一轮对话
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// 单用户会话的短期记忆：最近 max_turns 轮对话
#[derive(Clone, Debug)]
pub struct SessionContext {
    turns: Vec<ConversationTurn>,
    max_turns: usize,
}

impl SessionContext {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns,
        }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
        self.prune();
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// 超出 max_turns 时丢弃最旧的轮次，保留最近部分
    fn prune(&mut self) {
        if self.turns.len() > self.max_turns {
            let keep = self.max_turns;
            self.turns.drain(..self.turns.len() - keep);
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// 对话上下文快照：历史轮次的只读副本 + 快照时刻 + 调用方附加键值
///
/// 由 `Memory::get_context` 按值返回，外部修改不会影响存储中的会话状态。
#[derive(Clone, Debug, Serialize)]
pub struct ConversationContext {
    pub history: Vec<ConversationTurn>,
    pub snapshot_at: String,
    /// 调用方覆盖项（请求级上下文），同名键以最后写入为准
    pub extras: Map<String, Value>,
}

impl ConversationContext {
    /// 合并调用方覆盖项：extras 中同名键覆盖已有值（last-write-wins）
    ///
    /// 覆盖只作用于请求级键值 extras。history 与 snapshot_at 是记忆层
    /// 维护的结构化字段，调用方传入同名键不会替换它们，而是作为
    /// extras 中的普通键值透传给技能。
    pub fn merge_overrides(&mut self, overrides: Map<String, Value>) {
        self.extras.extend(overrides);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(i: usize) -> ConversationTurn {
        ConversationTurn::new(format!("q{}", i), format!("a{}", i))
    }

    #[test]
    fn test_fifo_prune_keeps_newest() {
        let mut ctx = SessionContext::new(3);
        for i in 0..5 {
            ctx.push(turn(i));
        }
        assert_eq!(ctx.len(), 3);
        let users: Vec<&str> = ctx.turns().iter().map(|t| t.user.as_str()).collect();
        assert_eq!(users, vec!["q2", "q3", "q4"]);
    }

    #[test]
    fn test_under_bound_keeps_all_in_order() {
        let mut ctx = SessionContext::new(10);
        for i in 0..4 {
            ctx.push(turn(i));
        }
        assert_eq!(ctx.len(), 4);
        assert_eq!(ctx.turns()[0].user, "q0");
        assert_eq!(ctx.turns()[3].user, "q3");
    }

    #[test]
    fn test_overrides_do_not_replace_structural_fields() {
        let mut ctx = ConversationContext {
            history: vec![turn(0)],
            snapshot_at: chrono::Utc::now().to_rfc3339(),
            extras: Map::new(),
        };
        let snapshot_at = ctx.snapshot_at.clone();

        let mut overrides = Map::new();
        overrides.insert("history".into(), Value::String("覆盖".into()));
        overrides.insert("snapshot_at".into(), Value::String("覆盖".into()));
        ctx.merge_overrides(overrides);

        // 结构化字段不受影响，同名键落在 extras 里透传给技能
        assert_eq!(ctx.history.len(), 1);
        assert_eq!(ctx.snapshot_at, snapshot_at);
        assert_eq!(ctx.extras["history"], Value::String("覆盖".into()));
    }

    #[test]
    fn test_merge_overrides_last_write_wins() {
        let mut ctx = ConversationContext {
            history: vec![],
            snapshot_at: chrono::Utc::now().to_rfc3339(),
            extras: Map::new(),
        };
        ctx.extras
            .insert("lang".into(), Value::String("zh".into()));
        let mut overrides = Map::new();
        overrides.insert("lang".into(), Value::String("en".into()));
        overrides.insert("city".into(), Value::String("上海".into()));
        ctx.merge_overrides(overrides);
        assert_eq!(ctx.extras["lang"], Value::String("en".into()));
        assert_eq!(ctx.extras["city"], Value::String("上海".into()));
    }
}

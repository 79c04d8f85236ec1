//! 技能系统
//!
//! 技能（Skill）是助手的一项可调用能力，实现统一契约：name + execute。
//! 技能内部故障必须被吸收为带 error 的 SkillResult（附带致歉回复），
//! Orchestrator 不捕获技能特有的错误类型。

pub mod calculator;
pub mod llm_skill;
pub mod registry;
pub mod search;

pub use calculator::CalculatorSkill;
pub use llm_skill::LlmSkill;
pub use registry::SkillRegistry;
pub use search::SearchSkill;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::memory::ConversationContext;

/// 技能执行结果：回复文本必填，metadata 为诊断键值（模型名、token 用量等），
/// error 仅在失败时出现。每次调用新建，返回后不再修改。
#[derive(Clone, Debug)]
pub struct SkillResult {
    pub response: String,
    pub metadata: Map<String, Value>,
    pub error: Option<String>,
}

impl SkillResult {
    /// 成功结果
    pub fn ok(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            metadata: Map::new(),
            error: None,
        }
    }

    /// 失败结果：error + 面向用户的最佳回复（通常是致歉）
    pub fn failed(response: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            metadata: Map::new(),
            error: Some(error.into()),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// 技能 trait：名称（注册表键）+ 执行
#[async_trait]
pub trait Skill: Send + Sync {
    /// 技能名称（唯一标识，用于注册与意图路由）
    fn name(&self) -> &str;

    /// 执行技能；任何内部失败都应折叠进返回值，不得 panic 或抛出
    async fn execute(&self, user_input: &str, context: &ConversationContext) -> SkillResult;
}

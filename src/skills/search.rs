//! 搜索技能：占位实现
//!
//! 路由规则已就位（搜索 / 查找），检索引擎尚未接入；
//! 返回形状完整的结果，error 为空（这是既定行为，不是故障）。

use async_trait::async_trait;
use serde_json::Value;

use crate::memory::ConversationContext;
use crate::skills::{Skill, SkillResult};

/// 搜索技能（占位）
#[derive(Debug, Default)]
pub struct SearchSkill;

#[async_trait]
impl Skill for SearchSkill {
    fn name(&self) -> &str {
        "search_skill"
    }

    async fn execute(&self, user_input: &str, _context: &ConversationContext) -> SkillResult {
        SkillResult::ok("搜索功能正在接入中，暂时还不能帮你查找资料。")
            .with_meta("query", Value::String(user_input.to_string()))
    }
}

//! 大模型技能：将对话上下文与当前输入转为消息列表，调用 LlmClient
//!
//! 上游失败（网络、API）在技能内吸收：返回致歉回复并在 error 字段携带原因。

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::llm::{LlmClient, Message};
use crate::memory::ConversationContext;
use crate::skills::{Skill, SkillResult};

const SYSTEM_PROMPT: &str = "你是 Andy，一个友好的中文 AI 助手。回答要简洁、准确。";

/// 上游调用失败时的用户可见回复
const APOLOGY: &str = "抱歉，我暂时无法回答这个问题，请稍后再试。";

/// 大模型技能
pub struct LlmSkill {
    llm: Arc<dyn LlmClient>,
}

impl LlmSkill {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 历史轮次 + 当前输入 -> LLM 消息列表
    fn build_messages(&self, user_input: &str, context: &ConversationContext) -> Vec<Message> {
        let mut messages = vec![Message::system(SYSTEM_PROMPT)];
        for turn in &context.history {
            messages.push(Message::user(turn.user.clone()));
            messages.push(Message::assistant(turn.assistant.clone()));
        }
        messages.push(Message::user(user_input));
        messages
    }
}

#[async_trait]
impl Skill for LlmSkill {
    fn name(&self) -> &str {
        "llm_skill"
    }

    async fn execute(&self, user_input: &str, context: &ConversationContext) -> SkillResult {
        let messages = self.build_messages(user_input, context);

        match self.llm.complete(&messages).await {
            Ok(response) => {
                let (prompt, completion, total) = self.llm.token_usage();
                SkillResult::ok(response)
                    .with_meta("model", Value::String(self.llm.model_name().to_string()))
                    .with_meta(
                        "token_usage",
                        json!({
                            "prompt": prompt,
                            "completion": completion,
                            "total": total,
                        }),
                    )
            }
            Err(e) => {
                tracing::warn!("LLM call failed: {}", e);
                SkillResult::failed(APOLOGY, e)
                    .with_meta("model", Value::String(self.llm.model_name().to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::memory::ConversationTurn;
    use serde_json::Map;

    fn empty_context() -> ConversationContext {
        ConversationContext {
            history: vec![],
            snapshot_at: chrono::Utc::now().to_rfc3339(),
            extras: Map::new(),
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
            Err("connection refused".to_string())
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_success_carries_model_metadata() {
        let skill = LlmSkill::new(Arc::new(MockLlmClient));
        let result = skill.execute("你好", &empty_context()).await;
        assert!(result.error.is_none());
        assert!(result.response.contains("你好"));
        assert_eq!(result.metadata["model"], Value::String("mock".into()));
    }

    #[tokio::test]
    async fn test_failure_absorbed_with_apology() {
        let skill = LlmSkill::new(Arc::new(FailingLlm));
        let result = skill.execute("你好", &empty_context()).await;
        assert_eq!(result.response, APOLOGY);
        assert_eq!(result.error.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_history_becomes_message_pairs() {
        let skill = LlmSkill::new(Arc::new(MockLlmClient));
        let mut ctx = empty_context();
        ctx.history.push(ConversationTurn::new("之前的问题", "之前的回答"));

        // system + user/assistant 一对 + 当前输入
        let messages = skill.build_messages("新问题", &ctx);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "之前的问题");
        assert_eq!(messages[3].content, "新问题");
    }
}

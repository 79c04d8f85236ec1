//! Orchestrator：认知与决策层核心
//!
//! 单次请求流水线：取上下文并合并调用方覆盖 → 意图路由 → 注册表解析
//! （未注册则退回兜底技能）→ 带超时执行 → 写记忆 → 组装结果。
//! 跨请求无状态，状态只存在于 Memory 与 Registry。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::core::error::AssistantError;
use crate::core::intent::IntentRouter;
use crate::memory::{ConversationTurn, Memory};
use crate::skills::{SkillRegistry, SkillResult};

/// process 的返回值：技能输出 + 路由与持久化 metadata
#[derive(Clone, Debug, Serialize)]
pub struct AssistantReply {
    pub response: String,
    pub skill_name: String,
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 技能编排器
pub struct Orchestrator {
    registry: SkillRegistry,
    router: IntentRouter,
    memory: Arc<Memory>,
    skill_timeout: Duration,
}

impl Orchestrator {
    /// 创建编排器；兜底技能未注册属启动期配置缺陷，在此快速失败
    pub fn new(
        registry: SkillRegistry,
        router: IntentRouter,
        memory: Arc<Memory>,
        skill_timeout_secs: u64,
    ) -> Result<Self, AssistantError> {
        if registry.lookup(router.fallback()).is_none() {
            return Err(AssistantError::MissingDefaultSkill(
                router.fallback().to_string(),
            ));
        }

        Ok(Self {
            registry,
            router,
            memory,
            skill_timeout: Duration::from_secs(skill_timeout_secs),
        })
    }

    pub fn memory(&self) -> &Arc<Memory> {
        &self.memory
    }

    /// 处理一次用户输入
    ///
    /// 仅空输入会返回 Err（无副作用）；技能失败与持久化失败都折叠进
    /// AssistantReply（error 字段 / metadata），调用方总能拿到结构完整的结果。
    pub async fn process(
        &self,
        user_id: &str,
        user_input: &str,
        context_overrides: Option<Map<String, Value>>,
    ) -> Result<AssistantReply, AssistantError> {
        if user_input.trim().is_empty() {
            return Err(AssistantError::EmptyInput);
        }

        // 1. 对话上下文 + 调用方覆盖（extras 中同名键以覆盖项为准，
        //    history / snapshot_at 由记忆层维护，不可覆盖）
        let mut context = self.memory.get_context(user_id).await;
        if let Some(overrides) = context_overrides {
            context.merge_overrides(overrides);
        }

        // 2. 意图路由（确定性规则，首条命中即定）
        let intent = self.router.classify(user_input);

        // 3. 技能解析；路由到未注册技能时退回兜底技能
        let skill = match self.registry.lookup(&intent.skill_name) {
            Some(skill) => skill,
            None => {
                tracing::warn!(
                    skill = %intent.skill_name,
                    "Routed skill not registered, falling back to default"
                );
                // 构造时已校验兜底技能存在，注册表此后只读
                self.registry
                    .lookup(self.router.fallback())
                    .ok_or_else(|| {
                        AssistantError::MissingDefaultSkill(self.router.fallback().to_string())
                    })?
            }
        };
        let skill_name = skill.name().to_string();

        // 4. 带超时执行；超时转为错误结果，不向上冒泡
        let result = match tokio::time::timeout(
            self.skill_timeout,
            skill.execute(user_input, &context),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(skill = %skill_name, "Skill execution timed out");
                SkillResult::failed(
                    "抱歉，这个请求处理超时了，请稍后再试。",
                    format!(
                        "skill '{}' timed out after {}s",
                        skill_name,
                        self.skill_timeout.as_secs()
                    ),
                )
            }
        };

        // 5. 写记忆：带 error 的回复同样入库（致歉也是有效的助手回复）
        let turn = ConversationTurn::new(user_input, &result.response);
        let persistence_error = self.memory.append(user_id, turn).await.err();

        // 6. 组装结果：技能输出原样透传，附加路由与持久化 metadata
        let mut metadata = result.metadata;
        metadata.insert("intent_confidence".into(), json!(intent.confidence));
        metadata.insert(
            "persistence_degraded".into(),
            json!(self.memory.persistence_degraded()),
        );
        if let Some(e) = persistence_error {
            metadata.insert("persistence_error".into(), Value::String(e.to_string()));
        }

        Ok(AssistantReply {
            response: result.response,
            skill_name,
            metadata,
            error: result.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ConversationContext, MemoryHistoryStore};
    use crate::skills::Skill;
    use async_trait::async_trait;

    struct EchoSkill;

    #[async_trait]
    impl Skill for EchoSkill {
        fn name(&self) -> &str {
            "llm_skill"
        }

        async fn execute(&self, input: &str, _ctx: &ConversationContext) -> SkillResult {
            SkillResult::ok(format!("echo: {}", input))
        }
    }

    struct SlowSkill;

    #[async_trait]
    impl Skill for SlowSkill {
        fn name(&self) -> &str {
            "llm_skill"
        }

        async fn execute(&self, _input: &str, _ctx: &ConversationContext) -> SkillResult {
            tokio::time::sleep(Duration::from_secs(5)).await;
            SkillResult::ok("never")
        }
    }

    fn orchestrator_with(skill: impl Skill + 'static, timeout_secs: u64) -> Orchestrator {
        let mut registry = SkillRegistry::new();
        registry.register(skill);
        let router = IntentRouter::with_default_rules("llm_skill");
        let memory = Arc::new(Memory::new(10, Arc::new(MemoryHistoryStore::new())));
        Orchestrator::new(registry, router, memory, timeout_secs).unwrap()
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected_without_side_effects() {
        let orch = orchestrator_with(EchoSkill, 5);
        assert!(matches!(
            orch.process("u1", "   ", None).await,
            Err(AssistantError::EmptyInput)
        ));
        assert!(orch.memory().get_context("u1").await.history.is_empty());
    }

    #[tokio::test]
    async fn test_missing_default_skill_fails_at_construction() {
        let registry = SkillRegistry::new();
        let router = IntentRouter::with_default_rules("llm_skill");
        let memory = Arc::new(Memory::new(10, Arc::new(MemoryHistoryStore::new())));
        assert!(matches!(
            Orchestrator::new(registry, router, memory, 5),
            Err(AssistantError::MissingDefaultSkill(_))
        ));
    }

    #[tokio::test]
    async fn test_unregistered_route_falls_back_to_default() {
        // 只注册了兜底技能，计算关键词命中的 calculator_skill 不存在
        let orch = orchestrator_with(EchoSkill, 5);
        let reply = orch.process("u1", "帮我计算点东西", None).await.unwrap();
        assert_eq!(reply.skill_name, "llm_skill");
    }

    #[tokio::test]
    async fn test_timeout_becomes_error_result_and_is_recorded() {
        let orch = orchestrator_with(SlowSkill, 1);
        let reply = orch.process("u1", "你好", None).await.unwrap();
        assert!(reply.error.as_deref().unwrap().contains("timed out"));
        // 超时的致歉回复同样写入记忆
        assert_eq!(orch.memory().get_context("u1").await.history.len(), 1);
    }
}

//! 技能注册表
//!
//! 按名称存储 Arc<dyn Skill>；同名重复注册以最后一次为准（覆盖语义），
//! 查找未注册的名称返回 None，不报错。注册完成后只读，查找无需加锁。

use std::collections::HashMap;
use std::sync::Arc;

use super::Skill;

/// 技能注册表：register / lookup / skill_names
#[derive(Default)]
pub struct SkillRegistry {
    skills: HashMap<String, Arc<dyn Skill>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册技能，键为 skill.name()；同名覆盖旧注册
    pub fn register(&mut self, skill: impl Skill + 'static) {
        let name = skill.name().to_string();
        self.skills.insert(name, Arc::new(skill));
    }

    /// 查找技能；未注册返回 None
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Skill>> {
        self.skills.get(name).cloned()
    }

    pub fn skill_names(&self) -> Vec<String> {
        self.skills.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ConversationContext;
    use crate::skills::SkillResult;
    use async_trait::async_trait;

    struct NamedSkill {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl Skill for NamedSkill {
        fn name(&self) -> &str {
            self.name
        }

        async fn execute(&self, _input: &str, _ctx: &ConversationContext) -> SkillResult {
            SkillResult::ok(self.reply)
        }
    }

    #[test]
    fn test_lookup_unregistered_returns_none() {
        let registry = SkillRegistry::new();
        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = SkillRegistry::new();
        registry.register(NamedSkill {
            name: "echo",
            reply: "first",
        });
        registry.register(NamedSkill {
            name: "echo",
            reply: "second",
        });

        assert_eq!(registry.skill_names().len(), 1);
        let skill = registry.lookup("echo").unwrap();
        assert_eq!(skill.name(), "echo");
    }
}

//! 意图路由：确定性关键词规则
//!
//! 规则按固定优先级顺序逐条评估，首条命中即定（不依赖映射迭代顺序）；
//! 全部未命中时落到配置的兜底技能。新增技能只需注册 + 加一条规则，
//! 路由与注册表之间仅以名称解耦。

/// 一次路由结果：目标技能名 + 置信度
///
/// confidence 当前恒为 1.0，为未来非确定性分类器保留的字段，不参与任何分支。
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub skill_name: String,
    pub confidence: f32,
}

/// 单条规则：任一关键词作为子串命中即路由到 skill_name
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub skill_name: String,
    pub keywords: Vec<String>,
}

impl IntentRule {
    pub fn new(skill_name: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            skill_name: skill_name.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn matches(&self, input: &str) -> bool {
        self.keywords.iter().any(|k| input.contains(k.as_str()))
    }
}

/// 意图路由器：有序规则表 + 兜底技能
#[derive(Debug, Clone)]
pub struct IntentRouter {
    rules: Vec<IntentRule>,
    fallback: String,
}

impl IntentRouter {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback.into(),
        }
    }

    /// 内置规则表：计算器与搜索关键词
    pub fn with_default_rules(fallback: impl Into<String>) -> Self {
        Self::new(fallback)
            .rule(IntentRule::new("calculator_skill", &["计算", "等于多少"]))
            .rule(IntentRule::new("search_skill", &["搜索", "查找"]))
    }

    /// 追加一条规则（附加在已有规则之后，优先级更低）
    pub fn rule(mut self, rule: IntentRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// 按序评估规则，首条命中即返回；未命中返回兜底技能
    pub fn classify(&self, user_input: &str) -> Intent {
        for rule in &self.rules {
            if rule.matches(user_input) {
                return Intent {
                    skill_name: rule.skill_name.clone(),
                    confidence: 1.0,
                };
            }
        }

        Intent {
            skill_name: self.fallback.clone(),
            confidence: 1.0,
        }
    }
}

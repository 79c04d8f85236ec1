//! 助手错误类型
//!
//! 仅输入校验错误会作为 Err 越过 Orchestrator 边界；技能失败与持久化失败
//! 均折叠进正常返回值（error 字段 / metadata），不向调用方抛出。

use thiserror::Error;

/// 请求处理过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AssistantError {
    /// 调用方契约违反：输入为空。无任何副作用。
    #[error("Empty user input")]
    EmptyInput,

    /// 兜底技能未注册：启动期配置缺陷，构造 Orchestrator 时即失败
    #[error("Default skill not registered: {0}")]
    MissingDefaultSkill(String),
}

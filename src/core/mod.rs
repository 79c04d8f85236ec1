//! 核心层：错误类型、意图路由与技能编排

pub mod error;
pub mod intent;
pub mod orchestrator;

pub use error::AssistantError;
pub use intent::{Intent, IntentRouter, IntentRule};
pub use orchestrator::{AssistantReply, Orchestrator};

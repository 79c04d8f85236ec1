//! Andy - AI 助手后端
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 编排器、意图路由、错误类型
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 双层对话记忆（短期有界窗口 + SQLite 持久化历史）
//! - **skills**: 技能契约、注册表与内置技能（llm / calculator / search）
//! - **server**: axum HTTP 服务（/health、/ask、/history）

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod server;
pub mod skills;

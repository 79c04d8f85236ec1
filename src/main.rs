//! Andy AI 助手后端入口
//!
//! 初始化日志、加载配置、装配记忆 / 技能 / 编排器并启动 HTTP 服务。

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use andy::config::{load_config, AppConfig};
use andy::core::{IntentRouter, Orchestrator};
use andy::llm::create_llm_from_config;
use andy::memory::{HistoryStore, Memory, MemoryHistoryStore, SqliteHistoryStore};
use andy::server::{serve, AppState};
use andy::skills::{CalculatorSkill, LlmSkill, SearchSkill, SkillRegistry};

/// 按配置构建历史存储；SQLite 打开失败时降级为内存存储，服务继续可用
async fn create_store(cfg: &AppConfig) -> Arc<dyn HistoryStore> {
    if cfg.memory.persistence == "memory" {
        tracing::info!("Persistence disabled, conversation history is in-memory only");
        return Arc::new(MemoryHistoryStore::new());
    }

    match SqliteHistoryStore::new(&cfg.memory.db_path).await {
        Ok(store) => {
            tracing::info!("Using SQLite history store at {}", cfg.memory.db_path.display());
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to open SQLite store ({}), degrading to in-memory history: {}",
                cfg.memory.db_path.display(),
                e
            );
            Arc::new(MemoryHistoryStore::new())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    tracing::info!(
        "Starting {}...",
        cfg.app.name.as_deref().unwrap_or("Andy AI Assistant")
    );

    let llm = create_llm_from_config(&cfg);
    let store = create_store(&cfg).await;
    let memory = Arc::new(Memory::new(cfg.memory.max_conversation_turns, store));

    let mut registry = SkillRegistry::new();
    registry.register(LlmSkill::new(llm));
    registry.register(CalculatorSkill);
    registry.register(SearchSkill);
    tracing::info!("Registered skills: {:?}", registry.skill_names());

    let router = IntentRouter::with_default_rules(cfg.skills.default_skill.clone());
    let orchestrator = Orchestrator::new(registry, router, memory, cfg.skills.timeout_secs)
        .context("Failed to create orchestrator")?;

    let addr: SocketAddr = format!("{}:{}", cfg.app.host, cfg.app.port)
        .parse()
        .context("Invalid host/port in config")?;

    serve(
        addr,
        Arc::new(AppState {
            orchestrator: Arc::new(orchestrator),
        }),
    )
    .await
    .context("Server run failed")?;

    Ok(())
}

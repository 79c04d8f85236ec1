//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ANDY__*` 覆盖（双下划线表示嵌套，
//! 如 `ANDY__LLM__MODEL=gpt-4o-mini`）。配置一旦加载即为不可变值，
//! 由入口显式传入各组件，不使用全局单例。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub memory: MemorySection,
    #[serde(default)]
    pub skills: SkillsSection,
}

/// [app] 段：应用名与监听地址
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// [llm] 段：后端选择、模型与采样参数
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / mock；无 API Key 时自动退回 mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

/// [memory] 段：短期记忆轮数上限与持久化后端
#[derive(Debug, Clone, Deserialize)]
pub struct MemorySection {
    /// SQLite 数据库路径
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// 对话历史保留轮数（短期记忆，FIFO 裁剪）
    #[serde(default = "default_max_conversation_turns")]
    pub max_conversation_turns: usize,
    /// 持久化模式：sqlite / memory（memory 为无持久化的降级模式）
    #[serde(default = "default_persistence")]
    pub persistence: String,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_conversation_turns: default_max_conversation_turns(),
            persistence: default_persistence(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("memory.db")
}

fn default_max_conversation_turns() -> usize {
    10
}

fn default_persistence() -> String {
    "sqlite".to_string()
}

/// [skills] 段：兜底技能与单次执行超时
#[derive(Debug, Clone, Deserialize)]
pub struct SkillsSection {
    /// 意图未命中任何规则时使用的技能名
    #[serde(default = "default_skill")]
    pub default_skill: String,
    /// 单次技能调用超时（秒）；技能可能含外部网络 I/O，超时后返回错误结果而非无限阻塞
    #[serde(default = "default_skill_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SkillsSection {
    fn default() -> Self {
        Self {
            default_skill: default_skill(),
            timeout_secs: default_skill_timeout_secs(),
        }
    }
}

fn default_skill() -> String {
    "llm_skill".to_string()
}

fn default_skill_timeout_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            memory: MemorySection::default(),
            skills: SkillsSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 ANDY__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 ANDY__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ANDY")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

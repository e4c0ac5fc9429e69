//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HIVE__*` 覆盖（双下划线表示嵌套，如 `HIVE__LLM__PROVIDER=mistral`）。

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
    pub approval: ApprovalSection,
    pub prompts: PromptsSection,
}

/// [app] 段：压缩阈值、单次运行最大轮数、会话存储
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 消息数超过该值时在草拟前压缩
    pub compact_threshold: usize,
    /// 单次运行最多草拟的轮数，防止死循环
    pub max_turns: usize,
    pub store: StoreSection,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            compact_threshold: 8,
            max_turns: 20,
            store: StoreSection::default(),
        }
    }
}

/// 会话检查点后端
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
    Sqlite,
}

/// [app.store] 段
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StoreSection {
    pub kind: StoreKind,
    /// file：目录；sqlite：数据库文件。未设置时用 ./sessions 或 ./sessions.db
    pub path: Option<PathBuf>,
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// openai / deepseek / mistral / google / mock
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// 读取 API Key 的环境变量名；未设置时按 provider 取默认值
    pub api_key_env: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            model: None,
            base_url: None,
            api_key_env: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [tools] 段：工作区根目录、工具超时、Web 抓取
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 文件工具的沙箱根目录，未设置时用 ./workspace
    pub workspace_root: Option<PathBuf>,
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub web: WebSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            workspace_root: None,
            tool_timeout_secs: 30,
            web: WebSection::default(),
        }
    }
}

/// [tools.web] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSection {
    pub timeout_secs: u64,
    pub max_chars: usize,
    pub user_agent: String,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            max_chars: 20_000,
            user_agent: "Mozilla/5.0 (compatible; HiveWebTools/1.0)".to_string(),
        }
    }
}

/// 人工输入无法解析时的处理
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnparsableInput {
    /// 视为拒绝，原文作为理由
    #[default]
    Reject,
    /// 要求重新输入
    Reprompt,
}

/// 单个受审批工具允许的决定
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AllowedDecisionsSection {
    pub approve: bool,
    pub edit: bool,
    pub reject: bool,
}

impl Default for AllowedDecisionsSection {
    fn default() -> Self {
        Self {
            approve: true,
            edit: true,
            reject: true,
        }
    }
}

/// [approval] 段：受审批工具（名称 -> 允许的决定）与无法解析输入的策略
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApprovalSection {
    pub gated: HashMap<String, AllowedDecisionsSection>,
    pub unparsable_input: UnparsableInput,
}

impl Default for ApprovalSection {
    fn default() -> Self {
        let gated = ["files_write", "ops_files"]
            .into_iter()
            .map(|n| (n.to_string(), AllowedDecisionsSection::default()))
            .collect();
        Self {
            gated,
            unparsable_input: UnparsableInput::default(),
        }
    }
}

/// [prompts] 段：角色提示词文件（TOML，键 supervisor / research / ops）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PromptsSection {
    pub path: Option<PathBuf>,
}

/// 各智能体的角色提示词
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RolePrompts {
    pub supervisor: String,
    pub research: String,
    pub ops: String,
}

impl Default for RolePrompts {
    fn default() -> Self {
        Self {
            supervisor: "You are the supervisor. Answer directly when you can. \
                Use calc_evaluate for arithmetic and time_now / time_now_riyadh for the clock. \
                Delegate web research to research_web and anything touching workspace files to ops_files, \
                passing a self-contained task description."
                .to_string(),
            research: "You are a research specialist. Use web_search to find sources and web_open \
                to read them. Reply with a concise summary and the URLs you relied on."
                .to_string(),
            ops: "You are a file operations specialist working inside a sandboxed workspace. \
                Use files_list, files_read and files_write. Report exactly what you changed."
                .to_string(),
        }
    }
}

/// 读取角色提示词；文件缺失或缺键时回退到内置默认值
pub fn load_prompts(section: &PromptsSection) -> anyhow::Result<RolePrompts> {
    let Some(path) = section.path.as_ref() else {
        return Ok(RolePrompts::default());
    };
    if !path.exists() {
        tracing::warn!(path = %path.display(), "prompts file not found, using defaults");
        return Ok(RolePrompts::default());
    }
    let text = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

/// 从 config 目录加载配置，环境变量 HIVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HIVE__*（双下划线表示嵌套键）
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
        config::Environment::with_prefix("HIVE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.compact_threshold, 8);
        assert_eq!(cfg.tools.tool_timeout_secs, 30);
        assert!(cfg.approval.gated.contains_key("files_write"));
        assert_eq!(cfg.approval.unparsable_input, UnparsableInput::Reject);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hive.toml");
        std::fs::write(
            &path,
            r#"
[app]
compact_threshold = 12

[app.store]
kind = "sqlite"

[llm]
provider = "mistral"

[approval]
unparsable_input = "reprompt"

[approval.gated.files_write]
edit = false
"#,
        )
        .unwrap();
        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.app.compact_threshold, 12);
        assert_eq!(cfg.app.max_turns, 20);
        assert_eq!(cfg.app.store.kind, StoreKind::Sqlite);
        assert_eq!(cfg.llm.provider, "mistral");
        assert_eq!(cfg.approval.unparsable_input, UnparsableInput::Reprompt);
        let allowed = &cfg.approval.gated["files_write"];
        assert!(allowed.approve && allowed.reject && !allowed.edit);
    }

    #[test]
    fn test_load_prompts_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.toml");
        std::fs::write(&path, "ops = \"custom ops prompt\"\n").unwrap();
        let prompts = load_prompts(&PromptsSection { path: Some(path) }).unwrap();
        assert_eq!(prompts.ops, "custom ops prompt");
        assert!(prompts.supervisor.contains("supervisor"));
    }
}

//! 程序配置
//!
//! 加载顺序：默认值 → TOML 配置文件（可选）→ 环境变量。
//! 所有运行参数都集中在 [`Config`] 中，由 `App` / `Dispatcher` 在构造时接收。

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::workflow::RetryPolicy;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "enricher.toml";

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    /// API 密钥（缺失时在启动阶段报错）
    pub llm_api_key: Option<String>,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    // --- 批处理配置 ---
    /// 同时在途的最大请求数
    pub concurrency: usize,
    /// 同时存活的 worker 数量，未设置时与 `concurrency` 相同
    pub pool_size: Option<usize>,
    /// 每成功合并 N 题写一次快照
    pub save_every: usize,
    /// analysis 字段超过此字符数视为已完成
    pub skip_threshold: usize,
    /// 单题最大尝试次数
    pub max_retries: u32,
    /// 退避基础时长（毫秒），第 n 次失败后等待 base * 2^n
    pub retry_base_delay_ms: u64,
    // --- 文件路径 ---
    /// 题库 JSON 文件（同时也是输出文件）
    pub questions_path: PathBuf,
    /// 静态参考文本（整段嵌入 system prompt）
    pub context_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: None,
            llm_api_base_url: "https://api.deepseek.com".to_string(),
            llm_model_name: "deepseek-chat".to_string(),
            temperature: 0.3,
            max_tokens: 4096,
            concurrency: 20,
            pool_size: None,
            save_every: 5,
            skip_threshold: 500,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            questions_path: PathBuf::from("references/questions.json"),
            context_path: PathBuf::from("GDPR.md"),
        }
    }
}

/// TOML 配置文件的结构，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    llm_api_key: Option<String>,
    llm_api_base_url: Option<String>,
    llm_model_name: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    concurrency: Option<usize>,
    pool_size: Option<usize>,
    save_every: Option<usize>,
    skip_threshold: Option<usize>,
    max_retries: Option<u32>,
    retry_base_delay_ms: Option<u64>,
    questions_path: Option<PathBuf>,
    context_path: Option<PathBuf>,
}

impl Config {
    /// 按 默认值 → 配置文件 → 环境变量 的顺序加载配置
    ///
    /// 配置文件路径取 `ENRICHER_CONFIG`，未设置时使用当前目录下的 `enricher.toml`，
    /// 文件不存在则跳过该层。
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("ENRICHER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = Self::default();
        if config_path.exists() {
            config = config.merge_file(&config_path)?;
        }
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 仅从环境变量加载（不读取配置文件）
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 合并 TOML 配置文件
    pub fn merge_file(self, path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::invalid("ENRICHER_CONFIG", path.display().to_string(), e.to_string())
        })?;
        self.merge_toml(&content, &path.display().to_string())
    }

    /// 合并 TOML 文本，`origin` 仅用于错误信息
    pub fn merge_toml(mut self, content: &str, origin: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(content).map_err(|source| ConfigError::FileParse {
            path: origin.to_string(),
            source,
        })?;

        if let Some(v) = file.llm_api_key {
            self.llm_api_key = Some(v);
        }
        if let Some(v) = file.llm_api_base_url {
            self.llm_api_base_url = v;
        }
        if let Some(v) = file.llm_model_name {
            self.llm_model_name = v;
        }
        if let Some(v) = file.temperature {
            self.temperature = v;
        }
        if let Some(v) = file.max_tokens {
            self.max_tokens = v;
        }
        if let Some(v) = file.concurrency {
            self.concurrency = v;
        }
        if file.pool_size.is_some() {
            self.pool_size = file.pool_size;
        }
        if let Some(v) = file.save_every {
            self.save_every = v;
        }
        if let Some(v) = file.skip_threshold {
            self.skip_threshold = v;
        }
        if let Some(v) = file.max_retries {
            self.max_retries = v;
        }
        if let Some(v) = file.retry_base_delay_ms {
            self.retry_base_delay_ms = v;
        }
        if let Some(v) = file.questions_path {
            self.questions_path = v;
        }
        if let Some(v) = file.context_path {
            self.context_path = v;
        }
        Ok(self)
    }

    /// 应用环境变量覆盖
    ///
    /// `lookup` 通常是 `std::env::var`，测试中可以换成固定的映射。
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // 空白值视为未设置，继续尝试别名
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_blank("LLM_API_KEY").or_else(|| non_blank("DEEPSEEK_API_KEY")) {
            self.llm_api_key = Some(key);
        }
        if let Some(v) = lookup("LLM_API_BASE_URL") {
            self.llm_api_base_url = v;
        }
        if let Some(v) = lookup("LLM_MODEL_NAME") {
            self.llm_model_name = v;
        }
        if let Some(v) = parse_var(&lookup, "LLM_TEMPERATURE")? {
            self.temperature = v;
        }
        if let Some(v) = parse_var(&lookup, "LLM_MAX_TOKENS")? {
            self.max_tokens = v;
        }
        if let Some(v) = parse_var(&lookup, "MAX_CONCURRENCY")? {
            self.concurrency = v;
        }
        if let Some(v) = parse_var(&lookup, "POOL_SIZE")? {
            self.pool_size = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "SAVE_EVERY")? {
            self.save_every = v;
        }
        if let Some(v) = parse_var(&lookup, "SKIP_THRESHOLD")? {
            self.skip_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "MAX_RETRIES")? {
            self.max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "RETRY_BASE_DELAY_MS")? {
            self.retry_base_delay_ms = v;
        }
        if let Some(v) = lookup("QUESTIONS_PATH") {
            self.questions_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CONTEXT_PATH") {
            self.context_path = PathBuf::from(v);
        }
        Ok(())
    }

    /// 校验数值型配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::invalid("concurrency", "0", "必须大于 0"));
        }
        if self.pool_size == Some(0) {
            return Err(ConfigError::invalid("pool_size", "0", "必须大于 0"));
        }
        if self.save_every == 0 {
            return Err(ConfigError::invalid("save_every", "0", "必须大于 0"));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::invalid("max_retries", "0", "必须大于 0"));
        }
        Ok(())
    }

    /// 取出 API 密钥，缺失时返回致命错误
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.llm_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// 实际使用的 worker 数量
    pub fn pool_size(&self) -> usize {
        self.pool_size.unwrap_or(self.concurrency)
    }

    /// 由配置得到的重试策略
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::invalid(key, raw.clone(), e.to_string())),
        None => Ok(None),
    }
}

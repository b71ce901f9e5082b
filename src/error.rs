use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误（致命，开始处理前即终止）
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件读取 / 解析错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// LLM 服务错误（可重试）
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 模型输出解析错误（可重试）
    #[error("解析错误: {0}")]
    Parse(#[from] ParseError),
    /// 快照写入错误（会中止本次运行）
    #[error("持久化错误: {0}")]
    Persistence(#[from] PersistenceError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 未提供 API 密钥
    #[error("未设置 API 密钥（环境变量 LLM_API_KEY 或 DEEPSEEK_API_KEY）")]
    MissingApiKey,
    /// 输入文件不存在
    #[error("找不到输入文件: {path}")]
    InputNotFound { path: String },
    /// 配置值无法解析或不合法
    #[error("配置项 {key} 的值 '{value}' 无效: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    FileParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({path}): {source}")]
    JsonParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// 题目 ID 重复
    #[error("题目ID重复: {id}")]
    DuplicateId { id: String },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败（网络错误、服务端错误等）
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 请求被限流
    #[error("LLM API请求频率限制 (模型: {model})")]
    RateLimited { model: String },
    /// 请求构建失败
    #[error("LLM 请求构建失败: {0}")]
    InvalidRequest(String),
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 并发限流器已关闭
    #[error("并发限流器已关闭")]
    LimiterClosed,
}

/// 模型输出解析错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// 无法从返回文本中解析出 JSON 对象
    #[error("无法从 API 返回中解析 JSON: {excerpt}")]
    MalformedResponse { excerpt: String },
    /// JSON 对象缺少必要字段
    #[error("返回缺少必要字段: {field}")]
    MissingField { field: &'static str },
}

/// 快照持久化错误
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// 序列化失败
    #[error("序列化题库失败: {0}")]
    Serialize(#[source] serde_json::Error),
    /// 写入临时文件失败
    #[error("写入临时文件失败 ({path}): {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 原子替换失败
    #[error("重命名 {from} -> {to} 失败: {source}")]
    Rename {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },
}

// ========== 便捷构造函数 ==========

impl ConfigError {
    /// 创建配置值无效错误
    pub fn invalid(key: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

impl LlmError {
    /// 创建 API 调用错误
    pub fn api_failed(model: impl Into<String>, source: impl std::fmt::Display) -> Self {
        LlmError::ApiCallFailed {
            model: model.into(),
            message: source.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

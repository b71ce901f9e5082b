//! 日志工具模块
//!
//! 初始化 tracing 订阅器，并提供日志格式化的辅助函数

use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 日志级别取 `RUST_LOG`，未设置时为 `info`。重复调用是安全的。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 分隔线
pub fn rule(ch: char) -> String {
    ch.to_string().repeat(60)
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
///
/// # 返回
/// 返回截断后的文本，超长时以 `...` 结尾
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

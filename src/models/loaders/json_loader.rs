use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;

use crate::error::{AppResult, ConfigError, FileError};
use crate::models::collection::Collection;

/// 从 JSON 文件加载题库
///
/// 文件不存在属于配置错误（致命），读取或解析失败属于文件错误。
pub async fn load_collection(path: &Path) -> AppResult<Collection> {
    let content = read_required(path).await?;
    let collection = Collection::from_json_str(&content, &path.display().to_string())?;
    tracing::debug!("已加载 {} 道题目: {}", collection.len(), path.display());
    Ok(collection)
}

/// 读取静态参考文本（整段嵌入 system prompt）
pub async fn load_context(path: &Path) -> AppResult<String> {
    read_required(path).await
}

async fn read_required(path: &Path) -> AppResult<String> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ConfigError::InputNotFound {
            path: path.display().to_string(),
        }
        .into()),
        Err(source) => Err(FileError::ReadFailed {
            path: path.display().to_string(),
            source,
        }
        .into()),
    }
}

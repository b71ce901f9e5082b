//! 模型输出解析 - 业务能力层
//!
//! 模型经常在 JSON 外面包一层 ```json 代码块，或者在前后加几句说明，
//! 这里负责把这些噪音去掉并取出两个必需字段。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::models::Enrichment;
use crate::utils::logger::truncate_text;

/// 错误信息中保留的原文长度（字符）
const EXCERPT_LEN: usize = 500;

const LEGAL_REFERENCE_FIELD: &str = "legalReference";
const ANALYSIS_FIELD: &str = "analysis";

fn fence_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^```(?:json|JSON)?\s*").expect("valid regex"))
}

fn fence_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*```\s*$").expect("valid regex"))
}

/// 从模型返回文本中解析出生成结果
///
/// 1. 去掉首尾的代码块标记
/// 2. 直接按 JSON 解析
/// 3. 失败则找第一个括号配平且能解析的 `{...}` 片段
/// 4. 校验两个必需字段
pub fn parse_enrichment(raw: &str) -> Result<Enrichment, ParseError> {
    let object = extract_object(raw).ok_or_else(|| ParseError::MalformedResponse {
        excerpt: truncate_text(raw, EXCERPT_LEN),
    })?;

    let legal_reference = required_str(&object, LEGAL_REFERENCE_FIELD)?;
    let analysis = required_str(&object, ANALYSIS_FIELD)?;

    Ok(Enrichment {
        legal_reference,
        analysis,
    })
}

/// 去掉代码块标记后的文本
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let start = fence_open().find(text).map(|m| m.end()).unwrap_or(0);
    let text = &text[start..];
    let end = fence_close()
        .find(text)
        .map(|m| m.start())
        .unwrap_or(text.len());
    text[..end].trim()
}

fn extract_object(raw: &str) -> Option<Map<String, Value>> {
    let text = strip_code_fence(raw);

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        return Some(map);
    }

    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(candidate) = balanced_object_at(text, start) {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) {
                return Some(map);
            }
        }
        search_from = start + 1;
    }
    None
}

/// 从 `start`（必须是 `{`）开始找到与之配平的 `}`，忽略字符串字面量中的括号
fn balanced_object_at(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn required_str(object: &Map<String, Value>, field: &'static str) -> Result<String, ParseError> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ParseError::MissingField { field })
}

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// 题目 ID
///
/// 题库文件中既有整数 ID 也有字符串 ID，原样保留。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Number(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

/// 生成的两个字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    /// 法条原文摘录
    pub legal_reference: String,
    /// 考点深度解析
    pub analysis: String,
}

/// 一道考试题目
///
/// `id` 和题目内容只读；只有 `legal_reference` / `analysis` 会在运行中被改写。
/// 不认识的字段放在 `extra` 里，保存时原样写回。
/// 输入中显式为 `null` 的可选字段也以 `null` 记在 `extra` 中，保存时同样写回 `null`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireRecord", into = "WireRecord")]
pub struct Record {
    pub id: RecordId,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub scenario: Option<String>,
    pub explanation: Option<String>,
    pub legal_reference: Option<String>,
    pub analysis: Option<String>,
    pub extra: Map<String, Value>,
}

/// 文件中的记录格式
///
/// 可选字段用 `Option<Option<_>>` 区分三种情况：缺失（`None`）、显式 `null`（`Some(None)`）、有值。
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRecord {
    id: RecordId,
    question: String,
    #[serde(default)]
    options: Vec<String>,
    correct_answer: usize,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    scenario: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    explanation: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    legal_reference: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    analysis: Option<Option<String>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// 字段出现即为 `Some`，值为 `null` 时内层为 `None`
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

const SCENARIO_KEY: &str = "scenario";
const EXPLANATION_KEY: &str = "explanation";
const LEGAL_REFERENCE_KEY: &str = "legalReference";
const ANALYSIS_KEY: &str = "analysis";

fn from_wire(
    extra: &mut Map<String, Value>,
    key: &str,
    field: Option<Option<String>>,
) -> Option<String> {
    match field {
        Some(None) => {
            extra.insert(key.to_string(), Value::Null);
            None
        }
        Some(value) => value,
        None => None,
    }
}

fn to_wire(
    extra: &mut Map<String, Value>,
    key: &str,
    field: Option<String>,
) -> Option<Option<String>> {
    let was_null = matches!(extra.remove(key), Some(Value::Null));
    match field {
        Some(value) => Some(Some(value)),
        None if was_null => Some(None),
        None => None,
    }
}

impl From<WireRecord> for Record {
    fn from(wire: WireRecord) -> Self {
        let mut extra = wire.extra;
        let scenario = from_wire(&mut extra, SCENARIO_KEY, wire.scenario);
        let explanation = from_wire(&mut extra, EXPLANATION_KEY, wire.explanation);
        let legal_reference = from_wire(&mut extra, LEGAL_REFERENCE_KEY, wire.legal_reference);
        let analysis = from_wire(&mut extra, ANALYSIS_KEY, wire.analysis);

        Self {
            id: wire.id,
            question: wire.question,
            options: wire.options,
            correct_answer: wire.correct_answer,
            scenario,
            explanation,
            legal_reference,
            analysis,
            extra,
        }
    }
}

impl From<Record> for WireRecord {
    fn from(record: Record) -> Self {
        let mut extra = record.extra;
        let scenario = to_wire(&mut extra, SCENARIO_KEY, record.scenario);
        let explanation = to_wire(&mut extra, EXPLANATION_KEY, record.explanation);
        let legal_reference = to_wire(&mut extra, LEGAL_REFERENCE_KEY, record.legal_reference);
        let analysis = to_wire(&mut extra, ANALYSIS_KEY, record.analysis);

        Self {
            id: record.id,
            question: record.question,
            options: record.options,
            correct_answer: record.correct_answer,
            scenario,
            explanation,
            legal_reference,
            analysis,
            extra,
        }
    }
}

impl Record {
    /// analysis 字段的字符数，缺失视为 0
    pub fn analysis_len(&self) -> usize {
        self.analysis
            .as_deref()
            .map(|a| a.chars().count())
            .unwrap_or(0)
    }

    /// 是否仍需生成内容
    ///
    /// 恰好等于阈值的题目仍视为未完成，只有严格超过阈值才跳过。
    pub fn needs_enrichment(&self, threshold: usize) -> bool {
        self.analysis_len() <= threshold
    }

    /// 写入生成结果
    pub fn apply(&mut self, enrichment: Enrichment) {
        self.legal_reference = Some(enrichment.legal_reference);
        self.analysis = Some(enrichment.analysis);
    }

    /// 正确答案对应的选项字母（A、B、C…），越界时返回 None
    pub fn correct_letter(&self) -> Option<char> {
        option_letter(self.correct_answer).filter(|_| self.correct_answer < self.options.len())
    }

    /// 非空白的背景场景
    pub fn scenario_text(&self) -> Option<&str> {
        self.scenario.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// 选项序号 → 字母
pub fn option_letter(index: usize) -> Option<char> {
    if index < 26 {
        Some((b'A' + index as u8) as char)
    } else {
        None
    }
}

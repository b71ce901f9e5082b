//! 测试公共工具：脚本化的假 LLM 客户端与题库夹具
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use question_enricher::error::LlmError;
use question_enricher::{CompletionClient, CompletionRequest, Config, Record, RecordId};
use serde_json::Map;

/// 按题目文本编排行为的假客户端
///
/// - 默认每次都返回合法结果（包在 ```json 代码块里）
/// - `failing(q, n)`：前 n 次失败，奇数次为网络错误，偶数次为无法解析的文本
/// - 记录调用次数与同时在途的最大请求数
#[derive(Default)]
pub struct FakeClient {
    failures: HashMap<String, u32>,
    latency: Duration,
    slow: HashMap<String, Duration>,
    attempts: Mutex<HashMap<String, u32>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, question: &str, times: u32) -> Self {
        self.failures.insert(question.to_string(), times);
        self
    }

    pub fn always_failing(self, question: &str) -> Self {
        self.failing(question, u32::MAX)
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn slow_for(mut self, question: &str, latency: Duration) -> Self {
        self.slow.insert(question.to_string(), latency);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn attempts_for(&self, question: &str) -> u32 {
        self.attempts
            .lock()
            .unwrap()
            .get(question)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl CompletionClient for FakeClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let question = question_of(request);
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(question.clone()).or_insert(0);
            *n += 1;
            *n
        };
        self.calls.fetch_add(1, Ordering::SeqCst);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.slow.get(&question).copied().unwrap_or(self.latency);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let fail_count = self.failures.get(&question).copied().unwrap_or(0);
        if attempt <= fail_count {
            return if attempt % 2 == 1 {
                Err(LlmError::ApiCallFailed {
                    model: "fake".into(),
                    message: format!("simulated failure {}", attempt),
                })
            } else {
                Ok("抱歉，我暂时无法回答这个问题。".into())
            };
        }

        Ok(enrichment_response(&question))
    }
}

/// 从 user prompt 中取出题干
pub fn question_of(request: &CompletionRequest) -> String {
    request
        .user
        .split("【题目】")
        .nth(1)
        .and_then(|rest| rest.lines().next())
        .unwrap_or_default()
        .to_string()
}

/// 假模型输出：analysis 长度超过默认阈值
pub fn enrichment_response(question: &str) -> String {
    let body = serde_json::json!({
        "legalReference": format!("GDPR Article 6 - {}", question),
        "analysis": format!("{}：{}", question, "解析".repeat(300)),
    });
    format!("```json\n{}\n```", body)
}

pub fn record(id: i64, analysis: Option<String>) -> Record {
    Record {
        id: RecordId::Number(id),
        question: format!("Q{}", id),
        options: vec!["Consent".into(), "Contract".into(), "Vital interests".into()],
        correct_answer: 0,
        scenario: None,
        explanation: Some("See Art. 6".into()),
        legal_reference: None,
        analysis,
        extra: Map::new(),
    }
}

/// 已完成的题目（analysis 超过 500 字符）
pub fn complete_record(id: i64) -> Record {
    let mut r = record(id, Some("x".repeat(501)));
    r.legal_reference = Some("GDPR Article 1".into());
    r
}

/// 写入题库与参考文本，返回指向它们的测试配置
pub fn write_fixture(dir: &Path, records: &[Record]) -> Config {
    let questions_path = dir.join("questions.json");
    let context_path = dir.join("GDPR.md");
    std::fs::write(&questions_path, serde_json::to_string_pretty(records).unwrap()).unwrap();
    std::fs::write(&context_path, "Article 6\nLawfulness of processing").unwrap();

    Config {
        llm_api_key: Some("sk-test".into()),
        retry_base_delay_ms: 1,
        questions_path,
        context_path,
        ..Config::default()
    }
}

pub fn read_records(path: &Path) -> Vec<Record> {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

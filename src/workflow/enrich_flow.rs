//! 单题处理流程 - 流程层
//!
//! 核心职责：定义"一道题"的完整处理流程
//!
//! ```text
//! Pending → Attempting → Succeeded
//!               ↓ 失败
//!           Retrying（退避等待）→ Attempting
//!               ↓ 达到最大次数
//!           Exhausted
//! ```
//!
//! 任何错误（网络、限流、输出格式、缺字段）都只算一次失败尝试，
//! 不会向上传播，一道题失败不会中断整个批次。

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::clients::{CompletionClient, CompletionRequest};
use crate::error::{AppError, LlmError};
use crate::models::{Enrichment, Record, RecordId};
use crate::services::{parse_enrichment, PromptBuilder};
use crate::workflow::retry::RetryPolicy;

/// 单题的最终状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 生成成功
    Succeeded(Enrichment),
    /// 重试次数用尽，附带最后一次错误
    Exhausted { last_error: String },
}

/// 单题处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkOutcome {
    pub id: RecordId,
    /// 实际尝试次数
    pub attempts: u32,
    pub outcome: Outcome,
}

impl WorkOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded(_))
    }
}

/// 单题处理流程
///
/// - 不持有题库，只读单道题
/// - 每次尝试都要先从共享限流器拿一个名额，请求结束（无论成败）立即归还
/// - 退避等待期间不占用名额
#[derive(Clone)]
pub struct EnrichFlow {
    client: Arc<dyn CompletionClient>,
    prompts: PromptBuilder,
    limiter: Arc<Semaphore>,
    retry: RetryPolicy,
}

impl EnrichFlow {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        prompts: PromptBuilder,
        limiter: Arc<Semaphore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            prompts,
            limiter,
            retry,
        }
    }

    /// 处理一道题，直到成功或重试用尽
    pub async fn run(&self, record: &Record) -> WorkOutcome {
        let id = record.id.clone();
        let request = self.prompts.build_request(record);
        let mut last_error = String::new();

        for attempt in 1..=self.retry.max_attempts() {
            match self.attempt(&request).await {
                Ok(enrichment) => {
                    info!("  ✓ Q{} 完成 (attempt {})", id, attempt);
                    return WorkOutcome {
                        id,
                        attempts: attempt,
                        outcome: Outcome::Succeeded(enrichment),
                    };
                }
                Err(e) => {
                    warn!("  ✗ Q{} 第 {} 次失败: {}", id, attempt, e);
                    last_error = e.to_string();

                    if self.retry.should_retry(attempt) {
                        let wait = self.retry.delay_for_attempt(attempt);
                        info!("    等待 {:?} 后重试...", wait);
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }

        error!("  ✗ Q{} 已达最大重试次数，跳过", id);
        WorkOutcome {
            id,
            attempts: self.retry.max_attempts(),
            outcome: Outcome::Exhausted { last_error },
        }
    }

    /// 一次尝试：限流 → 调用 → 解析校验
    async fn attempt(&self, request: &CompletionRequest) -> Result<Enrichment, AppError> {
        let raw = {
            let _permit = self
                .limiter
                .acquire()
                .await
                .map_err(|_| LlmError::LimiterClosed)?;
            self.client.complete(request).await?
        };

        Ok(parse_enrichment(&raw)?)
    }
}

//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责题库的加载、调度、合并与落盘。
//!
//! ## 核心功能
//!
//! 1. **加载**：读取题库和参考文本，任一缺失即为致命错误
//! 2. **断点续传**：analysis 已足够长的题目直接跳过
//! 3. **调度**：委托 `Dispatcher` 并发处理剩余题目
//! 4. **合并**：按完成顺序把成功结果写回题库（只在本任务中修改题库）
//! 5. **落盘**：每成功 N 题写一次快照，结束时再写一次
//! 6. **统计**：输出吞吐与最终结果

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::StreamExt;
use tracing::{info, warn};

use crate::clients::CompletionClient;
use crate::config::Config;
use crate::error::AppResult;
use crate::models::{load_collection, load_context, Collection};
use crate::orchestrator::dispatcher::Dispatcher;
use crate::services::PromptBuilder;
use crate::storage::SnapshotWriter;
use crate::utils::logger::rule;
use crate::workflow::Outcome;

/// 应用主结构
pub struct App {
    config: Config,
    client: Arc<dyn CompletionClient>,
    collection: Collection,
    context: String,
    writer: SnapshotWriter,
}

/// 一次运行的统计
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunReport {
    /// 题库总题数
    pub total_records: usize,
    /// 已完成而跳过的题数
    pub skipped: usize,
    /// 本次待处理题数
    pub pending: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// 中途写快照的次数（不含最后一次）
    pub checkpoints: usize,
    /// 实际写快照的总次数
    pub snapshots_written: usize,
    pub elapsed: Duration,
}

impl RunReport {
    /// 每分钟完成题数
    pub fn per_minute(&self) -> f64 {
        per_minute(self.succeeded, self.elapsed)
    }
}

impl App {
    /// 初始化应用：加载题库与参考文本
    pub async fn initialize(config: Config, client: Arc<dyn CompletionClient>) -> AppResult<Self> {
        log_startup(&config);

        info!("正在加载数据...");
        let collection = load_collection(&config.questions_path).await?;
        let context = load_context(&config.context_path).await?;
        let writer = SnapshotWriter::new(config.questions_path.clone());

        Ok(Self {
            config,
            client,
            collection,
            context,
            writer,
        })
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 运行应用主逻辑
    pub async fn run(&mut self) -> Result<RunReport> {
        let pending = self.collection.pending(self.config.skip_threshold);
        let mut report = RunReport {
            total_records: self.collection.len(),
            skipped: self.collection.len() - pending.len(),
            pending: pending.len(),
            ..Default::default()
        };

        log_loaded(&report, self.context.chars().count());

        if pending.is_empty() {
            info!("\n✅ 所有题目已完成，无需处理。");
            return Ok(report);
        }

        // system prompt 只构建一次，所有请求共享
        let prompts = PromptBuilder::new(&self.context);
        info!(
            "  System Prompt: ~{} 字符 (含参考全文，将触发前缀缓存)",
            prompts.system_prompt().chars().count()
        );

        let dispatcher = Dispatcher::new(Arc::clone(&self.client), prompts, &self.config);
        log_dispatch_start(self.config.concurrency, dispatcher.pool_size());

        let start = Instant::now();
        let mut since_save = 0usize;

        let results = dispatcher.dispatch(pending);
        futures::pin_mut!(results);

        while let Some(result) = results.next().await {
            match result.outcome {
                Outcome::Succeeded(enrichment) => {
                    if !self.collection.apply(&result.id, enrichment) {
                        warn!("⚠️ 题库中找不到 Q{}，结果丢弃", result.id);
                        report.failed += 1;
                        continue;
                    }
                    report.succeeded += 1;
                    since_save += 1;

                    if since_save >= self.config.save_every {
                        self.writer.save(&self.collection).await?;
                        report.checkpoints += 1;
                        report.snapshots_written += 1;
                        since_save = 0;
                        log_checkpoint(report.succeeded, report.pending, start.elapsed());
                    }
                }
                Outcome::Exhausted { .. } => {
                    report.failed += 1;
                }
            }
        }

        // 最终保存
        self.writer.save(&self.collection).await?;
        report.snapshots_written += 1;
        report.elapsed = start.elapsed();

        print_final_stats(&report, self.writer.path());

        Ok(report)
    }
}

fn per_minute(done: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        done as f64 / secs * 60.0
    } else {
        0.0
    }
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    info!("{}", rule('='));
    info!("🚀 程序启动 - 题库深度优化");
    info!("🤖 模型: {} ({})", config.llm_model_name, config.llm_api_base_url);
    info!("📊 最大并发数: {}", config.concurrency);
    info!("{}", rule('='));
}

fn log_loaded(report: &RunReport, context_chars: usize) {
    info!("  题目总数: {}", report.total_records);
    info!("  参考文本: {} 字符", context_chars);
    info!("  已完成(跳过): {}", report.skipped);
    info!("  待处理: {}", report.pending);
}

fn log_dispatch_start(concurrency: usize, pool_size: usize) {
    info!("\n开始处理（并发={}，worker={}）...\n", concurrency, pool_size);
}

fn log_checkpoint(done: usize, total: usize, elapsed: Duration) {
    info!(
        "  >> 已保存 ({}/{} 完成, 用时 {:.1} 秒, {:.1} 题/分钟)",
        done,
        total,
        elapsed.as_secs_f64(),
        per_minute(done, elapsed)
    );
}

fn print_final_stats(report: &RunReport, output: &Path) {
    info!("\n{}", rule('='));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", rule('='));
    info!("✅ 成功: {}/{}", report.succeeded, report.pending);
    info!("❌ 失败: {}", report.failed);
    info!("⏱️ 总耗时: {:.1} 秒", report.elapsed.as_secs_f64());
    info!("{}", rule('='));
    info!("\n结果已保存到: {}", output.display());
}

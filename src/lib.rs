//! # Question Enricher
//!
//! 调用 LLM 为考试题库中的每道题生成法条原文（`legalReference`）与深度解析（`analysis`）
//!
//! ## 架构设计
//!
//! ### ① 数据层（Models / Storage）
//! - `models/` - `Record` / `Collection`，题库的加载与索引
//! - `storage/` - 快照写入（临时文件 + rename）
//!
//! ### ② 能力层（Services / Clients）
//! - `services/` - 提示词构建、模型输出解析，纯函数
//! - `clients/` - `CompletionClient` trait 与 async-openai 实现
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 单题流程：限流 → 调用 → 解析 → 退避重试
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/dispatcher` - worker 池 + 限流器，按完成顺序产出结果
//! - `orchestrator/batch_processor` - 加载、断点续传、合并、落盘、统计
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod storage;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{CompletionClient, CompletionRequest, OpenAiClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Collection, Enrichment, Record, RecordId};
pub use orchestrator::{App, Dispatcher, RunReport};
pub use storage::SnapshotWriter;
pub use workflow::{EnrichFlow, Outcome, RetryPolicy, WorkOutcome};

//! 调度器 - 编排层
//!
//! ## 职责
//!
//! 以固定大小的 worker 池跑完所有待处理题目，按完成顺序产出结果。
//!
//! ## 并发控制
//!
//! - **worker 池**：`buffer_unordered(pool_size)`，题目按需从列表中取出，同时存活的 worker 数有上限
//! - **限流器**：所有 worker 共享一个 `Semaphore(concurrency)`，只在网络请求期间占用名额
//!
//! 所有 worker 都在调用方的任务上被轮询，调度器本身不触碰题库，
//! 合并结果由调用方在拿到每个结果后单线程完成。

use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::Semaphore;

use crate::clients::CompletionClient;
use crate::config::Config;
use crate::models::Record;
use crate::services::PromptBuilder;
use crate::workflow::{EnrichFlow, WorkOutcome};

/// 调度器
pub struct Dispatcher {
    flow: EnrichFlow,
    limiter: Arc<Semaphore>,
    pool_size: usize,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn CompletionClient>, prompts: PromptBuilder, config: &Config) -> Self {
        let limiter = Arc::new(Semaphore::new(config.concurrency));
        let flow = EnrichFlow::new(
            client,
            prompts,
            Arc::clone(&limiter),
            config.retry_policy(),
        );

        Self {
            flow,
            limiter,
            pool_size: config.pool_size(),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// 当前空闲的请求名额
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    /// 处理所有题目，返回按完成顺序产出结果的流
    pub fn dispatch(&self, items: Vec<Record>) -> impl Stream<Item = WorkOutcome> + '_ {
        let flow = &self.flow;
        stream::iter(items)
            .map(move |record| async move { flow.run(&record).await })
            .buffer_unordered(self.pool_size)
    }
}

//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量处理器
//! - 管理应用生命周期（加载、运行、落盘）
//! - 筛选待处理题目，合并结果，输出统计
//!
//! ### `dispatcher` - 调度器
//! - 固定大小的 worker 池 + 共享限流器
//! - 按完成顺序产出单题结果
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Collection)
//!     ↓
//! dispatcher (处理 Vec<Record>)
//!     ↓
//! workflow::EnrichFlow (处理单个 Record)
//!     ↓
//! services / clients (能力层：prompt / parse / LLM)
//! ```

pub mod batch_processor;
pub mod dispatcher;

// 重新导出主要类型
pub use batch_processor::{App, RunReport};
pub use dispatcher::Dispatcher;

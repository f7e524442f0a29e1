//! 提取流水线模块
//!
//! 扫描 → 载荷读取 → 嗅探 → 指纹去重 → 原子写入，由工作池并发驱动。
//!
//! ## 并发模型
//! - **扫描线程**: 惰性遍历缓存目录，经有界通道向工作池投递候选文件
//! - **工作池**: 固定大小的rayon线程池，候选文件之间没有顺序保证
//! - **共享状态**: 去重索引是唯一的可变共享资源

pub mod batch_state;
pub mod output;
pub mod payload;
pub mod reporter;
pub mod scanner;
pub mod worker_pool;

// 重新导出公共接口
pub use batch_state::{RunStats, RunSummary};
pub use output::OutputLayout;
pub use payload::{CandidatePayload, PayloadEncoding, PeekableReader};
pub use reporter::{CandidateEvent, NullReporter, Outcome, ProgressReporter};
pub use scanner::{CacheScanner, CandidateFile, ScanIter};
pub use worker_pool::{
    ExtractConfig, ExtractionPool, ExtractionRun, StopSignal, extract, extract_silent,
};

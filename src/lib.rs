//! Cache Audio Extractor
//!
//! 从游戏引擎本地磁盘缓存中提取音频资源：扫描缓存文件，按签名字节识别音频内容，
//! 以内容指纹去重后写入输出目录，跨运行不会重复提取同一资源。
//!
//! ## 核心特性
//! - 基于签名表的内容嗅探，不依赖文件扩展名
//! - gzip包装条目透明解压，支持带自定义头的嵌入式载荷
//! - BLAKE3内容指纹 + 持久化JSON Lines去重索引
//! - 扫描线程 + 有界通道 + rayon工作池，协作式停止
//!
//! ```no_run
//! use cache_audio_extractor::{ExtractConfig, NullReporter, StopSignal, extract};
//!
//! let config = ExtractConfig::new("/path/to/rbx-storage", "/path/to/output")
//!     .with_index("/path/to/extracted_index.jsonl");
//! let summary = extract(&config, &NullReporter, StopSignal::new())?;
//! println!("extracted {} assets", summary.extracted);
//! # Ok::<(), cache_audio_extractor::ExtractError>(())
//! ```

pub mod audio;
pub mod core;
pub mod error;
pub mod processing;
pub mod tools;

// 重新导出核心类型
pub use audio::{AudioKind, Detection, Signature, Sniffer};
pub use core::{ContentFingerprint, DedupIndex, IndexEntry};
pub use error::{ErrorCategory, ExtractError, ExtractResult, IndexResult, ScanError};
pub use processing::{
    CacheScanner, CandidateEvent, CandidateFile, ExtractConfig, ExtractionPool, ExtractionRun,
    NullReporter, Outcome, OutputLayout, ProgressReporter, RunSummary, StopSignal, extract,
};

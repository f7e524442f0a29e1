//! 核心数据结构模块
//!
//! 内容指纹和跨运行持久化的去重索引。

pub mod dedup_index;
pub mod fingerprint;

// 重新导出公共接口
pub use dedup_index::{DedupIndex, INDEX_FORMAT, INDEX_VERSION, IndexEntry};
pub use fingerprint::{ContentFingerprint, FINGERPRINT_LEN, ParseFingerprintError};

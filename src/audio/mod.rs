//! 音频识别模块
//!
//! 基于签名字节的内容嗅探：签名表、嗅探器和音频类型定义。

pub mod format;
pub mod signature;
pub mod sniffer;

pub use format::{AudioKind, Detection};
pub use signature::{DEFAULT_SIGNATURES, Pattern, Signature};
pub use sniffer::Sniffer;

//! 工具函数模块
//!
//! 提供并发度计算、文件路径处理、数值格式化等通用工具函数。

use super::constants::parallel_limits::{MAX_PARALLEL_DEGREE, MIN_PARALLEL_DEGREE};

/// 计算实际并发度
///
/// `requested == 0` 表示自动：取系统可用并行度。结果总是限制在
/// `MIN_PARALLEL_DEGREE..=MAX_PARALLEL_DEGREE` 之内。
pub fn effective_parallel_degree(requested: usize) -> usize {
    let degree = if requested == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(MIN_PARALLEL_DEGREE)
    } else {
        requested
    };
    degree.clamp(MIN_PARALLEL_DEGREE, MAX_PARALLEL_DEGREE)
}

/// 文件路径处理工具函数
pub mod path {
    use std::path::Path;

    /// 提取文件名（返回String，用于日志显示）
    #[inline]
    pub fn extract_filename_lossy(path: &Path) -> String {
        path.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }
}

/// 数值格式化工具函数
pub mod format {
    use std::time::Duration;

    /// 字节数转换为可读文本（1024进制）
    pub fn human_bytes(bytes: u64) -> String {
        const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
        let mut value = bytes as f64;
        let mut unit = 0;
        while value >= 1024.0 && unit < UNITS.len() - 1 {
            value /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{bytes} B")
        } else {
            format!("{value:.2} {}", UNITS[unit])
        }
    }

    /// 耗时转换为可读文本
    pub fn human_duration(elapsed: Duration) -> String {
        let secs = elapsed.as_secs_f64();
        if secs < 60.0 {
            format!("{secs:.2}s")
        } else {
            let total = elapsed.as_secs();
            format!("{}m{:02}s", total / 60, total % 60)
        }
    }
}

// 重新导出为平级函数
pub use format::{human_bytes, human_duration};
pub use path::extract_filename_lossy;

//! 工具模块集合
//!
//! 包含CLI、常量、格式化等工具模块，支持main.rs的流程控制。

pub mod cli;
pub mod constants;
pub mod formatter;
pub mod utils;

// 重新导出主要的公共接口
pub use cli::{AppConfig, RunMode, parse_args, show_completion_info, show_startup_info};
pub use formatter::{ConsoleReporter, format_failures, format_history, format_summary};
pub use utils::effective_parallel_degree;

//! Cache Audio Extractor - 主程序入口
//!
//! 纯流程控制器，负责协调各个工具模块完成提取任务。

use cache_audio_extractor::{
    DedupIndex, StopSignal,
    error::{ErrorCategory, ExtractError},
    processing,
    tools::{self, AppConfig, ConsoleReporter, RunMode},
};
use std::process;
use tracing_subscriber::EnvFilter;

/// 错误退出码定义
mod exit_codes {
    /// 通用错误
    pub const GENERAL_ERROR: i32 = 1;
    /// 输入错误（缓存目录不存在、参数非法）
    pub const INVALID_INPUT: i32 = 2;
    /// 输出目录不可写
    pub const WRITE_ERROR: i32 = 3;
    /// 去重索引错误
    pub const INDEX_ERROR: i32 = 4;
    /// 资源/并发错误
    pub const RESOURCE_ERROR: i32 = 5;
}

/// 获取错误建议文本
fn get_error_suggestion(error: &ExtractError) -> &'static str {
    match error {
        ExtractError::InvalidInput(_) => {
            "检查缓存目录是否存在，使用 --help 查看完整用法 / Check that the cache directory exists, use --help to see full usage"
        }
        ExtractError::Resource(_) => {
            "资源不可用，请检查系统资源或重试；若持续失败请降低线程数（-j） / Resource unavailable, retry or reduce threads (-j)"
        }
        _ => match ErrorCategory::from_extract_error(error) {
            ErrorCategory::Write => {
                "检查输出目录是否可写、磁盘空间是否充足 / Check that the output directory is writable and the disk has space"
            }
            ErrorCategory::Index => {
                "检查索引文件位置是否可写，或使用 --index 指定其他位置 / Check that the index location is writable, or pass --index"
            }
            ErrorCategory::Scan | ErrorCategory::Read => {
                "检查文件权限 / Check file permissions"
            }
            ErrorCategory::Other => "请检查输入参数设置 / Please check parameter settings",
        },
    }
}

/// 错误处理和建议
fn handle_error(error: ExtractError) -> ! {
    eprintln!("[ERROR] 错误 / Error: {error}");
    eprintln!("[INFO] 建议 / Suggestion: {}", get_error_suggestion(&error));

    let exit_code = match &error {
        ExtractError::InvalidInput(_) => exit_codes::INVALID_INPUT,
        ExtractError::Resource(_) => exit_codes::RESOURCE_ERROR,
        _ => match ErrorCategory::from_extract_error(&error) {
            ErrorCategory::Write => exit_codes::WRITE_ERROR,
            ErrorCategory::Index => exit_codes::INDEX_ERROR,
            ErrorCategory::Scan | ErrorCategory::Read | ErrorCategory::Other => {
                exit_codes::GENERAL_ERROR
            }
        },
    };

    process::exit(exit_code);
}

/// 初始化日志（stderr），RUST_LOG 优先
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// 显示提取历史
fn show_history(config: &AppConfig) -> Result<(), ExtractError> {
    let index = DedupIndex::open(&config.index_path)?;
    print!("{}", tools::format_history(&index));
    index.close()
}

/// 清空提取历史
fn clear_history(config: &AppConfig) -> Result<(), ExtractError> {
    let index = DedupIndex::open(&config.index_path)?;
    let count = index.len();
    index.clear()?;
    index.close()?;
    println!("🧹 已清空 {count} 条提取记录 / cleared {count} history entries");
    Ok(())
}

/// 扫描并提取
fn extract_mode(config: &AppConfig) -> Result<(), ExtractError> {
    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\n[INFO] 正在停止，等待进行中的文件完成 / stopping, finishing in-flight files");
        handler_stop.stop();
    }) {
        tracing::warn!(error = %e, "无法安装Ctrl-C处理器 / failed to install Ctrl-C handler");
    }

    let reporter = ConsoleReporter::new(config.verbose);
    let summary = processing::extract(&config.extract_config(), &reporter, stop)?;

    println!();
    print!("{}", tools::format_summary(&summary));
    if config.verbose && !summary.failures.is_empty() {
        println!("失败文件 / Failed files:");
        print!("{}", tools::format_failures(&summary));
    }
    if summary.extracted > 0 {
        println!("📂 输出目录 / Output: {}", config.output_path.display());
    }
    Ok(())
}

/// 应用程序主逻辑（便于测试和复用）
fn run() -> Result<(), ExtractError> {
    // 1. 解析命令行参数
    let config = tools::parse_args()?;
    init_tracing(config.verbose);

    // 2. 根据模式选择处理方式
    match config.mode {
        RunMode::ShowHistory => show_history(&config),
        RunMode::ClearHistory => clear_history(&config),
        RunMode::Extract => {
            tools::show_startup_info(&config);
            extract_mode(&config)?;
            tools::show_completion_info(&config);
            Ok(())
        }
    }
}

fn main() {
    if let Err(error) = run() {
        handle_error(error);
    }
}

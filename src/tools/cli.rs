//! 命令行接口模块
//!
//! 负责命令行参数解析、默认路径推导和程序信息展示。

use super::constants::{cache_paths, defaults, sniffing};
use crate::error::{ExtractError, ExtractResult};
use crate::processing::{ExtractConfig, OutputLayout};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// 扫描并提取
    Extract,
    /// 显示提取历史后退出
    ShowHistory,
    /// 清空提取历史后退出
    ClearHistory,
}

/// 应用程序配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 缓存根目录
    pub input_path: PathBuf,

    /// 输出目录
    pub output_path: PathBuf,

    /// 去重索引文件
    pub index_path: PathBuf,

    /// 工作线程数（0 = 自动）
    pub threads: usize,

    pub layout: OutputLayout,

    pub unwrap_gzip: bool,

    pub search_window: usize,

    pub min_size: u64,

    /// 是否显示详细信息
    pub verbose: bool,

    pub mode: RunMode,
}

impl AppConfig {
    /// 转换为引擎配置
    pub fn extract_config(&self) -> ExtractConfig {
        ExtractConfig {
            search_window: self.search_window,
            min_size: self.min_size,
            unwrap_gzip: self.unwrap_gzip,
            ..ExtractConfig::new(&self.input_path, &self.output_path)
                .with_index(&self.index_path)
                .with_workers(self.threads)
                .with_layout(self.layout)
        }
    }
}

/// 构建命令行定义
pub fn build_cli() -> Command {
    Command::new("cache-audio-extractor")
        .version(VERSION)
        .about(DESCRIPTION)
        .author("MacinMeter Team")
        .arg(
            Arg::new("INPUT")
                .help("游戏缓存目录 / cache directory。如果不指定，使用平台默认的 rbx-storage 目录")
                .required(false)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("输出目录 / output directory (默认: <INPUT>/extracted_assets)")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("index")
                .long("index")
                .help("去重索引文件 / dedup index file (默认位于用户数据目录)")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .short('j')
                .help("工作线程数 / worker threads (0 = 自动, 最多32)")
                .value_name("N")
                .default_value("0")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("layout")
                .long("layout")
                .help("输出目录布局 / output layout")
                .value_name("LAYOUT")
                .default_value("kind")
                .value_parser(["flat", "kind", "size"]),
        )
        .arg(
            Arg::new("no-gzip")
                .long("no-gzip")
                .help("不解压gzip包装的缓存条目 / do not unwrap gzip-compressed entries")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("search-window")
                .long("search-window")
                .help("嵌入式音频搜索窗口 / embedded audio search window (默认4096, 0 = 只匹配文件头)")
                .value_name("BYTES")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("min-size")
                .long("min-size")
                .help("跳过小于该大小的文件 / skip files smaller than this (默认10)")
                .value_name("BYTES")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("显示详细处理信息 / verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("history")
                .long("history")
                .help("显示提取历史后退出 / show extraction history and exit")
                .action(ArgAction::SetTrue)
                .conflicts_with("clear-history"),
        )
        .arg(
            Arg::new("clear-history")
                .long("clear-history")
                .help("清空提取历史后退出 / clear extraction history and exit")
                .action(ArgAction::SetTrue),
        )
}

/// 解析命令行参数并创建配置（参数错误时由clap打印用法并退出）
pub fn parse_args() -> ExtractResult<AppConfig> {
    config_from_matches(&build_cli().get_matches())
}

/// 从给定参数解析（不退出进程）
pub fn parse_args_from<I, T>(args: I) -> ExtractResult<AppConfig>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_cli()
        .try_get_matches_from(args)
        .map_err(|e| ExtractError::InvalidInput(e.to_string()))?;
    config_from_matches(&matches)
}

fn config_from_matches(matches: &ArgMatches) -> ExtractResult<AppConfig> {
    let input_path = match matches.get_one::<PathBuf>("INPUT") {
        Some(input) => input.clone(),
        None => default_cache_root().ok_or_else(|| {
            ExtractError::InvalidInput(
                "无法确定默认缓存目录，请指定 INPUT / cannot determine default cache directory, please pass INPUT"
                    .to_string(),
            )
        })?,
    };

    let output_path = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| input_path.join(defaults::OUTPUT_DIR_NAME));

    let index_path = matches
        .get_one::<PathBuf>("index")
        .cloned()
        .or_else(default_index_path)
        .unwrap_or_else(|| output_path.join(defaults::INDEX_FILE_NAME));

    let layout = matches
        .get_one::<String>("layout")
        .map(|s| s.parse::<OutputLayout>())
        .transpose()
        .map_err(ExtractError::InvalidInput)?
        .unwrap_or_default();

    let mode = if matches.get_flag("history") {
        RunMode::ShowHistory
    } else if matches.get_flag("clear-history") {
        RunMode::ClearHistory
    } else {
        RunMode::Extract
    };

    Ok(AppConfig {
        input_path,
        output_path,
        index_path,
        threads: matches.get_one::<usize>("threads").copied().unwrap_or(0),
        layout,
        unwrap_gzip: !matches.get_flag("no-gzip"),
        search_window: matches
            .get_one::<usize>("search-window")
            .copied()
            .unwrap_or(sniffing::DEFAULT_SEARCH_WINDOW),
        min_size: matches
            .get_one::<u64>("min-size")
            .copied()
            .unwrap_or(defaults::MIN_CANDIDATE_SIZE),
        verbose: matches.get_flag("verbose"),
        mode,
    })
}

/// 平台默认的游戏缓存目录
///
/// - Windows: `%LOCALAPPDATA%\Roblox\rbx-storage`
/// - macOS: `~/Library/Caches/Roblox/rbx-storage`
/// - Linux: `~/.local/share/Roblox/rbx-storage`
pub fn default_cache_root() -> Option<PathBuf> {
    let dirs = directories::BaseDirs::new()?;
    let base = if cfg!(target_os = "macos") {
        dirs.cache_dir()
    } else {
        dirs.data_local_dir()
    };
    Some(base.join("Roblox").join(cache_paths::STORAGE_DIR))
}

/// 默认索引文件位置（用户数据目录）
pub fn default_index_path() -> Option<PathBuf> {
    directories::ProjectDirs::from(
        cache_paths::QUALIFIER,
        cache_paths::ORGANIZATION,
        cache_paths::APPLICATION,
    )
    .map(|dirs| dirs.data_dir().join(defaults::INDEX_FILE_NAME))
}

/// 显示程序启动信息
pub fn show_startup_info(config: &AppConfig) {
    println!("🚀 Cache Audio Extractor v{VERSION} 启动");
    println!("📝 {DESCRIPTION}");
    println!("📁 缓存目录 / Cache: {}", config.input_path.display());
    println!("📂 输出目录 / Output: {}", config.output_path.display());
    if config.verbose {
        println!("🗂️  去重索引 / Index: {}", config.index_path.display());
        println!(
            "⚙️  布局 / Layout: {}  gzip: {}  搜索窗口 / Window: {}",
            config.layout,
            if config.unwrap_gzip { "on" } else { "off" },
            config.search_window
        );
    }
    println!();
}

/// 显示程序完成信息
pub fn show_completion_info(config: &AppConfig) {
    if config.verbose {
        println!("✅ 所有任务处理完成！");
    }
}

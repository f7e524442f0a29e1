//! 提取工作池
//!
//! ```text
//! 扫描线程 ──bounded(2×N)──▶ rayon线程池(N) ──▶ 读取 → 嗅探 → 指纹 → 去重 → 写入 → 记录
//!                                               │
//!                                               └──▶ ProgressReporter
//! ```
//!
//! **背压机制**：扫描线程通过有界通道发送候选文件，通道满时阻塞，
//! 内存占用上限为"线程数 + 通道容量"个候选文件。
//!
//! **停止信号**：扫描线程在发送每个候选文件前检查，工作线程在开始每个
//! 候选文件前检查，绝不在写入中途停止。

use super::batch_state::{RunStats, RunSummary};
use super::output::{self, OutputLayout};
use super::payload::CandidatePayload;
use super::reporter::{CandidateEvent, NullReporter, Outcome, ProgressReporter};
use super::scanner::{CacheScanner, CandidateFile};
use crate::audio::Sniffer;
use crate::core::{ContentFingerprint, DedupIndex};
use crate::error::{ErrorCategory, ExtractError, ExtractResult, read_error, write_error};
use crate::tools::constants::{defaults, sniffing};
use crate::tools::utils;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// 协作式停止信号（可克隆，所有克隆共享同一状态）
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求停止：已开始的候选文件会处理完，不再开始新的
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 提取配置
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// 缓存根目录
    pub root: PathBuf,
    /// 输出目录
    pub dest: PathBuf,
    /// 去重索引文件，None表示只使用内存索引
    pub index_path: Option<PathBuf>,
    /// 工作线程数，0表示自动（可用并行度，限制在1..=32）
    pub workers: usize,
    /// 扫描队列容量，None表示 2 × 工作线程数
    pub queue_capacity: Option<usize>,
    pub layout: OutputLayout,
    /// 是否解压gzip包装的缓存条目
    pub unwrap_gzip: bool,
    /// 嵌入式载荷搜索窗口，0表示只做头部匹配
    pub search_window: usize,
    /// 候选文件最小字节数
    pub min_size: u64,
}

impl ExtractConfig {
    pub fn new(root: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dest: dest.into(),
            index_path: None,
            workers: 0,
            queue_capacity: None,
            layout: OutputLayout::default(),
            unwrap_gzip: true,
            search_window: sniffing::DEFAULT_SEARCH_WINDOW,
            min_size: defaults::MIN_CANDIDATE_SIZE,
        }
    }

    pub fn with_index(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    /// 实际使用的工作线程数
    pub fn effective_workers(&self) -> usize {
        utils::effective_parallel_degree(self.workers)
    }

    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity
            .unwrap_or_else(|| self.effective_workers() * defaults::QUEUE_CAPACITY_PER_WORKER)
            .max(1)
    }

    /// 按配置创建扫描器（输出目录和索引文件位于根目录内时自动排除）
    pub fn scanner(&self) -> CacheScanner {
        let mut scanner = CacheScanner::new(&self.root)
            .min_size(self.min_size)
            .exclude(&self.dest);
        if let Some(index) = &self.index_path {
            scanner = scanner.exclude(index);
        }
        scanner
    }

    pub fn sniffer(&self) -> Sniffer {
        Sniffer::default().with_search_window(self.search_window)
    }
}

/// 一次运行借用的外部状态
pub struct ExtractionRun<'a> {
    pub scanner: &'a CacheScanner,
    pub index: &'a DedupIndex,
    pub reporter: &'a dyn ProgressReporter,
    pub stop: StopSignal,
}

/// 单个候选文件的处理结果（内部）
struct Processed {
    event: CandidateEvent,
    category: Option<ErrorCategory>,
    bytes_written: u64,
}

impl Processed {
    fn ok(path: PathBuf, outcome: Outcome) -> Self {
        Self {
            event: CandidateEvent::new(path, outcome),
            category: None,
            bytes_written: 0,
        }
    }

    fn failed(path: PathBuf, outcome: Outcome, error: &ExtractError) -> Self {
        Self {
            event: CandidateEvent::failed(path, outcome, error),
            category: Some(ErrorCategory::from_extract_error(error)),
            bytes_written: 0,
        }
    }
}

/// 提取工作池
pub struct ExtractionPool {
    config: ExtractConfig,
    sniffer: Sniffer,
}

impl ExtractionPool {
    pub fn new(config: ExtractConfig, sniffer: Sniffer) -> Self {
        Self { config, sniffer }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// 执行一次提取运行
    ///
    /// 只有运行前检查（根目录不存在、输出目录不可写）和线程创建失败会返回错误，
    /// 单个候选文件的失败都体现在汇总里。
    pub fn run(&self, run: &ExtractionRun<'_>) -> ExtractResult<RunSummary> {
        let started = Instant::now();
        self.preflight(run.scanner.root())?;

        let workers = self.config.effective_workers();
        let capacity = self.config.effective_queue_capacity();
        tracing::info!(
            root = %run.scanner.root().display(),
            dest = %self.config.dest.display(),
            workers,
            capacity,
            "开始提取 / extraction started"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("extract-worker-{i}"))
            .build()
            .map_err(|e| ExtractError::Resource(format!("线程池创建失败: {e}")))?;

        let stats = RunStats::new();
        let (sender, receiver) = crossbeam_channel::bounded::<CandidateFile>(capacity);

        std::thread::scope(|s| -> ExtractResult<()> {
            let stats = &stats;
            let scan_stop = run.stop.clone();
            std::thread::Builder::new()
                .name("cache-scanner".to_string())
                .spawn_scoped(s, move || {
                    for item in run.scanner {
                        if scan_stop.is_stopped() {
                            break;
                        }
                        match item {
                            Ok(candidate) => {
                                // 所有接收端都已退出
                                if sender.send(candidate).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                stats.inc_scan_error();
                                run.reporter.on_scan_error(&e);
                            }
                        }
                    }
                })
                .map_err(|e| ExtractError::Resource(format!("扫描线程创建失败: {e}")))?;

            pool.install(|| {
                receiver.into_iter().par_bridge().for_each(|candidate| {
                    if run.stop.is_stopped() {
                        return;
                    }
                    let processed = self.process_candidate(candidate, run.index);
                    stats.inc_outcome(&processed.event.outcome, processed.bytes_written);
                    if let Some(category) = processed.category {
                        stats.inc_failed(category, processed.event.path.display().to_string());
                    }
                    run.reporter.on_candidate(&processed.event);
                });
            });
            Ok(())
        })?;

        let summary = stats.snapshot(started.elapsed(), run.stop.is_stopped());
        tracing::info!(
            extracted = summary.extracted,
            duplicate = summary.duplicate,
            not_audio = summary.not_audio,
            failed = summary.failed(),
            cancelled = summary.cancelled,
            "提取结束 / extraction finished"
        );
        run.reporter.on_complete(&summary);
        Ok(summary)
    }

    /// 运行前的致命检查
    ///
    /// 根目录必须存在；输出目录必须可写，且不能是根目录本身或其上级
    /// （否则整个缓存都会被当作输出目录排除）。
    pub(crate) fn preflight(&self, root: &Path) -> ExtractResult<()> {
        if !root.is_dir() {
            return Err(ExtractError::InvalidInput(format!(
                "缓存目录不存在或不是目录 / cache root missing or not a directory: {}",
                root.display()
            )));
        }
        let dest = &self.config.dest;
        output::probe_writable(dest, defaults::WRITE_PROBE_NAME)?;

        let canonical_root = root.canonicalize().map_err(|e| read_error(root, e))?;
        let canonical_dest = dest.canonicalize().map_err(|e| write_error(dest, e))?;
        if canonical_root.starts_with(&canonical_dest) {
            return Err(ExtractError::InvalidInput(format!(
                "输出目录不能是缓存目录或其上级 / output directory must not contain the cache root: {}",
                dest.display()
            )));
        }
        Ok(())
    }

    /// 单个候选文件的完整流水线
    fn process_candidate(&self, candidate: CandidateFile, index: &DedupIndex) -> Processed {
        let path = candidate.path;

        let payload = match CandidatePayload::open(&path, self.sniffer.required_len(), self.config.unwrap_gzip) {
            Ok(payload) => payload,
            Err(e) => {
                let err = read_error(&path, e);
                return Processed::failed(path, Outcome::ReadError, &err);
            }
        };

        let Some(detection) = self.sniffer.classify(payload.head()) else {
            tracing::debug!(path = %path.display(), "不是音频 / not audio");
            return Processed::ok(path, Outcome::NotAudio);
        };
        let kind = detection.kind;

        let bytes = match payload.into_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = read_error(&path, e);
                return Processed::failed(path, Outcome::ReadError, &err);
            }
        };
        let body = bytes.get(detection.offset..).unwrap_or_default();
        let fingerprint = ContentFingerprint::of(body);

        if index.contains(&fingerprint) {
            tracing::debug!(path = %path.display(), fingerprint = %fingerprint.short(), "重复资源 / duplicate");
            return Processed::ok(path, Outcome::Duplicate { kind });
        }

        let output_path = self
            .config
            .layout
            .asset_path(&self.config.dest, &fingerprint, kind, body.len() as u64);
        if let Err(err) = output::write_atomic(&output_path, body) {
            tracing::warn!(path = %path.display(), error = %err, "写入失败 / write failed");
            return Processed::failed(path, Outcome::WriteError, &err);
        }

        match index.record(fingerprint, &output_path) {
            Ok(true) => {
                tracing::debug!(
                    path = %path.display(),
                    kind = %kind,
                    offset = detection.offset,
                    output = %output_path.display(),
                    "已提取 / extracted"
                );
                Processed {
                    event: CandidateEvent::new(path, Outcome::Extracted { kind, output_path }),
                    category: None,
                    bytes_written: body.len() as u64,
                }
            }
            // 并发竞争中落败：另一个工作线程已写入相同内容
            Ok(false) => Processed::ok(path, Outcome::Duplicate { kind }),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "索引记录失败 / index record failed");
                Processed::failed(path, Outcome::WriteError, &err)
            }
        }
    }
}

/// 便捷入口：检查、打开索引（失败时降级为内存索引）、运行、关闭索引
pub fn extract(
    config: &ExtractConfig,
    reporter: &dyn ProgressReporter,
    stop: StopSignal,
) -> ExtractResult<RunSummary> {
    let pool = ExtractionPool::new(config.clone(), config.sniffer());
    // 检查失败时不应在磁盘上留下索引文件
    pool.preflight(&config.root)?;

    let index = match &config.index_path {
        Some(path) => DedupIndex::open(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "去重索引不可用，本次使用内存索引 / dedup index unavailable, using in-memory index");
            DedupIndex::in_memory()
        }),
        None => DedupIndex::in_memory(),
    };

    let scanner = config.scanner();
    let summary = pool.run(&ExtractionRun {
        scanner: &scanner,
        index: &index,
        reporter,
        stop,
    })?;

    if let Err(e) = index.close() {
        tracing::warn!(error = %e, "关闭去重索引失败 / failed to close dedup index");
    }
    Ok(summary)
}

/// 不需要进度报告时的简化入口
pub fn extract_silent(config: &ExtractConfig) -> ExtractResult<RunSummary> {
    extract(config, &NullReporter, StopSignal::new())
}

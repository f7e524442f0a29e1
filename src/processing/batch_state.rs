//! 运行统计模块
//!
//! 工作线程并发累加计数，运行结束时生成 [`RunSummary`] 快照。

use super::reporter::Outcome;
use crate::audio::AudioKind;
use crate::error::ErrorCategory;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// 一次提取运行的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub extracted: usize,
    pub duplicate: usize,
    pub not_audio: usize,
    pub read_error: usize,
    pub write_error: usize,
    /// 扫描阶段的错误数（不计入候选文件）
    pub scan_errors: usize,
    /// 新提取资源按类型计数
    pub extracted_by_kind: BTreeMap<AudioKind, usize>,
    /// 写入输出的总字节数
    pub bytes_written: u64,
    /// 错误分类统计（错误类型 -> 失败文件列表）
    pub failures: BTreeMap<ErrorCategory, Vec<String>>,
    pub elapsed: Duration,
    /// 是否被停止信号中断
    pub cancelled: bool,
}

impl RunSummary {
    /// 得到结果的候选文件总数
    pub fn total(&self) -> usize {
        self.extracted + self.duplicate + self.not_audio + self.read_error + self.write_error
    }

    pub fn failed(&self) -> usize {
        self.read_error + self.write_error
    }

    /// 识别为音频的候选文件数
    pub fn audio_found(&self) -> usize {
        self.extracted + self.duplicate
    }
}

/// 并行运行统计（多线程安全）
///
/// 使用原子类型和锁，适用于工作线程并发更新
#[derive(Debug, Default)]
pub struct RunStats {
    extracted: AtomicUsize,
    duplicate: AtomicUsize,
    not_audio: AtomicUsize,
    read_error: AtomicUsize,
    write_error: AtomicUsize,
    scan_errors: AtomicUsize,
    bytes_written: AtomicU64,
    by_kind: [AtomicUsize; AudioKind::ALL.len()],
    error_stats: Mutex<HashMap<ErrorCategory, Vec<String>>>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个候选文件的结果，返回已处理的候选文件总数
    pub fn inc_outcome(&self, outcome: &Outcome, bytes_written: u64) -> usize {
        let counter = match outcome {
            Outcome::Extracted { kind, .. } => {
                self.by_kind[kind_slot(*kind)].fetch_add(1, Ordering::Relaxed);
                self.bytes_written.fetch_add(bytes_written, Ordering::Relaxed);
                &self.extracted
            }
            Outcome::Duplicate { .. } => &self.duplicate,
            Outcome::NotAudio => &self.not_audio,
            Outcome::ReadError => &self.read_error,
            Outcome::WriteError => &self.write_error,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.processed()
    }

    /// 记录失败文件的错误分类（线程安全）
    pub fn inc_failed(&self, category: ErrorCategory, filename: String) {
        if let Ok(mut stats) = self.error_stats.lock() {
            stats.entry(category).or_default().push(filename);
        }
    }

    #[inline]
    pub fn inc_scan_error(&self) -> usize {
        self.scan_errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 已得到结果的候选文件数
    pub fn processed(&self) -> usize {
        [
            &self.extracted,
            &self.duplicate,
            &self.not_audio,
            &self.read_error,
            &self.write_error,
        ]
        .iter()
        .map(|c| c.load(Ordering::Relaxed))
        .sum()
    }

    /// 获取统计快照（线程安全）
    pub fn snapshot(&self, elapsed: Duration, cancelled: bool) -> RunSummary {
        let extracted_by_kind = AudioKind::ALL
            .iter()
            .map(|kind| (*kind, self.by_kind[kind_slot(*kind)].load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();

        let failures = self
            .error_stats
            .lock()
            .map(|stats| {
                stats
                    .iter()
                    .map(|(category, files)| {
                        let mut files = files.clone();
                        files.sort();
                        (*category, files)
                    })
                    .collect()
            })
            .unwrap_or_default();

        RunSummary {
            extracted: self.extracted.load(Ordering::Relaxed),
            duplicate: self.duplicate.load(Ordering::Relaxed),
            not_audio: self.not_audio.load(Ordering::Relaxed),
            read_error: self.read_error.load(Ordering::Relaxed),
            write_error: self.write_error.load(Ordering::Relaxed),
            scan_errors: self.scan_errors.load(Ordering::Relaxed),
            extracted_by_kind,
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            failures,
            elapsed,
            cancelled,
        }
    }
}

fn kind_slot(kind: AudioKind) -> usize {
    AudioKind::ALL
        .iter()
        .position(|k| *k == kind)
        .unwrap_or_default()
}

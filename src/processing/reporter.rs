//! 进度报告接口
//!
//! 引擎不直接打印任何内容，所有进度通过注入的 [`ProgressReporter`] 发出。
//! 回调会被多个工作线程并发调用，实现需要自行保证线程安全。

use super::batch_state::RunSummary;
use crate::audio::AudioKind;
use crate::error::ScanError;
use std::path::PathBuf;

/// 单个候选文件的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 新提取的资源
    Extracted { kind: AudioKind, output_path: PathBuf },
    /// 内容已提取过（本次或之前的运行）
    Duplicate { kind: AudioKind },
    /// 不是可识别的音频
    NotAudio,
    /// 读取失败（文件消失、权限不足等）
    ReadError,
    /// 写入输出或记录索引失败
    WriteError,
}

impl Outcome {
    /// 识别出的音频类型（如果有）
    pub fn kind(&self) -> Option<AudioKind> {
        match self {
            Self::Extracted { kind, .. } | Self::Duplicate { kind } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::ReadError | Self::WriteError)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Extracted { .. } => "extracted",
            Self::Duplicate { .. } => "duplicate",
            Self::NotAudio => "not-audio",
            Self::ReadError => "read-error",
            Self::WriteError => "write-error",
        }
    }
}

/// 单个候选文件的报告事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEvent {
    pub path: PathBuf,
    pub outcome: Outcome,
    /// 失败时的错误描述
    pub error: Option<String>,
}

impl CandidateEvent {
    pub fn new(path: PathBuf, outcome: Outcome) -> Self {
        Self {
            path,
            outcome,
            error: None,
        }
    }

    pub fn failed(path: PathBuf, outcome: Outcome, error: impl ToString) -> Self {
        Self {
            path,
            outcome,
            error: Some(error.to_string()),
        }
    }
}

/// 进度报告器
pub trait ProgressReporter: Send + Sync {
    /// 每个候选文件恰好调用一次（运行被取消时未开始的候选文件不调用）
    fn on_candidate(&self, event: &CandidateEvent);

    fn on_scan_error(&self, _error: &ScanError) {}

    /// 运行结束（包括被取消）时调用一次
    fn on_complete(&self, _summary: &RunSummary) {}
}

/// 什么都不做的报告器
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn on_candidate(&self, _event: &CandidateEvent) {}
}

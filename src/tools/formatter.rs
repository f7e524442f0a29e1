//! 输出格式化模块
//!
//! 控制台进度报告器、运行汇总表格和提取历史的渲染。

use super::utils::{extract_filename_lossy, human_bytes, human_duration};
use crate::core::DedupIndex;
use crate::error::ScanError;
use crate::processing::{CandidateEvent, Outcome, ProgressReporter, RunSummary};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 控制台进度报告器
///
/// 静默模式下每个新提取的资源打印一个点，verbose模式逐个文件打印结果。
/// 多个工作线程并发回调，输出通过互斥锁串行化，避免行交错。
#[derive(Debug)]
pub struct ConsoleReporter {
    verbose: bool,
    seen: AtomicUsize,
    out: Mutex<()>,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            seen: AtomicUsize::new(0),
            out: Mutex::new(()),
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn on_candidate(&self, event: &CandidateEvent) {
        let count = self.seen.fetch_add(1, Ordering::Relaxed) + 1;
        let _guard = self.out.lock();

        if !self.verbose {
            if matches!(event.outcome, Outcome::Extracted { .. }) {
                print!(".");
                std::io::stdout().flush().ok();
            }
            return;
        }

        let name = extract_filename_lossy(&event.path);
        match &event.outcome {
            Outcome::Extracted { kind, output_path } => {
                println!("✅ [{count}] {name} → {} ({kind})", output_path.display());
            }
            Outcome::Duplicate { kind } => println!("♻️  [{count}] {name} - 重复 / duplicate ({kind})"),
            Outcome::NotAudio => println!("·  [{count}] {name} - 非音频 / not audio"),
            Outcome::ReadError | Outcome::WriteError => println!(
                "❌ [{count}] {name} - {}",
                event.error.as_deref().unwrap_or(event.outcome.label())
            ),
        }
    }

    fn on_scan_error(&self, error: &ScanError) {
        let _guard = self.out.lock();
        if self.verbose {
            println!("⚠️  扫描错误 / scan error: {error}");
        }
    }

    fn on_complete(&self, _summary: &RunSummary) {
        if !self.verbose {
            let _guard = self.out.lock();
            println!();
        }
    }
}

/// 渲染运行汇总表格
pub fn format_summary(summary: &RunSummary) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Result / 结果", "Count / 数量"]);

    let rows = [
        ("Extracted / 新提取", summary.extracted),
        ("Duplicate / 重复", summary.duplicate),
        ("Not audio / 非音频", summary.not_audio),
        ("Read errors / 读取失败", summary.read_error),
        ("Write errors / 写入失败", summary.write_error),
        ("Scan errors / 扫描错误", summary.scan_errors),
        ("Total / 合计", summary.total()),
    ];
    for (label, count) in rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(count).set_alignment(CellAlignment::Right),
        ]);
    }

    let mut output = table.to_string();
    output.push('\n');

    if !summary.extracted_by_kind.is_empty() {
        let mut kinds = Table::new();
        kinds.load_preset(UTF8_FULL);
        kinds.set_content_arrangement(ContentArrangement::Dynamic);
        kinds.set_header(vec!["Format / 格式", "Extracted / 新提取"]);
        for (kind, count) in &summary.extracted_by_kind {
            kinds.add_row(vec![
                Cell::new(kind.display_name()),
                Cell::new(count).set_alignment(CellAlignment::Right),
            ]);
        }
        output.push_str(&kinds.to_string());
        output.push('\n');
    }

    output.push_str(&format!(
        "💾 写入 / Written: {}   ⏱️  耗时 / Elapsed: {}\n",
        human_bytes(summary.bytes_written),
        human_duration(summary.elapsed)
    ));
    if summary.cancelled {
        output.push_str("⏹️  运行已被中断 / run was cancelled\n");
    }
    output
}

/// 渲染失败文件的分类统计（verbose模式使用）
pub fn format_failures(summary: &RunSummary) -> String {
    let mut output = String::new();
    for (category, files) in &summary.failures {
        output.push_str(&format!("   {} ({}):\n", category.display_name(), files.len()));
        for file in files {
            output.push_str(&format!("      - {file}\n"));
        }
    }
    output
}

/// 渲染提取历史
pub fn format_history(index: &DedupIndex) -> String {
    let entries = index.entries();
    let mut output = String::new();

    if let Some(path) = index.path() {
        output.push_str(&format!("🗂️  索引文件 / Index file: {}\n", path.display()));
    }
    output.push_str(&format!("🎵 已提取资源 / Extracted assets: {}\n", entries.len()));

    if let (Some(first), Some(last)) = (entries.first(), entries.last()) {
        output.push_str(&format!(
            "📅 最早 / First: {}   最近 / Latest: {}\n",
            first.extracted_at.format("%Y-%m-%d %H:%M:%S UTC"),
            last.extracted_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    output
}

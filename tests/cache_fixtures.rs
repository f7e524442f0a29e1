//! 缓存测试固件生成器
//!
//! 在临时目录中构造模拟的游戏缓存：无扩展名的哈希文件名，
//! 内容为真实音频容器、gzip包装条目、带自定义头的条目或普通数据。

#![allow(dead_code)]

use cache_audio_extractor::{CandidateEvent, Outcome, ProgressReporter, RunSummary, ScanError};
use flate2::Compression;
use flate2::write::GzEncoder;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 最小的Ogg页：捕获模式 + 版本0 + 页头其余字段 + Vorbis标识
pub fn ogg_bytes(tag: &str) -> Vec<u8> {
    let mut v = b"OggS\x00\x02".to_vec();
    v.extend_from_slice(&[0u8; 22]);
    v.extend_from_slice(b"\x01vorbis");
    v.extend_from_slice(tag.as_bytes());
    v
}

/// 用hound生成真实的16位单声道WAV
pub fn wav_bytes(samples: usize) -> Vec<u8> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).expect("创建WAV写入器失败");
        for i in 0..samples {
            let sample = ((i as f32 * 0.05).sin() * i16::MAX as f32 * 0.5) as i16;
            writer.write_sample(sample).expect("写入样本失败");
        }
        writer.finalize().expect("完成WAV失败");
    }
    cursor.into_inner()
}

pub fn mp3_id3_bytes(tag: &str) -> Vec<u8> {
    let mut v = b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec();
    v.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
    v.extend_from_slice(tag.as_bytes());
    v
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("gzip压缩失败");
    encoder.finish().expect("gzip压缩失败")
}

/// 在音频前加一段自定义缓存头
pub fn with_cache_header(bytes: &[u8]) -> Vec<u8> {
    let mut v = b"RBXH\x01\x00\x00\x00asset-header-metadata:".to_vec();
    v.extend_from_slice(bytes);
    v
}

pub fn text_bytes() -> Vec<u8> {
    b"{\"asset\":\"not audio\",\"kind\":\"json metadata\"}".to_vec()
}

pub fn write_entry(root: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("创建目录失败");
    }
    std::fs::write(&path, bytes).expect("写入固件失败");
    path
}

/// 递归列出目录下所有普通文件
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// 收集所有事件的测试报告器
#[derive(Default)]
pub struct CollectingReporter {
    pub events: Mutex<Vec<CandidateEvent>>,
    pub scan_errors: AtomicUsize,
    pub completed: AtomicUsize,
}

impl CollectingReporter {
    pub fn events(&self) -> Vec<CandidateEvent> {
        self.events.lock().expect("reporter poisoned").clone()
    }

    pub fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.events().iter().filter(|e| pred(&e.outcome)).count()
    }
}

impl ProgressReporter for CollectingReporter {
    fn on_candidate(&self, event: &CandidateEvent) {
        self.events.lock().expect("reporter poisoned").push(event.clone());
    }

    fn on_scan_error(&self, _error: &ScanError) {
        self.scan_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn on_complete(&self, _summary: &RunSummary) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn test_fixtures_are_recognized_containers() {
    assert!(ogg_bytes("x").starts_with(b"OggS\x00"));
    let wav = wav_bytes(16);
    assert_eq!(&wav[..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    assert_eq!(&gzip(b"abc")[..2], &[0x1f, 0x8b]);
}

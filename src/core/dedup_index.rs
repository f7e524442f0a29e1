//! 去重索引
//!
//! 持久化的"指纹 → 已提取"映射，跨进程运行保留，保证同一资源只提取一次。
//!
//! ## 存储格式（JSON Lines 日志）
//!
//! ```text
//! {"format":"cache-audio-extractor/index","version":1}      ← 头部
//! {"fingerprint":"ab12…","extracted_at":"…","output_path":"…"}
//! {"fingerprint":"cd34…","extracted_at":"…","output_path":"…"}
//! ```
//!
//! - `record` 追加一行并 `sync_data` 后才返回：返回后崩溃不会丢条目
//! - 追加过程中崩溃最多留下一行残缺数据，加载时跳过该行，不影响已有条目
//! - 头部无效或文件无法读取时按空索引处理，并重写为合法文件
//! - `close` 时通过临时文件 + rename 压缩日志
//!
//! ## 并发
//!
//! 读（`contains`/`get`）走 `RwLock` 读锁可并发；`record` 在写锁内完成
//! "检查 → 追加日志 → 插入"，同一指纹并发记录时最终只会有一条。

use super::fingerprint::ContentFingerprint;
use crate::error::{IndexResult, index_error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 日志格式名
pub const INDEX_FORMAT: &str = "cache-audio-extractor/index";
/// 日志格式版本
pub const INDEX_VERSION: u32 = 1;

/// 索引条目：某个指纹第一次被成功提取的记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub fingerprint: ContentFingerprint,
    pub extracted_at: DateTime<Utc>,
    pub output_path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexHeader {
    format: String,
    version: u32,
}

impl IndexHeader {
    fn current() -> Self {
        Self {
            format: INDEX_FORMAT.to_string(),
            version: INDEX_VERSION,
        }
    }

    fn is_current(&self) -> bool {
        self.format == INDEX_FORMAT && self.version == INDEX_VERSION
    }
}

/// 日志加载结果
struct Loaded {
    entries: HashMap<ContentFingerprint, IndexEntry>,
    /// 文件缺失、头部无效、存在残缺行时需要重写
    needs_rewrite: bool,
}

#[derive(Debug, Default)]
struct IndexState {
    entries: HashMap<ContentFingerprint, IndexEntry>,
    /// 追加写句柄；内存索引为None
    journal: Option<File>,
    /// 日志中由本进程确认写入的字节数
    journal_len: u64,
}

/// 去重索引
///
/// 显式对象而非全局单例：每次运行/每个测试各自打开、各自关闭。
#[derive(Debug)]
pub struct DedupIndex {
    path: Option<PathBuf>,
    state: RwLock<IndexState>,
}

impl DedupIndex {
    /// 打开（或创建）持久化索引
    ///
    /// 损坏或不可读的内容按空索引处理（记录警告），只有无法创建/写入
    /// 索引文件时才返回错误，调用方可据此降级到 [`in_memory`](Self::in_memory)。
    pub fn open(path: impl AsRef<Path>) -> IndexResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| index_error("创建索引目录失败", e))?;
        }

        let loaded = load_journal(&path);
        let index = Self {
            path: Some(path),
            state: RwLock::new(IndexState {
                entries: loaded.entries,
                journal: None,
                journal_len: 0,
            }),
        };

        {
            let mut state = index.write_state();
            if loaded.needs_rewrite {
                index.rewrite_locked(&mut state)?;
            } else {
                index.reopen_journal_locked(&mut state)?;
            }
        }

        tracing::debug!(
            path = %index.path.as_deref().unwrap_or(Path::new("")).display(),
            entries = index.len(),
            "去重索引已打开 / dedup index opened"
        );
        Ok(index)
    }

    /// 不落盘的内存索引（降级模式或测试用）
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(IndexState::default()),
        }
    }

    /// 索引文件位置，内存索引返回None
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    /// 指纹是否已提取过
    pub fn contains(&self, fingerprint: &ContentFingerprint) -> bool {
        self.read_state().entries.contains_key(fingerprint)
    }

    pub fn get(&self, fingerprint: &ContentFingerprint) -> Option<IndexEntry> {
        self.read_state().entries.get(fingerprint).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 全部条目快照（按提取时间、指纹排序）
    pub fn entries(&self) -> Vec<IndexEntry> {
        let mut entries: Vec<_> = self.read_state().entries.values().cloned().collect();
        entries.sort_by(|a, b| {
            a.extracted_at
                .cmp(&b.extracted_at)
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        });
        entries
    }

    /// 记录一次成功提取
    ///
    /// 幂等：指纹已存在时不做任何修改并返回 `Ok(false)`（已有条目优先）；
    /// 新建条目时先写入并同步日志，再返回 `Ok(true)`。
    pub fn record(
        &self,
        fingerprint: ContentFingerprint,
        output_path: impl Into<PathBuf>,
    ) -> IndexResult<bool> {
        let mut state = self.write_state();
        if state.entries.contains_key(&fingerprint) {
            return Ok(false);
        }

        let entry = IndexEntry {
            fingerprint,
            extracted_at: Utc::now(),
            output_path: output_path.into(),
        };

        if self.path.is_some() {
            let mut line = serde_json::to_vec(&entry).map_err(|e| index_error("序列化索引条目失败", e))?;
            line.push(b'\n');
            self.append_locked(&mut state, &line)?;
        }

        state.entries.insert(fingerprint, entry);
        Ok(true)
    }

    /// 追加一行并同步；失败时截回追加前的长度，不留残行
    fn append_locked(&self, state: &mut IndexState, line: &[u8]) -> IndexResult<()> {
        // 句柄丢失（重写失败）或文件长度与已确认的不符（残行）时先整体重写
        let in_sync = state
            .journal
            .as_ref()
            .and_then(|journal| journal.metadata().ok())
            .is_some_and(|meta| meta.len() == state.journal_len);
        if !in_sync {
            tracing::warn!(
                path = %self.path.as_deref().unwrap_or(Path::new("")).display(),
                "索引日志状态不一致，重写后再追加 / index journal out of sync, rewriting"
            );
            self.rewrite_locked(state)?;
        }

        let prev_len = state.journal_len;
        let Some(journal) = state.journal.as_mut() else {
            return Err(index_error("索引日志不可用", "journal handle missing"));
        };
        match journal.write_all(line).and_then(|_| journal.sync_data()) {
            Ok(()) => {
                state.journal_len = prev_len + line.len() as u64;
                Ok(())
            }
            Err(e) => {
                if let Err(trunc) = journal.set_len(prev_len) {
                    // 长度不符会让下一次追加先重写
                    tracing::warn!(error = %trunc, "截断索引日志失败 / failed to truncate index journal");
                }
                Err(index_error("写入索引日志失败", e))
            }
        }
    }

    /// 清空全部历史（用户显式操作，提取运行不会调用）
    pub fn clear(&self) -> IndexResult<()> {
        let mut state = self.write_state();
        state.entries.clear();
        self.rewrite_locked(&mut state)
    }

    /// 压缩日志并关闭索引
    pub fn close(self) -> IndexResult<()> {
        let mut state = self.write_state();
        self.rewrite_locked(&mut state)?;
        tracing::debug!(entries = state.entries.len(), "去重索引已关闭 / dedup index closed");
        Ok(())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 以临时文件 + 原子rename的方式整体重写日志，然后重新打开追加句柄
    fn rewrite_locked(&self, state: &mut IndexState) -> IndexResult<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        // 先释放旧句柄，部分平台不允许rename覆盖仍被打开的文件。
        // 重写失败时句柄保持为None，下一次record会先重试重写
        state.journal = None;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| index_error("创建临时索引文件失败", e))?;

        let mut entries: Vec<&IndexEntry> = state.entries.values().collect();
        entries.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));

        let mut writer = BufWriter::new(temp);
        let write_all = |writer: &mut BufWriter<tempfile::NamedTempFile>| -> std::io::Result<()> {
            serde_json::to_writer(&mut *writer, &IndexHeader::current())?;
            writer.write_all(b"\n")?;
            for entry in &entries {
                serde_json::to_writer(&mut *writer, entry)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()
        };
        write_all(&mut writer).map_err(|e| index_error("写入索引文件失败", e))?;

        let temp = writer
            .into_inner()
            .map_err(|e| index_error("写入索引文件失败", e.into_error()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| index_error("同步索引文件失败", e))?;
        temp.persist(path)
            .map_err(|e| index_error("替换索引文件失败", e.error))?;

        self.reopen_journal_locked(state)
    }

    fn reopen_journal_locked(&self, state: &mut IndexState) -> IndexResult<()> {
        if let Some(path) = self.path.as_deref() {
            let file = OpenOptions::new()
                .append(true)
                .open(path)
                .map_err(|e| index_error("打开索引日志失败", e))?;
            state.journal_len = file
                .metadata()
                .map_err(|e| index_error("读取索引日志长度失败", e))?
                .len();
            state.journal = Some(file);
        }
        Ok(())
    }
}

impl Drop for DedupIndex {
    fn drop(&mut self) {
        // 每次record都已同步，这里只是尽力而为
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(journal) = state.journal.as_mut() {
            let _ = journal.sync_all();
        }
    }
}

/// 读取并解析日志，任何读取/格式问题都降级为空或部分索引
fn load_journal(path: &Path) -> Loaded {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Loaded {
                entries: HashMap::new(),
                needs_rewrite: true,
            };
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "索引文件不可读，按空索引处理 / index unreadable, starting empty");
            return Loaded {
                entries: HashMap::new(),
                needs_rewrite: true,
            };
        }
    };

    let mut lines = bytes
        .split(|b| *b == b'\n')
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace));

    let header_ok = lines
        .next()
        .and_then(|line| serde_json::from_slice::<IndexHeader>(line).ok())
        .is_some_and(|h| h.is_current());
    if !header_ok {
        tracing::warn!(path = %path.display(), "索引文件头无效，按空索引处理 / index header invalid, starting empty");
        return Loaded {
            entries: HashMap::new(),
            needs_rewrite: true,
        };
    }

    let mut entries = HashMap::new();
    let mut skipped = 0usize;
    for line in lines {
        match serde_json::from_slice::<IndexEntry>(line) {
            Ok(entry) => {
                // 重复行：先出现的条目优先
                entries.entry(entry.fingerprint).or_insert(entry);
            }
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!(path = %path.display(), skipped, "跳过损坏的索引行 / skipped malformed index lines");
    }

    Loaded {
        entries,
        // 缺少结尾换行说明最后一次追加被中断，重写以免后续追加接在残行后面
        needs_rewrite: skipped > 0 || bytes.last() != Some(&b'\n'),
    }
}

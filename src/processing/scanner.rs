//! 缓存扫描模块
//!
//! 惰性遍历缓存根目录，产出候选文件。缓存条目通常没有扩展名，
//! 这里不做任何格式判断，只按大小和位置过滤，内容识别交给嗅探器。
//!
//! - 目录符号链接永不跟随；文件符号链接只有目标位于根目录内才产出
//! - 无法列举的目录或条目产出 `Err(ScanError)`，遍历继续
//! - 每次调用 [`CacheScanner::iter`] 都是一次全新的遍历

use crate::error::ScanError;
use crate::tools::constants::defaults;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

/// 候选文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    /// 文件大小（字节，符号链接取目标大小）
    pub size: u64,
    /// 修改时间，平台不支持时为None
    pub modified: Option<SystemTime>,
}

/// 缓存目录扫描器
#[derive(Debug, Clone)]
pub struct CacheScanner {
    root: PathBuf,
    min_size: u64,
    excludes: Vec<PathBuf>,
    max_depth: Option<usize>,
}

impl CacheScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            min_size: defaults::MIN_CANDIDATE_SIZE,
            excludes: Vec::new(),
            max_depth: None,
        }
    }

    /// 跳过小于该字节数的文件（空文件总是跳过）
    pub fn min_size(mut self, bytes: u64) -> Self {
        self.min_size = bytes;
        self
    }

    /// 排除一个子树或单个文件（例如位于根目录内的输出目录）
    pub fn exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.excludes.push(path.into());
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 开始一次新的遍历
    pub fn iter(&self) -> ScanIter {
        let canonical_root = self.root.canonicalize().ok();
        let excludes = self
            .excludes
            .iter()
            .flat_map(|ex| self.exclude_forms(ex, canonical_root.as_deref()))
            .collect();

        let mut walker = WalkDir::new(&self.root).follow_links(false);
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        ScanIter {
            inner: walker.into_iter(),
            root: self.root.clone(),
            canonical_root,
            excludes,
            min_size: self.min_size.max(1),
        }
    }

    /// 排除路径的两种写法：原样，以及映射到遍历路径空间后的形式
    fn exclude_forms(&self, exclude: &Path, canonical_root: Option<&Path>) -> Vec<PathBuf> {
        let mut forms = vec![exclude.to_path_buf()];
        if let (Some(root), Ok(canonical)) = (canonical_root, exclude.canonicalize())
            && let Ok(relative) = canonical.strip_prefix(root)
        {
            let mapped = self.root.join(relative);
            if mapped != exclude {
                forms.push(mapped);
            }
        }
        forms
    }
}

impl<'a> IntoIterator for &'a CacheScanner {
    type Item = Result<CandidateFile, ScanError>;
    type IntoIter = ScanIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// 惰性扫描迭代器
pub struct ScanIter {
    inner: walkdir::IntoIter,
    root: PathBuf,
    canonical_root: Option<PathBuf>,
    excludes: Vec<PathBuf>,
    min_size: u64,
}

impl ScanIter {
    fn is_excluded(&self, path: &Path) -> bool {
        self.excludes.iter().any(|ex| path.starts_with(ex))
    }

    /// 判断单个条目，`None` 表示跳过
    fn candidate(&mut self, entry: DirEntry) -> Option<Result<CandidateFile, ScanError>> {
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if entry.depth() > 0 && self.is_excluded(entry.path()) {
                tracing::debug!(path = %entry.path().display(), "跳过排除的目录 / skipping excluded directory");
                self.inner.skip_current_dir();
            }
            return None;
        }
        if self.is_excluded(entry.path()) {
            return None;
        }

        let metadata = if file_type.is_symlink() {
            match self.resolve_symlink(entry.path()) {
                Some(metadata) => metadata,
                None => return None,
            }
        } else if file_type.is_file() {
            match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => return Some(Err(self.scan_error(e))),
            }
        } else {
            // 套接字、设备文件等
            return None;
        };

        if metadata.len() < self.min_size {
            return None;
        }

        Some(Ok(CandidateFile {
            path: entry.into_path(),
            size: metadata.len(),
            modified: metadata.modified().ok(),
        }))
    }

    /// 文件符号链接：目标必须是普通文件且位于根目录内
    fn resolve_symlink(&self, path: &Path) -> Option<fs::Metadata> {
        let root = self.canonical_root.as_deref()?;
        let target = path.canonicalize().ok()?;
        if !target.starts_with(root) {
            tracing::debug!(path = %path.display(), "跳过指向根目录外的符号链接 / skipping symlink escaping root");
            return None;
        }
        let metadata = fs::metadata(&target).ok()?;
        metadata.is_file().then_some(metadata)
    }

    fn scan_error(&self, err: walkdir::Error) -> ScanError {
        let path = err
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        ScanError {
            path,
            source: err.into(),
        }
    }
}

impl Iterator for ScanIter {
    type Item = Result<CandidateFile, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let err = self.scan_error(e);
                    tracing::warn!(path = %err.path.display(), error = %err.source, "扫描错误 / scan error");
                    return Some(Err(err));
                }
            };
            if let Some(result) = self.candidate(entry) {
                return Some(result);
            }
        }
    }
}

//! 统一错误处理框架
//!
//! 提取引擎的错误分层：
//! - 扫描错误（目录不可列举）只影响对应子树
//! - 读取/写入错误只影响单个候选文件
//! - 索引错误在启动时降级为内存索引
//! - 只有"根目录不存在"和"目标目录不可写"会在工作线程启动前终止运行

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// 提取引擎的统一错误类型
#[derive(Debug)]
pub enum ExtractError {
    /// 输入验证错误（根目录不存在、参数非法等）
    InvalidInput(String),

    /// 目录扫描错误：无法列举某个目录或条目
    Scan { path: PathBuf, source: io::Error },

    /// 候选文件读取错误（文件被删除、权限不足、gzip损坏等）
    Read { path: PathBuf, source: io::Error },

    /// 输出写入错误（目标目录不可写、磁盘已满等）
    Write { path: PathBuf, source: io::Error },

    /// 去重索引持久化错误
    Index(String),

    /// 资源错误（线程池创建失败等）
    Resource(String),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::InvalidInput(msg) => write!(f, "输入验证失败 / invalid input: {msg}"),
            ExtractError::Scan { path, source } => {
                write!(f, "目录扫描失败 / scan error: {}: {source}", path.display())
            }
            ExtractError::Read { path, source } => {
                write!(f, "文件读取失败 / read error: {}: {source}", path.display())
            }
            ExtractError::Write { path, source } => {
                write!(f, "文件写入失败 / write error: {}: {source}", path.display())
            }
            ExtractError::Index(msg) => write!(f, "去重索引错误 / index error: {msg}"),
            ExtractError::Resource(msg) => write!(f, "资源访问错误 / resource error: {msg}"),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::Scan { source, .. }
            | ExtractError::Read { source, .. }
            | ExtractError::Write { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for ExtractError {
    fn from(err: io::Error) -> Self {
        ExtractError::Resource(err.to_string())
    }
}

/// 提取操作的标准Result类型
pub type ExtractResult<T> = Result<T, ExtractError>;

/// 扫描阶段的错误（与 [`ExtractError::Scan`] 同构，单独暴露给扫描器迭代器）
#[derive(Debug)]
pub struct ScanError {
    pub path: PathBuf,
    pub source: io::Error,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.source)
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl From<ScanError> for ExtractError {
    fn from(err: ScanError) -> Self {
        ExtractError::Scan {
            path: err.path,
            source: err.source,
        }
    }
}

/// 去重索引操作的Result类型
pub type IndexResult<T> = Result<T, ExtractError>;

// ==================== 错误转换Helper函数 ====================
// 消除重复的 .map_err(|e| ExtractError::XXX { path, source }) 模式

/// 创建读取错误的helper函数
#[inline]
pub fn read_error(path: &Path, source: io::Error) -> ExtractError {
    ExtractError::Read {
        path: path.to_path_buf(),
        source,
    }
}

/// 创建写入错误的helper函数
#[inline]
pub fn write_error(path: &Path, source: io::Error) -> ExtractError {
    ExtractError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// 创建索引错误的helper函数
#[inline]
pub fn index_error<E: fmt::Display>(context: &str, err: E) -> ExtractError {
    ExtractError::Index(format!("{context}: {err}"))
}

// ==================== 错误分类系统 ====================
// 用于运行汇总中的失败统计和退出码映射

/// 错误类别枚举（用于运行汇总统计）
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub enum ErrorCategory {
    /// 目录扫描错误
    Scan,
    /// 候选文件读取错误
    Read,
    /// 输出写入错误
    Write,
    /// 去重索引错误
    Index,
    /// 其他未分类错误
    Other,
}

impl ErrorCategory {
    /// 从ExtractError提取错误类别
    pub fn from_extract_error(e: &ExtractError) -> Self {
        match e {
            ExtractError::Scan { .. } => Self::Scan,
            ExtractError::Read { .. } => Self::Read,
            ExtractError::Write { .. } => Self::Write,
            ExtractError::Index(_) => Self::Index,
            ExtractError::InvalidInput(_) | ExtractError::Resource(_) => Self::Other,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Scan => "扫描错误 / scan",
            Self::Read => "读取错误 / read",
            Self::Write => "写入错误 / write",
            Self::Index => "索引错误 / index",
            Self::Other => "其他错误 / other",
        }
    }
}

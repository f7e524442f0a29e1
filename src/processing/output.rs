//! 输出写入模块
//!
//! 输出文件以内容指纹命名（`<指纹>.<扩展名>`），按布局放入子目录。
//! 写入采用"同目录临时文件 + rename"，并发写同一文件名时内容必然相同，
//! 任何时刻目标路径上都不会出现半写的文件。

use crate::audio::AudioKind;
use crate::core::ContentFingerprint;
use crate::error::{ExtractResult, write_error};
use crate::tools::constants::size_buckets;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 输出目录布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputLayout {
    /// 全部放在目标目录下
    Flat,
    /// 按音频类型分目录（`audio_ogg/` 等）
    #[default]
    ByKind,
    /// 按载荷大小分目录
    BySize,
}

impl OutputLayout {
    /// 计算输出文件路径
    pub fn asset_path(
        &self,
        dest: &Path,
        fingerprint: &ContentFingerprint,
        kind: AudioKind,
        payload_len: u64,
    ) -> PathBuf {
        let file_name = format!("{}.{}", fingerprint.to_hex(), kind.extension());
        match self {
            Self::Flat => dest.join(file_name),
            Self::ByKind => dest.join(kind.folder_name()).join(file_name),
            Self::BySize => dest.join(size_bucket(payload_len)).join(file_name),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::ByKind => "kind",
            Self::BySize => "size",
        }
    }
}

impl fmt::Display for OutputLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "kind" | "type" => Ok(Self::ByKind),
            "size" => Ok(Self::BySize),
            other => Err(format!("未知的输出布局 / unknown layout: {other} (flat|kind|size)")),
        }
    }
}

/// 载荷大小对应的目录名
pub fn size_bucket(len: u64) -> &'static str {
    size_buckets::BUCKETS
        .iter()
        .find(|(limit, _)| len < *limit)
        .map_or(size_buckets::LARGEST, |(_, name)| name)
}

/// 原子写入：同目录临时文件写完并同步后rename到目标路径
pub fn write_atomic(path: &Path, bytes: &[u8]) -> ExtractResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| write_error(dir, e))?;

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| write_error(dir, e))?;
    temp.write_all(bytes).map_err(|e| write_error(path, e))?;
    temp.as_file().sync_data().map_err(|e| write_error(path, e))?;
    temp.persist(path).map_err(|e| write_error(path, e.error))?;
    Ok(())
}

/// 检查目标目录可创建且可写（运行前的致命检查）
pub fn probe_writable(dest: &Path, probe_name: &str) -> ExtractResult<()> {
    fs::create_dir_all(dest).map_err(|e| write_error(dest, e))?;
    let probe = dest.join(probe_name);
    fs::write(&probe, b"probe").map_err(|e| write_error(dest, e))?;
    fs::remove_file(&probe).map_err(|e| write_error(dest, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "ultra_small_0-50KB")]
    #[case(50 * 1024 - 1, "ultra_small_0-50KB")]
    #[case(50 * 1024, "small_50-200KB")]
    #[case(300 * 1024, "medium_200KB-1MB")]
    #[case(2 * 1024 * 1024, "large_1MB-5MB")]
    #[case(5 * 1024 * 1024, "ultra_large_5MB+")]
    fn test_size_bucket(#[case] len: u64, #[case] expected: &str) {
        assert_eq!(size_bucket(len), expected);
    }

    #[test]
    fn test_layout_paths() {
        let fp = ContentFingerprint::of(b"asset");
        let dest = Path::new("/out");
        let name = format!("{}.ogg", fp.to_hex());

        assert_eq!(
            OutputLayout::Flat.asset_path(dest, &fp, AudioKind::Ogg, 10),
            dest.join(&name)
        );
        assert_eq!(
            OutputLayout::ByKind.asset_path(dest, &fp, AudioKind::Ogg, 10),
            dest.join("audio_ogg").join(&name)
        );
        assert_eq!(
            OutputLayout::BySize.asset_path(dest, &fp, AudioKind::Ogg, 10),
            dest.join("ultra_small_0-50KB").join(&name)
        );
    }

    #[test]
    fn test_layout_parse() {
        assert_eq!("FLAT".parse::<OutputLayout>().unwrap(), OutputLayout::Flat);
        assert_eq!("kind".parse::<OutputLayout>().unwrap(), OutputLayout::ByKind);
        assert_eq!("size".parse::<OutputLayout>().unwrap(), OutputLayout::BySize);
        assert!("tree".parse::<OutputLayout>().is_err());
        assert_eq!(OutputLayout::default(), OutputLayout::ByKind);
    }

    #[test]
    fn test_write_atomic_creates_dirs_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio_ogg").join("x.ogg");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"first").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");

        // 目录里只剩目标文件，没有遗留临时文件
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_probe_writable() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("new_dest");
        probe_writable(&dest, ".probe").unwrap();
        assert!(dest.is_dir());
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 0);

        // 目标路径是一个普通文件时无法创建目录
        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();
        assert!(probe_writable(&file, ".probe").is_err());
    }
}

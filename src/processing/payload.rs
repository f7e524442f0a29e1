//! 候选文件载荷读取
//!
//! 先窥视文件头部做出判断，确认是音频后才读取剩余内容，
//! 非音频文件永远不会被完整读入内存。
//!
//! gzip压缩的缓存条目会被透明解压：头部以 `1f 8b` 开头时重新
//! 以 `GzDecoder` 打开；解压失败则退回原始字节。

use crate::tools::constants::defaults::MAX_PAYLOAD_SIZE;
use crate::tools::constants::sniffing::GZIP_MAGIC;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// 可窥视的读取器：先读入有限的头部，之后可以取回全部字节
pub struct PeekableReader<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: Read> PeekableReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
        }
    }

    /// 返回前 `limit` 字节（数据不足时返回全部）
    pub fn peek(&mut self, limit: usize) -> io::Result<&[u8]> {
        if self.buffer.len() < limit {
            let needed = (limit - self.buffer.len()) as u64;
            (&mut self.reader).take(needed).read_to_end(&mut self.buffer)?;
        }
        Ok(&self.buffer[..self.buffer.len().min(limit)])
    }

    /// 已经读入的字节
    pub fn head(&self) -> &[u8] {
        &self.buffer
    }

    /// 读完剩余内容，返回完整字节；总长度超过 `limit` 时返回 `InvalidData`
    pub fn into_bytes_limited(mut self, limit: u64) -> io::Result<Vec<u8>> {
        let buffered = self.buffer.len() as u64;
        if buffered > limit {
            return Err(payload_too_large(limit));
        }
        // 多读一个字节用于判断是否超限
        (&mut self.reader)
            .take((limit - buffered).saturating_add(1))
            .read_to_end(&mut self.buffer)?;
        if self.buffer.len() as u64 > limit {
            return Err(payload_too_large(limit));
        }
        Ok(self.buffer)
    }
}

fn payload_too_large(limit: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("载荷超过上限 / payload exceeds {limit} bytes"),
    )
}

/// 载荷编码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    Plain,
    Gzip,
}

type BoxedRead = Box<dyn Read + Send>;

/// 已打开的候选文件
pub struct CandidatePayload {
    reader: PeekableReader<BoxedRead>,
    encoding: PayloadEncoding,
}

impl CandidatePayload {
    /// 打开候选文件并预读 `peek_len` 字节
    pub fn open(path: &Path, peek_len: usize, unwrap_gzip: bool) -> io::Result<Self> {
        let mut raw = PeekableReader::new(Box::new(BufReader::new(File::open(path)?)) as BoxedRead);
        let head = raw.peek(peek_len)?;

        if unwrap_gzip && head.starts_with(&GZIP_MAGIC) {
            let decoder = GzDecoder::new(BufReader::new(File::open(path)?));
            let mut gz = PeekableReader::new(Box::new(decoder) as BoxedRead);
            match gz.peek(peek_len) {
                Ok(_) => {
                    return Ok(Self {
                        reader: gz,
                        encoding: PayloadEncoding::Gzip,
                    });
                }
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "gzip解压失败，使用原始字节 / gzip unwrap failed, using raw bytes");
                }
            }
        }

        Ok(Self {
            reader: raw,
            encoding: PayloadEncoding::Plain,
        })
    }

    /// 预读的头部（已解压）
    pub fn head(&self) -> &[u8] {
        self.reader.head()
    }

    pub fn encoding(&self) -> PayloadEncoding {
        self.encoding
    }

    /// 读取完整内容（解压后不超过 [`MAX_PAYLOAD_SIZE`]）
    pub fn into_bytes(self) -> io::Result<Vec<u8>> {
        self.into_bytes_limited(MAX_PAYLOAD_SIZE)
    }

    pub fn into_bytes_limited(self, limit: u64) -> io::Result<Vec<u8>> {
        self.reader.into_bytes_limited(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_peek_then_read_everything() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut reader = PeekableReader::new(data.as_slice());

        assert_eq!(reader.peek(4).unwrap(), &[0, 1, 2, 3]);
        assert_eq!(reader.peek(2).unwrap(), &[0, 1]);
        assert_eq!(reader.head().len(), 4);
        assert_eq!(reader.into_bytes_limited(256).unwrap(), data);
    }

    #[test]
    fn test_peek_past_end_returns_short_buffer() {
        let mut reader = PeekableReader::new(&b"abc"[..]);
        assert_eq!(reader.peek(100).unwrap(), b"abc");
    }

    #[test]
    fn test_gzip_entry_is_unwrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"OggS\x00 inner audio bytes").unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let payload = CandidatePayload::open(&path, 8, true).unwrap();
        assert_eq!(payload.encoding(), PayloadEncoding::Gzip);
        assert_eq!(payload.head(), b"OggS\x00 in");
        assert_eq!(payload.into_bytes().unwrap(), b"OggS\x00 inner audio bytes");

        let raw = CandidatePayload::open(&path, 8, false).unwrap();
        assert_eq!(raw.encoding(), PayloadEncoding::Plain);
        assert!(raw.head().starts_with(&GZIP_MAGIC));
    }

    #[test]
    fn test_corrupt_gzip_falls_back_to_raw() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry");
        std::fs::write(&path, b"\x1f\x8bnot really gzip at all").unwrap();

        let payload = CandidatePayload::open(&path, 64, true).unwrap();
        assert_eq!(payload.encoding(), PayloadEncoding::Plain);
        assert_eq!(payload.into_bytes().unwrap(), b"\x1f\x8bnot really gzip at all");
    }

    #[test]
    fn test_decompression_bomb_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry");
        let mut inner = b"OggS\x00".to_vec();
        inner.resize(1024 * 1024, 0);
        let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&inner).unwrap();
        let compressed = encoder.finish().unwrap();
        assert!(compressed.len() < 64 * 1024);
        std::fs::write(&path, compressed).unwrap();

        let payload = CandidatePayload::open(&path, 8, true).unwrap();
        let err = payload.into_bytes_limited(64 * 1024).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        // 恰好等于上限时可以读取
        let payload = CandidatePayload::open(&path, 8, true).unwrap();
        assert_eq!(payload.into_bytes_limited(inner.len() as u64).unwrap(), inner);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CandidatePayload::open(&dir.path().join("gone"), 16, true).is_err());
    }
}

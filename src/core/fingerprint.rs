//! 内容指纹
//!
//! 对提取出的音频载荷计算BLAKE3摘要，作为去重索引的键和输出文件名。
//! 同样的载荷无论来自哪个缓存文件名，指纹都相同。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 指纹字节长度
pub const FINGERPRINT_LEN: usize = blake3::OUT_LEN;

/// 32字节内容指纹，文本形式为64位小写十六进制
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentFingerprint([u8; FINGERPRINT_LEN]);

impl ContentFingerprint {
    /// 计算载荷的指纹
    pub fn of(payload: &[u8]) -> Self {
        Self(*blake3::hash(payload).as_bytes())
    }

    pub fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// 十六进制文本（用作输出文件名）
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    /// 缩写形式，用于日志
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentFingerprint({})", self.short())
    }
}

/// 十六进制解析错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFingerprintError(String);

impl fmt::Display for ParseFingerprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "无效的内容指纹 / invalid fingerprint: {}", self.0)
    }
}

impl std::error::Error for ParseFingerprintError {}

impl FromStr for ContentFingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        blake3::Hash::from_hex(s)
            .map(|h| Self(*h.as_bytes()))
            .map_err(|e| ParseFingerprintError(format!("{s:?}: {e}")))
    }
}

impl Serialize for ContentFingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentFingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_payloads_share_fingerprint() {
        let a = ContentFingerprint::of(b"OggS\x00payload");
        let b = ContentFingerprint::of(b"OggS\x00payload");
        let c = ContentFingerprint::of(b"OggS\x00payloaD");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hex_round_trip() {
        let fp = ContentFingerprint::of(b"abc");
        let hex = fp.to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hex.parse::<ContentFingerprint>().unwrap(), fp);
        assert_eq!(fp.short().len(), 12);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("zz".parse::<ContentFingerprint>().is_err());
        assert!("abcd".parse::<ContentFingerprint>().is_err());
        assert!(serde_json::from_str::<ContentFingerprint>("\"not-hex\"").is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let fp = ContentFingerprint::of(b"");
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, format!("\"{}\"", fp.to_hex()));
        assert_eq!(serde_json::from_str::<ContentFingerprint>(&json).unwrap(), fp);
    }
}

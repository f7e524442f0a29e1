//! 签名表模块
//!
//! 把"签名字节 → 音频类型"的对应关系做成独立的配置表，
//! 嗅探器本身与具体格式无关，新增格式只需要往表里追加条目。
//!
//! ## 匹配规则
//!
//! ```text
//! Signature = [Pattern, Pattern, ...]   （全部匹配才算命中）
//! Pattern   = offset + bytes (+ 可选 mask)
//!             buf[offset + i] & mask[i] == bytes[i]
//! ```

use super::format::AudioKind;

/// 单个字节模式
#[derive(Debug, Clone, Copy)]
pub struct Pattern {
    /// 相对签名起点的偏移
    pub offset: usize,
    /// 期望字节（已按mask屏蔽）
    pub bytes: &'static [u8],
    /// 可选掩码，长度必须与 `bytes` 相同
    pub mask: Option<&'static [u8]>,
}

impl Pattern {
    /// 精确匹配的模式
    pub const fn exact(offset: usize, bytes: &'static [u8]) -> Self {
        Self {
            offset,
            bytes,
            mask: None,
        }
    }

    /// 带掩码的模式（用于帧同步这类位字段）
    pub const fn masked(offset: usize, bytes: &'static [u8], mask: &'static [u8]) -> Self {
        Self {
            offset,
            bytes,
            mask: Some(mask),
        }
    }

    /// 该模式需要的最小缓冲区长度
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.bytes.len()
    }

    /// 在 `buf[base..]` 上检查该模式，长度不足时返回false
    pub fn matches_at(&self, buf: &[u8], base: usize) -> bool {
        let start = base + self.offset;
        let Some(window) = buf.get(start..start + self.bytes.len()) else {
            return false;
        };
        match self.mask {
            None => window == self.bytes,
            Some(mask) => window
                .iter()
                .zip(mask)
                .zip(self.bytes)
                .all(|((b, m), expected)| b & m == *expected),
        }
    }
}

/// 一个音频类型的签名
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub kind: AudioKind,
    pub parts: &'static [Pattern],
    /// 是否允许在缓冲区内部（非0偏移）搜索该签名
    ///
    /// 只有首个模式足够长且唯一的格式才开启，否则帧同步这类短模式
    /// 会在任意二进制数据里产生大量误报。
    pub embeddable: bool,
}

impl Signature {
    /// 签名需要的最小长度
    pub fn len(&self) -> usize {
        self.parts.iter().map(Pattern::end).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// 用于嵌入式搜索的首个模式字节
    pub fn anchor(&self) -> Option<&'static [u8]> {
        self.parts
            .first()
            .filter(|p| p.offset == 0 && p.mask.is_none())
            .map(|p| p.bytes)
    }

    /// 签名是否在 `buf[base..]` 处完整命中
    pub fn matches_at(&self, buf: &[u8], base: usize) -> bool {
        !self.parts.is_empty() && self.parts.iter().all(|p| p.matches_at(buf, base))
    }
}

/// 默认签名表
///
/// 顺序即优先级：长且明确的容器签名在前，短的帧同步签名在后。
pub const DEFAULT_SIGNATURES: &[Signature] = &[
    Signature {
        kind: AudioKind::Ogg,
        // "OggS" + stream_structure_version == 0
        parts: &[Pattern::exact(0, b"OggS"), Pattern::exact(4, &[0x00])],
        embeddable: true,
    },
    Signature {
        kind: AudioKind::Flac,
        parts: &[Pattern::exact(0, b"fLaC")],
        embeddable: true,
    },
    Signature {
        kind: AudioKind::Wav,
        parts: &[Pattern::exact(0, b"RIFF"), Pattern::exact(8, b"WAVE")],
        embeddable: true,
    },
    Signature {
        kind: AudioKind::Aiff,
        parts: &[Pattern::exact(0, b"FORM"), Pattern::exact(8, b"AIFF")],
        embeddable: true,
    },
    Signature {
        kind: AudioKind::Aiff,
        parts: &[Pattern::exact(0, b"FORM"), Pattern::exact(8, b"AIFC")],
        embeddable: true,
    },
    Signature {
        kind: AudioKind::M4a,
        parts: &[Pattern::exact(4, b"ftyp"), Pattern::exact(8, b"M4A ")],
        embeddable: false,
    },
    Signature {
        kind: AudioKind::M4a,
        parts: &[Pattern::exact(4, b"ftyp"), Pattern::exact(8, b"M4B ")],
        embeddable: false,
    },
    Signature {
        kind: AudioKind::Mp3,
        parts: &[Pattern::exact(0, b"ID3")],
        embeddable: false,
    },
    Signature {
        kind: AudioKind::Mp3,
        // 11位帧同步 + layer == 01 (Layer III)
        parts: &[Pattern::masked(0, &[0xFF, 0xE2], &[0xFF, 0xE6])],
        embeddable: false,
    },
    Signature {
        kind: AudioKind::Aac,
        // ADTS: 12位同步字 + layer == 00
        parts: &[Pattern::masked(0, &[0xFF, 0xF0], &[0xFF, 0xF6])],
        embeddable: false,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_masks_match_byte_lengths() {
        for sig in DEFAULT_SIGNATURES {
            for part in sig.parts {
                if let Some(mask) = part.mask {
                    assert_eq!(mask.len(), part.bytes.len(), "{:?}", sig.kind);
                    // 期望字节必须已按掩码屏蔽，否则永远无法命中
                    for (b, m) in part.bytes.iter().zip(mask) {
                        assert_eq!(b & m, *b, "{:?}", sig.kind);
                    }
                }
            }
        }
    }

    #[test]
    fn test_every_kind_has_a_signature() {
        for kind in AudioKind::ALL {
            assert!(DEFAULT_SIGNATURES.iter().any(|s| s.kind == kind), "{kind:?}");
        }
    }

    #[test]
    fn test_embeddable_signatures_have_anchor() {
        for sig in DEFAULT_SIGNATURES.iter().filter(|s| s.embeddable) {
            let anchor = sig.anchor().expect("embeddable signature needs an exact anchor");
            assert!(anchor.len() >= 4);
        }
    }

    #[rstest]
    #[case(&[0xFF, 0xFB], true)] // MPEG-1 Layer III
    #[case(&[0xFF, 0xF3], true)] // MPEG-2 Layer III
    #[case(&[0xFF, 0xE3], true)] // MPEG-2.5 Layer III
    #[case(&[0xFF, 0xFD], false)] // Layer II
    #[case(&[0xFF, 0xF1], false)] // ADTS (layer 00)
    #[case(&[0xFE, 0xFB], false)]
    fn test_mp3_frame_sync_mask(#[case] head: &[u8], #[case] expected: bool) {
        let sig = DEFAULT_SIGNATURES
            .iter()
            .find(|s| s.kind == AudioKind::Mp3 && s.parts[0].mask.is_some())
            .unwrap();
        assert_eq!(sig.matches_at(head, 0), expected);
    }

    #[test]
    fn test_pattern_out_of_bounds_is_no_match() {
        let p = Pattern::exact(8, b"WAVE");
        assert!(!p.matches_at(b"RIFF\0\0\0\0WAV", 0));
        assert!(!p.matches_at(b"", 0));
        assert!(!p.matches_at(b"RIFF\0\0\0\0WAVE", 1));
    }
}

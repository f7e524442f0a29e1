//! 内容嗅探器
//!
//! 只看缓冲区里的结构签名字节来判断是不是音频，完全不依赖扩展名。
//! 纯函数：不做I/O，不panic，缓冲区不够长时相应签名只是"不匹配"。
//!
//! ## 两阶段识别
//!
//! 1. **头部锚定**：按签名表顺序在偏移0处逐一尝试，首个命中即返回
//! 2. **嵌入式搜索**（可选）：部分缓存条目在音频前带有自定义头，
//!    在前 `search_window` 字节内查找可嵌入签名的锚点，取最小的有效偏移

use super::format::Detection;
use super::signature::{DEFAULT_SIGNATURES, Signature};
use crate::tools::constants::sniffing;
use memchr::memmem;

/// 基于签名表的音频嗅探器
#[derive(Debug, Clone)]
pub struct Sniffer {
    table: Vec<Signature>,
    search_window: usize,
}

impl Default for Sniffer {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNATURES.to_vec())
    }
}

impl Sniffer {
    /// 使用自定义签名表创建嗅探器（嵌入式搜索默认开启）
    pub fn new(table: Vec<Signature>) -> Self {
        Self {
            table,
            search_window: sniffing::DEFAULT_SEARCH_WINDOW,
        }
    }

    /// 设置嵌入式搜索窗口，0表示只做头部锚定匹配
    pub fn with_search_window(mut self, window: usize) -> Self {
        self.search_window = window;
        self
    }

    /// 当前签名表
    pub fn table(&self) -> &[Signature] {
        &self.table
    }

    pub fn search_window(&self) -> usize {
        self.search_window
    }

    /// 做出判断所需的最大字节数
    ///
    /// 调用方最多读取这么多字节就可以调用 [`classify`](Self::classify)，
    /// 非音频文件因此永远不需要被完整读入。
    pub fn required_len(&self) -> usize {
        let longest = self.table.iter().map(Signature::len).max().unwrap_or(0);
        if self.search_window == 0 {
            longest
        } else {
            // 窗口末尾附近的锚点仍需要完整签名长度来验证
            self.search_window + longest
        }
    }

    /// 对缓冲区分类，`None` 表示不是可识别的音频
    pub fn classify(&self, buf: &[u8]) -> Option<Detection> {
        if let Some(sig) = self.table.iter().find(|sig| sig.matches_at(buf, 0)) {
            return Some(Detection::new(sig.kind, 0));
        }

        if self.search_window == 0 {
            return None;
        }
        self.find_embedded(buf)
    }

    /// 在搜索窗口内查找嵌入的音频容器
    fn find_embedded(&self, buf: &[u8]) -> Option<Detection> {
        let window = buf.len().min(self.search_window);
        let mut best: Option<Detection> = None;

        for sig in self.table.iter().filter(|s| s.embeddable) {
            let Some(anchor) = sig.anchor().filter(|a| !a.is_empty()) else {
                continue;
            };
            // 锚点起点必须落在窗口内；已有命中时只需要找更靠前的
            let limit = best.map_or(window, |d| d.offset);
            let end = (limit + anchor.len() - 1).min(buf.len());
            for hit in memmem::find_iter(&buf[..end], anchor) {
                if hit > 0 && hit < limit && sig.matches_at(buf, hit) {
                    best = Some(Detection::new(sig.kind, hit));
                    break;
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::format::AudioKind;
    use rstest::rstest;

    fn ogg_head() -> Vec<u8> {
        let mut v = b"OggS\x00\x02".to_vec();
        v.extend_from_slice(&[0u8; 22]);
        v.extend_from_slice(b"\x01vorbis");
        v
    }

    #[rstest]
    #[case(ogg_head(), AudioKind::Ogg)]
    #[case(b"fLaC\x00\x00\x00\x22".to_vec(), AudioKind::Flac)]
    #[case(b"RIFF\x24\x08\x00\x00WAVEfmt ".to_vec(), AudioKind::Wav)]
    #[case(b"FORM\x00\x00\x10\x00AIFFCOMM".to_vec(), AudioKind::Aiff)]
    #[case(b"FORM\x00\x00\x10\x00AIFCFVER".to_vec(), AudioKind::Aiff)]
    #[case(b"\x00\x00\x00\x20ftypM4A \x00\x00\x00\x00".to_vec(), AudioKind::M4a)]
    #[case(b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec(), AudioKind::Mp3)]
    #[case(vec![0xFF, 0xFB, 0x90, 0x64], AudioKind::Mp3)]
    #[case(vec![0xFF, 0xF1, 0x50, 0x80], AudioKind::Aac)]
    fn test_classify_header(#[case] buf: Vec<u8>, #[case] expected: AudioKind) {
        let sniffer = Sniffer::default();
        assert_eq!(sniffer.classify(&buf), Some(Detection::new(expected, 0)));
    }

    #[rstest]
    #[case(b"".to_vec())]
    #[case(b"hello world, this is plain text".to_vec())]
    #[case(b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR".to_vec())]
    #[case(b"RIFF\x00\x00\x00\x00WEBPVP8 ".to_vec())]
    #[case(b"\x00\x00\x00\x20ftypisom".to_vec())]
    #[case(b"OggS\x01".to_vec())]
    fn test_classify_not_audio(#[case] buf: Vec<u8>) {
        assert_eq!(Sniffer::default().classify(&buf), None);
    }

    #[test]
    fn test_truncated_signatures_never_match() {
        let sniffer = Sniffer::default().with_search_window(0);
        let ogg = ogg_head();
        let full: &[&[u8]] = &[
            ogg.as_slice(),
            b"fLaC",
            b"RIFF\x00\x00\x00\x00WAVE",
            b"FORM\x00\x00\x00\x00AIFF",
            b"\x00\x00\x00\x00ftypM4A ",
            b"ID3",
        ];
        for buf in full {
            let sig_len = sniffer
                .table()
                .iter()
                .filter(|s| s.matches_at(buf, 0))
                .map(Signature::len)
                .max()
                .unwrap();
            for cut in 0..sig_len {
                assert_eq!(sniffer.classify(&buf[..cut]), None, "cut={cut}");
            }
        }
    }

    #[test]
    fn test_embedded_payload_found_after_header() {
        let mut buf = b"RBXH\x10\x00\x00\x00some-cache-header-data".to_vec();
        let offset = buf.len();
        buf.extend_from_slice(&ogg_head());

        let sniffer = Sniffer::default();
        assert_eq!(sniffer.classify(&buf), Some(Detection::new(AudioKind::Ogg, offset)));
        assert_eq!(sniffer.clone().with_search_window(0).classify(&buf), None);
    }

    #[test]
    fn test_embedded_prefers_smallest_offset() {
        let mut buf = b"junkjunk".to_vec();
        buf.extend_from_slice(b"fLaC\x00\x00\x00\x22");
        buf.extend_from_slice(&ogg_head());

        let detection = Sniffer::default().classify(&buf).unwrap();
        assert_eq!(detection, Detection::new(AudioKind::Flac, 8));
    }

    #[test]
    fn test_embedded_search_respects_window() {
        let mut buf = vec![0u8; 64];
        buf.extend_from_slice(&ogg_head());

        assert_eq!(Sniffer::default().with_search_window(32).classify(&buf), None);
        assert!(Sniffer::default().with_search_window(128).classify(&buf).is_some());
    }

    #[test]
    fn test_embedded_anchor_without_valid_signature() {
        // "RIFF" 出现但不是WAVE，不能当成音频
        let buf = b"xxxxRIFF\x00\x00\x00\x00WEBPVP8 ".to_vec();
        assert_eq!(Sniffer::default().classify(&buf), None);
    }

    #[test]
    fn test_required_len() {
        let anchored = Sniffer::default().with_search_window(0);
        assert_eq!(anchored.required_len(), 12);
        assert_eq!(Sniffer::default().with_search_window(100).required_len(), 112);
    }

    #[test]
    fn test_custom_table() {
        use crate::audio::signature::Pattern;
        const CUSTOM: &[Pattern] = &[Pattern::exact(0, b"MYWV")];
        let table = vec![Signature {
            kind: AudioKind::Wav,
            parts: CUSTOM,
            embeddable: false,
        }];
        let sniffer = Sniffer::new(table);
        assert_eq!(
            sniffer.classify(b"MYWV...."),
            Some(Detection::new(AudioKind::Wav, 0))
        );
        assert_eq!(sniffer.classify(b"RIFF\x00\x00\x00\x00WAVE"), None);
    }

    #[test]
    fn test_random_bytes_never_panic() {
        // 简单的线性同余序列，覆盖各种字节组合
        let mut state: u32 = 0x1234_5678;
        let sniffer = Sniffer::default();
        for len in 0..256 {
            let buf: Vec<u8> = (0..len)
                .map(|_| {
                    state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                    (state >> 24) as u8
                })
                .collect();
            let _ = sniffer.classify(&buf);
        }
    }
}

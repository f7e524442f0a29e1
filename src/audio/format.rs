//! 音频格式信息模块
//!
//! 定义可识别的音频容器类型，以及输出时使用的扩展名和分类目录名。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 可识别的音频容器类型
///
/// 缓存文件名是不透明的哈希值，没有扩展名，因此类型完全由签名字节决定，
/// 输出文件的扩展名再从这里反推。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioKind {
    /// Ogg 容器（Vorbis / Opus）
    Ogg,
    /// MPEG Layer III（ID3 标签或裸帧同步）
    Mp3,
    /// FLAC 原生流
    Flac,
    /// RIFF/WAVE
    Wav,
    /// AIFF / AIFF-C
    Aiff,
    /// ISO-BMFF 音频（M4A / M4B）
    M4a,
    /// AAC ADTS 裸流
    Aac,
}

impl AudioKind {
    /// 全部类型（按默认签名表顺序）
    pub const ALL: [AudioKind; 7] = [
        AudioKind::Ogg,
        AudioKind::Flac,
        AudioKind::Wav,
        AudioKind::Aiff,
        AudioKind::M4a,
        AudioKind::Mp3,
        AudioKind::Aac,
    ];

    /// 输出文件扩展名（不含点）
    pub fn extension(&self) -> &'static str {
        match self {
            AudioKind::Ogg => "ogg",
            AudioKind::Mp3 => "mp3",
            AudioKind::Flac => "flac",
            AudioKind::Wav => "wav",
            AudioKind::Aiff => "aiff",
            AudioKind::M4a => "m4a",
            AudioKind::Aac => "aac",
        }
    }

    /// 显示名称（大写，与CLI输出一致）
    pub fn display_name(&self) -> &'static str {
        match self {
            AudioKind::Ogg => "OGG",
            AudioKind::Mp3 => "MP3",
            AudioKind::Flac => "FLAC",
            AudioKind::Wav => "WAV",
            AudioKind::Aiff => "AIFF",
            AudioKind::M4a => "M4A",
            AudioKind::Aac => "AAC",
        }
    }

    /// 按类型分类时使用的子目录名
    pub fn folder_name(&self) -> String {
        format!("audio_{}", self.extension())
    }
}

impl fmt::Display for AudioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// 一次成功识别的结果
///
/// `offset` 是音频容器在（已解压）缓冲区中的起始位置：
/// 头部锚定的匹配为0，嵌入式载荷搜索得到的匹配为正数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub kind: AudioKind,
    pub offset: usize,
}

impl Detection {
    pub fn new(kind: AudioKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

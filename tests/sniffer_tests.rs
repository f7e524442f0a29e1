//! 内容嗅探集成测试
//!
//! 使用真实生成的音频容器验证识别结果，以及截断/垃圾数据的健壮性。

mod cache_fixtures;

use cache_audio_extractor::{AudioKind, Detection, Sniffer};
use cache_fixtures::*;
use rstest::rstest;

#[rstest]
#[case::ogg(ogg_bytes("x"), AudioKind::Ogg)]
#[case::wav(wav_bytes(64), AudioKind::Wav)]
#[case::mp3(mp3_id3_bytes("x"), AudioKind::Mp3)]
fn test_real_containers_classified(#[case] bytes: Vec<u8>, #[case] kind: AudioKind) {
    let sniffer = Sniffer::default();
    assert_eq!(sniffer.classify(&bytes), Some(Detection::new(kind, 0)));
}

#[test]
fn test_truncated_wav_never_matches() {
    let wav = wav_bytes(64);
    let sniffer = Sniffer::default().with_search_window(0);
    for cut in 0..12 {
        assert_eq!(sniffer.classify(&wav[..cut]), None, "cut={cut}");
    }
    assert!(sniffer.classify(&wav[..12]).is_some());
}

#[test]
fn test_required_len_is_enough_to_decide() {
    let sniffer = Sniffer::default();
    let payload = with_cache_header(&ogg_bytes("late"));
    let head = &payload[..payload.len().min(sniffer.required_len())];
    assert_eq!(sniffer.classify(head).map(|d| d.kind), Some(AudioKind::Ogg));
}

#[test]
fn test_text_and_gzip_bytes_are_not_audio() {
    let sniffer = Sniffer::default();
    assert_eq!(sniffer.classify(&text_bytes()), None);
    // 未解压的gzip流不是音频
    assert_eq!(sniffer.classify(&gzip(&text_bytes())), None);
}

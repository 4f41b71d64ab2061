//! Модуль для парсинга субтитров
//!
//! Этот модуль содержит функции для парсинга SRT файлов.

use std::path::Path;
use lazy_static::lazy_static;
use regex::Regex;
use crate::error::{Result, SubVoiceError};
use crate::subtitle::timeline::Cue;

lazy_static! {
    static ref INDEX_LINE: Regex = Regex::new(r"^\d+$").unwrap();
    static ref TIMING_LINE: Regex = Regex::new(
        r"^(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})\s*-->\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})"
    )
    .unwrap();
}

/// Парсинг SRT файла
pub fn parse_srt_file<P: AsRef<Path>>(srt_file_path: P) -> Result<Vec<Cue>> {
    let path = srt_file_path.as_ref();
    if !path.is_file() {
        return Err(SubVoiceError::FileNotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    let content = String::from_utf8(bytes)
        .map_err(|e| SubVoiceError::InvalidFormat(format!("SRT file is not valid UTF-8: {}", e)))?;

    parse_srt(&content)
}

/// Парсинг содержимого SRT.
///
/// Блоки без текста пропускаются. Номер блока берется из строки индекса;
/// если она отсутствует, используется порядковый номер.
pub fn parse_srt(content: &str) -> Result<Vec<Cue>> {
    let content = content.trim_start_matches('\u{feff}');

    let mut cues = Vec::new();
    let mut index: Option<u32> = None;
    let mut timing: Option<(u64, u64)> = None;
    let mut text = String::new();

    for (line_no, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();

        if line.is_empty() {
            flush_block(&mut cues, &mut index, &mut timing, &mut text);
            continue;
        }

        if timing.is_none() && INDEX_LINE.is_match(line) {
            // Номер блока без пустой строки перед ним
            if !text.is_empty() {
                flush_block(&mut cues, &mut index, &mut timing, &mut text);
            }
            index = line.parse::<u32>().ok();
            continue;
        }

        if let Some(caps) = TIMING_LINE.captures(line) {
            if timing.is_some() && !text.is_empty() {
                flush_block(&mut cues, &mut index, &mut timing, &mut text);
            }
            let start = to_millis(&caps[1], &caps[2], &caps[3], &caps[4], line_no)?;
            let end = to_millis(&caps[5], &caps[6], &caps[7], &caps[8], line_no)?;
            timing = Some((start, end));
            continue;
        }

        if timing.is_none() {
            return Err(SubVoiceError::InvalidFormat(format!(
                "Unexpected text before timing line at line {}: '{}'",
                line_no + 1,
                line
            )));
        }

        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(line);
    }

    flush_block(&mut cues, &mut index, &mut timing, &mut text);

    log::debug!("Parsed {} cues from SRT", cues.len());
    Ok(cues)
}

fn flush_block(
    cues: &mut Vec<Cue>,
    index: &mut Option<u32>,
    timing: &mut Option<(u64, u64)>,
    text: &mut String,
) {
    if let Some((start, end)) = timing.take() {
        if !text.is_empty() {
            let number = index.unwrap_or(cues.len() as u32 + 1);
            cues.push(Cue::new(number, std::mem::take(text), start, end));
        }
    }
    index.take();
    text.clear();
}

/// Перевод времени `HH:MM:SS,mmm` в миллисекунды
fn to_millis(hours: &str, minutes: &str, seconds: &str, fraction: &str, line_no: usize) -> Result<u64> {
    let out_of_range = || {
        SubVoiceError::InvalidFormat(format!("Timestamp out of range at line {}", line_no + 1))
    };
    let field = |value: &str| value.parse::<u64>().map_err(|_| out_of_range());

    let ms = field(fraction)?;
    let ms = match fraction.len() {
        1 => ms * 100,
        2 => ms * 10,
        _ => ms,
    };
    field(hours)?
        .checked_mul(3600)
        .and_then(|total| total.checked_add(field(minutes).ok()? * 60))
        .and_then(|total| total.checked_add(field(seconds).ok()?))
        .and_then(|total| total.checked_mul(1000))
        .and_then(|total| total.checked_add(ms))
        .ok_or_else(out_of_range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_srt_basic() {
        let srt = "1\n00:00:00,000 --> 00:00:01,000\nFirst line\n\n2\n00:00:02,000 --> 00:00:03,500\nSecond\nsubtitle\n";

        let cues = parse_srt(srt).unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].text, "First line");
        assert_eq!(cues[0].start_ms, 0);
        assert_eq!(cues[0].end_ms, 1000);
        assert_eq!(cues[1].index, 2);
        assert_eq!(cues[1].text, "Second subtitle");
        assert_eq!(cues[1].start_ms, 2000);
        assert_eq!(cues[1].end_ms, 3500);
    }

    #[test]
    fn test_parse_srt_crlf_bom_and_dot_separator() {
        let srt = "\u{feff}7\r\n01:02:03.4 --> 01:02:04.45\r\nHello\r\n";

        let cues = parse_srt(srt).unwrap();

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 7);
        assert_eq!(cues[0].start_ms, 3_723_400);
        assert_eq!(cues[0].end_ms, 3_724_450);
    }

    #[test]
    fn test_parse_srt_skips_blocks_without_text() {
        let srt = "1\n00:00:00,000 --> 00:00:01,000\n\n2\n00:00:01,000 --> 00:00:02,000\nSpoken\n";

        let cues = parse_srt(srt).unwrap();

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 2);
    }

    #[test]
    fn test_parse_srt_numeric_text_line() {
        let srt = "1\n00:00:00,000 --> 00:00:01,000\n42\n";

        let cues = parse_srt(srt).unwrap();

        assert_eq!(cues[0].text, "42");
    }

    #[test]
    fn test_parse_srt_rejects_garbage() {
        assert!(matches!(
            parse_srt("just some text\nwithout timings"),
            Err(SubVoiceError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_srt_rejects_timestamp_overflow() {
        // Часы помещаются в u64, но не в миллисекунды
        let srt = "1\n99999999999999999:00:00,000 --> 99999999999999999:00:01,000\nhi\n";
        assert!(matches!(parse_srt(srt), Err(SubVoiceError::InvalidFormat(_))));

        // Часы не помещаются даже в u64
        let srt = "1\n99999999999999999999999:00:00,000 --> 00:00:01,000\nhi\n";
        assert!(matches!(parse_srt(srt), Err(SubVoiceError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_srt_large_but_valid_hours() {
        let cues = parse_srt("1\n100:00:00,5 --> 100:00:01,25\nlate\n").unwrap();

        assert_eq!(cues[0].start_ms, 360_000_500);
        assert_eq!(cues[0].end_ms, 360_001_250);
    }

    #[test]
    fn test_parse_srt_file_missing() {
        assert!(matches!(
            parse_srt_file("/nonexistent/file.srt"),
            Err(SubVoiceError::FileNotFound(_))
        ));
    }
}

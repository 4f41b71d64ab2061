//! Модуль для работы с TTS
//!
//! Сервис синтеза речи принимает текст и язык и возвращает закодированное
//! аудио. Длительность результата не контролируется: ее подгоняет
//! `pipeline::reconciler`.

pub mod cache;
pub mod google;

use async_trait::async_trait;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use crate::error::Result;
use crate::language::Language;

pub use cache::CachedSpeechService;
pub use google::GoogleSpeechService;

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref ASS_OVERRIDE: Regex = Regex::new(r"\{\\[^}]*\}").unwrap();
}

/// Запрос на синтез одного субтитра
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    /// Текст для озвучивания
    pub text: String,
    /// Язык озвучивания
    pub language: Language,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self {
            text: text.into(),
            language,
        }
    }
}

/// Сервис синтеза речи
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Синтезировать речь и вернуть аудио (контейнер определяется `extension`)
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Bytes>;

    /// Расширение файла для возвращаемого аудио
    fn extension(&self) -> &'static str {
        "mp3"
    }
}

/// Подготовка текста для TTS
pub fn prepare_text_for_tts(text: &str) -> String {
    // Удаляем HTML-теги и теги форматирования ASS
    let text = HTML_TAG.replace_all(text, "");
    let text = ASS_OVERRIDE.replace_all(&text, "");

    // Заменяем специальные символы
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    // Нормализуем пробелы
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_text_strips_markup() {
        assert_eq!(
            prepare_text_for_tts("{\\an8}<i>Hello</i>&nbsp;&amp;   <b>world</b>"),
            "Hello & world"
        );
    }

    #[test]
    fn test_prepare_text_keeps_plain_text() {
        assert_eq!(prepare_text_for_tts("  Ciao,\n mondo!  "), "Ciao, mondo!");
    }
}

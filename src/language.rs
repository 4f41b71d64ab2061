//! Коды языков для синтеза речи
//!
//! Язык задаётся явно или определяется один раз по локали процесса
//! на границе приложения, после чего передаётся по конвейеру в конфигурации.

use std::fmt;
use serde::{Deserialize, Serialize};
use crate::error::{Result, SubVoiceError};

/// Язык по умолчанию, если локаль не задана или не поддерживается
pub const FALLBACK_LANGUAGE: &str = "en";

/// Поддерживаемые коды языков
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "af", "sq", "am", "ar", "hy", "as", "ay", "az", "ba", "eu", "bn", "dz",
    "bh", "bi", "br", "bg", "my", "be", "km", "ca", "zh", "co", "hr", "cs",
    "da", "nl", "en", "eo", "et", "fo", "fj", "fi", "fr", "fy", "gl", "ka",
    "de", "el", "kl", "gn", "gu", "ha", "he", "hi", "hu", "is", "id", "ia",
    "ie", "ga", "it", "ja", "jw", "kn", "ks", "kk", "rw", "ky", "rn", "ko",
    "ku", "lo", "la", "lv", "ln", "lt", "mk", "mg", "ms", "ml", "mt", "mi",
    "mr", "mo", "mn", "na", "ne", "no", "oc", "or", "om", "ps", "fa", "pl",
    "pt", "pa", "qu", "rm", "ro", "ru", "sm", "sg", "sa", "sr", "sh", "st",
    "tn", "sn", "sd", "si", "ss", "sk", "sl", "so", "es", "su", "sw", "sv",
    "tl", "tg", "ta", "tt", "te", "th", "bo", "ti", "to", "ts", "tr", "tk",
    "tw", "uk", "ur", "uz", "vi", "vo", "cy", "wo", "xh", "yi", "yo", "zu",
];

/// Проверенный код языка
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    /// Разобрать код языка, сверяя его со списком поддерживаемых
    pub fn parse(code: &str) -> Result<Self> {
        let normalized = code.trim().trim_start_matches('-').to_ascii_lowercase();
        if SUPPORTED_LANGUAGES.contains(&normalized.as_str()) {
            Ok(Self(normalized))
        } else {
            Err(SubVoiceError::Configuration(format!(
                "Unsupported language code: '{}'",
                code
            )))
        }
    }

    /// Определить язык по значению локали вида `it_IT.UTF-8`
    pub fn from_locale(locale: &str) -> Option<Self> {
        let code = locale
            .split(['_', '.', '@', '-'])
            .next()
            .unwrap_or("");
        if code.is_empty() || code.eq_ignore_ascii_case("C") || code.eq_ignore_ascii_case("POSIX") {
            return None;
        }
        Self::parse(code).ok()
    }

    /// Определить язык из переменных окружения локали.
    ///
    /// Вызывается один раз при запуске, дальше язык передаётся явно.
    pub fn detect_from_env() -> Self {
        for var in ["LC_ALL", "LC_MESSAGES", "LANG"] {
            if let Ok(value) = std::env::var(var) {
                if value.trim().is_empty() {
                    continue;
                }
                if let Some(language) = Self::from_locale(&value) {
                    log::debug!("Language '{}' detected from {}={}", language, var, value);
                    return language;
                }
            }
        }
        Self::default()
    }

    /// Получить строковое представление кода
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Language {
    fn default() -> Self {
        Self(FALLBACK_LANGUAGE.to_string())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Language {
    type Error = SubVoiceError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_known_codes() {
        assert_eq!(Language::parse("it").unwrap().as_str(), "it");
        assert_eq!(Language::parse(" EN ").unwrap().as_str(), "en");
        assert_eq!(Language::parse("-fr").unwrap().as_str(), "fr");
    }

    #[test]
    fn test_parse_rejects_unknown_codes() {
        assert!(matches!(
            Language::parse("xx"),
            Err(SubVoiceError::Configuration(_))
        ));
        assert!(Language::parse("").is_err());
    }

    #[test]
    fn test_from_locale() {
        assert_eq!(Language::from_locale("it_IT.UTF-8").unwrap().as_str(), "it");
        assert_eq!(Language::from_locale("de").unwrap().as_str(), "de");
        assert!(Language::from_locale("C.UTF-8").is_none());
        assert!(Language::from_locale("POSIX").is_none());
        assert!(Language::from_locale("xx_YY").is_none());
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let language: Language = serde_json::from_str("\"ru\"").unwrap();
        assert_eq!(language.as_str(), "ru");
        assert!(serde_json::from_str::<Language>("\"zz\"").is_err());
    }
}

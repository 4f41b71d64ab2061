//! Модуль конфигурации библиотеки subvoice
//!
//! Этот модуль содержит структуры и перечисления для настройки конвейера.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{Result, SubVoiceError};
use crate::language::Language;

/// Адрес сервиса синтеза речи по умолчанию
pub const DEFAULT_TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// Верхняя граница базовой задержки между повторами
pub const MAX_RETRY_BASE_DELAY_MS: u64 = 60_000;

/// Политика обработки перекрывающихся субтитров
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimelinePolicy {
    /// Перекрытия считаются ошибкой таймлайна
    Strict,
    /// Перекрытия обрезаются до нулевой паузы с предупреждением
    Clamp,
}

impl Default for TimelinePolicy {
    fn default() -> Self {
        Self::Strict
    }
}

/// Конфигурация библиотеки
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubVoiceConfig {
    /// Язык синтеза речи
    pub language: Language,
    /// Политика для перекрывающихся субтитров
    pub timeline_policy: TimelinePolicy,
    /// Максимальное количество одновременно обрабатываемых субтитров
    pub max_concurrent_requests: usize,
    /// Количество повторных попыток синтеза
    pub max_retries: u32,
    /// Базовая задержка между попытками (мс), удваивается на каждой попытке
    pub retry_base_delay_ms: u64,
    /// Допустимое отклонение длительности клипа после подгонки (мс)
    pub clip_tolerance_ms: u64,
    /// Допустимое отклонение длительности итоговой дорожки (мс)
    pub drift_tolerance_ms: u64,
    /// Частота дискретизации промежуточных клипов
    pub sample_rate: u32,
    /// Адрес сервиса синтеза речи
    pub tts_endpoint: String,
    /// Максимальная длина фрагмента текста в одном запросе
    pub tts_chunk_chars: usize,
    /// Таймаут HTTP запроса (секунды)
    pub request_timeout_secs: u64,
    /// Использовать кэширование
    pub use_caching: bool,
    /// Директория для кэша
    pub cache_dir: Option<PathBuf>,
    /// Максимальный размер кэша в байтах
    pub max_cache_size: Option<u64>,
    /// Путь к ffmpeg (по умолчанию ищется в PATH)
    pub ffmpeg_path: Option<PathBuf>,
    /// Путь к ffprobe (по умолчанию ищется в PATH)
    pub ffprobe_path: Option<PathBuf>,
    /// Родительская директория для временных файлов
    pub work_dir: Option<PathBuf>,
    /// Удалять временные файлы после завершения
    pub cleanup_temp_files: bool,
}

impl Default for SubVoiceConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            timeline_policy: TimelinePolicy::default(),
            max_concurrent_requests: 4,
            max_retries: 2,
            retry_base_delay_ms: 500,
            clip_tolerance_ms: 50,
            drift_tolerance_ms: 250,
            sample_rate: 24_000,
            tts_endpoint: DEFAULT_TTS_ENDPOINT.to_string(),
            tts_chunk_chars: 100,
            request_timeout_secs: 30,
            use_caching: true,
            cache_dir: None,
            max_cache_size: Some(256 * 1024 * 1024), // 256 MB
            ffmpeg_path: None,
            ffprobe_path: None,
            work_dir: None,
            cleanup_temp_files: true,
        }
    }
}

impl SubVoiceConfig {
    /// Загрузить конфигурацию из JSON файла.
    ///
    /// Отсутствующие поля берутся из значений по умолчанию.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SubVoiceError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Проверить значения конфигурации
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_requests == 0 {
            return Err(SubVoiceError::Configuration(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(SubVoiceError::Configuration(
                "sample_rate must be positive".to_string(),
            ));
        }
        if self.tts_chunk_chars < 10 {
            return Err(SubVoiceError::Configuration(format!(
                "tts_chunk_chars is too small: {}",
                self.tts_chunk_chars
            )));
        }
        if self.tts_endpoint.trim().is_empty() {
            return Err(SubVoiceError::Configuration(
                "tts_endpoint must not be empty".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(SubVoiceError::Configuration(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.retry_base_delay_ms > MAX_RETRY_BASE_DELAY_MS {
            return Err(SubVoiceError::Configuration(format!(
                "retry_base_delay_ms must not exceed {} ms, got {}",
                MAX_RETRY_BASE_DELAY_MS, self.retry_base_delay_ms
            )));
        }
        if self.drift_tolerance_ms < self.clip_tolerance_ms {
            return Err(SubVoiceError::Configuration(format!(
                "drift_tolerance_ms ({}) must not be lower than clip_tolerance_ms ({})",
                self.drift_tolerance_ms, self.clip_tolerance_ms
            )));
        }
        Ok(())
    }

    /// Директория кэша с учетом значения по умолчанию
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("subvoice-cache"))
    }
}

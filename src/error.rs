//! Модуль обработки ошибок библиотеки subvoice
//!
//! Ошибки разделены по этапам конвейера: таймлайн, синтез речи,
//! подгонка длительности, сборка дорожки и мультиплексирование с видео.

use std::path::PathBuf;
use thiserror::Error;

/// Ошибки библиотеки subvoice
#[derive(Debug, Error)]
pub enum SubVoiceError {
    /// Некорректный таймлайн (пустой список, неверный порядок, end < start)
    #[error("Invalid timeline: {0}")]
    InvalidTimeline(String),

    /// Ошибка сервиса синтеза речи
    #[error("Speech synthesis failed for language '{language}': {cause}")]
    Synthesis { language: String, cause: String },

    /// Ошибка изменения темпа клипа
    #[error("Failed to reconcile clip at position {position}: {cause}")]
    Reconcile { position: usize, cause: String },

    /// Итоговая длительность дорожки разошлась с таймлайном
    #[error("Track duration drifted: expected {expected_ms} ms, got {actual_ms} ms (tolerance {tolerance_ms} ms)")]
    SyncDrift {
        expected_ms: u64,
        actual_ms: u64,
        tolerance_ms: u64,
    },

    /// Ошибка объединения аудиодорожки с видео
    #[error("Merge error: {0}")]
    Merge(String),

    /// Внешняя утилита завершилась с ошибкой
    #[error("{program} exited with {status}: {stderr}")]
    ExternalTool {
        program: String,
        status: String,
        stderr: String,
    },

    /// Фоновая задача завершилась аварийно
    #[error("Worker task failed: {0}")]
    Worker(String),

    /// Ошибка HTTP запроса
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Файл не найден
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Неверный формат
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl SubVoiceError {
    /// Краткое описание ошибки для вывода в консоль и логи
    pub fn cause_string(&self) -> String {
        match self {
            Self::ExternalTool { program, stderr, .. } => {
                let last_line = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
                format!("{}: {}", program, last_line.trim())
            }
            other => other.to_string(),
        }
    }
}

/// Тип Result для библиотеки subvoice
pub type Result<T> = std::result::Result<T, SubVoiceError>;

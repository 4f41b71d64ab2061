//! Модуль для работы с медиафайлами
//!
//! Все операции над аудио и видео (генерация тишины, измерение длительности,
//! изменение темпа, склейка, мультиплексирование) выполняются через
//! `AudioToolkit`. Основная реализация использует ffmpeg и ffprobe.

pub mod ffmpeg;

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use crate::error::Result;

pub use ffmpeg::FfmpegToolkit;

/// Набор внешних операций над медиафайлами
#[async_trait]
pub trait AudioToolkit: Send + Sync {
    /// Создать файл тишины точной длительности
    async fn generate_silence(&self, duration_ms: u64, output: &Path) -> Result<()>;

    /// Привести аудио к единому формату промежуточных клипов
    async fn normalize(&self, input: &Path, output: &Path) -> Result<()>;

    /// Измерить длительность медиафайла
    async fn probe_duration_ms(&self, input: &Path) -> Result<u64>;

    /// Изменить темп без изменения высоты тона.
    ///
    /// `speed_factor` > 1 ускоряет речь. Результат дополняется тишиной
    /// или обрезается до `target_ms`.
    async fn adjust_tempo(
        &self,
        input: &Path,
        speed_factor: f64,
        target_ms: u64,
        output: &Path,
    ) -> Result<()>;

    /// Склеить файлы в указанном порядке
    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<()>;

    /// Заменить звук видео новой дорожкой; длительность по кратчайшему потоку
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;
}

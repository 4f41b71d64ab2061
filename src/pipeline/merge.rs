//! Объединение дорожки с видео
//!
//! Видеопоток копируется без перекодирования, звук заменяется новой
//! дорожкой, длительность результата определяется кратчайшим потоком.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::error::{Result, SubVoiceError};
use crate::media::AudioToolkit;

/// Результат объединения с видео
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedVideo {
    pub path: PathBuf,
    pub duration_ms: u64,
}

/// Этап объединения с видео
pub struct MergeStage {
    toolkit: Arc<dyn AudioToolkit>,
}

impl MergeStage {
    pub fn new(toolkit: Arc<dyn AudioToolkit>) -> Self {
        Self { toolkit }
    }

    /// Объединить видео и дорожку в `output`
    pub async fn merge(&self, video: &Path, track: &Path, output: &Path) -> Result<MergedVideo> {
        if !video.is_file() {
            return Err(SubVoiceError::Merge(format!("video not found: {}", video.display())));
        }
        if !track.is_file() {
            return Err(SubVoiceError::Merge(format!("audio track not found: {}", track.display())));
        }
        if output == video || output == track {
            return Err(SubVoiceError::Merge(format!(
                "output {} would overwrite an input",
                output.display()
            )));
        }

        log::info!("Merging {} into {}", track.display(), video.display());
        self.toolkit
            .mux(video, track, output)
            .await
            .map_err(|e| SubVoiceError::Merge(e.cause_string()))?;

        let duration_ms = self
            .toolkit
            .probe_duration_ms(output)
            .await
            .map_err(|e| SubVoiceError::Merge(e.cause_string()))?;

        Ok(MergedVideo {
            path: output.to_path_buf(),
            duration_ms,
        })
    }
}

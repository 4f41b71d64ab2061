//! Сборка итоговой дорожки
//!
//! Клипы склеиваются строго в порядке позиций. После склейки длительность
//! дорожки сверяется с таймлайном, а все промежуточные файлы удаляются
//! независимо от результата.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::error::{Result, SubVoiceError};
use crate::media::AudioToolkit;
use crate::pipeline::clip::Clip;

/// Итоговая аудиодорожка
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Путь к файлу дорожки
    pub path: PathBuf,
    /// Измеренная длительность
    pub duration_ms: u64,
    /// Длительность по таймлайну
    pub expected_ms: u64,
    /// Количество склеенных клипов
    pub clip_count: usize,
}

impl Track {
    pub fn drift_ms(&self) -> u64 {
        self.duration_ms.abs_diff(self.expected_ms)
    }
}

/// Сборщик дорожки
pub struct Sequencer {
    toolkit: Arc<dyn AudioToolkit>,
    drift_tolerance_ms: u64,
}

impl Sequencer {
    pub fn new(toolkit: Arc<dyn AudioToolkit>, drift_tolerance_ms: u64) -> Self {
        Self {
            toolkit,
            drift_tolerance_ms,
        }
    }

    /// Склеить клипы в одну дорожку
    pub async fn assemble(&self, mut clips: Vec<Clip>, expected_ms: u64, output: &Path) -> Result<Track> {
        if clips.is_empty() {
            return Err(SubVoiceError::InvalidTimeline(
                "timeline produced no audio to assemble".to_string(),
            ));
        }

        clips.sort_by_key(|c| c.position);
        if let Some(pair) = clips.windows(2).find(|w| w[0].position == w[1].position) {
            return Err(SubVoiceError::InvalidTimeline(format!(
                "duplicate segment at position {}",
                pair[0].position
            )));
        }

        let planned_ms: u64 = clips.iter().map(|c| c.actual_ms).sum();
        let speech_count = clips.iter().filter(|c| c.is_speech()).count();
        let worst_drift = clips.iter().map(|c| c.drift_ms()).max().unwrap_or(0);
        log::info!(
            "Assembling {} clips ({} speech, {} ms planned, {} ms expected) into {}",
            clips.len(),
            speech_count,
            planned_ms,
            expected_ms,
            output.display()
        );
        log::debug!("Largest clip deviation: {} ms", worst_drift);

        let inputs: Vec<PathBuf> = clips.iter().map(|c| c.path().to_path_buf()).collect();
        let result = self.concat_and_probe(&inputs, output).await;

        let clip_count = clips.len();
        release_all(clips);

        let duration_ms = result?;
        let track = Track {
            path: output.to_path_buf(),
            duration_ms,
            expected_ms,
            clip_count,
        };

        if track.drift_ms() > self.drift_tolerance_ms {
            log::error!(
                "Track {} lasts {} ms, timeline expects {} ms",
                output.display(),
                duration_ms,
                expected_ms
            );
            return Err(SubVoiceError::SyncDrift {
                expected_ms,
                actual_ms: duration_ms,
                tolerance_ms: self.drift_tolerance_ms,
            });
        }

        Ok(track)
    }

    async fn concat_and_probe(&self, inputs: &[PathBuf], output: &Path) -> Result<u64> {
        self.toolkit.concat(inputs, output).await?;
        self.toolkit.probe_duration_ms(output).await
    }
}

/// Удалить промежуточные файлы клипов
fn release_all(clips: Vec<Clip>) {
    for clip in clips {
        let position = clip.position;
        if let Err(e) = clip.release() {
            log::warn!("Failed to remove clip at position {}: {}", position, e);
        }
    }
}

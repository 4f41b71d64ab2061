//! Синтез клипов тишины и речи
//!
//! Приводит ответы сервиса TTS и генератора тишины к единому виду:
//! клип с позицией, целевой и фактической длительностью.

use std::sync::Arc;
use std::time::Duration;
use rand::Rng;
use crate::error::{Result, SubVoiceError};
use crate::language::Language;
use crate::media::AudioToolkit;
use crate::pipeline::clip::{Clip, ClipKind};
use crate::subtitle::Cue;
use crate::tts::{prepare_text_for_tts, SpeechRequest, SpeechService};
use crate::utils::temp::Workspace;

/// Параметры повторных попыток синтеза
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Количество повторов после первой неудачной попытки
    pub max_retries: u32,
    /// Базовая задержка, удваивается на каждой попытке
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Задержка перед попыткой `attempt` (с 1) со случайной добавкой
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let backoff = base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(16));
        let jitter = if base_ms > 1 {
            rand::thread_rng().gen_range(0..base_ms / 2)
        } else {
            0
        };
        Duration::from_millis(backoff.saturating_add(jitter))
    }
}

/// Адаптер синтеза клипов
#[derive(Clone)]
pub struct ClipSynthesizer {
    speech: Arc<dyn SpeechService>,
    toolkit: Arc<dyn AudioToolkit>,
    workspace: Arc<Workspace>,
    retry: RetryPolicy,
}

impl ClipSynthesizer {
    pub fn new(
        speech: Arc<dyn SpeechService>,
        toolkit: Arc<dyn AudioToolkit>,
        workspace: Arc<Workspace>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            speech,
            toolkit,
            workspace,
            retry,
        }
    }

    /// Создать клип тишины.
    ///
    /// Для нулевой паузы клип не создается.
    pub async fn synthesize_silence(&self, position: usize, duration_ms: u64) -> Result<Option<Clip>> {
        if duration_ms == 0 {
            return Ok(None);
        }

        let asset = self.workspace.allocate(&format!("silence_{}", position), "wav");
        self.toolkit.generate_silence(duration_ms, asset.path()).await?;

        Ok(Some(Clip::new(position, ClipKind::Silence, duration_ms, duration_ms, asset)))
    }

    /// Синтезировать речь субтитра.
    ///
    /// Фактическая длительность клипа измеряется и может отличаться от окна.
    pub async fn synthesize_speech(
        &self,
        position: usize,
        cue: &Cue,
        target_ms: u64,
        language: &Language,
    ) -> Result<Clip> {
        let synthesis_error = |cause: String| SubVoiceError::Synthesis {
            language: language.to_string(),
            cause,
        };

        let text = prepare_text_for_tts(&cue.text);
        if text.is_empty() {
            return Err(synthesis_error(format!("cue {} has no speakable text", cue.index)));
        }

        let request = SpeechRequest::new(text, language.clone());
        let audio = self.request_with_retry(&request, cue.index).await?;

        // Каждая попытка пишет в новый файл
        let raw = self
            .workspace
            .allocate(&format!("speech_{}_raw", cue.index), self.speech.extension());
        tokio::fs::write(raw.path(), &audio).await?;

        let normalized = self.workspace.allocate(&format!("speech_{}", cue.index), "wav");
        self.toolkit
            .normalize(raw.path(), normalized.path())
            .await
            .map_err(|e| synthesis_error(format!("unreadable audio for cue {}: {}", cue.index, e.cause_string())))?;
        if let Err(e) = raw.release() {
            log::warn!("Failed to remove raw speech for cue {}: {}", cue.index, e);
        }

        let actual_ms = self
            .toolkit
            .probe_duration_ms(normalized.path())
            .await
            .map_err(|e| synthesis_error(format!("unreadable audio for cue {}: {}", cue.index, e.cause_string())))?;
        log::debug!(
            "Cue {}: synthesized {} ms of speech for a {} ms window",
            cue.index,
            actual_ms,
            target_ms
        );

        Ok(Clip::new(
            position,
            ClipKind::Speech { cue_index: cue.index },
            target_ms,
            actual_ms,
            normalized,
        ))
    }

    async fn request_with_retry(&self, request: &SpeechRequest, cue_index: u32) -> Result<bytes::Bytes> {
        let mut attempt = 0;
        loop {
            match self.speech.synthesize(request).await {
                Ok(audio) if !audio.is_empty() => return Ok(audio),
                Ok(_) => {
                    let err = SubVoiceError::Synthesis {
                        language: request.language.to_string(),
                        cause: "service returned empty audio".to_string(),
                    };
                    if attempt >= self.retry.max_retries {
                        return Err(err);
                    }
                    log::warn!("Cue {}: {}, retrying", cue_index, err);
                }
                Err(e) => {
                    let err = if matches!(e, SubVoiceError::Synthesis { .. }) {
                        e
                    } else {
                        SubVoiceError::Synthesis {
                            language: request.language.to_string(),
                            cause: e.to_string(),
                        }
                    };
                    if attempt >= self.retry.max_retries {
                        log::error!("Cue {}: giving up after {} attempts: {}", cue_index, attempt + 1, err);
                        return Err(err);
                    }
                    log::warn!("Cue {}: attempt {} failed: {}, retrying", cue_index, attempt + 1, err);
                }
            }

            attempt += 1;
            tokio::time::sleep(self.retry.delay_for(attempt)).await;
        }
    }
}

//! Тестовые реализации сервиса TTS и медиаинструментов.
//!
//! Аудиофайлы заменены текстовыми файлами вида `<kind> <ms>`, поэтому
//! длительности и порядок склейки можно проверить без ffmpeg.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use subvoice::error::{Result, SubVoiceError};
use subvoice::media::AudioToolkit;
use subvoice::tts::{SpeechRequest, SpeechService};
use subvoice::{Cue, SubVoice, SubVoiceConfig};

/// Прочитать длительность из тестового файла
pub fn read_duration(path: &Path) -> Result<u64> {
    let content = std::fs::read_to_string(path)?;
    content
        .split_whitespace()
        .last()
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| SubVoiceError::InvalidFormat(format!("bad fake audio: {}", content)))
}

fn tool_error(stderr: &str) -> SubVoiceError {
    SubVoiceError::ExternalTool {
        program: "mock".to_string(),
        status: "exit status: 1".to_string(),
        stderr: stderr.to_string(),
    }
}

/// Сервис TTS: 60 мс речи на символ текста
#[derive(Default)]
pub struct MockSpeech {
    pub calls: AtomicUsize,
    /// Сколько первых вызовов завершить ошибкой
    pub fail_first: usize,
    /// Текст, на котором сервис всегда падает
    pub fail_on_text: Option<String>,
    /// Задержка ответа, убывающая с номером субтитра
    pub staggered: bool,
    /// Постоянная задержка каждого ответа (мс)
    pub delay_ms: u64,
    pub ms_per_char: u64,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self {
            ms_per_char: 60,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechService for MockSpeech {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Bytes> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if self.staggered {
            let weight = request.text.len() as u64;
            tokio::time::sleep(Duration::from_millis(200u64.saturating_sub(weight * 10))).await;
        }
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if call < self.fail_first {
            return Err(SubVoiceError::Synthesis {
                language: request.language.to_string(),
                cause: "temporary failure".to_string(),
            });
        }
        if let Some(text) = &self.fail_on_text {
            if request.text.contains(text.as_str()) {
                return Err(SubVoiceError::Synthesis {
                    language: request.language.to_string(),
                    cause: "unsupported text".to_string(),
                });
            }
        }

        let duration = request.text.chars().count() as u64 * self.ms_per_char;
        Ok(Bytes::from(format!("speech {}", duration)))
    }
}

/// Медиаинструменты на текстовых файлах
#[derive(Default)]
pub struct MockToolkit {
    /// Содержимое входов каждой склейки, по порядку
    pub concat_inputs: Mutex<Vec<Vec<String>>>,
    /// Коэффициенты темпа
    pub tempo_factors: Mutex<Vec<f64>>,
    /// Отклонение результата подгонки от цели (мс)
    pub tempo_error_ms: u64,
    /// Подгонка темпа всегда падает
    pub fail_tempo: bool,
    /// Отклонение итоговой дорожки (мс)
    pub concat_extra_ms: u64,
    /// Объединение с видео падает
    pub fail_mux: bool,
    /// Длительность речевых файлов не читается
    pub fail_speech_duration: bool,
}

impl MockToolkit {
    pub fn concat_calls(&self) -> Vec<Vec<String>> {
        self.concat_inputs.lock().clone()
    }
}

#[async_trait]
impl AudioToolkit for MockToolkit {
    async fn generate_silence(&self, duration_ms: u64, output: &Path) -> Result<()> {
        tokio::fs::write(output, format!("silence {}", duration_ms)).await?;
        Ok(())
    }

    async fn normalize(&self, input: &Path, output: &Path) -> Result<()> {
        let duration = read_duration(input).map_err(|e| tool_error(&e.to_string()))?;
        tokio::fs::write(output, format!("speech {}", duration)).await?;
        Ok(())
    }

    async fn probe_duration_ms(&self, input: &Path) -> Result<u64> {
        if self.fail_speech_duration && std::fs::read_to_string(input)?.starts_with("speech") {
            return Err(tool_error("moov atom not found"));
        }
        read_duration(input).map_err(|e| tool_error(&e.to_string()))
    }

    async fn adjust_tempo(
        &self,
        input: &Path,
        speed_factor: f64,
        target_ms: u64,
        output: &Path,
    ) -> Result<()> {
        if self.fail_tempo {
            return Err(tool_error("atempo: invalid argument"));
        }
        read_duration(input)?;
        self.tempo_factors.lock().push(speed_factor);
        tokio::fs::write(output, format!("speech {}", target_ms + self.tempo_error_ms)).await?;
        Ok(())
    }

    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        let mut contents = Vec::with_capacity(inputs.len());
        let mut total = 0;
        for input in inputs {
            contents.push(std::fs::read_to_string(input)?);
            total += read_duration(input)?;
        }
        self.concat_inputs.lock().push(contents);
        tokio::fs::write(output, format!("track {}", total + self.concat_extra_ms)).await?;
        Ok(())
    }

    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        if self.fail_mux {
            return Err(tool_error("Invalid data found when processing input"));
        }
        let shortest = read_duration(video)?.min(read_duration(audio)?);
        tokio::fs::write(output, format!("video {}", shortest)).await?;
        Ok(())
    }
}

/// Конфигурация без задержек и кэша с рабочей директорией в `work_dir`
pub fn test_config(work_dir: &Path) -> SubVoiceConfig {
    SubVoiceConfig {
        use_caching: false,
        retry_base_delay_ms: 0,
        work_dir: Some(work_dir.to_path_buf()),
        ..SubVoiceConfig::default()
    }
}

pub fn subvoice(
    config: SubVoiceConfig,
    speech: Arc<MockSpeech>,
    toolkit: Arc<MockToolkit>,
) -> SubVoice {
    SubVoice::with_services(config, speech, toolkit)
}

pub fn cue(index: u32, text: &str, start_ms: u64, end_ms: u64) -> Cue {
    Cue::new(index, text, start_ms, end_ms)
}

/// Количество записей в директории
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

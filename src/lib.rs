//! Основной файл библиотеки subvoice
//!
//! Библиотека превращает таймлайн субтитров в синхронную озвучку: общая
//! длительность дорожки и границы каждого субтитра совпадают с исходным
//! таймлайном. Готовая дорожка может быть объединена с исходным видео.

pub mod config;
pub mod error;
pub mod language;
pub mod media;
pub mod notification;
pub mod pipeline;
pub mod progress;
pub mod subtitle;
pub mod tts;
pub mod utils;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use chrono::{DateTime, Local};

pub use crate::config::{SubVoiceConfig, TimelinePolicy};
pub use crate::error::{Result, SubVoiceError};
pub use crate::language::Language;
pub use crate::pipeline::{MergedVideo, Track};
pub use crate::subtitle::{Cue, TimelineDefect};

use crate::media::{AudioToolkit, FfmpegToolkit};
use crate::pipeline::{MergeStage, Pipeline};
use crate::progress::{ProcessStep, ProgressObserver, ProgressReporter, ProgressTracker};
use crate::subtitle::analyzer::{analyze_windows, TimingMetrics};
use crate::subtitle::{compute_windows, Timeline};
use crate::tts::{CachedSpeechService, GoogleSpeechService, SpeechService};

/// Запрос на объединение дорожки с видео
#[derive(Debug, Clone)]
pub struct MergeRequest {
    /// Исходное видео
    pub video: PathBuf,
    /// Куда записать видео с новой дорожкой
    pub output: PathBuf,
}

/// Параметры одного запуска
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Субтитры в порядке таймлайна
    pub cues: Vec<Cue>,
    /// Куда записать итоговую дорожку
    pub track_output: PathBuf,
    /// Объединение с видео, если запрошено
    pub merge: Option<MergeRequest>,
}

/// Результат этапа объединения с видео
#[derive(Debug)]
pub enum MergeOutcome {
    /// Объединение не запрашивалось
    NotRequested,
    /// Видео успешно создано
    Merged(MergedVideo),
    /// Дорожка создана, но объединение не удалось
    Failed(SubVoiceError),
}

/// Отчет о запуске
#[derive(Debug)]
pub struct RunReport {
    /// Итоговая дорожка
    pub track: Track,
    /// Результат объединения с видео
    pub merge: MergeOutcome,
    /// Дефекты таймлайна, допущенные политикой
    pub defects: Vec<TimelineDefect>,
    /// Метрики таймлайна
    pub metrics: TimingMetrics,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl RunReport {
    /// Все запрошенные этапы завершились успешно
    pub fn is_complete(&self) -> bool {
        !matches!(self.merge, MergeOutcome::Failed(_))
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Основная структура для работы с библиотекой
pub struct SubVoice {
    /// Конфигурация библиотеки
    config: Arc<SubVoiceConfig>,
    /// Сервис синтеза речи
    speech: Arc<dyn SpeechService>,
    /// Инструменты для работы с медиафайлами
    toolkit: Arc<dyn AudioToolkit>,
    /// Трекер прогресса
    progress_tracker: Option<ProgressTracker>,
}

impl SubVoice {
    /// Создать экземпляр с сервисом Google TTS и ffmpeg
    pub fn new(config: SubVoiceConfig) -> Result<Self> {
        config.validate()?;

        let toolkit: Arc<dyn AudioToolkit> = Arc::new(FfmpegToolkit::new(&config)?);
        let google: Arc<dyn SpeechService> = Arc::new(GoogleSpeechService::new(&config)?);
        let speech: Arc<dyn SpeechService> = if config.use_caching {
            Arc::new(CachedSpeechService::new(google, &config)?)
        } else {
            google
        };

        Ok(Self::with_services(config, speech, toolkit))
    }

    /// Создать экземпляр с заданными сервисами
    pub fn with_services(
        config: SubVoiceConfig,
        speech: Arc<dyn SpeechService>,
        toolkit: Arc<dyn AudioToolkit>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            speech,
            toolkit,
            progress_tracker: None,
        }
    }

    /// Текущая конфигурация
    pub fn config(&self) -> &SubVoiceConfig {
        &self.config
    }

    /// Установить репортер прогресса
    pub fn set_progress_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        match &mut self.progress_tracker {
            Some(tracker) => tracker.set_reporter(reporter),
            None => self.progress_tracker = Some(ProgressTracker::with_reporter(reporter)),
        }
    }

    /// Добавить наблюдателя прогресса
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> Option<usize> {
        self.progress_tracker
            .as_mut()
            .and_then(|tracker| tracker.add_observer(observer))
    }

    /// Построить дорожку и при необходимости объединить ее с видео.
    ///
    /// Ошибка объединения не отменяет готовую дорожку: она возвращается
    /// в отчете вместе с `MergeOutcome::Failed`.
    pub async fn process(&self, request: RunRequest) -> Result<RunReport> {
        let started_at = Local::now();
        log::info!("Starting voice-over for {} cues", request.cues.len());
        let tracker = self.progress_tracker.as_ref();

        if let Some(t) = tracker {
            t.set_step(ProcessStep::TimelineLoading);
            t.update_step_progress(0.0, Some("Validating subtitles".to_string()));
        }

        let timeline = Timeline::load(request.cues, self.config.timeline_policy).map_err(|e| {
            log::error!("{}", e);
            e
        })?;
        let metrics = analyze_windows(&compute_windows(&timeline));
        log::info!(
            "Timeline: {} cues, {} ms total, {} ms of silence, windows {}..{} ms",
            metrics.cue_count,
            timeline.expected_duration_ms(),
            metrics.total_silence_ms,
            metrics.min_window_ms,
            metrics.max_window_ms
        );
        if let Some(t) = tracker {
            t.update_step_progress(100.0, None);
        }

        let pipeline = Pipeline::new(self.config.clone(), self.speech.clone(), self.toolkit.clone());
        let track = pipeline
            .build_track(&timeline, &request.track_output, tracker)
            .await?;
        log::info!(
            "Track written to {} ({} ms, drift {} ms)",
            track.path.display(),
            track.duration_ms,
            track.drift_ms()
        );

        let merge = match &request.merge {
            None => MergeOutcome::NotRequested,
            Some(merge_request) => {
                if let Some(t) = tracker {
                    t.set_step(ProcessStep::VideoMerge);
                }
                self.merge(&merge_request.video, &track.path, &merge_request.output)
                    .await
            }
        };

        if let Some(t) = tracker {
            t.complete();
        }

        Ok(RunReport {
            track,
            merge,
            defects: timeline.defects().to_vec(),
            metrics,
            started_at,
            finished_at: Local::now(),
        })
    }

    /// Разобрать SRT файл и построить озвучку
    pub async fn process_srt(
        &self,
        srt_path: &Path,
        track_output: &Path,
        merge: Option<MergeRequest>,
    ) -> Result<RunReport> {
        let cues = subtitle::parser::parse_srt_file(srt_path)?;
        self.process(RunRequest {
            cues,
            track_output: track_output.to_path_buf(),
            merge,
        })
        .await
    }

    async fn merge(&self, video: &Path, track: &Path, output: &Path) -> MergeOutcome {
        match MergeStage::new(self.toolkit.clone()).merge(video, track, output).await {
            Ok(merged) => {
                log::info!("Video written to {} ({} ms)", merged.path.display(), merged.duration_ms);
                MergeOutcome::Merged(merged)
            }
            Err(e) => {
                log::error!("Merge failed, standalone track kept at {}: {}", track.display(), e);
                MergeOutcome::Failed(e)
            }
        }
    }
}

/// Публичный API для удобного использования
pub async fn voice_srt(
    srt_path: &Path,
    track_output: &Path,
    language: Language,
) -> Result<RunReport> {
    let config = SubVoiceConfig {
        language,
        ..SubVoiceConfig::default()
    };

    SubVoice::new(config)?
        .process_srt(srt_path, track_output, None)
        .await
}

//! Конвейер построения озвучки
//!
//! Для каждого субтитра независимо создаются клип паузы и клип речи,
//! речь подгоняется под окно, затем клипы собираются в дорожку по порядку
//! позиций. Субтитры обрабатываются параллельно с ограничением числа
//! одновременных задач; при первой фатальной ошибке остальные задачи
//! отменяются, а их файлы удаляются.

pub mod clip;
pub mod merge;
pub mod reconciler;
pub mod sequencer;
pub mod synthesizer;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use crate::config::SubVoiceConfig;
use crate::error::{Result, SubVoiceError};
use crate::language::Language;
use crate::media::AudioToolkit;
use crate::progress::{ProcessStep, ProgressTracker};
use crate::subtitle::{compute_windows, Cue, Timeline, TimelineWindow};
use crate::tts::SpeechService;
use crate::utils::temp::Workspace;

pub use clip::{Clip, ClipKind};
pub use merge::{MergeStage, MergedVideo};
pub use reconciler::DurationReconciler;
pub use sequencer::{Sequencer, Track};
pub use synthesizer::{ClipSynthesizer, RetryPolicy};

/// Конвейер: синтез, подгонка и сборка дорожки
pub struct Pipeline {
    config: Arc<SubVoiceConfig>,
    speech: Arc<dyn SpeechService>,
    toolkit: Arc<dyn AudioToolkit>,
}

impl Pipeline {
    pub fn new(
        config: Arc<SubVoiceConfig>,
        speech: Arc<dyn SpeechService>,
        toolkit: Arc<dyn AudioToolkit>,
    ) -> Self {
        Self {
            config,
            speech,
            toolkit,
        }
    }

    /// Построить дорожку для таймлайна и записать ее в `output`
    pub async fn build_track(
        &self,
        timeline: &Timeline,
        output: &Path,
        tracker: Option<&ProgressTracker>,
    ) -> Result<Track> {
        let windows = compute_windows(timeline);
        let workspace = Arc::new(Workspace::new(
            self.config.work_dir.as_deref(),
            self.config.cleanup_temp_files,
        )?);

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        if let Some(t) = tracker {
            t.set_step(ProcessStep::SpeechSynthesis);
        }
        let clips = self
            .synthesize_clips(&windows, timeline.cues(), workspace.clone(), tracker)
            .await?;

        if let Some(t) = tracker {
            t.set_step(ProcessStep::TrackAssembly);
        }
        let sequencer = Sequencer::new(self.toolkit.clone(), self.config.drift_tolerance_ms);
        let track = sequencer
            .assemble(clips, timeline.expected_duration_ms(), output)
            .await?;

        if let Some(t) = tracker {
            t.update_step_progress(100.0, Some(format!("{} ms", track.duration_ms)));
        }
        Ok(track)
    }

    /// Синтезировать и подогнать клипы всех субтитров
    pub async fn synthesize_clips(
        &self,
        windows: &[TimelineWindow],
        cues: &[Cue],
        workspace: Arc<Workspace>,
        tracker: Option<&ProgressTracker>,
    ) -> Result<Vec<Clip>> {
        let retry = RetryPolicy {
            max_retries: self.config.max_retries,
            base_delay: Duration::from_millis(self.config.retry_base_delay_ms),
        };
        let synthesizer = ClipSynthesizer::new(
            self.speech.clone(),
            self.toolkit.clone(),
            workspace.clone(),
            retry,
        );
        let reconciler = DurationReconciler::new(
            self.toolkit.clone(),
            workspace,
            self.config.clip_tolerance_ms,
        );

        // Семафор ограничивает количество одновременных обращений к сервисам
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_requests.max(1)));
        let mut tasks = JoinSet::new();

        for (window, cue) in windows.iter().zip(cues.iter()) {
            let semaphore = semaphore.clone();
            let synthesizer = synthesizer.clone();
            let reconciler = reconciler.clone();
            let language = self.config.language.clone();
            let window = *window;
            let cue = cue.clone();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| SubVoiceError::Worker(e.to_string()))?;
                process_cue(&synthesizer, &reconciler, window, &cue, &language).await
            });
        }

        let total = windows.len();
        let mut completed = 0usize;
        let mut clips = Vec::with_capacity(total * 2);

        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap_or_else(|e| Err(SubVoiceError::Worker(e.to_string())));
            match result {
                Ok(cue_clips) => {
                    clips.extend(cue_clips);
                    completed += 1;
                    if let Some(t) = tracker {
                        t.update_counted(completed, total, "cues");
                    }
                }
                Err(e) => {
                    log::error!("Aborting run: {}", e);
                    tasks.abort_all();
                    // Дожидаемся отмены, чтобы файлы задач были удалены
                    while tasks.join_next().await.is_some() {}
                    return Err(e);
                }
            }
        }

        Ok(clips)
    }
}

/// Клипы одного субтитра: пауза (если есть) и подогнанная речь
async fn process_cue(
    synthesizer: &ClipSynthesizer,
    reconciler: &DurationReconciler,
    window: TimelineWindow,
    cue: &Cue,
    language: &Language,
) -> Result<Vec<Clip>> {
    let mut clips = Vec::with_capacity(2);

    if let Some(silence) = synthesizer
        .synthesize_silence(window.silence_position(), window.leading_silence_ms)
        .await?
    {
        clips.push(silence);
    }

    if window.speech_window_ms == 0 {
        log::warn!("Cue {} has no speech window, skipping synthesis", cue.index);
        return Ok(clips);
    }

    let speech = synthesizer
        .synthesize_speech(window.speech_position(), cue, window.speech_window_ms, language)
        .await?;
    let fitted = reconciler.reconcile(speech, window.speech_window_ms).await?;
    clips.push(fitted);

    Ok(clips)
}

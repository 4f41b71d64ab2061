//! Прогресс построения озвучки
//!
//! Этапы конвейера идут в фиксированном порядке, у каждого свой вес.
//! Общий прогресс считается как сумма весов пройденных этапов плюс доля
//! текущего. Уведомления рассылаются наблюдателям через `ProgressReporter`.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Снимок прогресса для наблюдателей
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Название текущего этапа
    pub step: String,
    /// Процент выполнения этапа (0.0 - 100.0)
    pub step_progress: f32,
    /// Процент выполнения всего запуска (0.0 - 100.0)
    pub total_progress: f32,
    /// Пояснение, например `3/10 cues`
    pub details: Option<String>,
}

impl ProgressInfo {
    pub fn new(step: impl Into<String>, step_progress: f32, total_progress: f32, details: Option<String>) -> Self {
        Self {
            step: step.into(),
            step_progress: step_progress.clamp(0.0, 100.0),
            total_progress: total_progress.clamp(0.0, 100.0),
            details,
        }
    }
}

/// Получатель уведомлений о прогрессе
pub trait ProgressObserver: Send + Sync {
    fn on_progress_update(&self, progress: ProgressInfo);
}

/// Рассылка уведомлений наблюдателям
pub trait ProgressReporter: Send + Sync {
    /// Добавить наблюдателя, возвращает его идентификатор
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize;

    /// Удалить наблюдателя по идентификатору
    fn remove_observer(&mut self, id: usize) -> Option<Box<dyn ProgressObserver>>;

    fn notify_progress(&self, progress: ProgressInfo);
}

/// Репортер, уведомляющий наблюдателей в порядке добавления
#[derive(Default)]
pub struct DefaultProgressReporter {
    observers: Vec<(usize, Box<dyn ProgressObserver>)>,
    next_id: usize,
}

impl DefaultProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for DefaultProgressReporter {
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    fn remove_observer(&mut self, id: usize) -> Option<Box<dyn ProgressObserver>> {
        let index = self.observers.iter().position(|(observer_id, _)| *observer_id == id)?;
        Some(self.observers.remove(index).1)
    }

    fn notify_progress(&self, progress: ProgressInfo) {
        for (_, observer) in &self.observers {
            observer.on_progress_update(progress.clone());
        }
    }
}

/// Этапы построения озвучки в порядке выполнения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProcessStep {
    /// Загрузка и проверка таймлайна
    TimelineLoading,
    /// Синтез речи и подгонка длительности
    SpeechSynthesis,
    /// Склейка итоговой дорожки
    TrackAssembly,
    /// Объединение дорожки с видео
    VideoMerge,
}

impl ProcessStep {
    pub const ALL: [ProcessStep; 4] = [
        Self::TimelineLoading,
        Self::SpeechSynthesis,
        Self::TrackAssembly,
        Self::VideoMerge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimelineLoading => "Loading timeline",
            Self::SpeechSynthesis => "Synthesizing speech",
            Self::TrackAssembly => "Assembling track",
            Self::VideoMerge => "Merging video",
        }
    }

    /// Доля этапа в общем прогрессе, в процентах
    pub fn weight(&self) -> f32 {
        match self {
            Self::TimelineLoading => 5.0,
            Self::SpeechSynthesis => 75.0,
            Self::TrackAssembly => 10.0,
            Self::VideoMerge => 10.0,
        }
    }

    /// Суммарный вес этапов, идущих до этого
    fn weight_before(&self) -> f32 {
        Self::ALL
            .iter()
            .take_while(|step| *step != self)
            .map(|step| step.weight())
            .sum()
    }
}

struct TrackerState {
    step: ProcessStep,
    step_progress: f32,
    total_progress: f32,
}

/// Трекер прогресса одного запуска
pub struct ProgressTracker {
    reporter: Option<Box<dyn ProgressReporter>>,
    state: Mutex<TrackerState>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            reporter: None,
            state: Mutex::new(TrackerState {
                step: ProcessStep::TimelineLoading,
                step_progress: 0.0,
                total_progress: 0.0,
            }),
        }
    }

    pub fn with_reporter(reporter: Box<dyn ProgressReporter>) -> Self {
        let mut tracker = Self::new();
        tracker.reporter = Some(reporter);
        tracker
    }

    pub fn set_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        self.reporter = Some(reporter);
    }

    /// Добавить наблюдателя; `None`, если репортер не установлен
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> Option<usize> {
        self.reporter.as_mut().map(|reporter| reporter.add_observer(observer))
    }

    /// Перейти к этапу.
    ///
    /// Пропущенные этапы (например, объединение без видео) засчитываются
    /// при переходе дальше. Повторный переход к текущему этапу игнорируется.
    pub fn set_step(&self, step: ProcessStep) {
        let snapshot = {
            let mut state = self.state.lock();
            if state.step == step {
                return;
            }
            state.step = step;
            state.step_progress = 0.0;
            Self::recalculate(&mut state);
            Self::snapshot(&state, None)
        };
        self.report(snapshot);
    }

    /// Обновить прогресс текущего этапа
    pub fn update_step_progress(&self, progress: f32, details: Option<String>) {
        let snapshot = {
            let mut state = self.state.lock();
            state.step_progress = progress.clamp(0.0, 100.0);
            Self::recalculate(&mut state);
            Self::snapshot(&state, details)
        };
        self.report(snapshot);
    }

    /// Отметить, что готово `done` из `total` элементов этапа
    pub fn update_counted(&self, done: usize, total: usize, unit: &str) {
        let progress = if total == 0 {
            100.0
        } else {
            done as f32 / total as f32 * 100.0
        };
        self.update_step_progress(progress, Some(format!("{}/{} {}", done, total, unit)));
    }

    /// Отметить завершение всего запуска
    pub fn complete(&self) {
        let snapshot = {
            let mut state = self.state.lock();
            state.step_progress = 100.0;
            state.total_progress = 100.0;
            Self::snapshot(&state, Some("Done".to_string()))
        };
        self.report(snapshot);
    }

    pub fn total_progress(&self) -> f32 {
        self.state.lock().total_progress
    }

    fn recalculate(state: &mut TrackerState) {
        let all_weight: f32 = ProcessStep::ALL.iter().map(|s| s.weight()).sum();
        let done = state.step.weight_before() + state.step.weight() * state.step_progress / 100.0;
        // Общий прогресс не уменьшается
        state.total_progress = state.total_progress.max((done / all_weight * 100.0).clamp(0.0, 100.0));
    }

    fn snapshot(state: &TrackerState, details: Option<String>) -> ProgressInfo {
        ProgressInfo::new(state.step.as_str(), state.step_progress, state.total_progress, details)
    }

    // Уведомление отправляется без удержания блокировки
    fn report(&self, progress: ProgressInfo) {
        if let Some(reporter) = &self.reporter {
            reporter.notify_progress(progress);
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Recorder(Arc<Mutex<Vec<ProgressInfo>>>);

    impl ProgressObserver for Recorder {
        fn on_progress_update(&self, progress: ProgressInfo) {
            self.0.lock().push(progress);
        }
    }

    fn tracker() -> (ProgressTracker, Arc<Mutex<Vec<ProgressInfo>>>) {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let mut reporter = DefaultProgressReporter::new();
        reporter.add_observer(Box::new(Recorder(updates.clone())));
        (ProgressTracker::with_reporter(Box::new(reporter)), updates)
    }

    #[test]
    fn test_steps_accumulate_weight() {
        let (tracker, updates) = tracker();

        tracker.update_step_progress(100.0, None);
        tracker.set_step(ProcessStep::SpeechSynthesis);
        tracker.update_counted(1, 2, "cues");

        let updates = updates.lock();
        assert_eq!(updates.len(), 3);
        assert!((updates[1].total_progress - 5.0).abs() < 1e-3);
        assert_eq!(updates[2].step, ProcessStep::SpeechSynthesis.as_str());
        assert_eq!(updates[2].step_progress, 50.0);
        assert!((updates[2].total_progress - 42.5).abs() < 1e-3);
        assert_eq!(updates[2].details.as_deref(), Some("1/2 cues"));
    }

    #[test]
    fn test_same_step_is_not_reported_twice() {
        let (tracker, updates) = tracker();

        tracker.set_step(ProcessStep::TrackAssembly);
        tracker.set_step(ProcessStep::TrackAssembly);

        assert_eq!(updates.lock().len(), 1);
        assert!((tracker.total_progress() - 80.0).abs() < 1e-3);
    }

    #[test]
    fn test_total_never_goes_back() {
        let (tracker, _updates) = tracker();

        tracker.set_step(ProcessStep::TrackAssembly);
        tracker.set_step(ProcessStep::SpeechSynthesis);

        assert!((tracker.total_progress() - 80.0).abs() < 1e-3);
    }

    #[test]
    fn test_complete_reaches_hundred() {
        let (tracker, updates) = tracker();

        tracker.set_step(ProcessStep::TrackAssembly);
        tracker.complete();

        let updates = updates.lock();
        assert_eq!(updates.last().map(|u| u.total_progress), Some(100.0));
        assert_eq!(tracker.total_progress(), 100.0);
    }

    #[test]
    fn test_remove_observer() {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let mut reporter = DefaultProgressReporter::new();
        let id = reporter.add_observer(Box::new(Recorder(updates.clone())));

        assert!(reporter.remove_observer(id).is_some());
        assert!(reporter.remove_observer(id).is_none());
        reporter.notify_progress(ProgressInfo::new("step", 10.0, 10.0, None));

        assert!(updates.lock().is_empty());
    }
}

//! Модуль для анализа временных меток субтитров

use crate::subtitle::windows::TimelineWindow;

/// Метрики таймлайна
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingMetrics {
    /// Количество субтитров
    pub cue_count: usize,
    /// Средняя ширина окна речи (мс)
    pub avg_window_ms: f64,
    /// Минимальная ширина окна речи (мс)
    pub min_window_ms: u64,
    /// Максимальная ширина окна речи (мс)
    pub max_window_ms: u64,
    /// Суммарная длительность тишины (мс)
    pub total_silence_ms: u64,
    /// Количество непустых пауз
    pub gap_count: usize,
}

/// Анализ окон таймлайна
pub fn analyze_windows(windows: &[TimelineWindow]) -> TimingMetrics {
    if windows.is_empty() {
        return TimingMetrics::default();
    }

    let total_window: u64 = windows.iter().map(|w| w.speech_window_ms).sum();

    TimingMetrics {
        cue_count: windows.len(),
        avg_window_ms: total_window as f64 / windows.len() as f64,
        min_window_ms: windows.iter().map(|w| w.speech_window_ms).min().unwrap_or(0),
        max_window_ms: windows.iter().map(|w| w.speech_window_ms).max().unwrap_or(0),
        total_silence_ms: windows.iter().map(|w| w.leading_silence_ms).sum(),
        gap_count: windows.iter().filter(|w| w.leading_silence_ms > 0).count(),
    }
}

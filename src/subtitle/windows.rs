//! Расчет пауз и окон речи
//!
//! Для каждого субтитра вычисляется пауза перед ним и ширина окна,
//! которое должна занять синтезированная речь. Начало таймлайна считается
//! неявным предыдущим субтитром нулевой длины, заканчивающимся в 0.

use crate::subtitle::timeline::Timeline;

/// Пауза и окно речи для одного субтитра
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineWindow {
    /// Позиция субтитра в таймлайне (с 0)
    pub position: usize,
    /// Номер субтитра в исходном файле
    pub cue_index: u32,
    /// Длительность тишины перед субтитром
    pub leading_silence_ms: u64,
    /// Длительность, которую должна занять речь
    pub speech_window_ms: u64,
}

impl TimelineWindow {
    /// Позиция клипа тишины в общем списке сегментов
    pub fn silence_position(&self) -> usize {
        self.position * 2
    }

    /// Позиция клипа речи в общем списке сегментов
    pub fn speech_position(&self) -> usize {
        self.position * 2 + 1
    }

    pub fn total_ms(&self) -> u64 {
        self.leading_silence_ms + self.speech_window_ms
    }
}

/// Рассчитать окна для всех субтитров таймлайна
pub fn compute_windows(timeline: &Timeline) -> Vec<TimelineWindow> {
    let mut cursor = 0u64;

    timeline
        .cues()
        .iter()
        .enumerate()
        .map(|(position, cue)| {
            let leading_silence_ms = cue.start_ms.saturating_sub(cursor);
            let speech_start = cue.start_ms.max(cursor);
            let speech_window_ms = cue.end_ms.saturating_sub(speech_start);
            cursor = cursor.max(cue.end_ms);

            TimelineWindow {
                position,
                cue_index: cue.index,
                leading_silence_ms,
                speech_window_ms,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimelinePolicy;
    use crate::subtitle::timeline::Cue;

    fn timeline(spans: &[(u64, u64)], policy: TimelinePolicy) -> Timeline {
        let cues = spans
            .iter()
            .enumerate()
            .map(|(i, (s, e))| Cue::new(i as u32 + 1, "text", *s, *e))
            .collect();
        Timeline::load(cues, policy).unwrap()
    }

    #[test]
    fn test_first_window_measured_from_zero() {
        let windows = compute_windows(&timeline(&[(1500, 2500)], TimelinePolicy::Strict));

        assert_eq!(windows[0].leading_silence_ms, 1500);
        assert_eq!(windows[0].speech_window_ms, 1000);
    }

    #[test]
    fn test_two_cue_scenario() {
        let windows = compute_windows(&timeline(&[(0, 1000), (2000, 3000)], TimelinePolicy::Strict));

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].leading_silence_ms, 0);
        assert_eq!(windows[0].speech_window_ms, 1000);
        assert_eq!(windows[1].leading_silence_ms, 1000);
        assert_eq!(windows[1].speech_window_ms, 1000);
        assert_eq!(windows[1].silence_position(), 2);
        assert_eq!(windows[1].speech_position(), 3);
    }

    #[test]
    fn test_windows_sum_to_last_end() {
        let spans = [(250, 900), (900, 2100), (4000, 4000), (4100, 7333), (9000, 12001)];
        let tl = timeline(&spans, TimelinePolicy::Strict);

        let total: u64 = compute_windows(&tl).iter().map(|w| w.total_ms()).sum();

        assert_eq!(total, 12001);
        assert_eq!(total, tl.expected_duration_ms());
    }

    #[test]
    fn test_clamped_overlap_keeps_total() {
        let tl = timeline(&[(0, 2000), (1000, 3000), (1500, 2500), (3500, 4000)], TimelinePolicy::Clamp);

        let windows = compute_windows(&tl);
        let total: u64 = windows.iter().map(|w| w.total_ms()).sum();

        assert_eq!(windows[1].leading_silence_ms, 0);
        assert_eq!(windows[1].speech_window_ms, 1000);
        // Полностью вложенный субтитр не получает окна
        assert_eq!(windows[2].speech_window_ms, 0);
        assert_eq!(windows[3].leading_silence_ms, 500);
        assert_eq!(total, 4000);
    }
}

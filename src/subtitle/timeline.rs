//! Модель таймлайна субтитров
//!
//! Таймлайн создается один раз из разобранных субтитров, проверяется
//! и дальше не изменяется.

use serde::{Deserialize, Serialize};
use crate::config::TimelinePolicy;
use crate::error::{Result, SubVoiceError};

/// Один субтитр с временными метками в миллисекундах
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    /// Номер субтитра в исходном файле (с 1)
    pub index: u32,
    /// Текст субтитра
    pub text: String,
    /// Время начала от нуля таймлайна
    pub start_ms: u64,
    /// Время окончания от нуля таймлайна
    pub end_ms: u64,
}

impl Cue {
    /// Создать новый экземпляр Cue
    pub fn new(index: u32, text: impl Into<String>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            index,
            text: text.into(),
            start_ms,
            end_ms,
        }
    }

    /// Ширина окна субтитра
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Дефект таймлайна, допустимый политикой, но требующий внимания
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimelineDefect {
    /// Субтитр нулевой длины: речь для него не синтезируется
    ZeroWidth { index: u32 },
    /// Субтитр начинается раньше, чем закончился предыдущий
    Overlap { index: u32, overlap_ms: u64 },
    /// Субтитр целиком перекрыт предыдущими: окна речи не остается
    Swallowed { index: u32 },
}

/// Проверенная последовательность субтитров
#[derive(Debug, Clone)]
pub struct Timeline {
    cues: Vec<Cue>,
    defects: Vec<TimelineDefect>,
}

impl Timeline {
    /// Загрузить и проверить список субтитров
    pub fn load(cues: Vec<Cue>, policy: TimelinePolicy) -> Result<Self> {
        if cues.is_empty() {
            return Err(SubVoiceError::InvalidTimeline(
                "timeline contains no cues".to_string(),
            ));
        }

        let mut defects = Vec::new();
        let mut cursor = 0u64;
        let mut prev_start = 0u64;

        for (i, cue) in cues.iter().enumerate() {
            if cue.text.trim().is_empty() {
                return Err(SubVoiceError::InvalidTimeline(format!(
                    "cue {} has empty text",
                    cue.index
                )));
            }
            if cue.end_ms < cue.start_ms {
                return Err(SubVoiceError::InvalidTimeline(format!(
                    "cue {} ends ({} ms) before it starts ({} ms)",
                    cue.index, cue.end_ms, cue.start_ms
                )));
            }
            if i > 0 && cue.start_ms < prev_start {
                return Err(SubVoiceError::InvalidTimeline(format!(
                    "cue {} starts at {} ms, before the previous cue ({} ms)",
                    cue.index, cue.start_ms, prev_start
                )));
            }
            if cue.start_ms < cursor {
                let overlap_ms = cursor - cue.start_ms;
                match policy {
                    TimelinePolicy::Strict => {
                        return Err(SubVoiceError::InvalidTimeline(format!(
                            "cue {} overlaps the previous cue by {} ms",
                            cue.index, overlap_ms
                        )));
                    }
                    TimelinePolicy::Clamp => {
                        log::warn!(
                            "Cue {} overlaps the previous cue by {} ms, clamping gap to zero",
                            cue.index,
                            overlap_ms
                        );
                        defects.push(TimelineDefect::Overlap {
                            index: cue.index,
                            overlap_ms,
                        });
                        if cue.end_ms <= cursor && cue.end_ms > cue.start_ms {
                            log::warn!(
                                "Cue {} lies entirely inside the previous cues, it will not be spoken",
                                cue.index
                            );
                            defects.push(TimelineDefect::Swallowed { index: cue.index });
                        }
                    }
                }
            }
            if cue.end_ms == cue.start_ms {
                log::warn!("Cue {} has a zero-width window, speech will be skipped", cue.index);
                defects.push(TimelineDefect::ZeroWidth { index: cue.index });
            }

            prev_start = cue.start_ms;
            cursor = cursor.max(cue.end_ms);
        }

        Ok(Self { cues, defects })
    }

    /// Субтитры в порядке таймлайна
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// Найденные дефекты
    pub fn defects(&self) -> &[TimelineDefect] {
        &self.defects
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Ожидаемая длительность итоговой дорожки.
    ///
    /// Равна самому позднему окончанию субтитра; для строгого таймлайна
    /// это окончание последнего субтитра.
    pub fn expected_duration_ms(&self) -> u64 {
        self.cues.iter().map(|c| c.end_ms).max().unwrap_or(0)
    }
}

//! Клипы: тишина и речь с целевой и фактической длительностью

use std::path::Path;
use crate::error::Result;
use crate::utils::temp::TransientAsset;

/// Тип клипа
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipKind {
    /// Пауза перед субтитром
    Silence,
    /// Речь субтитра с указанным номером
    Speech { cue_index: u32 },
}

/// Клип в списке сегментов
#[derive(Debug)]
pub struct Clip {
    /// Позиция в списке сегментов (2·i для тишины, 2·i + 1 для речи)
    pub position: usize,
    pub kind: ClipKind,
    /// Длительность, которую клип должен занять
    pub target_ms: u64,
    /// Измеренная длительность
    pub actual_ms: u64,
    asset: TransientAsset,
}

impl Clip {
    pub fn new(position: usize, kind: ClipKind, target_ms: u64, actual_ms: u64, asset: TransientAsset) -> Self {
        Self {
            position,
            kind,
            target_ms,
            actual_ms,
            asset,
        }
    }

    /// Путь к аудиофайлу клипа
    pub fn path(&self) -> &Path {
        self.asset.path()
    }

    /// Абсолютное отклонение фактической длительности от целевой
    pub fn drift_ms(&self) -> u64 {
        self.actual_ms.abs_diff(self.target_ms)
    }

    pub fn is_speech(&self) -> bool {
        matches!(self.kind, ClipKind::Speech { .. })
    }

    /// Удалить аудиофайл клипа
    pub fn release(self) -> Result<()> {
        self.asset.release()
    }
}

//! Подгонка длительности речи под окно субтитра
//!
//! Сервис TTS никогда не просят говорить быстрее: клип синтезируется в
//! естественном темпе, а затем один раз перерисовывается с коэффициентом
//! `actual / target` и доводится тишиной или обрезкой до точной длины.

use std::sync::Arc;
use crate::error::{Result, SubVoiceError};
use crate::media::AudioToolkit;
use crate::pipeline::clip::Clip;
use crate::utils::temp::Workspace;

/// Подгонка клипов речи под целевую длительность
#[derive(Clone)]
pub struct DurationReconciler {
    toolkit: Arc<dyn AudioToolkit>,
    workspace: Arc<Workspace>,
    tolerance_ms: u64,
}

impl DurationReconciler {
    pub fn new(toolkit: Arc<dyn AudioToolkit>, workspace: Arc<Workspace>, tolerance_ms: u64) -> Self {
        Self {
            toolkit,
            workspace,
            tolerance_ms,
        }
    }

    /// Привести длительность клипа к `target_ms`.
    ///
    /// При нулевом окне шаг пропускается и клип возвращается без изменений.
    pub async fn reconcile(&self, clip: Clip, target_ms: u64) -> Result<Clip> {
        let position = clip.position;
        let reconcile_error = |cause: String| SubVoiceError::Reconcile { position, cause };

        if target_ms == 0 {
            log::warn!("Clip at position {} has a zero-width window, skipping reconciliation", position);
            return Ok(clip);
        }
        if clip.actual_ms == target_ms {
            return Ok(clip);
        }
        if clip.actual_ms == 0 {
            return Err(reconcile_error("speech clip is empty".to_string()));
        }

        let speed_factor = clip.actual_ms as f64 / target_ms as f64;
        log::debug!(
            "Position {}: {} ms -> {} ms (speed factor {:.3})",
            position,
            clip.actual_ms,
            target_ms,
            speed_factor
        );

        let output = self.workspace.allocate(&format!("fitted_{}", position), "wav");
        self.toolkit
            .adjust_tempo(clip.path(), speed_factor, target_ms, output.path())
            .await
            .map_err(|e| reconcile_error(e.cause_string()))?;

        let actual_ms = self
            .toolkit
            .probe_duration_ms(output.path())
            .await
            .map_err(|e| reconcile_error(e.cause_string()))?;

        if actual_ms.abs_diff(target_ms) > self.tolerance_ms {
            return Err(reconcile_error(format!(
                "adjusted clip lasts {} ms, expected {} ms ± {} ms",
                actual_ms, target_ms, self.tolerance_ms
            )));
        }

        let kind = clip.kind;
        if let Err(e) = clip.release() {
            log::warn!("Failed to remove unadjusted clip at position {}: {}", position, e);
        }

        Ok(Clip::new(position, kind, target_ms, actual_ms, output))
    }
}

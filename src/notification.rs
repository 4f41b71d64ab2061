//! Наблюдатели прогресса: консоль, лог и память

use std::sync::Arc;
use parking_lot::Mutex;
use crate::progress::{ProgressInfo, ProgressObserver};

/// Вывод прогресса в stdout.
///
/// Строка печатается при смене этапа, при появлении пояснения или при
/// росте общего прогресса на целый процент, чтобы не засорять консоль.
pub struct ConsoleProgressObserver {
    prefix: String,
    last: Mutex<Option<(String, u32)>>,
}

impl ConsoleProgressObserver {
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            last: Mutex::new(None),
        }
    }

    /// Нужно ли печатать обновление
    fn should_print(&self, progress: &ProgressInfo) -> bool {
        let percent = progress.total_progress.floor() as u32;
        let mut last = self.last.lock();
        let changed = match last.as_ref() {
            Some((step, last_percent)) => {
                *step != progress.step || percent > *last_percent || progress.details.is_some()
            }
            None => true,
        };
        if changed {
            *last = Some((progress.step.clone(), percent));
        }
        changed
    }
}

impl Default for ConsoleProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ConsoleProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        if !self.should_print(&progress) {
            return;
        }
        match &progress.details {
            Some(details) => println!(
                "{}[{:>5.1}%] {}: {}",
                self.prefix, progress.total_progress, progress.step, details
            ),
            None => println!("{}[{:>5.1}%] {}", self.prefix, progress.total_progress, progress.step),
        }
    }
}

/// Прогресс в лог на уровне debug (режим `--quiet`)
#[derive(Default)]
pub struct LogProgressObserver;

impl ProgressObserver for LogProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        log::debug!(
            "{}: {:.0}% of step, {:.1}% total{}",
            progress.step,
            progress.step_progress,
            progress.total_progress,
            progress.details.map(|d| format!(" ({})", d)).unwrap_or_default()
        );
    }
}

/// Наблюдатель, накапливающий историю обновлений.
///
/// Клоны разделяют одну историю.
#[derive(Clone, Default)]
pub struct MemoryProgressObserver {
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl MemoryProgressObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<ProgressInfo> {
        self.history.lock().clone()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }
}

impl ProgressObserver for MemoryProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        self.history.lock().push(progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_observer_shares_history_between_clones() {
        let observer = MemoryProgressObserver::new();
        let handle = observer.clone();

        observer.on_progress_update(ProgressInfo::new("Synthesizing speech", 50.0, 40.0, None));

        assert_eq!(handle.history().len(), 1);
        handle.clear_history();
        assert!(observer.history().is_empty());
    }

    #[test]
    fn test_console_observer_skips_repeated_percent() {
        let observer = ConsoleProgressObserver::new();

        assert!(observer.should_print(&ProgressInfo::new("Synthesizing speech", 10.0, 12.2, None)));
        assert!(!observer.should_print(&ProgressInfo::new("Synthesizing speech", 11.0, 12.7, None)));
        assert!(observer.should_print(&ProgressInfo::new("Synthesizing speech", 20.0, 13.1, None)));
        assert!(observer.should_print(&ProgressInfo::new("Assembling track", 0.0, 13.1, None)));
        assert!(observer.should_print(&ProgressInfo::new(
            "Assembling track",
            0.0,
            13.1,
            Some("3000 ms".to_string())
        )));
    }
}

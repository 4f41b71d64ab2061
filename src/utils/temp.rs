//! Модуль для работы с временными файлами
//!
//! Каждый запуск получает собственную рабочую директорию, а каждый
//! промежуточный файл получает уникальное имя и удаляется своим владельцем.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use crate::error::Result;

/// Рабочая директория одного запуска
pub struct Workspace {
    /// Временная директория, удаляемая вместе с Workspace
    temp_dir: Option<TempDir>,
    /// Путь к директории
    path: PathBuf,
    /// Нужно ли удалять файлы при завершении
    cleanup: bool,
}

impl Workspace {
    /// Создать рабочую директорию внутри `parent` (или системной temp)
    pub fn new(parent: Option<&Path>, cleanup: bool) -> Result<Self> {
        let parent = match parent {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                dir.to_path_buf()
            }
            None => std::env::temp_dir(),
        };

        if cleanup {
            let temp_dir = tempfile::Builder::new()
                .prefix("subvoice-")
                .tempdir_in(&parent)?;
            let path = temp_dir.path().to_path_buf();
            Ok(Self {
                temp_dir: Some(temp_dir),
                path,
                cleanup,
            })
        } else {
            let path = parent.join(format!("subvoice-{}", uuid::Uuid::new_v4()));
            fs::create_dir_all(&path)?;
            log::info!("Keeping intermediate files in {}", path.display());
            Ok(Self {
                temp_dir: None,
                path,
                cleanup,
            })
        }
    }

    /// Получить путь к рабочей директории
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Выделить новый уникальный файл.
    ///
    /// Сам файл не создается: его пишет внешняя утилита или сервис.
    pub fn allocate(&self, prefix: &str, extension: &str) -> TransientAsset {
        let file_name = format!("{}_{}.{}", prefix, uuid::Uuid::new_v4(), extension);
        TransientAsset {
            path: self.path.join(file_name),
            keep: !self.cleanup,
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(temp_dir) = self.temp_dir.take() {
            if let Err(e) = temp_dir.close() {
                log::warn!("Failed to remove workspace {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Промежуточный файл, принадлежащий одному клипу.
///
/// Удаляется явным `release` или при уничтожении.
#[derive(Debug)]
pub struct TransientAsset {
    path: PathBuf,
    keep: bool,
}

impl TransientAsset {
    /// Получить путь к файлу
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Удалить файл
    pub fn release(mut self) -> Result<()> {
        let result = self.remove();
        self.keep = true;
        result
    }

    fn remove(&self) -> Result<()> {
        if !self.keep && self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl Drop for TransientAsset {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            log::warn!("Failed to remove {}: {}", self.path.display(), e);
        }
    }
}

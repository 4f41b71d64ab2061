//! Модуль для кэширования результатов TTS
//!
//! Синтезированное аудио сохраняется на диск под ключом md5(язык, текст),
//! поэтому повторный запуск на неизменном таймлайне не обращается к сервису.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use crate::config::SubVoiceConfig;
use crate::error::Result;
use crate::tts::{SpeechRequest, SpeechService};

/// Сервис синтеза с дисковым кэшем
pub struct CachedSpeechService {
    /// Реальный сервис синтеза
    inner: Arc<dyn SpeechService>,
    /// Директория для кэша
    cache_dir: PathBuf,
    /// Максимальный размер кэша в байтах
    max_size: Option<u64>,
    /// Блокировка на время очистки кэша
    eviction: Mutex<()>,
}

impl CachedSpeechService {
    /// Создать новый экземпляр кэша
    pub fn new(inner: Arc<dyn SpeechService>, config: &SubVoiceConfig) -> Result<Self> {
        let cache_dir = config.resolved_cache_dir();

        // Создаем директорию для кэша, если она не существует
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)?;
        }

        Ok(Self {
            inner,
            cache_dir,
            max_size: config.max_cache_size,
            eviction: Mutex::new(()),
        })
    }

    /// Путь к файлу кэша для запроса
    pub fn cache_path(&self, request: &SpeechRequest) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{}", cache_key(request), self.inner.extension()))
    }

    /// Очистить кэш
    pub fn clear_cache(&self) -> Result<()> {
        let _guard = self.eviction.lock();
        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    /// Проверить размер кэша и удалить самые старые файлы
    fn enforce_size_limit(&self) -> Result<()> {
        let Some(max_size) = self.max_size else {
            return Ok(());
        };
        let _guard = self.eviction.lock();

        let mut total_size = 0;
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let metadata = entry.metadata()?;
                total_size += metadata.len();
                files.push((entry.path(), metadata.len(), metadata.modified()?));
            }
        }

        if total_size <= max_size {
            return Ok(());
        }

        // Сортируем файлы по времени модификации (от старых к новым)
        files.sort_by(|a, b| a.2.cmp(&b.2));
        for (path, size, _) in files {
            if total_size <= max_size {
                break;
            }
            if fs::remove_file(&path).is_ok() {
                log::debug!("Evicted {} from TTS cache", path.display());
                total_size -= size;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SpeechService for CachedSpeechService {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Bytes> {
        let path = self.cache_path(request);

        if let Ok(bytes) = tokio::fs::read(&path).await {
            if !bytes.is_empty() {
                log::debug!("TTS cache hit: {}", path.display());
                return Ok(Bytes::from(bytes));
            }
        }

        let bytes = self.inner.synthesize(request).await?;

        // Пишем во временный файл и переименовываем, чтобы не оставить обрывок
        let partial = path.with_extension(format!("partial-{}", uuid::Uuid::new_v4()));
        if let Err(e) = write_entry(&partial, &path, &bytes).await {
            log::warn!("Failed to store TTS result in cache: {}", e);
            let _ = tokio::fs::remove_file(&partial).await;
        } else if let Err(e) = self.enforce_size_limit() {
            log::warn!("Failed to enforce TTS cache size: {}", e);
        }

        Ok(bytes)
    }

    fn extension(&self) -> &'static str {
        self.inner.extension()
    }
}

async fn write_entry(partial: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(partial, bytes).await?;
    tokio::fs::rename(partial, path).await?;
    Ok(())
}

/// Генерировать ключ для кэша
fn cache_key(request: &SpeechRequest) -> String {
    let mut hasher = md5::Context::new();
    hasher.consume(request.language.as_str().as_bytes());
    hasher.consume([0u8]);
    hasher.consume(request.text.as_bytes());
    format!("{:x}", hasher.compute())
}

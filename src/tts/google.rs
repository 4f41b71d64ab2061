//! Синтез речи через веб-сервис Google Translate TTS
//!
//! Сервис принимает короткие фрагменты текста, поэтому длинный субтитр
//! разбивается по словам, а полученные MP3 фрагменты склеиваются по порядку.

use std::time::Duration;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::future::try_join_all;
use reqwest::Client;
use crate::config::SubVoiceConfig;
use crate::error::{Result, SubVoiceError};
use crate::tts::{SpeechRequest, SpeechService};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Клиент Google Translate TTS
#[derive(Debug, Clone)]
pub struct GoogleSpeechService {
    client: Client,
    endpoint: String,
    chunk_chars: usize,
}

impl GoogleSpeechService {
    /// Создать клиент согласно конфигурации
    pub fn new(config: &SubVoiceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.tts_endpoint.clone(),
            chunk_chars: config.tts_chunk_chars,
        })
    }

    async fn fetch_chunk(
        &self,
        request: &SpeechRequest,
        chunk: &str,
        idx: usize,
        total: usize,
    ) -> Result<Bytes> {
        let synthesis_error = |cause: String| SubVoiceError::Synthesis {
            language: request.language.to_string(),
            cause,
        };

        let idx_str = idx.to_string();
        let total_str = total.to_string();
        let len_str = chunk.chars().count().to_string();

        log::debug!("Sending TTS request for chunk {}/{} ({} chars)", idx + 1, total, len_str);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", request.language.as_str()),
                ("q", chunk),
                ("idx", idx_str.as_str()),
                ("total", total_str.as_str()),
                ("textlen", len_str.as_str()),
            ])
            .header("Referer", "https://translate.google.com/")
            .send()
            .await
            .map_err(|e| synthesis_error(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = match response.text().await {
                Ok(text) => text,
                Err(e) => format!("Failed to read error response: {}", e),
            };
            log::error!("TTS service error (status {}): {}", status, error_text);
            return Err(synthesis_error(format!("service returned status {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| synthesis_error(format!("failed to read response: {}", e)))?;
        if bytes.is_empty() {
            return Err(synthesis_error("service returned empty audio".to_string()));
        }
        Ok(bytes)
    }
}

#[async_trait]
impl SpeechService for GoogleSpeechService {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Bytes> {
        let chunks = split_text(&request.text, self.chunk_chars);
        if chunks.is_empty() {
            return Err(SubVoiceError::Synthesis {
                language: request.language.to_string(),
                cause: "nothing to synthesize".to_string(),
            });
        }

        let total = chunks.len();
        let parts = try_join_all(
            chunks
                .iter()
                .enumerate()
                .map(|(idx, chunk)| self.fetch_chunk(request, chunk, idx, total)),
        )
        .await?;

        // MP3 фреймы можно склеивать последовательно
        let mut audio = BytesMut::with_capacity(parts.iter().map(|p| p.len()).sum());
        for part in parts {
            audio.extend_from_slice(&part);
        }
        Ok(audio.freeze())
    }
}

/// Разбить текст на фрагменты не длиннее `max_chars` символов.
///
/// Разрыв делается между словами; фрагмент закрывается раньше на конце
/// предложения, если он уже заполнен хотя бы наполовину.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let tail = word.split_off(max_chars);
            chunks.push(word.into_iter().collect());
            word = tail;
        }

        let needed = if current.is_empty() { word.len() } else { current_len + 1 + word.len() };
        if needed > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        let ends_sentence = matches!(word.last(), Some('.' | '!' | '?' | ';' | ':' | '…'));
        current.extend(word);

        if ends_sentence && current_len * 2 >= max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

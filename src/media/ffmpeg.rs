//! Реализация AudioToolkit на базе ffmpeg и ffprobe

use std::io::Write;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use serde::Deserialize;
use crate::config::SubVoiceConfig;
use crate::error::{Result, SubVoiceError};
use crate::media::AudioToolkit;
use crate::utils::process::{resolve_tool, ToolCommand};

/// Границы одного фильтра atempo
const ATEMPO_MIN: f64 = 0.5;
const ATEMPO_MAX: f64 = 2.0;

/// Ответ ffprobe с длительностью контейнера
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Инструменты ffmpeg/ffprobe
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    sample_rate: u32,
}

impl FfmpegToolkit {
    /// Найти ffmpeg и ffprobe согласно конфигурации
    pub fn new(config: &SubVoiceConfig) -> Result<Self> {
        let ffmpeg = resolve_tool("ffmpeg", config.ffmpeg_path.as_deref())?;
        let ffprobe = resolve_tool("ffprobe", config.ffprobe_path.as_deref())?;
        log::debug!("Using {} and {}", ffmpeg.display(), ffprobe.display());

        Ok(Self {
            ffmpeg,
            ffprobe,
            sample_rate: config.sample_rate,
        })
    }

    fn ffmpeg(&self) -> ToolCommand {
        ToolCommand::new(&self.ffmpeg).args(["-hide_banner", "-nostdin", "-loglevel", "error"])
    }

    fn pcm_args(&self) -> Vec<String> {
        vec![
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-c:a".to_string(),
            "pcm_s16le".to_string(),
        ]
    }
}

#[async_trait]
impl AudioToolkit for FfmpegToolkit {
    async fn generate_silence(&self, duration_ms: u64, output: &Path) -> Result<()> {
        self.ffmpeg()
            .args(["-f", "lavfi", "-i"])
            .arg(format!("anullsrc=r={}:cl=mono", self.sample_rate))
            .arg("-t")
            .arg(seconds_arg(duration_ms))
            .args(self.pcm_args())
            .arg("-y")
            .arg(output)
            .run()
            .await?;
        Ok(())
    }

    async fn normalize(&self, input: &Path, output: &Path) -> Result<()> {
        self.ffmpeg()
            .arg("-i")
            .arg(input)
            .arg("-vn")
            .args(self.pcm_args())
            .arg("-y")
            .arg(output)
            .run()
            .await?;
        Ok(())
    }

    async fn probe_duration_ms(&self, input: &Path) -> Result<u64> {
        let stdout = ToolCommand::new(&self.ffprobe)
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
            .arg(input)
            .run()
            .await?;
        parse_probe_duration(&stdout)
    }

    async fn adjust_tempo(
        &self,
        input: &Path,
        speed_factor: f64,
        target_ms: u64,
        output: &Path,
    ) -> Result<()> {
        if !speed_factor.is_finite() || speed_factor <= 0.0 {
            return Err(SubVoiceError::InvalidFormat(format!(
                "speed factor must be positive, got {}",
                speed_factor
            )));
        }

        let filter = format!("{},apad", atempo_chain(speed_factor));
        self.ffmpeg()
            .arg("-i")
            .arg(input)
            .arg("-filter:a")
            .arg(filter)
            .arg("-t")
            .arg(seconds_arg(target_ms))
            .args(self.pcm_args())
            .arg("-y")
            .arg(output)
            .run()
            .await?;
        Ok(())
    }

    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        if inputs.is_empty() {
            return Err(SubVoiceError::InvalidFormat("nothing to concatenate".to_string()));
        }

        // Список файлов для concat demuxer
        let mut list = tempfile::Builder::new()
            .prefix("subvoice-concat-")
            .suffix(".txt")
            .tempfile()?;
        list.write_all(concat_list(inputs).as_bytes())?;
        list.flush()?;

        self.ffmpeg()
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(list.path())
            .args(output_codec_args(output))
            .arg("-y")
            .arg(output)
            .run()
            .await?;
        Ok(())
    }

    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        self.ffmpeg()
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .args([
                "-map", "0:v:0",
                "-map", "1:a:0",
                "-c:v", "copy",
                "-c:a", "aac",
                "-shortest",
                "-y",
            ])
            .arg(output)
            .run()
            .await?;
        Ok(())
    }
}

/// Цепочка фильтров atempo для произвольного коэффициента.
///
/// Один фильтр atempo принимает значения только в диапазоне 0.5..=2.0.
pub fn atempo_chain(speed_factor: f64) -> String {
    let mut remaining = speed_factor;
    let mut stages = Vec::new();

    while remaining > ATEMPO_MAX {
        stages.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        stages.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    stages.push(remaining);

    stages
        .iter()
        .map(|f| format!("atempo={:.6}", f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Содержимое списка для concat demuxer
fn concat_list(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

/// Кодек итоговой дорожки по расширению файла
fn output_codec_args(output: &Path) -> Vec<&'static str> {
    let extension = output
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "wav" => vec!["-c:a", "pcm_s16le"],
        "mp3" => vec!["-c:a", "libmp3lame", "-b:a", "128k"],
        "m4a" | "aac" => vec!["-c:a", "aac", "-b:a", "128k"],
        "ogg" | "opus" => vec!["-c:a", "libopus", "-b:a", "96k"],
        "flac" => vec!["-c:a", "flac"],
        _ => vec![],
    }
}

fn seconds_arg(duration_ms: u64) -> String {
    format!("{}.{:03}", duration_ms / 1000, duration_ms % 1000)
}

fn parse_probe_duration(stdout: &str) -> Result<u64> {
    let probe: ProbeOutput = serde_json::from_str(stdout)?;
    let raw = probe.format.duration.ok_or_else(|| {
        SubVoiceError::InvalidFormat("ffprobe reported no duration".to_string())
    })?;
    let seconds = raw.trim().parse::<f64>().map_err(|_| {
        SubVoiceError::InvalidFormat(format!("Failed to parse media duration: {}", raw))
    })?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(SubVoiceError::InvalidFormat(format!(
            "Invalid media duration: {}",
            raw
        )));
    }
    Ok((seconds * 1000.0).round() as u64)
}

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use env_logger::{Builder, Env};
use log::LevelFilter;

use subvoice::notification::{ConsoleProgressObserver, LogProgressObserver};
use subvoice::progress::{DefaultProgressReporter, ProgressReporter};
use subvoice::{Language, MergeOutcome, MergeRequest, SubVoice, SubVoiceConfig, TimelinePolicy};

/// Код выхода, если дорожка создана, но объединение с видео не удалось
const EXIT_MERGE_FAILED: u8 = 3;

/// subvoice - synchronized voice-over from SRT subtitles
///
/// Every subtitle is spoken inside its own time window; the resulting track
/// lasts exactly as long as the subtitle timeline.
#[derive(Parser, Debug)]
#[command(name = "subvoice")]
#[command(version)]
#[command(about = "Turn SRT subtitles into a synchronized voice-over track", long_about = None)]
struct Args {
    /// Subtitle file in SRT format
    #[arg(value_name = "SUBTITLES")]
    subtitles: PathBuf,

    /// Video to merge the generated track into
    #[arg(value_name = "VIDEO")]
    video: Option<PathBuf>,

    /// Merge the generated audio track with the input video
    #[arg(short, long, requires = "video")]
    merge: bool,

    /// Language code for speech synthesis (defaults to the system locale)
    #[arg(short, long, value_name = "CODE")]
    language: Option<String>,

    /// Output audio track (defaults to <SUBTITLES>.mp3)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Output video when merging (defaults to <SUBTITLES>_voiced.<ext>)
    #[arg(long, value_name = "PATH")]
    video_output: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of subtitles processed concurrently
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Clamp overlapping subtitles instead of rejecting them
    #[arg(long)]
    lax_overlaps: bool,

    /// Do not use the on-disk TTS cache
    #[arg(long)]
    no_cache: bool,

    /// Keep intermediate clips for inspection
    #[arg(long)]
    keep_temp: bool,

    /// Only log, no progress lines on stdout
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Проверка аргументов до начала работы, ничего не записывая на диск
    fn validate(&self) -> std::result::Result<(), clap::Error> {
        let mut cmd = Args::command();
        if !self.subtitles.is_file() {
            return Err(cmd.error(
                ErrorKind::ValueValidation,
                format!("subtitle file not found: {}", self.subtitles.display()),
            ));
        }
        if self.merge {
            if let Some(video) = &self.video {
                if !video.is_file() {
                    return Err(cmd.error(
                        ErrorKind::ValueValidation,
                        format!("video file not found: {}", video.display()),
                    ));
                }
            }
        }
        if let Some(code) = &self.language {
            if let Err(e) = Language::parse(code) {
                return Err(cmd.error(ErrorKind::InvalidValue, e.to_string()));
            }
        }
        if self.jobs == Some(0) {
            return Err(cmd.error(ErrorKind::InvalidValue, "--jobs must be at least 1"));
        }
        Ok(())
    }

    fn track_output(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.subtitles.with_extension("mp3"))
    }

    fn video_output(&self, video: &Path) -> PathBuf {
        if let Some(path) = &self.video_output {
            return path.clone();
        }
        let stem = self
            .subtitles
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        let extension = video
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "mp4".to_string());
        self.subtitles
            .with_file_name(format!("{}_voiced.{}", stem, extension))
    }

    /// Собрать конфигурацию: файл, затем флаги командной строки
    fn build_config(&self) -> Result<SubVoiceConfig> {
        let mut config = match &self.config {
            Some(path) => SubVoiceConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => SubVoiceConfig {
                // Локаль читается один раз, дальше язык передается явно
                language: Language::detect_from_env(),
                ..SubVoiceConfig::default()
            },
        };

        if let Some(code) = &self.language {
            config.language = Language::parse(code)?;
        }
        if let Some(jobs) = self.jobs {
            config.max_concurrent_requests = jobs;
        }
        if self.lax_overlaps {
            config.timeline_policy = TimelinePolicy::Clamp;
        }
        if self.no_cache {
            config.use_caching = false;
        }
        if self.keep_temp {
            config.cleanup_temp_files = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logger() {
    let env = Env::default().filter_or("RUST_LOG", "warn,subvoice=info");

    Builder::from_env(env)
        .filter_module("hyper", LevelFilter::Error)
        .filter_module("reqwest", LevelFilter::Warn)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .init();
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = args.build_config()?;
    log::info!("Using language '{}'", config.language);

    let mut subvoice = SubVoice::new(config).context("failed to initialize")?;

    let mut reporter = DefaultProgressReporter::new();
    if args.quiet {
        reporter.add_observer(Box::new(LogProgressObserver));
    } else {
        reporter.add_observer(Box::new(ConsoleProgressObserver::new()));
    }
    subvoice.set_progress_reporter(Box::new(reporter));

    let merge = match (&args.video, args.merge) {
        (Some(video), true) => Some(MergeRequest {
            video: video.clone(),
            output: args.video_output(video),
        }),
        (Some(video), false) => {
            log::warn!("Ignoring {} (use --merge to merge it)", video.display());
            None
        }
        _ => None,
    };

    let report = subvoice
        .process_srt(&args.subtitles, &args.track_output(), merge)
        .await
        .context("voice-over failed")?;

    for defect in &report.defects {
        log::warn!("Timeline defect: {:?}", defect);
    }
    println!(
        "Audio track: {} ({} ms, {:.1}s elapsed)",
        report.track.path.display(),
        report.track.duration_ms,
        report.elapsed().num_milliseconds() as f64 / 1000.0
    );

    match &report.merge {
        MergeOutcome::NotRequested => Ok(ExitCode::SUCCESS),
        MergeOutcome::Merged(video) => {
            println!("Video: {} ({} ms)", video.path.display(), video.duration_ms);
            Ok(ExitCode::SUCCESS)
        }
        MergeOutcome::Failed(e) => {
            eprintln!("Merge failed: {} (audio track was kept)", e);
            Ok(ExitCode::from(EXIT_MERGE_FAILED))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = args.validate() {
        e.exit();
    }

    init_logger();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

//! Command-line surface.
//!
//! Flags given here overlay the saved configuration for the current run
//! only; nothing is written back. Without a URL or batch file, or with
//! `--interactive`, the prompt session takes over.

use crate::config::{
    AudioFormat, AudioQuality, Config, ConfigStore, ContentType, FileOrganization, VideoFormat,
    VideoQuality,
};
use crate::engine::{Engine, FormatInfo, YtDlpEngine};
use crate::error::{AppError, Result};
use crate::interactive::{InteractiveSession, Prompter};
use crate::logging::Logging;
use crate::orchestrator::{Orchestrator, Overrides};
use crate::output::UrlOverride;
use crate::source::{PlaylistRange, YoutubeOptions};
use clap::Parser;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Download video and audio from YouTube, Niconico, Abema and other sites.
#[derive(Debug, Parser)]
#[command(name = "mediascoop", version, about)]
pub struct Cli {
    /// URL to download
    pub url: Option<String>,

    /// Run the interactive prompt session
    #[arg(short, long)]
    pub interactive: bool,

    /// What to download
    #[arg(short = 't', long = "type", value_enum)]
    pub content_type: Option<ContentType>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output file name, without extension
    #[arg(short, long)]
    pub filename: Option<String>,

    /// Video quality
    #[arg(short, long, value_enum)]
    pub quality: Option<VideoQuality>,

    /// Audio quality
    #[arg(long, value_enum)]
    pub audio_quality: Option<AudioQuality>,

    /// Video container format
    #[arg(long, value_enum)]
    pub video_format: Option<VideoFormat>,

    /// Audio file format
    #[arg(long, value_enum)]
    pub audio_format: Option<AudioFormat>,

    /// Download subtitles
    #[arg(long)]
    pub subtitles: bool,

    /// How to organize downloaded files into directories
    #[arg(long, value_enum)]
    pub organize: Option<FileOrganization>,

    /// Text file with one URL per line
    #[arg(long)]
    pub batch_file: Option<PathBuf>,

    /// List the available formats instead of downloading
    #[arg(long)]
    pub list_formats: bool,

    /// First playlist item to download (1-based)
    #[arg(long, default_value_t = 1)]
    pub playlist_start: usize,

    /// Maximum number of playlist or channel items to download
    #[arg(long)]
    pub max_videos: Option<usize>,

    /// For YouTube videos, also save info JSON, thumbnail and description
    /// files and log the chapter list
    #[arg(long)]
    pub chapters: bool,

    /// Show debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        self.interactive || (self.url.is_none() && self.batch_file.is_none())
    }

    /// Applies the flags that were given on top of `config`.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(content_type) = self.content_type {
            config.content_type = content_type;
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(quality) = self.quality {
            config.video_quality = quality;
        }
        if let Some(quality) = self.audio_quality {
            config.audio_quality = quality;
        }
        if let Some(format) = self.video_format {
            config.video_format = format;
        }
        if let Some(format) = self.audio_format {
            config.audio_format = format;
        }
        if let Some(organize) = self.organize {
            config.file_organization = organize;
        }
        if self.subtitles {
            config.subtitles = true;
        }
        if self.verbose {
            config.verbose = true;
        }
    }

    pub fn youtube_options(&self) -> YoutubeOptions {
        YoutubeOptions {
            playlist: PlaylistRange {
                start: self.playlist_start.max(1),
                max: self.max_videos,
            },
            chapters: self.chapters,
        }
    }

    /// The `--filename` override, which only applies to a single URL.
    fn overrides(&self, urls: &[String]) -> Overrides {
        let mut overrides = Overrides::new();
        if let (Some(filename), [url]) = (&self.filename, urls) {
            overrides.insert(
                url.clone(),
                UrlOverride {
                    filename: Some(filename.clone()),
                    output_dir: None,
                },
            );
        }
        overrides
    }
}

/// Runs the command and reports whether every item succeeded.
///
/// # Errors
/// Returns error if:
/// - The batch file is missing or holds no URLs
/// - The download engine cannot be located or provisioned
/// - The interactive session is interrupted
pub async fn run(cli: Cli, logging: &Logging) -> Result<bool> {
    let mut store = ConfigStore::default();

    if cli.is_interactive() {
        return run_interactive(store, logging).await;
    }

    store.load();
    let mut config = store.into_config();
    cli.apply_to(&mut config);
    logging.set_verbose(config.verbose);

    let urls = match &cli.batch_file {
        Some(path) => {
            let urls = read_urls(path)?;
            if urls.is_empty() {
                return Err(AppError::Batch(format!(
                    "no URLs found in {}",
                    path.display()
                )));
            }
            println!("Read {} URLs from {}", urls.len(), path.display());
            urls
        }
        None => cli.url.iter().cloned().collect(),
    };

    let engine = locate_engine(config.verbose).await?;
    let orchestrator = Orchestrator::new(engine, config).with_youtube_options(cli.youtube_options());

    if cli.list_formats {
        return Ok(list_formats(&orchestrator, &urls).await);
    }

    let report = orchestrator.process_urls(&urls, &cli.overrides(&urls)).await;
    Ok(!report.has_failures())
}

async fn run_interactive(store: ConfigStore, logging: &Logging) -> Result<bool> {
    let stdin = io::stdin();
    let prompter = Prompter::new(stdin.lock(), io::stdout());
    let mut session = InteractiveSession::new(store, prompter, Some(logging));

    let Some(plan) = session.configure()? else {
        return Ok(true);
    };

    let engine = locate_engine(plan.config.verbose).await?;
    let orchestrator = Orchestrator::new(engine, plan.config);
    let report = orchestrator.process_urls(&plan.urls, &plan.overrides).await;

    session.say_goodbye()?;
    Ok(!report.has_failures())
}

async fn locate_engine(verbose: bool) -> Result<Arc<dyn Engine>> {
    let libraries_dir = ConfigStore::default_dir().join("libs");
    let engine = YtDlpEngine::locate(&libraries_dir).await?.with_verbose(verbose);
    info!(path = ?engine.executable().display(), "engine ready");
    Ok(Arc::new(engine))
}

async fn list_formats(orchestrator: &Orchestrator, urls: &[String]) -> bool {
    let mut ok = true;
    for url in urls {
        match orchestrator.fetch_formats(url).await {
            Ok(formats) if formats.is_empty() => println!("No formats found for {}", url),
            Ok(formats) => {
                println!("\nAvailable formats for {}:", url);
                print!("{}", format_table(&formats));
            }
            Err(e) => {
                error!(url, "failed to list formats: {}", e);
                ok = false;
            }
        }
    }
    ok
}

/// Renders formats as a fixed-width table.
pub fn format_table(formats: &[FormatInfo]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:<6} {:<12} {:<6} {:<16} {:<10} {}",
        "ID", "EXT", "RESOLUTION", "FPS", "CODEC", "SIZE", "TYPE"
    );
    let _ = writeln!(out, "{}", "-".repeat(72));

    for format in formats {
        let fps = format
            .fps
            .map(|fps| format!("{}", fps.round()))
            .unwrap_or_else(|| "-".to_string());
        let size = format
            .filesize
            .map(|bytes| format!("{:.1}MiB", bytes as f64 / (1024.0 * 1024.0)))
            .unwrap_or_else(|| "-".to_string());

        let _ = writeln!(
            out,
            "{:<10} {:<6} {:<12} {:<6} {:<16} {:<10} {}",
            format.format_id.as_deref().unwrap_or("-"),
            format.ext.as_deref().unwrap_or("-"),
            format.resolution().as_deref().unwrap_or("-"),
            fps,
            format.codec().unwrap_or("-"),
            size,
            format.stream_type(),
        );
    }
    out
}

/// Reads URLs from a batch file.
///
/// # Format
/// - One URL per line
/// - Empty lines and lines starting with `#` are ignored
/// - Lines are trimmed of whitespace
///
/// # Errors
/// Returns [`AppError::Batch`] if the file cannot be opened or read.
pub fn read_urls(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .map_err(|e| AppError::Batch(format!("cannot open {}: {}", path.display(), e)))?;
    let reader = io::BufReader::new(file);
    let mut urls = Vec::new();

    for line in reader.lines() {
        let line =
            line.map_err(|e| AppError::Batch(format!("cannot read {}: {}", path.display(), e)))?;
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('#') {
            urls.push(trimmed.to_string());
        }
    }

    Ok(urls)
}

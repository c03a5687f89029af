//! The media-extraction engine seam.
//!
//! Sources describe a request as an [`EngineOptions`] bag and hand it to an
//! [`Engine`]. The production engine, [`YtDlpEngine`], runs the yt-dlp
//! executable and reads its metadata back as JSON.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};
use yt_dlp::fetcher::deps::Libraries;
use yt_dlp::Youtube;

/// Subtitle request: manual and automatic captions in the given languages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubtitleOptions {
    pub langs: Vec<String>,
    pub format: String,
}

impl SubtitleOptions {
    pub fn srt(langs: &[String]) -> Self {
        Self {
            langs: langs.to_vec(),
            format: "srt".to_string(),
        }
    }
}

/// Post-download transcode of the audio stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioExtraction {
    pub codec: String,
    pub quality: String,
}

/// Option bag for a single engine call.
///
/// Every field maps onto one yt-dlp switch; unset fields leave the engine's
/// own default in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub format: Option<String>,
    pub output_template: Option<String>,
    pub no_playlist: bool,
    pub playlist_start: Option<usize>,
    pub playlist_end: Option<usize>,
    pub flat_playlist: bool,
    pub merge_output_format: Option<String>,
    pub subtitles: Option<SubtitleOptions>,
    pub extract_audio: Option<AudioExtraction>,
    pub write_info_json: bool,
    pub write_thumbnail: bool,
    pub write_description: bool,
    pub skip_download: bool,
    pub quiet: bool,
}

impl EngineOptions {
    /// Metadata-only request.
    pub fn probe() -> Self {
        Self {
            skip_download: true,
            quiet: true,
            ..Default::default()
        }
    }

    /// Translates the bag into yt-dlp command-line arguments.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        let mut push = |flag: &str, value: Option<String>| {
            args.push(flag.to_string());
            if let Some(value) = value {
                args.push(value);
            }
        };

        if let Some(format) = &self.format {
            push("-f", Some(format.clone()));
        }
        if let Some(template) = &self.output_template {
            push("-o", Some(template.clone()));
        }
        if self.no_playlist {
            push("--no-playlist", None);
        }
        if let Some(start) = self.playlist_start {
            push("--playlist-start", Some(start.to_string()));
        }
        if let Some(end) = self.playlist_end {
            push("--playlist-end", Some(end.to_string()));
        }
        if self.flat_playlist {
            push("--flat-playlist", None);
        }
        if let Some(container) = &self.merge_output_format {
            push("--merge-output-format", Some(container.clone()));
        }
        if let Some(subs) = &self.subtitles {
            push("--write-subs", None);
            push("--write-auto-subs", None);
            push("--sub-langs", Some(subs.langs.join(",")));
            push("--sub-format", Some(subs.format.clone()));
        }
        if let Some(audio) = &self.extract_audio {
            push("--extract-audio", None);
            push("--audio-format", Some(audio.codec.clone()));
            push("--audio-quality", Some(audio.quality.clone()));
        }
        if self.write_info_json {
            push("--write-info-json", None);
        }
        if self.write_thumbnail {
            push("--write-thumbnail", None);
        }
        if self.write_description {
            push("--write-description", None);
        }
        if self.skip_download {
            push("--skip-download", None);
        }
        if self.quiet {
            push("--no-warnings", None);
        }

        args
    }
}

/// Chapter marker from the engine metadata.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Chapter {
    #[serde(default)]
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub title: Option<String>,
}

/// One downloaded file as reported by the engine.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RequestedDownload {
    pub filepath: Option<String>,
    pub ext: Option<String>,
}

/// One available stream format.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FormatInfo {
    pub format_id: Option<String>,
    pub ext: Option<String>,
    pub width: Option<u64>,
    pub height: Option<u64>,
    pub fps: Option<f64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub filesize: Option<u64>,
    pub format_note: Option<String>,
}

impl FormatInfo {
    /// `audio`, `video` or `both`, judged by which codecs are `none`.
    pub fn stream_type(&self) -> &'static str {
        if self.vcodec.as_deref() == Some("none") {
            "audio"
        } else if self.acodec.as_deref() == Some("none") {
            "video"
        } else {
            "both"
        }
    }

    pub fn resolution(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(format!("{w}x{h}")),
            _ => None,
        }
    }

    pub fn codec(&self) -> Option<&str> {
        match self.vcodec.as_deref() {
            Some("none") | None => self.acodec.as_deref(),
            Some(vcodec) => Some(vcodec),
        }
    }
}

/// Subset of the yt-dlp info dict this crate reads.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct InfoDict {
    pub id: Option<String>,
    pub title: Option<String>,
    pub ext: Option<String>,
    #[serde(rename = "_type")]
    pub kind: Option<String>,
    pub webpage_url: Option<String>,
    pub playlist_title: Option<String>,
    pub playlist_index: Option<u64>,
    /// Path the output template resolved to, before post-processing.
    #[serde(rename = "_filename")]
    pub prepared_filename: Option<String>,
    pub filename: Option<String>,
    #[serde(default)]
    pub requested_downloads: Option<Vec<RequestedDownload>>,
    #[serde(default)]
    pub chapters: Option<Vec<Chapter>>,
    #[serde(default)]
    pub entries: Option<Vec<Option<InfoDict>>>,
    #[serde(default)]
    pub formats: Option<Vec<FormatInfo>>,
}

impl InfoDict {
    /// Path derived from the output template, as the engine first reports it.
    pub fn prepared_path(&self) -> Option<PathBuf> {
        self.prepared_filename
            .as_ref()
            .or(self.filename.as_ref())
            .map(PathBuf::from)
    }

    /// Final path of the primary file, falling back to the prepared path.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.requested_downloads
            .iter()
            .flatten()
            .find_map(|download| download.filepath.as_ref())
            .map(PathBuf::from)
            .or_else(|| self.prepared_path())
    }

    /// Resolved playlist entries, skipping unavailable ones.
    pub fn entries(&self) -> impl Iterator<Item = &InfoDict> {
        self.entries.iter().flatten().flatten()
    }

    pub fn chapters(&self) -> &[Chapter] {
        self.chapters.as_deref().unwrap_or_default()
    }

    pub fn formats(&self) -> &[FormatInfo] {
        self.formats.as_deref().unwrap_or_default()
    }
}

/// The external media-extraction service.
///
/// Given a URL and an option bag, the engine downloads (unless
/// `skip_download` is set) and returns the resulting metadata, or fails.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn extract_info(&self, url: &str, options: &EngineOptions) -> Result<InfoDict>;
}

/// Engine backed by the yt-dlp executable.
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    executable: PathBuf,
    ffmpeg: Option<PathBuf>,
    verbose: bool,
}

impl YtDlpEngine {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            ffmpeg: None,
            verbose: false,
        }
    }

    pub fn with_ffmpeg(mut self, ffmpeg: impl Into<PathBuf>) -> Self {
        self.ffmpeg = Some(ffmpeg.into());
        self
    }

    /// Streams the engine's own diagnostics to stderr instead of capturing them.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Finds yt-dlp on `PATH`, or provisions yt-dlp and ffmpeg into
    /// `libraries_dir`.
    #[instrument]
    pub async fn locate(libraries_dir: &Path) -> Result<Self> {
        if let Ok(path) = which::which("yt-dlp") {
            info!(path = ?path.display(), "using system yt-dlp");
            return Ok(Self::new(path));
        }

        let (yt_dlp, ffmpeg) = Self::provision(libraries_dir).await?;
        info!(path = ?yt_dlp.display(), "using provisioned yt-dlp");
        Ok(Self::new(yt_dlp).with_ffmpeg(ffmpeg))
    }

    /// Downloads the yt-dlp and ffmpeg binaries when missing, otherwise
    /// updates the existing yt-dlp in place.
    async fn provision(libraries_dir: &Path) -> Result<(PathBuf, PathBuf)> {
        tokio::fs::create_dir_all(libraries_dir).await?;

        let yt_dlp = libraries_dir.join("yt-dlp");
        let ffmpeg = libraries_dir.join("ffmpeg");

        if !yt_dlp.exists() || !ffmpeg.exists() {
            info!(dir = ?libraries_dir.display(), "fetching yt-dlp and ffmpeg binaries");
            Youtube::with_new_binaries(libraries_dir.to_path_buf(), libraries_dir.to_path_buf())
                .await?;
            return Ok((yt_dlp, ffmpeg));
        }

        let libraries = Libraries::new(yt_dlp.clone(), ffmpeg.clone());
        let youtube = Youtube::new(libraries, libraries_dir.to_path_buf())?;
        if let Err(e) = youtube.update_downloader().await {
            warn!("could not update yt-dlp, keeping current binary: {}", e);
        }

        Ok((yt_dlp, ffmpeg))
    }

    fn command(&self, url: &str, options: &EngineOptions) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(options.to_args()).arg("--dump-single-json");
        if !options.skip_download {
            cmd.arg("--no-simulate");
        }
        if let Some(ffmpeg) = &self.ffmpeg {
            cmd.arg("--ffmpeg-location").arg(ffmpeg);
        }
        cmd.arg("--").arg(url);

        cmd.stdin(Stdio::null()).stdout(Stdio::piped());
        if self.verbose {
            cmd.stderr(Stdio::inherit());
        } else {
            cmd.stderr(Stdio::piped());
        }
        cmd
    }
}

#[async_trait]
impl Engine for YtDlpEngine {
    #[instrument(skip(self, options))]
    async fn extract_info(&self, url: &str, options: &EngineOptions) -> Result<InfoDict> {
        debug!(args = ?options.to_args(), "invoking yt-dlp");

        let output = self.command(url, options).output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("yt-dlp exited without output")
                .to_string();
            return Err(AppError::Engine(format!("{} ({})", message, output.status)));
        }

        let info: InfoDict = serde_json::from_slice(&output.stdout)?;
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bag_has_no_args() {
        assert!(EngineOptions::default().to_args().is_empty());
    }

    #[test]
    fn probe_skips_download() {
        assert_eq!(
            EngineOptions::probe().to_args(),
            vec!["--skip-download", "--no-warnings"]
        );
    }

    #[test]
    fn video_bag_translates_in_order() {
        let opts = EngineOptions {
            format: Some("best".to_string()),
            output_template: Some("out/%(title)s.%(ext)s".to_string()),
            no_playlist: true,
            merge_output_format: Some("mkv".to_string()),
            subtitles: Some(SubtitleOptions::srt(&["en".to_string(), "ja".to_string()])),
            ..Default::default()
        };

        assert_eq!(
            opts.to_args(),
            vec![
                "-f",
                "best",
                "-o",
                "out/%(title)s.%(ext)s",
                "--no-playlist",
                "--merge-output-format",
                "mkv",
                "--write-subs",
                "--write-auto-subs",
                "--sub-langs",
                "en,ja",
                "--sub-format",
                "srt",
            ]
        );
    }

    #[test]
    fn audio_extraction_args() {
        let opts = EngineOptions {
            extract_audio: Some(AudioExtraction {
                codec: "flac".to_string(),
                quality: "96K".to_string(),
            }),
            ..Default::default()
        };
        assert_eq!(
            opts.to_args(),
            vec!["--extract-audio", "--audio-format", "flac", "--audio-quality", "96K"]
        );
    }

    #[test]
    fn playlist_bounds_args() {
        let opts = EngineOptions {
            playlist_start: Some(3),
            playlist_end: Some(7),
            ..Default::default()
        };
        assert_eq!(
            opts.to_args(),
            vec!["--playlist-start", "3", "--playlist-end", "7"]
        );
    }

    #[test]
    fn parses_single_video_info() {
        let json = r#"{
            "id": "jNQXAC9IVRw",
            "title": "Me at the zoo",
            "ext": "mp4",
            "_filename": "downloads/Me at the zoo.webm",
            "filename": "downloads/Me at the zoo.webm",
            "requested_downloads": [{ "filepath": "downloads/Me at the zoo.mp4", "ext": "mp4" }],
            "chapters": [{ "start_time": 0, "end_time": 5.5, "title": "Intro" }],
            "formats": [{ "format_id": "18", "ext": "mp4", "width": 320, "height": 240,
                          "fps": 30, "vcodec": "avc1", "acodec": "mp4a", "filesize": null }],
            "unrelated": { "nested": [1, 2, 3] }
        }"#;

        let info: InfoDict = serde_json::from_str(json).unwrap();
        assert_eq!(info.id.as_deref(), Some("jNQXAC9IVRw"));
        assert_eq!(
            info.prepared_path(),
            Some(PathBuf::from("downloads/Me at the zoo.webm"))
        );
        assert_eq!(
            info.output_path(),
            Some(PathBuf::from("downloads/Me at the zoo.mp4"))
        );
        assert_eq!(info.chapters().len(), 1);
        assert_eq!(info.formats()[0].resolution().as_deref(), Some("320x240"));
        assert_eq!(info.formats()[0].stream_type(), "both");
    }

    #[test]
    fn parses_playlist_with_null_entries() {
        let json = r#"{
            "_type": "playlist",
            "title": "Series",
            "chapters": null,
            "entries": [
                { "id": "a", "_filename": "p/1-a.mp4" },
                null,
                { "id": "b", "_filename": "p/2-b.mp4" }
            ]
        }"#;

        let info: InfoDict = serde_json::from_str(json).unwrap();
        let ids: Vec<_> = info.entries().filter_map(|e| e.id.as_deref()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(info.chapters().is_empty());
        assert_eq!(info.output_path(), None);
    }

    #[test]
    fn format_stream_type() {
        let audio = FormatInfo {
            vcodec: Some("none".to_string()),
            acodec: Some("opus".to_string()),
            ..Default::default()
        };
        assert_eq!(audio.stream_type(), "audio");
        assert_eq!(audio.codec(), Some("opus"));

        let video = FormatInfo {
            vcodec: Some("vp9".to_string()),
            acodec: Some("none".to_string()),
            ..Default::default()
        };
        assert_eq!(video.stream_type(), "video");
        assert_eq!(video.codec(), Some("vp9"));
    }

    #[test]
    fn command_appends_url_after_separator() {
        let engine = YtDlpEngine::new("yt-dlp").with_ffmpeg("/opt/ffmpeg");
        let cmd = engine.command("https://youtu.be/x", &EngineOptions::probe());
        let args: Vec<_> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "--skip-download",
                "--no-warnings",
                "--dump-single-json",
                "--ffmpeg-location",
                "/opt/ffmpeg",
                "--",
                "https://youtu.be/x",
            ]
        );
    }
}

//! Media sources: one implementation per platform behind a single interface.
//!
//! Every source turns a URL (plus an optional file name) into an option bag,
//! hands it to the [`Engine`] and reports where the result landed. Engine
//! failures stop at this boundary: they are logged and become `None`.

use crate::config::{Config, MediaKind};
use crate::engine::{AudioExtraction, Engine, EngineOptions, InfoDict, SubtitleOptions};
use crate::error::{AppError, Result};
use crate::output::{ensure_dir, sanitize_filename};
use crate::platform::Platform;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use url::Url;

const TITLE_TEMPLATE: &str = "%(title)s.%(ext)s";
const PLAYLIST_TEMPLATE: &str = "%(playlist_index)s-%(title)s.%(ext)s";
const SERIES_FALLBACK_DIR: &str = "abema_series";

/// Which [`MediaSource`] implementation handles a URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Video,
    Audio,
    Youtube,
    Abema,
}

impl SourceKind {
    /// Platform-specific source when one exists, the generic one otherwise.
    pub fn select(platform: Platform, kind: MediaKind) -> Self {
        match (kind, platform) {
            (MediaKind::Audio, _) => SourceKind::Audio,
            (MediaKind::Video, Platform::Youtube) => SourceKind::Youtube,
            (MediaKind::Video, Platform::Abema) => SourceKind::Abema,
            (MediaKind::Video, _) => SourceKind::Video,
        }
    }
}

/// Where a successful download ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// A single file.
    File(PathBuf),
    /// One file per resolved playlist entry.
    Files(Vec<PathBuf>),
    /// A directory the engine filled with an unknown set of files.
    Directory(PathBuf),
}

impl DownloadOutcome {
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            DownloadOutcome::File(path) | DownloadOutcome::Directory(path) => vec![path.as_path()],
            DownloadOutcome::Files(paths) => paths.iter().map(PathBuf::as_path).collect(),
        }
    }
}

/// Checks the shared download precondition: a non-empty URL starting with
/// `http://`, `https://` or `www.`.
pub fn validate_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(AppError::InvalidUrl(url.to_string()));
    }
    if !["http://", "https://", "www."]
        .iter()
        .any(|prefix| url.starts_with(prefix))
    {
        return Err(AppError::InvalidUrl(url.to_string()));
    }
    Ok(())
}

/// A download strategy for one kind of URL.
#[async_trait]
pub trait MediaSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Performs the download; errors propagate.
    async fn fetch(&self, url: &str, filename: Option<&str>) -> Result<DownloadOutcome>;

    /// Validates the URL, then fetches. Failures are logged and returned as
    /// `None`; invalid URLs never reach the engine.
    async fn download(&self, url: &str, filename: Option<&str>) -> Option<DownloadOutcome> {
        if let Err(e) = validate_url(url) {
            error!(source = ?self.kind(), "{}", e);
            return None;
        }

        match self.fetch(url, filename).await {
            Ok(outcome) => {
                info!(source = ?self.kind(), url, paths = ?outcome.paths(), "download complete");
                Some(outcome)
            }
            Err(e) => {
                error!(source = ?self.kind(), url, "download failed: {}", e);
                None
            }
        }
    }
}

/// Escapes a user-supplied name for use inside an output template.
fn template_literal(name: &str) -> String {
    sanitize_filename(name).replace('%', "%%")
}

fn template_in(dir: &Path, file: &str) -> String {
    dir.join(file).to_string_lossy().into_owned()
}

/// Video download settings derived from [`Config`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoSettings {
    pub format: String,
    pub container: String,
    pub subtitles: Option<SubtitleOptions>,
    pub quiet: bool,
}

impl VideoSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            format: config.resolve_format(MediaKind::Video),
            container: config.video_format.extension().to_string(),
            subtitles: config
                .subtitles
                .then(|| SubtitleOptions::srt(&config.subtitle_langs)),
            quiet: !config.verbose,
        }
    }
}

/// Generic video download for any site the engine supports.
pub struct VideoSource {
    engine: Arc<dyn Engine>,
    output_dir: PathBuf,
    settings: VideoSettings,
}

impl VideoSource {
    pub fn new(engine: Arc<dyn Engine>, output_dir: PathBuf, settings: VideoSettings) -> Self {
        Self {
            engine,
            output_dir,
            settings,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Format, container and subtitle switches shared by every video request.
    fn base_options(&self) -> EngineOptions {
        EngineOptions {
            format: Some(self.settings.format.clone()),
            merge_output_format: Some(self.settings.container.clone()),
            subtitles: self.settings.subtitles.clone(),
            quiet: self.settings.quiet,
            ..Default::default()
        }
    }

    /// Option bag for a single-video download into the output directory.
    pub fn options(&self, filename: Option<&str>) -> EngineOptions {
        let file = match filename {
            Some(name) => format!("{}.%(ext)s", template_literal(name)),
            None => TITLE_TEMPLATE.to_string(),
        };

        EngineOptions {
            output_template: Some(template_in(&self.output_dir, &file)),
            no_playlist: true,
            ..self.base_options()
        }
    }

    async fn fetch_info(&self, url: &str, options: &EngineOptions) -> Result<(InfoDict, PathBuf)> {
        ensure_dir(&self.output_dir).await?;
        let info = self.engine.extract_info(url, options).await?;
        let path = info
            .output_path()
            .ok_or_else(|| AppError::Engine("engine reported no output path".to_string()))?;
        Ok((info, path))
    }
}

#[async_trait]
impl MediaSource for VideoSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Video
    }

    #[instrument(skip(self))]
    async fn fetch(&self, url: &str, filename: Option<&str>) -> Result<DownloadOutcome> {
        let (_, path) = self.fetch_info(url, &self.options(filename)).await?;
        Ok(DownloadOutcome::File(path))
    }
}

/// Audio download settings derived from [`Config`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioSettings {
    pub codec: String,
    pub bitrate: String,
    pub quiet: bool,
}

impl AudioSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            codec: config.audio_format.extension().to_string(),
            bitrate: config.resolve_format(MediaKind::Audio),
            quiet: !config.verbose,
        }
    }
}

/// Best-audio download followed by a transcode to the configured codec.
pub struct AudioSource {
    engine: Arc<dyn Engine>,
    output_dir: PathBuf,
    settings: AudioSettings,
}

impl AudioSource {
    pub fn new(engine: Arc<dyn Engine>, output_dir: PathBuf, settings: AudioSettings) -> Self {
        Self {
            engine,
            output_dir,
            settings,
        }
    }

    pub fn options(&self, filename: Option<&str>) -> EngineOptions {
        let file = match filename {
            Some(name) => format!("{}.%(ext)s", template_literal(name)),
            None => TITLE_TEMPLATE.to_string(),
        };

        EngineOptions {
            format: Some("bestaudio/best".to_string()),
            output_template: Some(template_in(&self.output_dir, &file)),
            no_playlist: true,
            extract_audio: Some(AudioExtraction {
                codec: self.settings.codec.clone(),
                quality: self.settings.bitrate.clone(),
            }),
            quiet: self.settings.quiet,
            ..Default::default()
        }
    }
}

#[async_trait]
impl MediaSource for AudioSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Audio
    }

    #[instrument(skip(self))]
    async fn fetch(&self, url: &str, filename: Option<&str>) -> Result<DownloadOutcome> {
        ensure_dir(&self.output_dir).await?;
        let info = self.engine.extract_info(url, &self.options(filename)).await?;

        // The prepared path still carries the pre-transcode container.
        let path = info
            .prepared_path()
            .or_else(|| info.output_path())
            .ok_or_else(|| AppError::Engine("engine reported no output path".to_string()))?;

        Ok(DownloadOutcome::File(path.with_extension(&self.settings.codec)))
    }
}

/// Playlist window: 1-based start index and an optional entry cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaylistRange {
    pub start: usize,
    pub max: Option<usize>,
}

impl Default for PlaylistRange {
    fn default() -> Self {
        Self {
            start: 1,
            max: None,
        }
    }
}

impl PlaylistRange {
    /// Last index to fetch (inclusive), if bounded. A window reaching past
    /// `usize::MAX` is unbounded.
    pub fn end(&self) -> Option<usize> {
        self.max
            .filter(|max| *max > 0)
            .and_then(|max| self.start.max(1).checked_add(max - 1))
    }
}

/// YouTube-only behavior toggled from the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct YoutubeOptions {
    pub playlist: PlaylistRange,
    pub chapters: bool,
}

/// Whether a YouTube URL names a playlist or channel rather than a video.
pub fn is_playlist_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    let path = parsed.path();
    if path == "/playlist"
        || ["/channel/", "/c/", "/user/", "/@"]
            .iter()
            .any(|prefix| path.starts_with(prefix))
    {
        return true;
    }

    let is_short_link = parsed
        .host_str()
        .is_some_and(|host| host.eq_ignore_ascii_case("youtu.be"));
    let mut has_list = false;
    let mut has_video = false;
    for (key, _) in parsed.query_pairs() {
        match key.as_ref() {
            "list" => has_list = true,
            "v" => has_video = true,
            _ => {}
        }
    }

    has_list && !has_video && !is_short_link
}

/// `MM:SS`, or `HH:MM:SS` from one hour on.
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

/// YouTube: playlists, channels and chapter metadata on top of [`VideoSource`].
pub struct YoutubeSource {
    video: VideoSource,
    options: YoutubeOptions,
}

impl YoutubeSource {
    pub fn new(video: VideoSource, options: YoutubeOptions) -> Self {
        Self { video, options }
    }

    /// Downloads a playlist window into `<output>/<playlist title>/`.
    ///
    /// Returns the path of every entry the engine resolved.
    #[instrument(skip(self))]
    pub async fn download_playlist(&self, url: &str, range: PlaylistRange) -> Result<Vec<PathBuf>> {
        validate_url(url)?;
        ensure_dir(self.video.output_dir()).await?;

        let template = self
            .video
            .output_dir()
            .join("%(playlist_title)s")
            .join(PLAYLIST_TEMPLATE);
        let options = EngineOptions {
            output_template: Some(template.to_string_lossy().into_owned()),
            playlist_start: Some(range.start.max(1)),
            playlist_end: range.end(),
            ..self.video.base_options()
        };

        let info = self.video.engine.extract_info(url, &options).await?;
        let files: Vec<PathBuf> = info.entries().filter_map(InfoDict::output_path).collect();

        for file in &files {
            debug!(path = ?file.display(), "playlist entry downloaded");
        }
        info!(count = files.len(), "playlist download complete");
        Ok(files)
    }

    /// Downloads the newest uploads of a channel.
    pub async fn download_channel(&self, url: &str, max: Option<usize>) -> Result<Vec<PathBuf>> {
        self.download_playlist(url, PlaylistRange { start: 1, max })
            .await
    }

    /// Downloads one video together with its info JSON, thumbnail and
    /// description, and logs the chapter list.
    #[instrument(skip(self))]
    pub async fn download_with_chapters(&self, url: &str, filename: Option<&str>) -> Result<PathBuf> {
        validate_url(url)?;
        let options = EngineOptions {
            write_info_json: true,
            write_thumbnail: true,
            write_description: true,
            ..self.video.options(filename)
        };

        let (info, path) = self.video.fetch_info(url, &options).await?;

        let chapters = info.chapters();
        if chapters.is_empty() {
            info!("no chapters found");
        } else {
            info!(count = chapters.len(), "chapters found");
            for (i, chapter) in chapters.iter().enumerate() {
                let title = chapter
                    .title
                    .clone()
                    .unwrap_or_else(|| format!("Chapter {}", i + 1));
                info!("  {}. {} - {}", i + 1, title, format_time(chapter.start_time));
            }
        }

        Ok(path)
    }
}

#[async_trait]
impl MediaSource for YoutubeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Youtube
    }

    async fn fetch(&self, url: &str, filename: Option<&str>) -> Result<DownloadOutcome> {
        if is_playlist_url(url) {
            let files = self.download_playlist(url, self.options.playlist).await?;
            return Ok(DownloadOutcome::Files(files));
        }
        if self.options.chapters {
            let path = self.download_with_chapters(url, filename).await?;
            return Ok(DownloadOutcome::File(path));
        }
        self.video.fetch(url, filename).await
    }
}

/// Abema: series pages fan out into a folder named after the series.
pub struct AbemaSource {
    video: VideoSource,
}

impl AbemaSource {
    pub fn new(video: VideoSource) -> Self {
        Self { video }
    }

    /// Series pages live under `/video/title/`; episodes under `/video/episode/`.
    pub fn is_series_url(url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => parsed.path().contains("/video/title/"),
            Err(_) => url.contains("/video/title/"),
        }
    }

    /// Probes the series title, creates its folder, then downloads every
    /// episode into it with one engine call.
    ///
    /// The engine expands the series itself, so only the folder is known
    /// afterwards.
    #[instrument(skip(self))]
    async fn download_series(&self, url: &str, filename: Option<&str>) -> Result<PathBuf> {
        let probe = EngineOptions {
            flat_playlist: true,
            ..EngineOptions::probe()
        };
        let info = self.video.engine.extract_info(url, &probe).await?;

        let title = info.title.as_deref().unwrap_or(SERIES_FALLBACK_DIR);
        let dir_name = match sanitize_filename(title) {
            name if name.is_empty() => SERIES_FALLBACK_DIR.to_string(),
            name => name,
        };
        let series_dir = self.video.output_dir().join(dir_name);
        ensure_dir(&series_dir).await?;
        info!(series = title, dir = ?series_dir.display(), "created series directory");

        let file = match filename {
            Some(name) => format!("{}_%(episode_number)s.%(ext)s", template_literal(name)),
            None => TITLE_TEMPLATE.to_string(),
        };
        let options = EngineOptions {
            output_template: Some(template_in(&series_dir, &file)),
            ..self.video.base_options()
        };

        self.video.engine.extract_info(url, &options).await?;
        info!(series = title, "series download complete");
        Ok(series_dir)
    }
}

#[async_trait]
impl MediaSource for AbemaSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Abema
    }

    async fn fetch(&self, url: &str, filename: Option<&str>) -> Result<DownloadOutcome> {
        if Self::is_series_url(url) {
            let dir = self.download_series(url, filename).await?;
            return Ok(DownloadOutcome::Directory(dir));
        }
        self.video.fetch(url, filename).await
    }
}

/// Builds the source selected by `kind`, writing into `output_dir`.
pub fn build_source(
    kind: SourceKind,
    engine: Arc<dyn Engine>,
    config: &Config,
    output_dir: PathBuf,
    youtube: YoutubeOptions,
) -> Box<dyn MediaSource> {
    let video = || {
        VideoSource::new(
            engine.clone(),
            output_dir.clone(),
            VideoSettings::from_config(config),
        )
    };

    match kind {
        SourceKind::Video => Box::new(video()),
        SourceKind::Audio => Box::new(AudioSource::new(
            engine.clone(),
            output_dir.clone(),
            AudioSettings::from_config(config),
        )),
        SourceKind::Youtube => Box::new(YoutubeSource::new(video(), youtube)),
        SourceKind::Abema => Box::new(AbemaSource::new(video())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Engine that records every call and answers with a canned info dict.
    #[derive(Default)]
    struct FakeEngine {
        calls: Mutex<Vec<(String, EngineOptions)>>,
        response: InfoDict,
        fail: bool,
    }

    impl FakeEngine {
        fn answering(response: InfoDict) -> Arc<Self> {
            Arc::new(Self {
                response,
                ..Default::default()
            })
        }

        fn calls(&self) -> Vec<(String, EngineOptions)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Engine for FakeEngine {
        async fn extract_info(&self, url: &str, options: &EngineOptions) -> Result<InfoDict> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), options.clone()));
            if self.fail {
                return Err(AppError::Engine("HTTP Error 404".to_string()));
            }
            Ok(self.response.clone())
        }
    }

    fn file_info(path: &str) -> InfoDict {
        InfoDict {
            title: Some("Clip".to_string()),
            prepared_filename: Some(path.to_string()),
            ..Default::default()
        }
    }

    fn video_source(engine: Arc<FakeEngine>, dir: &Path) -> VideoSource {
        VideoSource::new(engine, dir.to_path_buf(), VideoSettings::from_config(&Config::default()))
    }

    #[test]
    fn validate_url_prefixes() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("www.example.com").is_ok());
        assert!(matches!(validate_url(""), Err(AppError::InvalidUrl(_))));
        assert!(matches!(validate_url("ftp://x"), Err(AppError::InvalidUrl(_))));
    }

    #[test]
    fn select_by_platform_and_kind() {
        assert_eq!(
            SourceKind::select(Platform::Youtube, MediaKind::Video),
            SourceKind::Youtube
        );
        assert_eq!(
            SourceKind::select(Platform::Abema, MediaKind::Video),
            SourceKind::Abema
        );
        assert_eq!(
            SourceKind::select(Platform::Niconico, MediaKind::Video),
            SourceKind::Video
        );
        assert_eq!(
            SourceKind::select(Platform::Youtube, MediaKind::Audio),
            SourceKind::Audio
        );
    }

    #[test]
    fn playlist_range_end() {
        assert_eq!(PlaylistRange::default().end(), None);
        assert_eq!(PlaylistRange { start: 3, max: Some(5) }.end(), Some(7));
        assert_eq!(PlaylistRange { start: 1, max: Some(0) }.end(), None);
        assert_eq!(PlaylistRange { start: usize::MAX, max: Some(1) }.end(), Some(usize::MAX));
        assert_eq!(PlaylistRange { start: usize::MAX, max: Some(2) }.end(), None);
    }

    #[test]
    fn detects_playlist_urls() {
        assert!(is_playlist_url("https://www.youtube.com/playlist?list=PL123"));
        assert!(is_playlist_url("https://www.youtube.com/@somechannel"));
        assert!(is_playlist_url("https://www.youtube.com/channel/UC123/videos"));
        assert!(!is_playlist_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL123"));
        assert!(!is_playlist_url("https://youtu.be/dQw4w9WgXcQ?list=PL123"));
        assert!(!is_playlist_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
    }

    #[test]
    fn formats_chapter_times() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(75.9), "01:15");
        assert_eq!(format_time(3725.0), "01:02:05");
    }

    #[tokio::test]
    async fn empty_url_never_reaches_engine() {
        let temp = TempDir::new().unwrap();
        let engine = FakeEngine::answering(file_info("x.mp4"));
        let source = video_source(engine.clone(), temp.path());

        assert_eq!(source.download("", None).await, None);
        assert_eq!(source.download("example.com/video", None).await, None);
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn video_download_builds_bag_and_returns_path() {
        let temp = TempDir::new().unwrap();
        let engine = FakeEngine::answering(file_info("out/Clip.mp4"));
        let source = video_source(engine.clone(), &temp.path().join("videos"));

        let outcome = source
            .download("https://example.com/v/1", Some("my clip"))
            .await;
        assert_eq!(outcome, Some(DownloadOutcome::File(PathBuf::from("out/Clip.mp4"))));
        assert!(temp.path().join("videos").is_dir());

        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        let opts = &calls[0].1;
        assert!(opts.no_playlist);
        assert_eq!(opts.format, Some(Config::default().resolve_format(MediaKind::Video)));
        assert!(opts
            .output_template
            .as_deref()
            .unwrap()
            .ends_with("my_clip.%(ext)s"));
        assert_eq!(opts.subtitles, None);
    }

    #[tokio::test]
    async fn engine_failure_becomes_none() {
        let temp = TempDir::new().unwrap();
        let engine = Arc::new(FakeEngine {
            fail: true,
            ..Default::default()
        });
        let source = video_source(engine.clone(), temp.path());

        assert_eq!(source.download("https://example.com/v/1", None).await, None);
        assert_eq!(engine.calls().len(), 1);
    }

    #[tokio::test]
    async fn audio_path_takes_target_extension() {
        let temp = TempDir::new().unwrap();
        let engine = FakeEngine::answering(file_info("music/Song.webm"));
        let config = Config {
            audio_format: crate::config::AudioFormat::Flac,
            audio_quality: crate::config::AudioQuality::Low,
            ..Config::default()
        };
        let source = AudioSource::new(
            engine.clone(),
            temp.path().to_path_buf(),
            AudioSettings::from_config(&config),
        );

        let outcome = source.download("https://youtu.be/dQw4w9WgXcQ", None).await;
        assert_eq!(
            outcome,
            Some(DownloadOutcome::File(PathBuf::from("music/Song.flac")))
        );

        let opts = &engine.calls()[0].1;
        assert_eq!(opts.format.as_deref(), Some("bestaudio/best"));
        assert_eq!(
            opts.extract_audio,
            Some(AudioExtraction {
                codec: "flac".to_string(),
                quality: "96K".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn youtube_playlist_returns_entry_paths() {
        let temp = TempDir::new().unwrap();
        let response = InfoDict {
            entries: Some(vec![
                Some(file_info("p/1-a.mp4")),
                None,
                Some(file_info("p/2-b.mp4")),
            ]),
            ..Default::default()
        };
        let engine = FakeEngine::answering(response);
        let source = YoutubeSource::new(
            video_source(engine.clone(), temp.path()),
            YoutubeOptions {
                playlist: PlaylistRange { start: 2, max: Some(3) },
                chapters: false,
            },
        );

        let outcome = source
            .download("https://www.youtube.com/playlist?list=PL123", None)
            .await;
        assert_eq!(
            outcome,
            Some(DownloadOutcome::Files(vec![
                PathBuf::from("p/1-a.mp4"),
                PathBuf::from("p/2-b.mp4"),
            ]))
        );

        let opts = &engine.calls()[0].1;
        assert_eq!(opts.playlist_start, Some(2));
        assert_eq!(opts.playlist_end, Some(4));
        assert!(!opts.no_playlist);
        assert!(opts
            .output_template
            .as_deref()
            .unwrap()
            .contains("%(playlist_title)s"));
    }

    #[tokio::test]
    async fn chapters_request_side_artifacts_and_keep_path() {
        let temp = TempDir::new().unwrap();
        let mut response = file_info("v/Talk.mp4");
        response.chapters = Some(vec![crate::engine::Chapter {
            start_time: 90.0,
            end_time: None,
            title: Some("Intro".to_string()),
        }]);
        let engine = FakeEngine::answering(response);
        let source = YoutubeSource::new(
            video_source(engine.clone(), temp.path()),
            YoutubeOptions {
                chapters: true,
                ..Default::default()
            },
        );

        let outcome = source
            .download("https://www.youtube.com/watch?v=dQw4w9WgXcQ", None)
            .await;
        assert_eq!(outcome, Some(DownloadOutcome::File(PathBuf::from("v/Talk.mp4"))));

        let opts = &engine.calls()[0].1;
        assert!(opts.write_info_json && opts.write_thumbnail && opts.write_description);
        assert!(opts.no_playlist);
    }

    #[test]
    fn abema_url_kinds() {
        assert!(AbemaSource::is_series_url("https://abema.tv/video/title/26-123"));
        assert!(!AbemaSource::is_series_url("https://abema.tv/video/episode/26-123_s1_p1"));
        assert!(!AbemaSource::is_series_url("https://abema.tv/now-on-air/abema-news"));
    }

    #[tokio::test]
    async fn abema_episode_skips_probe() {
        let temp = TempDir::new().unwrap();
        let engine = FakeEngine::answering(file_info("e/Episode.mp4"));
        let source = AbemaSource::new(video_source(engine.clone(), temp.path()));

        let outcome = source
            .download("https://abema.tv/video/episode/26-123_s1_p1", None)
            .await;
        assert_eq!(outcome, Some(DownloadOutcome::File(PathBuf::from("e/Episode.mp4"))));

        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].1.skip_download);
    }

    #[tokio::test]
    async fn abema_series_probes_then_downloads_into_folder() {
        let temp = TempDir::new().unwrap();
        let engine = FakeEngine::answering(InfoDict {
            title: Some("My Series: Season 1".to_string()),
            ..Default::default()
        });
        let source = AbemaSource::new(video_source(engine.clone(), temp.path()));

        let outcome = source
            .download("https://abema.tv/video/title/26-123", Some("ep"))
            .await;
        let series_dir = temp.path().join("My_Series_Season_1");
        assert_eq!(outcome, Some(DownloadOutcome::Directory(series_dir.clone())));
        assert!(series_dir.is_dir());

        let calls = engine.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].1.skip_download && calls[0].1.flat_playlist);
        assert!(!calls[1].1.skip_download);
        let expected = series_dir
            .join("ep_%(episode_number)s.%(ext)s")
            .to_string_lossy()
            .into_owned();
        assert_eq!(calls[1].1.output_template.as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn build_source_honours_kind() {
        let engine: Arc<dyn Engine> = FakeEngine::answering(InfoDict::default());
        let config = Config::default();
        for kind in [
            SourceKind::Video,
            SourceKind::Audio,
            SourceKind::Youtube,
            SourceKind::Abema,
        ] {
            let source = build_source(
                kind,
                engine.clone(),
                &config,
                PathBuf::from("out"),
                YoutubeOptions::default(),
            );
            assert_eq!(source.kind(), kind);
        }
    }
}

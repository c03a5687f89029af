//! Configuration management for the application.
//!
//! Provides the user settings that drive every download:
//! - Content type and output layout
//! - Video/audio quality and container choices
//! - Per-platform output directories
//! - Persistence to a per-user JSON file

use crate::error::{AppError, Result};
use crate::platform::Platform;
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

const CONFIG_DIR_NAME: &str = ".mediascoop";
const CONFIG_FILE_NAME: &str = "config.json";

/// What a session downloads for each URL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Video,
    Audio,
    Both,
}

impl ContentType {
    /// Media kinds fetched for one URL, in download order.
    pub fn kinds(&self) -> &'static [MediaKind] {
        match self {
            ContentType::Video => &[MediaKind::Video],
            ContentType::Audio => &[MediaKind::Audio],
            ContentType::Both => &[MediaKind::Video, MediaKind::Audio],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::Audio => "audio",
            ContentType::Both => "both",
        }
    }
}

/// A single kind of output file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    /// Subdirectory used when both kinds land under one base directory.
    pub fn dir_name(&self) -> &'static str {
        match self {
            MediaKind::Video => "videos",
            MediaKind::Audio => "audio",
        }
    }
}

/// Video quality tiers keyed by maximum vertical resolution.
///
/// Unrecognized names read from a file or the command line fall back to
/// [`VideoQuality::Best`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(from = "String", into = "String")]
pub enum VideoQuality {
    #[default]
    Best,
    High,
    Medium,
    Low,
    Lowest,
}

impl VideoQuality {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "high" => VideoQuality::High,
            "medium" => VideoQuality::Medium,
            "low" => VideoQuality::Low,
            "lowest" => VideoQuality::Lowest,
            _ => VideoQuality::Best,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoQuality::Best => "best",
            VideoQuality::High => "high",
            VideoQuality::Medium => "medium",
            VideoQuality::Low => "low",
            VideoQuality::Lowest => "lowest",
        }
    }

    fn max_height(&self) -> Option<u32> {
        match self {
            VideoQuality::Best => None,
            VideoQuality::High => Some(1080),
            VideoQuality::Medium => Some(720),
            VideoQuality::Low => Some(480),
            VideoQuality::Lowest => Some(360),
        }
    }

    /// Engine format selector for this tier.
    pub fn selector(&self) -> String {
        match self.max_height() {
            None => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
            Some(h) => format!(
                "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}][ext=mp4]/best[height<={h}]"
            ),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VideoQuality::Best => "best available",
            VideoQuality::High => "high (1080p)",
            VideoQuality::Medium => "medium (720p)",
            VideoQuality::Low => "low (480p)",
            VideoQuality::Lowest => "lowest (360p)",
        }
    }
}

impl From<String> for VideoQuality {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<VideoQuality> for String {
    fn from(quality: VideoQuality) -> Self {
        quality.as_str().to_string()
    }
}

/// Audio quality tiers keyed by bitrate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(from = "String", into = "String")]
pub enum AudioQuality {
    #[default]
    High,
    Medium,
    Low,
}

impl AudioQuality {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "medium" => AudioQuality::Medium,
            "low" => AudioQuality::Low,
            _ => AudioQuality::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioQuality::High => "high",
            AudioQuality::Medium => "medium",
            AudioQuality::Low => "low",
        }
    }

    /// Transcode bitrate handed to the engine.
    pub fn bitrate(&self) -> &'static str {
        match self {
            AudioQuality::High => "192K",
            AudioQuality::Medium => "128K",
            AudioQuality::Low => "96K",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AudioQuality::High => "high (192kbps)",
            AudioQuality::Medium => "medium (128kbps)",
            AudioQuality::Low => "low (96kbps)",
        }
    }
}

impl From<String> for AudioQuality {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<AudioQuality> for String {
    fn from(quality: AudioQuality) -> Self {
        quality.as_str().to_string()
    }
}

/// Container for merged video output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    #[default]
    Mp4,
    Webm,
    Mkv,
}

impl VideoFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "mp4",
            VideoFormat::Webm => "webm",
            VideoFormat::Mkv => "mkv",
        }
    }
}

/// Codec audio is transcoded to after extraction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    M4a,
    Wav,
    Flac,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
        }
    }
}

/// How downloaded files are spread over subdirectories.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileOrganization {
    /// Everything in one directory
    #[default]
    None,
    /// One directory per platform
    Platform,
    /// One directory per file format
    Format,
    /// Platform directories split by file format
    Both,
}

impl FileOrganization {
    pub fn label(&self) -> &'static str {
        match self {
            FileOrganization::None => "single folder",
            FileOrganization::Platform => "by platform",
            FileOrganization::Format => "by file format",
            FileOrganization::Both => "by platform and file format",
        }
    }
}

/// Output directories for one platform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatformDirs {
    pub video: PathBuf,
    pub audio: PathBuf,
}

impl PlatformDirs {
    pub fn dir(&self, kind: MediaKind) -> &Path {
        match kind {
            MediaKind::Video => &self.video,
            MediaKind::Audio => &self.audio,
        }
    }
}

/// User settings for a download session.
///
/// Every field has a default, so a partial file (or an empty one) always
/// yields a complete record.
///
/// # Examples
///
/// ```
/// use mediascoop::Config;
///
/// let config = Config::default();
/// assert_eq!(config.output_dir.to_str(), Some("downloads"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub content_type: ContentType,
    pub output_dir: PathBuf,
    pub video_quality: VideoQuality,
    pub video_format: VideoFormat,
    pub audio_quality: AudioQuality,
    pub audio_format: AudioFormat,
    pub subtitles: bool,
    pub subtitle_langs: Vec<String>,
    pub verbose: bool,
    pub use_original_title: bool,
    pub file_organization: FileOrganization,
    #[serde(deserialize_with = "platform_dirs_lenient")]
    pub platform_dirs: BTreeMap<Platform, PlatformDirs>,
}

/// Reads the platform table, dropping entries whose platform or directories
/// do not parse.
fn platform_dirs_lenient<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<Platform, PlatformDirs>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    let mut dirs = BTreeMap::new();
    for (key, value) in raw {
        let platform = serde_json::from_value::<Platform>(Value::String(key.clone()));
        match (platform, serde_json::from_value::<PlatformDirs>(value)) {
            (Ok(platform), Ok(entry)) => {
                dirs.insert(platform, entry);
            }
            _ => warn!(platform = %key, "ignoring unusable platform directory entry"),
        }
    }
    Ok(dirs)
}

impl Default for Config {
    fn default() -> Self {
        let platform_dirs = Platform::ALL
            .into_iter()
            .map(|platform| {
                let name = match platform {
                    Platform::Unknown => "others",
                    other => other.as_str(),
                };
                let base = PathBuf::from("downloads").join(name);
                let dirs = PlatformDirs {
                    video: base.join("videos"),
                    audio: base.join("audio"),
                };
                (platform, dirs)
            })
            .collect();

        Self {
            content_type: ContentType::Video,
            output_dir: PathBuf::from("downloads"),
            video_quality: VideoQuality::Best,
            video_format: VideoFormat::Mp4,
            audio_quality: AudioQuality::High,
            audio_format: AudioFormat::Mp3,
            subtitles: false,
            subtitle_langs: vec!["en".to_string(), "ja".to_string()],
            verbose: false,
            use_original_title: true,
            file_organization: FileOrganization::None,
            platform_dirs,
        }
    }
}

impl Config {
    /// Returns the stored value for `key`, or `default` when the key is unknown.
    pub fn get(&self, key: &str, default: Value) -> Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|value| value.get(key).cloned())
            .unwrap_or(default)
    }

    /// Replaces one setting in memory.
    ///
    /// Fails for unknown keys and for values that do not fit the setting.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let mut current = serde_json::to_value(&*self)?;
        let map = current
            .as_object_mut()
            .ok_or_else(|| AppError::Config("settings are not an object".to_string()))?;

        if !map.contains_key(key) {
            return Err(AppError::Config(format!("unknown setting: {key}")));
        }
        map.insert(key.to_string(), value);

        *self = serde_json::from_value(current)
            .map_err(|e| AppError::Config(format!("invalid value for {key}: {e}")))?;
        Ok(())
    }

    /// Format selector (video) or bitrate (audio) for the configured quality.
    pub fn resolve_format(&self, kind: MediaKind) -> String {
        match kind {
            MediaKind::Video => self.video_quality.selector(),
            MediaKind::Audio => self.audio_quality.bitrate().to_string(),
        }
    }

    /// Extension of the final file for `kind`.
    pub fn format_extension(&self, kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Video => self.video_format.extension(),
            MediaKind::Audio => self.audio_format.extension(),
        }
    }

    /// Human-readable summary of the current settings.
    pub fn describe(&self) -> String {
        let yes_no = |flag: bool| if flag { "yes" } else { "no" };
        let mut out = String::from("Settings:\n");

        let _ = writeln!(out, "- Content type: {}", self.content_type.as_str());
        let _ = writeln!(out, "- Output directory: {}", self.output_dir.display());
        if self.content_type != ContentType::Audio {
            let _ = writeln!(out, "- Video quality: {}", self.video_quality.label());
            let _ = writeln!(
                out,
                "- Video format: {}",
                self.video_format.extension().to_uppercase()
            );
        }
        if self.content_type != ContentType::Video {
            let _ = writeln!(out, "- Audio quality: {}", self.audio_quality.label());
            let _ = writeln!(
                out,
                "- Audio format: {}",
                self.audio_format.extension().to_uppercase()
            );
        }
        let _ = writeln!(out, "- Subtitles: {}", yes_no(self.subtitles));
        let _ = writeln!(out, "- Use original title: {}", yes_no(self.use_original_title));
        let _ = writeln!(out, "- File organization: {}", self.file_organization.label());
        out
    }
}

/// Format selector for a quality name, falling back to the top tier.
///
/// ```
/// use mediascoop::config::{format_selector, MediaKind};
///
/// assert_eq!(format_selector(MediaKind::Audio, "medium"), "128K");
/// assert_eq!(format_selector(MediaKind::Audio, "ultra"), "192K");
/// ```
pub fn format_selector(kind: MediaKind, quality: &str) -> String {
    match kind {
        MediaKind::Video => VideoQuality::from_name(quality).selector(),
        MediaKind::Audio => AudioQuality::from_name(quality).bitrate().to_string(),
    }
}

/// Settings bound to the file they are persisted in.
#[derive(Debug)]
pub struct ConfigStore {
    config: Config,
    path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::with_path(Self::default_path())
    }
}

impl ConfigStore {
    /// Store with default settings backed by `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config: Config::default(),
            path: path.into(),
        }
    }

    /// `~/.mediascoop/config.json`, or relative to the working directory
    /// when no home directory is known.
    pub fn default_path() -> PathBuf {
        Self::default_dir().join(CONFIG_FILE_NAME)
    }

    /// Per-user directory holding the config file and provisioned binaries.
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    pub fn get(&self, key: &str, default: Value) -> Value {
        self.config.get(key, default)
    }

    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.config.set(key, value)
    }

    /// Overlays the persisted file onto the current settings.
    ///
    /// Returns `false` when the file is missing or unreadable; the current
    /// settings are left untouched in that case.
    pub fn load(&mut self) -> bool {
        if !self.path.exists() {
            debug!(path = ?self.path.display(), "no config file, using defaults");
            return false;
        }

        match self.read_merged() {
            Ok(config) => {
                self.config = config;
                debug!(path = ?self.path.display(), "config loaded");
                true
            }
            Err(e) => {
                error!(path = ?self.path.display(), "failed to load config: {}", e);
                false
            }
        }
    }

    fn read_merged(&self) -> Result<Config> {
        let content = std::fs::read_to_string(&self.path)?;
        let overlay: Value = serde_json::from_str(&content)?;

        let Value::Object(entries) = overlay else {
            return Err(AppError::Config("config file is not a JSON object".to_string()));
        };

        // one key at a time, so a bad value only costs that setting
        let mut config = self.config.clone();
        for (key, value) in entries {
            let mut merged = serde_json::to_value(&config)?;
            let Some(slot) = merged.get_mut(&key) else {
                debug!(%key, "ignoring unknown setting");
                continue;
            };
            merge_json(slot, value);

            match serde_json::from_value(merged) {
                Ok(updated) => config = updated,
                Err(e) => warn!(%key, "ignoring invalid setting: {}", e),
            }
        }
        Ok(config)
    }

    /// Writes every setting to the config file, creating parent directories.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.config)?;
        std::fs::write(&self.path, content).map_err(|e| {
            warn!(path = ?self.path.display(), "failed to save config: {}", e);
            AppError::from(e)
        })?;
        debug!(path = ?self.path.display(), "config saved");
        Ok(())
    }
}

/// Recursively overlays `overlay` onto `base`; objects merge key by key,
/// anything else replaces.
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::with_path(dir.path().join("nested").join("config.json"))
    }

    #[test]
    fn defaults_cover_every_platform() {
        let config = Config::default();
        for platform in Platform::ALL {
            assert!(config.platform_dirs.contains_key(&platform));
        }
        assert_eq!(
            config.platform_dirs[&Platform::Unknown].video,
            PathBuf::from("downloads/others/videos")
        );
    }

    #[test]
    fn resolve_format_medium_video() {
        let config = Config {
            video_quality: VideoQuality::Medium,
            ..Config::default()
        };
        assert_eq!(
            config.resolve_format(MediaKind::Video),
            "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720][ext=mp4]/best[height<=720]"
        );
        assert_eq!(
            format_selector(MediaKind::Video, "medium"),
            config.resolve_format(MediaKind::Video)
        );
    }

    #[test]
    fn unknown_quality_falls_back_to_top_tier() {
        assert_eq!(
            format_selector(MediaKind::Video, "ultra"),
            VideoQuality::Best.selector()
        );
        assert_eq!(format_selector(MediaKind::Audio, "lossless"), "192K");
    }

    #[test]
    fn audio_bitrates() {
        assert_eq!(format_selector(MediaKind::Audio, "high"), "192K");
        assert_eq!(format_selector(MediaKind::Audio, "medium"), "128K");
        assert_eq!(format_selector(MediaKind::Audio, "low"), "96K");
    }

    #[test]
    fn get_returns_value_or_default() {
        let config = Config::default();
        assert_eq!(config.get("audio_format", json!("x")), json!("mp3"));
        assert_eq!(config.get("subtitles", json!(true)), json!(false));
        assert_eq!(config.get("no_such_key", json!(42)), json!(42));
    }

    #[test]
    fn set_updates_known_keys() {
        let mut config = Config::default();
        config.set("video_quality", json!("low")).unwrap();
        config.set("subtitles", json!(true)).unwrap();
        assert_eq!(config.video_quality, VideoQuality::Low);
        assert!(config.subtitles);
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_value() {
        let mut config = Config::default();
        assert!(matches!(
            config.set("colour", json!("blue")),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            config.set("subtitles", json!("maybe")),
            Err(AppError::Config(_))
        ));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_skips_unknown_platform_entries() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            json!({
                "audio_format": "flac",
                "platform_dirs": {
                    "vimeo": { "video": "vm/v", "audio": "vm/a" },
                    "abema": { "video": "ab/v", "audio": "ab/a" }
                }
            })
            .to_string(),
        )
        .unwrap();

        assert!(store.load());
        let config = store.config();
        assert_eq!(config.audio_format, AudioFormat::Flac);
        assert_eq!(config.platform_dirs.len(), Platform::ALL.len());
        assert_eq!(
            config.platform_dirs[&Platform::Abema].audio,
            PathBuf::from("ab/a")
        );
    }

    #[test]
    fn load_keeps_valid_keys_next_to_invalid_ones() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            json!({ "audio_format": "flac", "video_format": "avi", "subtitles": true }).to_string(),
        )
        .unwrap();

        assert!(store.load());
        let config = store.config();
        assert_eq!(config.audio_format, AudioFormat::Flac);
        assert_eq!(config.video_format, VideoFormat::Mp4);
        assert!(config.subtitles);
    }

    #[test]
    fn load_missing_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        assert!(!store.load());
        assert_eq!(store.config(), &Config::default());
    }

    #[test]
    fn load_garbage_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();
        assert!(!store.load());
        assert_eq!(store.config(), &Config::default());
    }

    #[test]
    fn load_overlays_partial_file() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            json!({
                "audio_format": "flac",
                "legacy_flag": true,
                "platform_dirs": { "youtube": { "video": "yt/v", "audio": "yt/a" } }
            })
            .to_string(),
        )
        .unwrap();

        assert!(store.load());
        let config = store.config();
        assert_eq!(config.audio_format, AudioFormat::Flac);
        assert_eq!(config.video_format, VideoFormat::Mp4);
        assert_eq!(
            config.platform_dirs[&Platform::Youtube].video,
            PathBuf::from("yt/v")
        );
        // Nested defaults survive a partial table.
        assert_eq!(
            config.platform_dirs[&Platform::Abema].audio,
            PathBuf::from("downloads/abema/audio")
        );
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.config_mut().content_type = ContentType::Both;
        store.config_mut().output_dir = PathBuf::from("/tmp/media");
        store.config_mut().audio_quality = AudioQuality::Low;
        store.config_mut().file_organization = FileOrganization::Both;
        store.save().unwrap();

        let mut reloaded = store_in(&dir);
        assert!(reloaded.load());
        assert_eq!(reloaded.config(), store.config());

        reloaded.save().unwrap();
        let mut again = store_in(&dir);
        assert!(again.load());
        assert_eq!(again.config(), store.config());
    }

    #[test]
    fn describe_lists_relevant_sections() {
        let audio_only = Config {
            content_type: ContentType::Audio,
            ..Config::default()
        };
        let text = audio_only.describe();
        assert!(text.contains("Audio format: MP3"));
        assert!(!text.contains("Video quality"));
    }

    #[test]
    fn content_type_kinds() {
        assert_eq!(
            ContentType::Both.kinds(),
            &[MediaKind::Video, MediaKind::Audio]
        );
        assert_eq!(ContentType::Audio.kinds(), &[MediaKind::Audio]);
    }
}

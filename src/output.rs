//! Output layout: where files go and what they are called.

use crate::config::{Config, ContentType, FileOrganization, MediaKind};
use crate::error::Result;
use crate::platform::Platform;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static INVALID_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("valid invalid-chars regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Strips characters that are invalid in file names and collapses
/// whitespace runs into a single underscore.
///
/// ```
/// use mediascoop::output::sanitize_filename;
///
/// assert_eq!(sanitize_filename("test/file:name?"), "testfilename");
/// assert_eq!(sanitize_filename("test  file\tname"), "test_file_name");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let stripped = INVALID_CHARS_RE.replace_all(name, "");
    WHITESPACE_RE.replace_all(&stripped, "_").into_owned()
}

/// Creates `dir` and its parents if absent.
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

/// Transient per-URL settings collected during an interactive session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UrlOverride {
    pub filename: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl UrlOverride {
    pub fn is_empty(&self) -> bool {
        self.filename.is_none() && self.output_dir.is_none()
    }
}

/// Directory a file of `kind` from `platform` is written to.
///
/// The per-URL override replaces the global output directory as the base;
/// the platform table is only consulted when no override is present.
pub fn resolve_output_dir(
    config: &Config,
    platform: Platform,
    kind: MediaKind,
    override_dir: Option<&Path>,
) -> PathBuf {
    let base = override_dir.unwrap_or(config.output_dir.as_path());

    let by_platform = || match override_dir {
        Some(dir) => dir.join(platform.as_str()),
        None => config
            .platform_dirs
            .get(&platform)
            .map(|dirs| dirs.dir(kind).to_path_buf())
            .unwrap_or_else(|| base.join(platform.as_str())),
    };

    match config.file_organization {
        FileOrganization::None => match config.content_type {
            ContentType::Both => base.join(kind.dir_name()),
            _ => base.to_path_buf(),
        },
        FileOrganization::Platform => by_platform(),
        FileOrganization::Format => base.join(config.format_extension(kind)),
        FileOrganization::Both => by_platform().join(config.format_extension(kind)),
    }
}

/// File name (without extension) for the `position`-th URL (1-based).
///
/// `None` lets the engine name the file after the source title. A URL with
/// its own output directory never takes the positional fallback; it was
/// configured on its own and keeps the title unless a name was given.
pub fn resolve_filename(
    config: &Config,
    kind: MediaKind,
    position: usize,
    url_override: Option<&UrlOverride>,
) -> Option<String> {
    let override_name = url_override
        .and_then(|o| o.filename.as_deref())
        .filter(|name| !name.trim().is_empty());
    let has_own_dir = url_override.is_some_and(|o| o.output_dir.is_some());

    match override_name {
        Some(name) => Some(name.to_string()),
        None if has_own_dir => None,
        None if !config.use_original_title => Some(format!("{}_{}", kind.as_str(), position)),
        None => None,
    }
}

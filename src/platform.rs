//! URL classification.
//!
//! Maps a URL onto the platform it belongs to and, for YouTube, extracts
//! the video id. Both operations are pure and never fail.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use url::Url;

/// Platform tag derived from the host of a URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Niconico,
    Abema,
    Unknown,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Youtube,
        Platform::Niconico,
        Platform::Abema,
        Platform::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Niconico => "niconico",
            Platform::Abema => "abema",
            Platform::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a URL by inspecting its host, case-insensitively.
///
/// Anything that does not parse as an absolute URL (including scheme-less
/// `www.` URLs) is [`Platform::Unknown`].
pub fn classify(url: &str) -> Platform {
    let host = match Url::parse(url) {
        Ok(parsed) => parsed.host_str().map(str::to_lowercase),
        Err(_) => None,
    };

    let Some(host) = host else {
        return Platform::Unknown;
    };

    if host.contains("youtube") || host.contains("youtu.be") {
        Platform::Youtube
    } else if host.contains("nicovideo") || host.contains("nico.ms") {
        Platform::Niconico
    } else if host.contains("abema") {
        Platform::Abema
    } else {
        Platform::Unknown
    }
}

// Shorts must be tried first: the canonical pattern would otherwise read
// "shorts/xxxx" as an id.
static SHORTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/shorts/([^&=%?]{11})")
        .expect("valid shorts regex")
});

static WATCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.)?(?:youtube|youtu|youtube-nocookie)\.(?:com|be)/(?:watch\?v=|embed/|v/|.+\?v=)?([^&=%?]{11})",
    )
    .expect("valid watch regex")
});

/// Extracts the 11-character YouTube video id, if any.
pub fn extract_video_id(url: &str) -> Option<String> {
    [&*SHORTS_RE, &*WATCH_RE]
        .into_iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

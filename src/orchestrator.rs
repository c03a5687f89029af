use crate::config::{Config, MediaKind};
use crate::engine::{Engine, EngineOptions, FormatInfo};
use crate::error::Result;
use crate::output::{resolve_filename, resolve_output_dir, UrlOverride};
use crate::platform::classify;
use crate::report::DownloadReport;
use crate::source::{build_source, validate_url, DownloadOutcome, SourceKind, YoutubeOptions};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Per-URL overrides collected during a session, keyed by URL.
pub type Overrides = HashMap<String, UrlOverride>;

/// Drives downloads for a list of URLs.
///
/// # Fields
/// * `engine` - Shared handle to the extraction engine
/// * `config` - Settings in effect for this run
/// * `youtube` - Playlist window and chapter switch for YouTube URLs
pub struct Orchestrator {
    engine: Arc<dyn Engine>,
    config: Config,
    youtube: YoutubeOptions,
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn Engine>, config: Config) -> Self {
        Self {
            engine,
            config,
            youtube: YoutubeOptions::default(),
        }
    }

    pub fn with_youtube_options(mut self, youtube: YoutubeOptions) -> Self {
        self.youtube = youtube;
        self
    }

    /// Returns a reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Downloads one URL for every media kind of the configured content type.
    ///
    /// # Arguments
    /// * `position` - 1-based position of the URL in the run, used for fallback names
    /// * `url` - URL to download
    /// * `url_override` - Optional per-URL file name and output directory
    ///
    /// # Returns
    /// One entry per media kind, `None` where that download failed.
    #[instrument(skip(self, url_override))]
    pub async fn process_url(
        &self,
        position: usize,
        url: &str,
        url_override: Option<&UrlOverride>,
    ) -> Vec<(MediaKind, Option<DownloadOutcome>)> {
        let platform = classify(url);
        info!(%platform, "detected platform");

        let override_dir = url_override.and_then(|o| o.output_dir.as_deref());

        let mut results = Vec::new();
        for &kind in self.config.content_type.kinds() {
            let source_kind = SourceKind::select(platform, kind);
            let output_dir = resolve_output_dir(&self.config, platform, kind, override_dir);
            let filename = resolve_filename(&self.config, kind, position, url_override);
            debug!(
                ?source_kind,
                dir = ?output_dir.display(),
                ?filename,
                "resolved download target"
            );

            let source = build_source(
                source_kind,
                self.engine.clone(),
                &self.config,
                output_dir,
                self.youtube,
            );
            let outcome = source.download(url, filename.as_deref()).await;
            if outcome.is_none() {
                warn!(kind = kind.as_str(), "download failed");
            }
            results.push((kind, outcome));
        }
        results
    }

    /// Processes URLs one at a time, in order, never stopping early.
    ///
    /// Prints a status line after each URL and a summary at the end.
    pub async fn process_urls(&self, urls: &[String], overrides: &Overrides) -> DownloadReport {
        let total = urls.len();
        println!("Found {} URLs to download", total);
        let mut report = DownloadReport::new(total);

        for (index, url) in urls.iter().enumerate() {
            let position = index + 1;
            println!("\n[{}/{}] Downloading {}", position, total, url);

            let start = std::time::Instant::now();
            let results = self.process_url(position, url, overrides.get(url)).await;
            let duration = start.elapsed();

            let failed: Vec<&str> = results
                .iter()
                .filter(|(_, outcome)| outcome.is_none())
                .map(|(kind, _)| kind.as_str())
                .collect();

            let failure = if failed.is_empty() {
                println!("URL {} completed in {:.1}s", position, duration.as_secs_f64());
                None
            } else {
                let message = format!("{} download failed", failed.join(" and "));
                eprintln!("Failed to download URL {}: {}", position, message);
                Some(message)
            };
            report.record(url, failure);
            report.print_status();
        }

        report.print_summary();
        report
    }

    /// Lists the formats the engine offers for `url` without downloading.
    pub async fn fetch_formats(&self, url: &str) -> Result<Vec<FormatInfo>> {
        validate_url(url)?;
        let options = EngineOptions {
            no_playlist: true,
            ..EngineOptions::probe()
        };
        let info = self.engine.extract_info(url, &options).await?;
        Ok(info.formats().to_vec())
    }
}

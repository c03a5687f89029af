//! A video and audio downloader for YouTube, Niconico, Abema and any other
//! site the yt-dlp engine supports.
//!
//! URLs are classified by platform, routed to a matching download source
//! and processed one at a time. Settings persist as JSON in the user's home
//! directory and can be overridden per run from the command line or per URL
//! in the interactive session.
//!
//! # Architecture
//!
//! - `Config` / `ConfigStore`: settings and their on-disk record
//! - `Engine`: the yt-dlp boundary, with `YtDlpEngine` as the real one
//! - `MediaSource`: one download strategy per platform
//! - `Orchestrator`: sequential per-URL driver
//! - `DownloadReport`: per-URL tally and summary
//!
//! # Example
//! ```no_run
//! use mediascoop::{ConfigStore, Orchestrator, YtDlpEngine};
//! use std::sync::Arc;
//!
//! async fn example() -> mediascoop::error::Result<()> {
//!     let mut store = ConfigStore::default();
//!     store.load();
//!     let engine = YtDlpEngine::locate(&ConfigStore::default_dir().join("libs")).await?;
//!     let orchestrator = Orchestrator::new(Arc::new(engine), store.into_config());
//!     let urls = vec!["https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()];
//!     let report = orchestrator.process_urls(&urls, &Default::default()).await;
//!     assert!(!report.has_failures());
//!     Ok(())
//! }
//! ```
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod interactive;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod platform;
pub mod report;
pub mod source;

// Re-export commonly used items
pub use config::{Config, ConfigStore};
pub use engine::{Engine, EngineOptions, InfoDict, YtDlpEngine};
pub use error::AppError;
pub use orchestrator::Orchestrator;
pub use platform::{classify, extract_video_id, Platform};
pub use report::DownloadReport;
pub use source::{DownloadOutcome, MediaSource};

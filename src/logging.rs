//! Process-wide logging handle.
//!
//! Created once in `main` and passed to whatever needs to change verbosity.
//! Dropping it flushes the non-blocking stderr writer.

use crate::error::{AppError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

const DEFAULT_LEVEL: &str = "info";
const VERBOSE_LEVEL: &str = "debug";

pub struct Logging {
    _guard: WorkerGuard,
    filter: reload::Handle<EnvFilter, Registry>,
}

impl Logging {
    /// Installs the global subscriber. `RUST_LOG` wins over `verbose` when set.
    pub fn init(verbose: bool) -> Result<Self> {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(verbose));
        let (filter_layer, handle) = reload::Layer::new(filter);

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt::layer().with_writer(non_blocking).with_target(false))
            .try_init()
            .map_err(|e| AppError::Custom(format!("failed to initialize logging: {e}")))?;

        Ok(Self {
            _guard: guard,
            filter: handle,
        })
    }

    /// Switches between debug and info output at runtime.
    pub fn set_verbose(&self, verbose: bool) {
        if let Err(e) = self.filter.reload(level_filter(verbose)) {
            tracing::warn!("failed to change log level: {}", e);
        }
    }
}

fn level_filter(verbose: bool) -> EnvFilter {
    EnvFilter::new(if verbose { VERBOSE_LEVEL } else { DEFAULT_LEVEL })
}

//! Tally of a download run.
//!
//! The orchestrator records one entry per URL; the report renders a
//! one-line status after each entry and a summary listing the failures.

use std::time::{Duration, Instant};

/// One URL that did not download completely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub url: String,
    pub reason: String,
}

/// Tally of one download run.
///
/// # Examples
///
/// ```
/// use mediascoop::DownloadReport;
///
/// let mut report = DownloadReport::new(2);
/// report.record("https://example.com/a", None);
/// report.record("https://example.com/x", Some("video download failed".into()));
/// assert_eq!(report.succeeded(), 1);
/// assert_eq!(report.errors(), 1);
/// ```
#[derive(Debug)]
pub struct DownloadReport {
    total: usize,
    completed: usize,
    failures: Vec<Failure>,
    started: Instant,
}

impl DownloadReport {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            failures: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Counts `url` as processed; `failure` carries the reason when it failed.
    pub fn record(&mut self, url: &str, failure: Option<String>) {
        self.completed += 1;
        if let Some(reason) = failure {
            self.failures.push(Failure {
                url: url.to_string(),
                reason,
            });
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn errors(&self) -> usize {
        self.failures.len()
    }

    pub fn succeeded(&self) -> usize {
        self.completed - self.errors()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// `[done/total] ok N, failed M, about Xs left`, with the remaining time
    /// extrapolated from the average so far.
    pub fn status_line(&self, elapsed: Duration) -> String {
        let remaining = self.total.saturating_sub(self.completed);
        let eta = match self.completed {
            0 => Duration::ZERO,
            done => (elapsed / done as u32) * remaining as u32,
        };

        format!(
            "[{}/{}] ok {}, failed {}, about {:.0}s left",
            self.completed,
            self.total,
            self.succeeded(),
            self.errors(),
            eta.as_secs_f64()
        )
    }

    pub fn print_status(&self) {
        println!("{}", self.status_line(self.started.elapsed()));
    }

    pub fn print_summary(&self) {
        println!("\nDownload Summary:");
        println!("Total time: {:.1}s", self.started.elapsed().as_secs_f64());
        println!("Successfully downloaded: {}", self.succeeded());
        println!("Failed downloads: {}", self.errors());
        for failure in &self.failures {
            println!("  {} ({})", failure.url, failure.reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_successes_and_failures() {
        let mut report = DownloadReport::new(3);
        report.record("https://a.example", None);
        report.record("https://b.example", Some("audio download failed".into()));
        report.record("https://c.example", None);

        assert_eq!(report.completed(), 3);
        assert_eq!(report.errors(), 1);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failures()[0].url, "https://b.example");
        assert!(report.has_failures());
    }

    #[test]
    fn status_line_extrapolates_remaining_time() {
        let mut report = DownloadReport::new(4);
        report.record("https://a.example", None);
        report.record("https://b.example", Some("video download failed".into()));

        assert_eq!(
            report.status_line(Duration::from_secs(10)),
            "[2/4] ok 1, failed 1, about 10s left"
        );
    }

    #[test]
    fn empty_run_has_nothing_left() {
        let report = DownloadReport::new(0);
        assert_eq!(
            report.status_line(Duration::from_secs(3)),
            "[0/0] ok 0, failed 0, about 0s left"
        );
        assert!(!report.has_failures());
    }
}

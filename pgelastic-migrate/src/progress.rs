use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}";

/// Document counters plus a terminal progress bar
pub struct MigrateProgress {
    bar: ProgressBar,
    migrated: AtomicU64,
    failed: AtomicU64,
    start: Instant,
}

impl MigrateProgress {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    /// Counters only, nothing drawn
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);

        Self {
            bar,
            migrated: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    /// Start counting a new index of `total` documents
    pub fn start_index(&self, index: &str, total: u64) {
        self.bar.set_message(index.to_string());
        self.bar.inc_length(total);
    }

    pub fn inc(&self, count: u64) {
        self.migrated.fetch_add(count, Ordering::Relaxed);
        self.bar.inc(count);
    }

    pub fn inc_failed(&self, count: u64) {
        self.failed.fetch_add(count, Ordering::Relaxed);
        self.bar.inc(count);
    }

    pub fn finish(&self) {
        let migrated = self.migrated();
        let failed = self.failed();

        self.bar.finish_with_message(format!(
            "Done! Migrated {} documents in {:.1}s ({} failed)",
            migrated,
            self.start.elapsed().as_secs_f64(),
            failed
        ));
    }

    pub fn migrated(&self) -> u64 {
        self.migrated.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl Default for MigrateProgress {
    fn default() -> Self {
        Self::new()
    }
}

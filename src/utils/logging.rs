use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub struct Logger;

impl Logger {
    pub fn init() {
        tracing_subscriber::fmt()
            .with_env_filter("taba=info")
            .with_target(false)
            .init();
    }

    pub fn build_start(entry: &Path) {
        info!("🔨 Building bundle for {}", entry.display());
    }

    pub fn graph_resolved(file_count: usize) {
        info!("📦 About to compile {} files", file_count);
    }

    pub fn bundle_written(path: &Path, size: usize) {
        info!("✅ Wrote {} ({} bytes)", path.display(), size);
    }

    pub fn run_complete(compiled: usize, elapsed: std::time::Duration) {
        info!("done in {:.0?}", elapsed);
        info!("Actually compiled {} files", compiled);
    }

    pub fn watch_started(entry: &Path) {
        info!("👀 Watching {} - press Ctrl+C to stop", entry.display());
    }

    pub fn watch_stopped() {
        info!("👋 Stopping watch mode");
    }

    pub fn file_changed(path: &Path) {
        info!("🔄 {} changed/removed. Recompiling", path.display());
    }

    pub fn incremental_done(elapsed: std::time::Duration) {
        info!("✅ Incremental compile took {:.0?}", elapsed);
    }

    pub fn rebuild_failed(err: &crate::utils::TabaError) {
        error!("❌ Compilation failed: {}", err);
    }

    pub fn compiling(path: &Path) {
        debug!("⚡ Compiling {}", path.display());
    }

    pub fn warn(msg: &str) {
        warn!("⚠️  {}", msg);
    }

    pub fn error(msg: &str) {
        error!("❌ {}", msg);
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        debug!("⏱️  Starting: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!("⏱️  Completed: {} in {:.2?}", self.name, self.elapsed());
    }
}

//! Subscriber setup for the core.
//!
//! Every platform gets the same filter (`RUST_LOG` when set, otherwise
//! [`DEFAULT_FILTER`]). iOS and desktop hosts also append to `<data_dir>/namu.log`
//! so a shell bug report can attach it; Android relies on logcat.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "namu_core=debug,info";
const LOG_FILE_NAME: &str = "namu.log";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg_attr(target_os = "android", allow(dead_code))]
fn log_file_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join(LOG_FILE_NAME)
}

#[cfg_attr(target_os = "android", allow(dead_code))]
fn open_log_file(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok()?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .ok()
}

/// Installs the global subscriber. Later calls are no-ops, so every `FfiApp::new` may call it.
pub fn init_logging(#[allow(unused)] data_dir: &str) {
    use tracing_subscriber::prelude::*;

    #[cfg(target_os = "android")]
    {
        let _ = tracing_subscriber::registry()
            .with(paranoid_android::layer("namu").with_filter(filter()))
            .try_init();
    }

    #[cfg(not(target_os = "android"))]
    {
        let file_layer = open_log_file(&log_file_path(data_dir)).map(|file| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
        });

        #[cfg(target_os = "ios")]
        let console_layer = tracing_oslog::OsLogger::new("com.wincomi.ios.namuViewer", "default");
        #[cfg(not(target_os = "ios"))]
        let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

        let _ = tracing_subscriber::registry()
            .with(filter())
            .with(console_layer)
            .with(file_layer)
            .try_init();
    }
}

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::settings::{shellexpand_path, Settings};

/// `RPTSOP_LOG` overrides the configured level.
const LOG_ENV: &str = "RPTSOP_LOG";

fn filter(settings: &Settings) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber: stderr by default, or appended to
/// `log_file` when one is configured. A log file that cannot be opened is
/// reported once on stderr and logging stays on stderr.
pub fn init(settings: &Settings) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(settings))
        .with_target(false);

    let mut open_failure = None;
    let file = settings.log_file.as_deref().and_then(|p| {
        let path = PathBuf::from(shellexpand_path(p));
        open_log_file(&path)
            .map_err(|e| open_failure = Some((path, e)))
            .ok()
    });

    // try_init: a second call (tests) keeps the first subscriber
    let _ = match file {
        Some(f) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(f))
            .try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    if let Some((path, e)) = open_failure {
        warn!(path = %path.display(), "cannot open log file, logging to stderr: {e}");
    }
}

//! Session log resource
//!
//! Logging is set up once, explicitly, before the session connects. The
//! returned [`SessionLog`] owns the file writer's guard; dropping it
//! flushes and closes the log file.

use crate::Result;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name stem shared by logs and torque records
pub fn timestamp_stem() -> String {
    Local::now().format("%Y_%m_%d_%H_%M_%S").to_string()
}

/// Handle to the session's log file
pub struct SessionLog {
    path: PathBuf,
    _guard: WorkerGuard,
}

impl SessionLog {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for SessionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLog").field("path", &self.path).finish()
    }
}

/// Create `<directory>/<timestamp>.log` and route tracing output to it and stderr.
///
/// `RUST_LOG` overrides `level` when set. If a global subscriber is already
/// installed, the existing one keeps receiving events and the returned
/// handle only owns the (empty) file.
pub fn init(directory: &Path, level: &str) -> Result<SessionLog> {
    fs::create_dir_all(directory)?;

    let file_name = format!("{}.log", timestamp_stem());
    let path = directory.join(&file_name);
    let appender = tracing_appender::rolling::never(directory, &file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr);

    let file = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer);

    // A subscriber may already be installed (tests, embedding applications)
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init();

    Ok(SessionLog { path, _guard: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = init(&dir.path().join("log"), "info").unwrap();

        assert!(log.path().starts_with(dir.path().join("log")));
        let name = log.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with(".log"));
        // YYYY_mm_dd_HH_MM_SS
        assert_eq!(name.trim_end_matches(".log").len(), 19);

        tracing::info!("written to session log");
        drop(log);
        assert!(dir.path().join("log").join(&name).exists());
    }
}

//! Offline trajectory script player
//!
//! Reads a script one line at a time, dispatching each command before the
//! next line is read. `q` stops playback without reading further.

use crate::{
    driver::Driver,
    interpreter::{parse_script_line, ParsedLine},
    session::Session,
    types::Command,
    Result,
};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// What happened while playing a script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub lines_read: usize,
    pub executed: usize,
    pub skipped: usize,
    pub quit: bool,
}

/// Play the script at `path` against the session
pub async fn play_file<D: Driver>(session: &mut Session<D>, path: &Path) -> Result<PlaybackReport> {
    info!("Replaying trajectory {}", path.display());
    let file = File::open(path).await?;
    play(session, BufReader::new(file)).await
}

/// Play a script from any line source.
///
/// Unknown mode tokens are skipped with a warning. Malformed values and
/// driver failures abort playback and are returned to the caller.
pub async fn play<D, R>(session: &mut Session<D>, reader: R) -> Result<PlaybackReport>
where
    D: Driver,
    R: AsyncBufRead + Unpin,
{
    let mut report = PlaybackReport::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        report.lines_read += 1;
        let line_number = report.lines_read;
        info!("Line {}: {}", line_number, line.trim());

        match parse_script_line(&line, line_number)? {
            ParsedLine::Blank => {}
            ParsedLine::Unknown(mode) => {
                warn!(
                    "Line {}: unknown mode '{}', expected j, l, op, of or q; skipping",
                    line_number, mode
                );
                report.skipped += 1;
            }
            ParsedLine::Command(Command::Quit) => {
                info!("Read 'q', stopping playback");
                report.quit = true;
                break;
            }
            ParsedLine::Command(command) => {
                session.execute(&command)?;
                report.executed += 1;
            }
        }
    }

    info!(
        "Playback finished: {} lines read, {} commands executed, {} skipped",
        report.lines_read, report.executed, report.skipped
    );
    Ok(report)
}

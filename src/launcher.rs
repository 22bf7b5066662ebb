//! Start-up and mode dispatch
//!
//! Performs the complete bring-up sequence:
//! 1. Validate configuration (no driver call on failure)
//! 2. Initialize the driver link, retrying per `connection`
//! 3. Move home and open the gripper
//! 4. Enter the configured run mode

use crate::{
    config::DoosanConfig,
    driver::Driver,
    logging::SessionLog,
    script,
    session::Session,
    terminal::TerminalLoop,
    types::RunMode,
    DoosanError, Result,
};
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{info, warn};

/// Bring a session from construction to `Running(mode)`
pub async fn start<D: Driver>(
    driver: D,
    config: &DoosanConfig,
    log: Option<SessionLog>,
) -> Result<Session<D>> {
    config.validate()?;

    let mut session = Session::from_config(driver, config);
    if let Some(log) = log {
        session = session.with_log(log);
    }

    connect_with_retry(&mut session, config).await?;
    session.home()?;
    session.enter_mode(config.run.mode, config.run.script.as_deref())?;
    info!("Initialized successfully");
    Ok(session)
}

/// Caller-side retry around `initialize`; the session itself never retries
pub async fn connect_with_retry<D: Driver>(
    session: &mut Session<D>,
    config: &DoosanConfig,
) -> Result<()> {
    let attempts = config.connection.retry_attempts.max(1);
    let delay = config.connection.retry_delay()?;

    let mut attempt = 1;
    loop {
        match session.initialize() {
            Ok(()) => return Ok(()),
            Err(e @ DoosanError::Driver { .. }) if attempt < attempts => {
                warn!("Connection attempt {}/{} failed: {}", attempt, attempts, e);
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Run the session's mode to completion, reading terminal input from stdin
pub async fn run_mode<D: Driver>(session: &mut Session<D>, config: &DoosanConfig) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    run_mode_with_input(session, config, stdin).await
}

pub async fn run_mode_with_input<D, R>(
    session: &mut Session<D>,
    config: &DoosanConfig,
    input: R,
) -> Result<()>
where
    D: Driver,
    R: AsyncBufRead + Unpin,
{
    match config.run.mode {
        RunMode::Demo => session.run_demo(),
        RunMode::Terminal => {
            let mut terminal = TerminalLoop::new(std::io::stdout(), &config.motion);
            let report = terminal.run(session, input).await?;
            info!(
                "Terminal mode finished: {} commands, {} ignored entries",
                report.commands, report.ignored
            );
            Ok(())
        }
        RunMode::Offline => {
            let path = config.run.script.as_deref().ok_or_else(|| {
                DoosanError::Config("offline mode requires run.script".to_string())
            })?;
            script::play_file(session, path).await.map(|_| ())
        }
        RunMode::User => {
            info!("User mode: session left under caller control");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverCall, SimDriver};
    use crate::session::SessionState;
    use std::io::Write;

    fn config(mode: RunMode) -> DoosanConfig {
        let mut config = DoosanConfig::new("192.168.5.100");
        config.run.mode = mode;
        config.connection.retry_delay = 0.0;
        config
    }

    #[tokio::test]
    async fn test_start_runs_init_sequence_in_order() {
        let session = start(SimDriver::new(), &config(RunMode::User), None).await.unwrap();
        assert_eq!(session.state(), SessionState::Running(RunMode::User));

        let calls = &session.driver().calls;
        assert_eq!(calls[0], DriverCall::Initialize("192.168.5.100".to_string()));
        assert!(matches!(calls[1], DriverCall::MoveJoint { .. }));
        assert_eq!(calls[2], DriverCall::GripperControl(true));
        assert_eq!(calls.len(), 3);
    }

    #[tokio::test]
    async fn test_offline_without_script_makes_no_driver_calls() {
        let mut sim = SimDriver::new();
        let err = match start(&mut sim, &config(RunMode::Offline), None).await {
            Err(e) => e,
            Ok(_) => panic!("offline mode without a script must not start"),
        };
        assert!(matches!(err, DoosanError::Config(_)));
        assert!(sim.calls.is_empty());
    }

    #[tokio::test]
    async fn test_refused_connection_is_retried_by_caller_policy() {
        let mut config = config(RunMode::User);
        config.connection.retry_attempts = 3;

        let mut sim = SimDriver::new().refusing_connection();
        assert!(matches!(
            start(&mut sim, &config, None).await,
            Err(DoosanError::Driver { operation: "initialize", .. })
        ));
        assert_eq!(sim.count(|c| matches!(c, DriverCall::Initialize(_))), 3);
        // Never connected, so nothing to release
        assert_eq!(sim.count(|c| matches!(c, DriverCall::Disconnect)), 0);
    }

    #[tokio::test]
    async fn test_infinite_retry_delay_fails_before_connecting() {
        let mut config = config(RunMode::User);
        config.connection.retry_delay = f64::INFINITY;

        let mut sim = SimDriver::new();
        assert!(matches!(
            start(&mut sim, &config, None).await,
            Err(DoosanError::Config(_))
        ));
        assert!(sim.calls.is_empty());
    }

    #[tokio::test]
    async fn test_offline_mode_plays_script() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "j, [10, 0, 0, 0, 0, 0], 20, 20").unwrap();
        writeln!(file, "q").unwrap();

        let mut config = config(RunMode::Offline);
        config.run.script = Some(file.path().to_path_buf());

        let mut session = start(SimDriver::new(), &config, None).await.unwrap();
        run_mode_with_input(&mut session, &config, tokio::io::empty()).await.unwrap();
        assert_eq!(session.read_joint().unwrap().0, [10.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_terminal_mode_reads_given_input() {
        let config = config(RunMode::Terminal);
        let mut session = start(SimDriver::new(), &config, None).await.unwrap();

        run_mode_with_input(&mut session, &config, "op\nq\n".as_bytes()).await.unwrap();
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_dropping_started_session_disconnects() {
        let mut sim = SimDriver::new();
        {
            let _session = start(&mut sim, &config(RunMode::User), None).await.unwrap();
        }
        assert_eq!(sim.calls.last(), Some(&DriverCall::Disconnect));
    }
}

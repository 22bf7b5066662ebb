//! Doosan arm controller
//!
//! Brings the arm up (connect, home, enter mode), runs the selected mode
//! and optionally records joint torques before disconnecting.

use anyhow::{Context, Result};
use clap::Parser;
use doosan::{
    config::seconds_to_duration, launcher, logging, Driver, DoosanConfig, NativeDriver, RunMode,
    SimDriver, TorqueRecorder, DEFAULT_CONFIG_PATH,
};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "doosan")]
#[command(about = "Doosan arm controller - demo, terminal and offline trajectory modes")]
#[command(version)]
struct Args {
    /// Path to the controller configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Override the controller address from the config
    #[arg(short, long)]
    address: Option<String>,

    /// Override the native driver library path
    #[arg(long)]
    driver: Option<PathBuf>,

    /// Run mode: demo, terminal, offline or user
    #[arg(short, long)]
    mode: Option<String>,

    /// Trajectory script for offline mode
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Use the in-process simulated driver instead of the native library
    #[arg(long)]
    dry_run: bool,

    /// Record N + 1 torque samples after the mode finishes
    #[arg(long, value_name = "N")]
    record_torques: Option<usize>,

    /// Seconds between torque samples
    #[arg(long, default_value_t = 0.1)]
    interval: f64,

    /// Keep recorded samples and write a plot next to the record file
    #[arg(long)]
    plot: bool,
}

impl Args {
    fn get_config_path(&self) -> String {
        self.config
            .clone()
            .or_else(|| std::env::var("DOOSAN_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    fn load_config(&self) -> Result<DoosanConfig> {
        let config_path = self.get_config_path();

        // A missing config file is fine as long as the address comes from the command line
        let mut config = match (DoosanConfig::load_from_path(&config_path), &self.address) {
            (Ok(config), _) => config,
            (Err(_), Some(address)) if !std::path::Path::new(&config_path).exists() => {
                DoosanConfig::new(address)
            }
            (Err(e), _) => {
                return Err(e).with_context(|| format!("Failed to load config from {}", config_path))
            }
        };

        if let Some(address) = &self.address {
            config.robot.address = address.clone();
        }
        if let Some(driver) = &self.driver {
            config.robot.driver_path = driver.clone();
        }
        if let Some(mode) = &self.mode {
            config.run.mode = mode.parse::<RunMode>().context("Invalid --mode")?;
        }
        if let Some(script) = &self.script {
            config.run.script = Some(script.clone());
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.load_config()?;
    let interval = seconds_to_duration("--interval", args.interval).context("Invalid --interval")?;

    let log = logging::init(&config.logging.directory, &config.logging.level)
        .context("Failed to initialize logging")?;

    info!("Doosan arm controller");
    info!("{}", "=".repeat(50));
    info!("Using config: {}", args.get_config_path());
    info!("Session log: {}", log.path().display());

    let driver: Box<dyn Driver> = if args.dry_run {
        info!("Dry run: using simulated driver");
        Box::new(SimDriver::new())
    } else {
        let driver_path = &config.robot.driver_path;
        Box::new(
            NativeDriver::load(driver_path)
                .with_context(|| format!("Failed to load driver {}", driver_path.display()))?,
        )
    };

    let mut session = match launcher::start(driver, &config, Some(log)).await {
        Ok(session) => session,
        Err(e) => {
            error!("Arm initialization failed: {}", e);
            error!("Make sure:");
            error!("   - The controller is powered and reachable at {}", config.robot.address);
            error!("   - The driver library path is correct");
            return Err(e.into());
        }
    };

    if let Err(e) = launcher::run_mode(&mut session, &config).await {
        error!("{} mode failed: {}", config.run.mode, e);
        session.disconnect().context("Failed during shutdown")?;
        return Err(e.into());
    }

    if let Some(count) = args.record_torques {
        if session.is_connected() {
            let recorder = TorqueRecorder::new(&config.recording.directory);
            match recorder.poll_and_record(&mut session, count, interval, args.plot).await {
                Ok(summary) => {
                    info!(
                        "Recorded {} samples to {}",
                        summary.sample_count,
                        summary.record_path.display()
                    );
                    if let Some(plot) = summary.plot_path {
                        info!("Plot written to {}", plot.display());
                    }
                }
                Err(e) => error!("Torque recording failed: {}", e),
            }
        } else {
            warn!("Session already disconnected, skipping torque recording");
        }
    }

    info!("Performing graceful shutdown");
    session.disconnect().context("Failed during shutdown")?;

    info!("Shutdown complete");
    Ok(())
}

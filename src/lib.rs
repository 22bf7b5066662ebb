//! Doosan - host-side control layer for a 6-axis Doosan arm
//!
//! The arm is driven through the vendor's native motion library. This
//! crate wraps that library behind a typed [`Driver`] boundary and layers
//! a session state machine, a trajectory script interpreter and a torque
//! recorder on top of it.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use doosan::{launcher, DoosanConfig, NativeDriver};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DoosanConfig::load_from_path("config/doosan.yaml")?;
//!     let driver = NativeDriver::load(&config.robot.driver_path)?;
//!
//!     // Connect, home, and enter the configured mode
//!     let mut session = launcher::start(driver, &config, None).await?;
//!     println!("Joints: {}", session.read_joint()?);
//!
//!     session.disconnect()?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Driver**: call boundary to the native library ([`NativeDriver`], [`SimDriver`])
//! - **Session**: connection lifecycle, run modes, motion and readback
//! - **Interpreter**: script line and interactive token parsing
//! - **TorqueRecorder**: periodic torque capture to disk with an optional plot

pub mod config;
pub mod driver;
pub mod error;
pub mod interpreter;
pub mod launcher;
pub mod logging;
pub mod marshal;
pub mod plot;
pub mod recorder;
pub mod script;
pub mod session;
pub mod terminal;
pub mod types;

pub use config::{DoosanConfig, MotionConfig, RobotConfig, DEFAULT_CONFIG_PATH};
pub use driver::{Driver, DriverCall, NativeDriver, SimDriver};
pub use error::{DoosanError, Result};
pub use interpreter::{parse_script_line, InteractiveToken, ParsedLine};
pub use plot::{SvgPlotter, TorquePlotter};
pub use recorder::{RecordingSummary, TorqueRecorder};
pub use script::PlaybackReport;
pub use session::{Session, SessionState};
pub use terminal::{TerminalLoop, TerminalReport};
pub use types::{
    Command, GripperAction, JointVector, MotionParams, PoseVector, RunMode, TorqueSample,
};

//! Session lifecycle for one arm
//!
//! Owns the driver handle and is the only place lifecycle transitions
//! happen:
//!
//! ```text
//! Uninitialized --initialize--> Initialized --home--> Homed --enter_mode--> Running(mode)
//!                                    \                 \                      |
//!                                     +-----------------+------disconnect-----+--> Disconnected
//! ```
//!
//! Motion and readback calls are rejected unless the session is `Homed`
//! or `Running`. Driver failures are surfaced as-is; the session never
//! retries and never rolls back.

use crate::{
    config::{DoosanConfig, MotionConfig},
    driver::{status_ok, Driver},
    logging::SessionLog,
    marshal,
    types::{Command, GripperAction, JointVector, PoseVector, RunMode},
    DoosanError, Result,
};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Joint targets visited by each demo round
pub const DEMO_WAYPOINTS: [[f64; 6]; 4] = [
    [0.0, 0.0, 90.0, 90.0, 0.0, 0.0],
    [0.0, 0.0, 90.0, 90.0, 90.0, 0.0],
    [0.0, 0.0, 90.0, 90.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
];
pub const DEMO_ROUNDS: usize = 10;
const DEMO_SPEED: f64 = 10.0;

/// Lifecycle state of a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Homed,
    Running(RunMode),
    Disconnected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::Initialized => write!(f, "initialized"),
            SessionState::Homed => write!(f, "homed"),
            SessionState::Running(mode) => write!(f, "running ({} mode)", mode),
            SessionState::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Connection to one arm through a [`Driver`]
pub struct Session<D: Driver> {
    address: String,
    home: JointVector,
    motion: MotionConfig,
    driver: D,
    state: SessionState,
    // Dropped after the driver disconnects so the final lines reach the file
    log: Option<SessionLog>,
}

impl<D: Driver> Session<D> {
    pub fn new(driver: D, address: &str, home: JointVector) -> Self {
        Self {
            address: address.to_string(),
            home,
            motion: MotionConfig::default(),
            driver,
            state: SessionState::Uninitialized,
            log: None,
        }
    }

    pub fn from_config(driver: D, config: &DoosanConfig) -> Self {
        Self::new(driver, &config.robot.address, JointVector(config.robot.home))
            .with_motion(config.motion.clone())
    }

    pub fn with_motion(mut self, motion: MotionConfig) -> Self {
        self.motion = motion;
        self
    }

    /// Hand the log resource to the session so it lives exactly as long
    pub fn with_log(mut self, log: SessionLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn home_position(&self) -> &JointVector {
        &self.home
    }

    pub fn motion(&self) -> &MotionConfig {
        &self.motion
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(|log| log.path())
    }

    /// Whether the driver link is live and must be released
    pub fn is_connected(&self) -> bool {
        matches!(
            self.state,
            SessionState::Initialized | SessionState::Homed | SessionState::Running(_)
        )
    }

    fn state_error(&self, operation: &'static str) -> DoosanError {
        DoosanError::State {
            operation,
            state: self.state.to_string(),
        }
    }

    pub(crate) fn require_ready(&self, operation: &'static str) -> Result<()> {
        match self.state {
            SessionState::Homed | SessionState::Running(_) => Ok(()),
            _ => Err(self.state_error(operation)),
        }
    }

    /// Connect to the arm at the configured address
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != SessionState::Uninitialized {
            return Err(self.state_error("initialize"));
        }
        if self.address.is_empty() {
            return Err(DoosanError::Argument("robot address must not be empty".to_string()));
        }

        info!("Connecting to arm at {}", self.address);
        if !self.driver.initialize(self.address.as_bytes()) {
            return Err(DoosanError::Driver {
                operation: "initialize",
                status: 0,
            });
        }

        self.state = SessionState::Initialized;
        info!("Connected to arm at {}", self.address);
        info!("Home position: {} (joint angles)", self.home);
        Ok(())
    }

    /// Move to the home position and open the gripper
    pub fn home(&mut self) -> Result<()> {
        if !matches!(self.state, SessionState::Initialized | SessionState::Homed) {
            return Err(self.state_error("home"));
        }

        let home = self.home;
        let (velocity, acceleration) = (self.motion.home_velocity, self.motion.home_acceleration);
        self.drive_joint(home.as_slice(), velocity, acceleration)?;
        self.drive_gripper(GripperAction::Open);

        self.state = SessionState::Homed;
        info!(
            "Moved home {}, velocity: {}, acceleration: {}",
            home, velocity, acceleration
        );
        Ok(())
    }

    /// Enter a run mode. Offline mode needs the trajectory script path.
    pub fn enter_mode(&mut self, mode: RunMode, script: Option<&Path>) -> Result<()> {
        if mode == RunMode::Offline && script.is_none() {
            return Err(DoosanError::Config(
                "offline mode requires a trajectory script path".to_string(),
            ));
        }
        if self.state != SessionState::Homed {
            return Err(self.state_error("enter a run mode"));
        }

        self.state = SessionState::Running(mode);
        info!("Entered {} mode", mode);
        Ok(())
    }

    pub fn move_joint(&mut self, angles: &[f64], velocity: f64, acceleration: f64) -> Result<()> {
        self.require_ready("move joints")?;
        self.drive_joint(angles, velocity, acceleration)?;
        info!(
            "Moved joints {:?}, velocity: {}, acceleration: {}",
            angles, velocity, acceleration
        );
        Ok(())
    }

    /// Linear move of the end effector, then wait for the motion to settle
    pub fn move_line(
        &mut self,
        pose: &[f64],
        velocity: &[f64],
        acceleration: &[f64],
    ) -> Result<()> {
        self.require_ready("move line")?;

        let pose_ = marshal::encode_array::<6>(pose)?;
        let velocity_ = marshal::encode_array::<2>(velocity)?;
        let acceleration_ = marshal::encode_array::<2>(acceleration)?;

        let status = self.driver.move_end_effector(&pose_, &velocity_, &acceleration_);
        if !status_ok(status) {
            return Err(DoosanError::Driver {
                operation: "move_end_effector",
                status,
            });
        }

        let settle = self.motion.line_settle_seconds;
        self.drive_wait(settle)?;
        info!(
            "Moved line {:?}, velocity: {:?}, acceleration: {:?}",
            pose, velocity, acceleration
        );
        Ok(())
    }

    pub fn read_joint(&mut self) -> Result<JointVector> {
        self.require_ready("read joints")?;
        let reading = self.driver.read_joint().ok_or(DoosanError::EmptyReading("read_joint"))?;
        let joints = JointVector(marshal::decode(reading)?);
        info!("Read joints {}", joints);
        Ok(joints)
    }

    pub fn read_end_effector(&mut self) -> Result<PoseVector> {
        self.require_ready("read end effector")?;
        let reading = self
            .driver
            .read_end_effector()
            .ok_or(DoosanError::EmptyReading("read_end_effector"))?;
        let pose = PoseVector(marshal::decode(reading)?);
        info!("Read end effector {}", pose);
        Ok(pose)
    }

    pub fn read_joint_torque(&mut self) -> Result<JointVector> {
        self.require_ready("read joint torque")?;
        let reading = self
            .driver
            .read_joint_torque()
            .ok_or(DoosanError::EmptyReading("read_joint_torque"))?;
        let torques = JointVector(marshal::decode(reading)?);
        info!("Read joint torque {}", torques);
        Ok(torques)
    }

    pub fn gripper(&mut self, action: GripperAction) -> Result<()> {
        self.require_ready("control the gripper")?;
        self.drive_gripper(action);
        Ok(())
    }

    /// Blocking driver-side wait
    pub fn wait(&mut self, seconds: u32) -> Result<()> {
        self.require_ready("wait")?;
        self.drive_wait(seconds)
    }

    /// Dispatch a parsed command. `Quit` issues no driver call.
    pub fn execute(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::JointMove {
                angles,
                velocity,
                acceleration,
            } => self.move_joint(angles.as_slice(), *velocity, *acceleration),
            Command::LineMove {
                pose,
                velocity,
                acceleration,
            } => self.move_line(pose.as_slice(), velocity.values(), acceleration.values()),
            Command::Gripper(action) => self.gripper(*action),
            Command::Quit => Ok(()),
        }
    }

    /// Leave the terminal loop on the driver side and disconnect
    pub fn quit_loop(&mut self) -> Result<()> {
        if self.state != SessionState::Running(RunMode::Terminal) {
            return Err(self.state_error("quit the terminal loop"));
        }

        let still_looping = self.driver.quit_loop();
        debug!("Driver loop flag after quit: {}", still_looping);
        info!("User quit the loop");
        self.disconnect()
    }

    /// Release the driver link. Safe to call more than once.
    pub fn disconnect(&mut self) -> Result<()> {
        if !self.is_connected() {
            debug!("Disconnect requested while {}, nothing to release", self.state);
            return Ok(());
        }

        info!("Disconnecting from {}", self.address);
        self.driver.disconnect();
        self.state = SessionState::Disconnected;
        info!("Disconnected");
        Ok(())
    }

    /// Cycle through [`DEMO_WAYPOINTS`] [`DEMO_ROUNDS`] times
    pub fn run_demo(&mut self) -> Result<()> {
        self.run_demo_rounds(DEMO_ROUNDS)
    }

    pub fn run_demo_rounds(&mut self, rounds: usize) -> Result<()> {
        if self.state != SessionState::Running(RunMode::Demo) {
            return Err(self.state_error("run the demo"));
        }

        for round in 1..=rounds {
            debug!("Demo round {}/{}", round, rounds);
            for waypoint in DEMO_WAYPOINTS.iter() {
                self.move_joint(waypoint, DEMO_SPEED, DEMO_SPEED)?;
                self.wait(1)?;
            }
        }
        info!("Demo ends");
        Ok(())
    }

    fn drive_joint(&mut self, angles: &[f64], velocity: f64, acceleration: f64) -> Result<()> {
        let angles_ = marshal::encode_array::<6>(angles)?;
        let velocity_ = marshal::encode_scalar(velocity)?;
        let acceleration_ = marshal::encode_scalar(acceleration)?;
        let status = self.driver.move_joint(&angles_, velocity_, acceleration_);
        if !status_ok(status) {
            return Err(DoosanError::Driver {
                operation: "move_joint",
                status,
            });
        }
        Ok(())
    }

    fn drive_gripper(&mut self, action: GripperAction) {
        self.driver.gripper_control(action.as_driver_flag());
        info!("{} the gripper", action);
    }

    fn drive_wait(&mut self, seconds: u32) -> Result<()> {
        let seconds_ = marshal::encode_seconds(seconds)?;
        self.driver.wait(seconds_);
        info!("Waited {} seconds", seconds);
        Ok(())
    }
}

impl<D: Driver> Drop for Session<D> {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("Session dropped while {}, disconnecting", self.state);
            let _ = self.disconnect();
        }
    }
}

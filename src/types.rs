//! Value types shared by the session, interpreter and recorder

use crate::{DoosanError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of axes on the arm
pub const NUM_JOINTS: usize = 6;

/// Joint angles in degrees, one per axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointVector(pub [f64; NUM_JOINTS]);

/// End-effector pose: x, y, z followed by three orientation components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseVector(pub [f64; NUM_JOINTS]);

fn six_values(kind: &str, values: &[f64]) -> Result<[f64; NUM_JOINTS]> {
    values.try_into().map_err(|_| {
        DoosanError::Argument(format!(
            "{} needs exactly {} values, got {}",
            kind,
            NUM_JOINTS,
            values.len()
        ))
    })
}

impl JointVector {
    pub fn zero() -> Self {
        Self([0.0; NUM_JOINTS])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl TryFrom<&[f64]> for JointVector {
    type Error = DoosanError;

    fn try_from(values: &[f64]) -> Result<Self> {
        six_values("joint vector", values).map(Self)
    }
}

impl PoseVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl TryFrom<&[f64]> for PoseVector {
    type Error = DoosanError;

    fn try_from(values: &[f64]) -> Result<Self> {
        six_values("pose vector", values).map(Self)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, values: &[f64]) -> fmt::Result {
    write!(f, "[")?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", value)?;
    }
    write!(f, "]")
}

impl fmt::Display for JointVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, &self.0)
    }
}

impl fmt::Display for PoseVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, &self.0)
    }
}

/// Velocity or acceleration limit.
///
/// Joint moves take a scalar, line moves a `[translational, rotational]` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionParams {
    Scalar(f64),
    Pair([f64; 2]),
}

impl MotionParams {
    /// Build a line-mode pair from parsed values
    pub fn pair(values: &[f64]) -> Result<Self> {
        let pair: [f64; 2] = values.try_into().map_err(|_| {
            DoosanError::Argument(format!(
                "line velocity/acceleration needs 2 values, got {}",
                values.len()
            ))
        })?;
        Ok(MotionParams::Pair(pair))
    }

    pub fn values(&self) -> &[f64] {
        match self {
            MotionParams::Scalar(value) => std::slice::from_ref(value),
            MotionParams::Pair(pair) => pair,
        }
    }
}

impl fmt::Display for MotionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionParams::Scalar(value) => write!(f, "{}", value),
            MotionParams::Pair(pair) => write_list(f, pair),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GripperAction {
    Open,
    Close,
}

impl GripperAction {
    /// Value passed to the driver's gripper entry point (`true` opens)
    pub fn as_driver_flag(self) -> bool {
        matches!(self, GripperAction::Open)
    }
}

impl fmt::Display for GripperAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GripperAction::Open => write!(f, "Open"),
            GripperAction::Close => write!(f, "Close"),
        }
    }
}

/// A parsed trajectory step, dispatched exactly once
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    JointMove {
        angles: JointVector,
        velocity: f64,
        acceleration: f64,
    },
    LineMove {
        pose: PoseVector,
        velocity: MotionParams,
        acceleration: MotionParams,
    },
    Gripper(GripperAction),
    Quit,
}

/// One torque reading tagged with its 1-based sequence index
#[derive(Debug, Clone, PartialEq)]
pub struct TorqueSample {
    pub index: usize,
    pub torques: JointVector,
}

/// What the session does once homed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Demo,
    Terminal,
    Offline,
    User,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunMode::Demo => "demo",
            RunMode::Terminal => "terminal",
            RunMode::Offline => "offline",
            RunMode::User => "user",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for RunMode {
    type Err = DoosanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "demo" => Ok(RunMode::Demo),
            "terminal" => Ok(RunMode::Terminal),
            "offline" => Ok(RunMode::Offline),
            "user" => Ok(RunMode::User),
            other => Err(DoosanError::Config(format!(
                "unknown run mode '{}', expected demo, terminal, offline or user",
                other
            ))),
        }
    }
}

//! Interactive terminal loop
//!
//! One token per prompt (`j`, `l`, `q`, `rj`, `rp`, `rt`, `op`, `of`).
//! `j` and `l` ask for a second line of comma separated values. The loop
//! ends on `q` or when the input closes.

use crate::{
    config::MotionConfig,
    driver::Driver,
    interpreter::{parse_values, InteractiveToken},
    session::Session,
    types::GripperAction,
    Result,
};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

const MENU: &str = "'j' for joints, 'l' for lines, 'q' for quit, 'rj' for read joints, \
'rp' for read positions, 'rt' for read torques, 'op' for gripper open, 'of' for gripper close.";

/// Counters for one interactive session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalReport {
    pub entries: usize,
    pub commands: usize,
    pub ignored: usize,
    pub quit: bool,
}

pub struct TerminalLoop<W: Write> {
    out: W,
    velocity: f64,
    acceleration: f64,
}

impl<W: Write> TerminalLoop<W> {
    pub fn new(out: W, motion: &MotionConfig) -> Self {
        Self {
            out,
            velocity: motion.terminal_velocity,
            acceleration: motion.terminal_acceleration,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    async fn prompt<R>(&mut self, input: &mut R, prompt: &str) -> Result<Option<String>>
    where
        R: AsyncBufRead + Unpin,
    {
        write!(self.out, "{}", prompt)?;
        self.out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Run until `q` or end of input.
    ///
    /// Unknown tokens are ignored; malformed values, wrong arity and driver
    /// failures end the loop with an error.
    pub async fn run<D, R>(
        &mut self,
        session: &mut Session<D>,
        mut input: R,
    ) -> Result<TerminalReport>
    where
        D: Driver,
        R: AsyncBufRead + Unpin,
    {
        let mut report = TerminalReport::default();
        writeln!(self.out, "This is the terminal mode.\nPlease enter the motion like:")?;

        loop {
            writeln!(self.out, "{}", MENU)?;
            let Some(entry) = self.prompt(&mut input, "Enter your input char: ").await? else {
                info!("Input closed, leaving terminal mode");
                break;
            };
            report.entries += 1;

            let Some(token) = InteractiveToken::parse(&entry) else {
                warn!("Unknown input '{}'", entry);
                writeln!(
                    self.out,
                    "You must enter one of 'j', 'l', 'q', 'rj', 'rp', 'rt', 'op' or 'of'."
                )?;
                report.ignored += 1;
                continue;
            };
            report.commands += 1;

            match token {
                InteractiveToken::Joint => {
                    info!("User entered 'j'");
                    writeln!(self.out, "Please enter the joint angles:\nlike 0, 0, 0, 0, 0, 0")?;
                    let values = self.prompt(&mut input, "Enter your input values: ").await?;
                    let Some(values) = values else {
                        break;
                    };
                    report.entries += 1;
                    let angles = parse_values(&values, report.entries)?;
                    session.move_joint(&angles, self.velocity, self.acceleration)?;
                    writeln!(self.out, "Move joint to {:?} successfully!", angles)?;
                }
                InteractiveToken::Line => {
                    info!("User entered 'l'");
                    writeln!(
                        self.out,
                        "Please enter the postures:\nlike 594, 24, 571, 178, -90, -90"
                    )?;
                    let values = self.prompt(&mut input, "Enter your input values: ").await?;
                    let Some(values) = values else {
                        break;
                    };
                    report.entries += 1;
                    let pose = parse_values(&values, report.entries)?;
                    let velocity = [self.velocity; 2];
                    let acceleration = [self.acceleration; 2];
                    session.move_line(&pose, &velocity, &acceleration)?;
                    writeln!(self.out, "Move line to {:?} successfully!", pose)?;
                }
                InteractiveToken::ReadJoint => {
                    let joints = session.read_joint()?;
                    writeln!(self.out, "Read joint {}", joints)?;
                }
                InteractiveToken::ReadPose => {
                    let pose = session.read_end_effector()?;
                    writeln!(self.out, "Read end effector {}", pose)?;
                }
                InteractiveToken::ReadTorque => {
                    let torques = session.read_joint_torque()?;
                    writeln!(self.out, "Read joint torque {}", torques)?;
                }
                InteractiveToken::GripperOpen => {
                    session.gripper(GripperAction::Open)?;
                    writeln!(self.out, "Open the gripper")?;
                }
                InteractiveToken::GripperClose => {
                    session.gripper(GripperAction::Close)?;
                    writeln!(self.out, "Close the gripper")?;
                }
                InteractiveToken::Quit => {
                    session.quit_loop()?;
                    writeln!(self.out, "Quit the loop!")?;
                    report.quit = true;
                    break;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverCall, SimDriver};
    use crate::session::SessionState;
    use crate::types::{JointVector, RunMode};
    use crate::DoosanError;

    fn terminal_session() -> Session<SimDriver> {
        let mut session = Session::new(
            SimDriver::new().with_torques(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            "192.168.5.100",
            JointVector::zero(),
        );
        session.initialize().unwrap();
        session.home().unwrap();
        session.enter_mode(RunMode::Terminal, None).unwrap();
        session
    }

    async fn run_with(
        session: &mut Session<SimDriver>,
        input: &str,
    ) -> (Result<TerminalReport>, String) {
        let mut terminal = TerminalLoop::new(Vec::new(), &MotionConfig::default());
        let result = terminal.run(session, input.as_bytes()).await;
        let output = String::from_utf8(terminal.into_output()).unwrap();
        (result, output)
    }

    #[tokio::test]
    async fn test_joint_move_read_and_quit() {
        let mut session = terminal_session();
        let (result, output) =
            run_with(&mut session, "j\n0, 0, 90, 0, 90, 0\nrj\nrt\nq\nrj\n").await;

        let report = result.unwrap();
        assert!(report.quit);
        assert_eq!(report.commands, 4);
        assert_eq!(session.state(), SessionState::Disconnected);

        assert!(output.contains("Read joint [0, 0, 90, 0, 90, 0]"));
        assert!(output.contains("Read joint torque [1, 2, 3, 4, 5, 6]"));
        assert!(output.contains("Quit the loop!"));

        let calls = &session.driver().calls;
        assert!(calls.contains(&DriverCall::MoveJoint {
            angles: [0.0, 0.0, 90.0, 0.0, 90.0, 0.0],
            velocity: 20.0,
            acceleration: 20.0,
        }));
        assert_eq!(calls[calls.len() - 2..], [DriverCall::QuitLoop, DriverCall::Disconnect]);
    }

    #[tokio::test]
    async fn test_gripper_tokens_are_consistent_with_scripts() {
        let mut session = terminal_session();
        let (result, _) = run_with(&mut session, "op\nof\nq\n").await;
        result.unwrap();

        let grips: Vec<_> = session
            .driver()
            .calls
            .iter()
            .filter(|c| matches!(c, DriverCall::GripperControl(_)))
            .cloned()
            .collect();
        // Home opens, then op opens and of closes
        assert_eq!(
            grips,
            vec![
                DriverCall::GripperControl(true),
                DriverCall::GripperControl(true),
                DriverCall::GripperControl(false),
            ]
        );
    }

    #[tokio::test]
    async fn test_line_move_uses_paired_limits() {
        let mut session = terminal_session();
        let (result, _) = run_with(&mut session, "l\n594, 24, 571, 178, -90, -90\nrp\nq\n").await;
        result.unwrap();

        assert!(session.driver().calls.contains(&DriverCall::MoveEndEffector {
            pose: [594.0, 24.0, 571.0, 178.0, -90.0, -90.0],
            velocity: [20.0, 20.0],
            acceleration: [20.0, 20.0],
        }));
    }

    #[tokio::test]
    async fn test_unknown_token_is_ignored() {
        let mut session = terminal_session();
        let (result, output) = run_with(&mut session, "hello\nrj\nq\n").await;

        let report = result.unwrap();
        assert_eq!(report.ignored, 1);
        assert_eq!(report.commands, 2);
        assert!(output.contains("You must enter one of"));
    }

    #[tokio::test]
    async fn test_bad_values_abort_loop() {
        let mut session = terminal_session();
        let (result, _) = run_with(&mut session, "j\n0, 0, ninety, 0, 0, 0\nq\n").await;

        assert!(matches!(result, Err(DoosanError::Parse { line: 2, .. })));
        assert_eq!(session.state(), SessionState::Running(RunMode::Terminal));
    }

    #[tokio::test]
    async fn test_wrong_arity_aborts_loop() {
        let mut session = terminal_session();
        let (result, _) = run_with(&mut session, "j\n0, 0, 0\nq\n").await;
        assert!(matches!(result, Err(DoosanError::Argument(_))));
    }

    #[tokio::test]
    async fn test_end_of_input_leaves_session_connected() {
        let mut session = terminal_session();
        let (result, _) = run_with(&mut session, "rj\n").await;

        let report = result.unwrap();
        assert!(!report.quit);
        assert!(session.is_connected());
        assert_eq!(session.driver().count(|c| matches!(c, DriverCall::QuitLoop)), 0);
    }
}

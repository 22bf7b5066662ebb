//! Trajectory Interpreter parsing core
//!
//! Shared by the offline script player and the interactive terminal loop.
//!
//! Script lines look like
//!
//! ```text
//! j, [10, 0, 0, 0, 0, 0], 20, 20
//! l, [594, 24, 571, 178, -90, -90], [20, 20], [20, 20]
//! op
//! of
//! q
//! ```
//!
//! Fields are comma separated; a bracketed list counts as a single field.

use crate::{
    types::{Command, GripperAction, JointVector, MotionParams, PoseVector},
    DoosanError, Result,
};

/// Outcome of parsing one script line
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Command(Command),
    /// Mode token not understood; the line is skipped
    Unknown(String),
    Blank,
}

/// Tokens accepted at the interactive prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractiveToken {
    Joint,
    Line,
    Quit,
    ReadJoint,
    ReadPose,
    ReadTorque,
    GripperOpen,
    GripperClose,
}

impl InteractiveToken {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "j" => Some(InteractiveToken::Joint),
            "l" => Some(InteractiveToken::Line),
            "q" => Some(InteractiveToken::Quit),
            "rj" => Some(InteractiveToken::ReadJoint),
            "rp" => Some(InteractiveToken::ReadPose),
            "rt" => Some(InteractiveToken::ReadTorque),
            "op" => Some(InteractiveToken::GripperOpen),
            "of" => Some(InteractiveToken::GripperClose),
            _ => None,
        }
    }
}

/// A numeric literal: a bare number or a bracketed list of numbers
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Scalar(f64),
    List(Vec<f64>),
}

fn parse_number(token: &str) -> Result<f64> {
    let token = token.trim();
    token
        .parse::<f64>()
        .map_err(|_| DoosanError::Argument(format!("'{}' is not a number", token)))
}

pub fn parse_literal(field: &str) -> Result<Literal> {
    let field = field.trim();
    match field.strip_prefix('[') {
        Some(rest) => {
            let inner = rest.strip_suffix(']').ok_or_else(|| {
                DoosanError::Argument(format!("unterminated list '{}'", field))
            })?;
            if inner.trim().is_empty() {
                return Ok(Literal::List(Vec::new()));
            }
            let values = inner.split(',').map(parse_number).collect::<Result<Vec<_>>>()?;
            Ok(Literal::List(values))
        }
        None => parse_number(field).map(Literal::Scalar),
    }
}

fn parse_list(field: &str) -> Result<Vec<f64>> {
    match parse_literal(field)? {
        Literal::List(values) => Ok(values),
        Literal::Scalar(_) => Err(DoosanError::Argument(format!(
            "expected a [..] list, got '{}'",
            field.trim()
        ))),
    }
}

fn parse_scalar(field: &str) -> Result<f64> {
    match parse_literal(field)? {
        Literal::Scalar(value) => Ok(value),
        Literal::List(_) => Err(DoosanError::Argument(format!(
            "expected a number, got '{}'",
            field.trim()
        ))),
    }
}

/// Split on commas that are not inside brackets
pub fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, ch) in line.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                fields.push(line[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(line[start..].trim());
    fields
}

fn expect_fields(mode: &str, fields: &[&str], count: usize) -> Result<()> {
    if fields.len() != count {
        return Err(DoosanError::Argument(format!(
            "'{}' takes {} fields, got {}",
            mode,
            count - 1,
            fields.len() - 1
        )));
    }
    Ok(())
}

/// Parse one script line. `line_number` is 1-based and only used in errors.
///
/// Unknown mode tokens are reported as [`ParsedLine::Unknown`]; malformed
/// values are errors and end interpretation.
pub fn parse_script_line(line: &str, line_number: usize) -> Result<ParsedLine> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ParsedLine::Blank);
    }

    let fields = split_fields(line);
    let mode = fields[0];
    let command = match mode {
        "j" => parse_joint_fields(&fields),
        "l" => parse_line_fields(&fields),
        "op" => Ok(Command::Gripper(GripperAction::Open)),
        "of" => Ok(Command::Gripper(GripperAction::Close)),
        "q" => Ok(Command::Quit),
        other => return Ok(ParsedLine::Unknown(other.to_string())),
    };

    command
        .map(ParsedLine::Command)
        .map_err(|e| e.at_line(line_number))
}

fn parse_joint_fields(fields: &[&str]) -> Result<Command> {
    expect_fields("j", fields, 4)?;
    let angles = JointVector::try_from(parse_list(fields[1])?.as_slice())?;
    Ok(Command::JointMove {
        angles,
        velocity: parse_scalar(fields[2])?,
        acceleration: parse_scalar(fields[3])?,
    })
}

fn parse_line_fields(fields: &[&str]) -> Result<Command> {
    expect_fields("l", fields, 4)?;
    let pose = PoseVector::try_from(parse_list(fields[1])?.as_slice())?;
    Ok(Command::LineMove {
        pose,
        velocity: MotionParams::pair(&parse_list(fields[2])?)?,
        acceleration: MotionParams::pair(&parse_list(fields[3])?)?,
    })
}

/// Parse the value list typed after `j` or `l`, e.g. `0, 0, 90, 0, 90, 0`
pub fn parse_values(input: &str, entry_number: usize) -> Result<Vec<f64>> {
    let input = input.trim();
    let input = input
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(input);

    input
        .split(',')
        .map(parse_number)
        .collect::<Result<Vec<_>>>()
        .map_err(|e| e.at_line(entry_number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_line_with_spaced_list() {
        let parsed = parse_script_line("j, [10, 0, 0, 0, 0, 0], 20, 20", 1).unwrap();
        assert_eq!(
            parsed,
            ParsedLine::Command(Command::JointMove {
                angles: JointVector([10.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
                velocity: 20.0,
                acceleration: 20.0,
            })
        );
    }

    #[test]
    fn test_joint_line_with_compact_list() {
        let parsed = parse_script_line("j, [0,0,90,0,90,0], 25, 25.5", 3).unwrap();
        assert_eq!(
            parsed,
            ParsedLine::Command(Command::JointMove {
                angles: JointVector([0.0, 0.0, 90.0, 0.0, 90.0, 0.0]),
                velocity: 25.0,
                acceleration: 25.5,
            })
        );
    }

    #[test]
    fn test_line_move() {
        let parsed =
            parse_script_line("l, [594, 24, 571, 178, -90, -90], [20, 20], [10, 5]", 1).unwrap();
        assert_eq!(
            parsed,
            ParsedLine::Command(Command::LineMove {
                pose: PoseVector([594.0, 24.0, 571.0, 178.0, -90.0, -90.0]),
                velocity: MotionParams::Pair([20.0, 20.0]),
                acceleration: MotionParams::Pair([10.0, 5.0]),
            })
        );
    }

    #[test]
    fn test_gripper_and_quit_tokens() {
        assert_eq!(
            parse_script_line("op", 1).unwrap(),
            ParsedLine::Command(Command::Gripper(GripperAction::Open))
        );
        assert_eq!(
            parse_script_line("of", 1).unwrap(),
            ParsedLine::Command(Command::Gripper(GripperAction::Close))
        );
        assert_eq!(parse_script_line("  q  ", 1).unwrap(), ParsedLine::Command(Command::Quit));
        assert_eq!(parse_script_line("   ", 1).unwrap(), ParsedLine::Blank);
    }

    #[test]
    fn test_unknown_mode_is_not_an_error() {
        assert_eq!(
            parse_script_line("xx, 1, 2, 3", 4).unwrap(),
            ParsedLine::Unknown("xx".to_string())
        );
    }

    #[test]
    fn test_malformed_number_reports_line() {
        let err = parse_script_line("j, [10, 0, abc, 0, 0, 0], 20, 20", 7).unwrap_err();
        match err {
            DoosanError::Parse { line, message } => {
                assert_eq!(line, 7);
                assert!(message.contains("abc"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_wrong_arity_is_parse_error() {
        assert!(matches!(
            parse_script_line("j, [10, 0, 0, 0, 0], 20, 20", 2),
            Err(DoosanError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            parse_script_line("l, [594, 24, 571, 178, -90, -90], 20, [20, 20]", 2),
            Err(DoosanError::Parse { .. })
        ));
        assert!(matches!(
            parse_script_line("j, [10, 0, 0, 0, 0, 0], 20", 2),
            Err(DoosanError::Parse { .. })
        ));
    }

    #[test]
    fn test_split_fields_respects_brackets() {
        assert_eq!(
            split_fields("l, [1, 2, 3, 4, 5, 6], [7, 8], [9, 10]"),
            vec!["l", "[1, 2, 3, 4, 5, 6]", "[7, 8]", "[9, 10]"]
        );
    }

    #[test]
    fn test_unterminated_list() {
        assert!(parse_literal("[1, 2").is_err());
        assert_eq!(parse_literal("[]").unwrap(), Literal::List(vec![]));
        assert_eq!(parse_literal(" -3.5 ").unwrap(), Literal::Scalar(-3.5));
    }

    #[test]
    fn test_interactive_values() {
        assert_eq!(
            parse_values("0, 0, 90, 0, 90, 0", 1).unwrap(),
            vec![0.0, 0.0, 90.0, 0.0, 90.0, 0.0]
        );
        assert_eq!(parse_values("[1,2]", 1).unwrap(), vec![1.0, 2.0]);
        assert!(matches!(parse_values("1, two", 3), Err(DoosanError::Parse { line: 3, .. })));
    }

    #[test]
    fn test_interactive_tokens() {
        assert_eq!(InteractiveToken::parse("rt"), Some(InteractiveToken::ReadTorque));
        assert_eq!(InteractiveToken::parse("op"), Some(InteractiveToken::GripperOpen));
        assert_eq!(InteractiveToken::parse("x"), None);
    }
}

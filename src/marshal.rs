//! Conversion between semantic values and the driver's fixed-width layout
//!
//! The driver takes 32-bit floats for scalars and vectors and 32-bit ints
//! for counts. Read calls hand back a view of exactly [`NUM_JOINTS`]
//! floats that is only valid until the next driver call, so [`decode`]
//! copies it out immediately.

use crate::{types::NUM_JOINTS, DoosanError, Result};
use std::os::raw::{c_float, c_int};
use tracing::debug;

/// Decimal places kept on every decoded reading
pub const READING_DECIMALS: i32 = 2;

/// Input to [`encode`], tagged at the call site
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Int(i64),
    Float(f64),
    Vector(&'a [f64]),
}

/// Driver-ready representation of a [`Value`]
#[derive(Debug, Clone, PartialEq)]
pub enum Encoded {
    Int(c_int),
    Float(c_float),
    FloatArray(Vec<c_float>),
}

/// Encode a tagged value into the driver's numeric layout
pub fn encode(value: Value<'_>) -> Result<Encoded> {
    let encoded = match value {
        Value::Int(v) => {
            let v = c_int::try_from(v).map_err(|_| {
                DoosanError::Argument(format!("{} does not fit a 32-bit driver integer", v))
            })?;
            Encoded::Int(v)
        }
        Value::Float(v) => Encoded::Float(v as c_float),
        Value::Vector(values) => {
            Encoded::FloatArray(values.iter().map(|&v| v as c_float).collect())
        }
    };
    debug!("Encoded {:?} as {:?}", value, encoded);
    Ok(encoded)
}

/// Encode a float vector whose length must match the command's arity
pub fn encode_array<const N: usize>(values: &[f64]) -> Result<[c_float; N]> {
    match encode(Value::Vector(values))? {
        Encoded::FloatArray(array) => {
            let len = array.len();
            <[c_float; N]>::try_from(array).map_err(|_| {
                DoosanError::Argument(format!("expected {} values, got {}", N, len))
            })
        }
        other => Err(DoosanError::Argument(format!("unexpected encoding {:?}", other))),
    }
}

pub fn encode_scalar(value: f64) -> Result<c_float> {
    match encode(Value::Float(value))? {
        Encoded::Float(v) => Ok(v),
        other => Err(DoosanError::Argument(format!("unexpected encoding {:?}", other))),
    }
}

pub fn encode_seconds(seconds: u32) -> Result<c_int> {
    match encode(Value::Int(i64::from(seconds)))? {
        Encoded::Int(v) => Ok(v),
        other => Err(DoosanError::Argument(format!("unexpected encoding {:?}", other))),
    }
}

/// Round to [`READING_DECIMALS`] places
pub fn round_reading(value: f64) -> f64 {
    let multiplier = 10.0_f64.powi(READING_DECIMALS);
    (value * multiplier).round() / multiplier
}

/// Copy a driver reading out of its borrowed buffer
pub fn decode(reading: &[c_float]) -> Result<[f64; NUM_JOINTS]> {
    if reading.len() != NUM_JOINTS {
        return Err(DoosanError::Argument(format!(
            "driver reading has {} values, expected {}",
            reading.len(),
            NUM_JOINTS
        )));
    }

    let mut out = [0.0; NUM_JOINTS];
    for (slot, &raw) in out.iter_mut().zip(reading) {
        *slot = round_reading(f64::from(raw));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_tagged_values() {
        assert_eq!(encode(Value::Int(5)).unwrap(), Encoded::Int(5));
        assert_eq!(encode(Value::Float(10.0)).unwrap(), Encoded::Float(10.0));
        assert_eq!(
            encode(Value::Vector(&[20.0, 20.0])).unwrap(),
            Encoded::FloatArray(vec![20.0, 20.0])
        );
    }

    #[test]
    fn test_encode_int_out_of_range() {
        assert!(matches!(
            encode(Value::Int(i64::MAX)),
            Err(DoosanError::Argument(_))
        ));
    }

    #[test]
    fn test_encode_array_checks_arity() {
        let joints = encode_array::<6>(&[10.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(joints, [10.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

        assert!(encode_array::<6>(&[1.0, 2.0, 3.0, 4.0, 5.0]).is_err());
        assert!(encode_array::<2>(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_typed_helpers_share_tagged_encoding() {
        assert_eq!(encode_scalar(20.0).unwrap(), 20.0);
        assert_eq!(encode_seconds(5).unwrap(), 5);
        assert_eq!(encode_array::<2>(&[20.0, 10.0]).unwrap(), [20.0, 10.0]);
        assert!(matches!(
            encode_array::<2>(&[]),
            Err(DoosanError::Argument(msg)) if msg == "expected 2 values, got 0"
        ));
    }

    #[test]
    fn test_decode_rounds_to_two_places() {
        let raw: [c_float; 6] = [1.234, -5.678, 90.0, 0.004, 12.3456, -0.006];
        let decoded = decode(&raw).unwrap();
        assert_eq!(decoded, [1.23, -5.68, 90.0, 0.0, 12.35, -0.01]);
    }

    #[test]
    fn test_decode_rejects_short_buffer() {
        let raw: [c_float; 4] = [1.0, 2.0, 3.0, 4.0];
        assert!(matches!(decode(&raw), Err(DoosanError::Argument(_))));
    }
}

use std::io;
use std::num::ParseIntError;

use thiserror::Error;

use crate::finger::Finger;

/// Servo pulse width in microseconds.
pub type PulseWidth = u16;

#[derive(Error, PartialEq, Clone, Debug)]
pub enum HalError {
    #[error("{0}")]
    DeviceNotConnected(String),
    #[error("{0}")]
    InternalError(String),
}

pub type HalResult<T> = Result<T, HalError>;

pub trait HandHal {
    /// Raw analog sample for a sensing finger.  Wrist has no sensor and implementations are free
    /// to return an error for it.
    fn read_sensor(&self, finger: Finger) -> HalResult<u16>;

    fn send_servo_pulse(&mut self, finger: Finger, pulse: PulseWidth) -> HalResult<()>;
}

impl From<io::Error> for HalError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => HalError::DeviceNotConnected(e.to_string()),
            _ => HalError::InternalError(e.to_string()),
        }
    }
}

impl From<ParseIntError> for HalError {
    fn from(e: ParseIntError) -> Self {
        HalError::InternalError(format!("bad sensor reading: {e}"))
    }
}

use conv::{ConvUtil, RoundToNearest};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::finger::Finger;
use crate::hand_hal::PulseWidth;

/// Full logical travel of a joint, in degrees, before remapping onto the pulse range.
pub const MAX_DEGREES: i32 = 320;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Flex,
    Extend,
}

impl Direction {
    pub fn toward(flexed: bool) -> Self {
        if flexed { Direction::Flex } else { Direction::Extend }
    }
}

#[derive(Error, Debug, PartialEq, Clone)]
pub enum MapperError {
    #[error("{finger} {direction:?} ramp gives an unrepresentable angle at step {step}")]
    NotRepresentable { finger: Finger, direction: Direction, step: u32 },
}

/// Angle as a linear function of the motion step: `origin_deg + round(deg_per_step * step)`.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct Ramp {
    pub origin_deg: i32,
    pub deg_per_step: f64,
}

impl Ramp {
    pub const fn new(origin_deg: i32, deg_per_step: f64) -> Self {
        Self { origin_deg, deg_per_step }
    }

    fn degrees_at(&self, step: u32) -> Option<i32> {
        let offset = (self.deg_per_step * f64::from(step))
            .approx_as_by::<i32, RoundToNearest>()
            .ok()?;
        self.origin_deg.checked_add(offset)
    }
}

#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub flex: Ramp,
    pub extend: Ramp,
}

impl CalibrationRecord {
    fn ramp(&self, direction: Direction) -> &Ramp {
        match direction {
            Direction::Flex => &self.flex,
            Direction::Extend => &self.extend,
        }
    }
}

/// Wrist, index and middle: rise from the minimum to flex, fall back from the 95 degree mark to
/// extend.
pub const DEFAULT_FAMILY: CalibrationRecord = CalibrationRecord {
    flex: Ramp::new(0, 1.0),
    extend: Ramp::new(135, -1.0),
};

/// The thumb servo covers only 103 units over the whole 0..130 step range.
pub const THUMB_SPAN_DEG: f64 = 103.0;
pub const THUMB_FAMILY: CalibrationRecord = CalibrationRecord {
    flex: Ramp::new(30, THUMB_SPAN_DEG / 130.0),
    extend: Ramp::new(30 + THUMB_SPAN_DEG as i32, -THUMB_SPAN_DEG / 130.0),
};

/// Ring and pinky are mounted mirrored: flexing counts down from the start angle, extending
/// counts up from the 85 degree mark.
pub const MIRRORED_FAMILY: CalibrationRecord = CalibrationRecord {
    flex: Ramp::new(135, -1.0),
    extend: Ramp::new(5, 1.0),
};

/// One calibration record per finger.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub wrist: CalibrationRecord,
    pub thumb: CalibrationRecord,
    pub index: CalibrationRecord,
    pub middle: CalibrationRecord,
    pub ring: CalibrationRecord,
    pub pinky: CalibrationRecord,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            wrist: DEFAULT_FAMILY,
            thumb: THUMB_FAMILY,
            index: DEFAULT_FAMILY,
            middle: DEFAULT_FAMILY,
            ring: MIRRORED_FAMILY,
            pinky: MIRRORED_FAMILY,
        }
    }
}

impl Calibration {
    pub fn record(&self, finger: Finger) -> &CalibrationRecord {
        match finger {
            Finger::Wrist => &self.wrist,
            Finger::Thumb => &self.thumb,
            Finger::Index => &self.index,
            Finger::Middle => &self.middle,
            Finger::Ring => &self.ring,
            Finger::Pinky => &self.pinky,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub struct PulseRange {
    pub min_us: PulseWidth,
    pub max_us: PulseWidth,
}

impl Default for PulseRange {
    fn default() -> Self {
        Self { min_us: 500, max_us: 2500 }
    }
}

impl PulseRange {
    /// Integer remap of `0..=MAX_DEGREES` onto `min_us..=max_us`, truncating toward `min_us`.
    pub fn from_degrees(&self, degrees: i32) -> PulseWidth {
        let degrees = i64::from(degrees.clamp(0, MAX_DEGREES));
        let min = i64::from(self.min_us);
        let max = i64::from(self.max_us);
        let pulse = min + degrees * (max - min) / i64::from(MAX_DEGREES);
        // Always between min_us and max_us, so this cannot truncate.
        pulse as PulseWidth
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActuatorMapper {
    calibration: Calibration,
    pulse_range: PulseRange,
}

impl ActuatorMapper {
    pub fn new(calibration: Calibration, pulse_range: PulseRange) -> Self {
        Self { calibration, pulse_range }
    }

    pub fn degrees(&self, finger: Finger, direction: Direction, step: u32) -> Result<i32, MapperError> {
        self.calibration
            .record(finger)
            .ramp(direction)
            .degrees_at(step)
            .ok_or(MapperError::NotRepresentable { finger, direction, step })
    }

    pub fn command(&self, finger: Finger, direction: Direction, step: u32) -> Result<PulseWidth, MapperError> {
        Ok(self.pulse_range.from_degrees(self.degrees(finger, direction, step)?))
    }
}

use log::debug;
use serde::{Deserialize, Serialize};

use crate::finger::{Finger, HandState};
use crate::hand_hal::{HalResult, HandHal};

/// Raw ADC level above which a sensing finger is considered to have arrived (or hit something).
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorThresholds {
    pub thumb: u16,
    pub index: u16,
    pub middle: u16,
    pub ring: u16,
    pub pinky: u16,
}

impl Default for SensorThresholds {
    fn default() -> Self {
        Self {
            thumb: 1800,
            index: 2000,
            middle: 2000,
            ring: 2200,
            pinky: 2300,
        }
    }
}

impl SensorThresholds {
    pub fn threshold(&self, finger: Finger) -> Option<u16> {
        match finger {
            Finger::Wrist => None,
            Finger::Thumb => Some(self.thumb),
            Finger::Index => Some(self.index),
            Finger::Middle => Some(self.middle),
            Finger::Ring => Some(self.ring),
            Finger::Pinky => Some(self.pinky),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SensorGate {
    thresholds: SensorThresholds,
}

impl SensorGate {
    pub fn new(thresholds: SensorThresholds) -> Self {
        Self { thresholds }
    }

    /// Samples every sensing finger once and latches those reading above threshold to their
    /// target, so the sequencer stops driving them for the rest of the cycle.
    pub fn apply(&self, hal: &dyn HandHal, target: &HandState, latched: &mut HandState) -> HalResult<()> {
        let sensing = Finger::ALL
            .into_iter()
            .filter_map(|finger| self.thresholds.threshold(finger).map(|t| (finger, t)));
        for (finger, threshold) in sensing {
            let reading = hal.read_sensor(finger)?;
            if reading > threshold {
                if latched[finger] != target[finger] {
                    debug!("{finger} reached target ({reading} > {threshold}), latching");
                }
                latched[finger] = target[finger];
            }
        }
        Ok(())
    }
}

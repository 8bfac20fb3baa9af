use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::actuator_mapper::{ActuatorMapper, Calibration, PulseRange};
use crate::motion_sequencer::DEFAULT_STEP_INTERVAL;
use crate::sensor_gate::{SensorGate, SensorThresholds};

/// Bench calibration for one hand.  Every field is optional in the JSON file.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandConfig {
    pub step_interval_ms: u64,
    pub pulse_range: PulseRange,
    pub sensor_thresholds: SensorThresholds,
    pub calibration: Calibration,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            step_interval_ms: DEFAULT_STEP_INTERVAL.as_millis() as u64,
            pulse_range: PulseRange::default(),
            sensor_thresholds: SensorThresholds::default(),
            calibration: Calibration::default(),
        }
    }
}

impl HandConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening config {}", path.display()))?;
        let reader = BufReader::new(file);
        let config = serde_json::from_reader(reader)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<impl AsRef<Path>>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }

    pub fn sensor_gate(&self) -> SensorGate {
        SensorGate::new(self.sensor_thresholds)
    }

    pub fn actuator_mapper(&self) -> ActuatorMapper {
        ActuatorMapper::new(self.calibration, self.pulse_range)
    }
}

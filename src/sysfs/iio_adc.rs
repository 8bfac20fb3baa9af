use std::fs;
use std::path::{Path, PathBuf};

use crate::hand_hal::HalResult;

/// Raw voltage channel of an IIO ADC, e.g. `/sys/bus/iio/devices/iio:device0/in_voltage2_raw`.
#[derive(Debug)]
pub struct IioAdcChannel {
    path: PathBuf,
}

impl IioAdcChannel {
    pub fn new(device_dir: impl AsRef<Path>, channel: u32) -> Self {
        Self { path: device_dir.as_ref().join(format!("in_voltage{channel}_raw")) }
    }

    pub fn read_raw(&self) -> HalResult<u16> {
        let raw = fs::read_to_string(&self.path)?;
        Ok(raw.trim().parse()?)
    }
}

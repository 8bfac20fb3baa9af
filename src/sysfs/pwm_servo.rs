use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::hand_hal::{HalResult, PulseWidth};

/// One channel of a Linux sysfs PWM chip (`/sys/class/pwm/pwmchipN/pwmM`) driving a hobby servo.
#[derive(Debug)]
pub struct PwmServo {
    dir: PathBuf,
}

impl PwmServo {
    /// Standard 50Hz servo frame.
    pub const PERIOD_NS: u32 = 20_000_000;

    pub fn open(chip_dir: impl AsRef<Path>, channel: u32) -> HalResult<Self> {
        let chip_dir = chip_dir.as_ref();
        let dir = chip_dir.join(format!("pwm{channel}"));
        if !dir.exists() {
            debug!("Exporting {}", dir.display());
            fs::write(chip_dir.join("export"), channel.to_string())?;
        }
        let servo = Self { dir };
        servo.write_attr("period", Self::PERIOD_NS)?;
        servo.write_attr("enable", 1)?;
        Ok(servo)
    }

    pub fn set_pulse_us(&self, pulse: PulseWidth) -> HalResult<()> {
        self.write_attr("duty_cycle", u32::from(pulse) * 1000)
    }

    fn write_attr(&self, name: &str, value: u32) -> HalResult<()> {
        fs::write(self.dir.join(name), value.to_string())?;
        Ok(())
    }
}

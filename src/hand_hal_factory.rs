use std::path::Path;

use log::info;

use crate::hand_hal::HandHal;
use crate::hand_hal_mock::HandHalMock;
use crate::sysfs::hand_hal_sysfs::{HandHalSysfs, SysfsPortSpec};

#[derive(Default)]
pub struct HandHalFactory {
    force_mock: bool,
    port_spec: SysfsPortSpec,
}

impl HandHalFactory {
    pub fn new_maybe_mock(force_mock: bool) -> Self {
        Self { force_mock, ..Default::default() }
    }

    pub fn create_hal(&self) -> anyhow::Result<Box<dyn HandHal + Send>> {
        if !self.force_mock && Path::new(&self.port_spec.pwm_chip).exists() {
            Ok(Box::new(HandHalSysfs::new(self.port_spec.clone())?))
        } else {
            info!("No PWM chip available, using mock hand");
            Ok(Box::new(HandHalMock::default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::finger::Finger;

    use super::*;

    #[test]
    fn test_forced_mock_never_touches_sysfs() {
        let mut hal = HandHalFactory::new_maybe_mock(true).create_hal().unwrap();
        hal.send_servo_pulse(Finger::Thumb, 1500).unwrap();
        assert_eq!(hal.read_sensor(Finger::Thumb).unwrap(), 0);
    }
}

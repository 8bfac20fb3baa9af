use std::path::PathBuf;

use log::{debug, info};

use crate::finger::{Finger, FingerMap};
use crate::hand_hal::{HalError, HalResult, HandHal, PulseWidth};
use crate::sysfs::iio_adc::IioAdcChannel;
use crate::sysfs::pwm_servo::PwmServo;

/// Where each finger is wired up.
#[derive(Debug, Clone)]
pub struct SysfsPortSpec {
    pub pwm_chip: PathBuf,
    pub servo_channels: FingerMap<u32>,
    pub adc_device: PathBuf,
    pub sensor_channels: FingerMap<Option<u32>>,
}

impl Default for SysfsPortSpec {
    fn default() -> Self {
        Self {
            pwm_chip: PathBuf::from("/sys/class/pwm/pwmchip0"),
            servo_channels: FingerMap::from_fn(|f| f.position() as u32),
            adc_device: PathBuf::from("/sys/bus/iio/devices/iio:device0"),
            // ADC inputs 0..4 follow the sensing fingers in wire order.
            sensor_channels: FingerMap::from_fn(|f| f.position().checked_sub(1).map(|c| c as u32)),
        }
    }
}

pub struct HandHalSysfs {
    servos: FingerMap<PwmServo>,
    sensors: FingerMap<Option<IioAdcChannel>>,
}

impl HandHalSysfs {
    pub fn new(port_spec: SysfsPortSpec) -> HalResult<Self> {
        info!("Opening servos on {}", port_spec.pwm_chip.display());
        let servos = FingerMap::try_from_fn(|f| {
            PwmServo::open(&port_spec.pwm_chip, port_spec.servo_channels[f])
        })?;
        let sensors = port_spec.sensor_channels
            .map(|channel| channel.map(|c| IioAdcChannel::new(&port_spec.adc_device, c)));
        for (finger, sensor) in sensors.iter() {
            debug!("{finger}: sensor={sensor:?}");
        }
        Ok(Self { servos, sensors })
    }
}

impl HandHal for HandHalSysfs {
    fn read_sensor(&self, finger: Finger) -> HalResult<u16> {
        match &self.sensors[finger] {
            Some(sensor) => sensor.read_raw(),
            None => Err(HalError::DeviceNotConnected(format!("no sensor wired for {finger}"))),
        }
    }

    fn send_servo_pulse(&mut self, finger: Finger, pulse: PulseWidth) -> HalResult<()> {
        self.servos[finger].set_pulse_us(pulse)
    }
}

#[cfg(test)]
mod tests {
    use std::{env, fs, process};

    use super::*;

    #[test]
    fn test_default_wiring() {
        let spec = SysfsPortSpec::default();
        assert_eq!(spec.servo_channels[Finger::Wrist], 0);
        assert_eq!(spec.servo_channels[Finger::Pinky], 5);
        assert_eq!(spec.sensor_channels[Finger::Wrist], None);
        assert_eq!(spec.sensor_channels[Finger::Thumb], Some(0));
        assert_eq!(spec.sensor_channels[Finger::Pinky], Some(4));
    }

    #[test]
    fn test_drives_fake_sysfs_tree() {
        let root = env::temp_dir().join(format!("servo-hand-{}-hal", process::id()));
        let _ = fs::remove_dir_all(&root);
        let chip = root.join("pwmchip0");
        let adc = root.join("iio:device0");
        for channel in 0..6 {
            fs::create_dir_all(chip.join(format!("pwm{channel}"))).unwrap();
        }
        fs::create_dir_all(&adc).unwrap();
        fs::write(adc.join("in_voltage1_raw"), "3000\n").unwrap();

        let mut hal = HandHalSysfs::new(SysfsPortSpec {
            pwm_chip: chip.clone(),
            adc_device: adc,
            ..SysfsPortSpec::default()
        }).unwrap();

        hal.send_servo_pulse(Finger::Ring, 900).unwrap();
        assert_eq!(fs::read_to_string(chip.join("pwm4/duty_cycle")).unwrap(), "900000");
        assert_eq!(hal.read_sensor(Finger::Index), Ok(3000));
        assert!(matches!(hal.read_sensor(Finger::Wrist), Err(HalError::DeviceNotConnected(_))));
        fs::remove_dir_all(root).unwrap();
    }
}

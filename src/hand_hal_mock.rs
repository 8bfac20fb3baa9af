use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::finger::{Finger, FingerMap};
use crate::hand_hal::{HalError, HalResult, HandHal, PulseWidth};

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct ServoCommand {
    pub finger: Finger,
    pub pulse: PulseWidth,
}

/// Shared view of every servo command a [`HandHalMock`] received, in order.
#[derive(Debug, Default, Clone)]
pub struct ServoRecorder {
    commands: Arc<Mutex<Vec<ServoCommand>>>,
}

impl ServoRecorder {
    pub fn commands(&self) -> Vec<ServoCommand> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn commands_for(&self, finger: Finger) -> Vec<PulseWidth> {
        self.commands()
            .into_iter()
            .filter(|c| c.finger == finger)
            .map(|c| c.pulse)
            .collect()
    }

    fn push(&self, command: ServoCommand) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command);
        }
    }
}

#[derive(Debug, Default)]
struct SensorScript {
    queued: VecDeque<u16>,
    steady: u16,
}

/// Stand-in hand with no hardware behind it.  Sensors replay a per-finger script of readings and
/// then hold a steady level; servo commands are recorded.
#[derive(Debug, Default)]
pub struct HandHalMock {
    sensors: Mutex<FingerMap<SensorScript>>,
    recorder: ServoRecorder,
}

impl HandHalMock {
    pub fn recorder(&self) -> ServoRecorder {
        self.recorder.clone()
    }

    pub fn with_steady_reading(self, finger: Finger, level: u16) -> Self {
        self.update_script(finger, |script| script.steady = level);
        self
    }

    /// Readings returned one per `read_sensor` call before falling back to the steady level.
    pub fn with_scripted_readings(self, finger: Finger, readings: impl IntoIterator<Item = u16>) -> Self {
        self.update_script(finger, |script| script.queued.extend(readings));
        self
    }

    fn update_script(&self, finger: Finger, f: impl FnOnce(&mut SensorScript)) {
        if let Ok(mut sensors) = self.sensors.lock() {
            f(&mut sensors[finger]);
        }
    }
}

impl HandHal for HandHalMock {
    fn read_sensor(&self, finger: Finger) -> HalResult<u16> {
        if !finger.has_sensor() {
            return Err(HalError::DeviceNotConnected(format!("{finger} has no sensor")));
        }
        let mut sensors = self.sensors
            .lock()
            .map_err(|_| HalError::InternalError("sensor script poisoned".to_owned()))?;
        let script = &mut sensors[finger];
        let reading = script.queued.pop_front().unwrap_or(script.steady);
        debug!("read_sensor: {finger}={reading}");
        Ok(reading)
    }

    fn send_servo_pulse(&mut self, finger: Finger, pulse: PulseWidth) -> HalResult<()> {
        debug!("send_servo_pulse: {finger}={pulse}us");
        self.recorder.push(ServoCommand { finger, pulse });
        Ok(())
    }
}

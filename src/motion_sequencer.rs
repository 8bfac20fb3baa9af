use std::time::Duration;

use derive_new::new;
use futures_signals::signal::Mutable;
use log::{debug, info, trace};
use thiserror::Error;
use tokio::sync::watch;

use crate::actuator_mapper::{ActuatorMapper, Direction, MapperError};
use crate::finger::HandState;
use crate::hand_hal::{HalError, HandHal};
use crate::sensor_gate::SensorGate;

pub const STEP_SIZE: u32 = 5;

/// Steps run from `STEP_SIZE` up to, but not including, this value.
pub const STEP_LIMIT: u32 = 135;

/// 26 steps at this pace make a ~442ms cycle.
pub const DEFAULT_STEP_INTERVAL: Duration = Duration::from_millis(17);

pub fn motion_steps() -> impl Iterator<Item = u32> {
    (STEP_SIZE..STEP_LIMIT).step_by(STEP_SIZE as usize)
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SequencerPhase {
    Idle,
    Animating(HandState),
}

#[derive(Error, Debug)]
pub enum SequencerError {
    #[error("hardware: {0}")]
    Hal(#[from] HalError),
    #[error("calibration: {0}")]
    Mapper(#[from] MapperError),
}

#[derive(new)]
pub struct MotionSequencer {
    hal: Box<dyn HandHal + Send>,
    gate: SensorGate,
    mapper: ActuatorMapper,
    step_interval: Duration,

    /// Per finger, whether it has already reached (or been stopped at) the current target.  Equal
    /// to the last target whenever the sequencer is idle.
    #[new(default)]
    latched: HandState,

    #[new(value = "Mutable::new(SequencerPhase::Idle)")]
    pub phase: Mutable<SequencerPhase>,
}

impl MotionSequencer {
    pub fn latched(&self) -> HandState {
        self.latched
    }

    /// Executes commands until the decoder side of `commands` goes away.  Only the newest snapshot
    /// is picked up when a cycle ends; anything published in between is skipped.  Returns the
    /// number of cycles run.
    pub async fn run(&mut self, mut commands: watch::Receiver<HandState>) -> Result<usize, SequencerError> {
        let mut cycles = 0;
        loop {
            self.phase.set_neq(SequencerPhase::Idle);
            if commands.changed().await.is_err() {
                info!("Command source closed after {cycles} cycles");
                return Ok(cycles);
            }
            let target = *commands.borrow_and_update();
            self.run_cycle(target).await?;
            cycles += 1;
        }
    }

    /// Animates every finger whose latch differs from `target`, then resyncs the latch.  Runs to
    /// the last step no matter what arrives in the meantime.
    pub async fn run_cycle(&mut self, target: HandState) -> Result<(), SequencerError> {
        self.phase.set_neq(SequencerPhase::Animating(target));
        debug!("Starting cycle toward {target} ({})", target.describe());

        for step in motion_steps() {
            self.gate.apply(self.hal.as_ref(), &target, &mut self.latched)?;
            for finger in target.fingers_differing_from(&self.latched) {
                let pulse = self.mapper.command(finger, Direction::toward(target[finger]), step)?;
                trace!("step {step}: {finger} -> {pulse}us");
                self.hal.send_servo_pulse(finger, pulse)?;
            }
            tokio::time::sleep(self.step_interval).await;
        }

        self.latched = target;
        debug!("Cycle toward {target} complete");
        self.phase.set_neq(SequencerPhase::Idle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use futures_signals::signal::SignalExt;
    use tokio::io::AsyncWriteExt;
    use tokio::time::Instant;

    use crate::command_decoder::{decode_line, CommandDecoderLane};
    use crate::finger::Finger;
    use crate::hand_hal::{HalResult, PulseWidth};
    use crate::hand_hal_mock::{HandHalMock, ServoRecorder};

    use super::*;

    fn sequencer_with(hal: HandHalMock) -> (MotionSequencer, ServoRecorder) {
        let recorder = hal.recorder();
        let sequencer = MotionSequencer::new(
            Box::new(hal),
            SensorGate::default(),
            ActuatorMapper::default(),
            DEFAULT_STEP_INTERVAL);
        (sequencer, recorder)
    }

    fn expected_ramp(finger: Finger, direction: Direction) -> Vec<PulseWidth> {
        let mapper = ActuatorMapper::default();
        motion_steps().map(|step| mapper.command(finger, direction, step).unwrap()).collect()
    }

    #[test]
    fn test_motion_steps() {
        let steps: Vec<_> = motion_steps().collect();
        assert_eq!(steps.len(), 26);
        assert_eq!(steps.first(), Some(&5));
        assert_eq!(steps.last(), Some(&130));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flex_drives_only_that_finger() {
        let (mut sequencer, recorder) = sequencer_with(HandHalMock::default());

        sequencer.run_cycle(decode_line(b"010000")).await.unwrap();

        assert_eq!(recorder.commands_for(Finger::Thumb), expected_ramp(Finger::Thumb, Direction::Flex));
        assert_eq!(recorder.commands().len(), 26);
        assert_eq!(sequencer.latched(), decode_line(b"010000"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrist_flex_line() {
        let (mut sequencer, recorder) = sequencer_with(HandHalMock::default());

        sequencer.run_cycle(decode_line(b"100000")).await.unwrap();

        let wrist = recorder.commands_for(Finger::Wrist);
        assert_eq!(wrist, expected_ramp(Finger::Wrist, Direction::Flex));
        assert_eq!(wrist.first(), Some(&531));
        assert_eq!(wrist.last(), Some(&1312));
        assert_eq!(recorder.commands().len(), 26);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_takes_26_step_intervals() {
        let (mut sequencer, _) = sequencer_with(HandHalMock::default());
        let start = Instant::now();

        sequencer.run_cycle(decode_line(b"111111")).await.unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(442), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(460), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_command_twice_moves_nothing_the_second_time() {
        let (mut sequencer, recorder) = sequencer_with(HandHalMock::default());
        let target = decode_line(b"011010");

        sequencer.run_cycle(target).await.unwrap();
        let after_first = recorder.commands().len();
        sequencer.run_cycle(target).await.unwrap();

        assert_eq!(after_first, 3 * 26);
        assert_eq!(recorder.commands().len(), after_first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extend_after_flex_uses_extend_ramp() {
        let (mut sequencer, recorder) = sequencer_with(HandHalMock::default());

        sequencer.run_cycle(decode_line(b"000010")).await.unwrap();
        sequencer.run_cycle(decode_line(b"000000")).await.unwrap();

        let ring = recorder.commands_for(Finger::Ring);
        let mut expected = expected_ramp(Finger::Ring, Direction::Flex);
        expected.extend(expected_ramp(Finger::Ring, Direction::Extend));
        assert_eq!(ring, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensor_above_threshold_stops_finger_for_rest_of_cycle() {
        // Three readings under the index threshold, then one above it, then quiet again.
        let hal = HandHalMock::default()
            .with_scripted_readings(Finger::Index, [0, 0, 0, 4000]);
        let (mut sequencer, recorder) = sequencer_with(hal);

        sequencer.run_cycle(decode_line(b"001100")).await.unwrap();

        assert_eq!(recorder.commands_for(Finger::Index), expected_ramp(Finger::Index, Direction::Flex)[..3].to_vec());
        assert_eq!(recorder.commands_for(Finger::Middle).len(), 26);
        assert_eq!(sequencer.latched(), decode_line(b"001100"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_untargeted_finger_stays_still_with_sensor_high() {
        let hal = HandHalMock::default().with_steady_reading(Finger::Index, 4000);
        let (mut sequencer, recorder) = sequencer_with(hal);

        sequencer.run_cycle(decode_line(b"010000")).await.unwrap();

        assert!(recorder.commands_for(Finger::Index).is_empty());
        assert_eq!(recorder.commands_for(Finger::Thumb).len(), 26);
        assert_eq!(sequencer.latched(), decode_line(b"010000"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensor_high_on_first_step_latches_before_any_command() {
        let hal = HandHalMock::default().with_steady_reading(Finger::Index, 4000);
        let (mut sequencer, recorder) = sequencer_with(hal);
        let target = decode_line(b"011000");

        sequencer.run_cycle(target).await.unwrap();

        assert!(recorder.commands_for(Finger::Index).is_empty());
        assert_eq!(recorder.commands_for(Finger::Thumb), expected_ramp(Finger::Thumb, Direction::Flex));
        assert_eq!(sequencer.latched(), target);
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_arriving_mid_cycle_runs_after_it() {
        let (mut sequencer, recorder) = sequencer_with(HandHalMock::default());
        let (tx, rx) = watch::channel(HandState::all_extended());
        let (mut writer, reader) = tokio::io::duplex(64);
        let _lane = CommandDecoderLane::start(reader, tx);

        tokio::spawn(async move {
            writer.write_all(b"000000\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            writer.write_all(b"111111\n").await.unwrap();
        });

        let cycles = sequencer.run(rx).await.unwrap();

        assert_eq!(cycles, 2);
        assert_eq!(sequencer.latched(), HandState::from_fn(|_| true));
        assert_eq!(recorder.commands().len(), 6 * 26);
        assert_eq!(sequencer.phase.get(), SequencerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_phase_transitions() {
        let (mut sequencer, _) = sequencer_with(HandHalMock::default());
        let mut phases = sequencer.phase.signal_cloned().to_stream();
        let (tx, rx) = watch::channel(HandState::all_extended());
        let handle = tokio::spawn(async move { sequencer.run(rx).await.unwrap() });

        assert_eq!(phases.next().await, Some(SequencerPhase::Idle));
        let target = decode_line(b"000001");
        tx.send(target).unwrap();
        assert_eq!(phases.next().await, Some(SequencerPhase::Animating(target)));
        assert_eq!(phases.next().await, Some(SequencerPhase::Idle));

        drop(tx);
        assert_eq!(handle.await.unwrap(), 1);
    }

    struct BrokenServoHal;

    impl HandHal for BrokenServoHal {
        fn read_sensor(&self, _finger: Finger) -> HalResult<u16> {
            Ok(0)
        }

        fn send_servo_pulse(&mut self, finger: Finger, _pulse: PulseWidth) -> HalResult<()> {
            Err(HalError::DeviceNotConnected(format!("{finger} servo unplugged")))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hal_failure_aborts_cycle() {
        let mut sequencer = MotionSequencer::new(
            Box::new(BrokenServoHal),
            SensorGate::default(),
            ActuatorMapper::default(),
            DEFAULT_STEP_INTERVAL);

        let result = sequencer.run_cycle(decode_line(b"000100")).await;

        assert!(matches!(result, Err(SequencerError::Hal(HalError::DeviceNotConnected(_)))));
        assert_eq!(sequencer.latched(), HandState::all_extended());
    }
}

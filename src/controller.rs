use std::future::Future;
use std::io;
use std::time::Duration;

use futures_signals::signal::SignalExt;
use log::{debug, warn};
use tokio::io::AsyncRead;
use tokio::runtime::Runtime;
use tokio::sync::watch;

use crate::command_decoder::CommandDecoderLane;
use crate::config::HandConfig;
use crate::finger::HandState;
use crate::hand_hal::HandHal;
use crate::motion_sequencer::{MotionSequencer, SequencerError};

/// How long blocking input reads get to wind down once the controller is done.  Stdin and serial
/// reads can't be cancelled, so after this they are abandoned.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

pub fn new_runtime() -> io::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Runs `future` to completion and then tears the runtime down without waiting on reads that are
/// still parked on the blocking pool.
pub fn block_on_then_shutdown<F: Future>(runtime: Runtime, future: F) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    output
}

/// Decodes commands from `input` and carries them out on `hal` until the input closes.  Returns
/// the number of commands run, or the first hardware/calibration failure.
pub async fn drive<R>(input: R, hal: Box<dyn HandHal + Send>, config: &HandConfig) -> Result<usize, SequencerError>
where
    R: AsyncRead + Unpin + Send + 'static {
    let (commands_tx, commands_rx) = watch::channel(HandState::all_extended());
    let lane = CommandDecoderLane::start(input, commands_tx);
    let mut sequencer = MotionSequencer::new(
        hal,
        config.sensor_gate(),
        config.actuator_mapper(),
        config.step_interval());
    let phase_logger = tokio::spawn(sequencer.phase.signal_cloned().for_each(|phase| {
        debug!("Sequencer: {phase:?}");
        async {}
    }));

    let result = sequencer.run(commands_rx).await;
    phase_logger.abort();
    match result {
        Ok(cycles) => {
            lane.join().await;
            Ok(cycles)
        },
        Err(e) => {
            warn!("Stopping after failure: {e}");
            Err(e)
        },
    }
}

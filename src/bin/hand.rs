//! Drives the hand from 6-digit command lines (wrist, thumb, index, middle, ring, pinky; `1` to
//! flex, `0` to extend) arriving on a serial device, a file or stdin.
//!
//! Serial devices (`/dev/tty*`, `/dev/serial/*`) are opened at `--baud`.  Exits once the input
//! closes and the last command has been carried out, or with an error as soon as the hardware
//! fails.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::{debug, info};
use tokio::io::AsyncRead;

use servo_hand::config::HandConfig;
use servo_hand::controller;
use servo_hand::hand_hal_factory::HandHalFactory;
use servo_hand::serial_link;
use servo_hand::serial_link::DEFAULT_BAUD_RATE;

#[derive(Parser, Debug)]
#[clap(name = "hand")]
struct Opts {
    /// Serial device or file to read commands from, `-` for stdin.
    #[clap(short, long, default_value = "-")]
    input: String,

    #[clap(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// JSON calibration file, defaults are used for anything it leaves out.
    #[clap(short, long)]
    config: Option<PathBuf>,

    #[clap(long)]
    fake_hw: bool,

    #[clap(long)]
    step_interval_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opts: Opts = Opts::parse();

    let runtime = controller::new_runtime()?;
    let cycles = controller::block_on_then_shutdown(runtime, run(opts))?;
    info!("Done after {cycles} commands");
    Ok(())
}

async fn run(opts: Opts) -> anyhow::Result<usize> {
    let mut config = HandConfig::load_or_default(opts.config.as_ref())?;
    if let Some(step_interval_ms) = opts.step_interval_ms {
        config.step_interval_ms = step_interval_ms;
    }
    debug!("{config:?}");

    let hal = HandHalFactory::new_maybe_mock(opts.fake_hw).create_hal()?;
    let input = open_input(&opts.input, opts.baud).await?;

    info!("Waiting for commands on {}...", opts.input);
    let cycles = controller::drive(input, hal, &config).await?;
    Ok(cycles)
}

async fn open_input(input: &str, baud: u32) -> anyhow::Result<Box<dyn AsyncRead + Unpin + Send>> {
    if input == "-" {
        return Ok(Box::new(tokio::io::stdin()));
    }
    if serial_link::is_serial_device(input) {
        let port = serial_link::open_port(input, baud, serial_link::READ_TIMEOUT)?;
        return Ok(Box::new(serial_link::blocking_reader(port)));
    }
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("opening command input {input}"))?;
    Ok(Box::new(file))
}

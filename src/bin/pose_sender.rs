//! Host side of the link: reads raw per-frame poses (one 6-digit line per camera frame) from
//! stdin, debounces them, and forwards a command line to the hand only when the pose changes.
//!
//! A serial `--output` is opened at `--baud`; any other path is written as a plain file.

use std::fs::OpenOptions;
use std::io;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::thread;

use anyhow::Context;
use clap::Parser;
use log::info;

use servo_hand::command_decoder::decode_line;
use servo_hand::pose_debouncer::{PoseDebouncer, DEFAULT_WINDOW};
use servo_hand::serial_link;
use servo_hand::serial_link::DEFAULT_BAUD_RATE;

#[derive(Parser, Debug)]
#[clap(name = "pose_sender")]
struct Opts {
    /// Number of frames voted over before a pose is sent.
    #[clap(short, long, default_value_t = DEFAULT_WINDOW)]
    window: usize,

    /// Serial device or file to write commands to, stdout if omitted.
    #[clap(short, long)]
    output: Option<PathBuf>,

    #[clap(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opts: Opts = Opts::parse();

    let mut output = open_output(&opts)?;

    let mut debouncer = PoseDebouncer::new(opts.window);
    info!("Averaging over {} frames", opts.window);
    for line in io::stdin().lock().lines() {
        let line = line?;
        if let Some(pose) = debouncer.push(decode_line(line.trim_end().as_bytes())) {
            info!("Sending {pose} ({})", pose.describe());
            writeln!(output, "{pose}")?;
            output.flush()?;
        }
    }
    Ok(())
}

fn open_output(opts: &Opts) -> anyhow::Result<Box<dyn Write>> {
    let Some(path) = &opts.output else {
        return Ok(Box::new(io::stdout()));
    };
    let path_str = path.to_string_lossy();
    if serial_link::is_serial_device(&path_str) {
        let port = serial_link::open_port(&path_str, opts.baud, serial_link::WRITE_TIMEOUT)?;
        info!("Waiting for the hand to boot...");
        thread::sleep(serial_link::SETTLE_TIME);
        return Ok(Box::new(port));
    }
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    Ok(Box::new(file))
}

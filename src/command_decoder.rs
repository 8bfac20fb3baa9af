use std::collections::VecDeque;

use log::{error, info, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::finger::HandState;

pub const LINE_TERMINATOR: u8 = b'\n';

/// Longest partial line kept while waiting for a terminator.  Only the first six bytes of a line
/// matter, this just keeps a stream with no terminators from growing the buffer forever.
pub const MAX_BUFFERED_BYTES: usize = 64;

/// One digit per finger in wire order, `'0'` extends, any other digit flexes.  Short lines and
/// non-digit bytes leave the finger extended.
pub fn decode_line(line: &[u8]) -> HandState {
  HandState::from_fn(|finger| match line.get(finger.position()) {
    Some(b) if b.is_ascii_digit() => *b != b'0',
    _ => false,
  })
}

#[derive(Debug, Default)]
pub struct CommandDecoder {
  buffer: VecDeque<u8>,
}

impl CommandDecoder {
  pub fn push(&mut self, byte: u8) -> Option<HandState> {
    if byte == LINE_TERMINATOR {
      let line: Vec<u8> = self.buffer.drain(..).collect();
      return Some(decode_line(&line));
    }
    if self.buffer.len() == MAX_BUFFERED_BYTES {
      warn!("Command buffer full without a line terminator, dropping oldest byte");
      self.buffer.pop_front();
    }
    self.buffer.push_back(byte);
    None
  }
}

/// Background task turning the raw input stream into hand state snapshots.  Every completed line
/// is published, even when it repeats the previous one.
pub struct CommandDecoderLane {
  handle: JoinHandle<()>,
  shutdown: UnboundedSender<()>,
}

impl CommandDecoderLane {
  pub fn start<R>(reader: R, commands: watch::Sender<HandState>) -> Self
  where
      R: AsyncRead + Unpin + Send + 'static {
    let (shutdown_tx, shutdown_rx) = sync::mpsc::unbounded_channel::<()>();
    let handle = tokio::spawn(async move {
      run_decoder_loop(reader, commands, shutdown_rx).await;
      info!("Command decoder lane shutting down...");
    });
    Self { handle, shutdown: shutdown_tx }
  }

  /// Waits for the input to close.
  pub async fn join(mut self) {
    if let Err(e) = (&mut self.handle).await {
      error!("Command decoder lane failed: {e}");
    }
  }
}

async fn run_decoder_loop<R>(
    mut reader: R,
    commands: watch::Sender<HandState>,
    mut shutdown: UnboundedReceiver<()>)
where
    R: AsyncRead + Unpin {
  let mut decoder = CommandDecoder::default();
  let mut chunk = [0u8; 64];
  loop {
    tokio::select! {
      result = reader.read(&mut chunk) => {
        match result {
          Ok(0) => {
            info!("Command input closed");
            return;
          },
          Ok(n) => {
            for byte in &chunk[..n] {
              if let Some(state) = decoder.push(*byte) {
                trace!("Decoded command: {state}");
                commands.send_replace(state);
              }
            }
          },
          Err(e) => {
            error!("Error reading command input: {e}");
            return;
          },
        }
      },
      _ = shutdown.recv() => {
        return;
      },
    }
  }
}

impl Drop for CommandDecoderLane {
  fn drop(&mut self) {
    // The lane may already be gone, in which case there is nobody left to tell.
    let _ = self.shutdown.send(());
  }
}

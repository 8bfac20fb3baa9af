use std::io;
use std::io::Read;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use anyhow::Context as _;
use futures::ready;
use log::{debug, error, info};
use serialport::SerialPort;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;

/// The hand's microcontroller listens at this rate.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Short read timeout so a reader thread notices when nobody is listening any more.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Opening the port resets the microcontroller; commands sent before it boots are lost.
pub const SETTLE_TIME: Duration = Duration::from_secs(2);

const CHUNK_SIZE: usize = 64;

pub fn is_serial_device(path: &str) -> bool {
    path.starts_with("/dev/tty") || path.starts_with("/dev/serial/")
}

pub fn open_port(path: &str, baud_rate: u32, timeout: Duration) -> anyhow::Result<Box<dyn SerialPort>> {
    info!("Opening {path} at {baud_rate} baud");
    let port = serialport::new(path, baud_rate)
        .timeout(timeout)
        .open()
        .with_context(|| format!("opening serial port {path} at {baud_rate} baud"))?;
    Ok(port)
}

/// Async view of a blocking reader.  The reads happen on tokio's blocking pool and arrive as
/// chunks; a timed out read is retried until the [`BlockingReader`] is dropped.
pub struct BlockingReader {
    chunks: mpsc::Receiver<io::Result<Vec<u8>>>,
    pending: Vec<u8>,
}

pub fn blocking_reader<R>(mut reader: R) -> BlockingReader
where
    R: Read + Send + 'static {
    let (tx, rx) = mpsc::channel(4);
    tokio::task::spawn_blocking(move || {
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            let item = match reader.read(&mut chunk) {
                Ok(0) => {
                    debug!("Blocking reader hit EOF");
                    return;
                },
                Ok(n) => Ok(chunk[..n].to_vec()),
                Err(e) if is_retryable(&e) => {
                    if tx.is_closed() {
                        return;
                    }
                    continue;
                },
                Err(e) => {
                    error!("Blocking read failed: {e}");
                    Err(e)
                },
            };
            let failed = item.is_err();
            if tx.blocking_send(item).is_err() || failed {
                return;
            }
        }
    });
    BlockingReader { chunks: rx, pending: Vec::new() }
}

fn is_retryable(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock)
}

impl AsyncRead for BlockingReader {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        if self.pending.is_empty() {
            match ready!(self.chunks.poll_recv(cx)) {
                Some(Ok(chunk)) => self.pending = chunk,
                Some(Err(e)) => return Poll::Ready(Err(e)),
                // Reader thread is gone, report EOF.
                None => return Poll::Ready(Ok(())),
            }
        }
        let n = buf.remaining().min(self.pending.len());
        buf.put_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Poll::Ready(Ok(()))
    }
}

//! Serial link to the card reader.
//!
//! Architecture:
//!
//! ```text
//!   SerialLink::open()
//!         │
//!         ├── reader thread  ← blocking reads (short port timeout), splits on '\n'
//!         │                      └── complete record → mpsc → LineReader::next_line()
//!         └── writer         ← cloned port handle, written from the bridge task
//! ```
//!
//! Dropping the link stops the reader thread and closes both handles.

use async_trait::async_trait;
use jukebox_proto::config::SerialConfig;
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::TransportError;

/// Port-level read timeout.  Bounds how long the reader thread takes to
/// notice a stop request; unrelated to the bridge's per-iteration wait.
const READ_SLICE: Duration = Duration::from_millis(100);

/// Longest record kept while waiting for its newline.
const MAX_RECORD: usize = 1024;

/// Line-oriented byte link used by the bridge loop.
#[async_trait]
pub trait LineLink: Send {
    /// Wait at most `wait` for one newline-terminated record (newline removed).
    async fn read_line(&mut self, wait: Duration) -> Result<Option<Vec<u8>>, TransportError>;

    /// Send `text` as-is: no newline, flushed.
    async fn write_text(&mut self, text: &str) -> Result<(), TransportError>;
}

// ── record splitting ──────────────────────────────────────────────────────────

/// Accumulates raw bytes and yields complete `\n`-terminated records.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buf: Vec<u8>,
}

impl LineSplitter {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        for &b in bytes {
            if b == b'\n' {
                out.push(std::mem::take(&mut self.buf));
            } else if self.buf.len() < MAX_RECORD {
                self.buf.push(b);
            }
        }
        out
    }

    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

// ── reader thread ─────────────────────────────────────────────────────────────

/// Owns the blocking reader thread and the receiving end of its channel.
pub struct LineReader {
    lines: mpsc::Receiver<io::Result<Vec<u8>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LineReader {
    pub fn spawn<R>(source: R) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(64);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_r = stop.clone();
        let handle = std::thread::Builder::new()
            .name("serial-reader".into())
            .spawn(move || reader_loop(source, tx, stop_r))?;
        Ok(Self {
            lines: rx,
            stop,
            handle: Some(handle),
        })
    }

    pub async fn next_line(&mut self, wait: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        match tokio::time::timeout(wait, self.lines.recv()).await {
            Err(_) => Ok(None),
            Ok(None) => Err(TransportError::ReaderGone),
            Ok(Some(Ok(line))) => Ok(Some(line)),
            Ok(Some(Err(e))) => Err(TransportError::Io(e)),
        }
    }
}

impl Drop for LineReader {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.lines.close();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("serial reader: thread panicked");
            }
        }
    }
}

fn reader_loop<R: Read>(
    mut source: R,
    tx: mpsc::Sender<io::Result<Vec<u8>>>,
    stop: Arc<AtomicBool>,
) {
    let mut splitter = LineSplitter::default();
    let mut tmp = [0u8; 256];
    while !stop.load(Ordering::Relaxed) {
        match source.read(&mut tmp) {
            Ok(0) => {
                debug!("serial reader: end of stream");
                break;
            }
            Ok(n) => {
                for line in splitter.push(&tmp[..n]) {
                    debug!("serial reader: record of {} bytes", line.len());
                    if tx.blocking_send(Ok(line)).is_err() {
                        return;
                    }
                }
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {
                continue;
            }
            Err(e) => {
                warn!("serial reader: read error: {}", e);
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    }
    if splitter.pending() > 0 {
        debug!("serial reader: dropping {} bytes without newline", splitter.pending());
    }
}

// ── serial port ───────────────────────────────────────────────────────────────

pub struct SerialLink {
    port_name: String,
    writer: Box<dyn SerialPort>,
    reader: LineReader,
}

impl SerialLink {
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let open_err = |source| TransportError::Open {
            port: config.port.clone(),
            source,
        };
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(READ_SLICE)
            .open()
            .map_err(open_err)?;
        let reader_port = port.try_clone().map_err(open_err)?;
        let reader = LineReader::spawn(reader_port)?;

        info!("serial: opened {} @ {} baud", config.port, config.baud_rate);
        Ok(Self {
            port_name: config.port.clone(),
            writer: port,
            reader,
        })
    }
}

#[async_trait]
impl LineLink for SerialLink {
    async fn read_line(&mut self, wait: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        self.reader.next_line(wait).await
    }

    async fn write_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.writer.write_all(text.as_bytes())?;
        self.writer.flush()?;
        debug!("serial: wrote {:?} to {}", text, self.port_name);
        Ok(())
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        info!("serial: closing {}", self.port_name);
    }
}

/// Log the ports the OS knows about; called when the configured one fails.
pub fn log_available_ports() {
    match serialport::available_ports() {
        Ok(ports) if ports.is_empty() => warn!("serial: no ports detected"),
        Ok(ports) => {
            for p in ports {
                info!("serial: available port {} ({:?})", p.port_name, p.port_type);
            }
        }
        Err(e) => warn!("serial: cannot enumerate ports: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splitter_handles_fragments() {
        let mut s = LineSplitter::default();
        assert!(s.push(b"spotify:tr").is_empty());
        assert_eq!(s.pending(), 10);
        let lines = s.push(b"ack:abc\r\nhel");
        assert_eq!(lines, vec![b"spotify:track:abc\r".to_vec()]);
        assert_eq!(s.push(b"lo\n\n"), vec![b"hello".to_vec(), Vec::new()]);
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn test_splitter_caps_runaway_record() {
        let mut s = LineSplitter::default();
        s.push(&vec![b'x'; MAX_RECORD * 2]);
        assert_eq!(s.pending(), MAX_RECORD);
        let lines = s.push(b"\n");
        assert_eq!(lines[0].len(), MAX_RECORD);
    }

    #[tokio::test]
    async fn test_reader_delivers_records_then_reports_gone() {
        let source = io::Cursor::new(b"spotify:album:1\r\nhello\npartial".to_vec());
        let mut reader = LineReader::spawn(source).unwrap();
        let wait = Duration::from_secs(2);

        assert_eq!(
            reader.next_line(wait).await.unwrap(),
            Some(b"spotify:album:1\r".to_vec())
        );
        assert_eq!(reader.next_line(wait).await.unwrap(), Some(b"hello".to_vec()));
        assert!(matches!(
            reader.next_line(wait).await,
            Err(TransportError::ReaderGone)
        ));
    }

    /// An idle port: every read times out.
    struct Idle;

    impl Read for Idle {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            std::thread::sleep(Duration::from_millis(5));
            Err(io::Error::new(io::ErrorKind::TimedOut, "idle"))
        }
    }

    #[tokio::test]
    async fn test_idle_port_times_out_and_drop_stops_thread() {
        let mut reader = LineReader::spawn(Idle).unwrap();
        let got = reader.next_line(Duration::from_millis(50)).await.unwrap();
        assert_eq!(got, None);
        drop(reader);
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        }
    }

    #[tokio::test]
    async fn test_read_error_is_forwarded() {
        let mut reader = LineReader::spawn(Broken).unwrap();
        let err = reader.next_line(Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(err, TransportError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
    }
}

// Output capture for one running target
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::oneshot;
use tracing::debug;

/// Append-only line buffer shared between a stream reader and the verifier
///
/// The reader task is the only writer. The verifier takes a snapshot once the
/// race is decided; the mutex keeps that snapshot consistent with concurrent
/// appends.
#[derive(Clone, Default)]
pub struct OutputBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: String) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One-shot latch fired by the first line containing the sentinel
pub struct ReadyLatch {
    sentinel: String,
    tx: Option<oneshot::Sender<()>>,
}

impl ReadyLatch {
    pub fn new(sentinel: impl Into<String>) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let latch = Self {
            sentinel: sentinel.into(),
            tx: Some(tx),
        };
        (latch, rx)
    }

    /// Returns true only for the line that fires the latch
    pub fn observe(&mut self, line: &str) -> bool {
        if self.tx.is_none() || !line.contains(&self.sentinel) {
            return false;
        }
        if let Some(tx) = self.tx.take() {
            // Receiver may already be gone if the race finished
            let _ = tx.send(());
        }
        true
    }

    pub fn is_fired(&self) -> bool {
        self.tx.is_none()
    }
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

/// Read `stream` line by line into `buffer` until EOF
///
/// Lines are decoded lossily so a program printing invalid UTF-8 is still
/// captured. When a latch is given, each line is checked against it after
/// being stored.
pub async fn pump_lines<R>(stream: R, buffer: OutputBuffer, mut latch: Option<ReadyLatch>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut raw = Vec::new();

    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw).await {
            Ok(0) => break,
            Ok(_) => {
                let line = decode_line(&raw);
                let ready = latch.as_mut().map(|l| l.observe(&line)).unwrap_or(false);
                buffer.push(line);
                if ready {
                    debug!("Ready sentinel seen on stdout");
                }
            }
            Err(e) => {
                debug!(error = %e, "Output stream read failed");
                break;
            }
        }
    }
}

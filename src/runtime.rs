use std::io::Read;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event;
use log::{debug, warn};

use crate::input::{self, Key, KeyDecoder};

/// What the session loop should do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Key(Key),
    /// Nothing arrived within the tick interval.
    Tick,
    /// The input is gone for good.
    Closed,
}

/// Source of decoded keystrokes.
pub trait KeyEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for a key.
    /// Returns Err(Timeout) if it expires and Err(Disconnected) once input has ended.
    fn recv_timeout(&self, timeout: Duration) -> Result<Key, RecvTimeoutError>;
}

/// Production key source using crossterm.
///
/// Polls the terminal from the calling thread. Crossterm resolves escape
/// sequences itself, so `terminal.escape_delay` plays no part here.
#[derive(Debug)]
pub struct CrosstermEventSource {
    _private: (),
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<Key, RecvTimeoutError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match event::poll(remaining) {
                Ok(true) => {}
                Ok(false) => return Err(RecvTimeoutError::Timeout),
                Err(err) => {
                    warn!("terminal input failed: {err}");
                    return Err(RecvTimeoutError::Disconnected);
                }
            }

            match event::read() {
                Ok(ev) => {
                    if let Some(key) = input::from_event(&ev) {
                        return Ok(key);
                    }
                }
                Err(err) => {
                    warn!("terminal input failed: {err}");
                    return Err(RecvTimeoutError::Disconnected);
                }
            }
        }
    }
}

/// Key source decoding raw terminal bytes from any reader, for scripted
/// input. A blocking reader cannot be polled, so a reader thread forwards
/// chunks as they arrive and a decoder thread turns them into keys. A lone
/// ESC is only reported once `escape_delay` passes without further bytes,
/// so arrow key sequences are not split.
pub struct ByteEventSource {
    rx: Receiver<Key>,
}

impl ByteEventSource {
    pub fn new<R: Read + Send + 'static>(reader: R, escape_delay: Duration) -> Self {
        let (bytes_tx, bytes_rx) = mpsc::channel();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || read_chunks(reader, bytes_tx));
        thread::spawn(move || decode_chunks(bytes_rx, tx, escape_delay));

        Self { rx }
    }
}

impl KeyEventSource for ByteEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<Key, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

fn read_chunks<R: Read>(mut reader: R, tx: Sender<Vec<u8>>) {
    let mut buf = [0u8; 256];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
            Err(err) => {
                warn!("reading input failed: {err}");
                break;
            }
        }
    }
    debug!("input reader finished");
}

fn decode_chunks(rx: Receiver<Vec<u8>>, tx: Sender<Key>, escape_delay: Duration) {
    let mut decoder = KeyDecoder::new();
    let mut open = true;

    while open {
        let chunk = if decoder.has_pending() {
            rx.recv_timeout(escape_delay)
        } else {
            rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
        };

        let at_end = match chunk {
            Ok(bytes) => {
                decoder.push(&bytes);
                false
            }
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) => {
                open = false;
                true
            }
        };

        while let Some(key) = decoder.next_key(at_end) {
            if tx.send(key).is_err() {
                return;
            }
        }
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Ticker for a window timeout given in milliseconds.
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis.max(1)))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test key source for unit tests
pub struct TestEventSource {
    rx: Receiver<Key>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<Key>) -> Self {
        Self { rx }
    }
}

impl KeyEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<Key, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the session one key/tick at a time
pub struct Runner<E: KeyEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: KeyEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to the tick interval and returns the next key, or Tick on timeout
    pub fn step(&self) -> Step {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(key) => Step::Key(key),
            Err(RecvTimeoutError::Timeout) => Step::Tick,
            Err(RecvTimeoutError::Disconnected) => Step::Closed,
        }
    }
}

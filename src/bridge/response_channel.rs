//! Read side of the bridge.
//!
//! Each `read` drains the engine-to-host channel until a complete line or the
//! completion sentinel has arrived. A chunk may hold several lines; callers
//! split it themselves.

use std::fs::File;
use std::io::Read;
use std::sync::{Mutex, PoisonError};

use log::{debug, error};

use crate::config::READ_CHUNK_SIZE;
use crate::errors::{BridgeError, BridgeResult};

/// Written after the engine's command loop returns.
pub const COMPLETION_SENTINEL: &str = "quitok\n";

/// Bytes collected by a single `read`.
#[derive(Debug, Default)]
pub struct OutputAccumulator {
    bytes: Vec<u8>,
}

impl OutputAccumulator {
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn ends_with_newline(&self) -> bool {
        self.bytes.last() == Some(&b'\n')
    }

    pub fn contains_sentinel(&self) -> bool {
        let sentinel = COMPLETION_SENTINEL.as_bytes();
        self.bytes.windows(sentinel.len()).any(|w| w == sentinel)
    }

    /// A frame ends on a trailing newline or once the sentinel is present.
    pub fn is_frame_complete(&self) -> bool {
        self.ends_with_newline() || self.contains_sentinel()
    }

    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

#[derive(Debug)]
struct ReaderState<R> {
    reader: R,
    accumulator: OutputAccumulator,
    chunk: Vec<u8>,
}

/// Single-consumer reader over the engine's standard output. Concurrent
/// callers are serialized; each still gets a freshly cleared accumulator.
#[derive(Debug)]
pub struct ResponseChannel<R: Read = File> {
    state: Mutex<ReaderState<R>>,
}

impl<R: Read> ResponseChannel<R> {
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, READ_CHUNK_SIZE)
    }

    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            state: Mutex::new(ReaderState {
                reader,
                accumulator: OutputAccumulator::default(),
                chunk: vec![0; chunk_size.max(1)],
            }),
        }
    }

    /// Blocks until a newline-terminated chunk or the sentinel is available.
    ///
    /// Returns an empty string when the channel is closed before anything
    /// arrived, and `BridgeError::Read` when the underlying read fails. A
    /// failed read is not retried.
    pub fn read(&self) -> BridgeResult<String> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let ReaderState {
            reader,
            accumulator,
            chunk,
        } = &mut *state;
        accumulator.clear();

        loop {
            let n = match reader.read(chunk) {
                Ok(n) => n,
                Err(err) => {
                    error!("reading engine output failed: {}", err);
                    return Err(BridgeError::Read(err));
                }
            };
            if n == 0 {
                debug!("engine output channel closed");
                break;
            }
            accumulator.extend(&chunk[..n]);
            if accumulator.is_frame_complete() {
                break;
            }
        }

        Ok(accumulator.to_text())
    }
}

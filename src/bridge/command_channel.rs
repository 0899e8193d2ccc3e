//! Write side of the bridge.

use std::fs::File;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

use log::{debug, warn};

use crate::errors::{BridgeError, BridgeResult};

/// Accepts host commands and forwards them to the engine's standard input,
/// terminating each one with a newline.
#[derive(Debug)]
pub struct CommandChannel<W: Write = File> {
    writer: Mutex<W>,
}

impl<W: Write> CommandChannel<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn write(&self, command: &str) -> BridgeResult<usize> {
        self.write_bytes(command.as_bytes())
    }

    /// Writes `payload` and, unless it already ends with `\n`, a second write
    /// carrying a single newline. Returns the payload length.
    ///
    /// Success is decided by the payload write alone; a failed newline write
    /// is logged but not reported. Both writes retry short writes until the
    /// bytes are fully transferred.
    pub fn write_bytes(&self, payload: &[u8]) -> BridgeResult<usize> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(payload).map_err(BridgeError::Write)?;

        if payload.last() != Some(&b'\n') {
            if let Err(err) = writer.write_all(b"\n") {
                warn!("command written without line terminator: {}", err);
            }
        }
        if let Err(err) = writer.flush() {
            warn!("flushing command channel failed: {}", err);
        }

        debug!(
            "sent command {:?}",
            String::from_utf8_lossy(payload).trim_end()
        );
        Ok(payload.len())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

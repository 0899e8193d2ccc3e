//! Runs an embedded command loop against a bridge for the whole session.

use std::io::{self, Write};

use log::{error, info};

use crate::bridge::pipe_bridge::{PipeBridge, StreamBinding};
use crate::bridge::response_channel::COMPLETION_SENTINEL;
use crate::engines::engine_trait::{CommandLoop, EngineContext};
use crate::errors::{BridgeError, BridgeResult};

pub struct EngineLoader<E: CommandLoop> {
    engine: E,
    context: EngineContext,
}

impl<E: CommandLoop> EngineLoader<E> {
    pub fn new(engine: E, context: EngineContext) -> Self {
        Self { engine, context }
    }

    /// Binds the engine streams, initializes the engine and runs its loop.
    ///
    /// Does not return until the engine processed its shutdown command. The
    /// completion sentinel is then written and flushed so a reader sees it even
    /// when the engine's last message had no trailing newline. Call this on a
    /// dedicated thread; the host reads and writes from elsewhere.
    pub fn run_blocking(mut self, bridge: &PipeBridge, binding: &StreamBinding) -> BridgeResult<()> {
        let mut streams = bridge.bind_engine_streams(binding)?;

        info!("initializing embedded engine");
        self.engine
            .initialize(&self.context)
            .map_err(engine_failure)?;

        info!("entering engine command loop");
        self.engine
            .run_loop(&mut *streams.input, &mut *streams.output)
            .map_err(engine_failure)?;

        if binding.rewires_standard_streams() {
            // Anything the engine printed through the process stdout must precede the sentinel.
            io::stdout().flush().map_err(engine_failure)?;
        }
        streams
            .output
            .write_all(COMPLETION_SENTINEL.as_bytes())
            .and_then(|()| streams.output.flush())
            .map_err(engine_failure)?;
        info!("engine command loop finished");
        Ok(())
    }
}

fn engine_failure(err: io::Error) -> BridgeError {
    error!("embedded engine failed: {}", err);
    BridgeError::Engine(err)
}

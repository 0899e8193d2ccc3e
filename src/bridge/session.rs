//! One embedded engine session: a channel pair plus the two host-facing
//! channels built on it.

use log::info;

use crate::bridge::command_channel::CommandChannel;
use crate::bridge::pipe_bridge::PipeBridge;
use crate::bridge::response_channel::ResponseChannel;
use crate::config::BridgeConfig;
use crate::errors::BridgeResult;

#[derive(Debug)]
pub struct Session {
    bridge: PipeBridge,
    commands: CommandChannel,
    responses: ResponseChannel,
}

impl Session {
    pub fn initialize() -> BridgeResult<Self> {
        Self::with_config(&BridgeConfig::default())
    }

    pub fn with_config(config: &BridgeConfig) -> BridgeResult<Self> {
        let (bridge, host) = PipeBridge::initialize()?;
        info!("engine session initialized");
        Ok(Self {
            bridge,
            commands: CommandChannel::new(host.command_writer),
            responses: ResponseChannel::with_chunk_size(
                host.response_reader,
                config.read_chunk_size,
            ),
        })
    }

    /// The bridge whose engine ends the loader binds.
    pub fn bridge(&self) -> &PipeBridge {
        &self.bridge
    }

    pub fn write(&self, command: &str) -> BridgeResult<usize> {
        self.commands.write(command)
    }

    pub fn write_bytes(&self, payload: &[u8]) -> BridgeResult<usize> {
        self.commands.write_bytes(payload)
    }

    pub fn read(&self) -> BridgeResult<String> {
        self.responses.read()
    }
}

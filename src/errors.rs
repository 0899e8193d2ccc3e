use std::io;
use std::os::fd::RawFd;

use thiserror::Error;

/// Represents every failure the bridge can report.
/// At the C boundary each variant collapses into a status code or a null pointer.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// `pipe(2)` failed while allocating one of the two engine channels.
    #[error("failed to allocate engine channel: {0}")]
    ChannelAllocation(#[source] io::Error),
    /// `dup2(2)` failed while rerouting a standard stream onto a channel.
    #[error("failed to redirect descriptor {target}: {source}")]
    Redirect {
        target: RawFd,
        #[source]
        source: io::Error,
    },
    /// The engine ends of the channel pair were already handed to a command loop.
    #[error("engine streams are already bound")]
    AlreadyBound,
    /// A process-wide session already exists.
    #[error("bridge session is already initialized")]
    AlreadyInitialized,
    /// An entry point ran before the process-wide session was created.
    #[error("bridge session is not initialized")]
    NotInitialized,
    /// Writing a command into the host-to-engine channel failed.
    #[error("failed to write command: {0}")]
    Write(#[source] io::Error),
    /// Reading from the engine-to-host channel failed.
    #[error("failed to read engine output: {0}")]
    Read(#[source] io::Error),
    /// The embedded command loop failed during initialization or while running.
    #[error("engine failed: {0}")]
    Engine(#[source] io::Error),
    /// Copying an evaluation network into the files directory failed.
    #[error("failed to stage {file}: {source}")]
    Staging {
        file: String,
        #[source]
        source: io::Error,
    },
    /// Engine output could not be handed across the C boundary.
    #[error("engine output contains an interior NUL byte")]
    InteriorNul,
}

pub type BridgeResult<T> = Result<T, BridgeError>;

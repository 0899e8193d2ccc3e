//! Channel allocation and standard-stream redirection.
//!
//! A `PipeBridge` owns the engine side of two unidirectional pipes. The host
//! side (`HostEnds`) is handed out once at initialization and feeds the
//! command and response channels; the engine side is consumed exactly once by
//! `bind_engine_streams`, either by `dup2`-ing it over the process standard
//! streams or by passing the descriptors straight to the command loop.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::{Mutex, PoisonError};

use log::{debug, info};

use crate::errors::{BridgeError, BridgeResult};

/// One unidirectional byte pipe.
#[derive(Debug)]
pub struct Channel {
    pub read_end: File,
    pub write_end: File,
}

impl Channel {
    pub fn open() -> io::Result<Self> {
        let mut fds: [libc::c_int; 2] = [-1; 2];
        // SAFETY: `fds` is a writable buffer of exactly two descriptors.
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: pipe(2) succeeded, so both descriptors are open and unowned.
        let (read_end, write_end) =
            unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
        Ok(Self {
            read_end: File::from(read_end),
            write_end: File::from(write_end),
        })
    }
}

/// The two channels of one embedded engine: four descriptors in total.
#[derive(Debug)]
pub struct ChannelPair {
    pub to_engine: Channel,
    pub from_engine: Channel,
}

impl ChannelPair {
    pub fn allocate() -> BridgeResult<Self> {
        let to_engine = Channel::open().map_err(BridgeError::ChannelAllocation)?;
        let from_engine = Channel::open().map_err(BridgeError::ChannelAllocation)?;
        Ok(Self {
            to_engine,
            from_engine,
        })
    }

    fn split(self) -> (HostEnds, EngineEnds) {
        (
            HostEnds {
                command_writer: self.to_engine.write_end,
                response_reader: self.from_engine.read_end,
            },
            EngineEnds {
                input: self.to_engine.read_end,
                output: self.from_engine.write_end,
            },
        )
    }
}

/// Host side of the pair: where commands go in and responses come out.
#[derive(Debug)]
pub struct HostEnds {
    pub command_writer: File,
    pub response_reader: File,
}

#[derive(Debug)]
struct EngineEnds {
    input: File,
    output: File,
}

/// Descriptors that the engine ends are `dup2`-ed onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectionBinding {
    pub stdin_target: RawFd,
    pub stdout_target: RawFd,
}

impl Default for RedirectionBinding {
    fn default() -> Self {
        Self {
            stdin_target: libc::STDIN_FILENO,
            stdout_target: libc::STDOUT_FILENO,
        }
    }
}

impl RedirectionBinding {
    pub fn targets_standard_streams(&self) -> bool {
        *self == Self::default()
    }
}

/// How the command loop reaches its channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamBinding {
    /// Reroute process-wide descriptors. Required by engines that talk to
    /// fd 0 and fd 1 directly; only one such session can run per process.
    Process(RedirectionBinding),
    /// Hand the channel descriptors to the loop without touching the process
    /// standard streams.
    Direct,
}

impl StreamBinding {
    pub fn process() -> Self {
        StreamBinding::Process(RedirectionBinding::default())
    }

    pub fn rewires_standard_streams(&self) -> bool {
        matches!(self, StreamBinding::Process(targets) if targets.targets_standard_streams())
    }
}

/// Reader and writer a command loop runs against. Output is buffered; loops
/// flush after each reply.
pub struct EngineStreams {
    pub input: Box<dyn BufRead + Send>,
    pub output: Box<dyn Write + Send>,
}

#[derive(Debug)]
pub struct PipeBridge {
    engine_ends: Mutex<Option<EngineEnds>>,
}

impl PipeBridge {
    /// Allocates the channel pair. The returned host ends are the only handles
    /// to the host side; the bridge keeps the engine side until it is bound.
    pub fn initialize() -> BridgeResult<(Self, HostEnds)> {
        let (host, engine) = ChannelPair::allocate()?.split();
        debug!(
            "allocated engine channels: to_engine={}->{} from_engine={}->{}",
            host.command_writer.as_raw_fd(),
            engine.input.as_raw_fd(),
            engine.output.as_raw_fd(),
            host.response_reader.as_raw_fd()
        );
        Ok((
            Self {
                engine_ends: Mutex::new(Some(engine)),
            },
            host,
        ))
    }

    pub fn is_bound(&self) -> bool {
        self.engine_ends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Consumes the engine ends. Must run on the thread that then runs the
    /// command loop; a second call fails with `AlreadyBound`.
    pub fn bind_engine_streams(&self, binding: &StreamBinding) -> BridgeResult<EngineStreams> {
        let ends = self
            .engine_ends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(BridgeError::AlreadyBound)?;

        match binding {
            StreamBinding::Direct => {
                debug!("binding engine streams directly");
                Ok(EngineStreams {
                    input: Box::new(BufReader::new(ends.input)),
                    output: Box::new(BufWriter::new(ends.output)),
                })
            }
            StreamBinding::Process(targets) => {
                redirect(&ends.input, targets.stdin_target)?;
                redirect(&ends.output, targets.stdout_target)?;
                info!(
                    "redirected descriptors {} and {} onto engine channels",
                    targets.stdin_target, targets.stdout_target
                );
                // The originals close here; the redirected copies stay open.
                Ok(EngineStreams {
                    input: Box::new(BufReader::new(duplicate(targets.stdin_target)?)),
                    output: Box::new(BufWriter::new(duplicate(targets.stdout_target)?)),
                })
            }
        }
    }
}

fn redirect(source: &File, target: RawFd) -> BridgeResult<()> {
    // SAFETY: `source` is open for the duration of the call; dup2 atomically
    // replaces whatever `target` referred to.
    if unsafe { libc::dup2(source.as_raw_fd(), target) } < 0 {
        return Err(BridgeError::Redirect {
            target,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

fn duplicate(target: RawFd) -> BridgeResult<File> {
    // SAFETY: dup(2) only reads the descriptor table.
    let fd = unsafe { libc::dup(target) };
    if fd < 0 {
        return Err(BridgeError::Redirect {
            target,
            source: io::Error::last_os_error(),
        });
    }
    // SAFETY: `fd` is a fresh descriptor nobody else owns.
    Ok(File::from(unsafe { OwnedFd::from_raw_fd(fd) }))
}

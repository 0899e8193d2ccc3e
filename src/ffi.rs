//! C entry points.
//!
//! The managed-runtime binding calls these four functions (plus the optional
//! writable-directory hand-off and network staging) and never sees a session handle, so they share
//! one process-wide `Session`. Every failure is reported as a plain status
//! code or a null pointer.

use std::ffi::{c_char, c_int, CStr, CString};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use log::{error, info, warn};

use crate::bridge::pipe_bridge::StreamBinding;
use crate::bridge::session::Session;
use crate::config::BridgeConfig;
use crate::engines::engine_loader::EngineLoader;
use crate::engines::engine_trait::{CommandLoop, EngineContext};
use crate::engines::protocol_engine::ProtocolEngine;
use crate::errors::BridgeError;
use crate::resolver::resolver_chain::ResolverChain;
use crate::resolver::staging::{stage_configured, stage_network_files};

pub const STATUS_OK: c_int = 0;
pub const STATUS_ALREADY_INITIALIZED: c_int = 1;
pub const STATUS_NOT_INITIALIZED: c_int = 2;
pub const STATUS_ALREADY_RUNNING: c_int = 3;
pub const STATUS_FAILURE: c_int = -1;

pub type EngineFactory = Box<dyn FnOnce() -> Box<dyn CommandLoop> + Send>;

/// What `stockfish_main` runs and how it reaches its channels.
pub struct Embedding {
    pub binding: StreamBinding,
    pub engine: EngineFactory,
}

impl Default for Embedding {
    fn default() -> Self {
        Self {
            binding: StreamBinding::process(),
            engine: Box::new(|| Box::new(ProtocolEngine::new())),
        }
    }
}

static SESSION: OnceLock<Session> = OnceLock::new();
static EMBEDDING: Mutex<Option<Embedding>> = Mutex::new(None);
static FILES_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
static LAST_OUTPUT: Mutex<Option<CString>> = Mutex::new(None);

/// Installs the engine `stockfish_main` will run. Without it the protocol
/// responder runs with the process standard streams redirected.
pub fn configure_embedding(embedding: Embedding) {
    *EMBEDDING.lock().unwrap_or_else(PoisonError::into_inner) = Some(embedding);
}

fn bridge_config() -> BridgeConfig {
    let mut config = BridgeConfig::from_env();
    if let Some(dir) = FILES_DIR
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
    {
        config.files_dir = Some(dir);
    }
    config
}

fn status_of(err: &BridgeError) -> c_int {
    match err {
        BridgeError::AlreadyInitialized => STATUS_ALREADY_INITIALIZED,
        BridgeError::NotInitialized => STATUS_NOT_INITIALIZED,
        BridgeError::AlreadyBound => STATUS_ALREADY_RUNNING,
        _ => STATUS_FAILURE,
    }
}

fn session() -> Result<&'static Session, BridgeError> {
    SESSION.get().ok_or(BridgeError::NotInitialized)
}

/// Records the host's writable directory for file resolution.
///
/// # Safety
/// `path` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn stockfish_set_files_dir(path: *const c_char) -> c_int {
    if path.is_null() {
        return STATUS_FAILURE;
    }
    // SAFETY: the caller guarantees a valid NUL-terminated string.
    let dir = unsafe { CStr::from_ptr(path) }.to_string_lossy().into_owned();
    info!("files directory set to {}", dir);
    *FILES_DIR.lock().unwrap_or_else(PoisonError::into_inner) = Some(PathBuf::from(dir));
    STATUS_OK
}

/// Copies both evaluation networks from `source_dir` into the recorded files
/// directory, skipping any already there.
///
/// # Safety
/// `source_dir` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn stockfish_stage_network_files(source_dir: *const c_char) -> c_int {
    if source_dir.is_null() {
        return STATUS_FAILURE;
    }
    // SAFETY: the caller guarantees a valid NUL-terminated string.
    let source = PathBuf::from(unsafe { CStr::from_ptr(source_dir) }.to_string_lossy().into_owned());
    let Some(files_dir) = bridge_config().files_dir else {
        warn!("no files directory recorded; nothing to stage into");
        return STATUS_FAILURE;
    };
    match stage_network_files(&source, &files_dir) {
        Ok(_) => STATUS_OK,
        Err(err) => {
            warn!("stockfish_stage_network_files failed: {}", err);
            status_of(&err)
        }
    }
}

/// Allocates the engine channels. A second call is refused.
///
/// When an asset directory is configured the networks are staged first; a
/// staging failure does not fail initialization.
#[no_mangle]
pub extern "C" fn stockfish_init() -> c_int {
    if SESSION.get().is_some() {
        warn!("stockfish_init called twice; keeping the existing session");
        return STATUS_ALREADY_INITIALIZED;
    }
    let config = bridge_config();
    stage_configured(&config);
    let session = match Session::with_config(&config) {
        Ok(session) => session,
        Err(err) => {
            error!("stockfish_init failed: {}", err);
            return status_of(&err);
        }
    };
    // A racing initializer may have won; the losing session drops and closes its pipes.
    match SESSION.set(session) {
        Ok(()) => STATUS_OK,
        Err(_) => STATUS_ALREADY_INITIALIZED,
    }
}

/// Runs the engine loop; blocks until the engine has processed `quit`.
#[no_mangle]
pub extern "C" fn stockfish_main() -> c_int {
    let session = match session() {
        Ok(session) => session,
        Err(err) => return status_of(&err),
    };
    if session.bridge().is_bound() {
        return STATUS_ALREADY_RUNNING;
    }

    let embedding = EMBEDDING
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
        .unwrap_or_default();
    let resolver = Arc::new(ResolverChain::for_platform(&bridge_config()));
    let loader = EngineLoader::new((embedding.engine)(), EngineContext::new(resolver));

    match loader.run_blocking(session.bridge(), &embedding.binding) {
        Ok(()) => STATUS_OK,
        Err(err) => {
            error!("stockfish_main failed: {}", err);
            status_of(&err)
        }
    }
}

/// Sends one command; a newline is appended when missing. Returns 1 on success.
///
/// # Safety
/// `data` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn stockfish_stdin_write(data: *const c_char) -> c_int {
    if data.is_null() {
        return 0;
    }
    // SAFETY: the caller guarantees a valid NUL-terminated string.
    let payload = unsafe { CStr::from_ptr(data) }.to_bytes();
    match session().and_then(|s| s.write_bytes(payload)) {
        Ok(_) => 1,
        Err(err) => {
            warn!("stockfish_stdin_write failed: {}", err);
            0
        }
    }
}

/// Blocks until a line or the completion sentinel is available.
///
/// The returned string stays valid until the next call. Null means the read
/// failed; it is not distinguished from other failures.
#[no_mangle]
pub extern "C" fn stockfish_stdout_read() -> *const c_char {
    let output = session()
        .and_then(|s| s.read())
        .and_then(|text| CString::new(text).map_err(|_| BridgeError::InteriorNul));

    let mut slot = LAST_OUTPUT.lock().unwrap_or_else(PoisonError::into_inner);
    match output {
        Ok(text) => slot.insert(text).as_ptr(),
        Err(err) => {
            error!("stockfish_stdout_read failed: {}", err);
            *slot = None;
            std::ptr::null()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::{CStr, CString};
    use std::fs;
    use std::thread;

    use tempfile::tempdir;

    use super::{
        configure_embedding, stockfish_init, stockfish_main, stockfish_set_files_dir,
        stockfish_stage_network_files, stockfish_stdin_write, stockfish_stdout_read, Embedding,
        STATUS_ALREADY_INITIALIZED, STATUS_FAILURE, STATUS_OK,
    };
    use crate::bridge::pipe_bridge::StreamBinding;
    use crate::bridge::response_channel::COMPLETION_SENTINEL;
    use crate::engines::protocol_engine::ProtocolEngine;
    use crate::resolver::resolver_chain::{BIG_NETWORK_FILE, SMALL_NETWORK_FILE};

    fn c_path(path: &std::path::Path) -> CString {
        CString::new(path.to_str().unwrap()).unwrap()
    }

    fn read_until(needle: &str) -> String {
        loop {
            let ptr = stockfish_stdout_read();
            assert!(!ptr.is_null(), "read failed before {:?}", needle);
            // SAFETY: non-null pointers from stockfish_stdout_read are valid C strings.
            let chunk = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
            assert!(!chunk.is_empty(), "channel closed before {:?}", needle);
            if chunk.contains(needle) {
                return chunk;
            }
        }
    }

    // The session and embedding globals are exercised in this one test.
    #[test]
    fn entry_points_drive_a_full_session() {
        // SAFETY: a null pointer is an accepted input.
        assert_eq!(unsafe { stockfish_stdin_write(std::ptr::null()) }, 0);

        configure_embedding(Embedding {
            binding: StreamBinding::Direct,
            engine: Box::new(|| Box::new(ProtocolEngine::new())),
        });
        assert_eq!(stockfish_init(), STATUS_OK);
        assert_eq!(stockfish_init(), STATUS_ALREADY_INITIALIZED);

        let engine = thread::spawn(|| stockfish_main());

        let isready = CString::new("isready").unwrap();
        // SAFETY: `isready` is a valid C string for the duration of the call.
        assert_eq!(unsafe { stockfish_stdin_write(isready.as_ptr()) }, 1);
        assert!(read_until("readyok").contains("readyok\n"));

        let quit = CString::new("quit\n").unwrap();
        // SAFETY: as above.
        assert_eq!(unsafe { stockfish_stdin_write(quit.as_ptr()) }, 1);
        assert!(read_until(COMPLETION_SENTINEL).contains(COMPLETION_SENTINEL));

        assert_eq!(engine.join().unwrap(), STATUS_OK);
        // The engine side is closed; the read reports an empty chunk.
        // SAFETY: non-null result checked first.
        let ptr = stockfish_stdout_read();
        assert!(!ptr.is_null());
        assert_eq!(unsafe { CStr::from_ptr(ptr) }.to_bytes(), b"");
    }

    #[test]
    fn staging_entry_point_fills_the_files_dir() {
        let assets = tempdir().unwrap();
        let files = tempdir().unwrap();
        fs::write(assets.path().join(BIG_NETWORK_FILE), b"big").unwrap();
        fs::write(assets.path().join(SMALL_NETWORK_FILE), b"small").unwrap();

        // SAFETY: null is an accepted input; the other pointers are live C strings.
        unsafe {
            assert_eq!(stockfish_stage_network_files(std::ptr::null()), STATUS_FAILURE);
            assert_eq!(stockfish_set_files_dir(c_path(files.path()).as_ptr()), STATUS_OK);
            assert_eq!(
                stockfish_stage_network_files(c_path(assets.path()).as_ptr()),
                STATUS_OK
            );
        }
        assert_eq!(fs::read(files.path().join(BIG_NETWORK_FILE)).unwrap(), b"big");
        assert_eq!(fs::read(files.path().join(SMALL_NETWORK_FILE)).unwrap(), b"small");

        let empty = tempdir().unwrap();
        fs::remove_file(files.path().join(SMALL_NETWORK_FILE)).unwrap();
        // SAFETY: as above.
        let status = unsafe { stockfish_stage_network_files(c_path(empty.path()).as_ptr()) };
        assert_eq!(status, STATUS_FAILURE);
    }
}

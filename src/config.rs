//! Bridge configuration.
//!
//! The host hands over its writable directory, and optionally the read-only
//! asset directory the evaluation networks are staged from, before the
//! session starts; everything else has a fixed default.

use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable carrying the host's writable directory.
pub const FILES_DIR_ENV: &str = "STOCKFISH_FILES_DIR";

/// Environment variable overriding the bundle resource root.
pub const BUNDLE_ROOT_ENV: &str = "STOCKFISH_BUNDLE_DIR";

/// Environment variable naming the read-only directory the networks ship in.
pub const ASSETS_DIR_ENV: &str = "STOCKFISH_ASSETS_DIR";

/// Size of a single underlying read from the engine-to-host channel.
pub const READ_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Writable directory probed last when resolving auxiliary files.
    pub files_dir: Option<PathBuf>,
    /// Explicit bundle resource root; `None` derives it from the executable.
    pub bundle_root: Option<PathBuf>,
    /// Where network files are copied from into `files_dir` at startup.
    pub assets_dir: Option<PathBuf>,
    pub read_chunk_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            files_dir: None,
            bundle_root: None,
            assets_dir: None,
            read_chunk_size: READ_CHUNK_SIZE,
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Builds a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);
        Self {
            files_dir: non_empty(FILES_DIR_ENV),
            bundle_root: non_empty(BUNDLE_ROOT_ENV),
            assets_dir: non_empty(ASSETS_DIR_ENV),
            ..Self::default()
        }
    }

    pub fn with_files_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.files_dir = Some(dir.into());
        self
    }

    pub fn with_bundle_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.bundle_root = Some(root.into());
        self
    }

    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = Some(dir.into());
        self
    }

    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::PathBuf;

    use super::{BridgeConfig, ASSETS_DIR_ENV, FILES_DIR_ENV, READ_CHUNK_SIZE};

    #[test]
    fn lookup_reads_files_dir() {
        let config = BridgeConfig::from_lookup(|key| {
            (key == FILES_DIR_ENV).then(|| OsString::from("/data/user/0/app/files"))
        });
        assert_eq!(
            config.files_dir,
            Some(PathBuf::from("/data/user/0/app/files"))
        );
        assert_eq!(config.bundle_root, None);
        assert_eq!(config.assets_dir, None);
        assert_eq!(config.read_chunk_size, READ_CHUNK_SIZE);
    }

    #[test]
    fn lookup_reads_assets_dir() {
        let config = BridgeConfig::from_lookup(|key| {
            (key == ASSETS_DIR_ENV).then(|| OsString::from("/app/assets"))
        });
        assert_eq!(config.assets_dir, Some(PathBuf::from("/app/assets")));
        assert_eq!(config.files_dir, None);
    }

    #[test]
    fn empty_values_are_treated_as_unset() {
        let config = BridgeConfig::from_lookup(|_| Some(OsString::new()));
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn chunk_size_never_drops_to_zero() {
        let config = BridgeConfig::default().with_read_chunk_size(0);
        assert_eq!(config.read_chunk_size, 1);
    }
}

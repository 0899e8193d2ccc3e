//! Ordered resolution of auxiliary engine files.
//!
//! The same binary runs on a desktop filesystem, inside a mobile bundle with
//! read-only resources, and in a sandbox with a separate writable area, so a
//! file may legitimately live in any of those places. Probes are tried in
//! order; when none hits, the logical name is returned as-is and the engine
//! reports its own file-not-found diagnostic.

use std::path::PathBuf;

use log::{debug, warn};

use crate::config::BridgeConfig;
use crate::resolver::probes::{BundleProbe, FilesDirProbe, ResourceProbe, WorkingDirProbe};

/// Default big evaluation network.
pub const BIG_NETWORK_FILE: &str = "nn-1111cefa1111.nnue";
/// Default small evaluation network.
pub const SMALL_NETWORK_FILE: &str = "nn-37f18f62d772.nnue";

#[derive(Debug, Default)]
pub struct ResolverChain {
    probes: Vec<Box<dyn ResourceProbe>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe(mut self, probe: impl ResourceProbe + 'static) -> Self {
        self.probes.push(Box::new(probe));
        self
    }

    /// Working directory first, then the bundle (Apple targets, or wherever a
    /// bundle root is configured), then the host's writable directory.
    pub fn for_platform(config: &BridgeConfig) -> Self {
        let mut chain = Self::new().with_probe(WorkingDirProbe::current());

        let bundle = match &config.bundle_root {
            Some(root) => Some(BundleProbe::at(root)),
            None if cfg!(any(target_os = "ios", target_os = "macos")) => BundleProbe::main(),
            None => None,
        };
        if let Some(bundle) = bundle {
            chain = chain.with_probe(bundle);
        }

        if let Some(dir) = &config.files_dir {
            chain = chain.with_probe(FilesDirProbe::new(dir));
        }
        chain
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.probes.iter().map(|p| p.label()).collect()
    }

    pub fn resolve(&self, logical_name: &str) -> PathBuf {
        for probe in &self.probes {
            if let Some(path) = probe.probe(logical_name) {
                debug!(
                    "resolved {} via {} to {}",
                    logical_name,
                    probe.label(),
                    path.display()
                );
                return path;
            }
        }
        warn!("{} not found in any search location", logical_name);
        PathBuf::from(logical_name)
    }
}

/// Resolved locations of both evaluation networks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkFiles {
    pub big: PathBuf,
    pub small: PathBuf,
}

impl NetworkFiles {
    pub fn resolve(chain: &ResolverChain) -> Self {
        Self {
            big: chain.resolve(BIG_NETWORK_FILE),
            small: chain.resolve(SMALL_NETWORK_FILE),
        }
    }
}

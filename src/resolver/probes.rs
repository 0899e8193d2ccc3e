//! Individual lookup strategies for auxiliary engine files.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// One place an auxiliary file may live.
pub trait ResourceProbe: fmt::Debug + Send + Sync {
    fn label(&self) -> &'static str;

    /// Returns a path to a readable file for `logical_name`, if this location has one.
    fn probe(&self, logical_name: &str) -> Option<PathBuf>;
}

fn is_readable_file(path: &Path) -> bool {
    File::open(path)
        .and_then(|f| f.metadata())
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// The name as given, relative to the working directory.
#[derive(Debug, Clone, Default)]
pub struct WorkingDirProbe {
    root: Option<PathBuf>,
}

impl WorkingDirProbe {
    /// Probes the process working directory and returns the name unchanged on a hit.
    pub fn current() -> Self {
        Self { root: None }
    }

    /// Probes `root` as if it were the working directory.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl ResourceProbe for WorkingDirProbe {
    fn label(&self) -> &'static str {
        "working-dir"
    }

    fn probe(&self, logical_name: &str) -> Option<PathBuf> {
        let candidate = match &self.root {
            Some(root) => root.join(logical_name),
            None => PathBuf::from(logical_name),
        };
        is_readable_file(&candidate).then_some(candidate)
    }
}

/// Read-only resources shipped inside the application bundle.
#[derive(Debug, Clone)]
pub struct BundleProbe {
    resources: PathBuf,
}

impl BundleProbe {
    pub fn at(resources: impl Into<PathBuf>) -> Self {
        Self {
            resources: resources.into(),
        }
    }

    /// Bundle of the running executable.
    pub fn main() -> Option<Self> {
        let exe = std::env::current_exe().ok()?;
        Self::for_executable(&exe)
    }

    /// iOS bundles keep resources next to the executable; macOS bundles keep
    /// them in `Contents/Resources`, a sibling of `Contents/MacOS`.
    pub fn for_executable(exe: &Path) -> Option<Self> {
        let dir = exe.parent()?;
        let resources = match (dir.file_name(), dir.parent()) {
            (Some(name), Some(contents)) if name == "MacOS" => contents.join("Resources"),
            _ => dir.to_path_buf(),
        };
        Some(Self::at(resources))
    }

    pub fn resources(&self) -> &Path {
        &self.resources
    }
}

impl ResourceProbe for BundleProbe {
    fn label(&self) -> &'static str {
        "bundle"
    }

    fn probe(&self, logical_name: &str) -> Option<PathBuf> {
        let candidate = self.resources.join(logical_name);
        is_readable_file(&candidate).then_some(candidate)
    }
}

/// Writable directory supplied by the host runtime.
#[derive(Debug, Clone)]
pub struct FilesDirProbe {
    dir: PathBuf,
}

impl FilesDirProbe {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ResourceProbe for FilesDirProbe {
    fn label(&self) -> &'static str {
        "files-dir"
    }

    fn probe(&self, logical_name: &str) -> Option<PathBuf> {
        let candidate = self.dir.join(logical_name);
        is_readable_file(&candidate).then_some(candidate)
    }
}

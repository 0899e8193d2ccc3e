//! Copies the evaluation networks from read-only assets into the writable
//! files directory, where `FilesDirProbe` finds them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::errors::{BridgeError, BridgeResult};
use crate::resolver::resolver_chain::{BIG_NETWORK_FILE, SMALL_NETWORK_FILE};

pub const NETWORK_FILES: [&str; 2] = [BIG_NETWORK_FILE, SMALL_NETWORK_FILE];

/// What happened to each network file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingReport {
    pub copied: Vec<PathBuf>,
    pub already_present: Vec<PathBuf>,
}

/// Stages both network files from `source_dir` into `files_dir`.
///
/// Files already in `files_dir` are left alone. Stops at the first copy that
/// fails; files staged before it stay in place.
pub fn stage_network_files(source_dir: &Path, files_dir: &Path) -> BridgeResult<StagingReport> {
    stage_files(source_dir, files_dir, &NETWORK_FILES)
}

/// Stages from `config.assets_dir` into `config.files_dir` when both are set.
/// Failures are logged and startup carries on.
pub fn stage_configured(config: &BridgeConfig) -> Option<StagingReport> {
    let (assets, files) = match (&config.assets_dir, &config.files_dir) {
        (Some(assets), Some(files)) => (assets, files),
        _ => return None,
    };
    match stage_network_files(assets, files) {
        Ok(report) => Some(report),
        Err(err) => {
            warn!("network files not staged: {}", err);
            None
        }
    }
}

pub fn stage_files(source_dir: &Path, files_dir: &Path, names: &[&str]) -> BridgeResult<StagingReport> {
    fs::create_dir_all(files_dir).map_err(|source| BridgeError::Staging {
        file: files_dir.display().to_string(),
        source,
    })?;

    let mut report = StagingReport::default();
    for name in names {
        let target = files_dir.join(name);
        if target.is_file() {
            debug!("{} already staged", target.display());
            report.already_present.push(target);
            continue;
        }
        copy_via_partial(&source_dir.join(name), &target).map_err(|source| BridgeError::Staging {
            file: (*name).to_owned(),
            source,
        })?;
        info!("staged network file {}", target.display());
        report.copied.push(target);
    }
    Ok(report)
}

// An interrupted copy must not look like a staged file on the next run.
fn copy_via_partial(source: &Path, target: &Path) -> io::Result<()> {
    let mut partial = target.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    if let Err(err) = fs::copy(source, &partial) {
        let _ = fs::remove_file(&partial);
        return Err(err);
    }
    fs::rename(&partial, target)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;

    use tempfile::tempdir;

    use super::{stage_configured, stage_files, stage_network_files};
    use crate::config::BridgeConfig;
    use crate::errors::BridgeError;
    use crate::resolver::resolver_chain::{BIG_NETWORK_FILE, SMALL_NETWORK_FILE};

    #[test]
    fn copies_both_networks_into_files_dir() {
        let assets = tempdir().unwrap();
        let files = tempdir().unwrap();
        fs::write(assets.path().join(BIG_NETWORK_FILE), b"big").unwrap();
        fs::write(assets.path().join(SMALL_NETWORK_FILE), b"small").unwrap();

        let report = stage_network_files(assets.path(), &files.path().join("nested")).unwrap();
        assert_eq!(report.copied.len(), 2);
        assert!(report.already_present.is_empty());
        assert_eq!(
            fs::read(files.path().join("nested").join(SMALL_NETWORK_FILE)).unwrap(),
            b"small"
        );
        assert!(!files.path().join("nested").join(format!("{}.part", BIG_NETWORK_FILE)).exists());
    }

    #[test]
    fn existing_files_are_not_overwritten() {
        let assets = tempdir().unwrap();
        let files = tempdir().unwrap();
        fs::write(assets.path().join(BIG_NETWORK_FILE), b"fresh").unwrap();
        fs::write(assets.path().join(SMALL_NETWORK_FILE), b"fresh").unwrap();
        fs::write(files.path().join(BIG_NETWORK_FILE), b"kept").unwrap();

        let report = stage_network_files(assets.path(), files.path()).unwrap();
        assert_eq!(report.already_present, vec![files.path().join(BIG_NETWORK_FILE)]);
        assert_eq!(report.copied, vec![files.path().join(SMALL_NETWORK_FILE)]);
        assert_eq!(fs::read(files.path().join(BIG_NETWORK_FILE)).unwrap(), b"kept");
    }

    #[test]
    fn missing_asset_is_reported_by_name() {
        let assets = tempdir().unwrap();
        let files = tempdir().unwrap();
        fs::write(assets.path().join("present.nnue"), b"x").unwrap();

        let err = stage_files(assets.path(), files.path(), &["present.nnue", "absent.nnue"]).unwrap_err();
        match err {
            BridgeError::Staging { file, source } => {
                assert_eq!(file, "absent.nnue");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(files.path().join("present.nnue").is_file());
        assert!(!files.path().join("absent.nnue.part").exists());
    }

    #[test]
    fn configured_staging_needs_both_directories() {
        let assets = tempdir().unwrap();
        let files = tempdir().unwrap();
        fs::write(assets.path().join(BIG_NETWORK_FILE), b"big").unwrap();
        fs::write(assets.path().join(SMALL_NETWORK_FILE), b"small").unwrap();

        let only_assets = BridgeConfig::default().with_assets_dir(assets.path());
        assert_eq!(stage_configured(&only_assets), None);

        let both = only_assets.with_files_dir(files.path());
        let report = stage_configured(&both).unwrap();
        assert_eq!(report.copied.len(), 2);
    }

    #[test]
    fn configured_staging_failure_is_not_fatal() {
        let assets = tempdir().unwrap();
        let files = tempdir().unwrap();
        let config = BridgeConfig::default()
            .with_assets_dir(assets.path())
            .with_files_dir(files.path());
        assert_eq!(stage_configured(&config), None);
    }
}

//! Content digests for deciding which files actually changed.
//!
//! Copying a file onto the daemon host (and possibly restarting a service
//! afterwards) is expensive relative to a local hash, so the harness
//! fingerprints both sides first and only installs the files whose
//! contents differ.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::exec::CommandExecutor;

/// A local file path and the remote path it corresponds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPair {
    pub local: PathBuf,
    pub remote: PathBuf,
}

impl PathPair {
    pub fn new(local: impl Into<PathBuf>, remote: impl Into<PathBuf>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }
}

/// Hash one file's contents as lowercase hex.
fn hash_file(path: &Path) -> HarnessResult<String> {
    let bytes = fs::read(path).map_err(|source| HarnessError::Digest {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Digests of local files, keyed by path. Unreadable paths get no entry;
/// the comparison layer treats a missing entry as "unknown, so differs".
pub fn local_digests<P: AsRef<Path>>(paths: &[P]) -> BTreeMap<PathBuf, String> {
    let mut digests = BTreeMap::new();
    for path in paths {
        let path = path.as_ref();
        match hash_file(path) {
            Ok(digest) => {
                digests.insert(path.to_path_buf(), digest);
            }
            Err(err) => warn!("skipping local digest: {err}"),
        }
    }
    digests
}

/// Digests of remote files, staged through a fresh private temp directory.
///
/// Each requested path is copied into the staging directory via the
/// executor, permissions are widened so the staged copies can be read, and
/// the copies are hashed locally. The staging directory is removed before
/// this returns, whether or not every file could be staged. Paths that
/// fail to stage get no entry.
pub fn remote_digests<E: CommandExecutor>(
    exec: &E,
    paths: &[PathBuf],
) -> HarnessResult<BTreeMap<PathBuf, String>> {
    let staging = TempDir::with_prefix("digest-staging-")?;
    debug!("staging remote files under {}", staging.path().display());

    let mut staged = Vec::new();
    for path in paths {
        let target = staging_target(staging.path(), path);
        if let Some(parent) = target.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!("could not prepare staging dir for {}: {err}", path.display());
                continue;
            }
        }
        let src = path.to_string_lossy().into_owned();
        let dst = target.to_string_lossy().into_owned();
        match exec.exec("cp", &[src.as_str(), dst.as_str()]) {
            Ok(_) => staged.push((path.clone(), target)),
            Err(err) => warn!("could not stage {}: {err}", path.display()),
        }
    }

    if !staged.is_empty() {
        let dir = staging.path().to_string_lossy().into_owned();
        if let Err(err) = exec.exec("chmod", &["-R", "go+rw", dir.as_str()]) {
            warn!("could not widen staging permissions: {err}");
        }
    }

    let mut digests = BTreeMap::new();
    for (path, target) in staged {
        match hash_file(&target) {
            Ok(digest) => {
                digests.insert(path, digest);
            }
            Err(err) => warn!("skipping remote digest: {err}"),
        }
    }
    Ok(digests)
    // staging is dropped (and removed) here on every path out.
}

/// Pairs whose local and remote contents differ, in input order.
///
/// A pair whose digest is unknown on either side counts as differing:
/// the cost of that mistake is a redundant copy, never a silently stale
/// file on the host.
pub fn differing<E: CommandExecutor>(
    exec: &E,
    pairs: &[PathPair],
) -> HarnessResult<Vec<PathPair>> {
    let locals: Vec<PathBuf> = pairs.iter().map(|p| p.local.clone()).collect();
    let remotes: Vec<PathBuf> = pairs.iter().map(|p| p.remote.clone()).collect();

    let local = local_digests(&locals);
    let remote = remote_digests(exec, &remotes)?;

    Ok(pairs
        .iter()
        .filter(|pair| match (local.get(&pair.local), remote.get(&pair.remote)) {
            (Some(l), Some(r)) => l != r,
            _ => true,
        })
        .cloned()
        .collect())
}

/// Where a remote path lands inside the staging directory.
fn staging_target(staging: &Path, remote: &Path) -> PathBuf {
    staging.join(remote.strip_prefix("/").unwrap_or(remote))
}

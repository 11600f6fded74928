//! Staging new fragments and removing consumed ones.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

/// Root of the git work tree containing `path`, if any.
pub fn work_tree(path: &Path) -> Option<PathBuf> {
    let repo = gix::discover(path).ok()?;
    repo.work_dir().map(Path::to_path_buf)
}

/// Remove `paths`, staging the removal with `git rm` when they live inside a work tree.
///
/// Files git does not track (or could not remove) are deleted directly.
pub fn remove_paths(paths: &[PathBuf]) -> Result<()> {
    let Some(first) = paths.first() else {
        return Ok(());
    };

    if let Some(root) = work_tree(parent(first)) {
        match Command::new("git")
            .current_dir(&root)
            .args(["rm", "-f", "-q", "--ignore-unmatch", "--"])
            .args(absolute(paths))
            .status()
        {
            Ok(status) if status.success() => {
                tracing::debug!(root = %root.display(), count = paths.len(), "removed via git");
            }
            Ok(status) => tracing::warn!(%status, "git rm failed, removing files directly"),
            Err(err) => tracing::warn!(error = %err, "git unavailable, removing files directly"),
        }
    }

    for path in paths.iter().filter(|path| path.exists()) {
        fs::remove_file(path)
            .with_context(|| format!("failed to remove fragment {}", path.display()))?;
    }

    tracing::info!(count = paths.len(), "removed consumed fragments");
    Ok(())
}

/// Stage `paths` with `git add`.
///
/// Fails when the files are not inside a git work tree.
pub fn add_paths(paths: &[PathBuf]) -> Result<()> {
    let Some(first) = paths.first() else {
        return Ok(());
    };

    let directory = parent(first);
    let root = work_tree(directory).with_context(|| {
        format!("`{}` is not inside a git work tree", directory.display())
    })?;

    let status = Command::new("git")
        .current_dir(&root)
        .args(["add", "--"])
        .args(absolute(paths))
        .status()
        .context("failed to run `git add`")?;
    if !status.success() {
        bail!("`git add` exited with {status}");
    }

    tracing::debug!(root = %root.display(), count = paths.len(), "staged via git");
    Ok(())
}

fn parent(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn absolute(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|path| fs::canonicalize(path).unwrap_or_else(|_| path.clone()))
        .collect()
}

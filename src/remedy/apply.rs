//! Validated, all-or-nothing patch application
//!
//! Every edit path must resolve inside the repository root; one bad edit
//! voids the entire response. Validation happens before any write, so a
//! rejected patch set leaves the working tree untouched.

use crate::remedy::types::FileEdit;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("Edit path is empty")]
    EmptyPath,
    #[error("Edit path is absolute: {0}")]
    AbsolutePath(String),
    #[error("Edit path escapes the repository root: {0}")]
    OutsideRoot(String),
    #[error("Edit path targets protected metadata: {0}")]
    ProtectedPath(String),
    #[error("Edit path is an existing directory: {0}")]
    TargetIsDirectory(String),
    #[error("Repository root is invalid: {0}")]
    InvalidRoot(String),
    #[error("I/O error applying edits: {0}")]
    Io(#[from] std::io::Error),
}

/// Paths the backend is never allowed to rewrite; touching version control
/// metadata could disable verification of the fix itself.
const PROTECTED_PREFIXES: &[&str] = &[".git"];

/// Resolves an edit path against the repository root, rejecting anything
/// that would land outside it.
///
/// Rejects absolute paths and parent-directory traversal outright, then
/// checks that the deepest existing ancestor canonicalizes under the root,
/// which closes the symlink escape hatch.
pub fn validate_edit_path(root: &Path, edit_path: &str) -> Result<PathBuf, ApplyError> {
    let trimmed = edit_path.trim();
    if trimmed.is_empty() {
        return Err(ApplyError::EmptyPath);
    }

    let relative = Path::new(trimmed);
    if relative.is_absolute() {
        return Err(ApplyError::AbsolutePath(trimmed.to_string()));
    }

    let mut normalized = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            _ => return Err(ApplyError::OutsideRoot(trimmed.to_string())),
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(ApplyError::EmptyPath);
    }

    for prefix in PROTECTED_PREFIXES {
        if normalized.starts_with(prefix) {
            return Err(ApplyError::ProtectedPath(trimmed.to_string()));
        }
    }

    let canonical_root = root
        .canonicalize()
        .map_err(|e| ApplyError::InvalidRoot(format!("{}: {}", root.display(), e)))?;
    let target = canonical_root.join(&normalized);

    // Walk up to the deepest existing ancestor and confirm it still resolves
    // under the root once symlinks are followed.
    let mut ancestor = target.as_path();
    loop {
        if ancestor.exists() {
            let resolved = ancestor.canonicalize()?;
            if !resolved.starts_with(&canonical_root) {
                return Err(ApplyError::OutsideRoot(trimmed.to_string()));
            }
            break;
        }
        match ancestor.parent() {
            Some(parent) => ancestor = parent,
            None => return Err(ApplyError::OutsideRoot(trimmed.to_string())),
        }
    }

    // A directory cannot be replaced by a file rename.
    if target.is_dir() {
        return Err(ApplyError::TargetIsDirectory(trimmed.to_string()));
    }

    Ok(target)
}

/// Applies all edits or none.
///
/// Phase one validates every path with no writes. Phase two stages each
/// edit into a temporary sibling file, and phase three renames the staged
/// files into place, keeping a backup of every overwritten file until the
/// last rename has landed so a mid-commit failure can be rolled back.
pub fn apply_edits(root: &Path, edits: &[FileEdit]) -> Result<(), ApplyError> {
    let mut targets = Vec::with_capacity(edits.len());
    for edit in edits {
        targets.push(validate_edit_path(root, &edit.path)?);
    }

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(edits.len());
    let mut created_dirs: Vec<PathBuf> = Vec::new();
    let stage_result = (|| -> Result<(), ApplyError> {
        for (i, (edit, target)) in edits.iter().zip(&targets).enumerate() {
            if let Some(parent) = target.parent() {
                create_missing_dirs(parent, &mut created_dirs)?;
            }
            let temp = target.with_extension(format!("buildmend-staged-{}", i));
            fs::write(&temp, &edit.content)?;
            staged.push((temp, target.clone()));
        }
        Ok(())
    })();

    if let Err(e) = stage_result {
        discard(&staged, &created_dirs);
        return Err(e);
    }

    // Commit. Each pre-existing target is moved aside before the staged file
    // replaces it, so any rename failure can restore the original files.
    let mut committed: Vec<(PathBuf, Option<PathBuf>)> = Vec::with_capacity(staged.len());
    let commit_result = (|| -> Result<(), ApplyError> {
        for (i, (temp, target)) in staged.iter().enumerate() {
            let backup = if target.exists() {
                let backup = target.with_extension(format!("buildmend-backup-{}", i));
                fs::rename(target, &backup)?;
                Some(backup)
            } else {
                None
            };
            if let Err(e) = fs::rename(temp, target) {
                if let Some(backup) = &backup {
                    let _ = fs::rename(backup, target);
                }
                return Err(e.into());
            }
            committed.push((target.clone(), backup));
            debug!("Applied edit: {}", target.display());
        }
        Ok(())
    })();

    if let Err(e) = commit_result {
        for (target, backup) in committed.iter().rev() {
            let _ = fs::remove_file(target);
            if let Some(backup) = backup {
                let _ = fs::rename(backup, target);
            }
        }
        discard(&staged, &created_dirs);
        return Err(e);
    }

    for (_, backup) in &committed {
        if let Some(backup) = backup {
            let _ = fs::remove_file(backup);
        }
    }

    info!("Applied {} edit(s) under {}", edits.len(), root.display());
    Ok(())
}

/// Creates the missing ancestors of `parent`, recording each directory that
/// did not exist beforehand so a failed apply can remove them again.
fn create_missing_dirs(parent: &Path, created: &mut Vec<PathBuf>) -> Result<(), ApplyError> {
    let mut missing = Vec::new();
    let mut cursor = parent;
    while !cursor.exists() {
        missing.push(cursor.to_path_buf());
        match cursor.parent() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    fs::create_dir_all(parent)?;
    created.extend(missing.into_iter().rev());
    Ok(())
}

/// Removes staged temporaries and any directories this apply created.
/// Directories are removed deepest first and only when empty.
fn discard(staged: &[(PathBuf, PathBuf)], created_dirs: &[PathBuf]) {
    for (temp, _) in staged {
        let _ = fs::remove_file(temp);
    }
    for dir in created_dirs.iter().rev() {
        let _ = fs::remove_dir(dir);
    }
}

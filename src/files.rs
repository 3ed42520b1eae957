use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Files resolved from a target, plus the entries that could not be read
#[derive(Debug, Default)]
pub struct FileList {
    pub files: Vec<PathBuf>,
    pub errors: Vec<Error>,
}

impl From<Vec<PathBuf>> for FileList {
    fn from(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            errors: Vec::new(),
        }
    }
}

/// Resolve the command line target into the files to process.
///
/// An existing file is returned as is, an existing directory is walked
/// recursively, and anything else is read as `<dir>/<regex>` where the
/// regex must match a whole file name in `<dir>`. Unreadable entries found
/// while walking are collected in `FileList::errors` and the walk goes on.
pub fn collect_files(target: &Path) -> Result<FileList> {
    if target.is_file() {
        return Ok(vec![target.to_path_buf()].into());
    }

    if target.is_dir() {
        return Ok(walk_directory(target));
    }

    let pattern = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match_in_directory(parent, &pattern).map(FileList::from)
}

fn walk_directory(root: &Path) -> FileList {
    let mut list = FileList::default();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() => list.files.push(entry.into_path()),
            Ok(_) => {}
            Err(source) => {
                let path = source.path().unwrap_or(root).to_path_buf();
                warn!("Skipping {}: {}", path.display(), source);
                list.errors.push(Error::Walk { path, source });
            }
        }
    }

    debug!(
        "Found {} files under {} ({} unreadable)",
        list.files.len(),
        root.display(),
        list.errors.len()
    );
    list
}

fn match_in_directory(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let regex =
        Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

    if !dir.is_dir() {
        debug!("Pattern directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if regex.is_match(&entry.file_name().to_string_lossy()) {
            files.push(path);
        }
    }
    files.sort();

    debug!(
        "Pattern '{}' matched {} files in {}",
        pattern,
        files.len(),
        dir.display()
    );
    Ok(files)
}

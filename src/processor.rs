use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aspect::{code_name, AspectRatio};
use crate::display::{print_header_change, write_file_result};
use crate::error::{Error, Result};
use crate::header::{decode_and_maybe_rewrite, HeaderOutcome, SequenceHeader};
use crate::scanner::find_sequence_headers;

/// How a run treats the files it is given
#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub ratio: AspectRatio,
    /// Decide what would change but never open files for writing
    pub dry_run: bool,
    /// Show the header bytes before and after each change
    pub show_headers: bool,
}

/// Result of processing one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub sequence_headers: usize,
    pub rewritten: usize,
    pub unsupported_resolution: usize,
    pub modified: bool,
}

/// A file that could not be processed
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

impl FileFailure {
    pub fn from_error(error: &Error) -> Self {
        Self {
            path: error.path().map(Path::to_path_buf).unwrap_or_default(),
            error: error.to_string(),
        }
    }
}

/// Outcome of a whole run
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub ratio: Option<AspectRatio>,
    pub dry_run: bool,
    pub files: Vec<FileReport>,
    pub failures: Vec<FileFailure>,
}

impl RunReport {
    pub fn modified_count(&self) -> usize {
        self.files.iter().filter(|f| f.modified).count()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Process every file in turn; a failing file is recorded and skipped.
///
/// One progress line per processed file goes to `progress`.
pub fn process_files(
    paths: &[PathBuf],
    options: &Options,
    progress: &mut dyn Write,
) -> RunReport {
    let mut report = RunReport {
        ratio: Some(options.ratio),
        dry_run: options.dry_run,
        ..Default::default()
    };

    for path in paths {
        match process_file(path, options) {
            Ok(file_report) => {
                if let Err(e) = write_file_result(progress, &file_report, options.dry_run) {
                    warn!("Failed to write progress: {}", e);
                }
                report.files.push(file_report);
            }
            Err(e) => {
                warn!("Failed to process {}: {}", path.display(), e);
                report.failures.push(FileFailure::from_error(&e));
            }
        }
    }

    info!(
        "Processed {} files: {} modified, {} failed",
        paths.len(),
        report.modified_count(),
        report.failures.len()
    );
    report
}

/// Scan a file for sequence headers, then patch them in place
pub fn process_file(path: &Path, options: &Options) -> Result<FileReport> {
    debug!("Processing {}", path.display());

    // Scan pass; the read handle is closed before the file is reopened
    let offsets = {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        find_sequence_headers(file).map_err(|e| Error::io(path, e))?
    };
    debug!(
        "Found {} sequence headers in {}",
        offsets.len(),
        path.display()
    );

    let mut report = FileReport {
        path: path.to_path_buf(),
        sequence_headers: offsets.len(),
        ..Default::default()
    };
    if offsets.is_empty() {
        return Ok(report);
    }

    let patched = if options.dry_run {
        let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
        inspect_headers(&mut file, &offsets, options)
    } else {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| Error::io(path, e))?;
        patch_headers(&mut file, &offsets, options)
    };
    let outcomes = patched.map_err(|e| Error::io(path, e))?;

    for outcome in &outcomes {
        match outcome {
            HeaderOutcome::Rewritten { .. } => report.rewritten += 1,
            HeaderOutcome::UnsupportedResolution { .. } => report.unsupported_resolution += 1,
            HeaderOutcome::AlreadyTargeted | HeaderOutcome::Truncated => {}
        }
    }
    report.modified = outcomes.iter().any(HeaderOutcome::is_modified);

    Ok(report)
}

/// Patch pass over the offsets found by the scan
pub fn patch_headers<S: io::Read + io::Write + io::Seek>(
    store: &mut S,
    offsets: &[u64],
    options: &Options,
) -> io::Result<Vec<HeaderOutcome>> {
    let mut outcomes = Vec::with_capacity(offsets.len());

    for &offset in offsets {
        let before = if options.show_headers {
            SequenceHeader::read_at(store, offset)?
        } else {
            None
        };

        let outcome = decode_and_maybe_rewrite(store, offset, options.ratio)?;
        log_outcome(offset, &outcome);

        if let (Some(before), HeaderOutcome::Rewritten { .. }) = (before, outcome) {
            print_header_change(offset, &before, &before.with_aspect(options.ratio));
        }
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

/// Same decisions as `patch_headers` without writing anything
pub fn inspect_headers<S: io::Read + io::Seek>(
    store: &mut S,
    offsets: &[u64],
    options: &Options,
) -> io::Result<Vec<HeaderOutcome>> {
    let mut outcomes = Vec::with_capacity(offsets.len());

    for &offset in offsets {
        let outcome = match SequenceHeader::read_at(store, offset)? {
            Some(header) => {
                let (outcome, replacement) = header.retarget(options.ratio);
                if let (true, Some(replacement)) = (options.show_headers, replacement) {
                    print_header_change(offset, &header, &replacement);
                }
                outcome
            }
            None => HeaderOutcome::Truncated,
        };
        log_outcome(offset, &outcome);
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

fn log_outcome(offset: u64, outcome: &HeaderOutcome) {
    match outcome {
        HeaderOutcome::Rewritten { from, to } => {
            debug!(
                "Header at {:#x}: aspect {} -> {}",
                offset,
                code_name(*from),
                to
            );
        }
        HeaderOutcome::AlreadyTargeted => {
            debug!("Header at {:#x}: aspect already set", offset);
        }
        HeaderOutcome::UnsupportedResolution { width, height } => {
            debug!("Header at {:#x}: skipping {}x{}", offset, width, height);
        }
        HeaderOutcome::Truncated => {
            debug!("Header at {:#x}: truncated", offset);
        }
    }
}

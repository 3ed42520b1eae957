use std::io::{self, Write};

use crate::aspect::code_name;
use crate::header::SequenceHeader;
use crate::processor::{FileReport, RunReport};

/// Format bytes as a single hexdump row at the given stream offset
pub fn format_hex_row(offset: u64, data: &[u8]) -> String {
    let mut row = format!("{:08x}  ", offset);

    for (i, b) in data.iter().enumerate() {
        row.push_str(&format!("{:02x} ", b));
        if i == 3 {
            row.push(' ');
        }
    }

    row.trim_end().to_string()
}

/// Write the progress line for one processed file
pub fn write_file_result<W: Write + ?Sized>(
    out: &mut W,
    report: &FileReport,
    dry_run: bool,
) -> io::Result<()> {
    let status = match (report.modified, dry_run) {
        (true, false) => "MODIFIED",
        (true, true) => "WOULD MODIFY",
        (false, _) => "",
    };
    writeln!(out, "Processing {} ...  {}", report.path.display(), status)
}

/// Show a header window before and after its aspect nibble changes
pub fn print_header_change(offset: u64, before: &SequenceHeader, after: &SequenceHeader) {
    println!(
        "  {}x{} aspect {} -> {}",
        before.width(),
        before.height(),
        code_name(before.aspect_code()),
        code_name(after.aspect_code())
    );
    println!("  - {}", format_hex_row(offset, before.as_bytes()));
    println!("  + {}", format_hex_row(offset, after.as_bytes()));
}

/// Summarize the run: totals, then one line per failed file
pub fn write_summary<W: Write>(out: &mut W, report: &RunReport) -> io::Result<()> {
    let headers: usize = report.files.iter().map(|f| f.sequence_headers).sum();
    let skipped: usize = report.files.iter().map(|f| f.unsupported_resolution).sum();

    writeln!(out)?;
    writeln!(out, "=== Summary ===")?;
    writeln!(
        out,
        "{} files, {} sequence headers, {} {}, {} other resolutions skipped",
        report.files.len() + report.failures.len(),
        headers,
        report.modified_count(),
        if report.dry_run {
            "files would be modified"
        } else {
            "files modified"
        },
        skipped
    )?;

    if report.has_failures() {
        writeln!(out, "{} files failed:", report.failures.len())?;
        for failure in &report.failures {
            writeln!(out, "  {}", failure.error)?;
        }
    }
    Ok(())
}

/// Write the run report as pretty JSON
pub fn write_json<W: Write>(out: &mut W, report: &RunReport) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out).map_err(serde_json::Error::io)
}

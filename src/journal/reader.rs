//! Line-oriented readers for JSONL log files.
//!
//! Two modes: parse a whole file into an ordered entry list, or stream
//! entries through a callback. Both read line by line through a buffered
//! reader; the streaming mode additionally supports starting at a line
//! offset, which the incremental trigger rescan relies on.

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::entry::RawEntry;

/// Parse JSONL content into `(line_number, entry)` pairs.
///
/// Line numbers are 1-based and count every line of the input, including
/// blank and malformed ones, so they match editor positions in the source
/// file. Malformed lines are skipped with a warning.
#[must_use]
pub fn parse_content(content: &str) -> Vec<(usize, RawEntry)> {
    content
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| parse_line(idx + 1, line).map(|entry| (idx + 1, entry)))
        .collect()
}

/// Read a JSONL file into `(line_number, entry)` pairs.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read. Malformed lines
/// never fail the read; they are skipped with a warning.
pub async fn read_entries(path: &Path) -> std::io::Result<Vec<(usize, RawEntry)>> {
    let mut entries = Vec::new();
    stream_entries(path, 0, |line_no, entry| {
        entries.push((line_no, entry));
    })
    .await?;
    Ok(entries)
}

/// Stream entries from a JSONL file through a callback.
///
/// Skips the first `from_line` lines, then invokes the callback with the
/// 1-based line number and parsed entry for every well-formed line after
/// that. Returns the total number of lines in the file (processed or
/// skipped), which callers persist as the offset for the next incremental
/// read.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or an I/O error interrupts
/// reading.
pub async fn stream_entries<F>(path: &Path, from_line: usize, mut callback: F) -> std::io::Result<usize>
where
    F: FnMut(usize, RawEntry),
{
    let file = File::open(path).await?;
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    let mut line_no = 0usize;

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break;
        }
        line_no += 1;
        if line_no <= from_line {
            continue;
        }
        if let Some(entry) = parse_line(line_no, &line) {
            callback(line_no, entry);
        }
    }

    Ok(line_no)
}

/// Parse one line, skipping blanks and warning on malformed records.
fn parse_line(line_no: usize, line: &str) -> Option<RawEntry> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<RawEntry>(trimmed) {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::warn!(line = line_no, error = %e, "Skipping malformed JSONL line");
            None
        }
    }
}

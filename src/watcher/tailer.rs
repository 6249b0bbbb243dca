//! Incremental JSONL file tailer.
//!
//! Reads new entries from a growing log file, tracking both the byte offset
//! and the line count so downstream consumers get stable absolute line
//! numbers.

use std::path::PathBuf;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

use crate::journal::RawEntry;

use super::error::WatcherError;

/// Incremental JSONL reader that remembers its position.
#[derive(Debug)]
pub struct LogTailer {
    path: PathBuf,
    /// Current byte offset in the file.
    offset: u64,
    /// Lines consumed so far (processed or skipped).
    lines_seen: usize,
}

impl LogTailer {
    /// Create a tailer starting at the beginning of the file.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            offset: 0,
            lines_seen: 0,
        }
    }

    /// Byte offset of the next read.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Total lines consumed so far.
    #[must_use]
    pub fn lines_seen(&self) -> usize {
        self.lines_seen
    }

    /// Path being tailed.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Read entries appended since the last read, as `(line_no, entry)`
    /// pairs with 1-based absolute line numbers. Malformed lines are skipped
    /// with a warning but still advance the line count.
    ///
    /// # Errors
    ///
    /// - `FileDeleted` / `PermissionDenied` when the file is gone or
    ///   unreadable.
    /// - `FileTruncated` when the file shrank below the current offset; the
    ///   caller resets its own per-file state and calls [`Self::reset`]
    ///   before reading again from line zero.
    pub async fn read_new_entries(&mut self) -> Result<Vec<(usize, RawEntry)>, WatcherError> {
        let file = match File::open(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WatcherError::FileDeleted(self.path.clone()));
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(WatcherError::PermissionDenied(self.path.clone()));
            }
            Err(e) => return Err(WatcherError::Io(e)),
        };

        let file_len = file.metadata().await?.len();
        if file_len < self.offset {
            tracing::warn!(
                path = %self.path.display(),
                old_offset = self.offset,
                new_len = file_len,
                "File truncated"
            );
            return Err(WatcherError::FileTruncated);
        }
        if file_len == self.offset {
            return Ok(Vec::new());
        }

        let mut file = file;
        file.seek(std::io::SeekFrom::Start(self.offset)).await?;

        let mut reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                break;
            }

            self.offset += bytes_read as u64;
            self.lines_seen += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<RawEntry>(trimmed) {
                Ok(entry) => entries.push((self.lines_seen, entry)),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = self.lines_seen,
                        error = %e,
                        "Skipping malformed JSONL line"
                    );
                }
            }
        }

        Ok(entries)
    }

    /// Reset to the beginning of the file.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.lines_seen = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn entry_line(uuid: &str) -> String {
        format!(
            r#"{{"type":"user","uuid":"{uuid}","timestamp":"2026-01-29T10:00:00Z","message":{{"role":"user","content":"Hello"}},"cwd":"/tmp"}}"#
        )
    }

    #[tokio::test]
    async fn test_tailer_reads_initial_content() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", entry_line("u1")).unwrap();
        writeln!(file, "{}", entry_line("u2")).unwrap();
        file.flush().unwrap();

        let mut tailer = LogTailer::new(file.path().to_path_buf());
        let entries = tailer.read_new_entries().await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, 1);
        assert_eq!(entries[1].0, 2);
        assert_eq!(tailer.lines_seen(), 2);
    }

    #[tokio::test]
    async fn test_tailer_reads_only_new_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", entry_line("u1")).unwrap();
        file.flush().unwrap();

        let mut tailer = LogTailer::new(file.path().to_path_buf());
        assert_eq!(tailer.read_new_entries().await.unwrap().len(), 1);

        // No growth, nothing new.
        assert!(tailer.read_new_entries().await.unwrap().is_empty());

        writeln!(file, "{}", entry_line("u2")).unwrap();
        writeln!(file, "{}", entry_line("u3")).unwrap();
        file.flush().unwrap();

        let entries = tailer.read_new_entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        // Absolute line numbers continue from the first read.
        assert_eq!(entries[0].0, 2);
        assert_eq!(entries[1].0, 3);
    }

    #[tokio::test]
    async fn test_tailer_reports_truncation() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        {
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "{}", entry_line("u1")).unwrap();
            writeln!(f, "{}", entry_line("u2")).unwrap();
        }

        let mut tailer = LogTailer::new(path.clone());
        assert_eq!(tailer.read_new_entries().await.unwrap().len(), 2);

        // Rewrite the file smaller.
        {
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "{}", entry_line("fresh")).unwrap();
        }

        let result = tailer.read_new_entries().await;
        assert!(matches!(result, Err(WatcherError::FileTruncated)));

        tailer.reset();
        let entries = tailer.read_new_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, 1, "line numbering restarts after reset");
    }

    #[tokio::test]
    async fn test_tailer_missing_file() {
        let mut tailer = LogTailer::new(PathBuf::from("/tmp/nonexistent-lens-98765.jsonl"));
        let result = tailer.read_new_entries().await;
        assert!(matches!(result, Err(WatcherError::FileDeleted(_))));
    }

    #[tokio::test]
    async fn test_tailer_counts_malformed_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", entry_line("u1")).unwrap();
        writeln!(file, "not valid json").unwrap();
        writeln!(file, "{}", entry_line("u2")).unwrap();
        file.flush().unwrap();

        let mut tailer = LogTailer::new(file.path().to_path_buf());
        let entries = tailer.read_new_entries().await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].0, 3);
        assert_eq!(tailer.lines_seen(), 3);
    }
}

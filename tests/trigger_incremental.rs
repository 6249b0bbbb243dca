//! Incremental trigger scanning over a growing log file.

use std::collections::HashMap;
use std::io::Write;

use tempfile::NamedTempFile;

use claude_lens::triggers::{default_rules, DetectedError, TriggerScanner};

fn call_line(uuid: &str, ts: &str, tool_use_id: &str, command: &str) -> String {
    format!(
        r#"{{"type":"assistant","uuid":"{uuid}","timestamp":"{ts}","message":{{"role":"assistant","content":[{{"type":"tool_use","id":"{tool_use_id}","name":"Bash","input":{{"command":"{command}"}}}}]}},"cwd":"/w"}}"#
    )
}

fn error_result_line(uuid: &str, ts: &str, tool_use_id: &str, text: &str) -> String {
    format!(
        r#"{{"type":"user","uuid":"{uuid}","timestamp":"{ts}","sourceToolUseId":"{tool_use_id}","message":{{"role":"user","content":[{{"type":"tool_result","tool_use_id":"{tool_use_id}","content":"{text}","is_error":true}}]}},"cwd":"/w"}}"#
    )
}

fn scanner() -> TriggerScanner {
    TriggerScanner::compile(&default_rules()).unwrap()
}

/// Comparable view of a detection, ignoring the generated record id.
fn key(error: &DetectedError) -> (usize, String, String) {
    (error.line, error.rule.clone(), error.excerpt.clone())
}

#[tokio::test]
async fn test_incremental_scan_is_additive() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "{}",
        call_line("a1", "2026-01-29T10:00:00Z", "t1", "cat /nope")
    )
    .unwrap();
    writeln!(
        file,
        "{}",
        error_result_line("u1", "2026-01-29T10:00:01Z", "t1", "No such file or directory")
    )
    .unwrap();
    file.flush().unwrap();

    let scanner = scanner();

    // First pass over the initial lines.
    let mut tool_names = HashMap::new();
    let (first, processed) = scanner
        .scan_file(file.path(), "-proj", "sess-1", 0, &mut tool_names)
        .await
        .unwrap();
    assert_eq!(processed, 2);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].line, 2);

    // Append more lines: a call whose error arrives in the new suffix.
    writeln!(
        file,
        "{}",
        call_line("a2", "2026-01-29T10:00:02Z", "t2", "false")
    )
    .unwrap();
    writeln!(
        file,
        "{}",
        error_result_line("u2", "2026-01-29T10:00:03Z", "t2", "Exit code 1")
    )
    .unwrap();
    file.flush().unwrap();

    let (second, processed) = scanner
        .scan_file(file.path(), "-proj", "sess-1", processed, &mut tool_names)
        .await
        .unwrap();
    assert_eq!(processed, 4);
    assert_eq!(second.len(), 1);
    // Absolute line number: offset by the previously processed count.
    assert_eq!(second[0].line, 4);
    assert_eq!(second[0].source.as_deref(), Some("Bash"));

    // Scanning everything at once finds the same errors.
    let mut fresh_state = HashMap::new();
    let (all, _) = scanner
        .scan_file(file.path(), "-proj", "sess-1", 0, &mut fresh_state)
        .await
        .unwrap();

    let mut incremental: Vec<_> = first.iter().chain(second.iter()).map(key).collect();
    let mut full: Vec<_> = all.iter().map(key).collect();
    incremental.sort();
    full.sort();
    assert_eq!(incremental, full);
}

#[tokio::test]
async fn test_incremental_scan_idempotent_on_no_growth() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "{}",
        error_result_line("u1", "2026-01-29T10:00:00Z", "t1", "timeout waiting for lock")
    )
    .unwrap();
    file.flush().unwrap();

    let scanner = scanner();
    let mut tool_names = HashMap::new();

    let (first, processed) = scanner
        .scan_file(file.path(), "-proj", "sess-1", 0, &mut tool_names)
        .await
        .unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].category.as_deref(), Some("Timeout Error"));

    // Re-scanning from the processed offset finds nothing new.
    let (again, processed_again) = scanner
        .scan_file(file.path(), "-proj", "sess-1", processed, &mut tool_names)
        .await
        .unwrap();
    assert!(again.is_empty());
    assert_eq!(processed_again, processed);
}

#[tokio::test]
async fn test_scan_missing_file_errors() {
    let scanner = scanner();
    let mut tool_names = HashMap::new();
    let result = scanner
        .scan_file(
            std::path::Path::new("/nonexistent/lens-scan.jsonl"),
            "-proj",
            "sess-1",
            0,
            &mut tool_names,
        )
        .await;
    assert!(result.is_err());
}

//! Hygiene: source-tree scans for patterns the crate does not allow.
//!
//! Each pattern has a budget. Test files (`*_test.rs`) are excluded.
#![allow(clippy::absurd_extreme_comparisons)]

use std::fs;
use std::path::Path;

const MAX_UNWRAP: usize = 0;
const MAX_EXPECT: usize = 0;
const MAX_PANIC: usize = 0;
const MAX_UNREACHABLE: usize = 0;
const MAX_TODO: usize = 0;
const MAX_UNIMPLEMENTED: usize = 0;
const MAX_SILENT_DISCARD: usize = 0;
// Parse-to-Option conversions plus the optional `.env` load.
const MAX_DOT_OK: usize = 14;
const MAX_ALLOW_DEAD_CODE: usize = 0;

struct SourceFile {
    path: String,
    content: String,
}

fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect_rs_files(Path::new("src"), &mut files);
    files
}

fn collect_rs_files(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
        } else if path.extension().is_some_and(|e| e == "rs") {
            let path_str = path.to_string_lossy().to_string();
            if path_str.ends_with("_test.rs") {
                continue;
            }
            if let Ok(content) = fs::read_to_string(&path) {
                out.push(SourceFile { path: path_str, content: production_part(&content) });
            }
        }
    }
}

/// Source up to the first inline `#[cfg(test)] mod tests {` block.
fn production_part(content: &str) -> String {
    let mut out = String::new();
    let mut lines = content.lines().peekable();
    while let Some(line) = lines.next() {
        if line.trim() == "#[cfg(test)]" && lines.peek().is_some_and(|next| next.trim_start().starts_with("mod tests {")) {
            break;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn count_in_source(files: &[SourceFile], pattern: &str) -> Vec<(String, usize)> {
    files
        .iter()
        .filter_map(|file| {
            let count = file.content.lines().filter(|line| line.contains(pattern)).count();
            if count > 0 { Some((file.path.clone(), count)) } else { None }
        })
        .collect()
}

fn total(hits: &[(String, usize)]) -> usize {
    hits.iter().map(|(_, c)| c).sum()
}

fn format_hits(hits: &[(String, usize)]) -> String {
    hits.iter().map(|(path, count)| format!("  {path}: {count}")).collect::<Vec<_>>().join("\n")
}

fn check(pattern: &str, max: usize) {
    let files = source_files();
    assert!(!files.is_empty(), "no sources found under src/");
    let hits = count_in_source(&files, pattern);
    let count = total(&hits);
    assert!(count <= max, "`{pattern}` budget exceeded: found {count}, max {max}.\n{}", format_hits(&hits));
}

#[test]
fn unwrap_budget() {
    check(".unwrap()", MAX_UNWRAP);
}

#[test]
fn expect_budget() {
    check(".expect(", MAX_EXPECT);
}

#[test]
fn panic_budget() {
    check("panic!(", MAX_PANIC);
}

#[test]
fn unreachable_budget() {
    check("unreachable!(", MAX_UNREACHABLE);
}

#[test]
fn todo_budget() {
    check("todo!(", MAX_TODO);
}

#[test]
fn unimplemented_budget() {
    check("unimplemented!(", MAX_UNIMPLEMENTED);
}

#[test]
fn silent_discard_budget() {
    check("let _ =", MAX_SILENT_DISCARD);
}

#[test]
fn dot_ok_budget() {
    check(".ok()", MAX_DOT_OK);
}

#[test]
fn allow_dead_code_budget() {
    check("#[allow(dead_code)]", MAX_ALLOW_DEAD_CODE);
}

//! Diff output formatter for showing changes
//!
//! This module provides:
//! - Unified diff of the Podfile and Podfile.lock
//! - A trailing summary comment

use crate::error::UpdateError;
use crate::output::{OutputFormatter, Report};
use std::fmt::Write as _;
use std::io::Write;

/// Lines of unchanged context around each hunk
const CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// One line of the edit script with the line counters reached before it
#[derive(Debug)]
struct Edit<'a> {
    op: Op,
    line: &'a str,
    old: usize,
    new: usize,
}

/// Line-level edit script through the longest common subsequence
fn edit_script<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Edit<'a>> {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let a = &old[prefix..old.len() - suffix];
    let b = &new[prefix..new.len() - suffix];

    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            table[i][j] = if a[i] == b[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut edits = Vec::with_capacity(old.len().max(new.len()));
    let (mut o, mut n) = (0, 0);

    for line in &old[..prefix] {
        edits.push(Edit { op: Op::Equal, line: *line, old: o, new: n });
        o += 1;
        n += 1;
    }

    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        if i < a.len() && j < b.len() && a[i] == b[j] {
            edits.push(Edit { op: Op::Equal, line: a[i], old: o, new: n });
            i += 1;
            j += 1;
            o += 1;
            n += 1;
        } else if j == b.len() || (i < a.len() && table[i + 1][j] >= table[i][j + 1]) {
            edits.push(Edit { op: Op::Delete, line: a[i], old: o, new: n });
            i += 1;
            o += 1;
        } else {
            edits.push(Edit { op: Op::Insert, line: b[j], old: o, new: n });
            j += 1;
            n += 1;
        }
    }

    for line in &old[old.len() - suffix..] {
        edits.push(Edit { op: Op::Equal, line: *line, old: o, new: n });
        o += 1;
        n += 1;
    }

    edits
}

/// Unified diff of two texts, empty when they are line-for-line equal
pub fn unified_diff(path: &str, old: &str, new: &str) -> String {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let edits = edit_script(&old_lines, &new_lines);

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for (index, _) in edits.iter().enumerate().filter(|(_, e)| e.op != Op::Equal) {
        let start = index.saturating_sub(CONTEXT);
        let end = (index + 1 + CONTEXT).min(edits.len());
        match ranges.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => ranges.push((start, end)),
        }
    }
    if ranges.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let _ = writeln!(out, "--- a/{}", path);
    let _ = writeln!(out, "+++ b/{}", path);

    for (start, end) in ranges {
        let hunk = &edits[start..end];
        let old_count = hunk.iter().filter(|e| e.op != Op::Insert).count();
        let new_count = hunk.iter().filter(|e| e.op != Op::Delete).count();
        let old_start = hunk[0].old + usize::from(old_count > 0);
        let new_start = hunk[0].new + usize::from(new_count > 0);

        let _ = writeln!(
            out,
            "@@ -{},{} +{},{} @@",
            old_start, old_count, new_start, new_count
        );
        for edit in hunk {
            let marker = match edit.op {
                Op::Equal => ' ',
                Op::Delete => '-',
                Op::Insert => '+',
            };
            let _ = writeln!(out, "{}{}", marker, edit.line);
        }
    }

    out
}

/// Diff formatter for showing file changes
pub struct DiffFormatter {
    /// Whether this is a dry-run
    dry_run: bool,
}

impl DiffFormatter {
    /// Create a new diff formatter
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Get the dry-run prefix if applicable
    fn dry_run_prefix(&self) -> &'static str {
        if self.dry_run {
            "(dry-run) "
        } else {
            ""
        }
    }
}

impl OutputFormatter for DiffFormatter {
    fn format(&self, report: &Report<'_>, writer: &mut dyn Write) -> std::io::Result<()> {
        let files = [
            (report.podfile_path, report.original_podfile, &report.files.manifest),
            (report.lockfile_path, report.original_lockfile, &report.files.lockfile),
        ];
        for (path, old, new) in files {
            let diff = unified_diff(&path.display().to_string(), old, new);
            if !diff.is_empty() {
                write!(writer, "{}", diff)?;
            }
        }

        writeln!(
            writer,
            "# {}{} pod(s) changed",
            self.dry_run_prefix(),
            report.files.changes.len()
        )
    }

    fn format_error(&self, error: &UpdateError, writer: &mut dyn Write) -> std::io::Result<()> {
        writeln!(writer, "# error: {}", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::{sample_dependency, sample_files, sample_report};

    #[test]
    fn test_unified_diff_single_change() {
        let diff = unified_diff("Podfile", "a\nb\nc\n", "a\nB\nc\n");
        assert_eq!(
            diff,
            "--- a/Podfile\n+++ b/Podfile\n@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n"
        );
    }

    #[test]
    fn test_unified_diff_identical_is_empty() {
        assert_eq!(unified_diff("Podfile", "a\nb\n", "a\nb\n"), "");
    }

    #[test]
    fn test_unified_diff_limits_context() {
        let old: String = (1..=10).map(|i| format!("l{}\n", i)).collect();
        let new = old.replace("l5\n", "x\n");
        let diff = unified_diff("Podfile.lock", &old, &new);
        assert!(diff.contains("@@ -2,7 +2,7 @@\n l2\n l3\n l4\n-l5\n+x\n l6\n l7\n l8\n"));
        assert!(!diff.contains(" l1\n"));
        assert!(!diff.contains(" l9\n"));
    }

    #[test]
    fn test_unified_diff_separate_hunks() {
        let old: String = (1..=20).map(|i| format!("l{}\n", i)).collect();
        let new = old.replace("l2\n", "a\n").replace("l18\n", "b\n");
        let diff = unified_diff("Podfile.lock", &old, &new);
        assert_eq!(diff.matches("@@ -").count(), 2);
        assert!(diff.contains("@@ -1,5 +1,5 @@"));
        assert!(diff.contains("@@ -15,6 +15,6 @@"));
    }

    #[test]
    fn test_unified_diff_pure_insertion() {
        let diff = unified_diff("Podfile", "", "pod 'Nimble'\n");
        assert!(diff.contains("@@ -0,0 +1,1 @@\n+pod 'Nimble'\n"));
    }

    #[test]
    fn test_diff_formatter_output() {
        let dependency = sample_dependency();
        let files = sample_files();
        let report = sample_report(&dependency, &files);
        let mut output = Vec::new();
        DiffFormatter::new(true).format(&report, &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("--- a/Podfile\n+++ b/Podfile\n"));
        assert!(output.contains("-pod 'Alamofire', '~> 3.0.0'\n+pod 'Alamofire', '~> 4.0.0'\n"));
        assert!(output.contains("--- a/Podfile.lock\n"));
        assert!(output.contains("-  - Alamofire (3.0.1)\n+  - Alamofire (4.0.1)\n"));
        assert!(output.ends_with("# (dry-run) 1 pod(s) changed\n"));
    }
}

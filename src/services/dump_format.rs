//! Dump format detection and SQL compatibility filtering.
//!
//! A dump produced by a newer PostgreSQL may emit `SET <param>_timeout`
//! statements for session parameters the target server does not know
//! (e.g. `transaction_timeout`), which aborts a `psql -v ON_ERROR_STOP=1`
//! restore. The filter strips those lines while passing every other byte
//! through unchanged.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use crate::error::Result;

/// Magic prefix of PostgreSQL's custom (binary) archive format.
pub const CUSTOM_DUMP_MAGIC: &[u8] = b"PGDMP";

/// Session timeout parameters known to every supported target server.
/// `SET` lines for any other `*_timeout` parameter are removed.
const SUPPORTED_TIMEOUT_SETTINGS: &[&[u8]] = &[
    b"statement_timeout",
    b"lock_timeout",
    b"idle_in_transaction_session_timeout",
    b"idle_session_timeout",
    b"deadlock_timeout",
];

static SET_TIMEOUT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*SET\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:=|TO)\s*[^;]+;\s*$").unwrap()
});

/// Dump flavor, decided by the leading bytes of the (decrypted,
/// decompressed) file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    /// pg_restore-only binary archive
    Custom,
    /// psql-executable text dump
    PlainSql,
}

impl DumpFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DumpFormat::Custom => "custom",
            DumpFormat::PlainSql => "plain_sql",
        }
    }
}

/// Classify a dump file by its first five bytes. Anything that is not
/// exactly the `PGDMP` magic (including files shorter than the magic)
/// is treated as plain SQL.
pub fn detect_format(path: &Path) -> Result<DumpFormat> {
    let mut header = [0u8; CUSTOM_DUMP_MAGIC.len()];
    let mut file = File::open(path)?;
    let mut read = 0;
    while read < header.len() {
        let n = file.read(&mut header[read..])?;
        if n == 0 {
            break;
        }
        read += n;
    }
    if read == header.len() && header == CUSTOM_DUMP_MAGIC {
        Ok(DumpFormat::Custom)
    } else {
        Ok(DumpFormat::PlainSql)
    }
}

/// Stream a plain-SQL dump from `source` to `target`, dropping
/// incompatible `SET <param>_timeout` lines. Returns the number of
/// removed lines. All surviving lines are copied byte-for-byte, line
/// endings included.
pub fn filter_incompatible_settings(source: &Path, target: &Path) -> Result<usize> {
    let mut reader = BufReader::new(File::open(source)?);
    let mut writer = File::create(target)?;
    let mut removed = 0usize;
    let mut line = Vec::new();

    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }
        if should_remove_timeout_set(&line) {
            removed += 1;
            continue;
        }
        writer.write_all(&line)?;
    }
    writer.flush()?;
    Ok(removed)
}

fn should_remove_timeout_set(raw_line: &[u8]) -> bool {
    let trimmed = trim_line_ending(raw_line);
    let Some(captures) = SET_TIMEOUT_RE.captures(trimmed) else {
        return false;
    };
    let parameter = captures.get(1).map(|m| m.as_bytes()).unwrap_or_default();
    let lowered: Vec<u8> = parameter.to_ascii_lowercase();
    lowered.ends_with(b"timeout") && !SUPPORTED_TIMEOUT_SETTINGS.contains(&lowered.as_slice())
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
        end -= 1;
    }
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn detects_custom_dump_by_magic() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "a.dump", b"PGDMP\x01\x02rest-of-archive");
        assert_eq!(detect_format(&path).unwrap(), DumpFormat::Custom);
    }

    #[test]
    fn anything_else_is_plain_sql() {
        let dir = tempdir().unwrap();
        let sql = write_file(dir.path(), "a.sql", b"SELECT 1;\n");
        assert_eq!(detect_format(&sql).unwrap(), DumpFormat::PlainSql);

        // Shorter than the magic, and a near-miss prefix.
        let short = write_file(dir.path(), "b.sql", b"PGD");
        assert_eq!(detect_format(&short).unwrap(), DumpFormat::PlainSql);
        let near = write_file(dir.path(), "c.sql", b"PGDMT rest");
        assert_eq!(detect_format(&near).unwrap(), DumpFormat::PlainSql);
    }

    #[test]
    fn removes_only_unsupported_timeout_sets() {
        let dir = tempdir().unwrap();
        let source = write_file(
            dir.path(),
            "in.sql",
            b"SET statement_timeout = 0;\nSET transaction_timeout = 0;\nSET transaction_timeout TO '10s';\nSELECT 1;\n",
        );
        let target = dir.path().join("out.sql");

        let removed = filter_incompatible_settings(&source, &target).unwrap();
        assert_eq!(removed, 2);
        let output = std::fs::read(&target).unwrap();
        assert_eq!(output, b"SET statement_timeout = 0;\nSELECT 1;\n");
    }

    #[test]
    fn preserves_bytes_and_crlf_of_surviving_lines() {
        let dir = tempdir().unwrap();
        let source = write_file(
            dir.path(),
            "in.sql",
            b"SET lock_timeout = 0;\r\nset TRANSACTION_TIMEOUT TO 1;\r\nINSERT INTO t VALUES ('\xc3\xa9');\r\n",
        );
        let target = dir.path().join("out.sql");

        let removed = filter_incompatible_settings(&source, &target).unwrap();
        assert_eq!(removed, 1);
        let output = std::fs::read(&target).unwrap();
        assert_eq!(
            output,
            b"SET lock_timeout = 0;\r\nINSERT INTO t VALUES ('\xc3\xa9');\r\n"
        );
    }

    #[test]
    fn non_timeout_sets_pass_through() {
        assert!(!should_remove_timeout_set(b"SET search_path = public;\n"));
        assert!(!should_remove_timeout_set(b"SET statement_timeout = 0;\n"));
        assert!(should_remove_timeout_set(b"SET transaction_timeout = 0;\n"));
        // Not a SET statement at all.
        assert!(!should_remove_timeout_set(
            b"-- SET transaction_timeout = 0;\n"
        ));
    }
}

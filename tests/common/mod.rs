//! Shared fixtures for the integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestFixture {
    pub dir: TempDir,
}

impl TestFixture {
    pub fn log_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

pub fn setup() -> TestFixture {
    let dir = TempDir::new().expect("could not create temporary directory");
    TestFixture { dir }
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("could not read log file")
        .lines()
        .map(str::to_string)
        .collect()
}

// "YYYY-MM-DD HH:MM:SS,mmm <message>"
pub fn has_timestamp_prefix(line: &str) -> bool {
    line.len() > 24
        && chrono::NaiveDate::parse_from_str(&line[..10], "%Y-%m-%d").is_ok()
        && &line[10..11] == " "
        && &line[19..20] == ","
        && line[20..23].chars().all(|c| c.is_ascii_digit())
        && &line[23..24] == " "
}
